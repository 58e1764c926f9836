//! Dynamic-topology neuron graph and synchronous propagation.

use super::activation::ActivationFunction;
use super::neuron::{Neuron, NeuronId, NeuronKind};
use crate::error::{Error, ExpectedKind, Result};
use std::collections::{BTreeMap, HashMap};
use std::time::{Duration, Instant};

/// Old-to-new identity correspondence produced when copying neurons
pub type IdMap = HashMap<NeuronId, NeuronId>;

/// Directed, weighted, possibly cyclic neuron graph.
///
/// Neurons live in an id-keyed arena; synapses are a sparse
/// `from -> {to -> weight}` table. Enumeration is always in id order, which is
/// creation order.
#[derive(Debug)]
pub struct NeuronGraph {
    neurons: BTreeMap<NeuronId, Neuron>,
    synapses: BTreeMap<NeuronId, BTreeMap<NeuronId, f64>>,
    n_inputs: usize,
    n_outputs: usize,
}

impl NeuronGraph {
    /// Create a graph with `n_inputs` input and `n_outputs` output neurons.
    /// Outputs start with linear activation.
    pub fn new(n_inputs: usize, n_outputs: usize) -> Self {
        let mut graph = Self {
            neurons: BTreeMap::new(),
            synapses: BTreeMap::new(),
            n_inputs,
            n_outputs,
        };

        for _ in 0..n_inputs {
            graph.insert(NeuronKind::Input);
        }
        for _ in 0..n_outputs {
            graph.insert(NeuronKind::Output(ActivationFunction::Linear));
        }

        graph
    }

    fn insert(&mut self, kind: NeuronKind) -> NeuronId {
        let id = NeuronId::fresh();
        self.neurons.insert(id, Neuron::new(kind));
        id
    }

    fn neuron(&self, id: NeuronId) -> Result<&Neuron> {
        self.neurons.get(&id).ok_or(Error::UnknownNeuron(id))
    }

    /// Add a hidden neuron
    pub fn add_hidden(&mut self, activation: ActivationFunction) -> NeuronId {
        self.insert(NeuronKind::Hidden(activation))
    }

    /// Add a constant (supplier) neuron
    pub fn add_constant(&mut self, value: f64) -> NeuronId {
        self.insert(NeuronKind::Constant(value))
    }

    /// Add a neuron with the same kind payload as `id` in `source`.
    /// Only hidden and constant neurons can be copied.
    pub fn add_neuron_copy(&mut self, source: &NeuronGraph, id: NeuronId) -> Result<NeuronId> {
        match source.kind(id)? {
            kind @ (NeuronKind::Hidden(_) | NeuronKind::Constant(_)) => Ok(self.insert(kind)),
            _ => Err(Error::NotFound(id)),
        }
    }

    /// Remove a hidden or constant neuron with every synapse touching it
    pub fn remove_neuron(&mut self, id: NeuronId) -> Result<()> {
        match self.neurons.get(&id) {
            Some(neuron) if neuron.kind.is_inner() => {}
            _ => return Err(Error::NotFound(id)),
        }

        self.neurons.remove(&id);
        self.synapses.remove(&id);
        for targets in self.synapses.values_mut() {
            targets.remove(&id);
        }
        self.synapses.retain(|_, targets| !targets.is_empty());

        Ok(())
    }

    /// Set the weight of `from -> to`. Writing `0.0` removes the synapse.
    pub fn set_synapse_weight(&mut self, from: NeuronId, to: NeuronId, weight: f64) -> Result<()> {
        self.neuron(from)?;
        let target = self.neuron(to)?;

        if !target.kind.accepts_synapses() {
            return Err(Error::InvalidTarget(to));
        }
        if weight.is_nan() {
            return Err(Error::InvalidNumber);
        }

        if weight == 0.0 {
            if let Some(targets) = self.synapses.get_mut(&from) {
                targets.remove(&to);
                if targets.is_empty() {
                    self.synapses.remove(&from);
                }
            }
        } else {
            self.synapses.entry(from).or_default().insert(to, weight);
        }

        Ok(())
    }

    /// Weight of `from -> to`, `0.0` when absent
    pub fn synapse_weight(&self, from: NeuronId, to: NeuronId) -> Result<f64> {
        self.neuron(from)?;
        self.neuron(to)?;

        Ok(self
            .synapses
            .get(&from)
            .and_then(|targets| targets.get(&to))
            .copied()
            .unwrap_or(0.0))
    }

    /// Drive an input neuron
    pub fn set_input(&mut self, id: NeuronId, value: f64) -> Result<()> {
        let neuron = self.neurons.get_mut(&id).ok_or(Error::UnknownNeuron(id))?;
        if !neuron.kind.is_input() {
            return Err(Error::WrongKind {
                id,
                expected: ExpectedKind::Input,
            });
        }
        neuron.value = value;
        Ok(())
    }

    /// Drive an input neuron with `1.0` / `0.0`
    pub fn set_input_bool(&mut self, id: NeuronId, value: bool) -> Result<()> {
        self.set_input(id, if value { 1.0 } else { 0.0 })
    }

    /// Read an output neuron
    pub fn output(&self, id: NeuronId) -> Result<f64> {
        let neuron = self.neuron(id)?;
        if !neuron.kind.is_output() {
            return Err(Error::WrongKind {
                id,
                expected: ExpectedKind::Output,
            });
        }
        Ok(neuron.value)
    }

    /// Current value of any neuron
    pub fn value(&self, id: NeuronId) -> Result<f64> {
        Ok(self.neuron(id)?.value)
    }

    pub fn kind(&self, id: NeuronId) -> Result<NeuronKind> {
        Ok(self.neuron(id)?.kind)
    }

    /// Activation function of a calculateable neuron
    pub fn activation(&self, id: NeuronId) -> Result<ActivationFunction> {
        self.neuron(id)?.kind.activation().ok_or(Error::WrongKind {
            id,
            expected: ExpectedKind::Calculateable,
        })
    }

    /// Change the activation function of a calculateable neuron
    pub fn set_activation(&mut self, id: NeuronId, activation: ActivationFunction) -> Result<()> {
        let neuron = self.neurons.get_mut(&id).ok_or(Error::UnknownNeuron(id))?;
        match &mut neuron.kind {
            NeuronKind::Output(f) | NeuronKind::Hidden(f) => {
                *f = activation;
                Ok(())
            }
            _ => Err(Error::WrongKind {
                id,
                expected: ExpectedKind::Calculateable,
            }),
        }
    }

    /// Run `cycles` simultaneous update steps.
    ///
    /// Every cycle reads a snapshot of all values, accumulates
    /// `snapshot[from] * weight` per target, then writes
    /// `activation(accumulated)` into every calculateable neuron. Inputs and
    /// constants are never written. The returned duration is diagnostic only.
    pub fn propagate(&mut self, cycles: usize) -> Duration {
        let start = Instant::now();

        let mut accumulated: HashMap<NeuronId, f64> = HashMap::with_capacity(self.neurons.len());

        for _ in 0..cycles {
            accumulated.clear();

            // Values are only written after every synapse has been read, so the
            // live table is the snapshot.
            for (from, targets) in &self.synapses {
                let source = self.neurons[from].value;
                for (to, weight) in targets {
                    *accumulated.entry(*to).or_insert(0.0) += source * weight;
                }
            }

            for (id, neuron) in self.neurons.iter_mut() {
                if let Some(activation) = neuron.kind.activation() {
                    let input = accumulated.get(id).copied().unwrap_or(0.0);
                    neuron.value = activation.apply(input);
                }
            }
        }

        start.elapsed()
    }

    /// Zero every stored value (constants keep their value). Topology and
    /// weights are untouched.
    pub fn reset(&mut self) {
        for neuron in self.neurons.values_mut() {
            neuron.reset();
        }
    }

    /// Deep copy with fresh identities, plus the old-to-new identity map
    pub fn clone_with_mapping(&self) -> (NeuronGraph, IdMap) {
        let mut clone = NeuronGraph {
            neurons: BTreeMap::new(),
            synapses: BTreeMap::new(),
            n_inputs: self.n_inputs,
            n_outputs: self.n_outputs,
        };

        let mut mapping = IdMap::with_capacity(self.neurons.len());
        for (id, neuron) in &self.neurons {
            let new_id = NeuronId::fresh();
            clone.neurons.insert(new_id, *neuron);
            mapping.insert(*id, new_id);
        }

        for (from, targets) in &self.synapses {
            let cloned_targets = targets
                .iter()
                .map(|(to, weight)| (mapping[to], *weight))
                .collect();
            clone.synapses.insert(mapping[from], cloned_targets);
        }

        (clone, mapping)
    }

    pub fn n_inputs(&self) -> usize {
        self.n_inputs
    }

    pub fn n_outputs(&self) -> usize {
        self.n_outputs
    }

    pub fn contains(&self, id: NeuronId) -> bool {
        self.neurons.contains_key(&id)
    }

    /// All neuron ids in enumeration order
    pub fn neurons(&self) -> Vec<NeuronId> {
        self.neurons.keys().copied().collect()
    }

    fn filtered(&self, predicate: impl Fn(&NeuronKind) -> bool) -> Vec<NeuronId> {
        self.neurons
            .iter()
            .filter(|(_, n)| predicate(&n.kind))
            .map(|(id, _)| *id)
            .collect()
    }

    pub fn inputs(&self) -> Vec<NeuronId> {
        self.filtered(NeuronKind::is_input)
    }

    pub fn outputs(&self) -> Vec<NeuronId> {
        self.filtered(NeuronKind::is_output)
    }

    /// Hidden and constant neurons, i.e. the removable ones
    pub fn inner_neurons(&self) -> Vec<NeuronId> {
        self.filtered(NeuronKind::is_inner)
    }

    /// Neurons that may be synapse targets (outputs and hidden)
    pub fn calculateable_neurons(&self) -> Vec<NeuronId> {
        self.filtered(NeuronKind::accepts_synapses)
    }

    pub fn neuron_count(&self) -> usize {
        self.neurons.len()
    }

    /// Number of hidden neurons
    pub fn hidden_count(&self) -> usize {
        self.neurons
            .values()
            .filter(|n| matches!(n.kind, NeuronKind::Hidden(_)))
            .count()
    }

    pub fn synapse_count(&self) -> usize {
        self.synapses.values().map(BTreeMap::len).sum()
    }

    /// Every materialized synapse as `(from, to, weight)`
    pub fn synapses(&self) -> impl Iterator<Item = (NeuronId, NeuronId, f64)> + '_ {
        self.synapses
            .iter()
            .flat_map(|(from, targets)| targets.iter().map(move |(to, w)| (*from, *to, *w)))
    }

    /// Check if every weight and value is finite
    pub fn is_valid(&self) -> bool {
        self.synapses().all(|(_, _, w)| w.is_finite())
            && self.neurons.values().all(|n| n.value.is_finite())
    }
}

impl Clone for NeuronGraph {
    /// Deep copy with fresh identities; use [`NeuronGraph::clone_with_mapping`]
    /// when the correspondence is needed.
    fn clone(&self) -> Self {
        self.clone_with_mapping().0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn single_synapse(weight: f64, activation: ActivationFunction) -> (NeuronGraph, NeuronId, NeuronId) {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];
        graph.set_synapse_weight(input, output, weight).unwrap();
        graph.set_activation(output, activation).unwrap();
        (graph, input, output)
    }

    #[test]
    fn test_new_graph() {
        let graph = NeuronGraph::new(11, 9);
        assert_eq!(graph.inputs().len(), 11);
        assert_eq!(graph.outputs().len(), 9);
        assert_eq!(graph.neuron_count(), 20);
        assert_eq!(graph.synapse_count(), 0);

        // Inputs are enumerated before outputs
        let neurons = graph.neurons();
        assert!(neurons[..11].iter().all(|id| graph.kind(*id).unwrap().is_input()));
    }

    #[test]
    fn test_add_and_remove_every_activation() {
        let mut graph = NeuronGraph::new(0, 0);
        for f in ActivationFunction::ALL {
            let id = graph.add_hidden(f);
            assert_eq!(graph.activation(id).unwrap(), f);
            graph.remove_neuron(id).unwrap();
            assert!(!graph.contains(id));
        }
    }

    #[test]
    fn test_remove_foreign_neuron() {
        let mut network1 = NeuronGraph::new(0, 0);
        let mut network2 = NeuronGraph::new(0, 0);
        let id = network1.add_hidden(ActivationFunction::Linear);

        assert_eq!(network2.remove_neuron(id), Err(Error::NotFound(id)));
    }

    #[test]
    fn test_io_neurons_not_removable() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];

        assert_eq!(graph.remove_neuron(input), Err(Error::NotFound(input)));
        assert_eq!(graph.remove_neuron(output), Err(Error::NotFound(output)));
        assert_eq!(graph.neuron_count(), 2);
    }

    #[test]
    fn test_remove_clears_incident_synapses() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];
        let hidden = graph.add_hidden(ActivationFunction::Tanh);

        graph.set_synapse_weight(input, hidden, 0.5).unwrap();
        graph.set_synapse_weight(hidden, output, 0.5).unwrap();
        graph.set_synapse_weight(hidden, hidden, 0.5).unwrap();
        graph.set_synapse_weight(input, output, 2.0).unwrap();

        graph.remove_neuron(hidden).unwrap();

        assert_eq!(graph.synapse_count(), 1);
        assert!(graph.synapses().all(|(f, t, _)| f != hidden && t != hidden));
        assert_eq!(graph.synapse_weight(input, hidden), Err(Error::UnknownNeuron(hidden)));
        assert_eq!(graph.set_synapse_weight(hidden, output, 1.0), Err(Error::UnknownNeuron(hidden)));
    }

    #[test]
    fn test_synapse_targets() {
        let mut graph = NeuronGraph::new(1, 1);
        let hidden = graph.add_hidden(ActivationFunction::Linear);
        let constant = graph.add_constant(1.0);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];

        assert!(graph.set_synapse_weight(input, output, 1.0).is_ok());
        assert!(graph.set_synapse_weight(input, hidden, 1.0).is_ok());
        assert!(graph.set_synapse_weight(hidden, output, 1.0).is_ok());
        assert!(graph.set_synapse_weight(output, hidden, 1.0).is_ok());
        assert!(graph.set_synapse_weight(constant, output, 1.0).is_ok());

        for w in [1.0, 0.0, -3.0, f64::NAN, f64::INFINITY] {
            for from in [input, output, hidden, constant] {
                assert_eq!(graph.set_synapse_weight(from, input, w), Err(Error::InvalidTarget(input)));
                assert_eq!(graph.set_synapse_weight(from, constant, w), Err(Error::InvalidTarget(constant)));
            }
        }
    }

    #[test]
    fn test_zero_and_nan_weights() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];

        assert_eq!(graph.synapse_weight(input, output).unwrap(), 0.0);

        graph.set_synapse_weight(input, output, 1.5).unwrap();
        assert_eq!(graph.synapse_weight(input, output).unwrap(), 1.5);

        // Failed write leaves the weight alone
        assert_eq!(graph.set_synapse_weight(input, output, f64::NAN), Err(Error::InvalidNumber));
        assert_eq!(graph.synapse_weight(input, output).unwrap(), 1.5);

        graph.set_synapse_weight(input, output, 0.0).unwrap();
        assert_eq!(graph.synapse_weight(input, output).unwrap(), 0.0);
        assert_eq!(graph.synapse_count(), 0);
    }

    #[test]
    fn test_last_write_wins() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];

        graph.set_synapse_weight(input, output, 1.0).unwrap();
        graph.set_synapse_weight(input, output, -2.0).unwrap();
        assert_eq!(graph.synapse_count(), 1);
        assert_eq!(graph.synapse_weight(input, output).unwrap(), -2.0);
    }

    #[test]
    fn test_kind_checks() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];

        assert!(matches!(graph.set_input(output, 1.0), Err(Error::WrongKind { .. })));
        assert!(matches!(graph.output(input), Err(Error::WrongKind { .. })));
        assert!(matches!(graph.set_activation(input, ActivationFunction::Tanh), Err(Error::WrongKind { .. })));

        graph.set_input(input, 13.37).unwrap();
        graph.set_input(input, 0.0).unwrap();
        graph.set_input(input, -13.37).unwrap();
        assert_eq!(graph.value(input).unwrap(), -13.37);
    }

    #[test]
    fn test_propagate_single_synapse() {
        let (mut graph, input, output) = single_synapse(1.0, ActivationFunction::Linear);
        graph.set_input(input, 13.37).unwrap();

        graph.propagate(1);

        assert_eq!(graph.output(output).unwrap(), 13.37);
    }

    #[test]
    fn test_propagate_weights() {
        for (input_value, weight, expected) in [
            (10.0, 1.0, 10.0),
            (10.0, 0.5, 5.0),
            (10.0, 2.0, 20.0),
            (0.0, 1.0, 0.0),
            (-10.0, 1.0, -10.0),
            (-10.0, 0.5, -5.0),
            (-10.0, 2.0, -20.0),
        ] {
            let (mut graph, input, output) = single_synapse(weight, ActivationFunction::Linear);
            graph.set_input(input, input_value).unwrap();
            graph.propagate(1);
            assert_eq!(graph.output(output).unwrap(), expected);
        }
    }

    #[test]
    fn test_propagate_activation_functions() {
        let (mut graph, input, output) = single_synapse(1.0, ActivationFunction::Sigmoid);
        graph.set_input(input, 0.0).unwrap();
        graph.propagate(1);
        assert_eq!(graph.output(output).unwrap(), 0.5);

        let (mut graph, input, output) = single_synapse(1.0, ActivationFunction::Tanh);
        graph.set_input(input, 10.0).unwrap();
        graph.propagate(1);
        assert!((graph.output(output).unwrap() - 0.9999999958776928).abs() < 1e-12);

        let (mut graph, input, output) = single_synapse(1.0, ActivationFunction::SignBinary);
        graph.set_input(input, -10.0).unwrap();
        graph.propagate(1);
        assert_eq!(graph.output(output).unwrap(), -1.0);
    }

    #[test]
    fn test_propagation_is_simultaneous() {
        // input -> h1 -> h2 -> output: one layer per cycle
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];
        let h1 = graph.add_hidden(ActivationFunction::Linear);
        let h2 = graph.add_hidden(ActivationFunction::Linear);
        graph.set_synapse_weight(input, h1, 1.0).unwrap();
        graph.set_synapse_weight(h1, h2, 1.0).unwrap();
        graph.set_synapse_weight(h2, output, 1.0).unwrap();
        graph.set_input(input, 3.0).unwrap();

        graph.propagate(1);
        assert_eq!(graph.value(h1).unwrap(), 3.0);
        assert_eq!(graph.value(h2).unwrap(), 0.0);
        assert_eq!(graph.output(output).unwrap(), 0.0);

        graph.propagate(2);
        assert_eq!(graph.output(output).unwrap(), 3.0);
    }

    #[test]
    fn test_recurrent_wiring_terminates() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let output = graph.outputs()[0];
        let hidden = graph.add_hidden(ActivationFunction::Tanh);
        graph.set_synapse_weight(input, hidden, 1.0).unwrap();
        graph.set_synapse_weight(hidden, hidden, 0.5).unwrap();
        graph.set_synapse_weight(hidden, output, 1.0).unwrap();
        graph.set_synapse_weight(output, hidden, -0.5).unwrap();
        graph.set_input(input, 1.0).unwrap();

        graph.propagate(100);

        assert!(graph.is_valid());
        assert_eq!(graph.value(input).unwrap(), 1.0);
    }

    #[test]
    fn test_constant_drives_output() {
        let mut graph = NeuronGraph::new(0, 1);
        let output = graph.outputs()[0];
        let constant = graph.add_constant(2.0);
        graph.set_synapse_weight(constant, output, 1.5).unwrap();

        graph.propagate(1);
        assert_eq!(graph.output(output).unwrap(), 3.0);
        assert_eq!(graph.value(constant).unwrap(), 2.0);
    }

    #[test]
    fn test_reset() {
        let (mut graph, input, output) = single_synapse(2.0, ActivationFunction::Linear);
        graph.set_input(input, 4.0).unwrap();
        graph.propagate(1);

        graph.reset();

        assert_eq!(graph.value(input).unwrap(), 0.0);
        assert_eq!(graph.output(output).unwrap(), 0.0);
        assert_eq!(graph.synapse_weight(input, output).unwrap(), 2.0);
    }

    #[test]
    fn test_clone_is_isomorphic() {
        let mut graph = NeuronGraph::new(2, 1);
        let inputs = graph.inputs();
        let output = graph.outputs()[0];
        let hidden = graph.add_hidden(ActivationFunction::Sigmoid);
        let constant = graph.add_constant(-1.25);
        graph.set_synapse_weight(inputs[0], hidden, 0.7).unwrap();
        graph.set_synapse_weight(inputs[1], hidden, -0.3).unwrap();
        graph.set_synapse_weight(constant, hidden, 0.2).unwrap();
        graph.set_synapse_weight(hidden, output, 1.9).unwrap();
        graph.set_synapse_weight(hidden, hidden, 0.1).unwrap();

        let (mut clone, mapping) = graph.clone_with_mapping();

        assert_eq!(clone.neuron_count(), graph.neuron_count());
        assert_eq!(clone.synapse_count(), graph.synapse_count());
        for id in graph.neurons() {
            let cloned = mapping[&id];
            assert_ne!(id, cloned);
            assert_eq!(graph.kind(id).unwrap(), clone.kind(cloned).unwrap());
        }
        for (from, to, weight) in graph.synapses() {
            assert_eq!(clone.synapse_weight(mapping[&from], mapping[&to]).unwrap(), weight);
        }

        for (a, b) in inputs.iter().zip(clone.inputs()) {
            graph.set_input(*a, 0.8).unwrap();
            clone.set_input(b, 0.8).unwrap();
        }
        graph.propagate(5);
        clone.propagate(5);
        assert_eq!(graph.output(output).unwrap(), clone.output(mapping[&output]).unwrap());
    }

    #[test]
    fn test_clone_is_independent() {
        let mut graph = NeuronGraph::new(1, 1);
        let input = graph.inputs()[0];
        let hidden = graph.add_hidden(ActivationFunction::Linear);
        graph.set_synapse_weight(input, hidden, 1.0).unwrap();

        let mut clone = graph.clone();
        let clone_hidden = clone.inner_neurons()[0];
        clone.remove_neuron(clone_hidden).unwrap();

        assert_eq!(graph.synapse_count(), 1);
        assert!(graph.contains(hidden));
        assert!(!graph.contains(clone_hidden));
    }

    #[test]
    fn test_add_neuron_copy() {
        let mut source = NeuronGraph::new(1, 1);
        let hidden = source.add_hidden(ActivationFunction::Binary);
        let constant = source.add_constant(4.0);
        let input = source.inputs()[0];

        let mut target = NeuronGraph::new(1, 1);
        let copied = target.add_neuron_copy(&source, hidden).unwrap();
        assert_eq!(target.activation(copied).unwrap(), ActivationFunction::Binary);
        let copied = target.add_neuron_copy(&source, constant).unwrap();
        assert_eq!(target.value(copied).unwrap(), 4.0);

        assert_eq!(target.add_neuron_copy(&source, input), Err(Error::NotFound(input)));
    }
}
