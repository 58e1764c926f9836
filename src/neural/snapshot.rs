//! Serializable neuron and synapse tables.
//!
//! Identities are process-local, so a snapshot refers to neurons by their
//! position in enumeration order.

use super::network::NeuronGraph;
use super::neuron::NeuronKind;
use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SynapseRecord {
    pub from: usize,
    pub to: usize,
    pub weight: f64,
}

/// Positional copy of a graph's structure
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct GraphSnapshot {
    pub n_inputs: usize,
    pub n_outputs: usize,
    /// Every neuron kind in enumeration order (inputs first, then outputs)
    pub neurons: Vec<NeuronKind>,
    pub synapses: Vec<SynapseRecord>,
}

impl NeuronGraph {
    /// Capture structure and weights (not values)
    pub fn snapshot(&self) -> GraphSnapshot {
        let ids = self.neurons();
        let position: HashMap<_, _> = ids.iter().enumerate().map(|(i, id)| (*id, i)).collect();

        let neurons = ids
            .iter()
            .filter_map(|id| self.kind(*id).ok())
            .collect();

        let synapses = self
            .synapses()
            .map(|(from, to, weight)| SynapseRecord {
                from: position[&from],
                to: position[&to],
                weight,
            })
            .collect();

        GraphSnapshot {
            n_inputs: self.n_inputs(),
            n_outputs: self.n_outputs(),
            neurons,
            synapses,
        }
    }

    /// Rebuild a graph with fresh identities from a snapshot
    pub fn from_snapshot(snapshot: &GraphSnapshot) -> Result<NeuronGraph> {
        let io = snapshot
            .n_inputs
            .checked_add(snapshot.n_outputs)
            .ok_or_else(|| Error::Configuration("snapshot input/output counts overflow".to_string()))?;
        let layout_ok = snapshot.neurons.len() >= io
            && snapshot.neurons[..snapshot.n_inputs].iter().all(NeuronKind::is_input)
            && snapshot.neurons[snapshot.n_inputs..io].iter().all(NeuronKind::is_output)
            && snapshot.neurons[io..].iter().all(NeuronKind::is_inner);
        if !layout_ok {
            return Err(Error::Configuration(
                "snapshot neuron table does not start with its inputs and outputs".to_string(),
            ));
        }

        let mut graph = NeuronGraph::new(snapshot.n_inputs, snapshot.n_outputs);
        let mut ids = graph.neurons();

        for (io_id, kind) in ids.clone().into_iter().zip(&snapshot.neurons) {
            if let NeuronKind::Output(f) = kind {
                graph.set_activation(io_id, *f)?;
            }
        }

        for kind in &snapshot.neurons[io..] {
            let id = match kind {
                NeuronKind::Hidden(f) => graph.add_hidden(*f),
                NeuronKind::Constant(v) => graph.add_constant(*v),
                _ => unreachable!("layout checked above"),
            };
            ids.push(id);
        }

        for synapse in &snapshot.synapses {
            let (from, to) = match (ids.get(synapse.from), ids.get(synapse.to)) {
                (Some(from), Some(to)) => (*from, *to),
                _ => {
                    return Err(Error::Configuration(format!(
                        "synapse {} -> {} refers to a missing neuron",
                        synapse.from, synapse.to
                    )))
                }
            };
            graph.set_synapse_weight(from, to, synapse.weight)?;
        }

        Ok(graph)
    }
}
