//! Network mutation and crossover operators.
//!
//! Every operator builds or edits a [`NeuronGraph`] through its public
//! structural primitives, so the graph invariants (no synapse into an input
//! or constant, no dangling identities) hold for every child.

use super::individual::Individual;
use super::pool::{MutationContext, MutationMethod, PoolMutator};
use crate::config::OperatorWeights;
use crate::error::Result;
use crate::neural::{ActivationFunction, NeuronGraph, NeuronId};
use rand::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Weights produced by random arithmetic are kept within this bound
pub const MAX_WEIGHT: f64 = 1.0e3;

/// Fixed input/output shape of every network in a run
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct NetworkSettings {
    pub n_inputs: usize,
    pub n_outputs: usize,
}

impl NetworkSettings {
    pub fn new(n_inputs: usize, n_outputs: usize) -> Self {
        Self { n_inputs, n_outputs }
    }
}

/// Uniform integer in `[low, high)`, or `low` when the range is empty
fn count_between<R: Rng + ?Sized>(rng: &mut R, low: usize, high: usize) -> usize {
    if high <= low {
        low
    } else {
        rng.gen_range(low..high)
    }
}

/// Small fan-in/fan-out count: `[1, 1 + 3·aggr)`
fn add_count(ctx: &mut MutationContext<'_>) -> usize {
    count_between(ctx.rng, 1, 1 + (3.0 * ctx.aggressiveness) as usize)
}

/// Uniform in `±2·(1 + aggr)`
fn random_weight(ctx: &mut MutationContext<'_>) -> f64 {
    ctx.rng.gen_range(-1.0..1.0) * 2.0 * (1.0 + ctx.aggressiveness)
}

/// Uniform in `±5·(1 + aggr)`
fn random_constant(ctx: &mut MutationContext<'_>) -> f64 {
    ctx.rng.gen_range(-1.0..1.0) * 5.0 * (1.0 + ctx.aggressiveness)
}

/// One of: jitter scaled to the current value, multiplicative scaling, or
/// damping division
fn perturb(ctx: &mut MutationContext<'_>, weight: f64) -> f64 {
    let r: f64 = ctx.rng.gen();
    let perturbed = match ctx.rng.gen_range(0..3) {
        0 => weight + (r - 0.5) * 2.0 * weight,
        1 => weight * (r - 0.5) * 3.0,
        _ => weight / (1.0 + r),
    };
    perturbed.clamp(-MAX_WEIGHT, MAX_WEIGHT)
}

/// Write a synapse whose endpoints were picked from valid candidates
fn connect(graph: &mut NeuronGraph, from: NeuronId, to: NeuronId, weight: f64) {
    if let Err(e) = graph.set_synapse_weight(from, to, weight) {
        log::trace!("Synapse {} -> {} skipped: {}", from, to, e);
    }
}

/// The structural edits drawn by [`NetworkOperators::mutate`]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum Edit {
    Reweight,
    ChangeActivation,
    AddHidden,
    RemoveNeuron,
    RemoveSynapse,
    AddConstant,
}

impl Edit {
    const ALL: [Edit; 6] = [
        Edit::Reweight,
        Edit::ChangeActivation,
        Edit::AddHidden,
        Edit::RemoveNeuron,
        Edit::RemoveSynapse,
        Edit::AddConstant,
    ];
}

/// Domain operators over network-bearing individuals
#[derive(Clone, Copy, Debug)]
pub struct NetworkOperators {
    settings: NetworkSettings,
}

impl NetworkOperators {
    pub fn new(settings: NetworkSettings) -> Self {
        Self { settings }
    }

    pub fn settings(&self) -> NetworkSettings {
        self.settings
    }

    /// Fresh random network: `[1, 1+20·aggr)` hidden neurons with random
    /// activations, a few constants, and `[1+20·aggr, 1+200·aggr)` synapses.
    pub fn create_random<T: Individual>(&self, ctx: &mut MutationContext<'_>) -> T {
        let mut graph = NeuronGraph::new(self.settings.n_inputs, self.settings.n_outputs);
        let aggressiveness = ctx.aggressiveness;

        let hidden = count_between(ctx.rng, 1, 1 + (20.0 * aggressiveness) as usize);
        for _ in 0..hidden {
            graph.add_hidden(ActivationFunction::random(ctx.rng));
        }

        let constants = add_count(ctx);
        for _ in 0..constants {
            let value = random_constant(ctx);
            graph.add_constant(value);
        }

        let sources = graph.neurons();
        let targets = graph.calculateable_neurons();
        let synapses = count_between(
            ctx.rng,
            1 + (20.0 * aggressiveness) as usize,
            1 + (200.0 * aggressiveness) as usize,
        );

        if !sources.is_empty() && !targets.is_empty() {
            for _ in 0..synapses {
                let from = sources[ctx.rng.gen_range(0..sources.len())];
                let to = targets[ctx.rng.gen_range(0..targets.len())];
                let weight = random_weight(ctx);
                connect(&mut graph, from, to, weight);
            }
        }

        T::from_graph(graph)
    }

    /// Clone `parent` and apply `ceil(neurons·(1+aggr)/2)` random edits
    pub fn mutate<T: Individual>(&self, ctx: &mut MutationContext<'_>, parent: &T) -> T {
        let mut child = parent.clone();
        let graph = child.graph_mut();

        let rounds = (graph.neuron_count() as f64 * (1.0 + ctx.aggressiveness) / 2.0).ceil() as usize;

        for _ in 0..rounds {
            let all = graph.neurons();
            let targets = graph.calculateable_neurons();

            let Some(&from) = all.choose(ctx.rng) else {
                break;
            };
            let to = targets.choose(ctx.rng).copied();
            let edit = Edit::ALL[ctx.rng.gen_range(0..Edit::ALL.len())];

            match (edit, to) {
                (Edit::Reweight, Some(to)) => {
                    let weight = graph.synapse_weight(from, to).unwrap_or(0.0);
                    let weight = perturb(ctx, weight);
                    connect(graph, from, to, weight);
                }
                (Edit::ChangeActivation, Some(to)) => {
                    let activation = ActivationFunction::random(ctx.rng);
                    if let Err(e) = graph.set_activation(to, activation) {
                        log::trace!("Activation change skipped: {}", e);
                    }
                }
                (Edit::AddHidden, _) => {
                    let added = graph.add_hidden(ActivationFunction::random(ctx.rng));

                    if !targets.is_empty() {
                        for _ in 0..add_count(ctx) {
                            let to = targets[ctx.rng.gen_range(0..targets.len())];
                            let weight = random_weight(ctx);
                            connect(graph, added, to, weight);
                        }
                    }
                    for _ in 0..add_count(ctx) {
                        let from = all[ctx.rng.gen_range(0..all.len())];
                        let weight = random_weight(ctx);
                        connect(graph, from, added, weight);
                    }
                }
                (Edit::RemoveNeuron, _) => {
                    let removable = graph.inner_neurons();
                    if let Some(&victim) = removable.choose(ctx.rng) {
                        if let Err(e) = graph.remove_neuron(victim) {
                            log::trace!("Removal skipped: {}", e);
                        }
                    }
                }
                (Edit::RemoveSynapse, Some(to)) => {
                    connect(graph, from, to, 0.0);
                }
                (Edit::AddConstant, _) => {
                    let value = random_constant(ctx);
                    let added = graph.add_constant(value);

                    if !targets.is_empty() {
                        for _ in 0..add_count(ctx) {
                            let to = targets[ctx.rng.gen_range(0..targets.len())];
                            let weight = random_weight(ctx);
                            connect(graph, added, to, weight);
                        }
                    }
                }
                // Edits needing a target are no-ops on target-less graphs
                (_, None) => {}
            }
        }

        child
    }

    /// Combine the start of `a`'s inner neurons with the reversed end of
    /// `b`'s, copying each parent's own weights, then add random cross links
    /// between the two copied sets.
    pub fn crossover<T: Individual>(&self, ctx: &mut MutationContext<'_>, a: &T, b: &T) -> T {
        let (ga, gb) = (a.graph(), b.graph());
        let inner_a = ga.inner_neurons();
        let inner_b = gb.inner_neurons();

        let ra = ctx.rng.gen_range(0..=inner_a.len() / 2);
        let rb = ((inner_a.len() + inner_b.len()) / 2).saturating_sub(ra);

        let mut graph = NeuronGraph::new(self.settings.n_inputs, self.settings.n_outputs);

        // parent id -> child id, per parent
        let mut map_a: HashMap<NeuronId, NeuronId> = HashMap::new();
        let mut map_b: HashMap<NeuronId, NeuronId> = HashMap::new();

        let new_io: Vec<NeuronId> = graph.inputs().into_iter().chain(graph.outputs()).collect();
        for (old, new) in ga.inputs().into_iter().chain(ga.outputs()).zip(&new_io) {
            map_a.insert(old, *new);
        }
        for (old, new) in gb.inputs().into_iter().chain(gb.outputs()).zip(&new_io) {
            map_b.insert(old, *new);
        }

        let mut copied_a = Vec::with_capacity(ra);
        for old in inner_a.iter().take(ra) {
            if let Ok(new) = graph.add_neuron_copy(ga, *old) {
                map_a.insert(*old, new);
                copied_a.push(new);
            }
        }

        let mut copied_b = Vec::with_capacity(rb);
        for old in inner_b.iter().rev().take(rb) {
            if let Ok(new) = graph.add_neuron_copy(gb, *old) {
                map_b.insert(*old, new);
                copied_b.push(new);
            }
        }

        // Parent A supplies every synapse among its mapped neurons, including
        // input/output wiring; parent B only those touching its own copies.
        for (from, to, weight) in ga.synapses() {
            if let (Some(&f), Some(&t)) = (map_a.get(&from), map_a.get(&to)) {
                connect(&mut graph, f, t, weight);
            }
        }
        let from_b: std::collections::HashSet<NeuronId> = copied_b.iter().copied().collect();
        for (from, to, weight) in gb.synapses() {
            if let (Some(&f), Some(&t)) = (map_b.get(&from), map_b.get(&to)) {
                if from_b.contains(&f) || from_b.contains(&t) {
                    connect(&mut graph, f, t, weight);
                }
            }
        }

        if !copied_a.is_empty() && !copied_b.is_empty() {
            let targets_a: Vec<NeuronId> = copied_a
                .iter()
                .copied()
                .filter(|id| graph.kind(*id).map(|k| k.accepts_synapses()).unwrap_or(false))
                .collect();
            let targets_b: Vec<NeuronId> = copied_b
                .iter()
                .copied()
                .filter(|id| graph.kind(*id).map(|k| k.accepts_synapses()).unwrap_or(false))
                .collect();

            let links = ctx.rng.gen_range(0..copied_a.len() + copied_b.len());
            for _ in 0..links {
                let (sources, targets) = if ctx.rng.gen_bool(0.5) {
                    (&copied_a, &targets_b)
                } else {
                    (&copied_b, &targets_a)
                };
                if let (Some(&from), Some(&to)) = (sources.choose(ctx.rng), targets.choose(ctx.rng)) {
                    let weight = random_weight(ctx);
                    connect(&mut graph, from, to, weight);
                }
            }
        }

        T::from_graph(graph)
    }

    /// Cross `parent` with a freshly created random network
    pub fn crossover_random<T: Individual>(&self, ctx: &mut MutationContext<'_>, parent: &T) -> T {
        let stranger: T = self.create_random(ctx);
        self.crossover(ctx, parent, &stranger)
    }

    /// Pool mutator registering all four operators with the given weights
    pub fn into_mutator<T: Individual + 'static>(
        self,
        weights: &OperatorWeights,
        seed: u64,
    ) -> Result<PoolMutator<T>> {
        PoolMutator::with_seed(seed)
            .with_method(
                "create_random",
                MutationMethod::create(move |ctx| self.create_random(ctx)),
                weights.create_random,
            )?
            .with_method(
                "mutate",
                MutationMethod::mutate(move |ctx, parent| self.mutate(ctx, parent)),
                weights.mutate,
            )?
            .with_method(
                "crossover",
                MutationMethod::cross(move |ctx, a, b| self.crossover(ctx, a, b)),
                weights.crossover,
            )?
            .with_method(
                "crossover_random",
                MutationMethod::mutate(move |ctx, parent| self.crossover_random(ctx, parent)),
                weights.crossover_random,
            )
    }
}
