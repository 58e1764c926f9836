//! Boolean-operator reference task.
//!
//! An individual is shown every combination of two boolean inputs and its
//! single output is scored against a [`BooleanOperator`]. The episode is
//! driven by an explicit [`Episode::advance`] step so evaluators own the loop.

use crate::config::Config;
use crate::error::{Error, Result};
use crate::evolution::{Evolution, FitnessFunction, FixedAggressiveness, GeneticEnhancer, PlateauDecay};
use crate::genetics::{Individual, NetworkOperators, NetworkSettings};
use crate::neural::NeuronGraph;
use log::debug;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Input combinations, in evaluation order
pub const CASES: [(bool, bool); 4] = [(false, false), (false, true), (true, false), (true, true)];

/// Simulated time taken by one case
pub const CASE_DURATION: f64 = 1.0;

/// Propagation cycles per case unless told otherwise
pub const DEFAULT_CYCLES: usize = 10;

/// Two-input boolean operator to learn
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BooleanOperator {
    Xor,
    And,
    Or,
    Nand,
}

impl BooleanOperator {
    pub const ALL: [BooleanOperator; 4] = [
        BooleanOperator::Xor,
        BooleanOperator::And,
        BooleanOperator::Or,
        BooleanOperator::Nand,
    ];

    pub fn apply(self, a: bool, b: bool) -> bool {
        match self {
            BooleanOperator::Xor => a ^ b,
            BooleanOperator::And => a && b,
            BooleanOperator::Or => a || b,
            BooleanOperator::Nand => !(a && b),
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            BooleanOperator::Xor => "xor",
            BooleanOperator::And => "and",
            BooleanOperator::Or => "or",
            BooleanOperator::Nand => "nand",
        }
    }
}

impl fmt::Display for BooleanOperator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for BooleanOperator {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        Self::ALL
            .into_iter()
            .find(|op| op.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::Configuration(format!("unknown boolean operator '{}'", s)))
    }
}

/// Step-driven evaluation of one individual
pub trait Episode {
    /// Reset episode state before a fresh run
    fn begin(&mut self);

    /// Advance simulated time by `dt`. Returns `true` while the episode is
    /// still running.
    fn advance(&mut self, dt: f64) -> bool;
}

/// Run an episode to completion in steps of `dt`.
///
/// Non-positive or non-finite steps fall back to [`CASE_DURATION`].
pub fn run_episode<E: Episode + ?Sized>(episode: &mut E, dt: f64) {
    let dt = if dt.is_finite() && dt > 0.0 { dt } else { CASE_DURATION };
    episode.begin();
    while episode.advance(dt) {}
}

/// Network individual recording one output per input case
#[derive(Clone, Debug)]
pub struct BooleanIndividual {
    graph: NeuronGraph,
    results: [f64; 4],
    cursor: usize,
    clock: f64,
    cycles: usize,
}

impl BooleanIndividual {
    /// Output recorded for a case, 0.0 before it has run
    pub fn result(&self, a: bool, b: bool) -> f64 {
        self.results[case_index(a, b)]
    }

    pub fn results(&self) -> &[f64; 4] {
        &self.results
    }

    pub fn set_cycles(&mut self, cycles: usize) {
        self.cycles = cycles;
    }

    pub fn cycles(&self) -> usize {
        self.cycles
    }

    pub fn is_finished(&self) -> bool {
        self.cursor >= CASES.len()
    }

    fn run_case(&mut self, index: usize) -> Result<f64> {
        let (a, b) = CASES[index];
        let inputs = self.graph.inputs();
        if let Some(&id) = inputs.first() {
            self.graph.set_input_bool(id, a)?;
        }
        if let Some(&id) = inputs.get(1) {
            self.graph.set_input_bool(id, b)?;
        }

        self.graph.propagate(self.cycles);
        let result = match self.graph.outputs().first() {
            Some(&id) => self.graph.output(id)?,
            None => 0.0,
        };
        self.graph.reset();
        Ok(result)
    }
}

fn case_index(a: bool, b: bool) -> usize {
    (a as usize) * 2 + b as usize
}

impl Individual for BooleanIndividual {
    fn from_graph(graph: NeuronGraph) -> Self {
        Self {
            graph,
            results: [0.0; 4],
            cursor: 0,
            clock: 0.0,
            cycles: DEFAULT_CYCLES,
        }
    }

    fn graph(&self) -> &NeuronGraph {
        &self.graph
    }

    fn graph_mut(&mut self) -> &mut NeuronGraph {
        &mut self.graph
    }
}

impl Episode for BooleanIndividual {
    fn begin(&mut self) {
        self.results = [0.0; 4];
        self.cursor = 0;
        self.clock = 0.0;
        self.graph.reset();
    }

    fn advance(&mut self, dt: f64) -> bool {
        if dt.is_finite() && dt > 0.0 {
            self.clock += dt;
        }
        while !self.is_finished() && self.clock >= (self.cursor + 1) as f64 * CASE_DURATION {
            let index = self.cursor;
            self.results[index] = match self.run_case(index) {
                Ok(value) => value,
                Err(e) => {
                    debug!("Case {:?} failed: {}", CASES[index], e);
                    0.0
                }
            };
            self.cursor += 1;
        }
        !self.is_finished()
    }
}

/// Run the full episode with the individual's own cycle count
pub fn evaluate(individual: &mut BooleanIndividual) {
    run_episode(individual, CASE_DURATION);
}

/// Evaluator running every case with `cycles` propagation cycles
pub fn evaluator(cycles: usize) -> impl Fn(&mut BooleanIndividual) + Sync {
    move |individual: &mut BooleanIndividual| {
        individual.set_cycles(cycles);
        evaluate(individual);
    }
}

fn clip(value: f64) -> f64 {
    value.clamp(0.0, 1.0)
}

/// Fitness functions for learning `op`.
///
/// One reward per case (the clipped output when the expected answer is true,
/// its complement otherwise), a penalty for large total output magnitude,
/// and a penalty of one point per five neurons.
pub fn boolean_fitness_functions(op: BooleanOperator) -> Vec<FitnessFunction<BooleanIndividual>> {
    let mut functions: Vec<FitnessFunction<BooleanIndividual>> = Vec::with_capacity(CASES.len() + 2);

    for (a, b) in CASES {
        let expected = op.apply(a, b);
        functions.push(Box::new(move |individual: &BooleanIndividual| {
            let result = clip(individual.result(a, b));
            if expected {
                result
            } else {
                1.0 - result
            }
        }));
    }

    functions.push(Box::new(|individual: &BooleanIndividual| {
        let magnitude: f64 = individual.results.iter().map(|r| r.abs()).sum();
        if magnitude > 2.0 {
            -0.5
        } else {
            magnitude / 5.0
        }
    }));

    functions.push(Box::new(|individual: &BooleanIndividual| {
        -((individual.graph.neuron_count() / 5) as f64)
    }));

    functions
}

/// Fraction of cases answered correctly, thresholding the output at 0.5
pub fn accuracy(individual: &BooleanIndividual, op: BooleanOperator) -> f64 {
    let correct = CASES
        .iter()
        .filter(|&&(a, b)| (individual.result(a, b) > 0.5) == op.apply(a, b))
        .count();
    correct as f64 / CASES.len() as f64
}

/// Evolution over [`BooleanIndividual`]s configured from `config`
pub fn boolean_evolution(config: &Config, op: BooleanOperator, seed: u64) -> Result<Evolution<BooleanIndividual>> {
    config.validate().map_err(Error::Configuration)?;
    if config.network.inputs < 2 {
        return Err(Error::Configuration(format!(
            "boolean task needs 2 inputs, got {}",
            config.network.inputs
        )));
    }

    let operators = NetworkOperators::new(NetworkSettings::new(config.network.inputs, config.network.outputs));
    let mutator = operators.into_mutator::<BooleanIndividual>(&config.operators, seed)?;

    let mut enhancer = GeneticEnhancer::new(mutator);
    for function in boolean_fitness_functions(op) {
        enhancer.add_fitness_function(function);
    }
    enhancer.set_aggressiveness(config.evolution.initial_aggressiveness);

    let evolution = Evolution::new(
        enhancer,
        config.evolution.generation_size,
        config.evolution.selection_size,
    )
    .with_stats_interval(config.logging.stats_interval);

    let evolution = if config.adaptive.enabled {
        let a = &config.adaptive;
        evolution.with_policy(PlateauDecay::new(a.ceiling, a.floor, a.decay))
    } else {
        evolution.with_policy(FixedAggressiveness(config.evolution.initial_aggressiveness))
    };
    Ok(evolution)
}
