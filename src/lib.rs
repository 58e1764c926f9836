//! # NEUREVO
//!
//! Genetic evolution of variable-topology neural networks.
//!
//! ## Features
//!
//! - **Free topology**: recurrent graphs of typed neurons, grown and pruned by mutation
//! - **Weighted operators**: create, mutate and crossover drawn by relative weight
//! - **Parallel**: generation evaluation spread over all cores via Rayon
//! - **Configurable**: YAML configuration files
//! - **Reproducible**: seeded random number generation
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use neurevo::task::{self, BooleanOperator};
//! use neurevo::Config;
//!
//! let config = Config::default();
//! let mut evolution = task::boolean_evolution(&config, BooleanOperator::Xor, 42).unwrap();
//!
//! evolution.run(100, &task::evaluator(config.evolution.propagation_cycles)).unwrap();
//!
//! if let Some((champion, fitness)) = evolution.champion() {
//!     println!("Fitness: {:.3}", fitness);
//!     println!("Accuracy: {:.2}", task::accuracy(champion, BooleanOperator::Xor));
//! }
//! ```
//!
//! ## Building graphs by hand
//!
//! ```rust
//! use neurevo::neural::{ActivationFunction, NeuronGraph};
//!
//! let mut graph = NeuronGraph::new(1, 1);
//! let (input, output) = (graph.inputs()[0], graph.outputs()[0]);
//! let hidden = graph.add_hidden(ActivationFunction::Tanh);
//! graph.set_synapse_weight(input, hidden, 0.5).unwrap();
//! graph.set_synapse_weight(hidden, output, 2.0).unwrap();
//!
//! graph.set_input(input, 1.0).unwrap();
//! graph.propagate(2);
//! assert!(graph.output(output).unwrap() > 0.0);
//! ```

pub mod config;
pub mod error;
pub mod evolution;
pub mod genetics;
pub mod neural;
pub mod stats;
pub mod task;

// Re-export main types
pub use config::Config;
pub use error::{Error, Result};
pub use evolution::{Evolution, GeneticEnhancer};
pub use genetics::{Individual, PoolMutator};
pub use neural::{NeuronGraph, NeuronId};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Run a quick benchmark: evolve XOR for `generations` generations
pub fn benchmark(generations: u64, population: usize) -> Result<BenchmarkResult> {
    use std::time::Instant;

    let mut config = Config::default();
    config.evolution.generation_size = population.max(1);
    config.evolution.selection_size = (population / 10).max(1);
    config.logging.stats_interval = 0;

    let mut evolution = task::boolean_evolution(&config, task::BooleanOperator::Xor, 0)?;
    let evaluate = task::evaluator(config.evolution.propagation_cycles);

    let start = Instant::now();
    evolution.run(generations, &evaluate)?;
    let elapsed = start.elapsed();

    let (best_fitness, accuracy) = match evolution.champion() {
        Some((champion, fitness)) => (fitness, task::accuracy(champion, task::BooleanOperator::Xor)),
        None => (0.0, 0.0),
    };

    Ok(BenchmarkResult {
        generations,
        population: config.evolution.generation_size,
        elapsed_secs: elapsed.as_secs_f64(),
        generations_per_second: generations as f64 / elapsed.as_secs_f64().max(f64::EPSILON),
        best_fitness,
        accuracy,
    })
}

/// Benchmark result
#[derive(Debug, Clone)]
pub struct BenchmarkResult {
    pub generations: u64,
    pub population: usize,
    pub elapsed_secs: f64,
    pub generations_per_second: f64,
    pub best_fitness: f64,
    pub accuracy: f64,
}

impl std::fmt::Display for BenchmarkResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        writeln!(f, "=== Benchmark Results ===")?;
        writeln!(f, "Generations: {}", self.generations)?;
        writeln!(f, "Population: {}", self.population)?;
        writeln!(f, "Time: {:.3}s", self.elapsed_secs)?;
        writeln!(f, "Speed: {:.1} generations/s", self.generations_per_second)?;
        writeln!(f, "Best fitness: {:.4}", self.best_fitness)?;
        writeln!(f, "XOR accuracy: {:.2}", self.accuracy)?;
        Ok(())
    }
}
