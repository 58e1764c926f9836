//! Statistics tracking for evolution runs.

use crate::genetics::Individual;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Statistics snapshot for one evaluated generation
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct GenerationStats {
    /// Generation index, starting at 0
    pub generation: u64,
    /// Individuals evaluated
    pub population: usize,
    /// Highest fitness in the generation
    pub best_fitness: f64,
    /// Mean fitness across the generation
    pub mean_fitness: f64,
    /// Lowest fitness in the generation
    pub worst_fitness: f64,
    /// Mean neuron count (all kinds)
    pub neurons_mean: f64,
    /// Mean synapse count
    pub synapses_mean: f64,
    /// Aggressiveness used to breed this generation
    pub aggressiveness: f64,
    /// Generations since the best fitness last improved
    pub plateau: u32,
    /// Wall-clock time spent on the generation
    pub elapsed_ms: f64,
}

impl GenerationStats {
    /// Build stats from a generation and its fitness values.
    ///
    /// Non-finite scores are ignored for the fitness figures.
    pub fn from_generation<T: Individual>(
        generation: u64,
        population: &[T],
        scores: &[f64],
        aggressiveness: f64,
        plateau: u32,
        elapsed: Duration,
    ) -> Self {
        let mut stats = Self {
            generation,
            population: population.len(),
            aggressiveness,
            plateau,
            elapsed_ms: elapsed.as_secs_f64() * 1000.0,
            ..Self::default()
        };

        if !population.is_empty() {
            let n = population.len() as f64;
            stats.neurons_mean = population.iter().map(|i| i.graph().neuron_count()).sum::<usize>() as f64 / n;
            stats.synapses_mean = population.iter().map(|i| i.graph().synapse_count()).sum::<usize>() as f64 / n;
        }

        let finite: Vec<f64> = scores.iter().copied().filter(|s| s.is_finite()).collect();
        if !finite.is_empty() {
            stats.best_fitness = finite.iter().copied().fold(f64::NEG_INFINITY, f64::max);
            stats.worst_fitness = finite.iter().copied().fold(f64::INFINITY, f64::min);
            stats.mean_fitness = finite.iter().sum::<f64>() / finite.len() as f64;
        }

        stats
    }

    /// Format stats as a one-line summary
    pub fn summary(&self) -> String {
        format!(
            "Gen:{:5} | Best:{:8.4} | Mean:{:8.4} | Worst:{:8.4} | Neurons:{:.1} | Synapses:{:.1} | Aggr:{:.3} | Plateau:{}",
            self.generation,
            self.best_fitness,
            self.mean_fitness,
            self.worst_fitness,
            self.neurons_mean,
            self.synapses_mean,
            self.aggressiveness,
            self.plateau,
        )
    }
}

/// Historical statistics tracker
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct StatsHistory {
    /// All recorded generations
    pub generations: Vec<GenerationStats>,
}

impl StatsHistory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a generation
    pub fn record(&mut self, stats: GenerationStats) {
        self.generations.push(stats);
    }

    pub fn len(&self) -> usize {
        self.generations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.generations.is_empty()
    }

    /// Most recently recorded generation
    pub fn latest(&self) -> Option<&GenerationStats> {
        self.generations.last()
    }

    /// Best fitness over generations
    pub fn best_series(&self) -> Vec<(u64, f64)> {
        self.generations
            .iter()
            .map(|s| (s.generation, s.best_fitness))
            .collect()
    }

    /// Mean fitness over generations
    pub fn mean_series(&self) -> Vec<(u64, f64)> {
        self.generations
            .iter()
            .map(|s| (s.generation, s.mean_fitness))
            .collect()
    }

    /// Mean network size over generations
    pub fn complexity_series(&self) -> Vec<(u64, f64)> {
        self.generations
            .iter()
            .map(|s| (s.generation, s.neurons_mean))
            .collect()
    }

    /// Save history to a JSON file
    pub fn save_json<P: AsRef<std::path::Path>>(&self, path: P) -> std::io::Result<()> {
        let json = serde_json::to_string_pretty(self)?;
        std::fs::write(path, json)
    }

    /// Load history from a JSON file
    pub fn load_json<P: AsRef<std::path::Path>>(path: P) -> std::io::Result<Self> {
        let json = std::fs::read_to_string(path)?;
        serde_json::from_str(&json).map_err(|e| std::io::Error::new(std::io::ErrorKind::InvalidData, e))
    }
}
