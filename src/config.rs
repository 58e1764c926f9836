//! Configuration system for evolution runs.
//!
//! Supports YAML configuration files with sensible defaults.

use serde::{Deserialize, Serialize};
use std::path::Path;

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub network: NetworkConfig,
    pub evolution: EvolutionConfig,
    #[serde(default)]
    pub operators: OperatorWeights,
    #[serde(default)]
    pub adaptive: AdaptiveConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    /// Random seed; drawn from entropy when absent
    #[serde(default)]
    pub seed: Option<u64>,
}

/// Network shape
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NetworkConfig {
    /// Number of input neurons
    pub inputs: usize,
    /// Number of output neurons
    pub outputs: usize,
}

/// Generation configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EvolutionConfig {
    /// Individuals per generation
    pub generation_size: usize,
    /// Champions carried into the next generation
    pub selection_size: usize,
    /// Generations to run
    pub generations: u64,
    /// Aggressiveness of the first generation (0.0 - 1.0)
    pub initial_aggressiveness: f64,
    /// Propagation cycles per evaluated case
    pub propagation_cycles: usize,
}

/// Relative weights of the network operators
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OperatorWeights {
    pub create_random: f64,
    pub mutate: f64,
    pub crossover: f64,
    pub crossover_random: f64,
}

/// Plateau-driven aggressiveness adaptation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdaptiveConfig {
    pub enabled: bool,
    /// Upper bound of aggressiveness
    pub ceiling: f64,
    /// Lower bound of aggressiveness
    pub floor: f64,
    /// Factor applied per plateaued generation
    pub decay: f64,
}

/// Logging configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Generations between stats lines
    pub stats_interval: u64,
    /// Log level (error, warn, info, debug, trace)
    pub log_level: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            network: NetworkConfig::default(),
            evolution: EvolutionConfig::default(),
            operators: OperatorWeights::default(),
            adaptive: AdaptiveConfig::default(),
            logging: LoggingConfig::default(),
            seed: None,
        }
    }
}

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            inputs: 2,
            outputs: 1,
        }
    }
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            generation_size: 100,
            selection_size: 10,
            generations: 200,
            initial_aggressiveness: 0.25,
            propagation_cycles: 10,
        }
    }
}

impl Default for OperatorWeights {
    fn default() -> Self {
        Self {
            create_random: 1.0,
            mutate: 4.0,
            crossover: 1.0,
            crossover_random: 2.0,
        }
    }
}

impl Default for AdaptiveConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            ceiling: 0.5,
            floor: 0.05,
            decay: 0.9,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            stats_interval: 10,
            log_level: "info".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from a YAML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, Box<dyn std::error::Error>> {
        let contents = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Save configuration to a YAML file
    pub fn save<P: AsRef<Path>>(&self, path: P) -> Result<(), Box<dyn std::error::Error>> {
        let yaml = serde_yaml::to_string(self)?;
        std::fs::write(path, yaml)?;
        Ok(())
    }

    /// Validate configuration values
    pub fn validate(&self) -> Result<(), String> {
        if self.network.outputs == 0 {
            return Err("network must have at least one output".to_string());
        }
        if self.evolution.generation_size == 0 {
            return Err("generation_size must be > 0".to_string());
        }
        if self.evolution.selection_size == 0 {
            return Err("selection_size must be > 0".to_string());
        }
        if self.evolution.selection_size > self.evolution.generation_size {
            return Err("selection_size cannot exceed generation_size".to_string());
        }
        if !(0.0..=1.0).contains(&self.evolution.initial_aggressiveness) {
            return Err("initial_aggressiveness must be between 0 and 1".to_string());
        }
        let weights = [
            ("create_random", self.operators.create_random),
            ("mutate", self.operators.mutate),
            ("crossover", self.operators.crossover),
            ("crossover_random", self.operators.crossover_random),
        ];
        for (name, weight) in weights {
            if !(weight.is_finite() && weight > 0.0) {
                return Err(format!("operator weight '{}' must be > 0", name));
            }
        }
        if self.adaptive.enabled {
            let a = &self.adaptive;
            if !(0.0 <= a.floor && a.floor <= a.ceiling && a.ceiling <= 1.0) {
                return Err("adaptive bounds must satisfy 0 <= floor <= ceiling <= 1".to_string());
            }
            if !(a.decay > 0.0 && a.decay <= 1.0) {
                return Err("adaptive decay must be in (0, 1]".to_string());
            }
        }
        Ok(())
    }
}
