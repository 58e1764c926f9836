//! NEUREVO - CLI Entry Point
//!
//! Evolves neural networks for boolean-operator tasks.

use clap::{Parser, Subcommand};
use log::info;
use neurevo::stats::StatsHistory;
use neurevo::task::{self, BooleanOperator};
use neurevo::{benchmark, Config, Individual};
use std::path::{Path, PathBuf};
use std::time::Instant;

#[derive(Parser)]
#[command(name = "neurevo")]
#[command(version)]
#[command(about = "Genetic evolution of variable-topology neural networks")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Evolve a network for a boolean operator
    Run {
        /// Configuration file (YAML)
        #[arg(short, long, default_value = "config.yaml")]
        config: PathBuf,

        /// Number of generations (overrides the config)
        #[arg(short, long)]
        generations: Option<u64>,

        /// Random seed for reproducibility (overrides the config)
        #[arg(long)]
        seed: Option<u64>,

        /// Operator to learn: xor, and, or, nand
        #[arg(short, long, default_value = "xor")]
        task: BooleanOperator,

        /// Output directory for the champion and stats
        #[arg(short, long, default_value = "output")]
        output: PathBuf,
    },

    /// Run performance benchmark
    Benchmark {
        /// Number of generations
        #[arg(short, long, default_value = "50")]
        generations: u64,

        /// Generation size
        #[arg(short, long, default_value = "100")]
        population: usize,
    },

    /// Generate default configuration file
    Init {
        /// Output path
        #[arg(short, long, default_value = "config.yaml")]
        output: PathBuf,
    },
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Run {
            config,
            generations,
            seed,
            task,
            output,
        } => run_evolution(config, generations, seed, task, output),

        Commands::Benchmark {
            generations,
            population,
        } => {
            init_logging("info");
            run_benchmark(generations, population)
        }

        Commands::Init { output } => {
            init_logging("info");
            generate_config(output)
        }
    }
}

fn init_logging(default_level: &str) {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level)).init();
}

fn run_evolution(
    config_path: PathBuf,
    generations: Option<u64>,
    seed: Option<u64>,
    op: BooleanOperator,
    output: PathBuf,
) -> Result<(), Box<dyn std::error::Error>> {
    // Load or create config
    let (mut config, source) = if config_path.exists() {
        (Config::from_file(&config_path)?, format!("{:?}", config_path))
    } else {
        (Config::default(), "defaults".to_string())
    };
    init_logging(&config.logging.log_level);
    info!("Using configuration from {}", source);

    if let Some(g) = generations {
        config.evolution.generations = g;
    }
    let seed = seed.or(config.seed).unwrap_or_else(rand::random);
    config.seed = Some(seed);

    std::fs::create_dir_all(&output)?;

    println!("Evolving {}", op);
    println!("  Seed: {}", seed);
    println!(
        "  Generation size: {} (keeping {})",
        config.evolution.generation_size, config.evolution.selection_size
    );
    println!("  Generations: {}", config.evolution.generations);
    println!();

    let mut evolution = task::boolean_evolution(&config, op, seed)?;
    let evaluate = task::evaluator(config.evolution.propagation_cycles);

    let start = Instant::now();
    evolution.run(config.evolution.generations, &evaluate)?;
    let elapsed = start.elapsed();

    println!();
    println!("=== Evolution Complete ===");
    println!("Time: {:.2}s", elapsed.as_secs_f64());
    println!("Generations: {}", evolution.generation());
    println!(
        "Speed: {:.1} generations/s",
        evolution.generation() as f64 / elapsed.as_secs_f64().max(f64::EPSILON)
    );

    if let Some((champion, fitness)) = evolution.champion() {
        println!("Champion fitness: {:.4}", fitness);
        println!("Champion accuracy: {:.2}", task::accuracy(champion, op));
        println!(
            "Champion size: {} neurons, {} synapses",
            champion.graph().neuron_count(),
            champion.graph().synapse_count()
        );
        for (a, b) in task::CASES {
            println!("  {} {} {} -> {:.4}", a as u8, op, b as u8, champion.result(a, b));
        }

        let champion_path = output.join("champion.json");
        let json = serde_json::to_string_pretty(&champion.graph().snapshot())?;
        std::fs::write(&champion_path, json)?;
        println!("Champion network: {:?}", champion_path);
    }

    save_history(evolution.history(), &output)?;
    config.save(output.join("config_used.yaml"))?;

    Ok(())
}

fn save_history(history: &StatsHistory, output: &Path) -> Result<(), Box<dyn std::error::Error>> {
    let stats_path = output.join("stats_history.json");
    history.save_json(&stats_path)?;
    println!("Stats history: {:?}", stats_path);
    Ok(())
}

fn run_benchmark(generations: u64, population: usize) -> Result<(), Box<dyn std::error::Error>> {
    println!("=== NEUREVO Benchmark ===");
    println!("Generations: {}", generations);
    println!("Population: {}", population);
    println!();

    let result = benchmark(generations, population)?;
    println!("{}", result);

    Ok(())
}

fn generate_config(output: PathBuf) -> Result<(), Box<dyn std::error::Error>> {
    let config = Config::default();
    config.save(&output)?;
    println!("Configuration saved to: {:?}", output);
    Ok(())
}
