//! Evolution mechanics and selection.
//!
//! [`GeneticEnhancer`] scores individuals and breeds generations through a
//! [`PoolMutator`]. [`Evolution`] drives the full generational loop on top of
//! it: select, adapt aggressiveness, grow, evaluate, record.

use crate::error::Result;
use crate::genetics::{Individual, PoolMutator};
use crate::stats::{GenerationStats, StatsHistory};
use log::{debug, info};
use rayon::prelude::*;
use std::cmp::Ordering;
use std::time::Instant;

/// Scoring callback over an evaluated individual
pub type FitnessFunction<T> = Box<dyn Fn(&T) -> f64 + Send + Sync>;

/// Fitness aggregation, top-K selection, and generation advancement
pub struct GeneticEnhancer<T> {
    mutator: PoolMutator<T>,
    fitness_functions: Vec<FitnessFunction<T>>,
}

impl<T> GeneticEnhancer<T> {
    pub fn new(mutator: PoolMutator<T>) -> Self {
        Self {
            mutator,
            fitness_functions: Vec::new(),
        }
    }

    /// Builder form of [`add_fitness_function`](Self::add_fitness_function)
    pub fn with_fitness<F>(mut self, f: F) -> Self
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.add_fitness_function(f);
        self
    }

    pub fn add_fitness_function<F>(&mut self, f: F)
    where
        F: Fn(&T) -> f64 + Send + Sync + 'static,
    {
        self.fitness_functions.push(Box::new(f));
    }

    pub fn fitness_function_count(&self) -> usize {
        self.fitness_functions.len()
    }

    /// Sum of every fitness function's contribution
    pub fn fitness(&self, individual: &T) -> f64 {
        self.fitness_functions.iter().map(|f| f(individual)).sum()
    }

    /// Keep the `k` fittest individuals, best first.
    ///
    /// Ties keep their input order. NaN fitness ranks below everything else.
    pub fn top_selection(&self, generation: Vec<T>, k: usize) -> Vec<T> {
        let scored = generation
            .into_iter()
            .map(|individual| {
                let score = self.fitness(&individual);
                (individual, score)
            })
            .collect();
        rank(scored).into_iter().take(k).map(|(individual, _)| individual).collect()
    }

    /// Breed `target_size` individuals from a selection
    pub fn next_generation(&mut self, selection: Vec<T>, target_size: usize) -> Result<Vec<T>> {
        self.mutator.grow(selection, target_size)
    }

    pub fn aggressiveness(&self) -> f64 {
        self.mutator.aggressiveness()
    }

    pub fn set_aggressiveness(&mut self, value: f64) {
        self.mutator.set_aggressiveness(value);
    }

    pub fn mutator(&self) -> &PoolMutator<T> {
        &self.mutator
    }
}

/// Stable descending sort on score
fn rank<T>(mut scored: Vec<(T, f64)>) -> Vec<(T, f64)> {
    for entry in scored.iter_mut() {
        if entry.1.is_nan() {
            entry.1 = f64::NEG_INFINITY;
        }
    }
    // partial_cmp keeps -0.0 and 0.0 tied
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored
}

/// What an [`AggressivenessPolicy`] sees between generations
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct GenerationSummary {
    /// Generation about to be bred
    pub generation: u64,
    /// Best fitness of the previous generation
    pub best_fitness: f64,
    /// Fraction of the generation kept as parents
    pub top_fraction: f64,
    /// Generations without improvement of the best fitness
    pub plateau: u32,
    /// Aggressiveness used for the previous generation
    pub aggressiveness: f64,
}

/// Decides the aggressiveness of each new generation
pub trait AggressivenessPolicy: Send {
    fn next_aggressiveness(&mut self, summary: &GenerationSummary) -> f64;
}

/// Always the same aggressiveness
#[derive(Clone, Copy, Debug)]
pub struct FixedAggressiveness(pub f64);

impl AggressivenessPolicy for FixedAggressiveness {
    fn next_aggressiveness(&mut self, _summary: &GenerationSummary) -> f64 {
        self.0
    }
}

/// Starts from `ceiling * (1 - top_fraction)` and decays by `decay` for every
/// plateaued generation, clamped to `[floor, ceiling]`.
#[derive(Clone, Copy, Debug)]
pub struct PlateauDecay {
    pub ceiling: f64,
    pub floor: f64,
    pub decay: f64,
}

impl PlateauDecay {
    pub fn new(ceiling: f64, floor: f64, decay: f64) -> Self {
        Self { ceiling, floor, decay }
    }
}

impl AggressivenessPolicy for PlateauDecay {
    fn next_aggressiveness(&mut self, summary: &GenerationSummary) -> f64 {
        let start = self.ceiling * (1.0 - summary.top_fraction.clamp(0.0, 1.0));
        let exponent = summary.plateau.min(i32::MAX as u32) as i32;
        let value = start * self.decay.powi(exponent);
        value.max(self.floor).min(self.ceiling)
    }
}

/// Generational loop over an externally evaluated population.
pub struct Evolution<T> {
    enhancer: GeneticEnhancer<T>,
    policy: Box<dyn AggressivenessPolicy>,
    population: Vec<T>,
    scores: Vec<f64>,
    generation: u64,
    generation_size: usize,
    selection_size: usize,
    best_so_far: Option<f64>,
    plateau: u32,
    stats_interval: u64,
    history: StatsHistory,
}

impl<T: Individual + Sync> Evolution<T> {
    pub fn new(enhancer: GeneticEnhancer<T>, generation_size: usize, selection_size: usize) -> Self {
        Self {
            enhancer,
            policy: Box::new(FixedAggressiveness(crate::genetics::DEFAULT_AGGRESSIVENESS)),
            population: Vec::new(),
            scores: Vec::new(),
            generation: 0,
            generation_size,
            selection_size,
            best_so_far: None,
            plateau: 0,
            stats_interval: 10,
            history: StatsHistory::new(),
        }
    }

    pub fn with_policy<P: AggressivenessPolicy + 'static>(mut self, policy: P) -> Self {
        self.policy = Box::new(policy);
        self
    }

    /// Generations between info-level progress lines (0 disables them)
    pub fn with_stats_interval(mut self, interval: u64) -> Self {
        self.stats_interval = interval;
        self
    }

    /// Breed, evaluate and score one generation.
    ///
    /// `evaluate` runs an individual's episode; it is called in parallel
    /// across individuals, never twice at once on the same one.
    pub fn step<E>(&mut self, evaluate: &E) -> Result<GenerationStats>
    where
        E: Fn(&mut T) + Sync,
    {
        let start = Instant::now();

        let previous = std::mem::take(&mut self.population);
        let previous_scores = std::mem::take(&mut self.scores);
        let selection: Vec<T> = rank(previous.into_iter().zip(previous_scores).collect())
            .into_iter()
            .take(self.selection_size)
            .map(|(individual, _)| individual)
            .collect();

        if let Some(best) = self.best_so_far {
            let summary = GenerationSummary {
                generation: self.generation,
                best_fitness: best,
                top_fraction: self.selection_size as f64 / self.generation_size.max(1) as f64,
                plateau: self.plateau,
                aggressiveness: self.enhancer.aggressiveness(),
            };
            let next = self.policy.next_aggressiveness(&summary);
            self.enhancer.set_aggressiveness(next);
        }

        let mut population = self.enhancer.next_generation(selection, self.generation_size)?;
        population.par_iter_mut().for_each(|individual| evaluate(individual));

        let enhancer = &self.enhancer;
        let scores: Vec<f64> = population.par_iter().map(|individual| enhancer.fitness(individual)).collect();

        let best = scores
            .iter()
            .copied()
            .filter(|s| !s.is_nan())
            .fold(f64::NEG_INFINITY, f64::max);
        match self.best_so_far {
            Some(previous_best) if best <= previous_best => self.plateau += 1,
            _ => {
                self.best_so_far = Some(best);
                self.plateau = 0;
            }
        }

        let stats = GenerationStats::from_generation(
            self.generation,
            &population,
            &scores,
            self.enhancer.aggressiveness(),
            self.plateau,
            start.elapsed(),
        );
        debug!("{}", stats.summary());
        if self.stats_interval > 0 && self.generation % self.stats_interval == 0 {
            info!("{}", stats.summary());
        }

        self.population = population;
        self.scores = scores;
        self.generation += 1;
        self.history.record(stats.clone());
        Ok(stats)
    }

    /// Run `generations` steps
    pub fn run<E>(&mut self, generations: u64, evaluate: &E) -> Result<&StatsHistory>
    where
        E: Fn(&mut T) + Sync,
    {
        info!(
            "Evolving {} generations of {} (keeping {})",
            generations, self.generation_size, self.selection_size
        );
        for _ in 0..generations {
            self.step(evaluate)?;
        }
        if let Some((_, fitness)) = self.champion() {
            info!("Finished at generation {} with champion fitness {:.4}", self.generation, fitness);
        }
        Ok(&self.history)
    }

    /// Fittest individual of the current generation, first one on ties
    pub fn champion(&self) -> Option<(&T, f64)> {
        let mut best: Option<(&T, f64)> = None;
        for (individual, &score) in self.population.iter().zip(&self.scores) {
            let score = if score.is_nan() { f64::NEG_INFINITY } else { score };
            if best.map_or(true, |(_, b)| score > b) {
                best = Some((individual, score));
            }
        }
        best
    }

    /// Number of generations evaluated so far
    pub fn generation(&self) -> u64 {
        self.generation
    }

    pub fn population(&self) -> &[T] {
        &self.population
    }

    pub fn scores(&self) -> &[f64] {
        &self.scores
    }

    pub fn plateau(&self) -> u32 {
        self.plateau
    }

    pub fn history(&self) -> &StatsHistory {
        &self.history
    }

    pub fn enhancer(&self) -> &GeneticEnhancer<T> {
        &self.enhancer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::genetics::{MutationMethod, Network, NetworkOperators, NetworkSettings};
    use crate::neural::{ActivationFunction, NeuronGraph};

    #[derive(Clone, Debug, PartialEq)]
    struct Scored(f64);

    fn scored_enhancer() -> GeneticEnhancer<Scored> {
        GeneticEnhancer::new(PoolMutator::with_seed(1)).with_fitness(|s: &Scored| s.0)
    }

    #[test]
    fn test_fitness_is_sum() {
        let enhancer = GeneticEnhancer::new(PoolMutator::with_seed(1))
            .with_fitness(|s: &Scored| s.0)
            .with_fitness(|s: &Scored| s.0 * 2.0)
            .with_fitness(|_: &Scored| -1.0);
        assert_eq!(enhancer.fitness_function_count(), 3);
        assert_eq!(enhancer.fitness(&Scored(2.0)), 5.0);
    }

    #[test]
    fn test_no_fitness_functions_scores_zero() {
        let enhancer: GeneticEnhancer<Scored> = GeneticEnhancer::new(PoolMutator::with_seed(1));
        assert_eq!(enhancer.fitness(&Scored(3.0)), 0.0);
    }

    #[test]
    fn test_top_selection_order() {
        let enhancer = scored_enhancer();
        let generation = vec![Scored(0.1), Scored(0.9), Scored(0.5), Scored(0.7)];

        let top = enhancer.top_selection(generation, 2);
        assert_eq!(top, vec![Scored(0.9), Scored(0.7)]);
    }

    #[test]
    fn test_top_selection_bounded_by_generation() {
        let enhancer = scored_enhancer();
        let top = enhancer.top_selection(vec![Scored(1.0), Scored(2.0)], 10);
        assert_eq!(top.len(), 2);
        assert!(enhancer.top_selection(Vec::new(), 3).is_empty());
        assert!(enhancer.top_selection(vec![Scored(1.0)], 0).is_empty());
    }

    #[test]
    fn test_top_selection_non_increasing() {
        let enhancer = scored_enhancer();
        let generation: Vec<Scored> = (0..50).map(|i| Scored(((i * 37) % 11) as f64)).collect();
        let top = enhancer.top_selection(generation, 20);
        assert_eq!(top.len(), 20);
        for pair in top.windows(2) {
            assert!(pair[0].0 >= pair[1].0);
        }
    }

    #[test]
    fn test_top_selection_stable_ties_and_nan() {
        let enhancer = GeneticEnhancer::new(PoolMutator::with_seed(1))
            .with_fitness(|s: &(u32, f64)| s.1);
        let generation = vec![(0, 1.0), (1, f64::NAN), (2, 1.0), (3, 2.0)];
        let top = enhancer.top_selection(generation, 4);
        let order: Vec<u32> = top.iter().map(|s| s.0).collect();
        assert_eq!(order, vec![3, 0, 2, 1]);
    }

    #[test]
    fn test_signed_zero_fitness_ties() {
        let enhancer = GeneticEnhancer::new(PoolMutator::with_seed(1))
            .with_fitness(|s: &(u32, f64)| s.1);
        let top = enhancer.top_selection(vec![(0, -0.0), (1, 0.0)], 1);
        assert_eq!(top[0].0, 0);

        let top = enhancer.top_selection(vec![(0, 0.0), (1, -0.0), (2, -1.0), (3, -0.0)], 4);
        let order: Vec<u32> = top.iter().map(|s| s.0).collect();
        assert_eq!(order, vec![0, 1, 3, 2]);
    }

    #[test]
    fn test_next_generation_grows() {
        let mut enhancer = GeneticEnhancer::new(
            PoolMutator::with_seed(3)
                .with_method("bump", MutationMethod::mutate(|_, s: &Scored| Scored(s.0 + 1.0)), 1.0)
                .unwrap(),
        );
        let next = enhancer.next_generation(vec![Scored(0.0)], 5).unwrap();
        assert_eq!(next.len(), 5);
        assert_eq!(next[0], Scored(0.0));
    }

    #[test]
    fn test_aggressiveness_passthrough() {
        let mut enhancer = scored_enhancer();
        enhancer.set_aggressiveness(0.7);
        assert_eq!(enhancer.aggressiveness(), 0.7);
        assert_eq!(enhancer.mutator().aggressiveness(), 0.7);
    }

    #[test]
    fn test_plateau_decay() {
        let mut policy = PlateauDecay::new(0.5, 0.05, 0.5);
        let mut summary = GenerationSummary {
            generation: 1,
            best_fitness: 1.0,
            top_fraction: 0.1,
            plateau: 0,
            aggressiveness: 0.25,
        };
        assert!((policy.next_aggressiveness(&summary) - 0.45).abs() < 1e-12);

        summary.plateau = 2;
        assert!((policy.next_aggressiveness(&summary) - 0.1125).abs() < 1e-12);

        summary.plateau = 50;
        assert_eq!(policy.next_aggressiveness(&summary), 0.05);
    }

    #[test]
    fn test_fixed_policy() {
        let mut policy = FixedAggressiveness(0.3);
        let summary = GenerationSummary {
            generation: 4,
            best_fitness: 0.0,
            top_fraction: 0.5,
            plateau: 9,
            aggressiveness: 0.9,
        };
        assert_eq!(policy.next_aggressiveness(&summary), 0.3);
    }

    fn size_evolution(seed: u64) -> Evolution<Network> {
        let operators = NetworkOperators::new(NetworkSettings::new(2, 1));
        let mutator = operators
            .into_mutator::<Network>(&crate::config::OperatorWeights::default(), seed)
            .unwrap();
        let enhancer = GeneticEnhancer::new(mutator)
            .with_fitness(|n: &Network| n.graph().synapse_count() as f64);
        Evolution::new(enhancer, 20, 4).with_policy(PlateauDecay::new(0.5, 0.05, 0.9))
    }

    #[test]
    fn test_evolution_step() {
        let mut evolution = size_evolution(11);
        assert!(evolution.champion().is_none());

        let evaluate = |n: &mut Network| {
            n.graph_mut().propagate(1);
        };
        let stats = evolution.step(&evaluate).unwrap();
        assert_eq!(stats.generation, 0);
        assert_eq!(stats.population, 20);
        assert_eq!(evolution.generation(), 1);
        assert_eq!(evolution.population().len(), 20);
        assert_eq!(evolution.scores().len(), 20);
        assert!(evolution.champion().is_some());
    }

    #[test]
    fn test_best_fitness_never_lost() {
        let mut evolution = size_evolution(5);
        let evaluate = |n: &mut Network| {
            n.graph_mut().propagate(1);
        };
        let mut best = f64::NEG_INFINITY;
        for _ in 0..10 {
            let stats = evolution.step(&evaluate).unwrap();
            assert!(stats.best_fitness >= best);
            best = stats.best_fitness;
        }
        assert_eq!(evolution.history().len(), 10);
    }

    #[test]
    fn test_champion_prefers_first_on_ties() {
        let mut evolution: Evolution<Network> = Evolution::new(
            GeneticEnhancer::new(PoolMutator::with_seed(0)),
            2,
            1,
        );
        let mut a = NeuronGraph::new(1, 1);
        a.set_activation(a.outputs()[0], ActivationFunction::Tanh).unwrap();
        evolution.population = vec![Network(a), Network(NeuronGraph::new(1, 1))];
        evolution.scores = vec![1.0, 1.0];

        let (champion, fitness) = evolution.champion().unwrap();
        assert_eq!(fitness, 1.0);
        let out = champion.graph().outputs()[0];
        assert_eq!(champion.graph().activation(out).unwrap(), ActivationFunction::Tanh);
    }
}
