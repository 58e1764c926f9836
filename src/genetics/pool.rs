//! Weighted, arity-aware pool mutator.
//!
//! Grows a population by repeatedly drawing a registered mutation method by
//! relative weight and feeding it 0, 1 or 2 parents sampled (with
//! replacement) from the input pool.

use crate::error::{Error, Result};
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// Default aggressiveness of a new pool mutator
pub const DEFAULT_AGGRESSIVENESS: f64 = 0.25;

/// Randomness and scaling handed to every mutation method
pub struct MutationContext<'a> {
    pub rng: &'a mut ChaCha8Rng,
    /// In `[0, 1]`; scales magnitudes of random changes
    pub aggressiveness: f64,
}

pub type CreateFn<T> = Box<dyn Fn(&mut MutationContext<'_>) -> T + Send + Sync>;
pub type MutateFn<T> = Box<dyn Fn(&mut MutationContext<'_>, &T) -> T + Send + Sync>;
pub type CrossFn<T> = Box<dyn Fn(&mut MutationContext<'_>, &T, &T) -> T + Send + Sync>;

/// A candidate-producing operator tagged by arity.
/// Methods never modify their parents.
pub enum MutationMethod<T> {
    /// No parents
    Create(CreateFn<T>),
    /// One parent
    Mutate(MutateFn<T>),
    /// Two parents
    Cross(CrossFn<T>),
}

impl<T> MutationMethod<T> {
    pub fn create<F>(f: F) -> Self
    where
        F: Fn(&mut MutationContext<'_>) -> T + Send + Sync + 'static,
    {
        MutationMethod::Create(Box::new(f))
    }

    pub fn mutate<F>(f: F) -> Self
    where
        F: Fn(&mut MutationContext<'_>, &T) -> T + Send + Sync + 'static,
    {
        MutationMethod::Mutate(Box::new(f))
    }

    pub fn cross<F>(f: F) -> Self
    where
        F: Fn(&mut MutationContext<'_>, &T, &T) -> T + Send + Sync + 'static,
    {
        MutationMethod::Cross(Box::new(f))
    }

    /// Number of parents consumed
    pub fn arity(&self) -> usize {
        match self {
            MutationMethod::Create(_) => 0,
            MutationMethod::Mutate(_) => 1,
            MutationMethod::Cross(_) => 2,
        }
    }
}

struct RegisteredMethod<T> {
    name: String,
    method: MutationMethod<T>,
    weight: f64,
    invocations: u64,
}

/// Registry of weighted mutation methods plus the run's random source
pub struct PoolMutator<T> {
    methods: Vec<RegisteredMethod<T>>,
    aggressiveness: f64,
    rng: ChaCha8Rng,
}

impl<T> PoolMutator<T> {
    /// Create an empty mutator with an entropy-seeded generator
    pub fn new() -> Self {
        Self::with_seed(rand::thread_rng().gen())
    }

    /// Create an empty mutator with a specific seed for reproducibility
    pub fn with_seed(seed: u64) -> Self {
        Self {
            methods: Vec::new(),
            aggressiveness: DEFAULT_AGGRESSIVENESS,
            rng: ChaCha8Rng::seed_from_u64(seed),
        }
    }

    /// Register a method with a positive relative weight
    pub fn add_method(
        &mut self,
        name: impl Into<String>,
        method: MutationMethod<T>,
        weight: f64,
    ) -> Result<()> {
        let name = name.into();
        if !(weight.is_finite() && weight > 0.0) {
            return Err(Error::Configuration(format!(
                "mutation method '{}' has non-positive weight {}",
                name, weight
            )));
        }

        self.methods.push(RegisteredMethod {
            name,
            method,
            weight,
            invocations: 0,
        });
        Ok(())
    }

    /// Builder form of [`PoolMutator::add_method`]
    pub fn with_method(
        mut self,
        name: impl Into<String>,
        method: MutationMethod<T>,
        weight: f64,
    ) -> Result<Self> {
        self.add_method(name, method, weight)?;
        Ok(self)
    }

    pub fn method_count(&self) -> usize {
        self.methods.len()
    }

    pub fn aggressiveness(&self) -> f64 {
        self.aggressiveness
    }

    /// Set aggressiveness, clamped to `[0, 1]`
    pub fn set_aggressiveness(&mut self, value: f64) {
        self.aggressiveness = if value.is_nan() { 0.0 } else { value.clamp(0.0, 1.0) };
    }

    /// How often each method has been invoked, by name
    pub fn invocations(&self) -> Vec<(&str, u64)> {
        self.methods
            .iter()
            .map(|m| (m.name.as_str(), m.invocations))
            .collect()
    }

    /// Grow `pool` to exactly `target_size` individuals.
    ///
    /// Existing individuals are kept in place at the front of the output. A
    /// target below the pool size truncates the pool.
    pub fn grow(&mut self, mut pool: Vec<T>, target_size: usize) -> Result<Vec<T>> {
        let parents = pool.len();

        if target_size <= parents {
            if target_size < parents {
                log::warn!(
                    "Growing a pool of {} to {} individuals; truncating",
                    parents,
                    target_size
                );
                pool.truncate(target_size);
            }
            return Ok(pool);
        }

        if self.methods.is_empty() {
            return Err(Error::Configuration("no mutation methods registered".to_string()));
        }

        let eligible: Vec<usize> = self
            .methods
            .iter()
            .enumerate()
            .filter(|(_, m)| m.method.arity() <= parents)
            .map(|(i, _)| i)
            .collect();

        if eligible.is_empty() {
            return Err(Error::Configuration(format!(
                "no mutation method can run on a pool of {} individuals",
                parents
            )));
        }

        let total_weight: f64 = eligible.iter().map(|&i| self.methods[i].weight).sum();

        pool.reserve(target_size - parents);
        while pool.len() < target_size {
            let index = self.pick(&eligible, total_weight);

            let child = {
                let rng = &mut self.rng;
                let method = &self.methods[index].method;
                let mut ctx = MutationContext {
                    aggressiveness: self.aggressiveness,
                    rng,
                };

                match method {
                    MutationMethod::Create(f) => f(&mut ctx),
                    MutationMethod::Mutate(f) => {
                        let a = ctx.rng.gen_range(0..parents);
                        f(&mut ctx, &pool[a])
                    }
                    MutationMethod::Cross(f) => {
                        let a = ctx.rng.gen_range(0..parents);
                        let b = ctx.rng.gen_range(0..parents);
                        f(&mut ctx, &pool[a], &pool[b])
                    }
                }
            };

            self.methods[index].invocations += 1;
            pool.push(child);
        }

        log::trace!(
            "Grew pool from {} to {} individuals",
            parents,
            target_size
        );

        Ok(pool)
    }

    /// Inverse-CDF draw over the eligible methods. Rounding at the upper
    /// boundary falls back to the last eligible method.
    fn pick(&mut self, eligible: &[usize], total_weight: f64) -> usize {
        let draw = self.rng.gen::<f64>() * total_weight;
        walk_weights(&self.methods, eligible, draw)
    }
}

/// First eligible method whose cumulative weight reaches `draw`, else the
/// last eligible one
fn walk_weights<T>(methods: &[RegisteredMethod<T>], eligible: &[usize], draw: f64) -> usize {
    let mut remaining = draw;
    for &index in eligible {
        remaining -= methods[index].weight;
        if remaining <= 0.0 {
            return index;
        }
    }
    eligible[eligible.len() - 1]
}

impl<T> Default for PoolMutator<T> {
    fn default() -> Self {
        Self::new()
    }
}
