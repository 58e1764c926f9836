//! Genetics module - pool mutator, individuals, and network operators.

pub mod individual;
pub mod operators;
pub mod pool;

pub use individual::{Individual, Network};
pub use operators::{NetworkOperators, NetworkSettings, MAX_WEIGHT};
pub use pool::{MutationContext, MutationMethod, PoolMutator, DEFAULT_AGGRESSIVENESS};
