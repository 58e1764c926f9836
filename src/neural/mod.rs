//! Variable-topology neural networks.
//!
//! Implements directed weighted neuron graphs with:
//! - Typed neurons (input, output, hidden, constant)
//! - Sparse synapse table tolerating cycles and self-loops
//! - Simultaneous (snapshot based) propagation
//! - Structural edits with stable, opaque identities

mod activation;
mod network;
mod neuron;
mod snapshot;

pub use activation::ActivationFunction;
pub use network::{IdMap, NeuronGraph};
pub use neuron::{NeuronId, NeuronKind};
pub use snapshot::{GraphSnapshot, SynapseRecord};
