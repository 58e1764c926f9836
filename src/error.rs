//! Error types for graph edits and evolution setup.

use crate::neural::NeuronId;
use thiserror::Error;

/// Kind expected by a type-checked neuron operation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExpectedKind {
    Input,
    Output,
    Calculateable,
}

impl std::fmt::Display for ExpectedKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ExpectedKind::Input => write!(f, "input"),
            ExpectedKind::Output => write!(f, "output"),
            ExpectedKind::Calculateable => write!(f, "calculateable"),
        }
    }
}

/// Errors surfaced by the engine. All are local and synchronous; a failed
/// edit leaves the graph untouched.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum Error {
    #[error("neuron {0} is not a member of this graph")]
    UnknownNeuron(NeuronId),

    #[error("neuron {id} is not of kind {expected}")]
    WrongKind { id: NeuronId, expected: ExpectedKind },

    #[error("neuron {0} is an input or constant neuron and cannot be a synapse target")]
    InvalidTarget(NeuronId),

    #[error("synapse weight is not a number")]
    InvalidNumber,

    #[error("neuron {0} does not exist or is not removable")]
    NotFound(NeuronId),

    #[error("configuration error: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, Error>;
