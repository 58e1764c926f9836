//! Neuron identities and kinds.

use super::activation::ActivationFunction;
use serde::{Deserialize, Serialize};
use std::sync::atomic::{AtomicU64, Ordering};

/// Process-wide identity counter; the only shared mutable state of the engine.
static NEXT_NEURON_ID: AtomicU64 = AtomicU64::new(0);

/// Opaque, stable identity of a neuron.
///
/// Identities are unique across every graph in the process and increase
/// monotonically, so ordering by id is ordering by allocation time.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct NeuronId(u64);

impl NeuronId {
    /// Allocate a fresh identity (safe under concurrent allocation)
    pub(crate) fn fresh() -> Self {
        NeuronId(NEXT_NEURON_ID.fetch_add(1, Ordering::Relaxed))
    }
}

impl std::fmt::Display for NeuronId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Kind of a neuron with its kind-specific payload
#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub enum NeuronKind {
    /// Externally driven; never a synapse target
    Input,
    /// Calculateable and externally readable
    Output(ActivationFunction),
    /// Internal calculateable neuron
    Hidden(ActivationFunction),
    /// Fixed value supplier; never a synapse target
    Constant(f64),
}

impl NeuronKind {
    /// Whether a synapse may point at a neuron of this kind
    #[inline]
    pub fn accepts_synapses(&self) -> bool {
        matches!(self, NeuronKind::Output(_) | NeuronKind::Hidden(_))
    }

    /// Activation function of calculateable kinds
    #[inline]
    pub fn activation(&self) -> Option<ActivationFunction> {
        match self {
            NeuronKind::Output(f) | NeuronKind::Hidden(f) => Some(*f),
            _ => None,
        }
    }

    /// Hidden and constant neurons; the only ones operators may add or remove
    #[inline]
    pub fn is_inner(&self) -> bool {
        matches!(self, NeuronKind::Hidden(_) | NeuronKind::Constant(_))
    }

    #[inline]
    pub fn is_input(&self) -> bool {
        matches!(self, NeuronKind::Input)
    }

    #[inline]
    pub fn is_output(&self) -> bool {
        matches!(self, NeuronKind::Output(_))
    }
}

/// A neuron slot: kind plus current value
#[derive(Clone, Copy, Debug)]
pub(crate) struct Neuron {
    pub kind: NeuronKind,
    pub value: f64,
}

impl Neuron {
    pub fn new(kind: NeuronKind) -> Self {
        let value = match kind {
            NeuronKind::Constant(v) => v,
            _ => 0.0,
        };
        Self { kind, value }
    }

    /// Zero the stored value; constants keep theirs
    pub fn reset(&mut self) {
        if let NeuronKind::Constant(v) = self.kind {
            self.value = v;
        } else {
            self.value = 0.0;
        }
    }
}
