//! Activation functions applied to a neuron's accumulated synapse input.

use rand::Rng;
use serde::{Deserialize, Serialize};

/// Stateless nonlinearity of a calculateable neuron
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ActivationFunction {
    /// `y = x`
    Linear,
    /// `y = clamp(x, -1, 1)`
    LinearClamped,
    /// `y = clamp(x, 0, 1)`
    LinearClampedAtZero,
    /// `y = 1 if x >= 0.5 else 0`
    Binary,
    /// `y = 1 if x >= 0 else -1`
    SignBinary,
    /// `y = 1 / (1 + e^-x)`
    Sigmoid,
    /// `y = tanh(x)`
    Tanh,
}

impl ActivationFunction {
    /// Every variant, in declaration order
    pub const ALL: [ActivationFunction; 7] = [
        ActivationFunction::Linear,
        ActivationFunction::LinearClamped,
        ActivationFunction::LinearClampedAtZero,
        ActivationFunction::Binary,
        ActivationFunction::SignBinary,
        ActivationFunction::Sigmoid,
        ActivationFunction::Tanh,
    ];

    #[inline]
    pub fn apply(self, x: f64) -> f64 {
        match self {
            ActivationFunction::Linear => x,
            ActivationFunction::LinearClamped => {
                if x >= 1.0 {
                    1.0
                } else if x <= -1.0 {
                    -1.0
                } else {
                    x
                }
            }
            ActivationFunction::LinearClampedAtZero => {
                if x >= 1.0 {
                    1.0
                } else if x <= 0.0 {
                    0.0
                } else {
                    x
                }
            }
            ActivationFunction::Binary => {
                if x >= 0.5 {
                    1.0
                } else {
                    0.0
                }
            }
            ActivationFunction::SignBinary => {
                if x >= 0.0 {
                    1.0
                } else {
                    -1.0
                }
            }
            ActivationFunction::Sigmoid => 1.0 / (1.0 + (-x).exp()),
            ActivationFunction::Tanh => x.tanh(),
        }
    }

    /// Uniformly chosen variant
    pub fn random<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self::ALL[rng.gen_range(0..Self::ALL.len())]
    }
}

impl Default for ActivationFunction {
    fn default() -> Self {
        ActivationFunction::Linear
    }
}
