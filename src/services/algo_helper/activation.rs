use serde::{Deserialize, Serialize};

/// Scalar activation functions.
///
/// Every derivative is expressed in terms of the activated output `y = f(x)`,
/// which is what the network caches per neuron during the forward pass.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub enum Activation {
    /// `1 / (1 + e^-x)`, bounded by (0, 1)
    BinarySigmoid,
    /// `2 / (1 + e^-x) - 1`, bounded by (-1, 1)
    BipolarSigmoid,
    Tanh,
    Linear,
}

impl Activation {
    pub fn apply(self, x: f64) -> f64 {
        match self {
            Activation::BinarySigmoid => 1.0 / (1.0 + (-x).exp()),
            Activation::BipolarSigmoid => 2.0 / (1.0 + (-x).exp()) - 1.0,
            Activation::Tanh => x.tanh(),
            Activation::Linear => x,
        }
    }

    /// Derivative evaluated from the output `y`.
    pub fn derivative(self, y: f64) -> f64 {
        match self {
            Activation::BinarySigmoid => y * (1.0 - y),
            Activation::BipolarSigmoid => 0.5 * (1.0 - y) * (1.0 + y),
            Activation::Tanh => 1.0 - y * y,
            Activation::Linear => 1.0,
        }
    }
}
