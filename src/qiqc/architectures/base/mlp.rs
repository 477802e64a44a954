//! Classification head: two linear layers with an activation and dropout in
//! between, producing one logit per example.

use std::str::FromStr;

use burn::module::{Ignored, Module};
use burn::nn::{Dropout, DropoutConfig};
use burn::prelude::*;
use burn::tensor::{Tensor, activation};

use super::layers::{DeterministicLinear, DeterministicRngContext};
use crate::qiqc::error::BuildError;

/// Activation functions available to the head
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum Activation {
    GELU,
    RELU,
}

impl FromStr for Activation {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_uppercase().as_str() {
            "GELU" => Ok(Activation::GELU),
            "RELU" => Ok(Activation::RELU),
            _ => Err(BuildError::UnknownComponent {
                kind: "activation",
                name: s.to_string(),
            }),
        }
    }
}

/// Binary classification head.
///
/// `linear1: [n_input -> n_hidden]`, activation, dropout,
/// `linear2: [n_hidden -> 1]`.
///
/// Example:
///     ```rust,no_run
///     # use burn::prelude::*;
///     # use burn_ndarray::NdArray;
///     # use qiqc_rs::qiqc::architectures::base::layers::DeterministicRngContext;
///     # use qiqc_rs::qiqc::architectures::base::mlp::{ClassifierHead, Activation};
///     # type Backend = NdArray<f32>;
///     let rng_ctx = DeterministicRngContext::<Backend>::new(0, Default::default());
///     let head = ClassifierHead::<Backend>::new(128, 64, Activation::RELU, 0.1, &rng_ctx);
///     let x = Tensor::<Backend, 2>::zeros([32, 128], rng_ctx.device());
///     let logits = head.forward(x); // [32]
///     ```
#[derive(Module, Debug)]
pub struct ClassifierHead<B: Backend> {
    pub linear1: DeterministicLinear<B>,
    pub linear2: DeterministicLinear<B>,
    dropout: Dropout,
    activation: Ignored<Activation>,
}

impl<B: Backend> ClassifierHead<B> {
    /// Seed offsets: linear1 = +100, linear2 = +101
    pub fn new(
        n_input: usize,
        n_hidden: usize,
        activation: Activation,
        dropout: f64,
        rng_ctx: &DeterministicRngContext<B>,
    ) -> Self {
        Self {
            linear1: rng_ctx.create_deterministic_linear(n_input, n_hidden, true, 100),
            linear2: rng_ctx.create_deterministic_linear(n_hidden, 1, true, 101),
            dropout: DropoutConfig::new(dropout).init(),
            activation: Ignored(activation),
        }
    }

    pub fn activation(&self) -> Activation {
        *self.activation
    }

    /// [batch, n_input] -> logits [batch]
    pub fn forward(&self, x: Tensor<B, 2>) -> Tensor<B, 1> {
        let [batch, _] = x.dims();
        let h = self.linear1.forward(x);
        let h = match *self.activation {
            Activation::GELU => activation::gelu(h),
            Activation::RELU => activation::relu(h),
        };
        let h = self.dropout.forward(h);

        self.linear2.forward(h).reshape([batch])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_activation_from_str() {
        assert_eq!("gelu".parse::<Activation>().unwrap(), Activation::GELU);
        assert_eq!("RELU".parse::<Activation>().unwrap(), Activation::RELU);
        assert!("tanh".parse::<Activation>().is_err());
    }

    #[test]
    fn test_head_forward_shape() {
        let rng_ctx = DeterministicRngContext::<TestBackend>::new(42, Default::default());
        let head = ClassifierHead::<TestBackend>::new(16, 8, Activation::GELU, 0.0, &rng_ctx);

        let x = Tensor::<TestBackend, 2>::ones([5, 16], rng_ctx.device());
        assert_eq!(head.forward(x).dims(), [5]);
        assert_eq!(head.activation(), Activation::GELU);
    }

    #[test]
    fn test_head_is_deterministic_per_seed() {
        let rng_ctx = DeterministicRngContext::<TestBackend>::new(42, Default::default());
        let a = ClassifierHead::<TestBackend>::new(4, 3, Activation::RELU, 0.5, &rng_ctx);
        let b = ClassifierHead::<TestBackend>::new(4, 3, Activation::RELU, 0.5, &rng_ctx);

        // dropout is inactive without autodiff, so outputs match exactly
        let x = Tensor::<TestBackend, 2>::ones([2, 4], rng_ctx.device());
        let diff: f32 = (a.forward(x.clone()) - b.forward(x)).abs().max().into_scalar();
        assert_eq!(diff, 0.0);
    }
}
