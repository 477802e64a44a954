//! Additive self-attention: `score_t = w · tanh(W h_t + b)`, softmax over the
//! real tokens of each sequence, output `h_t * alpha_t`.

use burn::{
    module::Module,
    tensor::{Tensor, activation, backend::Backend},
};

use super::Attention;
use crate::qiqc::architectures::base::layers::{DeterministicLinear, DeterministicRngContext};

/// Added to the scores of padded positions before the softmax.
const MASK_PENALTY: f32 = 1e9;

#[derive(Module, Debug)]
pub struct StandardAttention<B: Backend> {
    projection: DeterministicLinear<B>,
    context: DeterministicLinear<B>,
}

impl<B: Backend> StandardAttention<B> {
    pub fn new(n_hidden: usize, rng_ctx: &DeterministicRngContext<B>) -> Self {
        Self {
            projection: rng_ctx.create_deterministic_linear(n_hidden, n_hidden, true, 200),
            context: rng_ctx.create_deterministic_linear(n_hidden, 1, false, 201),
        }
    }

    /// Attention weights `[batch, seq]`; each row sums to 1 over its real tokens.
    pub fn weights(&self, h: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, seq, _] = h.dims();
        let scores = self
            .context
            .forward_3d(activation::tanh(self.projection.forward_3d(h)))
            .reshape([batch, seq]);
        let penalty = mask.sub_scalar(1.0).mul_scalar(MASK_PENALTY);

        activation::softmax(scores + penalty, 1)
    }
}

impl<B: Backend> Attention<B> for StandardAttention<B> {
    fn forward(&self, h: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let weights = self.weights(h.clone(), mask);
        h * weights.unsqueeze_dim(2)
    }
}
