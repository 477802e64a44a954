//! Masked sequence pooling: [batch, seq, hidden] -> [batch, hidden]

use std::str::FromStr;

use burn::tensor::{Int, Tensor, backend::Backend};

use crate::qiqc::error::BuildError;

/// Offset applied to padded states before max pooling.
const MASK_PENALTY: f32 = 1e9;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AggregatorKind {
    Max,
    Avg,
    Sum,
    Last,
}

impl FromStr for AggregatorKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "max" => Ok(AggregatorKind::Max),
            "avg" | "mean" => Ok(AggregatorKind::Avg),
            "sum" => Ok(AggregatorKind::Sum),
            "last" => Ok(AggregatorKind::Last),
            _ => Err(BuildError::UnknownComponent {
                kind: "aggregator",
                name: s.to_string(),
            }),
        }
    }
}

impl AggregatorKind {
    /// Pool `h` over the sequence axis, ignoring positions where `mask` is 0.
    ///
    /// Fully padded rows pool to zeros for every aggregator.
    pub fn aggregate<B: Backend>(&self, h: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 2> {
        let [batch, _, hidden] = h.dims();
        let step_mask: Tensor<B, 3> = mask.clone().unsqueeze_dim(2);
        let lengths: Tensor<B, 2> = mask.sum_dim(1);

        match self {
            AggregatorKind::Max => {
                let penalty = step_mask.clone().sub_scalar(1.0).mul_scalar(MASK_PENALTY);
                let pooled = (h + penalty).max_dim(1).reshape([batch, hidden]);
                // rows without tokens would otherwise pool to -MASK_PENALTY
                let has_tokens = lengths.clamp_max(1.0);
                pooled * has_tokens
            }
            AggregatorKind::Sum => (h * step_mask).sum_dim(1).reshape([batch, hidden]),
            AggregatorKind::Avg => {
                let summed = (h * step_mask).sum_dim(1).reshape([batch, hidden]);
                summed / lengths.clamp_min(1.0)
            }
            AggregatorKind::Last => {
                let last: Tensor<B, 3, Int> = lengths
                    .sub_scalar(1.0)
                    .clamp_min(0.0)
                    .int()
                    .reshape([batch, 1, 1])
                    .repeat_dim(2, hidden);
                (h * step_mask).gather(1, last).reshape([batch, hidden])
            }
        }
    }
}
