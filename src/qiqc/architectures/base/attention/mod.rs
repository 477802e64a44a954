//! Attention over encoder states

use std::str::FromStr;

use burn::prelude::*;

use crate::qiqc::error::BuildError;

/// Base trait for attention layers
pub trait Attention<B: Backend> {
    /// Re-weights encoder states
    ///
    /// # Arguments
    /// * `h` - [batch, seq, n_hidden] encoder states
    /// * `mask` - [batch, seq] where 1.0 = token, 0.0 = padding (never attended)
    ///
    /// Returns a tensor with the same shape as `h`.
    fn forward(&self, h: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AttentionKind {
    Standard,
}

impl FromStr for AttentionKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "standard" => Ok(AttentionKind::Standard),
            _ => Err(BuildError::UnknownComponent {
                kind: "attention",
                name: s.to_string(),
            }),
        }
    }
}

pub mod standard;
