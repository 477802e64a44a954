//! Error types for feature extraction, model assembly and the forward pass.

use thiserror::Error;

/// Failures of the statistical sentence-feature pipeline.
///
/// All variants are deterministic precondition violations; none of them is
/// worth retrying.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum FeatureError {
    /// The sentence has no characters or no whitespace-separated tokens, so the
    /// ratio features would divide by zero.
    #[error("invalid sentence input: {0}")]
    InvalidInput(String),

    /// `normalize` was called before statistics were fit.
    #[error("sentence feature normalizer has not been fit")]
    NotFitted,

    /// The fitting sample is empty or has zero (or non-finite) spread.
    #[error("degenerate feature distribution: {0}")]
    DegenerateDistribution(String),
}

/// Failures while resolving configuration into modules.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum BuildError {
    #[error("unknown {kind} `{name}`")]
    UnknownComponent { kind: &'static str, name: String },

    #[error("invalid configuration: {0}")]
    InvalidConfig(String),

    #[error("shape mismatch: {0}")]
    ShapeMismatch(String),
}

/// Failures of the assembled model at forward time.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("sentence features are enabled but none were supplied")]
    MissingSentenceFeatures,

    #[error("sentence feature block has {actual} columns, expected {expected}")]
    SentenceFeatureWidth { expected: usize, actual: usize },
}
