//! qiqc-rs: recurrent text classifier assembled from configurable burn modules,
//! with optional statistical sentence features.

pub mod qiqc;

pub use qiqc::error::{BuildError, FeatureError, ModelError};
pub use qiqc::settings::{Settings, settings};
pub use qiqc::sentence_features::{
    FeatureVector, FittedNormalizer, SentenceFeatureExtractor, SentenceFeatureNormalizer,
    StatisticSentenceFeature,
};

/// Test utilities for backend-aware tensor construction
///
/// Provides helper functions for creating token, mask and feature tensors
/// using the Vec<T> + .as_slice() pattern required by Burn 0.18.
pub mod test_utils;
