//! Statistical sentence features.
//!
//! Each sentence is summarised by six hand-crafted scalars which are
//! concatenated, per example, with the pooled encoder output before the
//! classification head. Scaling uses a single scalar mean and standard
//! deviation computed over the pooled values of a reference sample.
//!
//! The pipeline is split in two:
//!
//! - [`StatisticSentenceFeature`]: stateless sentence -> [`FeatureVector`].
//! - [`SentenceFeatureNormalizer`]: `Unfitted` until statistics are fit, then
//!   `Fitted(FittedNormalizer)`. Only a [`FittedNormalizer`] can scale
//!   vectors infallibly.
//!
//! [`SentenceFeatureExtractor`] composes both for callers that want one object.

use std::collections::HashSet;

use burn::tensor::{Tensor, backend::Backend};
use serde::{Deserialize, Serialize};

use super::error::FeatureError;

/// Width of the feature block appended to the encoder output.
pub const OUT_SIZE: usize = 6;

/// Fixed-order feature vector, see [`SentenceStatistics::NAMES`].
pub type FeatureVector = [f32; OUT_SIZE];

/// Raw per-sentence statistics before they are flattened into a vector.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SentenceStatistics {
    /// Unicode scalar values, whitespace included.
    pub n_chars: usize,
    pub n_caps: usize,
    pub caps_rate: f32,
    pub n_words: usize,
    pub unique_words: usize,
    pub unique_rate: f32,
}

impl SentenceStatistics {
    /// Field names in vector order.
    pub const NAMES: [&'static str; OUT_SIZE] = [
        "n_chars",
        "n_caps",
        "caps_rate",
        "n_words",
        "unique_words",
        "unique_rate",
    ];

    /// Compute statistics for one sentence.
    ///
    /// Empty and whitespace-only sentences are rejected with
    /// [`FeatureError::InvalidInput`] instead of producing non-finite ratios.
    pub fn from_sentence(sentence: &str) -> Result<Self, FeatureError> {
        let n_chars = sentence.chars().count();
        if n_chars == 0 {
            return Err(FeatureError::InvalidInput("sentence is empty".to_string()));
        }

        let tokens: Vec<&str> = sentence.split_whitespace().collect();
        if tokens.is_empty() {
            return Err(FeatureError::InvalidInput(format!(
                "sentence of {} characters contains no tokens",
                n_chars
            )));
        }

        let n_caps = sentence.chars().filter(|c| c.is_uppercase()).count();
        let n_words = tokens.len();
        let unique_words = tokens.iter().collect::<HashSet<_>>().len();

        Ok(Self {
            n_chars,
            n_caps,
            caps_rate: n_caps as f32 / n_chars as f32,
            n_words,
            unique_words,
            unique_rate: unique_words as f32 / n_words as f32,
        })
    }

    pub fn to_vector(&self) -> FeatureVector {
        [
            self.n_chars as f32,
            self.n_caps as f32,
            self.caps_rate,
            self.n_words as f32,
            self.unique_words as f32,
            self.unique_rate,
        ]
    }
}

/// Stateless sentence -> feature vector extractor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct StatisticSentenceFeature;

impl StatisticSentenceFeature {
    pub const OUT_SIZE: usize = OUT_SIZE;

    pub fn new() -> Self {
        Self
    }

    pub fn out_size(&self) -> usize {
        Self::OUT_SIZE
    }

    pub fn extract(&self, sentence: &str) -> Result<FeatureVector, FeatureError> {
        SentenceStatistics::from_sentence(sentence).map(|stats| stats.to_vector())
    }

    /// Extract every sentence, failing on the first invalid one.
    pub fn extract_batch<S: AsRef<str>>(
        &self,
        sentences: &[S],
    ) -> Result<Vec<FeatureVector>, FeatureError> {
        sentences
            .iter()
            .map(|sentence| self.extract(sentence.as_ref()))
            .collect()
    }
}

/// Scalar statistics captured from a reference sample.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct FittedNormalizer {
    mean: f32,
    std: f32,
}

impl FittedNormalizer {
    /// Fit mean and population standard deviation over every scalar of every
    /// vector in `features`.
    pub fn fit(features: &[FeatureVector]) -> Result<Self, FeatureError> {
        let count = features.len() * OUT_SIZE;
        if count == 0 {
            return Err(FeatureError::DegenerateDistribution(
                "cannot fit statistics on an empty sample".to_string(),
            ));
        }

        let values = || features.iter().flat_map(|v| v.iter().map(|&x| x as f64));
        let mean = values().sum::<f64>() / count as f64;
        let variance = values().map(|x| (x - mean).powi(2)).sum::<f64>() / count as f64;
        let std = variance.sqrt();

        if !mean.is_finite() || !std.is_finite() {
            return Err(FeatureError::DegenerateDistribution(format!(
                "non-finite statistics (mean={}, std={})",
                mean, std
            )));
        }
        if std == 0.0 {
            return Err(FeatureError::DegenerateDistribution(format!(
                "zero variance over {} values (mean={})",
                count, mean
            )));
        }

        Ok(Self {
            mean: mean as f32,
            std: std as f32,
        })
    }

    pub fn mean(&self) -> f32 {
        self.mean
    }

    pub fn std(&self) -> f32 {
        self.std
    }

    pub fn normalize_one(&self, features: &FeatureVector) -> FeatureVector {
        features.map(|x| (x - self.mean) / self.std)
    }

    pub fn normalize(&self, features: &[FeatureVector]) -> Vec<FeatureVector> {
        features.iter().map(|v| self.normalize_one(v)).collect()
    }
}

/// Normalization state: absent until fit, replaced wholesale on every refit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
pub enum SentenceFeatureNormalizer {
    #[default]
    Unfitted,
    Fitted(FittedNormalizer),
}

impl SentenceFeatureNormalizer {
    pub fn new() -> Self {
        Self::Unfitted
    }

    pub fn is_fitted(&self) -> bool {
        matches!(self, Self::Fitted(_))
    }

    pub fn fitted(&self) -> Option<&FittedNormalizer> {
        match self {
            Self::Fitted(fitted) => Some(fitted),
            Self::Unfitted => None,
        }
    }

    /// Fit on `features`, store the statistics and return the scaled sample.
    ///
    /// Refitting overwrites earlier statistics. A failed fit leaves the
    /// previous state untouched.
    pub fn fit_and_normalize(
        &mut self,
        features: &[FeatureVector],
    ) -> Result<Vec<FeatureVector>, FeatureError> {
        let fitted = FittedNormalizer::fit(features)?;
        log::debug!(
            "fit sentence feature statistics over {} vectors: mean={:.4}, std={:.4}",
            features.len(),
            fitted.mean(),
            fitted.std()
        );
        *self = Self::Fitted(fitted);
        Ok(fitted.normalize(features))
    }

    pub fn normalize(&self, features: &[FeatureVector]) -> Result<Vec<FeatureVector>, FeatureError> {
        self.fitted()
            .map(|fitted| fitted.normalize(features))
            .ok_or(FeatureError::NotFitted)
    }
}

/// Extractor plus normalization state owned by one model configuration.
#[derive(Debug, Clone, Default)]
pub struct SentenceFeatureExtractor {
    extractor: StatisticSentenceFeature,
    normalizer: SentenceFeatureNormalizer,
}

impl SentenceFeatureExtractor {
    pub const OUT_SIZE: usize = OUT_SIZE;

    pub fn new() -> Self {
        Self::default()
    }

    pub fn out_size(&self) -> usize {
        Self::OUT_SIZE
    }

    pub fn extract(&self, sentence: &str) -> Result<FeatureVector, FeatureError> {
        self.extractor.extract(sentence)
    }

    pub fn extract_batch<S: AsRef<str>>(
        &self,
        sentences: &[S],
    ) -> Result<Vec<FeatureVector>, FeatureError> {
        self.extractor.extract_batch(sentences)
    }

    pub fn fit_and_normalize(
        &mut self,
        features: &[FeatureVector],
    ) -> Result<Vec<FeatureVector>, FeatureError> {
        self.normalizer.fit_and_normalize(features)
    }

    pub fn normalize(&self, features: &[FeatureVector]) -> Result<Vec<FeatureVector>, FeatureError> {
        self.normalizer.normalize(features)
    }

    pub fn normalizer(&self) -> &SentenceFeatureNormalizer {
        &self.normalizer
    }

    /// Pack vectors into a `[batch, OUT_SIZE]` tensor for concatenation with
    /// the pooled encoder output.
    pub fn to_tensor<B: Backend>(features: &[FeatureVector], device: &B::Device) -> Tensor<B, 2> {
        let flat: Vec<f32> = features.iter().flat_map(|v| v.iter().copied()).collect();
        Tensor::<B, 1>::from_floats(flat.as_slice(), device).reshape([features.len(), OUT_SIZE])
    }
}
