use std::path::Path;

use config::{Config, ConfigError, Environment, File};
use serde::{Deserialize, Serialize};

use super::aggregator::AggregatorKind;
use super::attention::AttentionKind;
use super::encoder::EncoderKind;
use super::mlp::Activation;
use crate::qiqc::error::BuildError;
use crate::qiqc::sentence_features::OUT_SIZE;

/// Top-level experiment configuration: one file describes the vocabulary
/// policy, the loss weighting, the number of folds and the model itself.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExperimentConfig {
    /// Weight of the positive class in the BCE-with-logits loss
    #[serde(default = "default_pos_weight")]
    pub pos_weight: f64,

    /// Device name; only "cpu" is wired to a backend in this crate
    #[serde(default = "default_device")]
    pub device: String,

    /// Number of cross-validation folds, one model per fold
    #[serde(default = "default_cv")]
    pub cv: usize,

    /// Base seed. Fold `i` initializes its parameters with `seed + i`
    #[serde(default)]
    pub seed: u64,

    #[serde(default)]
    pub vocab: VocabConfig,

    #[serde(default)]
    pub model: ModelConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct VocabConfig {
    /// Tokens seen fewer times than this, and without a pretrained vector,
    /// share the unknown row
    #[serde(default = "default_min_count")]
    pub min_count: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ModelConfig {
    #[serde(default)]
    pub embed: EmbedConfig,

    #[serde(default)]
    pub encoder: EncoderConfig,

    #[serde(default)]
    pub mlp: ClassifierConfig,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EmbedConfig {
    /// Word2Vec fine-tuning of the embedding matrix (not supported, logged)
    #[serde(default)]
    pub finetune: bool,

    /// Extra per-token feature columns (not supported, logged)
    #[serde(default)]
    pub extra_features: Option<Vec<String>>,

    /// Scale of the Gaussian noise written into rows of unknown tokens,
    /// relative to the standard deviation of the known rows. 0 disables it
    #[serde(default)]
    pub add_noise: f64,

    /// Element-wise dropout on the embedded sequence
    #[serde(default)]
    pub dropout1d: f64,

    /// Token dropout: zeroes whole token vectors, all dimensions at once
    #[serde(default)]
    pub dropout2d: f64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncoderConfig {
    /// Recurrent encoder: "lstm", "bilstm" or "gru"
    #[serde(default = "default_encoder")]
    pub name: String,

    #[serde(default = "default_n_hidden")]
    pub n_hidden: usize,

    #[serde(default = "default_n_layers")]
    pub n_layers: usize,

    /// Sequence pooling: "max", "avg", "sum" or "last"
    #[serde(default = "default_aggregator")]
    pub aggregator: String,

    /// Optional attention over encoder states: "standard"
    #[serde(default)]
    pub attention: Option<String>,

    /// Width of the statistical sentence feature block; 0 disables it
    #[serde(default)]
    pub sentence_features: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClassifierConfig {
    #[serde(default = "default_n_hidden")]
    pub n_hidden: usize,

    #[serde(default)]
    pub dropout: f64,

    /// Hidden activation: "relu" or "gelu"
    #[serde(default = "default_activation")]
    pub activation: String,
}

fn default_pos_weight() -> f64 { 1.0 }
fn default_device() -> String { "cpu".to_string() }
fn default_cv() -> usize { 5 }
fn default_min_count() -> usize { 1 }
fn default_encoder() -> String { "bilstm".to_string() }
fn default_n_hidden() -> usize { 64 }
fn default_n_layers() -> usize { 1 }
fn default_aggregator() -> String { "max".to_string() }
fn default_activation() -> String { "relu".to_string() }

impl Default for ExperimentConfig {
    fn default() -> Self {
        Self {
            pos_weight: default_pos_weight(),
            device: default_device(),
            cv: default_cv(),
            seed: 0,
            vocab: VocabConfig::default(),
            model: ModelConfig::default(),
        }
    }
}

impl Default for VocabConfig {
    fn default() -> Self {
        Self {
            min_count: default_min_count(),
        }
    }
}

impl Default for EncoderConfig {
    fn default() -> Self {
        Self {
            name: default_encoder(),
            n_hidden: default_n_hidden(),
            n_layers: default_n_layers(),
            aggregator: default_aggregator(),
            attention: None,
            sentence_features: 0,
        }
    }
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            n_hidden: default_n_hidden(),
            dropout: 0.0,
            activation: default_activation(),
        }
    }
}

impl ExperimentConfig {
    /// Load an experiment file (format chosen by extension) and apply
    /// `QIQC_EXPERIMENT__`-prefixed environment overrides, e.g.
    /// `QIQC_EXPERIMENT__MODEL__ENCODER__N_HIDDEN=128`.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(File::from(path.as_ref()))
            .add_source(Environment::with_prefix("QIQC_EXPERIMENT").separator("__"))
            .build()?
            .try_deserialize()
    }

    pub fn validate_consistent(&self) -> Result<(), BuildError> {
        if self.cv == 0 {
            return Err(BuildError::InvalidConfig("cv must be at least 1".to_string()));
        }
        if !(self.pos_weight > 0.0 && self.pos_weight.is_finite()) {
            return Err(BuildError::InvalidConfig(format!(
                "pos_weight must be positive, got {}",
                self.pos_weight
            )));
        }
        self.model.validate_consistent()
    }
}

impl ModelConfig {
    pub fn validate_consistent(&self) -> Result<(), BuildError> {
        for (name, p) in [
            ("embed.dropout1d", self.embed.dropout1d),
            ("embed.dropout2d", self.embed.dropout2d),
            ("mlp.dropout", self.mlp.dropout),
        ] {
            if !(0.0..1.0).contains(&p) {
                return Err(BuildError::InvalidConfig(format!(
                    "{} must be in [0, 1), got {}",
                    name, p
                )));
            }
        }
        if self.embed.add_noise < 0.0 {
            return Err(BuildError::InvalidConfig(format!(
                "embed.add_noise must be non-negative, got {}",
                self.embed.add_noise
            )));
        }
        if self.encoder.n_hidden == 0 || self.encoder.n_layers == 0 || self.mlp.n_hidden == 0 {
            return Err(BuildError::InvalidConfig(
                "encoder.n_hidden, encoder.n_layers and mlp.n_hidden must be positive".to_string(),
            ));
        }
        if self.encoder.sentence_features != 0 && self.encoder.sentence_features != OUT_SIZE {
            return Err(BuildError::InvalidConfig(format!(
                "encoder.sentence_features must be 0 or {}, got {}",
                OUT_SIZE, self.encoder.sentence_features
            )));
        }

        self.encoder.name.parse::<EncoderKind>()?;
        self.mlp.activation.parse::<Activation>()?;
        self.encoder.aggregator.parse::<AggregatorKind>()?;
        if let Some(attention) = &self.encoder.attention {
            attention.parse::<AttentionKind>()?;
        }
        Ok(())
    }
}

impl EncoderConfig {
    /// Multiplier from `n_hidden` to the width of each encoder state.
    pub fn out_scale(&self) -> Result<usize, BuildError> {
        Ok(self.name.parse::<EncoderKind>()?.out_scale())
    }

    /// Width of each encoder state, which is also the attention and pooling width.
    pub fn state_size(&self) -> Result<usize, BuildError> {
        Ok(self.n_hidden * self.out_scale()?)
    }

    /// Width of the encoder module output fed to the classifier head.
    pub fn output_size(&self) -> Result<usize, BuildError> {
        Ok(self.state_size()? + self.sentence_features)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_default_config() {
        let config = ExperimentConfig::default();
        assert_eq!(config.pos_weight, 1.0);
        assert_eq!(config.device, "cpu");
        assert_eq!(config.cv, 5);
        assert_eq!(config.vocab.min_count, 1);
        assert!(!config.model.embed.finetune);
        assert!(config.model.embed.extra_features.is_none());
        assert_eq!(config.model.encoder.name, "bilstm");
        assert_eq!(config.model.encoder.aggregator, "max");
        assert!(config.model.encoder.attention.is_none());
        assert_eq!(config.model.encoder.sentence_features, 0);
        assert!(config.validate_consistent().is_ok());
    }

    #[test]
    fn test_output_size() {
        let mut encoder = EncoderConfig::default();
        encoder.n_hidden = 32;
        assert_eq!(encoder.out_scale().unwrap(), 2);
        assert_eq!(encoder.output_size().unwrap(), 64);

        encoder.name = "gru".to_string();
        encoder.sentence_features = OUT_SIZE;
        assert_eq!(encoder.output_size().unwrap(), 38);
    }

    #[test]
    fn test_validate_consistent() {
        let mut config = ExperimentConfig::default();
        config.model.embed.dropout2d = 1.0;
        assert!(config.validate_consistent().is_err());

        let mut config = ExperimentConfig::default();
        config.model.encoder.sentence_features = 3;
        assert!(config.validate_consistent().is_err());

        let mut config = ExperimentConfig::default();
        config.model.encoder.attention = Some("multihead".to_string());
        assert!(matches!(
            config.validate_consistent(),
            Err(BuildError::UnknownComponent { kind: "attention", .. })
        ));

        let mut config = ExperimentConfig::default();
        config.cv = 0;
        assert!(config.validate_consistent().is_err());

        let mut config = ExperimentConfig::default();
        config.pos_weight = 0.0;
        assert!(config.validate_consistent().is_err());
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let value = json!({
            "pos_weight": 2.5,
            "model": { "encoder": { "name": "lstm", "attention": "standard" } }
        });
        let config: ExperimentConfig = serde_json::from_value(value).unwrap();

        assert_eq!(config.pos_weight, 2.5);
        assert_eq!(config.cv, 5);
        assert_eq!(config.model.encoder.name, "lstm");
        assert_eq!(config.model.encoder.attention.as_deref(), Some("standard"));
        assert_eq!(config.model.encoder.n_hidden, 64);
        assert_eq!(config.model.mlp.n_hidden, 64);
    }
}
