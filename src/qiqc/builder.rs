//! Registry resolving configured component names to modules.

use burn::tensor::backend::Backend;

use crate::qiqc::architectures::base::aggregator::AggregatorKind;
use crate::qiqc::architectures::base::attention::{AttentionKind, standard::StandardAttention};
use crate::qiqc::architectures::base::config::EncoderConfig;
use crate::qiqc::architectures::base::encoder::{EncoderKind, RecurrentEncoder};
use crate::qiqc::architectures::base::layers::DeterministicRngContext;
use crate::qiqc::error::BuildError;
use crate::qiqc::sentence_features::SentenceFeatureExtractor;

/// Build the recurrent encoder named by `config.name` over `n_input` features.
pub fn build_encoder<B: Backend>(
    config: &EncoderConfig,
    n_input: usize,
    device: &B::Device,
) -> Result<RecurrentEncoder<B>, BuildError> {
    let kind: EncoderKind = config.name.parse()?;
    Ok(RecurrentEncoder::new(
        kind,
        n_input,
        config.n_hidden,
        config.n_layers,
        device,
    ))
}

/// Build the attention module named `name` over states of width `n_hidden`.
pub fn build_attention<B: Backend>(
    name: &str,
    n_hidden: usize,
    rng_ctx: &DeterministicRngContext<B>,
) -> Result<StandardAttention<B>, BuildError> {
    match name.parse::<AttentionKind>()? {
        AttentionKind::Standard => Ok(StandardAttention::new(n_hidden, rng_ctx)),
    }
}

pub fn build_aggregator(name: &str) -> Result<AggregatorKind, BuildError> {
    name.parse()
}

pub fn build_sentence_feature() -> SentenceFeatureExtractor {
    SentenceFeatureExtractor::new()
}
