//! Recurrent-encoder experiment: one frozen-embedding classifier per fold.

use burn::nn::DropoutConfig;
use burn::tensor::{Tensor, backend::Backend};

use crate::qiqc::architectures::base::config::{ExperimentConfig, ModelConfig};
use crate::qiqc::architectures::base::layers::{DeterministicRngContext, PretrainedEmbedding};
use crate::qiqc::architectures::base::mlp::{Activation, ClassifierHead};
use crate::qiqc::architectures::base::model::{BinaryClassifier, Encoder};
use crate::qiqc::builder::{build_aggregator, build_attention, build_encoder, build_sentence_feature};
use crate::qiqc::error::{BuildError, FeatureError};
use crate::qiqc::sentence_features::SentenceFeatureExtractor;
use crate::qiqc::word_features::{Vocabulary, WordFeature};

/// Seed offset separating embedding noise from parameter initialization.
const EMBEDDING_NOISE_OFFSET: u64 = 300;

/// Build `config.cv` classifiers and return them with the ids of tokens that
/// had no pretrained vector.
///
/// Each fold gets its own seed (`config.seed + fold`), so the noise written
/// into unknown rows and the head/attention weights differ between folds
/// while staying reproducible.
pub fn build_models<B: Backend>(
    config: &ExperimentConfig,
    vocab: &Vocabulary,
    pretrained: &[Vec<Vec<f32>>],
    device: &B::Device,
) -> Result<(Vec<BinaryClassifier<B>>, Vec<usize>), BuildError> {
    config.validate_consistent()?;

    let embed = &config.model.embed;
    if embed.finetune {
        log::warn!("embed.finetune is set but embedding fine-tuning is not supported; using pretrained vectors as-is");
    }
    if let Some(extra) = &embed.extra_features {
        log::warn!("ignoring unsupported embed.extra_features {:?}", extra);
    }

    let word_features = WordFeature::new(vocab, pretrained, config.vocab.min_count)?;

    let mut models = Vec::with_capacity(config.cv);
    for fold in 0..config.cv {
        let rng_ctx = DeterministicRngContext::<B>::new(config.seed, device.clone()).fork(fold as u64);
        let vectors = word_features.build_feature(
            embed.add_noise,
            &mut rng_ctx.next_std_rng(EMBEDDING_NOISE_OFFSET),
        );
        let embedding = PretrainedEmbedding::from_rows(&vectors, true, device);
        models.push(build_model(&config.model, embedding, config.pos_weight, &rng_ctx)?);
        log::debug!("built model for fold {}/{}", fold + 1, config.cv);
    }

    Ok((models, word_features.unk().to_vec()))
}

/// Assemble a single classifier around `embedding`.
///
/// The encoder input width comes from the embedding dimension.
pub fn build_model<B: Backend>(
    config: &ModelConfig,
    embedding: PretrainedEmbedding<B>,
    pos_weight: f64,
    rng_ctx: &DeterministicRngContext<B>,
) -> Result<BinaryClassifier<B>, BuildError> {
    config.validate_consistent()?;
    let device = rng_ctx.device();
    let encoder_config = &config.encoder;

    let encoder = build_encoder(encoder_config, embedding.embedding_dim(), device)?;
    let attention = encoder_config
        .attention
        .as_deref()
        .map(|name| build_attention(name, encoder.output_size(), rng_ctx))
        .transpose()?;
    let aggregator = build_aggregator(&encoder_config.aggregator)?;
    let dropout1d = (config.embed.dropout1d > 0.0)
        .then(|| DropoutConfig::new(config.embed.dropout1d).init());

    let encoder = Encoder::new(
        embedding,
        dropout1d,
        config.embed.dropout2d,
        encoder,
        attention,
        aggregator,
        encoder_config.sentence_features,
    );

    let activation: Activation = config.mlp.activation.parse()?;
    let head = ClassifierHead::new(
        encoder.output_size(),
        config.mlp.n_hidden,
        activation,
        config.mlp.dropout,
        rng_ctx,
    );

    Ok(BinaryClassifier::new(encoder, head, pos_weight))
}

/// Fit the sentence feature block on `sentences` when the model consumes one.
///
/// With `encoder.sentence_features == 0` the extractor is never built and the
/// sentences are not inspected; the caller passes `None` to the forward pass.
/// Otherwise returns the fitted extractor, for scaling later batches, and the
/// normalized `[sentences.len(), OUT_SIZE]` block.
pub fn fit_sentence_features<B: Backend, S: AsRef<str>>(
    config: &ModelConfig,
    sentences: &[S],
    device: &B::Device,
) -> Result<Option<(SentenceFeatureExtractor, Tensor<B, 2>)>, FeatureError> {
    if config.encoder.sentence_features == 0 {
        return Ok(None);
    }

    let mut extractor = build_sentence_feature();
    let raw = extractor.extract_batch(sentences)?;
    let normalized = extractor.fit_and_normalize(&raw)?;
    let block = SentenceFeatureExtractor::to_tensor(&normalized, device);
    Ok(Some((extractor, block)))
}
