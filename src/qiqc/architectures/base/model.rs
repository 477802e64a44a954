//! Assembled model: embedding -> dropout -> recurrent encoder -> attention ->
//! pooling -> optional sentence features -> classification head.

use burn::{
    module::{Ignored, Module},
    nn::Dropout,
    tensor::{Int, Tensor, activation, backend::Backend},
};

use super::aggregator::AggregatorKind;
use super::attention::{Attention, standard::StandardAttention};
use super::encoder::RecurrentEncoder;
use super::layers::{PretrainedEmbedding, spatial_dropout};
use super::loss_utils::binary_cross_entropy_with_logits;
use super::mlp::ClassifierHead;
use crate::qiqc::error::ModelError;

/// Right-pad token id sequences with `pad_id` into a [batch, max_len] Int tensor.
///
/// Sequences longer than `max_len` are truncated.
pub fn pad_token_ids<B: Backend>(
    sequences: &[Vec<i64>],
    max_len: usize,
    pad_id: i64,
    device: &B::Device,
) -> Tensor<B, 2, Int> {
    let mut data: Vec<i64> = Vec::with_capacity(sequences.len() * max_len);
    for sequence in sequences {
        data.extend(sequence.iter().take(max_len));
        data.extend(std::iter::repeat_n(pad_id, max_len.saturating_sub(sequence.len())));
    }
    Tensor::<B, 1, Int>::from_ints(data.as_slice(), device).reshape([sequences.len(), max_len])
}

/// Float mask [batch, seq]: 1.0 where `tokens != pad_id`.
pub fn padding_mask<B: Backend>(tokens: Tensor<B, 2, Int>, pad_id: i64) -> Tensor<B, 2> {
    tokens.not_equal_elem(pad_id).float()
}

/// Sentence encoder producing one fixed-width vector per example.
#[derive(Module, Debug)]
pub struct Encoder<B: Backend> {
    embedding: PretrainedEmbedding<B>,
    dropout1d: Option<Dropout>,
    dropout2d: Ignored<f64>,
    encoder: RecurrentEncoder<B>,
    attention: Option<StandardAttention<B>>,
    aggregator: Ignored<AggregatorKind>,
    sentence_features: Ignored<usize>,
}

impl<B: Backend> Encoder<B> {
    pub fn new(
        embedding: PretrainedEmbedding<B>,
        dropout1d: Option<Dropout>,
        dropout2d: f64,
        encoder: RecurrentEncoder<B>,
        attention: Option<StandardAttention<B>>,
        aggregator: AggregatorKind,
        sentence_features: usize,
    ) -> Self {
        Self {
            embedding,
            dropout1d,
            dropout2d: Ignored(dropout2d),
            encoder,
            attention,
            aggregator: Ignored(aggregator),
            sentence_features: Ignored(sentence_features),
        }
    }

    pub fn embedding(&self) -> &PretrainedEmbedding<B> {
        &self.embedding
    }

    pub fn has_attention(&self) -> bool {
        self.attention.is_some()
    }

    pub fn aggregator(&self) -> AggregatorKind {
        *self.aggregator
    }

    pub fn output_size(&self) -> usize {
        self.encoder.output_size() + *self.sentence_features
    }

    /// # Arguments
    /// * `tokens` - [batch, seq] token ids
    /// * `sentence_features` - [batch, sentence_features] normalized block,
    ///   required iff the block width is non-zero
    /// * `mask` - [batch, seq], 1.0 for real tokens
    ///
    /// Returns [batch, output_size].
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        sentence_features: Option<Tensor<B, 2>>,
        mask: Tensor<B, 2>,
    ) -> Result<Tensor<B, 2>, ModelError> {
        let mut h = self.embedding.forward(tokens);
        if let Some(dropout) = &self.dropout1d {
            h = dropout.forward(h);
        }
        h = spatial_dropout(h, *self.dropout2d);

        h = self.encoder.forward(h, mask.clone());
        if let Some(attention) = &self.attention {
            h = attention.forward(h, mask.clone());
        }
        let pooled = self.aggregator.aggregate(h, mask);

        let expected = *self.sentence_features;
        if expected == 0 {
            return Ok(pooled);
        }
        let features = sentence_features.ok_or(ModelError::MissingSentenceFeatures)?;
        let actual = features.dims()[1];
        if actual != expected {
            return Err(ModelError::SentenceFeatureWidth { expected, actual });
        }
        Ok(Tensor::cat(vec![pooled, features], 1))
    }
}

/// Encoder plus classification head, trained with weighted BCE on logits.
#[derive(Module, Debug)]
pub struct BinaryClassifier<B: Backend> {
    encoder: Encoder<B>,
    head: ClassifierHead<B>,
    pos_weight: Ignored<f64>,
}

impl<B: Backend> BinaryClassifier<B> {
    pub fn new(encoder: Encoder<B>, head: ClassifierHead<B>, pos_weight: f64) -> Self {
        Self {
            encoder,
            head,
            pos_weight: Ignored(pos_weight),
        }
    }

    pub fn encoder(&self) -> &Encoder<B> {
        &self.encoder
    }

    pub fn pos_weight(&self) -> f64 {
        *self.pos_weight
    }

    /// Logits [batch]
    pub fn forward(
        &self,
        tokens: Tensor<B, 2, Int>,
        sentence_features: Option<Tensor<B, 2>>,
        mask: Tensor<B, 2>,
    ) -> Result<Tensor<B, 1>, ModelError> {
        let h = self.encoder.forward(tokens, sentence_features, mask)?;
        Ok(self.head.forward(h))
    }

    /// Weighted BCE of `logits` against `targets` ([batch], values in {0, 1}).
    pub fn loss(&self, logits: Tensor<B, 1>, targets: Tensor<B, 1>) -> Tensor<B, 1> {
        binary_cross_entropy_with_logits(logits, targets, *self.pos_weight)
    }

    /// Positive-class probabilities [batch]
    pub fn predict_proba(
        &self,
        tokens: Tensor<B, 2, Int>,
        sentence_features: Option<Tensor<B, 2>>,
        mask: Tensor<B, 2>,
    ) -> Result<Tensor<B, 1>, ModelError> {
        Ok(activation::sigmoid(self.forward(tokens, sentence_features, mask)?))
    }
}
