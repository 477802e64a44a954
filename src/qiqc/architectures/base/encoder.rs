//! Recurrent sequence encoders.
//!
//! Inputs are batch-first `[batch, seq, n_input]` with a right-padded float
//! mask `[batch, seq]` (1 = token, 0 = padding). Outputs are
//! `[batch, seq, n_hidden * out_scale]` with padded positions zeroed. The
//! backward direction of `bilstm` runs over each row reversed within its own
//! length, so states at real positions never depend on how much padding
//! follows them.

use std::str::FromStr;

use burn::{
    module::{Ignored, Module},
    nn::{
        Lstm, LstmConfig,
        gru::{Gru, GruConfig},
    },
    tensor::{Int, Tensor, backend::Backend},
};

use crate::qiqc::error::BuildError;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EncoderKind {
    Lstm,
    BiLstm,
    Gru,
}

impl EncoderKind {
    pub fn out_scale(&self) -> usize {
        match self {
            EncoderKind::BiLstm => 2,
            EncoderKind::Lstm | EncoderKind::Gru => 1,
        }
    }
}

impl FromStr for EncoderKind {
    type Err = BuildError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "lstm" => Ok(EncoderKind::Lstm),
            "bilstm" | "bi_lstm" => Ok(EncoderKind::BiLstm),
            "gru" => Ok(EncoderKind::Gru),
            _ => Err(BuildError::UnknownComponent {
                kind: "encoder",
                name: s.to_string(),
            }),
        }
    }
}

/// Stack of recurrent layers of one kind.
///
/// Only the vectors matching `kind` are populated; the others stay empty so
/// the struct can derive `Module` without an enum of modules. A `bilstm` layer
/// is the pair `bilstm_forward[i]`, `bilstm_backward[i]`.
#[derive(Module, Debug)]
pub struct RecurrentEncoder<B: Backend> {
    lstm: Vec<Lstm<B>>,
    bilstm_forward: Vec<Lstm<B>>,
    bilstm_backward: Vec<Lstm<B>>,
    gru: Vec<Gru<B>>,
    kind: Ignored<EncoderKind>,
    n_hidden: Ignored<usize>,
}

impl<B: Backend> RecurrentEncoder<B> {
    pub fn new(
        kind: EncoderKind,
        n_input: usize,
        n_hidden: usize,
        n_layers: usize,
        device: &B::Device,
    ) -> Self {
        let mut lstm = Vec::new();
        let mut bilstm_forward = Vec::new();
        let mut bilstm_backward = Vec::new();
        let mut gru = Vec::new();

        for layer in 0..n_layers {
            let d_input = if layer == 0 {
                n_input
            } else {
                n_hidden * kind.out_scale()
            };
            match kind {
                EncoderKind::Lstm => lstm.push(LstmConfig::new(d_input, n_hidden, true).init(device)),
                EncoderKind::BiLstm => {
                    bilstm_forward.push(LstmConfig::new(d_input, n_hidden, true).init(device));
                    bilstm_backward.push(LstmConfig::new(d_input, n_hidden, true).init(device));
                }
                EncoderKind::Gru => gru.push(GruConfig::new(d_input, n_hidden, true).init(device)),
            }
        }

        Self {
            lstm,
            bilstm_forward,
            bilstm_backward,
            gru,
            kind: Ignored(kind),
            n_hidden: Ignored(n_hidden),
        }
    }

    pub fn kind(&self) -> EncoderKind {
        *self.kind
    }

    pub fn n_layers(&self) -> usize {
        self.lstm.len() + self.bilstm_forward.len() + self.gru.len()
    }

    pub fn output_size(&self) -> usize {
        *self.n_hidden * self.kind.out_scale()
    }

    pub fn forward(&self, x: Tensor<B, 3>, mask: Tensor<B, 2>) -> Tensor<B, 3> {
        let step_mask: Tensor<B, 3> = mask.clone().unsqueeze_dim(2);
        let mut h = x;

        for layer in &self.lstm {
            let (out, _) = layer.forward(h, None);
            h = out * step_mask.clone();
        }
        if !self.bilstm_forward.is_empty() {
            let reversed = length_reversed_indices(mask);
            for (forward, backward) in self.bilstm_forward.iter().zip(&self.bilstm_backward) {
                let (ahead, _) = forward.forward(h.clone(), None);
                let (behind, _) = backward.forward(reverse_rows(h, reversed.clone()), None);
                let behind = reverse_rows(behind, reversed.clone());
                h = Tensor::cat(vec![ahead, behind], 2) * step_mask.clone();
            }
        }
        for layer in &self.gru {
            h = layer.forward(h, None) * step_mask.clone();
        }

        h
    }
}

/// Per-row time indices `[batch, seq]` that reverse the first `length` steps
/// of each row and leave the padded tail in place.
///
/// Position `t` of a row with `length` real tokens maps to `length - 1 - t`
/// when `t < length`, else to `t`. The mapping is its own inverse.
pub fn length_reversed_indices<B: Backend>(mask: Tensor<B, 2>) -> Tensor<B, 2, Int> {
    let [batch, seq] = mask.dims();
    let lengths: Tensor<B, 2> = mask.clone().sum_dim(1).repeat_dim(1, seq);
    let positions: Tensor<B, 2> = Tensor::<B, 1, Int>::arange(0..seq as i64, &mask.device())
        .float()
        .unsqueeze_dim::<2>(0)
        .repeat_dim(0, batch);

    let flipped = lengths.sub_scalar(1.0) - positions.clone();
    let keep = mask.clone().neg().add_scalar(1.0);
    (flipped * mask + positions * keep).int()
}

/// Permute the time axis of `h` [batch, seq, dim] by `indices` [batch, seq].
fn reverse_rows<B: Backend>(h: Tensor<B, 3>, indices: Tensor<B, 2, Int>) -> Tensor<B, 3> {
    let [_, _, dim] = h.dims();
    let indices: Tensor<B, 3, Int> = indices.unsqueeze_dim(2);
    h.gather(1, indices.repeat_dim(2, dim))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_utils::mask_from_lengths;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_encoder_kind_from_str() {
        assert_eq!("LSTM".parse::<EncoderKind>().unwrap(), EncoderKind::Lstm);
        assert_eq!("bilstm".parse::<EncoderKind>().unwrap(), EncoderKind::BiLstm);
        assert_eq!("gru".parse::<EncoderKind>().unwrap(), EncoderKind::Gru);
        assert!("transformer".parse::<EncoderKind>().is_err());
    }

    #[test]
    fn test_encoder_output_shapes() {
        let device = Default::default();
        for (kind, scale) in [
            (EncoderKind::Lstm, 1),
            (EncoderKind::BiLstm, 2),
            (EncoderKind::Gru, 1),
        ] {
            let encoder = RecurrentEncoder::<TestBackend>::new(kind, 6, 5, 2, &device);
            assert_eq!(encoder.n_layers(), 2);

            let x = Tensor::<TestBackend, 3>::ones([3, 4, 6], &device);
            let mask = mask_from_lengths::<TestBackend>(&[4, 4, 4], 4, &device);
            let out = encoder.forward(x, mask);

            assert_eq!(out.dims(), [3, 4, 5 * scale]);
            assert_eq!(encoder.output_size(), 5 * scale);
        }
    }

    #[test]
    fn test_encoder_zeroes_padding() {
        let device = Default::default();
        let encoder = RecurrentEncoder::<TestBackend>::new(EncoderKind::BiLstm, 3, 4, 1, &device);
        let x = Tensor::<TestBackend, 3>::ones([2, 5, 3], &device);
        let mask = mask_from_lengths::<TestBackend>(&[5, 2], 5, &device);

        let out = encoder.forward(x, mask);
        let values: Vec<f32> = out.into_data().to_vec().unwrap();
        let second = &values[5 * 8..];
        assert!(second[2 * 8..].iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_length_reversed_indices() {
        let device = Default::default();
        let mask = mask_from_lengths::<TestBackend>(&[4, 2, 0], 4, &device);

        let indices: Vec<i64> = length_reversed_indices(mask).into_data().to_vec().unwrap();
        assert_eq!(indices, vec![3, 2, 1, 0, 1, 0, 2, 3, 0, 1, 2, 3]);
    }

    #[test]
    fn test_bidirectional_states_ignore_trailing_padding() {
        let device = Default::default();
        let encoder = RecurrentEncoder::<TestBackend>::new(EncoderKind::BiLstm, 3, 4, 2, &device);
        let tokens: Vec<f32> = (0..9).map(|i| (i as f32 * 0.7).sin()).collect();

        let mut padded = tokens.clone();
        padded.extend(std::iter::repeat_n(0.0, 3 * 4));
        let short = Tensor::<TestBackend, 1>::from_floats(tokens.as_slice(), &device).reshape([1, 3, 3]);
        let long = Tensor::<TestBackend, 1>::from_floats(padded.as_slice(), &device).reshape([1, 7, 3]);

        let a = encoder.forward(short, mask_from_lengths::<TestBackend>(&[3], 3, &device));
        let b = encoder
            .forward(long, mask_from_lengths::<TestBackend>(&[3], 7, &device))
            .slice([0..1, 0..3, 0..8]);
        let diff: f32 = (a - b).abs().max().into_scalar();
        assert!(diff < 1e-6, "padding changed real states by {}", diff);
    }
}
