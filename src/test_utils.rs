// Test utilities for backend-aware tensor construction
//
// This module provides helper functions for creating feature and mask
// tensors that work with Burn 0.18's Into<TensorData> trait bounds. All
// functions use the Vec<T> + .as_slice() pattern.

use burn::tensor::{Tensor, backend::Backend};

/// Create f32 tensor from data slice with specified shape
///
/// Supports tensors of any dimensionality through reshape.
pub fn tensor_from_f32_vec<B: Backend, const D: usize>(
    data: &[f32],
    shape: &[usize],
    device: &B::Device,
) -> Tensor<B, D> {
    let expected_size: usize = shape.iter().product();
    assert_eq!(
        data.len(),
        expected_size,
        "Data length {} doesn't match shape {:?} (expected {})",
        data.len(),
        shape,
        expected_size
    );

    let data_vec: Vec<f32> = data.to_vec();
    let flat_tensor = Tensor::<B, 1>::from_floats(data_vec.as_slice(), device);
    flat_tensor.reshape(burn::tensor::Shape::from(shape))
}

/// Float padding mask [batch, max_len]: 1.0 for the first `length` positions
pub fn mask_from_lengths<B: Backend>(
    lengths: &[usize],
    max_len: usize,
    device: &B::Device,
) -> Tensor<B, 2> {
    let data: Vec<f32> = lengths
        .iter()
        .flat_map(|&length| (0..max_len).map(move |i| if i < length { 1.0 } else { 0.0 }))
        .collect();
    Tensor::<B, 1>::from_floats(data.as_slice(), device).reshape([lengths.len(), max_len])
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_tensor_from_f32_vec_2d() {
        let device = Default::default();
        let data = [1.0f32, 2.0f32, 3.0f32, 4.0f32];
        let tensor: Tensor<TestBackend, 2> = tensor_from_f32_vec(&data, &[2, 2], &device);

        assert_eq!(tensor.dims(), [2, 2]);
        let values: Vec<f32> = tensor.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    #[should_panic(expected = "Data length 2 doesn't match shape [3] (expected 3)")]
    fn test_mismatched_size_panics() {
        let device = Default::default();
        let _tensor: Tensor<TestBackend, 1> = tensor_from_f32_vec(&[1.0, 2.0], &[3], &device);
    }

    #[test]
    fn test_mask_from_lengths() {
        let device = Default::default();
        let mask = mask_from_lengths::<TestBackend>(&[2, 0, 3], 3, &device);

        let values: Vec<f32> = mask.into_data().to_vec().unwrap();
        assert_eq!(values, vec![1.0, 1.0, 0.0, 0.0, 0.0, 0.0, 1.0, 1.0, 1.0]);
    }
}
