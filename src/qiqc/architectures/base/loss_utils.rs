use burn::tensor::{Tensor, activation, backend::Backend};

/// Binary cross-entropy on logits with a positive-class weight
///
/// `loss = mean(-(pos_weight * y * log σ(x) + (1 - y) * log σ(-x)))`
///
/// Uses `log_sigmoid` on both branches so large-magnitude logits stay finite.
///
/// # Arguments
///
/// * `logits` - [batch] raw scores
/// * `targets` - [batch] labels in {0, 1} (soft labels in [0, 1] also work)
/// * `pos_weight` - multiplier on the positive term; 1.0 is plain BCE
///
/// Returns a one-element tensor.
pub fn binary_cross_entropy_with_logits<B: Backend>(
    logits: Tensor<B, 1>,
    targets: Tensor<B, 1>,
    pos_weight: f64,
) -> Tensor<B, 1> {
    let positive = targets.clone() * activation::log_sigmoid(logits.clone()).mul_scalar(pos_weight);
    let negative = targets.neg().add_scalar(1.0) * activation::log_sigmoid(logits.neg());

    (positive + negative).neg().mean()
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn_ndarray::NdArray;

    type TestBackend = NdArray<f32>;

    fn reference(logits: &[f32], targets: &[f32], pos_weight: f32) -> f32 {
        let sigmoid = |x: f32| 1.0 / (1.0 + (-x).exp());
        let total: f32 = logits
            .iter()
            .zip(targets.iter())
            .map(|(&x, &y)| {
                -(pos_weight * y * sigmoid(x).ln() + (1.0 - y) * (1.0 - sigmoid(x)).ln())
            })
            .sum();
        total / logits.len() as f32
    }

    #[test]
    fn test_bce_matches_closed_form() {
        let device = Default::default();
        let logits = [0.5f32, -1.0, 2.0, 0.0];
        let targets = [1.0f32, 0.0, 0.0, 1.0];

        for pos_weight in [1.0f32, 3.0] {
            let loss = binary_cross_entropy_with_logits(
                Tensor::<TestBackend, 1>::from_floats(logits.as_slice(), &device),
                Tensor::<TestBackend, 1>::from_floats(targets.as_slice(), &device),
                pos_weight as f64,
            );
            let value: f32 = loss.into_scalar();
            let expected = reference(&logits, &targets, pos_weight);
            assert!(
                (value - expected).abs() < 1e-5,
                "pos_weight {}: expected {}, got {}",
                pos_weight,
                expected,
                value
            );
        }
    }

    #[test]
    fn test_bce_is_finite_for_extreme_logits() {
        let device = Default::default();
        let logits = Tensor::<TestBackend, 1>::from_floats([80.0f32, -80.0].as_slice(), &device);
        let targets = Tensor::<TestBackend, 1>::from_floats([0.0f32, 1.0].as_slice(), &device);

        let loss = binary_cross_entropy_with_logits(logits, targets, 1.0);
        let value: f32 = loss.into_scalar();
        assert!(value.is_finite());
        assert!((value - 80.0).abs() < 1e-3);
    }
}
