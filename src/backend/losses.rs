//! Crossentropy losses on `[batch, classes]` predictions.
//!
//! Probability inputs are clipped to `[EPSILON, 1 - EPSILON]` before the log.

use burn::tensor::activation::log_softmax;
use burn::tensor::backend::Backend;
use burn::tensor::{Int, Tensor};

use crate::error::{Error, Result};

/// Fuzz factor used to keep logarithms finite.
pub const EPSILON: f32 = 1e-7;

/// Crossentropy between one-hot (or soft) targets and predictions.
///
/// With `from_logits` the output is treated as unnormalised scores; otherwise
/// each row is rescaled to sum to one first.
pub fn categorical_crossentropy<B: Backend>(
    target: Tensor<B, 2>,
    output: Tensor<B, 2>,
    from_logits: bool,
) -> Result<Tensor<B, 1>> {
    if target.dims() != output.dims() {
        return Err(Error::shape(
            "categorical_crossentropy",
            &target.dims(),
            &output.dims(),
        ));
    }
    let log_probs = if from_logits {
        log_softmax(output, 1)
    } else {
        let scaled = output.clone() / output.sum_dim(1);
        scaled.clamp(EPSILON, 1.0 - EPSILON).log()
    };
    Ok((target * log_probs).sum_dim(1).neg().squeeze::<1>(1))
}

/// Crossentropy with integer class targets of shape `[batch]`.
///
/// `axis` names the class axis of `output`; only the last one is supported.
/// `ignore_class` is not supported.
pub fn sparse_categorical_crossentropy<B: Backend>(
    target: Tensor<B, 1, Int>,
    output: Tensor<B, 2>,
    from_logits: bool,
    axis: isize,
    ignore_class: Option<i64>,
) -> Result<Tensor<B, 1>> {
    if ignore_class.is_some() {
        return Err(Error::unsupported(
            "ignore_class in sparse_categorical_crossentropy",
        ));
    }
    if axis.unsigned_abs() % 2 != 1 {
        return Err(Error::unsupported(format!(
            "class axis {axis} in sparse_categorical_crossentropy; only the last axis is supported"
        )));
    }
    let [batch, _] = output.dims();
    let [rows] = target.dims();
    if rows != batch {
        return Err(Error::shape(
            "sparse_categorical_crossentropy",
            &[batch],
            &[rows],
        ));
    }
    let logits = if from_logits {
        output
    } else {
        output.clamp(EPSILON, 1.0 - EPSILON).log()
    };
    let picked = log_softmax(logits, 1).gather(1, target.reshape([batch, 1]));
    Ok(picked.neg().squeeze::<1>(1))
}

/// Element-wise binary crossentropy, any rank.
pub fn binary_crossentropy<B: Backend, const D: usize>(
    target: Tensor<B, D>,
    output: Tensor<B, D>,
    from_logits: bool,
) -> Result<Tensor<B, D>> {
    if target.dims() != output.dims() {
        return Err(Error::shape(
            "binary_crossentropy",
            &target.dims(),
            &output.dims(),
        ));
    }
    if from_logits {
        // max(x, 0) - x * z + log(1 + exp(-|x|))
        let softplus = output.clone().abs().neg().exp().add_scalar(1.0).log();
        return Ok(output.clone().clamp_min(0.0) - output * target + softplus);
    }
    let output = output.clamp(EPSILON, 1.0 - EPSILON);
    let positive = target.clone() * output.clone().add_scalar(EPSILON).log();
    let negative =
        target.neg().add_scalar(1.0) * output.neg().add_scalar(1.0 + EPSILON).log();
    Ok((positive + negative).neg())
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values<const D: usize>(t: Tensor<TestBackend, D>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_categorical_from_probabilities() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 2>::from_floats([[0.0, 1.0]], &device);
        // Unnormalised row: rescaled to [0.5, 0.5].
        let output = Tensor::<TestBackend, 2>::from_floats([[2.0, 2.0]], &device);
        let loss = values(categorical_crossentropy(target, output, false).unwrap());
        assert!((loss[0] - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_categorical_from_logits() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device);
        let output = Tensor::<TestBackend, 2>::zeros([1, 2], &device);
        let loss = values(categorical_crossentropy(target, output, true).unwrap());
        assert!((loss[0] - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_categorical_shape_mismatch() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 2>::zeros([1, 3], &device);
        let output = Tensor::<TestBackend, 2>::zeros([1, 2], &device);
        assert!(categorical_crossentropy(target, output, true).is_err());
    }

    #[test]
    fn test_sparse_from_probabilities() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1, Int>::from_ints([1, 0], &device);
        let output =
            Tensor::<TestBackend, 2>::from_floats([[0.25, 0.75], [0.5, 0.5]], &device);
        let loss = values(sparse_categorical_crossentropy(target, output, false, -1, None).unwrap());
        assert!((loss[0] - (-(0.75f32).ln())).abs() < 1e-5);
        assert!((loss[1] - std::f32::consts::LN_2).abs() < 1e-5);
    }

    #[test]
    fn test_sparse_unsupported_options() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1, Int>::from_ints([0], &device);
        let output = Tensor::<TestBackend, 2>::zeros([1, 2], &device);
        assert!(matches!(
            sparse_categorical_crossentropy(target.clone(), output.clone(), true, -1, Some(0)),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            sparse_categorical_crossentropy(target, output, true, 0, None),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_binary_from_probabilities() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 1>::from_floats([1.0, 0.0], &device);
        let output = Tensor::<TestBackend, 1>::from_floats([0.9, 0.2], &device);
        let loss = values(binary_crossentropy(target, output, false).unwrap());
        assert!((loss[0] - (-(0.9f32).ln())).abs() < 1e-4);
        assert!((loss[1] - (-(0.8f32).ln())).abs() < 1e-4);
    }

    #[test]
    fn test_binary_from_logits() {
        let device = Default::default();
        let target = Tensor::<TestBackend, 2>::from_floats([[1.0, 0.0]], &device);
        let output = Tensor::<TestBackend, 2>::zeros([1, 2], &device);
        let loss = values(binary_crossentropy(target, output, true).unwrap());
        for l in loss {
            assert!((l - std::f32::consts::LN_2).abs() < 1e-5);
        }
    }
}
