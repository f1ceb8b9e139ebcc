use burn::tensor::backend::Backend;

use crate::error::{Error, Result};
use crate::tensor::{DynMask, DynTensor};

/// Mean over `axis`; negative axes count from the end.
pub fn mean<B: Backend>(x: &DynTensor<B>, axis: isize, keepdims: bool) -> Result<DynTensor<B>> {
    x.mean_axis(axis, keepdims)
}

/// Fraction of `true` entries along `axis`.
pub fn mean_mask<B: Backend>(mask: &DynMask<B>, axis: isize, keepdims: bool) -> Result<DynTensor<B>> {
    mean(&mask.to_float(), axis, keepdims)
}

/// Join tensors along an existing axis.
pub fn concatenate<B: Backend>(tensors: &[DynTensor<B>], axis: isize) -> Result<DynTensor<B>> {
    let first = tensors
        .first()
        .ok_or_else(|| Error::msg("concatenate needs at least one tensor"))?;
    let axis = first.axis(axis)?;
    DynTensor::concat(tensors, axis)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_mean_last_axis() {
        let x = DynTensor::<TestBackend>::from_floats(
            vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
            &[2, 3],
            &Default::default(),
        )
        .unwrap();
        let m = mean(&x, -1, false).unwrap();
        assert_eq!(m.dims(), vec![2]);
        assert_eq!(m.to_f32_vec().unwrap(), vec![2.0, 5.0]);
        assert_eq!(mean(&x, 0, true).unwrap().dims(), vec![1, 3]);
    }

    #[test]
    fn test_mean_mask_counts_true() {
        let mask = DynMask::<TestBackend>::from_bools(
            vec![true, false, true, true],
            &[2, 2],
            &Default::default(),
        )
        .unwrap();
        let m = mean_mask(&mask, 1, false).unwrap();
        assert_eq!(m.to_f32_vec().unwrap(), vec![0.5, 1.0]);
    }

    #[test]
    fn test_concatenate_negative_axis() {
        let device = Default::default();
        let a = DynTensor::<TestBackend>::ones(&[2, 1], &device).unwrap();
        let b = DynTensor::<TestBackend>::zeros(&[2, 2], &device).unwrap();
        let c = concatenate(&[a, b], -1).unwrap();
        assert_eq!(c.dims(), vec![2, 3]);
        assert_eq!(
            c.to_f32_vec().unwrap(),
            vec![1.0, 0.0, 0.0, 1.0, 0.0, 0.0]
        );
        assert!(concatenate::<TestBackend>(&[], 0).is_err());
    }
}
