//! Per-timestep validity masks.

use burn::tensor::backend::Backend;
use burn::tensor::{ElementConversion, Int, Tensor};

use crate::error::{Error, Result};
use crate::tensor::{DynMask, DynTensor, StaticShape};

/// Sequence lengths used instead of an explicit mask.
#[derive(Clone, Debug)]
pub enum InputLength<B: Backend> {
    /// Every row has the same length.
    Fixed(usize),
    /// One length per batch row, shape `[batch]`.
    PerRow(Tensor<B, 1, Int>),
}

#[derive(Clone, Debug)]
enum MaskSource<B: Backend> {
    /// Time-major mask of rank >= 3 (`[time, batch, 1]` after expansion).
    Explicit(DynMask<B>),
    /// Forward: `t < length`. Backward: `max_length - 1 - length < t`.
    Lengths {
        lengths: Tensor<B, 1, Int>,
        reversed_start: Option<Tensor<B, 1, Int>>,
    },
}

/// Produces the boolean mask for a given timestep, if masking is configured.
#[derive(Clone, Debug)]
pub struct MaskEvaluator<B: Backend> {
    source: Option<MaskSource<B>>,
    go_backwards: bool,
    time_steps: usize,
}

impl<B: Backend> MaskEvaluator<B> {
    /// Build from an optional time-major mask and optional sequence lengths.
    ///
    /// `time_steps` and `batch` are the runtime extents of the primary inputs.
    /// An explicit mask takes precedence over lengths.
    pub fn new(
        mask: Option<DynMask<B>>,
        input_length: Option<InputLength<B>>,
        go_backwards: bool,
        time_steps: usize,
        batch: usize,
        device: &B::Device,
    ) -> Result<Self> {
        let source = match (mask, input_length) {
            (Some(mask), length) => {
                if length.is_some() {
                    tracing::warn!("both mask and input_length given; using the mask");
                }
                Some(MaskSource::Explicit(Self::prepare_mask(
                    mask, time_steps, batch,
                )?))
            }
            (None, Some(length)) => {
                let lengths = match length {
                    InputLength::Fixed(n) => {
                        Tensor::<B, 1, Int>::full([batch], n as i64, device)
                    }
                    InputLength::PerRow(lengths) => {
                        let [rows] = lengths.dims();
                        if rows != batch {
                            return Err(Error::shape("input_length", &[batch], &[rows]));
                        }
                        lengths
                    }
                };
                let reversed_start = go_backwards.then(|| {
                    let max_len: i64 = lengths.clone().max().into_scalar().elem();
                    lengths.clone().neg().add_scalar(max_len - 1)
                });
                Some(MaskSource::Lengths {
                    lengths,
                    reversed_start,
                })
            }
            (None, None) => None,
        };
        tracing::debug!(
            explicit = matches!(source, Some(MaskSource::Explicit(_))),
            lengths = matches!(source, Some(MaskSource::Lengths { .. })),
            "mask source resolved"
        );
        Ok(Self {
            source,
            go_backwards,
            time_steps,
        })
    }

    fn prepare_mask(mask: DynMask<B>, time_steps: usize, batch: usize) -> Result<DynMask<B>> {
        if mask.rank() < 2 {
            return Err(Error::RankMismatch {
                context: "mask",
                expected: 2,
                got: mask.rank(),
            });
        }
        let mask = if mask.rank() == 2 {
            mask.expand_trailing(1)?
        } else {
            mask
        };
        let dims = mask.dims();
        if dims[0] != time_steps || dims[1] != batch {
            let mut expected = mask.static_shape().clone();
            expected = expected.with_dim(0, Some(time_steps)).with_dim(1, Some(batch));
            return Err(Error::ShapeMismatch {
                context: "mask vs inputs",
                expected,
                got: StaticShape::known(&dims),
            });
        }
        Ok(mask)
    }

    pub fn is_active(&self) -> bool {
        self.source.is_some()
    }

    /// Mask for processing step `t`, or `None` when masking is off.
    ///
    /// `t` counts processing steps, so when going backwards step 0 reads the
    /// last timestep of an explicit mask.
    pub fn mask_at(&self, t: usize) -> Result<Option<DynMask<B>>> {
        let Some(source) = &self.source else {
            return Ok(None);
        };
        if t >= self.time_steps {
            return Err(Error::IndexOutOfBounds {
                index: t,
                len: self.time_steps,
            });
        }
        let mask_t = match source {
            MaskSource::Explicit(mask) => {
                let index = if self.go_backwards {
                    self.time_steps - 1 - t
                } else {
                    t
                };
                mask.index_axis0(index)?
            }
            MaskSource::Lengths {
                lengths,
                reversed_start,
            } => {
                let active = match reversed_start {
                    Some(start) => start.clone().lower_elem(t as i64),
                    None => lengths.clone().greater_elem(t as i64),
                };
                DynMask::from_tensor(active)?
            }
        };
        Ok(Some(mask_t))
    }

    /// Per-step masks for `steps`, stacked in processing order.
    pub fn stacked(&self, steps: impl IntoIterator<Item = usize>) -> Result<Option<DynMask<B>>> {
        if !self.is_active() {
            return Ok(None);
        }
        let masks = steps
            .into_iter()
            .map(|t| self.mask_at(t))
            .collect::<Result<Option<Vec<_>>>>()?;
        masks.map(|m| DynMask::stack(&m)).transpose()
    }
}

/// Broadcast a step mask over a tensor: append trailing singleton axes until
/// the ranks match, then repeat along the feature axes.
pub fn tile_mask<B: Backend>(mask_t: &DynMask<B>, like: &DynTensor<B>) -> Result<DynMask<B>> {
    if mask_t.rank() > like.rank() {
        return Err(Error::RankMismatch {
            context: "tile_mask",
            expected: like.rank(),
            got: mask_t.rank(),
        });
    }
    mask_t
        .expand_trailing(like.rank() - mask_t.rank())?
        .broadcast_to(&like.dims())
}

/// `mask ? new : fallback`, with the mask tiled to the operands' shape.
pub fn select_masked<B: Backend>(
    mask_t: &DynMask<B>,
    new: &DynTensor<B>,
    fallback: &DynTensor<B>,
) -> Result<DynTensor<B>> {
    let tiled = tile_mask(mask_t, new)?;
    DynTensor::select(&tiled, new, fallback)
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn device() -> <TestBackend as Backend>::Device {
        Default::default()
    }

    #[test]
    fn test_no_mask_or_lengths_returns_none() {
        let eval = MaskEvaluator::<TestBackend>::new(None, None, false, 3, 2, &device()).unwrap();
        assert!(!eval.is_active());
        assert!(eval.mask_at(0).unwrap().is_none());
    }

    #[test]
    fn test_rank_two_mask_is_expanded() {
        let mask =
            DynMask::<TestBackend>::from_bools(vec![true, false, true, true], &[2, 2], &device())
                .unwrap();
        let eval = MaskEvaluator::new(Some(mask), None, false, 2, 2, &device()).unwrap();
        let m0 = eval.mask_at(0).unwrap().unwrap();
        assert_eq!(m0.dims(), vec![2, 1]);
        assert_eq!(m0.to_bool_vec().unwrap(), vec![true, false]);
    }

    #[test]
    fn test_backwards_reads_from_the_end() {
        let mask =
            DynMask::<TestBackend>::from_bools(vec![true, false, false, true], &[2, 2], &device())
                .unwrap();
        let eval = MaskEvaluator::new(Some(mask), None, true, 2, 2, &device()).unwrap();
        let m0 = eval.mask_at(0).unwrap().unwrap();
        assert_eq!(m0.to_bool_vec().unwrap(), vec![false, true]);
    }

    #[test]
    fn test_time_extent_mismatch() {
        let mask = DynMask::<TestBackend>::from_bools(vec![true; 6], &[3, 2], &device()).unwrap();
        let result = MaskEvaluator::new(Some(mask), None, false, 4, 2, &device());
        assert!(matches!(result, Err(Error::ShapeMismatch { .. })));
    }

    #[test]
    fn test_lengths_forward() {
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([1, 3], &device());
        let eval = MaskEvaluator::new(
            None,
            Some(InputLength::PerRow(lengths)),
            false,
            3,
            2,
            &device(),
        )
        .unwrap();
        let masks: Vec<Vec<bool>> = (0..3)
            .map(|t| eval.mask_at(t).unwrap().unwrap().to_bool_vec().unwrap())
            .collect();
        assert_eq!(
            masks,
            vec![vec![true, true], vec![false, true], vec![false, true]]
        );
    }

    #[test]
    fn test_lengths_backward_tail_aligned() {
        // max_length = 3: row 0 (length 1) becomes active on the last step only.
        let lengths = Tensor::<TestBackend, 1, Int>::from_ints([1, 3], &device());
        let eval = MaskEvaluator::new(
            None,
            Some(InputLength::PerRow(lengths)),
            true,
            3,
            2,
            &device(),
        )
        .unwrap();
        let masks: Vec<Vec<bool>> = (0..3)
            .map(|t| eval.mask_at(t).unwrap().unwrap().to_bool_vec().unwrap())
            .collect();
        assert_eq!(
            masks,
            vec![vec![false, true], vec![false, true], vec![true, true]]
        );
    }

    #[test]
    fn test_fixed_length() {
        let eval = MaskEvaluator::<TestBackend>::new(
            None,
            Some(InputLength::Fixed(1)),
            false,
            2,
            3,
            &device(),
        )
        .unwrap();
        let m1 = eval.mask_at(1).unwrap().unwrap();
        assert_eq!(m1.to_bool_vec().unwrap(), vec![false, false, false]);
    }

    #[test]
    fn test_tile_mask_to_features() {
        let mask = DynMask::<TestBackend>::from_bools(vec![true, false], &[2], &device()).unwrap();
        let like = DynTensor::zeros(&[2, 3], &device()).unwrap();
        let tiled = tile_mask(&mask, &like).unwrap();
        assert_eq!(tiled.dims(), vec![2, 3]);
        assert_eq!(
            tiled.to_bool_vec().unwrap(),
            vec![true, true, true, false, false, false]
        );
    }
}
