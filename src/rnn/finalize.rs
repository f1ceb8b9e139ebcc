use burn::tensor::backend::Backend;

use crate::error::{Error, Result};
use crate::nest::TensorNest;
use crate::tensor::DynTensor;

/// Restores static shape metadata and the caller's axis order on the
/// stacked output sequence.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ShapeFinalizer {
    time_steps: Option<usize>,
    batch: Option<usize>,
    return_all_outputs: bool,
    time_major: bool,
}

impl ShapeFinalizer {
    pub fn new(
        time_steps: Option<usize>,
        batch: Option<usize>,
        return_all_outputs: bool,
        time_major: bool,
    ) -> Self {
        Self {
            time_steps,
            batch,
            return_all_outputs,
            time_major,
        }
    }

    pub fn finalize<B: Backend>(&self, outputs: &TensorNest<B>) -> Result<TensorNest<B>> {
        outputs.try_map(|leaf| self.finalize_leaf(leaf.clone()))
    }

    fn finalize_leaf<B: Backend>(&self, output: DynTensor<B>) -> Result<DynTensor<B>> {
        if output.rank() < 2 {
            return Err(Error::RankMismatch {
                context: "stacked output",
                expected: 2,
                got: output.rank(),
            });
        }
        let leading = if self.return_all_outputs {
            self.time_steps
        } else {
            Some(1)
        };
        let output = output
            .merge_static_dim(0, leading)?
            .merge_static_dim(1, self.batch)?;
        if self.time_major {
            Ok(output)
        } else {
            output.swap_axes(0, 1)
        }
    }
}
