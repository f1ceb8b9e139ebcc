use burn::tensor::backend::Backend;

use super::config::RnnConfig;
use super::mask::{select_masked, MaskEvaluator};
use crate::error::{Error, Result};
use crate::nest::TensorNest;
use crate::tensor::{DynMask, DynTensor};

/// How the per-timestep loop is executed.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum LoopStrategy {
    /// One host-level step call per timestep; needs a static time extent.
    Unrolled,
    /// Runtime-bounded loop over tensor arrays; works with unknown time extents.
    Dynamic,
}

impl LoopStrategy {
    /// One-shot choice made by the driver.
    pub fn select(config: &RnnConfig, static_time_steps: Option<usize>) -> Result<Self> {
        if !config.unroll {
            return Ok(LoopStrategy::Dynamic);
        }
        match static_time_steps {
            Some(_) => Ok(LoopStrategy::Unrolled),
            None => Err(Error::config(
                "unrolling requires a fixed number of timesteps",
            )),
        }
    }
}

/// Everything a strategy needs, already normalised to time-major.
pub(crate) struct LoopPlan<'a, B: Backend> {
    pub inputs: &'a TensorNest<B>,
    pub initial_states: &'a TensorNest<B>,
    pub constants: &'a [DynTensor<B>],
    pub mask: &'a MaskEvaluator<B>,
    pub config: RnnConfig,
    /// Time extent as known statically.
    pub time_steps: Option<usize>,
    /// Time extent at runtime.
    pub time_steps_t: usize,
}

impl<B: Backend> LoopPlan<'_, B> {
    /// Accumulator slot for step `t`.
    pub fn write_index(&self, t: usize) -> usize {
        if self.config.return_all_outputs {
            t
        } else {
            0
        }
    }
}

/// Result triple shared by both strategies.
#[derive(Clone, Debug)]
pub(crate) struct LoopOutput<B: Backend> {
    pub last_output: TensorNest<B>,
    pub outputs: TensorNest<B>,
    pub states: TensorNest<B>,
}

/// State bundle returned by a step must keep the structure and the leaf shapes.
pub(crate) fn check_state_update<B: Backend>(
    old: &TensorNest<B>,
    new: &TensorNest<B>,
) -> Result<()> {
    old.assert_same_structure(new, "step function state bundle")?;
    for (before, after) in old.flatten().into_iter().zip(new.flatten()) {
        let (b, a) = (before.dims(), after.dims());
        if b != a {
            return Err(Error::shape("state update", &b, &a));
        }
    }
    Ok(())
}

/// Leaf-wise `mask ? new : fallback`.
pub(crate) fn select_all<B: Backend>(
    mask_t: &DynMask<B>,
    new: &[DynTensor<B>],
    fallback: &[DynTensor<B>],
) -> Result<Vec<DynTensor<B>>> {
    if new.len() != fallback.len() {
        return Err(Error::structure(format!(
            "cannot mask {} tensors against {} fallbacks",
            new.len(),
            fallback.len()
        )));
    }
    new.iter()
        .zip(fallback)
        .map(|(n, f)| select_masked(mask_t, n, f))
        .collect()
}

pub(crate) fn cloned_leaves<B: Backend>(nest: &TensorNest<B>) -> Vec<DynTensor<B>> {
    nest.flatten().into_iter().cloned().collect()
}
