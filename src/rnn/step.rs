use burn::tensor::backend::Backend;

use crate::error::Result;
use crate::nest::TensorNest;
use crate::tensor::DynTensor;

/// What a step returns: `(output, new_states)`.
pub type StepOutput<B> = (TensorNest<B>, TensorNest<B>);

/// Per-timestep transition driven by the sequence driver.
///
/// `inputs` is one time slice of the primary inputs (`[batch, ...]` leaves),
/// `states` the current state bundle, `constants` the auxiliary tensors passed
/// unchanged to every step. The returned state bundle must have the structure
/// of `states`.
///
/// Implementations must be free of observable side effects: the dynamic loop
/// calls the function once more than there are timesteps, at `t = 0`, to learn
/// the output structure, and discards the result.
pub trait StepFunction<B: Backend> {
    fn step(
        &self,
        inputs: &TensorNest<B>,
        states: &TensorNest<B>,
        constants: &[DynTensor<B>],
    ) -> Result<StepOutput<B>>;
}

impl<B: Backend, S: StepFunction<B> + ?Sized> StepFunction<B> for &S {
    fn step(
        &self,
        inputs: &TensorNest<B>,
        states: &TensorNest<B>,
        constants: &[DynTensor<B>],
    ) -> Result<StepOutput<B>> {
        (**self).step(inputs, states, constants)
    }
}

/// Closure adapter returned by [`step_fn`].
#[derive(Clone, Copy, Debug)]
pub struct StepFn<F>(F);

/// Turn a closure into a [`StepFunction`].
///
/// ```ignore
/// let running_sum = step_fn(|inputs: &TensorNest<B>, states: &TensorNest<B>, _: &[DynTensor<B>]| {
///     let out = inputs.as_leaf()?.add(states.as_leaf()?);
///     Ok((Nest::leaf(out.clone()), Nest::leaf(out)))
/// });
/// ```
pub fn step_fn<B, F>(f: F) -> StepFn<F>
where
    B: Backend,
    F: Fn(&TensorNest<B>, &TensorNest<B>, &[DynTensor<B>]) -> Result<StepOutput<B>>,
{
    StepFn(f)
}

impl<B, F> StepFunction<B> for StepFn<F>
where
    B: Backend,
    F: Fn(&TensorNest<B>, &TensorNest<B>, &[DynTensor<B>]) -> Result<StepOutput<B>>,
{
    fn step(
        &self,
        inputs: &TensorNest<B>,
        states: &TensorNest<B>,
        constants: &[DynTensor<B>],
    ) -> Result<StepOutput<B>> {
        (self.0)(inputs, states, constants)
    }
}
