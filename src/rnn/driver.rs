use burn::tensor::backend::Backend;

use super::config::RnnConfig;
use super::finalize::ShapeFinalizer;
use super::mask::{InputLength, MaskEvaluator};
use super::step::StepFunction;
use super::strategy::{LoopOutput, LoopPlan, LoopStrategy};
use super::{dynamic, unrolled};
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::nest::TensorNest;
use crate::tensor::{DynMask, DynTensor, StaticShape};

/// Everything fed to one driver invocation.
#[derive(Clone, Debug)]
pub struct SequenceInputs<B: Backend> {
    inputs: TensorNest<B>,
    initial_states: TensorNest<B>,
    mask: Option<DynMask<B>>,
    constants: Vec<DynTensor<B>>,
    input_length: Option<InputLength<B>>,
}

impl<B: Backend> SequenceInputs<B> {
    /// `inputs` are shaped `[batch, time, ...]` (or `[time, batch, ...]` when
    /// the driver is time-major).
    pub fn new(inputs: TensorNest<B>, initial_states: TensorNest<B>) -> Self {
        Self {
            inputs,
            initial_states,
            mask: None,
            constants: Vec::new(),
            input_length: None,
        }
    }

    /// Boolean mask laid out like the inputs' first two axes, optionally
    /// with a trailing singleton axis.
    pub fn with_mask(mut self, mask: DynMask<B>) -> Self {
        self.mask = Some(mask);
        self
    }

    /// Tensors passed unchanged to every step.
    pub fn with_constants(mut self, constants: Vec<DynTensor<B>>) -> Self {
        self.constants = constants;
        self
    }

    pub fn with_input_length(mut self, input_length: InputLength<B>) -> Self {
        self.input_length = Some(input_length);
        self
    }
}

/// Result of a driver run.
#[derive(Clone, Debug)]
pub struct RnnOutput<B: Backend> {
    /// Output of the final processing step, `[batch, ...]`.
    pub last_output: TensorNest<B>,
    /// Stacked outputs in the caller's axis order.
    pub outputs: TensorNest<B>,
    /// State after the final step.
    pub states: TensorNest<B>,
}

/// Runs a step function over the time axis of a batch of sequences.
///
/// # Example
///
/// ```ignore
/// let step = step_fn(|inputs, states, _constants| {
///     let sum = inputs.as_leaf()?.add(states.as_leaf()?);
///     Ok((Nest::leaf(sum.clone()), Nest::leaf(sum)))
/// });
/// let driver = SequenceDriver::new(step).with_unroll(true);
/// let out = driver.run(&ctx, SequenceInputs::new(inputs, states))?;
/// ```
#[derive(Clone, Debug)]
pub struct SequenceDriver<S> {
    step: S,
    config: RnnConfig,
}

impl<S> SequenceDriver<S> {
    pub fn new(step: S) -> Self {
        Self {
            step,
            config: RnnConfig::default(),
        }
    }

    pub fn with_config(mut self, config: RnnConfig) -> Self {
        self.config = config;
        self
    }

    pub fn with_go_backwards(mut self, go_backwards: bool) -> Self {
        self.config.go_backwards = go_backwards;
        self
    }

    pub fn with_unroll(mut self, unroll: bool) -> Self {
        self.config.unroll = unroll;
        self
    }

    pub fn with_time_major(mut self, time_major: bool) -> Self {
        self.config.time_major = time_major;
        self
    }

    pub fn with_zero_output_for_mask(mut self, zero_output_for_mask: bool) -> Self {
        self.config.zero_output_for_mask = zero_output_for_mask;
        self
    }

    pub fn with_return_all_outputs(mut self, return_all_outputs: bool) -> Self {
        self.config.return_all_outputs = return_all_outputs;
        self
    }

    pub fn config(&self) -> &RnnConfig {
        &self.config
    }

    pub fn step(&self) -> &S {
        &self.step
    }

    pub fn run<B>(&self, ctx: &ExecutionContext<B>, inputs: SequenceInputs<B>) -> Result<RnnOutput<B>>
    where
        B: Backend,
        S: StepFunction<B>,
    {
        let config = self.config;
        let SequenceInputs {
            inputs,
            initial_states,
            mask,
            constants,
            input_length,
        } = inputs;

        let inputs = self.to_time_major(&inputs)?;
        let mask = match mask {
            Some(mask) if !config.time_major => {
                if mask.rank() < 2 {
                    return Err(Error::RankMismatch {
                        context: "mask",
                        expected: 2,
                        got: mask.rank(),
                    });
                }
                Some(mask.swap_axes(0, 1)?)
            }
            other => other,
        };

        let (static_shape, time_steps_t, batch) = sequence_extents(&inputs)?;
        let time_steps = static_shape.dim(0);
        let strategy = LoopStrategy::select(&config, time_steps)?;
        tracing::debug!(
            ?strategy,
            time_steps = time_steps_t,
            batch,
            static_time = time_steps.is_some(),
            "running sequence"
        );

        let mask_eval = MaskEvaluator::new(
            mask,
            input_length,
            config.go_backwards,
            time_steps_t,
            batch,
            ctx.device(),
        )?;
        let plan = LoopPlan {
            inputs: &inputs,
            initial_states: &initial_states,
            constants: &constants,
            mask: &mask_eval,
            config,
            time_steps,
            time_steps_t,
        };
        let LoopOutput {
            last_output,
            outputs,
            states,
        } = match strategy {
            LoopStrategy::Unrolled => unrolled::run(ctx, &self.step, &plan)?,
            LoopStrategy::Dynamic => dynamic::run(ctx, &self.step, &plan)?,
        };

        let finalizer = ShapeFinalizer::new(
            time_steps,
            static_shape.dim(1),
            config.return_all_outputs,
            config.time_major,
        );
        Ok(RnnOutput {
            last_output,
            outputs: finalizer.finalize(&outputs)?,
            states,
        })
    }

    fn to_time_major<B: Backend>(&self, inputs: &TensorNest<B>) -> Result<TensorNest<B>> {
        if inputs.leaf_count() == 0 {
            return Err(Error::config("rnn requires at least one input tensor"));
        }
        inputs.try_map(|input| {
            if input.rank() < 3 {
                return Err(Error::RankMismatch {
                    context: "rnn input",
                    expected: 3,
                    got: input.rank(),
                });
            }
            if self.config.time_major {
                Ok(input.clone())
            } else {
                input.swap_axes(0, 1)
            }
        })
    }
}

/// Static shape of the first input plus the shared runtime time and batch extents.
fn sequence_extents<B: Backend>(inputs: &TensorNest<B>) -> Result<(StaticShape, usize, usize)> {
    let flat = inputs.flatten();
    let first = flat
        .first()
        .ok_or_else(|| Error::config("rnn requires at least one input tensor"))?;
    let dims = first.dims();
    let (time_steps, batch) = (dims[0], dims[1]);
    for other in &flat[1..] {
        let other_dims = other.dims();
        if other_dims[0] != time_steps || other_dims[1] != batch {
            return Err(Error::shape(
                "inputs time/batch extents",
                &[time_steps, batch],
                &other_dims[..2],
            ));
        }
    }
    if time_steps == 0 {
        return Err(Error::config("cannot run a sequence with zero timesteps"));
    }
    Ok((first.static_shape().clone(), time_steps, batch))
}

/// One-call form of [`SequenceDriver`].
pub fn rnn<B, S>(
    ctx: &ExecutionContext<B>,
    step: S,
    inputs: SequenceInputs<B>,
    config: RnnConfig,
) -> Result<RnnOutput<B>>
where
    B: Backend,
    S: StepFunction<B>,
{
    SequenceDriver::new(step).with_config(config).run(ctx, inputs)
}
