//! Unrolled loop: one host-level step call per timestep.

use burn::tensor::backend::Backend;

use super::step::StepFunction;
use super::strategy::{check_state_update, cloned_leaves, select_all, LoopOutput, LoopPlan};
use super::tensor_array::TensorArray;
use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::nest::{Nest, TensorNest};
use crate::tensor::DynTensor;

struct Carry<B: Backend> {
    states: TensorNest<B>,
    /// Flattened output of the previous step, after masking.
    prev_output: Option<Vec<DynTensor<B>>>,
    output_structure: Option<Nest<()>>,
    accumulators: Vec<TensorArray<B>>,
}

pub(crate) fn run<B, S>(
    ctx: &ExecutionContext<B>,
    step: &S,
    plan: &LoopPlan<'_, B>,
) -> Result<LoopOutput<B>>
where
    B: Backend,
    S: StepFunction<B> + ?Sized,
{
    let time_steps = plan
        .time_steps
        .ok_or_else(|| Error::config("unrolling requires a fixed number of timesteps"))?;
    let config = plan.config;

    let mut slices = plan
        .inputs
        .flatten()
        .into_iter()
        .map(DynTensor::unstack)
        .collect::<Result<Vec<_>>>()?;
    if config.go_backwards {
        slices.iter_mut().for_each(|s| s.reverse());
    }
    let input_at = |t: usize| {
        plan.inputs
            .pack_as(slices.iter().map(|s| s[t].clone()).collect())
    };
    let accumulator_size = if config.return_all_outputs {
        time_steps
    } else {
        1
    };

    let init = Carry {
        states: plan.initial_states.clone(),
        prev_output: None,
        output_structure: None,
        accumulators: Vec::new(),
    };

    let carry = ctx.unrolled(time_steps, init, |t, mut carry| {
        let inputs_t = input_at(t)?;
        let (output, new_states) = step.step(&inputs_t, &carry.states, plan.constants)?;
        check_state_update(&carry.states, &new_states)?;

        match &carry.output_structure {
            Some(structure) => structure.assert_same_structure(&output, "step output")?,
            None => {
                carry.accumulators = output
                    .flatten()
                    .into_iter()
                    .map(|o| {
                        TensorArray::allocate(
                            accumulator_size,
                            Some(accumulator_size),
                            Some(o.static_shape().clone()),
                        )
                    })
                    .collect();
                carry.output_structure = Some(output.map_leaves(|_| ()));
            }
        }

        let flat_output = output.into_flat();
        let (flat_output, states) = match plan.mask.mask_at(t)? {
            Some(mask_t) => {
                // Step 0 falls back to zeros.
                let prev = carry
                    .prev_output
                    .take()
                    .unwrap_or_else(|| flat_output.iter().map(DynTensor::zeros_like).collect());
                let masked_output = select_all(&mask_t, &flat_output, &prev)?;
                let masked_states = select_all(
                    &mask_t,
                    &cloned_leaves(&new_states),
                    &cloned_leaves(&carry.states),
                )?;
                (masked_output, new_states.pack_as(masked_states)?)
            }
            None => (flat_output, new_states),
        };

        let index = plan.write_index(t);
        for (ta, o) in carry.accumulators.iter_mut().zip(&flat_output) {
            ta.write(index, o.clone())?;
        }
        tracing::trace!(t, "unrolled step");
        carry.prev_output = Some(flat_output);
        carry.states = states;
        Ok(carry)
    })?;

    let structure = carry
        .output_structure
        .ok_or_else(|| Error::config("cannot run a sequence with zero timesteps"))?;
    let mut last_flat = carry.prev_output.unwrap_or_default();
    let mut outputs_flat = carry
        .accumulators
        .iter()
        .map(TensorArray::read_all)
        .collect::<Result<Vec<_>>>()?;

    if config.zero_output_for_mask {
        if let Some(last_mask) = plan.mask.mask_at(time_steps - 1)? {
            let zeros: Vec<_> = last_flat.iter().map(DynTensor::zeros_like).collect();
            last_flat = select_all(&last_mask, &last_flat, &zeros)?;
        }
        let steps = if config.return_all_outputs {
            0..time_steps
        } else {
            time_steps - 1..time_steps
        };
        if let Some(sequence_mask) = plan.mask.stacked(steps)? {
            let zeros: Vec<_> = outputs_flat.iter().map(DynTensor::zeros_like).collect();
            outputs_flat = select_all(&sequence_mask, &outputs_flat, &zeros)?;
        }
    }

    Ok(LoopOutput {
        last_output: structure.pack_as(last_flat)?,
        outputs: structure.pack_as(outputs_flat)?,
        states: carry.states,
    })
}
