//! Runtime-bounded loop over tensor arrays.

use burn::tensor::backend::Backend;

use super::step::StepFunction;
use super::strategy::{check_state_update, cloned_leaves, select_all, LoopOutput, LoopPlan};
use super::tensor_array::TensorArray;
use crate::context::ExecutionContext;
use crate::error::Result;
use crate::nest::TensorNest;
use crate::tensor::DynTensor;

struct LoopVars<B: Backend> {
    time: usize,
    accumulators: Vec<TensorArray<B>>,
    prev_output: Vec<DynTensor<B>>,
    states: TensorNest<B>,
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
    let config = plan.config;

    let readers = plan
        .inputs
        .flatten()
        .into_iter()
        .map(|input| {
            if config.go_backwards {
                TensorArray::unstack(&input.reverse_axis0()?)
            } else {
                TensorArray::unstack(input)
            }
        })
        .collect::<Result<Vec<_>>>()?;
    let read_inputs = |time: usize| -> Result<TensorNest<B>> {
        let flat = readers
            .iter()
            .map(|r| r.read(time))
            .collect::<Result<Vec<_>>>()?;
        plan.inputs.pack_as(flat)
    };

    // Priming call: learns the output structure and per-step shapes. The
    // values are discarded; the loop below recomputes t = 0.
    let (output_time_zero, _) = step.step(&read_inputs(0)?, plan.initial_states, plan.constants)?;
    tracing::trace!(
        outputs = output_time_zero.leaf_count(),
        "priming step finished"
    );
    let output_structure = output_time_zero.map_leaves(|_| ());
    let flat_zero_output: Vec<DynTensor<B>> = output_time_zero
        .flatten()
        .into_iter()
        .map(DynTensor::zeros_like)
        .collect();

    let (size, static_size) = if config.return_all_outputs {
        (plan.time_steps_t, plan.time_steps)
    } else {
        (1, Some(1))
    };
    let accumulators = output_time_zero
        .flatten()
        .into_iter()
        .map(|o| TensorArray::allocate(size, static_size, Some(o.static_shape().clone())))
        .collect();

    let init = LoopVars {
        time: 0,
        accumulators,
        prev_output: flat_zero_output.clone(),
        states: plan.initial_states.clone(),
    };
    let time_steps_t = plan.time_steps_t;

    let vars = ctx.while_loop(
        |vars: &LoopVars<B>| vars.time < time_steps_t,
        |mut vars| {
            let current_input = read_inputs(vars.time)?;
            let mask_t = plan.mask.mask_at(vars.time)?;
            let (output, new_states) = step.step(&current_input, &vars.states, plan.constants)?;
            output_structure.assert_same_structure(&output, "step output")?;
            check_state_update(&vars.states, &new_states)?;

            let flat_output = output.into_flat();
            let (flat_output, states) = match mask_t {
                Some(mask_t) => {
                    let fallback = if config.zero_output_for_mask {
                        &flat_zero_output
                    } else {
                        &vars.prev_output
                    };
                    let masked_output = select_all(&mask_t, &flat_output, fallback)?;
                    let masked_states = select_all(
                        &mask_t,
                        &cloned_leaves(&new_states),
                        &cloned_leaves(&vars.states),
                    )?;
                    (masked_output, new_states.pack_as(masked_states)?)
                }
                None => (flat_output, new_states),
            };

            let index = plan.write_index(vars.time);
            for (ta, o) in vars.accumulators.iter_mut().zip(&flat_output) {
                ta.write(index, o.clone())?;
            }
            tracing::trace!(time = vars.time, "dynamic step");
            vars.prev_output = flat_output;
            vars.states = states;
            vars.time += 1;
            Ok(vars)
        },
        init,
    )?;

    let outputs_flat = vars
        .accumulators
        .iter()
        .map(TensorArray::read_all)
        .collect::<Result<Vec<_>>>()?;
    let last_flat = outputs_flat
        .iter()
        .map(|o| o.index_axis0(o.dims()[0] - 1))
        .collect::<Result<Vec<_>>>()?;

    Ok(LoopOutput {
        last_output: output_structure.pack_as(last_flat)?,
        outputs: output_structure.pack_as(outputs_flat)?,
        states: vars.states,
    })
}
