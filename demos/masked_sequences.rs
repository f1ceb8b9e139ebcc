//! Variable-length sequences with a simple tanh recurrence
//!
//! Shows per-row sequence lengths, `zero_output_for_mask`, backward processing
//! and keeping only the last output.

use burn::backend::NdArray;
use burn::tensor::{Distribution, Int, Tensor};
use seqrnn::prelude::*;

type Backend = NdArray<f32>;

fn main() -> Result<()> {
    println!("=== Masked Sequences Example ===\n");

    let device = Default::default();
    let ctx = ExecutionContext::<Backend>::new(&device);

    let (batch, time, features, hidden) = (3, 6, 4, 8);
    let random = |dims: [usize; 2]| {
        DynTensor::from_tensor(Tensor::<Backend, 2>::random(
            dims,
            Distribution::Uniform(-0.5, 0.5),
            &device,
        ))
    };
    let w = random([features, hidden])?;
    let u = random([hidden, hidden])?;
    let x = DynTensor::from_tensor(Tensor::<Backend, 3>::random(
        [batch, time, features],
        Distribution::Uniform(-1.0, 1.0),
        &device,
    ))?;
    let h0 = DynTensor::zeros(&[batch, hidden], &device)?;
    let lengths = Tensor::<Backend, 1, Int>::from_ints([6, 3, 1], &device);

    // h' = tanh(x W + h U)
    let step = step_fn(
        |inputs: &TensorNest<Backend>, states: &TensorNest<Backend>, constants: &[DynTensor<Backend>]| {
            let pre = inputs
                .as_leaf()?
                .matmul(&constants[0])?
                .add(&states.as_leaf()?.matmul(&constants[1])?);
            let h = pre.tanh();
            Ok((Nest::leaf(h.clone()), Nest::leaf(h)))
        },
    );

    let sequence_inputs = || {
        SequenceInputs::new(Nest::leaf(x.clone()), Nest::leaf(h0.clone()))
            .with_constants(vec![w.clone(), u.clone()])
            .with_input_length(InputLength::PerRow(lengths.clone()))
    };

    // Example 1: every step, zeros past each row's length
    println!("Example 1: zero_output_for_mask");
    let out = SequenceDriver::new(&step)
        .with_zero_output_for_mask(true)
        .run(&ctx, sequence_inputs())?;
    let outputs = out.outputs.as_leaf()?;
    println!("  Output shape: {:?}", outputs.dims());
    let per_step_activity = active_steps(outputs)?;
    println!("  Non-zero steps per row: {per_step_activity:?}");
    println!();

    // Example 2: backward, last output only
    println!("Example 2: go_backwards, last output only");
    let out = SequenceDriver::new(&step)
        .with_go_backwards(true)
        .with_return_all_outputs(false)
        .run(&ctx, sequence_inputs())?;
    println!("  Output shape: {:?}", out.outputs.as_leaf()?.dims());
    println!("  State shape:  {:?}", out.states.as_leaf()?.dims());

    Ok(())
}

/// Count timesteps with any non-zero output, per batch row.
fn active_steps(outputs: &DynTensor<Backend>) -> Result<Vec<usize>> {
    let dims = outputs.dims();
    let (time, hidden) = (dims[1], dims[2]);
    let values = outputs.to_f32_vec()?;
    Ok(values
        .chunks(time * hidden)
        .map(|row| row.chunks(hidden).filter(|s| s.iter().any(|v| *v != 0.0)).count())
        .collect())
}
