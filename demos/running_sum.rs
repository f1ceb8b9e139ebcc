//! Running-sum example of the sequence driver
//!
//! A step function that adds each input to its state, driven over a short
//! masked sequence with both loop strategies.

use burn::backend::NdArray;
use seqrnn::prelude::*;

type Backend = NdArray<f32>;

fn running_sum(
    inputs: &TensorNest<Backend>,
    states: &TensorNest<Backend>,
    _constants: &[DynTensor<Backend>],
) -> Result<(TensorNest<Backend>, TensorNest<Backend>)> {
    let out = inputs.as_leaf()?.add(states.as_leaf()?);
    Ok((Nest::leaf(out.clone()), Nest::leaf(out)))
}

fn main() -> Result<()> {
    println!("=== Running Sum Example ===\n");

    let device = Default::default();
    let ctx = ExecutionContext::<Backend>::new(&device);

    // Time-major input: [time=3, batch=1, features=1]
    let x = DynTensor::from_floats(vec![1.0, 2.0, 3.0], &[3, 1, 1], &device)?;
    let h0 = DynTensor::zeros(&[1, 1], &device)?;
    // Step 1 is masked out: output and state carry forward.
    let mask = DynMask::from_bools(vec![true, false, true], &[3, 1], &device)?;

    for unroll in [false, true] {
        let driver = SequenceDriver::new(step_fn(running_sum))
            .with_time_major(true)
            .with_unroll(unroll);
        let out = driver.run(
            &ctx,
            SequenceInputs::new(Nest::leaf(x.clone()), Nest::leaf(h0.clone()))
                .with_mask(mask.clone()),
        )?;

        let strategy = LoopStrategy::select(driver.config(), x.static_shape().dim(0))?;
        println!("Strategy: {strategy:?}");
        println!("  outputs:     {:?}", out.outputs.as_leaf()?.to_f32_vec()?);
        println!("  last output: {:?}", out.last_output.as_leaf()?.to_f32_vec()?);
        println!("  final state: {:?}", out.states.as_leaf()?.to_f32_vec()?);
        println!();
    }

    println!("Expected outputs [1, 1, 4], last output [4], final state [4]");
    Ok(())
}
