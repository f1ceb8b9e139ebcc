//! # Sequence Driver
//!
//! This module runs a per-timestep [`StepFunction`] over the time axis of a
//! batch of sequences, threading state from one step to the next. It is the
//! loop every recurrent layer sits on top of: the layer supplies the step,
//! the driver handles axis order, masking, accumulation and shape metadata.
//!
//! ## Components
//!
//! | Type | Role |
//! |------|------|
//! | [`SequenceDriver`] | Entry point: normalises inputs, picks a strategy, finalises shapes |
//! | [`MaskEvaluator`] | Boolean mask for step `t`, from an explicit mask or sequence lengths |
//! | [`TensorArray`] | Pre-sized, time-indexed buffer of per-step tensors |
//! | [`LoopStrategy`] | `Unrolled` (host loop) or `Dynamic` (runtime-bounded loop) |
//! | [`ShapeFinalizer`] | Restores static dims and the caller's axis order |
//!
//! ## Quick Start
//!
//! ```ignore
//! use seqrnn::prelude::*;
//!
//! let ctx = ExecutionContext::<Backend>::new(&device);
//! let running_sum = step_fn(|inputs: &TensorNest<Backend>, states: &TensorNest<Backend>, _: &[DynTensor<Backend>]| {
//!     let out = inputs.as_leaf()?.add(states.as_leaf()?);
//!     Ok((Nest::leaf(out.clone()), Nest::leaf(out)))
//! });
//!
//! // inputs: [batch=4, time=10, features=8], state: [4, 8]
//! let out = SequenceDriver::new(running_sum)
//!     .run(&ctx, SequenceInputs::new(Nest::leaf(x), Nest::leaf(h0)))?;
//!
//! // out.outputs: [4, 10, 8], out.last_output: [4, 8], out.states: [4, 8]
//! ```
//!
//! ## Tensor Shapes
//!
//! ### Inputs
//!
//! | Format | Shape | Default |
//! |--------|-------|---------|
//! | Batch-major | `[batch, time, ...features]` | ✓ Yes |
//! | Time-major | `[time, batch, ...features]` | No |
//!
//! Use `.with_time_major(true)` to switch. Every input must have rank ≥ 3 and
//! all inputs must agree on the time and batch extents.
//!
//! ### Mask
//!
//! Boolean, laid out like the inputs' first two axes: `[batch, time]` or
//! `[batch, time, 1]` (time-major: `[time, batch]`). Instead of a mask, per-row
//! sequence lengths can be given with [`InputLength`]; an explicit mask wins
//! if both are present.
//!
//! ### Outputs
//!
//! | Setting | `outputs` shape | Description |
//! |---------|-----------------|-------------|
//! | `return_all_outputs=true` (default) | `[batch, time, ...]` | One slot per step |
//! | `return_all_outputs=false` | `[batch, 1, ...]` | Last step only |
//!
//! ## Strategies
//!
//! | | [`LoopStrategy::Unrolled`] | [`LoopStrategy::Dynamic`] |
//! |--|---------------------------|--------------------------|
//! | Selected by | `unroll=true` | default |
//! | Time extent | must be static | may be unknown |
//! | Extra step call | no | one priming call at `t = 0` |
//!
//! Both produce identical `(last_output, outputs, states)`.
//!
//! ## Masking
//!
//! Where the mask is false, the step's new state is discarded in favour of
//! the previous one and the output falls back to the previous output (zeros
//! before the first step). With `zero_output_for_mask` masked outputs are
//! zero instead.

mod config;
mod driver;
mod dynamic;
mod finalize;
mod mask;
mod step;
mod strategy;
mod tensor_array;
mod unrolled;

pub use config::RnnConfig;
pub use driver::{rnn, RnnOutput, SequenceDriver, SequenceInputs};
pub use finalize::ShapeFinalizer;
pub use mask::{select_masked, tile_mask, InputLength, MaskEvaluator};
pub use step::{step_fn, StepFn, StepFunction, StepOutput};
pub use strategy::LoopStrategy;
pub use tensor_array::TensorArray;
