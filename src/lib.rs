//! # seqrnn - Recurrent Sequence Driver (Rust)
//!
//! The loop underneath recurrent layers, built on the Burn framework.
//!
//! ## Features
//!
//! - **SequenceDriver**: runs a per-timestep step function over a batch of sequences
//! - **Two strategies**: unrolled host loop or runtime-bounded dynamic loop, same results
//! - **Masking**: explicit boolean masks or per-row sequence lengths, forward or backward
//! - **Nested state**: arbitrary trees of tensors for inputs, outputs and state
//! - **Static shapes**: unknown dims tracked alongside runtime extents
//! - **Backend helpers**: losses, image resampling, reductions, input specs
//!
//! ## Quick Start
//!
//! ```rust
//! use burn::backend::NdArray;
//! use seqrnn::prelude::*;
//!
//! type Backend = NdArray<f32>;
//!
//! # fn main() -> seqrnn::Result<()> {
//! let device = Default::default();
//! let ctx = ExecutionContext::<Backend>::new(&device);
//!
//! // Running sum: output = input + state, new state = output.
//! let step = step_fn(|inputs: &TensorNest<Backend>, states: &TensorNest<Backend>, _: &[DynTensor<Backend>]| {
//!     let out = inputs.as_leaf()?.add(states.as_leaf()?);
//!     Ok((Nest::leaf(out.clone()), Nest::leaf(out)))
//! });
//!
//! // [batch=1, time=3, features=1]
//! let x = DynTensor::from_floats(vec![1.0, 2.0, 3.0], &[1, 3, 1], &device)?;
//! let h0 = DynTensor::zeros(&[1, 1], &device)?;
//!
//! let out = SequenceDriver::new(step).run(&ctx, SequenceInputs::new(Nest::leaf(x), Nest::leaf(h0)))?;
//! assert_eq!(out.outputs.as_leaf()?.to_f32_vec()?, vec![1.0, 3.0, 6.0]);
//! # Ok(())
//! # }
//! ```
//!
//! ## Module Overview
//!
//! | Module | Contents |
//! |--------|----------|
//! | [`rnn`] | [`SequenceDriver`](rnn::SequenceDriver), masks, tensor arrays, loop strategies |
//! | [`tensor`] | Rank-erased [`DynTensor`](tensor::DynTensor) and [`StaticShape`](tensor::StaticShape) |
//! | [`nest`] | [`Nest`](nest::Nest) trees of tensors |
//! | [`context`] | [`ExecutionContext`](context::ExecutionContext): device, naming, loop primitives |
//! | [`backend`] | Losses, image helpers, reductions, [`InputSpec`](backend::InputSpec) |
//! | [`activation`], [`merge`] | Stateless layers |

pub mod activation;
pub mod backend;
pub mod context;
pub mod error;
pub mod merge;
pub mod nest;
pub mod rnn;
pub mod tensor;
pub mod utils;

pub use error::{Error, Result};

pub mod prelude {
    pub use crate::activation::{Activation, Exponential, Selu};
    pub use crate::backend::{DataFormat, InputSpec};
    pub use crate::context::{ExecutionContext, LearningPhase};
    pub use crate::error::{Error, Result};
    pub use crate::merge::Add;
    pub use crate::nest::{Nest, TensorNest};
    pub use crate::rnn::{
        rnn, step_fn, InputLength, LoopStrategy, RnnConfig, RnnOutput, SequenceDriver,
        SequenceInputs, StepFunction,
    };
    pub use crate::tensor::{DynMask, DynTensor, StaticShape};
}
