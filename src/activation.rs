//! Activation layers.
//!
//! Stateless element-wise layers. Each works on a const-rank Burn tensor and,
//! through [`Activation::forward_dyn`], on the rank-erased tensors the
//! sequence driver passes to step functions.

use burn::tensor::{backend::Backend, Tensor};
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::Result;
use crate::tensor::DynTensor;
use crate::utils::{Configurable, LayerArgs};

/// Element-wise activation.
pub trait Activation {
    fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D>;

    /// Same as [`Activation::forward`] on a rank-erased tensor.
    fn forward_dyn<B: Backend>(&self, x: &DynTensor<B>) -> Result<DynTensor<B>> {
        x.map_padded(|t| self.forward(t))
    }
}

/// Scaled exponential linear unit.
///
/// `f(x) = scale * x` for `x > 0`, `scale * alpha * (exp(x) - 1)` otherwise,
/// with the self-normalising constants [`Selu::ALPHA`] and [`Selu::SCALE`].
///
/// # Example
///
/// ```rust
/// use burn::backend::NdArray;
/// use burn::tensor::Tensor;
/// use seqrnn::activation::{Activation, Selu};
///
/// type Backend = NdArray<f32>;
/// let device = Default::default();
///
/// let x = Tensor::<Backend, 1>::from_floats([0.0, 1.0, -1.0], &device);
/// let y = Selu::default().forward(x);
/// ```
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Selu {
    args: LayerArgs,
}

impl Selu {
    pub const ALPHA: f32 = 1.673_263_2;
    pub const SCALE: f32 = 1.050_701;

    /// Layer named from the context, e.g. `selu_1`.
    pub fn new<B: Backend>(ctx: &mut ExecutionContext<B>) -> Self {
        Self {
            args: LayerArgs::named(ctx, "Selu"),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.args.name.as_deref()
    }
}

impl Activation for Selu {
    fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        let positive = x.clone().greater_elem(0.0);
        let negative_branch = x
            .clone()
            .exp()
            .sub_scalar(1.0)
            .mul_scalar(Self::SCALE * Self::ALPHA);
        negative_branch.mask_where(positive, x.mul_scalar(Self::SCALE))
    }
}

/// `f(x) = exp(x)`.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Exponential {
    args: LayerArgs,
}

impl Exponential {
    pub fn new<B: Backend>(ctx: &mut ExecutionContext<B>) -> Self {
        Self {
            args: LayerArgs::named(ctx, "Exponential"),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.args.name.as_deref()
    }
}

impl Activation for Exponential {
    fn forward<B: Backend, const D: usize>(&self, x: Tensor<B, D>) -> Tensor<B, D> {
        x.exp()
    }
}

/// Serialized form of a layer without arguments of its own.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ActivationConfig {
    #[serde(flatten)]
    pub args: LayerArgs,
}

impl Configurable for Selu {
    type Config = ActivationConfig;

    fn get_config(&self) -> ActivationConfig {
        ActivationConfig {
            args: self.args.clone(),
        }
    }
}

impl Configurable for Exponential {
    type Config = ActivationConfig;

    fn get_config(&self) -> ActivationConfig {
        ActivationConfig {
            args: self.args.clone(),
        }
    }
}
