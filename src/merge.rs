//! Merge layers: combine a list of same-shape tensors into one.

use burn::tensor::backend::Backend;
use serde::{Deserialize, Serialize};

use crate::context::ExecutionContext;
use crate::error::{Error, Result};
use crate::tensor::{DynTensor, StaticShape};
use crate::utils::{Configurable, LayerArgs};

/// Element-wise sum of its inputs.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Add {
    args: LayerArgs,
}

impl Add {
    pub fn new<B: Backend>(ctx: &mut ExecutionContext<B>) -> Self {
        Self {
            args: LayerArgs::named(ctx, "Add"),
        }
    }

    pub fn name(&self) -> Option<&str> {
        self.args.name.as_deref()
    }

    pub fn forward<B: Backend>(&self, inputs: &[DynTensor<B>]) -> Result<DynTensor<B>> {
        let (first, rest) = inputs
            .split_first()
            .ok_or_else(|| Error::config("a merge layer needs at least one input"))?;
        let dims = first.dims();
        let mut output = first.clone();
        for input in rest {
            if input.dims() != dims {
                return Err(Error::shape("merge inputs", &dims, &input.dims()));
            }
            output = output.add(input);
        }
        output.with_static_shape(self.compute_output_shape(
            &inputs.iter().map(|t| t.static_shape().clone()).collect::<Vec<_>>(),
        ))
    }

    /// Shape shared by the inputs, keeping every dim any input knows.
    pub fn compute_output_shape(&self, input_shapes: &[StaticShape]) -> StaticShape {
        let mut shapes = input_shapes.iter();
        let Some(first) = shapes.next() else {
            return StaticShape::unknown(0);
        };
        shapes.fold(first.clone(), |acc, s| StaticShape::broadcast(&acc, s))
    }
}

/// Serialized form of a merge layer.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MergeConfig {
    #[serde(flatten)]
    pub args: LayerArgs,
}

impl Configurable for Add {
    type Config = MergeConfig;

    fn get_config(&self) -> MergeConfig {
        MergeConfig {
            args: self.args.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::utils::serialize_layer_to_config;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    #[test]
    fn test_add_three_inputs() {
        let device = Default::default();
        let a = DynTensor::<TestBackend>::from_floats(vec![1.0, 2.0], &[1, 2], &device).unwrap();
        let b = DynTensor::ones(&[1, 2], &device).unwrap();
        let c = DynTensor::from_floats(vec![10.0, 20.0], &[1, 2], &device).unwrap();
        let y = Add::default().forward(&[a, b, c]).unwrap();
        assert_eq!(y.to_f32_vec().unwrap(), vec![12.0, 23.0]);
    }

    #[test]
    fn test_add_rejects_mismatched_shapes() {
        let device = Default::default();
        let a = DynTensor::<TestBackend>::ones(&[2, 2], &device).unwrap();
        let b = DynTensor::ones(&[2, 3], &device).unwrap();
        assert!(matches!(
            Add::default().forward(&[a, b]),
            Err(Error::ShapeMismatch { .. })
        ));
        assert!(matches!(
            Add::default().forward::<TestBackend>(&[]),
            Err(Error::Config(_))
        ));
    }

    #[test]
    fn test_output_shape_keeps_known_dims() {
        let shapes = [
            StaticShape::new(vec![None, Some(4)]),
            StaticShape::new(vec![Some(2), Some(4)]),
        ];
        assert_eq!(
            Add::default().compute_output_shape(&shapes),
            StaticShape::known(&[2, 4])
        );
    }

    #[test]
    fn test_config_round_trip() {
        let mut ctx = ExecutionContext::<TestBackend>::new(&Default::default());
        let add = Add::new(&mut ctx);
        let config = serialize_layer_to_config(&add).unwrap();
        assert_eq!(config.class_name, "Add");

        let decoded: MergeConfig = config.decode().unwrap();
        assert_eq!(decoded, add.get_config());
        assert_eq!(decoded.args.name.as_deref(), Some("add_1"));
    }
}
