//! Tests for backend helpers used around recurrent models

use burn::backend::NdArray;
use burn::tensor::{Int, Tensor};
use seqrnn::backend::{
    binary_crossentropy, categorical_crossentropy, concatenate, conv2d_transpose, mean,
    mean_mask, resize_images, sparse_categorical_crossentropy, spatial_2d_padding, Padding,
};
use seqrnn::prelude::*;

type Backend = NdArray<f32>;

#[test]
fn test_data_format_from_config_string() {
    let format: DataFormat = "channels_first".parse().unwrap();
    let x = Tensor::<Backend, 4>::ones([2, 3, 4, 4], &Default::default());
    let padded = spatial_2d_padding(x, Some([[1, 1], [2, 2]]), format);
    assert_eq!(padded.dims(), [2, 3, 6, 8]);

    let err = "NCHW".parse::<DataFormat>().unwrap_err();
    assert!(err.to_string().contains("NCHW"));
}

#[test]
fn test_upsample_then_transpose_conv_shapes() {
    let device = Default::default();
    let x = Tensor::<Backend, 4>::ones([1, 2, 2, 3], &device);
    let up = resize_images(x, 2, 3, DataFormat::ChannelsLast, "nearest").unwrap();
    assert_eq!(up.dims(), [1, 4, 6, 3]);

    let kernel = Tensor::<Backend, 4>::ones([2, 2, 5, 3], &device);
    let y = conv2d_transpose(up, kernel, [2, 2], "same".parse::<Padding>().unwrap(), [1, 1]).unwrap();
    assert_eq!(y.dims(), [1, 8, 12, 5]);
}

#[test]
fn test_losses_agree_between_dense_and_sparse_targets() {
    let device = Default::default();
    let logits = Tensor::<Backend, 2>::from_floats([[2.0, 0.5, -1.0], [0.0, 1.0, 3.0]], &device);
    let dense = Tensor::<Backend, 2>::from_floats([[1.0, 0.0, 0.0], [0.0, 0.0, 1.0]], &device);
    let sparse = Tensor::<Backend, 1, Int>::from_ints([0, 2], &device);

    let a = categorical_crossentropy(dense, logits.clone(), true)
        .unwrap()
        .into_data()
        .to_vec::<f32>()
        .unwrap();
    let b = sparse_categorical_crossentropy(sparse, logits, true, -1, None)
        .unwrap()
        .into_data()
        .to_vec::<f32>()
        .unwrap();
    for (x, y) in a.iter().zip(&b) {
        assert!((x - y).abs() < 1e-5, "{x} vs {y}");
    }
}

#[test]
fn test_binary_crossentropy_is_clipped() {
    let device = Default::default();
    let target = Tensor::<Backend, 1>::from_floats([1.0, 0.0], &device);
    let output = Tensor::<Backend, 1>::from_floats([0.0, 1.0], &device);
    let loss = binary_crossentropy(target, output, false)
        .unwrap()
        .into_data()
        .to_vec::<f32>()
        .unwrap();
    assert!(loss.iter().all(|l| l.is_finite() && *l > 10.0));
}

#[test]
fn test_masked_mean_over_time() {
    let device = Default::default();
    // Fraction of valid steps per row of a [batch, time] mask.
    let mask = DynMask::<Backend>::from_bools(
        vec![true, true, false, false, true, true, true, true],
        &[2, 4],
        &device,
    )
    .unwrap();
    assert_eq!(
        mean_mask(&mask, -1, false).unwrap().to_f32_vec().unwrap(),
        vec![0.5, 1.0]
    );

    let x = DynTensor::<Backend>::ones(&[2, 4, 3], &device).unwrap();
    let both = concatenate(&[x.clone(), x], 1).unwrap();
    assert_eq!(both.dims(), vec![2, 8, 3]);
    assert_eq!(mean(&both, 1, true).unwrap().dims(), vec![2, 1, 3]);
}
