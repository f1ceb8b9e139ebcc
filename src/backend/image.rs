use std::str::FromStr;

use burn::tensor::backend::Backend;
use burn::tensor::module::conv_transpose2d;
use burn::tensor::ops::ConvTransposeOptions;
use burn::tensor::Tensor;

use super::DataFormat;
use crate::error::{Error, Result};

/// Zero-pad the two spatial axes of a 4D tensor.
///
/// `padding` is `[[top, bottom], [left, right]]`; `None` pads one on every side.
pub fn spatial_2d_padding<B: Backend>(
    x: Tensor<B, 4>,
    padding: Option<[[usize; 2]; 2]>,
    data_format: DataFormat,
) -> Tensor<B, 4> {
    let [[top, bottom], [left, right]] = padding.unwrap_or([[1, 1], [1, 1]]);
    let (rows, cols) = data_format.spatial_axes();
    let x = pad_axis(x, rows, top, bottom);
    pad_axis(x, cols, left, right)
}

fn pad_axis<B: Backend>(x: Tensor<B, 4>, axis: usize, before: usize, after: usize) -> Tensor<B, 4> {
    if before == 0 && after == 0 {
        return x;
    }
    let device = x.device();
    let zeros = |n: usize| {
        let mut dims = x.dims();
        dims[axis] = n;
        Tensor::<B, 4>::zeros(dims, &device)
    };
    let mut parts = Vec::with_capacity(3);
    if before > 0 {
        parts.push(zeros(before));
    }
    let tail = (after > 0).then(|| zeros(after));
    parts.push(x);
    parts.extend(tail);
    Tensor::cat(parts, axis)
}

/// Upsample the spatial axes by integer factors.
///
/// Only nearest-neighbour interpolation on channels-last input is supported.
pub fn resize_images<B: Backend>(
    x: Tensor<B, 4>,
    height_factor: usize,
    width_factor: usize,
    data_format: DataFormat,
    interpolation: &str,
) -> Result<Tensor<B, 4>> {
    if data_format == DataFormat::ChannelsFirst {
        return Err(Error::unsupported("resize_images with channels_first data"));
    }
    if interpolation != "nearest" {
        return Err(Error::unsupported(format!(
            "resize_images interpolation `{interpolation}`"
        )));
    }
    if height_factor == 0 || width_factor == 0 {
        return Err(Error::config("resize factors must be positive"));
    }
    let [n, h, w, c] = x.dims();
    let x: Tensor<B, 6> = x.reshape([n, h, 1, w, 1, c]);
    let x = Tensor::cat(vec![x; height_factor], 2);
    let x = Tensor::cat(vec![x; width_factor], 4);
    Ok(x.reshape([n, h * height_factor, w * width_factor, c]))
}

/// Padding scheme of a convolution.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Padding {
    Valid,
    Same,
}

impl FromStr for Padding {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_ascii_uppercase().as_str() {
            "VALID" => Ok(Padding::Valid),
            "SAME" => Ok(Padding::Same),
            _ => Err(Error::config(format!("unknown padding `{s}`"))),
        }
    }
}

/// Transposed 2D convolution on `[batch, height, width, channels]` input.
///
/// `kernel` uses the `[kh, kw, out_channels, in_channels]` layout. Output
/// spatial size is `in * stride` for [`Padding::Same`] and
/// `(in - 1) * stride + k` for [`Padding::Valid`].
pub fn conv2d_transpose<B: Backend>(
    x: Tensor<B, 4>,
    kernel: Tensor<B, 4>,
    strides: [usize; 2],
    padding: Padding,
    dilation_rate: [usize; 2],
) -> Result<Tensor<B, 4>> {
    if dilation_rate != [1, 1] {
        return Err(Error::unsupported(
            "dilation_rate other than [1, 1] in conv2d_transpose",
        ));
    }
    let [kh, kw, _, in_channels] = kernel.dims();
    let [_, _, _, channels] = x.dims();
    if in_channels != channels {
        return Err(Error::shape(
            "conv2d_transpose input channels",
            &[in_channels],
            &[channels],
        ));
    }

    let [_, in_h, in_w, _] = x.dims();
    // Leading offset and kept extent per spatial axis. SAME drops
    // `floor(total / 2)` rows in front and the remainder at the back.
    let mut crop = [(0, 0); 2];
    for (i, (k, s, extent)) in [(kh, strides[0], in_h), (kw, strides[1], in_w)]
        .into_iter()
        .enumerate()
    {
        crop[i] = match padding {
            Padding::Valid => (0, (extent - 1) * s + k),
            Padding::Same if k < s => {
                return Err(Error::unsupported(
                    "same padding with a kernel smaller than the stride",
                ))
            }
            Padding::Same => ((k - s) / 2, extent * s),
        };
    }

    // NHWC -> NCHW, [kh, kw, out, in] -> [in, out, kh, kw]
    let x = x.swap_dims(1, 3).swap_dims(2, 3);
    let weight = kernel.swap_dims(0, 3).swap_dims(1, 2).swap_dims(2, 3);
    let options = ConvTransposeOptions::new(strides, [0, 0], [0, 0], dilation_rate, 1);
    let y = conv_transpose2d(x, weight, None, options)
        .swap_dims(1, 3)
        .swap_dims(1, 2);
    Ok(y.narrow(1, crop[0].0, crop[0].1)
        .narrow(2, crop[1].0, crop[1].1))
}

#[cfg(test)]
mod tests {
    use super::*;
    use burn::backend::NdArray;

    type TestBackend = NdArray<f32>;

    fn values(t: Tensor<TestBackend, 4>) -> Vec<f32> {
        t.into_data().to_vec::<f32>().unwrap()
    }

    #[test]
    fn test_padding_channels_last() {
        let x = Tensor::<TestBackend, 4>::ones([1, 2, 2, 3], &Default::default());
        let y = spatial_2d_padding(x, None, DataFormat::ChannelsLast);
        assert_eq!(y.dims(), [1, 4, 4, 3]);
        let sum: f32 = values(y).iter().sum();
        assert_eq!(sum, 12.0);
    }

    #[test]
    fn test_padding_channels_first_asymmetric() {
        let x = Tensor::<TestBackend, 4>::ones([1, 3, 2, 2], &Default::default());
        let y = spatial_2d_padding(x, Some([[0, 2], [1, 0]]), DataFormat::ChannelsFirst);
        assert_eq!(y.dims(), [1, 3, 4, 3]);
    }

    #[test]
    fn test_resize_nearest() {
        let x = Tensor::<TestBackend, 4>::from_floats([[[[1.0], [2.0]]]], &Default::default());
        let y = resize_images(x, 2, 2, DataFormat::ChannelsLast, "nearest").unwrap();
        assert_eq!(y.dims(), [1, 2, 4, 1]);
        assert_eq!(values(y), vec![1.0, 1.0, 2.0, 2.0, 1.0, 1.0, 2.0, 2.0]);
    }

    #[test]
    fn test_resize_unsupported() {
        let x = Tensor::<TestBackend, 4>::zeros([1, 1, 2, 2], &Default::default());
        assert!(matches!(
            resize_images(x.clone(), 2, 2, DataFormat::ChannelsFirst, "nearest"),
            Err(Error::Unsupported(_))
        ));
        assert!(matches!(
            resize_images(x, 2, 2, DataFormat::ChannelsLast, "bilinear"),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_conv2d_transpose_output_sizes() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 3, 3, 2], &device);
        let kernel = Tensor::<TestBackend, 4>::ones([3, 3, 4, 2], &device);
        let same = conv2d_transpose(x.clone(), kernel.clone(), [2, 2], Padding::Same, [1, 1]).unwrap();
        assert_eq!(same.dims(), [1, 6, 6, 4]);
        let valid = conv2d_transpose(x, kernel, [2, 2], Padding::Valid, [1, 1]).unwrap();
        assert_eq!(valid.dims(), [1, 7, 7, 4]);
    }

    #[test]
    fn test_conv2d_transpose_unit_kernel_copies_input() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::from_floats([[[[1.0], [2.0]], [[3.0], [4.0]]]], &device);
        let kernel = Tensor::<TestBackend, 4>::ones([1, 1, 1, 1], &device);
        let y = conv2d_transpose(x, kernel, [1, 1], Padding::Valid, [1, 1]).unwrap();
        assert_eq!(values(y), vec![1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_conv2d_transpose_same_crops_front_by_half_the_overlap() {
        let device = Default::default();
        // Height 2, stride 2, kernel height 3: full output is [1, 10, 102, 20, 200].
        let x = Tensor::<TestBackend, 4>::from_floats([[[[1.0]], [[2.0]]]], &device);
        let kernel =
            Tensor::<TestBackend, 4>::from_floats([[[[1.0]]], [[[10.0]]], [[[100.0]]]], &device);

        let same = conv2d_transpose(x.clone(), kernel.clone(), [2, 1], Padding::Same, [1, 1]).unwrap();
        assert_eq!(same.dims(), [1, 4, 1, 1]);
        assert_eq!(values(same), vec![1.0, 10.0, 102.0, 20.0]);

        let valid = conv2d_transpose(x, kernel, [2, 1], Padding::Valid, [1, 1]).unwrap();
        assert_eq!(values(valid), vec![1.0, 10.0, 102.0, 20.0, 200.0]);
    }

    #[test]
    fn test_conv2d_transpose_rejects_dilation() {
        let device = Default::default();
        let x = Tensor::<TestBackend, 4>::ones([1, 2, 2, 1], &device);
        let kernel = Tensor::<TestBackend, 4>::ones([2, 2, 1, 1], &device);
        assert!(matches!(
            conv2d_transpose(x, kernel, [1, 1], Padding::Valid, [2, 2]),
            Err(Error::Unsupported(_))
        ));
    }

    #[test]
    fn test_parse_padding() {
        assert_eq!("same".parse::<Padding>().unwrap(), Padding::Same);
        assert_eq!("VALID".parse::<Padding>().unwrap(), Padding::Valid);
        assert!("full".parse::<Padding>().is_err());
    }
}
