//! # Backend Utilities
//!
//! Free functions layered on the tensor engine that recurrent models and
//! their training loops lean on: reductions, losses, image resampling and
//! input placeholders.
//!
//! ## Available Functions
//!
//! | Area | Functions | Module |
//! |------|-----------|--------|
//! | Reductions | [`mean`], [`mean_mask`], [`concatenate`] | `ops` |
//! | Losses | [`categorical_crossentropy`], [`sparse_categorical_crossentropy`], [`binary_crossentropy`] | `losses` |
//! | Images | [`spatial_2d_padding`], [`resize_images`], [`conv2d_transpose`] | `image` |
//! | Inputs | [`InputSpec`] | `input` |
//!
//! ## Data Formats
//!
//! Image helpers take a [`DataFormat`]:
//!
//! | Format | Layout | String |
//! |--------|--------|--------|
//! | [`DataFormat::ChannelsLast`] (default) | `[batch, height, width, channels]` | `"channels_last"` |
//! | [`DataFormat::ChannelsFirst`] | `[batch, channels, height, width]` | `"channels_first"` |
//!
//! Any other string fails with [`Error::InvalidDataFormat`].
//!
//! ## Unsupported Combinations
//!
//! These fail with [`Error::Unsupported`] rather than returning a wrong result:
//!
//! - sparse or ragged placeholders
//! - `ignore_class` in sparse categorical crossentropy, or a class axis other than the last
//! - channels-first or non-nearest resizing
//! - non-unit dilation in transposed convolution

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::Error;

mod image;
mod input;
mod losses;
mod ops;

pub use image::{conv2d_transpose, resize_images, spatial_2d_padding, Padding};
pub use input::InputSpec;
pub use losses::{binary_crossentropy, categorical_crossentropy, sparse_categorical_crossentropy, EPSILON};
pub use ops::{concatenate, mean, mean_mask};

/// Axis ordering of 4D image tensors.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DataFormat {
    ChannelsFirst,
    #[default]
    ChannelsLast,
}

impl DataFormat {
    /// Axes of (rows, cols).
    pub fn spatial_axes(self) -> (usize, usize) {
        match self {
            DataFormat::ChannelsFirst => (2, 3),
            DataFormat::ChannelsLast => (1, 2),
        }
    }
}

impl FromStr for DataFormat {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "channels_first" => Ok(DataFormat::ChannelsFirst),
            "channels_last" => Ok(DataFormat::ChannelsLast),
            other => Err(Error::InvalidDataFormat(other.to_string())),
        }
    }
}

impl fmt::Display for DataFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DataFormat::ChannelsFirst => write!(f, "channels_first"),
            DataFormat::ChannelsLast => write!(f, "channels_last"),
        }
    }
}
