// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Image filters applied to sub-graphics.

use std::sync::Arc;

use crate::graphics::Graphics;

/// A 4×5 color matrix in row-major order, as in SVG `feColorMatrix`.
///
/// Each output channel is `m[r*5+0]*R + m[r*5+1]*G + m[r*5+2]*B + m[r*5+3]*A + m[r*5+4]`
/// with channels in `0..=1`.
pub type ColorMatrix = [f32; 20];

/// The identity color matrix.
pub const IDENTITY_COLOR_MATRIX: ColorMatrix = [
    1.0, 0.0, 0.0, 0.0, 0.0, //
    0.0, 1.0, 0.0, 0.0, 0.0, //
    0.0, 0.0, 1.0, 0.0, 0.0, //
    0.0, 0.0, 0.0, 1.0, 0.0,
];

/// A square or rectangular convolution kernel.
#[derive(Clone, Debug, PartialEq)]
pub struct ConvolutionKernel {
    /// Kernel width.
    pub columns: u32,
    /// Kernel height.
    pub rows: u32,
    /// `columns * rows` weights, row-major.
    pub weights: Vec<f32>,
    /// Divide by the sum of weights when that sum is nonzero.
    pub normalize: bool,
}

/// A filter applied to a recorded [`Graphics`] as a whole.
#[derive(Clone, Debug, PartialEq)]
pub enum ImageFilter {
    /// Gaussian blur with a standard deviation in user units.
    GaussianBlur {
        /// Standard deviation.
        std_dev: f64,
    },
    /// Box blur with a radius in user units.
    BoxBlur {
        /// Radius.
        radius: f64,
    },
    /// Per-pixel color transform.
    ColorMatrix(ColorMatrix),
    /// Arbitrary convolution, in device pixels.
    Convolution(ConvolutionKernel),
    /// Luminance mask: the content stays visible where the mask is bright.
    Mask(Arc<Graphics>),
    /// Filters applied in sequence.
    Composite(Vec<ImageFilter>),
}

impl ImageFilter {
    /// Gaussian blur.
    pub fn blur(std_dev: f64) -> Self {
        Self::GaussianBlur { std_dev }
    }

    /// A color matrix that converts to luminance-preserving grayscale.
    pub fn grayscale() -> Self {
        Self::ColorMatrix([
            0.2126, 0.7152, 0.0722, 0.0, 0.0, //
            0.2126, 0.7152, 0.0722, 0.0, 0.0, //
            0.2126, 0.7152, 0.0722, 0.0, 0.0, //
            0.0, 0.0, 0.0, 1.0, 0.0,
        ])
    }

    /// How far the filter spreads content beyond its source bounds.
    pub fn margin(&self) -> f64 {
        match self {
            Self::GaussianBlur { std_dev } => 3.0 * std_dev.abs(),
            Self::BoxBlur { radius } => radius.abs(),
            Self::Convolution(kernel) => f64::from(kernel.columns.max(kernel.rows) / 2),
            Self::ColorMatrix(_) | Self::Mask(_) => 0.0,
            Self::Composite(filters) => filters.iter().map(Self::margin).sum(),
        }
    }

    /// Whether SVG can express the filter without rasterizing.
    pub fn is_native(&self) -> bool {
        match self {
            Self::GaussianBlur { .. } | Self::ColorMatrix(_) | Self::Mask(_) => true,
            Self::BoxBlur { .. } | Self::Convolution(_) => false,
            Self::Composite(filters) => filters.iter().all(Self::is_native),
        }
    }

    /// Short human-readable name.
    pub fn name(&self) -> &'static str {
        match self {
            Self::GaussianBlur { .. } => "gaussian blur",
            Self::BoxBlur { .. } => "box blur",
            Self::ColorMatrix(_) => "color matrix",
            Self::Convolution(_) => "convolution",
            Self::Mask(_) => "mask",
            Self::Composite(_) => "composite",
        }
    }
}
