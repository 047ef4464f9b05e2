// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Raster images.

use std::sync::Arc;

use png::{BitDepth, ColorType, Encoder};

use crate::error::{GraphicsError, GraphicsResult};

/// An 8-bit RGBA image with straight (unpremultiplied) alpha.
#[derive(Clone, Debug, PartialEq)]
pub struct RasterImage {
    width: u32,
    height: u32,
    pixels: Arc<[u8]>,
    /// Whether scaling should smooth between pixels.
    pub interpolate: bool,
}

impl RasterImage {
    /// Wraps `pixels`, which must hold `width * height` RGBA texels.
    pub fn new(width: u32, height: u32, pixels: impl Into<Arc<[u8]>>) -> GraphicsResult<Self> {
        let pixels = pixels.into();
        let expected = width as usize * height as usize * 4;
        if pixels.len() != expected {
            return Err(GraphicsError::invalid_image(format!(
                "{width}x{height} image needs {expected} bytes, got {}",
                pixels.len()
            )));
        }
        Ok(Self {
            width,
            height,
            pixels,
            interpolate: true,
        })
    }

    /// A fully transparent image.
    pub fn transparent(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            pixels: vec![0; width as usize * height as usize * 4].into(),
            interpolate: true,
        }
    }

    /// Width in pixels.
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    pub fn height(&self) -> u32 {
        self.height
    }

    /// RGBA bytes, row-major.
    pub fn pixels(&self) -> &[u8] {
        &self.pixels
    }

    /// Shared handle to the RGBA bytes.
    pub fn pixel_data(&self) -> Arc<[u8]> {
        self.pixels.clone()
    }

    /// Returns a copy with nearest-neighbour sampling.
    #[must_use]
    pub fn with_interpolation(mut self, interpolate: bool) -> Self {
        self.interpolate = interpolate;
        self
    }

    /// Encodes the image as PNG.
    pub fn to_png(&self) -> GraphicsResult<Vec<u8>> {
        let mut out = Vec::new();
        {
            let mut encoder = Encoder::new(&mut out, self.width, self.height);
            encoder.set_color(ColorType::Rgba);
            encoder.set_depth(BitDepth::Eight);
            let mut writer = encoder
                .write_header()
                .map_err(|e| GraphicsError::image_encoding(e.to_string()))?;
            writer
                .write_image_data(&self.pixels)
                .map_err(|e| GraphicsError::image_encoding(e.to_string()))?;
            writer
                .finish()
                .map_err(|e| GraphicsError::image_encoding(e.to_string()))?;
        }
        Ok(out)
    }
}
