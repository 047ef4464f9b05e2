// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Rasterization seam and pixel-space filter kernels.
//!
//! Backends that cannot express a filter natively render the filtered
//! content with a [`Rasterizer`] and run the filter here with
//! [`apply_filter`]. Blur and convolution kernels operate on premultiplied
//! RGBA8; the color matrix operates on straight alpha.

use std::fmt;

use kurbo::{Affine, Rect};

use crate::error::{GraphicsError, GraphicsResult};
use crate::filter::{ColorMatrix, ConvolutionKernel, ImageFilter};
use crate::graphics::Graphics;
use crate::image::RasterImage;

/// Renders recorded graphics to pixels.
pub trait Rasterizer: Send + Sync + fmt::Debug {
    /// Renders the user-space `region` of `graphics` at `scale` pixels per unit.
    ///
    /// The returned image is `ceil(region.width() * scale)` by
    /// `ceil(region.height() * scale)` pixels with straight alpha.
    fn rasterize(
        &self,
        graphics: &Graphics,
        region: Rect,
        scale: f64,
    ) -> GraphicsResult<RasterImage>;
}

/// Pixel dimensions of `region` rendered at `scale`.
#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "dimensions are clamped to u16 range before casting"
)]
pub fn raster_size(region: Rect, scale: f64) -> (u16, u16) {
    let w = (region.width() * scale).ceil().clamp(1.0, f64::from(u16::MAX));
    let h = (region.height() * scale).ceil().clamp(1.0, f64::from(u16::MAX));
    (w as u16, h as u16)
}

/// Transform from user space to the pixel grid of `region` at `scale`.
pub fn region_transform(region: Rect, scale: f64) -> Affine {
    Affine::scale(scale) * Affine::translate((-region.x0, -region.y0))
}

/// Applies `filter` to `image`, which shows `region` at `scale`.
///
/// Masks are rendered with `rasterizer` over the same region.
pub fn apply_filter(
    rasterizer: &dyn Rasterizer,
    image: RasterImage,
    filter: &ImageFilter,
    region: Rect,
    scale: f64,
) -> GraphicsResult<RasterImage> {
    match filter {
        ImageFilter::GaussianBlur { std_dev } => {
            #[allow(
                clippy::cast_possible_truncation,
                reason = "kernel math runs in f32"
            )]
            let sigma = (std_dev * scale) as f32;
            gaussian_blur(&image, sigma)
        }
        ImageFilter::BoxBlur { radius } => {
            #[allow(
                clippy::cast_possible_truncation,
                clippy::cast_sign_loss,
                reason = "radius is rounded and non-negative"
            )]
            let radius = (radius.abs() * scale).round() as u32;
            box_blur(&image, radius)
        }
        ImageFilter::ColorMatrix(matrix) => Ok(color_matrix(&image, matrix)),
        ImageFilter::Convolution(kernel) => convolve(&image, kernel),
        ImageFilter::Mask(mask) => {
            tracing::debug!(?region, scale, "rasterizing filter mask");
            let mask = rasterizer.rasterize(mask, region, scale)?;
            apply_mask(&image, &mask)
        }
        ImageFilter::Composite(filters) => filters.iter().try_fold(image, |image, filter| {
            apply_filter(rasterizer, image, filter, region, scale)
        }),
    }
}

/// Separable Gaussian blur with a kernel radius of `ceil(3σ)`.
pub fn gaussian_blur(image: &RasterImage, sigma: f32) -> GraphicsResult<RasterImage> {
    if !sigma.is_finite() || sigma <= 0.0 {
        return Ok(image.clone());
    }
    #[allow(
        clippy::cast_possible_truncation,
        clippy::cast_sign_loss,
        reason = "sigma is positive and finite"
    )]
    let radius = (sigma * 3.0).ceil() as u32;
    let kernel = gaussian_kernel_q16(radius, sigma)?;
    separable(image, &kernel)
}

/// Box blur of the given pixel radius.
pub fn box_blur(image: &RasterImage, radius: u32) -> GraphicsResult<RasterImage> {
    if radius == 0 {
        return Ok(image.clone());
    }
    let taps = 2 * radius + 1;
    let weight = 65536 / taps;
    let mut kernel = vec![weight; taps as usize];
    // Put the rounding remainder in the center tap so weights sum to 1.0.
    kernel[radius as usize] += 65536 - weight * taps;
    separable(image, &kernel)
}

fn gaussian_kernel_q16(radius: u32, sigma: f32) -> GraphicsResult<Vec<u32>> {
    if radius == 0 {
        return Ok(vec![1 << 16]);
    }
    #[allow(
        clippy::cast_possible_wrap,
        reason = "blur radii are far below i32::MAX"
    )]
    let r = radius as i32;
    let sigma = f64::from(sigma);
    let denom = 2.0 * sigma * sigma;
    let weights_f: Vec<f64> = (-r..=r)
        .map(|i| {
            let x = f64::from(i);
            (-x * x / denom).exp()
        })
        .collect();
    let sum: f64 = weights_f.iter().sum();
    if sum <= 0.0 {
        return Err(GraphicsError::rasterization("gaussian kernel sum is zero"));
    }

    let mut weights = Vec::with_capacity(weights_f.len());
    let mut acc: i64 = 0;
    for &wf in &weights_f {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "weights are in 0..=65536"
        )]
        let q = (((wf / sum) * 65536.0).round() as i64).clamp(0, 65536);
        weights.push(u32::try_from(q).unwrap_or(0));
        acc += q;
    }
    let delta = 65536 - acc;
    if delta != 0 {
        let mid = weights.len() / 2;
        let fixed = (i64::from(weights[mid]) + delta).clamp(0, 65536);
        weights[mid] = u32::try_from(fixed).unwrap_or(0);
    }
    Ok(weights)
}

fn separable(image: &RasterImage, kernel: &[u32]) -> GraphicsResult<RasterImage> {
    let (w, h) = (image.width() as usize, image.height() as usize);
    let src = premultiply(image.pixels());
    let mut tmp = vec![0_u8; src.len()];
    let mut out = vec![0_u8; src.len()];
    pass(&src, &mut tmp, w, h, kernel, true);
    pass(&tmp, &mut out, w, h, kernel, false);
    unpremultiply(&mut out);
    Ok(RasterImage::new(image.width(), image.height(), out)?.with_interpolation(image.interpolate))
}

fn pass(src: &[u8], dst: &mut [u8], w: usize, h: usize, k: &[u32], horizontal: bool) {
    let radius = k.len() / 2;
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0_u64; 4];
            for (ki, &kw) in k.iter().enumerate() {
                // Edge pixels are clamped.
                let (sx, sy) = if horizontal {
                    ((x + ki).saturating_sub(radius).min(w - 1), y)
                } else {
                    (x, (y + ki).saturating_sub(radius).min(h - 1))
                };
                let idx = (sy * w + sx) * 4;
                for c in 0..4 {
                    acc[c] += u64::from(kw) * u64::from(src[idx + c]);
                }
            }
            let out = (y * w + x) * 4;
            for c in 0..4 {
                dst[out + c] = q16_to_u8(acc[c]);
            }
        }
    }
}

fn q16_to_u8(acc: u64) -> u8 {
    u8::try_from((acc + 32768) >> 16).unwrap_or(u8::MAX)
}

/// Applies a 4×5 color matrix to every pixel.
pub fn color_matrix(image: &RasterImage, m: &ColorMatrix) -> RasterImage {
    let mut out = image.pixels().to_vec();
    for px in out.chunks_exact_mut(4) {
        let v = [
            f32::from(px[0]) / 255.0,
            f32::from(px[1]) / 255.0,
            f32::from(px[2]) / 255.0,
            f32::from(px[3]) / 255.0,
        ];
        for (row, channel) in px.iter_mut().enumerate() {
            let r = &m[row * 5..row * 5 + 5];
            let value = r[0] * v[0] + r[1] * v[1] + r[2] * v[2] + r[3] * v[3] + r[4];
            *channel = unit_to_u8(value);
        }
    }
    rebuild(image, out)
}

/// Convolves premultiplied pixels with `kernel`, clamping at the edges.
pub fn convolve(image: &RasterImage, kernel: &ConvolutionKernel) -> GraphicsResult<RasterImage> {
    let (cols, rows) = (kernel.columns as usize, kernel.rows as usize);
    if cols == 0 || rows == 0 || kernel.weights.len() != cols * rows {
        return Err(GraphicsError::rasterization(format!(
            "convolution kernel of {}x{} needs {} weights, got {}",
            kernel.columns,
            kernel.rows,
            cols * rows,
            kernel.weights.len()
        )));
    }
    let sum: f32 = kernel.weights.iter().sum();
    let divisor = if kernel.normalize && sum != 0.0 { sum } else { 1.0 };

    let (w, h) = (image.width() as usize, image.height() as usize);
    let src = premultiply(image.pixels());
    let mut out = vec![0_u8; src.len()];
    let (cx, cy) = (cols / 2, rows / 2);
    for y in 0..h {
        for x in 0..w {
            let mut acc = [0_f32; 4];
            for ky in 0..rows {
                let sy = (y + ky).saturating_sub(cy).min(h - 1);
                for kx in 0..cols {
                    let sx = (x + kx).saturating_sub(cx).min(w - 1);
                    let weight = kernel.weights[ky * cols + kx];
                    let idx = (sy * w + sx) * 4;
                    for c in 0..4 {
                        acc[c] += weight * f32::from(src[idx + c]);
                    }
                }
            }
            let idx = (y * w + x) * 4;
            let alpha = (acc[3] / divisor).clamp(0.0, 255.0);
            for c in 0..3 {
                // Keep the result a valid premultiplied color.
                out[idx + c] = unit_to_u8((acc[c] / divisor).clamp(0.0, alpha) / 255.0);
            }
            out[idx + 3] = unit_to_u8(alpha / 255.0);
        }
    }
    unpremultiply(&mut out);
    Ok(rebuild(image, out))
}

/// Multiplies alpha by the mask's luminance times its alpha.
pub fn apply_mask(image: &RasterImage, mask: &RasterImage) -> GraphicsResult<RasterImage> {
    if (image.width(), image.height()) != (mask.width(), mask.height()) {
        return Err(GraphicsError::rasterization(format!(
            "mask is {}x{}, content is {}x{}",
            mask.width(),
            mask.height(),
            image.width(),
            image.height()
        )));
    }
    let mut out = image.pixels().to_vec();
    for (px, m) in out.chunks_exact_mut(4).zip(mask.pixels().chunks_exact(4)) {
        let [r, g, b] = [m[0], m[1], m[2]].map(f32::from);
        let luminance = (0.2125 * r + 0.7154 * g + 0.0721 * b) / 255.0;
        let coverage = luminance * f32::from(m[3]) / 255.0;
        px[3] = unit_to_u8(f32::from(px[3]) / 255.0 * coverage);
    }
    Ok(rebuild(image, out))
}

fn rebuild(like: &RasterImage, pixels: Vec<u8>) -> RasterImage {
    RasterImage::new(like.width(), like.height(), pixels)
        .unwrap_or_else(|_| RasterImage::transparent(like.width(), like.height()))
        .with_interpolation(like.interpolate)
}

#[allow(
    clippy::cast_possible_truncation,
    clippy::cast_sign_loss,
    reason = "value is clamped to 0..=255"
)]
fn unit_to_u8(v: f32) -> u8 {
    (v.clamp(0.0, 1.0) * 255.0).round() as u8
}

fn premultiply(pixels: &[u8]) -> Vec<u8> {
    let mut out = pixels.to_vec();
    for px in out.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        for c in &mut px[..3] {
            *c = u8::try_from((u16::from(*c) * a + 127) / 255).unwrap_or(u8::MAX);
        }
    }
    out
}

fn unpremultiply(pixels: &mut [u8]) {
    for px in pixels.chunks_exact_mut(4) {
        let a = u16::from(px[3]);
        if a == 0 {
            px[..3].fill(0);
            continue;
        }
        for c in &mut px[..3] {
            *c = u8::try_from(((u16::from(*c) * 255 + a / 2) / a).min(255)).unwrap_or(u8::MAX);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::filter::IDENTITY_COLOR_MATRIX;

    fn solid(w: u32, h: u32, px: [u8; 4]) -> RasterImage {
        RasterImage::new(w, h, px.repeat((w * h) as usize)).unwrap()
    }

    #[test]
    fn blur_zero_sigma_is_identity() {
        let image = RasterImage::new(1, 2, vec![1_u8, 2, 3, 4, 5, 6, 7, 8]).unwrap();
        assert_eq!(gaussian_blur(&image, 0.0).unwrap(), image);
    }

    #[test]
    fn blur_constant_image_is_identity() {
        let image = solid(4, 3, [10, 20, 30, 255]);
        assert_eq!(gaussian_blur(&image, 2.0).unwrap(), image);
        assert_eq!(box_blur(&image, 2).unwrap(), image);
    }

    #[test]
    fn blur_spreads_energy_from_single_pixel() {
        let (w, h) = (5_u32, 5_u32);
        let mut px = vec![0_u8; (w * h * 4) as usize];
        let center = ((2 * w + 2) * 4) as usize;
        px[center..center + 4].copy_from_slice(&[255, 255, 255, 255]);
        let image = RasterImage::new(w, h, px).unwrap();

        let out = gaussian_blur(&image, 0.8).unwrap();
        let nonzero = out.pixels().chunks_exact(4).filter(|px| px[3] != 0).count();
        assert!(nonzero > 1, "blur should spread alpha");
        let sum_a: u32 = out.pixels().chunks_exact(4).map(|px| u32::from(px[3])).sum();
        assert!((sum_a as i32 - 255).abs() <= 6, "alpha sum {sum_a}");
    }

    #[test]
    fn identity_color_matrix_keeps_pixels() {
        let image = solid(2, 2, [12, 34, 56, 200]);
        assert_eq!(color_matrix(&image, &IDENTITY_COLOR_MATRIX), image);
    }

    #[test]
    fn identity_convolution_keeps_opaque_pixels() {
        let image = solid(3, 3, [90, 80, 70, 255]);
        let kernel = ConvolutionKernel {
            columns: 3,
            rows: 3,
            weights: vec![0.0, 0.0, 0.0, 0.0, 1.0, 0.0, 0.0, 0.0, 0.0],
            normalize: true,
        };
        assert_eq!(convolve(&image, &kernel).unwrap(), image);
    }

    #[test]
    fn black_mask_hides_content() {
        let image = solid(2, 2, [255, 0, 0, 255]);
        let mask = solid(2, 2, [0, 0, 0, 255]);
        let out = apply_mask(&image, &mask).unwrap();
        assert!(out.pixels().chunks_exact(4).all(|px| px[3] == 0));
        let white = solid(2, 2, [255, 255, 255, 255]);
        assert_eq!(apply_mask(&image, &white).unwrap(), image);
    }

    #[test]
    fn raster_size_rounds_up() {
        assert_eq!(raster_size(Rect::new(0.0, 0.0, 10.5, 3.0), 2.0), (21, 6));
    }
}
