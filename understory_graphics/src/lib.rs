// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_graphics --heading-base-level=0

//! Understory Graphics: an abstract drawing interface and a recorded
//! drawing model.
//!
//! This crate sits between code that *draws* and backends that *serialize
//! or render*. Callers issue path, style, transform, text, image and filter
//! operations against a [`GraphicsContext`]; backends implement that trait.
//!
//! # Core concepts
//!
//! - **Drawing interface**: [`GraphicsContext`] is a stateful, canvas-like
//!   surface with an implicit current path, a save/restore stack of
//!   transform and clip, and a *tag* that names emitted elements.
//! - **Recording**: [`Graphics`] records calls as [`GraphicsOp`]s so they
//!   can be replayed, measured ([`Graphics::bounds`]) and blended
//!   ([`Graphics::interpolate`]).
//! - **Paint**: [`Brush`] is a solid color or a shared gradient; gradient
//!   identity is object identity.
//! - **Text**: [`Font`] wraps a [`FontSource`] service that supplies
//!   metrics, kerning, outlines and the font program.
//! - **Filters**: [`ImageFilter`] describes blur, color matrix, mask and
//!   composite effects. [`Rasterizer`] and [`raster::apply_filter`] form the
//!   pixel-space fallback for backends that cannot express a filter.
//! - **Animation**: [`Animation`] sequences [`Frame`]s with eased
//!   [`Transition`]s.
//! - **Matrix math**: the [`matrix`] module composes, inverts and
//!   decomposes affine transforms.
//!
//! # Example
//!
//! ```
//! use understory_graphics::{Brush, FillRule, Graphics, GraphicsContext};
//! use understory_graphics::kurbo::Rect;
//! use understory_graphics::peniko::Color;
//!
//! let mut g = Graphics::new();
//! g.set_fill_brush(Brush::Solid(Color::from_rgba8(255, 0, 0, 255)));
//! g.translate(10.0, 0.0);
//! g.rectangle(Rect::new(0.0, 0.0, 20.0, 20.0));
//! g.fill(FillRule::NonZero);
//! assert_eq!(g.bounds(), Some(Rect::new(10.0, 0.0, 30.0, 20.0)));
//! ```

pub mod animation;
pub mod brush;
mod error;
pub mod filter;
pub mod font;
pub mod graphics;
pub mod image;
pub mod matrix;
pub mod raster;

pub use kurbo;
pub use peniko;

pub use animation::{Animation, Easing, Frame, TimelinePosition, Transition};
pub use brush::{Brush, GradientStop, LinearGradient, RadialGradient};
pub use error::{GraphicsError, GraphicsResult};
pub use filter::{ColorMatrix, ConvolutionKernel, ImageFilter};
pub use font::{
    Font, FontFlags, FontSource, GenericFamily, PositionedGlyph, TextBaseline, TextMetrics,
};
pub use graphics::{Graphics, GraphicsContext, GraphicsOp};
pub use image::RasterImage;
pub use raster::Rasterizer;

/// Affine transform type used by the drawing interface.
pub type Affine = kurbo::Affine;

/// Fill rule for fills and clips.
pub type FillRule = peniko::Fill;

/// Stroke parameters: width, joins, caps and dashes.
pub type StrokeStyle = kurbo::Stroke;
