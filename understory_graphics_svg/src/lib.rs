// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_graphics_svg --heading-base-level=0

//! SVG backend for Understory graphics.
//!
//! [`SvgContext`] implements [`GraphicsContext`] and builds an SVG 1.1
//! document tree as drawing calls arrive:
//!
//! - Every terminal operation writes one element carrying the complete
//!   current transform as `matrix(...)`.
//! - Clips become chained `<clipPath>` definitions and wrapping groups.
//! - Gradients become definitions, shared per brush object when
//!   [`SvgOptions::reuse_gradients`] is set.
//! - Presentation attributes are written inline or as shared CSS classes
//!   ([`StyleMode`]).
//! - Text is written as `<text>` with kerning `<tspan>`s, as outlines, or as
//!   references to shared glyph definitions ([`TextEmbedding`]). A font pass
//!   at the end embeds the fonts used, full or subset, as `@font-face`
//!   rules.
//! - Filters are written as SVG filters and masks where possible and
//!   otherwise rasterized through a configured
//!   [`Rasterizer`](understory_graphics::Rasterizer), per [`FilterPolicy`].
//!
//! [`animation_to_svg`] turns an [`Animation`] into a single SMIL-animated
//! document, either by flipping between sampled frames or by animating
//! tagged elements through each transition.
//!
//! # Example
//!
//! ```
//! use understory_graphics::{Graphics, GraphicsContext};
//! use understory_graphics::kurbo::Point;
//! use understory_graphics_svg::{SvgOptions, graphics_to_svg};
//!
//! let mut g = Graphics::new();
//! g.move_to(Point::new(10.0, 30.0));
//! g.line_to(Point::new(90.0, 30.0));
//! g.stroke();
//!
//! let svg = graphics_to_svg(&g, 100.0, 100.0, &SvgOptions::default()).unwrap();
//! assert!(svg.contains(r#"d="M 10 30 L 90 30 ""#));
//! ```
//!
//! [`GraphicsContext`]: understory_graphics::GraphicsContext

mod animation;
mod context;
mod controls;
mod document;
mod error;
mod filters;
mod fmt;
mod fonts;
mod options;
mod paint;
mod path_data;
mod registry;
#[cfg(test)]
mod testing;
mod text;
pub mod xml;

pub use context::SvgContext;
pub use error::{SvgError, SvgResult};
pub use options::{
    AnimationMode, AnimationOptions, FilterOperation, FilterPolicy, RepeatCount, StyleMode,
    SvgOptions, TextEmbedding,
};
pub use registry::parse_declarations;
pub use xml::{Element, Node};

use understory_graphics::{Animation, Graphics};

/// Renders `graphics` on a `width` × `height` page and returns the SVG
/// document text.
#[tracing::instrument(skip_all)]
pub fn graphics_to_svg(
    graphics: &Graphics,
    width: f64,
    height: f64,
    options: &SvgOptions,
) -> SvgResult<String> {
    let mut ctx = SvgContext::new(options.clone());
    graphics.replay(&mut ctx)?;
    Ok(ctx.finish(width, height)?.to_document())
}

/// Renders `animation` as one animated SVG document.
///
/// # Errors
///
/// [`SvgError::InvalidAnimation`] when the animation has no frames or the
/// discrete frame rate is not positive, and any error raised while drawing
/// a frame.
#[tracing::instrument(skip_all, fields(frames = animation.frames().len(), mode = ?options.mode))]
pub fn animation_to_svg(animation: &Animation, options: &AnimationOptions) -> SvgResult<String> {
    Ok(animation::synthesize(animation, options)?.to_document())
}
