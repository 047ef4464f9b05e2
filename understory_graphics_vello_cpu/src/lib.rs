// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_graphics_vello_cpu --heading-base-level=0

//! Vello CPU rasterizer for Understory graphics.
//!
//! [`VelloCpuRasterizer`] implements [`Rasterizer`] on top of the
//! sparse-strips [`vello_cpu::RenderContext`]. Vector backends hand it the
//! content of filters they cannot express and embed the resulting pixels.
//!
//! Gaussian blurs are drawn as `vello_cpu` filter layers. Every other filter
//! is rendered to pixels first and run through
//! [`apply_filter`](understory_graphics::raster::apply_filter).
//!
//! ```
//! use understory_graphics::kurbo::Rect;
//! use understory_graphics::{FillRule, Graphics, GraphicsContext, Rasterizer};
//! use understory_graphics_vello_cpu::VelloCpuRasterizer;
//!
//! let mut g = Graphics::new();
//! g.rectangle(Rect::new(0.0, 0.0, 4.0, 4.0));
//! g.fill(FillRule::NonZero);
//!
//! let image = VelloCpuRasterizer
//!     .rasterize(&g, Rect::new(0.0, 0.0, 8.0, 4.0), 2.0)
//!     .unwrap();
//! assert_eq!((image.width(), image.height()), (16, 8));
//! ```

use kurbo::{Affine, BezPath, Cap, Join, PathEl, Point, Rect, Size};
use peniko::{Blob, ImageAlphaType, ImageData, ImageFormat, ImageQuality, ImageSampler};
use understory_graphics::raster::{self, Rasterizer};
use understory_graphics::{
    Brush, FillRule, Font, Graphics, GraphicsContext, GraphicsError, GraphicsResult, ImageFilter,
    RasterImage, StrokeStyle, TextBaseline, matrix,
};
use vello_common::filter_effects::{EdgeMode, Filter, FilterPrimitive};
use vello_cpu::kurbo::{
    Affine as CpuAffine, BezPath as CpuPath, Cap as CpuCap, Join as CpuJoin, Rect as CpuRect,
    Stroke as CpuStroke,
};
use vello_cpu::{Image as CpuImage, ImageSource, Pixmap, RenderContext, RenderMode, RenderSettings};

/// Renders [`Graphics`] to straight-alpha RGBA8 with `vello_cpu`.
#[derive(Copy, Clone, Debug, Default)]
pub struct VelloCpuRasterizer;

impl Rasterizer for VelloCpuRasterizer {
    #[tracing::instrument(level = "debug", skip(self, graphics))]
    fn rasterize(
        &self,
        graphics: &Graphics,
        region: Rect,
        scale: f64,
    ) -> GraphicsResult<RasterImage> {
        if !(scale.is_finite() && scale > 0.0) {
            return Err(GraphicsError::rasterization(format!(
                "raster scale must be positive, got {scale}"
            )));
        }
        let (width, height) = raster::raster_size(region, scale);
        let settings = RenderSettings {
            // Stable u8 output regardless of the features enabled elsewhere.
            render_mode: RenderMode::OptimizeSpeed,
            ..RenderSettings::default()
        };
        let mut ctx = RenderContext::new_with(width, height, settings);
        {
            let mut replay = Replay::new(self, &mut ctx, raster::region_transform(region, scale));
            graphics.replay(&mut replay)?;
            replay.pop_layers(0);
        }
        ctx.flush();
        let mut pixmap = Pixmap::new(width, height);
        ctx.render_to_pixmap(&mut pixmap);

        let unpremul = pixmap.take_unpremultiplied();
        let mut pixels = Vec::with_capacity(unpremul.len() * 4);
        for p in unpremul {
            pixels.extend_from_slice(&[p.r, p.g, p.b, p.a]);
        }
        RasterImage::new(u32::from(width), u32::from(height), pixels)
    }
}

/// Drawing state that nested content must not leak.
#[derive(Clone, Debug)]
struct State {
    transform: Affine,
    fill: Brush,
    stroke: Brush,
    stroke_style: StrokeStyle,
    font: Option<Font>,
    baseline: TextBaseline,
}

/// Transform and clip depth at a [`GraphicsContext::save`].
#[derive(Copy, Clone, Debug)]
struct Saved {
    transform: Affine,
    layers: usize,
}

/// Replays drawing calls into a render context.
struct Replay<'a> {
    rasterizer: &'a VelloCpuRasterizer,
    ctx: &'a mut RenderContext,
    /// User space to pixels.
    base: Affine,
    state: State,
    path: BezPath,
    /// Clip layers currently pushed.
    layers: usize,
    saved: Vec<Saved>,
}

impl<'a> Replay<'a> {
    fn new(rasterizer: &'a VelloCpuRasterizer, ctx: &'a mut RenderContext, base: Affine) -> Self {
        Self {
            rasterizer,
            ctx,
            base,
            state: State {
                transform: Affine::IDENTITY,
                fill: Brush::default(),
                stroke: Brush::default(),
                stroke_style: StrokeStyle::default(),
                font: None,
                baseline: TextBaseline::default(),
            },
            path: BezPath::new(),
            layers: 0,
            saved: Vec::new(),
        }
    }

    fn device_transform(&self) -> Affine {
        self.base * self.state.transform
    }

    fn sync_transform(&mut self) {
        self.ctx.set_transform(affine_to_cpu(self.device_transform()));
    }

    fn set_paint(&mut self, brush: &Brush) {
        match brush.to_peniko() {
            peniko::Brush::Solid(color) => self.ctx.set_paint(color),
            peniko::Brush::Gradient(gradient) => self.ctx.set_paint(gradient),
            peniko::Brush::Image(_) => {}
        }
        let paint_transform = brush.gradient_transform().unwrap_or(Affine::IDENTITY);
        self.ctx.set_paint_transform(affine_to_cpu(paint_transform));
    }

    fn fill_path(&mut self, path: &BezPath, rule: FillRule, brush: &Brush) {
        if path.elements().is_empty() {
            return;
        }
        self.sync_transform();
        self.set_paint(brush);
        self.ctx.set_fill_rule(rule);
        self.ctx.fill_path(&path_to_cpu(path));
    }

    fn stroke_path(&mut self, path: &BezPath) {
        if path.elements().is_empty() {
            return;
        }
        self.sync_transform();
        let brush = self.state.stroke.clone();
        self.set_paint(&brush);
        self.ctx.set_stroke(stroke_to_cpu(&self.state.stroke_style));
        self.ctx.stroke_path(&path_to_cpu(path));
    }

    fn text_outline(&self, text: &str, origin: Point) -> Option<BezPath> {
        let font = self.state.font.as_ref()?;
        let baseline = Point::new(origin.x, origin.y + font.baseline_offset(self.state.baseline));
        Some(font.outline(text, baseline))
    }

    /// Pops clip layers until only `depth` remain.
    fn pop_layers(&mut self, depth: usize) {
        while self.layers > depth {
            self.ctx.pop_layer();
            self.layers -= 1;
        }
    }

    /// Replays `graphics` on top of the current state and puts the state back.
    fn replay_nested(&mut self, graphics: &Graphics) -> GraphicsResult<()> {
        let state = self.state.clone();
        let path = core::mem::take(&mut self.path);
        let saved = core::mem::take(&mut self.saved);
        let layers = self.layers;
        let result = graphics.replay(self);
        self.pop_layers(layers);
        self.state = state;
        self.path = path;
        self.saved = saved;
        result
    }

    fn draw_blurred(&mut self, graphics: &Graphics, std_dev: f64) -> GraphicsResult<()> {
        #[allow(
            clippy::cast_possible_truncation,
            reason = "vello filter parameters are f32"
        )]
        let std_deviation = std_dev.abs() as f32;
        // `vello_cpu` scales filter parameters by the layer transform, so the
        // deviation stays in user space.
        let blur = Filter::from_primitive(FilterPrimitive::GaussianBlur {
            std_deviation,
            edge_mode: EdgeMode::None,
        });
        self.sync_transform();
        self.ctx.push_layer(None, None, None, None, Some(blur));
        let result = self.replay_nested(graphics);
        self.ctx.pop_layer();
        result
    }

    fn draw_through_pixels(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        let Some(bounds) = graphics.bounds() else {
            return Ok(());
        };
        let scale = matrix::uniform_scale(self.device_transform());
        if !(scale.is_finite() && scale > 0.0) {
            return Ok(());
        }
        let margin = filter.margin();
        let region = bounds.inflate(margin, margin);
        let image = self.rasterizer.rasterize(graphics, region, scale)?;
        let image = raster::apply_filter(self.rasterizer, image, filter, region, scale)?;
        let size = Size::new(
            f64::from(image.width()) / scale,
            f64::from(image.height()) / scale,
        );
        self.draw_raster_image(&image, None, Rect::from_origin_size(region.origin(), size));
        Ok(())
    }
}

impl GraphicsContext for Replay<'_> {
    fn move_to(&mut self, p: Point) {
        self.path.move_to(p);
    }

    fn line_to(&mut self, p: Point) {
        if self.path.elements().is_empty() {
            self.path.move_to(p);
        } else {
            self.path.line_to(p);
        }
    }

    fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point) {
        if self.path.elements().is_empty() {
            self.path.move_to(p1);
        }
        self.path.curve_to(p1, p2, p3);
    }

    fn close_path(&mut self) {
        if !self.path.elements().is_empty() {
            self.path.close_path();
        }
    }

    fn set_fill_brush(&mut self, brush: Brush) {
        self.state.fill = brush;
    }

    fn set_stroke_brush(&mut self, brush: Brush) {
        self.state.stroke = brush;
    }

    fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.state.stroke_style = style;
    }

    fn set_font(&mut self, font: Font) {
        self.state.font = Some(font);
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.state.baseline = baseline;
    }

    fn set_tag(&mut self, _tag: Option<String>) {}

    fn transform(&mut self, m: Affine) {
        self.state.transform = self.state.transform * m;
    }

    fn save(&mut self) {
        self.saved.push(Saved {
            transform: self.state.transform,
            layers: self.layers,
        });
    }

    fn restore(&mut self) {
        self.path = BezPath::new();
        let Some(saved) = self.saved.pop() else {
            tracing::warn!("restore without a matching save");
            return;
        };
        self.pop_layers(saved.layers);
        self.state.transform = saved.transform;
    }

    fn set_clip(&mut self, rule: FillRule) {
        let path = core::mem::take(&mut self.path);
        self.sync_transform();
        self.ctx.set_fill_rule(rule);
        self.ctx.push_clip_layer(&path_to_cpu(&path));
        self.layers += 1;
    }

    fn fill(&mut self, rule: FillRule) {
        let path = core::mem::take(&mut self.path);
        let brush = self.state.fill.clone();
        self.fill_path(&path, rule, &brush);
    }

    fn stroke(&mut self) {
        let path = core::mem::take(&mut self.path);
        self.stroke_path(&path);
    }

    fn fill_text(&mut self, text: &str, origin: Point) {
        if let Some(outline) = self.text_outline(text, origin) {
            let brush = self.state.fill.clone();
            self.fill_path(&outline, FillRule::NonZero, &brush);
        }
    }

    fn stroke_text(&mut self, text: &str, origin: Point) {
        if let Some(outline) = self.text_outline(text, origin) {
            self.stroke_path(&outline);
        }
    }

    fn draw_raster_image(&mut self, image: &RasterImage, source: Option<Rect>, dest: Rect) {
        let (width, height) = (f64::from(image.width()), f64::from(image.height()));
        let src = source.unwrap_or(Rect::new(0.0, 0.0, width, height));
        if src.width().abs() < f64::EPSILON
            || src.height().abs() < f64::EPSILON
            || dest.width().abs() < f64::EPSILON
            || dest.height().abs() < f64::EPSILON
        {
            return;
        }
        let local = Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(dest.width() / src.width(), dest.height() / src.height())
            * Affine::translate((-src.x0, -src.y0));

        let image_data = ImageData {
            data: Blob::from(image.pixels().to_vec()),
            format: ImageFormat::Rgba8,
            alpha_type: ImageAlphaType::Alpha,
            width: image.width(),
            height: image.height(),
        };
        let quality = if image.interpolate {
            ImageQuality::Medium
        } else {
            ImageQuality::Low
        };
        let paint = CpuImage {
            image: ImageSource::from_peniko_image_data(&image_data),
            sampler: ImageSampler {
                quality,
                ..ImageSampler::default()
            },
        };

        // Clip to the destination in the current transform.
        self.sync_transform();
        self.ctx.push_clip_layer(&path_to_cpu(&rect_path(dest)));
        self.ctx.set_paint(paint);
        self.ctx.set_paint_transform(CpuAffine::IDENTITY);
        self.ctx
            .set_transform(affine_to_cpu(self.device_transform() * local));
        self.ctx.fill_rect(&CpuRect::new(0.0, 0.0, width, height));
        self.sync_transform();
        self.ctx.pop_layer();
    }

    fn draw_filtered_graphics(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        match filter {
            ImageFilter::GaussianBlur { std_dev } => self.draw_blurred(graphics, *std_dev),
            _ => self.draw_through_pixels(graphics, filter),
        }
    }
}

fn affine_to_cpu(xf: Affine) -> CpuAffine {
    CpuAffine::new(xf.as_coeffs())
}

fn path_to_cpu(path: &BezPath) -> CpuPath {
    let mut out = CpuPath::new();
    for el in path.elements() {
        match *el {
            PathEl::MoveTo(p) => out.move_to((p.x, p.y)),
            PathEl::LineTo(p) => out.line_to((p.x, p.y)),
            PathEl::QuadTo(p1, p2) => out.quad_to((p1.x, p1.y), (p2.x, p2.y)),
            PathEl::CurveTo(p1, p2, p3) => {
                out.curve_to((p1.x, p1.y), (p2.x, p2.y), (p3.x, p3.y));
            }
            PathEl::ClosePath => out.close_path(),
        }
    }
    out
}

fn rect_path(rect: Rect) -> BezPath {
    let mut path = BezPath::new();
    path.move_to((rect.x0, rect.y0));
    path.line_to((rect.x1, rect.y0));
    path.line_to((rect.x1, rect.y1));
    path.line_to((rect.x0, rect.y1));
    path.close_path();
    path
}

fn stroke_to_cpu(style: &StrokeStyle) -> CpuStroke {
    let cap = |cap: Cap| match cap {
        Cap::Butt => CpuCap::Butt,
        Cap::Round => CpuCap::Round,
        Cap::Square => CpuCap::Square,
    };
    let mut stroke = CpuStroke::new(style.width);
    stroke.miter_limit = style.miter_limit;
    stroke.join = match style.join {
        Join::Bevel => CpuJoin::Bevel,
        Join::Miter => CpuJoin::Miter,
        Join::Round => CpuJoin::Round,
    };
    stroke.start_cap = cap(style.start_cap);
    stroke.end_cap = cap(style.end_cap);
    stroke.dash_pattern = style.dash_pattern.iter().copied().collect();
    stroke.dash_offset = style.dash_offset;
    stroke
}
