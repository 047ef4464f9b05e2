// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The abstract drawing interface and its recording.

use std::sync::Arc;

use kurbo::{Affine, PathEl, Point, Rect, Shape, Vec2};

use crate::brush::Brush;
use crate::error::GraphicsResult;
use crate::filter::ImageFilter;
use crate::font::{Font, TextBaseline};
use crate::image::RasterImage;
use crate::matrix;
use crate::{FillRule, StrokeStyle};

/// Tolerance used when approximating arcs with cubic Béziers.
pub const ARC_TOLERANCE: f64 = 0.01;

/// A stateful drawing surface.
///
/// Path construction accumulates into an implicit current path that the
/// terminal operations ([`fill`](Self::fill), [`stroke`](Self::stroke),
/// [`set_clip`](Self::set_clip)) consume. [`save`](Self::save) and
/// [`restore`](Self::restore) push and pop the transform and clip together.
/// The current [tag](Self::set_tag) is attached to every element emitted by a
/// terminal operation until it is changed.
pub trait GraphicsContext {
    /// Starts a new figure at `p`.
    fn move_to(&mut self, p: Point);

    /// Adds a line to `p`. On an empty figure this only sets the start point.
    fn line_to(&mut self, p: Point);

    /// Adds a cubic Bézier segment.
    fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point);

    /// Closes the current figure. Closing an empty figure does nothing.
    fn close_path(&mut self);

    /// Adds a closed rectangle figure.
    fn rectangle(&mut self, rect: Rect) {
        self.move_to(Point::new(rect.x0, rect.y0));
        self.line_to(Point::new(rect.x1, rect.y0));
        self.line_to(Point::new(rect.x1, rect.y1));
        self.line_to(Point::new(rect.x0, rect.y1));
        self.close_path();
    }

    /// Adds a circular arc from `start_angle` to `end_angle` (radians).
    ///
    /// A line joins the current point to the start of the arc.
    fn arc(&mut self, center: Point, radius: f64, start_angle: f64, end_angle: f64) {
        self.line_to(center + Vec2::from_angle(start_angle) * radius);
        let arc = kurbo::Arc::new(
            center,
            (radius, radius),
            start_angle,
            end_angle - start_angle,
            0.0,
        );
        for el in arc.append_iter(ARC_TOLERANCE) {
            if let PathEl::CurveTo(p1, p2, p3) = el {
                self.cubic_to(p1, p2, p3);
            }
        }
    }

    /// Sets the paint used by fills.
    fn set_fill_brush(&mut self, brush: Brush);

    /// Sets the paint used by strokes.
    fn set_stroke_brush(&mut self, brush: Brush);

    /// Sets line width, caps, joins and dashes.
    fn set_stroke_style(&mut self, style: StrokeStyle);

    /// Sets the font used by text operations.
    fn set_font(&mut self, font: Font);

    /// Sets how text is placed vertically relative to its origin.
    fn set_text_baseline(&mut self, baseline: TextBaseline);

    /// Sets the tag attached to subsequent elements.
    fn set_tag(&mut self, tag: Option<String>);

    /// Post-multiplies the current transform by `m`.
    fn transform(&mut self, m: Affine);

    /// Translates the current transform.
    fn translate(&mut self, tx: f64, ty: f64) {
        self.transform(Affine::translate((tx, ty)));
    }

    /// Rotates the current transform.
    fn rotate(&mut self, radians: f64) {
        self.transform(Affine::rotate(radians));
    }

    /// Scales the current transform.
    fn scale(&mut self, sx: f64, sy: f64) {
        self.transform(Affine::scale_non_uniform(sx, sy));
    }

    /// Pushes the transform and clip.
    fn save(&mut self);

    /// Pops the transform and clip, discarding any unconsumed path.
    fn restore(&mut self);

    /// Intersects the clip with the current path and consumes it.
    fn set_clip(&mut self, rule: FillRule);

    /// Fills the current path and consumes it.
    fn fill(&mut self, rule: FillRule);

    /// Strokes the current path and consumes it.
    fn stroke(&mut self);

    /// Fills a line of text positioned at `origin`.
    fn fill_text(&mut self, text: &str, origin: Point);

    /// Strokes the outline of a line of text positioned at `origin`.
    fn stroke_text(&mut self, text: &str, origin: Point);

    /// Draws the `source` part of `image` (all of it when `None`) into `dest`.
    fn draw_raster_image(&mut self, image: &RasterImage, source: Option<Rect>, dest: Rect);

    /// Draws `graphics` through `filter`.
    fn draw_filtered_graphics(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()>;
}

/// One recorded call against a [`GraphicsContext`].
#[derive(Clone, Debug, PartialEq)]
pub enum GraphicsOp {
    /// [`GraphicsContext::move_to`]
    MoveTo(Point),
    /// [`GraphicsContext::line_to`]
    LineTo(Point),
    /// [`GraphicsContext::cubic_to`]
    CubicTo(Point, Point, Point),
    /// [`GraphicsContext::close_path`]
    ClosePath,
    /// [`GraphicsContext::set_fill_brush`]
    SetFillBrush(Brush),
    /// [`GraphicsContext::set_stroke_brush`]
    SetStrokeBrush(Brush),
    /// [`GraphicsContext::set_stroke_style`]
    SetStrokeStyle(StrokeStyle),
    /// [`GraphicsContext::set_font`]
    SetFont(Font),
    /// [`GraphicsContext::set_text_baseline`]
    SetTextBaseline(TextBaseline),
    /// [`GraphicsContext::set_tag`]
    SetTag(Option<String>),
    /// [`GraphicsContext::transform`]
    Transform(Affine),
    /// [`GraphicsContext::save`]
    Save,
    /// [`GraphicsContext::restore`]
    Restore,
    /// [`GraphicsContext::set_clip`]
    SetClip(FillRule),
    /// [`GraphicsContext::fill`]
    Fill(FillRule),
    /// [`GraphicsContext::stroke`]
    Stroke,
    /// [`GraphicsContext::fill_text`]
    FillText {
        /// Text.
        text: String,
        /// Anchor point.
        origin: Point,
    },
    /// [`GraphicsContext::stroke_text`]
    StrokeText {
        /// Text.
        text: String,
        /// Anchor point.
        origin: Point,
    },
    /// [`GraphicsContext::draw_raster_image`]
    DrawImage {
        /// Image.
        image: RasterImage,
        /// Source rectangle in pixels.
        source: Option<Rect>,
        /// Destination rectangle.
        dest: Rect,
    },
    /// [`GraphicsContext::draw_filtered_graphics`]
    DrawFiltered {
        /// Content.
        graphics: Arc<Graphics>,
        /// Filter.
        filter: ImageFilter,
    },
}

impl GraphicsOp {
    fn replay(&self, ctx: &mut dyn GraphicsContext) -> GraphicsResult<()> {
        match self {
            Self::MoveTo(p) => ctx.move_to(*p),
            Self::LineTo(p) => ctx.line_to(*p),
            Self::CubicTo(p1, p2, p3) => ctx.cubic_to(*p1, *p2, *p3),
            Self::ClosePath => ctx.close_path(),
            Self::SetFillBrush(b) => ctx.set_fill_brush(b.clone()),
            Self::SetStrokeBrush(b) => ctx.set_stroke_brush(b.clone()),
            Self::SetStrokeStyle(s) => ctx.set_stroke_style(s.clone()),
            Self::SetFont(f) => ctx.set_font(f.clone()),
            Self::SetTextBaseline(b) => ctx.set_text_baseline(*b),
            Self::SetTag(t) => ctx.set_tag(t.clone()),
            Self::Transform(m) => ctx.transform(*m),
            Self::Save => ctx.save(),
            Self::Restore => ctx.restore(),
            Self::SetClip(rule) => ctx.set_clip(*rule),
            Self::Fill(rule) => ctx.fill(*rule),
            Self::Stroke => ctx.stroke(),
            Self::FillText { text, origin } => ctx.fill_text(text, *origin),
            Self::StrokeText { text, origin } => ctx.stroke_text(text, *origin),
            Self::DrawImage {
                image,
                source,
                dest,
            } => ctx.draw_raster_image(image, *source, *dest),
            Self::DrawFiltered { graphics, filter } => {
                return ctx.draw_filtered_graphics(graphics, filter);
            }
        }
        Ok(())
    }

    /// Whether two ops can be blended: same kind, and the same tag for tag ops.
    fn is_compatible(&self, other: &Self) -> bool {
        match (self, other) {
            (Self::SetTag(a), Self::SetTag(b)) => a == b,
            (Self::DrawFiltered { graphics: a, .. }, Self::DrawFiltered { graphics: b, .. }) => {
                a.is_compatible(b)
            }
            _ => core::mem::discriminant(self) == core::mem::discriminant(other),
        }
    }

    fn lerp(&self, other: &Self, t: f64) -> Self {
        let step = || if t < 0.5 { self.clone() } else { other.clone() };
        match (self, other) {
            (Self::MoveTo(a), Self::MoveTo(b)) => Self::MoveTo(a.lerp(*b, t)),
            (Self::LineTo(a), Self::LineTo(b)) => Self::LineTo(a.lerp(*b, t)),
            (Self::CubicTo(a1, a2, a3), Self::CubicTo(b1, b2, b3)) => {
                Self::CubicTo(a1.lerp(*b1, t), a2.lerp(*b2, t), a3.lerp(*b3, t))
            }
            (Self::SetFillBrush(a), Self::SetFillBrush(b)) => Self::SetFillBrush(a.lerp(b, t)),
            (Self::SetStrokeBrush(a), Self::SetStrokeBrush(b)) => {
                Self::SetStrokeBrush(a.lerp(b, t))
            }
            (Self::SetStrokeStyle(a), Self::SetStrokeStyle(b)) => {
                let mut style = if t < 0.5 { a.clone() } else { b.clone() };
                style.width = a.width + (b.width - a.width) * t;
                style.dash_offset = a.dash_offset + (b.dash_offset - a.dash_offset) * t;
                Self::SetStrokeStyle(style)
            }
            (Self::SetFont(a), Self::SetFont(b)) if a.same_face(b) => Self::SetFont(Font {
                source: a.source.clone(),
                size: a.size + (b.size - a.size) * t,
            }),
            (Self::Transform(a), Self::Transform(b)) => {
                let (da, db) = (matrix::decompose(*a), matrix::decompose(*b));
                Self::Transform(da.lerp(&db, t).to_affine())
            }
            (
                Self::FillText { text, origin: a },
                Self::FillText {
                    text: text_b,
                    origin: b,
                },
            ) => Self::FillText {
                text: if t < 0.5 { text.clone() } else { text_b.clone() },
                origin: a.lerp(*b, t),
            },
            (
                Self::StrokeText { text, origin: a },
                Self::StrokeText {
                    text: text_b,
                    origin: b,
                },
            ) => Self::StrokeText {
                text: if t < 0.5 { text.clone() } else { text_b.clone() },
                origin: a.lerp(*b, t),
            },
            (
                Self::DrawImage {
                    image,
                    source,
                    dest: a,
                },
                Self::DrawImage {
                    image: image_b,
                    source: source_b,
                    dest: b,
                },
            ) => {
                let (image, source) = if t < 0.5 {
                    (image.clone(), *source)
                } else {
                    (image_b.clone(), *source_b)
                };
                Self::DrawImage {
                    image,
                    source,
                    dest: lerp_rect(*a, *b, t),
                }
            }
            (
                Self::DrawFiltered { graphics: a, filter },
                Self::DrawFiltered {
                    graphics: b,
                    filter: filter_b,
                },
            ) => Self::DrawFiltered {
                graphics: Arc::new(Graphics::interpolate(a, b, |_| t)),
                filter: if t < 0.5 {
                    filter.clone()
                } else {
                    filter_b.clone()
                },
            },
            _ => step(),
        }
    }
}

fn lerp_rect(a: Rect, b: Rect, t: f64) -> Rect {
    Rect::new(
        a.x0 + (b.x0 - a.x0) * t,
        a.y0 + (b.y0 - a.y0) * t,
        a.x1 + (b.x1 - a.x1) * t,
        a.y1 + (b.y1 - a.y1) * t,
    )
}

/// A recorded sequence of drawing calls.
///
/// `Graphics` is itself a [`GraphicsContext`]: draw into it, then
/// [`replay`](Self::replay) it into any backend.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Graphics {
    ops: Vec<GraphicsOp>,
}

impl Graphics {
    /// An empty recording.
    pub fn new() -> Self {
        Self::default()
    }

    /// Recorded ops, in call order.
    pub fn ops(&self) -> &[GraphicsOp] {
        &self.ops
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.ops.is_empty()
    }

    /// Appends an op.
    pub fn push(&mut self, op: GraphicsOp) {
        self.ops.push(op);
    }

    /// Appends every op of `other`, wrapped in a save/restore pair.
    pub fn draw_graphics(&mut self, other: &Self) {
        self.ops.push(GraphicsOp::Save);
        self.ops.extend(other.ops.iter().cloned());
        self.ops.push(GraphicsOp::Restore);
    }

    /// Issues every recorded call against `ctx`, in order.
    pub fn replay(&self, ctx: &mut dyn GraphicsContext) -> GraphicsResult<()> {
        for op in &self.ops {
            op.replay(ctx)?;
        }
        Ok(())
    }

    /// Union of the device-space bounds of everything drawn, or `None` if
    /// nothing visible was drawn.
    ///
    /// Clips are not applied, so the result is conservative.
    pub fn bounds(&self) -> Option<Rect> {
        let mut ctx = BoundsContext::default();
        // Bounds replay never fails: filtered content is measured, not drawn.
        self.replay(&mut ctx).ok()?;
        ctx.bounds
    }

    /// Whether `self` and `other` have the same shape, op for op.
    pub fn is_compatible(&self, other: &Self) -> bool {
        self.ops.len() == other.ops.len()
            && self
                .ops
                .iter()
                .zip(&other.ops)
                .all(|(a, b)| a.is_compatible(b))
    }

    /// Blends two recordings.
    ///
    /// `progress` maps the tag active at each op (as set by
    /// [`GraphicsContext::set_tag`]) to an interpolation factor, so tagged
    /// items can ease differently. Recordings that are not
    /// [compatible](Self::is_compatible) switch over at the midpoint of the
    /// untagged progress.
    pub fn interpolate(from: &Self, to: &Self, progress: impl Fn(Option<&str>) -> f64) -> Self {
        if !from.is_compatible(to) {
            return if progress(None) < 0.5 {
                from.clone()
            } else {
                to.clone()
            };
        }
        let mut tag: Option<&str> = None;
        let ops = from
            .ops
            .iter()
            .zip(&to.ops)
            .map(|(a, b)| {
                if let GraphicsOp::SetTag(t) = a {
                    tag = t.as_deref();
                }
                a.lerp(b, progress(tag))
            })
            .collect();
        Self { ops }
    }
}

impl GraphicsContext for Graphics {
    fn move_to(&mut self, p: Point) {
        self.ops.push(GraphicsOp::MoveTo(p));
    }

    fn line_to(&mut self, p: Point) {
        self.ops.push(GraphicsOp::LineTo(p));
    }

    fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point) {
        self.ops.push(GraphicsOp::CubicTo(p1, p2, p3));
    }

    fn close_path(&mut self) {
        self.ops.push(GraphicsOp::ClosePath);
    }

    fn set_fill_brush(&mut self, brush: Brush) {
        self.ops.push(GraphicsOp::SetFillBrush(brush));
    }

    fn set_stroke_brush(&mut self, brush: Brush) {
        self.ops.push(GraphicsOp::SetStrokeBrush(brush));
    }

    fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.ops.push(GraphicsOp::SetStrokeStyle(style));
    }

    fn set_font(&mut self, font: Font) {
        self.ops.push(GraphicsOp::SetFont(font));
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.ops.push(GraphicsOp::SetTextBaseline(baseline));
    }

    fn set_tag(&mut self, tag: Option<String>) {
        self.ops.push(GraphicsOp::SetTag(tag));
    }

    fn transform(&mut self, m: Affine) {
        self.ops.push(GraphicsOp::Transform(m));
    }

    fn save(&mut self) {
        self.ops.push(GraphicsOp::Save);
    }

    fn restore(&mut self) {
        self.ops.push(GraphicsOp::Restore);
    }

    fn set_clip(&mut self, rule: FillRule) {
        self.ops.push(GraphicsOp::SetClip(rule));
    }

    fn fill(&mut self, rule: FillRule) {
        self.ops.push(GraphicsOp::Fill(rule));
    }

    fn stroke(&mut self) {
        self.ops.push(GraphicsOp::Stroke);
    }

    fn fill_text(&mut self, text: &str, origin: Point) {
        self.ops.push(GraphicsOp::FillText {
            text: text.to_owned(),
            origin,
        });
    }

    fn stroke_text(&mut self, text: &str, origin: Point) {
        self.ops.push(GraphicsOp::StrokeText {
            text: text.to_owned(),
            origin,
        });
    }

    fn draw_raster_image(&mut self, image: &RasterImage, source: Option<Rect>, dest: Rect) {
        self.ops.push(GraphicsOp::DrawImage {
            image: image.clone(),
            source,
            dest,
        });
    }

    fn draw_filtered_graphics(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        self.ops.push(GraphicsOp::DrawFiltered {
            graphics: Arc::new(graphics.clone()),
            filter: filter.clone(),
        });
        Ok(())
    }
}

/// Accumulates device-space bounds of drawn content.
#[derive(Debug)]
struct BoundsContext {
    transform: Affine,
    stack: Vec<Affine>,
    path: kurbo::BezPath,
    stroke_width: f64,
    font: Option<Font>,
    baseline: TextBaseline,
    bounds: Option<Rect>,
}

impl Default for BoundsContext {
    fn default() -> Self {
        Self {
            transform: Affine::IDENTITY,
            stack: Vec::new(),
            path: kurbo::BezPath::new(),
            stroke_width: 1.0,
            font: None,
            baseline: TextBaseline::Baseline,
            bounds: None,
        }
    }
}

impl BoundsContext {
    fn add_local(&mut self, rect: Rect) {
        let rect = self.transform.transform_rect_bbox(rect);
        self.add_device(rect);
    }

    fn add_device(&mut self, rect: Rect) {
        if !rect.is_finite() {
            return;
        }
        self.bounds = Some(match self.bounds {
            Some(b) => b.union(rect),
            None => rect,
        });
    }

    fn add_text(&mut self, text: &str, origin: Point) {
        let Some(font) = &self.font else {
            return;
        };
        let metrics = font.measure_text(text);
        let baseline_y = origin.y + font.baseline_offset(self.baseline);
        let rect = Rect::new(
            origin.x,
            baseline_y - metrics.ascent,
            origin.x + metrics.width,
            baseline_y - metrics.descent,
        );
        self.add_local(rect);
    }
}

impl GraphicsContext for BoundsContext {
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

    fn set_fill_brush(&mut self, _brush: Brush) {}

    fn set_stroke_brush(&mut self, _brush: Brush) {}

    fn set_stroke_style(&mut self, style: StrokeStyle) {
        self.stroke_width = style.width;
    }

    fn set_font(&mut self, font: Font) {
        self.font = Some(font);
    }

    fn set_text_baseline(&mut self, baseline: TextBaseline) {
        self.baseline = baseline;
    }

    fn set_tag(&mut self, _tag: Option<String>) {}

    fn transform(&mut self, m: Affine) {
        self.transform *= m;
    }

    fn save(&mut self) {
        self.stack.push(self.transform);
    }

    fn restore(&mut self) {
        if let Some(m) = self.stack.pop() {
            self.transform = m;
        }
        self.path.truncate(0);
    }

    fn set_clip(&mut self, _rule: FillRule) {
        self.path.truncate(0);
    }

    fn fill(&mut self, _rule: FillRule) {
        let path = core::mem::take(&mut self.path);
        if !path.elements().is_empty() {
            self.add_device((self.transform * path).bounding_box());
        }
    }

    fn stroke(&mut self) {
        let path = core::mem::take(&mut self.path);
        if !path.elements().is_empty() {
            let half = self.stroke_width * 0.5;
            self.add_local(path.bounding_box().inflate(half, half));
        }
    }

    fn fill_text(&mut self, text: &str, origin: Point) {
        self.add_text(text, origin);
    }

    fn stroke_text(&mut self, text: &str, origin: Point) {
        self.add_text(text, origin);
    }

    fn draw_raster_image(&mut self, _image: &RasterImage, _source: Option<Rect>, dest: Rect) {
        self.add_local(dest);
    }

    fn draw_filtered_graphics(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        if let Some(inner) = graphics.bounds() {
            let margin = filter.margin();
            self.add_local(inner.inflate(margin, margin));
        }
        Ok(())
    }
}
