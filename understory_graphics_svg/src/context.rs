// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! The SVG graphics context.

use base64::Engine as _;
use kurbo::{Affine, Point, Rect};
use understory_graphics::{
    Brush, FillRule, Font, Graphics, GraphicsContext, GraphicsResult, ImageFilter, RasterImage,
    StrokeStyle, TextBaseline,
};

use crate::document::Rendered;
use crate::fmt;
use crate::fonts::FontUsage;
use crate::options::{StyleMode, SvgOptions};
use crate::paint::{Paint, PaintRole, fill_rule, gradient_element, paint_attributes};
use crate::path_data::PathData;
use crate::registry::{GradientRegistry, Ids, StyleRegistry};
use crate::text::GlyphDefs;
use crate::xml::{Element, Node};

/// Drawing state that is not part of the save/restore stack.
#[derive(Clone, Debug)]
pub(crate) struct DrawState {
    pub(crate) fill: Brush,
    pub(crate) stroke: Brush,
    pub(crate) stroke_style: StrokeStyle,
    pub(crate) font: Option<Font>,
    pub(crate) baseline: TextBaseline,
    pub(crate) tag: Option<String>,
}

impl Default for DrawState {
    fn default() -> Self {
        Self {
            fill: Brush::default(),
            stroke: Brush::default(),
            stroke_style: StrokeStyle::new(1.0),
            font: None,
            baseline: TextBaseline::default(),
            tag: None,
        }
    }
}

/// A [`GraphicsContext`] that builds an SVG document.
///
/// Every terminal operation appends one element carrying the full current
/// transform as a `matrix(...)`. Clipping wraps elements in
/// `<g clip-path="...">`, and tags with a link destination wrap them in
/// `<a>`. Call [`finish`](Self::finish) to run the font embedding pass and
/// obtain the document tree.
///
/// A context is single-use and not shared between threads.
#[derive(Debug)]
pub struct SvgContext {
    pub(crate) options: SvgOptions,
    pub(crate) ids: Ids,
    pub(crate) styles: StyleRegistry,
    pub(crate) gradients: GradientRegistry,
    pub(crate) fonts: FontUsage,
    pub(crate) glyphs: GlyphDefs,
    pub(crate) defs: Vec<Node>,
    body: Vec<Node>,
    groups: Vec<Vec<Node>>,
    path: PathData,
    transform: Affine,
    pub(crate) clip: Option<String>,
    stack: Vec<(Affine, Option<String>)>,
    pub(crate) state: DrawState,
}

impl SvgContext {
    /// An empty document context.
    pub fn new(options: SvgOptions) -> Self {
        Self {
            ids: Ids::new(&options.tag_prefix),
            styles: StyleRegistry::new(&options.tag_prefix),
            gradients: GradientRegistry::new(options.reuse_gradients),
            fonts: FontUsage::default(),
            glyphs: GlyphDefs::default(),
            defs: Vec::new(),
            body: Vec::new(),
            groups: Vec::new(),
            path: PathData::default(),
            transform: Affine::IDENTITY,
            clip: None,
            stack: Vec::new(),
            state: DrawState::default(),
            options,
        }
    }

    /// The options in effect.
    pub fn options(&self) -> &SvgOptions {
        &self.options
    }

    /// The current transform.
    pub fn current_transform(&self) -> Affine {
        self.transform
    }

    /// The id of the current clip path, if any.
    pub fn current_clip(&self) -> Option<&str> {
        self.clip.as_deref()
    }

    /// Number of saved states.
    pub fn save_depth(&self) -> usize {
        self.stack.len()
    }

    /// Completes the document: embeds fonts, writes the style block and
    /// definitions, and returns the `<svg>` root.
    pub fn finish(self, width: f64, height: f64) -> crate::SvgResult<Element> {
        let text = self.options.text;
        let mut root = crate::document::svg_root(width, height);
        crate::document::assemble(&mut root, self.into_rendered(), text)?;
        Ok(root)
    }

    pub(crate) fn into_rendered(self) -> Rendered {
        Rendered {
            body: self.body,
            defs: self.defs,
            styles: self.styles,
            fonts: self.fonts,
            glyph_defs: self.glyphs.into_elements(),
            gradients: self.gradients.emitted(),
            prefix: self.options.tag_prefix,
        }
    }

    fn out(&mut self) -> &mut Vec<Node> {
        match self.groups.last_mut() {
            Some(group) => group,
            None => &mut self.body,
        }
    }

    /// Appends `el` to the output, adding the tag id, the clip wrapper and
    /// the link wrapper.
    pub(crate) fn emit(&mut self, mut el: Element) {
        let tag = self.state.tag.clone();
        if let Some(tag) = &tag {
            el.attributes
                .insert(0, ("id".to_owned(), self.ids.for_tag(tag)));
        }
        if let Some(clip) = &self.clip {
            el = Element::new("g")
                .with_attr("clip-path", format!("url(#{clip})"))
                .with_child(el);
        }
        if let Some(dest) = tag.as_deref().and_then(|t| self.options.links.get(t)) {
            let href = match dest.strip_prefix('#') {
                Some(fragment) => format!("#{}{fragment}", self.ids.prefix()),
                None => dest.clone(),
            };
            el = Element::new("a").with_attr("xlink:href", href).with_child(el);
        }
        self.out().push(el.into());
    }

    /// Attaches presentation attributes inline or through a class.
    pub(crate) fn apply_style(&mut self, el: &mut Element, attributes: Vec<(String, String)>) {
        match self.options.style {
            StyleMode::Inline => el.attributes.extend(attributes),
            StyleMode::Classes => {
                let class = self.styles.class_for(&attributes);
                el.set_attr("class", class);
            }
        }
    }

    /// Resolves `brush`, emitting a gradient definition on first use.
    pub(crate) fn paint(&mut self, brush: &Brush) -> Paint {
        let tag = self.state.tag.clone();
        match self.gradients.id_for(brush, &mut self.ids, tag.as_deref()) {
            None => Paint::new(brush, None),
            Some((id, new)) => {
                if new {
                    if let Some(def) = gradient_element(brush, &id) {
                        self.defs.push(def.into());
                    }
                }
                Paint::new(brush, Some(&id))
            }
        }
    }

    fn paint_path(&mut self, role: PaintRole<'_>, brush: &Brush) {
        let d = self.path.take();
        if d.is_empty() {
            return;
        }
        let paint = self.paint(brush);
        let mut el = Element::new("path").with_attr("d", d);
        self.apply_style(&mut el, paint_attributes(&paint, role));
        el.set_attr("transform", fmt::matrix(self.transform));
        self.emit(el);
    }

    /// Replays `graphics` on top of the current state, leaving the state,
    /// the current path and the save stack as they were.
    ///
    /// Unbalanced restores inside `graphics` cannot reach the outer stack.
    pub(crate) fn replay_nested(&mut self, graphics: &Graphics) -> GraphicsResult<()> {
        let state = self.state.clone();
        let path = core::mem::take(&mut self.path);
        let stack = core::mem::take(&mut self.stack);
        let (transform, clip) = (self.transform, self.clip.clone());
        let result = graphics.replay(&mut *self);
        self.stack = stack;
        self.transform = transform;
        self.clip = clip;
        self.state = state;
        self.path = path;
        result
    }

    /// Renders `graphics` unclipped into a detached list of nodes.
    pub(crate) fn render_group(&mut self, graphics: &Graphics) -> GraphicsResult<Vec<Node>> {
        self.groups.push(Vec::new());
        let clip = self.clip.take();
        let result = self.replay_nested(graphics);
        self.clip = clip;
        let nodes = self.groups.pop().unwrap_or_default();
        result.map(|()| nodes)
    }
}

impl GraphicsContext for SvgContext {
    fn move_to(&mut self, p: Point) {
        self.path.move_to(p);
    }

    fn line_to(&mut self, p: Point) {
        self.path.line_to(p);
    }

    fn cubic_to(&mut self, p1: Point, p2: Point, p3: Point) {
        self.path.cubic_to(p1, p2, p3);
    }

    fn close_path(&mut self) {
        self.path.close();
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

    fn set_tag(&mut self, tag: Option<String>) {
        self.state.tag = tag;
    }

    fn transform(&mut self, m: Affine) {
        self.transform *= m;
    }

    fn save(&mut self) {
        self.stack.push((self.transform, self.clip.clone()));
    }

    fn restore(&mut self) {
        if let Some((transform, clip)) = self.stack.pop() {
            self.transform = transform;
            self.clip = clip;
        }
        self.path.clear();
    }

    fn set_clip(&mut self, rule: FillRule) {
        let d = self.path.take();
        let tag = self.state.tag.clone();
        let id = self.ids.next("clip", tag.as_deref());
        let mut clip = Element::new("clipPath").with_attr("id", id.clone());
        // Nesting intersects the new clip with the previous one.
        if let Some(prev) = &self.clip {
            clip.set_attr("clip-path", format!("url(#{prev})"));
        }
        if !d.is_empty() {
            clip.push(
                Element::new("path")
                    .with_attr("d", d)
                    .with_attr("clip-rule", fill_rule(rule))
                    .with_attr("transform", fmt::matrix(self.transform)),
            );
        }
        self.defs.push(clip.into());
        self.clip = Some(id);
    }

    fn fill(&mut self, rule: FillRule) {
        let brush = self.state.fill.clone();
        self.paint_path(PaintRole::Fill(Some(rule)), &brush);
    }

    fn stroke(&mut self) {
        let brush = self.state.stroke.clone();
        let style = self.state.stroke_style.clone();
        self.paint_path(PaintRole::Stroke(&style), &brush);
    }

    fn fill_text(&mut self, text: &str, origin: Point) {
        self.draw_text(text, origin, false);
    }

    fn stroke_text(&mut self, text: &str, origin: Point) {
        self.draw_text(text, origin, true);
    }

    fn draw_raster_image(&mut self, image: &RasterImage, source: Option<Rect>, dest: Rect) {
        let png = match image.to_png() {
            Ok(png) => png,
            Err(err) => {
                tracing::warn!(%err, "skipping raster image that could not be encoded");
                return;
            }
        };
        let (w, h) = (f64::from(image.width()), f64::from(image.height()));
        let source = source.unwrap_or(Rect::new(0.0, 0.0, w, h));
        if source.width() == 0.0 || source.height() == 0.0 {
            return;
        }
        let path = core::mem::take(&mut self.path);
        self.save();
        self.rectangle(dest);
        self.set_clip(FillRule::NonZero);
        // Map the unit square onto the whole image, then the source
        // rectangle onto the destination.
        let placement = self.transform
            * Affine::translate((dest.x0, dest.y0))
            * Affine::scale_non_uniform(
                dest.width() / source.width(),
                dest.height() / source.height(),
            )
            * Affine::translate((-source.x0, -source.y0))
            * Affine::scale_non_uniform(w, h);
        let mut el = Element::new("image")
            .with_attr("x", "0")
            .with_attr("y", "0")
            .with_attr("width", "1")
            .with_attr("height", "1")
            .with_attr("preserveAspectRatio", "none")
            .with_attr(
                "xlink:href",
                format!(
                    "data:image/png;base64,{}",
                    base64::engine::general_purpose::STANDARD.encode(&png)
                ),
            );
        if !image.interpolate {
            el.set_attr("image-rendering", "optimizeSpeed");
        }
        el.set_attr("transform", fmt::matrix(placement));
        self.emit(el);
        self.restore();
        self.path = path;
    }

    fn draw_filtered_graphics(
        &mut self,
        graphics: &Graphics,
        filter: &ImageFilter,
    ) -> GraphicsResult<()> {
        self.draw_filtered(graphics, filter)
    }
}
