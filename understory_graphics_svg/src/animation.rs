// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! SMIL animation synthesis.
//!
//! The timeline becomes a list of groups shown one at a time with
//! `display` animations. In continuous mode there is a group for each frame
//! hold and one for each transition; a transition group is the first frame
//! with every tagged element animated towards its state in the next frame.
//! In discrete mode the timeline is sampled at a fixed rate and each run
//! of identical samples gets a group.
//!
//! Sub-documents are rendered with their own id prefix and their own
//! definitions, then merged so that one font pass covers all of them.

use core::f64::consts::{PI, TAU};
use std::sync::Arc;

use hashbrown::HashMap;
use kurbo::Affine;
use rayon::prelude::*;
use smallvec::SmallVec;
use understory_graphics::{Animation, Easing, Graphics, TimelinePosition, matrix};

use crate::context::SvgContext;
use crate::controls;
use crate::document::{self, Rendered};
use crate::error::{SvgError, SvgResult};
use crate::fmt::{self, num};
use crate::fonts::FontUsage;
use crate::options::{AnimationMode, AnimationOptions, StyleMode, SvgOptions};
use crate::registry::StyleRegistry;
use crate::xml::{Element, Node};

/// Attributes that are never interpolated.
const FIXED_ATTRIBUTES: &[&str] = &["id", "class", "clip-path", "xlink:href", "xml:space"];

/// Slack for comparing times against the end of the timeline.
const TIME_EPSILON: f64 = 1e-6;

/// Builds the animated `<svg>` root for `animation`.
pub(crate) fn synthesize(animation: &Animation, options: &AnimationOptions) -> SvgResult<Element> {
    if animation.frames().is_empty() {
        return Err(SvgError::invalid_animation(
            "an animation needs at least one frame",
        ));
    }
    // Attribute diffs need inline styles, and sub-documents must not share
    // gradient definitions.
    let svg = SvgOptions {
        style: StyleMode::Inline,
        reuse_gradients: false,
        ..options.svg.clone()
    };
    let total = animation.total_duration();
    let mut timeline = Timeline::new(total, options, &svg.tag_prefix);
    match options.mode {
        AnimationMode::Discrete => discrete(animation, options.frame_rate, &svg, &mut timeline)?,
        AnimationMode::Continuous => continuous(animation, &svg, &mut timeline)?,
    }

    let height = if options.controls {
        animation.height + controls::BAR_HEIGHT
    } else {
        animation.height
    };
    let mut root = document::svg_root(animation.width, height);
    document::assemble(&mut root, timeline.into_rendered(), svg.text)?;
    if options.controls {
        controls::append(&mut root, animation.width, animation.height, total, &svg.tag_prefix);
    }
    Ok(root)
}

fn render(graphics: &Graphics, svg: &SvgOptions, prefix: String) -> SvgResult<Rendered> {
    let mut ctx = SvgContext::new(svg.clone().with_tag_prefix(prefix));
    graphics.replay(&mut ctx)?;
    Ok(ctx.into_rendered())
}

/// Merged output of the sub-documents and the timing shared by every
/// animation element.
#[derive(Debug)]
struct Timeline {
    total: f64,
    repeat: String,
    merged: Rendered,
}

impl Timeline {
    fn new(total: f64, options: &AnimationOptions, prefix: &str) -> Self {
        Self {
            total,
            repeat: options.repeat.to_smil(),
            merged: Rendered {
                body: Vec::new(),
                defs: Vec::new(),
                styles: StyleRegistry::default(),
                fonts: FontUsage::default(),
                glyph_defs: Vec::new(),
                gradients: 0,
                prefix: prefix.to_owned(),
            },
        }
    }

    fn is_animated(&self) -> bool {
        self.total.is_finite() && self.total > 0.0
    }

    /// Keeps the definitions and font usage of `doc` and returns its body.
    fn absorb(&mut self, doc: Rendered) -> Vec<Node> {
        self.merged.defs.extend(doc.defs);
        self.merged.fonts.merge(doc.fonts);
        self.merged.glyph_defs.extend(doc.glyph_defs);
        self.merged.gradients += doc.gradients;
        doc.body
    }

    fn key_time(&self, time: f64) -> String {
        num((time / self.total).clamp(0.0, 1.0))
    }

    fn timed(&self, el: Element) -> Element {
        el.with_attr("dur", fmt::seconds(self.total))
            .with_attr("repeatCount", self.repeat.clone())
            .with_attr("fill", "freeze")
    }

    /// Adds a group showing `body` from `start` to `end`.
    fn push_window(&mut self, body: Vec<Node>, start: f64, end: f64) {
        let mut group = Element::new("g");
        group.children = body;
        if !self.is_animated() {
            self.merged.body.push(group.into());
            return;
        }
        if end <= start {
            return;
        }
        let from_start = start <= 0.0;
        let to_end = end >= self.total - TIME_EPSILON;
        let (values, key_times) = match (from_start, to_end) {
            (true, true) => {
                self.merged.body.push(group.into());
                return;
            }
            (true, false) => ("inline;none", format!("0;{}", self.key_time(end))),
            (false, true) => ("none;inline", format!("0;{}", self.key_time(start))),
            (false, false) => (
                "none;inline;none",
                format!("0;{};{}", self.key_time(start), self.key_time(end)),
            ),
        };
        group.set_attr("display", if from_start { "inline" } else { "none" });
        let toggle = Element::new("animate")
            .with_attr("attributeName", "display")
            .with_attr("values", values)
            .with_attr("keyTimes", key_times)
            .with_attr("calcMode", "discrete");
        group.children.insert(0, self.timed(toggle).into());
        self.merged.body.push(group.into());
    }

    /// Holds `from` until `window` opens, eases to `to`, then holds `to`.
    fn interpolate(
        &self,
        el: Element,
        from: &str,
        to: &str,
        window: (f64, f64),
        easing: &Easing,
    ) -> Element {
        let el = el
            .with_attr("values", format!("{from};{from};{to};{to}"))
            .with_attr(
                "keyTimes",
                format!("0;{};{};1", self.key_time(window.0), self.key_time(window.1)),
            )
            .with_attr("calcMode", "spline")
            .with_attr(
                "keySplines",
                format!("0 0 1 1;{};0 0 1 1", fmt::nums(easing.control_points())),
            );
        self.timed(el)
    }

    fn into_rendered(self) -> Rendered {
        self.merged
    }
}

/// A stretch of the timeline showing one drawing.
#[derive(Debug)]
struct Window {
    start: f64,
    end: f64,
    graphics: Arc<Graphics>,
}

/// Samples the timeline every `step` milliseconds. Consecutive samples
/// inside the same frame hold share a window.
fn sample_windows(animation: &Animation, step: f64) -> Vec<Window> {
    let total = animation.total_duration();
    let mut windows: Vec<Window> = Vec::new();
    let mut previous = None;
    let mut k = 0_u32;
    loop {
        let start = f64::from(k) * step;
        let end = (start + step).min(total);
        let Some(position) = animation.position_at(start) else {
            break;
        };
        match (position, previous, windows.last_mut()) {
            (TimelinePosition::Frame(i), Some(TimelinePosition::Frame(j)), Some(window))
                if i == j =>
            {
                window.end = end;
            }
            _ => {
                if let Some(graphics) = animation.graphics_at(start) {
                    windows.push(Window {
                        start,
                        end,
                        graphics,
                    });
                }
            }
        }
        previous = Some(position);
        if end >= total - TIME_EPSILON || k == u32::MAX {
            break;
        }
        k += 1;
    }
    windows
}

fn discrete(
    animation: &Animation,
    frame_rate: f64,
    svg: &SvgOptions,
    timeline: &mut Timeline,
) -> SvgResult<()> {
    if !(frame_rate.is_finite() && frame_rate > 0.0) {
        return Err(SvgError::invalid_animation(format!(
            "frame rate must be positive, got {frame_rate}"
        )));
    }
    let windows = sample_windows(animation, 1000.0 / frame_rate);
    tracing::debug!(windows = windows.len(), "sampled discrete animation");
    let docs = windows
        .par_iter()
        .enumerate()
        .map(|(i, w)| render(&w.graphics, svg, format!("{}s{i}_", svg.tag_prefix)))
        .collect::<SvgResult<Vec<_>>>()?;
    for (window, doc) in windows.iter().zip(docs) {
        let body = timeline.absorb(doc);
        timeline.push_window(body, window.start, window.end);
    }
    Ok(())
}

fn continuous(animation: &Animation, svg: &SvgOptions, timeline: &mut Timeline) -> SvgResult<()> {
    let frames = animation.frames();
    for (index, frame) in frames.iter().enumerate() {
        let start = animation.frame_start(index);
        let doc = render(&frame.graphics, svg, format!("{}f{index}_", svg.tag_prefix))?;
        let body = timeline.absorb(doc);
        timeline.push_window(body, start, start + frame.duration);
        if !timeline.is_animated() {
            return Ok(());
        }
        let Some(transition) = animation.transitions().get(index) else {
            continue;
        };
        if transition.duration <= 0.0 {
            continue;
        }
        let start = animation.transition_start(index);
        let window = (start, start + transition.duration);
        let from_prefix = format!("{}t{index}_", svg.tag_prefix);
        let to_prefix = format!("{}t{index}e_", svg.tag_prefix);
        let from = render(&frame.graphics, svg, from_prefix.clone())?;
        let to = render(&frames[index + 1].graphics, svg, to_prefix.clone())?;

        let mut targets: HashMap<&str, &Element> = HashMap::new();
        for node in &to.body {
            if let Node::Element(el) = node {
                el.walk(&mut |e| {
                    let tag = e.attr("id").and_then(|id| id.strip_prefix(to_prefix.as_str()));
                    if let Some(tag) = tag {
                        targets.insert(tag, e);
                    }
                });
            }
        }

        let mut body = timeline.absorb(from);
        let mut animated = 0_usize;
        for node in &mut body {
            if let Node::Element(el) = node {
                el.walk_mut(&mut |e| {
                    let tag = e
                        .attr("id")
                        .and_then(|id| id.strip_prefix(from_prefix.as_str()))
                        .map(str::to_owned);
                    if let Some(target) = tag.as_deref().and_then(|t| targets.get(t)) {
                        let easing = transition.easing_for(tag.as_deref());
                        animated += animate_element(timeline, e, target, window, easing);
                    }
                    Ok::<(), SvgError>(())
                })?;
            }
        }
        tracing::debug!(transition = index, animated, "synthesized transition");
        timeline.push_window(body, window.0, window.1);
    }
    Ok(())
}

/// Animates every attribute of `el` that differs in `target`. An attribute
/// written on one side only animates from or to its initial value. Returns
/// the number of animation elements added.
fn animate_element(
    timeline: &Timeline,
    el: &mut Element,
    target: &Element,
    window: (f64, f64),
    easing: &Easing,
) -> usize {
    let mut names: Vec<&str> = el.attributes.iter().map(|(k, _)| k.as_str()).collect();
    for (name, _) in &target.attributes {
        if el.attr(name).is_none() {
            names.push(name);
        }
    }
    let mut added = Vec::new();
    let mut replaces_transform = false;
    for name in names {
        if FIXED_ATTRIBUTES.contains(&name) {
            continue;
        }
        let (Some(from), Some(to)) = (
            el.attr(name).or_else(|| initial_value(name)),
            target.attr(name).or_else(|| initial_value(name)),
        ) else {
            continue;
        };
        if to == from || from.contains("url(") || to.contains("url(") {
            continue;
        }
        if name == "transform" {
            if let (Some(a), Some(b)) = (fmt::parse_matrix(from), fmt::parse_matrix(to)) {
                for (i, component) in transform_components(a, b).into_iter().enumerate() {
                    let anim = Element::new("animateTransform")
                        .with_attr("attributeName", "transform")
                        .with_attr("type", component.kind)
                        .with_attr("additive", if i == 0 { "replace" } else { "sum" });
                    added.push(timeline.interpolate(
                        anim,
                        &component.from,
                        &component.to,
                        window,
                        easing,
                    ));
                    replaces_transform = true;
                }
                continue;
            }
        }
        let anim = Element::new("animate").with_attr("attributeName", name);
        added.push(timeline.interpolate(anim, from, to, window, easing));
    }
    if replaces_transform {
        el.remove_attr("transform");
    }
    let count = added.len();
    for anim in added {
        el.push(anim);
    }
    count
}

/// The value an attribute takes when it is not written.
fn initial_value(name: &str) -> Option<&'static str> {
    Some(match name {
        "opacity" | "fill-opacity" | "stroke-opacity" => "1",
        "stroke-width" => "1",
        "stroke-miterlimit" => "4",
        "stroke-dashoffset" => "0",
        "stroke-dasharray" | "stroke" => "none",
        "stroke-linecap" => "butt",
        "stroke-linejoin" => "miter",
        "fill" => "black",
        "fill-rule" => "nonzero",
        "transform" => "matrix(1 0 0 1 0 0)",
        "image-rendering" => "auto",
        "font-weight" | "font-style" => "normal",
        _ => return None,
    })
}

/// One `<animateTransform>` worth of a decomposed transform.
#[derive(Clone, Debug, PartialEq)]
struct Component {
    kind: &'static str,
    from: String,
    to: String,
}

/// The transform components to animate between `from` and `to`, in the
/// order they compose.
///
/// Components that are the identity at both ends are left out; every other
/// component is needed for the sum to rebuild the matrix.
fn transform_components(from: Affine, to: Affine) -> SmallVec<[Component; 5]> {
    let a = matrix::decompose(from);
    let mut b = matrix::decompose(to);
    let delta = b.rotation - a.rotation;
    if delta > PI {
        b.rotation -= TAU;
    } else if delta < -PI {
        b.rotation += TAU;
    }
    let candidates = [
        (
            "translate",
            fmt::nums([a.translation.x, a.translation.y]),
            fmt::nums([b.translation.x, b.translation.y]),
            "0 0",
        ),
        ("rotate", fmt::degrees(a.rotation), fmt::degrees(b.rotation), "0"),
        (
            "scale",
            fmt::nums([a.scale.x, a.scale.y]),
            fmt::nums([b.scale.x, b.scale.y]),
            "1 1",
        ),
        ("skewX", fmt::degrees(a.skew.x), fmt::degrees(b.skew.x), "0"),
        ("skewY", fmt::degrees(a.skew.y), fmt::degrees(b.skew.y), "0"),
    ];
    candidates
        .into_iter()
        .filter(|(_, from, to, identity)| from != identity || to != identity)
        .map(|(kind, from, to, _)| Component { kind, from, to })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Rect;
    use understory_graphics::{FillRule, Frame, GraphicsContext, Transition};

    fn moving_box(x: f64) -> Graphics {
        let mut g = Graphics::new();
        g.set_tag(Some("box".into()));
        g.translate(x, 0.0);
        g.rectangle(Rect::new(0.0, 0.0, 10.0, 10.0));
        g.fill(FillRule::NonZero);
        g
    }

    fn two_frames() -> Animation {
        let mut animation = Animation::new(100.0, 100.0);
        animation.add_frame(Frame::new(moving_box(0.0), 500.0));
        animation.add_frame_with_transition(
            Transition::new(200.0, Easing::EASE_IN_OUT),
            Frame::new(moving_box(50.0), 500.0),
        );
        animation
    }

    fn groups(root: &Element) -> Vec<&Element> {
        root.elements().filter(|e| e.name == "g").collect()
    }

    fn toggle(group: &Element) -> (&str, &str) {
        let animate = group.elements().next().unwrap();
        assert_eq!(animate.attr("attributeName"), Some("display"));
        (animate.attr("values").unwrap(), animate.attr("keyTimes").unwrap())
    }

    #[test]
    fn empty_animations_are_rejected() {
        let result = synthesize(&Animation::new(1.0, 1.0), &AnimationOptions::default());
        assert!(matches!(result, Err(SvgError::InvalidAnimation(_))));
    }

    #[test]
    fn samples_merge_within_frame_holds() {
        let windows = sample_windows(&two_frames(), 100.0);
        let spans: Vec<_> = windows.iter().map(|w| (w.start, w.end)).collect();
        assert_eq!(
            spans,
            [(0.0, 500.0), (500.0, 600.0), (600.0, 700.0), (700.0, 1200.0)]
        );
    }

    #[test]
    fn continuous_windows_follow_the_timeline() {
        let root = synthesize(&two_frames(), &AnimationOptions::default()).unwrap();
        let groups = groups(&root);
        assert_eq!(groups.len(), 3);
        assert_eq!(toggle(groups[0]), ("inline;none", "0;0.4167"));
        assert_eq!(toggle(groups[1]), ("none;inline;none", "0;0.4167;0.5833"));
        assert_eq!(toggle(groups[2]), ("none;inline", "0;0.5833"));
        assert_eq!(groups[1].attr("display"), Some("none"));
    }

    #[test]
    fn moved_elements_get_transform_animations() {
        let root = synthesize(&two_frames(), &AnimationOptions::default()).unwrap();
        let transition = groups(&root)[1];
        let path = transition.elements().find(|e| e.name == "path").unwrap();
        assert_eq!(path.attr("id"), Some("t0_box"));
        assert_eq!(path.attr("transform"), None);
        let animations: Vec<_> = path.elements().collect();
        assert_eq!(animations.len(), 1);
        let a = animations[0];
        assert_eq!(a.name, "animateTransform");
        assert_eq!(a.attr("type"), Some("translate"));
        assert_eq!(a.attr("values"), Some("0 0;0 0;50 0;50 0"));
        assert_eq!(a.attr("keyTimes"), Some("0;0.4167;0.5833;1"));
        assert_eq!(a.attr("keySplines"), Some("0 0 1 1;0.42 0 0.58 1;0 0 1 1"));
        assert_eq!(a.attr("dur"), Some("1.2s"));
        assert_eq!(a.attr("additive"), Some("replace"));
    }

    #[test]
    fn unmatched_elements_stay_static() {
        let mut other = Graphics::new();
        other.set_tag(Some("elsewhere".into()));
        other.rectangle(Rect::new(0.0, 0.0, 5.0, 5.0));
        other.fill(FillRule::NonZero);
        let mut animation = Animation::new(10.0, 10.0);
        animation.add_frame(Frame::new(moving_box(0.0), 100.0));
        animation.add_frame_with_transition(
            Transition::new(100.0, Easing::Linear),
            Frame::new(other, 100.0),
        );
        let root = synthesize(&animation, &AnimationOptions::default()).unwrap();
        let path = groups(&root)[1].elements().find(|e| e.name == "path").unwrap();
        assert_eq!(path.elements().count(), 0);
        assert!(path.attr("transform").is_some());
    }

    #[test]
    fn rotation_takes_the_short_way() {
        let from = Affine::rotate(170_f64.to_radians());
        let to = Affine::rotate((-170_f64).to_radians());
        let components = transform_components(from, to);
        assert_eq!(components.len(), 1, "{components:?}");
        assert_eq!(components[0].kind, "rotate");
        assert_eq!(components[0].from, "170");
        assert_eq!(components[0].to, "190");
    }

    #[test]
    fn unchanged_non_identity_components_are_kept() {
        let from = Affine::translate((5.0, 0.0)) * Affine::scale(2.0);
        let to = Affine::translate((9.0, 0.0)) * Affine::scale(2.0);
        let kinds: Vec<_> = transform_components(from, to).iter().map(|c| c.kind).collect();
        assert_eq!(kinds, ["translate", "scale"]);
    }

    #[test]
    fn discrete_samples_render_in_order() {
        let options = AnimationOptions::default()
            .with_mode(AnimationMode::Discrete)
            .with_frame_rate(10.0);
        let root = synthesize(&two_frames(), &options).unwrap();
        let groups = groups(&root);
        assert_eq!(groups.len(), 4);
        let ids: Vec<_> = groups
            .iter()
            .map(|g| g.elements().find(|e| e.name == "path").unwrap().attr("id").unwrap())
            .collect();
        assert_eq!(ids, ["s0_box", "s1_box", "s2_box", "s3_box"]);
        assert_eq!(toggle(groups[1]), ("none;inline;none", "0;0.4167;0.5"));
        let bad = AnimationOptions::default()
            .with_mode(AnimationMode::Discrete)
            .with_frame_rate(0.0);
        assert!(synthesize(&two_frames(), &bad).is_err());
    }

    #[test]
    fn a_single_still_frame_is_static() {
        let mut animation = Animation::new(10.0, 10.0);
        animation.add_frame(Frame::new(moving_box(0.0), 0.0));
        let root = synthesize(&animation, &AnimationOptions::default()).unwrap();
        let groups = groups(&root);
        assert_eq!(groups.len(), 1);
        assert!(groups[0].attr("display").is_none());
    }
}
