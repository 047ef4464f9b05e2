// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Paint resolution: brushes and stroke styles to presentation attributes.

use kurbo::{Cap, Join};
use understory_graphics::{Brush, FillRule, GradientStop, StrokeStyle};

use crate::fmt::{self, num};
use crate::xml::Element;

/// What a paint is used for.
#[derive(Copy, Clone, Debug)]
pub(crate) enum PaintRole<'a> {
    /// Filling, with a fill rule for paths and none for text.
    Fill(Option<FillRule>),
    /// Stroking with a style.
    Stroke(&'a StrokeStyle),
}

/// A resolved paint server: a color or a gradient reference.
#[derive(Clone, Debug, PartialEq)]
pub(crate) struct Paint {
    pub(crate) value: String,
    pub(crate) opacity: f32,
}

impl Paint {
    /// A solid color, or a gradient reference when `gradient_id` is set.
    pub(crate) fn new(brush: &Brush, gradient_id: Option<&str>) -> Self {
        let color = match (brush, gradient_id) {
            (Brush::Solid(color), _) => *color,
            (_, Some(id)) => {
                return Self {
                    value: format!("url(#{id})"),
                    opacity: 1.0,
                };
            }
            (_, None) => peniko::Color::BLACK,
        };
        let (value, opacity) = fmt::color(color);
        Self { value, opacity }
    }
}

/// Presentation attributes painting an element in `role` with `paint`.
///
/// Fills set `stroke="none"` and strokes set `fill="none"`, so each element
/// is self-contained.
pub(crate) fn paint_attributes(paint: &Paint, role: PaintRole<'_>) -> Vec<(String, String)> {
    let mut out = Vec::new();
    let mut push = |k: &str, v: String| out.push((k.to_owned(), v));
    match role {
        PaintRole::Fill(rule) => {
            push("fill", paint.value.clone());
            if paint.opacity < 1.0 {
                push("fill-opacity", num(f64::from(paint.opacity)));
            }
            if let Some(rule) = rule {
                push("fill-rule", fill_rule(rule).to_owned());
            }
            push("stroke", "none".to_owned());
        }
        PaintRole::Stroke(style) => {
            push("fill", "none".to_owned());
            push("stroke", paint.value.clone());
            if paint.opacity < 1.0 {
                push("stroke-opacity", num(f64::from(paint.opacity)));
            }
            push("stroke-width", num(style.width));
            // SVG has a single linecap; use the start cap when they differ.
            push("stroke-linecap", stroke_cap(style.start_cap).to_owned());
            push("stroke-linejoin", stroke_join(style.join).to_owned());
            if style.join == Join::Miter && style.miter_limit.is_finite() {
                push("stroke-miterlimit", num(style.miter_limit));
            }
            if !style.dash_pattern.is_empty() {
                push("stroke-dasharray", fmt::nums(style.dash_pattern.iter().copied()));
                if style.dash_offset != 0.0 {
                    push("stroke-dashoffset", num(style.dash_offset));
                }
            }
        }
    }
    out
}

pub(crate) fn fill_rule(rule: FillRule) -> &'static str {
    match rule {
        FillRule::NonZero => "nonzero",
        FillRule::EvenOdd => "evenodd",
    }
}

fn stroke_cap(cap: Cap) -> &'static str {
    match cap {
        Cap::Butt => "butt",
        Cap::Round => "round",
        Cap::Square => "square",
    }
}

fn stroke_join(join: Join) -> &'static str {
    match join {
        Join::Miter => "miter",
        Join::Round => "round",
        Join::Bevel => "bevel",
    }
}

/// The `<linearGradient>` or `<radialGradient>` definition of `brush`, in
/// user space.
pub(crate) fn gradient_element(brush: &Brush, id: &str) -> Option<Element> {
    let (mut el, stops) = match brush {
        Brush::Solid(_) => return None,
        Brush::Linear(g) => (
            Element::new("linearGradient")
                .with_attr("x1", num(g.start.x))
                .with_attr("y1", num(g.start.y))
                .with_attr("x2", num(g.end.x))
                .with_attr("y2", num(g.end.y)),
            &g.stops,
        ),
        Brush::Radial(g) => (
            Element::new("radialGradient")
                .with_attr("cx", num(g.center.x))
                .with_attr("cy", num(g.center.y))
                .with_attr("r", num(g.radius))
                .with_attr("fx", num(g.focus.x))
                .with_attr("fy", num(g.focus.y)),
            &g.stops,
        ),
    };
    el.attributes.insert(0, ("id".to_owned(), id.to_owned()));
    el.set_attr("gradientUnits", "userSpaceOnUse");
    if let Some(xf) = brush.gradient_transform() {
        el.set_attr("gradientTransform", fmt::matrix(xf));
    }
    for stop in stops {
        el.push(stop_element(stop));
    }
    Some(el)
}

fn stop_element(stop: &GradientStop) -> Element {
    let (rgb, a) = fmt::color(stop.color);
    let mut el = Element::new("stop")
        .with_attr("offset", num(f64::from(stop.offset)))
        .with_attr("stop-color", rgb);
    if a < 1.0 {
        el.set_attr("stop-opacity", num(f64::from(a)));
    }
    el
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use understory_graphics::RadialGradient;
    use understory_graphics::kurbo::{Affine, Point};
    use understory_graphics::peniko::Color;

    fn get<'a>(attrs: &'a [(String, String)], key: &str) -> Option<&'a str> {
        attrs.iter().find(|(k, _)| k == key).map(|(_, v)| v.as_str())
    }

    #[test]
    fn stroke_attributes() {
        let paint = Paint::new(&Brush::default(), None);
        let mut style = StrokeStyle::new(2.0).with_caps(Cap::Round);
        style.dash_pattern.extend([4.0, 2.0]);
        let attrs = paint_attributes(&paint, PaintRole::Stroke(&style));
        assert_eq!(get(&attrs, "stroke"), Some("#000000"));
        assert_eq!(get(&attrs, "fill"), Some("none"));
        assert_eq!(get(&attrs, "stroke-width"), Some("2"));
        assert_eq!(get(&attrs, "stroke-linecap"), Some("round"));
        assert_eq!(get(&attrs, "stroke-dasharray"), Some("4 2"));
        assert_eq!(get(&attrs, "stroke-opacity"), None);
    }

    #[test]
    fn fill_attributes_carry_opacity_and_rule() {
        let paint = Paint::new(&Brush::Solid(Color::from_rgba8(255, 0, 0, 128)), None);
        let attrs = paint_attributes(&paint, PaintRole::Fill(Some(FillRule::EvenOdd)));
        assert_eq!(get(&attrs, "fill"), Some("#ff0000"));
        assert_eq!(get(&attrs, "fill-opacity"), Some("0.502"));
        assert_eq!(get(&attrs, "fill-rule"), Some("evenodd"));
        assert_eq!(get(&attrs, "stroke"), Some("none"));
    }

    #[test]
    fn radial_gradient_definition() {
        let brush = Brush::Radial(Arc::new(RadialGradient {
            center: Point::new(5.0, 5.0),
            focus: Point::new(4.0, 5.0),
            radius: 5.0,
            stops: vec![
                GradientStop::new(0.0, Color::WHITE),
                GradientStop::new(1.0, Color::from_rgba8(0, 0, 255, 0)),
            ],
            transform: Some(Affine::scale(2.0)),
        }));
        let el = gradient_element(&brush, "g1").unwrap();
        assert_eq!(el.name, "radialGradient");
        assert_eq!(el.attr("id"), Some("g1"));
        assert_eq!(el.attr("fx"), Some("4"));
        assert_eq!(el.attr("gradientUnits"), Some("userSpaceOnUse"));
        assert_eq!(el.attr("gradientTransform"), Some("matrix(2 0 0 2 0 0)"));
        let stops: Vec<_> = el.elements().collect();
        assert_eq!(stops.len(), 2);
        assert_eq!(stops[1].attr("stop-opacity"), Some("0"));
        assert_eq!(Paint::new(&brush, Some("g1")).value, "url(#g1)");
        assert!(gradient_element(&Brush::default(), "x").is_none());
    }
}
