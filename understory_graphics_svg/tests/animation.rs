// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Animated documents.

mod common;

use understory_graphics::kurbo::{Point, Rect};
use understory_graphics::peniko::Color;
use understory_graphics::{
    Animation, Brush, Easing, FillRule, Frame, Graphics, GraphicsContext, Transition,
};
use understory_graphics_svg::{
    AnimationMode, AnimationOptions, RepeatCount, SvgError, animation_to_svg,
};

use common::{elements, init_tracing, mono, parse};

fn tagged_box(x: f64) -> Graphics {
    let mut g = Graphics::new();
    g.set_tag(Some("box".into()));
    g.translate(x, 0.0);
    g.rectangle(Rect::new(0.0, 0.0, 20.0, 20.0));
    g.fill(FillRule::NonZero);
    g
}

fn sliding_box() -> Animation {
    let mut animation = Animation::new(100.0, 100.0);
    animation.add_frame(Frame::new(tagged_box(0.0), 500.0));
    animation.add_frame_with_transition(
        Transition::new(200.0, Easing::Linear),
        Frame::new(tagged_box(50.0), 500.0),
    );
    animation
}

#[test]
fn transition_moves_the_tagged_box() {
    init_tracing();
    let svg = animation_to_svg(&sliding_box(), &AnimationOptions::default()).unwrap();
    let doc = parse(&svg);
    let moves: Vec<_> = elements(&doc, "animateTransform")
        .into_iter()
        .filter(|a| a.attribute("type") == Some("translate"))
        .collect();
    assert_eq!(moves.len(), 1);
    let animation = moves[0];
    assert_eq!(animation.attribute("keyTimes"), Some("0;0.4167;0.5833;1"));
    assert_eq!(animation.attribute("values"), Some("0 0;0 0;50 0;50 0"));
    assert_eq!(animation.attribute("dur"), Some("1.2s"));
    assert_eq!(animation.attribute("repeatCount"), Some("indefinite"));
    assert_eq!(animation.parent_element().unwrap().tag_name().name(), "path");
}

#[test]
fn per_tag_easing_reaches_key_splines() {
    let mut animation = Animation::new(100.0, 100.0);
    animation.add_frame(Frame::new(tagged_box(0.0), 500.0));
    animation.add_frame_with_transition(
        Transition::new(200.0, Easing::Linear).with_tag_easing("box", Easing::EASE_IN_OUT),
        Frame::new(tagged_box(50.0), 500.0),
    );
    let svg = animation_to_svg(&animation, &AnimationOptions::default()).unwrap();
    let doc = parse(&svg);
    let splines = elements(&doc, "animateTransform")[0].attribute("keySplines");
    assert_eq!(splines, Some("0 0 1 1;0.42 0 0.58 1;0 0 1 1"));
}

#[test]
fn changed_attributes_are_animated() {
    let square = |size: f64, width: f64| {
        let mut g = Graphics::new();
        g.set_tag(Some("edge".into()));
        g.set_stroke_style(understory_graphics::StrokeStyle::new(width));
        g.rectangle(Rect::new(0.0, 0.0, size, size));
        g.stroke();
        g
    };
    let mut animation = Animation::new(100.0, 100.0);
    animation.add_frame(Frame::new(square(10.0, 1.0), 100.0));
    animation.add_frame_with_transition(
        Transition::new(100.0, Easing::Linear),
        Frame::new(square(10.0, 4.0), 100.0),
    );
    let options = AnimationOptions::default().with_repeat(RepeatCount::Times(2));
    let svg = animation_to_svg(&animation, &options).unwrap();
    let doc = parse(&svg);
    let widths: Vec<_> = elements(&doc, "animate")
        .into_iter()
        .filter(|a| a.attribute("attributeName") == Some("stroke-width"))
        .collect();
    assert_eq!(widths.len(), 1);
    assert_eq!(widths[0].attribute("values"), Some("1;1;4;4"));
    assert_eq!(widths[0].attribute("keyTimes"), Some("0;0.3333;0.6667;1"));
    assert_eq!(widths[0].attribute("repeatCount"), Some("2"));
    assert!(elements(&doc, "animateTransform").is_empty());
}

#[test]
fn opacity_fades_from_the_initial_value() {
    let red_box = |alpha: u8| {
        let mut g = Graphics::new();
        g.set_tag(Some("box".into()));
        g.set_fill_brush(Brush::Solid(Color::from_rgba8(255, 0, 0, alpha)));
        g.rectangle(Rect::new(0.0, 0.0, 20.0, 20.0));
        g.fill(FillRule::NonZero);
        g
    };
    let mut animation = Animation::new(100.0, 100.0);
    animation.add_frame(Frame::new(red_box(255), 500.0));
    animation.add_frame_with_transition(
        Transition::new(200.0, Easing::Linear),
        Frame::new(red_box(0), 500.0),
    );
    let svg = animation_to_svg(&animation, &AnimationOptions::default()).unwrap();
    let doc = parse(&svg);
    let fades: Vec<_> = elements(&doc, "animate")
        .into_iter()
        .filter(|a| a.attribute("attributeName") == Some("fill-opacity"))
        .collect();
    assert_eq!(fades.len(), 1);
    assert_eq!(fades[0].attribute("values"), Some("1;1;0;0"));
    assert_eq!(fades[0].attribute("keyTimes"), Some("0;0.4167;0.5833;1"));
    assert_eq!(fades[0].parent_element().unwrap().tag_name().name(), "path");
}

#[test]
fn discrete_mode_flips_between_samples() {
    let options = AnimationOptions::default()
        .with_mode(AnimationMode::Discrete)
        .with_frame_rate(20.0);
    let svg = animation_to_svg(&sliding_box(), &options).unwrap();
    let doc = parse(&svg);
    // One hold, four transition samples, one hold.
    let toggles: Vec<_> = elements(&doc, "animate")
        .into_iter()
        .filter(|a| a.attribute("attributeName") == Some("display"))
        .collect();
    assert_eq!(toggles.len(), 6);
    for toggle in &toggles {
        assert_eq!(toggle.attribute("calcMode"), Some("discrete"));
    }
    assert!(elements(&doc, "animateTransform").is_empty());
    // Samples partway through the transition sit between the two ends.
    let transforms: Vec<_> = elements(&doc, "path")
        .iter()
        .map(|p| p.attribute("transform").unwrap().to_owned())
        .collect();
    assert_eq!(transforms.first().map(String::as_str), Some("matrix(1 0 0 1 0 0)"));
    assert_eq!(transforms[2], "matrix(1 0 0 1 12.5 0)");
    assert_eq!(transforms.last().map(String::as_str), Some("matrix(1 0 0 1 50 0)"));
}

#[test]
fn fonts_are_embedded_once_across_frames() {
    let text = |s: &str| {
        let mut g = Graphics::new();
        g.set_font(mono(12.0));
        g.fill_text(s, Point::new(10.0, 50.0));
        g
    };
    let mut animation = Animation::new(100.0, 100.0);
    animation.add_frame(Frame::new(text("ab"), 300.0));
    animation.add_frame(Frame::new(text("bc"), 300.0));
    let svg = animation_to_svg(&animation, &AnimationOptions::default()).unwrap();
    let doc = parse(&svg);
    let css = elements(&doc, "style")[0].text().unwrap();
    assert_eq!(css.matches("@font-face").count(), 1, "{css}");
    // Base64 of the subset "abc".
    assert!(css.contains("base64,YWJj"), "{css}");
    for text in elements(&doc, "text") {
        assert_eq!(text.attribute("font-family"), Some("'TestMono-1', monospace"));
    }
}

#[test]
fn controls_extend_the_canvas() {
    let options = AnimationOptions::default().with_controls(true);
    let svg = animation_to_svg(&sliding_box(), &options).unwrap();
    let doc = parse(&svg);
    let root = doc.root_element();
    assert_eq!(root.attribute("height"), Some("124"));
    assert_eq!(root.attribute("viewBox"), Some("0 0 100 124"));
    let script = elements(&doc, "script")[0].text().unwrap();
    assert!(script.contains("setCurrentTime(f * 1.2)"), "{script}");
}

#[test]
fn empty_animations_are_errors() {
    let err = animation_to_svg(&Animation::new(10.0, 10.0), &AnimationOptions::default())
        .unwrap_err();
    assert!(matches!(err, SvgError::InvalidAnimation(_)));
}
