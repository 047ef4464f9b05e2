// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Skrifa faces through the SVG backend.

use std::sync::Arc;

use understory_graphics::kurbo::Point;
use understory_graphics::{Font, Graphics, GraphicsContext};
use understory_graphics_svg::{SvgOptions, TextEmbedding, graphics_to_svg};
use understory_text_graphics::SkrifaFont;

const SERIF_BOLD: &[u8] = include_bytes!("../../assets/fonts/dejavu/DejaVuSerif-Bold.ttf");

fn hello(mode: TextEmbedding) -> String {
    let face = SkrifaFont::new(SERIF_BOLD).unwrap();
    let mut g = Graphics::new();
    g.set_font(Font::new(Arc::new(face), 20.48));
    g.fill_text("AVA", Point::new(10.0, 40.0));
    graphics_to_svg(&g, 200.0, 100.0, &SvgOptions::default().with_text(mode)).unwrap()
}

#[test]
fn subset_requests_fall_back_to_the_full_font() {
    let svg = hello(TextEmbedding::EmbedSubset);
    assert_eq!(svg.matches("@font-face").count(), 1);
    assert!(svg.contains("font-family=\"'DejaVuSerif-1', serif\""), "{svg}");
    assert!(svg.contains("font-weight=\"bold\""));
    // A/V and V/A pairs of -149 and -159 units at 0.01 px per unit.
    assert!(svg.contains("<tspan dx=\"-1.49\">V</tspan>"), "{svg}");
    assert!(svg.contains("<tspan dx=\"-1.59\">A</tspan>"), "{svg}");
}

#[test]
fn outlines_come_from_the_glyph_table() {
    let svg = hello(TextEmbedding::ConvertToPaths);
    assert!(!svg.contains("<text"));
    assert!(!svg.contains("@font-face"));
    assert_eq!(svg.matches("<path").count(), 1);
}
