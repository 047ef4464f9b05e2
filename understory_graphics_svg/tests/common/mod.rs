// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Shared helpers for the integration tests.

#![allow(dead_code, reason = "each test binary uses a different subset")]

use std::collections::BTreeSet;
use std::sync::Arc;

use understory_graphics::kurbo::{BezPath, Rect, Shape};
use understory_graphics::{Font, FontFlags, FontSource};

/// A monospaced face with one square outline for every printable ASCII
/// character. Subsets are the characters as bytes.
#[derive(Debug)]
pub(crate) struct TestMono;

impl FontSource for TestMono {
    fn family_name(&self) -> &str {
        "Test Mono"
    }
    fn flags(&self) -> FontFlags {
        FontFlags::FIXED_PITCH
    }
    fn units_per_em(&self) -> u16 {
        2048
    }
    fn ascent(&self) -> f32 {
        1638.0
    }
    fn descent(&self) -> f32 {
        -410.0
    }
    fn glyph_index(&self, ch: char) -> Option<u16> {
        ch.is_ascii_graphic().then(|| ch as u16)
    }
    fn advance_width(&self, _glyph: u16) -> f32 {
        1229.0
    }
    fn glyph_outline(&self, glyph: u16) -> Option<BezPath> {
        (glyph != 0).then(|| Rect::new(100.0, 0.0, 1100.0, 1400.0).to_path(0.1))
    }
    fn font_data(&self) -> Option<Arc<[u8]>> {
        Some(Arc::from(&b"test mono"[..]))
    }
    fn subset(&self, chars: &BTreeSet<char>) -> Option<Vec<u8>> {
        Some(chars.iter().collect::<String>().into_bytes())
    }
}

pub(crate) fn mono(size: f64) -> Font {
    Font::new(Arc::new(TestMono), size)
}

/// Routes `tracing` output to the test harness.
pub(crate) fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_max_level(tracing::Level::DEBUG)
        .with_test_writer()
        .try_init();
}

pub(crate) fn parse(svg: &str) -> roxmltree::Document<'_> {
    roxmltree::Document::parse(svg).unwrap_or_else(|e| panic!("malformed SVG: {e}\n{svg}"))
}

pub(crate) fn elements<'a, 'i>(
    doc: &'a roxmltree::Document<'i>,
    name: &'a str,
) -> Vec<roxmltree::Node<'a, 'i>> {
    doc.descendants()
        .filter(|n| n.is_element() && n.tag_name().name() == name)
        .collect()
}
