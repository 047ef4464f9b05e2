// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! In-memory font for unit tests.

use std::collections::BTreeSet;
use std::sync::Arc;

use kurbo::{BezPath, Shape};
use understory_graphics::{Font, FontFlags, FontSource};

/// Square glyphs, 600 units wide, with `A`/`V` kerning of -100.
#[derive(Clone, Debug)]
pub(crate) struct BoxFont {
    pub(crate) subsets: bool,
    pub(crate) embeddable: bool,
    pub(crate) serif: bool,
    pub(crate) bold: bool,
}

impl Default for BoxFont {
    fn default() -> Self {
        Self {
            subsets: true,
            embeddable: true,
            serif: false,
            bold: false,
        }
    }
}

impl FontSource for BoxFont {
    fn family_name(&self) -> &str {
        "Box Sans"
    }
    fn flags(&self) -> FontFlags {
        if self.serif {
            FontFlags::SERIF
        } else {
            FontFlags::empty()
        }
    }
    fn is_bold(&self) -> bool {
        self.bold
    }
    fn units_per_em(&self) -> u16 {
        1000
    }
    fn ascent(&self) -> f32 {
        800.0
    }
    fn descent(&self) -> f32 {
        -200.0
    }
    fn glyph_index(&self, ch: char) -> Option<u16> {
        ch.is_ascii_graphic().then(|| ch as u16)
    }
    fn advance_width(&self, _glyph: u16) -> f32 {
        600.0
    }
    fn kerning(&self, left: u16, right: u16) -> f32 {
        if (left, right) == ('A' as u16, 'V' as u16) {
            -100.0
        } else {
            0.0
        }
    }
    fn glyph_outline(&self, glyph: u16) -> Option<BezPath> {
        (glyph != 0).then(|| kurbo::Rect::new(50.0, 0.0, 550.0, 700.0).to_path(0.1))
    }
    fn font_data(&self) -> Option<Arc<[u8]>> {
        self.embeddable.then(|| Arc::from(&b"box font"[..]))
    }
    fn subset(&self, chars: &BTreeSet<char>) -> Option<Vec<u8>> {
        (self.subsets && self.embeddable)
            .then(|| format!("subset:{}", chars.iter().collect::<String>()).into_bytes())
    }
}

/// `font` at size 10.
pub(crate) fn face(font: BoxFont) -> Font {
    Font::new(Arc::new(font), 10.0)
}
