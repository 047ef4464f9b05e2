// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Fonts as an opaque metrics and outline service.
//!
//! Font loading and parsing live outside this crate. A [`FontSource`]
//! answers the handful of questions drawing backends ask: character to
//! glyph mapping, advances, kerning, vertical metrics, glyph outlines and
//! the raw font program for embedding.

use std::collections::BTreeSet;
use std::fmt;
use std::sync::Arc;

use kurbo::{Affine, BezPath, Point};

bitflags::bitflags! {
    /// Classification flags used to pick a generic fallback family.
    #[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
    pub struct FontFlags: u8 {
        /// All glyphs share one advance width.
        const FIXED_PITCH = 1 << 0;
        /// The design has serifs.
        const SERIF = 1 << 1;
        /// Handwriting or script style.
        const SCRIPT = 1 << 2;
    }
}

/// CSS generic font family.
#[derive(Copy, Clone, Debug, PartialEq, Eq, Hash)]
pub enum GenericFamily {
    /// `serif`
    Serif,
    /// `sans-serif`
    SansSerif,
    /// `monospace`
    Monospace,
    /// `cursive`
    Cursive,
}

impl GenericFamily {
    /// Picks the generic family implied by `flags`.
    ///
    /// Fixed pitch wins over script, which wins over serif.
    pub fn from_flags(flags: FontFlags) -> Self {
        if flags.contains(FontFlags::FIXED_PITCH) {
            Self::Monospace
        } else if flags.contains(FontFlags::SCRIPT) {
            Self::Cursive
        } else if flags.contains(FontFlags::SERIF) {
            Self::Serif
        } else {
            Self::SansSerif
        }
    }

    /// CSS keyword.
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Serif => "serif",
            Self::SansSerif => "sans-serif",
            Self::Monospace => "monospace",
            Self::Cursive => "cursive",
        }
    }
}

/// A font face.
///
/// Metrics are in font design units. Outlines are y-up, like the font
/// program itself.
pub trait FontSource: Send + Sync + fmt::Debug {
    /// Family name as stored in the font.
    fn family_name(&self) -> &str;

    /// Whether this is a bold face.
    fn is_bold(&self) -> bool {
        false
    }

    /// Whether this is an italic face.
    fn is_italic(&self) -> bool {
        false
    }

    /// Classification flags.
    fn flags(&self) -> FontFlags {
        FontFlags::empty()
    }

    /// Design units per em.
    fn units_per_em(&self) -> u16;

    /// Distance from the baseline to the top of the tallest glyphs, positive.
    fn ascent(&self) -> f32;

    /// Distance from the baseline to the bottom of descenders, negative.
    fn descent(&self) -> f32;

    /// Maps a character to a glyph, or `None` if the font lacks it.
    fn glyph_index(&self, ch: char) -> Option<u16>;

    /// Horizontal advance of a glyph.
    fn advance_width(&self, glyph: u16) -> f32;

    /// Kerning adjustment between two adjacent glyphs.
    fn kerning(&self, _left: u16, _right: u16) -> f32 {
        0.0
    }

    /// Outline of a glyph, or `None` for empty glyphs.
    fn glyph_outline(&self, glyph: u16) -> Option<BezPath>;

    /// The complete font program, if it may be embedded.
    fn font_data(&self) -> Option<Arc<[u8]>>;

    /// A font program covering only `chars`, if subsetting is supported.
    fn subset(&self, _chars: &BTreeSet<char>) -> Option<Vec<u8>> {
        None
    }
}

/// Vertical reference used to place text relative to its anchor point.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub enum TextBaseline {
    /// The anchor is at the top of the ascent.
    Top,
    /// The anchor is at the bottom of the descent.
    Bottom,
    /// The anchor is halfway between ascent and descent.
    Middle,
    /// The anchor is on the alphabetic baseline.
    #[default]
    Baseline,
}

/// A glyph placed along a line of text.
#[derive(Copy, Clone, Debug, PartialEq)]
pub struct PositionedGlyph {
    /// Source character.
    pub ch: char,
    /// Glyph id; `0` when the font lacks the character.
    pub glyph: u16,
    /// Pen position relative to the start of the line, kerning included.
    pub x: f64,
    /// Kerning applied between the previous glyph and this one.
    pub kerning: f64,
}

/// Measured extent of a line of text.
#[derive(Copy, Clone, Debug, Default, PartialEq)]
pub struct TextMetrics {
    /// Total advance.
    pub width: f64,
    /// Ascent, positive.
    pub ascent: f64,
    /// Descent, negative.
    pub descent: f64,
}

/// A font face at a size.
#[derive(Clone, Debug)]
pub struct Font {
    /// The face.
    pub source: Arc<dyn FontSource>,
    /// Size in user units per em.
    pub size: f64,
}

impl PartialEq for Font {
    fn eq(&self, other: &Self) -> bool {
        self.same_face(other) && self.size == other.size
    }
}

impl Font {
    /// Creates a font.
    pub fn new(source: Arc<dyn FontSource>, size: f64) -> Self {
        Self { source, size }
    }

    /// Whether both fonts share one face object.
    pub fn same_face(&self, other: &Self) -> bool {
        // Compare data pointers only; vtable pointers are not unique.
        std::ptr::addr_eq(Arc::as_ptr(&self.source), Arc::as_ptr(&other.source))
    }

    /// User units per design unit.
    pub fn scale(&self) -> f64 {
        self.size / f64::from(self.source.units_per_em().max(1))
    }

    /// Scaled ascent, positive.
    pub fn ascent(&self) -> f64 {
        f64::from(self.source.ascent()) * self.scale()
    }

    /// Scaled descent, negative.
    pub fn descent(&self) -> f64 {
        f64::from(self.source.descent()) * self.scale()
    }

    /// Generic fallback family for this face.
    pub fn generic_family(&self) -> GenericFamily {
        GenericFamily::from_flags(self.source.flags())
    }

    /// Offset from the anchor's y to the alphabetic baseline (y down).
    pub fn baseline_offset(&self, baseline: TextBaseline) -> f64 {
        match baseline {
            TextBaseline::Top => self.ascent(),
            TextBaseline::Bottom => self.descent(),
            TextBaseline::Middle => (self.ascent() + self.descent()) * 0.5,
            TextBaseline::Baseline => 0.0,
        }
    }

    /// Places every character of `text` on one line, applying kerning.
    pub fn layout(&self, text: &str) -> Vec<PositionedGlyph> {
        let scale = self.scale();
        let mut out = Vec::with_capacity(text.len());
        let mut x = 0.0;
        let mut prev: Option<u16> = None;
        for ch in text.chars() {
            let glyph = self.source.glyph_index(ch).unwrap_or(0);
            let kerning = prev.map_or(0.0, |p| f64::from(self.source.kerning(p, glyph)) * scale);
            x += kerning;
            out.push(PositionedGlyph {
                ch,
                glyph,
                x,
                kerning,
            });
            x += f64::from(self.source.advance_width(glyph)) * scale;
            prev = Some(glyph);
        }
        out
    }

    /// Measures one line of text.
    pub fn measure_text(&self, text: &str) -> TextMetrics {
        let width = self.layout(text).last().map_or(0.0, |g| {
            g.x + f64::from(self.source.advance_width(g.glyph)) * self.scale()
        });
        TextMetrics {
            width,
            ascent: self.ascent(),
            descent: self.descent(),
        }
    }

    /// Glyph outlines of `text` placed on the baseline through `origin`, in
    /// y-down user space.
    pub fn outline(&self, text: &str, origin: Point) -> BezPath {
        let scale = self.scale();
        let mut path = BezPath::new();
        for glyph in self.layout(text) {
            if let Some(outline) = self.source.glyph_outline(glyph.glyph) {
                let placement = Affine::translate((origin.x + glyph.x, origin.y))
                    * Affine::scale_non_uniform(scale, -scale);
                path.extend((placement * outline).elements().iter().copied());
            }
        }
        path
    }
}
