// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

// After you edit the crate's doc comment, run this command, then check README.md for any missing links
// cargo rdme --workspace-project=understory_text_graphics --heading-base-level=0

//! Font faces for Understory graphics, read with [`skrifa`].
//!
//! [`SkrifaFont`] answers the [`FontSource`] questions from an OpenType or
//! TrueType font program: family name and style, vertical metrics, the
//! character map, advances, `kern` table pair kerning and unscaled glyph
//! outlines.
//!
//! Subsetting is not supported, so backends that embed fonts embed the
//! whole program. Fonts whose `OS/2` embedding permissions forbid it are
//! never handed out for embedding.
//!
//! ```no_run
//! use std::sync::Arc;
//!
//! use understory_graphics::Font;
//! use understory_text_graphics::SkrifaFont;
//!
//! let data = std::fs::read("DejaVuSans.ttf").unwrap();
//! let face = SkrifaFont::new(data).unwrap();
//! let font = Font::new(Arc::new(face), 12.0);
//! println!("{}", font.measure_text("Hello").width);
//! ```

mod kern;

use std::fmt;
use std::sync::Arc;

use kurbo::BezPath;
use skrifa::attribute::Style;
use skrifa::instance::{LocationRef, Size};
use skrifa::outline::OutlinePen;
use skrifa::raw::types::Tag;
use skrifa::raw::{ReadError, TableProvider};
use skrifa::string::StringId;
use skrifa::{FontRef, GlyphId, MetadataProvider};
use understory_graphics::{FontFlags, FontSource};

use crate::kern::KernPairs;

/// `OS/2` `fsType` bit for restricted license embedding.
const RESTRICTED_EMBEDDING: u16 = 0x0002;

/// Errors raised while loading a font.
#[derive(thiserror::Error, Debug)]
pub enum FontError {
    /// The data is not a readable font.
    #[error("invalid font data: {0}")]
    Read(#[from] ReadError),
}

/// A font face backed by an in-memory font program.
///
/// Face-wide properties are read once at construction; per-glyph lookups
/// parse the program on demand.
#[derive(Clone)]
pub struct SkrifaFont {
    data: Arc<[u8]>,
    index: u32,
    family: String,
    bold: bool,
    italic: bool,
    flags: FontFlags,
    units_per_em: u16,
    ascent: f32,
    descent: f32,
    embeddable: bool,
    kerning: KernPairs,
}

impl fmt::Debug for SkrifaFont {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SkrifaFont")
            .field("family", &self.family)
            .field("index", &self.index)
            .field("bold", &self.bold)
            .field("italic", &self.italic)
            .field("flags", &self.flags)
            .field("units_per_em", &self.units_per_em)
            .field("ascent", &self.ascent)
            .field("descent", &self.descent)
            .field("embeddable", &self.embeddable)
            .field("kerning_pairs", &self.kerning.len())
            .finish_non_exhaustive()
    }
}

impl SkrifaFont {
    /// Loads the first face of `data`.
    pub fn new(data: impl Into<Arc<[u8]>>) -> Result<Self, FontError> {
        Self::from_index(data, 0)
    }

    /// Loads face `index` of a font collection, or of a single font when
    /// `index` is 0.
    pub fn from_index(data: impl Into<Arc<[u8]>>, index: u32) -> Result<Self, FontError> {
        let data = data.into();
        let font = FontRef::from_index(&data, index)?;

        let family = font
            .localized_strings(StringId::FAMILY_NAME)
            .english_or_first()
            .map(|name| name.to_string())
            .unwrap_or_default();
        let attributes = font.attributes();
        let metrics = font.metrics(Size::unscaled(), LocationRef::default());
        let os2 = font.os2().ok();

        let mut flags = FontFlags::empty();
        if metrics.is_monospace {
            flags |= FontFlags::FIXED_PITCH;
        }
        if let Some(os2) = &os2 {
            flags |= classify(os2.s_family_class(), os2.panose_10());
        }
        let embeddable = os2
            .as_ref()
            .is_none_or(|os2| os2.fs_type() & 0x000f != RESTRICTED_EMBEDDING);
        let kerning = font
            .table_data(Tag::new(b"kern"))
            .map(|table| KernPairs::parse(table.as_bytes()))
            .unwrap_or_default();

        let face = Self {
            family,
            index,
            bold: attributes.weight.value() >= 600.0,
            italic: !matches!(attributes.style, Style::Normal),
            flags,
            units_per_em: metrics.units_per_em,
            ascent: metrics.ascent,
            descent: metrics.descent,
            embeddable,
            kerning,
            data,
        };
        tracing::debug!(?face, "loaded font");
        Ok(face)
    }

    fn font(&self) -> Option<FontRef<'_>> {
        FontRef::from_index(&self.data, self.index).ok()
    }
}

/// Serif and script flags from the `OS/2` family class, falling back to the
/// PANOSE classification when the class is unset.
fn classify(family_class: i16, panose: &[u8]) -> FontFlags {
    match family_class >> 8 {
        1..=5 | 7 => return FontFlags::SERIF,
        10 => return FontFlags::SCRIPT,
        8 | 9 | 12 => return FontFlags::empty(),
        _ => {}
    }
    match panose {
        // Latin text; serif styles 11 to 13 are the sans serif ones.
        [2, serif, ..] if (2..=10).contains(serif) => FontFlags::SERIF,
        [3, ..] => FontFlags::SCRIPT,
        _ => FontFlags::empty(),
    }
}

impl FontSource for SkrifaFont {
    fn family_name(&self) -> &str {
        &self.family
    }

    fn is_bold(&self) -> bool {
        self.bold
    }

    fn is_italic(&self) -> bool {
        self.italic
    }

    fn flags(&self) -> FontFlags {
        self.flags
    }

    fn units_per_em(&self) -> u16 {
        self.units_per_em
    }

    fn ascent(&self) -> f32 {
        self.ascent
    }

    fn descent(&self) -> f32 {
        self.descent
    }

    fn glyph_index(&self, ch: char) -> Option<u16> {
        let glyph = self.font()?.charmap().map(ch)?;
        u16::try_from(glyph.to_u32()).ok()
    }

    fn advance_width(&self, glyph: u16) -> f32 {
        self.font()
            .and_then(|font| {
                font.glyph_metrics(Size::unscaled(), LocationRef::default())
                    .advance_width(GlyphId::new(u32::from(glyph)))
            })
            .unwrap_or(0.0)
    }

    fn kerning(&self, left: u16, right: u16) -> f32 {
        f32::from(self.kerning.get(left, right))
    }

    fn glyph_outline(&self, glyph: u16) -> Option<BezPath> {
        let font = self.font()?;
        let outlines = font.outline_glyphs();
        let outline = outlines.get(GlyphId::new(u32::from(glyph)))?;
        let mut recorder = Recorder::default();
        outline.draw(Size::unscaled(), &mut recorder).ok()?;
        (!recorder.path.elements().is_empty()).then_some(recorder.path)
    }

    fn font_data(&self) -> Option<Arc<[u8]>> {
        self.embeddable.then(|| self.data.clone())
    }
}

/// Collects an outline in design units.
#[derive(Default)]
struct Recorder {
    path: BezPath,
}

impl OutlinePen for Recorder {
    fn move_to(&mut self, x: f32, y: f32) {
        self.path.move_to((f64::from(x), f64::from(y)));
    }

    fn line_to(&mut self, x: f32, y: f32) {
        self.path.line_to((f64::from(x), f64::from(y)));
    }

    fn quad_to(&mut self, x1: f32, y1: f32, x: f32, y: f32) {
        self.path
            .quad_to((f64::from(x1), f64::from(y1)), (f64::from(x), f64::from(y)));
    }

    fn curve_to(&mut self, x1: f32, y1: f32, x2: f32, y2: f32, x: f32, y: f32) {
        self.path.curve_to(
            (f64::from(x1), f64::from(y1)),
            (f64::from(x2), f64::from(y2)),
            (f64::from(x), f64::from(y)),
        );
    }

    fn close(&mut self) {
        self.path.close_path();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use kurbo::Shape;

    const MONO: &[u8] = include_bytes!("../../assets/fonts/dejavu/DejaVuSansMono.ttf");
    const SERIF_BOLD: &[u8] = include_bytes!("../../assets/fonts/dejavu/DejaVuSerif-Bold.ttf");

    #[test]
    fn face_properties() {
        let mono = SkrifaFont::new(MONO).unwrap();
        assert_eq!(mono.family_name(), "DejaVu Sans Mono");
        assert_eq!(mono.units_per_em(), 2048);
        assert_eq!((mono.ascent(), mono.descent()), (1901.0, -483.0));
        assert_eq!(mono.flags(), FontFlags::FIXED_PITCH);
        assert!(!mono.is_bold() && !mono.is_italic());

        let serif = SkrifaFont::new(SERIF_BOLD).unwrap();
        assert_eq!(serif.family_name(), "DejaVu Serif");
        assert_eq!(serif.flags(), FontFlags::SERIF);
        assert!(serif.is_bold());
    }

    #[test]
    fn glyph_lookups() {
        let mono = SkrifaFont::new(MONO).unwrap();
        assert_eq!(mono.glyph_index('A'), Some(36));
        assert_eq!(mono.glyph_index('\u{1F600}'), None);
        assert_eq!(mono.advance_width(36), 1233.0);
        assert_eq!(mono.advance_width(3), 1233.0);
        let outline = mono.glyph_outline(36).unwrap();
        let bounds = outline.bounding_box();
        assert!(bounds.y0 >= 0.0 && bounds.y1 > 1000.0, "{bounds:?}");
        // The space glyph has no contours.
        assert!(mono.glyph_outline(3).is_none());
    }

    #[test]
    fn kern_table_pairs() {
        let serif = SkrifaFont::new(SERIF_BOLD).unwrap();
        assert_eq!(serif.kerning(36, 57), -149.0);
        assert_eq!(serif.kerning(57, 36), -159.0);
        let mono = SkrifaFont::new(MONO).unwrap();
        assert_eq!(mono.kerning(36, 57), 0.0);
    }

    #[test]
    fn classification_fallbacks() {
        assert_eq!(classify(0x0105, &[]), FontFlags::SERIF);
        assert_eq!(classify(0x0a00, &[2, 6]), FontFlags::SCRIPT);
        assert_eq!(classify(0x0800, &[2, 6]), FontFlags::empty());
        assert_eq!(classify(0, &[2, 11]), FontFlags::empty());
        assert_eq!(classify(0, &[3, 0]), FontFlags::SCRIPT);
    }

    #[test]
    fn garbage_is_rejected() {
        assert!(matches!(
            SkrifaFont::new(&b"not a font"[..]),
            Err(FontError::Read(_))
        ));
    }
}
