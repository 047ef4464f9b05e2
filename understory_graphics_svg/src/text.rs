// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Text output: `<text>` elements, outlines, or glyph references.

use std::sync::Arc;

use hashbrown::HashMap;
use kurbo::{Affine, Point};
use understory_graphics::{Font, FontSource, PositionedGlyph};

use crate::context::SvgContext;
use crate::fmt::{self, num};
use crate::options::TextEmbedding;
use crate::paint::{PaintRole, paint_attributes};
use crate::path_data::PathData;
use crate::registry::Ids;
use crate::xml::Element;

/// Shared glyph outlines for [`TextEmbedding::ConvertToPathsViaGlyphs`],
/// one `<defs>` block per face.
#[derive(Debug, Default)]
pub(crate) struct GlyphDefs {
    faces: Vec<FaceGlyphs>,
}

#[derive(Debug)]
struct FaceGlyphs {
    source: Arc<dyn FontSource>,
    defs: Element,
    glyphs: HashMap<u16, Option<String>>,
}

impl GlyphDefs {
    /// The id of the definition of `glyph`, adding it on first use. `None`
    /// for glyphs without an outline.
    fn glyph_id(
        &mut self,
        ids: &mut Ids,
        source: &Arc<dyn FontSource>,
        glyph: u16,
    ) -> Option<String> {
        let index = match self
            .faces
            .iter()
            .position(|f| std::ptr::addr_eq(Arc::as_ptr(&f.source), Arc::as_ptr(source)))
        {
            Some(index) => index,
            None => {
                let defs = Element::new("defs").with_attr("id", ids.next("font", None));
                self.faces.push(FaceGlyphs {
                    source: source.clone(),
                    defs,
                    glyphs: HashMap::new(),
                });
                self.faces.len() - 1
            }
        };
        let face = &mut self.faces[index];
        if let Some(id) = face.glyphs.get(&glyph) {
            return id.clone();
        }
        let id = source.glyph_outline(glyph).map(|outline| {
            let id = format!("{}_glyph{glyph}", face.defs.attr("id").unwrap_or_default());
            let mut data = PathData::default();
            data.extend(&outline);
            face.defs.push(
                Element::new("path")
                    .with_attr("id", id.clone())
                    .with_attr("d", data.take()),
            );
            id
        });
        face.glyphs.insert(glyph, id.clone());
        id
    }

    pub(crate) fn into_elements(self) -> Vec<Element> {
        self.faces.into_iter().map(|f| f.defs).collect()
    }
}

/// Places a glyph outline (y-up, design units) at `x` along the baseline.
fn glyph_placement(font: &Font, origin: Point, glyph: &PositionedGlyph) -> Affine {
    let scale = font.scale();
    Affine::translate((origin.x + glyph.x, origin.y)) * Affine::scale_non_uniform(scale, -scale)
}

impl SvgContext {
    /// Draws one line of text in the configured text mode.
    pub(crate) fn draw_text(&mut self, text: &str, origin: Point, stroke: bool) {
        let Some(font) = self.state.font.clone() else {
            tracing::warn!(text, "text drawn without a font is skipped");
            return;
        };
        if text.is_empty() {
            return;
        }
        let baseline = Point::new(origin.x, origin.y + font.baseline_offset(self.state.baseline));
        let brush = if stroke {
            self.state.stroke.clone()
        } else {
            self.state.fill.clone()
        };
        let style = self.state.stroke_style.clone();
        let paint = self.paint(&brush);
        match self.options.text {
            TextEmbedding::EmbedFull | TextEmbedding::EmbedSubset | TextEmbedding::DoNotEmbed => {
                let role = if stroke {
                    PaintRole::Stroke(&style)
                } else {
                    PaintRole::Fill(None)
                };
                let mut attributes = paint_attributes(&paint, role);
                attributes.extend(font_attributes(&font));
                self.fonts.record(&font, text);
                let mut el = Element::new("text")
                    .with_attr("x", num(baseline.x))
                    .with_attr("y", num(baseline.y));
                self.apply_style(&mut el, attributes);
                if text.starts_with(' ') || text.ends_with(' ') || text.contains("  ") {
                    el.set_attr("xml:space", "preserve");
                }
                el.set_attr("transform", fmt::matrix(self.current_transform()));
                push_kerned_runs(&mut el, &font.layout(text));
                self.emit(el);
            }
            TextEmbedding::ConvertToPaths => {
                let mut data = PathData::default();
                data.extend(&font.outline(text, baseline));
                let d = data.take();
                if d.is_empty() {
                    return;
                }
                let role = if stroke {
                    PaintRole::Stroke(&style)
                } else {
                    PaintRole::Fill(Some(understory_graphics::FillRule::NonZero))
                };
                let mut el = Element::new("path").with_attr("d", d);
                self.apply_style(&mut el, paint_attributes(&paint, role));
                el.set_attr("transform", fmt::matrix(self.current_transform()));
                self.emit(el);
            }
            TextEmbedding::ConvertToPathsViaGlyphs => {
                let role = if stroke {
                    PaintRole::Stroke(&style)
                } else {
                    PaintRole::Fill(Some(understory_graphics::FillRule::NonZero))
                };
                let mut group = Element::new("g");
                self.apply_style(&mut group, paint_attributes(&paint, role));
                for glyph in font.layout(text) {
                    let Some(id) = self.glyphs.glyph_id(&mut self.ids, &font.source, glyph.glyph)
                    else {
                        continue;
                    };
                    let placement =
                        self.current_transform() * glyph_placement(&font, baseline, &glyph);
                    group.push(
                        Element::new("use")
                            .with_attr("xlink:href", format!("#{id}"))
                            .with_attr("transform", fmt::matrix(placement)),
                    );
                }
                self.emit(group);
            }
        }
    }
}

fn font_attributes(font: &Font) -> Vec<(String, String)> {
    let mut out = vec![
        ("font-family".to_owned(), font.source.family_name().to_owned()),
        ("font-size".to_owned(), num(font.size)),
    ];
    if font.source.is_bold() {
        out.push(("font-weight".to_owned(), "bold".to_owned()));
    }
    if font.source.is_italic() {
        out.push(("font-style".to_owned(), "italic".to_owned()));
    }
    out
}

/// Writes `glyphs` as text, starting a `<tspan dx>` wherever kerning moves
/// a glyph.
fn push_kerned_runs(el: &mut Element, glyphs: &[PositionedGlyph]) {
    let mut run = String::new();
    let mut run_dx: Option<f64> = None;
    let flush = |el: &mut Element, run: &mut String, dx: Option<f64>| {
        if run.is_empty() {
            return;
        }
        let text = core::mem::take(run);
        match dx {
            None => el.push_text(text),
            Some(dx) => {
                let mut tspan = Element::new("tspan").with_attr("dx", num(dx));
                tspan.push_text(text);
                el.push(tspan);
            }
        }
    };
    for glyph in glyphs {
        if glyph.kerning != 0.0 {
            flush(el, &mut run, run_dx);
            run_dx = Some(glyph.kerning);
        }
        run.push(glyph.ch);
    }
    flush(el, &mut run, run_dx);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::options::SvgOptions;
    use crate::testing::{BoxFont, face};
    use crate::xml::Node;
    use understory_graphics::{GraphicsContext, TextBaseline};

    fn draw(mode: TextEmbedding, text: &str) -> crate::document::Rendered {
        let mut ctx = SvgContext::new(SvgOptions::default().with_text(mode));
        ctx.set_font(face(BoxFont::default()));
        ctx.fill_text(text, Point::new(50.0, 50.0));
        ctx.into_rendered()
    }

    fn element(node: &Node) -> &Element {
        match node {
            Node::Element(e) => e,
            Node::Text(t) => panic!("unexpected text {t}"),
        }
    }

    #[test]
    fn kerning_splits_runs_only_where_needed() {
        let rendered = draw(TextEmbedding::DoNotEmbed, "AVAB");
        let text = element(&rendered.body[0]);
        assert_eq!(text.name, "text");
        assert_eq!(text.attr("font-family"), Some("Box Sans"));
        assert_eq!(text.attr("font-size"), Some("10"));
        assert_eq!(text.children.len(), 2);
        assert_eq!(text.children[0], Node::Text("A".to_owned()));
        let tspan = element(&text.children[1]);
        assert_eq!(tspan.attr("dx"), Some("-1"));
        assert_eq!(tspan.children, [Node::Text("VAB".to_owned())]);
    }

    #[test]
    fn baseline_moves_the_anchor() {
        let mut ctx = SvgContext::new(SvgOptions::default());
        ctx.set_font(face(BoxFont::default()));
        ctx.set_text_baseline(TextBaseline::Middle);
        ctx.fill_text("P", Point::new(50.0, 50.0));
        let rendered = ctx.into_rendered();
        let text = element(&rendered.body[0]);
        assert_eq!(text.attr("x"), Some("50"));
        assert_eq!(text.attr("y"), Some("53"));
        assert_eq!(rendered.fonts.len(), 1);
    }

    #[test]
    fn outlines_become_one_path() {
        let rendered = draw(TextEmbedding::ConvertToPaths, "AB");
        assert_eq!(rendered.body.len(), 1);
        let path = element(&rendered.body[0]);
        assert_eq!(path.name, "path");
        let d = path.attr("d").unwrap();
        assert_eq!(d.matches('M').count(), 2, "{d}");
        // First glyph box starts at x = 50 + 0.5 on the baseline.
        assert!(d.starts_with("M 50.5 50 "), "{d}");
        assert!(rendered.fonts.is_empty());
    }

    #[test]
    fn glyph_references_share_definitions() {
        let rendered = draw(TextEmbedding::ConvertToPathsViaGlyphs, "ABA");
        assert_eq!(rendered.glyph_defs.len(), 1);
        let defs = &rendered.glyph_defs[0];
        assert_eq!(defs.attr("id"), Some("font1"));
        assert_eq!(defs.elements().count(), 2);
        let group = element(&rendered.body[0]);
        let hrefs: Vec<_> = group.elements().map(|u| u.attr("xlink:href").unwrap()).collect();
        assert_eq!(hrefs, ["#font1_glyph65", "#font1_glyph66", "#font1_glyph65"]);
    }

    #[test]
    fn spaces_are_preserved_and_skipped_in_glyph_mode() {
        let rendered = draw(TextEmbedding::DoNotEmbed, "A  B");
        assert_eq!(element(&rendered.body[0]).attr("xml:space"), Some("preserve"));
        let rendered = draw(TextEmbedding::ConvertToPathsViaGlyphs, "A B");
        assert_eq!(element(&rendered.body[0]).elements().count(), 2);
    }

    #[test]
    fn text_without_font_is_skipped() {
        let mut ctx = SvgContext::new(SvgOptions::default());
        ctx.fill_text("P", Point::new(0.0, 0.0));
        assert!(ctx.into_rendered().body.is_empty());
    }
}
