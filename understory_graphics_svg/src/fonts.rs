// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Font usage tracking and the font embedding pass.
//!
//! While drawing, `<text>` elements name the family as stored in the font.
//! Once the document is complete, each face actually used is embedded as a
//! base64 `@font-face` (complete, or subset to the characters drawn with
//! it), and every `font-family` reference, whether on an element, in a
//! `style` attribute or in a shared class, is rewritten to the embedded name
//! followed by a generic fallback.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::Engine as _;
use understory_graphics::{Font, FontSource, GenericFamily};

use crate::error::SvgResult;
use crate::options::TextEmbedding;
use crate::registry::{StyleRegistry, format_declarations, parse_declarations};
use crate::xml::{Element, Node};

#[derive(Clone, Debug)]
struct UsedFace {
    source: Arc<dyn FontSource>,
    chars: BTreeSet<char>,
}

impl UsedFace {
    /// `<text>` elements only name the family, weight and style, so faces
    /// agreeing on those are one face in the document.
    fn matches(&self, source: &dyn FontSource) -> bool {
        self.source.family_name() == source.family_name()
            && self.source.is_bold() == source.is_bold()
            && self.source.is_italic() == source.is_italic()
    }
}

/// Faces used by `<text>` elements and the characters drawn with each.
#[derive(Clone, Debug, Default)]
pub(crate) struct FontUsage {
    faces: Vec<UsedFace>,
}

impl FontUsage {
    fn face_index(&mut self, source: &Arc<dyn FontSource>) -> usize {
        let found = self.faces.iter().position(|f| f.matches(source.as_ref()));
        found.unwrap_or_else(|| {
            self.faces.push(UsedFace {
                source: source.clone(),
                chars: BTreeSet::new(),
            });
            self.faces.len() - 1
        })
    }

    /// Notes that `text` was drawn with `font`.
    pub(crate) fn record(&mut self, font: &Font, text: &str) {
        let index = self.face_index(&font.source);
        self.faces[index].chars.extend(text.chars());
    }

    /// Adds the usage of another document.
    pub(crate) fn merge(&mut self, other: Self) {
        for face in other.faces {
            let index = self.face_index(&face.source);
            self.faces[index].chars.extend(face.chars);
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.faces.len()
    }

    pub(crate) fn is_empty(&self) -> bool {
        self.faces.is_empty()
    }
}

/// What a face's family references become.
#[derive(Debug)]
struct FamilyMapping {
    family: String,
    bold: bool,
    italic: bool,
    value: String,
}

/// Embeds the faces in `usage` and rewrites family references in `nodes`
/// and `styles`. Returns the `@font-face` rules.
#[tracing::instrument(skip_all, fields(faces = usage.len()))]
pub(crate) fn embed_fonts<'a>(
    nodes: impl IntoIterator<Item = &'a mut Node>,
    styles: &mut StyleRegistry,
    usage: &FontUsage,
    mode: TextEmbedding,
    prefix: &str,
) -> SvgResult<String> {
    if !mode.writes_text_elements() || usage.is_empty() {
        return Ok(String::new());
    }
    let mut css = String::new();
    let mut mappings = Vec::with_capacity(usage.len());
    for (index, face) in usage.faces.iter().enumerate() {
        let source = &face.source;
        let family = source.family_name();
        let generic = GenericFamily::from_flags(source.flags()).as_str();
        let program = match mode {
            TextEmbedding::EmbedFull => source.font_data().map(|d| d.to_vec()),
            TextEmbedding::EmbedSubset => subset_or_full(face),
            _ => None,
        };
        let value = match program {
            Some(program) => {
                let name = embedded_name(prefix, family, index);
                push_font_face(&mut css, &name, &program, source.as_ref());
                format!("'{name}', {generic}")
            }
            None => {
                if mode != TextEmbedding::DoNotEmbed {
                    tracing::warn!(
                        family,
                        "font cannot be embedded; referring to the installed font"
                    );
                }
                format!("'{}', {generic}", css_string(family))
            }
        };
        mappings.push(FamilyMapping {
            family: family.to_owned(),
            bold: source.is_bold(),
            italic: source.is_italic(),
            value,
        });
    }

    for node in nodes {
        if let Node::Element(el) = node {
            el.walk_mut(&mut |e| rewrite_element(e, &mappings))?;
        }
    }
    for class in styles.classes_mut() {
        let mut declarations = parse_declarations(&class.declarations)?;
        if rewrite_declarations(&mut declarations, &mappings) {
            class.declarations = format_declarations(&declarations);
        }
    }
    Ok(css)
}

fn subset_or_full(face: &UsedFace) -> Option<Vec<u8>> {
    face.source.subset(&face.chars).or_else(|| {
        tracing::warn!(
            family = face.source.family_name(),
            "font subsetting unavailable; embedding the complete font"
        );
        face.source.font_data().map(|d| d.to_vec())
    })
}

fn embedded_name(prefix: &str, family: &str, index: usize) -> String {
    let mut name: String = family.chars().filter(char::is_ascii_alphanumeric).collect();
    if name.is_empty() {
        name.push_str("font");
    }
    format!("{prefix}{name}-{}", index + 1)
}

fn css_string(family: &str) -> String {
    family.chars().filter(|c| !matches!(c, '\'' | '\\' | '"')).collect()
}

fn push_font_face(css: &mut String, name: &str, program: &[u8], source: &dyn FontSource) {
    css.push_str("@font-face { font-family: '");
    css.push_str(name);
    css.push_str("'; src: url(data:font/ttf;base64,");
    css.push_str(&base64::engine::general_purpose::STANDARD.encode(program));
    css.push_str(") format('truetype');");
    if source.is_bold() {
        css.push_str(" font-weight: bold;");
    }
    if source.is_italic() {
        css.push_str(" font-style: italic;");
    }
    css.push_str(" }\n");
}

fn lookup<'a>(
    mappings: &'a [FamilyMapping],
    family: &str,
    weight: Option<&str>,
    style: Option<&str>,
) -> Option<&'a str> {
    let family = family.trim().trim_matches(|c| c == '\'' || c == '"');
    let bold = weight == Some("bold");
    let italic = style == Some("italic");
    mappings
        .iter()
        .find(|m| m.family == family && m.bold == bold && m.italic == italic)
        .or_else(|| mappings.iter().find(|m| m.family == family))
        .map(|m| m.value.as_str())
}

fn rewrite_element(el: &mut Element, mappings: &[FamilyMapping]) -> SvgResult<()> {
    if let Some(family) = el.attr("font-family") {
        let value = lookup(mappings, family, el.attr("font-weight"), el.attr("font-style"));
        if let Some(value) = value.map(str::to_owned) {
            el.set_attr("font-family", value);
        }
    }
    if let Some(style) = el.attr("style") {
        let mut declarations = parse_declarations(style)?;
        if rewrite_declarations(&mut declarations, mappings) {
            el.set_attr("style", format_declarations(&declarations));
        }
    }
    Ok(())
}

/// Rewrites a `font-family` declaration; returns whether anything changed.
fn rewrite_declarations(declarations: &mut [(String, String)], mappings: &[FamilyMapping]) -> bool {
    let get = |key: &str| {
        declarations
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    };
    let Some(value) = get("font-family")
        .and_then(|family| lookup(mappings, family, get("font-weight"), get("font-style")))
    else {
        return false;
    };
    let value = value.to_owned();
    for (k, v) in declarations.iter_mut() {
        if k == "font-family" {
            *v = value;
            break;
        }
    }
    true
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::SvgError;
    use crate::testing::{BoxFont, face};

    fn text_element(family: &str) -> Node {
        Element::new("text")
            .with_attr("font-family", family)
            .with_attr("font-size", "10")
            .into()
    }

    fn family_of(node: &Node) -> &str {
        match node {
            Node::Element(e) => e.attr("font-family").unwrap(),
            Node::Text(_) => unreachable!("text element expected"),
        }
    }

    fn usage_of(font: &Font, text: &str) -> FontUsage {
        let mut usage = FontUsage::default();
        usage.record(font, text);
        usage
    }

    #[test]
    fn usage_is_per_family_and_style() {
        let font = face(BoxFont::default());
        let same = face(BoxFont::default());
        let bold = face(BoxFont {
            bold: true,
            ..BoxFont::default()
        });
        let mut usage = usage_of(&font, "ab");
        usage.record(&same, "bc");
        usage.merge(usage_of(&bold, "z"));
        assert_eq!(usage.len(), 2);
        assert_eq!(usage.faces[0].chars.iter().collect::<String>(), "abc");
        assert_eq!(usage.faces[1].chars.iter().collect::<String>(), "z");
    }

    #[test]
    fn instances_of_one_family_share_a_subset() {
        let first = face(BoxFont::default());
        let second = face(BoxFont::default());
        let mut usage = usage_of(&first, "A");
        usage.record(&second, "B");
        let mut nodes = vec![text_element("Box Sans"), text_element("Box Sans")];
        let css = embed_fonts(
            &mut nodes,
            &mut StyleRegistry::default(),
            &usage,
            TextEmbedding::EmbedSubset,
            "",
        )
        .unwrap();
        assert_eq!(css.matches("@font-face").count(), 1, "{css}");
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"subset:AB");
        assert!(css.contains(&encoded), "{css}");
        for node in &nodes {
            assert_eq!(family_of(node), "'BoxSans-1', sans-serif");
        }
    }

    #[test]
    fn subset_embedding_rewrites_elements() {
        let font = face(BoxFont::default());
        let mut nodes = vec![text_element("Box Sans")];
        let mut styles = StyleRegistry::default();
        let css = embed_fonts(
            &mut nodes,
            &mut styles,
            &usage_of(&font, "P"),
            TextEmbedding::EmbedSubset,
            "",
        )
        .unwrap();
        assert!(css.starts_with("@font-face { font-family: 'BoxSans-1';"), "{css}");
        // The subset program is "subset:P".
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"subset:P");
        assert!(css.contains(&encoded), "{css}");
        assert_eq!(family_of(&nodes[0]), "'BoxSans-1', sans-serif");
    }

    #[test]
    fn missing_subset_falls_back_to_full_font() {
        let font = face(BoxFont {
            subsets: false,
            ..BoxFont::default()
        });
        let mut nodes = vec![text_element("Box Sans")];
        let css = embed_fonts(
            &mut nodes,
            &mut StyleRegistry::default(),
            &usage_of(&font, "P"),
            TextEmbedding::EmbedSubset,
            "",
        )
        .unwrap();
        let encoded = base64::engine::general_purpose::STANDARD.encode(b"box font");
        assert!(css.contains(&encoded), "{css}");
    }

    #[test]
    fn unembeddable_fonts_keep_the_system_family() {
        let font = face(BoxFont {
            embeddable: false,
            serif: true,
            ..BoxFont::default()
        });
        let mut nodes = vec![text_element("Box Sans")];
        let css = embed_fonts(
            &mut nodes,
            &mut StyleRegistry::default(),
            &usage_of(&font, "P"),
            TextEmbedding::EmbedFull,
            "",
        )
        .unwrap();
        assert!(css.is_empty());
        assert_eq!(family_of(&nodes[0]), "'Box Sans', serif");
    }

    #[test]
    fn classes_are_rewritten() {
        let font = face(BoxFont::default());
        let mut styles = StyleRegistry::default();
        styles.class_for(&[
            ("fill".to_owned(), "#000000".to_owned()),
            ("font-family".to_owned(), "Box Sans".to_owned()),
        ]);
        embed_fonts(
            std::iter::empty(),
            &mut styles,
            &usage_of(&font, "P"),
            TextEmbedding::DoNotEmbed,
            "",
        )
        .unwrap();
        assert_eq!(
            styles.classes()[0].declarations,
            "fill:#000000;font-family:'Box Sans', sans-serif"
        );
    }

    #[test]
    fn malformed_style_attributes_are_errors() {
        let font = face(BoxFont::default());
        let mut nodes = vec![Node::Element(
            Element::new("text").with_attr("style", "font-family Box Sans"),
        )];
        let result = embed_fonts(
            &mut nodes,
            &mut StyleRegistry::default(),
            &usage_of(&font, "P"),
            TextEmbedding::DoNotEmbed,
            "",
        );
        assert!(matches!(result, Err(SvgError::InvalidStyle(_))));
    }

    #[test]
    fn style_attributes_are_rewritten() {
        let mut el = Element::new("text").with_attr("style", "font-family:'Box Sans';font-size:10");
        let mappings = [FamilyMapping {
            family: "Box Sans".to_owned(),
            bold: false,
            italic: false,
            value: "'X-1', sans-serif".to_owned(),
        }];
        rewrite_element(&mut el, &mappings).unwrap();
        assert_eq!(el.attr("style"), Some("font-family:'X-1', sans-serif;font-size:10"));
    }
}
