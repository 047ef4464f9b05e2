// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Assembly of drawn content into an `<svg>` document.

use crate::SvgResult;
use crate::fmt::num;
use crate::fonts::{self, FontUsage};
use crate::options::TextEmbedding;
use crate::registry::StyleRegistry;
use crate::xml::{Element, Node};

/// Everything a context drew, before the document-level passes.
#[derive(Debug)]
pub(crate) struct Rendered {
    pub(crate) body: Vec<Node>,
    pub(crate) defs: Vec<Node>,
    pub(crate) styles: StyleRegistry,
    pub(crate) fonts: FontUsage,
    pub(crate) glyph_defs: Vec<Element>,
    pub(crate) gradients: usize,
    pub(crate) prefix: String,
}

/// An empty SVG 1.1 root of the given size.
pub(crate) fn svg_root(width: f64, height: f64) -> Element {
    Element::new("svg")
        .with_attr("xmlns", "http://www.w3.org/2000/svg")
        .with_attr("xmlns:xlink", "http://www.w3.org/1999/xlink")
        .with_attr("version", "1.1")
        .with_attr("width", num(width))
        .with_attr("height", num(height))
        .with_attr("viewBox", format!("0 0 {} {}", num(width), num(height)))
}

/// Runs the font embedding pass over `rendered` and appends the style
/// block, the definitions and the content to `root`.
pub(crate) fn assemble(
    root: &mut Element,
    rendered: Rendered,
    text: TextEmbedding,
) -> SvgResult<()> {
    let Rendered {
        mut body,
        mut defs,
        mut styles,
        fonts,
        glyph_defs,
        gradients,
        prefix,
    } = rendered;

    // Mask content lives in the definitions and may draw text too.
    let mut css = fonts::embed_fonts(
        body.iter_mut().chain(defs.iter_mut()),
        &mut styles,
        &fonts,
        text,
        &prefix,
    )?;
    css.push_str(&styles.to_css());
    if !css.is_empty() {
        let mut style = Element::new("style").with_attr("type", "text/css");
        style.push_text(css);
        root.push(style);
    }
    if !defs.is_empty() {
        let mut el = Element::new("defs");
        el.children = defs;
        root.push(el);
    }
    for glyphs in glyph_defs {
        root.push(glyphs);
    }
    root.children.extend(body);

    let mut elements = 0_usize;
    root.walk(&mut |_| elements += 1);
    tracing::debug!(
        elements,
        gradients,
        fonts = fonts.len(),
        classes = styles.classes().len(),
        "svg document complete"
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn root_has_view_box() {
        let root = svg_root(100.0, 50.5);
        assert_eq!(root.attr("viewBox"), Some("0 0 100 50.5"));
        assert_eq!(root.attr("version"), Some("1.1"));
    }

    #[test]
    fn empty_sections_are_omitted() {
        let mut root = svg_root(1.0, 1.0);
        let rendered = Rendered {
            body: vec![Element::new("path").into()],
            defs: Vec::new(),
            styles: StyleRegistry::default(),
            fonts: FontUsage::default(),
            glyph_defs: Vec::new(),
            gradients: 0,
            prefix: String::new(),
        };
        assemble(&mut root, rendered, TextEmbedding::EmbedSubset).unwrap();
        let names: Vec<_> = root.elements().map(|e| e.name.as_str()).collect();
        assert_eq!(names, ["path"]);
    }
}
