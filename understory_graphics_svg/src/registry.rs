// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! Identifier generation, CSS classes and gradient definitions.

use hashbrown::HashMap;
use understory_graphics::Brush;

use crate::error::{SvgError, SvgResult};

/// Generates document-unique ids under a prefix.
#[derive(Clone, Debug, Default)]
pub(crate) struct Ids {
    prefix: String,
    counters: HashMap<&'static str, usize>,
}

impl Ids {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            counters: HashMap::new(),
        }
    }

    pub(crate) fn prefix(&self) -> &str {
        &self.prefix
    }

    /// A fresh id for a resource of `kind`, derived from `tag` when set.
    pub(crate) fn next(&mut self, kind: &'static str, tag: Option<&str>) -> String {
        let n = self.counters.entry(kind).or_insert(0);
        *n += 1;
        match tag {
            Some(tag) => format!("{}{tag}_{kind}{n}", self.prefix),
            None => format!("{}{kind}{n}", self.prefix),
        }
    }

    /// The element id for a caller tag.
    pub(crate) fn for_tag(&self, tag: &str) -> String {
        format!("{}{tag}", self.prefix)
    }
}

/// A CSS class and its canonical declaration list.
#[derive(Clone, Debug, PartialEq, Eq)]
pub(crate) struct StyleClass {
    pub(crate) name: String,
    pub(crate) declarations: String,
}

/// Shared CSS classes, matched structurally in insertion order.
#[derive(Clone, Debug, Default)]
pub(crate) struct StyleRegistry {
    prefix: String,
    classes: Vec<StyleClass>,
}

impl StyleRegistry {
    pub(crate) fn new(prefix: &str) -> Self {
        Self {
            prefix: prefix.to_owned(),
            classes: Vec::new(),
        }
    }

    /// The class for `attributes`, creating `class<N+1>` when no existing
    /// class has exactly the same declarations.
    pub(crate) fn class_for(&mut self, attributes: &[(String, String)]) -> String {
        let mut sorted: Vec<_> = attributes.iter().collect();
        sorted.sort();
        let declarations = sorted
            .iter()
            .map(|(k, v)| format!("{k}:{v}"))
            .collect::<Vec<_>>()
            .join(";");
        if let Some(class) = self.classes.iter().find(|c| c.declarations == declarations) {
            return class.name.clone();
        }
        let name = format!("{}class{}", self.prefix, self.classes.len() + 1);
        self.classes.push(StyleClass {
            name: name.clone(),
            declarations,
        });
        name
    }

    pub(crate) fn classes(&self) -> &[StyleClass] {
        &self.classes
    }

    pub(crate) fn classes_mut(&mut self) -> &mut [StyleClass] {
        &mut self.classes
    }

    /// The CSS rules, one per line.
    pub(crate) fn to_css(&self) -> String {
        let mut css = String::new();
        for class in &self.classes {
            css.push('.');
            css.push_str(&class.name);
            css.push_str(" { ");
            for (k, v) in class.declarations.split(';').filter_map(|d| d.split_once(':')) {
                css.push_str(k);
                css.push_str(": ");
                css.push_str(v);
                css.push_str("; ");
            }
            css.push_str("}\n");
        }
        css
    }
}

/// Parses `key:value` declarations separated by `;`.
///
/// Empty declarations are skipped. A declaration without a `:` or with an
/// empty key is an error.
pub fn parse_declarations(style: &str) -> SvgResult<Vec<(String, String)>> {
    let mut out = Vec::new();
    for declaration in style.split(';') {
        let declaration = declaration.trim();
        if declaration.is_empty() {
            continue;
        }
        let Some((key, value)) = declaration.split_once(':') else {
            return Err(SvgError::invalid_style(declaration));
        };
        let key = key.trim();
        if key.is_empty() {
            return Err(SvgError::invalid_style(declaration));
        }
        out.push((key.to_owned(), value.trim().to_owned()));
    }
    Ok(out)
}

/// Joins declarations back into `key:value;key:value` form.
pub(crate) fn format_declarations(declarations: &[(String, String)]) -> String {
    declarations
        .iter()
        .map(|(k, v)| format!("{k}:{v}"))
        .collect::<Vec<_>>()
        .join(";")
}

/// Names of emitted gradient definitions.
///
/// With reuse on, a gradient object is defined once and looked up by
/// identity; the registry holds a clone of the brush so the identity stays
/// valid for the life of the document.
#[derive(Debug, Default)]
pub(crate) struct GradientRegistry {
    reuse: bool,
    by_object: HashMap<usize, (Brush, String)>,
    emitted: usize,
}

impl GradientRegistry {
    pub(crate) fn new(reuse: bool) -> Self {
        Self {
            reuse,
            by_object: HashMap::new(),
            emitted: 0,
        }
    }

    /// The id for the gradient in `brush` and whether a definition must be
    /// emitted for it. `None` for solid brushes.
    pub(crate) fn id_for(
        &mut self,
        brush: &Brush,
        ids: &mut Ids,
        tag: Option<&str>,
    ) -> Option<(String, bool)> {
        let key = brush.resource_key()?;
        if self.reuse {
            if let Some((_, id)) = self.by_object.get(&key) {
                return Some((id.clone(), false));
            }
        }
        let id = ids.next("gradient", tag);
        self.emitted += 1;
        if self.reuse {
            self.by_object.insert(key, (brush.clone(), id.clone()));
        }
        Some((id, true))
    }

    /// Number of definitions handed out.
    pub(crate) fn emitted(&self) -> usize {
        self.emitted
    }
}
