// Copyright 2025 the Understory Authors
// SPDX-License-Identifier: Apache-2.0 OR MIT

//! A small in-memory XML tree and its serializer.
//!
//! Documents are built as a tree so that later passes (font embedding,
//! animation synthesis) can inspect and rewrite elements before anything is
//! written out.

use xmlwriter::{Indent, XmlWriter};

/// A child of an [`Element`].
#[derive(Clone, Debug, PartialEq)]
pub enum Node {
    /// A nested element.
    Element(Element),
    /// Character data.
    Text(String),
}

/// An XML element with ordered attributes.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct Element {
    /// Tag name.
    pub name: String,
    /// Attributes in insertion order.
    pub attributes: Vec<(String, String)>,
    /// Children in document order.
    pub children: Vec<Node>,
}

impl Element {
    /// An element with no attributes or children.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            attributes: Vec::new(),
            children: Vec::new(),
        }
    }

    /// Builder form of [`set_attr`](Self::set_attr).
    #[must_use]
    pub fn with_attr(mut self, name: &str, value: impl Into<String>) -> Self {
        self.set_attr(name, value);
        self
    }

    /// Builder form of [`push`](Self::push).
    #[must_use]
    pub fn with_child(mut self, child: Self) -> Self {
        self.push(child);
        self
    }

    /// Sets an attribute, replacing any previous value in place.
    pub fn set_attr(&mut self, name: &str, value: impl Into<String>) {
        let value = value.into();
        match self.attributes.iter_mut().find(|(n, _)| n == name) {
            Some((_, v)) => *v = value,
            None => self.attributes.push((name.to_owned(), value)),
        }
    }

    /// Value of an attribute.
    pub fn attr(&self, name: &str) -> Option<&str> {
        self.attributes
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Removes an attribute and returns its value.
    pub fn remove_attr(&mut self, name: &str) -> Option<String> {
        let index = self.attributes.iter().position(|(n, _)| n == name)?;
        Some(self.attributes.remove(index).1)
    }

    /// Appends a child element.
    pub fn push(&mut self, child: Self) {
        self.children.push(Node::Element(child));
    }

    /// Appends character data.
    pub fn push_text(&mut self, text: impl Into<String>) {
        self.children.push(Node::Text(text.into()));
    }

    /// Child elements, skipping text.
    pub fn elements(&self) -> impl Iterator<Item = &Self> {
        self.children.iter().filter_map(|n| match n {
            Node::Element(e) => Some(e),
            Node::Text(_) => None,
        })
    }

    /// Visits this element and every descendant element, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Self)) {
        f(self);
        for child in self.elements() {
            child.walk(f);
        }
    }

    /// Mutable form of [`walk`](Self::walk); stops at the first error.
    pub fn walk_mut<E>(&mut self, f: &mut impl FnMut(&mut Self) -> Result<(), E>) -> Result<(), E> {
        f(self)?;
        for child in &mut self.children {
            if let Node::Element(e) = child {
                e.walk_mut(f)?;
            }
        }
        Ok(())
    }

    /// Serializes the element as a standalone document with an XML
    /// declaration.
    ///
    /// Everything is indented except the inside of `<text>` elements, where
    /// added whitespace would change the rendered text.
    pub fn to_document(&self) -> String {
        let mut xml = XmlWriter::new(xmlwriter::Options {
            use_single_quote: false,
            indent: Indent::Spaces(2),
            attributes_indent: Indent::None,
        });
        xml.write_declaration();
        self.write(&mut xml, false);
        xml.end_document()
    }

    fn write(&self, xml: &mut XmlWriter, preserving: bool) {
        xml.start_element(&self.name);
        for (name, value) in &self.attributes {
            xml.write_attribute(name, &escape_attribute(value));
        }
        let preserve = !preserving && self.name == "text";
        if preserve {
            xml.set_preserve_whitespaces(true);
        }
        for child in &self.children {
            match child {
                Node::Element(e) => e.write(xml, preserving || preserve),
                Node::Text(t) => xml.write_text(&t.replace('&', "&amp;")),
            }
        }
        xml.end_element();
        if preserve {
            xml.set_preserve_whitespaces(false);
        }
    }
}

fn escape_attribute(value: &str) -> String {
    value.replace('&', "&amp;").replace('<', "&lt;")
}

impl From<Element> for Node {
    fn from(e: Element) -> Self {
        Self::Element(e)
    }
}
