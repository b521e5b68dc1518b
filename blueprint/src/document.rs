use std::fmt;
use std::ops::Range;

use serde::Deserialize;
use toml::{Spanned, Table};

/// A blueprint document as written in TOML.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Document {
    /// Overrides the `<!DOCTYPE html>` header written before a root `html` element.
    #[serde(default)]
    pub header: Option<String>,
    #[serde(default)]
    pub nodes: Vec<Node>,
}

/// One node of the tree. Which fields apply depends on `kind`; the checker
/// reports missing and stray fields against the node's `kind` span.
#[derive(Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Node {
    pub kind: Spanned<Kind>,
    #[serde(default)]
    pub name: Option<Spanned<String>>,
    #[serde(default)]
    pub value: Option<Spanned<String>>,
    #[serde(default)]
    pub source: Option<Spanned<String>>,
    #[serde(default)]
    pub path: Option<Spanned<String>>,
    #[serde(default)]
    pub attrs: Table,
    #[serde(default)]
    pub children: Vec<Node>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Kind {
    Element,
    Text,
    Comment,
    Dynamic,
    Each,
    Markdown,
}

impl Kind {
    pub fn as_str(self) -> &'static str {
        match self {
            Kind::Element => "element",
            Kind::Text => "text",
            Kind::Comment => "comment",
            Kind::Dynamic => "dynamic",
            Kind::Each => "each",
            Kind::Markdown => "markdown",
        }
    }

    /// Fields a node of this kind may carry besides `kind`.
    pub fn fields(self) -> &'static [&'static str] {
        match self {
            Kind::Element => &["name", "attrs", "children"],
            Kind::Text | Kind::Comment => &["value"],
            Kind::Markdown => &["source"],
            Kind::Dynamic => &["children"],
            Kind::Each => &["path", "children"],
        }
    }
}

impl fmt::Display for Kind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Node {
    pub fn kind(&self) -> Kind {
        *self.kind.get_ref()
    }

    pub fn span(&self) -> Range<usize> {
        self.kind.span()
    }

    /// Fields actually set on this node, with the best span available for each.
    pub fn present_fields(&self) -> Vec<(&'static str, Range<usize>)> {
        let mut present = Vec::new();
        let spanned = [
            ("name", &self.name),
            ("value", &self.value),
            ("source", &self.source),
            ("path", &self.path),
        ];
        for (field, value) in spanned {
            if let Some(value) = value {
                present.push((field, value.span()));
            }
        }
        if !self.attrs.is_empty() {
            present.push(("attrs", self.span()));
        }
        if !self.children.is_empty() {
            present.push(("children", self.span()));
        }
        present
    }
}
