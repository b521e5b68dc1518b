//! `{path}` placeholders in text, comment and markdown values.
//!
//! `{{` and `}}` stand for literal braces. `{.}` is the current `each` item.

use std::collections::HashSet;

use parking_lot::Mutex;
use toml::{Table, Value};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Template {
    segments: Vec<Segment>,
}

impl Template {
    pub fn parse(raw: &str) -> Result<Self, String> {
        let mut segments = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.chars().peekable();

        while let Some(c) = chars.next() {
            match c {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    literal.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    literal.push('}');
                }
                '{' => {
                    let mut path = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => return Err("`{` inside a placeholder".into()),
                            Some(c) => path.push(c),
                            None => return Err(format!("unclosed placeholder `{{{path}`")),
                        }
                    }
                    let path = path.trim();
                    if path.is_empty() {
                        return Err("empty placeholder `{}`".into());
                    }
                    if !literal.is_empty() {
                        segments.push(Segment::Literal(std::mem::take(&mut literal)));
                    }
                    segments.push(Segment::Placeholder(path.to_string()));
                }
                '}' => return Err("unmatched `}`; write `}}` for a literal brace".into()),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            segments.push(Segment::Literal(literal));
        }
        Ok(Template { segments })
    }

    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|segment| match segment {
            Segment::Placeholder(path) => Some(path.as_str()),
            Segment::Literal(_) => None,
        })
    }

    pub fn has_placeholders(&self) -> bool {
        self.placeholders().next().is_some()
    }

    pub fn render(&self, scope: &Scope<'_>, reporter: &Reporter) -> String {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => out.push_str(text),
                Segment::Placeholder(path) => match scope.lookup(path) {
                    Some(value) => out.push_str(&value_text(value)),
                    None => reporter.missing(path),
                },
            }
        }
        out
    }
}

/// Strings are written without quotes; everything else in TOML notation.
pub fn value_text(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

/// Model lookups: innermost `each` item first, then the model root.
#[derive(Debug, Clone)]
pub struct Scope<'a> {
    model: &'a Table,
    items: Vec<&'a Value>,
}

impl<'a> Scope<'a> {
    pub fn root(model: &'a Table) -> Self {
        Scope {
            model,
            items: Vec::new(),
        }
    }

    pub fn with_item(&self, item: &'a Value) -> Self {
        let mut items = self.items.clone();
        items.push(item);
        Scope {
            model: self.model,
            items,
        }
    }

    pub fn lookup(&self, path: &str) -> Option<&'a Value> {
        if path == "." {
            return self.items.last().copied();
        }
        let mut keys = path.split('.');
        let first = keys.next()?;
        let rest: Vec<&str> = keys.collect();

        let from_items = self.items.iter().rev().copied().find_map(|item| match item {
            Value::Table(table) => descend(table.get(first)?, &rest),
            _ => None,
        });
        from_items.or_else(|| descend(self.model.get(first)?, &rest))
    }
}

fn descend<'a>(mut value: &'a Value, keys: &[&str]) -> Option<&'a Value> {
    for key in keys {
        value = match value {
            Value::Table(table) => table.get(*key)?,
            Value::Array(items) => items.get(key.parse::<usize>().ok()?)?,
            _ => return None,
        };
    }
    Some(value)
}

/// Reports each unresolved model path once per view.
#[derive(Debug, Default)]
pub struct Reporter {
    seen: Mutex<HashSet<String>>,
}

impl Reporter {
    pub fn missing(&self, path: &str) {
        if self.seen.lock().insert(path.to_string()) {
            tracing::warn!(target: "blueprint", path, "model path not found, rendering empty text");
        }
    }

    pub fn not_a_list(&self, path: &str) {
        if self.seen.lock().insert(path.to_string()) {
            tracing::warn!(target: "blueprint", path, "`each` path is not an array, skipping");
        }
    }

    pub fn reported(&self) -> usize {
        self.seen.lock().len()
    }
}
