//! Turns a parsed [`Document`] into render steps, collecting validation
//! errors and lint warnings on the way.

use std::ops::Range;

use toml::Spanned;

use crate::document::{Document, Kind, Node};
use crate::error::Issue;
use crate::template::{Template, value_text};

#[derive(Debug, Clone)]
pub(crate) enum Step {
    Element {
        name: String,
        attrs: Vec<(String, String)>,
        children: Vec<Step>,
    },
    Text(Template),
    Comment(Template),
    Markdown(Template),
    Dynamic(Vec<Step>),
    Each {
        path: String,
        children: Vec<Step>,
    },
}

#[derive(Debug, Default)]
pub(crate) struct Checked {
    pub steps: Vec<Step>,
    pub errors: Vec<Issue>,
    pub warnings: Vec<Issue>,
}

pub(crate) fn check(document: &Document, file_id: usize) -> Checked {
    let mut checker = Checker {
        file_id,
        errors: Vec::new(),
        warnings: Vec::new(),
    };
    let steps = checker.nodes(&document.nodes, Context::default());
    Checked {
        steps,
        errors: checker.errors,
        warnings: checker.warnings,
    }
}

/// Where a node sits in the tree.
#[derive(Debug, Clone, Copy, Default)]
struct Context {
    in_dynamic: bool,
    /// Below an `each` that is itself outside any dynamic region.
    in_static_each: bool,
    nested: bool,
}

impl Context {
    fn child(self) -> Self {
        Context {
            nested: true,
            ..self
        }
    }
}

struct Checker {
    file_id: usize,
    errors: Vec<Issue>,
    warnings: Vec<Issue>,
}

impl Checker {
    fn error(&mut self, message: impl Into<String>, span: Range<usize>) {
        self.errors.push(Issue::error(message, span, self.file_id));
    }

    fn warn(&mut self, issue: Issue) {
        self.warnings.push(issue);
    }

    fn nodes(&mut self, nodes: &[Node], cx: Context) -> Vec<Step> {
        nodes
            .iter()
            .filter_map(|node| self.node(node, cx))
            .collect()
    }

    fn node(&mut self, node: &Node, cx: Context) -> Option<Step> {
        let kind = node.kind();
        for (field, span) in node.present_fields() {
            if !kind.fields().contains(&field) {
                self.error(format!("`{field}` is not used by {kind} nodes"), span);
            }
        }

        match kind {
            Kind::Element => self.element(node, cx),
            Kind::Text => {
                let template = self.template(node, &node.value, "value", cx)?;
                Some(Step::Text(template))
            }
            Kind::Comment => {
                let template = self.template(node, &node.value, "value", cx)?;
                Some(Step::Comment(template))
            }
            Kind::Markdown => {
                let template = self.template(node, &node.source, "source", cx)?;
                Some(Step::Markdown(template))
            }
            Kind::Dynamic => {
                if cx.in_dynamic {
                    let issue = Issue::error(
                        "dynamic regions cannot be nested",
                        node.span(),
                        self.file_id,
                    )
                    .with_note("the outer region is already rendered again on every pass");
                    self.errors.push(issue);
                    return None;
                }
                if cx.in_static_each {
                    let issue = Issue::error(
                        "dynamic region inside an `each` that is outside a dynamic region",
                        node.span(),
                        self.file_id,
                    )
                    .with_note("every item opens its own region, so the cached region count would change with the list length")
                    .with_note("wrap the `each` in a dynamic region instead");
                    self.errors.push(issue);
                    return None;
                }
                let cx = Context {
                    in_dynamic: true,
                    ..cx.child()
                };
                Some(Step::Dynamic(self.nodes(&node.children, cx)))
            }
            Kind::Each => self.each(node, cx),
        }
    }

    fn required<'n>(
        &mut self,
        node: &Node,
        field: &'n Option<Spanned<String>>,
        name: &str,
    ) -> Option<&'n Spanned<String>> {
        if field.is_none() {
            self.error(
                format!("{} node is missing `{name}`", node.kind()),
                node.span(),
            );
        }
        field.as_ref()
    }

    fn element(&mut self, node: &Node, cx: Context) -> Option<Step> {
        let name = self.required(node, &node.name, "name")?;
        let tag = name.get_ref().trim();
        if tag.is_empty() || tag.contains(char::is_whitespace) {
            self.error(format!("invalid element name `{}`", name.get_ref()), name.span());
            return None;
        }
        if cx.nested && tag.eq_ignore_ascii_case("html") {
            self.error("`html` element must be a top-level node", name.span());
            return None;
        }
        if htmlflow::tags::is_void(tag) && !node.children.is_empty() {
            self.error(format!("void element `{tag}` cannot have children"), name.span());
            return None;
        }

        let mut attrs = Vec::with_capacity(node.attrs.len());
        for (key, value) in &node.attrs {
            if key.is_empty() || key.contains(char::is_whitespace) {
                self.error(format!("invalid attribute name `{key}`"), node.span());
                continue;
            }
            attrs.push((key.clone(), value_text(value)));
        }

        Some(Step::Element {
            name: tag.to_string(),
            attrs,
            children: self.nodes(&node.children, cx.child()),
        })
    }

    fn each(&mut self, node: &Node, cx: Context) -> Option<Step> {
        let path = self.required(node, &node.path, "path")?;
        if path.get_ref().trim().is_empty() {
            self.error("`each` path is empty", path.span());
            return None;
        }
        if !cx.in_dynamic {
            self.warn(
                Issue::warning(
                    "`each` outside a dynamic region",
                    path.span(),
                    self.file_id,
                )
                .with_note("the list rendered first is cached and repeated for every later model"),
            );
        }
        Some(Step::Each {
            path: path.get_ref().trim().to_string(),
            children: self.nodes(
                &node.children,
                Context {
                    in_static_each: !cx.in_dynamic,
                    ..cx.child()
                },
            ),
        })
    }

    fn template(
        &mut self,
        node: &Node,
        field: &Option<Spanned<String>>,
        name: &str,
        cx: Context,
    ) -> Option<Template> {
        let raw = self.required(node, field, name)?;
        let template = match Template::parse(raw.get_ref()) {
            Ok(template) => template,
            Err(message) => {
                self.error(message, raw.span());
                return None;
            }
        };
        if !cx.in_dynamic {
            if let Some(path) = template.placeholders().next() {
                let issue = Issue::warning(
                    format!("placeholder `{{{path}}}` outside a dynamic region"),
                    raw.span(),
                    self.file_id,
                )
                .with_note("its first rendered value is cached and repeated for every later model");
                self.warn(issue);
            }
        }
        Some(template)
    }
}
