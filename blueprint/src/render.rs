use htmlflow::{Html, Result};
use pulldown_cmark::{Options, Parser as CmarkParser};
use toml::Value;

use crate::check::Step;
use crate::template::{Reporter, Scope, Template};

/// Walks `steps` in document order, driving the builder.
pub(crate) fn emit(
    html: &mut Html<'_>,
    steps: &[Step],
    scope: &Scope<'_>,
    reporter: &Reporter,
) -> Result<()> {
    for step in steps {
        match step {
            Step::Element {
                name,
                attrs,
                children,
            } => {
                // The root `html` element carries the document header.
                if name == "html" {
                    html.html(|el| element_body(el, attrs, children, scope, reporter))?;
                } else {
                    html.element(name, |el| element_body(el, attrs, children, scope, reporter))?;
                }
            }
            Step::Text(template) => {
                html.text(&template.render(scope, reporter))?;
            }
            Step::Comment(template) => {
                html.comment(&template.render(scope, reporter))?;
            }
            Step::Markdown(template) => {
                html.text(&markdown(template, scope, reporter))?;
            }
            Step::Dynamic(children) => {
                html.dynamic(|region| emit(region, children, scope, reporter))?;
            }
            Step::Each { path, children } => match scope.lookup(path) {
                Some(Value::Array(items)) => {
                    for item in items {
                        emit(html, children, &scope.with_item(item), reporter)?;
                    }
                }
                Some(_) => reporter.not_a_list(path),
                None => reporter.missing(path),
            },
        }
    }
    Ok(())
}

fn element_body(
    el: &mut Html<'_>,
    attrs: &[(String, String)],
    children: &[Step],
    scope: &Scope<'_>,
    reporter: &Reporter,
) -> Result<()> {
    for (name, value) in attrs {
        el.attr(name, value)?;
    }
    emit(el, children, scope, reporter)
}

fn markdown(template: &Template, scope: &Scope<'_>, reporter: &Reporter) -> String {
    let source = template.render(scope, reporter);
    let options = Options::ENABLE_STRIKETHROUGH | Options::ENABLE_TABLES;
    let mut out = String::with_capacity(source.len() * 3 / 2);
    pulldown_cmark::html::push_html(&mut out, CmarkParser::new_ext(&source, options));
    out.truncate(out.trim_end().len());
    out
}
