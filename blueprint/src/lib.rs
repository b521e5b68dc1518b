//! Declarative HTML documents for `htmlflow`.
//!
//! A blueprint is a TOML tree of nodes compiled into a
//! [`DynamicView`] whose model is a TOML table:
//!
//! ```
//! let blueprint = blueprint::Blueprint::parse(
//!     r#"
//! [[nodes]]
//! kind = "element"
//! name = "p"
//! children = [{ kind = "dynamic", children = [{ kind = "text", value = "Hi {name}" }] }]
//! "#,
//!     0,
//! )?;
//! let view = blueprint.view()?;
//! let model: toml::Table = toml::from_str(r#"name = "Ada""#).unwrap();
//! assert_eq!(view.render_with(&model)?, "\n<p>\n\tHi Ada\n</p>");
//! # Ok::<(), blueprint::BlueprintError>(())
//! ```

mod check;
pub mod document;
pub mod error;
mod render;
pub mod template;

use std::path::Path;
use std::sync::Arc;

use htmlflow::DynamicView;
use toml::Table;

use crate::check::{Step, check};
pub use crate::document::{Document, Kind, Node};
pub use crate::error::{BlueprintError, Issue};
use crate::template::{Reporter, Scope};

/// A parsed and checked blueprint document.
#[derive(Debug)]
pub struct Blueprint {
    source: String,
    file_id: usize,
    header: Option<String>,
    steps: Arc<Vec<Step>>,
    errors: Vec<Issue>,
    warnings: Vec<Issue>,
}

impl Blueprint {
    /// Parses `source`. Spans in diagnostics refer to `file_id`.
    ///
    /// Only TOML and schema errors fail here; see [`Blueprint::validate`].
    pub fn parse(source: impl Into<String>, file_id: usize) -> Result<Self, BlueprintError> {
        let source = source.into();
        let document: Document =
            toml::from_str(&source).map_err(|err| BlueprintError::syntax(err, file_id))?;
        let checked = check(&document, file_id);
        Ok(Blueprint {
            source,
            file_id,
            header: document.header,
            steps: Arc::new(checked.steps),
            errors: checked.errors,
            warnings: checked.warnings,
        })
    }

    pub fn load(path: impl AsRef<Path>, file_id: usize) -> Result<Self, BlueprintError> {
        let path = path.as_ref();
        let source = std::fs::read_to_string(path).map_err(|source| BlueprintError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Self::parse(source, file_id)
    }

    pub fn source(&self) -> &str {
        &self.source
    }

    pub fn file_id(&self) -> usize {
        self.file_id
    }

    pub fn header(&self) -> Option<&str> {
        self.header.as_deref()
    }

    /// Errors that prevent [`Blueprint::view`] from compiling the document.
    pub fn validate(&self) -> &[Issue] {
        &self.errors
    }

    /// Warnings about model data that the static-block cache would freeze.
    pub fn lint(&self) -> &[Issue] {
        &self.warnings
    }

    /// Compiles the document into a view. Each returned view owns its own
    /// cache, so separate calls never share rendered blocks.
    pub fn view(&self) -> Result<DynamicView<Table>, BlueprintError> {
        if !self.errors.is_empty() {
            return Err(BlueprintError::Invalid(self.errors.clone()));
        }
        let steps = Arc::clone(&self.steps);
        let reporter = Reporter::default();
        tracing::debug!(
            target: "blueprint",
            file_id = self.file_id,
            nodes = steps.len(),
            warnings = self.warnings.len(),
            "compiled blueprint"
        );

        let view = DynamicView::bind(move |html, model: &Table| {
            render::emit(html, &steps, &Scope::root(model), &reporter)
        });
        Ok(match &self.header {
            Some(header) => view.with_header(header.as_str()),
            None => view,
        })
    }
}
