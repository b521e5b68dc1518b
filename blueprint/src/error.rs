use std::fmt;
use std::io;
use std::ops::Range;
use std::path::PathBuf;

use codespan_reporting::diagnostic::{Diagnostic, Label, Severity};
use htmlflow::RenderError;

/// A validation error or lint warning with its location in the document.
#[derive(Debug, Clone)]
pub struct Issue {
    pub message: String,
    pub span: Range<usize>,
    pub file_id: usize,
    pub severity: Severity,
    pub notes: Vec<String>,
}

impl Issue {
    pub fn error(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Issue {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Error,
            notes: Vec::new(),
        }
    }

    pub fn warning(message: impl Into<String>, span: Range<usize>, file_id: usize) -> Self {
        Issue {
            message: message.into(),
            span,
            file_id,
            severity: Severity::Warning,
            notes: Vec::new(),
        }
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.notes.push(note.into());
        self
    }

    pub fn is_warning(&self) -> bool {
        self.severity == Severity::Warning
    }

    pub fn to_diagnostic(&self) -> Diagnostic<usize> {
        Diagnostic::new(self.severity)
            .with_message(&self.message)
            .with_labels(vec![Label::primary(self.file_id, self.span.clone())])
            .with_notes(self.notes.clone())
    }
}

impl fmt::Display for Issue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

#[derive(Debug, thiserror::Error)]
pub enum BlueprintError {
    #[error("cannot read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("{message}")]
    Syntax {
        message: String,
        span: Option<Range<usize>>,
        file_id: usize,
    },

    #[error("blueprint has {} error(s)", .0.len())]
    Invalid(Vec<Issue>),

    #[error(transparent)]
    Render(#[from] RenderError),
}

impl BlueprintError {
    pub(crate) fn syntax(err: toml::de::Error, file_id: usize) -> Self {
        BlueprintError::Syntax {
            message: err.message().to_string(),
            span: err.span(),
            file_id,
        }
    }

    /// Diagnostics for display with `codespan_reporting`.
    pub fn to_diagnostics(&self) -> Vec<Diagnostic<usize>> {
        match self {
            BlueprintError::Syntax {
                message,
                span: Some(span),
                file_id,
            } => vec![
                Diagnostic::error()
                    .with_message(message)
                    .with_labels(vec![Label::primary(*file_id, span.clone())]),
            ],
            BlueprintError::Invalid(issues) => issues.iter().map(Issue::to_diagnostic).collect(),
            other => vec![Diagnostic::error().with_message(other.to_string())],
        }
    }
}
