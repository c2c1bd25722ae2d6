use std::path::PathBuf;
use thiserror::Error;
use crate::checker::Diagnostic;

/// Failures that abort a whole derivation pass.
///
/// Per-type problems (unsupported forms, unsupported locations) are not
/// errors at this level; they are collected into the per-function issue report.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("source does not type-check ({} diagnostic(s)):\n{}", .0.len(), render_diagnostics(.0))]
    Compile(Vec<Diagnostic>),

    #[error("entry source file not found: {}", .0.display())]
    EntryNotFound(PathBuf),

    #[error("schema depth of {max_depth} exceeded while deriving {path}")]
    DepthExceeded { max_depth: usize, path: String },

    #[error("couldn't find a symbol for type '{type_name}' at {path}")]
    MissingSymbol { type_name: String, path: String },

    #[error("couldn't find any declarations for type '{type_name}' at {path}")]
    MissingDeclaration { type_name: String, path: String },
}

impl SchemaError {
    /// Internal errors point at a checker or schema-shape bug, not at user code.
    pub fn is_internal(&self) -> bool {
        matches!(
            self,
            SchemaError::DepthExceeded { .. }
                | SchemaError::MissingSymbol { .. }
                | SchemaError::MissingDeclaration { .. }
        )
    }
}

fn render_diagnostics(diagnostics: &[Diagnostic]) -> String {
    diagnostics.iter().map(|d| format!("  {d}")).collect::<Vec<_>>().join("\n")
}
