//
// diagnostics.rs
//
// Diagnostics collaborator injected into the document store
//

use tower_lsp::lsp_types::{Diagnostic, DiagnosticSeverity, Position, Range, Url};

use crate::syntax::{SyntaxError, SyntaxTree};

pub const DIAGNOSTIC_SOURCE: &str = "frugal-ls";

/// Computes the diagnostics published for a freshly parsed document.
///
/// Runs synchronously after every parse while the document's lock is held,
/// so implementations must not call back into the document store.
pub trait DiagnosticsProvider: Send + Sync {
    fn diagnose(&self, uri: &Url, tree: &SyntaxTree, errors: &[SyntaxError]) -> Vec<Diagnostic>;
}

/// Reports every syntax error as an error diagnostic
#[derive(Debug, Clone, Copy, Default)]
pub struct SyntaxDiagnostics;

impl DiagnosticsProvider for SyntaxDiagnostics {
    fn diagnose(&self, _uri: &Url, _tree: &SyntaxTree, errors: &[SyntaxError]) -> Vec<Diagnostic> {
        errors.iter().map(syntax_error_to_diagnostic).collect()
    }
}

pub fn syntax_error_to_diagnostic(error: &SyntaxError) -> Diagnostic {
    let position = Position::new(error.line, error.column);
    Diagnostic {
        range: Range::new(position, position),
        severity: Some(DiagnosticSeverity::ERROR),
        source: Some(DIAGNOSTIC_SOURCE.to_string()),
        message: error.message.clone(),
        ..Default::default()
    }
}
