//! Per-component merge diagnostics.
//!
//! Ambiguous constructs never fail a merge: both sides are kept in the output
//! and a diagnostic is recorded here so the caller can warn about it.

use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    /// Both sides changed an attribute differently; both values were kept.
    AttributeConflict,
    /// An edited secondary or default-content element no longer exists in
    /// the new version and was replaced by an empty fragment.
    CollapsedElement,
    /// No base snapshot was available; the new markup was appended as a comment.
    ManualMergeRequired,
}

impl fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DiagnosticKind::AttributeConflict => write!(f, "attribute-conflict"),
            DiagnosticKind::CollapsedElement => write!(f, "collapsed-element"),
            DiagnosticKind::ManualMergeRequired => write!(f, "manual-merge-required"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    /// Element the diagnostic is about, if any.
    pub stable_id: Option<String>,
    pub message: String,
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.stable_id {
            Some(id) => write!(f, "[{}] {}: {}", self.kind, id, self.message),
            None => write!(f, "[{}] {}", self.kind, self.message),
        }
    }
}

/// Collector for one component's diagnostics.
#[derive(Debug, Default)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, kind: DiagnosticKind, stable_id: Option<&str>, message: impl Into<String>) {
        let diagnostic = Diagnostic {
            kind,
            stable_id: stable_id.map(str::to_string),
            message: message.into(),
        };
        tracing::debug!(%diagnostic, "merge diagnostic");
        self.entries.push(diagnostic);
    }

    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn into_vec(self) -> Vec<Diagnostic> {
        self.entries
    }
}
