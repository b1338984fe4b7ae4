use thiserror::Error;

use crate::lex::{Location, SourceInfo};
use crate::parse::ParseError;
use crate::proof::{ProofError, StepError};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Syntax,
    /// the justification does not make sense for the step
    Structural,
    /// the justification makes sense but does not establish the step
    Unproved,
}

impl std::fmt::Display for DiagnosticKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            DiagnosticKind::Syntax => write!(f, "syntax error"),
            DiagnosticKind::Structural => write!(f, "invalid justification"),
            DiagnosticKind::Unproved => write!(f, "unproved step"),
        }
    }
}

/// The first problem found in a document.
#[derive(Debug, Clone, Error)]
#[error("{kind}: {message} at {source_info}")]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
    pub source_info: SourceInfo,
}

impl Diagnostic {
    /// Half-open, 1-based range to highlight.
    pub fn location(&self) -> Location {
        self.source_info.location()
    }
}

impl From<ParseError> for Diagnostic {
    fn from(err: ParseError) -> Self {
        Diagnostic {
            kind: DiagnosticKind::Syntax,
            message: err.to_string(),
            source_info: err.source_info().clone(),
        }
    }
}

impl From<ProofError> for Diagnostic {
    fn from(err: ProofError) -> Self {
        let kind = match err.error {
            StepError::Structural(_) => DiagnosticKind::Structural,
            StepError::Unproved { .. } => DiagnosticKind::Unproved,
        };
        Diagnostic {
            kind,
            message: err.error.to_string(),
            source_info: err.source_info,
        }
    }
}
