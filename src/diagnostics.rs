use std::fmt;

use serde::Serialize;

use crate::text::TextSpan;

/// A user-facing problem reported against a span of source text.
///
/// Diagnostics are accumulated in order and never abort a stage; every
/// stage keeps producing a best-effort result so one submission can
/// surface all of its problems in a single pass.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Diagnostic {
    pub span: TextSpan,
    pub message: String,
    pub kind: DiagnosticKind,
}

/// The stage that reported a diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticKind {
    Lexer,
    Parser,
    Binder,
}

impl Diagnostic {
    pub fn lexer(message: impl Into<String>, span: TextSpan) -> Self {
        Self {
            message: message.into(),
            span,
            kind: DiagnosticKind::Lexer,
        }
    }

    pub fn parser(message: impl Into<String>, span: TextSpan) -> Self {
        Self {
            message: message.into(),
            span,
            kind: DiagnosticKind::Parser,
        }
    }

    pub fn binder(message: impl Into<String>, span: TextSpan) -> Self {
        Self {
            message: message.into(),
            span,
            kind: DiagnosticKind::Binder,
        }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for Diagnostic {}
