//! Non-fatal problems collected while building a slide.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Which cosmetic step went wrong.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum DiagnosticKind {
    /// A text or paragraph style could not be applied.
    Style,
    /// The slide background could not be set.
    Background,
    /// A chart or image was replaced by a placeholder, or the placeholder failed.
    Media,
    /// Speaker notes could not be attached or styled.
    Notes,
    /// The footer text box could not be added.
    Footer,
}

/// A recorded, swallowed failure. The slide still counts as created.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub kind: DiagnosticKind,
    pub message: String,
}

impl Diagnostic {
    /// Record a diagnostic and log it at warn level.
    pub fn new(kind: DiagnosticKind, message: impl Into<String>) -> Self {
        let diagnostic = Self {
            kind,
            message: message.into(),
        };
        log::warn!("{}", diagnostic);
        diagnostic
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self.kind {
            DiagnosticKind::Style => "style",
            DiagnosticKind::Background => "background",
            DiagnosticKind::Media => "media",
            DiagnosticKind::Notes => "notes",
            DiagnosticKind::Footer => "footer",
        };
        write!(f, "[{}] {}", label, self.message)
    }
}
