//! Diagnostics emitted by the parser and the analyzer.

use std::{fmt, ops::Range};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub message: String,
    /// Byte range into the source the diagnostic was produced from, when the
    /// producer had one (the analyzer works on span-free trees).
    pub span: Option<Range<usize>>,
}

impl Diagnostic {
    pub fn new(message: impl Into<String>) -> Self {
        Self { message: message.into(), span: None }
    }

    pub fn spanned(message: impl Into<String>, span: Range<usize>) -> Self {
        Self { message: message.into(), span: Some(span) }
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.span {
            Some(span) => write!(f, "error at {}..{}: {}", span.start, span.end, self.message),
            None => write!(f, "error: {}", self.message),
        }
    }
}

/// Render a diagnostics list one per line, as the internal-error dump does.
pub fn render_all(diagnostics: &[Diagnostic]) -> String {
    let mut out = String::new();
    for diag in diagnostics {
        out.push_str(&diag.to_string());
        out.push('\n');
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_with_and_without_span() {
        assert_eq!(Diagnostic::new("bad").to_string(), "error: bad");
        assert_eq!(Diagnostic::spanned("bad", 3..7).to_string(), "error at 3..7: bad");
    }
}
