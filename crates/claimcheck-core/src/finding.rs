//! The outcome of one analysis step.
//!
//! A finding is either real content or a description of why the step failed.
//! Prompts and reports still see the legacy text form, where failures are
//! spelled `"Error: <message>"`; [`Finding::render`] and [`Finding::parse`]
//! convert in both directions at that boundary.

use std::fmt;

/// Prefix that marks a failed step in rendered text.
pub const ERROR_MARKER: &str = "Error: ";

/// Success text XOR error description.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Finding {
    Content(String),
    Error(String),
}

impl Finding {
    pub fn content(text: impl Into<String>) -> Self {
        Finding::Content(text.into())
    }

    pub fn error(message: impl fmt::Display) -> Self {
        Finding::Error(message.to_string())
    }

    /// Render to the text form used in prompts and reports.
    pub fn render(&self) -> String {
        self.to_string()
    }

    /// Recover a finding from its rendered text form.
    pub fn parse(text: &str) -> Self {
        match text.strip_prefix(ERROR_MARKER) {
            Some(message) => Finding::Error(message.to_string()),
            None => Finding::Content(text.to_string()),
        }
    }

    pub fn is_error(&self) -> bool {
        matches!(self, Finding::Error(_))
    }

    /// The content, if the step succeeded.
    pub fn as_content(&self) -> Option<&str> {
        match self {
            Finding::Content(text) => Some(text),
            Finding::Error(_) => None,
        }
    }

    /// True for content that is empty or only whitespace.
    ///
    /// Error findings always render to at least the marker, so they are
    /// never blank.
    pub fn is_blank(&self) -> bool {
        match self {
            Finding::Content(text) => text.trim().is_empty(),
            Finding::Error(_) => false,
        }
    }
}

impl fmt::Display for Finding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Finding::Content(text) => f.write_str(text),
            Finding::Error(message) => write!(f, "{}{}", ERROR_MARKER, message),
        }
    }
}

impl<E: fmt::Display> From<Result<String, E>> for Finding {
    fn from(result: Result<String, E>) -> Self {
        match result {
            Ok(text) => Finding::Content(text),
            Err(e) => Finding::error(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_renders_with_marker() {
        let finding = Finding::error("P9 not found");
        assert_eq!(finding.render(), "Error: P9 not found");
        assert!(finding.is_error());
        assert!(finding.as_content().is_none());
    }

    #[test]
    fn test_content_renders_verbatim() {
        let finding = Finding::content("Patient is 44 years old.");
        assert_eq!(finding.render(), "Patient is 44 years old.");
        assert_eq!(finding.as_content(), Some("Patient is 44 years old."));
    }

    #[test]
    fn test_parse_inverts_render() {
        for finding in [Finding::content("Covered."), Finding::error("timeout")] {
            assert_eq!(Finding::parse(&finding.render()), finding);
        }
    }

    #[test]
    fn test_from_result() {
        let ok: Result<String, String> = Ok("fine".to_string());
        let err: Result<String, String> = Err("boom".to_string());
        assert_eq!(Finding::from(ok), Finding::content("fine"));
        assert_eq!(Finding::from(err).render(), "Error: boom");
    }

    #[test]
    fn test_blank_detection() {
        assert!(Finding::content("   \n").is_blank());
        assert!(!Finding::content("x").is_blank());
        assert!(!Finding::error("").is_blank());
    }
}
