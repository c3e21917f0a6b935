//! Reading the decision line out of a final response.
//!
//! Final responses are stored verbatim. This is only used for tallies and
//! reporting; an unparseable response is not an error.

use lazy_static::lazy_static;
use regex::Regex;
use serde::Serialize;
use std::fmt;

lazy_static! {
    /// `Decision: APPROVE` / `Decision: [REVIEW REQUIRED]`, tolerating
    /// markdown emphasis and leading whitespace.
    static ref DECISION_LINE: Regex = Regex::new(
        r"(?im)^[\s*_#>-]*decision[\s*_]*:[\s*_\[]*(approve|review\s+required)\b"
    ).unwrap();
}

/// The two decisions a final response may carry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DecisionLine {
    Approve,
    ReviewRequired,
}

impl DecisionLine {
    /// Find the first decision line in `response`.
    pub fn extract(response: &str) -> Option<Self> {
        let captures = DECISION_LINE.captures(response)?;
        let token = captures.get(1)?.as_str();
        if token.eq_ignore_ascii_case("approve") {
            Some(DecisionLine::Approve)
        } else {
            Some(DecisionLine::ReviewRequired)
        }
    }

    /// The literal token as it appears in responses.
    pub fn as_str(self) -> &'static str {
        match self {
            DecisionLine::Approve => "APPROVE",
            DecisionLine::ReviewRequired => "REVIEW REQUIRED",
        }
    }
}

impl fmt::Display for DecisionLine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plain_two_line_response() {
        let response = "Decision: APPROVE\nReason: Diagnosis and procedure are covered.";
        assert_eq!(DecisionLine::extract(response), Some(DecisionLine::Approve));
    }

    #[test]
    fn test_review_required_with_markdown() {
        let response = "**Decision:** REVIEW REQUIRED\n**Reason:** Preauthorization missing.";
        assert_eq!(
            DecisionLine::extract(response),
            Some(DecisionLine::ReviewRequired)
        );
    }

    #[test]
    fn test_bracketed_and_lowercase() {
        assert_eq!(
            DecisionLine::extract("decision: [approve]\nreason: ok"),
            Some(DecisionLine::Approve)
        );
    }

    #[test]
    fn test_reason_mentions_do_not_count() {
        let response = "Reason: would APPROVE if preauthorized";
        assert_eq!(DecisionLine::extract(response), None);
    }

    #[test]
    fn test_error_marker_is_unparsed() {
        assert_eq!(DecisionLine::extract("Error: connection refused"), None);
    }
}
