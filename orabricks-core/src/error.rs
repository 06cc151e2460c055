//! Error types for building the rule pipeline.
//!
//! Only configuration problems are errors. Anything that goes wrong while a
//! rule runs is recovered and recorded in the trace instead.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConversionError {
    /// A rule's regex failed to compile.
    #[error("rule '{rule}' has an invalid pattern: {source}")]
    InvalidPattern {
        rule: String,
        #[source]
        source: regex::Error,
    },

    /// A matcher is structurally unusable (e.g. a call anchor without `(`).
    #[error("rule '{rule}' has an invalid matcher: {reason}")]
    InvalidMatcher { rule: String, reason: String },

    /// Two rules share a name.
    #[error("rule '{0}' is declared more than once")]
    DuplicateRule(String),

    /// The pipeline configuration toggles a rule that does not exist.
    #[error("pipeline configuration names unknown rule '{0}'")]
    UnknownRule(String),

    /// The pipeline configuration tries to disable a rule the output contract depends on.
    #[error("rule '{0}' is required and cannot be disabled")]
    RequiredRule(String),
}

impl ConversionError {
    pub fn invalid_matcher(rule: &str, reason: impl Into<String>) -> Self {
        Self::InvalidMatcher {
            rule: rule.to_string(),
            reason: reason.into(),
        }
    }
}
