// Helpers for exercising a single transform without building an engine.

use super::rule::{RuleMatch, TransformFn};
use crate::config::ConverterConfig;
use crate::lexer;
use crate::types::RuleOutcome;
use regex::Regex;

/// Outcome of `transform` on the first match of `pattern` in `text`.
pub fn first_outcome(
    pattern: &str,
    text: &str,
    transform: TransformFn,
    config: &ConverterConfig,
) -> RuleOutcome {
    let regex = Regex::new(pattern).unwrap();
    let captures = regex.captures(text).unwrap();
    let span = captures.get(0).unwrap().range();
    let m = RuleMatch {
        text: &text[span.clone()],
        span,
        captures: Some(captures),
        args: Vec::new(),
    };
    transform(&m, config)
}

/// Like [`first_outcome`], but `pattern` anchors a call and the span runs to
/// its balanced closing parenthesis.
pub fn first_call_outcome(
    pattern: &str,
    text: &str,
    transform: TransformFn,
    config: &ConverterConfig,
) -> RuleOutcome {
    let regex = Regex::new(pattern).unwrap();
    let captures = regex.captures(text).unwrap();
    let anchor = captures.get(0).unwrap();
    let open = anchor.end() - 1;
    let close = lexer::matching_paren(text, open).unwrap();
    let m = RuleMatch {
        text: &text[anchor.start()..close + 1],
        span: anchor.start()..close + 1,
        args: lexer::split_arguments(&text[open + 1..close]),
        captures: Some(captures),
    };
    transform(&m, config)
}
