use crate::config::{ConverterConfig, CustomRuleConfig};
use crate::error::ConversionError;
use crate::types::{RuleOutcome, Severity};
use regex::{Captures, Regex};
use std::collections::HashSet;
use std::ops::Range;

/// Transform for built-in rules. Must be total over its matcher.
pub type TransformFn = fn(&RuleMatch<'_>, &ConverterConfig) -> RuleOutcome;

/// How a rule finds the spans it cares about
#[derive(Debug, Clone)]
pub enum Matcher {
    /// The span is the regex match
    Pattern(Regex),
    /// The regex anchors `NAME(`; the span runs to the balanced `)` and the
    /// arguments are split on top-level commas
    Call(Regex),
    /// The regex anchors a statement head ending in `(`; the span runs over
    /// the balanced body and through the statement terminator
    Statement(Regex),
    /// `a || b || ...` chains within one line
    ConcatChain,
    /// The start of the buffer, including a banner left by an earlier run
    Prologue,
}

impl Matcher {
    pub fn pattern(rule: &str, pattern: &str) -> Result<Self, ConversionError> {
        Ok(Self::Pattern(compile(rule, pattern)?))
    }

    pub fn call(rule: &str, pattern: &str) -> Result<Self, ConversionError> {
        Ok(Self::Call(compile_anchor(rule, pattern)?))
    }

    pub fn statement(rule: &str, pattern: &str) -> Result<Self, ConversionError> {
        Ok(Self::Statement(compile_anchor(rule, pattern)?))
    }
}

fn compile(rule: &str, pattern: &str) -> Result<Regex, ConversionError> {
    Regex::new(pattern).map_err(|source| ConversionError::InvalidPattern {
        rule: rule.to_string(),
        source,
    })
}

fn compile_anchor(rule: &str, pattern: &str) -> Result<Regex, ConversionError> {
    if !pattern.ends_with(r"\(") {
        return Err(ConversionError::invalid_matcher(
            rule,
            "anchor pattern must end with an opening parenthesis",
        ));
    }
    compile(rule, pattern)
}

/// Where in the buffer a match may start
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MatchScope {
    /// Anywhere, including literals and comments
    Everywhere,
    /// Outside string literals, quoted identifiers and comments
    Code,
    /// Code inside a statement whose FROM clause is a comma-separated list
    CommaJoin,
}

#[derive(Debug, Clone)]
pub enum Transform {
    Builtin(TransformFn),
    /// Regex replacement from configuration, `$1`-style expansion
    Template {
        replacement: String,
        review: Option<String>,
    },
}

impl Transform {
    pub fn apply(&self, m: &RuleMatch<'_>, config: &ConverterConfig) -> RuleOutcome {
        match self {
            Transform::Builtin(transform) => transform(m, config),
            Transform::Template {
                replacement,
                review,
            } => {
                let mut expanded = String::new();
                match &m.captures {
                    Some(captures) => captures.expand(replacement, &mut expanded),
                    None => expanded.push_str(replacement),
                }
                match review {
                    Some(reason) => RuleOutcome::flag_with(expanded, reason.clone()),
                    None => RuleOutcome::Rewritten(expanded),
                }
            }
        }
    }
}

/// One matched span handed to a transform
#[derive(Debug)]
pub struct RuleMatch<'t> {
    /// The full span text
    pub text: &'t str,
    pub span: Range<usize>,
    /// Regex captures of the anchor, when the matcher has one
    pub captures: Option<Captures<'t>>,
    /// Call arguments, statement parts or chain operands, depending on the matcher
    pub args: Vec<&'t str>,
}

impl<'t> RuleMatch<'t> {
    pub fn group(&self, index: usize) -> Option<&'t str> {
        self.captures
            .as_ref()
            .and_then(|captures| captures.get(index))
            .map(|m| m.as_str())
    }
}

#[derive(Debug, Clone)]
pub struct Rule {
    pub name: String,
    pub matcher: Matcher,
    pub transform: Transform,
    /// Severity of the per-run summary entry
    pub severity: Severity,
    pub scope: MatchScope,
    /// Appended to the summary entry whenever the rule rewrites something
    pub note: Option<String>,
}

impl Rule {
    pub fn new(name: &str, matcher: Matcher, transform: TransformFn) -> Self {
        Self {
            name: name.to_string(),
            matcher,
            transform: Transform::Builtin(transform),
            severity: Severity::Info,
            scope: MatchScope::Code,
            note: None,
        }
    }

    pub fn from_config(custom: &CustomRuleConfig) -> Result<Self, ConversionError> {
        let severity = if custom.review.is_some() {
            Severity::NeedsReview
        } else {
            Severity::Info
        };
        Ok(Self {
            name: custom.name.clone(),
            matcher: Matcher::pattern(&custom.name, &custom.pattern)?,
            transform: Transform::Template {
                replacement: custom.replacement.clone(),
                review: custom.review.clone(),
            },
            severity,
            scope: MatchScope::Code,
            note: None,
        })
    }

    pub fn with_scope(mut self, scope: MatchScope) -> Self {
        self.scope = scope;
        self
    }

    pub fn with_note(mut self, note: impl Into<String>) -> Self {
        self.note = Some(note.into());
        self
    }

    pub fn with_severity(mut self, severity: Severity) -> Self {
        self.severity = severity;
        self
    }

    /// Prologue rules rewrite the buffer but do not count as matches
    pub fn is_traced(&self) -> bool {
        !matches!(self.matcher, Matcher::Prologue)
    }
}

/// The ordered rule sequence. Later rules see earlier rules' output, so the
/// order is part of the conversion contract.
#[derive(Debug, Clone)]
pub struct RuleList {
    rules: Vec<Rule>,
}

impl RuleList {
    /// Build a list from rules in the order given. Names must be unique.
    pub fn from_rules(rules: Vec<Rule>) -> Result<Self, ConversionError> {
        let mut seen = HashSet::new();
        for rule in &rules {
            if !seen.insert(rule.name.as_str()) {
                return Err(ConversionError::DuplicateRule(rule.name.clone()));
            }
        }
        Ok(Self { rules })
    }

    pub fn iter(&self) -> std::slice::Iter<'_, Rule> {
        self.rules.iter()
    }

    pub fn names(&self) -> Vec<&str> {
        self.rules.iter().map(|rule| rule.name.as_str()).collect()
    }

    pub fn get(&self, name: &str) -> Option<&Rule> {
        self.rules.iter().find(|rule| rule.name == name)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }

    /// Keep only the named rules, preserving their relative order
    pub fn retain_named(&self, names: &[&str]) -> Self {
        Self {
            rules: self
                .rules
                .iter()
                .filter(|rule| names.contains(&rule.name.as_str()))
                .cloned()
                .collect(),
        }
    }

    pub fn into_rules(self) -> Vec<Rule> {
        self.rules
    }
}

impl<'a> IntoIterator for &'a RuleList {
    type Item = &'a Rule;
    type IntoIter = std::slice::Iter<'a, Rule>;

    fn into_iter(self) -> Self::IntoIter {
        self.rules.iter()
    }
}
