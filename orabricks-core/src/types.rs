use crate::metadata::RunMetadata;
use serde::{Deserialize, Serialize};
use std::fmt;

// ===== RULE OUTCOMES =====

/// What a rule's transform decided for one matched span.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RuleOutcome {
    /// Replace the span with this text
    Rewritten(String),
    /// Leave the span as it is, nothing to report
    Unchanged,
    /// No safe automatic rewrite. The span (or the best-effort replacement,
    /// when there is one) is kept behind an inline review marker.
    FlaggedForReview {
        replacement: Option<String>,
        reason: String,
    },
}

impl RuleOutcome {
    pub fn flag(reason: impl Into<String>) -> Self {
        Self::FlaggedForReview {
            replacement: None,
            reason: reason.into(),
        }
    }

    pub fn flag_with(replacement: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::FlaggedForReview {
            replacement: Some(replacement.into()),
            reason: reason.into(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Info,
    NeedsReview,
}

// ===== TRACE =====

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EntryKind {
    /// Summary of one rule execution that matched something
    Applied,
    /// One construct left for manual review
    Flagged,
    /// A rule fault that was recovered from
    Fault,
}

/// 1-based position in the buffer the rule observed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceLocation {
    pub line: usize,
    pub column: usize,
}

impl fmt::Display for SourceLocation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "line {}, col {}", self.line, self.column)
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TraceEntry {
    pub rule_name: String,
    pub count_of_matches: usize,
    pub kind: EntryKind,
    pub severity: Severity,
    pub note: String,
    pub location: Option<SourceLocation>,
}

impl TraceEntry {
    pub fn applied(rule_name: &str, count_of_matches: usize, severity: Severity, note: String) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            count_of_matches,
            kind: EntryKind::Applied,
            severity,
            note,
            location: None,
        }
    }

    pub fn flagged(rule_name: &str, location: SourceLocation, reason: String) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            count_of_matches: 1,
            kind: EntryKind::Flagged,
            severity: Severity::NeedsReview,
            note: reason,
            location: Some(location),
        }
    }

    pub fn fault(rule_name: &str, location: Option<SourceLocation>, note: String) -> Self {
        Self {
            rule_name: rule_name.to_string(),
            count_of_matches: usize::from(location.is_some()),
            kind: EntryKind::Fault,
            severity: Severity::NeedsReview,
            note,
            location,
        }
    }

    pub fn needs_review(&self) -> bool {
        self.severity == Severity::NeedsReview
    }
}

/// Append-only record of what each rule did, in rule-application order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TransformTrace {
    entries: Vec<TraceEntry>,
}

impl TransformTrace {
    pub fn push(&mut self, entry: TraceEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[TraceEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn for_rule<'a>(&'a self, rule_name: &'a str) -> impl Iterator<Item = &'a TraceEntry> {
        self.entries.iter().filter(move |e| e.rule_name == rule_name)
    }

    pub fn needs_review_count(&self) -> usize {
        self.entries.iter().filter(|e| e.needs_review()).count()
    }
}

impl Extend<TraceEntry> for TransformTrace {
    fn extend<I: IntoIterator<Item = TraceEntry>>(&mut self, iter: I) {
        self.entries.extend(iter);
    }
}

// ===== RESULTS =====

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversionResult {
    pub output_text: String,
    pub trace: TransformTrace,
    /// False only when the engine itself faulted; flagged constructs are a
    /// normal successful outcome.
    pub success: bool,
    pub metadata: RunMetadata,
}

/// What the presentation shell gets back from a conversion.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConvertedSql {
    pub output_text: String,
    pub log_text: String,
}
