//! Annotation and reporting layer
//!
//! Turns a [`ConversionResult`] into what a person reads: the changelog,
//! the clean / needs-review verdict, the inline review markers and the
//! header banner placed on every converted script.

use crate::types::{ConversionResult, EntryKind, TraceEntry};
use serde::{Deserialize, Serialize};

/// Banner prepended to every converted script, exactly once.
pub const HEADER_BANNER: &str = "/* Converted from Oracle SQL to Databricks SQL by orabricks.
   - This is a machine-generated conversion. REVIEW it before running it.
   - PL/SQL procedural blocks, complex DECODE mappings and sequence semantics
     are the constructs most likely to need a manual rewrite.
*/

";

/// `text` with the banner in front, unless an earlier run already put it there.
pub fn with_banner(text: &str) -> String {
    if text.starts_with(HEADER_BANNER) {
        text.to_string()
    } else {
        format!("{HEADER_BANNER}{text}")
    }
}

/// Inline marker placed in front of a construct that needs manual review.
pub fn review_marker(rule_name: &str, reason: &str) -> String {
    // A reason may quote source text; never let it close the comment early
    let reason = reason.replace("*/", "* /");
    format!("/* REVIEW [{rule_name}]: {reason} */")
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum ReviewStatus {
    Clean,
    NeedsReview { flagged: usize },
}

impl ReviewStatus {
    pub fn is_clean(&self) -> bool {
        matches!(self, ReviewStatus::Clean)
    }

    pub fn summary_line(&self) -> String {
        match self {
            ReviewStatus::Clean => "Conversion clean: no constructs need manual review.".to_string(),
            ReviewStatus::NeedsReview { flagged: 1 } => {
                "Conversion needs manual review: 1 construct flagged.".to_string()
            }
            ReviewStatus::NeedsReview { flagged } => {
                format!("Conversion needs manual review: {flagged} constructs flagged.")
            }
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rendered {
    pub display_output: String,
    pub changelog: String,
    pub status: ReviewStatus,
}

impl Rendered {
    /// Changelog followed by the verdict line
    pub fn log_text(&self) -> String {
        if self.changelog.is_empty() {
            self.status.summary_line()
        } else {
            format!("{}\n{}", self.changelog, self.status.summary_line())
        }
    }
}

pub fn render(result: &ConversionResult) -> Rendered {
    let changelog = result
        .trace
        .entries()
        .iter()
        .map(changelog_line)
        .collect::<Vec<_>>()
        .join("\n");

    let flagged = result.trace.needs_review_count();
    let status = if flagged == 0 {
        ReviewStatus::Clean
    } else {
        ReviewStatus::NeedsReview { flagged }
    };

    Rendered {
        display_output: result.output_text.clone(),
        changelog,
        status,
    }
}

fn changelog_line(entry: &TraceEntry) -> String {
    let tag = match entry.kind {
        EntryKind::Applied if entry.needs_review() => "REVIEW",
        EntryKind::Applied => "INFO",
        EntryKind::Flagged => "REVIEW",
        EntryKind::Fault => "FAULT",
    };
    match entry.location {
        Some(location) => format!("[{tag}] {} ({location}): {}", entry.rule_name, entry.note),
        None => format!("[{tag}] {}: {}", entry.rule_name, entry.note),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metadata::RunMetadata;
    use crate::types::{Severity, SourceLocation, TransformTrace};

    fn result_with(entries: Vec<TraceEntry>) -> ConversionResult {
        let mut trace = TransformTrace::default();
        trace.extend(entries);
        ConversionResult {
            output_text: "SELECT 1".to_string(),
            trace,
            success: true,
            metadata: RunMetadata::new("SELECT 1", ""),
        }
    }

    #[test]
    fn test_with_banner_adds_it_once() {
        let once = with_banner("SELECT 1;");
        assert_eq!(once, format!("{HEADER_BANNER}SELECT 1;"));
        assert_eq!(with_banner(&once), once);
    }

    #[test]
    fn test_empty_trace_is_clean() {
        let rendered = render(&result_with(Vec::new()));
        assert_eq!(rendered.display_output, "SELECT 1");
        assert!(rendered.changelog.is_empty());
        assert!(rendered.status.is_clean());
        assert_eq!(rendered.log_text(), rendered.status.summary_line());
    }

    #[test]
    fn test_changelog_lines_follow_trace_order() {
        let location = SourceLocation { line: 3, column: 12 };
        let rendered = render(&result_with(vec![
            TraceEntry::applied("number-bare", 2, Severity::Info, "2 occurrences rewritten".into()),
            TraceEntry::flagged("sequence-nextval", location, "emp_seq.NEXTVAL replaced".into()),
            TraceEntry::fault("to-char-format", Some(location), "transform panicked".into()),
        ]));

        let lines: Vec<&str> = rendered.changelog.lines().collect();
        assert_eq!(
            lines,
            vec![
                "[INFO] number-bare: 2 occurrences rewritten",
                "[REVIEW] sequence-nextval (line 3, col 12): emp_seq.NEXTVAL replaced",
                "[FAULT] to-char-format (line 3, col 12): transform panicked",
            ]
        );
        assert_eq!(rendered.status, ReviewStatus::NeedsReview { flagged: 2 });
        assert!(rendered.log_text().ends_with("2 constructs flagged."));
    }

    #[test]
    fn test_review_marker_cannot_close_comment() {
        let marker = review_marker("decode-to-case", "saw */ in source");
        assert_eq!(marker, "/* REVIEW [decode-to-case]: saw * / in source */");
    }
}
