use super::rule::{MatchScope, Matcher, Rule, RuleList, RuleMatch};
use crate::annotate::{review_marker, with_banner, HEADER_BANNER};
use crate::config::ConverterConfig;
use crate::error::ConversionError;
use crate::lexer::{self, LineIndex, LiteralMap};
use crate::metadata::{calculate_config_hash, RunMetadata};
use crate::types::*;
use std::any::Any;
use std::ops::Range;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, info, warn};

/// Rule name recorded when the pipeline as a whole faults
pub const ENGINE_FAULT: &str = "engine";

const UNTERMINATED: &str = "unterminated argument list";

/// Runs an ordered rule list over a buffer.
///
/// The engine never fails a conversion: a rule that panics is recorded as a
/// fault and skipped, and a fault outside any rule returns the input as it
/// was, behind the banner, with `success == false`.
pub struct RuleEngine {
    rules: RuleList,
    config: ConverterConfig,
    config_hash: String,
}

/// What one rule did to one buffer
struct RuleApplication {
    output: String,
    entries: Vec<TraceEntry>,
}

/// A located candidate, before the transform runs
struct Candidate<'t> {
    rule_match: RuleMatch<'t>,
    /// Flag without transforming: an unterminated argument list, or a span
    /// whose boundaries the matcher could not trust
    review: Option<&'static str>,
}

impl RuleEngine {
    /// Engine over the standard rule list for `config`.
    pub fn new(config: ConverterConfig) -> Result<Self, ConversionError> {
        let rules = RuleList::standard(&config)?;
        Ok(Self::with_rules(rules, config))
    }

    /// Engine over an explicit rule list, used for subsets and reordering.
    pub fn with_rules(rules: RuleList, config: ConverterConfig) -> Self {
        let config_hash = calculate_config_hash(&config).unwrap_or_else(|e| {
            warn!(error = %e, "config hash unavailable");
            String::new()
        });
        Self {
            rules,
            config,
            config_hash,
        }
    }

    pub fn rules(&self) -> &RuleList {
        &self.rules
    }

    pub fn config(&self) -> &ConverterConfig {
        &self.config
    }

    pub fn convert(&self, input: &str) -> ConversionResult {
        let metadata = RunMetadata::new(input, &self.config_hash);
        debug!(run_id = %metadata.run_id, rules = self.rules.len(), "starting conversion");

        match panic::catch_unwind(AssertUnwindSafe(|| self.run_pipeline(input))) {
            Ok((output_text, trace)) => {
                info!(
                    run_id = %metadata.run_id,
                    entries = trace.len(),
                    needs_review = trace.needs_review_count(),
                    "conversion finished"
                );
                ConversionResult {
                    output_text,
                    trace,
                    success: true,
                    metadata,
                }
            }
            Err(payload) => aborted(input, metadata, &panic_message(payload.as_ref())),
        }
    }

    fn run_pipeline(&self, input: &str) -> (String, TransformTrace) {
        let mut buffer = input.to_string();
        let mut trace = TransformTrace::default();

        for rule in &self.rules {
            debug!(rule = %rule.name, "applying rule");
            match panic::catch_unwind(AssertUnwindSafe(|| self.apply_rule(rule, &buffer))) {
                Ok(application) => {
                    buffer = application.output;
                    trace.extend(application.entries);
                }
                Err(payload) => {
                    let message = panic_message(payload.as_ref());
                    warn!(rule = %rule.name, error = %message, "rule faulted, skipped");
                    trace.push(TraceEntry::fault(
                        &rule.name,
                        None,
                        format!("rule skipped after an internal fault: {message}"),
                    ));
                }
            }
        }

        (buffer, trace)
    }

    fn apply_rule(&self, rule: &Rule, text: &str) -> RuleApplication {
        let candidates = self.candidates(rule, text);
        let lines = LineIndex::new(text);

        let mut output = String::with_capacity(text.len());
        let mut entries = Vec::new();
        let mut cursor = 0;
        let mut matched = 0;
        let mut rewritten = 0;
        let mut flagged = 0;
        let mut faults = 0;

        for candidate in candidates {
            let m = &candidate.rule_match;
            // Spans of one rule never overlap; an earlier match wins
            if m.span.start < cursor {
                continue;
            }
            matched += 1;
            output.push_str(&text[cursor..m.span.start]);
            cursor = m.span.end;

            let location = || {
                let (line, column) = lines.locate(m.span.start);
                SourceLocation { line, column }
            };

            let outcome = if let Some(reason) = candidate.review {
                Ok(RuleOutcome::flag(reason))
            } else {
                panic::catch_unwind(AssertUnwindSafe(|| rule.transform.apply(m, &self.config)))
            };

            match outcome {
                Ok(RuleOutcome::Rewritten(replacement)) if replacement != m.text => {
                    rewritten += 1;
                    output.push_str(&replacement);
                }
                Ok(RuleOutcome::Rewritten(_)) | Ok(RuleOutcome::Unchanged) => {
                    output.push_str(m.text);
                }
                Ok(RuleOutcome::FlaggedForReview {
                    replacement,
                    reason,
                }) => {
                    flagged += 1;
                    if rule.is_traced() {
                        let location = location();
                        warn!(rule = %rule.name, %location, reason = %reason, "flagged for review");
                        entries.push(TraceEntry::flagged(&rule.name, location, reason.clone()));
                    }
                    output.push_str(&review_marker(&rule.name, &reason));
                    output.push(' ');
                    output.push_str(replacement.as_deref().unwrap_or(m.text));
                }
                Err(payload) => {
                    faults += 1;
                    let location = location();
                    let message = panic_message(payload.as_ref());
                    warn!(rule = %rule.name, %location, error = %message, "transform faulted, match left unchanged");
                    entries.push(TraceEntry::fault(
                        &rule.name,
                        Some(location),
                        format!("match left unchanged after an internal fault: {message}"),
                    ));
                    output.push_str(m.text);
                }
            }
        }
        output.push_str(&text[cursor..]);

        if rule.is_traced() && rewritten + flagged + faults > 0 {
            let summary = TraceEntry::applied(
                &rule.name,
                matched,
                rule.severity,
                summary_note(rule, rewritten, flagged, faults),
            );
            // The summary leads the per-construct entries of the same run
            entries.insert(0, summary);
        }

        RuleApplication { output, entries }
    }

    fn candidates<'t>(&self, rule: &Rule, text: &'t str) -> Vec<Candidate<'t>> {
        let literals = LiteralMap::scan(text);
        let comma_joins: Vec<Range<usize>> = match rule.scope {
            MatchScope::CommaJoin => lexer::statements(text)
                .into_iter()
                .filter(|range| lexer::has_comma_join(&text[range.clone()]))
                .collect(),
            _ => Vec::new(),
        };
        let in_scope = |start: usize| match rule.scope {
            MatchScope::Everywhere => true,
            MatchScope::Code => !literals.contains(start),
            MatchScope::CommaJoin => {
                !literals.contains(start) && comma_joins.iter().any(|range| range.contains(&start))
            }
        };

        match &rule.matcher {
            Matcher::Pattern(regex) => regex
                .captures_iter(text)
                .filter_map(|captures| {
                    let whole = captures.get(0)?;
                    if whole.as_str().is_empty() || !in_scope(whole.start()) {
                        return None;
                    }
                    Some(Candidate {
                        rule_match: RuleMatch {
                            text: whole.as_str(),
                            span: whole.range(),
                            captures: Some(captures),
                            args: Vec::new(),
                        },
                        review: None,
                    })
                })
                .collect(),
            Matcher::Call(regex) => regex
                .captures_iter(text)
                .filter_map(|captures| {
                    let whole = captures.get(0)?;
                    if !in_scope(whole.start()) {
                        return None;
                    }
                    let open = whole.end() - 1;
                    Some(match lexer::matching_paren(text, open) {
                        Some(close) => Candidate {
                            rule_match: RuleMatch {
                                text: &text[whole.start()..close + 1],
                                span: whole.start()..close + 1,
                                args: lexer::split_arguments(&text[open + 1..close]),
                                captures: Some(captures),
                            },
                            review: None,
                        },
                        None => Candidate {
                            rule_match: RuleMatch {
                                text: whole.as_str(),
                                span: whole.range(),
                                captures: Some(captures),
                                args: Vec::new(),
                            },
                            review: Some(UNTERMINATED),
                        },
                    })
                })
                .collect(),
            Matcher::Statement(regex) => regex
                .captures_iter(text)
                .filter_map(|captures| {
                    let whole = captures.get(0)?;
                    if !in_scope(whole.start()) {
                        return None;
                    }
                    let open = whole.end() - 1;
                    Some(match lexer::matching_paren(text, open) {
                        Some(close) => {
                            let end = statement_tail_end(text, close + 1);
                            Candidate {
                                rule_match: RuleMatch {
                                    text: &text[whole.start()..end],
                                    span: whole.start()..end,
                                    args: vec![
                                        &text[open + 1..close],
                                        &text[close + 1..end],
                                        &text[end..lookahead_end(text, end)],
                                    ],
                                    captures: Some(captures),
                                },
                                review: None,
                            }
                        }
                        None => Candidate {
                            rule_match: RuleMatch {
                                text: whole.as_str(),
                                span: whole.range(),
                                captures: Some(captures),
                                args: Vec::new(),
                            },
                            review: Some(UNTERMINATED),
                        },
                    })
                })
                .collect(),
            Matcher::ConcatChain => lexer::concat_chains(text, &literals)
                .into_iter()
                .map(|chain| Candidate {
                    rule_match: RuleMatch {
                        text: &text[chain.span.clone()],
                        args: chain
                            .operands
                            .iter()
                            .map(|operand| &text[operand.clone()])
                            .collect(),
                        span: chain.span,
                        captures: None,
                    },
                    review: chain.review,
                })
                .collect(),
            Matcher::Prologue => {
                let end = if text.starts_with(HEADER_BANNER) {
                    HEADER_BANNER.len()
                } else {
                    0
                };
                vec![Candidate {
                    rule_match: RuleMatch {
                        text: &text[..end],
                        span: 0..end,
                        captures: None,
                        args: Vec::new(),
                    },
                    review: None,
                }]
            }
        }
    }
}

/// Result of a run that faulted outside any rule: the input as it was,
/// behind the banner, and a single fault entry.
fn aborted(input: &str, metadata: RunMetadata, message: &str) -> ConversionResult {
    warn!(run_id = %metadata.run_id, error = %message, "conversion aborted");
    let mut trace = TransformTrace::default();
    trace.push(TraceEntry::fault(
        ENGINE_FAULT,
        None,
        format!("conversion aborted, input returned unchanged: {message}"),
    ));
    ConversionResult {
        output_text: with_banner(input),
        trace,
        success: false,
        metadata,
    }
}

/// End of the text following a statement's column list: through the `;`,
/// or to the end of the line when the statement is never terminated.
fn statement_tail_end(text: &str, from: usize) -> usize {
    let end = lexer::statement_end(text, from);
    if text[..end].ends_with(';') {
        return end;
    }
    text[from..]
        .find('\n')
        .map(|offset| from + offset)
        .unwrap_or(text.len())
}

/// End of the line after the one `from` sits on, so a statement rule can see
/// what an earlier run placed right after the statement.
fn lookahead_end(text: &str, from: usize) -> usize {
    let mut end = from;
    for _ in 0..2 {
        match text[end..].find('\n') {
            Some(offset) => end += offset + 1,
            None => return text.len(),
        }
    }
    end
}

fn summary_note(rule: &Rule, rewritten: usize, flagged: usize, faults: usize) -> String {
    let mut parts = Vec::new();
    if rewritten > 0 {
        parts.push(format!("{rewritten} occurrence(s) rewritten"));
    }
    if flagged > 0 {
        parts.push(format!("{flagged} flagged for manual review"));
    }
    if faults > 0 {
        parts.push(format!("{faults} left unchanged after a fault"));
    }
    let mut note = parts.join(", ");
    if rewritten > 0 {
        if let Some(extra) = &rule.note {
            note.push_str("; ");
            note.push_str(extra);
        }
    }
    note
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else {
        "unknown fault".to_string()
    }
}
