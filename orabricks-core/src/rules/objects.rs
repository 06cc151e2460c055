// Schema objects and legacy idioms: sequences, CREATE TABLE, (+) joins, banner.

use super::rule::RuleMatch;
use crate::annotate::HEADER_BANNER;
use crate::config::ConverterConfig;
use crate::types::RuleOutcome;

pub const SEQUENCE_PATTERN: &str =
    r"(?i)\b([A-Za-z_][A-Za-z0-9_$#]*(?:\.[A-Za-z_][A-Za-z0-9_$#]*)?)\.(NEXTVAL|CURRVAL)\b";

pub fn sequence_value(m: &RuleMatch<'_>, config: &ConverterConfig) -> RuleOutcome {
    let sequence = m.group(1).unwrap_or(m.text);
    match m.group(2) {
        Some(pseudo) if pseudo.eq_ignore_ascii_case("NEXTVAL") => RuleOutcome::flag_with(
            config.sequence_replacement.clone(),
            format!(
                "{sequence}.NEXTVAL replaced with {}; numeric sequence semantics (gaps, ordering, monotonicity) are not preserved",
                config.sequence_replacement
            ),
        ),
        _ => RuleOutcome::flag(format!(
            "{sequence}.CURRVAL has no equivalent; use an IDENTITY column or carry the generated value"
        )),
    }
}

pub const CREATE_TABLE_PATTERN: &str =
    r#"(?i)\bCREATE\s+(?:GLOBAL\s+TEMPORARY\s+)?TABLE\s+([A-Za-z0-9_$#."]+)\s*\("#;

/// True when the text after the column list already names a storage format
fn has_using_clause(tail: &str) -> bool {
    let mut words = tail.split(|c: char| !(c.is_alphanumeric() || c == '_'));
    while let Some(word) = words.next() {
        if word.eq_ignore_ascii_case("USING") {
            return words.any(|next| !next.is_empty());
        }
    }
    false
}

const SUGGESTION_PREFIX: &str = "/* Suggestion:";

/// Appends a storage-format suggestion after a CREATE TABLE statement that
/// has none. The statement itself is never modified.
pub fn create_table_storage(m: &RuleMatch<'_>, config: &ConverterConfig) -> RuleOutcome {
    // args: [column list, text through the terminator, the lines right after]
    let tail = m.args.get(1).copied().unwrap_or("");
    let following = m.args.get(2).copied().unwrap_or("");
    if has_using_clause(tail) || following.trim_start().starts_with(SUGGESTION_PREFIX) {
        return RuleOutcome::Unchanged;
    }
    let table = m.group(1).unwrap_or("<table>");
    let format = &config.storage_format;
    RuleOutcome::Rewritten(format!(
        "{}\n{SUGGESTION_PREFIX} add 'USING {format}' for Databricks, e.g. CREATE TABLE {table} (...) USING {format} */",
        m.text
    ))
}

pub const OUTER_JOIN_PATTERN: &str = r"\(\s*\+\s*\)";

pub fn outer_join_marker(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::flag("Oracle (+) outer join; rewrite as an explicit LEFT/RIGHT JOIN")
}

pub fn header_banner(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::Rewritten(HEADER_BANNER.to_string())
}
