// Built-in function rewrites: timestamps, NVL/NVL2, TO_DATE, TO_CHAR, DECODE.

use super::rule::RuleMatch;
use crate::config::ConverterConfig;
use crate::lexer::{self, has_nested_comma};
use crate::types::RuleOutcome;

pub const CURRENT_TIMESTAMP_PATTERN: &str = r"(?i)\b(?:SYSDATE|SYSTIMESTAMP)\b";

pub fn current_timestamp(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::Rewritten("CURRENT_TIMESTAMP()".to_string())
}

// Only the name changes, so nesting and arguments come through untouched.
pub const NVL_PATTERN: &str = r"(?i)\bNVL\s*\(";

pub fn nvl_to_coalesce(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::Rewritten("coalesce(".to_string())
}

pub const NVL2_PATTERN: &str = r"(?i)\bNVL2\s*\(";

pub fn nvl2_to_case(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    match m.args.as_slice() {
        [value, if_not_null, if_null] => RuleOutcome::flag_with(
            format!("CASE WHEN {value} IS NOT NULL THEN {if_not_null} ELSE {if_null} END"),
            "NVL2 rewritten as CASE; verify the argument boundaries",
        ),
        args => RuleOutcome::flag(format!("NVL2 expects 3 arguments, found {}", args.len())),
    }
}

pub const TO_DATE_PATTERN: &str = r"(?i)\bTO_DATE\s*\(";

/// Formats whose meaning matches the Databricks default parser exactly
const ISO_DATE_FORMAT: &str = "YYYY-MM-DD";
const ISO_TIMESTAMP_FORMAT: &str = "YYYY-MM-DD HH24:MI:SS";

pub fn to_date_iso(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    match m.args.as_slice() {
        [_] => RuleOutcome::Unchanged,
        [expr, format] => match string_literal(format) {
            Some(f) if f.eq_ignore_ascii_case(ISO_DATE_FORMAT) => {
                RuleOutcome::Rewritten(format!("TO_DATE({expr})"))
            }
            Some(f) if f.eq_ignore_ascii_case(ISO_TIMESTAMP_FORMAT) => {
                RuleOutcome::Rewritten(format!("TO_TIMESTAMP({expr})"))
            }
            Some(f) => RuleOutcome::flag(format!(
                "format '{f}' is not ISO; translate it to a Databricks pattern by hand"
            )),
            None => RuleOutcome::flag("format argument is not a string literal"),
        },
        args => RuleOutcome::flag(format!(
            "TO_DATE with {} arguments has no direct equivalent",
            args.len()
        )),
    }
}

pub const TO_CHAR_PATTERN: &str = r"(?i)\bTO_CHAR\s*\(";

pub fn to_char_format(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    match m.args.as_slice() {
        [_] => RuleOutcome::Unchanged,
        [expr, format] => match string_literal(format) {
            Some(f) => {
                let (translated, unknown) = translate_format(f);
                let call = format!("date_format({expr}, '{translated}')");
                if unknown.is_empty() {
                    RuleOutcome::Rewritten(call)
                } else {
                    RuleOutcome::flag_with(
                        call,
                        format!(
                            "format tokens {} have no mapping and were passed through unchanged",
                            unknown.join(", ")
                        ),
                    )
                }
            }
            None => RuleOutcome::flag("format argument is not a string literal"),
        },
        args => RuleOutcome::flag(format!(
            "TO_CHAR with {} arguments has no direct equivalent",
            args.len()
        )),
    }
}

/// Oracle format elements and their Java/Spark pattern letters, longest first
const FORMAT_TOKENS: &[(&str, &str)] = &[
    ("MONTH", "MMMM"),
    ("HH24", "HH"),
    ("HH12", "hh"),
    ("YYYY", "yyyy"),
    ("MON", "MMM"),
    ("DAY", "EEEE"),
    ("YY", "yy"),
    ("MM", "MM"),
    ("DD", "dd"),
    ("HH", "hh"),
    ("MI", "mm"),
    ("SS", "ss"),
    ("DY", "EEE"),
    ("AM", "a"),
    ("PM", "a"),
];

const FORMAT_SEPARATORS: &[char] = &['-', '/', ':', '.', ',', '_', ' '];

/// Translate an Oracle datetime format. Returns the translated format and
/// the tokens that had no mapping (passed through as they were).
pub fn translate_format(format: &str) -> (String, Vec<String>) {
    let mut translated = String::with_capacity(format.len());
    let mut unknown = Vec::new();
    let mut rest = format;

    while let Some(c) = rest.chars().next() {
        if let Some((oracle, spark)) = FORMAT_TOKENS.iter().find(|(oracle, _)| {
            rest.get(..oracle.len())
                .map_or(false, |head| head.eq_ignore_ascii_case(oracle))
        }) {
            translated.push_str(spark);
            rest = &rest[oracle.len()..];
            continue;
        }
        if FORMAT_SEPARATORS.contains(&c) {
            translated.push(c);
            rest = &rest[c.len_utf8()..];
            continue;
        }

        // Unknown: consume a run of the same class so "FMMonth" reports as one token
        let len = if c == '"' {
            rest[1..].find('"').map(|i| i + 2).unwrap_or(rest.len())
        } else if c.is_alphabetic() {
            rest.find(|ch: char| !ch.is_alphabetic()).unwrap_or(rest.len())
        } else if c.is_ascii_digit() {
            rest.find(|ch: char| !ch.is_ascii_digit()).unwrap_or(rest.len())
        } else {
            c.len_utf8()
        };
        translated.push_str(&rest[..len]);
        unknown.push(rest[..len].to_string());
        rest = &rest[len..];
    }

    (translated, unknown)
}

pub const DECODE_PATTERN: &str = r"(?i)\bDECODE\s*\(";

/// `DECODE(subject, v1, r1, ..., default)` → searched CASE. Always flagged:
/// DECODE matches NULL to NULL and coerces types in ways CASE does not.
pub fn decode_to_case(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    let args = m.args.as_slice();
    let Some(case) = decode_as_case(args) else {
        return RuleOutcome::flag(format!(
            "DECODE needs a subject and at least one search/result pair, found {} arguments",
            args.len()
        ));
    };

    let reason = if args.iter().any(|arg| has_nested_comma(arg)) {
        "DECODE arguments contain nested commas; verify each CASE branch"
    } else {
        "DECODE rewritten as CASE; verify NULL matching and type coercion"
    };
    RuleOutcome::flag_with(case, reason)
}

/// CASE expression for DECODE arguments, or `None` below three arguments.
/// DECODE calls nested in the arguments are rewritten too.
fn decode_as_case(args: &[&str]) -> Option<String> {
    if args.len() < 3 {
        return None;
    }
    let args: Vec<String> = args.iter().map(|arg| nested_decodes_as_case(arg)).collect();

    let subject = &args[0];
    let mut case = String::from("CASE");
    for pair in args[1..].chunks(2) {
        match pair {
            [search, result] if search.eq_ignore_ascii_case("NULL") => {
                case.push_str(&format!(" WHEN {subject} IS NULL THEN {result}"));
            }
            [search, result] => {
                case.push_str(&format!(" WHEN {subject} = {search} THEN {result}"));
            }
            [default] => case.push_str(&format!(" ELSE {default}")),
            _ => {}
        }
    }
    case.push_str(" END");
    Some(case)
}

fn nested_decodes_as_case(arg: &str) -> String {
    let mut out = String::with_capacity(arg.len());
    let mut copied = 0;
    let mut from = 0;
    while let Some((start, open)) = lexer::find_call(arg, "DECODE", from) {
        let Some(close) = lexer::matching_paren(arg, open) else {
            break;
        };
        let inner = lexer::split_arguments(&arg[open + 1..close]);
        if let Some(case) = decode_as_case(&inner) {
            out.push_str(&arg[copied..start]);
            out.push_str(&case);
            copied = close + 1;
        }
        from = close + 1;
    }
    out.push_str(&arg[copied..]);
    out
}

/// Contents of a single-quoted literal, if `arg` is exactly one
fn string_literal(arg: &str) -> Option<&str> {
    let inner = arg.strip_prefix('\'')?.strip_suffix('\'')?;
    // Reject 'a' || 'b' and friends
    if inner.replace("''", "").contains('\'') {
        return None;
    }
    Some(inner)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::first_call_outcome;

    fn outcome(pattern: &str, sql: &str, transform: crate::rules::rule::TransformFn) -> RuleOutcome {
        first_call_outcome(pattern, sql, transform, &ConverterConfig::default())
    }

    #[test]
    fn test_translate_format_known_tokens() {
        assert_eq!(translate_format("YYYY-MM-DD"), ("yyyy-MM-dd".to_string(), vec![]));
        assert_eq!(
            translate_format("dd/mm/yyyy hh24:mi:ss"),
            ("dd/MM/yyyy HH:mm:ss".to_string(), vec![])
        );
        assert_eq!(translate_format("DY, DD MON"), ("EEE, dd MMM".to_string(), vec![]));
    }

    #[test]
    fn test_translate_format_passes_unknown_through() {
        let (translated, unknown) = translate_format("FMMonth Q");
        assert_eq!(translated, "FMMonth Q");
        assert_eq!(unknown, vec!["FMMonth".to_string(), "Q".to_string()]);

        let (_, unknown) = translate_format("999.99");
        assert_eq!(unknown, vec!["999".to_string(), "99".to_string()]);
    }

    #[test]
    fn test_to_char_rewrites_iso_format() {
        assert_eq!(
            outcome(TO_CHAR_PATTERN, "TO_CHAR(hire_date, 'YYYY-MM-DD')", to_char_format),
            RuleOutcome::Rewritten("date_format(hire_date, 'yyyy-MM-dd')".to_string())
        );
    }

    #[test]
    fn test_to_char_flags_unknown_tokens() {
        let result = outcome(TO_CHAR_PATTERN, "TO_CHAR(d, 'YYYY \"Q\"Q')", to_char_format);
        match result {
            RuleOutcome::FlaggedForReview { replacement, reason } => {
                assert_eq!(replacement.as_deref(), Some("date_format(d, 'yyyy \"Q\"Q')"));
                assert!(reason.contains("\"Q\""));
            }
            other => panic!("expected review flag, got {other:?}"),
        }
    }

    #[test]
    fn test_to_char_single_argument_untouched() {
        assert_eq!(outcome(TO_CHAR_PATTERN, "TO_CHAR(amount)", to_char_format), RuleOutcome::Unchanged);
    }

    #[test]
    fn test_to_date_iso_only() {
        assert_eq!(
            outcome(TO_DATE_PATTERN, "TO_DATE('2024-09-18', 'YYYY-MM-DD')", to_date_iso),
            RuleOutcome::Rewritten("TO_DATE('2024-09-18')".to_string())
        );
        assert_eq!(
            outcome(TO_DATE_PATTERN, "to_date(s, 'yyyy-mm-dd hh24:mi:ss')", to_date_iso),
            RuleOutcome::Rewritten("TO_TIMESTAMP(s)".to_string())
        );
        assert!(matches!(
            outcome(TO_DATE_PATTERN, "TO_DATE('18/09/2024', 'DD/MM/YYYY')", to_date_iso),
            RuleOutcome::FlaggedForReview { replacement: None, .. }
        ));
        assert!(matches!(
            outcome(TO_DATE_PATTERN, "TO_DATE(s, fmt_col)", to_date_iso),
            RuleOutcome::FlaggedForReview { replacement: None, .. }
        ));
    }

    #[test]
    fn test_decode_with_default() {
        let result = outcome(
            DECODE_PATTERN,
            "DECODE(status, 'A', 'Active', 'I', 'Inactive', 'Unknown')",
            decode_to_case,
        );
        assert_eq!(
            result,
            RuleOutcome::flag_with(
                "CASE WHEN status = 'A' THEN 'Active' WHEN status = 'I' THEN 'Inactive' ELSE 'Unknown' END",
                "DECODE rewritten as CASE; verify NULL matching and type coercion"
            )
        );
    }

    #[test]
    fn test_decode_null_search_and_nested_commas() {
        let result = outcome(DECODE_PATTERN, "DECODE(a, NULL, 'none', f(x, y), 'fx')", decode_to_case);
        match result {
            RuleOutcome::FlaggedForReview { replacement, reason } => {
                assert_eq!(
                    replacement.as_deref(),
                    Some("CASE WHEN a IS NULL THEN 'none' WHEN a = f(x, y) THEN 'fx' END")
                );
                assert!(reason.contains("nested commas"));
            }
            other => panic!("expected review flag, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_nested_in_arguments_is_rewritten() {
        let result = outcome(
            DECODE_PATTERN,
            "DECODE(a, 1, DECODE(b, 2, 'x', 'y'), 'decode(z)')",
            decode_to_case,
        );
        match result {
            RuleOutcome::FlaggedForReview { replacement, .. } => assert_eq!(
                replacement.as_deref(),
                Some("CASE WHEN a = 1 THEN CASE WHEN b = 2 THEN 'x' ELSE 'y' END ELSE 'decode(z)' END")
            ),
            other => panic!("expected review flag, got {other:?}"),
        }
    }

    #[test]
    fn test_decode_too_few_arguments() {
        assert!(matches!(
            outcome(DECODE_PATTERN, "DECODE(a, b)", decode_to_case),
            RuleOutcome::FlaggedForReview { replacement: None, .. }
        ));
    }

    #[test]
    fn test_nvl2_to_case() {
        assert_eq!(
            outcome(NVL2_PATTERN, "NVL2(bonus, salary + bonus, salary)", nvl2_to_case),
            RuleOutcome::flag_with(
                "CASE WHEN bonus IS NOT NULL THEN salary + bonus ELSE salary END",
                "NVL2 rewritten as CASE; verify the argument boundaries"
            )
        );
    }

    #[test]
    fn test_string_literal_detection() {
        assert_eq!(string_literal("'YYYY'"), Some("YYYY"));
        assert_eq!(string_literal("'it''s'"), Some("it''s"));
        assert_eq!(string_literal("'a' || 'b'"), None);
        assert_eq!(string_literal("fmt"), None);
    }
}
