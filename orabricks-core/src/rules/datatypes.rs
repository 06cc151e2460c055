// Column type mappings: NUMBER, bounded strings, LOBs and DATE.

use super::rule::RuleMatch;
use crate::config::ConverterConfig;
use crate::types::RuleOutcome;

/// Largest precision a Databricks DECIMAL accepts
const MAX_DECIMAL_PRECISION: u32 = 38;

pub const NUMBER_PRECISION_PATTERN: &str = r"(?i)\bNUMBER\s*\(\s*(\d+)\s*(?:,\s*(-?\d+)\s*)?\)";

/// `NUMBER(p,s)` → `DECIMAL(p,s)`, `NUMBER(p)` → `DECIMAL(p)`
pub fn number_precision(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    let Some(precision) = m.group(1) else {
        return RuleOutcome::Unchanged;
    };
    if precision.parse::<u32>().map_or(true, |p| p > MAX_DECIMAL_PRECISION) {
        return RuleOutcome::flag(format!(
            "precision {precision} exceeds the DECIMAL maximum of {MAX_DECIMAL_PRECISION}"
        ));
    }

    match m.group(2) {
        Some(scale) if scale.starts_with('-') => RuleOutcome::flag(format!(
            "negative scale {scale} has no DECIMAL equivalent; round explicitly"
        )),
        Some(scale) => RuleOutcome::Rewritten(format!("DECIMAL({precision},{scale})")),
        None => RuleOutcome::Rewritten(format!("DECIMAL({precision})")),
    }
}

// The optional group catches an argument list on the same line that the
// precision rule could not map, e.g. NUMBER(*,2).
pub const NUMBER_BARE_PATTERN: &str = r"(?i)\bNUMBER\b([ \t]*\()?";

pub fn number_bare(m: &RuleMatch<'_>, config: &ConverterConfig) -> RuleOutcome {
    if m.group(1).is_some() {
        return RuleOutcome::flag("NUMBER argument list could not be mapped to DECIMAL");
    }
    RuleOutcome::Rewritten(format!(
        "DECIMAL({},{})",
        config.types.bare_number_precision, config.types.bare_number_scale
    ))
}

pub const BOUNDED_STRING_PATTERN: &str =
    r"(?i)\b(?:N?VARCHAR2|VARCHAR|N?CHAR)\s*\(\s*\d+(?:\s+(?:BYTE|CHAR))?\s*\)";

pub fn bounded_string(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::Rewritten("STRING".to_string())
}

pub const LARGE_OBJECT_PATTERN: &str = r"(?i)\b(N?CLOB|BLOB)\b";

pub fn large_object(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    match m.group(1) {
        Some(kind) if kind.eq_ignore_ascii_case("BLOB") => RuleOutcome::Rewritten("BINARY".to_string()),
        Some(_) => RuleOutcome::Rewritten("STRING".to_string()),
        None => RuleOutcome::Unchanged,
    }
}

pub const DATE_PATTERN: &str = r"(?i)\bDATE\b";

pub fn date_to_timestamp(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::Rewritten("TIMESTAMP".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::rules::testing::first_outcome;

    #[test]
    fn test_number_precision_and_scale() {
        let config = ConverterConfig::default();
        assert_eq!(
            first_outcome(NUMBER_PRECISION_PATTERN, "salary NUMBER( 10 , 2 )", number_precision, &config),
            RuleOutcome::Rewritten("DECIMAL(10,2)".to_string())
        );
        assert_eq!(
            first_outcome(NUMBER_PRECISION_PATTERN, "id number(10)", number_precision, &config),
            RuleOutcome::Rewritten("DECIMAL(10)".to_string())
        );
    }

    #[test]
    fn test_number_precision_flags_unrepresentable() {
        let config = ConverterConfig::default();
        assert!(matches!(
            first_outcome(NUMBER_PRECISION_PATTERN, "NUMBER(10,-2)", number_precision, &config),
            RuleOutcome::FlaggedForReview { replacement: None, .. }
        ));
        assert!(matches!(
            first_outcome(NUMBER_PRECISION_PATTERN, "NUMBER(40,2)", number_precision, &config),
            RuleOutcome::FlaggedForReview { replacement: None, .. }
        ));
    }

    #[test]
    fn test_bare_number_uses_configured_default() {
        let mut config = ConverterConfig::default();
        assert_eq!(
            first_outcome(NUMBER_BARE_PATTERN, "qty NUMBER,", number_bare, &config),
            RuleOutcome::Rewritten("DECIMAL(38,0)".to_string())
        );
        config.types.bare_number_precision = 19;
        config.types.bare_number_scale = 4;
        assert_eq!(
            first_outcome(NUMBER_BARE_PATTERN, "qty NUMBER", number_bare, &config),
            RuleOutcome::Rewritten("DECIMAL(19,4)".to_string())
        );
    }

    #[test]
    fn test_bare_number_flags_unmapped_arguments() {
        let config = ConverterConfig::default();
        assert!(matches!(
            first_outcome(NUMBER_BARE_PATTERN, "NUMBER(*,2)", number_bare, &config),
            RuleOutcome::FlaggedForReview { .. }
        ));
    }

    #[test]
    fn test_bounded_string_variants() {
        let regex = regex::Regex::new(BOUNDED_STRING_PATTERN).unwrap();
        for sql in ["VARCHAR2(100)", "varchar2(30 BYTE)", "NVARCHAR2(5)", "CHAR(1)", "NCHAR (2 CHAR)"] {
            assert!(regex.is_match(sql), "{sql} should match");
        }
        assert!(!regex.is_match("TO_CHAR(x)"));
        assert!(!regex.is_match("VARCHAR2"));
    }

    #[test]
    fn test_large_objects() {
        let config = ConverterConfig::default();
        assert_eq!(
            first_outcome(LARGE_OBJECT_PATTERN, "notes nclob", large_object, &config),
            RuleOutcome::Rewritten("STRING".to_string())
        );
        assert_eq!(
            first_outcome(LARGE_OBJECT_PATTERN, "photo BLOB", large_object, &config),
            RuleOutcome::Rewritten("BINARY".to_string())
        );
    }

    #[test]
    fn test_date_pattern_skips_compound_names() {
        let regex = regex::Regex::new(DATE_PATTERN).unwrap();
        assert!(regex.is_match("hire_date DATE"));
        assert_eq!(regex.find_iter("TO_DATE(x) SYSDATE CURRENT_DATE hire_date").count(), 0);
    }
}
