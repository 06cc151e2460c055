// The standard conversion pipeline.
//
// Order is part of the output contract: later rules see what earlier rules
// wrote. Type normalization runs before anything that expects normalized
// tokens, function rewrites run before the concatenation rule (so chain
// operands are already-converted calls), and the banner always runs last.
// Changing the order is a behavior change and needs RULESET_VERSION bumped.

use super::datatypes::*;
use super::functions::*;
use super::objects::*;
use super::operators::concat_operator;
use super::rule::{MatchScope, Matcher, Rule, RuleList, RuleMatch};
use crate::config::ConverterConfig;
use crate::error::ConversionError;
use crate::types::RuleOutcome;

pub const NORMALIZE_LINE_ENDINGS: &str = "normalize-line-endings";
pub const NUMBER_PRECISION_SCALE: &str = "number-precision-scale";
pub const NUMBER_BARE: &str = "number-bare";
pub const BOUNDED_STRING: &str = "bounded-string";
pub const LARGE_OBJECTS: &str = "large-objects";
pub const DATE_TO_TIMESTAMP: &str = "date-to-timestamp";
pub const CURRENT_TIMESTAMP: &str = "current-timestamp";
pub const NVL_TO_COALESCE: &str = "nvl-to-coalesce";
pub const NVL2_TO_CASE: &str = "nvl2-to-case";
pub const TO_DATE_ISO: &str = "to-date-iso";
pub const TO_CHAR_FORMAT: &str = "to-char-format";
pub const DECODE_TO_CASE: &str = "decode-to-case";
pub const CONCAT_OPERATOR: &str = "concat-operator";
pub const SEQUENCE_NEXTVAL: &str = "sequence-nextval";
pub const CREATE_TABLE_STORAGE: &str = "create-table-storage";
pub const OUTER_JOIN_MARKER: &str = "outer-join-marker";
pub const HEADER_BANNER_RULE: &str = "header-banner";

/// Type mapping rules, the set that must be stable when re-applied
pub const TYPE_RULES: &[&str] = &[
    NUMBER_PRECISION_SCALE,
    NUMBER_BARE,
    BOUNDED_STRING,
    LARGE_OBJECTS,
    DATE_TO_TIMESTAMP,
];

/// Rules the output contract depends on; configuration cannot disable them
const REQUIRED_RULES: &[&str] = &[HEADER_BANNER_RULE];

fn normalize_line_endings(_m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    RuleOutcome::Rewritten("\n".to_string())
}

impl RuleList {
    /// The standard pipeline, with configured rules switched off and custom
    /// rules placed just before the banner.
    pub fn standard(config: &ConverterConfig) -> Result<Self, ConversionError> {
        let mut rules = vec![
            Rule::new(
                NORMALIZE_LINE_ENDINGS,
                Matcher::pattern(NORMALIZE_LINE_ENDINGS, r"\r\n?")?,
                normalize_line_endings,
            )
            .with_scope(MatchScope::Everywhere),
            Rule::new(
                NUMBER_PRECISION_SCALE,
                Matcher::pattern(NUMBER_PRECISION_SCALE, NUMBER_PRECISION_PATTERN)?,
                number_precision,
            ),
            Rule::new(
                NUMBER_BARE,
                Matcher::pattern(NUMBER_BARE, NUMBER_BARE_PATTERN)?,
                number_bare,
            )
            .with_note(format!(
                "bare NUMBER defaults to DECIMAL({},{}); narrow to BIGINT or DOUBLE where the column allows",
                config.types.bare_number_precision, config.types.bare_number_scale
            )),
            Rule::new(
                BOUNDED_STRING,
                Matcher::pattern(BOUNDED_STRING, BOUNDED_STRING_PATTERN)?,
                bounded_string,
            )
            .with_note("length limits dropped; STRING is unbounded"),
            Rule::new(
                LARGE_OBJECTS,
                Matcher::pattern(LARGE_OBJECTS, LARGE_OBJECT_PATTERN)?,
                large_object,
            ),
            Rule::new(
                DATE_TO_TIMESTAMP,
                Matcher::pattern(DATE_TO_TIMESTAMP, DATE_PATTERN)?,
                date_to_timestamp,
            )
            .with_note("DATE widened to TIMESTAMP; narrow back to DATE manually where no time part is stored"),
            Rule::new(
                CURRENT_TIMESTAMP,
                Matcher::pattern(CURRENT_TIMESTAMP, CURRENT_TIMESTAMP_PATTERN)?,
                current_timestamp,
            ),
            Rule::new(
                NVL_TO_COALESCE,
                Matcher::pattern(NVL_TO_COALESCE, NVL_PATTERN)?,
                nvl_to_coalesce,
            ),
            Rule::new(NVL2_TO_CASE, Matcher::call(NVL2_TO_CASE, NVL2_PATTERN)?, nvl2_to_case),
            Rule::new(TO_DATE_ISO, Matcher::call(TO_DATE_ISO, TO_DATE_PATTERN)?, to_date_iso),
            Rule::new(
                TO_CHAR_FORMAT,
                Matcher::call(TO_CHAR_FORMAT, TO_CHAR_PATTERN)?,
                to_char_format,
            ),
            Rule::new(
                DECODE_TO_CASE,
                Matcher::call(DECODE_TO_CASE, DECODE_PATTERN)?,
                decode_to_case,
            ),
            Rule::new(CONCAT_OPERATOR, Matcher::ConcatChain, concat_operator)
                .with_note("concat() returns NULL if any argument is NULL, unlike ||"),
            Rule::new(
                SEQUENCE_NEXTVAL,
                Matcher::pattern(SEQUENCE_NEXTVAL, SEQUENCE_PATTERN)?,
                sequence_value,
            ),
            Rule::new(
                CREATE_TABLE_STORAGE,
                Matcher::statement(CREATE_TABLE_STORAGE, CREATE_TABLE_PATTERN)?,
                create_table_storage,
            ),
            Rule::new(
                OUTER_JOIN_MARKER,
                Matcher::pattern(OUTER_JOIN_MARKER, OUTER_JOIN_PATTERN)?,
                outer_join_marker,
            )
            .with_scope(MatchScope::CommaJoin),
        ];

        for custom in &config.custom_rules {
            rules.push(Rule::from_config(custom)?);
        }
        rules.push(Rule::new(HEADER_BANNER_RULE, Matcher::Prologue, header_banner));

        for toggle in &config.pipeline.rules {
            if !rules.iter().any(|rule| rule.name == toggle.name) {
                return Err(ConversionError::UnknownRule(toggle.name.clone()));
            }
            if !toggle.enabled && REQUIRED_RULES.contains(&toggle.name.as_str()) {
                return Err(ConversionError::RequiredRule(toggle.name.clone()));
            }
        }
        rules.retain(|rule| config.is_rule_enabled(&rule.name));

        RuleList::from_rules(rules)
    }
}
