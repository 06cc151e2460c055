use super::rule::RuleMatch;
use crate::config::ConverterConfig;
use crate::types::RuleOutcome;

/// `a || b || c` → `concat(a, b, c)`; operands arrive pre-split by the chain matcher
pub fn concat_operator(m: &RuleMatch<'_>, _config: &ConverterConfig) -> RuleOutcome {
    if m.args.len() < 2 {
        return RuleOutcome::Unchanged;
    }
    RuleOutcome::Rewritten(format!("concat({})", m.args.join(", ")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_concat_joins_operands() {
        let text = "a || 'x' || f(b, c)";
        let m = RuleMatch {
            text,
            span: 0..text.len(),
            captures: None,
            args: vec!["a", "'x'", "f(b, c)"],
        };
        assert_eq!(
            concat_operator(&m, &ConverterConfig::default()),
            RuleOutcome::Rewritten("concat(a, 'x', f(b, c))".to_string())
        );
    }
}
