// Bracket and quote aware scanning helpers.
//
// This is not a SQL tokenizer. It only knows enough about literals, comments
// and parentheses to keep rewrite rules from splitting or matching inside
// them. All delimiters are ASCII, so byte offsets are always char boundaries.

use std::ops::Range;

/// Byte ranges of a buffer that hold string literals, quoted identifiers or comments.
#[derive(Debug, Clone, Default)]
pub struct LiteralMap {
    spans: Vec<Range<usize>>,
}

impl LiteralMap {
    pub fn scan(text: &str) -> Self {
        let bytes = text.as_bytes();
        let mut spans = Vec::new();
        let mut i = 0;
        while i < bytes.len() {
            if let Some(end) = literal_end(bytes, i) {
                spans.push(i..end);
                i = end;
            } else {
                i += 1;
            }
        }
        Self { spans }
    }

    /// True when `pos` falls inside a literal or comment.
    pub fn contains(&self, pos: usize) -> bool {
        let idx = self.spans.partition_point(|span| span.end <= pos);
        self.spans
            .get(idx)
            .map(|span| span.start <= pos)
            .unwrap_or(false)
    }

    /// True when `pos` is inside a literal that opened before `pos`.
    fn continues_at(&self, pos: usize) -> bool {
        let idx = self.spans.partition_point(|span| span.end <= pos);
        self.spans
            .get(idx)
            .map(|span| span.start < pos)
            .unwrap_or(false)
    }

    pub fn spans(&self) -> &[Range<usize>] {
        &self.spans
    }
}

/// If a literal or comment starts at `i`, returns the index just past its end.
/// Unterminated literals run to the end of the buffer.
fn literal_end(bytes: &[u8], i: usize) -> Option<usize> {
    match bytes[i] {
        b'\'' => Some(quoted_end(bytes, i, b'\'')),
        b'"' => Some(quoted_end(bytes, i, b'"')),
        b'-' if bytes.get(i + 1) == Some(&b'-') => Some(
            bytes[i..]
                .iter()
                .position(|&b| b == b'\n')
                .map(|offset| i + offset)
                .unwrap_or(bytes.len()),
        ),
        b'/' if bytes.get(i + 1) == Some(&b'*') => Some(
            bytes[i + 2..]
                .windows(2)
                .position(|w| w == b"*/")
                .map(|offset| i + 2 + offset + 2)
                .unwrap_or(bytes.len()),
        ),
        _ => None,
    }
}

fn quoted_end(bytes: &[u8], start: usize, quote: u8) -> usize {
    let mut i = start + 1;
    while i < bytes.len() {
        if bytes[i] == quote {
            // Doubled quote is an escaped quote
            if bytes.get(i + 1) == Some(&quote) {
                i += 2;
                continue;
            }
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Index of the parenthesis closing the one at `open`, skipping literals and comments.
pub fn matching_paren(text: &str, open: usize) -> Option<usize> {
    let bytes = text.as_bytes();
    if bytes.get(open) != Some(&b'(') {
        return None;
    }

    let mut depth = 0usize;
    let mut i = open;
    while i < bytes.len() {
        if let Some(end) = literal_end(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'(' => depth += 1,
            b')' => {
                depth -= 1;
                if depth == 0 {
                    return Some(i);
                }
            }
            _ => {}
        }
        i += 1;
    }
    None
}

/// Split an argument list on top-level commas. Commas inside nested brackets,
/// literals and comments do not split. Each argument is trimmed.
pub fn split_arguments(inner: &str) -> Vec<&str> {
    if inner.trim().is_empty() {
        return Vec::new();
    }

    let bytes = inner.as_bytes();
    let mut args = Vec::new();
    let mut depth = 0usize;
    let mut start = 0;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = literal_end(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b',' if depth == 0 => {
                args.push(inner[start..i].trim());
                start = i + 1;
            }
            _ => {}
        }
        i += 1;
    }
    args.push(inner[start..].trim());
    args
}

/// True when `arg` holds a comma nested inside brackets, the case naive
/// comma splitting gets wrong.
pub fn has_nested_comma(arg: &str) -> bool {
    let bytes = arg.as_bytes();
    let mut depth = 0usize;
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = literal_end(bytes, i) {
            i = end;
            continue;
        }
        match bytes[i] {
            b'(' | b'[' => depth += 1,
            b')' | b']' => depth = depth.saturating_sub(1),
            b',' if depth > 0 => return true,
            _ => {}
        }
        i += 1;
    }
    false
}

/// Index just past the next statement terminator at or after `from`,
/// or the buffer length when there is none.
pub fn statement_end(text: &str, from: usize) -> usize {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some(end) = literal_end(bytes, i) {
            i = end;
            continue;
        }
        if bytes[i] == b';' {
            return i + 1;
        }
        i += 1;
    }
    bytes.len()
}

/// Statement ranges of the buffer, split on terminators outside literals.
pub fn statements(text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut start = 0;
    while start < text.len() {
        let end = statement_end(text, start);
        ranges.push(start..end);
        start = end;
    }
    ranges
}

const FROM_TERMINATORS: &[&str] = &[
    "WHERE", "GROUP", "ORDER", "HAVING", "CONNECT", "START", "UNION", "INTERSECT", "MINUS",
    "FETCH",
];

/// True when a FROM clause in `statement` (at any nesting level) lists
/// sources separated by a top-level comma, the shape Oracle `(+)` joins use.
pub fn has_comma_join(statement: &str) -> bool {
    let bytes = statement.as_bytes();
    // One flag per nesting level: are we inside that level's FROM list?
    let mut in_from = vec![false];
    let mut i = 0;
    while i < bytes.len() {
        if let Some(end) = literal_end(bytes, i) {
            i = end;
            continue;
        }
        let b = bytes[i];
        if is_word_byte(b) {
            let start = i;
            while i < bytes.len() && is_word_byte(bytes[i]) {
                i += 1;
            }
            let word = &statement[start..i];
            if let Some(top) = in_from.last_mut() {
                if word.eq_ignore_ascii_case("FROM") {
                    *top = true;
                } else if FROM_TERMINATORS
                    .iter()
                    .any(|t| word.eq_ignore_ascii_case(t))
                {
                    *top = false;
                }
            }
            continue;
        }
        match b {
            b'(' => in_from.push(false),
            b')' => {
                if in_from.len() > 1 {
                    in_from.pop();
                }
            }
            b',' if in_from.last().copied().unwrap_or(false) => return true,
            _ => {}
        }
        i += 1;
    }
    false
}

/// First call of `name` at or after `from`, outside literals and comments.
/// Returns the name's start and the index of its opening parenthesis.
pub fn find_call(text: &str, name: &str, from: usize) -> Option<(usize, usize)> {
    let bytes = text.as_bytes();
    let mut i = from;
    while i < bytes.len() {
        if let Some(end) = literal_end(bytes, i) {
            i = end;
            continue;
        }
        if !is_word_byte(bytes[i]) {
            i += 1;
            continue;
        }
        let start = i;
        while i < bytes.len() && is_word_byte(bytes[i]) {
            i += 1;
        }
        let preceded_by_dot = start > 0 && bytes[start - 1] == b'.';
        if !preceded_by_dot && text[start..i].eq_ignore_ascii_case(name) {
            let open = i + text[i..].len() - text[i..].trim_start().len();
            if bytes.get(open) == Some(&b'(') {
                return Some((start, open));
            }
        }
    }
    None
}

fn is_word_byte(b: u8) -> bool {
    b.is_ascii_alphanumeric() || b == b'_' || b == b'$' || b == b'#'
}

/// One `a || b || ...` chain found on a single line.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConcatChain {
    pub span: Range<usize>,
    pub operands: Vec<Range<usize>>,
    /// Set when the operand boundaries cannot be trusted and the chain must
    /// be left as written
    pub review: Option<&'static str>,
}

const KEYWORD_OPERAND: &str =
    "|| next to a SQL keyword; operand boundaries unclear, left unchanged";
const MIXED_ARITHMETIC: &str =
    "|| mixed with arithmetic operators; Oracle evaluates + - || left to right, left unchanged";

/// Words that end an operand instead of being one
const KEYWORDS: &[&str] = &[
    "ALL", "AND", "ANY", "AS", "BEGIN", "BETWEEN", "BY", "CASE", "DECLARE", "DISTINCT", "ELSE",
    "END", "ESCAPE", "EXISTS", "FROM", "GROUP", "HAVING", "IF", "IN", "INTO", "IS", "JOIN",
    "LIKE", "LOOP", "NOT", "ON", "OR", "ORDER", "PRIOR", "RETURN", "RETURNING", "SELECT", "SET",
    "SOME", "THEN", "UNION", "USING", "VALUES", "WHEN", "WHERE", "WITH",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Keyword {
    Case,
    End,
    Plain,
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Lexeme {
    Operand(Range<usize>),
    Keyword(Range<usize>, Keyword),
    Concat,
    Arithmetic,
    Other,
}

/// Find `||` chains line by line. Lines that begin inside a multi-line
/// literal or comment are skipped; chains never cross a line break.
pub fn concat_chains(text: &str, literals: &LiteralMap) -> Vec<ConcatChain> {
    let mut chains = Vec::new();
    let mut line_start = 0;
    for line in text.split('\n') {
        if !literals.continues_at(line_start) && line.contains("||") {
            let lexemes = lex_line(line, line_start);
            chains.extend(chains_in(&lexemes));
        }
        line_start += line.len() + 1;
    }
    chains
}

fn keyword_kind(word: &str) -> Option<Keyword> {
    if word.eq_ignore_ascii_case("CASE") {
        Some(Keyword::Case)
    } else if word.eq_ignore_ascii_case("END") {
        Some(Keyword::End)
    } else if KEYWORDS.iter().any(|k| word.eq_ignore_ascii_case(k)) {
        Some(Keyword::Plain)
    } else {
        None
    }
}

/// Length of a bind (`:name`) or substitution (`&name`, `&&name`) prefix at `i`
fn variable_prefix_len(bytes: &[u8], i: usize) -> usize {
    let len = match bytes[i] {
        b':' => 1,
        b'&' if bytes.get(i + 1) == Some(&b'&') => 2,
        b'&' => 1,
        _ => return 0,
    };
    match bytes.get(i + len) {
        Some(&next) if is_word_byte(next) => len,
        _ => 0,
    }
}

fn lex_line(line: &str, offset: usize) -> Vec<Lexeme> {
    let bytes = line.as_bytes();
    let mut lexemes = Vec::new();
    let mut i = 0;
    while i < bytes.len() {
        let b = bytes[i];
        if b.is_ascii_whitespace() {
            i += 1;
            continue;
        }
        if b == b'|' && bytes.get(i + 1) == Some(&b'|') {
            lexemes.push(Lexeme::Concat);
            i += 2;
            continue;
        }
        if let Some(end) = literal_end(bytes, i) {
            // Comments, and literals still open at the end of the line, break chains
            let is_quote = b == b'\'' || b == b'"';
            let closed = end < bytes.len() || bytes[end - 1] == b;
            if is_quote && closed && end > i + 1 {
                lexemes.push(Lexeme::Operand(offset + i..offset + end));
            } else {
                lexemes.push(Lexeme::Other);
            }
            i = end;
            continue;
        }
        let prefix = variable_prefix_len(bytes, i);
        if prefix > 0 || is_word_byte(b) || b == b'.' {
            let start = i;
            i += prefix;
            while i < bytes.len() && (is_word_byte(bytes[i]) || bytes[i] == b'.') {
                i += 1;
            }
            if prefix == 0 {
                if let Some(kind) = keyword_kind(&line[start..i]) {
                    lexemes.push(Lexeme::Keyword(offset + start..offset + i, kind));
                    continue;
                }
            }
            if bytes.get(i) == Some(&b'(') {
                match matching_paren(line, i) {
                    Some(close) => i = close + 1,
                    None => {
                        lexemes.push(Lexeme::Other);
                        break;
                    }
                }
            }
            lexemes.push(Lexeme::Operand(offset + start..offset + i));
            continue;
        }
        if b == b'(' {
            match matching_paren(line, i) {
                Some(close) => {
                    lexemes.push(Lexeme::Operand(offset + i..offset + close + 1));
                    i = close + 1;
                }
                None => {
                    lexemes.push(Lexeme::Other);
                    i += 1;
                }
            }
            continue;
        }
        if matches!(b, b'+' | b'-' | b'*' | b'/') {
            lexemes.push(Lexeme::Arithmetic);
        } else {
            lexemes.push(Lexeme::Other);
        }
        i += 1;
    }
    lexemes
}

/// For each `CASE` lexeme, the index of the `END` closing it on the same line
fn case_block_ends(lexemes: &[Lexeme]) -> Vec<Option<usize>> {
    let mut ends = vec![None; lexemes.len()];
    let mut open = Vec::new();
    for (index, lexeme) in lexemes.iter().enumerate() {
        match lexeme {
            Lexeme::Keyword(_, Keyword::Case) => open.push(index),
            Lexeme::Keyword(_, Keyword::End) => {
                if let Some(case) = open.pop() {
                    ends[case] = Some(index);
                }
            }
            _ => {}
        }
    }
    ends
}

/// One operand of a chain: lexemes `first..=last` covering `span`
struct ChainItem {
    span: Range<usize>,
    last: usize,
    keyword: bool,
}

fn chain_item(lexemes: &[Lexeme], case_ends: &[Option<usize>], at: usize) -> Option<ChainItem> {
    match lexemes.get(at)? {
        Lexeme::Operand(span) => Some(ChainItem {
            span: span.clone(),
            last: at,
            keyword: false,
        }),
        Lexeme::Keyword(span, kind) => {
            // A whole CASE ... END block is one operand when `||` touches it
            if *kind == Keyword::Case {
                if let Some(end) = case_ends[at] {
                    let touches_concat = (at > 0 && lexemes[at - 1] == Lexeme::Concat)
                        || lexemes.get(end + 1) == Some(&Lexeme::Concat);
                    match &lexemes[end] {
                        Lexeme::Keyword(end_span, _) if touches_concat => {
                            return Some(ChainItem {
                                span: span.start..end_span.end,
                                last: end,
                                keyword: false,
                            });
                        }
                        _ => {}
                    }
                }
            }
            Some(ChainItem {
                span: span.clone(),
                last: at,
                keyword: true,
            })
        }
        _ => None,
    }
}

fn chains_in(lexemes: &[Lexeme]) -> Vec<ConcatChain> {
    let case_ends = case_block_ends(lexemes);
    let mut chains = Vec::new();
    let mut i = 0;
    while i < lexemes.len() {
        let Some(first) = chain_item(lexemes, &case_ends, i) else {
            i += 1;
            continue;
        };
        let mut j = first.last;
        let mut items = vec![first];
        while lexemes.get(j + 1) == Some(&Lexeme::Concat) {
            match chain_item(lexemes, &case_ends, j + 2) {
                Some(item) => {
                    j = item.last;
                    items.push(item);
                }
                None => break,
            }
        }
        if items.len() < 2 {
            i += 1;
            continue;
        }

        let arithmetic_before = i > 0 && lexemes[i - 1] == Lexeme::Arithmetic;
        let arithmetic_after = lexemes.get(j + 1) == Some(&Lexeme::Arithmetic);
        let review = if items.iter().any(|item| item.keyword) {
            Some(KEYWORD_OPERAND)
        } else if arithmetic_before || arithmetic_after {
            Some(MIXED_ARITHMETIC)
        } else {
            None
        };
        chains.push(ConcatChain {
            span: items[0].span.start..items[items.len() - 1].span.end,
            operands: items.into_iter().map(|item| item.span).collect(),
            review,
        });
        i = j + 1;
    }
    chains
}

/// 1-based line/column lookup for byte offsets of one buffer.
pub struct LineIndex {
    line_starts: Vec<usize>,
}

impl LineIndex {
    pub fn new(text: &str) -> Self {
        let mut line_starts = vec![0];
        line_starts.extend(
            text.bytes()
                .enumerate()
                .filter(|(_, b)| *b == b'\n')
                .map(|(i, _)| i + 1),
        );
        Self { line_starts }
    }

    pub fn locate(&self, pos: usize) -> (usize, usize) {
        let line = self.line_starts.partition_point(|&start| start <= pos);
        let column = pos - self.line_starts[line - 1] + 1;
        (line, column)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_literal_map_covers_strings_and_comments() {
        let sql = "SELECT 'a''b', x -- note\n/* block */ y";
        let map = LiteralMap::scan(sql);
        assert!(map.contains(sql.find("'a").unwrap()));
        assert!(map.contains(sql.find("b'").unwrap()));
        assert!(map.contains(sql.find("note").unwrap()));
        assert!(map.contains(sql.find("block").unwrap()));
        assert!(!map.contains(sql.find('x').unwrap()));
        assert!(!map.contains(sql.rfind('y').unwrap()));
    }

    #[test]
    fn test_matching_paren_skips_literals() {
        let sql = "f(a, ')', g(b))";
        assert_eq!(matching_paren(sql, 1), Some(sql.len() - 1));
        assert_eq!(matching_paren("f(a", 1), None);
        assert_eq!(matching_paren("abc", 0), None);
    }

    #[test]
    fn test_split_arguments_respects_nesting() {
        let args = split_arguments("status, f(a, b), 'x,y', [1, 2]");
        assert_eq!(args, vec!["status", "f(a, b)", "'x,y'", "[1, 2]"]);
        assert!(split_arguments("  ").is_empty());
    }

    #[test]
    fn test_has_nested_comma() {
        assert!(has_nested_comma("f(a, b)"));
        assert!(!has_nested_comma("'a, b'"));
        assert!(!has_nested_comma("plain"));
    }

    #[test]
    fn test_find_call_skips_literals_and_longer_names() {
        let sql = "'DECODE(' || MYDECODE(x) || decode (a, 1, 2)";
        let (start, open) = find_call(sql, "DECODE", 0).unwrap();
        assert_eq!(&sql[start..=open], "decode (");
        assert_eq!(find_call(sql, "DECODE", open), None);
    }

    #[test]
    fn test_statements_split_outside_literals() {
        let sql = "SELECT ';' FROM a; SELECT 1";
        let ranges = statements(sql);
        assert_eq!(ranges.len(), 2);
        assert_eq!(&sql[ranges[0].clone()], "SELECT ';' FROM a;");
    }

    #[test]
    fn test_comma_join_detection() {
        assert!(has_comma_join("SELECT * FROM emp e, dept d WHERE e.d = d.d(+)"));
        assert!(!has_comma_join("SELECT a, b FROM emp WHERE x IN (1, 2)"));
        assert!(!has_comma_join("UPDATE t SET total = total + 1"));
        assert!(has_comma_join(
            "SELECT * FROM t WHERE id IN (SELECT a.id FROM a, b WHERE a.k = b.k(+))"
        ));
    }

    #[test]
    fn test_concat_chains_on_single_line() {
        let sql = "SELECT emp_name || ' - ' || f(x, 'y') AS info,\n a || b FROM t";
        let map = LiteralMap::scan(sql);
        let chains = concat_chains(sql, &map);
        assert_eq!(chains.len(), 2);
        assert_eq!(&sql[chains[0].span.clone()], "emp_name || ' - ' || f(x, 'y')");
        assert_eq!(chains[0].operands.len(), 3);
        assert_eq!(&sql[chains[1].span.clone()], "a || b");
    }

    #[test]
    fn test_concat_chains_ignore_operator_inside_literal() {
        let sql = "SELECT 'a || b' FROM t";
        let map = LiteralMap::scan(sql);
        assert!(concat_chains(sql, &map).is_empty());
    }

    #[test]
    fn test_concat_chains_do_not_span_lines() {
        let sql = "SELECT a ||\n b FROM t";
        let map = LiteralMap::scan(sql);
        assert!(concat_chains(sql, &map).is_empty());
    }

    fn chain_texts(sql: &str) -> Vec<(&str, Option<&'static str>)> {
        let map = LiteralMap::scan(sql);
        concat_chains(sql, &map)
            .into_iter()
            .map(|chain| (&sql[chain.span], chain.review))
            .collect()
    }

    #[test]
    fn test_case_block_is_one_operand() {
        let sql = "SELECT CASE WHEN a = 1 THEN 'x' ELSE 'y' END || 'z' FROM t";
        assert_eq!(
            chain_texts(sql),
            vec![("CASE WHEN a = 1 THEN 'x' ELSE 'y' END || 'z'", None)]
        );

        let sql = "SELECT 'p' || CASE WHEN a = 1 THEN 'x' END FROM t";
        assert_eq!(
            chain_texts(sql),
            vec![("'p' || CASE WHEN a = 1 THEN 'x' END", None)]
        );
    }

    #[test]
    fn test_keywords_are_not_operands() {
        // CASE opened on an earlier line: END alone cannot be an operand
        let chains = chain_texts("  ELSE c END || 'z' AS label");
        assert_eq!(chains, vec![("END || 'z'", Some(KEYWORD_OPERAND))]);

        let chains = chain_texts("WHERE a || b = c AND d || e IS NOT NULL");
        assert_eq!(chains, vec![("a || b", None), ("d || e", None)]);
    }

    #[test]
    fn test_bind_variables_stay_whole() {
        assert_eq!(chain_texts("SELECT :name || 'x' FROM dual"), vec![(":name || 'x'", None)]);
        assert_eq!(
            chain_texts(":new.full_name := :new.first || &&suffix;"),
            vec![(":new.first || &&suffix", None)]
        );
    }

    #[test]
    fn test_arithmetic_next_to_chain_is_reviewed() {
        assert_eq!(chain_texts("SELECT a + b || c FROM t"), vec![("b || c", Some(MIXED_ARITHMETIC))]);
        assert_eq!(chain_texts("SELECT a || b * 2 FROM t"), vec![("a || b", Some(MIXED_ARITHMETIC))]);
    }

    #[test]
    fn test_line_index_locates_offsets() {
        let index = LineIndex::new("ab\ncd\n");
        assert_eq!(index.locate(0), (1, 1));
        assert_eq!(index.locate(4), (2, 2));
    }
}
