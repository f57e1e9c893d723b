//! Copybook tokenizer.
//!
//! Turns raw copybook text into a flat sequence of [`TokenLine`]s, one per
//! meaningful source line. Comment and blank lines are dropped, default-value
//! clauses are removed (values are not part of the schema), quoted literals
//! stay whole inside their token, and the statement-terminating period is
//! stripped.
//!
//! Lines are never merged or reordered: a definition that spans several
//! source lines yields several token-lines, and the layout builder treats
//! shapes it does not recognize as no-ops.

/// Characters that mark a comment when they are the first retained character
/// of a line.
const COMMENT_MARKERS: &[char] = &['*', '/'];

/// Keywords that may directly follow a level number when the item is
/// unnamed (an implicit `FILLER`).
const CLAUSE_KEYWORDS: &[&str] = &[
    "PIC",
    "PICTURE",
    "REDEFINES",
    "OCCURS",
    "USAGE",
    "VALUE",
    "VALUES",
    "COMP",
    "COMP-3",
    "BINARY",
    "PACKED-DECIMAL",
];

/// Identifier given to unnamed items.
pub const FILLER: &str = "FILLER";

/// Tokens of one copybook source line.
///
/// Token 0 is the level number; the remaining tokens carry the name, clause
/// keywords and clause operands in source order.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenLine {
    /// 1-based source line number.
    pub line: usize,
    /// Space-delimited tokens.
    pub tokens: Vec<String>,
}

impl TokenLine {
    pub fn new(line: usize, tokens: Vec<String>) -> Self {
        Self { line, tokens }
    }

    /// Parsed level number, or `None` when token 0 is not numeric.
    pub fn level(&self) -> Option<u8> {
        self.tokens.first().and_then(|token| token.parse().ok())
    }

    /// Copybook identifier of the item.
    ///
    /// Items written without a name (`05 PIC X(3).`) are reported as
    /// [`FILLER`].
    pub fn source_name(&self) -> &str {
        match self.tokens.get(1) {
            Some(token) if !is_clause_keyword(token) => token,
            _ => FILLER,
        }
    }

    /// Index of the first token after the level number equal to `keyword`
    /// (case-insensitive).
    pub fn position(&self, keyword: &str) -> Option<usize> {
        self.tokens
            .iter()
            .skip(1)
            .position(|token| token.eq_ignore_ascii_case(keyword))
            .map(|index| index + 1)
    }

    /// Returns `true` if `keyword` appears after the level number.
    pub fn has_keyword(&self, keyword: &str) -> bool {
        self.position(keyword).is_some()
    }

    /// Token that follows `keyword`, if both exist.
    pub fn after(&self, keyword: &str) -> Option<&str> {
        self.position(keyword)
            .and_then(|index| self.tokens.get(index + 1))
            .map(String::as_str)
    }

    /// Tokens re-joined with single spaces, for diagnostics.
    pub fn text(&self) -> String {
        self.tokens.join(" ")
    }
}

fn is_clause_keyword(token: &str) -> bool {
    CLAUSE_KEYWORDS
        .iter()
        .any(|keyword| token.eq_ignore_ascii_case(keyword))
}

/// Tokenizes copybook text.
///
/// With `padding > 0`, that many leading columns are dropped from every line
/// before anything else (the sequence-number area of fixed-format source),
/// and the comment marker is looked up in the first retained column.
/// Otherwise each line is trimmed.
///
/// # Examples
///
/// ```
/// use copybook_schema_layout::tokenizer::tokenize;
///
/// let text = "\
///       * customer record
///        01  CUST-REC.
///            05  CUST-NAME   PIC X(30) VALUE 'NO NAME'.
/// ";
///
/// let lines = tokenize(text, 0);
/// assert_eq!(lines.len(), 2);
/// assert_eq!(lines[0].tokens, vec!["01", "CUST-REC"]);
/// assert_eq!(lines[1].tokens, vec!["05", "CUST-NAME", "PIC", "X(30)"]);
/// assert_eq!(lines[1].line, 3);
/// ```
pub fn tokenize(text: &str, padding: usize) -> Vec<TokenLine> {
    text.lines()
        .enumerate()
        .filter_map(|(index, raw)| tokenize_line(index + 1, raw, padding))
        .collect()
}

fn tokenize_line(number: usize, raw: &str, padding: usize) -> Option<TokenLine> {
    let retained = if padding > 0 {
        skip_columns(raw, padding)
    } else {
        raw.trim()
    };

    if retained.starts_with(COMMENT_MARKERS) || retained.trim().is_empty() {
        return None;
    }

    let mut tokens = split_tokens(retained);
    strip_value_clause(&mut tokens);
    strip_terminator(&mut tokens);

    if tokens.first().is_none_or(|token| token.is_empty()) {
        return None;
    }
    Some(TokenLine::new(number, tokens))
}

fn skip_columns(raw: &str, columns: usize) -> &str {
    raw.char_indices()
        .nth(columns)
        .map_or("", |(offset, _)| &raw[offset..])
}

/// Splits on whitespace, keeping quoted literals (with their quotes) inside
/// the token that contains them.
fn split_tokens(text: &str) -> Vec<String> {
    let mut tokens = Vec::new();
    let mut current = String::new();
    let mut quote: Option<char> = None;

    for ch in text.chars() {
        match quote {
            Some(open) => {
                current.push(ch);
                if ch == open {
                    quote = None;
                }
            }
            None if ch == '\'' || ch == '"' => {
                current.push(ch);
                quote = Some(ch);
            }
            None if ch.is_whitespace() => {
                if !current.is_empty() {
                    tokens.push(std::mem::take(&mut current));
                }
            }
            None => current.push(ch),
        }
    }
    if !current.is_empty() {
        tokens.push(current);
    }

    tokens
}

/// Removes `VALUE [IS] literal` / `VALUES [ARE] literal`.
fn strip_value_clause(tokens: &mut Vec<String>) {
    let Some(start) = tokens
        .iter()
        .skip(1)
        .position(|token| token.eq_ignore_ascii_case("VALUE") || token.eq_ignore_ascii_case("VALUES"))
        .map(|index| index + 1)
    else {
        return;
    };

    let mut end = start + 1;
    if tokens
        .get(end)
        .is_some_and(|token| token.eq_ignore_ascii_case("IS") || token.eq_ignore_ascii_case("ARE"))
    {
        end += 1;
    }
    if end < tokens.len() {
        end += 1;
    }
    tokens.drain(start..end.min(tokens.len()));
}

fn strip_terminator(tokens: &mut Vec<String>) {
    let Some(last) = tokens.last_mut() else {
        return;
    };
    if last.ends_with('.') && !is_quoted(last) {
        last.pop();
        if last.is_empty() {
            tokens.pop();
        }
    }
}

fn is_quoted(token: &str) -> bool {
    token.len() >= 2
        && (token.starts_with('\'') && token.ends_with('\'')
            || token.starts_with('"') && token.ends_with('"'))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tokens_of(text: &str) -> Vec<Vec<String>> {
        tokenize(text, 0).into_iter().map(|line| line.tokens).collect()
    }

    #[test]
    fn test_drops_comments_and_blank_lines() {
        let text = "* header comment\n\n   \n01 REC.\n/ page eject\n   05 A PIC X.";
        assert_eq!(
            tokens_of(text),
            vec![vec!["01", "REC"], vec!["05", "A", "PIC", "X"]]
        );
    }

    #[test]
    fn test_collapses_whitespace_runs() {
        assert_eq!(
            tokens_of("   05    FIELD-A      PIC   9(5)V99   COMP-3.  "),
            vec![vec!["05", "FIELD-A", "PIC", "9(5)V99", "COMP-3"]]
        );
    }

    #[test]
    fn test_removes_value_clause_with_quoted_literal() {
        assert_eq!(
            tokens_of("05 GREETING PIC X(11) VALUE IS 'HELLO, W. X'."),
            vec![vec!["05", "GREETING", "PIC", "X(11)"]]
        );
        assert_eq!(
            tokens_of("05 COUNTER VALUE ZERO PIC 9(3)."),
            vec![vec!["05", "COUNTER", "PIC", "9(3)"]]
        );
    }

    #[test]
    fn test_keeps_quoted_literal_whole() {
        let lines = tokenize("66 ALIAS RENAMES 'A B C' THRU X.", 0);
        assert_eq!(
            lines[0].tokens,
            vec!["66", "ALIAS", "RENAMES", "'A B C'", "THRU", "X"]
        );
    }

    #[test]
    fn test_padding_strips_sequence_area() {
        let text = "000100 01  REC.\n000200*    comment\n000300     05  A  PIC X(2).";
        let lines = tokenize(text, 6);
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[0].tokens, vec!["01", "REC"]);
        assert_eq!(lines[1].tokens, vec!["05", "A", "PIC", "X(2)"]);
        assert_eq!(lines[1].line, 3);
    }

    #[test]
    fn test_padding_longer_than_line_drops_it() {
        assert!(tokenize("0001", 6).is_empty());
    }

    #[test]
    fn test_lone_period_line_is_discarded() {
        assert!(tokenize("   .   ", 0).is_empty());
    }

    #[test]
    fn test_token_line_accessors() {
        let line = TokenLine::new(
            1,
            vec!["05".into(), "B".into(), "REDEFINES".into(), "A".into()],
        );
        assert_eq!(line.level(), Some(5));
        assert_eq!(line.source_name(), "B");
        assert_eq!(line.after("redefines"), Some("A"));
        assert!(!line.has_keyword("PIC"));
        assert_eq!(line.text(), "05 B REDEFINES A");
    }

    #[test]
    fn test_unnamed_item_is_filler() {
        let lines = tokenize("05 PIC X(3).", 0);
        assert_eq!(lines[0].source_name(), FILLER);

        let lines = tokenize("COPY CUSTREC.", 0);
        assert_eq!(lines[0].level(), None);
    }
}
