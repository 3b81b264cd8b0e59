//! Query parser for converting query strings into a [`QueryNode`] tree.

use std::fmt;

use log::debug;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TextQueryError};
use crate::query::ast::{FieldTerm, QueryNode};
use crate::query::options::{DEFAULT_ATTRIBUTE_DELIMITER, QueryOptions};

const AND: &str = "AND";
const OR: &str = "OR";
const NOT: &str = "NOT";

/// Nesting limit for groups and negations.
const MAX_DEPTH: usize = 256;

/// One expectation the parser could not satisfy.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TerminalFailure {
    /// Byte offset into the query.
    pub index: usize,
    /// 1-based line.
    pub line: usize,
    /// 1-based column, in characters.
    pub column: usize,
    /// What was expected at this position.
    pub expected: String,
}

impl TerminalFailure {
    /// Create a new terminal failure.
    pub fn new<S: Into<String>>(index: usize, line: usize, column: usize, expected: S) -> Self {
        TerminalFailure {
            index,
            line,
            column,
            expected: expected.into(),
        }
    }
}

impl fmt::Display for TerminalFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "expected {} at line {}, column {}",
            self.expected, self.line, self.column
        )
    }
}

/// Parses query strings.
///
/// Supported syntax:
/// - Terms: `cat`, fuzzy terms `~cat`, `cat~`, `2~cat~3`
/// - Phrases: `"big cat"`
/// - Pattern literals: `/colou?r/`
/// - Field-specific terms: `title:cat`, `title:"big cat"`, `title:(cat OR dog)`
/// - Boolean operators: `AND`, `OR`, `NOT`, `-term`; juxtaposition means AND
/// - Parentheses: `(cat OR dog) AND NOT bird`
///
/// `OR` binds looser than `AND`, and negation binds tightest.
#[derive(Debug, Clone)]
pub struct QueryParser {
    attribute_delimiter: Option<String>,
}

impl Default for QueryParser {
    fn default() -> Self {
        Self::new()
    }
}

impl QueryParser {
    /// Create a parser with the default `:` attribute delimiter.
    pub fn new() -> Self {
        QueryParser {
            attribute_delimiter: Some(DEFAULT_ATTRIBUTE_DELIMITER.to_string()),
        }
    }

    /// Create a parser configured from evaluation options.
    pub fn from_options(options: &QueryOptions) -> Self {
        QueryParser {
            attribute_delimiter: options.active_attribute_delimiter().map(str::to_string),
        }
    }

    /// Set the attribute delimiter; `None` or an empty string disables fields.
    pub fn with_attribute_delimiter<S: Into<String>>(mut self, delimiter: Option<S>) -> Self {
        self.attribute_delimiter = delimiter.map(Into::into).filter(|d| !d.is_empty());
        self
    }

    /// Get the attribute delimiter.
    pub fn attribute_delimiter(&self) -> Option<&str> {
        self.attribute_delimiter.as_deref()
    }

    /// Parse a query string.
    pub fn parse(&self, query: &str) -> Result<QueryNode> {
        let mut parser = QueryStringParser::new(query, self.attribute_delimiter.as_deref());
        parser.parse()
    }
}

/// Internal parser for parsing query strings.
struct QueryStringParser<'a> {
    input: &'a str,
    pos: usize,
    depth: usize,
    attribute_delimiter: Option<&'a str>,
    failure_pos: usize,
    expected: Vec<&'static str>,
}

impl<'a> QueryStringParser<'a> {
    fn new(input: &'a str, attribute_delimiter: Option<&'a str>) -> Self {
        QueryStringParser {
            input,
            pos: 0,
            depth: 0,
            attribute_delimiter,
            failure_pos: 0,
            expected: Vec::new(),
        }
    }

    fn parse(&mut self) -> Result<QueryNode> {
        self.skip_whitespace();
        let node = self.parse_or_expression();
        if node.is_some() {
            self.skip_whitespace();
        }

        match node {
            Some(node) if self.at_end() => Ok(node),
            Some(_) => {
                self.record("end of input");
                Err(self.error())
            }
            None => Err(self.error()),
        }
    }

    fn parse_or_expression(&mut self) -> Option<QueryNode> {
        let mut children = vec![self.parse_and_expression()?];

        loop {
            let checkpoint = self.pos;
            if self.skip_whitespace() && self.consume_keyword(OR) {
                self.skip_whitespace();
                children.push(self.parse_and_expression()?);
            } else {
                self.pos = checkpoint;
                break;
            }
        }

        Some(collapse(children, QueryNode::or))
    }

    fn parse_and_expression(&mut self) -> Option<QueryNode> {
        let mut children = vec![self.parse_unary()?];

        loop {
            let checkpoint = self.pos;
            let spaced = self.skip_whitespace();

            if spaced && self.consume_keyword(AND) {
                self.skip_whitespace();
                children.push(self.parse_unary()?);
                continue;
            }

            // Juxtaposition is an implicit AND.
            if !spaced || self.at_end() || self.peek() == Some(')') || self.at_keyword(OR) {
                self.pos = checkpoint;
                break;
            }
            children.push(self.parse_unary()?);
        }

        Some(collapse(children, QueryNode::and))
    }

    fn parse_unary(&mut self) -> Option<QueryNode> {
        if self.depth >= MAX_DEPTH {
            return self.fail("shallower nesting");
        }

        self.depth += 1;
        let node = self.parse_negation_or_primary();
        self.depth -= 1;
        node
    }

    fn parse_negation_or_primary(&mut self) -> Option<QueryNode> {
        if self.consume_keyword(NOT) {
            self.skip_whitespace();
            return Some(QueryNode::not(self.parse_unary()?));
        }

        let mut chars = self.rest().chars();
        if chars.next() == Some('-')
            && chars
                .next()
                .is_some_and(|c| !c.is_whitespace() && c != ')')
        {
            self.pos += 1;
            return Some(QueryNode::not(self.parse_unary()?));
        }

        self.parse_primary()
    }

    fn parse_primary(&mut self) -> Option<QueryNode> {
        match self.peek() {
            Some('(') => {
                self.pos += 1;
                self.skip_whitespace();
                let inner = self.parse_or_expression()?;
                self.skip_whitespace();
                if self.peek() != Some(')') {
                    return self.fail("')'");
                }
                self.pos += 1;
                Some(QueryNode::group(inner))
            }
            Some('"') => self.parse_phrase(),
            Some('/') => self.parse_pattern(),
            _ => self.parse_word_or_field(),
        }
    }

    fn parse_phrase(&mut self) -> Option<QueryNode> {
        // Consume opening quote
        self.pos += 1;

        let Some(len) = self.rest().find('"') else {
            self.pos = self.input.len();
            return self.fail("'\"'");
        };
        if len == 0 {
            return self.fail("phrase text");
        }

        let phrase = &self.rest()[..len];
        self.pos += len + 1;
        Some(QueryNode::phrase(phrase))
    }

    fn parse_pattern(&mut self) -> Option<QueryNode> {
        let Some((pattern, len)) = self.scan_pattern() else {
            self.pos = self.input.len();
            return self.fail("'/'");
        };
        if pattern.is_empty() {
            self.pos += 1;
            return self.fail("pattern text");
        }

        self.pos += len;
        Some(QueryNode::pattern(pattern))
    }

    /// Scan `/.../` at the current position, unescaping `\/`.
    ///
    /// Returns the pattern text and the byte length including both slashes.
    fn scan_pattern(&self) -> Option<(String, usize)> {
        let body = self.rest().strip_prefix('/')?;
        let mut pattern = String::new();
        let mut chars = body.char_indices();
        while let Some((i, c)) = chars.next() {
            match c {
                '\\' if body[i + 1..].starts_with('/') => {
                    pattern.push('/');
                    chars.next();
                }
                '/' => return Some((pattern, i + 2)),
                c => pattern.push(c),
            }
        }
        None
    }

    /// Check for a non-empty `/.../` literal that ends the current token.
    fn at_closed_pattern(&self) -> bool {
        self.scan_pattern().is_some_and(|(pattern, len)| {
            !pattern.is_empty()
                && self.rest()[len..]
                    .chars()
                    .next()
                    .is_none_or(|c| !is_word_char(c))
        })
    }

    fn parse_word_or_field(&mut self) -> Option<QueryNode> {
        let start = self.pos;
        let token = self.peek_word();
        if token.is_empty() || [AND, OR, NOT].contains(&token) {
            return self.fail("term");
        }

        if let Some(delimiter) = self.attribute_delimiter
            && let Some(idx) = token.find(delimiter)
            && idx > 0
        {
            self.pos = start + idx + delimiter.len();
            let inner = self.parse_field_value()?;
            return Some(QueryNode::Field(FieldTerm {
                field: token[..idx].to_string(),
                attribute_delimiter: delimiter.to_string(),
                inner: Box::new(inner),
            }));
        }

        self.pos += token.len();
        Some(QueryNode::word(token))
    }

    fn parse_field_value(&mut self) -> Option<QueryNode> {
        match self.peek() {
            Some('(' | '"') => self.parse_primary(),
            // `dir:/usr/bin` and `http://host` carry a plain value.
            Some('/') if self.at_closed_pattern() => self.parse_pattern(),
            _ => {
                let token = self.peek_word();
                if token.is_empty() {
                    return self.fail("field value");
                }
                self.pos += token.len();
                Some(QueryNode::word(token))
            }
        }
    }

    fn rest(&self) -> &'a str {
        &self.input[self.pos..]
    }

    fn peek(&self) -> Option<char> {
        self.rest().chars().next()
    }

    fn peek_word(&self) -> &'a str {
        let rest = self.rest();
        let len = rest.find(|c: char| !is_word_char(c)).unwrap_or(rest.len());
        &rest[..len]
    }

    fn at_end(&self) -> bool {
        self.pos >= self.input.len()
    }

    /// Check for a keyword standing alone as a token.
    fn at_keyword(&self, keyword: &str) -> bool {
        let rest = self.rest();
        rest.starts_with(keyword)
            && rest[keyword.len()..]
                .chars()
                .next()
                .is_none_or(|c| !is_word_char(c))
    }

    fn consume_keyword(&mut self, keyword: &str) -> bool {
        if self.at_keyword(keyword) {
            self.pos += keyword.len();
            true
        } else {
            false
        }
    }

    fn skip_whitespace(&mut self) -> bool {
        let rest = self.rest();
        let skipped = rest.len() - rest.trim_start().len();
        self.pos += skipped;
        skipped > 0
    }

    /// Remember an expectation, keeping only those at the furthest position.
    fn record(&mut self, expected: &'static str) {
        if self.pos > self.failure_pos || self.expected.is_empty() {
            self.failure_pos = self.pos;
            self.expected.clear();
        }
        if self.pos == self.failure_pos && !self.expected.contains(&expected) {
            self.expected.push(expected);
        }
    }

    fn fail<T>(&mut self, expected: &'static str) -> Option<T> {
        self.record(expected);
        None
    }

    fn error(&self) -> TextQueryError {
        let (line, column) = line_and_column(self.input, self.failure_pos);
        let failures: Vec<TerminalFailure> = self
            .expected
            .iter()
            .map(|expected| TerminalFailure::new(self.failure_pos, line, column, *expected))
            .collect();

        debug!(
            "failed to parse query '{}' at byte {}: expected {:?}",
            self.input, self.failure_pos, self.expected
        );
        TextQueryError::parse(self.input, failures)
    }
}

fn is_word_char(c: char) -> bool {
    !c.is_whitespace() && !matches!(c, '(' | ')' | '"')
}

fn collapse(mut children: Vec<QueryNode>, combine: fn(Vec<QueryNode>) -> QueryNode) -> QueryNode {
    if children.len() == 1 {
        children.remove(0)
    } else {
        combine(children)
    }
}

fn line_and_column(input: &str, index: usize) -> (usize, usize) {
    let before = &input[..index];
    let line = before.matches('\n').count() + 1;
    let column = before.rsplit('\n').next().map_or(0, |l| l.chars().count()) + 1;
    (line, column)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse(query: &str) -> QueryNode {
        QueryParser::new().parse(query).unwrap()
    }

    fn failures(query: &str) -> Vec<TerminalFailure> {
        match QueryParser::new().parse(query) {
            Err(TextQueryError::Parse { failures, .. }) => failures,
            other => panic!("expected a parse error for '{query}', got {other:?}"),
        }
    }

    #[test]
    fn test_parse_simple_term() {
        assert_eq!(parse("cat"), QueryNode::word("cat"));
        assert_eq!(parse("  ~cat~2  "), QueryNode::word("~cat~2"));
    }

    #[test]
    fn test_parse_phrase() {
        assert_eq!(parse("\"big cat\""), QueryNode::phrase("big cat"));
    }

    #[test]
    fn test_parse_pattern() {
        assert_eq!(parse("/colou?r/"), QueryNode::pattern("colou?r"));
        assert_eq!(parse(r"/a\/b/"), QueryNode::pattern("a/b"));
        assert_eq!(parse(r"/\d+ x/"), QueryNode::pattern(r"\d+ x"));
    }

    #[test]
    fn test_implicit_and() {
        assert_eq!(
            parse("a b c"),
            QueryNode::and(vec![
                QueryNode::word("a"),
                QueryNode::word("b"),
                QueryNode::word("c"),
            ])
        );
        assert_eq!(parse("a AND b c"), parse("a b c"));
    }

    #[test]
    fn test_precedence() {
        assert_eq!(
            parse("a b OR c"),
            QueryNode::or(vec![
                QueryNode::and(vec![QueryNode::word("a"), QueryNode::word("b")]),
                QueryNode::word("c"),
            ])
        );
        assert_eq!(
            parse("NOT a OR b"),
            QueryNode::or(vec![QueryNode::not(QueryNode::word("a")), QueryNode::word("b")])
        );
    }

    #[test]
    fn test_negation_forms() {
        assert_eq!(parse("-a"), QueryNode::not(QueryNode::word("a")));
        assert_eq!(parse("NOT a"), QueryNode::not(QueryNode::word("a")));
        assert_eq!(
            parse("a -b"),
            QueryNode::and(vec![QueryNode::word("a"), QueryNode::not(QueryNode::word("b"))])
        );
        // A hyphen inside a word is not an operator.
        assert_eq!(parse("e-mail"), QueryNode::word("e-mail"));
    }

    #[test]
    fn test_keywords_need_boundaries() {
        assert_eq!(
            parse("ORANGE ANDROID"),
            QueryNode::and(vec![QueryNode::word("ORANGE"), QueryNode::word("ANDROID")])
        );
        assert_eq!(parse("or"), QueryNode::word("or"));
    }

    #[test]
    fn test_groups() {
        assert_eq!(
            parse("(a OR b) c"),
            QueryNode::and(vec![
                QueryNode::group(QueryNode::or(vec![QueryNode::word("a"), QueryNode::word("b")])),
                QueryNode::word("c"),
            ])
        );
        assert_eq!(
            parse("-( a )"),
            QueryNode::not(QueryNode::group(QueryNode::word("a")))
        );
    }

    #[test]
    fn test_field_terms() {
        assert_eq!(parse("title:cat"), QueryNode::field("title", QueryNode::word("cat")));
        assert_eq!(
            parse("title:\"big cat\""),
            QueryNode::field("title", QueryNode::phrase("big cat"))
        );
        assert_eq!(
            parse("title:(cat OR dog)"),
            QueryNode::field(
                "title",
                QueryNode::group(QueryNode::or(vec![QueryNode::word("cat"), QueryNode::word("dog")]))
            )
        );
        assert_eq!(parse("url:a:b"), QueryNode::field("url", QueryNode::word("a:b")));
        assert_eq!(
            parse("title:/b.rd/"),
            QueryNode::field("title", QueryNode::pattern("b.rd"))
        );
        assert_eq!(parse(":cat"), QueryNode::word(":cat"));
    }

    #[test]
    fn test_field_values_with_slashes() {
        assert_eq!(
            parse("http://example.com"),
            QueryNode::field("http", QueryNode::word("//example.com"))
        );
        assert_eq!(
            parse("dir:/usr/bin"),
            QueryNode::field("dir", QueryNode::word("/usr/bin"))
        );
        assert_eq!(
            parse("dir:/usr/bin AND (path:/a/ OR x)"),
            QueryNode::and(vec![
                QueryNode::field("dir", QueryNode::word("/usr/bin")),
                QueryNode::group(QueryNode::or(vec![
                    QueryNode::field("path", QueryNode::pattern("a")),
                    QueryNode::word("x"),
                ])),
            ])
        );
        assert_eq!(parse("http://example.com").to_string(), "http://example.com");
    }

    #[test]
    fn test_custom_attribute_delimiter() {
        let parser = QueryParser::new().with_attribute_delimiter(Some("="));
        let node = parser.parse("title=cat").unwrap();

        assert_eq!(node.to_string(), "title=cat");
        match node {
            QueryNode::Field(field) => assert_eq!(field.attribute_delimiter, "="),
            other => panic!("expected a field term, got {other:?}"),
        }
    }

    #[test]
    fn test_disabled_attribute_delimiter() {
        let parser = QueryParser::new().with_attribute_delimiter(None::<&str>);
        assert_eq!(parser.parse("title:cat").unwrap(), QueryNode::word("title:cat"));

        let parser = QueryParser::from_options(&QueryOptions::new().attribute_delimiter(Some("")));
        assert_eq!(parser.attribute_delimiter(), None);
    }

    #[test]
    fn test_display_round_trip() {
        for query in [
            "a AND b OR c",
            "title:\"big cat\" AND NOT (dog OR /b.rd/)",
            "2~cat~ AND x:(y OR z)",
        ] {
            assert_eq!(parse(query).to_string(), query);
            assert_eq!(parse(&parse(query).to_string()), parse(query));
        }
    }

    #[test]
    fn test_unbalanced_group() {
        let failures = failures("(cat AND dog");
        assert_eq!(failures, vec![TerminalFailure::new(12, 1, 13, "')'")]);
    }

    #[test]
    fn test_keywords_need_leading_whitespace() {
        assert_eq!(failures("(a)AND b")[0], TerminalFailure::new(3, 1, 4, "end of input"));
        assert_eq!(failures("(a)OR b")[0], TerminalFailure::new(3, 1, 4, "end of input"));

        let expected = QueryNode::and(vec![
            QueryNode::group(QueryNode::word("a")),
            QueryNode::word("b"),
        ]);
        assert_eq!(parse("(a) AND b"), expected);
        assert_eq!(parse("(a) b"), expected);
    }

    #[test]
    fn test_stray_closing_paren() {
        let failures = failures("cat )");
        assert_eq!(failures, vec![TerminalFailure::new(4, 1, 5, "end of input")]);
    }

    #[test]
    fn test_missing_operand() {
        assert_eq!(failures("cat OR")[0].expected, "term");
        assert_eq!(failures("cat AND")[0].expected, "term");
        assert_eq!(failures("")[0], TerminalFailure::new(0, 1, 1, "term"));
        assert_eq!(failures("title: cat")[0].expected, "field value");
    }

    #[test]
    fn test_unterminated_literals() {
        assert_eq!(failures("\"big cat")[0].expected, "'\"'");
        assert_eq!(failures("/abc")[0].expected, "'/'");
        assert_eq!(failures("\"\"")[0].expected, "phrase text");
    }

    #[test]
    fn test_failure_position_on_later_line() {
        let failures = failures("cat\nAND (dog");
        assert_eq!(failures[0].line, 2);
        assert_eq!(failures[0].column, 9);
    }

    #[test]
    fn test_nesting_limit() {
        let deep = format!("{}cat{}", "(".repeat(MAX_DEPTH + 1), ")".repeat(MAX_DEPTH + 1));
        assert_eq!(failures(&deep)[0].expected, "shallower nesting");

        let shallow = format!("{}cat{}", "(".repeat(10), ")".repeat(10));
        assert!(QueryParser::new().parse(&shallow).is_ok());
    }
}
