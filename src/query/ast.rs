//! Query syntax tree and its evaluation.

use std::fmt;
use std::ops::Range;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::error::{Result, TextQueryError};
use crate::query::cache::{CompiledTerm, PatternCache};
use crate::query::field::FieldExtractor;
use crate::query::fuzzy::TERM_GROUP;
use crate::query::options::{DEFAULT_ATTRIBUTE_DELIMITER, QueryOptions, ResolvedOptions};

/// What a visitor is being shown.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VisitKind {
    /// The raw text of a leaf term.
    Value,
}

/// Receives the literal terms of a query in document order.
pub trait QueryVisitor {
    /// Called once per leaf term.
    fn visit(&mut self, kind: VisitKind, payload: &str);
}

impl<F> QueryVisitor for F
where
    F: FnMut(VisitKind, &str),
{
    fn visit(&mut self, kind: VisitKind, payload: &str) {
        self(kind, payload)
    }
}

/// Everything a node needs to evaluate: options, cache and field convention.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    resolved: &'a ResolvedOptions,
    cache: &'a dyn PatternCache,
    extractor: &'a dyn FieldExtractor,
}

impl<'a> EvalContext<'a> {
    /// Create a new evaluation context.
    pub fn new(
        resolved: &'a ResolvedOptions,
        cache: &'a dyn PatternCache,
        extractor: &'a dyn FieldExtractor,
    ) -> Self {
        EvalContext {
            resolved,
            cache,
            extractor,
        }
    }

    /// The active options.
    pub fn options(&self) -> &'a QueryOptions {
        self.resolved.options()
    }

    /// The normalized delimiter fragment.
    pub fn delimiter_fragment(&self) -> &'a str {
        self.resolved.delimiter_fragment()
    }

    /// The pattern cache.
    pub fn cache(&self) -> &'a dyn PatternCache {
        self.cache
    }
}

/// A matched literal fragment of the input.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Fragment {
    /// Raw text of the term that matched.
    pub term: String,
    /// Byte offset of the match start.
    pub start: usize,
    /// Byte offset of the match end.
    pub end: usize,
    /// The matched text.
    pub text: String,
}

/// A single word, possibly with fuzzy markers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct WordTerm {
    /// Raw term text.
    pub text: String,
    /// Insert the text into the pattern unescaped.
    pub pattern_literal: bool,
}

/// A quoted multi-word literal.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PhraseTerm {
    /// Raw phrase text, without quotes.
    pub text: String,
}

/// A term restricted to the value of a named field.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldTerm {
    /// Field name.
    pub field: String,
    /// Attribute delimiter the query was written with.
    pub attribute_delimiter: String,
    /// The term applied to the field's value.
    pub inner: Box<QueryNode>,
}

/// A node of a parsed query.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum QueryNode {
    /// A word term.
    Word(WordTerm),
    /// A phrase term.
    Phrase(PhraseTerm),
    /// A field-qualified term.
    Field(FieldTerm),
    /// Negation.
    Not { child: Box<QueryNode> },
    /// Conjunction; true when every child is true.
    And { children: Vec<QueryNode> },
    /// Disjunction; true when any child is true.
    Or { children: Vec<QueryNode> },
    /// Parenthesized sub-query.
    Group { child: Box<QueryNode> },
}

impl QueryNode {
    /// Create a literal word term.
    pub fn word<S: Into<String>>(text: S) -> Self {
        QueryNode::Word(WordTerm {
            text: text.into(),
            pattern_literal: false,
        })
    }

    /// Create a word term whose text is already a pattern.
    pub fn pattern<S: Into<String>>(text: S) -> Self {
        QueryNode::Word(WordTerm {
            text: text.into(),
            pattern_literal: true,
        })
    }

    /// Create a phrase term.
    pub fn phrase<S: Into<String>>(text: S) -> Self {
        QueryNode::Phrase(PhraseTerm { text: text.into() })
    }

    /// Create a field term written with the default `:` delimiter.
    pub fn field<S: Into<String>>(field: S, inner: QueryNode) -> Self {
        QueryNode::Field(FieldTerm {
            field: field.into(),
            attribute_delimiter: DEFAULT_ATTRIBUTE_DELIMITER.to_string(),
            inner: Box::new(inner),
        })
    }

    /// Create a negation.
    pub fn not(child: QueryNode) -> Self {
        QueryNode::Not {
            child: Box::new(child),
        }
    }

    /// Create a conjunction.
    pub fn and(children: Vec<QueryNode>) -> Self {
        QueryNode::And { children }
    }

    /// Create a disjunction.
    pub fn or(children: Vec<QueryNode>) -> Self {
        QueryNode::Or { children }
    }

    /// Create a group.
    pub fn group(child: QueryNode) -> Self {
        QueryNode::Group {
            child: Box::new(child),
        }
    }

    /// Evaluate this node against `text`.
    ///
    /// `And` stops at the first false child and `Or` at the first true one,
    /// so later children are neither compiled nor run.
    pub fn eval(&self, text: &str, ctx: &EvalContext<'_>) -> Result<bool> {
        match self {
            QueryNode::Word(_) | QueryNode::Phrase(_) => {
                let compiled = self.compile(ctx)?;
                Ok(compiled.is_match(text, ctx.options().ignore_case))
            }
            QueryNode::Field(field) => {
                for range in ctx.extractor.extract(text, &field.field, ctx)? {
                    if field.inner.eval(&text[range], ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            QueryNode::Not { child } => Ok(!child.eval(text, ctx)?),
            QueryNode::And { children } => {
                for child in children {
                    if !child.eval(text, ctx)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            QueryNode::Or { children } => {
                for child in children {
                    if child.eval(text, ctx)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            QueryNode::Group { child } => child.eval(text, ctx),
        }
    }

    /// Walk the tree depth-first, reporting only leaf terms.
    pub fn accept<V: QueryVisitor + ?Sized>(&self, visitor: &mut V) {
        match self {
            QueryNode::Word(word) => visitor.visit(VisitKind::Value, &word.text),
            QueryNode::Phrase(phrase) => visitor.visit(VisitKind::Value, &phrase.text),
            QueryNode::Field(field) => field.inner.accept(visitor),
            QueryNode::Not { child } | QueryNode::Group { child } => child.accept(visitor),
            QueryNode::And { children } | QueryNode::Or { children } => {
                for child in children {
                    child.accept(visitor);
                }
            }
        }
    }

    /// The raw text of every leaf, in document order.
    pub fn terms(&self) -> Vec<String> {
        let mut terms = Vec::new();
        self.accept(&mut |_: VisitKind, payload: &str| terms.push(payload.to_string()));
        terms
    }

    /// Every leaf term, in document order.
    pub fn leaves(&self) -> Vec<&QueryNode> {
        let mut leaves = Vec::new();
        self.collect_leaves(&mut leaves);
        leaves
    }

    /// Collect the fragments of `text` matched by leaves outside any `Not`.
    pub fn fragments(&self, text: &str, ctx: &EvalContext<'_>) -> Result<Vec<Fragment>> {
        let mut fragments = Vec::new();
        self.collect_fragments(text, 0, ctx, &mut fragments)?;
        Ok(fragments)
    }

    /// Compile a leaf through the context's cache.
    pub fn compile(&self, ctx: &EvalContext<'_>) -> Result<Arc<CompiledTerm>> {
        let (text, pattern_literal) = match self {
            QueryNode::Word(word) => (&word.text, word.pattern_literal),
            QueryNode::Phrase(phrase) => (&phrase.text, false),
            _ => {
                return Err(TextQueryError::other(format!(
                    "only leaf terms compile, got '{self}'"
                )));
            }
        };
        ctx.cache().compile_or_fetch(
            text,
            ctx.delimiter_fragment(),
            pattern_literal || ctx.options().regexp,
        )
    }

    fn collect_leaves<'a>(&'a self, out: &mut Vec<&'a QueryNode>) {
        match self {
            QueryNode::Word(_) | QueryNode::Phrase(_) => out.push(self),
            QueryNode::Field(field) => field.inner.collect_leaves(out),
            QueryNode::Not { child } | QueryNode::Group { child } => child.collect_leaves(out),
            QueryNode::And { children } | QueryNode::Or { children } => {
                for child in children {
                    child.collect_leaves(out);
                }
            }
        }
    }

    fn collect_fragments(
        &self,
        text: &str,
        offset: usize,
        ctx: &EvalContext<'_>,
        out: &mut Vec<Fragment>,
    ) -> Result<()> {
        match self {
            QueryNode::Word(WordTerm { text: term, .. })
            | QueryNode::Phrase(PhraseTerm { text: term }) => {
                let compiled = self.compile(ctx)?;
                let regex = compiled.matcher(ctx.options().ignore_case);
                for range in find_term_ranges(regex, text) {
                    out.push(Fragment {
                        term: term.clone(),
                        start: offset + range.start,
                        end: offset + range.end,
                        text: text[range].to_string(),
                    });
                }
            }
            QueryNode::Field(field) => {
                for range in ctx.extractor.extract(text, &field.field, ctx)? {
                    let start = offset + range.start;
                    field
                        .inner
                        .collect_fragments(&text[range], start, ctx, out)?;
                }
            }
            QueryNode::Not { .. } => {}
            QueryNode::Group { child } => child.collect_fragments(text, offset, ctx, out)?,
            QueryNode::And { children } | QueryNode::Or { children } => {
                for child in children {
                    child.collect_fragments(text, offset, ctx, out)?;
                }
            }
        }
        Ok(())
    }
}

/// Find every span captured by the term group.
///
/// Each search restarts at the end of the previous term, so the delimiter
/// that closed one match can open the next.
fn find_term_ranges(regex: &regex::Regex, text: &str) -> Vec<Range<usize>> {
    let mut ranges = Vec::new();
    let mut position = 0;

    while position <= text.len() {
        let Some(term) = regex
            .captures_at(text, position)
            .and_then(|captures| captures.name(TERM_GROUP))
        else {
            break;
        };

        ranges.push(term.range());
        position = if term.end() > position {
            term.end()
        } else {
            // Empty match at the current position; step over one character.
            match text[position..].chars().next() {
                Some(c) => position + c.len_utf8(),
                None => break,
            }
        };
    }

    ranges
}

impl fmt::Display for QueryNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            QueryNode::Word(word) if word.pattern_literal => {
                write!(f, "/{}/", word.text.replace('/', "\\/"))
            }
            QueryNode::Word(word) => write!(f, "{}", word.text),
            QueryNode::Phrase(phrase) => write!(f, "\"{}\"", phrase.text),
            QueryNode::Field(field) => {
                write!(f, "{}{}{}", field.field, field.attribute_delimiter, field.inner)
            }
            QueryNode::Not { child } => write!(f, "NOT {child}"),
            QueryNode::And { children } => write_joined(f, children, " AND "),
            QueryNode::Or { children } => write_joined(f, children, " OR "),
            QueryNode::Group { child } => write!(f, "({child})"),
        }
    }
}

fn write_joined(f: &mut fmt::Formatter<'_>, children: &[QueryNode], separator: &str) -> fmt::Result {
    for (i, child) in children.iter().enumerate() {
        if i > 0 {
            f.write_str(separator)?;
        }
        write!(f, "{child}")?;
    }
    Ok(())
}
