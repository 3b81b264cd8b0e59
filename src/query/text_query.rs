//! The query facade: parse once, evaluate against many inputs.

use std::sync::Arc;

use crate::error::{Result, TextQueryError};
use crate::query::ast::{EvalContext, Fragment, QueryNode, QueryVisitor};
use crate::query::cache::{CompiledTerm, PatternCache, TermPatternCache};
use crate::query::field::{FieldExtractor, TaggedFieldExtractor};
use crate::query::options::{OptionsOverride, QueryOptions, ResolvedOptions};
use crate::query::parser::{QueryParser, TerminalFailure};

/// A parsed query bound to a set of options.
///
/// ```
/// use textquery::query::{QueryOptions, TextQuery};
///
/// let query = TextQuery::with_query("cat AND NOT dog", QueryOptions::default()).unwrap();
/// assert!(query.is_match("the cat sat").unwrap());
/// assert!(!query.is_match("the cat and the dog").unwrap());
/// ```
///
/// Evaluation takes `&self`, so one parsed query can serve many threads.
/// Compiled terms live in a [`PatternCache`], by default the process-wide
/// [`TermPatternCache::global`].
#[derive(Debug)]
pub struct TextQuery {
    root: Option<QueryNode>,
    resolved: ResolvedOptions,
    cache: Arc<dyn PatternCache>,
    extractor: Arc<dyn FieldExtractor>,
    failures: Vec<TerminalFailure>,
}

impl TextQuery {
    /// Create an unparsed query.
    pub fn new(options: QueryOptions) -> Result<Self> {
        Ok(TextQuery {
            root: None,
            resolved: options.resolve()?,
            cache: TermPatternCache::global(),
            extractor: Arc::new(TaggedFieldExtractor::new()),
            failures: Vec::new(),
        })
    }

    /// Create a query and parse `query` unless it is empty.
    pub fn with_query(query: &str, options: QueryOptions) -> Result<Self> {
        let mut text_query = Self::new(options)?;
        if !query.is_empty() {
            text_query.parse(query)?;
        }
        Ok(text_query)
    }

    /// Use a different pattern cache.
    pub fn with_cache(mut self, cache: Arc<dyn PatternCache>) -> Self {
        self.cache = cache;
        self
    }

    /// Use a different field extraction convention.
    pub fn with_field_extractor(mut self, extractor: Arc<dyn FieldExtractor>) -> Self {
        self.extractor = extractor;
        self
    }

    /// Parse a query string, replacing the current query on success.
    ///
    /// On failure the previous query is kept and the parser diagnostics are
    /// available from [`terminal_failures`](Self::terminal_failures).
    pub fn parse(&mut self, query: &str) -> Result<&mut Self> {
        let parser = QueryParser::from_options(self.resolved.options());
        match parser.parse(query) {
            Ok(root) => {
                self.root = Some(root);
                self.failures.clear();
                Ok(self)
            }
            Err(e) => {
                self.failures = e.terminal_failures().to_vec();
                Err(e)
            }
        }
    }

    /// Check if a query has been parsed.
    pub fn is_parsed(&self) -> bool {
        self.root.is_some()
    }

    /// The root of the parsed query.
    pub fn root(&self) -> Option<&QueryNode> {
        self.root.as_ref()
    }

    /// The current options.
    pub fn options(&self) -> &QueryOptions {
        self.resolved.options()
    }

    /// The normalized delimiter fragment of the current options.
    pub fn delimiter_fragment(&self) -> &str {
        self.resolved.delimiter_fragment()
    }

    /// The pattern cache used for evaluation.
    pub fn cache(&self) -> &Arc<dyn PatternCache> {
        &self.cache
    }

    /// Merge `overrides` into the current options for all later calls.
    pub fn set_options(&mut self, overrides: &OptionsOverride) -> Result<()> {
        self.resolved = self.resolved.merge(overrides)?;
        Ok(())
    }

    /// Diagnostics from the most recent failed parse.
    pub fn terminal_failures(&self) -> &[TerminalFailure] {
        &self.failures
    }

    /// Evaluate the query against `text`.
    pub fn eval(&self, text: &str) -> Result<bool> {
        self.eval_resolved(text, &self.resolved)
    }

    /// Alias of [`eval`](Self::eval).
    pub fn is_match(&self, text: &str) -> Result<bool> {
        self.eval(text)
    }

    /// Evaluate with `overrides` merged over the current options.
    ///
    /// The query's own options are left unchanged.
    pub fn eval_with(&self, text: &str, overrides: &OptionsOverride) -> Result<bool> {
        let resolved = self.resolved.merge(overrides)?;
        self.eval_resolved(text, &resolved)
    }

    /// Walk the query's literal terms in document order.
    pub fn accept<V: QueryVisitor + ?Sized>(&self, visitor: &mut V) -> Result<()> {
        self.parsed_root()?.accept(visitor);
        Ok(())
    }

    /// Like [`accept`](Self::accept), validating `overrides` first.
    pub fn accept_with<V: QueryVisitor + ?Sized>(
        &self,
        overrides: &OptionsOverride,
        visitor: &mut V,
    ) -> Result<()> {
        let root = self.parsed_root()?;
        self.resolved.merge(overrides)?;
        root.accept(visitor);
        Ok(())
    }

    /// The raw text of every literal term.
    pub fn terms(&self) -> Result<Vec<String>> {
        Ok(self.parsed_root()?.terms())
    }

    /// Fragments of `text` matched by the query's positive terms.
    pub fn fragments(&self, text: &str) -> Result<Vec<Fragment>> {
        let root = self.parsed_root()?;
        root.fragments(text, &self.context(&self.resolved))
    }

    /// Compile every leaf term through the cache, in document order.
    ///
    /// A leaf that fails to compile is reported alongside the others instead
    /// of aborting the walk.
    pub fn compile_terms(&self) -> Result<Vec<(&QueryNode, Result<Arc<CompiledTerm>>)>> {
        let root = self.parsed_root()?;
        let ctx = self.context(&self.resolved);
        Ok(root
            .leaves()
            .into_iter()
            .map(|leaf| (leaf, leaf.compile(&ctx)))
            .collect())
    }

    fn parsed_root(&self) -> Result<&QueryNode> {
        self.root.as_ref().ok_or(TextQueryError::NoQuerySpecified)
    }

    fn context<'a>(&'a self, resolved: &'a ResolvedOptions) -> EvalContext<'a> {
        EvalContext::new(resolved, self.cache.as_ref(), self.extractor.as_ref())
    }

    fn eval_resolved(&self, text: &str, resolved: &ResolvedOptions) -> Result<bool> {
        let root = self.parsed_root()?;
        root.eval(text, &self.context(resolved))
    }
}
