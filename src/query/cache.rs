//! Compiled pattern cache.
//!
//! Compiling a term into a boundary-aware [`Regex`] is far more expensive than
//! running it, and the same few terms are evaluated against many inputs. The
//! [`PatternCache`] trait memoizes compilations keyed by
//! `(term, pattern_literal, delimiter_fragment)`; each entry holds both a
//! case-sensitive and a case-insensitive matcher so toggling `ignore_case`
//! never recompiles.
//!
//! [`TermPatternCache`] is the default implementation. One instance is shared
//! process-wide through [`TermPatternCache::global`], but callers may hand a
//! private instance (or their own implementation) to a
//! [`TextQuery`](crate::query::TextQuery).

use std::fmt::Debug;
use std::sync::{Arc, LazyLock};
use std::sync::atomic::{AtomicU64, Ordering};

use ahash::AHashMap;
use log::{debug, trace};
use parking_lot::{RwLock, RwLockUpgradableReadGuard};
use regex::{Regex, RegexBuilder};
use serde::{Deserialize, Serialize};

use crate::error::{Result, TextQueryError};
use crate::query::fuzzy::FuzzyTerm;

static GLOBAL_CACHE: LazyLock<Arc<TermPatternCache>> =
    LazyLock::new(|| Arc::new(TermPatternCache::new()));

/// A term compiled against one delimiter fragment.
#[derive(Debug)]
pub struct CompiledTerm {
    pattern: String,
    case_sensitive: Regex,
    case_insensitive: Regex,
}

impl CompiledTerm {
    /// Compile a term's fuzzy syntax into both matchers.
    pub fn compile(term: &str, delimiter_fragment: &str, pattern_literal: bool) -> Result<Self> {
        let fuzzy = FuzzyTerm::parse(term)?;
        let pattern = fuzzy.to_pattern(delimiter_fragment, pattern_literal);

        let build = |ignore_case: bool| {
            RegexBuilder::new(&pattern)
                .case_insensitive(ignore_case)
                .build()
                .map_err(|e| TextQueryError::invalid_pattern(format!("term '{term}': {e}")))
        };

        Ok(CompiledTerm {
            case_sensitive: build(false)?,
            case_insensitive: build(true)?,
            pattern,
        })
    }

    /// The anchored pattern source.
    pub fn pattern(&self) -> &str {
        &self.pattern
    }

    /// The matcher for the given case mode.
    pub fn matcher(&self, ignore_case: bool) -> &Regex {
        if ignore_case {
            &self.case_insensitive
        } else {
            &self.case_sensitive
        }
    }

    /// Check if the term occurs in `text`.
    pub fn is_match(&self, text: &str, ignore_case: bool) -> bool {
        self.matcher(ignore_case).is_match(text)
    }
}

/// Identifies one compiled term.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CacheKey {
    /// The raw term text, fuzzy markers included.
    pub term: String,
    /// Whether the core is inserted unescaped.
    pub pattern_literal: bool,
    /// The normalized delimiter fragment.
    pub delimiter: String,
}

impl CacheKey {
    /// Create a new cache key.
    pub fn new(term: &str, delimiter: &str, pattern_literal: bool) -> Self {
        CacheKey {
            term: term.to_string(),
            pattern_literal,
            delimiter: delimiter.to_string(),
        }
    }
}

/// Counters describing cache usage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheStats {
    /// Number of successful compilations.
    pub compilations: u64,
    /// Number of lookups served without compiling.
    pub hits: u64,
    /// Number of cached entries.
    pub entries: usize,
}

/// Memoizes compiled terms.
///
/// Implementations must compile each distinct key at most once, even when
/// several threads ask for the same key at the same time.
pub trait PatternCache: Send + Sync + Debug {
    /// Return the compiled term for a key, compiling it on first use.
    fn compile_or_fetch(
        &self,
        term: &str,
        delimiter_fragment: &str,
        pattern_literal: bool,
    ) -> Result<Arc<CompiledTerm>>;

    /// Usage counters.
    fn stats(&self) -> CacheStats {
        CacheStats::default()
    }
}

/// The default [`PatternCache`], an unbounded map behind a read-write lock.
///
/// Entries are never evicted; the key space is bounded by the distinct terms
/// and delimiter configurations actually evaluated.
#[derive(Debug, Default)]
pub struct TermPatternCache {
    entries: RwLock<AHashMap<CacheKey, Arc<CompiledTerm>>>,
    compilations: AtomicU64,
    hits: AtomicU64,
}

impl TermPatternCache {
    /// Create a new empty cache.
    pub fn new() -> Self {
        Self::default()
    }

    /// The process-wide cache.
    pub fn global() -> Arc<TermPatternCache> {
        Arc::clone(&GLOBAL_CACHE)
    }

    /// Number of cached entries.
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    /// Check if the cache is empty.
    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }

    fn hit(&self, compiled: &Arc<CompiledTerm>) -> Arc<CompiledTerm> {
        self.hits.fetch_add(1, Ordering::Relaxed);
        trace!("pattern cache hit: {}", compiled.pattern());
        Arc::clone(compiled)
    }
}

impl PatternCache for TermPatternCache {
    fn compile_or_fetch(
        &self,
        term: &str,
        delimiter_fragment: &str,
        pattern_literal: bool,
    ) -> Result<Arc<CompiledTerm>> {
        let key = CacheKey::new(term, delimiter_fragment, pattern_literal);

        if let Some(compiled) = self.entries.read().get(&key) {
            return Ok(self.hit(compiled));
        }

        // Only one upgradable guard exists at a time, so a racing thread that
        // missed above waits here and then finds the entry.
        let entries = self.entries.upgradable_read();
        if let Some(compiled) = entries.get(&key) {
            return Ok(self.hit(compiled));
        }

        let compiled = Arc::new(CompiledTerm::compile(
            term,
            delimiter_fragment,
            pattern_literal,
        )?);
        self.compilations.fetch_add(1, Ordering::Relaxed);
        debug!(
            "compiled term '{}' (pattern literal: {}) as {}",
            term,
            pattern_literal,
            compiled.pattern()
        );

        let mut entries = RwLockUpgradableReadGuard::upgrade(entries);
        entries.insert(key, Arc::clone(&compiled));
        Ok(compiled)
    }

    fn stats(&self) -> CacheStats {
        CacheStats {
            compilations: self.compilations.load(Ordering::Relaxed),
            hits: self.hits.load(Ordering::Relaxed),
            entries: self.len(),
        }
    }
}
