//! Query language for matching plain text.
//!
//! A query string such as `title:"big cat" AND NOT ~dog~` is parsed by
//! [`QueryParser`] into a [`QueryNode`] tree. Each leaf term compiles into a
//! regular expression anchored on the configured delimiters, so `cat` matches
//! `the cat sat` but not `concatenate`. [`TextQuery`] ties the pieces together.

pub mod ast;
pub mod cache;
pub mod delimiter;
pub mod field;
pub mod fuzzy;
pub mod options;
pub mod parser;
pub mod text_query;

pub use ast::{EvalContext, Fragment, QueryNode, QueryVisitor, VisitKind};
pub use cache::{CacheStats, CompiledTerm, PatternCache, TermPatternCache};
pub use delimiter::{Delimiter, DelimiterSet};
pub use field::{FieldExtractor, TaggedFieldExtractor};
pub use fuzzy::{FuzzyTerm, Wildcard};
pub use options::{OptionsOverride, QueryOptions, ResolvedOptions};
pub use parser::{QueryParser, TerminalFailure};
pub use text_query::TextQuery;
