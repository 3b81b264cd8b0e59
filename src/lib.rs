//! # textquery
//!
//! A small query language for matching plain text.
//!
//! ## Features
//!
//! - Boolean queries with `AND`, `OR`, `NOT` and grouping
//! - Fuzzy terms (`~cat`, `cat~2`) anchored on configurable delimiters
//! - Quoted phrases, regular expression literals and field-qualified terms
//! - A shared, thread-safe cache of compiled term patterns
//!
//! ```
//! use textquery::prelude::*;
//!
//! let query = TextQuery::with_query("title:cat -dog", QueryOptions::default()).unwrap();
//! assert!(query.is_match("title:the cat sat author:bob").unwrap());
//! ```

pub mod cli;
pub mod error;
pub mod query;

pub mod prelude {
    pub use crate::error::{Result, TextQueryError};
    pub use crate::query::{
        Delimiter, OptionsOverride, QueryNode, QueryOptions, QueryParser, TextQuery, VisitKind,
    };
}

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
