//! Error types for textquery.
//!
//! All fallible operations return [`Result`], whose error type is the
//! [`TextQueryError`] enum.
//!
//! # Examples
//!
//! ```
//! use textquery::error::{Result, TextQueryError};
//!
//! fn example_operation() -> Result<()> {
//!     Err(TextQueryError::invalid_term("~"))
//! }
//!
//! match example_operation() {
//!     Ok(_) => println!("Success"),
//!     Err(e) => eprintln!("Error: {}", e),
//! }
//! ```

use std::io;

use thiserror::Error;

use crate::query::parser::TerminalFailure;

/// The main error type for textquery operations.
#[derive(Error, Debug)]
pub enum TextQueryError {
    /// The query string does not conform to the grammar.
    #[error("could not parse query string '{query}': {}", describe_failures(.failures))]
    Parse {
        /// The query text that failed.
        query: String,
        /// Expectations recorded at the furthest failure position.
        failures: Vec<TerminalFailure>,
    },

    /// A fuzzy term has an empty or malformed core.
    #[error("invalid term syntax: {0}")]
    InvalidTermSyntax(String),

    /// `eval` or `accept` was called before any successful parse.
    #[error("no query specified")]
    NoQuerySpecified,

    /// A pattern-literal term or delimiter pattern failed to compile.
    #[error("invalid pattern: {0}")]
    InvalidPattern(String),

    /// Options that cannot be normalized.
    #[error("invalid options: {0}")]
    InvalidOptions(String),

    /// I/O errors (CLI input files)
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Generic error for other cases
    #[error("{0}")]
    Other(String),

    /// Generic anyhow error
    #[error("{0:#}")]
    Anyhow(#[from] anyhow::Error),
}

/// Result type alias for operations that may fail with TextQueryError.
pub type Result<T> = std::result::Result<T, TextQueryError>;

fn describe_failures(failures: &[TerminalFailure]) -> String {
    if failures.is_empty() {
        return "no diagnostics".to_string();
    }
    let expected: Vec<String> = failures.iter().map(|f| f.expected.clone()).collect();
    let first = &failures[0];
    format!(
        "expected {} at line {}, column {}",
        expected.join(" or "),
        first.line,
        first.column
    )
}

impl TextQueryError {
    /// Create a new parse error.
    pub fn parse<S: Into<String>>(query: S, failures: Vec<TerminalFailure>) -> Self {
        TextQueryError::Parse {
            query: query.into(),
            failures,
        }
    }

    /// Create a new invalid term syntax error.
    pub fn invalid_term<S: Into<String>>(msg: S) -> Self {
        TextQueryError::InvalidTermSyntax(msg.into())
    }

    /// Create a new invalid pattern error.
    pub fn invalid_pattern<S: Into<String>>(msg: S) -> Self {
        TextQueryError::InvalidPattern(msg.into())
    }

    /// Create a new invalid options error.
    pub fn invalid_options<S: Into<String>>(msg: S) -> Self {
        TextQueryError::InvalidOptions(msg.into())
    }

    /// Create a new generic error.
    pub fn other<S: Into<String>>(msg: S) -> Self {
        TextQueryError::Other(msg.into())
    }

    /// Parser diagnostics, if this is a parse error.
    pub fn terminal_failures(&self) -> &[TerminalFailure] {
        match self {
            TextQueryError::Parse { failures, .. } => failures,
            _ => &[],
        }
    }
}
