//! Word boundary markers and their normalization into one pattern fragment.

use std::fmt;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::error::{Result, TextQueryError};

/// A single boundary marker.
///
/// Literal delimiters are escaped before they enter a pattern, pattern
/// delimiters are inserted verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Delimiter {
    /// Plain text, matched literally.
    Literal(String),
    /// A regular expression source, e.g. `\s+`.
    Pattern {
        /// The pattern source.
        pattern: String,
    },
}

impl Delimiter {
    /// Create a literal delimiter.
    pub fn literal<S: Into<String>>(text: S) -> Self {
        Delimiter::Literal(text.into())
    }

    /// Create a pattern delimiter, validating the pattern eagerly.
    pub fn pattern<S: Into<String>>(pattern: S) -> Result<Self> {
        let pattern = pattern.into();
        Regex::new(&pattern).map_err(|e| {
            TextQueryError::invalid_pattern(format!("delimiter pattern '{pattern}': {e}"))
        })?;
        Ok(Delimiter::Pattern { pattern })
    }

    /// Render this delimiter as a pattern alternative.
    fn to_alternative(&self) -> Result<String> {
        match self {
            Delimiter::Literal(text) => {
                if text.is_empty() {
                    return Err(TextQueryError::invalid_options(
                        "literal delimiter must not be empty",
                    ));
                }
                Ok(regex::escape(text))
            }
            Delimiter::Pattern { pattern } => {
                if pattern.is_empty() {
                    return Err(TextQueryError::invalid_options(
                        "delimiter pattern must not be empty",
                    ));
                }
                Regex::new(pattern).map_err(|e| {
                    TextQueryError::invalid_pattern(format!("delimiter pattern '{pattern}': {e}"))
                })?;
                Ok(pattern.clone())
            }
        }
    }
}

impl Default for Delimiter {
    fn default() -> Self {
        Delimiter::Literal(" ".to_string())
    }
}

impl fmt::Display for Delimiter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Delimiter::Literal(text) => write!(f, "{text:?}"),
            Delimiter::Pattern { pattern } => write!(f, "/{pattern}/"),
        }
    }
}

impl From<&str> for Delimiter {
    fn from(text: &str) -> Self {
        Delimiter::Literal(text.to_string())
    }
}

impl From<String> for Delimiter {
    fn from(text: String) -> Self {
        Delimiter::Literal(text)
    }
}

/// Normalizes a set of delimiters into a delimiter fragment.
#[derive(Debug, Clone, Copy)]
pub struct DelimiterSet;

impl DelimiterSet {
    /// Join all delimiters into one alternation matching exactly one boundary.
    ///
    /// `[" ", ","]` becomes `(?: |,)`.
    pub fn normalize(delimiters: &[Delimiter]) -> Result<String> {
        if delimiters.is_empty() {
            return Err(TextQueryError::invalid_options(
                "at least one delimiter is required",
            ));
        }

        let alternatives = delimiters
            .iter()
            .map(Delimiter::to_alternative)
            .collect::<Result<Vec<_>>>()?;

        Ok(format!("(?:{})", alternatives.join("|")))
    }
}
