//! Fuzzy term syntax and its translation into an anchored pattern.
//!
//! A term may carry a `~` marker on either side of its core text:
//!
//! - `~cat` allows any run of characters before `cat`,
//! - `cat~` allows any run after it,
//! - `2~cat` and `cat~3` require exactly that many characters.
//!
//! The compiled pattern is anchored to a delimiter or the edge of the text on
//! both sides, so `cat` never matches inside `concatenate`. The edges are
//! those of the whole text, not of each line: a newline is an ordinary
//! character unless it is one of the configured delimiters.
//!
//! Wildcards match any character, delimiters included, so `2~cat` matches
//! `a cat`.

use std::fmt;

use crate::error::{Result, TextQueryError};

/// Name of the capture group spanning the term inside a compiled pattern.
pub const TERM_GROUP: &str = "term";

const FUZZY_MARKER: char = '~';

/// A wildcard allowance on one side of the core text.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Wildcard {
    /// Any number of characters.
    Unbounded,
    /// Exactly this many characters.
    Exactly(usize),
}

impl Wildcard {
    fn from_count(count: Option<usize>) -> Self {
        match count {
            Some(n) => Wildcard::Exactly(n),
            None => Wildcard::Unbounded,
        }
    }

    fn to_pattern(self) -> String {
        match self {
            Wildcard::Unbounded => ".*".to_string(),
            Wildcard::Exactly(n) => format!(".{{{n}}}"),
        }
    }
}

/// The parsed form of a term's fuzzy syntax.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FuzzyTerm<'a> {
    /// Allowance before the core, if the term starts with a marker.
    pub leading: Option<Wildcard>,
    /// The text between the markers.
    pub core: &'a str,
    /// Allowance after the core, if the term ends with a marker.
    pub trailing: Option<Wildcard>,
}

impl<'a> FuzzyTerm<'a> {
    /// Parse `[count][~]core[~][count]`.
    pub fn parse(raw: &'a str) -> Result<Self> {
        // Take the leading marker only when a core survives; `2~` is the core
        // `2` with a trailing marker.
        if let Some((count, rest)) = split_leading(raw)
            && let Ok((core, trailing)) = split_trailing(rest, raw)
        {
            return Ok(FuzzyTerm {
                leading: Some(Wildcard::from_count(count)),
                core,
                trailing,
            });
        }

        let (core, trailing) = split_trailing(raw, raw)?;
        Ok(FuzzyTerm {
            leading: None,
            core,
            trailing,
        })
    }

    /// Check if either side allows a wildcard run.
    pub fn is_fuzzy(&self) -> bool {
        self.leading.is_some() || self.trailing.is_some()
    }

    /// Build the unanchored body: wildcards around the (escaped) core.
    pub fn body(&self, pattern_literal: bool) -> String {
        let mut body = String::new();
        if let Some(leading) = self.leading {
            body.push_str(&leading.to_pattern());
        }
        if pattern_literal {
            body.push_str(self.core);
        } else {
            body.push_str(&regex::escape(self.core));
        }
        if let Some(trailing) = self.trailing {
            body.push_str(&trailing.to_pattern());
        }
        body
    }

    /// Build the full anchored pattern for a delimiter fragment.
    pub fn to_pattern(&self, delimiter_fragment: &str, pattern_literal: bool) -> String {
        anchored(&self.body(pattern_literal), delimiter_fragment)
    }
}

impl fmt::Display for FuzzyTerm<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write_marker(f, self.leading, true)?;
        write!(f, "{}", self.core)?;
        write_marker(f, self.trailing, false)
    }
}

fn write_marker(f: &mut fmt::Formatter<'_>, wildcard: Option<Wildcard>, leading: bool) -> fmt::Result {
    match (wildcard, leading) {
        (None, _) => Ok(()),
        (Some(Wildcard::Unbounded), _) => write!(f, "{FUZZY_MARKER}"),
        (Some(Wildcard::Exactly(n)), true) => write!(f, "{n}{FUZZY_MARKER}"),
        (Some(Wildcard::Exactly(n)), false) => write!(f, "{FUZZY_MARKER}{n}"),
    }
}

/// Wrap a pattern body with boundary anchors on both sides.
pub fn anchored(body: &str, delimiter_fragment: &str) -> String {
    format!("(?:^|{delimiter_fragment})(?P<{TERM_GROUP}>{body})(?:{delimiter_fragment}|$)")
}

/// Split off `digits~` at the start, returning the count and the remainder.
fn split_leading(raw: &str) -> Option<(Option<usize>, &str)> {
    let digits = raw.len() - raw.trim_start_matches(|c: char| c.is_ascii_digit()).len();
    let rest = raw[digits..].strip_prefix(FUZZY_MARKER)?;
    Some((parse_count(&raw[..digits]), rest))
}

/// Split off `~digits` at the end, returning the core and the trailing wildcard.
fn split_trailing<'a>(text: &'a str, raw: &str) -> Result<(&'a str, Option<Wildcard>)> {
    let without_digits = text.trim_end_matches(|c: char| c.is_ascii_digit());
    let (core, trailing) = match without_digits.strip_suffix(FUZZY_MARKER) {
        Some(core) => {
            let count = parse_count(&text[without_digits.len()..]);
            (core, Some(Wildcard::from_count(count)))
        }
        None => (text, None),
    };

    if core.is_empty() {
        return Err(TextQueryError::invalid_term(format!(
            "'{raw}' has no text besides its fuzzy markers"
        )));
    }
    if core.contains(FUZZY_MARKER) {
        return Err(TextQueryError::invalid_term(format!(
            "'{raw}' has a '{FUZZY_MARKER}' inside its core text"
        )));
    }
    Ok((core, trailing))
}

fn parse_count(digits: &str) -> Option<usize> {
    if digits.is_empty() {
        return None;
    }
    // Overflowing counts saturate and are rejected when the pattern compiles.
    Some(digits.parse().unwrap_or(usize::MAX))
}
