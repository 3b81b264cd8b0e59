//! Locating field values inside the input text.
//!
//! A field term such as `title:cat` only looks at the value of the `title`
//! field. How a field's value is found in a plain string is a convention of
//! the integrator, expressed by the [`FieldExtractor`] trait.
//!
//! The default [`TaggedFieldExtractor`] reads inline tags:
//!
//! ```text
//! title:the cat sat author:bob
//! ```
//!
//! A tag is a name (`[\w.-]+`) followed by the attribute delimiter, found at
//! the start of the text or right after a word delimiter. Its value runs up to
//! the delimiter that opens the next tag, or to the end of the text.

use std::fmt::Debug;
use std::ops::Range;
use std::sync::Arc;

use ahash::AHashMap;
use log::debug;
use parking_lot::RwLock;
use regex::Regex;

use crate::error::{Result, TextQueryError};
use crate::query::ast::EvalContext;

/// Maps a field name to the byte ranges of its values in the input.
pub trait FieldExtractor: Send + Sync + Debug {
    /// Return the ranges of `text` holding values of `field`.
    fn extract(&self, text: &str, field: &str, ctx: &EvalContext<'_>) -> Result<Vec<Range<usize>>>;
}

/// Reads `name<attribute delimiter>value` tags from the input text.
#[derive(Debug, Default)]
pub struct TaggedFieldExtractor {
    /// Tag patterns by (delimiter fragment, attribute delimiter).
    tags: RwLock<AHashMap<(String, String), Arc<Regex>>>,
}

impl TaggedFieldExtractor {
    /// Create a new extractor.
    pub fn new() -> Self {
        Self::default()
    }

    fn tag_regex(&self, delimiter_fragment: &str, attribute_delimiter: &str) -> Result<Arc<Regex>> {
        let key = (delimiter_fragment.to_string(), attribute_delimiter.to_string());
        if let Some(regex) = self.tags.read().get(&key) {
            return Ok(Arc::clone(regex));
        }

        let pattern = format!(
            r"(?:^|{delimiter_fragment})(?P<name>[\w.\-]+){}",
            regex::escape(attribute_delimiter)
        );
        let regex = Arc::new(
            Regex::new(&pattern)
                .map_err(|e| TextQueryError::invalid_pattern(format!("field tag: {e}")))?,
        );
        debug!("compiled field tag pattern {pattern}");

        // A racing thread may have inserted the same pattern; either copy is fine.
        Ok(Arc::clone(self.tags.write().entry(key).or_insert(regex)))
    }
}

impl FieldExtractor for TaggedFieldExtractor {
    fn extract(&self, text: &str, field: &str, ctx: &EvalContext<'_>) -> Result<Vec<Range<usize>>> {
        let Some(attribute_delimiter) = ctx.options().active_attribute_delimiter() else {
            return Ok(Vec::new());
        };
        let regex = self.tag_regex(ctx.delimiter_fragment(), attribute_delimiter)?;
        let ignore_case = ctx.options().ignore_case;

        // (tag start, value start, name matches) for every tag in order.
        let tags: Vec<(usize, usize, bool)> = regex
            .captures_iter(text)
            .filter_map(|captures| {
                let whole = captures.get(0)?;
                let name = captures.name("name")?.as_str();
                let is_field = if ignore_case {
                    name.to_lowercase() == field.to_lowercase()
                } else {
                    name == field
                };
                Some((whole.start(), whole.end(), is_field))
            })
            .collect();

        let mut values = Vec::new();
        for (i, &(_, value_start, is_field)) in tags.iter().enumerate() {
            if !is_field {
                continue;
            }
            let value_end = tags.get(i + 1).map_or(text.len(), |&(next, _, _)| next);
            values.push(value_start..value_end);
        }
        Ok(values)
    }
}
