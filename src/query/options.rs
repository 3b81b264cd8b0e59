//! Evaluation options and their merge rules.

use serde::{Deserialize, Deserializer, Serialize};

use crate::error::Result;
use crate::query::delimiter::{Delimiter, DelimiterSet};

/// Default marker between a field name and its value.
pub const DEFAULT_ATTRIBUTE_DELIMITER: &str = ":";

/// Options controlling how a query is parsed and evaluated.
///
/// Options are immutable values. Partial updates go through
/// [`OptionsOverride`] and [`QueryOptions::merge`], which returns a new value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct QueryOptions {
    /// Word boundary markers.
    #[serde(deserialize_with = "one_or_many")]
    pub delimiter: Vec<Delimiter>,
    /// Match without regard to case.
    pub ignore_case: bool,
    /// Marker between a field name and its value; `None` disables fields.
    pub attribute_delimiter: Option<String>,
    /// Treat every word and phrase as a pattern literal.
    pub regexp: bool,
}

impl Default for QueryOptions {
    fn default() -> Self {
        QueryOptions {
            delimiter: vec![Delimiter::default()],
            ignore_case: true,
            attribute_delimiter: Some(DEFAULT_ATTRIBUTE_DELIMITER.to_string()),
            regexp: false,
        }
    }
}

impl QueryOptions {
    /// Create options with the defaults.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the delimiters.
    pub fn delimiters<I, D>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Delimiter>,
    {
        self.delimiter = delimiters.into_iter().map(Into::into).collect();
        self
    }

    /// Set case insensitivity.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = ignore_case;
        self
    }

    /// Set the attribute delimiter. An empty string disables fields.
    pub fn attribute_delimiter<S: Into<String>>(mut self, delimiter: Option<S>) -> Self {
        self.attribute_delimiter = delimiter.map(Into::into);
        self
    }

    /// Treat all terms as pattern literals.
    pub fn regexp(mut self, regexp: bool) -> Self {
        self.regexp = regexp;
        self
    }

    /// The attribute delimiter, if field qualification is enabled.
    pub fn active_attribute_delimiter(&self) -> Option<&str> {
        self.attribute_delimiter
            .as_deref()
            .filter(|delimiter| !delimiter.is_empty())
    }

    /// Return a new value with every field set in `overrides` replaced.
    pub fn merge(&self, overrides: &OptionsOverride) -> QueryOptions {
        QueryOptions {
            delimiter: overrides
                .delimiter
                .clone()
                .unwrap_or_else(|| self.delimiter.clone()),
            ignore_case: overrides.ignore_case.unwrap_or(self.ignore_case),
            attribute_delimiter: overrides
                .attribute_delimiter
                .clone()
                .unwrap_or_else(|| self.attribute_delimiter.clone()),
            regexp: overrides.regexp.unwrap_or(self.regexp),
        }
    }

    /// Normalize the delimiters, producing options ready for evaluation.
    pub fn resolve(self) -> Result<ResolvedOptions> {
        let delimiter_fragment = DelimiterSet::normalize(&self.delimiter)?;
        Ok(ResolvedOptions {
            options: self,
            delimiter_fragment,
        })
    }
}

fn one_or_many<'de, D>(deserializer: D) -> std::result::Result<Vec<Delimiter>, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum OneOrMany {
        One(Delimiter),
        Many(Vec<Delimiter>),
    }

    Ok(match OneOrMany::deserialize(deserializer)? {
        OneOrMany::One(delimiter) => vec![delimiter],
        OneOrMany::Many(delimiters) => delimiters,
    })
}

/// A partial update to [`QueryOptions`]. Unset fields keep their previous value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OptionsOverride {
    /// New delimiters.
    pub delimiter: Option<Vec<Delimiter>>,
    /// New case insensitivity.
    pub ignore_case: Option<bool>,
    /// New attribute delimiter; `Some(None)` disables fields.
    pub attribute_delimiter: Option<Option<String>>,
    /// New pattern literal mode.
    pub regexp: Option<bool>,
}

impl OptionsOverride {
    /// Create an empty override.
    pub fn new() -> Self {
        Self::default()
    }

    /// Override the delimiters.
    pub fn delimiters<I, D>(mut self, delimiters: I) -> Self
    where
        I: IntoIterator<Item = D>,
        D: Into<Delimiter>,
    {
        self.delimiter = Some(delimiters.into_iter().map(Into::into).collect());
        self
    }

    /// Override case insensitivity.
    pub fn ignore_case(mut self, ignore_case: bool) -> Self {
        self.ignore_case = Some(ignore_case);
        self
    }

    /// Override the attribute delimiter.
    pub fn attribute_delimiter<S: Into<String>>(mut self, delimiter: Option<S>) -> Self {
        self.attribute_delimiter = Some(delimiter.map(Into::into));
        self
    }

    /// Override pattern literal mode.
    pub fn regexp(mut self, regexp: bool) -> Self {
        self.regexp = Some(regexp);
        self
    }

    /// Check if this override changes nothing.
    pub fn is_empty(&self) -> bool {
        self.delimiter.is_none()
            && self.ignore_case.is_none()
            && self.attribute_delimiter.is_none()
            && self.regexp.is_none()
    }
}

/// Options paired with their normalized delimiter fragment.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedOptions {
    options: QueryOptions,
    delimiter_fragment: String,
}

impl ResolvedOptions {
    /// The underlying options.
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// The normalized delimiter fragment.
    pub fn delimiter_fragment(&self) -> &str {
        &self.delimiter_fragment
    }

    /// Merge an override and re-normalize. An empty override is a clone.
    pub fn merge(&self, overrides: &OptionsOverride) -> Result<ResolvedOptions> {
        if overrides.is_empty() {
            return Ok(self.clone());
        }
        self.options.merge(overrides).resolve()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let options = QueryOptions::default();

        assert_eq!(options.delimiter, vec![Delimiter::literal(" ")]);
        assert!(options.ignore_case);
        assert_eq!(options.active_attribute_delimiter(), Some(":"));
        assert!(!options.regexp);
    }

    #[test]
    fn test_merge_keeps_unset_fields() {
        let options = QueryOptions::new().ignore_case(false).delimiters([","]);
        let merged = options.merge(&OptionsOverride::new().regexp(true));

        assert!(!merged.ignore_case);
        assert_eq!(merged.delimiter, vec![Delimiter::literal(",")]);
        assert!(merged.regexp);
        // The original value is untouched.
        assert!(!options.regexp);
    }

    #[test]
    fn test_merge_disables_attributes() {
        let merged =
            QueryOptions::default().merge(&OptionsOverride::new().attribute_delimiter(None::<&str>));
        assert_eq!(merged.active_attribute_delimiter(), None);

        let empty = QueryOptions::default().attribute_delimiter(Some(""));
        assert_eq!(empty.active_attribute_delimiter(), None);
    }

    #[test]
    fn test_resolve_renormalizes() {
        let resolved = QueryOptions::default().resolve().unwrap();
        assert_eq!(resolved.delimiter_fragment(), "(?: )");

        let merged = resolved
            .merge(&OptionsOverride::new().delimiters([" ", "-"]))
            .unwrap();
        assert_eq!(merged.delimiter_fragment(), r"(?: |\-)");
        assert_eq!(resolved.delimiter_fragment(), "(?: )");
    }

    #[test]
    fn test_deserialize_single_delimiter() {
        let options: QueryOptions =
            serde_json::from_str(r#"{"delimiter": ",", "ignore_case": false}"#).unwrap();

        assert_eq!(options.delimiter, vec![Delimiter::literal(",")]);
        assert!(!options.ignore_case);
        assert_eq!(options.active_attribute_delimiter(), Some(":"));
    }

    #[test]
    fn test_deserialize_delimiter_list() {
        let options: QueryOptions =
            serde_json::from_str(r#"{"delimiter": [" ", {"pattern": "\\t"}]}"#).unwrap();

        assert_eq!(options.delimiter.len(), 2);
        assert_eq!(
            options.resolve().unwrap().delimiter_fragment(),
            r"(?: |\t)"
        );
    }
}
