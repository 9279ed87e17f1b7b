use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::error::FilterError;

/// Attribute name that, when listed for a tag, keeps a self-closing slash.
pub const SELF_CLOSING: &str = "/";

/// Whitelist of tags and, per tag, the attributes allowed to survive.
///
/// The attribute list is ordered: surviving attributes are written in this
/// order, not in source order. A tag missing from the set is stripped (its
/// markup only, never the text around it). The empty set strips every tag.
///
/// Names are matched exactly. The tokenizer lowercases tag and attribute
/// names, so rules are expected to be written in lowercase.
#[derive(Clone, Debug, Default, Eq, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RuleSet {
    tags: BTreeMap<String, Vec<String>>,
}

impl RuleSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Parses a JSON object of the form `{"a": ["href", "title"], "hr": ["/"]}`.
    pub fn from_json(source: &str) -> Result<Self, FilterError> {
        Ok(serde_json::from_str(source)?)
    }

    pub fn to_json(&self) -> String {
        // A map of strings to string lists always serializes.
        serde_json::to_string_pretty(&self.tags).unwrap_or_default()
    }

    /// Allows `tag` with exactly `attrs`, replacing any previous rule for it.
    pub fn allow<I, S>(&mut self, tag: impl Into<String>, attrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.tags
            .insert(tag.into(), attrs.into_iter().map(Into::into).collect());
        self
    }

    pub fn with<I, S>(mut self, tag: impl Into<String>, attrs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allow(tag, attrs);
        self
    }

    /// Allows `tag` and appends the attributes it does not list yet.
    pub fn extend<I, S>(&mut self, tag: impl Into<String>, attrs: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let list = self.tags.entry(tag.into()).or_default();
        for attr in attrs {
            let attr = attr.into();
            if !list.contains(&attr) {
                list.push(attr);
            }
        }
        self
    }

    pub fn contains(&self, tag: &str) -> bool {
        self.tags.contains_key(tag)
    }

    /// Allowed attributes for `tag`, or `None` when the tag is not allowed.
    pub fn attributes(&self, tag: &str) -> Option<&[String]> {
        self.tags.get(tag).map(Vec::as_slice)
    }

    pub fn keeps_self_closing(&self, tag: &str) -> bool {
        self.attributes(tag)
            .is_some_and(|attrs| attrs.iter().any(|attr| attr == SELF_CLOSING))
    }

    pub fn len(&self) -> usize {
        self.tags.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tags.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.tags
            .iter()
            .map(|(tag, attrs)| (tag.as_str(), attrs.as_slice()))
    }
}

impl<K, I, S> FromIterator<(K, I)> for RuleSet
where
    K: Into<String>,
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    fn from_iter<T: IntoIterator<Item = (K, I)>>(iter: T) -> Self {
        let mut rules = RuleSet::new();
        for (tag, attrs) in iter {
            rules.allow(tag, attrs);
        }
        rules
    }
}
