//! Replacement dictionaries.
//!
//! A [`ReplacementDict`] maps wrapped variable names (`%name%`) to values and
//! substitutes them into task argument templates. Dictionaries are immutable
//! once built; [`merge`](ReplacementDict::merge) returns a new one.

use indexmap::IndexMap;
use serde::Serialize;

use crate::error::ReplacementError;

/// Delimiter wrapped around variable names.
pub const DELIMITER: char = '%';

/// Ordered mapping from `%name%` to value.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct ReplacementDict {
    entries: IndexMap<String, String>,
}

impl ReplacementDict {
    /// Builds a dictionary from raw (unwrapped) names.
    ///
    /// # Errors
    ///
    /// Returns [`ReplacementError`] if a name is empty or contains `%`.
    pub fn new<I, K, V>(raw: I) -> Result<Self, ReplacementError>
    where
        I: IntoIterator<Item = (K, V)>,
        K: AsRef<str>,
        V: Into<String>,
    {
        let mut entries = IndexMap::new();
        for (key, value) in raw {
            let key = key.as_ref();
            if key.is_empty() {
                return Err(ReplacementError::EmptyKey);
            }
            if key.contains(DELIMITER) {
                return Err(ReplacementError::InvalidKey(key.to_owned()));
            }
            entries.insert(wrap(key), value.into());
        }
        Ok(Self { entries })
    }

    /// Builds from names known to be valid at compile time.
    pub(crate) fn from_static(raw: impl IntoIterator<Item = (&'static str, String)>) -> Self {
        Self {
            entries: raw.into_iter().map(|(k, v)| (wrap(k), v)).collect(),
        }
    }

    /// Returns the value for a wrapped name such as `%SIPName%`.
    #[must_use]
    pub fn get(&self, wrapped: &str) -> Option<&str> {
        self.entries.get(wrapped).map(String::as_str)
    }

    /// Iterates over `(wrapped name, value)` pairs in insertion order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.entries.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }

    /// Number of variables.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if the dictionary holds no variables.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Substitutes every wrapped name occurring in `text`.
    ///
    /// Names are applied in insertion order; values are not re-scanned for
    /// names already applied.
    #[must_use]
    pub fn replace(&self, text: &str) -> String {
        let mut out = text.to_owned();
        for (key, value) in &self.entries {
            if out.contains(key.as_str()) {
                out = out.replace(key.as_str(), value);
            }
        }
        out
    }

    /// Returns a dictionary with `other`'s entries layered over this one.
    #[must_use]
    pub fn merge(&self, other: &ReplacementDict) -> ReplacementDict {
        let mut merged = self.clone();
        merged.extend(other);
        merged
    }

    /// Layers `other`'s entries over this dictionary in place.
    pub fn extend(&mut self, other: &ReplacementDict) {
        for (key, value) in &other.entries {
            self.entries.insert(key.clone(), value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a ReplacementDict {
    type Item = (&'a String, &'a String);
    type IntoIter = indexmap::map::Iter<'a, String, String>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.iter()
    }
}

fn wrap(key: &str) -> String {
    format!("{DELIMITER}{key}{DELIMITER}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn wraps_keys() {
        let dict = ReplacementDict::new([("key", "value")]).unwrap();
        assert_eq!(dict.get("%key%"), Some("value"));
        assert_eq!(dict.get("key"), None);
    }

    #[test]
    fn rejects_malformed_keys() {
        assert_eq!(
            ReplacementDict::new([("", "v")]),
            Err(ReplacementError::EmptyKey)
        );
        assert_eq!(
            ReplacementDict::new([("%bad%", "v")]),
            Err(ReplacementError::InvalidKey("%bad%".to_owned()))
        );
    }

    #[test]
    fn replace_substitutes_every_occurrence() {
        let dict = ReplacementDict::new([("dir", "/a"), ("name", "b")]).unwrap();
        assert_eq!(dict.replace("%dir%/%name% %dir%"), "/a/b /a");
        assert_eq!(dict.replace("no variables"), "no variables");
    }

    #[test]
    fn merge_prefers_later_entries() {
        let base = ReplacementDict::new([("a", "1"), ("b", "2")]).unwrap();
        let over = ReplacementDict::new([("b", "3"), ("c", "4")]).unwrap();
        let merged = base.merge(&over);

        assert_eq!(merged.get("%a%"), Some("1"));
        assert_eq!(merged.get("%b%"), Some("3"));
        assert_eq!(merged.get("%c%"), Some("4"));
        assert_eq!(base.get("%b%"), Some("2"));
    }

    #[test]
    fn serializes_as_map() {
        let dict = ReplacementDict::new([("x", "y")]).unwrap();
        assert_eq!(serde_json::to_string(&dict).unwrap(), r#"{"%x%":"y"}"#);
    }

    proptest! {
        #[test]
        fn prop_every_key_is_wrapped(
            raw in prop::collection::btree_map("[A-Za-z0-9_]{1,12}", ".*", 0..8)
        ) {
            let dict = ReplacementDict::new(raw.clone()).unwrap();
            prop_assert_eq!(dict.len(), raw.len());
            for (key, value) in &raw {
                let wrapped = format!("%{key}%");
                prop_assert_eq!(dict.get(&wrapped), Some(value.as_str()));
            }
        }

        #[test]
        fn prop_keys_with_delimiter_are_rejected(
            prefix in "[a-z]{0,4}",
            suffix in "[a-z]{0,4}",
        ) {
            let key = format!("{prefix}%{suffix}");
            prop_assert!(ReplacementDict::new([(key, "v")]).is_err());
        }
    }
}
