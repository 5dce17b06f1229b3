//! Identifier types for chains and links.
//!
//! Identifiers are opaque strings (UUIDs in production workflows). Internally
//! they use `Arc<str>` so cloning an identifier is a reference count bump.

use core::borrow::Borrow;
use core::fmt;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

macro_rules! string_id {
    ($(#[$meta:meta])* $name:ident) => {
        $(#[$meta])*
        #[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(Arc<str>);

        impl $name {
            /// Creates an identifier from a string value.
            #[must_use]
            pub fn from_string(id: impl Into<Arc<str>>) -> Self {
                Self(id.into())
            }

            /// Returns the identifier as a string slice.
            #[must_use]
            pub fn as_str(&self) -> &str {
                &self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(&self.0)
            }
        }

        impl From<&str> for $name {
            fn from(value: &str) -> Self {
                Self::from_string(value)
            }
        }

        impl From<String> for $name {
            fn from(value: String) -> Self {
                Self::from_string(value)
            }
        }

        impl Borrow<str> for $name {
            fn borrow(&self) -> &str {
                &self.0
            }
        }

        impl AsRef<str> for $name {
            fn as_ref(&self) -> &str {
                &self.0
            }
        }
    };
}

string_id! {
    /// Identifier of a [`Chain`](crate::Chain).
    ChainId
}

string_id! {
    /// Identifier of a [`Link`](crate::Link).
    LinkId
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_is_raw_value() {
        let id = LinkId::from_string("a1b2");
        assert_eq!(id.to_string(), "a1b2");
        assert_eq!(id.as_str(), "a1b2");
    }

    #[test]
    fn borrow_allows_str_lookup() {
        let mut map = hashbrown::HashMap::new();
        map.insert(ChainId::from("chain"), 1);
        assert_eq!(map.get("chain"), Some(&1));
    }

    #[test]
    fn serializes_transparently() {
        let id = ChainId::from("abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), "\"abc\"");
        let back: ChainId = serde_json::from_str("\"abc\"").unwrap();
        assert_eq!(back, id);
    }
}
