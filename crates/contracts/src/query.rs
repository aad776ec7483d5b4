//! Query and SearchResult value types
//!
//! `Query` uses Arc<str> internally so handing it to every replica is O(1).

use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::ops::Deref;
use std::sync::Arc;

/// Immutable query text shared by every producer of an aggregation.
///
/// # Examples
/// ```
/// use contracts::Query;
///
/// let query: Query = "golang".into();
/// let copy = query.clone(); // reference count bump, no allocation
/// assert_eq!(query, copy);
/// assert_eq!(query.as_str(), "golang");
/// ```
#[derive(Clone, Default, PartialEq, Eq, Hash)]
pub struct Query(Arc<str>);

impl Query {
    /// Create a new query from a string slice.
    #[inline]
    pub fn new(text: &str) -> Self {
        Self(Arc::from(text))
    }

    /// Get the query text.
    #[inline]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Deref for Query {
    type Target = str;

    #[inline]
    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl AsRef<str> for Query {
    #[inline]
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl From<&str> for Query {
    #[inline]
    fn from(s: &str) -> Self {
        Self(Arc::from(s))
    }
}

impl From<String> for Query {
    #[inline]
    fn from(s: String) -> Self {
        Self(Arc::from(s))
    }
}

impl fmt::Display for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl fmt::Debug for Query {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Query({:?})", self.0)
    }
}

impl PartialEq<str> for Query {
    #[inline]
    fn eq(&self, other: &str) -> bool {
        self.0.as_ref() == other
    }
}

impl PartialEq<&str> for Query {
    #[inline]
    fn eq(&self, other: &&str) -> bool {
        self.0.as_ref() == *other
    }
}

impl Serialize for Query {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_str(&self.0)
    }
}

impl<'de> Deserialize<'de> for Query {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: Deserializer<'de>,
    {
        let s = String::deserialize(deserializer)?;
        Ok(Self::from(s))
    }
}

/// A completed answer from one producer.
///
/// Carries no identity beyond its content and is never mutated once produced.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SearchResult(String);

impl SearchResult {
    pub fn new(content: impl Into<String>) -> Self {
        Self(content.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_inner(self) -> String {
        self.0
    }
}

impl From<&str> for SearchResult {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for SearchResult {
    fn from(s: String) -> Self {
        Self(s)
    }
}

impl fmt::Display for SearchResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl PartialEq<&str> for SearchResult {
    fn eq(&self, other: &&str) -> bool {
        self.0 == *other
    }
}
