//! Domain types for entity lookups with strong typing.
//!
//! Newtype wrappers and request primitives shared by the backend client and
//! the search controller.

pub mod events;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifier of a backend entity (customer, material, ...).
///
/// Backends hand out both numeric and string ids, so the id is kept in its
/// textual form. Numeric ids compare equal to their decimal rendering.
///
/// # Examples
///
/// ```rust
/// use bizlookup::domain::EntityId;
///
/// let id = EntityId::from(42);
/// assert_eq!(id.as_str(), "42");
/// assert_eq!(id, EntityId::from("42"));
/// ```
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct EntityId(String);

impl EntityId {
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Reads an id out of a JSON value. Only strings and numbers qualify.
    #[must_use]
    pub fn from_json(value: &serde_json::Value) -> Option<Self> {
        match value {
            serde_json::Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            serde_json::Value::Number(n) => Some(Self(n.to_string())),
            _ => None,
        }
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<i64> for EntityId {
    fn from(id: i64) -> Self {
        Self(id.to_string())
    }
}

impl From<i32> for EntityId {
    fn from(id: i32) -> Self {
        Self(id.to_string())
    }
}

impl From<&str> for EntityId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

/// One backend search call. Immutable once issued.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
pub struct SearchRequest {
    pub query: String,
    pub page: u32,
    pub page_size: u32,
}

impl SearchRequest {
    #[must_use]
    pub fn new(query: impl Into<String>, page: u32, page_size: u32) -> Self {
        Self {
            query: query.into(),
            page,
            page_size,
        }
    }

    /// Composite cache key: `query + "_" + page`.
    #[must_use]
    pub fn cache_key(&self) -> String {
        cache_key(&self.query, self.page)
    }
}

#[must_use]
pub fn cache_key(query: &str, page: u32) -> String {
    format!("{query}_{page}")
}

/// Whether a page of results replaces the visible list or extends it.
///
/// Used instead of a bare `append: bool` at call sites.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PageMode {
    #[default]
    Replace,
    Append,
}

impl PageMode {
    #[must_use]
    pub const fn is_append(self) -> bool {
        matches!(self, Self::Append)
    }
}

impl From<bool> for PageMode {
    fn from(append: bool) -> Self {
        if append { Self::Append } else { Self::Replace }
    }
}
