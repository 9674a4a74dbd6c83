//! Path parameter storage.
//!
//! Up to [`MAX_INLINE_PARAMS`] parameters live inline in a `SmallVec` with no heap
//! allocation. Routes with more parameters spill the surplus into a `HashMap`
//! that exists only for that request and is dropped on reset.

use std::collections::HashMap;
use std::sync::Arc;

use smallvec::SmallVec;

/// Maximum number of path parameters stored without heap allocation.
/// Most REST APIs have ≤4 path params (e.g., /users/:id/posts/:post_id).
pub const MAX_INLINE_PARAMS: usize = 8;

/// Inline parameter storage.
///
/// Param names use `Arc<str>` because they come from the route trie (known at startup);
/// values are per-request data taken from the URL.
pub type ParamVec = SmallVec<[(Arc<str>, String); MAX_INLINE_PARAMS]>;

/// Parameters extracted for one request.
#[derive(Debug, Clone, Default)]
pub struct Params {
    inline: ParamVec,
    overflow: Option<HashMap<Arc<str>, String>>,
}

impl Params {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a parameter. Duplicate names keep the last value.
    pub fn push(&mut self, name: Arc<str>, value: String) {
        if self.inline.len() < MAX_INLINE_PARAMS {
            self.inline.push((name, value));
        } else {
            self.overflow
                .get_or_insert_with(HashMap::new)
                .insert(name, value);
        }
    }

    /// Get a parameter by name.
    ///
    /// Uses "last write wins" semantics when a name was pushed more than once.
    #[inline]
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        if let Some(value) = self.overflow.as_ref().and_then(|m| m.get(name)) {
            return Some(value.as_str());
        }
        self.inline
            .iter()
            .rfind(|(k, _)| k.as_ref() == name)
            .map(|(_, v)| v.as_str())
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.inline.len() + self.overflow.as_ref().map_or(0, HashMap::len)
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// `true` once storage spilled past the inline capacity.
    #[must_use]
    pub fn spilled(&self) -> bool {
        self.overflow.is_some()
    }

    /// Iterate inline parameters first, then any overflow (overflow order is unspecified).
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inline
            .iter()
            .map(|(k, v)| (k.as_ref(), v.as_str()))
            .chain(
                self.overflow
                    .iter()
                    .flat_map(|m| m.iter().map(|(k, v)| (k.as_ref(), v.as_str()))),
            )
    }

    /// Convert to an owned map.
    /// Note: This allocates - use get() in hot paths
    #[must_use]
    pub fn to_map(&self) -> HashMap<String, String> {
        self.iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    /// Remove every parameter, dropping the overflow map entirely.
    pub fn clear(&mut self) {
        self.inline.clear();
        self.overflow = None;
    }
}
