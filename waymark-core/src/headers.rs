//! Case-preserving HTTP header storage
//!
//! Header names keep the case they were inserted with (that is what gets
//! emitted), while every lookup compares names case-insensitively.
//! Typical requests carry fewer than a dozen headers, so entries live
//! inline in a `SmallVec` and lookups are a linear scan.

use smallvec::SmallVec;
use std::fmt;

/// Number of headers stored inline before spilling to the heap.
pub const INLINE_HEADERS: usize = 12;

/// A header name-value pair.
#[derive(Clone, PartialEq, Eq)]
pub struct Header {
    pub name: String,
    pub value: String,
}

impl Header {
    #[inline]
    fn name_eq(&self, name: &str) -> bool {
        self.name.eq_ignore_ascii_case(name)
    }
}

/// Header collection shared by [`HttpRequest`](crate::HttpRequest) and
/// [`HttpResponse`](crate::HttpResponse).
///
/// # Example
///
/// ```rust
/// use waymark_core::Headers;
///
/// let mut headers = Headers::new();
/// headers.insert("Content-Type", "application/json");
///
/// assert_eq!(headers.get("content-type"), Some("application/json"));
/// assert_eq!(headers.iter().next(), Some(("Content-Type", "application/json")));
/// ```
#[derive(Clone, Default, PartialEq, Eq)]
pub struct Headers {
    inner: SmallVec<[Header; INLINE_HEADERS]>,
}

impl Headers {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.inner.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inner.is_empty()
    }

    /// Get header value by name (case-insensitive).
    pub fn get(&self, name: &str) -> Option<&str> {
        self.inner
            .iter()
            .find(|h| h.name_eq(name))
            .map(|h| h.value.as_str())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.inner.iter().any(|h| h.name_eq(name))
    }

    /// Insert a header, replacing the value of any header with the same
    /// name. The originally stored name casing is kept on replacement.
    ///
    /// Returns the old value if replaced.
    pub fn insert(&mut self, name: impl Into<String>, value: impl Into<String>) -> Option<String> {
        let name = name.into();
        let value = value.into();

        if let Some(existing) = self.inner.iter_mut().find(|h| h.name_eq(&name)) {
            return Some(std::mem::replace(&mut existing.value, value));
        }

        self.inner.push(Header { name, value });
        None
    }

    /// Append a header without replacing existing ones (e.g. `Set-Cookie`).
    pub fn append(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.inner.push(Header {
            name: name.into(),
            value: value.into(),
        });
    }

    /// Remove the first header with the given name (case-insensitive).
    pub fn remove(&mut self, name: &str) -> Option<String> {
        let pos = self.inner.iter().position(|h| h.name_eq(name))?;
        Some(self.inner.remove(pos).value)
    }

    /// All values for a multi-value header, in insertion order.
    pub fn get_all(&self, name: &str) -> Vec<&str> {
        self.inner
            .iter()
            .filter(|h| h.name_eq(name))
            .map(|h| h.value.as_str())
            .collect()
    }

    /// Iterate over `(name, value)` pairs with names as inserted.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.inner
            .iter()
            .map(|h| (h.name.as_str(), h.value.as_str()))
    }

    pub fn clear(&mut self) {
        self.inner.clear();
    }
}

impl fmt::Debug for Headers {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map()
            .entries(self.inner.iter().map(|h| (&h.name, &h.value)))
            .finish()
    }
}

impl<K, V> FromIterator<(K, V)> for Headers
where
    K: Into<String>,
    V: Into<String>,
{
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        let mut headers = Headers::new();
        for (k, v) in iter {
            headers.insert(k, v);
        }
        headers
    }
}
