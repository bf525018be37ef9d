//! Extracted path parameters
//!
//! Placeholder values captured from a request path, kept in the order
//! the placeholders are declared in the route pattern. Routes rarely
//! have more than a handful of placeholders, so they are stored inline.

use smallvec::SmallVec;
use std::collections::HashMap;

/// Number of parameters stored inline before spilling to the heap.
pub const INLINE_PARAM_COUNT: usize = 8;

/// Ordered `(name, value)` list produced by a successful match.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RouteParams {
    params: SmallVec<[(String, String); INLINE_PARAM_COUNT]>,
}

impl RouteParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, name: impl Into<String>, value: impl Into<String>) {
        self.params.push((name.into(), value.into()));
    }

    /// Get parameter by name.
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Get parameter and parse as type T.
    pub fn get_parsed<T: std::str::FromStr>(&self, name: &str) -> Option<Result<T, T::Err>> {
        self.get(name).map(str::parse)
    }

    pub fn len(&self) -> usize {
        self.params.len()
    }

    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Iterate in declaration order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.params.iter().map(|(n, v)| (n.as_str(), v.as_str()))
    }

    /// Values only, in declaration order.
    pub fn values(&self) -> Vec<&str> {
        self.params.iter().map(|(_, v)| v.as_str()).collect()
    }

    /// Merge into a request parameter map, overwriting existing keys.
    pub fn merge_into(&self, target: &mut HashMap<String, String>) {
        for (name, value) in &self.params {
            target.insert(name.clone(), value.clone());
        }
    }
}

impl<'a> IntoIterator for &'a RouteParams {
    type Item = &'a (String, String);
    type IntoIter = std::slice::Iter<'a, (String, String)>;

    fn into_iter(self) -> Self::IntoIter {
        self.params.iter()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> RouteParams {
        let mut params = RouteParams::new();
        params.push("user_id", "42");
        params.push("post_id", "abc");
        params
    }

    #[test]
    fn test_order_and_lookup() {
        let params = sample();
        assert_eq!(params.len(), 2);
        assert_eq!(params.values(), vec!["42", "abc"]);
        assert_eq!(params.get("post_id"), Some("abc"));
        assert_eq!(params.get("missing"), None);
    }

    #[test]
    fn test_get_parsed() {
        let params = sample();
        assert_eq!(params.get_parsed::<u32>("user_id"), Some(Ok(42)));
        assert!(params.get_parsed::<u32>("post_id").unwrap().is_err());
    }

    #[test]
    fn test_merge_overwrites() {
        let mut target = HashMap::new();
        target.insert("user_id".to_string(), "old".to_string());
        target.insert("other".to_string(), "kept".to_string());

        sample().merge_into(&mut target);

        assert_eq!(target.get("user_id").map(String::as_str), Some("42"));
        assert_eq!(target.get("other").map(String::as_str), Some("kept"));
        assert_eq!(target.len(), 3);
    }
}
