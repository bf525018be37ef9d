//! Route path pattern compilation
//!
//! A route path is a template such as `/users/{id}/posts/{post_id}`.
//! Each `{identifier}` placeholder becomes a named capture that matches
//! one or more ASCII word characters (`[A-Za-z0-9_]`); every other
//! character is matched literally. Patterns are anchored at both ends
//! and matched case-insensitively, folding ASCII letters only: non-ASCII
//! literals must match exactly, and no non-ASCII character ever matches
//! an ASCII letter.
//!
//! Placeholders never match `/`, `.`, `-` or any other non-word
//! character, so `/files/{name}` does not match `/files/report.pdf`.
//! Optional segments, wildcards and per-parameter constraints are not
//! supported.

use crate::{Error, RouteParams};
use regex::{Regex, RegexBuilder};
use std::fmt::Write;

const PLACEHOLDER_CAPTURE: &str = "(?-u:[A-Za-z0-9_]+)";

/// Normalize a path to the canonical `/segment/segment` form.
///
/// Surrounding slashes, backslashes and whitespace are stripped and a
/// single leading slash is prepended, so the root is `/` and no other
/// path ends with a slash.
pub fn normalize_path(path: &str) -> String {
    let trimmed = path.trim_matches(|c: char| c == '/' || c == '\\' || c.is_whitespace());
    format!("/{}", trimmed)
}

/// A compiled route path.
#[derive(Debug, Clone)]
pub struct PathPattern {
    path: String,
    regex: Regex,
    names: Vec<String>,
}

impl PathPattern {
    /// Compile a route path template.
    ///
    /// Fails with [`Error::RouteCompilation`] on a stray or unclosed
    /// brace, an empty or non-word placeholder name, a name starting with
    /// a digit, or a placeholder name used twice.
    ///
    /// # Examples
    ///
    /// ```
    /// use waymark_core::PathPattern;
    ///
    /// let pattern = PathPattern::compile("users/{id}/").unwrap();
    /// assert_eq!(pattern.path(), "/users/{id}");
    ///
    /// let params = pattern.captures("/USERS/42").unwrap();
    /// assert_eq!(params.get("id"), Some("42"));
    /// assert!(pattern.captures("/users/4.2").is_none());
    /// ```
    pub fn compile(raw_path: &str) -> Result<Self, Error> {
        let path = normalize_path(raw_path);
        let mut source = String::with_capacity(path.len() + 16);
        let mut names: Vec<String> = Vec::new();

        source.push('^');
        let mut rest = path.as_str();
        while let Some(brace) = rest.find(['{', '}']) {
            let (literal, tail) = rest.split_at(brace);
            push_literal(&mut source, literal);

            if tail.starts_with('}') {
                return Err(Error::compilation(raw_path, "unmatched '}'"));
            }
            let close = tail
                .find('}')
                .ok_or_else(|| Error::compilation(raw_path, "unclosed '{'"))?;
            let name = &tail[1..close];
            validate_name(raw_path, name)?;
            if names.iter().any(|n| n == name) {
                return Err(Error::compilation(
                    raw_path,
                    format!("duplicate placeholder '{}'", name),
                ));
            }

            let _ = write!(source, "(?P<{}>{})", name, PLACEHOLDER_CAPTURE);
            names.push(name.to_string());
            rest = &tail[close + 1..];
        }
        push_literal(&mut source, rest);
        source.push('$');

        let regex = RegexBuilder::new(&source)
            .case_insensitive(true)
            .build()
            .map_err(|e| Error::compilation(raw_path, e.to_string()))?;

        Ok(Self { path, regex, names })
    }

    /// The normalized template this pattern was compiled from.
    pub fn path(&self) -> &str {
        &self.path
    }

    /// Placeholder names in declaration order.
    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn as_regex(&self) -> &Regex {
        &self.regex
    }

    pub fn is_match(&self, path: &str) -> bool {
        self.regex.is_match(path)
    }

    /// Test a normalized request path, returning the placeholder values in
    /// declaration order on success.
    pub fn captures(&self, path: &str) -> Option<RouteParams> {
        let caps = self.regex.captures(path)?;
        let mut params = RouteParams::new();
        for name in &self.names {
            if let Some(value) = caps.name(name) {
                params.push(name.as_str(), value.as_str());
            }
        }
        Some(params)
    }
}

// ASCII runs fold case bytewise; other runs match exactly.
fn push_literal(source: &mut String, literal: &str) {
    let mut rest = literal;
    while let Some(first) = rest.chars().next() {
        let ascii = first.is_ascii();
        let end = rest
            .find(|c: char| c.is_ascii() != ascii)
            .unwrap_or(rest.len());
        let (run, tail) = rest.split_at(end);
        let flags = if ascii { "-u" } else { "-i" };
        let _ = write!(source, "(?{}:{})", flags, regex::escape(run));
        rest = tail;
    }
}

fn validate_name(raw_path: &str, name: &str) -> Result<(), Error> {
    if name.is_empty() {
        return Err(Error::compilation(raw_path, "empty placeholder '{}'"));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err(Error::compilation(
            raw_path,
            format!("placeholder '{}' must contain only word characters", name),
        ));
    }
    if name.starts_with(|c: char| c.is_ascii_digit()) {
        return Err(Error::compilation(
            raw_path,
            format!("placeholder '{}' must not start with a digit", name),
        ));
    }
    Ok(())
}
