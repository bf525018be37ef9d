// Environment variable loading

use crate::{ConfigError, Result};
use std::collections::HashMap;
use std::env;

/// Prefix used when none is given explicitly.
pub const DEFAULT_PREFIX: &str = "WAYMARK";

/// Reads `PREFIX_KEY=value` variables as lower-cased `key` entries.
///
/// With `WAYMARK` as prefix, `WAYMARK_LOGGING_LEVEL=debug` becomes
/// `logging_level = "debug"`; variables without the prefix are skipped.
#[derive(Debug, Clone)]
pub struct EnvLoader {
    prefix: Option<String>,
}

impl EnvLoader {
    pub fn new(prefix: Option<String>) -> Self {
        Self { prefix }
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::new(Some(prefix.into()))
    }

    /// Accept every variable, unprefixed.
    pub fn unprefixed() -> Self {
        Self::new(None)
    }

    pub fn prefix(&self) -> Option<&str> {
        self.prefix.as_deref()
    }

    /// Load matching variables from the process environment.
    pub fn load(&self) -> HashMap<String, String> {
        self.collect(env::vars())
    }

    /// Filter and rename an arbitrary set of variables.
    pub fn collect<I>(&self, vars: I) -> HashMap<String, String>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        vars.into_iter()
            .filter_map(|(key, value)| self.strip(&key).map(|k| (k.to_lowercase(), value)))
            .collect()
    }

    fn strip<'a>(&self, key: &'a str) -> Option<&'a str> {
        match &self.prefix {
            Some(prefix) => key
                .strip_prefix(prefix.as_str())
                .and_then(|rest| rest.strip_prefix('_'))
                .filter(|rest| !rest.is_empty()),
            None => Some(key),
        }
    }

    /// Read a single variable; `key` is upper-cased and prefixed.
    pub fn load_var(&self, key: &str) -> Result<String> {
        let full_key = match &self.prefix {
            Some(prefix) => format!("{}_{}", prefix, key.to_uppercase()),
            None => key.to_uppercase(),
        };

        env::var(&full_key).map_err(ConfigError::Env)
    }

    pub fn load_var_or(&self, key: &str, default: &str) -> String {
        self.load_var(key).unwrap_or_else(|_| default.to_string())
    }
}

impl Default for EnvLoader {
    fn default() -> Self {
        Self::with_prefix(DEFAULT_PREFIX)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn vars(pairs: &[(&str, &str)]) -> Vec<(String, String)> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_default_prefix() {
        assert_eq!(EnvLoader::default().prefix(), Some("WAYMARK"));
    }

    #[test]
    fn test_prefixed_collect() {
        let loader = EnvLoader::default();
        let loaded = loader.collect(vars(&[
            ("WAYMARK_LOGGING_LEVEL", "debug"),
            ("WAYMARK_MIDDLEWARE_BODY_LIMIT", "1024"),
            ("WAYMARKER_OTHER", "skip"),
            ("WAYMARK_", "skip"),
            ("PATH", "/usr/bin"),
        ]));

        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded.get("logging_level").map(String::as_str), Some("debug"));
        assert_eq!(
            loaded.get("middleware_body_limit").map(String::as_str),
            Some("1024")
        );
    }

    #[test]
    fn test_unprefixed_collect() {
        let loaded = EnvLoader::unprefixed().collect(vars(&[("HOME", "/root")]));
        assert_eq!(loaded.get("home").map(String::as_str), Some("/root"));
    }

    #[test]
    fn test_load_var_missing() {
        let loader = EnvLoader::with_prefix("WAYMARK_TEST");
        assert!(matches!(
            loader.load_var("MISSING_VAR_67890"),
            Err(ConfigError::Env(_))
        ));
        assert_eq!(loader.load_var_or("MISSING_VAR_67890", "fallback"), "fallback");
    }

    #[test]
    fn test_load_var_path_exists() {
        if std::env::var("PATH").is_ok() {
            assert!(EnvLoader::unprefixed().load_var("path").is_ok());
        }
    }
}
