//! Layered configuration for Waymark
//!
//! [`ConfigManager`] collects key/value pairs from configuration files,
//! `.env` files and the process environment; later layers overwrite
//! earlier ones. [`Settings`] is the typed view used to configure
//! logging and the built-in middleware of a
//! [`RouteCollection`](waymark_core::RouteCollection).
//!
//! ```no_run
//! use waymark_config::{ConfigManager, Settings};
//! use waymark_core::RouteCollection;
//!
//! # fn main() -> waymark_config::Result<()> {
//! let manager = ConfigManager::layered(Some("waymark.toml"))?;
//! let settings = Settings::from_manager(&manager)?;
//! let _guard = settings.log_config()?.init()?;
//!
//! let mut routes = RouteCollection::new();
//! settings.install(&mut routes);
//! # Ok(())
//! # }
//! ```

pub mod env;
pub mod error;
pub mod loader;
pub mod settings;
pub mod validation;

pub use env::{EnvLoader, DEFAULT_PREFIX};
pub use error::{ConfigError, Result};
pub use loader::{ConfigLoader, FileFormat};
pub use settings::{LoggingSettings, MiddlewareSettings, Settings};
pub use validation::{ConfigValidator, Validate};

use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use waymark_core::logging::debug;

/// Shared, layered configuration store.
///
/// Values are kept as JSON. Lookups accept either a top-level key or a
/// dotted path into nested objects (`logging.level`). Environment values
/// are strings; [`get`](Self::get) re-reads such a string as JSON when the
/// requested type is not a string, so `"true"` yields `bool` and `"1024"`
/// yields an integer.
#[derive(Clone)]
pub struct ConfigManager {
    config: Arc<RwLock<HashMap<String, Value>>>,
    env: EnvLoader,
}

impl ConfigManager {
    /// Empty store reading `WAYMARK_*` variables.
    pub fn new() -> Self {
        Self::with_env(EnvLoader::default())
    }

    pub fn with_prefix(prefix: impl Into<String>) -> Self {
        Self::with_env(EnvLoader::with_prefix(prefix))
    }

    pub fn with_env(env: EnvLoader) -> Self {
        Self {
            config: Arc::new(RwLock::new(HashMap::new())),
            env,
        }
    }

    /// File (when given), then `.env` in the working directory, then the
    /// process environment.
    pub fn layered(file: Option<impl AsRef<Path>>) -> Result<Self> {
        let manager = Self::new();
        if let Some(path) = file {
            manager.load_file_auto(path)?;
        }
        manager.load_dotenv(None::<&Path>)?;
        manager.load_env();
        Ok(manager)
    }

    fn read(&self) -> RwLockReadGuard<'_, HashMap<String, Value>> {
        self.config.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, HashMap<String, Value>> {
        self.config.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Merge prefixed variables from the process environment.
    pub fn load_env(&self) {
        self.load_vars(self.env.load());
    }

    /// Merge prefixed pairs from a `.env` file.
    ///
    /// Without a path, a missing `.env` in the working directory (or its
    /// ancestors) is not an error. The process environment is left
    /// untouched.
    pub fn load_dotenv(&self, path: Option<impl AsRef<Path>>) -> Result<()> {
        let iter = match path {
            Some(path) => dotenvy::from_path_iter(path.as_ref())?,
            None => match dotenvy::dotenv_iter() {
                Ok(iter) => iter,
                Err(_) => return Ok(()),
            },
        };

        let pairs = iter.collect::<std::result::Result<Vec<_>, _>>()?;
        self.load_vars(self.env.collect(pairs));
        Ok(())
    }

    fn load_vars(&self, vars: HashMap<String, String>) {
        debug!(count = vars.len(), "Loading configuration variables");
        let mut config = self.write();
        for (key, value) in vars {
            config.insert(key, Value::String(value));
        }
    }

    pub fn load_file(&self, path: impl AsRef<Path>, format: FileFormat) -> Result<()> {
        let data = ConfigLoader::new(format).load_file(path.as_ref())?;
        self.merge_value(data);
        Ok(())
    }

    /// Load a file whose format is implied by its name.
    pub fn load_file_auto(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        self.load_file(path, FileFormat::from_path(path)?)
    }

    /// Merge the top-level entries of a JSON object. Nested objects
    /// replace existing entries wholesale.
    pub fn merge_value(&self, data: Value) {
        if let Value::Object(map) = data {
            let mut config = self.write();
            for (key, value) in map {
                config.insert(key, value);
            }
        }
    }

    pub fn set<T: serde::Serialize>(&self, key: &str, value: T) -> Result<()> {
        let value = serde_json::to_value(value)?;
        self.write().insert(key.to_string(), value);
        Ok(())
    }

    fn lookup(&self, key: &str) -> Option<Value> {
        let config = self.read();
        if let Some(value) = config.get(key) {
            return Some(value.clone());
        }

        let mut parts = key.split('.');
        let mut current = config.get(parts.next()?)?;
        for part in parts {
            current = current.get(part)?;
        }
        Some(current.clone())
    }

    pub fn get<T: DeserializeOwned>(&self, key: &str) -> Result<T> {
        let value = self
            .lookup(key)
            .ok_or_else(|| ConfigError::KeyNotFound(key.to_string()))?;

        match serde_json::from_value::<T>(value.clone()) {
            Ok(typed) => Ok(typed),
            Err(err) => match &value {
                Value::String(raw) => serde_json::from_str(raw).map_err(|_| invalid(key, err)),
                _ => Err(invalid(key, err)),
            },
        }
    }

    pub fn get_or<T: DeserializeOwned>(&self, key: &str, default: T) -> T {
        self.get(key).unwrap_or(default)
    }

    pub fn get_string(&self, key: &str) -> Result<String> {
        self.get(key)
    }

    pub fn get_int(&self, key: &str) -> Result<i64> {
        self.get(key)
    }

    pub fn get_bool(&self, key: &str) -> Result<bool> {
        self.get(key)
    }

    pub fn has(&self, key: &str) -> bool {
        self.lookup(key).is_some()
    }

    /// Top-level keys, sorted.
    pub fn keys(&self) -> Vec<String> {
        let mut keys: Vec<String> = self.read().keys().cloned().collect();
        keys.sort();
        keys
    }

    /// Copy every entry of `other` over this store.
    pub fn merge(&self, other: &ConfigManager) {
        let entries: Vec<(String, Value)> = other
            .read()
            .iter()
            .map(|(k, v)| (k.clone(), v.clone()))
            .collect();
        let mut config = self.write();
        config.extend(entries);
    }

    /// The whole store as one JSON object.
    pub fn snapshot(&self) -> Value {
        Value::Object(
            self.read()
                .iter()
                .map(|(k, v)| (k.clone(), v.clone()))
                .collect(),
        )
    }

    /// Deserialize the whole store and validate it.
    pub fn load_validated<T: DeserializeOwned + Validate>(&self) -> Result<T> {
        let validated: T = serde_json::from_value(self.snapshot())?;
        validated.validate()?;
        Ok(validated)
    }
}

impl Default for ConfigManager {
    fn default() -> Self {
        Self::new()
    }
}

fn invalid(key: &str, err: impl std::fmt::Display) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        message: err.to_string(),
    }
}
