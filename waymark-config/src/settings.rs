//! Typed router settings
//!
//! ```toml
//! [logging]
//! level = "debug"          # trace | debug | info | warn | error
//! format = "pretty"        # json | plain | pretty | compact
//! output = "file"          # stdout | stderr | file
//! file = "/var/log/waymark.log"
//!
//! [middleware]
//! access_log = true
//! request_id = true
//! request_id_header = "X-Request-Id"
//! body_limit = 1048576     # bytes; omit for no limit
//! ```
//!
//! Environment overrides use flat keys: `WAYMARK_LOGGING_LEVEL`,
//! `WAYMARK_MIDDLEWARE_BODY_LIMIT` and so on.

use crate::{ConfigError, ConfigLoader, ConfigManager, ConfigValidator, Result, Validate};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::Path;
use waymark_core::logging::{debug, LogConfig, LogFormat, LogLevel, LogOutput};
use waymark_core::{
    BodySizeLimitMiddleware, LoggingMiddleware, RequestIdMiddleware, RouteCollection,
};

const OUTPUTS: [&str; 3] = ["stdout", "stderr", "file"];

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    pub logging: LoggingSettings,
    pub middleware: MiddlewareSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingSettings {
    pub level: String,
    pub format: String,
    pub output: String,
    /// Log file path, required when `output` is `file`
    pub file: Option<String>,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "json".to_string(),
            output: "stdout".to_string(),
            file: None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MiddlewareSettings {
    pub request_id: bool,
    pub request_id_header: String,
    /// Maximum request body in bytes
    pub body_limit: Option<usize>,
    pub access_log: bool,
}

impl Default for MiddlewareSettings {
    fn default() -> Self {
        Self {
            request_id: true,
            request_id_header: "X-Request-Id".to_string(),
            body_limit: None,
            access_log: false,
        }
    }
}

impl Settings {
    /// Read and validate a JSON, TOML or env file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let value = ConfigLoader::auto(path.as_ref())?.load_file(path.as_ref())?;
        let settings: Settings = serde_json::from_value(value)?;
        settings.validate()?;
        Ok(settings)
    }

    /// Build from a layered store.
    ///
    /// Nested `logging` / `middleware` sections are read first, then flat
    /// `logging_*` / `middleware_*` keys from `.env` and the environment
    /// override individual fields.
    pub fn from_manager(manager: &ConfigManager) -> Result<Self> {
        let mut settings = Settings::default();
        if let Some(section) = section(manager, "logging")? {
            settings.logging = section;
        }
        if let Some(section) = section(manager, "middleware")? {
            settings.middleware = section;
        }

        let logging = &mut settings.logging;
        overlay(manager, "logging_level", &mut logging.level)?;
        overlay(manager, "logging_format", &mut logging.format)?;
        overlay(manager, "logging_output", &mut logging.output)?;
        overlay(manager, "logging_file", &mut logging.file)?;

        let middleware = &mut settings.middleware;
        overlay(manager, "middleware_request_id", &mut middleware.request_id)?;
        overlay(
            manager,
            "middleware_request_id_header",
            &mut middleware.request_id_header,
        )?;
        overlay(manager, "middleware_body_limit", &mut middleware.body_limit)?;
        overlay(manager, "middleware_access_log", &mut middleware.access_log)?;

        settings.validate()?;
        Ok(settings)
    }

    /// Logging configuration for [`LogConfig::init`].
    pub fn log_config(&self) -> Result<LogConfig> {
        let logging = &self.logging;
        let level = LogLevel::parse(&logging.level).ok_or_else(|| ConfigError::InvalidValue {
            key: "logging.level".to_string(),
            message: format!("unknown level '{}'", logging.level),
        })?;
        let format = LogFormat::parse(&logging.format).ok_or_else(|| ConfigError::InvalidValue {
            key: "logging.format".to_string(),
            message: format!("unknown format '{}'", logging.format),
        })?;

        let output = match logging.output.to_ascii_lowercase().as_str() {
            "stdout" => LogOutput::Stdout,
            "stderr" => LogOutput::Stderr,
            "file" => match &logging.file {
                Some(path) => LogOutput::File(path.clone()),
                None => {
                    return Err(ConfigError::Validation(
                        "logging.file is required when logging.output is file".to_string(),
                    ));
                }
            },
            other => {
                return Err(ConfigError::InvalidValue {
                    key: "logging.output".to_string(),
                    message: format!("unknown output '{}'", other),
                });
            }
        };

        Ok(LogConfig::new()
            .level(level)
            .format(format)
            .output(output)
            .with_colors(format != LogFormat::Json && logging.file.is_none()))
    }

    /// Attach the enabled built-in middleware to `routes`.
    ///
    /// Call before groups are resolved so every group inherits it. Order,
    /// outermost first: access log, request id, body limit.
    pub fn install(&self, routes: &mut RouteCollection) {
        let middleware = &self.middleware;
        if middleware.access_log {
            routes.middleware(LoggingMiddleware::new());
        }
        if middleware.request_id {
            routes.middleware(RequestIdMiddleware::with_header(
                middleware.request_id_header.clone(),
            ));
        }
        if let Some(limit) = middleware.body_limit {
            routes.middleware(BodySizeLimitMiddleware::new(limit));
        }

        debug!(
            access_log = middleware.access_log,
            request_id = middleware.request_id,
            body_limit = ?middleware.body_limit,
            "Installed configured middleware"
        );
    }
}

impl Validate for Settings {
    fn validate(&self) -> Result<()> {
        let logging = &self.logging;
        if LogLevel::parse(&logging.level).is_none() {
            return Err(ConfigError::Validation(format!(
                "logging.level '{}' is not a known level",
                logging.level
            )));
        }
        if LogFormat::parse(&logging.format).is_none() {
            return Err(ConfigError::Validation(format!(
                "logging.format '{}' is not a known format",
                logging.format
            )));
        }
        let output = logging.output.to_ascii_lowercase();
        ConfigValidator::one_of(&output.as_str(), &OUTPUTS, "logging.output")?;
        if output == "file" {
            ConfigValidator::required(logging.file.as_ref(), "logging.file", "logging.output is file")?;
        }

        let middleware = &self.middleware;
        if middleware.request_id {
            ConfigValidator::not_empty(&middleware.request_id_header, "middleware.request_id_header")?;
        }
        if let Some(limit) = middleware.body_limit {
            ConfigValidator::in_range(limit, 1, usize::MAX, "middleware.body_limit")?;
        }
        Ok(())
    }
}

fn section<T: DeserializeOwned>(manager: &ConfigManager, key: &str) -> Result<Option<T>> {
    match manager.get(key) {
        Ok(value) => Ok(Some(value)),
        Err(ConfigError::KeyNotFound(_)) => Ok(None),
        Err(err) => Err(err),
    }
}

fn overlay<T: DeserializeOwned>(manager: &ConfigManager, key: &str, target: &mut T) -> Result<()> {
    if let Some(value) = section(manager, key)? {
        *target = value;
    }
    Ok(())
}
