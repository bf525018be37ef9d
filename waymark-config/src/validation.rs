// Configuration validation

use crate::{ConfigError, Result};
use std::fmt::Display;

/// Implemented by settings types that can check their own invariants.
pub trait Validate {
    fn validate(&self) -> Result<()>;
}

/// Reusable field checks producing [`ConfigError::Validation`].
pub struct ConfigValidator;

impl ConfigValidator {
    pub fn not_empty(value: &str, field: &str) -> Result<()> {
        if value.trim().is_empty() {
            return Err(invalid(format!("{} cannot be empty", field)));
        }
        Ok(())
    }

    /// Inclusive range check.
    pub fn in_range<T: PartialOrd + Display>(value: T, min: T, max: T, field: &str) -> Result<()> {
        if value < min || value > max {
            return Err(invalid(format!(
                "{} must be between {} and {}, got {}",
                field, min, max, value
            )));
        }
        Ok(())
    }

    pub fn one_of<T: PartialEq + Display>(value: &T, allowed: &[T], field: &str) -> Result<()> {
        if !allowed.contains(value) {
            let choices: Vec<String> = allowed.iter().map(ToString::to_string).collect();
            return Err(invalid(format!(
                "{} must be one of [{}], got {}",
                field,
                choices.join(", "),
                value
            )));
        }
        Ok(())
    }

    /// A value that some other setting makes mandatory.
    pub fn required<T>(value: Option<&T>, field: &str, reason: &str) -> Result<()> {
        if value.is_none() {
            return Err(invalid(format!("{} is required when {}", field, reason)));
        }
        Ok(())
    }
}

fn invalid(message: String) -> ConfigError {
    ConfigError::Validation(message)
}
