//! Configuration validation rules.
//!
//! This module provides validation logic for `StoreConfig` values
//! after they have been loaded from environment, files, or defaults.

use crate::config::StoreConfig;
use thiserror::Error;

/// Longest accepted namespace name.
pub const MAX_NAME_LEN: usize = 64;

/// Configuration validation errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to load configuration: {0}")]
    LoadFailed(String),

    #[error("invalid configuration: {field} - {reason}")]
    Invalid { field: String, reason: String },
}

/// Check that `name` can be interpolated as an SQLite table identifier.
///
/// Accepts ASCII letters, digits and underscores, not starting with a digit,
/// and rejects SQLite's reserved `sqlite_` prefix.
pub fn validate_name(name: &str) -> Result<(), String> {
    if name.is_empty() {
        return Err("must not be empty".into());
    }
    if name.len() > MAX_NAME_LEN {
        return Err(format!("must not exceed {MAX_NAME_LEN} characters"));
    }
    if name.as_bytes()[0].is_ascii_digit() {
        return Err("must not start with a digit".into());
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        return Err("may only contain ASCII letters, digits and underscores".into());
    }
    if name.to_ascii_lowercase().starts_with("sqlite_") {
        return Err("the sqlite_ prefix is reserved".into());
    }
    Ok(())
}

impl StoreConfig {
    /// Validate configuration values after loading.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Invalid` if:
    /// - `name` is not a plain identifier
    /// - `flags` is `read_only` without a `path`
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate_name(&self.name).map_err(|reason| ConfigError::Invalid { field: "name".into(), reason })?;

        if self.flags.is_read_only() && self.path.is_none() {
            return Err(ConfigError::Invalid {
                field: "flags".into(),
                reason: "read_only requires a database path".into(),
            });
        }

        if self.ttl_ms <= 0 {
            tracing::warn!(
                ttl_ms = self.ttl_ms,
                "Default ttl is not positive; entries written without an explicit ttl expire immediately"
            );
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenMode;

    #[test]
    fn test_validate_default_config() {
        let config = StoreConfig::default();
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_empty_name() {
        let config = StoreConfig { name: String::new(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "name"));
    }

    #[test]
    fn test_validate_name_injection() {
        let config = StoreConfig { name: "kv; DROP TABLE kv".into(), ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "name"));
    }

    #[test]
    fn test_validate_name_rules() {
        assert!(validate_name("cache_v2").is_ok());
        assert!(validate_name("_private").is_ok());
        assert!(validate_name("2fast").is_err());
        assert!(validate_name("sqlite_master").is_err());
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN)).is_ok());
        assert!(validate_name(&"a".repeat(MAX_NAME_LEN + 1)).is_err());
    }

    #[test]
    fn test_validate_read_only_requires_path() {
        let config = StoreConfig { flags: OpenMode::ReadOnly, ..Default::default() };
        let result = config.validate();
        assert!(matches!(result, Err(ConfigError::Invalid { field, .. }) if field == "flags"));

        let config = StoreConfig { flags: OpenMode::ReadOnly, path: Some("/tmp/kv.sqlite".into()), ..Default::default() };
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_validate_non_positive_ttl_allowed() {
        let config = StoreConfig { ttl_ms: 0, ..Default::default() };
        assert!(config.validate().is_ok());
    }
}
