//! Store configuration with layered loading.
//!
//! This module provides configuration management using figment for layered
//! configuration loading from multiple sources:
//!
//! 1. Environment variables (SQLKV_*)
//! 2. TOML config file (if SQLKV_CONFIG_FILE set)
//! 3. Built-in defaults

use std::path::PathBuf;

use figment::{
    Figment,
    providers::{Env, Format, Serialized, Toml},
};
use serde::{Deserialize, Serialize};
use tokio_rusqlite::rusqlite::OpenFlags;

use crate::codec::Serializer;

mod validation;

pub use validation::{ConfigError, MAX_NAME_LEN, validate_name};

/// One day in milliseconds.
pub const DEFAULT_TTL_MS: i64 = 86_400_000;

/// How the database file is opened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OpenMode {
    /// Read-write, creating the file if missing.
    #[default]
    ReadWriteCreate,
    /// Read-write, the file must already exist.
    ReadWrite,
    /// Read-only; the namespace table must already exist.
    ReadOnly,
}

impl OpenMode {
    /// SQLite open flags for this mode.
    pub fn flags(self) -> OpenFlags {
        let base = OpenFlags::SQLITE_OPEN_URI | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        match self {
            OpenMode::ReadWriteCreate => base | OpenFlags::SQLITE_OPEN_READ_WRITE | OpenFlags::SQLITE_OPEN_CREATE,
            OpenMode::ReadWrite => base | OpenFlags::SQLITE_OPEN_READ_WRITE,
            OpenMode::ReadOnly => base | OpenFlags::SQLITE_OPEN_READ_ONLY,
        }
    }

    pub fn is_read_only(self) -> bool {
        self == OpenMode::ReadOnly
    }
}

/// Configuration of a single store namespace.
///
/// Loading precedence (highest wins):
/// 1. Environment variables (SQLKV_*)
/// 2. TOML config file (if SQLKV_CONFIG_FILE set)
/// 3. Built-in defaults
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// Namespace, used as the table name.
    ///
    /// Set via SQLKV_NAME environment variable.
    #[serde(default = "default_name")]
    pub name: String,

    /// Path to the SQLite database file. `None` keeps everything in memory.
    ///
    /// Set via SQLKV_PATH environment variable.
    #[serde(default)]
    pub path: Option<PathBuf>,

    /// Default entry lifetime in milliseconds.
    ///
    /// Set via SQLKV_TTL_MS environment variable.
    #[serde(default = "default_ttl_ms")]
    pub ttl_ms: i64,

    /// Built-in value codec.
    ///
    /// Set via SQLKV_SERIALIZER environment variable (`json` or `messagepack`).
    #[serde(default)]
    pub serializer: Serializer,

    /// File open mode.
    ///
    /// Set via SQLKV_FLAGS environment variable.
    #[serde(default)]
    pub flags: OpenMode,
}

fn default_name() -> String {
    "kv".into()
}

fn default_ttl_ms() -> i64 {
    DEFAULT_TTL_MS
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            name: default_name(),
            path: None,
            ttl_ms: default_ttl_ms(),
            serializer: Serializer::default(),
            flags: OpenMode::default(),
        }
    }
}

impl StoreConfig {
    /// In-memory store with the given namespace.
    pub fn in_memory(name: impl Into<String>) -> Self {
        Self { name: name.into(), ..Default::default() }
    }

    /// File-backed store with the given namespace.
    pub fn at_path(path: impl Into<PathBuf>, name: impl Into<String>) -> Self {
        Self { name: name.into(), path: Some(path.into()), ..Default::default() }
    }

    /// Load configuration from all sources with layered precedence.
    ///
    /// Priority (highest wins):
    /// 1. Environment variables prefixed with `SQLKV_`
    /// 2. TOML file from `SQLKV_CONFIG_FILE` (if set)
    /// 3. Built-in defaults via `Default::default()`
    ///
    /// # Errors
    ///
    /// Returns `ConfigError` if:
    /// - Configuration file cannot be read
    /// - Environment variables cannot be parsed
    /// - Validation fails after loading
    pub fn load() -> Result<Self, ConfigError> {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));

        if let Ok(config_path) = std::env::var("SQLKV_CONFIG_FILE") {
            figment = figment.merge(Toml::file(&config_path));
        }

        figment = figment.merge(
            Env::prefixed("SQLKV_")
                .map(|key| key.as_str().to_lowercase().into())
                .split("__"),
        );

        let config: Self = figment.extract().map_err(|e| ConfigError::LoadFailed(e.to_string()))?;

        config.validate()?;

        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = StoreConfig::default();
        assert_eq!(config.name, "kv");
        assert!(config.path.is_none());
        assert_eq!(config.ttl_ms, 86_400_000);
        assert_eq!(config.serializer, Serializer::Json);
        assert_eq!(config.flags, OpenMode::ReadWriteCreate);
    }

    #[test]
    fn test_open_mode_flags() {
        assert!(OpenMode::ReadWriteCreate.flags().contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(!OpenMode::ReadWrite.flags().contains(OpenFlags::SQLITE_OPEN_CREATE));
        assert!(OpenMode::ReadOnly.flags().contains(OpenFlags::SQLITE_OPEN_READ_ONLY));
        assert!(OpenMode::ReadOnly.is_read_only());
    }

    #[test]
    fn test_extract_from_toml() {
        let config: StoreConfig = Figment::from(Serialized::defaults(StoreConfig::default()))
            .merge(Toml::string(
                r#"
                name = "sessions"
                path = "/tmp/sessions.sqlite"
                ttl_ms = 60000
                serializer = "messagepack"
                flags = "read_write"
                "#,
            ))
            .extract()
            .unwrap();

        assert_eq!(config.name, "sessions");
        assert_eq!(config.path, Some(PathBuf::from("/tmp/sessions.sqlite")));
        assert_eq!(config.ttl_ms, 60_000);
        assert_eq!(config.serializer, Serializer::MessagePack);
        assert_eq!(config.flags, OpenMode::ReadWrite);
    }
}
