//! SQLite-backed key-value store.
//!
//! A [`KvStore`] is one namespace (one table) on a tokio-rusqlite
//! connection. It supports:
//!
//! - Insert-or-replace writes with per-entry expiration
//! - Read-time staleness filtering with opportunistic background purge
//! - Pluggable value codecs
//! - WAL mode with relaxed synchronous flushing
//!
//! All statements for a connection run on its background thread in
//! submission order. Namespaces opened through [`KvStore::namespace`] share
//! that connection.

pub(crate) mod expiry;
mod ops;
pub mod schema;

use std::sync::Arc;

use tokio_rusqlite::Connection;

use crate::Error;
use crate::codec::Codec;
use crate::config::{StoreConfig, validate_name};

/// Callback observing one readiness stage (`on_open` or `on_ready`).
pub type ReadyHook = Box<dyn FnOnce(Result<(), &Error>) + Send + 'static>;

/// Store handle for one namespace.
///
/// Cheap to clone; clones share the connection.
#[derive(Clone, Debug)]
pub struct KvStore {
    pub(crate) conn: Connection,
    pub(crate) table: Arc<str>,
    pub(crate) codec: Arc<dyn Codec>,
    pub(crate) default_ttl: i64,
    read_only: bool,
}

/// Builder for a [`KvStore`], for settings that cannot live in a config file.
pub struct StoreBuilder {
    config: StoreConfig,
    codec: Option<Arc<dyn Codec>>,
    on_open: Option<ReadyHook>,
    on_ready: Option<ReadyHook>,
}

impl StoreBuilder {
    /// Use a custom codec instead of `config.serializer`.
    pub fn codec(mut self, codec: Arc<dyn Codec>) -> Self {
        self.codec = Some(codec);
        self
    }

    /// Called once the connection is open and pragmas are applied, or with
    /// the error that prevented it.
    pub fn on_open(mut self, hook: impl FnOnce(Result<(), &Error>) + Send + 'static) -> Self {
        self.on_open = Some(Box::new(hook));
        self
    }

    /// Called once the namespace schema exists, or with the error that
    /// prevented it.
    pub fn on_ready(mut self, hook: impl FnOnce(Result<(), &Error>) + Send + 'static) -> Self {
        self.on_ready = Some(Box::new(hook));
        self
    }

    /// Open the connection and create the namespace schema.
    ///
    /// The returned store is ready: its table and index exist.
    ///
    /// # Errors
    ///
    /// Returns an error if the config is invalid, the file cannot be opened,
    /// or the schema cannot be created.
    pub async fn open(self) -> Result<KvStore, Error> {
        let StoreBuilder { config, codec, on_open, on_ready } = self;

        let opened = connect(&config).await;
        notify(on_open, &opened);
        let conn = opened?;

        let ready = schema::ensure(&conn, &config.name, config.flags.is_read_only()).await;
        notify(on_ready, &ready);
        ready?;

        let codec = codec.unwrap_or_else(|| config.serializer.codec());
        tracing::info!(
            namespace = %config.name,
            path = ?config.path,
            codec = codec.name(),
            "Opened key-value store"
        );

        Ok(KvStore {
            conn,
            table: Arc::from(config.name.as_str()),
            codec,
            default_ttl: config.ttl_ms,
            read_only: config.flags.is_read_only(),
        })
    }
}

fn notify<T>(hook: Option<ReadyHook>, result: &Result<T, Error>) {
    if let Some(hook) = hook {
        hook(result.as_ref().map(|_| ()));
    }
}

async fn connect(config: &StoreConfig) -> Result<Connection, Error> {
    config.validate()?;

    let conn = match &config.path {
        Some(path) => Connection::open_with_flags(path, config.flags.flags())
            .await
            .map_err(|e| Error::Database(e.into()))?,
        None => Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?,
    };

    if !config.flags.is_read_only() {
        conn.call(|conn| {
            conn.execute_batch(
                "PRAGMA journal_mode=WAL;
                 PRAGMA synchronous=NORMAL;
                 PRAGMA temp_store=MEMORY;",
            )?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;
    }

    Ok(conn)
}

impl KvStore {
    /// Open a store from configuration.
    pub async fn open(config: StoreConfig) -> Result<Self, Error> {
        Self::builder(config).open().await
    }

    /// Open an in-memory store with default settings, mostly for tests.
    pub async fn open_in_memory() -> Result<Self, Error> {
        Self::open(StoreConfig::default()).await
    }

    pub fn builder(config: StoreConfig) -> StoreBuilder {
        StoreBuilder { config, codec: None, on_open: None, on_ready: None }
    }

    /// Another namespace on the same connection, with this store's codec
    /// and default ttl.
    ///
    /// # Errors
    ///
    /// Returns `Error::InvalidNamespace` for an unusable name, or a schema
    /// error if its table cannot be created.
    pub async fn namespace(&self, name: &str) -> Result<Self, Error> {
        validate_name(name).map_err(|reason| Error::InvalidNamespace(format!("{name}: {reason}")))?;
        schema::ensure(&self.conn, name, self.read_only).await?;

        Ok(Self { table: Arc::from(name), ..self.clone() })
    }

    /// Namespace (table) this handle reads and writes.
    pub fn name(&self) -> &str {
        &self.table
    }

    /// Default ttl in milliseconds applied when a write gives none.
    pub fn default_ttl(&self) -> i64 {
        self.default_ttl
    }

    pub fn codec(&self) -> &dyn Codec {
        self.codec.as_ref()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{ConfigError, OpenMode};
    use std::sync::Mutex;

    #[tokio::test]
    async fn test_open_in_memory() {
        let store = KvStore::open_in_memory().await.unwrap();
        assert_eq!(store.name(), "kv");
        assert_eq!(store.default_ttl(), 86_400_000);
        assert!(schema::table_exists(&store.conn, "kv").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_rejects_bad_name() {
        let result = KvStore::open(StoreConfig::in_memory("bad name")).await;
        assert!(matches!(result, Err(Error::Config(ConfigError::Invalid { .. }))));
    }

    #[tokio::test]
    async fn test_hooks_fire_in_order() {
        let events = Arc::new(Mutex::new(Vec::new()));
        let (open_events, ready_events) = (events.clone(), events.clone());

        let store = KvStore::builder(StoreConfig::in_memory("hooks"))
            .on_open(move |r| open_events.lock().unwrap().push(("open", r.is_ok())))
            .on_ready(move |r| ready_events.lock().unwrap().push(("ready", r.is_ok())))
            .open()
            .await
            .unwrap();

        assert_eq!(*events.lock().unwrap(), vec![("open", true), ("ready", true)]);
        assert!(schema::table_exists(&store.conn, "hooks").await.unwrap());
    }

    #[tokio::test]
    async fn test_open_failure_reaches_hook() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("missing.sqlite");
        let seen = Arc::new(Mutex::new(None));
        let sink = seen.clone();

        let config = StoreConfig { flags: OpenMode::ReadWrite, ..StoreConfig::at_path(&missing, "kv") };
        let result = KvStore::builder(config)
            .on_open(move |r| *sink.lock().unwrap() = Some(r.is_err()))
            .on_ready(|_| panic!("schema stage must not run after a failed open"))
            .open()
            .await;

        assert!(result.is_err());
        assert_eq!(*seen.lock().unwrap(), Some(true));
    }

    #[tokio::test]
    async fn test_namespace_shares_connection() {
        let store = KvStore::open_in_memory().await.unwrap();
        let other = store.namespace("sessions").await.unwrap();

        assert_eq!(other.name(), "sessions");
        assert!(schema::table_exists(&store.conn, "sessions").await.unwrap());
        assert!(matches!(store.namespace("no-dashes").await, Err(Error::InvalidNamespace(_))));
    }
}
