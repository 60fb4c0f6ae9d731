//! Get/set/delete operations on a namespace.
//!
//! Values cross the codec boundary as [`serde_json::Value`]. Typed methods
//! convert through it; the dynamic call layer uses the raw `*_values`
//! methods directly.

use std::collections::HashSet;

use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tokio_rusqlite::params;
use tokio_rusqlite::rusqlite::{self, ToSql};

use super::KvStore;
use super::expiry::{self, RawRow};
use crate::Error;

/// Rows per INSERT statement; 4 bound parameters each stays under SQLite's
/// historical limit of 999 variables.
const MAX_ROWS_PER_STATEMENT: usize = 249;

/// Keys per `IN (...)` lookup.
const MAX_KEYS_PER_SELECT: usize = 999;

/// A key and its encoded payload. `None` is the unencodable sentinel.
type EncodedRow = (String, Option<Vec<u8>>);

impl KvStore {
    /// Get a live value by key.
    ///
    /// Returns None if the key is missing, expired, or its payload cannot be
    /// decoded into `T`.
    pub async fn get<T: DeserializeOwned>(&self, key: &str) -> Result<Option<T>, Error> {
        let mut values = self.mget::<T, _>(&[key]).await?;
        Ok(values.pop().flatten())
    }

    /// Get several values at once.
    ///
    /// The result has one slot per input key, in input order, duplicates
    /// included.
    pub async fn mget<T: DeserializeOwned, K: AsRef<str>>(&self, keys: &[K]) -> Result<Vec<Option<T>>, Error> {
        let keys = keys.iter().map(|k| k.as_ref().to_string()).collect();
        let values = self.mget_values(keys).await?;
        Ok(values
            .into_iter()
            .map(|value| value.and_then(|v| self.into_typed(v)))
            .collect())
    }

    /// Insert or replace one entry.
    ///
    /// `ttl_ms` falls back to the namespace default. A value that cannot be
    /// encoded is stored as the sentinel and reads back as None.
    pub async fn set<V: Serialize + ?Sized>(&self, key: &str, value: &V, ttl_ms: Option<i64>) -> Result<(), Error> {
        let payload = self.encode(key, value);
        self.write_rows(vec![(key.to_string(), payload)], ttl_ms).await
    }

    /// Insert or replace many entries in one statement.
    ///
    /// Every entry of the batch shares the same `created_at` and `expire_at`.
    pub async fn mset<K: AsRef<str>, V: Serialize>(&self, entries: &[(K, V)], ttl_ms: Option<i64>) -> Result<(), Error> {
        let rows = entries
            .iter()
            .map(|(key, value)| (key.as_ref().to_string(), self.encode(key.as_ref(), value)))
            .collect();
        self.write_rows(rows, ttl_ms).await
    }

    /// Delete one entry.
    ///
    /// Returns whether a row was removed; a missing key is not an error.
    pub async fn del(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        let sql = format!("DELETE FROM \"{}\" WHERE key = ?1", self.table);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let count = conn.execute(&sql, params![key])?;
                Ok(count > 0)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete every entry in the namespace.
    ///
    /// Returns the number of deleted entries.
    pub async fn reset(&self) -> Result<u64, Error> {
        let sql = format!("DELETE FROM \"{}\"", self.table);
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute(&sql, [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    /// Remaining lifetime of a key in milliseconds.
    ///
    /// Reads the raw row, so an expired entry that has not been purged yet
    /// reports a value `<= 0`. A key with no row reports `-1`.
    pub async fn ttl(&self, key: &str) -> Result<i64, Error> {
        let key = key.to_string();
        let sql = format!("SELECT expire_at FROM \"{}\" WHERE key = ?1", self.table);
        let expire_at = self
            .conn
            .call(move |conn| -> Result<Option<i64>, Error> {
                let result = conn.query_row(&sql, params![key], |row| row.get(0));

                match result {
                    Ok(expire_at) => Ok(Some(expire_at)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await?;

        Ok(expire_at.map_or(-1, |at| at.saturating_sub(expiry::now_ms())))
    }

    /// Check if a key exists and is fresh.
    pub async fn has(&self, key: &str) -> Result<bool, Error> {
        let key = key.to_string();
        let now = expiry::now_ms();
        let sql = format!("SELECT EXISTS(SELECT 1 FROM \"{}\" WHERE key = ?1 AND expire_at > ?2)", self.table);
        self.conn
            .call(move |conn| -> Result<bool, Error> {
                let fresh: bool = conn
                    .query_row(&sql, params![key, now], |row| row.get(0))
                    .map_err(Error::from)?;
                Ok(fresh)
            })
            .await
            .map_err(Error::from)
    }

    /// Delete expired entries now instead of waiting for a read to notice.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        expiry::purge(&self.conn, &self.table, expiry::now_ms()).await
    }

    /// Batch read on decoded values; the single path behind every read.
    pub(crate) async fn mget_values(&self, keys: Vec<String>) -> Result<Vec<Option<Value>>, Error> {
        if keys.is_empty() {
            return Ok(Vec::new());
        }

        let mut seen = HashSet::new();
        let unique: Vec<String> = keys.iter().filter(|k| seen.insert(k.as_str())).cloned().collect();
        let table = self.table.clone();

        let rows = self
            .conn
            .call(move |conn| -> Result<Vec<RawRow>, Error> {
                let mut rows = Vec::with_capacity(unique.len());
                for chunk in unique.chunks(MAX_KEYS_PER_SELECT) {
                    let placeholders = vec!["?"; chunk.len()].join(", ");
                    let sql = format!("SELECT key, val, expire_at FROM \"{table}\" WHERE key IN ({placeholders})");
                    let mut stmt = conn.prepare(&sql)?;
                    let fetched = stmt
                        .query_map(rusqlite::params_from_iter(chunk), |row| {
                            Ok(RawRow { key: row.get(0)?, val: row.get(1)?, expire_at: row.get(2)? })
                        })?
                        .collect::<Result<Vec<_>, _>>()?;
                    rows.extend(fetched);
                }
                Ok(rows)
            })
            .await?;

        let filtered = expiry::filter(rows, expiry::now_ms());
        if filtered.stale > 0 {
            tracing::debug!(table = %self.table, stale = filtered.stale, "Stale entries observed");
            expiry::schedule_purge(self.conn.clone(), self.table.clone());
        }

        Ok(keys
            .iter()
            .map(|key| match filtered.fresh.get(key) {
                Some(Some(bytes)) => self.decode(key, bytes),
                _ => None,
            })
            .collect())
    }

    /// Upsert already-decoded values; used by the dynamic call layer.
    pub(crate) async fn mset_values(&self, entries: Vec<(String, Value)>, ttl_ms: Option<i64>) -> Result<(), Error> {
        let rows = entries
            .into_iter()
            .map(|(key, value)| {
                let payload = self.encode_value(&key, &value);
                (key, payload)
            })
            .collect();
        self.write_rows(rows, ttl_ms).await
    }

    async fn write_rows(&self, rows: Vec<EncodedRow>, ttl_ms: Option<i64>) -> Result<(), Error> {
        if rows.is_empty() {
            return Ok(());
        }

        let created_at = expiry::now_ms();
        let expire_at = created_at.saturating_add(ttl_ms.unwrap_or(self.default_ttl));
        let table = self.table.clone();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                if rows.len() <= MAX_ROWS_PER_STATEMENT {
                    insert_rows(conn, &table, &rows, created_at, expire_at)?;
                } else {
                    let tx = conn.transaction()?;
                    for chunk in rows.chunks(MAX_ROWS_PER_STATEMENT) {
                        insert_rows(&tx, &table, chunk, created_at, expire_at)?;
                    }
                    tx.commit()?;
                }
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    fn encode<V: Serialize + ?Sized>(&self, key: &str, value: &V) -> Option<Vec<u8>> {
        match serde_json::to_value(value) {
            Ok(value) => self.encode_value(key, &value),
            Err(e) => {
                tracing::warn!(table = %self.table, key, error = %e, "Value is not serializable, storing sentinel");
                None
            }
        }
    }

    fn encode_value(&self, key: &str, value: &Value) -> Option<Vec<u8>> {
        match self.codec.encode(value) {
            Ok(bytes) => Some(bytes),
            Err(e) => {
                tracing::warn!(table = %self.table, key, codec = self.codec.name(), error = %e, "Encoding failed, storing sentinel");
                None
            }
        }
    }

    fn decode(&self, key: &str, bytes: &[u8]) -> Option<Value> {
        match self.codec.decode(bytes) {
            Ok(value) => Some(value),
            Err(e) => {
                tracing::warn!(table = %self.table, key, codec = self.codec.name(), error = %e, "Decoding failed, treating as absent");
                None
            }
        }
    }

    fn into_typed<T: DeserializeOwned>(&self, value: Value) -> Option<T> {
        match serde_json::from_value(value) {
            Ok(typed) => Some(typed),
            Err(e) => {
                tracing::warn!(table = %self.table, error = %e, "Stored value does not match requested type");
                None
            }
        }
    }
}

/// One multi-row `INSERT OR REPLACE` for `rows`.
fn insert_rows(
    conn: &rusqlite::Connection, table: &str, rows: &[EncodedRow], created_at: i64, expire_at: i64,
) -> Result<usize, rusqlite::Error> {
    let values = vec!["(?, ?, ?, ?)"; rows.len()].join(", ");
    let sql = format!("INSERT OR REPLACE INTO \"{table}\" (key, val, created_at, expire_at) VALUES {values}");

    let mut bound: Vec<&dyn ToSql> = Vec::with_capacity(rows.len() * 4);
    for (key, val) in rows {
        bound.push(key);
        bound.push(val);
        bound.push(&created_at);
        bound.push(&expire_at);
    }

    conn.execute(&sql, bound.as_slice())
}
