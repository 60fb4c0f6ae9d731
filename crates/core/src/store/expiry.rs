//! Read-time staleness filter and opportunistic purge.
//!
//! There is no timer. Batch reads drop rows whose `expire_at` is not in the
//! future, and when they drop anything they hand a `DELETE` to the
//! connection as a detached task.

use std::collections::HashMap;
use std::sync::Arc;

use tokio_rusqlite::{Connection, params};

use crate::Error;

/// A row as read from a namespace table, before any filtering.
#[derive(Debug, Clone)]
pub(crate) struct RawRow {
    pub key: String,
    pub val: Option<Vec<u8>>,
    pub expire_at: i64,
}

/// Fresh payloads by key, plus how many rows were stale.
#[derive(Debug, Default)]
pub(crate) struct Filtered {
    pub fresh: HashMap<String, Option<Vec<u8>>>,
    pub stale: usize,
}

/// Current time in milliseconds since the epoch.
pub(crate) fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// An entry is live only while `expire_at` is strictly after `now`.
pub(crate) fn is_fresh(expire_at: i64, now: i64) -> bool {
    expire_at > now
}

/// Split raw rows into live payloads and a stale count.
pub(crate) fn filter(rows: Vec<RawRow>, now: i64) -> Filtered {
    let total = rows.len();
    let fresh: HashMap<_, _> = rows
        .into_iter()
        .filter(|row| is_fresh(row.expire_at, now))
        .map(|row| (row.key, row.val))
        .collect();
    let stale = total - fresh.len();
    Filtered { fresh, stale }
}

/// Delete every row of `table` that expired before `now`.
///
/// Returns the number of deleted rows.
pub(crate) async fn purge(conn: &Connection, table: &str, now: i64) -> Result<u64, Error> {
    let sql = format!("DELETE FROM \"{table}\" WHERE expire_at < ?1");
    conn.call(move |conn| -> Result<u64, Error> {
        let count = conn.execute(&sql, params![now])?;
        Ok(count as u64)
    })
    .await
    .map_err(Error::from)
}

/// Queue a purge of `table` without waiting for it.
///
/// Failures are logged and dropped. Outside a tokio runtime nothing is
/// scheduled; the next read on a runtime will try again.
pub(crate) fn schedule_purge(conn: Connection, table: Arc<str>) {
    let Ok(handle) = tokio::runtime::Handle::try_current() else {
        tracing::debug!(table = %table, "No runtime available, skipping background purge");
        return;
    };

    handle.spawn(async move {
        match purge(&conn, &table, now_ms()).await {
            Ok(deleted) => tracing::debug!(table = %table, deleted, "Purged expired entries"),
            Err(e) => tracing::debug!(table = %table, error = %e, "Background purge failed"),
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(key: &str, expire_at: i64) -> RawRow {
        RawRow { key: key.to_string(), val: Some(key.as_bytes().to_vec()), expire_at }
    }

    #[test]
    fn test_freshness_boundary() {
        assert!(is_fresh(1001, 1000));
        assert!(!is_fresh(1000, 1000));
        assert!(!is_fresh(999, 1000));
    }

    #[test]
    fn test_filter_counts_stale() {
        let rows = vec![row("a", 2000), row("b", 500), row("c", 1000)];
        let filtered = filter(rows, 1000);

        assert_eq!(filtered.stale, 2);
        assert_eq!(filtered.fresh.len(), 1);
        assert_eq!(filtered.fresh.get("a"), Some(&Some(b"a".to_vec())));
    }

    #[test]
    fn test_filter_keeps_sentinel_rows() {
        let rows = vec![RawRow { key: "k".into(), val: None, expire_at: 5000 }];
        let filtered = filter(rows, 1000);

        assert_eq!(filtered.stale, 0);
        assert_eq!(filtered.fresh.get("k"), Some(&None));
    }

    #[tokio::test]
    async fn test_purge_removes_only_expired() {
        let conn = Connection::open_in_memory().await.unwrap();
        super::super::schema::ensure(&conn, "kv", false).await.unwrap();
        conn.call(|conn| {
            conn.execute_batch(
                "INSERT INTO kv (key, val, created_at, expire_at) VALUES ('old', NULL, 0, 10);
                 INSERT INTO kv (key, val, created_at, expire_at) VALUES ('new', NULL, 0, 5000);",
            )
        })
        .await
        .unwrap();

        let deleted = purge(&conn, "kv", 1000).await.unwrap();
        assert_eq!(deleted, 1);

        let remaining: i64 = conn
            .call(|conn| conn.query_row("SELECT COUNT(*) FROM kv", [], |row| row.get(0)))
            .await
            .unwrap();
        assert_eq!(remaining, 1);
    }
}
