//! Namespace table lifecycle.
//!
//! Every namespace is one table plus an index on `expire_at`. Creation uses
//! `IF NOT EXISTS` so it can run on every open.

use tokio_rusqlite::{Connection, params};

use crate::Error;

/// DDL for one namespace. `name` must already be a validated identifier.
pub fn create_sql(name: &str) -> String {
    format!(
        "CREATE TABLE IF NOT EXISTS \"{name}\" (key TEXT PRIMARY KEY, val BLOB, created_at INTEGER, expire_at INTEGER);
         CREATE INDEX IF NOT EXISTS \"idx_expire_{name}\" ON \"{name}\" (expire_at);"
    )
}

/// Make sure the namespace table and its expiration index exist.
///
/// On a read-only connection nothing is created; the table must already be
/// there.
///
/// # Errors
///
/// Returns `Error::SchemaFailed` if the DDL fails or, when `read_only`, the
/// table is missing.
pub async fn ensure(conn: &Connection, name: &str, read_only: bool) -> Result<(), Error> {
    if read_only {
        return if table_exists(conn, name).await? {
            Ok(())
        } else {
            Err(Error::SchemaFailed(format!("table {name} does not exist in read-only database")))
        };
    }

    let sql = create_sql(name);
    conn.call(move |conn| -> Result<(), Error> {
        conn.execute_batch(&sql)
            .map_err(|e| Error::SchemaFailed(e.to_string()))
    })
    .await
    .map_err(Error::from)
}

/// Whether a table called `name` exists.
pub async fn table_exists(conn: &Connection, name: &str) -> Result<bool, Error> {
    let name = name.to_string();
    conn.call(move |conn| -> Result<bool, Error> {
        let exists: bool = conn
            .query_row(
                "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name=?1)",
                params![name],
                |row| row.get(0),
            )
            .map_err(Error::from)?;
        Ok(exists)
    })
    .await
    .map_err(Error::from)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tokio_rusqlite::rusqlite;

    #[tokio::test]
    async fn test_ensure_idempotent() {
        let conn = Connection::open_in_memory().await.unwrap();
        ensure(&conn, "kv", false).await.unwrap();
        ensure(&conn, "kv", false).await.unwrap();

        assert!(table_exists(&conn, "kv").await.unwrap());
    }

    #[tokio::test]
    async fn test_schema_shape() {
        let conn = Connection::open_in_memory().await.unwrap();
        ensure(&conn, "kv", false).await.unwrap();

        let columns: Vec<(String, String, bool)> = conn
            .call(|conn| -> Result<_, rusqlite::Error> {
                let mut stmt = conn.prepare("SELECT name, type, pk FROM pragma_table_info('kv') ORDER BY cid")?;
                let rows = stmt
                    .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get::<_, i64>(2)? == 1)))?
                    .collect::<Result<Vec<_>, _>>()?;
                Ok(rows)
            })
            .await
            .unwrap();

        assert_eq!(
            columns,
            vec![
                ("key".to_string(), "TEXT".to_string(), true),
                ("val".to_string(), "BLOB".to_string(), false),
                ("created_at".to_string(), "INTEGER".to_string(), false),
                ("expire_at".to_string(), "INTEGER".to_string(), false),
            ]
        );

        let has_index: bool = conn
            .call(|conn| {
                conn.query_row(
                    "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='index' AND name='idx_expire_kv')",
                    [],
                    |row| row.get(0),
                )
            })
            .await
            .unwrap();
        assert!(has_index);
    }

    #[tokio::test]
    async fn test_namespaces_independent() {
        let conn = Connection::open_in_memory().await.unwrap();
        ensure(&conn, "alpha", false).await.unwrap();

        assert!(table_exists(&conn, "alpha").await.unwrap());
        assert!(!table_exists(&conn, "beta").await.unwrap());

        ensure(&conn, "beta", false).await.unwrap();
        assert!(table_exists(&conn, "beta").await.unwrap());
    }

    #[tokio::test]
    async fn test_read_only_missing_table() {
        let conn = Connection::open_in_memory().await.unwrap();
        let result = ensure(&conn, "kv", true).await;
        assert!(matches!(result, Err(Error::SchemaFailed(_))));
    }
}
