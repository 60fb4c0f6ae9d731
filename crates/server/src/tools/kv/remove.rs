//! kv_delete, kv_reset and kv_purge tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use sqlkv_core::{KvStore, Op, Reply};

use super::{json_result, run, unexpected};

/// Parameters for the kv_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvDeleteParams {
    pub key: String,
}

/// Output from the kv_delete tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvDeleteOutput {
    /// False when the key was already absent.
    pub deleted: bool,
}

/// Output from the kv_reset and kv_purge tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvRemovedOutput {
    /// Number of entries deleted.
    pub deleted: u64,
}

/// Implementation of the kv_delete tool.
pub async fn delete_impl(store: &KvStore, params: KvDeleteParams) -> Result<CallToolResult, McpError> {
    let reply = run(store, Op::Del, vec![params.key.into()]).await?;
    let Reply::Deleted(deleted) = reply else {
        return Err(unexpected(Op::Del, &reply).into());
    };

    Ok(json_result(&KvDeleteOutput { deleted })?)
}

/// Implementation of the kv_reset tool.
pub async fn reset_impl(store: &KvStore) -> Result<CallToolResult, McpError> {
    let reply = run(store, Op::Reset, Vec::new()).await?;
    let Reply::Cleared(deleted) = reply else {
        return Err(unexpected(Op::Reset, &reply).into());
    };

    Ok(json_result(&KvRemovedOutput { deleted })?)
}

/// Implementation of the kv_purge tool.
pub async fn purge_impl(store: &KvStore) -> Result<CallToolResult, McpError> {
    let deleted = store.purge_expired().await?;
    Ok(json_result(&KvRemovedOutput { deleted })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::kv::output_of;

    #[tokio::test]
    async fn test_delete_impl() {
        let store = KvStore::open_in_memory().await.unwrap();
        store.set("k", &1, None).await.unwrap();

        let output: KvDeleteOutput = output_of(&delete_impl(&store, KvDeleteParams { key: "k".into() }).await.unwrap());
        assert!(output.deleted);

        let output: KvDeleteOutput = output_of(&delete_impl(&store, KvDeleteParams { key: "k".into() }).await.unwrap());
        assert!(!output.deleted);
    }

    #[tokio::test]
    async fn test_reset_impl() {
        let store = KvStore::open_in_memory().await.unwrap();
        store.mset(&[("a", 1), ("b", 2), ("c", 3)], None).await.unwrap();

        let output: KvRemovedOutput = output_of(&reset_impl(&store).await.unwrap());
        assert_eq!(output.deleted, 3);
        assert_eq!(store.get::<i32>("a").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_purge_impl() {
        let store = KvStore::open_in_memory().await.unwrap();
        store.set("old", &1, Some(-100)).await.unwrap();
        store.set("new", &2, None).await.unwrap();

        let output: KvRemovedOutput = output_of(&purge_impl(&store).await.unwrap());
        assert_eq!(output.deleted, 1);
        assert_eq!(store.get::<i32>("new").await.unwrap(), Some(2));
    }
}
