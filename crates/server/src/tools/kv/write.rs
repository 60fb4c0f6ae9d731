//! kv_set and kv_mset tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlkv_core::{Arg, KvStore, Op, Reply};

use super::{json_result, run, unexpected};

/// Parameters for the kv_set tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvSetParams {
    pub key: String,

    /// Any JSON value.
    pub value: Value,

    /// Lifetime in milliseconds; the store default when omitted.
    /// Zero or negative stores an already-expired entry.
    #[serde(default)]
    pub ttl_ms: Option<i64>,
}

/// One key/value pair for kv_mset.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvEntry {
    pub key: String,
    pub value: Value,
}

/// Parameters for the kv_mset tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvMsetParams {
    /// Entries written atomically, sharing one expiration time.
    pub entries: Vec<KvEntry>,

    #[serde(default)]
    pub ttl_ms: Option<i64>,
}

/// Output from the write tools.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvWriteOutput {
    /// Number of entries written.
    pub written: usize,
}

/// Implementation of the kv_set tool.
pub async fn set_impl(store: &KvStore, params: KvSetParams) -> Result<CallToolResult, McpError> {
    let mut args = vec![Arg::from(params.key), Arg::from(params.value)];
    args.extend(params.ttl_ms.map(Arg::Ttl));

    let reply = run(store, Op::Set, args).await?;
    if reply != Reply::Stored {
        return Err(unexpected(Op::Set, &reply).into());
    }

    Ok(json_result(&KvWriteOutput { written: 1 })?)
}

/// Implementation of the kv_mset tool.
pub async fn mset_impl(store: &KvStore, params: KvMsetParams) -> Result<CallToolResult, McpError> {
    let written = params.entries.len();
    let mut args: Vec<Arg> = params
        .entries
        .into_iter()
        .flat_map(|entry| [Arg::from(entry.key), Arg::from(entry.value)])
        .collect();
    args.extend(params.ttl_ms.map(Arg::Ttl));

    let reply = run(store, Op::Mset, args).await?;
    if reply != Reply::Stored {
        return Err(unexpected(Op::Mset, &reply).into());
    }

    Ok(json_result(&KvWriteOutput { written })?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::kv::output_of;
    use serde_json::json;

    #[tokio::test]
    async fn test_set_impl() {
        let store = KvStore::open_in_memory().await.unwrap();
        let params = KvSetParams { key: "k".into(), value: json!([1, 2]), ttl_ms: Some(10_000) };

        let output: KvWriteOutput = output_of(&set_impl(&store, params).await.unwrap());
        assert_eq!(output.written, 1);
        assert_eq!(store.get::<Value>("k").await.unwrap(), Some(json!([1, 2])));
        assert!(store.ttl("k").await.unwrap() <= 10_000);
    }

    #[tokio::test]
    async fn test_set_impl_expired() {
        let store = KvStore::open_in_memory().await.unwrap();
        let params = KvSetParams { key: "k".into(), value: json!("v"), ttl_ms: Some(0) };

        set_impl(&store, params).await.unwrap();
        assert_eq!(store.get::<Value>("k").await.unwrap(), None);
    }

    #[tokio::test]
    async fn test_mset_impl() {
        let store = KvStore::open_in_memory().await.unwrap();
        let params = KvMsetParams {
            entries: vec![
                KvEntry { key: "k1".into(), value: json!(1) },
                KvEntry { key: "k2".into(), value: json!(2) },
            ],
            ttl_ms: None,
        };

        let output: KvWriteOutput = output_of(&mset_impl(&store, params).await.unwrap());
        assert_eq!(output.written, 2);

        let values: Vec<Option<i32>> = store.mget(&["k1", "k2"]).await.unwrap();
        assert_eq!(values, vec![Some(1), Some(2)]);
    }

    #[tokio::test]
    async fn test_mset_impl_empty() {
        let store = KvStore::open_in_memory().await.unwrap();
        let params = KvMsetParams { entries: Vec::new(), ttl_ms: None };

        let output: KvWriteOutput = output_of(&mset_impl(&store, params).await.unwrap());
        assert_eq!(output.written, 0);
    }
}
