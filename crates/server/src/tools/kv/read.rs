//! kv_get, kv_mget and kv_ttl tool implementations.

use rmcp::{ErrorData as McpError, model::CallToolResult};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use sqlkv_core::{KvStore, Op, Reply};

use super::{json_result, run, unexpected};

/// Parameters for the kv_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvGetParams {
    /// Key to look up.
    pub key: String,
}

/// Output from the kv_get tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvGetOutput {
    pub key: String,
    /// Whether a live value was found.
    pub found: bool,
    pub value: Option<Value>,
}

/// Parameters for the kv_mget tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvMgetParams {
    /// Keys to look up; duplicates are allowed.
    pub keys: Vec<String>,
}

/// Output from the kv_mget tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvMgetOutput {
    /// One slot per requested key, in request order. Null where absent.
    pub values: Vec<Option<Value>>,
}

/// Parameters for the kv_ttl tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvTtlParams {
    pub key: String,
}

/// Output from the kv_ttl tool.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
pub struct KvTtlOutput {
    pub key: String,
    /// Remaining milliseconds; -1 when the key has no row.
    pub ttl_ms: i64,
}

/// Implementation of the kv_get tool.
pub async fn get_impl(store: &KvStore, params: KvGetParams) -> Result<CallToolResult, McpError> {
    let reply = run(store, Op::Get, vec![params.key.as_str().into()]).await?;
    let Reply::Value(value) = reply else {
        return Err(unexpected(Op::Get, &reply).into());
    };

    let output = KvGetOutput { key: params.key, found: value.is_some(), value };
    Ok(json_result(&output)?)
}

/// Implementation of the kv_mget tool.
pub async fn mget_impl(store: &KvStore, params: KvMgetParams) -> Result<CallToolResult, McpError> {
    let args = params.keys.into_iter().map(Into::into).collect();
    let reply = run(store, Op::Mget, args).await?;
    let Reply::Values(values) = reply else {
        return Err(unexpected(Op::Mget, &reply).into());
    };

    Ok(json_result(&KvMgetOutput { values })?)
}

/// Implementation of the kv_ttl tool.
pub async fn ttl_impl(store: &KvStore, params: KvTtlParams) -> Result<CallToolResult, McpError> {
    let reply = run(store, Op::Ttl, vec![params.key.as_str().into()]).await?;
    let Reply::Ttl(ttl_ms) = reply else {
        return Err(unexpected(Op::Ttl, &reply).into());
    };

    Ok(json_result(&KvTtlOutput { key: params.key, ttl_ms })?)
}
