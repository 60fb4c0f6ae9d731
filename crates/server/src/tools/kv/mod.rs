//! Key-value MCP tools.
//!
//! Each tool builds a dynamic call against the store and renders the reply
//! as pretty JSON text content.

pub mod read;
pub mod remove;
pub mod write;

pub use read::{KvGetParams, KvMgetParams, KvTtlParams, get_impl, mget_impl, ttl_impl};
pub use remove::{KvDeleteParams, delete_impl, purge_impl, reset_impl};
pub use write::{KvMsetParams, KvSetParams, mset_impl, set_impl};

use rmcp::model::{CallToolResult, Content};
use serde::Serialize;
use sqlkv_core::{Arg, Dispatch, Error, KvStore, Op, Reply};

/// Run a dynamic call and wait for its reply.
pub(crate) async fn run(store: &KvStore, op: Op, args: Vec<Arg>) -> Result<Reply, Error> {
    match store.call(op, args) {
        Dispatch::Pending(pending) => pending.await,
        Dispatch::Handled => Err(Error::InvalidInput(format!("{op} was routed to a completion handler"))),
    }
}

pub(crate) fn unexpected(op: Op, reply: &Reply) -> Error {
    Error::InvalidInput(format!("unexpected reply to {op}: {reply:?}"))
}

pub(crate) fn json_result<T: Serialize>(output: &T) -> Result<CallToolResult, Error> {
    let json = serde_json::to_string_pretty(output)
        .map_err(|e| Error::InvalidInput(format!("Failed to serialize output: {e}")))?;

    Ok(CallToolResult::success(vec![Content::text(json)]))
}

#[cfg(test)]
pub(crate) fn output_of<T: serde::de::DeserializeOwned>(result: &CallToolResult) -> T {
    let content_val = serde_json::to_value(&result.content[0]).unwrap();
    let text = content_val
        .get("text")
        .and_then(|v| v.as_str())
        .expect("Expected text field in content");
    serde_json::from_str(text).unwrap()
}
