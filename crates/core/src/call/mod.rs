//! Dynamic call surface over a [`KvStore`].
//!
//! Callers that build argument lists at runtime (bindings, tool adapters)
//! pass tagged [`Arg`]s. [`normalize`] turns them into a [`Request`] and
//! [`bridge`] delivers the result either to a completion handler or through a
//! future. Typed Rust callers can use the `async fn`s on [`KvStore`]
//! directly; both paths run the same engine operations.

pub mod bridge;
pub mod normalize;

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::Error;
use crate::store::KvStore;
use bridge::{Completion, Dispatch};
use normalize::Request;

/// Store operation selected by a dynamic call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum Op {
    Get,
    Set,
    Mget,
    Mset,
    Del,
    Reset,
    Ttl,
}

impl fmt::Display for Op {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Op::Get => "get",
            Op::Set => "set",
            Op::Mget => "mget",
            Op::Mset => "mset",
            Op::Del => "del",
            Op::Reset => "reset",
            Op::Ttl => "ttl",
        };
        f.write_str(name)
    }
}

/// Per-call options.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
pub struct CallOptions {
    /// Entry lifetime in milliseconds. An explicit [`Arg::Ttl`] takes
    /// precedence.
    #[serde(default)]
    pub ttl: Option<i64>,
}

/// One argument of a dynamic call.
pub enum Arg {
    /// A key, a value, or an array of keys for `mget`.
    Value(Value),
    /// Explicit ttl in milliseconds.
    Ttl(i64),
    Options(CallOptions),
    Completion(Completion<Reply>),
}

impl Arg {
    pub fn completion(done: impl FnOnce(Result<Reply, Error>) + Send + 'static) -> Self {
        Arg::Completion(Box::new(done))
    }
}

impl fmt::Debug for Arg {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Arg::Value(v) => f.debug_tuple("Value").field(v).finish(),
            Arg::Ttl(ms) => f.debug_tuple("Ttl").field(ms).finish(),
            Arg::Options(o) => f.debug_tuple("Options").field(o).finish(),
            Arg::Completion(_) => f.write_str("Completion"),
        }
    }
}

impl From<Value> for Arg {
    fn from(value: Value) -> Self {
        Arg::Value(value)
    }
}

impl From<&str> for Arg {
    fn from(value: &str) -> Self {
        Arg::Value(Value::String(value.to_string()))
    }
}

impl From<String> for Arg {
    fn from(value: String) -> Self {
        Arg::Value(Value::String(value))
    }
}

impl From<CallOptions> for Arg {
    fn from(options: CallOptions) -> Self {
        Arg::Options(options)
    }
}

/// Result of a dynamic call.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, schemars::JsonSchema)]
#[serde(rename_all = "snake_case", tag = "kind", content = "result")]
pub enum Reply {
    /// `get`
    Value(Option<Value>),
    /// `mget`, aligned with the requested keys
    Values(Vec<Option<Value>>),
    /// `set` / `mset`
    Stored,
    /// `del`: whether a row was removed
    Deleted(bool),
    /// `reset`: number of removed rows
    Cleared(u64),
    /// `ttl`: remaining milliseconds, or -1
    Ttl(i64),
}

impl KvStore {
    /// Run `op` with a loosely shaped argument list.
    ///
    /// With an [`Arg::Completion`] the result goes to that handler and
    /// [`Dispatch::Handled`] is returned; otherwise a [`Dispatch::Pending`]
    /// future resolves with it. Argument errors travel the same way.
    ///
    /// Must be called from within a tokio runtime.
    pub fn call(&self, op: Op, args: Vec<Arg>) -> Dispatch<Reply> {
        let (completion, request) = normalize::normalize(op, args);
        let store = self.clone();
        let work = async move {
            match request {
                Ok(request) => store.execute(request).await,
                Err(e) => Err(e),
            }
        };
        bridge::dispatch(work, completion)
    }

    /// Run a normalized request against this namespace.
    pub async fn execute(&self, request: Request) -> Result<Reply, Error> {
        let Request { op, keys, values, ttl } = request;
        match op {
            Op::Get | Op::Mget => {
                let mut found = self.mget_values(keys).await?;
                if op == Op::Get {
                    Ok(Reply::Value(found.pop().flatten()))
                } else {
                    Ok(Reply::Values(found))
                }
            }
            Op::Set | Op::Mset => {
                self.mset_values(keys.into_iter().zip(values).collect(), ttl).await?;
                Ok(Reply::Stored)
            }
            Op::Del => Ok(Reply::Deleted(self.del(first_key(&keys)?).await?)),
            Op::Reset => Ok(Reply::Cleared(self.reset().await?)),
            Op::Ttl => Ok(Reply::Ttl(self.ttl(first_key(&keys)?).await?)),
        }
    }
}

fn first_key(keys: &[String]) -> Result<&str, Error> {
    keys.first()
        .map(String::as_str)
        .ok_or_else(|| Error::InvalidInput("missing key".to_string()))
}
