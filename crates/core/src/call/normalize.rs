//! Resolve a tagged argument list into a fixed-shape [`Request`].
//!
//! Trailing arguments may come in any order:
//! - the last [`Arg::Completion`] is the completion handler
//! - the first [`Arg::Ttl`] is the explicit ttl
//! - the first [`Arg::Options`] is the options struct
//!
//! Whatever is left are positional [`Arg::Value`]s, checked per [`Op`].

use serde_json::Value;

use super::bridge::Completion;
use super::{Arg, CallOptions, Op, Reply};
use crate::Error;

/// Canonical form of a call, independent of how its arguments were laid out.
#[derive(Debug, Clone, PartialEq)]
pub struct Request {
    pub op: Op,
    /// One key for single-key ops, every key for `mget`/`mset`.
    pub keys: Vec<String>,
    /// Values aligned with `keys` for `set`/`mset`, empty otherwise.
    pub values: Vec<Value>,
    /// Explicit ttl, or the options ttl; `None` means the namespace default.
    pub ttl: Option<i64>,
}

/// Split off the completion and resolve the rest.
///
/// The completion comes back even when resolution fails so the error can be
/// delivered through it.
pub fn normalize(op: Op, args: Vec<Arg>) -> (Option<Completion<Reply>>, Result<Request, Error>) {
    let mut completions = Vec::new();
    let mut ttl = None;
    let mut options: Option<CallOptions> = None;
    let mut positional = Vec::new();

    for arg in args {
        match arg {
            Arg::Completion(done) => completions.push(done),
            Arg::Ttl(ms) => {
                ttl.get_or_insert(ms);
            }
            Arg::Options(opts) => {
                options.get_or_insert(opts);
            }
            Arg::Value(value) => positional.push(value),
        }
    }

    let extra_completions = completions.len().saturating_sub(1);
    let completion = completions.pop();
    if extra_completions > 0 {
        let err = Error::InvalidInput(format!("{op} accepts one completion handler, got {}", extra_completions + 1));
        return (completion, Err(err));
    }

    let ttl = ttl.or_else(|| options.and_then(|o| o.ttl));
    (completion, resolve(op, positional, ttl))
}

fn resolve(op: Op, positional: Vec<Value>, ttl: Option<i64>) -> Result<Request, Error> {
    let (keys, values) = match op {
        Op::Get | Op::Del | Op::Ttl => {
            let [key] = exactly::<1>(op, positional)?;
            (vec![key_of(op, key)?], Vec::new())
        }
        Op::Set => {
            let [key, value] = exactly::<2>(op, positional)?;
            (vec![key_of(op, key)?], vec![value])
        }
        Op::Mget => (flatten_keys(op, positional)?, Vec::new()),
        Op::Mset => split_pairs(positional)?,
        Op::Reset => {
            let [] = exactly::<0>(op, positional)?;
            (Vec::new(), Vec::new())
        }
    };

    Ok(Request { op, keys, values, ttl })
}

fn exactly<const N: usize>(op: Op, positional: Vec<Value>) -> Result<[Value; N], Error> {
    let count = positional.len();
    positional
        .try_into()
        .map_err(|_| Error::InvalidInput(format!("{op} expects {N} positional arguments, got {count}")))
}

fn key_of(op: Op, value: Value) -> Result<String, Error> {
    match value {
        Value::String(key) => Ok(key),
        other => Err(Error::InvalidInput(format!("{op} key must be a string, got {other}"))),
    }
}

fn flatten_keys(op: Op, positional: Vec<Value>) -> Result<Vec<String>, Error> {
    let mut keys = Vec::with_capacity(positional.len());
    for value in positional {
        match value {
            Value::Array(items) => {
                for item in items {
                    keys.push(key_of(op, item)?);
                }
            }
            other => keys.push(key_of(op, other)?),
        }
    }
    Ok(keys)
}

fn split_pairs(positional: Vec<Value>) -> Result<(Vec<String>, Vec<Value>), Error> {
    if positional.len() % 2 != 0 {
        return Err(Error::MalformedPairs { count: positional.len() });
    }

    let mut keys = Vec::with_capacity(positional.len() / 2);
    let mut values = Vec::with_capacity(positional.len() / 2);
    let mut items = positional.into_iter();
    while let (Some(key), Some(value)) = (items.next(), items.next()) {
        keys.push(key_of(Op::Mset, key)?);
        values.push(value);
    }
    Ok((keys, values))
}
