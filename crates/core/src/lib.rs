//! Core of sqlkv: an expiring key-value store on SQLite.
//!
//! This crate provides:
//! - Namespaced key-value storage with per-entry ttl
//! - Pluggable value codecs
//! - A dynamic call surface with completion-or-future delivery
//! - Unified error types
//! - Configuration structures

pub mod call;
pub mod codec;
pub mod config;
pub mod error;
pub mod store;

pub use call::bridge::{Completion, Dispatch, Pending};
pub use call::normalize::Request;
pub use call::{Arg, CallOptions, Op, Reply};
pub use codec::{Codec, CodecError, JsonCodec, MessagePackCodec, Serializer};
pub use config::{ConfigError, OpenMode, StoreConfig};
pub use error::Error;
pub use store::{KvStore, StoreBuilder};
