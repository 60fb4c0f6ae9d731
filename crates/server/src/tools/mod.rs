//! MCP tool implementations.
//!
//! This module contains all tools exposed by the sqlkv server.

pub mod kv;
