//! sqlkv MCP server entry point.
//!
//! Boots the MCP server on stdio transport over a single store opened from
//! `SQLKV_*` configuration. Logging goes to stderr to keep stdout free for
//! JSON-RPC.

use anyhow::Result;
use rmcp::service::serve_server;
use rmcp::transport::io::stdio;
use sqlkv_core::{KvStore, StoreConfig};
use tracing_subscriber::EnvFilter;

mod handler;
mod tools;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .json()
        .init();

    let config = StoreConfig::load()?;
    let store = KvStore::open(config).await?;

    tracing::info!(namespace = store.name(), "Starting sqlkv server on stdio transport");

    let handler = handler::SqlKvServer::new(store);
    let transport = stdio();
    let server = serve_server(handler, transport).await?;

    server.waiting().await?;

    Ok(())
}
