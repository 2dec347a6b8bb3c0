use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::{anyhow, Result};
use async_trait::async_trait;

use btc_block_monitor::api::create_router;
use btc_block_monitor::db::BlockStore;
use btc_block_monitor::types::{BlockRecord, NewBlock};

/// Store that always serves the same latest row (or none).
struct FixedStore(Option<BlockRecord>);

#[async_trait]
impl BlockStore for FixedStore {
    async fn insert_block(&self, _block: &NewBlock) -> Result<BlockRecord> {
        Err(anyhow!("read-only test store"))
    }

    async fn latest_block(&self) -> Result<Option<BlockRecord>> {
        Ok(self.0.clone())
    }
}

/// Store whose queries always fail, like a dead database.
struct FailingStore;

#[async_trait]
impl BlockStore for FailingStore {
    async fn insert_block(&self, _block: &NewBlock) -> Result<BlockRecord> {
        Err(anyhow!("connection refused"))
    }

    async fn latest_block(&self) -> Result<Option<BlockRecord>> {
        Err(anyhow!("connection refused"))
    }
}

async fn spawn_server(store: Arc<dyn BlockStore>) -> Result<SocketAddr> {
    let router = create_router(store, "http://localhost:8080");
    let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await?;
    let addr = listener.local_addr()?;
    tokio::spawn(async move {
        axum::serve(listener, router).await.unwrap();
    });
    Ok(addr)
}

#[tokio::test]
async fn health_is_ok_even_with_dead_database() -> Result<()> {
    let addr = spawn_server(Arc::new(FailingStore)).await?;

    let response = reqwest::get(format!("http://{addr}/health")).await?;
    assert_eq!(response.status(), 200);
    assert_eq!(response.text().await?, "OK");

    Ok(())
}

#[tokio::test]
async fn latest_block_returns_stored_row() -> Result<()> {
    let row = BlockRecord {
        id: 7,
        hash: "abc123".to_string(),
        number: 700_000,
        timestamp: 1_672_531_200_000,
    };
    let addr = spawn_server(Arc::new(FixedStore(Some(row)))).await?;

    let response = reqwest::get(format!("http://{addr}/api/btc-block")).await?;
    assert_eq!(response.status(), 200);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["id"], 7);
    assert_eq!(body["hash"], "abc123");
    assert_eq!(body["number"], 700_000);
    assert_eq!(body["timestamp"], 1_672_531_200_000_i64);

    Ok(())
}

#[tokio::test]
async fn empty_table_is_404_with_fixed_message() -> Result<()> {
    let addr = spawn_server(Arc::new(FixedStore(None))).await?;

    let response = reqwest::get(format!("http://{addr}/api/btc-block")).await?;
    assert_eq!(response.status(), 404);

    let body: serde_json::Value = response.json().await?;
    assert_eq!(body["message"], "No block data found");

    Ok(())
}

#[tokio::test]
async fn query_failure_is_500_with_generic_message() -> Result<()> {
    let addr = spawn_server(Arc::new(FailingStore)).await?;

    let response = reqwest::get(format!("http://{addr}/api/btc-block")).await?;
    assert_eq!(response.status(), 500);

    let body: serde_json::Value = response.json().await?;
    // Generic body regardless of the underlying error's content
    assert_eq!(body["message"], "Internal Server Error");

    Ok(())
}

#[tokio::test]
async fn cors_allows_the_configured_origin() -> Result<()> {
    let addr = spawn_server(Arc::new(FixedStore(None))).await?;

    let client = reqwest::Client::new();
    let response = client
        .get(format!("http://{addr}/health"))
        .header("Origin", "http://localhost:8080")
        .send()
        .await?;

    assert_eq!(
        response
            .headers()
            .get("access-control-allow-origin")
            .and_then(|v| v.to_str().ok()),
        Some("http://localhost:8080")
    );

    Ok(())
}
