use anyhow::{Context, Result};
use async_trait::async_trait;
use sqlx::migrate::MigrateDatabase;
use sqlx::postgres::PgPoolOptions;
use sqlx::{PgPool, Postgres};
use tracing::info;

use crate::types::{BlockRecord, NewBlock};

const CREATE_BLOCKS_TABLE: &str = r#"
CREATE TABLE IF NOT EXISTS btc_blocks (
    id SERIAL PRIMARY KEY,
    hash TEXT NOT NULL,
    number BIGINT NOT NULL,
    "timestamp" BIGINT NOT NULL
)
"#;

/// Ensure the target database and the `btc_blocks` table exist, then hand
/// back the shared pool. Idempotent; safe to run on every process start.
pub async fn bootstrap(db_url: &str, max_connections: u32) -> Result<PgPool> {
    if !Postgres::database_exists(db_url)
        .await
        .context("failed to check database existence")?
    {
        info!("Target database does not exist, creating it");
        Postgres::create_database(db_url)
            .await
            .context("failed to create database")?;
    }

    let pool = PgPoolOptions::new()
        .max_connections(max_connections)
        .connect(db_url)
        .await
        .context("failed to connect to database")?;

    sqlx::query(CREATE_BLOCKS_TABLE)
        .execute(&pool)
        .await
        .context("failed to ensure btc_blocks table")?;

    info!("Database bootstrap complete");
    Ok(pool)
}

/// Pool that connects on first use. Used when bootstrap fails in test mode,
/// so request-path queries surface errors as HTTP 500s instead of aborting
/// the process at startup.
pub fn lazy_pool(db_url: &str, max_connections: u32) -> Result<PgPool> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .connect_lazy(db_url)
        .context("invalid database URL")
}

/// Storage seam shared by the poller (writes) and the API server (reads).
#[async_trait]
pub trait BlockStore: Send + Sync {
    async fn insert_block(&self, block: &NewBlock) -> Result<BlockRecord>;
    async fn latest_block(&self) -> Result<Option<BlockRecord>>;
}

pub struct PgBlockStore {
    pool: PgPool,
}

impl PgBlockStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl BlockStore for PgBlockStore {
    async fn insert_block(&self, block: &NewBlock) -> Result<BlockRecord> {
        let row = sqlx::query_as::<_, BlockRecord>(
            r#"INSERT INTO btc_blocks (hash, number, "timestamp") VALUES ($1, $2, $3) RETURNING *"#,
        )
        .bind(&block.hash)
        .bind(block.number)
        .bind(block.timestamp)
        .fetch_one(&self.pool)
        .await
        .context("failed to insert block")?;
        Ok(row)
    }

    async fn latest_block(&self) -> Result<Option<BlockRecord>> {
        let row = sqlx::query_as::<_, BlockRecord>(
            "SELECT * FROM btc_blocks ORDER BY id DESC LIMIT 1",
        )
        .fetch_optional(&self.pool)
        .await
        .context("failed to query latest block")?;
        Ok(row)
    }
}
