use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use tokio::time::{interval, MissedTickBehavior};
use tracing::{error, info};

use crate::db::BlockStore;
use crate::fetcher::BlockFetcher;
use crate::types::BlockRecord;

/// Drive the fetch-and-persist cycle on a fixed interval, forever. Each
/// cycle is awaited inline, so ticks never overlap; an overlong cycle
/// delays the next tick instead of stacking. Failures are logged and the
/// next tick runs unconditionally.
pub async fn run(fetcher: BlockFetcher, store: Arc<dyn BlockStore>, period: Duration) {
    let mut ticker = interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    info!("Starting block poller with interval {:?}", period);

    loop {
        ticker.tick().await;

        match run_cycle(&fetcher, store.as_ref()).await {
            Ok(block) => {
                info!(
                    "Stored block {} (height {}, timestamp {})",
                    block.hash, block.number, block.timestamp
                );
            }
            Err(e) => {
                error!("Poll cycle failed: {e:#}");
            }
        }
    }
}

/// One tick: fetch the latest block and insert it, returning the stored row.
pub async fn run_cycle(fetcher: &BlockFetcher, store: &dyn BlockStore) -> Result<BlockRecord> {
    let block = fetcher.fetch_latest().await?;
    let stored = store.insert_block(&block).await?;
    Ok(stored)
}
