use crate::db::{Database, StoreError};
use chrono::{DateTime, Utc};
use log::{debug, error, info};
use std::sync::Arc;
use std::time::Duration as StdDuration;
use tokio::time::interval;

pub async fn sweep_expired_locks_task(database: Arc<Database>, interval_secs: u64) {
    info!("Starting background task to sweep expired data object locks...");
    let mut interval = interval(StdDuration::from_secs(interval_secs.max(1)));

    loop {
        interval.tick().await;
        if let Err(e) = sweep_once(&database, Utc::now()).await {
            error!("Failed to purge expired locks: {}", e);
        }
    }
}

pub async fn sweep_once(database: &Database, now: DateTime<Utc>) -> Result<u64, StoreError> {
    let removed = database.purge_expired_locks(now).await?;
    if removed > 0 {
        info!("Purged {} expired lock(s).", removed);
    } else {
        debug!("No expired locks at {}", now.to_rfc3339());
    }
    Ok(removed)
}
