//! Prune Task
//!
//! Background task that periodically removes expired store items.

use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::Serialize;
use tokio::task::JoinHandle;
use tracing::{debug, error, info};

use crate::cache::PersistentStore;

/// Spawns a background task that periodically prunes expired items.
///
/// Store operations block on the file lock, so each sweep runs on tokio's
/// blocking pool. Failed sweeps are logged and retried on the next tick.
///
/// # Arguments
/// * `store` - Store handle to prune
/// * `prune_interval_secs` - Interval in seconds between sweeps
///
/// # Returns
/// A JoinHandle for the spawned task, which can be used to abort the task
/// during shutdown.
///
/// # Example
/// ```ignore
/// let store: ResponseStore = PersistentStore::from_config(&config);
/// let prune_handle = spawn_prune_task(store, 60);
/// // Later, during shutdown:
/// prune_handle.abort();
/// ```
pub fn spawn_prune_task<T>(store: PersistentStore<T>, prune_interval_secs: u64) -> JoinHandle<()>
where
    T: Serialize + DeserializeOwned + 'static,
{
    let interval = Duration::from_secs(prune_interval_secs.max(1));

    tokio::spawn(async move {
        info!(
            "Starting prune task for {} with interval of {} seconds",
            store.path().display(),
            interval.as_secs()
        );

        loop {
            tokio::time::sleep(interval).await;

            let sweep = store.clone();
            match tokio::task::spawn_blocking(move || sweep.prune_expired()).await {
                Ok(Ok(removed)) if removed > 0 => {
                    info!("Prune: removed {} expired items", removed);
                }
                Ok(Ok(_)) => {
                    debug!("Prune: no expired items found");
                }
                Ok(Err(e)) => {
                    error!("Prune failed: {}", e);
                }
                Err(e) => {
                    error!("Prune sweep panicked: {}", e);
                }
            }
        }
    })
}
