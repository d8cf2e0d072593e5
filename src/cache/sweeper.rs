//! Background sweep of stale cache entries.

use crate::cache::TokenCache;
use crate::config::DEFAULT_SWEEP_INTERVAL_SECS;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

/// Start the background cache sweeper task.
///
/// Runs [`TokenCache::sweep_expired`] on a blocking thread every `interval`,
/// starting immediately. A zero interval falls back to the daily default.
/// Must be called from within a Tokio runtime. Abort the returned handle to
/// stop it.
pub fn start_cache_sweeper(cache: Arc<TokenCache>, interval: Duration) -> JoinHandle<()> {
    let interval = if interval.is_zero() {
        warn!(
            default_secs = DEFAULT_SWEEP_INTERVAL_SECS,
            "Zero cache sweep interval, using default"
        );
        Duration::from_secs(DEFAULT_SWEEP_INTERVAL_SECS)
    } else {
        interval
    };

    tokio::spawn(async move {
        let mut interval_timer = tokio::time::interval(interval);

        loop {
            interval_timer.tick().await;
            run_sweep(&cache).await;
        }
    })
}

async fn run_sweep(cache: &Arc<TokenCache>) {
    debug!("Running token cache sweep");

    let cache = Arc::clone(cache);
    let result = tokio::task::spawn_blocking(move || cache.sweep_expired()).await;

    match result {
        Ok(Ok(count)) if count > 0 => info!(entries_removed = count, "Expired token cache entries swept"),
        Ok(Ok(_)) => {}
        Ok(Err(e)) => error!(error = %e, "Failed to sweep token cache"),
        Err(e) => error!(error = %e, "Token cache sweep task panicked"),
    }
}
