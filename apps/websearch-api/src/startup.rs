use std::time::Duration;

use websearch_core::error::Result;
use websearch_core::traits::IndexStore;

/// Holds startup until the index engine answers a ping, retrying up
/// to `attempts` times with `delay` between tries. Serving before the
/// index is reachable would turn every request into a gateway error
/// at query time.
pub async fn wait_for_index(index: &dyn IndexStore, attempts: u32, delay: Duration) -> Result<()> {
    for attempt in 1..attempts {
        match index.ping().await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(attempt, error = %e, "index engine not ready, retrying");
                tokio::time::sleep(delay).await;
            }
        }
    }
    index.ping().await
}
