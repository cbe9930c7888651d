use std::time::Duration;

use chrono::Utc;
use tracing::{error, info, warn};

use chirpy_api::auth::AppState;

/// Background task that prunes old token revocations.
///
/// Runs on an interval and drops revocation entries stamped before the
/// retention cutoff. Entries older than the refresh token lifetime belong to
/// tokens that can no longer validate anyway.
pub async fn run_cleanup_loop(state: AppState, retention_hours: i64, interval_secs: u64) {
    let mut interval = tokio::time::interval(Duration::from_secs(interval_secs));

    loop {
        interval.tick().await;

        match prune_revocations(&state, retention_hours).await {
            Ok(count) => {
                if count > 0 {
                    info!("Cleanup: pruned {} old token revocations", count);
                }
            }
            Err(e) => {
                warn!("Cleanup error: {}", e);
            }
        }
    }
}

async fn prune_revocations(state: &AppState, retention_hours: i64) -> anyhow::Result<usize> {
    let cutoff = Utc::now() - chrono::Duration::hours(retention_hours);

    let state = state.clone();
    let count = tokio::task::spawn_blocking(move || state.db.prune_revoked_tokens(cutoff))
        .await
        .map_err(|e| {
            error!("spawn_blocking join error: {}", e);
            anyhow::anyhow!(e)
        })??;

    Ok(count)
}
