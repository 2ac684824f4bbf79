//! Periodic checkpoint housekeeping.
//!
//! Abandoned checkpoints expire after a TTL (7 days by default). The
//! cleanup loop runs in its own failure domain: a failing sweep is logged
//! and the next one simply runs on schedule.

use repose_core::session::CheckpointRepository;
use std::sync::Arc;
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

/// Default checkpoint time-to-live.
pub const DEFAULT_CHECKPOINT_TTL: Duration = Duration::from_secs(7 * 24 * 3600);

/// Spawns the periodic checkpoint cleanup task.
///
/// Sweeps immediately on startup and then every `every`, removing
/// checkpoints older than `ttl`, until `shutdown` is cancelled.
pub fn spawn_checkpoint_cleanup(
    checkpoints: Arc<dyn CheckpointRepository>,
    ttl: Duration,
    every: Duration,
    shutdown: CancellationToken,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(every);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => {
                    info!(target: "checkpoint", "cleanup task stopping");
                    break;
                }
                _ = interval.tick() => {
                    match checkpoints.cleanup_older_than(ttl).await {
                        Ok(0) => {}
                        Ok(removed) => {
                            info!(target: "checkpoint", "removed {removed} expired checkpoints");
                        }
                        Err(e) => {
                            error!(target: "checkpoint", "cleanup sweep failed: {e}");
                        }
                    }
                }
            }
        }
    })
}
