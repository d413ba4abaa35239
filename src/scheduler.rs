use crate::errors::ExplorationError;
use crate::explorer::{ExplorationSummary, PlatformExplorer};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use tokio::task::JoinHandle;
use tokio::time::{interval, timeout, MissedTickBehavior};
use tracing::{error, info, warn};

/// Result of asking for one exploration pass
#[derive(Debug)]
pub enum PassOutcome {
    Completed(ExplorationSummary),
    Failed(ExplorationError),
    /// A previous pass still holds the explorer; this tick was skipped
    Busy,
}

/// Runs one pass on the blocking pool, bounded by `pass_timeout`.
///
/// The explorer stays locked until the pass really finishes, even after the
/// deadline has passed, so an overrunning pass makes later calls return
/// `Busy` instead of starting a second traversal.
pub async fn run_pass(explorer: &Arc<Mutex<PlatformExplorer>>, pass_timeout: Duration) -> PassOutcome {
    let Ok(mut guard) = Arc::clone(explorer).try_lock_owned() else {
        return PassOutcome::Busy;
    };

    let handle = tokio::task::spawn_blocking(move || guard.explore());
    match timeout(pass_timeout, handle).await {
        Ok(Ok(Ok(summary))) => PassOutcome::Completed(summary),
        Ok(Ok(Err(e))) => PassOutcome::Failed(e),
        Ok(Err(join_error)) => PassOutcome::Failed(ExplorationError::Aborted {
            reason: join_error.to_string(),
        }),
        Err(_) => PassOutcome::Failed(ExplorationError::Timeout {
            timeout_secs: pass_timeout.as_secs(),
        }),
    }
}

/// Explores on a fixed interval until the task is aborted.
///
/// A failed pass is logged and retried on the next tick; it never stops the
/// loop.
pub fn spawn_explore_task(
    explorer: Arc<Mutex<PlatformExplorer>>,
    explore_interval: Duration,
    pass_timeout: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        info!(
            "[scheduler] exploring every {:?} (pass deadline {:?})",
            explore_interval, pass_timeout
        );
        let mut ticker = interval(explore_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut consecutive_failures = 0u32;

        loop {
            ticker.tick().await;
            match run_pass(&explorer, pass_timeout).await {
                PassOutcome::Completed(_) => {
                    if consecutive_failures > 0 {
                        info!(
                            "[scheduler] exploration recovered after {} failed pass(es)",
                            consecutive_failures
                        );
                    }
                    consecutive_failures = 0;
                }
                PassOutcome::Failed(e) => {
                    consecutive_failures += 1;
                    if matches!(e, ExplorationError::Timeout { .. } | ExplorationError::Aborted { .. }) {
                        error!("[scheduler] {}", e);
                    }
                    warn!(
                        "[scheduler] {} consecutive failed pass(es); retrying in {:?}",
                        consecutive_failures, explore_interval
                    );
                }
                PassOutcome::Busy => {
                    warn!("[scheduler] previous pass still running, skipping this tick");
                }
            }
        }
    })
}
