use anyhow::Result;
use tokio::time::{Duration, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::cycle::{CycleCoordinator, CycleResult};

const ENABLE_LOGS: bool = true;

use crate::{log_error, log_info};

/// External scheduler around `run_cycle`.
///
/// A failed cycle is logged and the next tick tries again; the engine itself
/// never retries. Cancellation is only observed between cycles.
pub async fn watch_loop<F>(
    coordinator: &CycleCoordinator,
    interval: Duration,
    cancel_token: CancellationToken,
    mut on_result: F,
) -> Result<u64>
where
    F: FnMut(&CycleResult) -> Result<()>,
{
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    let mut completed = 0u64;

    loop {
        tokio::select! {
            biased;
            _ = cancel_token.cancelled() => {
                log_info!("watch loop shutting down after {completed} cycle(s)");
                break;
            }
            _ = ticker.tick() => {
                match coordinator.run_cycle().await {
                    Ok(result) => {
                        completed += 1;
                        on_result(&result)?;
                    }
                    Err(err) => log_error!("monitoring cycle failed: {err:#}"),
                }
            }
        }
    }

    Ok(completed)
}
