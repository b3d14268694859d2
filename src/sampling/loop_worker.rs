use tokio::time::{self, Duration, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

use crate::tracker::{CycleOutcome, TrackerController};

// Set to true to enable verbose logging in this module
const ENABLE_LOGS: bool = true;

use crate::{log_debug, log_info, log_warn};

/// Coarse trigger: one fetch-and-ingest cycle per period. The first cycle
/// runs one period after start, since `start` already sampled once.
pub async fn sampling_loop(
    tracker: TrackerController,
    every: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tokio::select! {
                    outcome = tracker.run_sample_cycle() => match outcome {
                        CycleOutcome::Ingested => log_debug!("periodic sample ingested"),
                        CycleOutcome::Failed => log_warn!("periodic sample failed, still tracking"),
                        CycleOutcome::Coalesced => log_debug!("periodic sample coalesced"),
                        other => log_debug!("periodic sample ended as {other:?}"),
                    },
                    _ = cancel_token.cancelled() => {
                        log_info!("sampling loop cancelled mid-cycle");
                        break;
                    }
                }
            }
            _ = cancel_token.cancelled() => {
                log_info!("sampling loop shutting down");
                break;
            }
        }
    }
}

/// Fine trigger: refresh live display values only.
pub async fn display_loop(
    tracker: TrackerController,
    every: Duration,
    cancel_token: CancellationToken,
) {
    let mut ticker = time::interval_at(Instant::now() + every, every);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                tracker.tick().await;
            }
            _ = cancel_token.cancelled() => {
                log_info!("display loop shutting down");
                break;
            }
        }
    }
}
