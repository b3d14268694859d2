use anyhow::{Context, Result};
use log::info;
use tokio::task::JoinHandle;
use tokio::time::Duration;
use tokio_util::sync::CancellationToken;

use crate::tracker::TrackerController;

use super::loop_worker::{display_loop, sampling_loop};

/// Handle to the two periodic triggers of a tracking period. Dropping it
/// does not stop them; call `shutdown`.
pub struct SamplingSchedule {
    cancel_token: CancellationToken,
    sampler: JoinHandle<()>,
    ticker: JoinHandle<()>,
}

impl SamplingSchedule {
    pub fn spawn(tracker: TrackerController, sample_every: Duration, tick_every: Duration) -> Self {
        let cancel_token = CancellationToken::new();

        let sampler = tokio::spawn(sampling_loop(
            tracker.clone(),
            sample_every,
            cancel_token.clone(),
        ));
        let ticker = tokio::spawn(display_loop(tracker, tick_every, cancel_token.clone()));

        info!(
            "Sampling every {}s, display tick every {}ms",
            sample_every.as_secs(),
            tick_every.as_millis()
        );

        Self {
            cancel_token,
            sampler,
            ticker,
        }
    }

    pub fn is_active(&self) -> bool {
        !self.cancel_token.is_cancelled()
    }

    /// Cancel both loops and wait for them to exit.
    pub async fn shutdown(self) -> Result<()> {
        self.cancel_token.cancel();

        self.sampler
            .await
            .context("sampling loop task failed to join")?;
        self.ticker
            .await
            .context("display loop task failed to join")?;
        Ok(())
    }
}
