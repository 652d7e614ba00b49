//! Background service
//!
//! Polls on a fixed tick. A refresh runs when the configured interval has
//! passed since the last recorded one; in between, a postponed PVR restart
//! is retried once playback has stopped.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use tokio::time::interval;
use tracing::{debug, error, info, trace};

use crate::config::defaults::SETTING_LAST_REFRESHED;
use crate::config::SchedulerConfig;
use crate::ingestor::aggregator::{Aggregator, RefreshOutcome};
use crate::services::pvr::RestartState;

/// What one tick did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickAction {
    Idle,
    Refreshed(RefreshOutcome),
    RetriedRestart,
}

pub struct BackgroundService {
    aggregator: Aggregator,
    config: SchedulerConfig,
    restart_state: RestartState,
}

impl BackgroundService {
    pub fn new(aggregator: Aggregator, config: SchedulerConfig) -> Self {
        Self {
            aggregator,
            config,
            restart_state: RestartState::default(),
        }
    }

    pub fn restart_state(&self) -> RestartState {
        self.restart_state
    }

    /// Run until Ctrl-C
    pub async fn run(self) {
        self.run_until(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                error!("Could not listen for Ctrl-C: {}", e);
                std::future::pending::<()>().await;
            }
        })
        .await
    }

    /// Run until `shutdown` resolves
    pub async fn run_until<F>(mut self, shutdown: F)
    where
        F: Future<Output = ()>,
    {
        info!(
            "Service started, refreshing every {}",
            humantime::format_duration(self.config.refresh_interval)
        );

        let mut ticker = interval(self.config.tick);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    trace!("Scheduler tick");
                    self.tick().await;
                }
                _ = &mut shutdown => break,
            }
        }

        info!("Service stopped");
    }

    /// One scheduling decision
    pub async fn tick(&mut self) -> TickAction {
        if self.refresh_due() {
            let outcome = self.aggregator.refresh(None, &mut self.restart_state).await;
            return TickAction::Refreshed(outcome);
        }

        match self
            .aggregator
            .restarter()
            .retry_pending(&mut self.restart_state)
            .await
        {
            Ok(Some(_)) => TickAction::RetriedRestart,
            Ok(None) => TickAction::Idle,
            Err(e) => {
                error!("Could not restart the PVR client: {}", e);
                TickAction::Idle
            }
        }
    }

    fn refresh_due(&self) -> bool {
        let last = self
            .aggregator
            .catalog()
            .host
            .settings
            .get_int(SETTING_LAST_REFRESHED)
            .unwrap_or(0);
        let elapsed = Utc::now().timestamp().saturating_sub(last).max(0) as u64;
        let due = Duration::from_secs(elapsed) >= self.config.refresh_interval;
        if due {
            debug!("Last refresh was {}s ago, refreshing", elapsed);
        }
        due
    }
}
