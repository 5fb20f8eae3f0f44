//! Spontaneous conversations at configured hours.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Local, Timelike};
use kaiwa_core::session::DestinationId;
use kaiwa_infrastructure::ScheduleConfig;
use rand::SeedableRng;
use rand::rngs::StdRng;
use tokio_util::sync::CancellationToken;

use crate::coordinator::ChannelCoordinator;

/// Whether a spontaneous conversation should start at `now`.
///
/// `last` is when the previous conversation in the channel finished. Only a
/// conversation on the same local date can block a new one.
pub fn is_due(config: &ScheduleConfig, now: DateTime<Local>, last: Option<DateTime<Local>>) -> bool {
    if !config.enabled || !config.hours.contains(&now.hour()) {
        return false;
    }
    let Some(last) = last else {
        return true;
    };
    if last.date_naive() != now.date_naive() {
        return true;
    }
    if config.once_per_day {
        return false;
    }
    let gap = now.signed_duration_since(last).num_minutes().abs();
    gap >= i64::from(config.proximity_hours) * 60
}

pub struct SpontaneousChatScheduler {
    coordinator: Arc<ChannelCoordinator>,
    destination: DestinationId,
    config: ScheduleConfig,
}

impl SpontaneousChatScheduler {
    pub fn new(
        coordinator: Arc<ChannelCoordinator>,
        destination: DestinationId,
        config: ScheduleConfig,
    ) -> Self {
        Self {
            coordinator,
            destination,
            config,
        }
    }

    /// One poll. Returns true if a conversation ran.
    pub async fn tick(&self) -> bool {
        let last = self
            .coordinator
            .last_activity(self.destination)
            .map(|at| at.with_timezone(&Local));
        if !is_due(&self.config, Local::now(), last) {
            return false;
        }
        if self.coordinator.is_busy(self.destination) {
            tracing::debug!(destination = %self.destination, "Channel busy, skipping scheduled conversation");
            return false;
        }

        let mut rng = StdRng::from_entropy();
        match self
            .coordinator
            .start_random_session(self.destination, &mut rng)
            .await
        {
            Ok(report) => {
                tracing::info!(
                    destination = %self.destination,
                    session_id = %report.session_id,
                    turns = report.turns.len(),
                    "Scheduled conversation finished"
                );
                true
            }
            Err(e) => {
                tracing::warn!(destination = %self.destination, error = %e, "Scheduled conversation not started");
                false
            }
        }
    }

    /// Polls until `token` is cancelled.
    pub async fn run(self, token: CancellationToken) {
        if !self.config.enabled {
            tracing::info!("Spontaneous chat scheduler disabled");
            return;
        }
        let interval = Duration::from_secs(self.config.poll_interval_minutes * 60);
        tracing::info!(
            destination = %self.destination,
            hours = ?self.config.hours,
            poll_interval_minutes = self.config.poll_interval_minutes,
            "Spontaneous chat scheduler started"
        );

        loop {
            tokio::select! {
                _ = token.cancelled() => {
                    tracing::info!("Shutdown signal received, stopping scheduler");
                    break;
                },
                _ = tokio::time::sleep(interval) => {
                    self.tick().await;
                },
            }
        }
    }
}
