use crate::context::AppContext;
use chrono::{DateTime, Datelike, FixedOffset, NaiveDate, Timelike, Utc, Weekday};
use std::sync::Arc;
use tokio::time::{interval, Duration, MissedTickBehavior};
use tracing::{error, info};

pub mod mountain_time;
pub mod tasks;

/// Job scheduler for background tasks
pub struct JobScheduler {
    context: Arc<AppContext>,
}

impl JobScheduler {
    pub fn new(context: Arc<AppContext>) -> Self {
        Self { context }
    }

    /// Start all background jobs
    pub fn start(self: Arc<Self>) {
        info!("Starting background job scheduler");

        if self.context.config.reminders.enabled {
            tokio::spawn(Self::wednesday_reminder_job(Arc::clone(&self)));
        } else {
            info!("Wednesday reminders disabled");
        }
        tokio::spawn(Self::abandoned_request_job(Arc::clone(&self)));
        tokio::spawn(Self::health_check_job(Arc::clone(&self)));

        info!("Background jobs started");
    }

    /// Wednesday journal reminder (checks hourly, fires once per Wednesday)
    async fn wednesday_reminder_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(3600));
        interval.set_missed_tick_behavior(MissedTickBehavior::Skip);
        let mut latch = ReminderLatch::default();

        loop {
            interval.tick().await;

            let now = Utc::now();
            let local = mountain_time::to_mountain(now);
            if !latch.claim(local, scheduler.context.config.reminders.hour) {
                continue;
            }

            info!("Running Wednesday journal reminders");
            match tasks::send_wednesday_reminders(&scheduler.context, now).await {
                Ok(summary) => info!(sent = summary.sent, failed = summary.failed, "Wednesday reminders sent"),
                Err(e) => error!("Failed to send Wednesday reminders: {}", e),
            }
        }
    }

    /// Fail generation requests left processing by a crash (runs every 15 minutes)
    async fn abandoned_request_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(900));

        loop {
            interval.tick().await;

            match tasks::fail_abandoned_requests(&scheduler.context).await {
                Ok(count) => {
                    if count > 0 {
                        info!("Marked {} abandoned generation requests as failed", count);
                    }
                }
                Err(e) => error!("Failed to sweep abandoned generation requests: {}", e),
            }
        }
    }

    /// Health check job (runs every 5 minutes)
    async fn health_check_job(scheduler: Arc<Self>) {
        let mut interval = interval(Duration::from_secs(300));

        loop {
            interval.tick().await;

            if let Err(e) = tasks::health_check(&scheduler.context).await {
                error!("Health check failed: {}", e);
            }
        }
    }
}

/// Reminder fires in the configured Mountain-Time hour on Wednesdays
fn reminder_due(weekday: Weekday, hour: u32, configured_hour: u32) -> bool {
    weekday == Weekday::Wed && hour == configured_hour
}

/// At most one reminder run per Mountain-Time date
#[derive(Debug, Default)]
struct ReminderLatch {
    last_run: Option<NaiveDate>,
}

impl ReminderLatch {
    /// True when `local` is due and no run has been claimed for its date yet
    fn claim(&mut self, local: DateTime<FixedOffset>, configured_hour: u32) -> bool {
        if !reminder_due(local.weekday(), local.hour(), configured_hour) {
            return false;
        }
        let today = local.date_naive();
        if self.last_run == Some(today) {
            return false;
        }
        self.last_run = Some(today);
        true
    }
}
