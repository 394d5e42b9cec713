//! The missed-check-in sweep loop.

use std::sync::Arc;
use std::time::Duration;

use chrono::Local;
use tokio::sync::watch;
use tokio::time;
use tracing::{debug, error, info, warn};

use carelink_core::config::scheduler::SchedulerConfig;
use carelink_core::events::{DeliveryTarget, EVENT_MISSED_CHECKIN_ALERT};
use carelink_database::repositories::checkin::CheckInRepository;
use carelink_database::repositories::relationship::RelationshipRepository;
use carelink_database::repositories::user::UserRepository;
use carelink_entity::user::User;
use carelink_outbox::OutboxService;

use crate::window::{sweep_window, SweepWindow};

/// Periodic sweep detecting users who have not checked in today.
///
/// Alerts are throttled per senior per day: the throttle claim is a
/// compare-and-set on `last_reminder_at`, taken before any alert is
/// emitted, so racing sweeps across replicas cannot both fan out.
pub struct MissedCheckInSweep {
    users: Arc<UserRepository>,
    checkins: Arc<CheckInRepository>,
    relationships: Arc<RelationshipRepository>,
    outbox: OutboxService,
    config: SchedulerConfig,
}

impl std::fmt::Debug for MissedCheckInSweep {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("MissedCheckInSweep")
            .field("config", &self.config)
            .finish()
    }
}

impl MissedCheckInSweep {
    /// Create a new sweep.
    pub fn new(
        users: Arc<UserRepository>,
        checkins: Arc<CheckInRepository>,
        relationships: Arc<RelationshipRepository>,
        outbox: OutboxService,
        config: SchedulerConfig,
    ) -> Self {
        Self {
            users,
            checkins,
            relationships,
            outbox,
            config,
        }
    }

    /// Run until the cancel signal is received.
    pub async fn run(&self, mut cancel: watch::Receiver<bool>) {
        info!(
            sweep_period = self.config.sweep_period_seconds,
            grace_window_hours = self.config.grace_window_hours,
            "Missed-check-in sweep started"
        );

        let period = Duration::from_secs(self.config.sweep_period_seconds);

        loop {
            tokio::select! {
                _ = cancel.changed() => {
                    if *cancel.borrow() {
                        info!("Sweep received shutdown signal");
                        break;
                    }
                }
                _ = time::sleep(period) => {
                    self.sweep_once().await;
                }
            }
        }

        info!("Missed-check-in sweep shut down");
    }

    /// One sweep pass over all monitored users.
    pub async fn sweep_once(&self) {
        let window = sweep_window(Local::now(), self.config.grace_window_hours);
        if !window.open {
            debug!(window_end = %window.window_end, "Grace window still open, skipping sweep");
            return;
        }

        let users = match self.users.find_all().await {
            Ok(users) => users,
            Err(e) => {
                error!("Sweep failed to list users: {e}");
                return;
            }
        };

        for user in &users {
            if let Err(e) = self.check_user(user, &window).await {
                // One user's failure must not stop the rest of the sweep.
                error!(user_id = %user.user_id, "Sweep failed for user: {e}");
            }
        }
    }

    /// Evaluate one user, emitting alerts when they missed today's
    /// check-in and no reminder went out yet.
    async fn check_user(
        &self,
        user: &User,
        window: &SweepWindow,
    ) -> carelink_core::AppResult<()> {
        if self
            .checkins
            .exists_since(user.user_id, window.today_start)
            .await?
        {
            return Ok(());
        }

        // The claim is the throttle: at most one sweep per day wins it,
        // regardless of how many caregiver alerts follow.
        if !self
            .users
            .claim_reminder(user.user_id, window.today_start)
            .await?
        {
            debug!(user_id = %user.user_id, "Reminder already issued today");
            return Ok(());
        }

        let caregivers = self.relationships.find_caregivers(user.user_id).await?;

        if caregivers.is_empty() {
            warn!(user_id = %user.user_id, "Missed check-in, no linked caregiver");
            self.outbox
                .enqueue_event(
                    EVENT_MISSED_CHECKIN_ALERT,
                    Some(user.user_id),
                    vec![DeliveryTarget::Dashboard],
                    serde_json::json!({
                        "senior_id": user.user_id,
                        "senior_name": user.name,
                        "caregiver_id": null,
                    }),
                )
                .await?;
            return Ok(());
        }

        info!(
            user_id = %user.user_id,
            caregivers = caregivers.len(),
            "Missed check-in, alerting caregivers"
        );

        for caregiver in &caregivers {
            // One alert per caregiver; a caregiver linked to several
            // lapsed seniors receives one alert per senior.
            let result = self
                .outbox
                .enqueue_event(
                    EVENT_MISSED_CHECKIN_ALERT,
                    Some(caregiver.link_acc_id),
                    vec![DeliveryTarget::Dashboard, DeliveryTarget::Mobile],
                    serde_json::json!({
                        "senior_id": user.user_id,
                        "senior_name": user.name,
                        "caregiver_id": caregiver.link_acc_id,
                        "relation": caregiver.relation,
                    }),
                )
                .await;
            if let Err(e) = result {
                error!(
                    user_id = %user.user_id,
                    caregiver_id = %caregiver.link_acc_id,
                    "Failed to enqueue caregiver alert: {e}"
                );
            }
        }

        Ok(())
    }
}
