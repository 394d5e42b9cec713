//! Domain events flowing through the CareLink pipeline.
//!
//! Every event is wrapped in an [`EventEnvelope`] from the moment it is
//! enqueued on the outbox until it reaches a consumer. The envelope is
//! JSON on the wire (UTF-8) on both the pub/sub bus and the
//! log-structured broker.

pub mod topics;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type emitted when a senior records a daily check-in.
pub const EVENT_CHECKIN: &str = "checkin";
/// Event type emitted when a senior logs in for the day.
pub const EVENT_DAILY_LOGIN: &str = "daily_login";
/// Event type emitted by the gamification service when a badge is awarded.
pub const EVENT_BADGE_AWARDED: &str = "badge_awarded";
/// Event type produced by translating a badge award into a notification.
pub const EVENT_BADGE_NOTIFICATION: &str = "badge_notification";
/// Event type emitted by the scheduler for a missed daily check-in.
pub const EVENT_MISSED_CHECKIN_ALERT: &str = "missed_checkin_alert";
/// Event type for an outbound SMS request.
pub const EVENT_SMS_REQUEST: &str = "sms_request";
/// Event type for an urgent wellbeing SMS request.
pub const EVENT_URGENT_SMS_REQUEST: &str = "urgent_sms_request";

/// Delivery surface an event should be fanned out to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryTarget {
    /// The live dashboard stream.
    Dashboard,
    /// Mobile devices via the push gateway.
    Mobile,
}

/// Wrapper for all domain events with delivery metadata.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EventEnvelope {
    /// Unique event ID.
    pub id: Uuid,
    /// Event type discriminator (see the `EVENT_*` constants).
    pub event_type: String,
    /// The user this event concerns (if applicable).
    pub user_id: Option<Uuid>,
    /// Surfaces this event should reach.
    #[serde(default)]
    pub target: Vec<DeliveryTarget>,
    /// Opaque structured payload.
    pub payload: serde_json::Value,
    /// When the event was created.
    pub created_at: DateTime<Utc>,
}

impl EventEnvelope {
    /// Create a new envelope with a fresh ID and timestamp.
    pub fn new(
        event_type: impl Into<String>,
        user_id: Option<Uuid>,
        target: Vec<DeliveryTarget>,
        payload: serde_json::Value,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            event_type: event_type.into(),
            user_id,
            target,
            payload,
            created_at: Utc::now(),
        }
    }

    /// Whether this event should reach mobile devices.
    pub fn targets_mobile(&self) -> bool {
        self.target.contains(&DeliveryTarget::Mobile)
    }

    /// Whether this event should reach the dashboard stream.
    pub fn targets_dashboard(&self) -> bool {
        self.target.contains(&DeliveryTarget::Dashboard)
    }

    /// Derive the deduplication message ID for this event.
    ///
    /// The ID is deterministic across redeliveries of the same event:
    /// `{type}_{user_id}_{unix_seconds}` when a user is attached, else the
    /// envelope's own ID. Redelivered copies of one envelope always map to
    /// the same key, so at-least-once transports collapse to a single
    /// effective consumption.
    pub fn message_id(&self) -> String {
        match self.user_id {
            Some(user_id) => format!(
                "{}_{}_{}",
                self.event_type,
                user_id,
                self.created_at.timestamp()
            ),
            None => self.id.to_string(),
        }
    }
}
