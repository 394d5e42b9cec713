//! Request DTOs.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use carelink_core::events::DeliveryTarget;

/// Body for `POST /rpc/publish-event`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PublishEventRequest {
    /// Event type discriminator.
    pub event_type: String,
    /// The user the event concerns.
    #[serde(default)]
    pub user_id: Option<Uuid>,
    /// Delivery surfaces; defaults to dashboard-only.
    #[serde(default = "default_targets")]
    pub target: Vec<DeliveryTarget>,
    /// Opaque event payload.
    #[serde(default)]
    pub payload: serde_json::Value,
}

fn default_targets() -> Vec<DeliveryTarget> {
    vec![DeliveryTarget::Dashboard]
}

/// Body for `POST /checkin`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CheckInRequest {
    /// The user checking in.
    pub user_id: Uuid,
    /// Self-reported mood.
    pub mood: String,
    /// Also notify the user's mobile devices.
    #[serde(default)]
    pub notify_mobile: bool,
}

/// Body for `POST /daily-login`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DailyLoginRequest {
    /// The user who logged in.
    pub user_id: Uuid,
}

/// Body for `POST /send-sms` and `POST /send-urgent-sms`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SendSmsRequest {
    /// The user the message concerns.
    pub user_id: Uuid,
    /// Destination phone number.
    pub to: String,
    /// Message text.
    pub message: String,
}

/// Body for `POST /save-device-token`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveDeviceTokenRequest {
    /// Token owner.
    pub user_id: Uuid,
    /// Gateway token string.
    pub token: String,
    /// Device platform.
    #[serde(default = "default_platform")]
    pub platform: String,
}

fn default_platform() -> String {
    "android".to_string()
}

/// Body for `POST /dashboard/history/{id}/read`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MarkReadRequest {
    /// The user marking the event read.
    pub user_id: Uuid,
}

/// Query string for `GET /dashboard/history`.
#[derive(Debug, Clone, Deserialize)]
pub struct HistoryQuery {
    /// Items per page, capped at 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
    /// One-based page number.
    #[serde(default = "default_page")]
    pub page: i64,
}

/// Query string for `GET /rpc/users/{id}/checkins`.
#[derive(Debug, Clone, Deserialize)]
pub struct CheckInsQuery {
    /// Maximum rows returned, capped at 100.
    #[serde(default = "default_limit")]
    pub limit: i64,
}

fn default_limit() -> i64 {
    20
}

fn default_page() -> i64 {
    1
}
