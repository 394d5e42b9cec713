//! Push notification formatting.

use carelink_core::events::{self, EventEnvelope};

/// Formats the visible notification for common pipeline events.
pub struct PushFormatter;

impl PushFormatter {
    /// Title and body for an event, keyed by its type.
    pub fn format(event: &EventEnvelope) -> (String, String) {
        let payload = &event.payload;
        match event.event_type.as_str() {
            events::EVENT_CHECKIN => {
                let mood = payload
                    .get("mood")
                    .and_then(|v| v.as_str())
                    .unwrap_or("unknown");
                (
                    "Daily Check-in".to_string(),
                    format!("Check-in recorded, mood: {mood}"),
                )
            }
            events::EVENT_MISSED_CHECKIN_ALERT => {
                let name = payload
                    .get("senior_name")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Your loved one");
                (
                    "Missed Check-in".to_string(),
                    format!("{name} has not checked in today"),
                )
            }
            events::EVENT_BADGE_NOTIFICATION => {
                let badge = payload
                    .get("badge")
                    .and_then(|v| v.as_str())
                    .unwrap_or("a new badge");
                (
                    "Badge Earned".to_string(),
                    format!("You earned {badge}!"),
                )
            }
            events::EVENT_URGENT_SMS_REQUEST => {
                let message = payload
                    .get("message")
                    .and_then(|v| v.as_str())
                    .unwrap_or("Please check on them now");
                ("Urgent Wellbeing Alert".to_string(), message.to_string())
            }
            other => (
                "CareLink".to_string(),
                format!("New event: {other}"),
            ),
        }
    }
}
