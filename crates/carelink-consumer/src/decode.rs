//! Inbound message decoding.
//!
//! Messages published by our own outbox are full [`EventEnvelope`]s.
//! Gamification topics also carry bare shapes like
//! `{"type": "badge_awarded", "userId": "...", "badge": "..."}` from
//! other services; those are lifted into an envelope. Anything else is
//! malformed and dropped: a message cannot become valid by retrying.

use chrono::{DateTime, TimeZone, Utc};
use uuid::Uuid;

use carelink_core::events::{DeliveryTarget, EventEnvelope};

/// Decode a raw bus payload into an event envelope.
///
/// Returns `None` for undecodable messages. Decoding is deterministic:
/// redelivered copies of one message always produce the same derived
/// message ID, which is what the dedup gate keys on.
pub fn decode_event(raw: &str) -> Option<EventEnvelope> {
    if let Ok(envelope) = serde_json::from_str::<EventEnvelope>(raw) {
        return Some(envelope);
    }

    let value: serde_json::Value = serde_json::from_str(raw).ok()?;
    lift_bare_event(value)
}

/// Lift a bare JSON object into an envelope. The event type is the only
/// required field.
fn lift_bare_event(value: serde_json::Value) -> Option<EventEnvelope> {
    let event_type = value
        .get("type")
        .or_else(|| value.get("eventType"))
        .or_else(|| value.get("event_type"))?
        .as_str()?
        .to_string();

    let user_id = value
        .get("userId")
        .or_else(|| value.get("user_id"))
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok());

    // A stable ID and timestamp keep the derived message ID identical
    // across broker redeliveries.
    let id = value
        .get("id")
        .and_then(|v| v.as_str())
        .and_then(|s| Uuid::parse_str(s).ok())
        .unwrap_or_else(|| Uuid::new_v5(&Uuid::NAMESPACE_OID, value.to_string().as_bytes()));

    let created_at = value
        .get("timestamp")
        .or_else(|| value.get("createdAt"))
        .and_then(parse_timestamp)
        .unwrap_or(DateTime::UNIX_EPOCH);

    Some(EventEnvelope {
        id,
        event_type,
        user_id,
        target: vec![DeliveryTarget::Dashboard],
        payload: value,
        created_at,
    })
}

fn parse_timestamp(value: &serde_json::Value) -> Option<DateTime<Utc>> {
    if let Some(s) = value.as_str() {
        return DateTime::parse_from_rfc3339(s)
            .ok()
            .map(|dt| dt.with_timezone(&Utc));
    }
    value
        .as_i64()
        .and_then(|secs| Utc.timestamp_opt(secs, 0).single())
}

#[cfg(test)]
mod tests {
    use super::*;
    use carelink_core::events::EVENT_BADGE_AWARDED;

    #[test]
    fn full_envelopes_decode_as_is() {
        let envelope = EventEnvelope::new(
            "checkin",
            Some(Uuid::new_v4()),
            vec![DeliveryTarget::Dashboard, DeliveryTarget::Mobile],
            serde_json::json!({"mood": "okay"}),
        );
        let raw = serde_json::to_string(&envelope).unwrap();

        let decoded = decode_event(&raw).unwrap();
        assert_eq!(decoded.id, envelope.id);
        assert_eq!(decoded.target, envelope.target);
    }

    #[test]
    fn bare_gamification_events_are_lifted() {
        let user_id = Uuid::new_v4();
        let raw = format!(
            r#"{{"type":"badge_awarded","userId":"{user_id}","badge":"week_streak","timestamp":"2026-08-06T10:00:00Z"}}"#
        );

        let decoded = decode_event(&raw).unwrap();
        assert_eq!(decoded.event_type, EVENT_BADGE_AWARDED);
        assert_eq!(decoded.user_id, Some(user_id));
        assert_eq!(decoded.payload["badge"], "week_streak");
    }

    #[test]
    fn lifted_events_keep_a_stable_message_id_across_redeliveries() {
        let raw = r#"{"type":"badge_awarded","userId":"7f5da77c-94a1-4ed0-9e4c-0a1b2c3d4e5f","badge":"week_streak","timestamp":1754388000}"#;

        let first = decode_event(raw).unwrap();
        let second = decode_event(raw).unwrap();
        assert_eq!(first.message_id(), second.message_id());
    }

    #[test]
    fn malformed_json_is_rejected() {
        assert!(decode_event("not json at all").is_none());
        assert!(decode_event(r#"{"truncated": "#).is_none());
    }

    #[test]
    fn json_without_an_event_type_is_rejected() {
        assert!(decode_event(r#"{"userId":"abc","badge":"x"}"#).is_none());
        assert!(decode_event(r#"{"type":42}"#).is_none());
    }

    #[test]
    fn lifted_events_default_to_dashboard_only() {
        let decoded = decode_event(r#"{"type":"daily_login"}"#).unwrap();
        assert!(decoded.targets_dashboard());
        assert!(!decoded.targets_mobile());
    }
}
