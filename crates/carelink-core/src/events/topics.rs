//! Fixed topic names on the pub/sub bus and the log-structured broker.

/// Pub/sub topic fanned out to the dashboard and mobile consumers.
pub const NOTIFICATION_EVENTS: &str = "notification/events";
/// Pub/sub topic for inbound gamification events.
pub const GAMIFICATION_EVENTS: &str = "gamification/events";
/// Legacy dotted alias for the gamification topic, still produced by
/// older publishers.
pub const GAMIFICATION_EVENTS_DOTTED: &str = "gamification.events";

/// Log-structured broker topic targeted by the outbox publisher.
pub const STREAM_NOTIFICATION_EVENTS: &str = "notification.events";
/// Dead-letter topic for events that exhausted their retries.
pub const STREAM_NOTIFICATION_DLQ: &str = "notification.dlq";

/// All pub/sub topics the bus consumer subscribes to.
pub const CONSUMER_SUBSCRIPTIONS: &[&str] = &[
    NOTIFICATION_EVENTS,
    GAMIFICATION_EVENTS,
    GAMIFICATION_EVENTS_DOTTED,
];
