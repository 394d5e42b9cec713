//! End-to-end pipeline tests against a live PostgreSQL instance.
//!
//! These exercise the durable parts of the pipeline: outbox retry state,
//! dead-letter terminality, the dedup gate's atomicity, consumer routing,
//! and the scheduler's daily throttle. They run only when
//! `CARELINK_TEST_DATABASE_URL` points at a disposable database; without
//! it every test skips with a note.

use std::collections::HashSet;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::sync::Mutex;

use async_trait::async_trait;
use sqlx::PgPool;
use uuid::Uuid;

use carelink_bus::{BusMessage, BusSubscription, EventBus, MemoryBroker, StreamProducer};
use carelink_core::config::outbox::OutboxConfig;
use carelink_core::config::push::PushConfig;
use carelink_core::config::scheduler::SchedulerConfig;
use carelink_core::events::{topics, DeliveryTarget, EVENT_CHECKIN, EVENT_MISSED_CHECKIN_ALERT};
use carelink_core::metrics::PipelineCounters;
use carelink_core::result::AppResult;
use carelink_database::repositories::checkin::CheckInRepository;
use carelink_database::repositories::device_token::DeviceTokenRepository;
use carelink_database::repositories::notification_event::NotificationEventRepository;
use carelink_database::repositories::outbox::OutboxRepository;
use carelink_database::repositories::processed_message::ProcessedMessageRepository;
use carelink_database::repositories::relationship::RelationshipRepository;
use carelink_database::repositories::user::UserRepository;
use carelink_outbox::{OutboxPublisher, OutboxService};
use carelink_push::{GatewayError, PushGateway, PushMessage, PushService, TokenStore};

/// Connect to the test database, running migrations once. `None` means
/// the environment is not configured and the test should skip.
async fn test_pool() -> Option<PgPool> {
    let url = std::env::var("CARELINK_TEST_DATABASE_URL").ok()?;
    let pool = PgPool::connect(&url).await.expect("test database unreachable");
    carelink_database::migration::run_migrations(&pool)
        .await
        .expect("migrations failed");
    Some(pool)
}

macro_rules! require_db {
    () => {
        match test_pool().await {
            Some(pool) => pool,
            None => {
                eprintln!("skipping: CARELINK_TEST_DATABASE_URL not set");
                return;
            }
        }
    };
}

fn publisher_config(max_attempts: i32) -> OutboxConfig {
    OutboxConfig {
        poll_interval_seconds: 1,
        batch_size: 50,
        max_attempts,
    }
}

fn outbox_service(pool: &PgPool) -> (OutboxService, Arc<OutboxRepository>) {
    let repo = Arc::new(OutboxRepository::new(pool.clone()));
    let service = OutboxService::new(Arc::clone(&repo), Arc::new(PipelineCounters::new()));
    (service, repo)
}

/// Broker whose log-topic appends fail on demand; the dead-letter topic
/// keeps working so terminality can be reached.
#[derive(Debug)]
struct FlakyBroker {
    inner: MemoryBroker,
    fail_log_topic: AtomicBool,
}

impl FlakyBroker {
    fn new() -> Self {
        Self {
            inner: MemoryBroker::new(64),
            fail_log_topic: AtomicBool::new(true),
        }
    }
}

#[async_trait]
impl StreamProducer for FlakyBroker {
    async fn append(&self, topic: &str, payload: &str) -> AppResult<()> {
        if topic == topics::STREAM_NOTIFICATION_EVENTS && self.fail_log_topic.load(Ordering::SeqCst)
        {
            return Err(carelink_core::AppError::broker("simulated broker outage"));
        }
        self.inner.append(topic, payload).await
    }
}

#[async_trait]
impl EventBus for FlakyBroker {
    async fn publish(&self, topic: &str, payload: &str) -> AppResult<()> {
        self.inner.publish(topic, payload).await
    }

    async fn subscribe(&self, topics: &[&str]) -> AppResult<BusSubscription> {
        self.inner.subscribe(topics).await
    }
}

/// Gateway that records sends and succeeds.
#[derive(Debug, Default)]
struct RecordingGateway {
    primary_sends: Mutex<Vec<String>>,
}

#[async_trait]
impl PushGateway for RecordingGateway {
    async fn send_primary(&self, token: &str, _message: &PushMessage) -> Result<(), GatewayError> {
        self.primary_sends.lock().unwrap().push(token.to_string());
        Ok(())
    }

    async fn send_fallback(&self, _token: &str, _message: &PushMessage) -> Result<(), GatewayError> {
        Err(GatewayError::Request("fallback unused".to_string()))
    }
}

#[tokio::test]
async fn enqueued_event_survives_as_unpublished_until_the_publisher_runs() {
    let pool = require_db!();
    let (service, repo) = outbox_service(&pool);

    let event_ref = service
        .enqueue_event(
            EVENT_CHECKIN,
            Some(Uuid::new_v4()),
            vec![DeliveryTarget::Dashboard],
            serde_json::json!({"mood": "okay"}),
        )
        .await
        .unwrap();

    // Durability precedes transport: the row exists, unpublished, before
    // any broker interaction. A crash here loses nothing.
    let row = repo.find_by_id(event_ref.id).await.unwrap().unwrap();
    assert!(!row.published);
    assert_eq!(row.attempts, 0);

    let broker = Arc::new(MemoryBroker::new(64));
    let publisher = OutboxPublisher::new(
        Arc::clone(&repo),
        Arc::clone(&broker) as Arc<dyn StreamProducer>,
        Arc::clone(&broker) as Arc<dyn EventBus>,
        publisher_config(5),
        Arc::new(PipelineCounters::new()),
    );
    publisher.poll_once().await;

    let row = repo.find_by_id(event_ref.id).await.unwrap().unwrap();
    assert!(row.published);
    assert!(row.published_at.is_some());

    let entries = broker.stream_entries(topics::STREAM_NOTIFICATION_EVENTS);
    assert!(entries
        .iter()
        .any(|e| e.contains(&event_ref.id.to_string())));
}

#[tokio::test]
async fn failed_publishes_back_off_and_eventually_dead_letter() {
    let pool = require_db!();
    let (service, repo) = outbox_service(&pool);

    let event_ref = service
        .enqueue_event(
            EVENT_CHECKIN,
            Some(Uuid::new_v4()),
            vec![DeliveryTarget::Dashboard],
            serde_json::json!({"mood": "low"}),
        )
        .await
        .unwrap();

    let broker = Arc::new(FlakyBroker::new());
    let publisher = OutboxPublisher::new(
        Arc::clone(&repo),
        Arc::clone(&broker) as Arc<dyn StreamProducer>,
        Arc::clone(&broker) as Arc<dyn EventBus>,
        publisher_config(2),
        Arc::new(PipelineCounters::new()),
    );

    // First failure: retry scheduled in the future, error recorded.
    publisher.poll_once().await;
    let row = repo.find_by_id(event_ref.id).await.unwrap().unwrap();
    assert!(!row.published);
    assert_eq!(row.attempts, 1);
    assert!(row.last_error.is_some());
    let first_retry_at = row.next_attempt_at.unwrap();
    assert!(first_retry_at > chrono::Utc::now());

    // Force the row due again; the second failure hits max_attempts and
    // dead-letters.
    sqlx::query("UPDATE outbox_events SET next_attempt_at = NOW() WHERE id = $1")
        .bind(event_ref.id)
        .execute(&pool)
        .await
        .unwrap();
    publisher.poll_once().await;

    let row = repo.find_by_id(event_ref.id).await.unwrap().unwrap();
    assert!(row.published, "poison row must be terminal");
    assert!(row.published_at.is_none(), "terminal is not published");

    let dlq = broker.inner.stream_entries(topics::STREAM_NOTIFICATION_DLQ);
    let matching: Vec<_> = dlq
        .iter()
        .filter(|e| e.contains(&event_ref.id.to_string()))
        .collect();
    assert_eq!(matching.len(), 1, "exactly one dead-letter copy");
    assert!(matching[0].contains("outbox.dlq"));

    // Terminal rows never come back.
    sqlx::query("UPDATE outbox_events SET next_attempt_at = NOW() WHERE id = $1")
        .bind(event_ref.id)
        .execute(&pool)
        .await
        .unwrap();
    publisher.poll_once().await;
    assert_eq!(
        broker
            .inner
            .stream_entries(topics::STREAM_NOTIFICATION_DLQ)
            .iter()
            .filter(|e| e.contains(&event_ref.id.to_string()))
            .count(),
        1
    );
}

#[tokio::test]
async fn dedup_gate_admits_exactly_one_concurrent_claimer() {
    let pool = require_db!();
    let dedup = Arc::new(ProcessedMessageRepository::new(pool.clone()));
    let message_id = format!("checkin_{}_1754388000", Uuid::new_v4());

    let mut handles = Vec::new();
    for _ in 0..8 {
        let dedup = Arc::clone(&dedup);
        let message_id = message_id.clone();
        handles.push(tokio::spawn(async move { dedup.claim(&message_id).await }));
    }

    let mut winners = 0;
    for handle in handles {
        if handle.await.unwrap().unwrap() {
            winners += 1;
        }
    }
    assert_eq!(winners, 1, "exactly one claim must win");

    // Later redelivery is also rejected.
    assert!(!dedup.claim(&message_id).await.unwrap());
}

#[tokio::test]
async fn consumed_checkin_is_audited_and_pushed_exactly_once() {
    let pool = require_db!();
    let (service, repo) = outbox_service(&pool);

    let user_id = Uuid::new_v4();
    let token_repo = Arc::new(DeviceTokenRepository::new(pool.clone()));
    token_repo
        .upsert(user_id, &format!("tok-{user_id}"), "android")
        .await
        .unwrap();

    let gateway = Arc::new(RecordingGateway::default());
    let push = Arc::new(PushService::new(
        Arc::clone(&token_repo) as Arc<dyn TokenStore>,
        Arc::clone(&gateway) as Arc<dyn PushGateway>,
        PushConfig {
            propagation_delay_ms: 0,
            ..PushConfig::default()
        },
        Arc::new(PipelineCounters::new()),
    ));

    let broker = Arc::new(MemoryBroker::new(64));
    let hub = carelink_bus::EventHub::new(64);
    let mut hub_rx = hub.subscribe();
    let counters = Arc::new(PipelineCounters::new());
    let consumer = carelink_consumer::BusConsumer::new(
        Arc::clone(&broker) as Arc<dyn EventBus>,
        Arc::new(ProcessedMessageRepository::new(pool.clone())),
        Arc::new(NotificationEventRepository::new(pool.clone())),
        service.clone(),
        push,
        hub.clone(),
        Arc::clone(&counters),
    );

    // Queue → publish → consume, the full lifecycle of one event.
    let mut subscription = broker.subscribe(&[topics::NOTIFICATION_EVENTS]).await.unwrap();
    let event_ref = service
        .enqueue_event(
            EVENT_CHECKIN,
            Some(user_id),
            vec![DeliveryTarget::Dashboard, DeliveryTarget::Mobile],
            serde_json::json!({"mood": "okay"}),
        )
        .await
        .unwrap();

    let publisher = OutboxPublisher::new(
        repo,
        Arc::clone(&broker) as Arc<dyn StreamProducer>,
        Arc::clone(&broker) as Arc<dyn EventBus>,
        publisher_config(5),
        Arc::new(PipelineCounters::new()),
    );
    publisher.poll_once().await;

    let msg = subscription.recv().await.expect("event fanned out on the bus");
    consumer.handle_message(&msg).await;

    // Audit row persisted with the original event type.
    let audited: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notification_events WHERE event_type = $1 AND payload->>'mood' = 'okay' AND event_id LIKE $2",
    )
    .bind(EVENT_CHECKIN)
    .bind(format!("%{user_id}%"))
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(audited, 1);

    // Exactly one push attempt, and the hub saw the event.
    assert_eq!(gateway.primary_sends.lock().unwrap().len(), 1);
    assert_eq!(hub_rx.recv().await.unwrap().id, event_ref.id);

    // Broker redelivery of the same message is collapsed by the gate.
    consumer.handle_message(&msg).await;
    assert_eq!(gateway.primary_sends.lock().unwrap().len(), 1);
    assert_eq!(counters.snapshot().deduplicated, 1);
}

#[tokio::test]
async fn malformed_bus_messages_are_dropped_not_retried() {
    let pool = require_db!();
    let (service, _) = outbox_service(&pool);

    let gateway = Arc::new(RecordingGateway::default());
    let token_repo = Arc::new(DeviceTokenRepository::new(pool.clone()));
    let counters = Arc::new(PipelineCounters::new());
    let consumer = carelink_consumer::BusConsumer::new(
        Arc::new(MemoryBroker::new(8)) as Arc<dyn EventBus>,
        Arc::new(ProcessedMessageRepository::new(pool.clone())),
        Arc::new(NotificationEventRepository::new(pool.clone())),
        service,
        Arc::new(PushService::new(
            token_repo as Arc<dyn TokenStore>,
            gateway as Arc<dyn PushGateway>,
            PushConfig::default(),
            Arc::new(PipelineCounters::new()),
        )),
        carelink_bus::EventHub::new(8),
        Arc::clone(&counters),
    );

    consumer
        .handle_message(&BusMessage {
            topic: topics::NOTIFICATION_EVENTS.to_string(),
            payload: "{{not json".to_string(),
        })
        .await;

    let snap = counters.snapshot();
    assert_eq!(snap.malformed, 1);
    assert_eq!(snap.deduplicated, 0);
}

#[tokio::test]
async fn sweep_alerts_each_caregiver_once_per_day() {
    let pool = require_db!();
    let (service, _) = outbox_service(&pool);

    let users = Arc::new(UserRepository::new(pool.clone()));
    let checkins = Arc::new(CheckInRepository::new(pool.clone()));
    let relationships = Arc::new(RelationshipRepository::new(pool.clone()));

    let senior = Uuid::new_v4();
    users.upsert(senior, "Margaret", "margaret@example.com").await.unwrap();

    let caregiver_a = Uuid::new_v4();
    let caregiver_b = Uuid::new_v4();
    for (caregiver, relation) in [(caregiver_a, "daughter"), (caregiver_b, "nurse")] {
        sqlx::query(
            "INSERT INTO relationships (senior_id, link_acc_id, relation) VALUES ($1, $2, $3)",
        )
        .bind(senior)
        .bind(caregiver)
        .bind(relation)
        .execute(&pool)
        .await
        .unwrap();
    }

    let sweep = carelink_scheduler::MissedCheckInSweep::new(
        Arc::clone(&users),
        Arc::clone(&checkins),
        relationships,
        service,
        SchedulerConfig {
            enabled: true,
            sweep_period_seconds: 60,
            grace_window_hours: 0,
        },
    );

    sweep.sweep_once().await;
    sweep.sweep_once().await;

    // One alert per caregiver from the first sweep; the second is
    // throttled by the reminder claim.
    let alerts: Vec<(serde_json::Value,)> = sqlx::query_as(
        "SELECT payload FROM outbox_events WHERE event_type = $1 AND payload->'payload'->>'senior_id' = $2",
    )
    .bind(EVENT_MISSED_CHECKIN_ALERT)
    .bind(senior.to_string())
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(alerts.len(), 2);

    let alerted: HashSet<String> = alerts
        .iter()
        .filter_map(|(p,)| {
            p.get("payload")
                .and_then(|v| v.get("caregiver_id"))
                .and_then(|v| v.as_str())
                .map(str::to_string)
        })
        .collect();
    assert_eq!(
        alerted,
        HashSet::from([caregiver_a.to_string(), caregiver_b.to_string()])
    );

    let user = users.find_by_id(senior).await.unwrap().unwrap();
    assert!(user.last_reminder_at.is_some());
}

#[tokio::test]
async fn sweep_skips_users_who_checked_in_today() {
    let pool = require_db!();
    let (service, _) = outbox_service(&pool);

    let users = Arc::new(UserRepository::new(pool.clone()));
    let checkins = Arc::new(CheckInRepository::new(pool.clone()));

    let senior = Uuid::new_v4();
    users.upsert(senior, "Harold", "harold@example.com").await.unwrap();
    checkins.insert(senior, "good").await.unwrap();

    let sweep = carelink_scheduler::MissedCheckInSweep::new(
        Arc::clone(&users),
        checkins,
        Arc::new(RelationshipRepository::new(pool.clone())),
        service,
        SchedulerConfig {
            enabled: true,
            sweep_period_seconds: 60,
            grace_window_hours: 0,
        },
    );
    sweep.sweep_once().await;

    let alerts: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM outbox_events WHERE event_type = $1 AND payload->'payload'->>'senior_id' = $2",
    )
    .bind(EVENT_MISSED_CHECKIN_ALERT)
    .bind(senior.to_string())
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(alerts, 0);

    let user = users.find_by_id(senior).await.unwrap().unwrap();
    assert!(user.last_reminder_at.is_none(), "throttle must not be claimed");
}
