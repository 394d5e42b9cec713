//! CareLink Server — reliable notification pipeline for senior care.
//!
//! Main entry point that wires all crates together and starts the
//! long-running loops: outbox publisher, bus consumer, missed-check-in
//! sweep, and the HTTP surface.

use std::sync::Arc;

use tokio::sync::watch;
use tracing;
use tracing_subscriber::{fmt, EnvFilter};

use carelink_core::config::AppConfig;
use carelink_core::error::AppError;
use carelink_core::metrics::PipelineCounters;

#[tokio::main]
async fn main() {
    let env = std::env::var("CARELINK_ENV").unwrap_or_else(|_| "development".to_string());
    let config = match AppConfig::load(&env) {
        Ok(c) => c,
        Err(e) => {
            eprintln!("Failed to load configuration: {}", e);
            std::process::exit(1);
        }
    };

    init_logging(&config);

    if let Err(e) = run(config).await {
        tracing::error!("Server error: {}", e);
        std::process::exit(1);
    }
}

/// Initialize tracing/logging
fn init_logging(config: &AppConfig) {
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(&config.logging.level));

    match config.logging.format.as_str() {
        "json" => {
            fmt()
                .json()
                .with_env_filter(filter)
                .with_target(true)
                .with_thread_ids(true)
                .init();
        }
        _ => {
            fmt()
                .pretty()
                .with_env_filter(filter)
                .with_target(true)
                .init();
        }
    }
}

/// Main server run function
async fn run(config: AppConfig) -> Result<(), AppError> {
    tracing::info!("Starting CareLink v{}", env!("CARGO_PKG_VERSION"));

    // ── Step 1: Database connection + migrations ─────────────────
    tracing::info!("Connecting to database...");
    let db = carelink_database::DatabasePool::connect(&config.database).await?;
    carelink_database::migration::run_migrations(db.pool()).await?;

    // ── Step 2: Broker connection ────────────────────────────────
    tracing::info!("Connecting to broker...");
    let broker = Arc::new(
        carelink_bus::RedisBroker::connect(&config.broker.url, config.broker.stream_max_len)
            .await?,
    );

    // ── Step 3: Repositories ─────────────────────────────────────
    let pool = db.pool().clone();
    let outbox_repo = Arc::new(
        carelink_database::repositories::outbox::OutboxRepository::new(pool.clone()),
    );
    let dedup_repo = Arc::new(
        carelink_database::repositories::processed_message::ProcessedMessageRepository::new(
            pool.clone(),
        ),
    );
    let event_repo = Arc::new(
        carelink_database::repositories::notification_event::NotificationEventRepository::new(
            pool.clone(),
        ),
    );
    let token_repo = Arc::new(
        carelink_database::repositories::device_token::DeviceTokenRepository::new(pool.clone()),
    );
    let user_repo = Arc::new(carelink_database::repositories::user::UserRepository::new(
        pool.clone(),
    ));
    let checkin_repo = Arc::new(
        carelink_database::repositories::checkin::CheckInRepository::new(pool.clone()),
    );
    let relationship_repo = Arc::new(
        carelink_database::repositories::relationship::RelationshipRepository::new(pool.clone()),
    );

    // ── Step 4: Shared pipeline resources ────────────────────────
    let counters = Arc::new(PipelineCounters::new());
    let hub = carelink_bus::EventHub::new(config.broker.channel_buffer_size);
    let outbox = carelink_outbox::OutboxService::new(Arc::clone(&outbox_repo), Arc::clone(&counters));

    // ── Step 5: Push delivery subsystem ──────────────────────────
    let gateway = Arc::new(carelink_push::FcmGateway::new(config.push.clone())?);
    let push = Arc::new(carelink_push::PushService::new(
        Arc::clone(&token_repo) as Arc<dyn carelink_push::TokenStore>,
        gateway,
        config.push.clone(),
        Arc::clone(&counters),
    ));

    // ── Step 6: Shutdown channel ─────────────────────────────────
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // ── Step 7: Outbox publisher loop ────────────────────────────
    let publisher = carelink_outbox::OutboxPublisher::new(
        Arc::clone(&outbox_repo),
        Arc::clone(&broker) as Arc<dyn carelink_bus::StreamProducer>,
        Arc::clone(&broker) as Arc<dyn carelink_bus::EventBus>,
        config.outbox.clone(),
        Arc::clone(&counters),
    );
    let publisher_cancel = shutdown_rx.clone();
    let publisher_handle = tokio::spawn(async move {
        publisher.run(publisher_cancel).await;
    });

    // ── Step 8: Bus consumer loop ────────────────────────────────
    let consumer = carelink_consumer::BusConsumer::new(
        Arc::clone(&broker) as Arc<dyn carelink_bus::EventBus>,
        Arc::clone(&dedup_repo),
        Arc::clone(&event_repo),
        outbox.clone(),
        Arc::clone(&push),
        hub.clone(),
        Arc::clone(&counters),
    );
    let consumer_cancel = shutdown_rx.clone();
    let consumer_handle = tokio::spawn(async move {
        consumer.run(consumer_cancel).await;
    });

    // ── Step 9: Missed-check-in sweep ────────────────────────────
    let sweep_handle = if config.scheduler.enabled {
        let sweep = carelink_scheduler::MissedCheckInSweep::new(
            Arc::clone(&user_repo),
            Arc::clone(&checkin_repo),
            Arc::clone(&relationship_repo),
            outbox.clone(),
            config.scheduler.clone(),
        );
        let sweep_cancel = shutdown_rx.clone();
        Some(tokio::spawn(async move {
            sweep.run(sweep_cancel).await;
        }))
    } else {
        tracing::info!("Missed-check-in sweep disabled");
        None
    };

    // ── Step 10: HTTP surface ────────────────────────────────────
    let state = carelink_api::AppState {
        config: Arc::new(config.clone()),
        db: db.clone(),
        outbox,
        hub,
        counters,
        user_repo,
        checkin_repo,
        token_repo,
        event_repo,
    };
    let router = carelink_api::build_router(state);

    let addr = format!("{}:{}", config.server.host, config.server.port);
    tracing::info!("Listening on {addr}");
    let listener = tokio::net::TcpListener::bind(&addr)
        .await
        .map_err(|e| AppError::internal(format!("Failed to bind {addr}: {e}")))?;

    let server_cancel = shutdown_rx.clone();
    axum::serve(listener, router)
        .with_graceful_shutdown(shutdown_signal(server_cancel))
        .await
        .map_err(|e| AppError::internal(format!("HTTP server error: {e}")))?;

    // ── Step 11: Drain background loops ──────────────────────────
    tracing::info!("Shutting down background loops...");
    let _ = shutdown_tx.send(true);
    let _ = publisher_handle.await;
    let _ = consumer_handle.await;
    if let Some(handle) = sweep_handle {
        let _ = handle.await;
    }
    db.close().await;

    tracing::info!("CareLink shut down cleanly");
    Ok(())
}

/// Resolve when Ctrl-C arrives or the shutdown channel flips.
async fn shutdown_signal(mut cancel: watch::Receiver<bool>) {
    tokio::select! {
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("Received Ctrl-C");
        }
        _ = cancel.changed() => {}
    }
}
