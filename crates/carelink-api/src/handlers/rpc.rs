//! Synchronous RPC facade handlers.
//!
//! Narrow request/response surface for other services: event
//! publication (delegating to the outbox) and best-effort read-only
//! lookups. Missing rows are `ok: false` results, never HTTP faults.

use axum::extract::{Path, Query, State};
use axum::Json;
use uuid::Uuid;

use carelink_entity::checkin::CheckIn;
use carelink_entity::device_token::DeviceToken;
use carelink_entity::user::User;

use crate::dto::request::{CheckInsQuery, PublishEventRequest};
use crate::dto::response::{EnqueuedResponse, HealthResponse, RpcResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Hard cap on check-in history reads.
const MAX_CHECKIN_LIMIT: i64 = 100;

/// POST /rpc/publish-event
pub async fn publish_event(
    State(state): State<AppState>,
    Json(req): Json<PublishEventRequest>,
) -> Result<Json<RpcResponse<EnqueuedResponse>>, ApiError> {
    if req.event_type.is_empty() {
        return Ok(Json(RpcResponse::missing("event_type is required")));
    }

    let event_ref = state
        .outbox
        .enqueue_event(&req.event_type, req.user_id, req.target, req.payload)
        .await?;

    Ok(Json(RpcResponse::ok_with_message(
        EnqueuedResponse {
            event_id: event_ref.id,
        },
        "event durably queued",
    )))
}

/// GET /rpc/users/{id}
pub async fn get_user(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RpcResponse<User>>, ApiError> {
    let user = state.user_repo.find_by_id(user_id).await?;
    Ok(Json(match user {
        Some(user) => RpcResponse::ok(user),
        None => RpcResponse::missing(format!("user {user_id} not found")),
    }))
}

/// GET /rpc/users/{id}/device-tokens
pub async fn get_device_tokens(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
) -> Result<Json<RpcResponse<Vec<DeviceToken>>>, ApiError> {
    let tokens = state.token_repo.find_by_user(user_id).await?;
    Ok(Json(if tokens.is_empty() {
        RpcResponse::missing(format!("no device tokens for user {user_id}"))
    } else {
        RpcResponse::ok(tokens)
    }))
}

/// GET /rpc/users/{id}/checkins
pub async fn get_check_ins(
    State(state): State<AppState>,
    Path(user_id): Path<Uuid>,
    Query(query): Query<CheckInsQuery>,
) -> Result<Json<RpcResponse<Vec<CheckIn>>>, ApiError> {
    let limit = query.limit.clamp(1, MAX_CHECKIN_LIMIT);
    let checkins = state
        .checkin_repo
        .find_recent_by_user(user_id, limit)
        .await?;
    Ok(Json(RpcResponse::ok(checkins)))
}

/// GET /rpc/health
pub async fn health(State(state): State<AppState>) -> Json<RpcResponse<HealthResponse>> {
    let database = match state.db.health_check().await {
        Ok(true) => "connected",
        _ => "unavailable",
    };

    Json(RpcResponse::ok(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
        database: database.to_string(),
        counters: state.counters.snapshot(),
    }))
}
