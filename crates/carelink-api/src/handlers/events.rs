//! Event ingestion handlers.
//!
//! These endpoints are how the CRUD layer's domain actions enter the
//! pipeline: each records its local state and appends an event to the
//! outbox. The append is the only failure the caller can see;
//! everything downstream is eventual.

use axum::extract::State;
use axum::Json;
use chrono::Utc;

use carelink_core::events::{
    DeliveryTarget, EVENT_CHECKIN, EVENT_DAILY_LOGIN, EVENT_SMS_REQUEST, EVENT_URGENT_SMS_REQUEST,
};

use crate::dto::request::{CheckInRequest, DailyLoginRequest, SendSmsRequest};
use crate::dto::response::{ApiResponse, EnqueuedResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// POST /checkin
pub async fn checkin(
    State(state): State<AppState>,
    Json(req): Json<CheckInRequest>,
) -> Result<Json<ApiResponse<EnqueuedResponse>>, ApiError> {
    let checkin = state.checkin_repo.insert(req.user_id, &req.mood).await?;
    state
        .user_repo
        .record_check_in(req.user_id, Utc::now())
        .await?;

    let mut target = vec![DeliveryTarget::Dashboard];
    if req.notify_mobile {
        target.push(DeliveryTarget::Mobile);
    }

    let event_ref = state
        .outbox
        .enqueue_event(
            EVENT_CHECKIN,
            Some(req.user_id),
            target,
            serde_json::json!({
                "checkin_id": checkin.id,
                "mood": checkin.mood,
            }),
        )
        .await?;

    Ok(Json(ApiResponse::ok(EnqueuedResponse {
        event_id: event_ref.id,
    })))
}

/// POST /daily-login
pub async fn daily_login(
    State(state): State<AppState>,
    Json(req): Json<DailyLoginRequest>,
) -> Result<Json<ApiResponse<EnqueuedResponse>>, ApiError> {
    let event_ref = state
        .outbox
        .enqueue_event(
            EVENT_DAILY_LOGIN,
            Some(req.user_id),
            vec![DeliveryTarget::Dashboard],
            serde_json::json!({}),
        )
        .await?;

    Ok(Json(ApiResponse::ok(EnqueuedResponse {
        event_id: event_ref.id,
    })))
}

/// POST /send-sms
pub async fn send_sms(
    State(state): State<AppState>,
    Json(req): Json<SendSmsRequest>,
) -> Result<Json<ApiResponse<EnqueuedResponse>>, ApiError> {
    let event_ref = state
        .outbox
        .enqueue_event(
            EVENT_SMS_REQUEST,
            Some(req.user_id),
            vec![DeliveryTarget::Dashboard],
            serde_json::json!({
                "to": req.to,
                "message": req.message,
            }),
        )
        .await?;

    Ok(Json(ApiResponse::ok(EnqueuedResponse {
        event_id: event_ref.id,
    })))
}

/// POST /send-urgent-sms
pub async fn send_urgent_sms(
    State(state): State<AppState>,
    Json(req): Json<SendSmsRequest>,
) -> Result<Json<ApiResponse<EnqueuedResponse>>, ApiError> {
    let event_ref = state
        .outbox
        .enqueue_event(
            EVENT_URGENT_SMS_REQUEST,
            Some(req.user_id),
            vec![DeliveryTarget::Dashboard, DeliveryTarget::Mobile],
            serde_json::json!({
                "to": req.to,
                "message": req.message,
                "urgent": true,
            }),
        )
        .await?;

    Ok(Json(ApiResponse::ok(EnqueuedResponse {
        event_id: event_ref.id,
    })))
}
