//! Dashboard stream and history handlers.

use std::convert::Infallible;

use axum::extract::{Path, Query, State};
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::Json;
use futures::stream::Stream;
use tokio::sync::broadcast;
use uuid::Uuid;

use carelink_entity::notification_event::NotificationEvent;

use crate::dto::request::{HistoryQuery, MarkReadRequest};
use crate::dto::response::{ApiResponse, PaginatedResponse};
use crate::error::ApiError;
use crate::state::AppState;

/// Hard cap on history page size.
const MAX_HISTORY_LIMIT: i64 = 100;

/// GET /dashboard/stream
///
/// Server-sent events fed straight from the in-process hub, so consumed
/// events reach the dashboard without a second network round trip.
pub async fn stream(
    State(state): State<AppState>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let rx = state.hub.subscribe();

    let stream = futures::stream::unfold(rx, |mut rx| async move {
        loop {
            match rx.recv().await {
                Ok(envelope) => {
                    let data = match serde_json::to_string(&envelope) {
                        Ok(data) => data,
                        Err(_) => continue,
                    };
                    let event = Event::default().event(envelope.event_type.clone()).data(data);
                    return Some((Ok(event), rx));
                }
                // A lagged dashboard just misses events; it catches up
                // from the history endpoint.
                Err(broadcast::error::RecvError::Lagged(_)) => continue,
                Err(broadcast::error::RecvError::Closed) => return None,
            }
        }
    });

    Sse::new(stream).keep_alive(KeepAlive::default())
}

/// GET /dashboard/history
pub async fn history(
    State(state): State<AppState>,
    Query(query): Query<HistoryQuery>,
) -> Result<Json<ApiResponse<PaginatedResponse<NotificationEvent>>>, ApiError> {
    let limit = query.limit.clamp(1, MAX_HISTORY_LIMIT);
    let page = query.page.max(1);
    let offset = (page - 1) * limit;

    let total = state.event_repo.count().await?;
    let items = state.event_repo.find_recent(limit, offset).await?;

    Ok(Json(ApiResponse::ok(PaginatedResponse::new(
        items,
        total as u64,
        page as u64,
        limit as u64,
    ))))
}

/// POST /dashboard/history/{id}/read
pub async fn mark_read(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(req): Json<MarkReadRequest>,
) -> Result<Json<ApiResponse<bool>>, ApiError> {
    let updated = state.event_repo.mark_read(id, req.user_id).await?;
    Ok(Json(ApiResponse::ok(updated)))
}
