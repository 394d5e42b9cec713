//! Device token registration handler.

use axum::extract::State;
use axum::Json;

use carelink_entity::device_token::DeviceToken;

use crate::dto::request::SaveDeviceTokenRequest;
use crate::dto::response::ApiResponse;
use crate::error::ApiError;
use crate::state::AppState;

/// POST /save-device-token
pub async fn save_device_token(
    State(state): State<AppState>,
    Json(req): Json<SaveDeviceTokenRequest>,
) -> Result<Json<ApiResponse<DeviceToken>>, ApiError> {
    if req.token.is_empty() {
        return Err(carelink_core::AppError::validation("token must not be empty").into());
    }

    let token = state
        .token_repo
        .upsert(req.user_id, &req.token, &req.platform)
        .await?;

    Ok(Json(ApiResponse::ok(token)))
}
