use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode, header},
};

use chirpy_types::api::PolkaWebhookRequest;

use crate::auth::AppState;
use crate::error::ApiError;

/// POST /api/polka/webhooks — payment provider callbacks, authenticated by
/// a shared API key instead of a user token.
pub async fn polka_webhook(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<PolkaWebhookRequest>,
) -> Result<StatusCode, ApiError> {
    let key = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("ApiKey "))
        .ok_or(ApiError::Unauthorized)?;

    if key != state.polka_key {
        return Err(ApiError::Unauthorized);
    }

    // Acknowledge events we do not handle.
    if req.event != "user.upgraded" {
        return Ok(StatusCode::NO_CONTENT);
    }

    let user = state.db.get_user(req.data.user_id)?;
    state
        .db
        .update_user(user.id, &user.email, &user.password, true)?;

    Ok(StatusCode::NO_CONTENT)
}
