use axum::{
    Json,
    extract::State,
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};

use chirpy_types::api::{CreateUserRequest, UpdateUserRequest, UserResponse};

use crate::auth::{self, AppState};
use crate::error::ApiError;

/// POST /api/users — register a new account.
pub async fn create_user(
    State(state): State<AppState>,
    Json(req): Json<CreateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let password_hash = auth::hash_password(&req.password)?;
    let user = state.db.create_user(&req.email, &password_hash)?;

    Ok((
        StatusCode::CREATED,
        Json(UserResponse {
            id: user.id,
            email: user.email,
            is_chirpy_red: user.is_chirpy_red,
        }),
    ))
}

/// PUT /api/users — change the authenticated user's email and password.
pub async fn update_user(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<UpdateUserRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = auth::authenticate(&headers, &state.jwt_secret)?;
    let id = auth::subject_id(&claims)?;

    let current = state.db.get_user(id)?;
    let password_hash = auth::hash_password(&req.password)?;

    // The premium flag only changes through the webhook path.
    let user = state
        .db
        .update_user(id, &req.email, &password_hash, current.is_chirpy_red)?;

    Ok(Json(UserResponse {
        id: user.id,
        email: user.email,
        is_chirpy_red: user.is_chirpy_red,
    }))
}
