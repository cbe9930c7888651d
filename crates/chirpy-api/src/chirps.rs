use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, StatusCode},
    response::IntoResponse,
};
use tracing::error;

use chirpy_db::StoreError;
use chirpy_types::api::{ChirpRequest, ValidateChirpResponse};

use crate::auth::{self, AppState};
use crate::error::ApiError;

const MAX_CHIRP_LEN: usize = 140;

const PROFANITIES: [&str; 3] = ["kerfuffle", "sharbert", "fornax"];

/// Masks profanities appearing as whole space-separated words. Occurrences
/// with punctuation attached ("sharbert!") pass through untouched.
fn clean_body(body: &str) -> String {
    body.split(' ')
        .map(|word| {
            if PROFANITIES.contains(&word.to_lowercase().as_str()) {
                "****"
            } else {
                word
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}

fn validate_body(body: &str) -> Result<(), ApiError> {
    if body.chars().count() > MAX_CHIRP_LEN {
        return Err(ApiError::BadRequest("Chirp is too long"));
    }
    Ok(())
}

/// A non-numeric id cannot name a chirp, so it reads as not found.
fn parse_chirp_id(raw: &str) -> Result<u64, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::from(StoreError::NotFound("chirp")))
}

// ── Handlers ────────────────────────────────────────────────────────────

/// POST /api/validate_chirp — length-check and mask a body without storing it.
pub async fn validate_chirp(Json(req): Json<ChirpRequest>) -> Result<impl IntoResponse, ApiError> {
    validate_body(&req.body)?;

    Ok(Json(ValidateChirpResponse {
        cleaned_body: clean_body(&req.body),
    }))
}

/// POST /api/chirps — store a chirp for the authenticated user.
pub async fn create_chirp(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(req): Json<ChirpRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let claims = auth::authenticate(&headers, &state.jwt_secret)?;
    let author_id = auth::subject_id(&claims)?;

    validate_body(&req.body)?;
    let cleaned = clean_body(&req.body);

    // Run the blocking store write off the async runtime
    let db = state.clone();
    let chirp = tokio::task::spawn_blocking(move || db.db.create_chirp(&cleaned, author_id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); ApiError::Internal(e.into()) })??;

    Ok((StatusCode::CREATED, Json(chirp)))
}

/// GET /api/chirps — every chirp, ascending by id.
pub async fn get_chirps(State(state): State<AppState>) -> Result<impl IntoResponse, ApiError> {
    let db = state.clone();
    let chirps = tokio::task::spawn_blocking(move || db.db.get_chirps())
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); ApiError::Internal(e.into()) })??;

    Ok(Json(chirps))
}

/// GET /api/chirps/{chirp_id}
pub async fn get_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<String>,
) -> Result<impl IntoResponse, ApiError> {
    let id = parse_chirp_id(&chirp_id)?;

    let db = state.clone();
    let chirp = tokio::task::spawn_blocking(move || db.db.get_chirp(id))
        .await
        .map_err(|e| { error!("spawn_blocking join error: {}", e); ApiError::Internal(e.into()) })??;

    Ok(Json(chirp))
}

/// DELETE /api/chirps/{chirp_id} — authors may delete only their own chirps.
pub async fn delete_chirp(
    State(state): State<AppState>,
    Path(chirp_id): Path<String>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let claims = auth::authenticate(&headers, &state.jwt_secret)?;
    let author_id = auth::subject_id(&claims)?;
    let id = parse_chirp_id(&chirp_id)?;

    let db = state.clone();
    tokio::task::spawn_blocking(move || {
        let chirp = db.db.get_chirp(id)?;
        if chirp.author_id != author_id {
            return Err(ApiError::Forbidden);
        }
        db.db.delete_chirp(id)?;
        Ok::<_, ApiError>(())
    })
    .await
    .map_err(|e| { error!("spawn_blocking join error: {}", e); ApiError::Internal(e.into()) })??;

    Ok(StatusCode::NO_CONTENT)
}
