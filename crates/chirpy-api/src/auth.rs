use std::sync::Arc;
use std::sync::atomic::AtomicU64;

use anyhow::anyhow;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier, password_hash::{SaltString, rand_core::OsRng}};
use axum::{Json, extract::State, http::{HeaderMap, StatusCode, header}, response::IntoResponse};
use chrono::{Duration, Utc};
use jsonwebtoken::{Algorithm, DecodingKey, EncodingKey, Header, Validation, decode, encode};

use chirpy_db::Database;
use chirpy_types::api::{Claims, LoginRequest, LoginResponse, RefreshResponse};

use crate::error::ApiError;

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub db: Database,
    pub jwt_secret: String,
    pub polka_key: String,
    pub fileserver_hits: AtomicU64,
}

pub const ACCESS_ISSUER: &str = "chirpy-access";
pub const REFRESH_ISSUER: &str = "chirpy-refresh";

/// Access tokens live at most an hour; clients may request less.
const ACCESS_TTL_SECS: i64 = 3600;
const REFRESH_TTL_DAYS: i64 = 60;

// ── Handlers ────────────────────────────────────────────────────────────

/// POST /api/login — verify credentials and issue an access/refresh pair.
pub async fn login(
    State(state): State<AppState>,
    Json(req): Json<LoginRequest>,
) -> Result<impl IntoResponse, ApiError> {
    let user = state
        .db
        .get_users()?
        .into_iter()
        .find(|u| u.email == req.email)
        .ok_or(ApiError::Unauthorized)?;

    // Verify password
    let parsed_hash = PasswordHash::new(&user.password)
        .map_err(|e| anyhow!("stored password hash is unparseable: {e}"))?;

    Argon2::default()
        .verify_password(req.password.as_bytes(), &parsed_hash)
        .map_err(|_| ApiError::Unauthorized)?;

    let expires_in = req
        .expires_in_seconds
        .unwrap_or(ACCESS_TTL_SECS)
        .clamp(1, ACCESS_TTL_SECS);

    let token = make_token(
        &state.jwt_secret,
        user.id,
        ACCESS_ISSUER,
        Duration::seconds(expires_in),
    )?;
    let refresh_token = make_token(
        &state.jwt_secret,
        user.id,
        REFRESH_ISSUER,
        Duration::days(REFRESH_TTL_DAYS),
    )?;

    Ok(Json(LoginResponse {
        id: user.id,
        email: user.email,
        is_chirpy_red: user.is_chirpy_red,
        token,
        refresh_token,
    }))
}

/// POST /api/refresh — trade a live refresh token for a new access token.
pub async fn refresh(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<impl IntoResponse, ApiError> {
    let token = bearer_token(&headers)?;
    let claims = parse_token(&state.jwt_secret, token, REFRESH_ISSUER)?;

    if state.db.get_revoked_tokens()?.contains_key(token) {
        return Err(ApiError::Unauthorized);
    }

    let user_id = subject_id(&claims)?;
    let access = make_token(
        &state.jwt_secret,
        user_id,
        ACCESS_ISSUER,
        Duration::seconds(ACCESS_TTL_SECS),
    )?;

    Ok(Json(RefreshResponse { token: access }))
}

/// POST /api/revoke — mark the presented refresh token revoked.
pub async fn revoke(
    State(state): State<AppState>,
    headers: HeaderMap,
) -> Result<StatusCode, ApiError> {
    let token = bearer_token(&headers)?;
    parse_token(&state.jwt_secret, token, REFRESH_ISSUER)?;

    state.db.revoke_token(token, Utc::now())?;
    Ok(StatusCode::NO_CONTENT)
}

// ── Token helpers ───────────────────────────────────────────────────────

/// Issues a signed HS256 token for the user under the given issuer.
pub fn make_token(
    secret: &str,
    user_id: u64,
    issuer: &str,
    ttl: Duration,
) -> anyhow::Result<String> {
    let now = Utc::now();
    let claims = Claims {
        iss: issuer.to_string(),
        sub: user_id.to_string(),
        iat: now.timestamp() as usize,
        exp: (now + ttl).timestamp() as usize,
    };

    let token = encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )?;

    Ok(token)
}

/// Checks signature, expiry, and issuer. Every failure reads as 401 so the
/// response cannot reveal which check tripped.
pub fn parse_token(secret: &str, token: &str, issuer: &str) -> Result<Claims, ApiError> {
    let mut validation = Validation::new(Algorithm::HS256);
    validation.set_issuer(&[issuer]);

    let token_data = decode::<Claims>(
        token,
        &DecodingKey::from_secret(secret.as_bytes()),
        &validation,
    )
    .map_err(|_| ApiError::Unauthorized)?;

    Ok(token_data.claims)
}

pub fn bearer_token(headers: &HeaderMap) -> Result<&str, ApiError> {
    headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|s| s.strip_prefix("Bearer "))
        .ok_or(ApiError::Unauthorized)
}

/// Resolves the bearer token on a request to access-token claims.
pub fn authenticate(headers: &HeaderMap, jwt_secret: &str) -> Result<Claims, ApiError> {
    let token = bearer_token(headers)?;
    parse_token(jwt_secret, token, ACCESS_ISSUER)
}

pub(crate) fn subject_id(claims: &Claims) -> Result<u64, ApiError> {
    claims.sub.parse().map_err(|_| ApiError::Unauthorized)
}

pub(crate) fn hash_password(password: &str) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let argon2 = Argon2::default();
    let hash = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!("password hashing failed: {e}"))?
        .to_string();

    Ok(hash)
}
