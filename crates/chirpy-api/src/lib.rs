pub mod admin;
pub mod auth;
pub mod chirps;
pub mod error;
pub mod users;
pub mod webhooks;

use std::path::Path;

use axum::{
    Router,
    middleware::from_fn_with_state,
    routing::{get, post},
};
use tower_http::services::ServeDir;

use crate::auth::AppState;

/// Assembles the API, admin, and static-site routes. CORS and tracing
/// layers are left to the caller.
pub fn router(state: AppState, file_root: &Path) -> Router {
    let app_files = Router::new()
        .nest_service("/app", ServeDir::new(file_root))
        .layer(from_fn_with_state(
            state.clone(),
            admin::track_fileserver_hits,
        ));

    Router::new()
        .route("/api/healthz", get(admin::healthz))
        .route("/api/validate_chirp", post(chirps::validate_chirp))
        .route("/api/users", post(users::create_user).put(users::update_user))
        .route("/api/login", post(auth::login))
        .route("/api/refresh", post(auth::refresh))
        .route("/api/revoke", post(auth::revoke))
        .route("/api/chirps", get(chirps::get_chirps).post(chirps::create_chirp))
        .route(
            "/api/chirps/{chirp_id}",
            get(chirps::get_chirp).delete(chirps::delete_chirp),
        )
        .route("/api/polka/webhooks", post(webhooks::polka_webhook))
        .route("/admin/metrics", get(admin::metrics))
        .route("/admin/reset", post(admin::reset))
        .with_state(state)
        .merge(app_files)
}
