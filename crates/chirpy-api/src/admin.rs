use std::sync::atomic::Ordering;

use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{Html, Response},
};

use crate::auth::AppState;

/// GET /api/healthz
pub async fn healthz() -> &'static str {
    "OK"
}

/// GET /admin/metrics — the visit counter page.
pub async fn metrics(State(state): State<AppState>) -> Html<String> {
    let hits = state.fileserver_hits.load(Ordering::Relaxed);
    Html(format!(
        "<html><body><h1>Welcome, Chirpy Admin</h1><p>Chirpy has been visited {hits} times!</p></body></html>"
    ))
}

/// POST /admin/reset — zero the visit counter.
pub async fn reset(State(state): State<AppState>) -> &'static str {
    state.fileserver_hits.store(0, Ordering::Relaxed);
    "OK"
}

/// Counts every request that reaches the static site.
pub async fn track_fileserver_hits(
    State(state): State<AppState>,
    req: Request,
    next: Next,
) -> Response {
    state.fileserver_hits.fetch_add(1, Ordering::Relaxed);
    next.run(req).await
}
