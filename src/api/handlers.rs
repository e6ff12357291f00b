use super::AppState;
use super::page::IndexTemplate;
use crate::errors::ViewError;
use crate::models::now_ms;
use crate::view::ViewState;
use askama::Template;
use axum::{
    extract::State,
    http::StatusCode,
    response::{Html, Json, Redirect},
};
use axum_extra::extract::cookie::CookieJar;

type ViewResponse = (CookieJar, Result<Json<ViewState>, ViewError>);

/// GET /health: simple liveness check
pub async fn health() -> &'static str {
    "OK"
}

/// GET /: the page itself
pub async fn index(
    State(state): State<AppState>,
    jar: CookieJar,
) -> (CookieJar, Result<Html<String>, StatusCode>) {
    let (jar, session) = state.sessions.resolve(jar);
    let page = IndexTemplate::new(&session.state(), now_ms())
        .render()
        .map(Html)
        .map_err(|e| {
            tracing::error!("rendering page failed: {e}");
            StatusCode::INTERNAL_SERVER_ERROR
        });
    (jar, page)
}

/// GET /api/state
pub async fn get_state(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Json<ViewState>) {
    let (jar, session) = state.sessions.resolve(jar);
    (jar, Json(session.state()))
}

/// POST /api/refresh: fetch the current rate
pub async fn refresh(State(state): State<AppState>, jar: CookieJar) -> ViewResponse {
    let (jar, session) = state.sessions.resolve(jar);
    (jar, session.refresh().await.map(Json))
}

/// POST /api/save: persist the current rate as the saved one
pub async fn save(State(state): State<AppState>, jar: CookieJar) -> ViewResponse {
    let (jar, session) = state.sessions.resolve(jar);
    (jar, session.save().await.map(Json))
}

/// POST /api/ip: look up the backend's public IP
pub async fn backend_ip(State(state): State<AppState>, jar: CookieJar) -> ViewResponse {
    let (jar, session) = state.sessions.resolve(jar);
    (jar, session.fetch_backend_ip().await.map(Json))
}

/// POST /refresh: form variant, back to the page afterwards
pub async fn refresh_form(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (jar, session) = state.sessions.resolve(jar);
    if let Err(e) = session.refresh().await {
        tracing::debug!("refresh ignored: {e}");
    }
    (jar, Redirect::to("/"))
}

/// POST /save
pub async fn save_form(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (jar, session) = state.sessions.resolve(jar);
    if let Err(e) = session.save().await {
        tracing::debug!("save ignored: {e}");
    }
    (jar, Redirect::to("/"))
}

/// POST /ip
pub async fn backend_ip_form(State(state): State<AppState>, jar: CookieJar) -> (CookieJar, Redirect) {
    let (jar, session) = state.sessions.resolve(jar);
    if let Err(e) = session.fetch_backend_ip().await {
        tracing::debug!("ip lookup ignored: {e}");
    }
    (jar, Redirect::to("/"))
}
