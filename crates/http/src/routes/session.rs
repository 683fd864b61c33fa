//! Session refresh and status endpoints

use crate::{
    cookies::CookieStore,
    error::HttpError,
    refresh::RefreshOutcome,
    routes::user::resolve_current_user,
    state::AppState,
    types::{OkResponse, SessionStatus},
};
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use tracing::instrument;
use utoipa_axum::{router::OpenApiRouter, routes};

/// Rotate the stored pair using the refresh cookie
///
/// On rejection both cookies are cleared and the caller gets a 401.
#[utoipa::path(
    post,
    path = "/api/auth/refresh",
    responses(
        (status = 200, description = "Credentials rotated", body = OkResponse),
        (status = 401, description = "No refresh token, or refresh rejected"),
        (status = 502, description = "Backend unreachable"),
    ),
    tag = "auth"
)]
#[instrument(name = "refresh_session", skip_all)]
pub async fn refresh_session(
    State(app_state): State<AppState>,
    mut cookies: CookieStore,
) -> Result<Response, HttpError> {
    match app_state.coordinator().refresh(&mut cookies).await? {
        RefreshOutcome::Rotated(_) => Ok((cookies, Json(OkResponse::ok())).into_response()),
        RefreshOutcome::NoRefreshToken => Err(HttpError::AuthenticationFailed(
            "no refresh token".to_string(),
        )),
        RefreshOutcome::Rejected(status) => Ok((
            cookies,
            HttpError::AuthenticationFailed(format!("refresh failed with status {status}")),
        )
            .into_response()),
    }
}

/// Who is signed in, degrading to anonymous on any failure
#[utoipa::path(
    get,
    path = "/api/auth/session",
    responses(
        (status = 200, description = "Session status", body = SessionStatus),
    ),
    tag = "auth"
)]
#[instrument(name = "session_status", skip_all)]
pub async fn session_status(
    State(app_state): State<AppState>,
    cookies: CookieStore,
) -> Json<SessionStatus> {
    let status = resolve_current_user(&app_state, &cookies)
        .await
        .map_or_else(SessionStatus::anonymous, SessionStatus::authenticated);
    Json(status)
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new()
        .routes(routes!(refresh_session))
        .routes(routes!(session_status))
}
