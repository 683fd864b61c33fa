//! Current-user passthrough and resolution

use crate::{
    cookies::CookieStore,
    error::HttpError,
    forwarding::{OutboundRequest, forward},
    state::AppState,
};
use axum::{
    extract::State,
    response::{IntoResponse, Response},
};
use http::Method;
use portal_core::TokenKind;
use serde_json::Value as JsonValue;
use tracing::{debug, instrument};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Backend user profile, forwarded with the caller's cookies
#[utoipa::path(
    get,
    path = "/api/auth/user",
    responses(
        (status = 200, description = "Backend response, status passed through"),
        (status = 502, description = "Backend unreachable"),
    ),
    tag = "auth"
)]
#[instrument(name = "current_user", skip_all)]
pub async fn current_user(
    State(app_state): State<AppState>,
    cookies: CookieStore,
) -> Result<Response, HttpError> {
    let request = OutboundRequest::new(Method::GET, app_state.config.user_url())
        .with_cookie(cookies.cookie_header());
    let response = forward(app_state.upstream.as_ref(), request).await?;
    Ok(response.into_response())
}

/// Resolve the signed-in user for a render; `None` means anonymous.
///
/// Missing tokens, transport failures, non-2xx statuses and non-JSON bodies
/// all degrade to `None`. No refresh is attempted.
pub async fn resolve_current_user(app_state: &AppState, cookies: &CookieStore) -> Option<JsonValue> {
    let access = cookies.get(TokenKind::Access.name())?;

    let request = OutboundRequest::new(Method::GET, app_state.config.user_url())
        .with_cookie(cookies.cookie_header())
        .with_bearer(Some(access));

    match forward(app_state.upstream.as_ref(), request).await {
        Ok(response) if response.is_success() => response.json(),
        Ok(response) => {
            debug!("Current user unavailable: status {}", response.status);
            None
        }
        Err(_) => None,
    }
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(current_user))
}
