//! Relay endpoint

use crate::{
    cookies::CookieStore,
    error::HttpError,
    forwarding::OutboundRequest,
    state::AppState,
    types::ForwardRequest,
};
use axum::{
    extract::{Json, State},
    response::{IntoResponse, Response},
};
use tracing::{instrument, warn};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Forward a request to the backend with the caller's session credentials
///
/// The allow-list check runs before anything touches the network. The upstream
/// status and body come back verbatim with only `content-type` preserved, plus
/// any `Set-Cookie` directives from a credential refresh.
#[utoipa::path(
    post,
    path = "/api/relay",
    request_body = ForwardRequest,
    responses(
        (status = 200, description = "Upstream response, status passed through"),
        (status = 400, description = "Disallowed path or malformed envelope"),
        (status = 502, description = "Backend unreachable"),
    ),
    tag = "relay"
)]
#[instrument(
    name = "relay_request",
    skip(app_state, cookies, request),
    fields(method = %request.method, path = %request.path)
)]
pub async fn relay_handler(
    State(app_state): State<AppState>,
    mut cookies: CookieStore,
    Json(request): Json<ForwardRequest>,
) -> Result<Response, HttpError> {
    let url = app_state.config.resolve(&request.path);
    if !app_state.allow_list.is_allowed(&url) {
        warn!("Rejected relay to disallowed target {}", url);
        return Err(HttpError::DisallowedPath(request.path));
    }

    let call = OutboundRequest::from_envelope(&request, url)?;
    let upstream = app_state.coordinator().relay(&mut cookies, call).await?;

    Ok((cookies, upstream.into_response()).into_response())
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(relay_handler))
}
