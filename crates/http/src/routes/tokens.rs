//! Token-pair endpoint over the server credential store

use crate::{
    cookies::CookieStore,
    error::HttpError,
    state::AppState,
    types::{OkResponse, TokenPairRequest, TokenPairResponse},
};
use axum::extract::{Json, State};
use portal_core::{CredentialPair, claims::access_expiry};
use tracing::{info, instrument};
use utoipa_axum::{router::OpenApiRouter, routes};

/// Current pair as seen by the cookie jar
#[utoipa::path(
    get,
    path = "/api/auth/tokens",
    responses(
        (status = 200, description = "Stored tokens, null when absent", body = TokenPairResponse),
    ),
    tag = "auth"
)]
#[instrument(name = "get_tokens", skip_all)]
pub async fn get_tokens(cookies: CookieStore) -> Json<TokenPairResponse> {
    let pair = cookies.credentials();
    Json(TokenPairResponse {
        access_expires_at: pair.access.as_deref().and_then(access_expiry),
        access: pair.access,
        refresh: pair.refresh,
    })
}

/// Store a pair obtained from a login or signup exchange
#[utoipa::path(
    post,
    path = "/api/auth/tokens",
    request_body = TokenPairRequest,
    responses(
        (status = 200, description = "Tokens stored", body = OkResponse),
        (status = 400, description = "Empty token, or a token that cannot be stored in a cookie"),
    ),
    tag = "auth"
)]
#[instrument(name = "set_tokens", skip_all)]
pub async fn set_tokens(
    State(app_state): State<AppState>,
    mut cookies: CookieStore,
    Json(request): Json<TokenPairRequest>,
) -> Result<(CookieStore, Json<OkResponse>), HttpError> {
    if request.access.is_empty() || request.refresh.is_empty() {
        return Err(HttpError::BadRequest(
            "access and refresh must both be non-empty".to_string(),
        ));
    }

    cookies.store_credentials(
        &CredentialPair::new(request.access, request.refresh),
        &app_state.config.cookies,
    )?;
    info!("Session tokens stored");
    Ok((cookies, Json(OkResponse::ok())))
}

/// Clear both tokens; clearing an empty jar succeeds too
#[utoipa::path(
    delete,
    path = "/api/auth/tokens",
    responses(
        (status = 200, description = "Tokens cleared", body = OkResponse),
    ),
    tag = "auth"
)]
#[instrument(name = "clear_tokens", skip_all)]
pub async fn clear_tokens(
    State(app_state): State<AppState>,
    mut cookies: CookieStore,
) -> (CookieStore, Json<OkResponse>) {
    cookies.clear_credentials(&app_state.config.cookies);
    info!("Session tokens cleared");
    (cookies, Json(OkResponse::ok()))
}

pub fn router() -> OpenApiRouter<AppState> {
    OpenApiRouter::new().routes(routes!(get_tokens, set_tokens, clear_tokens))
}
