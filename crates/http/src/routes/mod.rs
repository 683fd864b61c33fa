//! API route definitions
use crate::state::AppState;
use axum::{Json, Router, routing::get};
use tower_http::trace::TraceLayer;
use utoipa::OpenApi;
use utoipa_axum::router::OpenApiRouter;

pub mod health;
pub mod relay;
pub mod session;
pub mod tokens;
pub mod user;

#[derive(OpenApi)]
#[openapi(
    tags(
        (name = "relay", description = "Allow-listed, credential-attaching backend relay"),
        (name = "auth", description = "Server credential store and session endpoints"),
        (name = "health", description = "Liveness"),
    ),
)]
struct ApiDoc;

/// All routes with their OpenAPI descriptions, state still unbound
pub fn api_router() -> OpenApiRouter<AppState> {
    OpenApiRouter::with_openapi(ApiDoc::openapi())
        .merge(health::router())
        .merge(relay::router())
        .merge(tokens::router())
        .merge(session::router())
        .merge(user::router())
}

/// Build the complete application router
pub fn router(state: AppState) -> Router {
    let (router, api) = api_router().split_for_parts();

    router
        .route(
            "/api/openapi.json",
            get(move || {
                let api = api.clone();
                async move { Json(api) }
            }),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
