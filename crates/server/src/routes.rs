use crate::handlers;
use crate::state::AppState;
use axum::routing::{get, post};
use axum::Router;
use std::path::Path;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeFile;
use tower_http::trace::TraceLayer;

/// Build the router with open CORS and request tracing.
pub fn build_router(state: AppState, static_dir: &Path) -> Router {
    Router::new()
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route("/health", get(handlers::health))
        .route("/query", post(handlers::query))
        .route("/search", post(handlers::search))
        .route("/documents", get(handlers::list_documents))
        .route("/documents/{filename}", get(handlers::get_document))
        .with_state(state)
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
}
