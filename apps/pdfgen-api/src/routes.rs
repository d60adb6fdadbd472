//! Router assembly

use std::sync::Arc;

use axum::{
    extract::DefaultBodyLimit,
    routing::{get, post},
    Router,
};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::handlers;
use crate::state::AppState;

pub fn router(state: Arc<AppState>) -> Router {
    let limits = state.limits;

    // CORS configuration for web clients
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    // JSON endpoints
    let documents = Router::new()
        .route("/compile", post(handlers::compile))
        .route("/proposal", post(handlers::proposal))
        .route(
            "/customer-header/preview",
            post(handlers::preview_customer_header),
        )
        .route("/customer-header", post(handlers::create_customer_header))
        .route(
            "/customer-headers/:id",
            get(handlers::get_customer_header).put(handlers::update_customer_header),
        )
        .layer(DefaultBodyLimit::max(limits.json_bytes));

    // Multipart uploads
    let uploads = Router::new()
        .route("/compile-file", post(handlers::compile_file))
        .route("/compile-bundle", post(handlers::compile_bundle))
        .layer(DefaultBodyLimit::max(limits.upload_bytes));

    Router::new()
        // Health checks
        .route("/health", get(handlers::health))
        .route("/pdf/health", get(handlers::pdf_health))
        .route("/templates", get(handlers::list_templates))
        .route("/customer-headers", get(handlers::list_customer_headers))
        .route(
            "/customer-headers/:id/pdf",
            get(handlers::get_customer_header_pdf),
        )
        .merge(documents)
        .merge(uploads)
        // Add middleware
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}
