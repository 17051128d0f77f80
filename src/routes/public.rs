use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Public Router Module
///
/// Endpoints that never require a session. Catalog reads go through the
/// anonymous client, so only rows the platform exposes publicly come back.
pub fn public_routes() -> Router<AppState> {
    Router::new()
        // GET /health
        // Liveness probe for the load balancer.
        .route("/health", get(|| async { "ok" }))
        // GET /api/productos?categoria=...&destacado=...&width=...
        // Catalog listing, newest first, with optimized image URLs.
        .route("/api/productos", get(handlers::list_products))
        // GET /api/productos/{id}?width=...
        .route("/api/productos/{id}", get(handlers::get_product))
}
