use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Admin Router Module
///
/// Nested under `/admin`. Vendors hitting these paths are redirected to their
/// own area by the access middleware before any handler runs; the handlers
/// still refuse non-admin roles with 403.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin/api/clientes
        // Every client, across all vendors.
        .route("/api/clientes", get(handlers::list_all_clients))
        // GET /admin/api/pedidos?estado=...
        // Order book, newest first.
        .route("/api/pedidos", get(handlers::list_orders))
}
