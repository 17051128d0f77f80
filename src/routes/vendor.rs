use crate::{AppState, handlers};
use axum::{Router, routing::get};

/// Vendor Router Module
///
/// Nested under `/vendedores`. The access middleware only lets vendors and
/// admins through; the handlers run their queries as the session's user.
pub fn vendor_routes() -> Router<AppState> {
    Router::new()
        // GET /vendedores/api/clientes
        // A vendor's own client portfolio (all clients for an admin).
        .route("/api/clientes", get(handlers::list_my_clients))
}
