use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod access;
pub mod config;
pub mod cookies;
pub mod error;
pub mod handlers;
pub mod image;
pub mod models;
pub mod repository;
pub mod supabase;

// Routing split by area (public, vendor, admin).
pub mod routes;
use routes::{admin, public, vendor};

// --- Public Re-exports ---

pub use access::{AccessBackend, BackendState};
pub use config::AppConfig;
pub use repository::{RepositoryState, SupabaseRepository};
pub use supabase::SupabaseClient;

/// ApiDoc
///
/// OpenAPI document for the JSON data API, served at `/api-docs/openapi.json`.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::list_products, handlers::get_product, handlers::list_my_clients,
        handlers::list_all_clients, handlers::list_orders
    ),
    components(
        schemas(models::Product, models::Client, models::Order, models::OrderItem,
            models::ClientRef)
    ),
    tags(
        (name = "storefront", description = "Storefront catalog and back-office API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Everything a request may need, built once in `main` and cloned per request.
#[derive(Clone)]
pub struct AppState {
    /// Anonymous backend client; also the image URL optimizer.
    pub client: SupabaseClient,
    /// Session verification and role lookup used by the access middleware.
    pub backend: BackendState,
    /// Table reads for the data handlers.
    pub repo: RepositoryState,
    /// The loaded, immutable configuration.
    pub config: AppConfig,
}

impl AppState {
    /// Wires every service to the one hosted backend described by `config`.
    pub fn from_config(config: AppConfig) -> Self {
        let client = SupabaseClient::from_config(&config);
        Self {
            backend: std::sync::Arc::new(client.clone()),
            repo: std::sync::Arc::new(SupabaseRepository::new(client.clone())),
            client,
            config,
        }
    }
}

// --- Axum FromRef Extractor Implementations ---

impl FromRef<AppState> for RepositoryState {
    fn from_ref(app_state: &AppState) -> RepositoryState {
        app_state.repo.clone()
    }
}

impl FromRef<AppState> for BackendState {
    fn from_ref(app_state: &AppState) -> BackendState {
        app_state.backend.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, puts the access middleware in front of all of them
/// (fallback included), then adds the observability and panic guard layers.
pub fn create_router(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .nest("/vendedores", vendor::vendor_routes())
        .nest("/admin", admin::admin_routes())
        // Page routes belong to the web frontend; anything unknown is a 404
        // once it has passed the access check.
        .fallback(handlers::not_found)
        .layer(middleware::from_fn_with_state(
            state.clone(),
            access::access_middleware,
        ))
        .with_state(state);

    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
        // Outermost: a panic anywhere below ends in a login redirect, never a
        // forwarded request.
        .layer(CatchPanicLayer::custom(access::redirect_on_panic))
}

/// trace_span_logger
///
/// Span for `TraceLayer` carrying the method, URI and `x-request-id`, so every
/// log line of one request can be correlated.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
