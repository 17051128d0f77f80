use crate::{
    AppState,
    access::RequireSession,
    error::ApiError,
    models::{Client, Order, Product, Role},
    repository::ProductFilter,
    supabase::SupabaseClient,
};
use axum::{
    Json,
    extract::{Path, Query, State},
};
use serde::Deserialize;
use uuid::Uuid;

// --- Query Structs ---

/// ImageWidth
///
/// Target width for product image URLs. Defaults to 800 px when omitted.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ImageWidth {
    pub width: Option<u32>,
}

/// OrderFilter
///
/// Optional status filter for the admin order listing.
#[derive(Debug, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct OrderFilter {
    /// Exact order status, e.g. `pendiente` or `entregado`.
    pub estado: Option<String>,
}

// Rewrites the stored object key or URL into the optimized, sized image URL.
fn with_optimized_image(client: &SupabaseClient, mut product: Product, width: Option<u32>) -> Product {
    product.imagen_url = Some(client.optimize_image_url(product.imagen_url.as_deref(), width));
    product
}

// --- Handlers ---

/// list_products
///
/// [Public Route] Storefront catalog, newest first, with image URLs ready to render.
#[utoipa::path(
    get,
    path = "/api/productos",
    params(ProductFilter, ImageWidth),
    responses((status = 200, description = "Catalog", body = [Product]))
)]
pub async fn list_products(
    State(state): State<AppState>,
    Query(filter): Query<ProductFilter>,
    Query(image): Query<ImageWidth>,
) -> Result<Json<Vec<Product>>, ApiError> {
    let products = state.repo.list_products(&filter).await?;
    Ok(Json(
        products
            .into_iter()
            .map(|p| with_optimized_image(&state.client, p, image.width))
            .collect(),
    ))
}

/// get_product
///
/// [Public Route] A single product.
#[utoipa::path(
    get,
    path = "/api/productos/{id}",
    params(("id" = Uuid, Path, description = "Product ID"), ImageWidth),
    responses(
        (status = 200, description = "Found", body = Product),
        (status = 404, description = "Not Found")
    )
)]
pub async fn get_product(
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Query(image): Query<ImageWidth>,
) -> Result<Json<Product>, ApiError> {
    let product = state
        .repo
        .get_product(id)
        .await?
        .ok_or(ApiError::NotFound)?;
    Ok(Json(with_optimized_image(&state.client, product, image.width)))
}

/// list_my_clients
///
/// [Vendor Route] Clients visible to the caller. A vendor only gets their own
/// portfolio; an admin gets every client.
#[utoipa::path(
    get,
    path = "/vendedores/api/clientes",
    responses(
        (status = 200, description = "Clients", body = [Client]),
        (status = 403, description = "Not a vendor")
    )
)]
pub async fn list_my_clients(
    RequireSession(ctx): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Client>>, ApiError> {
    let vendedor_id = match ctx.role {
        Role::Admin => None,
        Role::Vendedor => Some(ctx.user.id),
        Role::Other(_) => return Err(ApiError::Forbidden),
    };
    let clients = state.repo.list_clients(&ctx.session, vendedor_id).await?;
    Ok(Json(clients))
}

/// list_all_clients
///
/// [Admin Route] Every client across all vendors.
#[utoipa::path(
    get,
    path = "/admin/api/clientes",
    responses(
        (status = 200, description = "Clients", body = [Client]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_all_clients(
    RequireSession(ctx): RequireSession,
    State(state): State<AppState>,
) -> Result<Json<Vec<Client>>, ApiError> {
    if ctx.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.repo.list_clients(&ctx.session, None).await?))
}

/// list_orders
///
/// [Admin Route] Orders, newest first, optionally narrowed to one status.
#[utoipa::path(
    get,
    path = "/admin/api/pedidos",
    params(OrderFilter),
    responses(
        (status = 200, description = "Orders", body = [Order]),
        (status = 403, description = "Not an admin")
    )
)]
pub async fn list_orders(
    RequireSession(ctx): RequireSession,
    State(state): State<AppState>,
    Query(filter): Query<OrderFilter>,
) -> Result<Json<Vec<Order>>, ApiError> {
    if ctx.role != Role::Admin {
        return Err(ApiError::Forbidden);
    }
    Ok(Json(state.repo.list_orders(&ctx.session, filter.estado).await?))
}

/// not_found
///
/// Fallback for paths this service does not serve.
pub async fn not_found() -> ApiError {
    ApiError::NotFound
}
