use async_trait::async_trait;
use serde::Deserialize;
use std::sync::Arc;
use uuid::Uuid;

use crate::{
    error::BackendError,
    models::{Client, Order, Product, Session},
    supabase::SupabaseClient,
};

/// ProductFilter
///
/// Optional catalog filters accepted by the public product listing.
#[derive(Debug, Clone, Default, Deserialize, utoipa::IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProductFilter {
    /// Exact category name, e.g. `Galletas` or `Café`.
    pub categoria: Option<String>,
    /// Only featured (or only non-featured) products.
    pub destacado: Option<bool>,
}

/// Repository Trait
///
/// Read access to the storefront tables. Catalog reads run anonymously; client
/// and order reads run as the session's user, so the platform's row-level
/// security still decides what comes back.
#[async_trait]
pub trait Repository: Send + Sync {
    // --- Public catalog ---
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError>;
    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, BackendError>;

    // --- Session-bound ---
    // `vendedor_id` narrows the list to one vendor's clients.
    async fn list_clients(
        &self,
        session: &Session,
        vendedor_id: Option<Uuid>,
    ) -> Result<Vec<Client>, BackendError>;
    async fn list_orders(
        &self,
        session: &Session,
        estado: Option<String>,
    ) -> Result<Vec<Order>, BackendError>;
}

/// RepositoryState
///
/// Shared handle to the persistence layer stored in `AppState`.
pub type RepositoryState = Arc<dyn Repository>;

/// SupabaseRepository
///
/// `Repository` backed by the platform's PostgREST API.
pub struct SupabaseRepository {
    client: SupabaseClient,
}

impl SupabaseRepository {
    pub fn new(client: SupabaseClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl Repository for SupabaseRepository {
    async fn list_products(&self, filter: &ProductFilter) -> Result<Vec<Product>, BackendError> {
        let mut query = self.client.from("productos").select("*");

        if let Some(categoria) = &filter.categoria {
            query = query.eq("categoria", categoria);
        }
        if let Some(destacado) = filter.destacado {
            query = query.eq("destacado", destacado);
        }

        query.order("created_at", false).fetch().await
    }

    async fn get_product(&self, id: Uuid) -> Result<Option<Product>, BackendError> {
        self.client
            .from("productos")
            .select("*")
            .eq("id", id)
            .single()
            .await
    }

    async fn list_clients(
        &self,
        session: &Session,
        vendedor_id: Option<Uuid>,
    ) -> Result<Vec<Client>, BackendError> {
        let mut query = self
            .client
            .session_client(session.clone())
            .from("clientes")
            .select("*");

        if let Some(vendedor_id) = vendedor_id {
            query = query.eq("vendedor_id", vendedor_id);
        }

        query.order("nombre_comercial", true).fetch().await
    }

    async fn list_orders(
        &self,
        session: &Session,
        estado: Option<String>,
    ) -> Result<Vec<Order>, BackendError> {
        let mut query = self
            .client
            .session_client(session.clone())
            .from("pedidos")
            .select("*");

        if let Some(estado) = estado {
            query = query.eq("estado", estado);
        }

        query.order("created_at", false).fetch().await
    }
}
