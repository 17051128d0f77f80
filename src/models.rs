use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

// --- Session & Identity ---

/// SessionTokens
///
/// The access/refresh token pair carried by the `sb-access-token` and
/// `sb-refresh-token` cookies. Opaque to this service; validity is decided remotely.
#[derive(Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionTokens {
    pub access_token: String,
    pub refresh_token: String,
}

// Tokens never reach the logs.
impl fmt::Debug for SessionTokens {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionTokens")
            .field("access_token", &"<redacted>")
            .field("refresh_token", &"<redacted>")
            .finish()
    }
}

/// AuthUser
///
/// Identity returned by the platform's `/auth/v1/user` check. Never persisted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AuthUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session
///
/// A session installed on a client: the tokens in force, the user they resolve to,
/// and whether installing it required a refresh-token grant.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Session {
    pub tokens: SessionTokens,
    pub user: AuthUser,
    // Unix seconds.
    pub expires_at: u64,
    // True when the access token was expired and had to be exchanged.
    pub refreshed: bool,
}

/// Role
///
/// Authorization role stored on the user's profile row. Anything other than
/// `admin` or `vendedor` is kept verbatim in `Other` and gets no privileges.
/// A NULL column reads as `Other("")`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Option<String>", into = "String")]
pub enum Role {
    Admin,
    Vendedor,
    Other(String),
}

impl From<String> for Role {
    fn from(value: String) -> Self {
        match value.as_str() {
            "admin" => Role::Admin,
            "vendedor" => Role::Vendedor,
            _ => Role::Other(value),
        }
    }
}

impl From<Option<String>> for Role {
    fn from(value: Option<String>) -> Self {
        Role::from(value.unwrap_or_default())
    }
}

impl Default for Role {
    fn default() -> Self {
        Role::Other(String::new())
    }
}

impl From<&str> for Role {
    fn from(value: &str) -> Self {
        Role::from(value.to_string())
    }
}

impl From<Role> for String {
    fn from(role: Role) -> Self {
        match role {
            Role::Admin => "admin".to_string(),
            Role::Vendedor => "vendedor".to_string(),
            Role::Other(other) => other,
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Role::Admin => f.write_str("admin"),
            Role::Vendedor => f.write_str("vendedor"),
            Role::Other(other) => f.write_str(other),
        }
    }
}

/// Profile
///
/// Row of the `profiles` table, the only source of role truth. Every
/// authenticated user must have one.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Profile {
    pub id: Uuid,
    #[serde(default)]
    pub role: Role,
}

// --- Catalog & Sales Records (mirrors of the hosted schema) ---

/// Categoria
///
/// Product category. The five storefront categories are named; any other
/// value the catalog holds is preserved in `Otra`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "String", into = "String")]
pub enum Categoria {
    Galletas,
    Cafe,
    Chocolateria,
    Jugos,
    Gelatina,
    Otra(String),
}

impl Default for Categoria {
    fn default() -> Self {
        Categoria::Otra(String::new())
    }
}

impl From<String> for Categoria {
    fn from(value: String) -> Self {
        match value.as_str() {
            "Galletas" => Categoria::Galletas,
            "Café" => Categoria::Cafe,
            "Chocolatería" => Categoria::Chocolateria,
            "Jugos" => Categoria::Jugos,
            "Gelatina" => Categoria::Gelatina,
            _ => Categoria::Otra(value),
        }
    }
}

impl From<Categoria> for String {
    fn from(categoria: Categoria) -> Self {
        categoria.as_str().to_string()
    }
}

impl Categoria {
    /// Spelling used by the `productos.categoria` column.
    pub fn as_str(&self) -> &str {
        match self {
            Categoria::Galletas => "Galletas",
            Categoria::Cafe => "Café",
            Categoria::Chocolateria => "Chocolatería",
            Categoria::Jugos => "Jugos",
            Categoria::Gelatina => "Gelatina",
            Categoria::Otra(other) => other,
        }
    }
}

/// Product
///
/// Row of the `productos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Product {
    pub id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub nombre: String,
    pub descripcion: String,
    pub precio: f64,
    pub stock_cantidad: i32,
    // Object key or absolute URL. Handlers rewrite it into an optimized URL.
    pub imagen_url: Option<String>,
    #[ts(type = "'Galletas' | 'Café' | 'Chocolatería' | 'Jugos' | 'Gelatina' | string")]
    #[schema(value_type = String, example = "Galletas")]
    pub categoria: Categoria,
    pub destacado: bool,
}

/// Client
///
/// Row of the `clientes` table: a business a vendor sells to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Client {
    // BigInt identity column.
    pub id: i64,
    #[ts(type = "string | null")]
    #[serde(default)]
    pub created_at: Option<DateTime<Utc>>,
    pub nombre_comercial: String,
    #[serde(default)]
    pub direccion: Option<String>,
    // FK to profiles.id of the owning vendor.
    #[serde(default)]
    pub vendedor_id: Option<Uuid>,
    #[serde(default)]
    pub telefono: Option<String>,
    #[serde(default)]
    pub email: Option<String>,
}

/// OrderItem
///
/// One line of an order's `detalles` document, when it follows the typed layout.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct OrderItem {
    #[serde(default)]
    pub producto_id: Option<Uuid>,
    pub nombre: String,
    pub cantidad: u32,
    pub precio_unitario: f64,
}

/// OrderDetails
///
/// The JSONB `detalles` column. Documents matching the line-item layout are
/// typed; anything else is kept as an opaque JSON value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS)]
#[serde(untagged)]
#[ts(export)]
pub enum OrderDetails {
    Items(Vec<OrderItem>),
    Raw(serde_json::Value),
}

impl Default for OrderDetails {
    fn default() -> Self {
        OrderDetails::Items(Vec::new())
    }
}

impl OrderDetails {
    /// Typed line items, if the document has that shape.
    pub fn items(&self) -> Option<&[OrderItem]> {
        match self {
            OrderDetails::Items(items) => Some(items),
            OrderDetails::Raw(_) => None,
        }
    }
}

/// ClientRef
///
/// `pedidos.cliente_id`: a `clientes.id` number, or text in rows written
/// before the column was tied to the clients table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(untagged)]
#[ts(export)]
pub enum ClientRef {
    Id(i64),
    Text(String),
}

impl ClientRef {
    /// The numeric client id, when the reference holds one.
    pub fn as_id(&self) -> Option<i64> {
        match self {
            ClientRef::Id(id) => Some(*id),
            ClientRef::Text(text) => text.trim().parse().ok(),
        }
    }
}

/// Order
///
/// Row of the `pedidos` table.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema, Default)]
#[ts(export)]
pub struct Order {
    pub id: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    pub cliente_nombre: String,
    // Absent for direct sales and rows predating the clients table.
    #[serde(default)]
    pub cliente_id: Option<ClientRef>,
    #[schema(value_type = Object)]
    pub detalles: OrderDetails,
    pub total: f64,
    pub estado: String,
    pub tag_rastreo: String,
}
