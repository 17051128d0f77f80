#![allow(dead_code)]

//! In-process stand-in for the hosted platform: the two auth endpoints and the
//! PostgREST tables the service reads.

use axum::{
    Json, Router,
    extract::{Query, State},
    http::{HeaderMap, StatusCode, header},
    response::{IntoResponse, Response},
    routing::{get, post},
};
use chrono::Utc;
use jsonwebtoken::{EncodingKey, Header, encode};
use serde::Serialize;
use serde_json::{Value, json};
use std::{
    collections::HashMap,
    sync::{
        Arc, Mutex,
        atomic::{AtomicBool, AtomicUsize, Ordering},
    },
};
use storefront_portal::models::SessionTokens;
use tokio::net::TcpListener;
use uuid::Uuid;

pub const ANON_KEY: &str = "test-anon-key";
const SIGNING_SECRET: &[u8] = b"fake-platform-signing-secret";

#[derive(Serialize)]
struct TokenClaims {
    sub: Uuid,
    exp: i64,
    role: &'static str,
    aud: &'static str,
}

/// Mints an HS256 access token for `user` expiring `ttl_secs` from now
/// (negative for an already expired token).
pub fn mint_token(user: Uuid, ttl_secs: i64) -> String {
    let claims = TokenClaims {
        sub: user,
        exp: Utc::now().timestamp() + ttl_secs,
        role: "authenticated",
        aud: "authenticated",
    };
    encode(
        &Header::default(),
        &claims,
        &EncodingKey::from_secret(SIGNING_SECRET),
    )
    .unwrap()
}

#[derive(Clone, Default)]
pub struct FakePlatform {
    access_tokens: Arc<Mutex<HashMap<String, Uuid>>>,
    refresh_tokens: Arc<Mutex<HashMap<String, Uuid>>>,
    profiles: Arc<Mutex<HashMap<Uuid, Option<String>>>>,
    auth_down: Arc<AtomicBool>,
    products: Arc<Mutex<Vec<Value>>>,
    clients: Arc<Mutex<Vec<Value>>>,
    issued: Arc<AtomicUsize>,
    pub refresh_calls: Arc<AtomicUsize>,
    pub user_calls: Arc<AtomicUsize>,
    pub last_query: Arc<Mutex<Vec<(String, String)>>>,
}

impl FakePlatform {
    pub fn new() -> Self {
        Self::default()
    }

    /// Issues a token pair the platform will honour. An `expired` pair carries
    /// an access token past its `exp`, so only its refresh token is usable.
    pub fn issue_session(&self, user: Uuid, expired: bool) -> SessionTokens {
        let n = self.issued.fetch_add(1, Ordering::SeqCst);
        let access_token = mint_token(user, if expired { -60 } else { 3600 });
        let refresh_token = format!("refresh-{n}-{}", user.simple());

        if !expired {
            self.access_tokens
                .lock()
                .unwrap()
                .insert(access_token.clone(), user);
        }
        self.refresh_tokens
            .lock()
            .unwrap()
            .insert(refresh_token.clone(), user);

        SessionTokens {
            access_token,
            refresh_token,
        }
    }

    /// Forgets every token of `user`, as a sign-out elsewhere would.
    pub fn revoke(&self, user: Uuid) {
        self.access_tokens.lock().unwrap().retain(|_, u| *u != user);
        self.refresh_tokens.lock().unwrap().retain(|_, u| *u != user);
    }

    pub fn set_profile(&self, user: Uuid, role: &str) {
        self.profiles
            .lock()
            .unwrap()
            .insert(user, Some(role.to_string()));
    }

    /// A profile row whose `role` column is NULL.
    pub fn set_profile_without_role(&self, user: Uuid) {
        self.profiles.lock().unwrap().insert(user, None);
    }

    /// Makes both auth endpoints answer 503 until switched back.
    pub fn set_auth_down(&self, down: bool) {
        self.auth_down.store(down, Ordering::SeqCst);
    }

    pub fn add_product(&self, row: Value) {
        self.products.lock().unwrap().push(row);
    }

    pub fn add_client(&self, row: Value) {
        self.clients.lock().unwrap().push(row);
    }

    fn user_for_bearer(&self, headers: &HeaderMap) -> Option<Uuid> {
        let token = bearer(headers)?;
        self.access_tokens.lock().unwrap().get(token).copied()
    }

    /// Serves the fake on an ephemeral port and returns its base URL.
    pub async fn spawn(&self) -> String {
        let router = Router::new()
            .route("/auth/v1/user", get(get_user))
            .route("/auth/v1/token", post(token_grant))
            .route("/rest/v1/profiles", get(profiles))
            .route("/rest/v1/productos", get(productos))
            .route("/rest/v1/clientes", get(clientes))
            .with_state(self.clone());

        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let port = listener.local_addr().unwrap().port();

        tokio::spawn(async move {
            axum::serve(listener, router).await.unwrap();
        });

        format!("http://127.0.0.1:{port}")
    }
}

// --- Helpers ---

fn bearer(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(header::AUTHORIZATION)?
        .to_str()
        .ok()?
        .strip_prefix("Bearer ")
}

fn has_api_key(headers: &HeaderMap) -> bool {
    headers.get("apikey").and_then(|v| v.to_str().ok()) == Some(ANON_KEY)
}

fn wants_single(headers: &HeaderMap) -> bool {
    headers
        .get(header::ACCEPT)
        .and_then(|v| v.to_str().ok())
        .is_some_and(|v| v.contains("vnd.pgrst.object"))
}

fn param<'a>(query: &'a [(String, String)], name: &str) -> Option<&'a str> {
    query
        .iter()
        .find(|(k, _)| k == name)
        .map(|(_, v)| v.as_str())
}

fn missing_api_key() -> Response {
    (
        StatusCode::UNAUTHORIZED,
        Json(json!({ "message": "No API key found in request" })),
    )
        .into_response()
}

fn auth_unavailable() -> Response {
    (
        StatusCode::SERVICE_UNAVAILABLE,
        Json(json!({ "message": "upstream auth server unavailable" })),
    )
        .into_response()
}

fn no_rows() -> Response {
    (
        StatusCode::NOT_ACCEPTABLE,
        Json(json!({
            "code": "PGRST116",
            "details": "The result contains 0 rows",
            "hint": null,
            "message": "JSON object requested, multiple (or no) rows returned"
        })),
    )
        .into_response()
}

fn rows_matching(rows: &[Value], query: &[(String, String)]) -> Vec<Value> {
    let filters: Vec<(&str, &str)> = query
        .iter()
        .filter(|(k, _)| !matches!(k.as_str(), "select" | "order" | "limit"))
        .filter_map(|(k, v)| v.strip_prefix("eq.").map(|v| (k.as_str(), v)))
        .collect();

    rows.iter()
        .filter(|row| {
            filters.iter().all(|(column, expected)| match &row[*column] {
                Value::String(s) => s == expected,
                Value::Null => false,
                other => other.to_string() == *expected,
            })
        })
        .cloned()
        .collect()
}

// --- Auth endpoints ---

async fn get_user(State(fake): State<FakePlatform>, headers: HeaderMap) -> Response {
    fake.user_calls.fetch_add(1, Ordering::SeqCst);
    if fake.auth_down.load(Ordering::SeqCst) {
        return auth_unavailable();
    }
    if !has_api_key(&headers) {
        return missing_api_key();
    }

    match fake.user_for_bearer(&headers) {
        Some(id) => Json(json!({
            "id": id,
            "aud": "authenticated",
            "role": "authenticated",
            "email": format!("{}@tienda.test", id.simple())
        }))
        .into_response(),
        None => (
            StatusCode::FORBIDDEN,
            Json(json!({
                "code": 403,
                "error_code": "bad_jwt",
                "msg": "invalid JWT: unable to parse or verify signature"
            })),
        )
            .into_response(),
    }
}

async fn token_grant(
    State(fake): State<FakePlatform>,
    headers: HeaderMap,
    Query(params): Query<HashMap<String, String>>,
    Json(body): Json<Value>,
) -> Response {
    if fake.auth_down.load(Ordering::SeqCst) {
        return auth_unavailable();
    }
    if !has_api_key(&headers) {
        return missing_api_key();
    }
    if params.get("grant_type").map(String::as_str) != Some("refresh_token") {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({ "error_code": "unsupported_grant_type", "msg": "unsupported grant" })),
        )
            .into_response();
    }

    let presented = body["refresh_token"].as_str().unwrap_or_default().to_string();
    // Refresh tokens are single use.
    let user = fake.refresh_tokens.lock().unwrap().remove(&presented);

    let Some(user) = user else {
        return (
            StatusCode::BAD_REQUEST,
            Json(json!({
                "code": 400,
                "error_code": "refresh_token_not_found",
                "msg": "Invalid Refresh Token: Refresh Token Not Found"
            })),
        )
            .into_response();
    };

    fake.refresh_calls.fetch_add(1, Ordering::SeqCst);
    let tokens = fake.issue_session(user, false);

    Json(json!({
        "access_token": tokens.access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "expires_at": Utc::now().timestamp() + 3600,
        "refresh_token": tokens.refresh_token,
        "user": { "id": user, "email": format!("{}@tienda.test", user.simple()) }
    }))
    .into_response()
}

// --- Tables ---

async fn profiles(
    State(fake): State<FakePlatform>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    if !has_api_key(&headers) {
        return missing_api_key();
    }
    // Row-level security: a user only ever sees their own profile.
    let Some(caller) = fake.user_for_bearer(&headers) else {
        return no_rows();
    };

    let requested = param(&query, "id").and_then(|v| v.strip_prefix("eq."));
    let role = fake.profiles.lock().unwrap().get(&caller).cloned();

    match role {
        Some(role) if requested == Some(caller.to_string().as_str()) => {
            Json(json!({ "id": caller, "role": role })).into_response()
        }
        _ => no_rows(),
    }
}

async fn productos(
    State(fake): State<FakePlatform>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    if !has_api_key(&headers) {
        return missing_api_key();
    }
    *fake.last_query.lock().unwrap() = query.clone();

    let rows = rows_matching(&fake.products.lock().unwrap(), &query);
    if wants_single(&headers) {
        return match rows.as_slice() {
            [row] => Json(row.clone()).into_response(),
            _ => no_rows(),
        };
    }
    Json(rows).into_response()
}

async fn clientes(
    State(fake): State<FakePlatform>,
    headers: HeaderMap,
    Query(query): Query<Vec<(String, String)>>,
) -> Response {
    if !has_api_key(&headers) {
        return missing_api_key();
    }
    // Anonymous callers see nothing.
    if fake.user_for_bearer(&headers).is_none() {
        return Json(Vec::<Value>::new()).into_response();
    }
    *fake.last_query.lock().unwrap() = query.clone();

    Json(rows_matching(&fake.clients.lock().unwrap(), &query)).into_response()
}
