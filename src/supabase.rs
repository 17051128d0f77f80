use std::fmt;

use async_trait::async_trait;
use base64::{Engine, engine::general_purpose::URL_SAFE_NO_PAD};
use chrono::Utc;
use jsonwebtoken::{decode_header, errors::ErrorKind};
use reqwest::{RequestBuilder, Response, header::ACCEPT};
use serde::{Deserialize, de::DeserializeOwned};
use serde_json::{Value, json};

use crate::{
    access::AccessBackend,
    config::AppConfig,
    cookies::{CookieStore, read_tokens, store_session},
    error::BackendError,
    image,
    models::{AuthUser, Profile, Session, SessionTokens},
};

/// Media type asking PostgREST for exactly one row as a bare JSON object.
const SINGLE_OBJECT: &str = "application/vnd.pgrst.object+json";
/// PostgREST error code for "zero (or several) rows where one was requested".
const NO_ROWS_CODE: &str = "PGRST116";

/// SupabaseClient
///
/// Anonymous client for the hosted backend. Built once in `main` from the loaded
/// configuration and injected through `AppState`; clones share the underlying
/// connection pool.
#[derive(Clone)]
pub struct SupabaseClient {
    http: reqwest::Client,
    url: String,
    anon_key: String,
}

impl fmt::Debug for SupabaseClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SupabaseClient")
            .field("url", &self.url)
            .finish_non_exhaustive()
    }
}

impl SupabaseClient {
    pub fn new(url: &str, anon_key: &str) -> Self {
        Self {
            http: reqwest::Client::new(),
            url: url.trim_end_matches('/').to_string(),
            anon_key: anon_key.to_string(),
        }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(&config.supabase_url, &config.supabase_anon_key)
    }

    /// Base URL of the backend project.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Query `table` with anonymous credentials.
    pub fn from(&self, table: &str) -> TableQuery {
        TableQuery::new(self.clone(), table, self.anon_key.clone())
    }

    /// A session-less view of this client.
    pub fn anonymous(&self) -> SessionClient {
        SessionClient {
            client: self.clone(),
            session: None,
        }
    }

    /// Binds an already installed session.
    pub fn session_client(&self, session: Session) -> SessionClient {
        SessionClient {
            client: self.clone(),
            session: Some(session),
        }
    }

    /// with_cookies
    ///
    /// Builds the request-scoped client from the session cookies. Without both
    /// tokens the result is anonymous. When installing the session needed a
    /// refresh, the new token pair is written back through `cookies`.
    pub async fn with_cookies<C>(&self, cookies: &mut C) -> Result<SessionClient, BackendError>
    where
        C: CookieStore + ?Sized,
    {
        let Some(tokens) = read_tokens(cookies) else {
            return Ok(self.anonymous());
        };

        let session = self.install_session(&tokens).await?;
        if session.refreshed {
            store_session(cookies, &session);
        }
        Ok(self.session_client(session))
    }

    /// install_session
    ///
    /// Installs a token pair. The access token's `exp` claim is read locally
    /// (unverified; the signature is the platform's business): an expired token is
    /// exchanged through the refresh grant, a live one is checked against
    /// `/auth/v1/user`.
    pub async fn install_session(&self, tokens: &SessionTokens) -> Result<Session, BackendError> {
        if tokens.access_token.is_empty() || tokens.refresh_token.is_empty() {
            return Err(BackendError::MissingSession);
        }

        let claims = unverified_claims(&tokens.access_token)?;
        let now = now_secs();

        match claims.exp {
            Some(exp) if exp > now => {
                let user = self.get_user(&tokens.access_token).await?;
                Ok(Session {
                    tokens: tokens.clone(),
                    user,
                    expires_at: exp,
                    refreshed: false,
                })
            }
            _ => {
                tracing::debug!("access token expired, exchanging refresh token");
                self.refresh_session(&tokens.refresh_token).await
            }
        }
    }

    /// Resolves the user an access token belongs to.
    pub async fn get_user(&self, access_token: &str) -> Result<AuthUser, BackendError> {
        let response = self
            .http
            .get(format!("{}/auth/v1/user", self.url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        read_json(response).await
    }

    /// Exchanges a refresh token for a fresh session.
    pub async fn refresh_session(&self, refresh_token: &str) -> Result<Session, BackendError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.url))
            .query(&[("grant_type", "refresh_token")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "refresh_token": refresh_token }))
            .send()
            .await?;

        let grant: TokenGrant = read_json(response).await?;
        let expires_at = grant
            .expires_at
            .or_else(|| grant.expires_in.map(|secs| now_secs() + secs))
            .unwrap_or_else(now_secs);

        Ok(Session {
            tokens: SessionTokens {
                access_token: grant.access_token,
                refresh_token: grant.refresh_token,
            },
            user: grant.user,
            expires_at,
            refreshed: true,
        })
    }

    /// See [`image::optimize_image_url`]; object keys resolve against this client's endpoint.
    pub fn optimize_image_url(&self, src: Option<&str>, width: Option<u32>) -> String {
        image::optimize_image_url(&self.url, src, width)
    }
}

#[async_trait]
impl AccessBackend for SupabaseClient {
    async fn verify_session(&self, tokens: &SessionTokens) -> Result<Option<Session>, BackendError> {
        // An auth server that cannot vouch for the session, whatever the reason,
        // leaves the request without one.
        match self.install_session(tokens).await {
            Ok(session) => Ok(Some(session)),
            Err(e) if e.is_session_rejection() => {
                tracing::debug!(error = %e, "session rejected by backend");
                Ok(None)
            }
            Err(e) => {
                tracing::warn!(error = %e, "session verification failed");
                Ok(None)
            }
        }
    }

    async fn fetch_profile(&self, session: &Session) -> Result<Option<Profile>, BackendError> {
        self.session_client(session.clone())
            .from("profiles")
            .select("id,role")
            .eq("id", session.user.id)
            .single()
            .await
    }
}

/// SessionClient
///
/// Request-scoped view of the backend: queries run as the session's user (so
/// row-level security applies) or anonymously when there is no session.
#[derive(Clone, Debug)]
pub struct SessionClient {
    client: SupabaseClient,
    session: Option<Session>,
}

impl SessionClient {
    pub fn is_authenticated(&self) -> bool {
        self.session.is_some()
    }

    pub fn session(&self) -> Option<&Session> {
        self.session.as_ref()
    }

    /// Re-checks the session's user remotely. `None` for anonymous clients.
    pub async fn user(&self) -> Result<Option<AuthUser>, BackendError> {
        match &self.session {
            Some(session) => self
                .client
                .get_user(&session.tokens.access_token)
                .await
                .map(Some),
            None => Ok(None),
        }
    }

    pub fn from(&self, table: &str) -> TableQuery {
        match &self.session {
            Some(session) => TableQuery::new(
                self.client.clone(),
                table,
                session.tokens.access_token.clone(),
            ),
            None => self.client.from(table),
        }
    }
}

/// TableQuery
///
/// Minimal PostgREST request builder: column selection, equality filters,
/// ordering and a row limit.
pub struct TableQuery {
    client: SupabaseClient,
    table: String,
    bearer: String,
    params: Vec<(String, String)>,
}

impl TableQuery {
    fn new(client: SupabaseClient, table: &str, bearer: String) -> Self {
        Self {
            client,
            table: table.to_string(),
            bearer,
            params: Vec::new(),
        }
    }

    pub fn select(mut self, columns: &str) -> Self {
        self.params.push(("select".to_string(), columns.to_string()));
        self
    }

    pub fn eq(mut self, column: &str, value: impl fmt::Display) -> Self {
        self.params.push((column.to_string(), format!("eq.{value}")));
        self
    }

    pub fn order(mut self, column: &str, ascending: bool) -> Self {
        let direction = if ascending { "asc" } else { "desc" };
        self.params
            .push(("order".to_string(), format!("{column}.{direction}")));
        self
    }

    pub fn limit(mut self, rows: usize) -> Self {
        self.params.push(("limit".to_string(), rows.to_string()));
        self
    }

    /// All matching rows.
    pub async fn fetch<T: DeserializeOwned>(self) -> Result<Vec<T>, BackendError> {
        let response = self.request().send().await?;
        read_json(response).await
    }

    /// Exactly one row; `None` when nothing matches.
    pub async fn single<T: DeserializeOwned>(self) -> Result<Option<T>, BackendError> {
        let response = self.request().header(ACCEPT, SINGLE_OBJECT).send().await?;
        match read_json(response).await {
            Ok(row) => Ok(Some(row)),
            Err(BackendError::Api { code: Some(code), .. }) if code == NO_ROWS_CODE => Ok(None),
            Err(e) => Err(e),
        }
    }

    fn request(&self) -> RequestBuilder {
        self.client
            .http
            .get(format!("{}/rest/v1/{}", self.client.url, self.table))
            .query(&self.params)
            .header("apikey", &self.client.anon_key)
            .bearer_auth(&self.bearer)
    }
}

// --- Wire helpers ---

#[derive(Deserialize)]
struct Claims {
    #[serde(default)]
    exp: Option<u64>,
}

#[derive(Deserialize)]
struct TokenGrant {
    access_token: String,
    refresh_token: String,
    #[serde(default)]
    expires_in: Option<u64>,
    #[serde(default)]
    expires_at: Option<u64>,
    user: AuthUser,
}

// Error payloads differ between the auth server and PostgREST; collect whichever
// fields are present.
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    code: Option<Value>,
    #[serde(default)]
    error_code: Option<String>,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    error_description: Option<String>,
}

async fn read_json<T: DeserializeOwned>(response: Response) -> Result<T, BackendError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response.json::<T>().await?);
    }

    let raw = response.text().await.unwrap_or_default();
    let body: ErrorBody = serde_json::from_str(&raw).unwrap_or_default();

    let code = body
        .error_code
        .or_else(|| match body.code {
            Some(Value::String(code)) => Some(code),
            _ => None,
        })
        .or_else(|| body.error.clone());

    let message = body
        .msg
        .or(body.message)
        .or(body.error_description)
        .or(body.error)
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error").to_string());

    Err(BackendError::Api {
        status: status.as_u16(),
        code,
        message,
    })
}

// Reads the payload of a JWT without checking its signature.
fn unverified_claims(token: &str) -> Result<Claims, BackendError> {
    decode_header(token)?;

    let payload = token
        .split('.')
        .nth(1)
        .ok_or(jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken))?;
    let bytes = URL_SAFE_NO_PAD
        .decode(payload.trim_end_matches('='))
        .map_err(|_| jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken))?;

    serde_json::from_slice(&bytes)
        .map_err(|_| jsonwebtoken::errors::Error::from(ErrorKind::InvalidToken).into())
}

fn now_secs() -> u64 {
    u64::try_from(Utc::now().timestamp()).unwrap_or_default()
}
