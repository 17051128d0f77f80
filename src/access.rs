//! Role-based access control for the admin and vendor areas.
//!
//! Every request passes through [`access_middleware`]. Static assets go straight
//! through; everything else has its session cookies resolved to a user and a
//! profile role, and the fixed access matrix in [`decide`] picks between
//! forwarding the request and redirecting it.

use std::sync::Arc;

use async_trait::async_trait;
use axum::{
    extract::{FromRequestParts, Request, State},
    http::{StatusCode, request::Parts},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use axum_extra::extract::CookieJar;

use crate::{
    AppState,
    cookies::{SessionCookies, purge_session, read_tokens, store_session},
    error::BackendError,
    models::{AuthUser, Profile, Role, Session, SessionTokens},
};

pub const ADMIN_PREFIX: &str = "/admin";
pub const VENDOR_PREFIX: &str = "/vendedores";
pub const ADMIN_LOGIN: &str = "/admin/login";
pub const VENDOR_LOGIN: &str = "/vendedores/login";
pub const ADMIN_DASHBOARD: &str = "/admin/dashboard";
pub const VENDOR_HOME: &str = "/vendedores";
pub const SITE_ROOT: &str = "/";
/// Login redirect used when an authenticated user has no profile row.
pub const MISSING_PROFILE_REDIRECT: &str = "/admin/login?error=perfil_no_encontrado";

const STATIC_EXTENSIONS: &[&str] = &[
    "css",
    "js",
    "mjs",
    "map",
    "png",
    "jpg",
    "jpeg",
    "gif",
    "svg",
    "webp",
    "avif",
    "ico",
    "woff",
    "woff2",
    "ttf",
    "otf",
    "eot",
    "txt",
    "xml",
    "webmanifest",
];

// --- Remote seam ---

/// AccessBackend
///
/// The two remote questions the middleware asks. `SupabaseClient` answers them
/// against the hosted platform; tests substitute their own implementation.
#[async_trait]
pub trait AccessBackend: Send + Sync {
    /// Installs the token pair and resolves its user.
    ///
    /// `Ok(None)` means the session could not be verified: invalid, expired or
    /// revoked tokens, or an auth server that is down or answering with errors.
    /// `Err` is reserved for failures outside the verification itself.
    async fn verify_session(&self, tokens: &SessionTokens)
    -> Result<Option<Session>, BackendError>;

    /// Reads the profile row of the session's user, as that user.
    async fn fetch_profile(&self, session: &Session) -> Result<Option<Profile>, BackendError>;
}

pub type BackendState = Arc<dyn AccessBackend>;

// --- Path classification ---

/// Path class used by the access matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RouteClass {
    LoginPage,
    Admin,
    Vendedor,
    Other,
}

/// Outcome of the access matrix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Access {
    Forward,
    Redirect(&'static str),
}

/// True when the last path segment carries a known static-file extension.
pub fn is_static_asset(path: &str) -> bool {
    let segment = path.rsplit('/').next().unwrap_or_default();
    match segment.rsplit_once('.') {
        Some((stem, ext)) if !stem.is_empty() => STATIC_EXTENSIONS
            .iter()
            .any(|known| known.eq_ignore_ascii_case(ext)),
        _ => false,
    }
}

pub fn is_login_page(path: &str) -> bool {
    path.starts_with(ADMIN_LOGIN) || path.starts_with(VENDOR_LOGIN)
}

/// Admin or vendor area, login pages excluded.
pub fn is_protected(path: &str) -> bool {
    (path.starts_with(ADMIN_PREFIX) || path.starts_with(VENDOR_PREFIX)) && !is_login_page(path)
}

pub fn classify(path: &str) -> RouteClass {
    if is_login_page(path) {
        RouteClass::LoginPage
    } else if path.starts_with(ADMIN_PREFIX) {
        RouteClass::Admin
    } else if path.starts_with(VENDOR_PREFIX) {
        RouteClass::Vendedor
    } else {
        RouteClass::Other
    }
}

/// decide
///
/// The access matrix for an authenticated user:
///
/// | path        | admin              | vendedor      | other |
/// |-------------|--------------------|---------------|-------|
/// | login page  | `/admin/dashboard` | `/vendedores` | `/`   |
/// | `/admin…`   | forward            | `/vendedores` | `/`   |
/// | `/vendedores…` | forward         | forward       | `/`   |
/// | anything else | forward          | forward       | forward |
pub fn decide(role: &Role, path: &str) -> Access {
    match (classify(path), role) {
        (RouteClass::LoginPage, Role::Admin) => Access::Redirect(ADMIN_DASHBOARD),
        (RouteClass::LoginPage, Role::Vendedor) => Access::Redirect(VENDOR_HOME),
        (RouteClass::LoginPage, Role::Other(_)) => Access::Redirect(SITE_ROOT),
        (RouteClass::Admin, Role::Vendedor) => Access::Redirect(VENDOR_HOME),
        (RouteClass::Admin, Role::Other(_)) => Access::Redirect(SITE_ROOT),
        (RouteClass::Vendedor, Role::Other(_)) => Access::Redirect(SITE_ROOT),
        _ => Access::Forward,
    }
}

// Rule shared by anonymous requests and rejected sessions.
fn anonymous_access(path: &str) -> Access {
    if is_protected(path) {
        Access::Redirect(ADMIN_LOGIN)
    } else {
        Access::Forward
    }
}

// --- Request context ---

/// AuthContext
///
/// Identity attached to requests the middleware let through with a valid
/// session. Handlers read it through [`RequireSession`].
#[derive(Debug, Clone)]
pub struct AuthContext {
    pub user: AuthUser,
    pub role: Role,
    pub session: Session,
}

/// Extractor for handlers that need the authenticated context. Rejects with
/// 401 when the middleware did not attach one.
#[derive(Debug, Clone)]
pub struct RequireSession(pub AuthContext);

impl<S> FromRequestParts<S> for RequireSession
where
    S: Send + Sync,
{
    type Rejection = StatusCode;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthContext>()
            .cloned()
            .map(RequireSession)
            .ok_or(StatusCode::UNAUTHORIZED)
    }
}

// --- Middleware ---

enum Outcome {
    Forward(Option<AuthContext>),
    Redirect(&'static str),
}

/// access_middleware
///
/// Forward-or-redirect gate in front of every route:
///
/// 1. Static assets are forwarded without touching the backend.
/// 2. Without both session cookies the request is anonymous: protected paths
///    redirect to the admin login, everything else is forwarded.
/// 3. With cookies, the session is verified remotely. A session that fails
///    verification has both cookies cleared and is then treated as anonymous.
/// 4. A verified user without a readable profile has both cookies cleared and
///    is sent to the login page with a diagnostic marker.
/// 5. Otherwise the role runs through [`decide`].
///
/// Any other backend failure redirects to the admin login. Nothing is forwarded
/// on error.
pub async fn access_middleware(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();

    if is_static_asset(&path) {
        return next.run(request).await;
    }

    let mut cookies = SessionCookies::new(jar, state.config.secure_cookies());

    let outcome = match read_tokens(&cookies) {
        None => Ok(anonymous_outcome(&path)),
        Some(tokens) => authorize(&state, &path, &tokens, &mut cookies).await,
    };

    match outcome {
        Ok(Outcome::Forward(context)) => {
            if let Some(context) = context {
                request.extensions_mut().insert(context);
            }
            (cookies.into_jar(), next.run(request).await).into_response()
        }
        Ok(Outcome::Redirect(target)) => {
            tracing::debug!(%path, redirect_to = target, "access redirect");
            (cookies.into_jar(), Redirect::to(target)).into_response()
        }
        Err(e) => {
            tracing::error!(%path, error = %e, "access check failed, redirecting to login");
            Redirect::to(ADMIN_LOGIN).into_response()
        }
    }
}

fn anonymous_outcome(path: &str) -> Outcome {
    match anonymous_access(path) {
        Access::Forward => Outcome::Forward(None),
        Access::Redirect(target) => Outcome::Redirect(target),
    }
}

async fn authorize(
    state: &AppState,
    path: &str,
    tokens: &SessionTokens,
    cookies: &mut SessionCookies,
) -> Result<Outcome, BackendError> {
    let Some(session) = state.backend.verify_session(tokens).await? else {
        purge_session(cookies);
        return Ok(anonymous_outcome(path));
    };

    if session.refreshed {
        store_session(cookies, &session);
    }

    let profile = match state.backend.fetch_profile(&session).await {
        Ok(Some(profile)) => profile,
        Ok(None) => {
            tracing::warn!(user_id = %session.user.id, "authenticated user has no profile row");
            purge_session(cookies);
            return Ok(Outcome::Redirect(MISSING_PROFILE_REDIRECT));
        }
        Err(e) => {
            tracing::warn!(user_id = %session.user.id, error = %e, "profile lookup failed");
            purge_session(cookies);
            return Ok(Outcome::Redirect(MISSING_PROFILE_REDIRECT));
        }
    };

    Ok(match decide(&profile.role, path) {
        Access::Redirect(target) => Outcome::Redirect(target),
        Access::Forward => Outcome::Forward(Some(AuthContext {
            user: session.user.clone(),
            role: profile.role,
            session,
        })),
    })
}

/// Response served when a request panics anywhere below the panic guard.
pub fn redirect_on_panic(_panic: Box<dyn std::any::Any + Send + 'static>) -> Response {
    tracing::error!("request handler panicked, redirecting to login");
    Redirect::to(ADMIN_LOGIN).into_response()
}
