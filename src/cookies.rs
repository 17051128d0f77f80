use axum_extra::extract::{
    CookieJar,
    cookie::{Cookie, SameSite},
};

use crate::models::{Session, SessionTokens};

/// Cookie holding the platform access token.
pub const ACCESS_TOKEN_COOKIE: &str = "sb-access-token";
/// Cookie holding the platform refresh token.
pub const REFRESH_TOKEN_COOKIE: &str = "sb-refresh-token";

/// CookieStore
///
/// Get/set/delete capability over the cookies of one request/response pair.
/// This is all the client factory and the access middleware need to know about
/// the HTTP layer.
pub trait CookieStore {
    fn get(&self, name: &str) -> Option<String>;
    fn set(&mut self, name: &str, value: &str);
    fn delete(&mut self, name: &str);
}

/// SessionCookies
///
/// `CookieStore` over an `axum_extra` cookie jar. Changes accumulate in the jar,
/// which must be returned alongside the response for them to be sent.
#[derive(Debug, Clone)]
pub struct SessionCookies {
    jar: CookieJar,
    secure: bool,
}

impl SessionCookies {
    pub fn new(jar: CookieJar, secure: bool) -> Self {
        Self { jar, secure }
    }

    /// Hands back the jar so it can be attached to the response.
    pub fn into_jar(self) -> CookieJar {
        self.jar
    }
}

impl CookieStore for SessionCookies {
    fn get(&self, name: &str) -> Option<String> {
        self.jar.get(name).map(|cookie| cookie.value().to_string())
    }

    fn set(&mut self, name: &str, value: &str) {
        let cookie = Cookie::build((name.to_string(), value.to_string()))
            .path("/")
            .http_only(true)
            .same_site(SameSite::Lax)
            .secure(self.secure);
        self.jar = self.jar.clone().add(cookie);
    }

    fn delete(&mut self, name: &str) {
        let removal = Cookie::build(name.to_string()).path("/");
        self.jar = self.jar.clone().remove(removal);
    }
}

/// Reads the token pair. `None` unless both cookies are present and non-empty.
pub fn read_tokens<C: CookieStore + ?Sized>(cookies: &C) -> Option<SessionTokens> {
    let access_token = cookies.get(ACCESS_TOKEN_COOKIE).filter(|v| !v.is_empty())?;
    let refresh_token = cookies.get(REFRESH_TOKEN_COOKIE).filter(|v| !v.is_empty())?;
    Some(SessionTokens {
        access_token,
        refresh_token,
    })
}

/// Writes both tokens of `session`.
pub fn store_session<C: CookieStore + ?Sized>(cookies: &mut C, session: &Session) {
    cookies.set(ACCESS_TOKEN_COOKIE, &session.tokens.access_token);
    cookies.set(REFRESH_TOKEN_COOKIE, &session.tokens.refresh_token);
}

/// Deletes both session cookies. They are only ever cleared as a pair.
pub fn purge_session<C: CookieStore + ?Sized>(cookies: &mut C) {
    cookies.delete(ACCESS_TOKEN_COOKIE);
    cookies.delete(REFRESH_TOKEN_COOKIE);
}
