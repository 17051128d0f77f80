use std::env;

use crate::error::ConfigError;

/// Accepted names for the platform endpoint, in priority order.
pub const URL_VARS: [&str; 2] = ["PUBLIC_SUPABASE_URL", "SUPABASE_URL"];
/// Accepted names for the public (anon) API key, in priority order.
pub const ANON_KEY_VARS: [&str; 2] = ["PUBLIC_SUPABASE_ANON_KEY", "SUPABASE_ANON_KEY"];

const DEFAULT_PORT: u16 = 3000;

/// AppConfig
///
/// Immutable configuration loaded once at startup and shared with every request
/// through `AppState` (see the `FromRef` implementations in `lib.rs`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Base URL of the hosted backend project, without a trailing slash.
    pub supabase_url: String,
    // Public API key. Sent as `apikey` on every call and as the bearer for anonymous reads.
    pub supabase_anon_key: String,
    // Runtime environment marker. Controls log format and the cookie `Secure` flag.
    pub env: Env,
    // TCP port the HTTP server binds to.
    pub port: u16,
}

/// Env
///
/// Runtime context. `Local` prints human-readable logs and issues cookies over
/// plain HTTP; `Production` emits JSON logs and marks session cookies `Secure`.
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum Env {
    Local,
    Production,
}

impl Default for AppConfig {
    /// Safe values for test state scaffolding. Never used by `main`.
    fn default() -> Self {
        Self {
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            env: Env::Local,
            port: DEFAULT_PORT,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from the process environment. Missing endpoint
    /// or key is a startup error: the service refuses to run with undefined
    /// credentials instead of failing every request later.
    pub fn load() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// from_lookup
    ///
    /// Same as [`AppConfig::load`] but reads variables through `lookup`,
    /// which keeps tests away from the shared process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let env = match lookup("APP_ENV").as_deref() {
            Some("production") => Env::Production,
            _ => Env::Local,
        };

        let supabase_url = first_non_empty(&lookup, &URL_VARS)
            .ok_or(ConfigError::MissingUrl)?
            .trim_end_matches('/')
            .to_string();

        let supabase_anon_key =
            first_non_empty(&lookup, &ANON_KEY_VARS).ok_or(ConfigError::MissingAnonKey)?;

        let port = match lookup("PORT").filter(|v| !v.trim().is_empty()) {
            Some(raw) => raw
                .trim()
                .parse()
                .map_err(|_| ConfigError::InvalidPort(raw.clone()))?,
            None => DEFAULT_PORT,
        };

        Ok(Self {
            supabase_url,
            supabase_anon_key,
            env,
            port,
        })
    }

    /// Whether session cookies must carry the `Secure` attribute.
    pub fn secure_cookies(&self) -> bool {
        self.env == Env::Production
    }
}

// First variable in `names` holding a non-blank value.
fn first_non_empty<F>(lookup: &F, names: &[&str]) -> Option<String>
where
    F: Fn(&str) -> Option<String>,
{
    names
        .iter()
        .filter_map(|name| lookup(name))
        .map(|value| value.trim().to_string())
        .find(|value| !value.is_empty())
}
