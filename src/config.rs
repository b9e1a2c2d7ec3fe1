use std::env;

use thiserror::Error;

/// AppConfig
///
/// Holds the application's entire configuration state. Loaded once at startup and
/// shared immutably through `AppState` (pulled into handlers and extractors via `FromRef`).
#[derive(Clone, Debug)]
pub struct AppConfig {
    // Postgres connection string of the hosted backend. `None` selects the in-memory client (local only).
    pub db_url: Option<String>,
    // Base URL of the Supabase project (auth REST API lives under /auth/v1).
    pub supabase_url: String,
    // Public anon key sent as the `apikey` header on auth calls.
    pub supabase_anon_key: String,
    // Secret used to validate Supabase-issued access tokens (HS256).
    pub jwt_secret: String,
    // Expected `aud` claim of access tokens.
    pub jwt_audience: String,
    // Cookie carrying the access token for browser sessions.
    pub session_cookie: String,
    // Where confirmation emails send the user after sign-up.
    pub email_redirect_url: Option<String>,
    pub bind_addr: String,
    // Apply embedded migrations at startup.
    pub run_migrations: bool,
    // Runtime environment marker. Controls the development session bypass and log format.
    pub env: Env,
}

/// Env
///
/// Runtime context: `Local` enables developer conveniences (header session bypass,
/// in-memory backend), `Production` demands every secret explicitly.
#[derive(Clone, PartialEq, Debug)]
pub enum Env {
    Local,
    Production,
}

/// Raised when a setting the current environment requires is absent.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("{0} must be set in production")]
    Missing(&'static str),
}

const LOCAL_JWT_SECRET: &str = "super-secure-test-secret-value-local";

impl Default for AppConfig {
    /// Safe, non-panicking configuration for test state setup.
    fn default() -> Self {
        Self {
            db_url: None,
            supabase_url: "http://localhost:54321".to_string(),
            supabase_anon_key: "local-anon-key".to_string(),
            jwt_secret: LOCAL_JWT_SECRET.to_string(),
            jwt_audience: "authenticated".to_string(),
            session_cookie: "sb-access-token".to_string(),
            email_redirect_url: None,
            bind_addr: "0.0.0.0:3000".to_string(),
            run_migrations: false,
            env: Env::Local,
        }
    }
}

impl AppConfig {
    /// load
    ///
    /// Reads the configuration from environment variables.
    ///
    /// # Errors
    /// In production, fails fast when `DATABASE_URL`, `SUPABASE_URL`, `SUPABASE_ANON_KEY`
    /// or `SUPABASE_JWT_SECRET` is missing. Local runs fall back to development defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let env = match env::var("APP_ENV").as_deref() {
            Ok("production") => Env::Production,
            _ => Env::Local,
        };
        let defaults = Self::default();

        let optional = |key: &str| env::var(key).ok().filter(|v| !v.trim().is_empty());
        let required = |key: &'static str, fallback: &str| match env {
            Env::Production => optional(key).ok_or(ConfigError::Missing(key)),
            Env::Local => Ok(optional(key).unwrap_or_else(|| fallback.to_string())),
        };

        let db_url = match env {
            Env::Production => Some(optional("DATABASE_URL").ok_or(ConfigError::Missing("DATABASE_URL"))?),
            Env::Local => optional("DATABASE_URL"),
        };

        Ok(Self {
            db_url,
            supabase_url: required("SUPABASE_URL", &defaults.supabase_url)?,
            supabase_anon_key: required("SUPABASE_ANON_KEY", &defaults.supabase_anon_key)?,
            jwt_secret: required("SUPABASE_JWT_SECRET", &defaults.jwt_secret)?,
            jwt_audience: optional("SUPABASE_JWT_AUDIENCE").unwrap_or(defaults.jwt_audience),
            session_cookie: optional("SESSION_COOKIE_NAME").unwrap_or(defaults.session_cookie),
            email_redirect_url: optional("AUTH_REDIRECT_URL"),
            bind_addr: optional("BIND_ADDR").unwrap_or(defaults.bind_addr),
            run_migrations: optional("RUN_MIGRATIONS").is_some_and(|v| v == "true" || v == "1"),
            env,
        })
    }
}
