use async_trait::async_trait;
use serde::Deserialize;
use serde_json::{Value, json};
use std::sync::Arc;
use thiserror::Error;
use uuid::Uuid;

use crate::config::AppConfig;

/// New account details forwarded to the identity provider.
#[derive(Debug, Clone)]
pub struct SignUp {
    pub email: String,
    pub password: String,
    pub full_name: String,
    pub organization: Option<String>,
}

/// Tokens issued by a successful password sign-in.
#[derive(Debug, Clone, Deserialize)]
pub struct SignedIn {
    pub access_token: String,
    #[serde(default)]
    pub refresh_token: Option<String>,
    pub expires_in: i64,
    pub user: SignedInUser,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignedInUser {
    pub id: Uuid,
    #[serde(default)]
    pub email: Option<String>,
}

#[derive(Debug, Error)]
pub enum IdentityError {
    /// The provider answered and refused (duplicate email, bad credentials, weak password).
    #[error("{message}")]
    Rejected { status: u16, message: String },
    #[error("identity provider unreachable: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("unexpected identity provider response: {0}")]
    Malformed(String),
}

// 1. IdentityProvider Contract
/// IdentityProvider
///
/// The hosted authentication service: account creation, password sign-in and
/// sign-out. Swappable between the Supabase client in production and
/// `MockIdentityProvider` in tests, without touching the handlers.
#[async_trait]
pub trait IdentityProvider: Send + Sync {
    /// Creates the auth user and returns its id. Confirmation email delivery is the
    /// provider's concern.
    async fn sign_up(&self, request: &SignUp) -> Result<Uuid, IdentityError>;

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError>;

    /// Revokes the session behind `access_token`.
    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError>;
}

// 2. The Real Implementation (Supabase Auth REST API)
/// SupabaseIdentity
///
/// Talks to `{SUPABASE_URL}/auth/v1/*` with the project's anon key.
#[derive(Clone)]
pub struct SupabaseIdentity {
    http: reqwest::Client,
    base_url: String,
    anon_key: String,
    email_redirect_url: Option<String>,
}

impl SupabaseIdentity {
    pub fn new(config: &AppConfig) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            anon_key: config.supabase_anon_key.clone(),
            email_redirect_url: config.email_redirect_url.clone(),
        }
    }

    async fn rejected(response: reqwest::Response) -> IdentityError {
        let status = response.status().as_u16();
        let body: Value = response.json().await.unwrap_or(Value::Null);
        // GoTrue reports errors under different keys depending on the endpoint.
        let message = ["msg", "error_description", "message", "error"]
            .iter()
            .find_map(|key| body.get(*key).and_then(Value::as_str))
            .unwrap_or("The request was rejected")
            .to_string();
        IdentityError::Rejected { status, message }
    }
}

#[async_trait]
impl IdentityProvider for SupabaseIdentity {
    async fn sign_up(&self, request: &SignUp) -> Result<Uuid, IdentityError> {
        let mut call = self
            .http
            .post(format!("{}/auth/v1/signup", self.base_url))
            .header("apikey", &self.anon_key)
            .json(&json!({
                "email": request.email,
                "password": request.password,
                "data": {
                    "full_name": request.full_name,
                    "organization": request.organization,
                }
            }));
        if let Some(redirect) = &self.email_redirect_url {
            call = call.query(&[("redirect_to", redirect)]);
        }

        let response = call.send().await?;
        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }

        // With email confirmation on, the user object is returned bare; with
        // auto-confirm it is nested next to the session tokens.
        let body: Value = response.json().await?;
        body.get("id")
            .or_else(|| body.get("user").and_then(|user| user.get("id")))
            .and_then(Value::as_str)
            .and_then(|id| Uuid::parse_str(id).ok())
            .ok_or_else(|| IdentityError::Malformed("sign-up response without user id".into()))
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<SignedIn, IdentityError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/token", self.base_url))
            .query(&[("grant_type", "password")])
            .header("apikey", &self.anon_key)
            .json(&json!({ "email": email, "password": password }))
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        response
            .json::<SignedIn>()
            .await
            .map_err(|e| IdentityError::Malformed(e.to_string()))
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), IdentityError> {
        let response = self
            .http
            .post(format!("{}/auth/v1/logout", self.base_url))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        if !response.status().is_success() {
            return Err(Self::rejected(response).await);
        }
        Ok(())
    }
}

// 3. The Mock Implementation (For Tests)
/// MockIdentityProvider
///
/// Deterministic provider for handler tests: sign-up returns `user_id`, sign-in
/// issues `access_token`, and `should_fail` turns every call into a rejection.
#[derive(Clone)]
pub struct MockIdentityProvider {
    pub user_id: Uuid,
    pub access_token: String,
    pub should_fail: bool,
}

impl MockIdentityProvider {
    pub fn new(user_id: Uuid, access_token: impl Into<String>) -> Self {
        Self {
            user_id,
            access_token: access_token.into(),
            should_fail: false,
        }
    }

    pub fn new_failing() -> Self {
        Self {
            user_id: Uuid::nil(),
            access_token: String::new(),
            should_fail: true,
        }
    }

    fn check(&self) -> Result<(), IdentityError> {
        if self.should_fail {
            return Err(IdentityError::Rejected {
                status: 400,
                message: "Mock identity error: simulation requested".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait]
impl IdentityProvider for MockIdentityProvider {
    async fn sign_up(&self, _request: &SignUp) -> Result<Uuid, IdentityError> {
        self.check()?;
        Ok(self.user_id)
    }

    async fn sign_in(&self, email: &str, _password: &str) -> Result<SignedIn, IdentityError> {
        self.check()?;
        Ok(SignedIn {
            access_token: self.access_token.clone(),
            refresh_token: None,
            expires_in: 3600,
            user: SignedInUser {
                id: self.user_id,
                email: Some(email.to_string()),
            },
        })
    }

    async fn sign_out(&self, _access_token: &str) -> Result<(), IdentityError> {
        self.check()
    }
}

/// The concrete type used to share the identity provider across the application state.
pub type IdentityState = Arc<dyn IdentityProvider>;
