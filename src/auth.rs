use axum::{
    extract::{FromRef, FromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use jsonwebtoken::{DecodingKey, Validation, decode};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::{
    config::{AppConfig, Env},
    error::AppError,
    models::Profile,
    repository::{Collection, DataClient, DataState, fetch_by_id},
};

/// Claims
///
/// The payload of a Supabase access token. Signed with the project's JWT secret and
/// validated (signature, expiry, audience) on every request that carries one.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the auth user id, which is also the `profiles.id`.
    pub sub: Uuid,
    pub exp: usize,
    pub iat: usize,
    /// Audience, `authenticated` for signed-in users.
    pub aud: String,
    #[serde(default)]
    pub email: Option<String>,
}

/// Session
///
/// An authenticated user's active login context, resolved per request.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub user_id: Uuid,
    pub email: Option<String>,
}

/// Pulls the raw access token from `Authorization: Bearer` or, failing that, from the
/// session cookie.
pub fn access_token<'a>(headers: &'a HeaderMap, cookie_name: &str) -> Option<&'a str> {
    let bearer = headers
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty());
    if bearer.is_some() {
        return bearer;
    }

    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == cookie_name)
        .map(|(_, token)| token)
        .filter(|token| !token.is_empty())
}

/// resolve_session
///
/// The Session Resolver. Returns `None` for every failure (missing token, bad
/// signature, expiry, wrong audience): an unresolvable session is no session.
///
/// In `Env::Local` an `x-user-id` header naming an existing profile is accepted as a
/// session, to drive the service without a running identity provider. Unknown ids
/// fall through to token validation.
pub async fn resolve_session(
    headers: &HeaderMap,
    config: &AppConfig,
    client: &dyn DataClient,
) -> Option<Session> {
    if config.env == Env::Local {
        if let Some(session) = local_session(headers, client).await {
            return Some(session);
        }
    }

    let token = access_token(headers, &config.session_cookie)?;

    let decoding_key = DecodingKey::from_secret(config.jwt_secret.as_bytes());
    let mut validation = Validation::default();
    validation.validate_exp = true;
    validation.set_audience(&[config.jwt_audience.as_str()]);

    match decode::<Claims>(token, &decoding_key, &validation) {
        Ok(data) => Some(Session {
            user_id: data.claims.sub,
            email: data.claims.email,
        }),
        Err(e) => {
            tracing::debug!("session token rejected: {:?}", e.kind());
            None
        }
    }
}

async fn local_session(headers: &HeaderMap, client: &dyn DataClient) -> Option<Session> {
    let user_id = headers
        .get("x-user-id")
        .and_then(|value| value.to_str().ok())
        .and_then(|value| Uuid::parse_str(value).ok())?;

    match fetch_by_id::<Profile>(client, Collection::Profiles, user_id).await {
        Ok(Some(profile)) => Some(Session {
            user_id: profile.id,
            email: Some(profile.email),
        }),
        Ok(None) => {
            tracing::debug!(%user_id, "x-user-id names no profile, ignoring");
            None
        }
        Err(e) => {
            tracing::warn!(%user_id, "x-user-id profile lookup failed: {}", e);
            None
        }
    }
}

/// resolve_is_admin
///
/// The Role Resolver: reads `profiles.is_admin` for the user. A missing profile or a
/// failed lookup yields `false`, so errors never escalate privilege.
pub async fn resolve_is_admin(client: &dyn DataClient, user_id: Uuid) -> bool {
    match fetch_by_id::<Profile>(client, Collection::Profiles, user_id).await {
        Ok(profile) => profile.is_some_and(|p| p.is_admin),
        Err(e) => {
            tracing::warn!(%user_id, "profile lookup failed, treating as non-admin: {}", e);
            false
        }
    }
}

/// What the route guard already resolved for this request. Stored in the request
/// extensions so handlers reuse it instead of repeating the lookups.
#[derive(Debug, Clone)]
pub struct ResolvedAccess {
    pub session: Option<Session>,
    pub is_admin: Option<bool>,
}

/// RequestContext
///
/// The explicit identity handed to every protected handler: who is calling and
/// whether they are an admin.
#[derive(Debug, Clone, PartialEq)]
pub struct RequestContext {
    pub user_id: Uuid,
    pub email: Option<String>,
    pub is_admin: bool,
}

impl RequestContext {
    /// Ownership OR admin: the mutability rule for member-owned records.
    pub fn owns_or_admin(&self, owner_id: Uuid) -> bool {
        self.is_admin || self.user_id == owner_id
    }
}

/// RequestContext Extractor
///
/// Reuses the guard's `ResolvedAccess` when present; otherwise resolves the session
/// and role itself (routes outside the guard's matcher).
///
/// Rejection: `AppError::Unauthorized` (401) when there is no session.
impl<S> FromRequestParts<S> for RequestContext
where
    S: Send + Sync,
    DataState: FromRef<S>,
    AppConfig: FromRef<S>,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let resolved = parts.extensions.get::<ResolvedAccess>().cloned();

        let client = DataState::from_ref(state);

        let session = match &resolved {
            Some(access) => access.session.clone(),
            None => {
                let config = AppConfig::from_ref(state);
                resolve_session(&parts.headers, &config, client.as_ref()).await
            }
        }
        .ok_or(AppError::Unauthorized)?;

        let is_admin = match resolved.and_then(|access| access.is_admin) {
            Some(is_admin) => is_admin,
            None => resolve_is_admin(client.as_ref(), session.user_id).await,
        };

        Ok(RequestContext {
            user_id: session.user_id,
            email: session.email,
            is_admin,
        })
    }
}
