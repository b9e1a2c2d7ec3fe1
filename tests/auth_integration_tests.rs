use axum::{
    extract::FromRequestParts,
    http::{HeaderValue, Method, Request, Uri, header, request::Parts},
};
use collective_portal::{
    AppState, InMemoryClient, MockIdentityProvider,
    auth::{Claims, RequestContext, ResolvedAccess, Session, resolve_is_admin, resolve_session},
    config::{AppConfig, Env},
    error::AppError,
    repository::{Collection, DataClient, to_row},
};
use jsonwebtoken::{EncodingKey, Header, encode};
use serde_json::json;
use std::{sync::Arc, time::SystemTime};
use uuid::Uuid;

// --- Helper Functions ---

const TEST_JWT_SECRET: &str = "test-secret-value-1234567890";
const TEST_USER_ID: Uuid = Uuid::from_u128(1);

fn now() -> u64 {
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .unwrap()
        .as_secs()
}

fn create_token(user_id: Uuid, exp: u64, aud: &str) -> String {
    let claims = Claims {
        sub: user_id,
        iat: now() as usize,
        exp: exp as usize,
        aud: aud.to_string(),
        email: Some("member@example.com".to_string()),
    };
    let key = EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes());
    encode(&Header::default(), &claims, &key).unwrap()
}

fn valid_token(user_id: Uuid) -> String {
    create_token(user_id, now() + 3600, "authenticated")
}

fn test_config(env: Env) -> AppConfig {
    AppConfig {
        env,
        jwt_secret: TEST_JWT_SECRET.to_string(),
        ..AppConfig::default()
    }
}

async fn seed_profile(client: &InMemoryClient, id: Uuid, is_admin: bool) {
    let row = to_row(&json!({
        "id": id,
        "email": "member@example.com",
        "is_admin": is_admin,
    }))
    .unwrap();
    client.insert(Collection::Profiles, row).await.unwrap();
}

fn create_app_state(env: Env, data: InMemoryClient) -> AppState {
    AppState {
        data: Arc::new(data),
        identity: Arc::new(MockIdentityProvider::new(TEST_USER_ID, "token")),
        config: test_config(env),
    }
}

fn get_request_parts(method: Method, uri: Uri) -> Parts {
    let request = Request::builder()
        .method(method)
        .uri(uri)
        .body(axum::body::Body::empty())
        .unwrap();
    let (parts, _) = request.into_parts();
    parts
}

fn with_bearer(parts: &mut Parts, token: &str) {
    parts.headers.insert(
        header::AUTHORIZATION,
        HeaderValue::from_str(&format!("Bearer {}", token)).unwrap(),
    );
}

// --- Session Resolver ---

async fn session(parts: &Parts, env: Env) -> Option<Session> {
    resolve_session(&parts.headers, &test_config(env), &InMemoryClient::new()).await
}

fn with_user_id_header(parts: &mut Parts, user_id: Uuid) {
    parts.headers.insert(
        header::HeaderName::from_static("x-user-id"),
        HeaderValue::from_str(&user_id.to_string()).unwrap(),
    );
}

#[tokio::test]
async fn test_session_from_bearer_token() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_bearer(&mut parts, &valid_token(TEST_USER_ID));

    assert_eq!(
        session(&parts, Env::Production).await,
        Some(Session {
            user_id: TEST_USER_ID,
            email: Some("member@example.com".to_string()),
        })
    );
}

#[tokio::test]
async fn test_session_from_cookie() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    let cookie = format!("theme=dark; sb-access-token={}", valid_token(TEST_USER_ID));
    parts
        .headers
        .insert(header::COOKIE, HeaderValue::from_str(&cookie).unwrap());

    let session = session(&parts, Env::Production).await;
    assert_eq!(session.map(|s| s.user_id), Some(TEST_USER_ID));
}

#[tokio::test]
async fn test_expired_token_is_no_session() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    // Well past the default leeway.
    with_bearer(&mut parts, &create_token(TEST_USER_ID, now() - 3600, "authenticated"));

    assert_eq!(session(&parts, Env::Production).await, None);
}

#[tokio::test]
async fn test_wrong_audience_is_no_session() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_bearer(&mut parts, &create_token(TEST_USER_ID, now() + 3600, "anon"));

    assert_eq!(session(&parts, Env::Production).await, None);
}

#[tokio::test]
async fn test_garbage_token_is_no_session() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_bearer(&mut parts, "not-a-jwt");

    assert_eq!(session(&parts, Env::Local).await, None);
}

#[tokio::test]
async fn test_local_bypass_disabled_in_prod() {
    let client = InMemoryClient::new();
    seed_profile(&client, TEST_USER_ID, false).await;
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_user_id_header(&mut parts, TEST_USER_ID);

    let prod = resolve_session(&parts.headers, &test_config(Env::Production), &client).await;
    assert_eq!(prod, None);

    let local = resolve_session(&parts.headers, &test_config(Env::Local), &client).await;
    assert_eq!(
        local,
        Some(Session {
            user_id: TEST_USER_ID,
            email: Some("member@example.com".to_string()),
        })
    );
}

#[tokio::test]
async fn test_local_bypass_requires_existing_profile() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_user_id_header(&mut parts, TEST_USER_ID);

    // No profile row: the header is ignored.
    assert_eq!(session(&parts, Env::Local).await, None);

    // A failing backend never yields a session either.
    let failing = InMemoryClient::new_failing("down");
    assert_eq!(
        resolve_session(&parts.headers, &test_config(Env::Local), &failing).await,
        None
    );
}

#[tokio::test]
async fn test_local_bypass_falls_through_to_token() {
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_user_id_header(&mut parts, Uuid::new_v4());
    with_bearer(&mut parts, &valid_token(TEST_USER_ID));

    let session = session(&parts, Env::Local).await;
    assert_eq!(session.map(|s| s.user_id), Some(TEST_USER_ID));
}

// --- Role Resolver ---

#[tokio::test]
async fn test_role_resolver_reads_profile_flag() {
    let client = InMemoryClient::new();
    let admin = Uuid::new_v4();
    let member = Uuid::new_v4();
    seed_profile(&client, admin, true).await;
    seed_profile(&client, member, false).await;

    assert!(resolve_is_admin(&client, admin).await);
    assert!(!resolve_is_admin(&client, member).await);
    // No profile row at all.
    assert!(!resolve_is_admin(&client, Uuid::new_v4()).await);
}

#[tokio::test]
async fn test_role_resolver_fails_closed() {
    let client = InMemoryClient::new_failing("connection reset");
    assert!(!resolve_is_admin(&client, TEST_USER_ID).await);
}

// --- RequestContext Extractor ---

#[tokio::test]
async fn test_context_resolves_session_and_role() {
    let data = InMemoryClient::new();
    seed_profile(&data, TEST_USER_ID, true).await;
    let app_state = create_app_state(Env::Production, data);

    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());
    with_bearer(&mut parts, &valid_token(TEST_USER_ID));

    let ctx = RequestContext::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert_eq!(ctx.user_id, TEST_USER_ID);
    assert!(ctx.is_admin);
}

#[tokio::test]
async fn test_context_rejects_missing_session() {
    let app_state = create_app_state(Env::Production, InMemoryClient::new());
    let mut parts = get_request_parts(Method::GET, "/dashboard".parse().unwrap());

    let result = RequestContext::from_request_parts(&mut parts, &app_state).await;
    assert!(matches!(result, Err(AppError::Unauthorized)));
}

#[tokio::test]
async fn test_context_reuses_guard_resolution() {
    // The data client would fail; the resolution already on the request wins.
    let app_state = create_app_state(Env::Production, InMemoryClient::new_failing("down"));
    let mut parts = get_request_parts(Method::GET, "/admin".parse().unwrap());
    parts.extensions.insert(ResolvedAccess {
        session: Some(Session {
            user_id: TEST_USER_ID,
            email: None,
        }),
        is_admin: Some(true),
    });

    let ctx = RequestContext::from_request_parts(&mut parts, &app_state)
        .await
        .unwrap();
    assert!(ctx.is_admin);
    assert!(ctx.owns_or_admin(Uuid::new_v4()));
}

#[tokio::test]
async fn test_owner_or_admin_rule() {
    let owner = Uuid::new_v4();
    let member = RequestContext {
        user_id: owner,
        email: None,
        is_admin: false,
    };
    assert!(member.owns_or_admin(owner));
    assert!(!member.owns_or_admin(Uuid::new_v4()));

    let admin = RequestContext {
        is_admin: true,
        ..member
    };
    assert!(admin.owns_or_admin(Uuid::new_v4()));
}
