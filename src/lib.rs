use axum::{
    Router,
    extract::FromRef,
    http::HeaderName,
    middleware,
};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

use tower::ServiceBuilder;
use tower_http::{
    cors::{Any, CorsLayer},
    request_id::{MakeRequestUuid, PropagateRequestIdLayer, SetRequestIdLayer},
    trace::{DefaultOnResponse, TraceLayer},
};
use tracing::{Level, Span};

// --- Module Structure ---

pub mod auth;
pub mod config;
pub mod error;
pub mod guard;
pub mod handlers;
pub mod identity;
pub mod models;
pub mod repository;
pub mod resource;
pub mod resources;

// Routing split by audience (public, member, admin).
pub mod routes;
use routes::{admin, member, public};

// --- Public Re-exports ---

pub use config::AppConfig;
pub use identity::{IdentityState, MockIdentityProvider, SupabaseIdentity};
pub use repository::{DataState, InMemoryClient, PostgresClient};

/// ApiDoc
///
/// OpenAPI document for the concrete handlers, served at `/api-docs/openapi.json`.
/// The generic resource routes (events, posts, partnerships, project mutations)
/// share the schemas listed here.
#[derive(OpenApi)]
#[openapi(
    paths(
        handlers::landing, handlers::privacy, handlers::terms, handlers::login_page,
        handlers::register_page, handlers::verify_email_page, handlers::login,
        handlers::register, handlers::logout, handlers::dashboard, handlers::get_profile,
        handlers::update_profile, handlers::get_project_board, handlers::admin_overview,
        handlers::get_admin_project_board, handlers::toggle_featured, handlers::list_members,
        handlers::update_member
    ),
    components(
        schemas(
            models::Profile, models::Event, models::Post, models::Partnership,
            models::ProjectSubmission, models::EventStatus, models::BuiltOn,
            models::EventForm, models::PostForm, models::PartnershipForm,
            models::ProjectSubmissionForm, models::ProjectEditForm, models::ProfileForm,
            models::MemberUpdateForm, models::LoginRequest, models::RegisterRequest,
            models::DashboardView, models::AdminOverview, models::ProjectCard,
            models::ProjectBoard, models::ProfileOutcome, models::BoardOutcome,
            models::PageInfo, error::Notice, error::NoticeVariant,
        )
    ),
    tags(
        (name = "collective-portal", description = "Community portal API")
    )
)]
struct ApiDoc;

/// AppState
///
/// Shared, immutable service container handed to every request. Cloning is cheap:
/// the clients sit behind `Arc`s.
#[derive(Clone)]
pub struct AppState {
    /// Generic collection access to the hosted backend.
    pub data: DataState,
    /// Hosted authentication (sign-up, sign-in, sign-out).
    pub identity: IdentityState,
    pub config: AppConfig,
}

// --- Axum FromRef Extractor Implementations ---

// Lets handlers and extractors pull just the component they need out of AppState.

impl FromRef<AppState> for DataState {
    fn from_ref(app_state: &AppState) -> DataState {
        app_state.data.clone()
    }
}

impl FromRef<AppState> for IdentityState {
    fn from_ref(app_state: &AppState) -> IdentityState {
        app_state.identity.clone()
    }
}

impl FromRef<AppState> for AppConfig {
    fn from_ref(app_state: &AppState) -> AppConfig {
        app_state.config.clone()
    }
}

/// create_router
///
/// Assembles the routes, puts the route guard in front of all of them, and wraps the
/// result in the request-id, tracing and CORS layers.
pub fn create_router(state: AppState) -> Router {
    // 1. CORS Configuration
    let cors = CorsLayer::new()
        .allow_methods(Any)
        .allow_origin(Any)
        .allow_headers(Any);

    let x_request_id = HeaderName::from_static("x-request-id");

    // 2. Routes behind the guard. The guard classifies each path itself and lets
    // anything outside its matcher straight through.
    let base_router = Router::new()
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .merge(public::public_routes())
        .merge(member::member_routes())
        .merge(admin::admin_routes())
        .layer(middleware::from_fn_with_state(
            state.clone(),
            guard::route_guard,
        ))
        .with_state(state);

    // 3. Observability and correlation, outermost so guard redirects are traced too.
    base_router
        .layer(
            ServiceBuilder::new()
                .layer(SetRequestIdLayer::new(x_request_id.clone(), MakeRequestUuid))
                .layer(
                    TraceLayer::new_for_http()
                        .make_span_with(trace_span_logger)
                        .on_response(
                            DefaultOnResponse::new()
                                .level(Level::INFO)
                                .latency_unit(tower_http::LatencyUnit::Millis),
                        ),
                )
                .layer(PropagateRequestIdLayer::new(x_request_id)),
        )
        .layer(cors)
}

/// trace_span_logger
///
/// Opens the `http_request` span for one request, tagged with method, URI and the
/// `x-request-id` assigned above.
fn trace_span_logger(request: &axum::http::Request<axum::body::Body>) -> Span {
    let request_id = request
        .headers()
        .get("x-request-id")
        .and_then(|value| value.to_str().ok())
        .unwrap_or("unknown");

    tracing::info_span!(
        "http_request",
        method = ?request.method(),
        uri = ?request.uri(),
        req_id = %request_id,
    )
}
