use crate::{
    AppState, handlers,
    resource::{Resource, create_handler, delete_handler, update_handler},
    resources::ProjectResource,
};
use axum::{
    Router,
    routing::{get, put},
};

/// Member Router Module
///
/// Everything under `/dashboard`. The guard redirects visitors without a session to
/// the sign-in page; handlers receive the caller as a `RequestContext`.
pub fn member_routes() -> Router<AppState> {
    Router::<AppState>::new()
        // GET /dashboard
        // Profile, upcoming events, partnerships and the project count.
        .route("/dashboard", get(handlers::dashboard))
        .route(
            "/dashboard/profile",
            get(handlers::get_profile).put(handlers::update_profile),
        )
        // GET|POST /dashboard/projects
        // The project board / submit a project (owner stamped from the session).
        .route(
            ProjectResource::PATH,
            get(handlers::get_project_board).post(create_handler::<ProjectResource>),
        )
        // PUT|DELETE /dashboard/projects/{id}
        // Owner or admin only. DELETE requires ?confirm=true.
        .route(
            &format!("{}/{{id}}", ProjectResource::PATH),
            put(update_handler::<ProjectResource>).delete(delete_handler::<ProjectResource>),
        )
}
