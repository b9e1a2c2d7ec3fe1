use crate::{
    AppState, handlers,
    resource::resource_routes,
    resources::{EventResource, PartnershipResource, PostResource},
};
use axum::{
    Router,
    routing::{get, post, put},
};

/// Admin Router Module
///
/// Everything under `/admin`. The guard only lets sessions whose profile has
/// `is_admin` through; the handlers re-check the flag on the `RequestContext`.
pub fn admin_routes() -> Router<AppState> {
    Router::new()
        // GET /admin
        // Counts of events, posts, partnerships and members.
        .route("/admin", get(handlers::admin_overview))
        // GET|POST /admin/{events,posts,partnerships}
        // PUT|DELETE /admin/{events,posts,partnerships}/{id}
        .merge(resource_routes::<EventResource>())
        .merge(resource_routes::<PostResource>())
        .merge(resource_routes::<PartnershipResource>())
        // GET /admin/projects
        // The project board with every card editable.
        .route("/admin/projects", get(handlers::get_admin_project_board))
        // POST /admin/projects/{id}/featured
        // Flips the featured flag of one project.
        .route(
            "/admin/projects/{id}/featured",
            post(handlers::toggle_featured),
        )
        .route("/admin/members", get(handlers::list_members))
        .route("/admin/members/{id}", put(handlers::update_member))
}
