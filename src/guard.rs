use axum::{
    extract::{Request, State},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};

use crate::{
    AppState,
    auth::{ResolvedAccess, resolve_is_admin, resolve_session},
};

pub const LOGIN_PATH: &str = "/auth/login";
pub const REGISTER_PATH: &str = "/auth/register";
pub const DASHBOARD_PATH: &str = "/dashboard";
pub const ADMIN_PATH: &str = "/admin";

/// The kinds of guarded path. Anything else is not the guard's business.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    /// Login and registration: only meaningful without a session.
    AuthPage,
    /// `/dashboard` and below.
    Member,
    /// `/admin` and below.
    Admin,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GuardDecision {
    Allow,
    RedirectToLogin,
    RedirectToDashboard,
}

fn within(path: &str, root: &str) -> bool {
    path == root
        || path
            .strip_prefix(root)
            .is_some_and(|rest| rest.starts_with('/'))
}

/// classify
///
/// Maps a request path onto its `PathClass`. Prefixes match on segment boundaries
/// (`/dashboardx` is unguarded) and a single trailing slash is ignored.
pub fn classify(path: &str) -> Option<PathClass> {
    let path = match path.strip_suffix('/') {
        Some(trimmed) if !trimmed.is_empty() => trimmed,
        _ => path,
    };

    if path == LOGIN_PATH || path == REGISTER_PATH {
        Some(PathClass::AuthPage)
    } else if within(path, DASHBOARD_PATH) {
        Some(PathClass::Member)
    } else if within(path, ADMIN_PATH) {
        Some(PathClass::Admin)
    } else {
        None
    }
}

/// decide
///
/// The guard's decision table. `is_admin` is only consulted for admin pages.
pub fn decide(class: PathClass, has_session: bool, is_admin: bool) -> GuardDecision {
    match (class, has_session) {
        (PathClass::AuthPage, true) => GuardDecision::RedirectToDashboard,
        (PathClass::AuthPage, false) => GuardDecision::Allow,
        (PathClass::Member | PathClass::Admin, false) => GuardDecision::RedirectToLogin,
        (PathClass::Member, true) => GuardDecision::Allow,
        (PathClass::Admin, true) if is_admin => GuardDecision::Allow,
        (PathClass::Admin, true) => GuardDecision::RedirectToDashboard,
    }
}

/// route_guard
///
/// Middleware run in front of every route. Resolves the session once, and the admin
/// flag only for admin pages with a session, then allows or redirects (307). Allowed
/// requests carry the resolution forward as `ResolvedAccess`.
pub async fn route_guard(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let Some(class) = classify(request.uri().path()) else {
        return next.run(request).await;
    };

    let session = resolve_session(request.headers(), &state.config, state.data.as_ref()).await;
    let is_admin = match (&session, class) {
        (Some(session), PathClass::Admin) => {
            Some(resolve_is_admin(state.data.as_ref(), session.user_id).await)
        }
        _ => None,
    };

    let decision = decide(class, session.is_some(), is_admin.unwrap_or(false));
    tracing::debug!(
        path = %request.uri().path(),
        ?class,
        ?decision,
        "route guard"
    );

    match decision {
        GuardDecision::Allow => {
            request
                .extensions_mut()
                .insert(ResolvedAccess { session, is_admin });
            next.run(request).await
        }
        GuardDecision::RedirectToLogin => Redirect::temporary(LOGIN_PATH).into_response(),
        GuardDecision::RedirectToDashboard => {
            Redirect::temporary(DASHBOARD_PATH).into_response()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_on_segment_boundaries() {
        assert_eq!(classify("/dashboard"), Some(PathClass::Member));
        assert_eq!(classify("/dashboard/"), Some(PathClass::Member));
        assert_eq!(classify("/dashboard/projects/42"), Some(PathClass::Member));
        assert_eq!(classify("/dashboardx"), None);
        assert_eq!(classify("/admin"), Some(PathClass::Admin));
        assert_eq!(classify("/admin/events"), Some(PathClass::Admin));
        assert_eq!(classify("/administrator"), None);
        assert_eq!(classify("/auth/login"), Some(PathClass::AuthPage));
        assert_eq!(classify("/auth/register/"), Some(PathClass::AuthPage));
        assert_eq!(classify("/auth/verify-email"), None);
        assert_eq!(classify("/"), None);
        assert_eq!(classify("/api/auth/logout"), None);
    }

    #[test]
    fn decision_table() {
        use GuardDecision::*;
        use PathClass::*;

        let cases = [
            (AuthPage, false, false, Allow),
            (AuthPage, true, false, RedirectToDashboard),
            (AuthPage, true, true, RedirectToDashboard),
            (Member, false, false, RedirectToLogin),
            (Member, true, false, Allow),
            (Member, true, true, Allow),
            (Admin, false, false, RedirectToLogin),
            (Admin, true, false, RedirectToDashboard),
            (Admin, true, true, Allow),
        ];
        for (class, session, admin, expected) in cases {
            assert_eq!(
                decide(class, session, admin),
                expected,
                "{class:?} session={session} admin={admin}"
            );
        }
    }
}
