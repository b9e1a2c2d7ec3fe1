use crate::{
    AppState,
    auth::{RequestContext, access_token},
    config::{AppConfig, Env},
    error::{ActionError, AppError, Notice},
    guard::DASHBOARD_PATH,
    identity::SignUp,
    models::{
        AdminOverview, BoardOutcome, DashboardView, Event, LoginRequest, MemberUpdateForm,
        PageInfo, Partnership, Profile, ProfileForm, ProfileOutcome, ProjectBoard, ProjectCard,
        ProjectSubmission, RegisterRequest,
    },
    repository::{
        Collection, DataClient, Query, Row, fetch_all, fetch_by_id, from_row, to_row,
    },
    resource::{MutationOutcome, Resource},
    resources::ProjectResource,
};
use axum::{
    Json,
    extract::{Path, State},
    http::{HeaderMap, header},
    response::{IntoResponse, Redirect, Response},
};
use serde_json::{Value, json};
use uuid::Uuid;
use validator::Validate;

pub const VERIFY_EMAIL_PATH: &str = "/auth/verify-email";

const DASHBOARD_EVENTS: i64 = 4;
const DASHBOARD_PARTNERSHIPS: i64 = 6;

fn page(title: &str, description: &str, links: &[&str]) -> Json<PageInfo> {
    Json(PageInfo {
        title: title.to_string(),
        description: description.to_string(),
        links: links.iter().map(|l| l.to_string()).collect(),
    })
}

fn require_admin(ctx: &RequestContext) -> Result<(), AppError> {
    if ctx.is_admin {
        Ok(())
    } else {
        Err(AppError::Forbidden)
    }
}

/// Builds the `Set-Cookie` value for the session cookie. A `max_age` of zero clears it.
fn session_cookie(config: &AppConfig, token: &str, max_age: i64) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        config.session_cookie, token, max_age
    );
    if config.env == Env::Production {
        cookie.push_str("; Secure");
    }
    cookie
}

// --- Public pages ---

#[utoipa::path(
    get,
    path = "/",
    responses((status = 200, description = "Landing page", body = PageInfo))
)]
pub async fn landing() -> Json<PageInfo> {
    page(
        "AI Collective Kenya - Join the AI Community",
        "A community of builders, researchers and enthusiasts shaping AI in Kenya.",
        &["/auth/register", "/auth/login"],
    )
}

#[utoipa::path(
    get,
    path = "/privacy",
    responses((status = 200, description = "Privacy policy", body = PageInfo))
)]
pub async fn privacy() -> Json<PageInfo> {
    page(
        "Privacy Policy",
        "How the collective collects, uses and protects member information.",
        &["/", "/terms"],
    )
}

#[utoipa::path(
    get,
    path = "/terms",
    responses((status = 200, description = "Terms of service", body = PageInfo))
)]
pub async fn terms() -> Json<PageInfo> {
    page(
        "Terms of Service",
        "The terms members accept when joining the collective.",
        &["/", "/privacy"],
    )
}

#[utoipa::path(
    get,
    path = "/auth/login",
    responses((status = 200, description = "Sign-in page", body = PageInfo))
)]
pub async fn login_page() -> Json<PageInfo> {
    page(
        "Sign in",
        "Sign in with your email and password.",
        &["/auth/register"],
    )
}

#[utoipa::path(
    get,
    path = "/auth/register",
    responses((status = 200, description = "Registration page", body = PageInfo))
)]
pub async fn register_page() -> Json<PageInfo> {
    page(
        "Join the Collective",
        "Create an account. You must accept the terms of service and privacy policy.",
        &["/auth/login", "/terms", "/privacy"],
    )
}

#[utoipa::path(
    get,
    path = "/auth/verify-email",
    responses((status = 200, description = "Email verification notice", body = PageInfo))
)]
pub async fn verify_email_page() -> Json<PageInfo> {
    page(
        "Check your email",
        "We sent you a confirmation link. Follow it to activate your account, then sign in.",
        &["/auth/login"],
    )
}

// --- Authentication ---

/// login
///
/// Password sign-in through the identity provider. On success the access token is
/// stored in the session cookie and the browser is sent to the dashboard (303).
#[utoipa::path(
    post,
    path = "/auth/login",
    request_body = LoginRequest,
    responses(
        (status = 303, description = "Signed in, redirect to /dashboard"),
        (status = 400, description = "Invalid credentials", body = Notice)
    )
)]
pub async fn login(
    State(state): State<AppState>,
    Json(payload): Json<LoginRequest>,
) -> Result<Response, ActionError> {
    let title = "Sign in failed";
    payload
        .validate()
        .map_err(|e| AppError::from(e).during(title))?;

    let signed_in = state
        .identity
        .sign_in(payload.email.trim(), &payload.password)
        .await
        .map_err(|e| AppError::from(e).during(title))?;

    tracing::info!(user_id = %signed_in.user.id, "user signed in");
    let cookie = session_cookie(&state.config, &signed_in.access_token, signed_in.expires_in);
    Ok((
        [(header::SET_COOKIE, cookie)],
        Redirect::to(DASHBOARD_PATH),
    )
        .into_response())
}

/// register
///
/// Creates the auth user with the identity provider, then mirrors it into `profiles`
/// under the same id. Terms acceptance is checked before anything else.
#[utoipa::path(
    post,
    path = "/auth/register",
    request_body = RegisterRequest,
    responses(
        (status = 303, description = "Registered, redirect to /auth/verify-email"),
        (status = 400, description = "Rejected", body = Notice)
    )
)]
pub async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> Result<Response, ActionError> {
    if !payload.accepted_terms {
        return Err(AppError::Validation(
            "Please accept the Terms of Service and Privacy Policy to continue".to_string(),
        )
        .during("Terms Required"));
    }

    let title = "Registration failed";
    payload
        .validate()
        .map_err(|e| AppError::from(e).during(title))?;

    let email = payload.email.trim().to_string();
    let full_name = payload.full_name.trim().to_string();
    let user_id = state
        .identity
        .sign_up(&SignUp {
            email: email.clone(),
            password: payload.password,
            full_name: full_name.clone(),
            organization: payload.organization.clone(),
        })
        .await
        .map_err(|e| AppError::from(e).during(title))?;

    let profile = to_row(&json!({
        "id": user_id,
        "email": email,
        "full_name": full_name,
        "organization": payload.organization,
    }))
    .map_err(|e| AppError::from(e).during(title))?;
    // The provider account already exists, so a retry would be refused as a duplicate.
    // The row is created on first sign-in instead.
    if let Err(e) = state.data.insert(Collection::Profiles, profile).await {
        tracing::error!(%user_id, "profile insert failed after sign-up: {}", e);
    }

    tracing::info!(%user_id, "member registered");
    Ok(Redirect::to(VERIFY_EMAIL_PATH).into_response())
}

/// logout
///
/// Revokes the provider session when one is presented (failures are only logged),
/// clears the session cookie and redirects to the landing page.
#[utoipa::path(
    post,
    path = "/api/auth/logout",
    responses((status = 303, description = "Signed out, redirect to /"))
)]
pub async fn logout(State(state): State<AppState>, headers: HeaderMap) -> Response {
    if let Some(token) = access_token(&headers, &state.config.session_cookie) {
        if let Err(e) = state.identity.sign_out(token).await {
            tracing::warn!("provider sign-out failed: {}", e);
        }
    }
    let cleared = session_cookie(&state.config, "", 0);
    ([(header::SET_COOKIE, cleared)], Redirect::to("/")).into_response()
}

// --- Member area ---

/// dashboard
///
/// The member landing page: own profile, upcoming events soonest first,
/// partnerships and the number of showcased projects.
#[utoipa::path(
    get,
    path = "/dashboard",
    responses(
        (status = 200, description = "Dashboard", body = DashboardView),
        (status = 401, description = "No session", body = Notice)
    )
)]
pub async fn dashboard(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<DashboardView>, AppError> {
    let client = state.data.as_ref();

    let profile = own_profile(client, &ctx).await?;
    let upcoming_events: Vec<Event> = fetch_all(
        client,
        Collection::Events,
        &Query::new()
            .eq("status", "upcoming")
            .order("event_date", true)
            .limit(DASHBOARD_EVENTS),
    )
    .await?;
    let partnerships: Vec<Partnership> = fetch_all(
        client,
        Collection::Partnerships,
        &Query::new()
            .order("created_at", false)
            .limit(DASHBOARD_PARTNERSHIPS),
    )
    .await?;
    let projects_count = client.count(Collection::ProjectSubmissions, &[]).await?;

    Ok(Json(DashboardView {
        profile,
        is_admin: ctx.is_admin,
        upcoming_events,
        partnerships,
        projects_count,
    }))
}

#[utoipa::path(
    get,
    path = "/dashboard/profile",
    responses(
        (status = 200, description = "Own profile, created if missing", body = Profile),
        (status = 401, description = "No session", body = Notice)
    )
)]
pub async fn get_profile(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<Profile>, AppError> {
    own_profile(state.data.as_ref(), &ctx).await.map(Json)
}

/// own_profile
///
/// The caller's profile row, created from the session when it is missing. Sign-up
/// writes the row too, but that insert can fail after the provider account exists.
async fn own_profile(client: &dyn DataClient, ctx: &RequestContext) -> Result<Profile, AppError> {
    if let Some(profile) = fetch_by_id::<Profile>(client, Collection::Profiles, ctx.user_id).await? {
        return Ok(profile);
    }

    let row = to_row(&json!({
        "id": ctx.user_id,
        "email": ctx.email.clone().unwrap_or_default(),
    }))?;
    match client.insert(Collection::Profiles, row).await {
        Ok(row) => {
            tracing::info!(user_id = %ctx.user_id, "missing profile row created");
            Ok(from_row(row)?)
        }
        // A concurrent request may have created it first.
        Err(e) => fetch_by_id::<Profile>(client, Collection::Profiles, ctx.user_id)
            .await?
            .ok_or(AppError::from(e)),
    }
}

fn profile_changes(form: ProfileForm) -> Row {
    let mut row = Row::new();
    row.insert("full_name".into(), json!(form.full_name));
    row.insert("organization".into(), json!(form.organization));
    row.insert("bio".into(), json!(form.bio));
    row.insert("avatar_url".into(), json!(form.avatar_url));
    row
}

/// update_profile
///
/// Saves the caller's own profile fields. The admin flag cannot be changed here.
#[utoipa::path(
    put,
    path = "/dashboard/profile",
    request_body = ProfileForm,
    responses((status = 200, description = "Profile saved", body = ProfileOutcome))
)]
pub async fn update_profile(
    ctx: RequestContext,
    State(state): State<AppState>,
    Json(form): Json<ProfileForm>,
) -> Result<Json<ProfileOutcome>, ActionError> {
    let title = "Error updating profile";
    own_profile(state.data.as_ref(), &ctx)
        .await
        .map_err(|e| e.during(title))?;
    let row = state
        .data
        .update(Collection::Profiles, ctx.user_id, profile_changes(form))
        .await
        .map_err(|e| AppError::from(e).during(title))?
        .ok_or_else(|| AppError::NotFound.during(title))?;
    let profile = from_row(row).map_err(|e| AppError::from(e).during(title))?;

    Ok(Json(ProfileOutcome {
        notice: Notice::success("Profile updated successfully"),
        profile,
    }))
}

async fn project_board(client: &dyn DataClient, ctx: &RequestContext) -> Result<ProjectBoard, AppError> {
    let projects: Vec<ProjectSubmission> =
        fetch_all(client, ProjectResource::COLLECTION, &ProjectResource::order()).await?;

    let projects = projects
        .into_iter()
        .map(|project| ProjectCard {
            can_edit: ProjectResource::can_modify(ctx, &project),
            project,
        })
        .collect();

    Ok(ProjectBoard {
        current_user_id: ctx.user_id,
        is_admin: ctx.is_admin,
        projects,
    })
}

/// get_project_board
///
/// The project showcase, featured first then newest. Each card says whether the
/// viewer may edit or delete it.
#[utoipa::path(
    get,
    path = "/dashboard/projects",
    responses((status = 200, description = "Project board", body = ProjectBoard))
)]
pub async fn get_project_board(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<ProjectBoard>, ActionError> {
    project_board(state.data.as_ref(), &ctx)
        .await
        .map(Json)
        .map_err(|e| e.during("Error fetching projects"))
}

// --- Admin area ---

/// admin_overview
///
/// Record counts for the admin home page.
#[utoipa::path(
    get,
    path = "/admin",
    responses(
        (status = 200, description = "Counts", body = AdminOverview),
        (status = 403, description = "Not an admin", body = Notice)
    )
)]
pub async fn admin_overview(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<AdminOverview>, AppError> {
    require_admin(&ctx)?;
    let client = state.data.as_ref();

    Ok(Json(AdminOverview {
        events_count: client.count(Collection::Events, &[]).await?,
        posts_count: client.count(Collection::Posts, &[]).await?,
        partnerships_count: client.count(Collection::Partnerships, &[]).await?,
        users_count: client.count(Collection::Profiles, &[]).await?,
    }))
}

#[utoipa::path(
    get,
    path = "/admin/projects",
    responses((status = 200, description = "Project board (admin)", body = ProjectBoard))
)]
pub async fn get_admin_project_board(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<ProjectBoard>, ActionError> {
    let title = "Error fetching projects";
    require_admin(&ctx).map_err(|e| e.during(title))?;
    project_board(state.data.as_ref(), &ctx)
        .await
        .map(Json)
        .map_err(|e| e.during(title))
}

/// toggle_featured
///
/// Flips `is_featured` on exactly one project, then returns the re-fetched board.
#[utoipa::path(
    post,
    path = "/admin/projects/{id}/featured",
    params(("id" = Uuid, Path, description = "Project ID")),
    responses(
        (status = 200, description = "Flag flipped", body = BoardOutcome),
        (status = 404, description = "No such project", body = Notice)
    )
)]
pub async fn toggle_featured(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
) -> Result<Json<BoardOutcome>, ActionError> {
    let title = "Failed to change featured";
    let client = state.data.as_ref();

    let result = async {
        require_admin(&ctx)?;
        let project = fetch_by_id::<ProjectSubmission>(client, Collection::ProjectSubmissions, id)
            .await?
            .ok_or(AppError::NotFound)?;

        let featured = !project.is_featured;
        let mut changes = Row::new();
        changes.insert("is_featured".into(), Value::Bool(featured));
        client
            .update(Collection::ProjectSubmissions, id, changes)
            .await?
            .ok_or(AppError::NotFound)?;

        tracing::info!(user_id = %ctx.user_id, project_id = %id, featured, "featured flag changed");
        let board = project_board(client, &ctx).await?;
        Ok::<_, AppError>((featured, board))
    }
    .await;

    let (featured, board) = result.map_err(|e| e.during(title))?;
    let notice = if featured {
        Notice::success("Project featured")
    } else {
        Notice::success("Project unfeatured")
    };
    Ok(Json(BoardOutcome { notice, board }))
}

#[utoipa::path(
    get,
    path = "/admin/members",
    responses((status = 200, description = "All member profiles", body = [Profile]))
)]
pub async fn list_members(
    ctx: RequestContext,
    State(state): State<AppState>,
) -> Result<Json<Vec<Profile>>, ActionError> {
    let title = "Error fetching members";
    require_admin(&ctx).map_err(|e| e.during(title))?;
    fetch_all(
        state.data.as_ref(),
        Collection::Profiles,
        &Query::new().order("created_at", false),
    )
    .await
    .map(Json)
    .map_err(|e| AppError::from(e).during(title))
}

/// update_member
///
/// Admin edit of any profile, including granting or revoking admin.
#[utoipa::path(
    put,
    path = "/admin/members/{id}",
    params(("id" = Uuid, Path, description = "Profile ID")),
    request_body = MemberUpdateForm,
    responses((status = 200, description = "Member saved"))
)]
pub async fn update_member(
    ctx: RequestContext,
    State(state): State<AppState>,
    Path(id): Path<Uuid>,
    Json(form): Json<MemberUpdateForm>,
) -> Result<Json<MutationOutcome<Profile>>, ActionError> {
    let title = "Error updating member";
    let client = state.data.as_ref();

    let result = async {
        require_admin(&ctx)?;
        let mut changes = profile_changes(form.profile);
        if let Some(is_admin) = form.is_admin {
            changes.insert("is_admin".into(), Value::Bool(is_admin));
        }
        client
            .update(Collection::Profiles, id, changes)
            .await?
            .ok_or(AppError::NotFound)?;
        tracing::info!(user_id = %ctx.user_id, member_id = %id, is_admin = ?form.is_admin, "member updated");

        let records: Vec<Profile> = fetch_all(
            client,
            Collection::Profiles,
            &Query::new().order("created_at", false),
        )
        .await?;
        Ok::<_, AppError>(records)
    }
    .await;

    let records = result.map_err(|e| e.during(title))?;
    Ok(Json(MutationOutcome {
        notice: Notice::success("Member updated successfully"),
        records,
    }))
}
