use serde_json::{Value, json};

use crate::{
    auth::RequestContext,
    error::AppError,
    models::{
        BuiltOn, Event, EventForm, Partnership, PartnershipForm, Post, PostForm, ProjectEditForm,
        ProjectSubmission, ProjectSubmissionForm, parse_event_date,
    },
    repository::{Collection, Query, Row},
    resource::{Action, Resource},
};

fn object(value: Value) -> Row {
    match value {
        Value::Object(map) => map,
        _ => Row::new(),
    }
}

fn event_row(form: EventForm) -> Result<Row, AppError> {
    let event_date = parse_event_date(&form.event_date).ok_or_else(|| {
        AppError::Validation(format!("Invalid event date: {}", form.event_date))
    })?;
    Ok(object(json!({
        "title": form.title.trim(),
        "description": form.description,
        "event_date": event_date.to_rfc3339(),
        "location": form.location.trim(),
        "image_url": form.image_url,
        "registration_link": form.registration_link,
        "status": form.status.as_str(),
    })))
}

/// Events, admin-managed, newest event date first.
pub struct EventResource;

impl Resource for EventResource {
    type Record = Event;
    type CreateForm = EventForm;
    type UpdateForm = EventForm;

    const COLLECTION: Collection = Collection::Events;
    const LABEL: &'static str = "event";
    const TITLE: &'static str = "Event";
    const PATH: &'static str = "/admin/events";

    fn order() -> Query {
        Query::new().order("event_date", false)
    }

    fn insert_row(form: EventForm, ctx: &RequestContext) -> Result<Row, AppError> {
        let mut row = event_row(form)?;
        row.insert("created_by".into(), json!(ctx.user_id));
        Ok(row)
    }

    fn update_row(form: EventForm) -> Result<Row, AppError> {
        event_row(form)
    }
}

fn post_row(form: PostForm) -> Row {
    object(json!({
        "title": form.title.trim(),
        "content": form.content,
        "excerpt": form.excerpt,
        "image_url": form.image_url,
        "published": form.published,
    }))
}

pub struct PostResource;

impl Resource for PostResource {
    type Record = Post;
    type CreateForm = PostForm;
    type UpdateForm = PostForm;

    const COLLECTION: Collection = Collection::Posts;
    const LABEL: &'static str = "post";
    const TITLE: &'static str = "Post";
    const PATH: &'static str = "/admin/posts";

    fn order() -> Query {
        Query::new().order("created_at", false)
    }

    fn insert_row(form: PostForm, ctx: &RequestContext) -> Result<Row, AppError> {
        let mut row = post_row(form);
        row.insert("created_by".into(), json!(ctx.user_id));
        Ok(row)
    }

    fn update_row(form: PostForm) -> Result<Row, AppError> {
        Ok(post_row(form))
    }
}

fn partnership_row(form: PartnershipForm) -> Row {
    object(json!({
        "name": form.name.trim(),
        "description": form.description,
        "logo_url": form.logo_url,
        "website_url": form.website_url,
    }))
}

pub struct PartnershipResource;

impl Resource for PartnershipResource {
    type Record = Partnership;
    type CreateForm = PartnershipForm;
    type UpdateForm = PartnershipForm;

    const COLLECTION: Collection = Collection::Partnerships;
    const LABEL: &'static str = "partnership";
    const TITLE: &'static str = "Partnership";
    const PATH: &'static str = "/admin/partnerships";

    fn order() -> Query {
        Query::new().order("created_at", false)
    }

    fn insert_row(form: PartnershipForm, _ctx: &RequestContext) -> Result<Row, AppError> {
        Ok(partnership_row(form))
    }

    fn update_row(form: PartnershipForm) -> Result<Row, AppError> {
        Ok(partnership_row(form))
    }
}

/// ProjectResource
///
/// Member showcase. Any member may submit; the owner or an admin may edit or delete.
/// The list (featured first, then newest) is rendered through the project board
/// handlers rather than the generic list route.
pub struct ProjectResource;

impl Resource for ProjectResource {
    type Record = ProjectSubmission;
    type CreateForm = ProjectSubmissionForm;
    type UpdateForm = ProjectEditForm;

    const COLLECTION: Collection = Collection::ProjectSubmissions;
    const LABEL: &'static str = "project";
    const TITLE: &'static str = "Project";
    const PATH: &'static str = "/dashboard/projects";

    fn order() -> Query {
        Query::new()
            .order("is_featured", false)
            .order("created_at", false)
    }

    fn can_view(_ctx: &RequestContext) -> bool {
        true
    }

    fn can_create(_ctx: &RequestContext) -> bool {
        true
    }

    fn can_modify(ctx: &RequestContext, record: &ProjectSubmission) -> bool {
        ctx.owns_or_admin(record.user_id)
    }

    fn insert_row(form: ProjectSubmissionForm, ctx: &RequestContext) -> Result<Row, AppError> {
        // The free-text tool name only means something alongside `built_on = other`.
        let other_text = match form.built_on {
            BuiltOn::Other => form.built_on_other_text.map(|t| t.trim().to_string()),
            BuiltOn::Windsurf => None,
        };
        Ok(object(json!({
            "user_id": ctx.user_id,
            "title": form.title.trim(),
            "overview": form.overview.trim(),
            "live_url": form.live_url.trim(),
            "github_url": form.github_url,
            "built_on": form.built_on,
            "built_on_other_text": other_text,
        })))
    }

    fn update_row(form: ProjectEditForm) -> Result<Row, AppError> {
        Ok(object(json!({
            "title": form.title.trim(),
            "overview": form.overview.trim(),
        })))
    }

    fn success_title(action: Action) -> String {
        match action {
            Action::Create => "Project submitted",
            Action::Update => "Updated",
            Action::Delete => "Deleted",
            Action::Fetch => "Projects loaded",
        }
        .to_string()
    }

    fn failure_title(action: Action) -> String {
        match action {
            Action::Create => "Failed to submit",
            Action::Update => "Failed to update",
            Action::Delete => "Failed to delete",
            Action::Fetch => "Error fetching projects",
        }
        .to_string()
    }
}
