use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;
use validator::{Validate, ValidationError};

use crate::error::Notice;

// --- Records (rows of the hosted store) ---

/// Profile
///
/// The application-level user record in `public.profiles`, keyed by the auth user id.
/// Carries the `is_admin` flag that gates every write-protected collection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Profile {
    pub id: Uuid,
    pub email: String,
    pub full_name: Option<String>,
    pub avatar_url: Option<String>,
    pub bio: Option<String>,
    pub organization: Option<String>,
    pub role: Option<String>,
    pub is_admin: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum EventStatus {
    #[default]
    Upcoming,
    Ongoing,
    Completed,
}

impl EventStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            EventStatus::Upcoming => "upcoming",
            EventStatus::Ongoing => "ongoing",
            EventStatus::Completed => "completed",
        }
    }
}

/// Event
///
/// A community event. Created, edited and deleted by admins only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Event {
    pub id: Uuid,
    pub title: String,
    pub description: String,
    #[ts(type = "string")]
    pub event_date: DateTime<Utc>,
    pub location: String,
    pub image_url: Option<String>,
    pub registration_link: Option<String>,
    pub status: EventStatus,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Post {
    pub id: Uuid,
    pub title: String,
    pub content: String,
    pub excerpt: Option<String>,
    pub image_url: Option<String>,
    pub published: bool,
    pub created_by: Uuid,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Partnership {
    pub id: Uuid,
    pub name: String,
    pub description: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

/// The tool a showcased project was built with (`project_built_on` enum in the database).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum BuiltOn {
    #[default]
    Windsurf,
    Other,
}

/// ProjectSubmission
///
/// A member's showcased project in `public.project_submissions`.
/// Mutable by its owner (`user_id`) or any admin; `is_featured` is admin-only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProjectSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub title: String,
    pub overview: String,
    pub live_url: String,
    pub github_url: Option<String>,
    pub built_on: BuiltOn,
    pub built_on_other_text: Option<String>,
    pub is_featured: bool,
    #[ts(type = "string")]
    pub created_at: DateTime<Utc>,
    #[ts(type = "string")]
    pub updated_at: DateTime<Utc>,
}

// --- Form Payloads (Input Schemas) ---

/// EventForm
///
/// Create and edit payload for events. `event_date` accepts RFC 3339 or the
/// `datetime-local` shape browsers submit (`2025-03-01T18:00`), read as UTC.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct EventForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub event_date: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub location: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub registration_link: Option<String>,
    #[serde(default)]
    pub status: EventStatus,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct PostForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub content: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub excerpt: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub image_url: Option<String>,
    #[serde(default)]
    pub published: bool,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct PartnershipForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub name: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub description: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub logo_url: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub website_url: Option<String>,
}

/// ProjectSubmissionForm
///
/// Payload for submitting a project. The owner is stamped from the session and
/// `is_featured` is never accepted here.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[validate(schema(function = validate_built_on))]
#[serde(default)]
#[ts(export)]
pub struct ProjectSubmissionForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub overview: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1), url(message = "Live URL must be a valid URL"))]
    pub live_url: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    #[validate(url(message = "GitHub URL must be a valid URL"))]
    pub github_url: Option<String>,
    #[serde(default)]
    pub built_on: BuiltOn,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub built_on_other_text: Option<String>,
}

fn validate_built_on(form: &ProjectSubmissionForm) -> Result<(), ValidationError> {
    let specified = form
        .built_on_other_text
        .as_deref()
        .is_some_and(|text| !text.trim().is_empty());
    if form.built_on == BuiltOn::Other && !specified {
        return Err(ValidationError::new("built_on_other_text")
            .with_message("Please specify what it is built on".into()));
    }
    Ok(())
}

/// Inline edit of a project card: only title and overview change.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct ProjectEditForm {
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub title: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub overview: String,
}

/// Self-service profile update. The admin flag is deliberately absent.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileForm {
    #[serde(default, deserialize_with = "blank_as_none")]
    pub full_name: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub organization: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub bio: Option<String>,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub avatar_url: Option<String>,
}

/// Admin-side profile update; may grant or revoke admin.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct MemberUpdateForm {
    #[serde(flatten)]
    pub profile: ProfileForm,
    #[serde(default)]
    pub is_admin: Option<bool>,
}

/// LoginRequest
///
/// Password sign-in, forwarded to the identity provider and never stored.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct LoginRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 1))]
    pub password: String,
}

/// RegisterRequest
///
/// Sign-up payload. The password only passes through to the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize, Validate, TS, ToSchema)]
#[serde(default)]
#[ts(export)]
pub struct RegisterRequest {
    #[serde(deserialize_with = "trimmed")]
    #[validate(email(message = "Please enter a valid email address"))]
    pub email: String,
    #[validate(length(min = 6, message = "Password must be at least 6 characters"))]
    pub password: String,
    #[serde(deserialize_with = "trimmed")]
    #[validate(length(min = 1))]
    pub full_name: String,
    #[serde(default, deserialize_with = "blank_as_none")]
    pub organization: Option<String>,
    #[serde(default)]
    pub accepted_terms: bool,
}

// --- Views (Output Schemas) ---

/// DashboardView
///
/// Member landing page: own profile, upcoming events (soonest first),
/// partnerships and the size of the project showcase.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct DashboardView {
    pub profile: Profile,
    pub is_admin: bool,
    pub upcoming_events: Vec<Event>,
    pub partnerships: Vec<Partnership>,
    pub projects_count: i64,
}

/// AdminOverview
///
/// Counters for the admin home page.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct AdminOverview {
    pub events_count: i64,
    pub posts_count: i64,
    pub partnerships_count: i64,
    pub users_count: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProjectCard {
    #[serde(flatten)]
    pub project: ProjectSubmission,
    /// Whether the viewer may edit or delete this project (owner or admin).
    pub can_edit: bool,
}

/// ProjectBoard
///
/// The showcase list, featured first then newest, annotated per card with the
/// viewer's permissions.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProjectBoard {
    pub current_user_id: Uuid,
    pub is_admin: bool,
    pub projects: Vec<ProjectCard>,
}

/// Result of a profile save: the notice plus the profile as stored.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct ProfileOutcome {
    pub notice: Notice,
    pub profile: Profile,
}

/// Result of a featured toggle: the notice plus the re-fetched board.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct BoardOutcome {
    pub notice: Notice,
    pub board: ProjectBoard,
}

/// Static page descriptor for the public pages.
#[derive(Debug, Clone, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct PageInfo {
    pub title: String,
    pub description: String,
    pub links: Vec<String>,
}

// --- Field helpers ---

/// Treats an empty or whitespace-only optional input as absent.
pub fn blank_to_none(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Form inputs submit `""` for untouched optional fields; store those as null.
/// Required text fields are trimmed on the way in, so `"   "` fails `length(min = 1)`.
fn trimmed<'de, D>(deserializer: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    String::deserialize(deserializer).map(|value| value.trim().to_string())
}

fn blank_as_none<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<String>::deserialize(deserializer).map(blank_to_none)
}

/// Parses an event date as RFC 3339, falling back to the `datetime-local` form
/// (`YYYY-MM-DDTHH:MM` or with seconds) interpreted as UTC.
pub fn parse_event_date(input: &str) -> Option<DateTime<Utc>> {
    let input = input.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(input) {
        return Some(parsed.with_timezone(&Utc));
    }
    ["%Y-%m-%dT%H:%M", "%Y-%m-%dT%H:%M:%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(input, fmt).ok())
        .map(|naive| naive.and_utc())
}
