use chrono::{TimeZone, Utc};
use collective_portal::{
    error::{AppError, Notice, NoticeVariant, validation_message},
    models::{
        BuiltOn, EventForm, EventStatus, LoginRequest, MemberUpdateForm, ProjectCard,
        ProjectSubmission, ProjectSubmissionForm, RegisterRequest, parse_event_date,
    },
};
use serde_json::json;
use uuid::Uuid;
use validator::Validate;

// --- Event dates ---

#[test]
fn test_event_date_accepts_datetime_local() {
    let expected = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
    assert_eq!(parse_event_date("2025-03-01T18:00"), Some(expected));
    assert_eq!(parse_event_date("2025-03-01T18:00:00"), Some(expected));
}

#[test]
fn test_event_date_accepts_rfc3339_with_offset() {
    // 21:00 in Nairobi is 18:00 UTC.
    let expected = Utc.with_ymd_and_hms(2025, 3, 1, 18, 0, 0).unwrap();
    assert_eq!(parse_event_date("2025-03-01T21:00:00+03:00"), Some(expected));
    assert_eq!(parse_event_date(" 2025-03-01T18:00:00Z "), Some(expected));
}

#[test]
fn test_event_date_rejects_garbage() {
    assert_eq!(parse_event_date(""), None);
    assert_eq!(parse_event_date("01/03/2025"), None);
    assert_eq!(parse_event_date("2025-03-01"), None);
}

// --- Form payloads ---

#[test]
fn test_event_form_defaults_and_blank_optionals() {
    let form: EventForm = serde_json::from_value(json!({
        "title": "Demo Night",
        "description": "Show and tell",
        "event_date": "2025-03-01T18:00",
        "location": "Nairobi",
        "image_url": "   ",
        "registration_link": ""
    }))
    .unwrap();

    assert_eq!(form.status, EventStatus::Upcoming);
    assert_eq!(form.image_url, None);
    assert_eq!(form.registration_link, None);
    assert!(form.validate().is_ok());
}

#[test]
fn test_missing_fields_message_lists_every_field() {
    let form = EventForm {
        description: "Only a description".into(),
        ..Default::default()
    };
    let errors = form.validate().unwrap_err();

    assert_eq!(
        validation_message(&errors),
        "Missing fields: event_date, location, title"
    );
    assert!(matches!(AppError::from(errors), AppError::Validation(_)));
}

#[test]
fn test_required_fields_are_trimmed_and_may_be_omitted() {
    let form: EventForm = serde_json::from_value(json!({
        "title": "  Demo Night  ",
        "description": "   ",
        "event_date": "2025-03-01T18:00"
    }))
    .unwrap();

    assert_eq!(form.title, "Demo Night");
    assert_eq!(form.description, "");
    assert_eq!(form.location, "");
    assert_eq!(
        validation_message(&form.validate().unwrap_err()),
        "Missing fields: description, location"
    );
}

#[test]
fn test_project_form_built_on_other_needs_text() {
    let mut form = ProjectSubmissionForm {
        title: "Agent".into(),
        overview: "Automates paperwork".into(),
        live_url: "https://agent.example.com".into(),
        built_on: BuiltOn::Other,
        ..Default::default()
    };
    let errors = form.validate().unwrap_err();
    assert_eq!(validation_message(&errors), "Please specify what it is built on");

    form.built_on_other_text = Some("Cursor".into());
    assert!(form.validate().is_ok());

    form.built_on = BuiltOn::Windsurf;
    form.built_on_other_text = None;
    assert!(form.validate().is_ok());
}

#[test]
fn test_project_form_urls() {
    let form = ProjectSubmissionForm {
        title: "Agent".into(),
        overview: "Automates paperwork".into(),
        live_url: "agent dot com".into(),
        github_url: Some("github".into()),
        ..Default::default()
    };
    let message = validation_message(&form.validate().unwrap_err());

    assert!(message.contains("Live URL must be a valid URL"));
    assert!(message.contains("GitHub URL must be a valid URL"));
}

#[test]
fn test_project_form_never_carries_featured_flag() {
    let form: ProjectSubmissionForm = serde_json::from_value(json!({
        "title": "Agent",
        "overview": "o",
        "live_url": "https://agent.example.com",
        "is_featured": true
    }))
    .unwrap();

    let serialized = serde_json::to_value(&form).unwrap();
    assert!(serialized.get("is_featured").is_none());
    assert_eq!(form.built_on, BuiltOn::Windsurf);
}

#[test]
fn test_login_and_register_validation() {
    let login = LoginRequest {
        email: "not-an-email".into(),
        password: "x".into(),
    };
    assert_eq!(
        validation_message(&login.validate().unwrap_err()),
        "Please enter a valid email address"
    );

    let register: RegisterRequest = serde_json::from_value(json!({
        "email": "member@example.com",
        "password": "secret123",
        "full_name": "Member"
    }))
    .unwrap();
    assert!(register.validate().is_ok());
    // Terms default to not accepted.
    assert!(!register.accepted_terms);
}

#[test]
fn test_member_update_form_flattens_profile_fields() {
    let form: MemberUpdateForm = serde_json::from_value(json!({
        "full_name": "Admin Person",
        "bio": "",
        "is_admin": true
    }))
    .unwrap();

    assert_eq!(form.profile.full_name.as_deref(), Some("Admin Person"));
    assert_eq!(form.profile.bio, None);
    assert_eq!(form.is_admin, Some(true));
}

// --- Views ---

#[test]
fn test_project_card_flattens_project() {
    let project = ProjectSubmission {
        id: Uuid::new_v4(),
        user_id: Uuid::new_v4(),
        title: "Agent".into(),
        overview: "o".into(),
        live_url: "https://agent.example.com".into(),
        github_url: None,
        built_on: BuiltOn::Windsurf,
        built_on_other_text: None,
        is_featured: true,
        created_at: Utc::now(),
        updated_at: Utc::now(),
    };
    let card = serde_json::to_value(ProjectCard {
        project,
        can_edit: false,
    })
    .unwrap();

    assert_eq!(card["title"], "Agent");
    assert_eq!(card["is_featured"], true);
    assert_eq!(card["built_on"], "windsurf");
    assert_eq!(card["can_edit"], false);
    assert!(card.get("project").is_none());
}

#[test]
fn test_notice_serialization() {
    let ok = serde_json::to_value(Notice::success("Event created successfully")).unwrap();
    assert_eq!(
        ok,
        json!({ "title": "Event created successfully", "variant": "default" })
    );

    let failed = Notice::failure("Error creating event", "Missing fields: title");
    assert_eq!(failed.variant, NoticeVariant::Destructive);
    assert_eq!(
        serde_json::to_value(failed).unwrap()["description"],
        "Missing fields: title"
    );
}
