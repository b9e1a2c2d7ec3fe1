use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use ts_rs::TS;
use utoipa::ToSchema;

use crate::{identity::IdentityError, repository::DataError};

/// Notice
///
/// The transient notification shown to the user after an action (a "toast").
/// Every error response body, and every successful mutation response, carries one.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, TS, ToSchema)]
#[ts(export)]
pub struct Notice {
    pub title: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    pub variant: NoticeVariant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum NoticeVariant {
    Default,
    Destructive,
}

impl Notice {
    pub fn success(title: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: None,
            variant: NoticeVariant::Default,
        }
    }

    pub fn failure(title: impl Into<String>, description: impl Into<String>) -> Self {
        Self {
            title: title.into(),
            description: Some(description.into()),
            variant: NoticeVariant::Destructive,
        }
    }
}

/// AppError
///
/// Per-request failure taxonomy. Nothing here is fatal to the process: each variant maps
/// onto an HTTP status and a destructive `Notice` at the edge.
#[derive(Debug, Error)]
pub enum AppError {
    /// A required field is empty or malformed. Raised before any backend call.
    #[error("{0}")]
    Validation(String),
    #[error("Please sign in to continue")]
    Unauthorized,
    #[error("You do not have permission to perform this action")]
    Forbidden,
    #[error("The requested record does not exist")]
    NotFound,
    #[error("{0}")]
    ConfirmationRequired(String),
    #[error(transparent)]
    Data(#[from] DataError),
    #[error(transparent)]
    Identity(#[from] IdentityError),
}

impl AppError {
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Unauthorized => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::ConfirmationRequired(_) => StatusCode::PRECONDITION_REQUIRED,
            AppError::Data(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::Identity(IdentityError::Rejected { .. }) => StatusCode::BAD_REQUEST,
            AppError::Identity(_) => StatusCode::BAD_GATEWAY,
        }
    }

    /// User-facing description. Backend internals are logged, never echoed.
    fn description(&self) -> String {
        match self {
            AppError::Data(e) => {
                tracing::error!("data client error: {:?}", e);
                "The request could not be completed. Please try again.".to_string()
            }
            AppError::Identity(IdentityError::Rejected { message, .. }) => message.clone(),
            AppError::Identity(e) => {
                tracing::error!("identity provider error: {:?}", e);
                "The authentication service is unavailable. Please try again.".to_string()
            }
            other => other.to_string(),
        }
    }

    /// Attaches the title of the action that failed, e.g. "Error creating event".
    pub fn during(self, action: impl Into<String>) -> ActionError {
        ActionError {
            title: action.into(),
            error: self,
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let notice = Notice::failure("Request failed", self.description());
        (status, Json(notice)).into_response()
    }
}

/// ActionError
///
/// An `AppError` bound to the action the user attempted, so the notice reads
/// "Error deleting post" rather than a generic failure.
#[derive(Debug, Error)]
#[error("{title}: {error}")]
pub struct ActionError {
    pub title: String,
    #[source]
    pub error: AppError,
}

impl IntoResponse for ActionError {
    fn into_response(self) -> Response {
        let status = self.error.status();
        let notice = Notice::failure(self.title, self.error.description());
        (status, Json(notice)).into_response()
    }
}

/// Converts `validator` output into a single readable message, e.g.
/// "Missing fields: title, location".
pub fn validation_message(errors: &validator::ValidationErrors) -> String {
    let mut missing: Vec<String> = Vec::new();
    let mut messages: Vec<String> = Vec::new();

    for (field, field_errors) in errors.field_errors() {
        for error in field_errors.iter() {
            match &error.message {
                Some(message) => messages.push(message.to_string()),
                None => missing.push(field.to_string()),
            }
        }
    }
    missing.sort();
    missing.dedup();
    messages.sort();

    let mut parts = Vec::new();
    if !missing.is_empty() {
        parts.push(format!("Missing fields: {}", missing.join(", ")));
    }
    parts.extend(messages);
    parts.join(". ")
}

impl From<validator::ValidationErrors> for AppError {
    fn from(errors: validator::ValidationErrors) -> Self {
        AppError::Validation(validation_message(&errors))
    }
}
