//! Errors returned to API clients
//!

use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::header::CONTENT_TYPE;
use axum::http::{HeaderValue, StatusCode};
use axum::response::IntoResponse;
use sea_orm::DbErr;
use tracing::error;
use tracker_shared::error::TrackerError;

/// Field name to the list of problems with it.
pub type FieldErrors = BTreeMap<String, Vec<String>>;

#[derive(Debug)]
pub struct WebError {
    pub(crate) status: StatusCode,
    pub(crate) message: String,
    pub(crate) fields: Option<FieldErrors>,
}

impl WebError {
    pub fn new(status: StatusCode, message: impl Into<String>) -> Self {
        WebError {
            status,
            message: message.into(),
            fields: None,
        }
    }

    pub fn not_found() -> Self {
        Self::new(StatusCode::NOT_FOUND, "Not found.")
    }

    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message)
    }

    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message)
    }

    pub fn validation(fields: FieldErrors) -> Self {
        WebError {
            status: StatusCode::BAD_REQUEST,
            message: "Validation failed".to_string(),
            fields: Some(fields),
        }
    }

    /// A validation error on a single field.
    pub fn field(field: &str, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(field.to_string(), vec![message.into()]);
        Self::validation(fields)
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }
}

impl IntoResponse for WebError {
    fn into_response(self) -> axum::response::Response {
        let body = match self.fields {
            Some(fields) => serde_json::json!({
                "error": self.message,
                "fields": fields,
            }),
            None => serde_json::json!({
                "error": self.message,
            }),
        };
        let mut response = axum::response::Response::new(body.to_string().into());
        *response.status_mut() = self.status;
        response
            .headers_mut()
            .insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        response
    }
}

impl From<DbErr> for WebError {
    fn from(err: DbErr) -> Self {
        error!("Database error: {:?}", err);
        WebError::new(
            StatusCode::INTERNAL_SERVER_ERROR,
            format!("Database error: {}", err),
        )
    }
}

impl From<JsonRejection> for WebError {
    fn from(rejection: JsonRejection) -> Self {
        WebError::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for WebError {
    fn from(rejection: QueryRejection) -> Self {
        WebError::bad_request(rejection.body_text())
    }
}

impl From<PathRejection> for WebError {
    fn from(rejection: PathRejection) -> Self {
        tracing::debug!("Path rejected: {}", rejection.body_text());
        WebError::not_found()
    }
}

impl From<TrackerError> for WebError {
    fn from(err: TrackerError) -> Self {
        match err {
            TrackerError::InvalidChoice { field, value } => {
                WebError::field(field, format!("\"{}\" is not a valid choice.", value))
            }
            TrackerError::Configuration(_) | TrackerError::DatabaseError(_) => {
                error!("Internal error: {}", err);
                WebError::new(StatusCode::INTERNAL_SERVER_ERROR, err.to_string())
            }
        }
    }
}
