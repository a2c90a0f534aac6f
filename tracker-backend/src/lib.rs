pub mod auth;
pub mod cli;
pub mod entity;
pub mod error;
pub mod extract;
pub mod issue;
pub mod logging;
pub mod middleware;
pub mod migration;
pub mod openapi;
pub mod project;
pub mod query;
pub mod storage;

use axum::{
    body::Body,
    error_handling::HandleErrorLayer,
    http::{header, HeaderName, Response, StatusCode},
    response::IntoResponse,
    routing::get,
    Router,
};
use issue::{delete_issue, get_issue, get_issues, patch_issue, post_issue, put_issue};
use project::{
    delete_project, get_project, get_projects, patch_project, post_project, put_project,
};
use sea_orm::DatabaseConnection;
use std::{borrow::Cow, sync::Arc, time::Duration};
use tokio::sync::RwLock;
use tower::{BoxError, ServiceBuilder};
use tower_http::set_header::SetResponseHeaderLayer;
use tracing::error;
use tracker_shared::error::TrackerError;

use crate::{cli::CliOpts, logging::logging_layer};

pub type SharedState = Arc<RwLock<AppState>>;

pub struct AppState {
    pub conn: DatabaseConnection,
    /// Header carrying the authenticated user's identity
    pub user_header: HeaderName,
}

impl AppState {
    pub async fn new(cli: &CliOpts) -> Result<Self, TrackerError> {
        let user_header = HeaderName::from_bytes(cli.user_header.as_bytes()).map_err(|err| {
            TrackerError::Configuration(format!(
                "Invalid user header {:?}: {}",
                cli.user_header, err
            ))
        })?;
        let conn = storage::new(&cli.db_path())
            .await
            .map_err(|err| TrackerError::DatabaseError(err.to_string()))?;
        Ok(Self { conn, user_header })
    }

    #[cfg(test)]
    pub async fn test() -> Self {
        let db = storage::start_db(None)
            .await
            .expect("Failed to start test DB");
        Self {
            conn: db,
            user_header: HeaderName::from_static(auth::DEFAULT_USER_HEADER),
        }
    }
}

pub fn build_app<T>(shared_state: &SharedState) -> Router<T> {
    let user_header = shared_state
        .try_read()
        .map(|state| state.user_header.clone())
        .unwrap_or_else(|_| HeaderName::from_static(auth::DEFAULT_USER_HEADER));

    // Build our application by composing routes
    let router = Router::new()
        .route("/projects/", get(get_projects).post(post_project))
        .route(
            "/projects/{id}/",
            get(get_project)
                .put(put_project)
                .patch(patch_project)
                .delete(delete_project),
        )
        .route("/issues/", get(get_issues).post(post_issue))
        .route(
            "/issues/{id}/",
            get(get_issue)
                .put(put_issue)
                .patch(patch_issue)
                .delete(delete_issue),
        )
        .merge(openapi::api_route());

    router
        // Add middleware to all routes
        .layer(
            ServiceBuilder::new()
                // Handle errors from middleware
                .layer(middleware::corslayer())
                .layer(SetResponseHeaderLayer::overriding(
                    header::CACHE_CONTROL,
                    |response: &Response<Body>| {
                        if response.status() == StatusCode::OK {
                            "private, no-transform, max-age=0".parse().ok()
                        } else {
                            None
                        }
                    },
                ))
                .layer(HandleErrorLayer::new(handle_error))
                .load_shed()
                .concurrency_limit(1024)
                .timeout(Duration::from_secs(10))
                .layer(logging_layer(user_header)),
        )
        .with_state(shared_state.clone())
}

async fn handle_error(error: BoxError) -> impl IntoResponse {
    if error.is::<tower::timeout::error::Elapsed>() {
        return (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out"));
    }

    if error.is::<tower::load_shed::error::Overloaded>() {
        let msg = "service is overloaded, try again later";
        error!("{}", msg);
        return (StatusCode::SERVICE_UNAVAILABLE, Cow::from(msg));
    }

    let msg = format!("Unhandled internal error: {error}");
    error!("{}", msg);
    (StatusCode::INTERNAL_SERVER_ERROR, Cow::from(msg))
}

#[tokio::test]
async fn test_handle_error() {
    let err = tower::timeout::error::Elapsed::new();
    let res = handle_error(Box::new(err)).await.into_response();
    let expected = (StatusCode::REQUEST_TIMEOUT, Cow::from("request timed out")).into_response();

    assert_eq!(res.status(), expected.status());

    let err = tower::load_shed::error::Overloaded::new();
    let res = handle_error(Box::new(err)).await.into_response();
    let expected = (
        StatusCode::SERVICE_UNAVAILABLE,
        Cow::from("service is overloaded, try again later"),
    )
        .into_response();

    assert_eq!(res.status(), expected.status());
}
