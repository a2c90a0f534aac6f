use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, ConnectionTrait, EntityTrait, IntoActiveModel, ModelTrait,
    QueryFilter, TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, error, info};
use tracker_shared::issue::IssueStatus;
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::entity::{issue, next_updated_at, project};
use crate::error::{FieldErrors, WebError};
use crate::extract::{trimmed, Payload, QueryParams, RecordId, WritePayload, REQUIRED};
use crate::query::{apply_ordering, parse_ordering, search_condition, OrderKey};
use crate::SharedState;

const ORDERING_FIELDS: &[(&str, issue::Column)] = &[
    ("created_at", issue::Column::CreatedAt),
    ("updated_at", issue::Column::UpdatedAt),
    ("status", issue::Column::Status),
];

const SEARCH_FIELDS: &[issue::Column] = &[issue::Column::Title, issue::Column::Description];

const INVALID_FILTER_CHOICE: &str =
    "Select a valid choice. That choice is not one of the available choices.";

/// Client-writable issue fields. `created_by` and the timestamps are server-side.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct IssueWrite {
    /// Id of an existing project
    pub project: Option<i32>,
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 1,
        max = 120,
        message = "Ensure this field is not blank and has no more than 120 characters."
    ))]
    pub title: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub description: Option<String>,
    #[schema(value_type = Option<IssueStatus>)]
    pub status: Option<String>,
}

impl IssueWrite {
    fn parsed_status(&self) -> Result<Option<IssueStatus>, WebError> {
        Ok(self
            .status
            .as_deref()
            .map(str::parse::<IssueStatus>)
            .transpose()?)
    }
}

impl WritePayload for IssueWrite {
    fn missing_required(&self) -> Vec<&'static str> {
        let mut missing = Vec::new();
        if self.project.is_none() {
            missing.push("project");
        }
        if self.title.is_none() {
            missing.push("title");
        }
        missing
    }

    fn extra_checks(&self, fields: &mut FieldErrors) {
        if let Some(status) = self.status.as_deref() {
            if status.parse::<IssueStatus>().is_err() {
                fields
                    .entry("status".to_string())
                    .or_default()
                    .push(format!("\"{}\" is not a valid choice.", status));
            }
        }
    }
}

/// Rejects references to projects that don't exist.
async fn ensure_project<C: ConnectionTrait>(conn: &C, project_id: i32) -> Result<(), WebError> {
    match project::Entity::find_by_id(project_id).one(conn).await? {
        Some(_) => Ok(()),
        None => {
            debug!("Project {} does not exist", project_id);
            Err(WebError::field(
                "project",
                format!("Invalid pk \"{}\" - object does not exist.", project_id),
            ))
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct IssueListQuery {
    /// Only issues in this project
    pub project: Option<String>,
    /// Only issues in this state
    #[param(value_type = Option<IssueStatus>)]
    pub status: Option<String>,
    /// Terms that must all appear in the title or description, case-insensitive
    pub search: Option<String>,
    /// Comma-separated fields from `created_at`, `updated_at`, `status`, `-` prefix for descending
    pub ordering: Option<String>,
}

#[utoipa::path(
    get,
    path = "/issues/",
    tag = "issues",
    params(IssueListQuery),
    responses(
        (status = 200, description = "Matching issues", body = [issue::Model]),
        (status = 400, description = "Invalid filter value"),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn get_issues(
    State(state): State<SharedState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<IssueListQuery>,
) -> Result<Json<Vec<issue::Model>>, WebError> {
    let conn = &state.read().await.conn;
    let mut fields = FieldErrors::new();

    // empty values mean "no filter"
    let mut project_id = None;
    if let Some(raw) = query.project.as_deref().filter(|raw| !raw.is_empty()) {
        let existing = match raw.parse::<i32>() {
            Ok(id) => project::Entity::find_by_id(id).one(conn).await?,
            Err(_) => None,
        };
        match existing {
            Some(project) => project_id = Some(project.id),
            None => {
                fields.insert("project".to_string(), vec![INVALID_FILTER_CHOICE.to_string()]);
            }
        }
    }
    let mut status = None;
    if let Some(raw) = query.status.as_deref().filter(|raw| !raw.is_empty()) {
        match raw.parse::<IssueStatus>() {
            Ok(val) => status = Some(val),
            Err(_) => {
                fields.insert("status".to_string(), vec![INVALID_FILTER_CHOICE.to_string()]);
            }
        }
    }
    if !fields.is_empty() {
        return Err(WebError::validation(fields));
    }

    let mut select = issue::Entity::find();
    if let Some(project_id) = project_id {
        select = select.filter(issue::Column::ProjectId.eq(project_id));
    }
    if let Some(status) = status {
        select = select.filter(issue::Column::Status.eq(status));
    }
    if let Some(condition) = search_condition(query.search.as_deref(), SEARCH_FIELDS) {
        select = select.filter(condition);
    }

    let ordering = parse_ordering(
        query.ordering.as_deref(),
        ORDERING_FIELDS,
        OrderKey::desc(issue::Column::CreatedAt),
    );
    let issues = apply_ordering(select, &ordering, issue::Column::Id)
        .all(conn)
        .await
        .inspect_err(|err| error!("Failed to list issues: {:?}", err))?;
    Ok(Json(issues))
}

#[utoipa::path(
    get,
    path = "/issues/{id}/",
    tag = "issues",
    params(("id" = i32, Path, description = "Issue id")),
    responses(
        (status = 200, description = "The issue", body = issue::Model),
        (status = 404, description = "No such issue"),
    )
)]
pub async fn get_issue(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<Json<issue::Model>, WebError> {
    issue::Entity::find_by_id(id)
        .one(&state.read().await.conn)
        .await?
        .map(Json)
        .ok_or_else(WebError::not_found)
}

#[utoipa::path(
    post,
    path = "/issues/",
    tag = "issues",
    request_body = IssueWrite,
    responses(
        (status = 201, description = "Issue created", body = issue::Model),
        (status = 400, description = "Validation failed, or the project doesn't exist"),
    )
)]
pub async fn post_issue(
    State(state): State<SharedState>,
    user: CurrentUser,
    Payload(payload): Payload<IssueWrite>,
) -> Result<(StatusCode, Json<issue::Model>), WebError> {
    payload.check(false)?;
    let status = payload.parsed_status()?.unwrap_or_default();
    let project_id = payload
        .project
        .ok_or_else(|| WebError::field("project", REQUIRED))?;

    let conn = &state.read().await.conn;
    let txn = conn.begin().await?;
    ensure_project(&txn, project_id).await?;

    let now = Utc::now();
    let issue = issue::ActiveModel {
        project_id: Set(project_id),
        title: Set(payload.title.unwrap_or_default()),
        description: Set(payload.description.unwrap_or_default()),
        status: Set(status),
        created_by: Set(user.identity().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    let issue = issue
        .insert(&txn)
        .await
        .inspect_err(|err| error!("Failed to insert issue: {:?}", err))?;
    txn.commit().await?;

    info!(
        id = issue.id,
        project = issue.project_id,
        created_by = %issue.created_by,
        "Created issue"
    );
    Ok((StatusCode::CREATED, Json(issue)))
}

#[utoipa::path(
    put,
    path = "/issues/{id}/",
    tag = "issues",
    params(("id" = i32, Path, description = "Issue id")),
    request_body = IssueWrite,
    responses(
        (status = 200, description = "Issue updated", body = issue::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such issue"),
    )
)]
pub async fn put_issue(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
    Payload(payload): Payload<IssueWrite>,
) -> Result<Json<issue::Model>, WebError> {
    update_issue(&state, id, payload, false).await.map(Json)
}

#[utoipa::path(
    patch,
    path = "/issues/{id}/",
    tag = "issues",
    params(("id" = i32, Path, description = "Issue id")),
    request_body = IssueWrite,
    responses(
        (status = 200, description = "Issue updated", body = issue::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such issue"),
    )
)]
pub async fn patch_issue(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
    Payload(payload): Payload<IssueWrite>,
) -> Result<Json<issue::Model>, WebError> {
    update_issue(&state, id, payload, true).await.map(Json)
}

async fn update_issue(
    state: &SharedState,
    id: i32,
    payload: IssueWrite,
    partial: bool,
) -> Result<issue::Model, WebError> {
    let conn = &state.read().await.conn;
    let txn = conn.begin().await?;

    let db_issue = match issue::Entity::find_by_id(id).one(&txn).await? {
        Some(val) => val,
        None => {
            debug!("Issue {} not found for update", id);
            return Err(WebError::not_found());
        }
    };
    payload.check(partial)?;
    let status = payload.parsed_status()?;

    debug!("Updating issue {}: {:?}", id, payload);
    let previous = db_issue.updated_at;
    let mut db_issue = db_issue.into_active_model();
    if let Some(project_id) = payload.project {
        ensure_project(&txn, project_id).await?;
        db_issue.project_id = Set(project_id);
    }
    if let Some(title) = payload.title {
        db_issue.title = Set(title);
    }
    if let Some(description) = payload.description {
        db_issue.description = Set(description);
    }
    if let Some(status) = status {
        db_issue.status = Set(status);
    }
    db_issue.updated_at = Set(next_updated_at(previous));

    let res = db_issue.update(&txn).await?;
    txn.commit().await?;
    Ok(res)
}

#[utoipa::path(
    delete,
    path = "/issues/{id}/",
    tag = "issues",
    params(("id" = i32, Path, description = "Issue id")),
    responses(
        (status = 204, description = "Issue deleted"),
        (status = 404, description = "No such issue"),
    )
)]
pub async fn delete_issue(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<StatusCode, WebError> {
    let conn = &state.read().await.conn;
    let txn = conn.begin().await?;

    match issue::Entity::find_by_id(id).one(&txn).await? {
        Some(issue) => {
            issue.delete(&txn).await?;
            txn.commit().await?;
            debug!("Deleted issue: {}", id);
            Ok(StatusCode::NO_CONTENT)
        }
        None => {
            debug!("Issue {} not found for deletion", id);
            Err(WebError::not_found())
        }
    }
}
