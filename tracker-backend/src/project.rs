use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use chrono::Utc;
use sea_orm::ActiveValue::Set;
use sea_orm::{
    ActiveModelTrait, ColumnTrait, EntityTrait, IntoActiveModel, ModelTrait, QueryFilter,
    TransactionTrait,
};
use serde::Deserialize;
use tracing::{debug, error, info};
use utoipa::{IntoParams, ToSchema};
use validator::Validate;

use crate::auth::CurrentUser;
use crate::entity::{issue, next_updated_at, project};
use crate::error::WebError;
use crate::extract::{trimmed, Payload, QueryParams, RecordId, WritePayload};
use crate::query::{apply_ordering, parse_ordering, OrderKey};
use crate::SharedState;

const ORDERING_FIELDS: &[(&str, project::Column)] = &[
    ("created_at", project::Column::CreatedAt),
    ("updated_at", project::Column::UpdatedAt),
    ("name", project::Column::Name),
];

/// Client-writable project fields. `owner` and the timestamps are server-side.
#[derive(Debug, Default, Deserialize, Validate, ToSchema)]
pub struct ProjectWrite {
    #[serde(default, deserialize_with = "trimmed")]
    #[validate(length(
        min = 1,
        max = 120,
        message = "Ensure this field is not blank and has no more than 120 characters."
    ))]
    pub name: Option<String>,
    #[serde(default, deserialize_with = "trimmed")]
    pub description: Option<String>,
}

impl WritePayload for ProjectWrite {
    fn missing_required(&self) -> Vec<&'static str> {
        match self.name {
            Some(_) => vec![],
            None => vec!["name"],
        }
    }
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ProjectListQuery {
    /// Comma-separated fields from `created_at`, `updated_at`, `name`, `-` prefix for descending
    pub ordering: Option<String>,
}

#[utoipa::path(
    get,
    path = "/projects/",
    tag = "projects",
    params(ProjectListQuery),
    responses(
        (status = 200, description = "All projects", body = [project::Model]),
        (status = 401, description = "Not authenticated"),
    )
)]
pub async fn get_projects(
    State(state): State<SharedState>,
    _user: CurrentUser,
    QueryParams(query): QueryParams<ProjectListQuery>,
) -> Result<Json<Vec<project::Model>>, WebError> {
    let ordering = parse_ordering(
        query.ordering.as_deref(),
        ORDERING_FIELDS,
        OrderKey::desc(project::Column::CreatedAt),
    );

    let projects = apply_ordering(project::Entity::find(), &ordering, project::Column::Id)
        .all(&state.read().await.conn)
        .await
        .inspect_err(|err| error!("Failed to list projects: {:?}", err))?;
    Ok(Json(projects))
}

/// Pulls a project from storage.
#[utoipa::path(
    get,
    path = "/projects/{id}/",
    tag = "projects",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = 200, description = "The project", body = project::Model),
        (status = 404, description = "No such project"),
    )
)]
pub async fn get_project(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<Json<project::Model>, WebError> {
    project::Entity::find_by_id(id)
        .one(&state.read().await.conn)
        .await?
        .map(Json)
        .ok_or_else(WebError::not_found)
}

/// POST handler for project things
#[utoipa::path(
    post,
    path = "/projects/",
    tag = "projects",
    request_body = ProjectWrite,
    responses(
        (status = 201, description = "Project created", body = project::Model),
        (status = 400, description = "Validation failed"),
    )
)]
pub async fn post_project(
    State(state): State<SharedState>,
    user: CurrentUser,
    Payload(payload): Payload<ProjectWrite>,
) -> Result<(StatusCode, Json<project::Model>), WebError> {
    payload.check(false)?;

    let now = Utc::now();
    let project = project::ActiveModel {
        name: Set(payload.name.unwrap_or_default()),
        description: Set(payload.description.unwrap_or_default()),
        owner: Set(user.identity().to_string()),
        created_at: Set(now),
        updated_at: Set(now),
        ..Default::default()
    };
    debug!("Creating project: {:?}", project);

    let conn = &state.read().await.conn;
    let txn = conn.begin().await?;
    let project = project
        .insert(&txn)
        .await
        .inspect_err(|err| error!("Failed to save project: {:?}", err))?;
    txn.commit().await?;

    info!(id = project.id, owner = %project.owner, "Created project");
    Ok((StatusCode::CREATED, Json(project)))
}

/// PUT handler, `name` must be supplied
#[utoipa::path(
    put,
    path = "/projects/{id}/",
    tag = "projects",
    params(("id" = i32, Path, description = "Project id")),
    request_body = ProjectWrite,
    responses(
        (status = 200, description = "Project updated", body = project::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such project"),
    )
)]
pub async fn put_project(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
    Payload(payload): Payload<ProjectWrite>,
) -> Result<Json<project::Model>, WebError> {
    update_project(&state, id, payload, false).await.map(Json)
}

/// PATCH handler, only supplied fields change
#[utoipa::path(
    patch,
    path = "/projects/{id}/",
    tag = "projects",
    params(("id" = i32, Path, description = "Project id")),
    request_body = ProjectWrite,
    responses(
        (status = 200, description = "Project updated", body = project::Model),
        (status = 400, description = "Validation failed"),
        (status = 404, description = "No such project"),
    )
)]
pub async fn patch_project(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
    Payload(payload): Payload<ProjectWrite>,
) -> Result<Json<project::Model>, WebError> {
    update_project(&state, id, payload, true).await.map(Json)
}

async fn update_project(
    state: &SharedState,
    id: i32,
    payload: ProjectWrite,
    partial: bool,
) -> Result<project::Model, WebError> {
    let conn = &state.read().await.conn;
    let txn = conn.begin().await?;

    let db_project = match project::Entity::find_by_id(id)
        .one(&txn)
        .await
        .inspect_err(|err| error!("Failed to find project {}: {:?}", id, err))?
    {
        Some(val) => val,
        None => {
            debug!("Project {} not found for update", id);
            return Err(WebError::not_found());
        }
    };
    payload.check(partial)?;

    debug!("Updating project {}: {:?}", id, payload);
    let previous = db_project.updated_at;
    let mut db_project = db_project.into_active_model();
    if let Some(name) = payload.name {
        db_project.name = Set(name);
    }
    if let Some(description) = payload.description {
        db_project.description = Set(description);
    }
    db_project.updated_at = Set(next_updated_at(previous));

    let res = db_project.update(&txn).await?;
    txn.commit().await?;
    Ok(res)
}

/// DELETE handler, takes the project's issues with it
#[utoipa::path(
    delete,
    path = "/projects/{id}/",
    tag = "projects",
    params(("id" = i32, Path, description = "Project id")),
    responses(
        (status = 204, description = "Project and its issues deleted"),
        (status = 404, description = "No such project"),
    )
)]
pub async fn delete_project(
    State(state): State<SharedState>,
    _user: CurrentUser,
    RecordId(id): RecordId,
) -> Result<StatusCode, WebError> {
    let conn = &state.read().await.conn;
    let txn = conn.begin().await?;

    let project = match project::Entity::find_by_id(id).one(&txn).await? {
        Some(project) => project,
        None => {
            debug!("Project {} not found for deletion", id);
            return Err(WebError::not_found());
        }
    };

    // issues first, same rows the ON DELETE CASCADE would take
    let issues = issue::Entity::delete_many()
        .filter(issue::Column::ProjectId.eq(id))
        .exec(&txn)
        .await?;
    project.delete(&txn).await?;
    txn.commit().await?;

    info!(id, issues = issues.rows_affected, "Deleted project");
    Ok(StatusCode::NO_CONTENT)
}
