use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use tracing::{info, instrument};
use uuid::Uuid;

use super::{dto::TodoBody, repo, repo::Todo};
use crate::{
    auth::{CurrentUser, MessageResponse},
    error::ApiError,
    pagination::MAX_LIMIT,
    state::AppState,
};

pub fn todo_routes() -> Router<AppState> {
    Router::new()
        .route("/api/todo", get(list_todos).post(create_todo))
        .route(
            "/api/todo/:id",
            get(get_todo).put(update_todo).delete(delete_todo),
        )
}

fn not_found(id: Uuid) -> ApiError {
    ApiError::NotFound(format!("task {} not found", id))
}

#[instrument(skip(state, user, body), fields(user = %user.username))]
pub async fn create_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Json(body): Json<TodoBody>,
) -> Result<(StatusCode, Json<Todo>), ApiError> {
    body.validate()?;
    let todo = repo::insert(&state.db, &body.title, &body.description).await?;
    info!(todo_id = %todo.id, "todo created");
    Ok((StatusCode::CREATED, Json(todo)))
}

#[instrument(skip(state, _user))]
pub async fn list_todos(
    State(state): State<AppState>,
    _user: CurrentUser,
) -> Result<Json<Vec<Todo>>, ApiError> {
    Ok(Json(repo::list(&state.db, MAX_LIMIT).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_todo(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<Todo>, ApiError> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

#[instrument(skip(state, user, body), fields(user = %user.username))]
pub async fn update_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
    Json(body): Json<TodoBody>,
) -> Result<Json<Todo>, ApiError> {
    body.validate()?;
    repo::update(&state.db, id, &body.title, &body.description)
        .await?
        .map(Json)
        .ok_or_else(|| not_found(id))
}

#[instrument(skip(state, user), fields(user = %user.username))]
pub async fn delete_todo(
    State(state): State<AppState>,
    CurrentUser(user): CurrentUser,
    Path(id): Path<Uuid>,
) -> Result<Json<MessageResponse>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(not_found(id));
    }
    info!(todo_id = %id, "todo deleted");
    Ok(Json(MessageResponse {
        message: format!("task {} has been deleted successfully", id),
    }))
}
