use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    dto::{CategoryCreate, CategoryUpdate},
    repo,
    repo::Category,
};
use crate::{
    auth::CurrentUser,
    error::{violation, ApiError, Violation},
    pagination::Pagination,
    state::AppState,
};

pub fn category_routes() -> Router<AppState> {
    Router::new()
        .route("/categories", get(list_categories).post(create_category))
        .route("/categories/", get(list_categories).post(create_category))
        .route(
            "/categories/:id",
            get(get_category)
                .patch(update_category)
                .delete(delete_category),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Category not found".into())
}

fn write_error(e: anyhow::Error) -> ApiError {
    match violation(&e) {
        Some(Violation::Unique) => ApiError::Conflict("Category name already exists".into()),
        Some(Violation::ForeignKey) => {
            ApiError::Conflict("Category is still used by transactions".into())
        }
        None => ApiError::Internal(e),
    }
}

#[instrument(skip(state, _user))]
pub async fn list_categories(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Category>>, ApiError> {
    let (offset, limit) = p.bounds();
    Ok(Json(repo::list(&state.db, offset, limit).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Category>, ApiError> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, _user))]
pub async fn create_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<CategoryCreate>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    body.validate()?;
    let category = repo::insert(&state.db, &body).await.map_err(write_error)?;
    info!(category_id = category.id, name = %category.name, "category created");
    Ok((StatusCode::CREATED, Json(category)))
}

#[instrument(skip(state, _user))]
pub async fn update_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<CategoryUpdate>,
) -> Result<Json<Category>, ApiError> {
    body.validate()?;
    repo::update(&state.db, id, &body)
        .await
        .map_err(write_error)?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, _user))]
pub async fn delete_category(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !repo::delete(&state.db, id).await.map_err(write_error)? {
        return Err(not_found());
    }
    info!(category_id = id, "category deleted");
    Ok(Json(json!({ "ok": true })))
}
