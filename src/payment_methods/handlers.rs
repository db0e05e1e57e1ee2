use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    dto::{PaymentMethodCreate, PaymentMethodUpdate},
    repo,
    repo::PaymentMethod,
};
use crate::{
    auth::CurrentUser,
    error::{violation, ApiError, Violation},
    pagination::Pagination,
    state::AppState,
};

pub fn payment_method_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/payment_methods",
            get(list_payment_methods).post(create_payment_method),
        )
        .route(
            "/payment_methods/",
            get(list_payment_methods).post(create_payment_method),
        )
        .route(
            "/payment_methods/:id",
            get(get_payment_method)
                .patch(update_payment_method)
                .delete(delete_payment_method),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("PaymentMethod not found".into())
}

#[instrument(skip(state, _user))]
pub async fn list_payment_methods(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<PaymentMethod>>, ApiError> {
    let (offset, limit) = p.bounds();
    Ok(Json(repo::list(&state.db, offset, limit).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_payment_method(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<PaymentMethod>, ApiError> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, _user))]
pub async fn create_payment_method(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<PaymentMethodCreate>,
) -> Result<(StatusCode, Json<PaymentMethod>), ApiError> {
    body.validate()?;
    let pm = repo::insert(&state.db, &body).await?;
    info!(payment_method_id = pm.id, name = %pm.name, "payment method created");
    Ok((StatusCode::CREATED, Json(pm)))
}

#[instrument(skip(state, _user))]
pub async fn update_payment_method(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<PaymentMethodUpdate>,
) -> Result<Json<PaymentMethod>, ApiError> {
    body.validate()?;
    repo::update(&state.db, id, &body)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, _user))]
pub async fn delete_payment_method(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    let deleted = repo::delete(&state.db, id).await.map_err(|e| match violation(&e) {
        Some(Violation::ForeignKey) => {
            ApiError::Conflict("PaymentMethod is still used by transactions".into())
        }
        _ => ApiError::Internal(e),
    })?;
    if !deleted {
        return Err(not_found());
    }
    info!(payment_method_id = id, "payment method deleted");
    Ok(Json(json!({ "ok": true })))
}
