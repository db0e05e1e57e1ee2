use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};
use serde_json::{json, Value};
use tracing::{info, instrument};

use super::{
    dto::{TransactionCreate, TransactionUpdate},
    repo,
    repo::Transaction,
};
use crate::{
    auth::CurrentUser,
    error::{violation, ApiError, Violation},
    pagination::Pagination,
    state::AppState,
};

pub fn transaction_routes() -> Router<AppState> {
    Router::new()
        .route(
            "/transactions",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/",
            get(list_transactions).post(create_transaction),
        )
        .route(
            "/transactions/:id",
            get(get_transaction)
                .patch(update_transaction)
                .delete(delete_transaction),
        )
}

fn not_found() -> ApiError {
    ApiError::NotFound("Transaction not found".into())
}

fn write_error(e: anyhow::Error) -> ApiError {
    match violation(&e) {
        Some(Violation::ForeignKey) => {
            ApiError::BadRequest("Unknown category or payment method".into())
        }
        _ => ApiError::Internal(e),
    }
}

#[instrument(skip(state, _user))]
pub async fn list_transactions(
    State(state): State<AppState>,
    _user: CurrentUser,
    Query(p): Query<Pagination>,
) -> Result<Json<Vec<Transaction>>, ApiError> {
    let (offset, limit) = p.bounds();
    Ok(Json(repo::list(&state.db, offset, limit).await?))
}

#[instrument(skip(state, _user))]
pub async fn get_transaction(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Transaction>, ApiError> {
    repo::get(&state.db, id)
        .await?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, _user))]
pub async fn create_transaction(
    State(state): State<AppState>,
    _user: CurrentUser,
    Json(body): Json<TransactionCreate>,
) -> Result<(StatusCode, Json<Transaction>), ApiError> {
    body.validate()?;
    let tx = repo::insert(&state.db, &body).await.map_err(write_error)?;
    info!(transaction_id = tx.id, amount = %tx.amount, "transaction created");
    Ok((StatusCode::CREATED, Json(tx)))
}

#[instrument(skip(state, _user))]
pub async fn update_transaction(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
    Json(body): Json<TransactionUpdate>,
) -> Result<Json<Transaction>, ApiError> {
    body.validate()?;
    repo::update(&state.db, id, &body)
        .await
        .map_err(write_error)?
        .map(Json)
        .ok_or_else(not_found)
}

#[instrument(skip(state, _user))]
pub async fn delete_transaction(
    State(state): State<AppState>,
    _user: CurrentUser,
    Path(id): Path<i64>,
) -> Result<Json<Value>, ApiError> {
    if !repo::delete(&state.db, id).await? {
        return Err(not_found());
    }
    info!(transaction_id = id, "transaction deleted");
    Ok(Json(json!({ "ok": true })))
}
