//! Income and expense routes. The guard limits both sections to admins and
//! treasurers.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::models::{Expense, Income, TransactionStatus};
use crate::services::finance::{self, NewExpense, NewIncome, TransactionPatch, TransactionQuery};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct StatusBody {
    pub status: TransactionStatus,
}

// =============================================================================
// INCOME
// =============================================================================

/// `GET /api/income`
pub async fn list_income(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<TransactionQuery>, ApiError>,
) -> Result<Json<Vec<Income>>, ApiError> {
    Ok(Json(finance::list::<Income>(&state.store, &query).await?))
}

/// `POST /api/income`
pub async fn create_income(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<NewIncome>, ApiError>,
) -> Result<(StatusCode, Json<Income>), ApiError> {
    let income = finance::create_income(&state.store, &body, Some(auth.user.id)).await?;
    Ok((StatusCode::CREATED, Json(income)))
}

/// `GET /api/income/{id}`
pub async fn get_income(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Income>, ApiError> {
    state
        .store
        .find_by_id::<Income>(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("income"))
}

/// `PATCH /api/income/{id}`
pub async fn update_income(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<TransactionPatch>, ApiError>,
) -> Result<Json<Income>, ApiError> {
    Ok(Json(finance::update_income(&state.store, id, &body).await?))
}

/// `DELETE /api/income/{id}`
pub async fn delete_income(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete::<Income>(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("income"))
    }
}

/// `POST /api/income/{id}/status`
pub async fn set_income_status(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<StatusBody>, ApiError>,
) -> Result<Json<Income>, ApiError> {
    Ok(Json(finance::set_income_status(&state.store, id, body.status).await?))
}

// =============================================================================
// EXPENSES
// =============================================================================

/// `GET /api/expenses`
pub async fn list_expenses(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<TransactionQuery>, ApiError>,
) -> Result<Json<Vec<Expense>>, ApiError> {
    Ok(Json(finance::list::<Expense>(&state.store, &query).await?))
}

/// `POST /api/expenses`
pub async fn create_expense(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<NewExpense>, ApiError>,
) -> Result<(StatusCode, Json<Expense>), ApiError> {
    let expense = finance::create_expense(&state.store, &body, Some(auth.user.id)).await?;
    Ok((StatusCode::CREATED, Json(expense)))
}

/// `GET /api/expenses/{id}`
pub async fn get_expense(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Expense>, ApiError> {
    state
        .store
        .find_by_id::<Expense>(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("expense"))
}

/// `PATCH /api/expenses/{id}`
pub async fn update_expense(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<TransactionPatch>, ApiError>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(finance::update_expense(&state.store, id, &body).await?))
}

/// `DELETE /api/expenses/{id}`
pub async fn delete_expense(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    if state.store.delete::<Expense>(id).await? {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(ApiError::not_found("expense"))
    }
}

/// `POST /api/expenses/{id}/status`: records the approver.
pub async fn set_expense_status(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<StatusBody>, ApiError>,
) -> Result<Json<Expense>, ApiError> {
    Ok(Json(finance::set_expense_status(&state.store, id, body.status, auth.user.id).await?))
}
