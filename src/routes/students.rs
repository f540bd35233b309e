//! Student routes.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use serde::Serialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::models::{Income, Role, Student};
use crate::services::students::{self, Contribution, StudentInput, StudentQuery};
use crate::state::AppState;

/// Roles that may remove a student record entirely.
const DELETE_ROLES: &[Role] = &[Role::Admin];

/// `GET /api/students`: filtered, paginated roster.
pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<StudentQuery>, ApiError>,
) -> Result<Json<Vec<Student>>, ApiError> {
    Ok(Json(students::list(&state.store, &query).await?))
}

/// `POST /api/students`
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<StudentInput>, ApiError>,
) -> Result<(StatusCode, Json<Student>), ApiError> {
    let student = students::create(&state.store, &body).await?;
    Ok((StatusCode::CREATED, Json(student)))
}

/// `GET /api/students/{id}`
pub async fn get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<Student>, ApiError> {
    state
        .store
        .find_by_id::<Student>(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("student"))
}

/// `PATCH /api/students/{id}`
pub async fn update(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<StudentInput>, ApiError>,
) -> Result<Json<Student>, ApiError> {
    Ok(Json(students::update(&state.store, id, &body).await?))
}

/// `DELETE /api/students/{id}`: admin only.
pub async fn delete(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    auth.require(DELETE_ROLES)?;
    students::delete(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[derive(Debug, Serialize)]
pub struct ContributionResponse {
    pub student: Student,
    pub income: Income,
}

/// `POST /api/students/{id}/contribution`: record the PTA payment.
pub async fn record_contribution(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<Contribution>, ApiError>,
) -> Result<(StatusCode, Json<ContributionResponse>), ApiError> {
    let (student, income) = students::record_contribution(&state.store, id, &body, Some(auth.user.id)).await?;
    Ok((StatusCode::CREATED, Json(ContributionResponse { student, income })))
}
