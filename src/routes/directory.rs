//! Directory routes: parents, teachers, grades, sections, categories.
//!
//! The guard decides who may read each section; writes here are narrower.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::models::{Category, Grade, Parent, Role, Section, User};
use crate::services::directory::{
    self, CategoryInput, CategoryQuery, GradeInput, ParentDetail, ParentInput, ParentQuery, SectionInput, SectionQuery,
};
use crate::state::AppState;

const PARENT_WRITE_ROLES: &[Role] = &[Role::Admin, Role::Principal];
const STRUCTURE_WRITE_ROLES: &[Role] = &[Role::Admin];

// =============================================================================
// PARENTS
// =============================================================================

/// `GET /api/parents`
pub async fn list_parents(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<ParentQuery>, ApiError>,
) -> Result<Json<Vec<Parent>>, ApiError> {
    Ok(Json(directory::list_parents(&state.store, &query).await?))
}

/// `POST /api/parents`
pub async fn create_parent(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<ParentInput>, ApiError>,
) -> Result<(StatusCode, Json<Parent>), ApiError> {
    auth.require(PARENT_WRITE_ROLES)?;
    Ok((StatusCode::CREATED, Json(directory::create_parent(&state.store, &body).await?)))
}

/// `GET /api/parents/{id}`: profile plus linked children.
pub async fn get_parent(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<ParentDetail>, ApiError> {
    directory::parent_detail(&state.store, id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("parent"))
}

/// `PATCH /api/parents/{id}`
pub async fn update_parent(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<ParentInput>, ApiError>,
) -> Result<Json<Parent>, ApiError> {
    auth.require(PARENT_WRITE_ROLES)?;
    Ok(Json(directory::update_parent(&state.store, id, &body).await?))
}

/// `DELETE /api/parents/{id}`
pub async fn delete_parent(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    auth.require(PARENT_WRITE_ROLES)?;
    directory::delete_parent(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

// =============================================================================
// TEACHERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct TeacherQuery {
    pub q: Option<String>,
}

/// `GET /api/teachers`
pub async fn list_teachers(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<TeacherQuery>, ApiError>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(directory::list_teachers(&state.store, query.q.as_deref()).await?))
}

// =============================================================================
// GRADES / SECTIONS / CATEGORIES
// =============================================================================

/// `GET /api/grades`
pub async fn list_grades(State(state): State<AppState>) -> Result<Json<Vec<Grade>>, ApiError> {
    Ok(Json(directory::list_grades(&state.store).await?))
}

/// `POST /api/grades`
pub async fn create_grade(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<GradeInput>, ApiError>,
) -> Result<(StatusCode, Json<Grade>), ApiError> {
    auth.require(STRUCTURE_WRITE_ROLES)?;
    Ok((StatusCode::CREATED, Json(directory::create_grade(&state.store, &body).await?)))
}

/// `DELETE /api/grades/{id}`
pub async fn delete_grade(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    auth.require(STRUCTURE_WRITE_ROLES)?;
    directory::delete_grade(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/sections?grade_id=`
pub async fn list_sections(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<SectionQuery>, ApiError>,
) -> Result<Json<Vec<Section>>, ApiError> {
    Ok(Json(directory::list_sections(&state.store, &query).await?))
}

/// `POST /api/sections`
pub async fn create_section(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<SectionInput>, ApiError>,
) -> Result<(StatusCode, Json<Section>), ApiError> {
    auth.require(STRUCTURE_WRITE_ROLES)?;
    Ok((StatusCode::CREATED, Json(directory::create_section(&state.store, &body).await?)))
}

/// `DELETE /api/sections/{id}`
pub async fn delete_section(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    auth.require(STRUCTURE_WRITE_ROLES)?;
    directory::delete_section(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}

/// `GET /api/categories?kind=`
pub async fn list_categories(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<CategoryQuery>, ApiError>,
) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(directory::list_categories(&state.store, &query).await?))
}

/// `POST /api/categories`
pub async fn create_category(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Json(body), _): WithRejection<Json<CategoryInput>, ApiError>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    auth.require(STRUCTURE_WRITE_ROLES)?;
    Ok((StatusCode::CREATED, Json(directory::create_category(&state.store, &body).await?)))
}

/// `DELETE /api/categories/{id}`
pub async fn delete_category(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<StatusCode, ApiError> {
    auth.require(STRUCTURE_WRITE_ROLES)?;
    directory::delete_category(&state.store, id).await?;
    Ok(StatusCode::NO_CONTENT)
}
