//! Account administration routes (admin only, enforced by the guard).

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::Json;
use axum_extra::extract::WithRejection;
use serde::Deserialize;
use uuid::Uuid;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::models::{Role, User};
use crate::services::auth::NewUser;
use crate::services::users::{self, UserQuery, UserUpdate};
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct CreateUserBody {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

/// `GET /api/users`
pub async fn list(
    State(state): State<AppState>,
    WithRejection(Query(query), _): WithRejection<Query<UserQuery>, ApiError>,
) -> Result<Json<Vec<User>>, ApiError> {
    Ok(Json(users::list(&state.store, &query).await?))
}

/// `POST /api/users`: create an account with any role.
pub async fn create(
    State(state): State<AppState>,
    WithRejection(Json(body), _): WithRejection<Json<CreateUserBody>, ApiError>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let new_user = NewUser { email: body.email, full_name: body.full_name, role: body.role, password: body.password };
    Ok((StatusCode::CREATED, Json(users::create(&state.store, &new_user).await?)))
}

/// `GET /api/users/{id}`
pub async fn get(
    State(state): State<AppState>,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
) -> Result<Json<User>, ApiError> {
    state
        .store
        .find_by_id::<User>(id)
        .await?
        .map(Json)
        .ok_or_else(|| ApiError::not_found("user"))
}

/// `PATCH /api/users/{id}`: name, role, active flag.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Path(id), _): WithRejection<Path<Uuid>, ApiError>,
    WithRejection(Json(body), _): WithRejection<Json<UserUpdate>, ApiError>,
) -> Result<Json<User>, ApiError> {
    Ok(Json(users::update(&state.store, auth.user.id, id, &body).await?))
}
