//! Auth routes: password sign-in, parent self-registration, sign-out.

use axum::extract::{FromRequestParts, Query, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use axum_extra::extract::WithRejection;
use serde::{Deserialize, Serialize};
use time::Duration;

use super::error::ApiError;
use super::guard::{HOME_PATH, is_safe_redirect};
use crate::models::{Role, User};
use crate::services::{auth as auth_svc, session};
use crate::state::{AppState, WebSettings};

pub const SESSION_COOKIE: &str = "session_token";

// =============================================================================
// AUTH EXTRACTOR
// =============================================================================

/// The signed-in user, attached to the request by the route guard. Use as a
/// handler parameter to require authentication.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub user: session::SessionUser,
    pub token: String,
}

impl AuthUser {
    /// Refuse the request unless the user holds one of `roles`. For checks
    /// finer than the guard's per-section table.
    ///
    /// # Errors
    ///
    /// [`ApiError::forbidden`] for any other role.
    pub fn require(&self, roles: &[Role]) -> Result<(), ApiError> {
        if roles.contains(&self.user.role) {
            Ok(())
        } else {
            Err(ApiError::forbidden())
        }
    }
}

impl<S> FromRequestParts<S> for AuthUser
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthUser>()
            .cloned()
            .ok_or_else(ApiError::unauthorized)
    }
}

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(token: String, settings: &WebSettings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.cookie_secure)
        .max_age(Duration::hours(settings.session_ttl_hours))
        .build()
}

fn cleared_session_cookie(settings: &WebSettings) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(settings.cookie_secure)
        .max_age(Duration::ZERO)
        .build()
}

/// The post-login destination: the requested target when it is local,
/// otherwise the dashboard.
fn landing(redirect: Option<&str>) -> String {
    redirect
        .filter(|t| is_safe_redirect(t))
        .unwrap_or(HOME_PATH)
        .to_owned()
}

// =============================================================================
// HANDLERS
// =============================================================================

#[derive(Debug, Deserialize)]
pub struct LoginPageQuery {
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct LoginPage {
    pub page: &'static str,
    pub redirect: String,
    pub register_url: &'static str,
}

/// `GET /auth/login`: login page view model.
pub async fn login_page(
    WithRejection(Query(query), _): WithRejection<Query<LoginPageQuery>, ApiError>,
) -> Json<LoginPage> {
    Json(LoginPage { page: "login", redirect: landing(query.redirect.as_deref()), register_url: "/auth/register" })
}

#[derive(Debug, Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
    pub redirect: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct SignedIn {
    pub user: session::SessionUser,
    pub redirect: String,
}

fn signed_in(user: &User, redirect: Option<&str>) -> SignedIn {
    SignedIn {
        user: session::SessionUser {
            id: user.id,
            email: user.email.clone(),
            full_name: user.full_name.clone(),
            role: user.role,
        },
        redirect: landing(redirect),
    }
}

/// `POST /auth/login`: verify credentials, set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<LoginBody>, ApiError>,
) -> Result<Response, ApiError> {
    let (user, token) = auth_svc::login(&state.store, &body.email, &body.password, state.settings.session_ttl_hours).await?;
    let jar = jar.add(session_cookie(token, &state.settings));
    Ok((jar, Json(signed_in(&user, body.redirect.as_deref()))).into_response())
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    pub email: String,
    pub full_name: String,
    pub password: String,
}

/// `POST /auth/register`: create a parent account and sign it in.
pub async fn register(
    State(state): State<AppState>,
    jar: CookieJar,
    WithRejection(Json(body), _): WithRejection<Json<RegisterBody>, ApiError>,
) -> Result<Response, ApiError> {
    let user = auth_svc::register_parent(&state.store, &body.email, &body.full_name, &body.password).await?;
    let token = session::create_session(&state.store, user.id, state.settings.session_ttl_hours).await?;
    let jar = jar.add(session_cookie(token, &state.settings));
    Ok((StatusCode::CREATED, jar, Json(signed_in(&user, None))).into_response())
}

/// `GET /auth/me`: return current user.
pub async fn me(auth: AuthUser) -> Json<session::SessionUser> {
    Json(auth.user)
}

/// `POST /auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.store, &auth.token).await {
        tracing::warn!(error = %e, user_id = %auth.user.id, "session delete failed during logout");
    }
    let jar = CookieJar::new().add(cleared_session_cookie(&state.settings));
    (jar, StatusCode::NO_CONTENT)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
