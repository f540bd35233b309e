//! Route guard.
//!
//! DESIGN
//! ======
//! [`decide`] is a pure function of the request path, query string and the
//! signed-in role; the middleware around it only resolves the session cookie
//! and turns the decision into a response. Paths are matched segment by
//! segment, so `/dashboard/incomex` is not under `/dashboard/income`.
//!
//! The role table is static. Pages under `/dashboard/<section>` and API
//! routes under `/api/<section>` share it; sections missing from the table
//! only require a signed-in user.

use axum::extract::{Request, State};
use axum::http::{HeaderValue, StatusCode, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar};
use tracing::{debug, error};

use super::auth::{AuthUser, SESSION_COOKIE};
use super::error::ApiError;
use crate::models::Role;
use crate::services::session;
use crate::state::AppState;

pub const LOGIN_PATH: &str = "/auth/login";
pub const HOME_PATH: &str = "/dashboard";

const AUTH_ONLY: &[&str] = &["/auth/login", "/auth/register"];
const PAGE_PREFIX: &str = "/dashboard";
const API_PREFIX: &str = "/api";

const ADMIN: &[Role] = &[Role::Admin];
const FINANCE: &[Role] = &[Role::Admin, Role::Treasurer];
const REPORTING: &[Role] = &[Role::Admin, Role::Principal, Role::Treasurer];
const LEADERSHIP: &[Role] = &[Role::Admin, Role::Principal];
const PARENT_DIRECTORY: &[Role] = &[Role::Admin, Role::Principal, Role::Teacher];

static SECTION_ROLES: &[(&str, &[Role])] = &[
    ("dashboard", &Role::ALL),
    ("settings", ADMIN),
    ("users", ADMIN),
    ("income", FINANCE),
    ("expenses", FINANCE),
    ("reports", REPORTING),
    ("students", &Role::STAFF),
    ("teachers", LEADERSHIP),
    ("parents", PARENT_DIRECTORY),
    ("grades", &Role::STAFF),
    ("sections", &Role::STAFF),
    ("categories", &Role::STAFF),
];

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PathClass {
    AuthOnly,
    Page,
    Api,
    Public,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GuardDecision {
    Continue,
    /// Signed-out request for a page: send to login, remembering the target.
    Login { redirect: String },
    /// Signed-in request that belongs somewhere else.
    Redirect(String),
    Unauthorized,
    Forbidden,
}

// =============================================================================
// MATCHING
// =============================================================================

/// Strip trailing slashes, keeping `/` itself.
fn normalize(path: &str) -> &str {
    let trimmed = path.trim_end_matches('/');
    if trimmed.is_empty() { "/" } else { trimmed }
}

/// Whether `path` is `prefix` or lies below it on a segment boundary.
#[must_use]
pub fn is_under(path: &str, prefix: &str) -> bool {
    let path = normalize(path);
    path == prefix || path.strip_prefix(prefix).is_some_and(|rest| rest.starts_with('/'))
}

#[must_use]
pub fn classify(path: &str) -> PathClass {
    let path = normalize(path);
    if AUTH_ONLY.contains(&path) {
        PathClass::AuthOnly
    } else if is_under(path, PAGE_PREFIX) {
        PathClass::Page
    } else if is_under(path, API_PREFIX) {
        PathClass::Api
    } else {
        PathClass::Public
    }
}

/// The first segment below the page or API prefix. The dashboard root maps
/// to `dashboard`.
#[must_use]
pub fn section(path: &str) -> Option<&str> {
    let path = normalize(path);
    if path == PAGE_PREFIX {
        return Some("dashboard");
    }
    let rest = path
        .strip_prefix(PAGE_PREFIX)
        .or_else(|| path.strip_prefix(API_PREFIX))?
        .strip_prefix('/')?;
    rest.split('/').next().filter(|s| !s.is_empty())
}

/// Roles allowed into `section`; `None` means any signed-in user.
#[must_use]
pub fn allowed_roles(section: &str) -> Option<&'static [Role]> {
    SECTION_ROLES
        .iter()
        .find(|(name, _)| *name == section)
        .map(|(_, roles)| *roles)
}

/// A post-login target is only followed when it stays on this site.
/// Browsers drop tabs and newlines from URLs, so `/\t/host` is treated as
/// `//host`; any control character or backslash is refused.
#[must_use]
pub fn is_safe_redirect(target: &str) -> bool {
    target.starts_with('/')
        && !target.starts_with("//")
        && !target.chars().any(|c| c == '\\' || c.is_control())
}

/// Value of the `redirect` query parameter, percent-decoded.
fn redirect_param(query: Option<&str>) -> Option<String> {
    query?
        .split('&')
        .filter_map(|pair| pair.split_once('='))
        .find(|(key, _)| *key == "redirect")
        .and_then(|(_, value)| {
            urlencoding::decode(&value.replace('+', " "))
                .ok()
                .map(std::borrow::Cow::into_owned)
        })
}

// =============================================================================
// DECISION
// =============================================================================

#[must_use]
pub fn decide(path: &str, query: Option<&str>, role: Option<Role>) -> GuardDecision {
    match (classify(path), role) {
        (PathClass::Public, _) | (PathClass::AuthOnly, None) => GuardDecision::Continue,
        (PathClass::AuthOnly, Some(_)) => {
            let target = redirect_param(query).filter(|t| is_safe_redirect(t));
            GuardDecision::Redirect(target.unwrap_or_else(|| HOME_PATH.to_owned()))
        }
        (PathClass::Page, None) => {
            let original = match query {
                Some(q) if !q.is_empty() => format!("{path}?{q}"),
                _ => path.to_owned(),
            };
            GuardDecision::Login { redirect: original }
        }
        (PathClass::Api, None) => GuardDecision::Unauthorized,
        (class, Some(role)) => {
            let allowed = section(path)
                .and_then(allowed_roles)
                .is_none_or(|roles| roles.contains(&role));
            match (allowed, class) {
                (true, _) => GuardDecision::Continue,
                (false, PathClass::Page) => GuardDecision::Redirect(HOME_PATH.to_owned()),
                (false, _) => GuardDecision::Forbidden,
            }
        }
    }
}

/// `/auth/login?redirect=<target>` with the target percent-encoded.
#[must_use]
pub fn login_url(redirect: &str) -> String {
    format!("{LOGIN_PATH}?redirect={}", urlencoding::encode(redirect))
}

fn found(location: &str) -> Response {
    match HeaderValue::from_str(location) {
        Ok(value) => (StatusCode::FOUND, [(header::LOCATION, value)]).into_response(),
        Err(_) => ApiError::bad_request("invalid redirect target").into_response(),
    }
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// Resolve the session cookie, apply [`decide`], and attach the signed-in
/// [`AuthUser`] to the request for downstream extractors.
pub async fn route_guard(State(state): State<AppState>, mut req: Request, next: Next) -> Response {
    let path = req.uri().path().to_owned();
    let query = req.uri().query().map(str::to_owned);

    let token = CookieJar::from_headers(req.headers())
        .get(SESSION_COOKIE)
        .map(Cookie::value)
        .filter(|t| !t.is_empty())
        .map(str::to_owned);

    let mut auth = None;
    if let Some(token) = token {
        match session::validate_session(&state.store, &token).await {
            Ok(user) => auth = user.map(|user| AuthUser { user, token }),
            Err(e) => {
                error!(error = %e, %path, "session lookup failed");
                if matches!(classify(&path), PathClass::Page | PathClass::Api) {
                    return ApiError::unavailable().into_response();
                }
            }
        }
    }

    let role = auth.as_ref().map(|a| a.user.role);
    match decide(&path, query.as_deref(), role) {
        GuardDecision::Continue => {
            if let Some(auth) = auth {
                req.extensions_mut().insert(auth);
            }
            next.run(req).await
        }
        GuardDecision::Login { redirect } => found(&login_url(&redirect)),
        GuardDecision::Redirect(target) => {
            debug!(%path, %target, "guard redirect");
            found(&target)
        }
        GuardDecision::Unauthorized => ApiError::unauthorized().into_response(),
        GuardDecision::Forbidden => {
            debug!(%path, role = ?role, "guard refused role");
            ApiError::forbidden().into_response()
        }
    }
}

#[cfg(test)]
#[path = "guard_test.rs"]
mod tests;
