//! Dashboard pages, served as JSON view models.
//!
//! SYSTEM CONTEXT
//! ==============
//! Each `/dashboard/...` page returns the signed-in user, the navigation the
//! user's role may see (derived from the guard's role table), and the page
//! data. A front end renders these; this service never produces HTML.

use axum::extract::{Query, State};
use axum::response::Json;
use axum_extra::extract::WithRejection;
use rust_decimal::Decimal;
use serde::Serialize;

use super::auth::AuthUser;
use super::error::ApiError;
use super::guard;
use crate::models::{Category, CategoryKind, Expense, Grade, Income, Parent, Role, Section, Student, User};
use crate::services::dashboard::{self, DashboardSummary, ParentView, sum_amounts};
use crate::services::directory::{self, CategoryQuery, ParentQuery, SectionQuery};
use crate::services::finance::{self, TransactionQuery};
use crate::services::reports::{self, Report, ReportRange};
use crate::services::session::SessionUser;
use crate::services::students::{self, StudentQuery};
use crate::services::users::{self, UserQuery};
use crate::state::AppState;

const NAV: &[(&str, &str, &str)] = &[
    ("Dashboard", "/dashboard", "dashboard"),
    ("Students", "/dashboard/students", "students"),
    ("Teachers", "/dashboard/teachers", "teachers"),
    ("Parents", "/dashboard/parents", "parents"),
    ("Income", "/dashboard/income", "income"),
    ("Expenses", "/dashboard/expenses", "expenses"),
    ("Reports", "/dashboard/reports", "reports"),
    ("Settings", "/dashboard/settings", "settings"),
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NavLink {
    pub label: &'static str,
    pub href: &'static str,
}

/// Navigation entries `role` may open.
#[must_use]
pub fn nav_for(role: Role) -> Vec<NavLink> {
    NAV.iter()
        .filter(|(_, _, section)| guard::allowed_roles(section).is_none_or(|roles| roles.contains(&role)))
        .map(|&(label, href, _)| NavLink { label, href })
        .collect()
}

#[derive(Debug, Serialize)]
pub struct Page<T> {
    pub page: &'static str,
    pub title: &'static str,
    pub user: SessionUser,
    pub nav: Vec<NavLink>,
    pub data: T,
}

fn page<T>(auth: AuthUser, page: &'static str, title: &'static str, data: T) -> Json<Page<T>> {
    let nav = nav_for(auth.user.role);
    Json(Page { page, title, user: auth.user, nav, data })
}

// =============================================================================
// DASHBOARD
// =============================================================================

/// Parents see their own children; staff see the school-wide summary.
#[derive(Debug, Serialize)]
#[serde(tag = "view", rename_all = "snake_case")]
pub enum DashboardData {
    School(DashboardSummary),
    Parent(ParentView),
}

async fn dashboard_data(state: &AppState, auth: &AuthUser) -> Result<DashboardData, ApiError> {
    if auth.user.role.is_staff() {
        Ok(DashboardData::School(dashboard::load_summary(&state.store).await?))
    } else {
        Ok(DashboardData::Parent(dashboard::load_parent_view(&state.store, auth.user.id).await?))
    }
}

/// `GET /dashboard`
pub async fn dashboard_page(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Page<DashboardData>>, ApiError> {
    let data = dashboard_data(&state, &auth).await?;
    Ok(page(auth, "dashboard", "Dashboard", data))
}

/// `GET /api/dashboard/summary`
pub async fn summary_api(State(state): State<AppState>, auth: AuthUser) -> Result<Json<DashboardData>, ApiError> {
    Ok(Json(dashboard_data(&state, &auth).await?))
}

// =============================================================================
// FINANCE PAGES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct LedgerPage<T> {
    pub rows: Vec<T>,
    /// Sum of the rows on this page.
    pub page_total: Decimal,
    pub categories: Vec<Category>,
}

/// `GET /dashboard/income`
pub async fn income_page(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<TransactionQuery>, ApiError>,
) -> Result<Json<Page<LedgerPage<Income>>>, ApiError> {
    let rows = finance::list::<Income>(&state.store, &query).await?;
    let categories = directory::list_categories(
        &state.store,
        &CategoryQuery { kind: Some(CategoryKind::Income) },
    )
    .await?;
    let data = LedgerPage { page_total: sum_amounts(&rows), rows, categories };
    Ok(page(auth, "income", "Income", data))
}

/// `GET /dashboard/expenses`
pub async fn expenses_page(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<TransactionQuery>, ApiError>,
) -> Result<Json<Page<LedgerPage<Expense>>>, ApiError> {
    let rows = finance::list::<Expense>(&state.store, &query).await?;
    let categories = directory::list_categories(
        &state.store,
        &CategoryQuery { kind: Some(CategoryKind::Expense) },
    )
    .await?;
    let data = LedgerPage { page_total: sum_amounts(&rows), rows, categories };
    Ok(page(auth, "expenses", "Expenses", data))
}

// =============================================================================
// DIRECTORY PAGES
// =============================================================================

#[derive(Debug, Serialize)]
pub struct StudentsPage {
    pub students: Vec<Student>,
    pub grades: Vec<Grade>,
    pub sections: Vec<Section>,
}

/// `GET /dashboard/students`
pub async fn students_page(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<StudentQuery>, ApiError>,
) -> Result<Json<Page<StudentsPage>>, ApiError> {
    let data = StudentsPage {
        students: students::list(&state.store, &query).await?,
        grades: directory::list_grades(&state.store).await?,
        sections: directory::list_sections(&state.store, &SectionQuery::default()).await?,
    };
    Ok(page(auth, "students", "Students", data))
}

/// `GET /dashboard/teachers`
pub async fn teachers_page(State(state): State<AppState>, auth: AuthUser) -> Result<Json<Page<Vec<User>>>, ApiError> {
    let teachers = directory::list_teachers(&state.store, None).await?;
    Ok(page(auth, "teachers", "Teachers", teachers))
}

/// `GET /dashboard/parents`
pub async fn parents_page(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<ParentQuery>, ApiError>,
) -> Result<Json<Page<Vec<Parent>>>, ApiError> {
    let parents = directory::list_parents(&state.store, &query).await?;
    Ok(page(auth, "parents", "Parents", parents))
}

// =============================================================================
// REPORTS / SETTINGS
// =============================================================================

/// `GET /dashboard/reports?from=&to=`
pub async fn reports_page(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Query(range), _): WithRejection<Query<ReportRange>, ApiError>,
) -> Result<Json<Page<Report>>, ApiError> {
    let report = reports::load(&state.store, range).await?;
    Ok(page(auth, "reports", "Reports", report))
}

/// `GET /api/reports?from=&to=`
pub async fn reports_api(
    State(state): State<AppState>,
    WithRejection(Query(range), _): WithRejection<Query<ReportRange>, ApiError>,
) -> Result<Json<Report>, ApiError> {
    Ok(Json(reports::load(&state.store, range).await?))
}

/// `GET /dashboard/settings`
pub async fn settings_page(
    State(state): State<AppState>,
    auth: AuthUser,
    WithRejection(Query(query), _): WithRejection<Query<UserQuery>, ApiError>,
) -> Result<Json<Page<Vec<User>>>, ApiError> {
    let accounts = users::list(&state.store, &query).await?;
    Ok(page(auth, "settings", "Settings", accounts))
}

#[cfg(test)]
#[path = "pages_test.rs"]
mod tests;
