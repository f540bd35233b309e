//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! One Axum router carries the auth endpoints, the `/dashboard` page view
//! models and the `/api` JSON surface. Every request passes the route guard
//! first; handlers behind it read the signed-in user through [`auth::AuthUser`].

pub mod auth;
pub mod directory;
pub mod error;
pub mod finance;
pub mod guard;
pub mod pages;
pub mod students;
pub mod users;

use axum::Router;
use axum::http::StatusCode;
use axum::middleware;
use axum::routing::{delete, get, post};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::state::AppState;

fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/auth/login", get(auth::login_page).post(auth::login))
        .route("/auth/register", post(auth::register))
        .route("/auth/logout", post(auth::logout))
        .route("/auth/me", get(auth::me))
}

fn page_routes() -> Router<AppState> {
    Router::new()
        .route("/dashboard", get(pages::dashboard_page))
        .route("/dashboard/income", get(pages::income_page))
        .route("/dashboard/expenses", get(pages::expenses_page))
        .route("/dashboard/students", get(pages::students_page))
        .route("/dashboard/teachers", get(pages::teachers_page))
        .route("/dashboard/parents", get(pages::parents_page))
        .route("/dashboard/reports", get(pages::reports_page))
        .route("/dashboard/settings", get(pages::settings_page))
}

fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/dashboard/summary", get(pages::summary_api))
        .route("/api/reports", get(pages::reports_api))
        .route("/api/students", get(students::list).post(students::create))
        .route(
            "/api/students/{id}",
            get(students::get).patch(students::update).delete(students::delete),
        )
        .route("/api/students/{id}/contribution", post(students::record_contribution))
        .route("/api/income", get(finance::list_income).post(finance::create_income))
        .route(
            "/api/income/{id}",
            get(finance::get_income)
                .patch(finance::update_income)
                .delete(finance::delete_income),
        )
        .route("/api/income/{id}/status", post(finance::set_income_status))
        .route("/api/expenses", get(finance::list_expenses).post(finance::create_expense))
        .route(
            "/api/expenses/{id}",
            get(finance::get_expense)
                .patch(finance::update_expense)
                .delete(finance::delete_expense),
        )
        .route("/api/expenses/{id}/status", post(finance::set_expense_status))
        .route("/api/parents", get(directory::list_parents).post(directory::create_parent))
        .route(
            "/api/parents/{id}",
            get(directory::get_parent)
                .patch(directory::update_parent)
                .delete(directory::delete_parent),
        )
        .route("/api/teachers", get(directory::list_teachers))
        .route("/api/grades", get(directory::list_grades).post(directory::create_grade))
        .route("/api/grades/{id}", delete(directory::delete_grade))
        .route("/api/sections", get(directory::list_sections).post(directory::create_section))
        .route("/api/sections/{id}", delete(directory::delete_section))
        .route("/api/categories", get(directory::list_categories).post(directory::create_category))
        .route("/api/categories/{id}", delete(directory::delete_category))
        .route("/api/users", get(users::list).post(users::create))
        .route("/api/users/{id}", get(users::get).patch(users::update))
}

/// The full application router.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    Router::new()
        .merge(auth_routes())
        .merge(page_routes())
        .merge(api_routes())
        .route("/healthz", get(healthz))
        .layer(middleware::from_fn_with_state(state.clone(), guard::route_guard))
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}
