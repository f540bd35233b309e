//! Domain services.
//!
//! ARCHITECTURE
//! ============
//! Route handlers stay thin: they parse input, call one service function,
//! and map the service's error enum to a status code. Services own
//! validation and reach the database only through [`crate::store::Store`]
//! (plus a few hand-written transactional statements).

pub mod auth;
pub mod dashboard;
pub mod directory;
pub mod finance;
pub mod reports;
pub mod session;
pub mod students;
pub mod users;

use crate::store::FindOptions;

/// Page size used when a list request does not name one.
pub const DEFAULT_PER_PAGE: i64 = 50;

/// Apply `page` / `per_page` query parameters to `opts`.
#[must_use]
pub fn paged(opts: FindOptions, page: Option<i64>, per_page: Option<i64>) -> FindOptions {
    opts.page(page.unwrap_or(1), per_page.unwrap_or(DEFAULT_PER_PAGE))
}

/// Trim `value`, turning blank strings into `None`.
#[must_use]
pub fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|v| !v.is_empty()).map(str::to_owned)
}
