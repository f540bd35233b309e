//! Generic data access over the relational tables.
//!
//! DESIGN
//! ======
//! `Store` is a thin facade: create / find-by-id / find-many / update /
//! delete / search / count, each a single round trip wrapped in the
//! configured [`RetryPolicy`]. Rows are typed through [`Record`]; column
//! names coming from callers are checked against the record's allowlist
//! before any SQL is built, so values are always bound and identifiers are
//! always static.
//!
//! No caching and no batching: callers that need several tables make several
//! calls.

pub mod query;

use chrono::NaiveDate;
use rust_decimal::Decimal;
use sqlx::PgPool;
use sqlx::postgres::PgRow;
use uuid::Uuid;

use crate::retry::{RetryPolicy, Retryable};

/// Upper bound for a single page of results.
pub const MAX_PAGE_SIZE: i64 = 500;

// =============================================================================
// RECORD
// =============================================================================

/// A table row the store can read and write.
pub trait Record: for<'r> sqlx::FromRow<'r, PgRow> + Send + Unpin + 'static {
    const TABLE: &'static str;
    /// Writable and filterable columns. `id` and timestamps are implicit.
    const COLUMNS: &'static [&'static str];
    /// Columns searched when the caller does not name any.
    const SEARCH_COLUMNS: &'static [&'static str];
    const DEFAULT_ORDER: &'static str;
    const HAS_UPDATED_AT: bool = true;

    /// Whether `column` may appear in a filter, ordering, or change set.
    fn knows_column(column: &str) -> bool {
        Self::COLUMNS.contains(&column)
            || column == "id"
            || column == "created_at"
            || (Self::HAS_UPDATED_AT && column == "updated_at")
    }
}

// =============================================================================
// VALUES, FILTERS, OPTIONS
// =============================================================================

#[derive(Debug, Clone, PartialEq)]
pub enum SqlValue {
    Text(String),
    Int(i32),
    Bool(bool),
    Decimal(Decimal),
    Date(NaiveDate),
    Uuid(Uuid),
    Null,
}

impl From<&str> for SqlValue {
    fn from(v: &str) -> Self {
        Self::Text(v.to_owned())
    }
}

impl From<String> for SqlValue {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<i32> for SqlValue {
    fn from(v: i32) -> Self {
        Self::Int(v)
    }
}

impl From<bool> for SqlValue {
    fn from(v: bool) -> Self {
        Self::Bool(v)
    }
}

impl From<Decimal> for SqlValue {
    fn from(v: Decimal) -> Self {
        Self::Decimal(v)
    }
}

impl From<NaiveDate> for SqlValue {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl From<Uuid> for SqlValue {
    fn from(v: Uuid) -> Self {
        Self::Uuid(v)
    }
}

impl<T: Into<SqlValue>> From<Option<T>> for SqlValue {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// Ordered column assignments for inserts and updates.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Changes(Vec<(&'static str, SqlValue)>);

impl Changes {
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Assign `column`, replacing an earlier assignment of the same column.
    #[must_use]
    pub fn set(mut self, column: &'static str, value: impl Into<SqlValue>) -> Self {
        let value = value.into();
        if let Some(slot) = self.0.iter_mut().find(|(c, _)| *c == column) {
            slot.1 = value;
        } else {
            self.0.push((column, value));
        }
        self
    }

    /// Assign `column` only when `value` is present. Used for partial updates.
    #[must_use]
    pub fn set_opt<T: Into<SqlValue>>(self, column: &'static str, value: Option<T>) -> Self {
        match value {
            Some(v) => self.set(column, v),
            None => self,
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&'static str, &SqlValue)> {
        self.0.iter().map(|(c, v)| (*c, v))
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// `column = value`, or `column IS NULL` for [`SqlValue::Null`].
    Eq(String, SqlValue),
    /// `column >= value`
    Gte(String, SqlValue),
    /// `column <= value`
    Lte(String, SqlValue),
}

impl Filter {
    pub fn eq(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::Eq(column.into(), value.into())
    }

    pub fn gte(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::Gte(column.into(), value.into())
    }

    pub fn lte(column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        Self::Lte(column.into(), value.into())
    }

    #[must_use]
    pub fn column(&self) -> &str {
        match self {
            Self::Eq(c, _) | Self::Gte(c, _) | Self::Lte(c, _) => c,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderBy {
    pub column: String,
    pub descending: bool,
}

impl OrderBy {
    pub fn asc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: false }
    }

    pub fn desc(column: impl Into<String>) -> Self {
        Self { column: column.into(), descending: true }
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct FindOptions {
    pub filters: Vec<Filter>,
    pub order: Option<OrderBy>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

impl FindOptions {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn filter(mut self, filter: Filter) -> Self {
        self.filters.push(filter);
        self
    }

    #[must_use]
    pub fn order(mut self, order: OrderBy) -> Self {
        self.order = Some(order);
        self
    }

    /// 1-based page of `per_page` rows.
    #[must_use]
    pub fn page(mut self, page: i64, per_page: i64) -> Self {
        let per_page = per_page.clamp(1, MAX_PAGE_SIZE);
        self.limit = Some(per_page);
        self.offset = Some((page.max(1) - 1).saturating_mul(per_page));
        self
    }
}

// =============================================================================
// ERRORS
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("unknown column {column:?} on {table}")]
    UnknownColumn { table: &'static str, column: String },
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

impl StoreError {
    fn sqlstate(&self) -> Option<String> {
        match self {
            Self::Database(sqlx::Error::Database(db)) => db.code().map(|c| c.into_owned()),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_unique_violation(&self) -> bool {
        self.sqlstate().as_deref() == Some("23505")
    }

    /// Foreign key, check constraint or not-null violation: the caller sent
    /// something the schema refuses.
    #[must_use]
    pub fn is_constraint_violation(&self) -> bool {
        matches!(self.sqlstate().as_deref(), Some("23503" | "23514" | "23502"))
    }

    /// The retry budget was spent on a transient failure.
    #[must_use]
    pub fn is_unavailable(&self) -> bool {
        matches!(self, Self::Database(e) if e.retryable())
    }
}

// =============================================================================
// STORE
// =============================================================================

#[derive(Clone)]
pub struct Store {
    pool: PgPool,
    retry: RetryPolicy,
}

impl Store {
    #[must_use]
    pub fn new(pool: PgPool, retry: RetryPolicy) -> Self {
        Self { pool, retry }
    }

    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    #[must_use]
    pub fn retry(&self) -> RetryPolicy {
        self.retry
    }

    /// Insert a row and return it.
    ///
    /// # Errors
    ///
    /// Unknown columns, constraint violations, or database failures.
    pub async fn create<R: Record>(&self, changes: &Changes) -> Result<R, StoreError> {
        query::check_changes::<R>(changes)?;
        let pool = &self.pool;
        let row = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::insert::<R>(changes);
                qb.build_query_as::<R>().fetch_one(pool).await
            })
            .await?;
        Ok(row)
    }

    /// Fetch one row by primary key. A missing row is `Ok(None)`.
    ///
    /// # Errors
    ///
    /// Database failures.
    pub async fn find_by_id<R: Record>(&self, id: Uuid) -> Result<Option<R>, StoreError> {
        let pool = &self.pool;
        let row = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::select_by_id::<R>(id);
                qb.build_query_as::<R>().fetch_optional(pool).await
            })
            .await?;
        Ok(row)
    }

    /// Fetch rows matching `opts`.
    ///
    /// # Errors
    ///
    /// Unknown filter/order columns or database failures.
    pub async fn find_many<R: Record>(&self, opts: &FindOptions) -> Result<Vec<R>, StoreError> {
        query::check_options::<R>(opts)?;
        let pool = &self.pool;
        let rows = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::select_many::<R>(opts);
                qb.build_query_as::<R>().fetch_all(pool).await
            })
            .await?;
        Ok(rows)
    }

    /// Apply `changes` to the row with `id`. Returns `None` if no such row.
    ///
    /// # Errors
    ///
    /// Unknown columns, constraint violations, or database failures.
    pub async fn update<R: Record>(&self, id: Uuid, changes: &Changes) -> Result<Option<R>, StoreError> {
        if changes.is_empty() {
            return self.find_by_id::<R>(id).await;
        }
        query::check_changes::<R>(changes)?;
        let pool = &self.pool;
        let row = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::update::<R>(id, changes);
                qb.build_query_as::<R>().fetch_optional(pool).await
            })
            .await?;
        Ok(row)
    }

    /// Delete the row with `id`. Returns whether a row was removed.
    ///
    /// # Errors
    ///
    /// Foreign key violations or database failures.
    pub async fn delete<R: Record>(&self, id: Uuid) -> Result<bool, StoreError> {
        let pool = &self.pool;
        let result = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::delete::<R>(id);
                qb.build().execute(pool).await
            })
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Case-insensitive substring search across `columns` (or the record's
    /// default search columns when empty), narrowed by `opts`.
    ///
    /// # Errors
    ///
    /// Unknown columns or database failures.
    pub async fn search<R: Record>(
        &self,
        term: &str,
        columns: &[&str],
        opts: &FindOptions,
    ) -> Result<Vec<R>, StoreError> {
        let term = term.trim();
        if term.is_empty() {
            return self.find_many::<R>(opts).await;
        }
        let columns = if columns.is_empty() { R::SEARCH_COLUMNS } else { columns };
        query::check_columns::<R>(columns)?;
        query::check_options::<R>(opts)?;
        let pool = &self.pool;
        let rows = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::search::<R>(term, columns, opts);
                qb.build_query_as::<R>().fetch_all(pool).await
            })
            .await?;
        Ok(rows)
    }

    /// Count rows matching `filters`.
    ///
    /// # Errors
    ///
    /// Unknown filter columns or database failures.
    pub async fn count<R: Record>(&self, filters: &[Filter]) -> Result<i64, StoreError> {
        query::check_filters::<R>(filters)?;
        let pool = &self.pool;
        let count = self
            .retry
            .run(R::TABLE, move || async move {
                let mut qb = query::count::<R>(filters);
                qb.build_query_scalar::<i64>().fetch_one(pool).await
            })
            .await?;
        Ok(count)
    }
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
