//! SQL construction for the generic store.
//!
//! Builders assume their column names were already checked with the
//! `check_*` helpers; values are always bound, never interpolated.

use sqlx::{Postgres, QueryBuilder};
use uuid::Uuid;

use super::{Changes, Filter, FindOptions, MAX_PAGE_SIZE, Record, SqlValue, StoreError};

pub(crate) type Builder = QueryBuilder<'static, Postgres>;

// =============================================================================
// VALIDATION
// =============================================================================

fn check_column<R: Record>(column: &str) -> Result<(), StoreError> {
    if R::knows_column(column) {
        Ok(())
    } else {
        Err(StoreError::UnknownColumn { table: R::TABLE, column: column.to_owned() })
    }
}

pub(crate) fn check_columns<R: Record>(columns: &[&str]) -> Result<(), StoreError> {
    columns.iter().try_for_each(|c| check_column::<R>(c))
}

pub(crate) fn check_filters<R: Record>(filters: &[Filter]) -> Result<(), StoreError> {
    filters.iter().try_for_each(|f| check_column::<R>(f.column()))
}

pub(crate) fn check_options<R: Record>(opts: &FindOptions) -> Result<(), StoreError> {
    check_filters::<R>(&opts.filters)?;
    if let Some(order) = &opts.order {
        check_column::<R>(&order.column)?;
    }
    Ok(())
}

pub(crate) fn check_changes<R: Record>(changes: &Changes) -> Result<(), StoreError> {
    changes.iter().try_for_each(|(c, _)| check_column::<R>(c))
}

// =============================================================================
// FRAGMENTS
// =============================================================================

fn push_value(qb: &mut Builder, value: &SqlValue) {
    match value {
        SqlValue::Text(v) => {
            qb.push_bind(v.clone());
        }
        SqlValue::Int(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Bool(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Decimal(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Date(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Uuid(v) => {
            qb.push_bind(*v);
        }
        SqlValue::Null => {
            qb.push("NULL");
        }
    }
}

/// Append `AND`-joined filter predicates. `has_where` tells whether a
/// `WHERE` clause was already started.
fn push_filters(qb: &mut Builder, filters: &[Filter], mut has_where: bool) {
    for filter in filters {
        qb.push(if has_where { " AND " } else { " WHERE " });
        has_where = true;
        match filter {
            Filter::Eq(column, SqlValue::Null) => {
                qb.push(column.as_str()).push(" IS NULL");
            }
            Filter::Eq(column, value) => {
                qb.push(column.as_str()).push(" = ");
                push_value(qb, value);
            }
            Filter::Gte(column, value) => {
                qb.push(column.as_str()).push(" >= ");
                push_value(qb, value);
            }
            Filter::Lte(column, value) => {
                qb.push(column.as_str()).push(" <= ");
                push_value(qb, value);
            }
        }
    }
}

fn push_order_and_page<R: Record>(qb: &mut Builder, opts: &FindOptions) {
    match &opts.order {
        Some(order) => {
            qb.push(" ORDER BY ")
                .push(order.column.as_str())
                .push(if order.descending { " DESC" } else { " ASC" });
        }
        None => {
            qb.push(" ORDER BY ").push(R::DEFAULT_ORDER).push(" ASC");
        }
    }
    qb.push(", id ASC");

    if let Some(limit) = opts.limit {
        qb.push(" LIMIT ").push_bind(limit.clamp(1, MAX_PAGE_SIZE));
    }
    if let Some(offset) = opts.offset.filter(|o| *o > 0) {
        qb.push(" OFFSET ").push_bind(offset);
    }
}

/// Escape LIKE metacharacters and wrap for a substring match.
pub(crate) fn like_pattern(term: &str) -> String {
    let mut escaped = String::with_capacity(term.len() + 2);
    escaped.push('%');
    for c in term.chars() {
        if matches!(c, '\\' | '%' | '_') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped.push('%');
    escaped
}

// =============================================================================
// STATEMENTS
// =============================================================================

pub(crate) fn select_by_id<R: Record>(id: Uuid) -> Builder {
    let mut qb = Builder::new(format!("SELECT * FROM {} WHERE id = ", R::TABLE));
    qb.push_bind(id);
    qb
}

pub(crate) fn select_many<R: Record>(opts: &FindOptions) -> Builder {
    let mut qb = Builder::new(format!("SELECT * FROM {}", R::TABLE));
    push_filters(&mut qb, &opts.filters, false);
    push_order_and_page::<R>(&mut qb, opts);
    qb
}

pub(crate) fn search<R: Record>(term: &str, columns: &[&str], opts: &FindOptions) -> Builder {
    let pattern = like_pattern(term);
    let mut qb = Builder::new(format!("SELECT * FROM {} WHERE (", R::TABLE));
    for (i, column) in columns.iter().enumerate() {
        if i > 0 {
            qb.push(" OR ");
        }
        qb.push(*column)
            .push("::text ILIKE ")
            .push_bind(pattern.clone())
            .push(" ESCAPE '\\'");
    }
    qb.push(")");
    push_filters(&mut qb, &opts.filters, true);
    push_order_and_page::<R>(&mut qb, opts);
    qb
}

pub(crate) fn count<R: Record>(filters: &[Filter]) -> Builder {
    let mut qb = Builder::new(format!("SELECT COUNT(*) FROM {}", R::TABLE));
    push_filters(&mut qb, filters, false);
    qb
}

pub(crate) fn insert<R: Record>(changes: &Changes) -> Builder {
    if changes.is_empty() {
        return Builder::new(format!("INSERT INTO {} DEFAULT VALUES RETURNING *", R::TABLE));
    }
    let mut qb = Builder::new(format!("INSERT INTO {} (", R::TABLE));
    for (i, (column, _)) in changes.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column);
    }
    qb.push(") VALUES (");
    for (i, (_, value)) in changes.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        push_value(&mut qb, value);
    }
    qb.push(") RETURNING *");
    qb
}

/// `changes` must be non-empty.
pub(crate) fn update<R: Record>(id: Uuid, changes: &Changes) -> Builder {
    let mut qb = Builder::new(format!("UPDATE {} SET ", R::TABLE));
    for (i, (column, value)) in changes.iter().enumerate() {
        if i > 0 {
            qb.push(", ");
        }
        qb.push(column).push(" = ");
        push_value(&mut qb, value);
    }
    if R::HAS_UPDATED_AT {
        qb.push(", updated_at = now()");
    }
    qb.push(" WHERE id = ").push_bind(id).push(" RETURNING *");
    qb
}

pub(crate) fn delete<R: Record>(id: Uuid) -> Builder {
    let mut qb = Builder::new(format!("DELETE FROM {} WHERE id = ", R::TABLE));
    qb.push_bind(id);
    qb
}

#[cfg(test)]
#[path = "query_test.rs"]
mod tests;
