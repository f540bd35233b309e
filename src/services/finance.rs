//! Income and expense bookkeeping.
//!
//! DESIGN
//! ======
//! Both ledgers share one shape (see [`crate::models::Transaction`]) and one list query.
//! New rows get a human-readable `transaction_id` of the form
//! `INC-YYYYMMDD-XXXX` / `EXP-YYYYMMDD-XXXX`; a clash on the unique index
//! just draws a new suffix.

use std::future::Future;

use chrono::{NaiveDate, Utc};
use rand::Rng;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::{debug, info};
use uuid::Uuid;

use super::{non_blank, paged};
use crate::models::{Expense, Income, TransactionStatus};
use crate::store::{Changes, Filter, FindOptions, OrderBy, Record, Store, StoreError};

const ID_SUFFIX_LEN: usize = 4;
const ID_ALPHABET: &[u8] = b"0123456789ABCDEFGHJKLMNPQRSTUVWXYZ";
const MAX_ID_DRAWS: u32 = 3;

#[derive(Debug, thiserror::Error)]
pub enum FinanceError {
    #[error("amount must be greater than zero")]
    InvalidAmount,
    #[error("description is required")]
    MissingDescription,
    #[error("student has already paid the PTA contribution")]
    AlreadyPaid,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error("referenced category, student or user does not exist")]
    InvalidReference,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for FinanceError {
    fn from(e: StoreError) -> Self {
        if e.is_constraint_violation() { Self::InvalidReference } else { Self::Store(e) }
    }
}

impl From<sqlx::Error> for FinanceError {
    fn from(e: sqlx::Error) -> Self {
        StoreError::Database(e).into()
    }
}

// =============================================================================
// TRANSACTION IDS
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Ledger {
    Income,
    Expense,
}

impl Ledger {
    #[must_use]
    pub fn prefix(self) -> &'static str {
        match self {
            Self::Income => "INC",
            Self::Expense => "EXP",
        }
    }
}

/// Build a transaction id like `INC-20260115-7QK2` for `date`.
#[must_use]
pub fn generate_transaction_id(ledger: Ledger, date: NaiveDate) -> String {
    let mut rng = rand::rng();
    let suffix: String = (0..ID_SUFFIX_LEN)
        .map(|_| char::from(ID_ALPHABET[rng.random_range(0..ID_ALPHABET.len())]))
        .collect();
    format!("{}-{}-{suffix}", ledger.prefix(), date.format("%Y%m%d"))
}

/// Round to cents, then require a positive result.
pub(crate) fn check_amount(amount: Decimal) -> Result<Decimal, FinanceError> {
    let amount = amount.round_dp(2);
    if amount <= Decimal::ZERO {
        return Err(FinanceError::InvalidAmount);
    }
    Ok(amount)
}

#[must_use]
pub fn today() -> NaiveDate {
    Utc::now().date_naive()
}

/// Call `insert` with a freshly drawn transaction id, drawing again while
/// `is_clash` says the id is taken, at most [`MAX_ID_DRAWS`] times.
pub(crate) async fn with_fresh_id<T, E, F, Fut>(
    ledger: Ledger,
    date: NaiveDate,
    is_clash: impl Fn(&E) -> bool,
    mut insert: F,
) -> Result<T, E>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = Result<T, E>>,
{
    let mut draw = 1;
    loop {
        match insert(generate_transaction_id(ledger, date)).await {
            Err(e) if is_clash(&e) && draw < MAX_ID_DRAWS => {
                debug!(ledger = ledger.prefix(), draw, "transaction id clash; drawing again");
                draw += 1;
            }
            result => return result,
        }
    }
}

/// Insert a ledger row, drawing a fresh `transaction_id` on a unique clash.
async fn insert_with_id<R: Record>(
    store: &Store,
    ledger: Ledger,
    date: NaiveDate,
    changes: Changes,
) -> Result<R, FinanceError> {
    let changes = &changes;
    let row = with_fresh_id(ledger, date, StoreError::is_unique_violation, |transaction_id| async move {
        store.create::<R>(&changes.clone().set("transaction_id", transaction_id)).await
    })
    .await?;
    Ok(row)
}

// =============================================================================
// LISTING
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionQuery {
    pub status: Option<TransactionStatus>,
    pub category_id: Option<Uuid>,
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl TransactionQuery {
    /// Filters and ordering (newest first) for this query, without paging.
    #[must_use]
    pub fn filters(&self) -> FindOptions {
        let mut opts = FindOptions::new().order(OrderBy::desc("transaction_date"));
        if let Some(status) = self.status {
            opts = opts.filter(Filter::eq("status", status.as_str()));
        }
        if let Some(category_id) = self.category_id {
            opts = opts.filter(Filter::eq("category_id", category_id));
        }
        if let Some(from) = self.from {
            opts = opts.filter(Filter::gte("transaction_date", from));
        }
        if let Some(to) = self.to {
            opts = opts.filter(Filter::lte("transaction_date", to));
        }
        opts
    }
}

/// List income or expense rows. `q` searches the record's default columns.
///
/// # Errors
///
/// Store failures.
pub async fn list<R: Record>(store: &Store, query: &TransactionQuery) -> Result<Vec<R>, StoreError> {
    let opts = paged(query.filters(), query.page, query.per_page);
    store.search::<R>(query.q.as_deref().unwrap_or(""), &[], &opts).await
}

// =============================================================================
// INCOME
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewIncome {
    pub amount: Decimal,
    pub description: String,
    pub notes: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
    pub category_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
}

/// Editable fields shared by income and expense rows. `payee` only applies
/// to expenses.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct TransactionPatch {
    pub amount: Option<Decimal>,
    pub description: Option<String>,
    pub notes: Option<String>,
    pub payee: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub category_id: Option<Uuid>,
}

impl TransactionPatch {
    fn changes(&self) -> Result<Changes, FinanceError> {
        let amount = self.amount.map(check_amount).transpose()?;
        let description = match &self.description {
            Some(d) => Some(non_blank(Some(d.as_str())).ok_or(FinanceError::MissingDescription)?),
            None => None,
        };
        Ok(Changes::new()
            .set_opt("amount", amount)
            .set_opt("description", description)
            .set_opt("notes", self.notes.clone())
            .set_opt("transaction_date", self.transaction_date)
            .set_opt("category_id", self.category_id))
    }
}

/// Record an income row. Linking a student here does not change the
/// student's paid flag; use [`crate::services::students::record_contribution`]
/// for that.
///
/// # Errors
///
/// Validation failures, unknown references, or store failures.
pub async fn create_income(store: &Store, input: &NewIncome, recorded_by: Option<Uuid>) -> Result<Income, FinanceError> {
    let amount = check_amount(input.amount)?;
    let description = non_blank(Some(input.description.as_str())).ok_or(FinanceError::MissingDescription)?;
    let date = input.transaction_date.unwrap_or_else(today);

    let changes = Changes::new()
        .set("amount", amount)
        .set("description", description)
        .set("notes", non_blank(input.notes.as_deref()))
        .set("transaction_date", date)
        .set("status", input.status.unwrap_or_default().as_str())
        .set("category_id", input.category_id)
        .set("student_id", input.student_id)
        .set("recorded_by", recorded_by);
    let income: Income = insert_with_id(store, Ledger::Income, date, changes).await?;
    info!(income_id = %income.id, transaction_id = %income.transaction_id, amount = %income.amount, "income recorded");
    Ok(income)
}

/// # Errors
///
/// Validation failures, missing row, or store failures.
pub async fn update_income(store: &Store, id: Uuid, patch: &TransactionPatch) -> Result<Income, FinanceError> {
    store
        .update::<Income>(id, &patch.changes()?)
        .await?
        .ok_or(FinanceError::NotFound("income"))
}

/// # Errors
///
/// Missing row or store failures.
pub async fn set_income_status(store: &Store, id: Uuid, status: TransactionStatus) -> Result<Income, FinanceError> {
    let changes = Changes::new().set("status", status.as_str());
    let income = store
        .update::<Income>(id, &changes)
        .await?
        .ok_or(FinanceError::NotFound("income"))?;
    info!(income_id = %id, status = status.as_str(), "income status changed");
    Ok(income)
}

// =============================================================================
// EXPENSES
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct NewExpense {
    pub amount: Decimal,
    pub description: String,
    pub notes: Option<String>,
    pub payee: Option<String>,
    pub transaction_date: Option<NaiveDate>,
    pub status: Option<TransactionStatus>,
    pub category_id: Option<Uuid>,
}

/// # Errors
///
/// Validation failures, unknown references, or store failures.
pub async fn create_expense(store: &Store, input: &NewExpense, recorded_by: Option<Uuid>) -> Result<Expense, FinanceError> {
    let amount = check_amount(input.amount)?;
    let description = non_blank(Some(input.description.as_str())).ok_or(FinanceError::MissingDescription)?;
    let date = input.transaction_date.unwrap_or_else(today);

    let changes = Changes::new()
        .set("amount", amount)
        .set("description", description)
        .set("notes", non_blank(input.notes.as_deref()))
        .set("payee", non_blank(input.payee.as_deref()))
        .set("transaction_date", date)
        .set("status", input.status.unwrap_or_default().as_str())
        .set("category_id", input.category_id)
        .set("recorded_by", recorded_by);
    let expense: Expense = insert_with_id(store, Ledger::Expense, date, changes).await?;
    info!(expense_id = %expense.id, transaction_id = %expense.transaction_id, amount = %expense.amount, "expense recorded");
    Ok(expense)
}

/// # Errors
///
/// Validation failures, missing row, or store failures.
pub async fn update_expense(store: &Store, id: Uuid, patch: &TransactionPatch) -> Result<Expense, FinanceError> {
    let changes = patch.changes()?.set_opt("payee", non_blank(patch.payee.as_deref()));
    store
        .update::<Expense>(id, &changes)
        .await?
        .ok_or(FinanceError::NotFound("expense"))
}

/// Move an expense to `status`. Approving or rejecting records who decided.
///
/// # Errors
///
/// Missing row or store failures.
pub async fn set_expense_status(
    store: &Store,
    id: Uuid,
    status: TransactionStatus,
    actor: Uuid,
) -> Result<Expense, FinanceError> {
    let mut changes = Changes::new().set("status", status.as_str());
    if matches!(status, TransactionStatus::Approved | TransactionStatus::Rejected) {
        changes = changes.set("approved_by", actor);
    }
    let expense = store
        .update::<Expense>(id, &changes)
        .await?
        .ok_or(FinanceError::NotFound("expense"))?;
    info!(expense_id = %id, status = status.as_str(), %actor, "expense status changed");
    Ok(expense)
}

#[cfg(test)]
#[path = "finance_test.rs"]
mod tests;
