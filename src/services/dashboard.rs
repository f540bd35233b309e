//! Dashboard aggregation.
//!
//! DESIGN
//! ======
//! Every request fetches all students, income and expense rows and reduces
//! them in one linear pass each. Nothing is memoized, so the numbers always
//! reflect the tables at request time.

use rust_decimal::Decimal;
use serde::Serialize;
use uuid::Uuid;

use crate::models::{Expense, Income, Parent, Student, Transaction, TransactionStatus};
use crate::store::{Filter, FindOptions, Store, StoreError};

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DashboardSummary {
    pub total_students: usize,
    pub paid_count: usize,
    pub unpaid_count: usize,
    pub paid_percentage: f64,
    pub unpaid_percentage: f64,
    /// Sum of recorded contribution amounts over paid students.
    pub total_contributions: Decimal,
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub current_balance: Decimal,
    pub income_count: usize,
    pub expense_count: usize,
    pub pending_income: usize,
    pub pending_expenses: usize,
}

/// `part / total` as a percentage rounded to one decimal place; 0 when
/// `total` is 0.
#[must_use]
#[allow(clippy::cast_precision_loss)]
pub fn percentage(part: usize, total: usize) -> f64 {
    if total == 0 {
        return 0.0;
    }
    (part as f64 * 1000.0 / total as f64).round() / 10.0
}

#[must_use]
pub fn sum_amounts<T: Transaction>(rows: &[T]) -> Decimal {
    rows.iter().map(Transaction::amount).sum()
}

fn count_pending<T: Transaction>(rows: &[T]) -> usize {
    rows.iter()
        .filter(|r| r.status() == TransactionStatus::Pending)
        .count()
}

#[must_use]
pub fn summarize(students: &[Student], income: &[Income], expenses: &[Expense]) -> DashboardSummary {
    let total_students = students.len();
    let (paid_count, total_contributions) = students
        .iter()
        .filter(|s| s.pta_contribution_paid)
        .fold((0, Decimal::ZERO), |(n, sum), s| (n + 1, sum + s.pta_contribution_amount));
    let unpaid_count = total_students - paid_count;

    let total_income = sum_amounts(income);
    let total_expenses = sum_amounts(expenses);

    DashboardSummary {
        total_students,
        paid_count,
        unpaid_count,
        paid_percentage: percentage(paid_count, total_students),
        unpaid_percentage: percentage(unpaid_count, total_students),
        total_contributions,
        total_income,
        total_expenses,
        current_balance: total_income - total_expenses,
        income_count: income.len(),
        expense_count: expenses.len(),
        pending_income: count_pending(income),
        pending_expenses: count_pending(expenses),
    }
}

/// Fetch every student and transaction row and summarize them.
///
/// # Errors
///
/// Any store failure abandons the whole summary.
pub async fn load_summary(store: &Store) -> Result<DashboardSummary, StoreError> {
    let all = FindOptions::new();
    let students = store.find_many::<Student>(&all).await?;
    let income = store.find_many::<Income>(&all).await?;
    let expenses = store.find_many::<Expense>(&all).await?;
    Ok(summarize(&students, &income, &expenses))
}

// =============================================================================
// PARENT VIEW
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ChildStatus {
    pub id: Uuid,
    pub student_id: String,
    pub name: String,
    pub grade_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub pta_contribution_paid: bool,
    pub pta_contribution_amount: Decimal,
}

impl From<&Student> for ChildStatus {
    fn from(s: &Student) -> Self {
        Self {
            id: s.id,
            student_id: s.student_id.clone(),
            name: s.full_name(),
            grade_id: s.grade_id,
            section_id: s.section_id,
            pta_contribution_paid: s.pta_contribution_paid,
            pta_contribution_amount: s.pta_contribution_amount,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ParentView {
    pub parent_id: Option<Uuid>,
    pub children: Vec<ChildStatus>,
    pub all_paid: bool,
}

/// Children linked to the parent profile of `user_id`. A parent account
/// without a profile sees an empty list.
///
/// # Errors
///
/// Store failures.
pub async fn load_parent_view(store: &Store, user_id: Uuid) -> Result<ParentView, StoreError> {
    let profile = store
        .find_many::<Parent>(&FindOptions::new().filter(Filter::eq("user_id", user_id)))
        .await?
        .into_iter()
        .next();
    let Some(profile) = profile else {
        return Ok(ParentView { parent_id: None, children: Vec::new(), all_paid: false });
    };

    let students = store
        .find_many::<Student>(&FindOptions::new().filter(Filter::eq("parent_id", profile.id)))
        .await?;
    let children: Vec<ChildStatus> = students.iter().map(ChildStatus::from).collect();
    let all_paid = !children.is_empty() && children.iter().all(|c| c.pta_contribution_paid);
    Ok(ParentView { parent_id: Some(profile.id), children, all_paid })
}

#[cfg(test)]
#[path = "dashboard_test.rs"]
mod tests;
