//! Financial reports.
//!
//! Everything is computed in-process over rows fetched for the requested
//! date range: totals, per-category and per-month breakdowns, and
//! contribution collection per grade.

use std::collections::{BTreeMap, HashMap};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::dashboard::percentage;
use crate::models::{Category, Expense, Grade, Income, Student, Transaction};
use crate::store::{Filter, FindOptions, OrderBy, Store, StoreError};

pub const UNCATEGORIZED: &str = "Uncategorized";
pub const UNASSIGNED_GRADE: &str = "Unassigned";

#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
pub struct ReportRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl ReportRange {
    #[must_use]
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.is_none_or(|from| date >= from) && self.to.is_none_or(|to| date <= to)
    }

    fn options(&self) -> FindOptions {
        let mut opts = FindOptions::new().order(OrderBy::asc("transaction_date"));
        if let Some(from) = self.from {
            opts = opts.filter(Filter::gte("transaction_date", from));
        }
        if let Some(to) = self.to {
            opts = opts.filter(Filter::lte("transaction_date", to));
        }
        opts
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FinancialSummary {
    pub total_income: Decimal,
    pub total_expenses: Decimal,
    pub balance: Decimal,
    pub income_count: usize,
    pub expense_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CategoryTotal {
    pub category_id: Option<Uuid>,
    pub category: String,
    pub total: Decimal,
    pub count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MonthTotal {
    /// `YYYY-MM`
    pub month: String,
    pub income: Decimal,
    pub expenses: Decimal,
    pub net: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct GradeCollection {
    pub grade_id: Option<Uuid>,
    pub grade: String,
    pub total_students: usize,
    pub paid_count: usize,
    pub paid_percentage: f64,
    pub collected: Decimal,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Report {
    pub range: ReportRange,
    pub summary: FinancialSummary,
    pub income_by_category: Vec<CategoryTotal>,
    pub expenses_by_category: Vec<CategoryTotal>,
    pub by_month: Vec<MonthTotal>,
    pub by_grade: Vec<GradeCollection>,
}

/// Everything a report is computed from.
pub struct ReportInput<'a> {
    pub income: &'a [Income],
    pub expenses: &'a [Expense],
    pub students: &'a [Student],
    pub categories: &'a [Category],
    /// Expected in display order.
    pub grades: &'a [Grade],
}

// =============================================================================
// GROUPING
// =============================================================================

/// Totals per category, largest first. Rows without a category, or pointing
/// at a category that no longer exists, land under [`UNCATEGORIZED`].
#[must_use]
pub fn by_category<T: Transaction>(rows: &[&T], categories: &[Category]) -> Vec<CategoryTotal> {
    let names: HashMap<Uuid, &str> = categories.iter().map(|c| (c.id, c.name.as_str())).collect();
    let mut groups: HashMap<Option<Uuid>, (Decimal, usize)> = HashMap::new();
    for row in rows {
        let key = row.category_id().filter(|id| names.contains_key(id));
        let entry = groups.entry(key).or_insert((Decimal::ZERO, 0));
        entry.0 += row.amount();
        entry.1 += 1;
    }

    let mut totals: Vec<CategoryTotal> = groups
        .into_iter()
        .map(|(category_id, (total, count))| CategoryTotal {
            category_id,
            category: category_id
                .and_then(|id| names.get(&id))
                .map_or(UNCATEGORIZED, |name| *name)
                .to_owned(),
            total,
            count,
        })
        .collect();
    totals.sort_by(|a, b| b.total.cmp(&a.total).then_with(|| a.category.cmp(&b.category)));
    totals
}

fn month_key(date: NaiveDate) -> String {
    date.format("%Y-%m").to_string()
}

/// Income, expenses and net per calendar month, oldest first. Months with no
/// rows are omitted.
#[must_use]
pub fn by_month(income: &[&Income], expenses: &[&Expense]) -> Vec<MonthTotal> {
    let mut months: BTreeMap<String, (Decimal, Decimal)> = BTreeMap::new();
    for row in income {
        months.entry(month_key(row.date())).or_default().0 += row.amount();
    }
    for row in expenses {
        months.entry(month_key(row.date())).or_default().1 += row.amount();
    }
    months
        .into_iter()
        .map(|(month, (income, expenses))| MonthTotal { month, income, expenses, net: income - expenses })
        .collect()
}

fn collection(grade_id: Option<Uuid>, grade: &str, members: &[&Student]) -> GradeCollection {
    let paid: Vec<&&Student> = members.iter().filter(|s| s.pta_contribution_paid).collect();
    GradeCollection {
        grade_id,
        grade: grade.to_owned(),
        total_students: members.len(),
        paid_count: paid.len(),
        paid_percentage: percentage(paid.len(), members.len()),
        collected: paid.iter().map(|s| s.pta_contribution_amount).sum(),
    }
}

/// Contribution collection per grade in `grades` order, followed by an
/// [`UNASSIGNED_GRADE`] row when some students have no (known) grade.
#[must_use]
pub fn by_grade(students: &[Student], grades: &[Grade]) -> Vec<GradeCollection> {
    let mut rows: Vec<GradeCollection> = grades
        .iter()
        .map(|g| {
            let members: Vec<&Student> = students.iter().filter(|s| s.grade_id == Some(g.id)).collect();
            collection(Some(g.id), &g.name, &members)
        })
        .collect();

    let unassigned: Vec<&Student> = students
        .iter()
        .filter(|s| s.grade_id.is_none_or(|id| grades.iter().all(|g| g.id != id)))
        .collect();
    if !unassigned.is_empty() {
        rows.push(collection(None, UNASSIGNED_GRADE, &unassigned));
    }
    rows
}

// =============================================================================
// REPORT
// =============================================================================

#[must_use]
pub fn build(range: ReportRange, input: &ReportInput<'_>) -> Report {
    let income: Vec<&Income> = input.income.iter().filter(|r| range.contains(r.date())).collect();
    let expenses: Vec<&Expense> = input.expenses.iter().filter(|r| range.contains(r.date())).collect();

    let total_income: Decimal = income.iter().map(|r| r.amount()).sum();
    let total_expenses: Decimal = expenses.iter().map(|r| r.amount()).sum();

    Report {
        range,
        summary: FinancialSummary {
            total_income,
            total_expenses,
            balance: total_income - total_expenses,
            income_count: income.len(),
            expense_count: expenses.len(),
        },
        income_by_category: by_category(&income, input.categories),
        expenses_by_category: by_category(&expenses, input.categories),
        by_month: by_month(&income, &expenses),
        by_grade: by_grade(input.students, input.grades),
    }
}

/// Fetch rows for `range` and build the report.
///
/// # Errors
///
/// Store failures.
pub async fn load(store: &Store, range: ReportRange) -> Result<Report, StoreError> {
    let opts = range.options();
    let income = store.find_many::<Income>(&opts).await?;
    let expenses = store.find_many::<Expense>(&opts).await?;
    let students = store.find_many::<Student>(&FindOptions::new()).await?;
    let categories = store.find_many::<Category>(&FindOptions::new()).await?;
    let grades = store
        .find_many::<Grade>(&FindOptions::new().order(OrderBy::asc("level")))
        .await?;

    Ok(build(
        range,
        &ReportInput {
            income: &income,
            expenses: &expenses,
            students: &students,
            categories: &categories,
            grades: &grades,
        },
    ))
}

#[cfg(test)]
#[path = "reports_test.rs"]
mod tests;
