//! Student roster and PTA contribution tracking.
//!
//! DESIGN
//! ======
//! Plain CRUD goes through the generic store. Recording a contribution is
//! the one cross-table write in the system: the income row and the
//! student's paid flag change together in a single transaction, with the
//! student row locked so two clerks cannot both record the same payment.

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::finance::{self, FinanceError, Ledger};
use super::{non_blank, paged};
use crate::models::{Income, Student, TransactionStatus};
use crate::store::{Changes, Filter, FindOptions, OrderBy, Store, StoreError};

/// Category name contribution income rows are filed under, when it exists.
pub const CONTRIBUTION_CATEGORY: &str = "PTA Contribution";

const TRANSACTION_ID_CONSTRAINT: &str = "income_transactions_transaction_id_key";

#[derive(Debug, thiserror::Error)]
pub enum StudentError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("a student with this student id already exists")]
    DuplicateStudentId,
    #[error("referenced grade, section or parent does not exist")]
    InvalidReference,
    #[error("student not found")]
    NotFound,
    #[error(transparent)]
    Store(StoreError),
}

impl From<StoreError> for StudentError {
    fn from(e: StoreError) -> Self {
        if e.is_unique_violation() {
            Self::DuplicateStudentId
        } else if e.is_constraint_violation() {
            Self::InvalidReference
        } else {
            Self::Store(e)
        }
    }
}

// =============================================================================
// LISTING
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentQuery {
    pub paid: Option<bool>,
    pub grade_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl StudentQuery {
    #[must_use]
    pub fn filters(&self) -> FindOptions {
        let mut opts = FindOptions::new().order(OrderBy::asc("last_name"));
        if let Some(paid) = self.paid {
            opts = opts.filter(Filter::eq("pta_contribution_paid", paid));
        }
        if let Some(grade_id) = self.grade_id {
            opts = opts.filter(Filter::eq("grade_id", grade_id));
        }
        if let Some(section_id) = self.section_id {
            opts = opts.filter(Filter::eq("section_id", section_id));
        }
        if let Some(parent_id) = self.parent_id {
            opts = opts.filter(Filter::eq("parent_id", parent_id));
        }
        opts
    }
}

/// # Errors
///
/// Store failures.
pub async fn list(store: &Store, query: &StudentQuery) -> Result<Vec<Student>, StoreError> {
    let opts = paged(query.filters(), query.page, query.per_page);
    store.search::<Student>(query.q.as_deref().unwrap_or(""), &[], &opts).await
}

// =============================================================================
// CRUD
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct StudentInput {
    pub student_id: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub middle_name: Option<String>,
    pub grade_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
}

impl StudentInput {
    /// Changes for an insert: code and both names are required.
    fn for_create(&self) -> Result<Changes, StudentError> {
        let required = |value: &Option<String>, field| non_blank(value.as_deref()).ok_or(StudentError::MissingField(field));
        Ok(Changes::new()
            .set("student_id", required(&self.student_id, "student_id")?)
            .set("first_name", required(&self.first_name, "first_name")?)
            .set("last_name", required(&self.last_name, "last_name")?)
            .set("middle_name", non_blank(self.middle_name.as_deref()))
            .set("grade_id", self.grade_id)
            .set("section_id", self.section_id)
            .set("parent_id", self.parent_id))
    }

    /// Changes for a partial update. Present-but-blank required fields are
    /// rejected rather than cleared.
    fn for_update(&self) -> Result<Changes, StudentError> {
        let present = |value: &Option<String>, field| match value {
            Some(v) => non_blank(Some(v.as_str())).map(Some).ok_or(StudentError::MissingField(field)),
            None => Ok(None),
        };
        Ok(Changes::new()
            .set_opt("student_id", present(&self.student_id, "student_id")?)
            .set_opt("first_name", present(&self.first_name, "first_name")?)
            .set_opt("last_name", present(&self.last_name, "last_name")?)
            .set_opt("middle_name", self.middle_name.as_deref().map(str::trim).map(str::to_owned))
            .set_opt("grade_id", self.grade_id)
            .set_opt("section_id", self.section_id)
            .set_opt("parent_id", self.parent_id))
    }
}

/// # Errors
///
/// Validation failures, duplicate code, unknown references, or store failures.
pub async fn create(store: &Store, input: &StudentInput) -> Result<Student, StudentError> {
    let student: Student = store.create(&input.for_create()?).await?;
    info!(student_id = %student.id, code = %student.student_id, "student created");
    Ok(student)
}

/// # Errors
///
/// Validation failures, missing row, or store failures.
pub async fn update(store: &Store, id: Uuid, input: &StudentInput) -> Result<Student, StudentError> {
    store
        .update::<Student>(id, &input.for_update()?)
        .await?
        .ok_or(StudentError::NotFound)
}

/// # Errors
///
/// Missing row or store failures.
pub async fn delete(store: &Store, id: Uuid) -> Result<(), StudentError> {
    if !store.delete::<Student>(id).await? {
        return Err(StudentError::NotFound);
    }
    info!(student_id = %id, "student deleted");
    Ok(())
}

// =============================================================================
// CONTRIBUTIONS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct Contribution {
    pub amount: Decimal,
    pub transaction_date: Option<NaiveDate>,
    pub notes: Option<String>,
}

enum ContributionOutcome {
    Recorded(Box<(Student, Income)>),
    Missing,
    AlreadyPaid,
}

/// Record a PTA contribution for a student: inserts a completed income row
/// linked to the student and marks the student paid, atomically.
///
/// # Errors
///
/// [`FinanceError::InvalidAmount`], [`FinanceError::NotFound`],
/// [`FinanceError::AlreadyPaid`], or store failures.
pub async fn record_contribution(
    store: &Store,
    student_id: Uuid,
    contribution: &Contribution,
    recorded_by: Option<Uuid>,
) -> Result<(Student, Income), FinanceError> {
    let amount = finance::check_amount(contribution.amount)?;
    let date = contribution.transaction_date.unwrap_or_else(finance::today);
    let notes = non_blank(contribution.notes.as_deref());
    let notes_ref = notes.as_deref();
    let pool = store.pool();

    let outcome = finance::with_fresh_id(Ledger::Income, date, is_transaction_id_clash, move |transaction_id| async move {
        let transaction_id = transaction_id.as_str();
        store
            .retry()
            .run("students.record_contribution", move || async move {
                let mut tx = pool.begin().await?;
                let student: Option<Student> = sqlx::query_as("SELECT * FROM students WHERE id = $1 FOR UPDATE")
                    .bind(student_id)
                    .fetch_optional(&mut *tx)
                    .await?;
                let Some(student) = student else {
                    return Ok(ContributionOutcome::Missing);
                };
                if student.pta_contribution_paid {
                    return Ok(ContributionOutcome::AlreadyPaid);
                }

                let category_id: Option<Uuid> =
                    sqlx::query_scalar("SELECT id FROM categories WHERE name = $1 AND kind = 'income' LIMIT 1")
                        .bind(CONTRIBUTION_CATEGORY)
                        .fetch_optional(&mut *tx)
                        .await?;

                let income: Income = sqlx::query_as(
                    "INSERT INTO income_transactions
                         (transaction_id, amount, description, notes, transaction_date,
                          status, category_id, student_id, recorded_by)
                     VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
                     RETURNING *",
                )
                .bind(transaction_id)
                .bind(amount)
                .bind(format!("PTA contribution: {}", student.full_name()))
                .bind(notes_ref)
                .bind(date)
                .bind(TransactionStatus::Completed.as_str())
                .bind(category_id)
                .bind(student_id)
                .bind(recorded_by)
                .fetch_one(&mut *tx)
                .await?;

                let student: Student = sqlx::query_as(
                    "UPDATE students
                     SET pta_contribution_paid = TRUE, pta_contribution_amount = $2, updated_at = now()
                     WHERE id = $1
                     RETURNING *",
                )
                .bind(student_id)
                .bind(amount)
                .fetch_one(&mut *tx)
                .await?;

                tx.commit().await?;
                Ok::<_, sqlx::Error>(ContributionOutcome::Recorded(Box::new((student, income))))
            })
            .await
    })
    .await?;

    match outcome {
        ContributionOutcome::Recorded(recorded) => {
            let (student, income) = *recorded;
            info!(
                student_id = %student.id,
                transaction_id = %income.transaction_id,
                amount = %income.amount,
                "contribution recorded"
            );
            Ok((student, income))
        }
        ContributionOutcome::Missing => Err(FinanceError::NotFound("student")),
        ContributionOutcome::AlreadyPaid => Err(FinanceError::AlreadyPaid),
    }
}

/// A unique violation on the income ledger's `transaction_id` column.
fn is_transaction_id_clash(e: &sqlx::Error) -> bool {
    match e {
        sqlx::Error::Database(db) => {
            db.code().as_deref() == Some("23505") && db.constraint() == Some(TRANSACTION_ID_CONSTRAINT)
        }
        _ => false,
    }
}

#[cfg(test)]
#[path = "students_test.rs"]
mod tests;
