//! Domain rows and enums. Each row struct mirrors one table and implements
//! [`Record`] so the generic store can read and write it.

use chrono::{DateTime, NaiveDate, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::store::Record;

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("unknown {kind}: {value:?}")]
pub struct UnknownVariant {
    pub kind: &'static str,
    pub value: String,
}

// =============================================================================
// ROLE
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Principal,
    Teacher,
    Treasurer,
    Parent,
}

impl Role {
    pub const ALL: [Role; 5] = [Role::Admin, Role::Principal, Role::Teacher, Role::Treasurer, Role::Parent];

    /// Everyone except parents.
    pub const STAFF: [Role; 4] = [Role::Admin, Role::Principal, Role::Teacher, Role::Treasurer];

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Principal => "principal",
            Self::Teacher => "teacher",
            Self::Treasurer => "treasurer",
            Self::Parent => "parent",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "admin" => Some(Self::Admin),
            "principal" => Some(Self::Principal),
            "teacher" => Some(Self::Teacher),
            "treasurer" => Some(Self::Treasurer),
            "parent" => Some(Self::Parent),
            _ => None,
        }
    }

    #[must_use]
    pub fn is_staff(self) -> bool {
        self != Self::Parent
    }
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<String> for Role {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownVariant { kind: "role", value })
    }
}

// =============================================================================
// TRANSACTION STATUS / CATEGORY KIND
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum TransactionStatus {
    #[default]
    Pending,
    Completed,
    Approved,
    Rejected,
}

impl TransactionStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Approved => "approved",
            Self::Rejected => "rejected",
        }
    }

    #[must_use]
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Some(Self::Pending),
            "completed" => Some(Self::Completed),
            "approved" => Some(Self::Approved),
            "rejected" => Some(Self::Rejected),
            _ => None,
        }
    }
}

impl TryFrom<String> for TransactionStatus {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value).ok_or(UnknownVariant { kind: "transaction status", value })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CategoryKind {
    Income,
    Expense,
}

impl CategoryKind {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Income => "income",
            Self::Expense => "expense",
        }
    }
}

impl TryFrom<String> for CategoryKind {
    type Error = UnknownVariant;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "income" => Ok(Self::Income),
            "expense" => Ok(Self::Expense),
            _ => Err(UnknownVariant { kind: "category kind", value }),
        }
    }
}

// =============================================================================
// ROWS
// =============================================================================

/// Profile row for anyone who can sign in.
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    #[sqlx(try_from = "String")]
    pub role: Role,
    pub is_active: bool,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for User {
    const TABLE: &'static str = "users";
    const COLUMNS: &'static [&'static str] = &["email", "full_name", "role", "is_active", "password_hash"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["email", "full_name"];
    const DEFAULT_ORDER: &'static str = "full_name";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Parent {
    pub id: Uuid,
    pub user_id: Option<Uuid>,
    pub full_name: String,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Parent {
    const TABLE: &'static str = "parents";
    const COLUMNS: &'static [&'static str] = &["user_id", "full_name", "email", "phone", "address"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["full_name", "email", "phone"];
    const DEFAULT_ORDER: &'static str = "full_name";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Grade {
    pub id: Uuid,
    pub name: String,
    pub level: i32,
    pub created_at: DateTime<Utc>,
}

impl Record for Grade {
    const TABLE: &'static str = "grades";
    const COLUMNS: &'static [&'static str] = &["name", "level"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];
    const DEFAULT_ORDER: &'static str = "level";
    const HAS_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Section {
    pub id: Uuid,
    pub grade_id: Uuid,
    pub name: String,
    pub adviser_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

impl Record for Section {
    const TABLE: &'static str = "sections";
    const COLUMNS: &'static [&'static str] = &["grade_id", "name", "adviser_id"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];
    const DEFAULT_ORDER: &'static str = "name";
    const HAS_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Student {
    pub id: Uuid,
    pub student_id: String,
    pub first_name: String,
    pub last_name: String,
    pub middle_name: Option<String>,
    pub grade_id: Option<Uuid>,
    pub section_id: Option<Uuid>,
    pub parent_id: Option<Uuid>,
    pub pta_contribution_paid: bool,
    pub pta_contribution_amount: Decimal,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Student {
    #[must_use]
    pub fn full_name(&self) -> String {
        match self.middle_name.as_deref().filter(|m| !m.trim().is_empty()) {
            Some(middle) => format!("{} {} {}", self.first_name, middle, self.last_name),
            None => format!("{} {}", self.first_name, self.last_name),
        }
    }
}

impl Record for Student {
    const TABLE: &'static str = "students";
    const COLUMNS: &'static [&'static str] = &[
        "student_id",
        "first_name",
        "last_name",
        "middle_name",
        "grade_id",
        "section_id",
        "parent_id",
        "pta_contribution_paid",
        "pta_contribution_amount",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["student_id", "first_name", "last_name"];
    const DEFAULT_ORDER: &'static str = "last_name";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Category {
    pub id: Uuid,
    pub name: String,
    #[sqlx(try_from = "String")]
    pub kind: CategoryKind,
    pub created_at: DateTime<Utc>,
}

impl Record for Category {
    const TABLE: &'static str = "categories";
    const COLUMNS: &'static [&'static str] = &["name", "kind"];
    const SEARCH_COLUMNS: &'static [&'static str] = &["name"];
    const DEFAULT_ORDER: &'static str = "name";
    const HAS_UPDATED_AT: bool = false;
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Income {
    pub id: Uuid,
    pub transaction_id: String,
    pub amount: Decimal,
    pub description: String,
    pub notes: Option<String>,
    pub transaction_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub category_id: Option<Uuid>,
    pub student_id: Option<Uuid>,
    pub recorded_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Income {
    const TABLE: &'static str = "income_transactions";
    const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "amount",
        "description",
        "notes",
        "transaction_date",
        "status",
        "category_id",
        "student_id",
        "recorded_by",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["transaction_id", "description"];
    const DEFAULT_ORDER: &'static str = "transaction_date";
}

#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Expense {
    pub id: Uuid,
    pub transaction_id: String,
    pub amount: Decimal,
    pub description: String,
    pub notes: Option<String>,
    pub payee: Option<String>,
    pub transaction_date: NaiveDate,
    #[sqlx(try_from = "String")]
    pub status: TransactionStatus,
    pub category_id: Option<Uuid>,
    pub recorded_by: Option<Uuid>,
    pub approved_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Record for Expense {
    const TABLE: &'static str = "expense_transactions";
    const COLUMNS: &'static [&'static str] = &[
        "transaction_id",
        "amount",
        "description",
        "notes",
        "payee",
        "transaction_date",
        "status",
        "category_id",
        "recorded_by",
        "approved_by",
    ];
    const SEARCH_COLUMNS: &'static [&'static str] = &["transaction_id", "description", "payee"];
    const DEFAULT_ORDER: &'static str = "transaction_date";
}

/// Fields shared by income and expense rows, used by aggregation code that
/// treats both kinds uniformly.
pub trait Transaction {
    fn amount(&self) -> Decimal;
    fn date(&self) -> NaiveDate;
    fn status(&self) -> TransactionStatus;
    fn category_id(&self) -> Option<Uuid>;
}

impl Transaction for Income {
    fn amount(&self) -> Decimal {
        self.amount
    }
    fn date(&self) -> NaiveDate {
        self.transaction_date
    }
    fn status(&self) -> TransactionStatus {
        self.status
    }
    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

impl Transaction for Expense {
    fn amount(&self) -> Decimal {
        self.amount
    }
    fn date(&self) -> NaiveDate {
        self.transaction_date
    }
    fn status(&self) -> TransactionStatus {
        self.status
    }
    fn category_id(&self) -> Option<Uuid> {
        self.category_id
    }
}

#[cfg(test)]
#[path = "models_test.rs"]
mod tests;
