//! School directory: parents, teachers, grades, sections and categories.

use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use super::{non_blank, paged};
use crate::models::{Category, CategoryKind, Grade, Parent, Role, Section, Student, User};
use crate::store::{Changes, Filter, FindOptions, OrderBy, Record, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum DirectoryError {
    #[error("{0} is required")]
    MissingField(&'static str),
    #[error("{0} already exists")]
    Duplicate(&'static str),
    #[error("referenced row does not exist")]
    InvalidReference,
    #[error("section adviser must be a teacher")]
    AdviserNotTeacher,
    #[error("{0} not found")]
    NotFound(&'static str),
    #[error(transparent)]
    Store(StoreError),
}

impl DirectoryError {
    fn from_store(e: StoreError, what: &'static str) -> Self {
        if e.is_unique_violation() {
            Self::Duplicate(what)
        } else if e.is_constraint_violation() {
            Self::InvalidReference
        } else {
            Self::Store(e)
        }
    }
}

impl From<StoreError> for DirectoryError {
    fn from(e: StoreError) -> Self {
        Self::from_store(e, "row")
    }
}

fn required(value: &str, field: &'static str) -> Result<String, DirectoryError> {
    non_blank(Some(value)).ok_or(DirectoryError::MissingField(field))
}

async fn delete_row<R: Record>(store: &Store, id: Uuid, what: &'static str) -> Result<(), DirectoryError> {
    if !store.delete::<R>(id).await? {
        return Err(DirectoryError::NotFound(what));
    }
    info!(table = R::TABLE, %id, "row deleted");
    Ok(())
}

// =============================================================================
// PARENTS
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentQuery {
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct ParentInput {
    pub full_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub address: Option<String>,
    pub user_id: Option<Uuid>,
}

impl ParentInput {
    fn changes(&self, creating: bool) -> Result<Changes, DirectoryError> {
        let full_name = match (&self.full_name, creating) {
            (Some(name), _) => Some(required(name, "full_name")?),
            (None, true) => return Err(DirectoryError::MissingField("full_name")),
            (None, false) => None,
        };
        let email = self.email.as_deref().map(|e| e.trim().to_ascii_lowercase());
        Ok(Changes::new()
            .set_opt("full_name", full_name)
            .set_opt("email", email)
            .set_opt("phone", self.phone.as_deref().map(str::trim))
            .set_opt("address", self.address.as_deref().map(str::trim))
            .set_opt("user_id", self.user_id))
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ParentDetail {
    #[serde(flatten)]
    pub parent: Parent,
    pub children: Vec<Student>,
}

/// # Errors
///
/// Store failures.
pub async fn list_parents(store: &Store, query: &ParentQuery) -> Result<Vec<Parent>, StoreError> {
    let opts = paged(FindOptions::new().order(OrderBy::asc("full_name")), query.page, query.per_page);
    store.search::<Parent>(query.q.as_deref().unwrap_or(""), &[], &opts).await
}

/// A parent profile with the students linked to it.
///
/// # Errors
///
/// Store failures.
pub async fn parent_detail(store: &Store, id: Uuid) -> Result<Option<ParentDetail>, StoreError> {
    let Some(parent) = store.find_by_id::<Parent>(id).await? else {
        return Ok(None);
    };
    let children = store
        .find_many::<Student>(&FindOptions::new().filter(Filter::eq("parent_id", id)))
        .await?;
    Ok(Some(ParentDetail { parent, children }))
}

/// # Errors
///
/// Validation failures, a user already linked to another profile, or store
/// failures.
pub async fn create_parent(store: &Store, input: &ParentInput) -> Result<Parent, DirectoryError> {
    let parent: Parent = store
        .create(&input.changes(true)?)
        .await
        .map_err(|e| DirectoryError::from_store(e, "parent profile for this user"))?;
    info!(parent_id = %parent.id, "parent created");
    Ok(parent)
}

/// # Errors
///
/// Validation failures, missing row, or store failures.
pub async fn update_parent(store: &Store, id: Uuid, input: &ParentInput) -> Result<Parent, DirectoryError> {
    store
        .update::<Parent>(id, &input.changes(false)?)
        .await
        .map_err(|e| DirectoryError::from_store(e, "parent profile for this user"))?
        .ok_or(DirectoryError::NotFound("parent"))
}

/// Remove a parent profile. Linked students keep their rows with no parent.
///
/// # Errors
///
/// Missing row or store failures.
pub async fn delete_parent(store: &Store, id: Uuid) -> Result<(), DirectoryError> {
    delete_row::<Parent>(store, id, "parent").await
}

// =============================================================================
// TEACHERS
// =============================================================================

/// Users with the `teacher` role, optionally narrowed by a name/email search.
///
/// # Errors
///
/// Store failures.
pub async fn list_teachers(store: &Store, q: Option<&str>) -> Result<Vec<User>, StoreError> {
    let opts = FindOptions::new()
        .filter(Filter::eq("role", Role::Teacher.as_str()))
        .order(OrderBy::asc("full_name"));
    store.search::<User>(q.unwrap_or(""), &[], &opts).await
}

// =============================================================================
// GRADES / SECTIONS
// =============================================================================

#[derive(Debug, Clone, Deserialize)]
pub struct GradeInput {
    pub name: String,
    #[serde(default)]
    pub level: i32,
}

/// # Errors
///
/// Store failures.
pub async fn list_grades(store: &Store) -> Result<Vec<Grade>, StoreError> {
    store
        .find_many::<Grade>(&FindOptions::new().order(OrderBy::asc("level")))
        .await
}

/// # Errors
///
/// Missing name, duplicate name, or store failures.
pub async fn create_grade(store: &Store, input: &GradeInput) -> Result<Grade, DirectoryError> {
    let changes = Changes::new()
        .set("name", required(&input.name, "name")?)
        .set("level", input.level);
    let grade: Grade = store
        .create(&changes)
        .await
        .map_err(|e| DirectoryError::from_store(e, "grade"))?;
    info!(grade_id = %grade.id, name = %grade.name, "grade created");
    Ok(grade)
}

/// Delete a grade and its sections. Students in it become unassigned.
///
/// # Errors
///
/// Missing row or store failures.
pub async fn delete_grade(store: &Store, id: Uuid) -> Result<(), DirectoryError> {
    delete_row::<Grade>(store, id, "grade").await
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct SectionQuery {
    pub grade_id: Option<Uuid>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SectionInput {
    pub grade_id: Uuid,
    pub name: String,
    pub adviser_id: Option<Uuid>,
}

/// # Errors
///
/// Store failures.
pub async fn list_sections(store: &Store, query: &SectionQuery) -> Result<Vec<Section>, StoreError> {
    let mut opts = FindOptions::new().order(OrderBy::asc("name"));
    if let Some(grade_id) = query.grade_id {
        opts = opts.filter(Filter::eq("grade_id", grade_id));
    }
    store.find_many::<Section>(&opts).await
}

/// # Errors
///
/// Missing name, adviser who is not a teacher, unknown grade, duplicate
/// name within the grade, or store failures.
pub async fn create_section(store: &Store, input: &SectionInput) -> Result<Section, DirectoryError> {
    let name = required(&input.name, "name")?;
    if let Some(adviser_id) = input.adviser_id {
        let adviser = store.find_by_id::<User>(adviser_id).await?;
        if adviser.is_none_or(|u| u.role != Role::Teacher) {
            return Err(DirectoryError::AdviserNotTeacher);
        }
    }
    let changes = Changes::new()
        .set("grade_id", input.grade_id)
        .set("name", name)
        .set("adviser_id", input.adviser_id);
    let section: Section = store
        .create(&changes)
        .await
        .map_err(|e| DirectoryError::from_store(e, "section"))?;
    info!(section_id = %section.id, grade_id = %section.grade_id, "section created");
    Ok(section)
}

/// # Errors
///
/// Missing row or store failures.
pub async fn delete_section(store: &Store, id: Uuid) -> Result<(), DirectoryError> {
    delete_row::<Section>(store, id, "section").await
}

// =============================================================================
// CATEGORIES
// =============================================================================

#[derive(Debug, Clone, Default, Deserialize)]
pub struct CategoryQuery {
    pub kind: Option<CategoryKind>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CategoryInput {
    pub name: String,
    pub kind: CategoryKind,
}

/// # Errors
///
/// Store failures.
pub async fn list_categories(store: &Store, query: &CategoryQuery) -> Result<Vec<Category>, StoreError> {
    let mut opts = FindOptions::new().order(OrderBy::asc("name"));
    if let Some(kind) = query.kind {
        opts = opts.filter(Filter::eq("kind", kind.as_str()));
    }
    store.find_many::<Category>(&opts).await
}

/// # Errors
///
/// Missing name, duplicate name for the kind, or store failures.
pub async fn create_category(store: &Store, input: &CategoryInput) -> Result<Category, DirectoryError> {
    let changes = Changes::new()
        .set("name", required(&input.name, "name")?)
        .set("kind", input.kind.as_str());
    let category: Category = store
        .create(&changes)
        .await
        .map_err(|e| DirectoryError::from_store(e, "category"))?;
    info!(category_id = %category.id, kind = category.kind.as_str(), "category created");
    Ok(category)
}

/// Delete a category. Transactions filed under it become uncategorized.
///
/// # Errors
///
/// Missing row or store failures.
pub async fn delete_category(store: &Store, id: Uuid) -> Result<(), DirectoryError> {
    delete_row::<Category>(store, id, "category").await
}

#[cfg(test)]
#[path = "directory_test.rs"]
mod tests;
