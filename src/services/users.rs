//! Account administration for the settings page.
//!
//! Admins list accounts, create staff or parent accounts, and change a
//! user's name, role or active flag. Deactivating an account also drops its
//! sessions so the change takes effect on the next request.

use serde::Deserialize;
use tracing::info;
use uuid::Uuid;

use super::auth::{self, AuthError, NewUser};
use super::{non_blank, paged, session};
use crate::models::{Role, User};
use crate::store::{Changes, Filter, FindOptions, OrderBy, Store, StoreError};

#[derive(Debug, thiserror::Error)]
pub enum UserAdminError {
    #[error("admins cannot remove their own admin role")]
    SelfDemotion,
    #[error("admins cannot deactivate their own account")]
    SelfDeactivation,
    #[error("full name is required")]
    MissingName,
    #[error("user not found")]
    NotFound,
    #[error(transparent)]
    Auth(#[from] AuthError),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for UserAdminError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(e))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserQuery {
    pub role: Option<Role>,
    pub active: Option<bool>,
    pub q: Option<String>,
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl UserQuery {
    #[must_use]
    pub fn filters(&self) -> FindOptions {
        let mut opts = FindOptions::new().order(OrderBy::asc("full_name"));
        if let Some(role) = self.role {
            opts = opts.filter(Filter::eq("role", role.as_str()));
        }
        if let Some(active) = self.active {
            opts = opts.filter(Filter::eq("is_active", active));
        }
        opts
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct UserUpdate {
    pub full_name: Option<String>,
    pub role: Option<Role>,
    pub is_active: Option<bool>,
}

/// Reject changes an admin may not make to their own account.
fn check_self_update(actor: Uuid, target: Uuid, update: &UserUpdate) -> Result<(), UserAdminError> {
    if actor != target {
        return Ok(());
    }
    if update.role.is_some_and(|r| r != Role::Admin) {
        return Err(UserAdminError::SelfDemotion);
    }
    if update.is_active == Some(false) {
        return Err(UserAdminError::SelfDeactivation);
    }
    Ok(())
}

impl UserUpdate {
    fn changes(&self) -> Result<Changes, UserAdminError> {
        let full_name = match &self.full_name {
            Some(name) => Some(non_blank(Some(name.as_str())).ok_or(UserAdminError::MissingName)?),
            None => None,
        };
        Ok(Changes::new()
            .set_opt("full_name", full_name)
            .set_opt("role", self.role.map(Role::as_str))
            .set_opt("is_active", self.is_active))
    }
}

/// # Errors
///
/// Store failures.
pub async fn list(store: &Store, query: &UserQuery) -> Result<Vec<User>, StoreError> {
    let opts = paged(query.filters(), query.page, query.per_page);
    store.search::<User>(query.q.as_deref().unwrap_or(""), &[], &opts).await
}

/// # Errors
///
/// Validation failures, duplicate email, or store failures.
pub async fn create(store: &Store, new_user: &NewUser) -> Result<User, UserAdminError> {
    Ok(auth::create_user(store, new_user).await?)
}

/// Apply `update` to `target` on behalf of the admin `actor`.
///
/// # Errors
///
/// Self-demotion or self-deactivation, missing row, or store failures.
pub async fn update(store: &Store, actor: Uuid, target: Uuid, update: &UserUpdate) -> Result<User, UserAdminError> {
    check_self_update(actor, target, update)?;
    let user = store
        .update::<User>(target, &update.changes()?)
        .await?
        .ok_or(UserAdminError::NotFound)?;

    if !user.is_active {
        let dropped = session::delete_user_sessions(store, user.id).await?;
        info!(user_id = %user.id, sessions = dropped, "user deactivated");
    }
    info!(user_id = %user.id, role = %user.role, active = user.is_active, %actor, "user updated");
    Ok(user)
}

#[cfg(test)]
#[path = "users_test.rs"]
mod tests;
