//! Account service: password hashing, sign-in, parent self-registration and
//! staff account creation.

use std::sync::LazyLock;

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;
use tracing::info;

use super::session;
use crate::models::{Role, User};
use crate::store::{Changes, Filter, FindOptions, Store, StoreError};

pub const MIN_PASSWORD_LEN: usize = 8;

#[derive(Debug, thiserror::Error)]
pub enum AuthError {
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("invalid email")]
    InvalidEmail,
    #[error("password must be at least {MIN_PASSWORD_LEN} characters")]
    WeakPassword,
    #[error("full name is required")]
    MissingName,
    #[error("an account with this email already exists")]
    EmailTaken,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl From<sqlx::Error> for AuthError {
    fn from(e: sqlx::Error) -> Self {
        Self::Store(StoreError::Database(e))
    }
}

// =============================================================================
// NORMALIZATION / HASHING
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    let (local, domain) = normalized.split_once('@')?;
    if local.is_empty() || domain.is_empty() || domain.contains('@') {
        return None;
    }
    Some(normalized)
}

/// Hash a password with argon2id into a PHC string.
///
/// # Errors
///
/// Returns [`AuthError::Hash`] if the hasher fails.
pub fn hash_password(password: &str) -> Result<String, AuthError> {
    let salt = SaltString::generate(&mut OsRng);
    Argon2::default()
        .hash_password(password.as_bytes(), &salt)
        .map(|hash| hash.to_string())
        .map_err(|e| AuthError::Hash(e.to_string()))
}

/// Check a password against a stored PHC hash. Malformed hashes never match.
#[must_use]
pub fn verify_password(password: &str, hash: &str) -> bool {
    let Ok(parsed) = PasswordHash::new(hash) else {
        return false;
    };
    Argon2::default()
        .verify_password(password.as_bytes(), &parsed)
        .is_ok()
}

/// Checked when no account matches, so an unknown email costs the same
/// argon2 work as a wrong password.
static DUMMY_HASH: LazyLock<Option<String>> = LazyLock::new(|| hash_password("no-such-account").ok());

fn verify_against_dummy(password: &str) {
    if let Some(hash) = DUMMY_HASH.as_deref() {
        let _ = verify_password(password, hash);
    }
}

fn check_password(password: &str) -> Result<(), AuthError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AuthError::WeakPassword);
    }
    Ok(())
}

fn check_name(full_name: &str) -> Result<String, AuthError> {
    let name = full_name.trim();
    if name.is_empty() {
        return Err(AuthError::MissingName);
    }
    Ok(name.to_owned())
}

// =============================================================================
// LOOKUPS
// =============================================================================

/// Find a user by (normalized) email.
///
/// # Errors
///
/// Database failures.
pub async fn find_user_by_email(store: &Store, email: &str) -> Result<Option<User>, StoreError> {
    let opts = FindOptions {
        filters: vec![Filter::eq("email", email)],
        limit: Some(1),
        ..FindOptions::default()
    };
    Ok(store.find_many::<User>(&opts).await?.into_iter().next())
}

// =============================================================================
// SIGN-IN
// =============================================================================

/// Verify credentials and open a session. Returns the user and session token.
///
/// Unknown email, inactive account and wrong password all produce
/// [`AuthError::InvalidCredentials`].
///
/// # Errors
///
/// Invalid credentials or database failures.
pub async fn login(store: &Store, email: &str, password: &str, ttl_hours: i64) -> Result<(User, String), AuthError> {
    let email = normalize_email(email).ok_or(AuthError::InvalidCredentials)?;
    let Some(user) = find_user_by_email(store, &email).await? else {
        verify_against_dummy(password);
        return Err(AuthError::InvalidCredentials);
    };
    let password_ok = verify_password(password, &user.password_hash);
    if !user.is_active || !password_ok {
        return Err(AuthError::InvalidCredentials);
    }

    let token = session::create_session(store, user.id, ttl_hours).await?;
    info!(user_id = %user.id, role = %user.role, "login succeeded");
    Ok((user, token))
}

// =============================================================================
// ACCOUNTS
// =============================================================================

#[derive(Debug, Clone)]
pub struct NewUser {
    pub email: String,
    pub full_name: String,
    pub role: Role,
    pub password: String,
}

/// Create an account with any role. Used by admins from the settings page.
///
/// # Errors
///
/// Validation failures, duplicate email, or database failures.
pub async fn create_user(store: &Store, new_user: &NewUser) -> Result<User, AuthError> {
    let email = normalize_email(&new_user.email).ok_or(AuthError::InvalidEmail)?;
    let full_name = check_name(&new_user.full_name)?;
    check_password(&new_user.password)?;
    let password_hash = hash_password(&new_user.password)?;

    let changes = Changes::new()
        .set("email", email)
        .set("full_name", full_name)
        .set("role", new_user.role.as_str())
        .set("password_hash", password_hash);
    match store.create::<User>(&changes).await {
        Ok(user) => {
            info!(user_id = %user.id, role = %user.role, "user created");
            Ok(user)
        }
        Err(e) if e.is_unique_violation() => Err(AuthError::EmailTaken),
        Err(e) => Err(e.into()),
    }
}

/// Self-service sign-up. Always creates a `parent` account and links it to
/// a parent profile: an unlinked profile with the same email is claimed,
/// otherwise a new profile is created. Both writes share one transaction.
///
/// # Errors
///
/// Validation failures, duplicate email, or database failures.
pub async fn register_parent(store: &Store, email: &str, full_name: &str, password: &str) -> Result<User, AuthError> {
    let email = normalize_email(email).ok_or(AuthError::InvalidEmail)?;
    let full_name = check_name(full_name)?;
    check_password(password)?;
    let password_hash = hash_password(password)?;

    let pool = store.pool();
    let (email_ref, name_ref, hash_ref) = (email.as_str(), full_name.as_str(), password_hash.as_str());
    let result = store
        .retry()
        .run("users.register_parent", move || async move {
            let mut tx = pool.begin().await?;
            let user: User = sqlx::query_as(
                "INSERT INTO users (email, full_name, role, password_hash)
                 VALUES ($1, $2, 'parent', $3)
                 RETURNING *",
            )
            .bind(email_ref)
            .bind(name_ref)
            .bind(hash_ref)
            .fetch_one(&mut *tx)
            .await?;

            let claimed = sqlx::query(
                "UPDATE parents SET user_id = $1, updated_at = now()
                 WHERE lower(email) = $2 AND user_id IS NULL",
            )
            .bind(user.id)
            .bind(email_ref)
            .execute(&mut *tx)
            .await?;

            if claimed.rows_affected() == 0 {
                sqlx::query("INSERT INTO parents (user_id, full_name, email) VALUES ($1, $2, $3)")
                    .bind(user.id)
                    .bind(name_ref)
                    .bind(email_ref)
                    .execute(&mut *tx)
                    .await?;
            }
            tx.commit().await?;
            Ok::<User, sqlx::Error>(user)
        })
        .await;

    match result.map_err(StoreError::from) {
        Ok(user) => {
            info!(user_id = %user.id, "parent registered");
            Ok(user)
        }
        Err(e) if e.is_unique_violation() => Err(AuthError::EmailTaken),
        Err(e) => Err(e.into()),
    }
}

/// Create the first admin account when none exists yet.
///
/// # Errors
///
/// Validation or database failures.
pub async fn bootstrap_admin(store: &Store, email: &str, password: &str) -> Result<bool, AuthError> {
    let admins = store.count::<User>(&[Filter::eq("role", Role::Admin.as_str())]).await?;
    if admins > 0 {
        return Ok(false);
    }
    let new_user = NewUser {
        email: email.to_owned(),
        full_name: "Administrator".into(),
        role: Role::Admin,
        password: password.to_owned(),
    };
    create_user(store, &new_user).await?;
    Ok(true)
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
