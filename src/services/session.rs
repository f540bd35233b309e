//! Session management.
//!
//! ARCHITECTURE
//! ============
//! Signing in creates a random token row in `sessions`; the token travels in
//! an HttpOnly cookie. Validation joins the user so deactivated accounts
//! lose access immediately, and expired rows are ignored.

use std::fmt::Write;

use rand::Rng;
use sqlx::Row;
use tracing::debug;
use uuid::Uuid;

use crate::models::Role;
use crate::store::Store;

pub(crate) fn bytes_to_hex(bytes: &[u8]) -> String {
    let mut s = String::with_capacity(bytes.len() * 2);
    for b in bytes {
        let _ = write!(s, "{b:02x}");
    }
    s
}

/// Generate a cryptographically random 32-byte hex token.
#[must_use]
pub fn generate_token() -> String {
    let bytes: [u8; 32] = rand::rng().random();
    bytes_to_hex(&bytes)
}

/// The signed-in user attached to each authenticated request.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct SessionUser {
    pub id: Uuid,
    pub email: String,
    pub full_name: String,
    pub role: Role,
}

/// Create a session for the given user, returning the token.
///
/// # Errors
///
/// Returns a database error if the insert fails.
pub async fn create_session(store: &Store, user_id: Uuid, ttl_hours: i64) -> Result<String, sqlx::Error> {
    purge_expired(store).await?;
    let token = generate_token();
    let pool = store.pool();
    let token_ref = token.as_str();
    store
        .retry()
        .run("sessions.create", move || async move {
            sqlx::query(
                "INSERT INTO sessions (token, user_id, expires_at)
                 VALUES ($1, $2, now() + make_interval(hours => $3))",
            )
            .bind(token_ref)
            .bind(user_id)
            .bind(i32::try_from(ttl_hours).unwrap_or(i32::MAX))
            .execute(pool)
            .await
        })
        .await?;
    Ok(token)
}

/// Remove expired sessions. Runs on every sign-in so the table stays bounded
/// by the number of live sessions.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn purge_expired(store: &Store) -> Result<u64, sqlx::Error> {
    let pool = store.pool();
    let result = store
        .retry()
        .run("sessions.purge_expired", move || async move {
            sqlx::query("DELETE FROM sessions WHERE expires_at <= now()")
                .execute(pool)
                .await
        })
        .await?;
    let purged = result.rows_affected();
    if purged > 0 {
        debug!(purged, "expired sessions removed");
    }
    Ok(purged)
}

/// Validate a session token and return the associated active user.
///
/// # Errors
///
/// Returns a database error if the lookup fails.
pub async fn validate_session(store: &Store, token: &str) -> Result<Option<SessionUser>, sqlx::Error> {
    let pool = store.pool();
    let row = store
        .retry()
        .run("sessions.validate", move || async move {
            sqlx::query(
                r"SELECT u.id, u.email, u.full_name, u.role
                  FROM sessions s
                  JOIN users u ON u.id = s.user_id
                  WHERE s.token = $1 AND s.expires_at > now() AND u.is_active",
            )
            .bind(token)
            .fetch_optional(pool)
            .await
        })
        .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let role: String = row.try_get("role")?;
    let Some(role) = Role::parse(&role) else {
        tracing::warn!(%role, "session user has unknown role; treating as signed out");
        return Ok(None);
    };
    Ok(Some(SessionUser {
        id: row.try_get("id")?,
        email: row.try_get("email")?,
        full_name: row.try_get("full_name")?,
        role,
    }))
}

/// Delete a session by token.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_session(store: &Store, token: &str) -> Result<(), sqlx::Error> {
    let pool = store.pool();
    store
        .retry()
        .run("sessions.delete", move || async move {
            sqlx::query("DELETE FROM sessions WHERE token = $1")
                .bind(token)
                .execute(pool)
                .await
        })
        .await?;
    Ok(())
}

/// Sign a user out everywhere. Used when an account is deactivated.
///
/// # Errors
///
/// Returns a database error if the delete fails.
pub async fn delete_user_sessions(store: &Store, user_id: Uuid) -> Result<u64, sqlx::Error> {
    let pool = store.pool();
    let result = store
        .retry()
        .run("sessions.delete_user", move || async move {
            sqlx::query("DELETE FROM sessions WHERE user_id = $1")
                .bind(user_id)
                .execute(pool)
                .await
        })
        .await?;
    Ok(result.rows_affected())
}

#[cfg(test)]
#[path = "session_test.rs"]
mod tests;
