use super::*;
use crate::state::test_helpers;

// =============================================================================
// normalize_email
// =============================================================================

#[test]
fn normalize_email_lowercases_and_trims() {
    assert_eq!(normalize_email("  Treasurer@School.ORG "), Some("treasurer@school.org".into()));
}

#[test]
fn normalize_email_rejects_malformed() {
    for bad in ["", "no-at-sign", "@school.org", "user@", "a@b@c"] {
        assert_eq!(normalize_email(bad), None, "expected rejection for {bad:?}");
    }
}

// =============================================================================
// hashing
// =============================================================================

#[test]
fn hash_and_verify_round_trip() {
    let hash = hash_password("correct-horse-battery").unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(verify_password("correct-horse-battery", &hash));
    assert!(!verify_password("wrong-password", &hash));
}

#[test]
fn hashes_are_salted() {
    let a = hash_password("same-password").unwrap();
    let b = hash_password("same-password").unwrap();
    assert_ne!(a, b);
}

#[test]
fn malformed_hash_never_verifies() {
    assert!(!verify_password("anything", "not-a-phc-string"));
}

#[test]
fn unknown_accounts_verify_against_a_real_argon2_hash() {
    let hash = DUMMY_HASH.as_deref().unwrap();
    assert!(hash.starts_with("$argon2"));
    assert!(PasswordHash::new(hash).is_ok());
    assert!(!verify_password("correct-horse-battery", hash));
}

#[test]
fn password_length_rule() {
    assert!(matches!(check_password("short"), Err(AuthError::WeakPassword)));
    assert!(check_password("long-enough").is_ok());
}

#[test]
fn name_is_trimmed_and_required() {
    assert_eq!(check_name("  Maria Santos ").unwrap(), "Maria Santos");
    assert!(matches!(check_name("   "), Err(AuthError::MissingName)));
}

// =============================================================================
// validation happens before any database call
// =============================================================================

#[tokio::test]
async fn login_with_malformed_email_is_invalid_credentials() {
    let state = test_helpers::test_app_state();
    let err = login(&state.store, "nobody", "whatever", 1).await.unwrap_err();
    assert!(matches!(err, AuthError::InvalidCredentials));
}

#[tokio::test]
async fn register_rejects_weak_password_without_touching_db() {
    let state = test_helpers::test_app_state();
    let err = register_parent(&state.store, "mom@example.com", "Maria", "123")
        .await
        .unwrap_err();
    assert!(matches!(err, AuthError::WeakPassword));
}

#[tokio::test]
async fn create_user_rejects_bad_email() {
    let state = test_helpers::test_app_state();
    let new_user = NewUser {
        email: "not-an-email".into(),
        full_name: "Teacher".into(),
        role: Role::Teacher,
        password: "long-enough-pw".into(),
    };
    assert!(matches!(create_user(&state.store, &new_user).await, Err(AuthError::InvalidEmail)));
}

#[test]
fn invalid_credentials_message_is_generic() {
    assert_eq!(AuthError::InvalidCredentials.to_string(), "invalid email or password");
}
