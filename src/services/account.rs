//! Password identity: sign-up, login, profile and password changes.
//!
//! DESIGN
//! ======
//! Passwords are hashed with bcrypt on the blocking thread pool so a login
//! burst does not stall the async workers. Emails are normalized once at the
//! edge (trim + lowercase) and stored in that form, which makes the unique
//! index on `users.email` case-insensitive in practice.

use serde::Deserialize;
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::session::{self, SessionUser};

pub const MIN_PASSWORD_LEN: usize = 6;

#[derive(Debug, thiserror::Error)]
pub enum AccountError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("Password must be at least 6 characters")]
    PasswordTooShort,
    #[error("New passwords do not match")]
    PasswordMismatch,
    #[error("first and last name are required")]
    NameRequired,
    #[error("email already registered")]
    EmailTaken,
    #[error("invalid email or password")]
    InvalidCredentials,
    #[error("current password is incorrect")]
    CurrentPasswordIncorrect,
    #[error("password hashing failed: {0}")]
    Hash(String),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Deserialize)]
pub struct SignupInput {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ProfileInput {
    pub first_name: String,
    pub last_name: String,
    pub email: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PasswordChangeInput {
    #[serde(default)]
    pub current_password: Option<String>,
    pub new_password: String,
    pub confirm_password: String,
}

// =============================================================================
// VALIDATION
// =============================================================================

#[must_use]
pub fn normalize_email(email: &str) -> Option<String> {
    let normalized = email.trim().to_ascii_lowercase();
    if normalized.is_empty() || !normalized.contains('@') {
        return None;
    }
    let parts = normalized.split('@').collect::<Vec<_>>();
    if parts.len() != 2 || parts[0].is_empty() || parts[1].is_empty() {
        return None;
    }
    Some(normalized)
}

/// Enforce the minimum password length.
///
/// # Errors
///
/// Returns [`AccountError::PasswordTooShort`] below [`MIN_PASSWORD_LEN`] characters.
pub fn validate_password(password: &str) -> Result<(), AccountError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(AccountError::PasswordTooShort);
    }
    Ok(())
}

/// Check a new password and its confirmation, mismatch first.
///
/// # Errors
///
/// Returns [`AccountError::PasswordMismatch`] or [`AccountError::PasswordTooShort`].
pub fn validate_new_password(new_password: &str, confirm_password: &str) -> Result<(), AccountError> {
    if new_password != confirm_password {
        return Err(AccountError::PasswordMismatch);
    }
    validate_password(new_password)
}

fn clean_name(value: Option<&str>) -> String {
    value.map(str::trim).unwrap_or_default().to_owned()
}

pub(crate) fn is_unique_violation(err: &sqlx::Error) -> bool {
    matches!(err, sqlx::Error::Database(db) if db.is_unique_violation())
}

// =============================================================================
// HASHING
// =============================================================================

pub async fn hash_password(password: &str) -> Result<String, AccountError> {
    let password = password.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::hash(password, bcrypt::DEFAULT_COST))
        .await
        .map_err(|e| AccountError::Hash(e.to_string()))?
        .map_err(|e| AccountError::Hash(e.to_string()))
}

pub async fn verify_password(password: &str, hash: &str) -> Result<bool, AccountError> {
    let password = password.to_owned();
    let hash = hash.to_owned();
    tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(|e| AccountError::Hash(e.to_string()))?
        .map_err(|e| AccountError::Hash(e.to_string()))
}

// =============================================================================
// OPERATIONS
// =============================================================================

/// Register a new user.
///
/// # Errors
///
/// Returns a validation error for a malformed email or short password,
/// [`AccountError::EmailTaken`] for a duplicate, or a database error.
pub async fn signup(pool: &PgPool, input: &SignupInput) -> Result<SessionUser, AccountError> {
    let email = normalize_email(&input.email).ok_or(AccountError::InvalidEmail)?;
    validate_password(&input.password)?;
    let password_hash = hash_password(&input.password).await?;

    let user = SessionUser {
        id: Uuid::new_v4(),
        email,
        first_name: clean_name(input.first_name.as_deref()),
        last_name: clean_name(input.last_name.as_deref()),
    };

    sqlx::query(
        "INSERT INTO users (id, email, password_hash, first_name, last_name)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user.id)
    .bind(&user.email)
    .bind(password_hash)
    .bind(&user.first_name)
    .bind(&user.last_name)
    .execute(pool)
    .await
    .map_err(|e| if is_unique_violation(&e) { AccountError::EmailTaken } else { AccountError::Db(e) })?;

    Ok(user)
}

/// Verify email + password. Unknown emails and wrong passwords are
/// indistinguishable to the caller.
///
/// # Errors
///
/// Returns [`AccountError::InvalidCredentials`] on any mismatch.
pub async fn authenticate(pool: &PgPool, email: &str, password: &str) -> Result<SessionUser, AccountError> {
    let email = normalize_email(email).ok_or(AccountError::InvalidCredentials)?;

    let row = sqlx::query("SELECT id, email, password_hash, first_name, last_name FROM users WHERE email = $1")
        .bind(&email)
        .fetch_optional(pool)
        .await?
        .ok_or(AccountError::InvalidCredentials)?;

    let hash: String = row.get("password_hash");
    if !verify_password(password, &hash).await? {
        return Err(AccountError::InvalidCredentials);
    }

    Ok(SessionUser {
        id: row.get("id"),
        email: row.get("email"),
        first_name: row.get("first_name"),
        last_name: row.get("last_name"),
    })
}

/// The caller as the profile page shows them. Names come from the
/// membership row when one exists, since onboarding may override them there,
/// and from the user row otherwise.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn load_profile(pool: &PgPool, user: &SessionUser) -> Result<SessionUser, AccountError> {
    let (first_name, last_name): (String, String) = sqlx::query_as(
        r"SELECT COALESCE(p.first_name, u.first_name), COALESCE(p.last_name, u.last_name)
          FROM users u
          LEFT JOIN user_profiles p ON p.id = u.id
          WHERE u.id = $1",
    )
    .bind(user.id)
    .fetch_one(pool)
    .await?;

    Ok(SessionUser { id: user.id, email: user.email.clone(), first_name, last_name })
}

/// Update own names (user row and membership row) and, if changed, email.
///
/// # Errors
///
/// Returns a validation error, [`AccountError::EmailTaken`], or a database error.
pub async fn update_profile(pool: &PgPool, user: &SessionUser, input: &ProfileInput) -> Result<SessionUser, AccountError> {
    let first_name = input.first_name.trim();
    let last_name = input.last_name.trim();
    if first_name.is_empty() || last_name.is_empty() {
        return Err(AccountError::NameRequired);
    }
    let email = normalize_email(&input.email).ok_or(AccountError::InvalidEmail)?;

    let mut tx = pool.begin().await?;

    sqlx::query("UPDATE users SET first_name = $2, last_name = $3, email = $4 WHERE id = $1")
        .bind(user.id)
        .bind(first_name)
        .bind(last_name)
        .bind(&email)
        .execute(&mut *tx)
        .await
        .map_err(|e| if is_unique_violation(&e) { AccountError::EmailTaken } else { AccountError::Db(e) })?;

    sqlx::query("UPDATE user_profiles SET first_name = $2, last_name = $3 WHERE id = $1")
        .bind(user.id)
        .bind(first_name)
        .bind(last_name)
        .execute(&mut *tx)
        .await?;

    tx.commit().await?;

    if email != user.email {
        tracing::info!(user_id = %user.id, "account email changed");
    }

    Ok(SessionUser { id: user.id, email, first_name: first_name.to_owned(), last_name: last_name.to_owned() })
}

/// Replace the caller's password. Other sessions are revoked; the session
/// identified by `keep_token` stays valid.
///
/// # Errors
///
/// Returns a validation error, [`AccountError::CurrentPasswordIncorrect`],
/// or a database error.
pub async fn change_password(
    pool: &PgPool,
    user: &SessionUser,
    keep_token: &str,
    input: &PasswordChangeInput,
) -> Result<(), AccountError> {
    validate_new_password(&input.new_password, &input.confirm_password)?;

    if let Some(current) = input.current_password.as_deref().filter(|p| !p.is_empty()) {
        let hash: String = sqlx::query_scalar("SELECT password_hash FROM users WHERE id = $1")
            .bind(user.id)
            .fetch_one(pool)
            .await?;
        if !verify_password(current, &hash).await? {
            return Err(AccountError::CurrentPasswordIncorrect);
        }
    }

    let password_hash = hash_password(&input.new_password).await?;

    let mut tx = pool.begin().await?;
    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user.id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;
    let revoked = session::revoke_user_sessions(&mut *tx, user.id, Some(keep_token)).await?;
    tx.commit().await?;

    tracing::info!(user_id = %user.id, revoked, "password changed");
    Ok(())
}

#[cfg(test)]
#[path = "account_test.rs"]
mod tests;
