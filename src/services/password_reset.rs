//! Password reset by emailed link.
//!
//! Creates single-use one-hour tokens for a user's email, stores only their
//! SHA-256 hash, and consumes them to set a new password.

use resend_rs::Resend;
use resend_rs::types::CreateEmailBaseOptions;
use sha2::{Digest, Sha256};
use sqlx::{PgPool, Row};
use uuid::Uuid;

use super::account::{self, AccountError};
use super::session;
use crate::config::{AppConfig, MailerConfig};

const TOKEN_HEX_LEN: usize = 64;
const PASSWORD_RESET_TEMPLATE: &str = include_str!("../../templates/password_reset.html");

#[derive(Debug, thiserror::Error)]
pub enum ResetError {
    #[error("invalid email")]
    InvalidEmail,
    #[error("reset link is invalid or has expired")]
    InvalidToken,
    #[error(transparent)]
    Account(#[from] AccountError),
    #[error("database error: {0}")]
    Db(#[from] sqlx::Error),
    #[error("email delivery failed: {0}")]
    EmailDelivery(String),
}

#[must_use]
pub fn normalize_reset_token(token: &str) -> Option<String> {
    let normalized = token.trim().to_ascii_lowercase();
    if normalized.len() != TOKEN_HEX_LEN || !normalized.chars().all(|c| c.is_ascii_hexdigit()) {
        return None;
    }
    Some(normalized)
}

#[must_use]
pub fn hash_reset_token(token: &str) -> String {
    let mut hasher = Sha256::new();
    hasher.update(token.as_bytes());
    session::bytes_to_hex(&hasher.finalize())
}

/// Issue a reset token for `email`.
///
/// Returns `Ok(None)` when no account uses that email so callers can answer
/// identically either way. Earlier unconsumed tokens for the user are
/// discarded.
///
/// # Errors
///
/// Returns [`ResetError::InvalidEmail`] for a malformed address or a
/// database error.
pub async fn request_reset(pool: &PgPool, email: &str) -> Result<Option<String>, ResetError> {
    let normalized = account::normalize_email(email).ok_or(ResetError::InvalidEmail)?;

    let Some(user_row) = sqlx::query("SELECT id FROM users WHERE email = $1")
        .bind(&normalized)
        .fetch_optional(pool)
        .await?
    else {
        return Ok(None);
    };
    let user_id: Uuid = user_row.get("id");

    sqlx::query("DELETE FROM password_resets WHERE user_id = $1 AND consumed_at IS NULL")
        .bind(user_id)
        .execute(pool)
        .await?;

    let token = session::generate_token();
    sqlx::query("INSERT INTO password_resets (id, user_id, token_hash) VALUES ($1, $2, $3)")
        .bind(Uuid::new_v4())
        .bind(user_id)
        .bind(hash_reset_token(&token))
        .execute(pool)
        .await?;

    Ok(Some(token))
}

/// Consume `token` and set `new_password`. All of the user's sessions are
/// revoked. Returns the user id.
///
/// # Errors
///
/// Returns [`ResetError::InvalidToken`] for unknown, expired or used tokens,
/// a password validation error, or a database error.
pub async fn confirm_reset(pool: &PgPool, token: &str, new_password: &str) -> Result<Uuid, ResetError> {
    let token = normalize_reset_token(token).ok_or(ResetError::InvalidToken)?;
    account::validate_password(new_password)?;
    let password_hash = account::hash_password(new_password).await?;

    let mut tx = pool.begin().await?;

    let user_id: Uuid = sqlx::query_scalar(
        r"UPDATE password_resets
          SET consumed_at = now()
          WHERE token_hash = $1
            AND consumed_at IS NULL
            AND expires_at > now()
          RETURNING user_id",
    )
    .bind(hash_reset_token(&token))
    .fetch_optional(&mut *tx)
    .await?
    .ok_or(ResetError::InvalidToken)?;

    sqlx::query("UPDATE users SET password_hash = $2 WHERE id = $1")
        .bind(user_id)
        .bind(password_hash)
        .execute(&mut *tx)
        .await?;
    session::revoke_user_sessions(&mut *tx, user_id, None).await?;

    tx.commit().await?;
    Ok(user_id)
}

/// Issue a token for `email` and mail the link. Returns `false` when no
/// account uses that email, in which case nothing is sent.
///
/// # Errors
///
/// Returns a database error or [`ResetError::EmailDelivery`].
pub async fn send_reset_link(
    pool: &PgPool,
    config: &AppConfig,
    mailer: &MailerConfig,
    email: &str,
) -> Result<bool, ResetError> {
    let Some(token) = request_reset(pool, email).await? else {
        return Ok(false);
    };
    let link = config.password_reset_url(&token);
    send_reset_email(mailer, email, &link).await?;
    Ok(true)
}

pub async fn send_reset_email(mailer: &MailerConfig, to_email: &str, link: &str) -> Result<(), ResetError> {
    let resend = Resend::new(&mailer.api_key);
    let to = [to_email];
    let subject = "Reset your GrantGuardian password";
    let html = render_reset_template(to_email, link);

    let email = CreateEmailBaseOptions::new(&mailer.from, to, subject).with_html(&html);
    resend
        .emails
        .send(email)
        .await
        .map_err(|e| ResetError::EmailDelivery(e.to_string()))?;
    Ok(())
}

#[must_use]
pub fn render_reset_template(email: &str, link: &str) -> String {
    PASSWORD_RESET_TEMPLATE
        .replace("{{EMAIL}}", email)
        .replace("{{LINK}}", link)
}

#[cfg(test)]
#[path = "password_reset_test.rs"]
mod tests;
