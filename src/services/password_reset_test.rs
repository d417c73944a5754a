use super::*;

#[test]
fn normalize_reset_token_accepts_generated_tokens() {
    let token = session::generate_token();
    assert_eq!(normalize_reset_token(&token), Some(token.clone()));
    assert_eq!(normalize_reset_token(&format!("  {}  ", token.to_uppercase())), Some(token));
}

#[test]
fn normalize_reset_token_rejects_bad_shapes() {
    assert_eq!(normalize_reset_token(""), None);
    assert_eq!(normalize_reset_token("abc123"), None);
    assert_eq!(normalize_reset_token(&"g".repeat(64)), None);
    assert_eq!(normalize_reset_token(&"a".repeat(65)), None);
}

#[test]
fn hash_reset_token_is_stable_sha256_hex() {
    let a = hash_reset_token("token-a");
    let b = hash_reset_token("token-a");
    let c = hash_reset_token("token-b");
    assert_eq!(a, b);
    assert_ne!(a, c);
    assert_eq!(a.len(), 64);
}

#[test]
fn hash_reset_token_matches_known_digest() {
    assert_eq!(
        hash_reset_token("abc"),
        "ba7816bf8f01cfea414140de5dae2223b00361a396177a9cb410ff61f20015ad"
    );
}

#[test]
fn render_template_injects_email_and_link() {
    let html = render_reset_template("user@example.com", "https://x.test/reset-password?token=abc");
    assert!(html.contains("user@example.com"));
    assert!(html.contains("https://x.test/reset-password?token=abc"));
    assert!(!html.contains("{{EMAIL}}"));
    assert!(!html.contains("{{LINK}}"));
}

#[tokio::test]
async fn confirm_reset_rejects_malformed_token_before_touching_database() {
    let state = crate::state::test_helpers::test_app_state();
    let result = confirm_reset(&state.pool, "not-a-token", "hunter22").await;
    assert!(matches!(result, Err(ResetError::InvalidToken)));
}

#[tokio::test]
async fn confirm_reset_rejects_short_password_before_touching_database() {
    let state = crate::state::test_helpers::test_app_state();
    let token = session::generate_token();
    let result = confirm_reset(&state.pool, &token, "abc").await;
    assert!(matches!(result, Err(ResetError::Account(AccountError::PasswordTooShort))));
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn reset_flow_consumes_token_once_and_revokes_sessions() {
    use crate::state::test_helpers;

    let pool = test_helpers::integration_pool().await;
    let user_id = test_helpers::seed_user(&pool, "reset@example.org").await;
    let session_token = session::create_session(&pool, user_id, 30).await.unwrap();

    assert!(request_reset(&pool, "nobody@example.org").await.unwrap().is_none());

    let first = request_reset(&pool, "Reset@Example.org").await.unwrap().expect("token for known user");
    let second = request_reset(&pool, "reset@example.org").await.unwrap().expect("token for known user");

    // Requesting again discards the earlier token.
    assert!(matches!(confirm_reset(&pool, &first, "new-password").await, Err(ResetError::InvalidToken)));

    let reset_user = confirm_reset(&pool, &second, "new-password").await.unwrap();
    assert_eq!(reset_user, user_id);
    assert!(matches!(confirm_reset(&pool, &second, "other-password").await, Err(ResetError::InvalidToken)));

    assert!(session::validate_session(&pool, &session_token).await.unwrap().is_none());
    assert!(account::authenticate(&pool, "reset@example.org", "new-password").await.is_ok());
}

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn send_reset_link_skips_unknown_email_and_reports_delivery_failure() {
    use crate::config::MailerConfig;
    use crate::state::test_helpers;

    let pool = test_helpers::integration_pool().await;
    test_helpers::seed_user(&pool, "known@example.org").await;
    let config = test_helpers::test_config();
    let mailer = MailerConfig { api_key: "re_invalid".into(), from: "noreply@example.org".into() };

    let unknown = send_reset_link(&pool, &config, &mailer, "unknown@example.org").await;
    assert!(matches!(unknown, Ok(false)));

    let known = send_reset_link(&pool, &config, &mailer, "known@example.org").await;
    assert!(matches!(known, Err(ResetError::EmailDelivery(_))));
}
