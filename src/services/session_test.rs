use super::*;

// =============================================================================
// bytes_to_hex
// =============================================================================

#[test]
fn bytes_to_hex_empty() {
    assert_eq!(bytes_to_hex(&[]), "");
}

#[test]
fn bytes_to_hex_leading_zero() {
    assert_eq!(bytes_to_hex(&[0x0a]), "0a");
}

#[test]
fn bytes_to_hex_multi_byte() {
    assert_eq!(bytes_to_hex(&[0xde, 0xad, 0xbe, 0xef]), "deadbeef");
}

// =============================================================================
// generate_token
// =============================================================================

#[test]
fn generate_token_is_64_hex_chars() {
    let token = generate_token();
    assert_eq!(token.len(), 64);
    assert!(token.chars().all(|c| c.is_ascii_hexdigit()));
}

#[test]
fn generate_token_two_calls_differ() {
    assert_ne!(generate_token(), generate_token());
}

// =============================================================================
// SessionUser
// =============================================================================

#[test]
fn session_user_serializes_profile_fields() {
    let user = SessionUser {
        id: Uuid::nil(),
        email: "alice@example.org".into(),
        first_name: "Alice".into(),
        last_name: "Ng".into(),
    };
    let json = serde_json::to_value(&user).unwrap();
    assert_eq!(json["email"], "alice@example.org");
    assert_eq!(json["first_name"], "Alice");
    assert_eq!(json["last_name"], "Ng");
    assert_eq!(json["id"], "00000000-0000-0000-0000-000000000000");
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
#[tokio::test]
#[ignore = "requires TEST_DATABASE_URL/live Postgres"]
async fn session_lifecycle_create_validate_revoke() {
    use crate::state::test_helpers;

    let pool = test_helpers::integration_pool().await;
    let user_id = test_helpers::seed_user(&pool, "sessions@example.org").await;

    let keep = create_session(&pool, user_id, 30).await.unwrap();
    let other = create_session(&pool, user_id, 30).await.unwrap();

    let user = validate_session(&pool, &keep).await.unwrap().expect("session should be valid");
    assert_eq!(user.id, user_id);
    assert_eq!(user.email, "sessions@example.org");

    let revoked = revoke_user_sessions(&pool, user_id, Some(&keep)).await.unwrap();
    assert_eq!(revoked, 1);
    assert!(validate_session(&pool, &other).await.unwrap().is_none());
    assert!(validate_session(&pool, &keep).await.unwrap().is_some());

    delete_session(&pool, &keep).await.unwrap();
    assert!(validate_session(&pool, &keep).await.unwrap().is_none());
}
