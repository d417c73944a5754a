use super::*;

fn user(first: &str, last: &str) -> SessionUser {
    SessionUser { id: Uuid::new_v4(), email: "someone@example.org".into(), first_name: first.into(), last_name: last.into() }
}

// =============================================================================
// Role
// =============================================================================

#[test]
fn role_parse_round_trips_known_values() {
    for role in [Role::Admin, Role::Staff, Role::Viewer] {
        assert_eq!(Role::parse(role.as_str()), Some(role));
    }
}

#[test]
fn role_parse_is_case_sensitive_and_strict() {
    assert_eq!(Role::parse("Admin"), None);
    assert_eq!(Role::parse("owner"), None);
    assert_eq!(Role::parse(""), None);
}

#[test]
fn role_permissions() {
    assert!(Role::Admin.is_admin());
    assert!(!Role::Staff.is_admin());
    assert!(Role::Admin.can_edit_grants());
    assert!(Role::Staff.can_edit_grants());
    assert!(!Role::Viewer.can_edit_grants());
}

#[test]
fn role_serializes_lowercase() {
    assert_eq!(serde_json::to_value(Role::Viewer).unwrap(), "viewer");
}

#[test]
fn role_from_db_rejects_unknown_value() {
    assert!(matches!(role_from_db("superuser"), Err(sqlx::Error::Decode(_))));
    assert_eq!(role_from_db("staff").unwrap(), Role::Staff);
}

// =============================================================================
// invite codes
// =============================================================================

#[test]
fn generate_invite_code_shape() {
    let code = generate_invite_code();
    assert_eq!(code.len(), INVITE_CODE_LEN);
    assert!(code.chars().all(|c| INVITE_CODE_ALPHABET.contains(&(c as u8))));
}

#[test]
fn generate_invite_code_two_calls_differ() {
    assert_ne!(generate_invite_code(), generate_invite_code());
}

#[test]
fn invite_code_match_is_exact() {
    assert!(invite_code_matches("ABCD2345", "ABCD2345"));
    assert!(!invite_code_matches("ABCD2345", "abcd2345"));
    assert!(!invite_code_matches("ABCD2345", " ABCD2345"));
    assert!(!invite_code_matches("ABCD2345", ""));
    assert!(!invite_code_matches("", ""));
}

// =============================================================================
// profile names
// =============================================================================

#[test]
fn profile_name_prefers_non_blank_override() {
    assert_eq!(profile_name(Some(" Rosa "), "Ana"), "Rosa");
    assert_eq!(profile_name(Some("   "), "Ana"), "Ana");
    assert_eq!(profile_name(None, "Ana"), "Ana");
}

#[tokio::test]
async fn create_organization_rejects_blank_name_before_touching_database() {
    let state = crate::state::test_helpers::test_app_state();
    let input = CreateOrganizationInput { name: "   ".into(), first_name: None, last_name: None };
    let result = create_organization(&state.pool, &user("A", "B"), &input).await;
    assert!(matches!(result, Err(OrgError::NameRequired)));
}

#[test]
fn invalid_invite_code_message_is_exact() {
    assert_eq!(OrgError::InvalidInviteCode.to_string(), "Invalid invite code");
}

// =============================================================================
// LIVE DB
// =============================================================================

#[cfg(feature = "live-db-tests")]
mod live {
    use super::*;
    use crate::state::test_helpers;

    async fn session_user(pool: &PgPool, email: &str) -> SessionUser {
        let id = test_helpers::seed_user(pool, email).await;
        SessionUser { id, email: email.into(), first_name: "Test".into(), last_name: "User".into() }
    }

    async fn count(pool: &PgPool, sql: &str) -> i64 {
        sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn create_organization_writes_one_org_and_one_admin_profile() {
        let pool = test_helpers::integration_pool().await;
        let founder = session_user(&pool, "founder@example.org").await;

        let membership = create_organization(
            &pool,
            &founder,
            &CreateOrganizationInput { name: "United Way".into(), first_name: None, last_name: None },
        )
        .await
        .unwrap();

        assert_eq!(membership.role, Role::Admin);
        assert_eq!(membership.organization_name, "United Way");
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM organizations").await, 1);
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM user_profiles").await, 1);

        let loaded = load_membership(&pool, founder.id).await.unwrap().expect("membership");
        assert_eq!(loaded.organization_id, membership.organization_id);
        assert_eq!(loaded.role, Role::Admin);

        let code: String = sqlx::query_scalar("SELECT invite_code FROM organizations WHERE id = $1")
            .bind(membership.organization_id)
            .fetch_one(&pool)
            .await
            .unwrap();
        assert_eq!(code.len(), INVITE_CODE_LEN);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn failed_profile_insert_rolls_back_new_organization() {
        let pool = test_helpers::integration_pool().await;
        let founder = session_user(&pool, "twice@example.org").await;
        let input = CreateOrganizationInput { name: "First".into(), first_name: None, last_name: None };
        create_organization(&pool, &founder, &input).await.unwrap();

        let second = CreateOrganizationInput { name: "Second".into(), first_name: None, last_name: None };
        let result = create_organization(&pool, &founder, &second).await;
        assert!(matches!(result, Err(OrgError::AlreadyMember)));
        assert_eq!(count(&pool, "SELECT COUNT(*) FROM organizations").await, 1);
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn join_with_wrong_code_creates_no_profile() {
        let pool = test_helpers::integration_pool().await;
        let founder = session_user(&pool, "admin@example.org").await;
        let joiner = session_user(&pool, "joiner@example.org").await;
        let org = create_organization(
            &pool,
            &founder,
            &CreateOrganizationInput { name: "Shelter".into(), first_name: None, last_name: None },
        )
        .await
        .unwrap();

        let result = join_organization(
            &pool,
            &joiner,
            &JoinOrganizationInput {
                organization_id: org.organization_id,
                invite_code: "WRONG123".into(),
                first_name: None,
                last_name: None,
            },
        )
        .await;
        let err = result.unwrap_err();
        assert!(matches!(err, OrgError::InvalidInviteCode));
        assert_eq!(err.to_string(), "Invalid invite code");
        assert!(load_membership(&pool, joiner.id).await.unwrap().is_none());

        let missing = join_organization(
            &pool,
            &joiner,
            &JoinOrganizationInput {
                organization_id: Uuid::new_v4(),
                invite_code: "WRONG123".into(),
                first_name: None,
                last_name: None,
            },
        )
        .await;
        assert!(matches!(missing, Err(OrgError::InvalidInviteCode)));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn join_with_correct_code_creates_staff_profile() {
        let pool = test_helpers::integration_pool().await;
        let founder = session_user(&pool, "boss@example.org").await;
        let joiner = session_user(&pool, "new@example.org").await;
        let org = create_organization(
            &pool,
            &founder,
            &CreateOrganizationInput { name: "Food Bank".into(), first_name: None, last_name: None },
        )
        .await
        .unwrap();
        let code: String = sqlx::query_scalar("SELECT invite_code FROM organizations WHERE id = $1")
            .bind(org.organization_id)
            .fetch_one(&pool)
            .await
            .unwrap();

        let joined = join_organization(
            &pool,
            &joiner,
            &JoinOrganizationInput {
                organization_id: org.organization_id,
                invite_code: code.clone(),
                first_name: Some("Nia".into()),
                last_name: None,
            },
        )
        .await
        .unwrap();
        assert_eq!(joined.role, Role::Staff);
        assert_eq!(joined.organization_id, org.organization_id);
        assert_eq!(joined.organization_name, "Food Bank");

        let (first, last): (String, String) =
            sqlx::query_as("SELECT first_name, last_name FROM user_profiles WHERE id = $1")
                .bind(joiner.id)
                .fetch_one(&pool)
                .await
                .unwrap();
        assert_eq!(first, "Nia");
        assert_eq!(last, "User");

        let again = join_organization(
            &pool,
            &joiner,
            &JoinOrganizationInput { organization_id: org.organization_id, invite_code: code, first_name: None, last_name: None },
        )
        .await;
        assert!(matches!(again, Err(OrgError::AlreadyMember)));
    }

    #[tokio::test]
    #[ignore = "requires TEST_DATABASE_URL/live Postgres"]
    async fn list_organizations_is_sorted_by_name() {
        let pool = test_helpers::integration_pool().await;
        let a = session_user(&pool, "a@example.org").await;
        let b = session_user(&pool, "b@example.org").await;
        for (u, name) in [(&a, "Zeta Relief"), (&b, "Alpha Aid")] {
            create_organization(&pool, u, &CreateOrganizationInput { name: name.into(), first_name: None, last_name: None })
                .await
                .unwrap();
        }
        let names: Vec<String> = list_organizations(&pool).await.unwrap().into_iter().map(|o| o.name).collect();
        assert_eq!(names, vec!["Alpha Aid".to_owned(), "Zeta Relief".to_owned()]);
    }
}
