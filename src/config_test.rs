use std::collections::HashMap;

use super::*;

fn config_from(pairs: &[(&str, &str)]) -> Result<AppConfig, ConfigError> {
    let map: HashMap<String, String> = pairs
        .iter()
        .map(|(k, v)| ((*k).to_owned(), (*v).to_owned()))
        .collect();
    AppConfig::from_lookup(|key| map.get(key).cloned())
}

// =============================================================================
// parse_bool
// =============================================================================

#[test]
fn parse_bool_true_variants() {
    for val in ["1", "true", "yes", "on", "TRUE", "  On  "] {
        assert_eq!(parse_bool(val), Some(true), "expected true for {val:?}");
    }
}

#[test]
fn parse_bool_false_variants() {
    for val in ["0", "false", "no", "off", "False"] {
        assert_eq!(parse_bool(val), Some(false), "expected false for {val:?}");
    }
}

#[test]
fn parse_bool_invalid_returns_none() {
    assert_eq!(parse_bool("maybe"), None);
    assert_eq!(parse_bool(""), None);
}

// =============================================================================
// AppConfig
// =============================================================================

#[test]
fn missing_database_url_is_an_error() {
    assert_eq!(config_from(&[]), Err(ConfigError::Missing { var: "DATABASE_URL" }));
    assert_eq!(
        config_from(&[("DATABASE_URL", "  ")]),
        Err(ConfigError::Missing { var: "DATABASE_URL" })
    );
}

#[test]
fn defaults_apply_when_only_database_url_is_set() {
    let cfg = config_from(&[("DATABASE_URL", "postgres://localhost/grants")]).unwrap();
    assert_eq!(cfg.port, DEFAULT_PORT);
    assert_eq!(cfg.db_max_connections, DEFAULT_DB_MAX_CONNECTIONS);
    assert_eq!(cfg.public_base_url, DEFAULT_PUBLIC_BASE_URL);
    assert!(!cfg.cookie_secure);
    assert_eq!(cfg.session_ttl_days, DEFAULT_SESSION_TTL_DAYS);
    assert!(cfg.mailer.is_none());
    assert!(cfg.static_dir.is_none());
    assert_eq!(cfg.login_limit.limit, DEFAULT_LOGIN_LIMIT);
    assert_eq!(cfg.reset_limit.window, Duration::from_secs(DEFAULT_RESET_WINDOW_SECS));
}

#[test]
fn https_base_url_turns_on_secure_cookies() {
    let cfg = config_from(&[
        ("DATABASE_URL", "postgres://localhost/grants"),
        ("PUBLIC_BASE_URL", "https://grants.example.org/"),
    ])
    .unwrap();
    assert!(cfg.cookie_secure);
    assert_eq!(cfg.public_base_url, "https://grants.example.org");
}

#[test]
fn explicit_cookie_secure_overrides_base_url() {
    let cfg = config_from(&[
        ("DATABASE_URL", "postgres://localhost/grants"),
        ("PUBLIC_BASE_URL", "https://grants.example.org"),
        ("COOKIE_SECURE", "off"),
    ])
    .unwrap();
    assert!(!cfg.cookie_secure);
}

#[test]
fn invalid_port_is_reported_with_value() {
    let err = config_from(&[("DATABASE_URL", "postgres://x"), ("PORT", "http")]).unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "PORT", value: "http".into() });
}

#[test]
fn non_positive_session_ttl_is_rejected() {
    let err = config_from(&[("DATABASE_URL", "postgres://x"), ("SESSION_TTL_DAYS", "0")]).unwrap_err();
    assert!(matches!(err, ConfigError::Invalid { var: "SESSION_TTL_DAYS", .. }));
}

#[test]
fn mailer_requires_both_key_and_sender() {
    let err = config_from(&[("DATABASE_URL", "postgres://x"), ("RESEND_API_KEY", "re_123")]).unwrap_err();
    assert_eq!(err, ConfigError::Missing { var: "RESEND_FROM" });

    let cfg = config_from(&[
        ("DATABASE_URL", "postgres://x"),
        ("RESEND_API_KEY", "re_123"),
        ("RESEND_FROM", "GrantGuardian <no-reply@example.org>"),
    ])
    .unwrap();
    let mailer = cfg.mailer.expect("mailer should be configured");
    assert_eq!(mailer.api_key, "re_123");
}

#[test]
fn blank_mailer_variable_is_named() {
    let err = config_from(&[("DATABASE_URL", "postgres://x"), ("RESEND_API_KEY", "re_123"), ("RESEND_FROM", "  ")])
        .unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "RESEND_FROM", value: "<blank>".into() });

    let err = config_from(&[("DATABASE_URL", "postgres://x"), ("RESEND_API_KEY", ""), ("RESEND_FROM", "a@example.org")])
        .unwrap_err();
    assert_eq!(err, ConfigError::Invalid { var: "RESEND_API_KEY", value: "<blank>".into() });
}

#[test]
fn rate_limits_are_configurable() {
    let cfg = config_from(&[
        ("DATABASE_URL", "postgres://x"),
        ("RATE_LIMIT_LOGIN", "2"),
        ("RATE_LIMIT_LOGIN_WINDOW_SECS", "30"),
    ])
    .unwrap();
    assert_eq!(cfg.login_limit, WindowLimit { limit: 2, window: Duration::from_secs(30) });
}

#[test]
fn password_reset_url_uses_public_base() {
    let cfg = config_from(&[
        ("DATABASE_URL", "postgres://x"),
        ("PUBLIC_BASE_URL", "https://grants.example.org"),
    ])
    .unwrap();
    assert_eq!(
        cfg.password_reset_url("abc123"),
        "https://grants.example.org/reset-password?token=abc123"
    );
}
