//! Shared application state.
//!
//! DESIGN
//! ======
//! `AppState` is injected into Axum handlers via the `State` extractor. It
//! holds the database pool, the typed config and the credential rate
//! limiters. Per-caller session state never lives here: handlers resolve it
//! from the request cookie and pass it explicitly to the services.

use std::sync::Arc;

use sqlx::PgPool;

use crate::config::AppConfig;
use crate::rate_limit::RateLimiter;

/// Shared application state, injected into Axum handlers via State extractor.
/// Clone is required by Axum; all inner fields are Arc-wrapped or Clone.
#[derive(Clone)]
pub struct AppState {
    pub pool: PgPool,
    pub config: Arc<AppConfig>,
    /// Login attempts keyed by normalized email.
    pub login_limiter: RateLimiter,
    /// Password-reset emails keyed by normalized email.
    pub reset_limiter: RateLimiter,
}

impl AppState {
    #[must_use]
    pub fn new(pool: PgPool, config: AppConfig) -> Self {
        let login_limiter = RateLimiter::new(config.login_limit);
        let reset_limiter = RateLimiter::new(config.reset_limit);
        Self { pool, config: Arc::new(config), login_limiter, reset_limiter }
    }
}

// =============================================================================
// TEST HELPERS
// =============================================================================
