//! Router assembly.
//!
//! SYSTEM CONTEXT
//! ==============
//! This module binds the JSON API under `/api`, the health probe, and an
//! optional static frontend directory served as the fallback for every other
//! path.

pub mod auth;
pub mod error;
pub mod grants;
pub mod onboarding;
pub mod profile;
pub mod settings;

use axum::Router;
use axum::http::StatusCode;
use axum::routing::{get, patch, post, put};
use tower_http::compression::CompressionLayer;
use tower_http::cors::{Any, CorsLayer};
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::state::AppState;

/// API routes plus the optional static frontend.
pub fn app(state: AppState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any);

    let static_dir = state.config.static_dir.clone();

    let router = Router::new()
        .route("/api/auth/signup", post(auth::signup))
        .route("/api/auth/login", post(auth::login))
        .route("/api/auth/logout", post(auth::logout))
        .route("/api/auth/me", get(auth::me))
        .route("/api/auth/password-reset", post(auth::request_password_reset))
        .route("/api/auth/password-reset/confirm", post(auth::confirm_password_reset))
        .route("/api/organizations", get(onboarding::list_organizations))
        .route("/api/onboarding/create", post(onboarding::create))
        .route("/api/onboarding/join", post(onboarding::join))
        .route("/api/grants", get(grants::list).post(grants::create))
        .route(
            "/api/grants/{id}",
            get(grants::get).put(grants::update).delete(grants::delete),
        )
        .route("/api/settings", get(settings::show))
        .route(
            "/api/settings/members/{id}",
            patch(settings::update_member).delete(settings::remove_member),
        )
        .route("/api/profile", get(profile::show).patch(profile::update))
        .route("/api/profile/password", put(profile::change_password))
        .route("/healthz", get(healthz))
        .layer(cors)
        .layer(CompressionLayer::new())
        .layer(TraceLayer::new_for_http())
        .with_state(state);

    match static_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "serving static frontend");
            router.fallback_service(ServeDir::new(dir).append_index_html_on_directories(true))
        }
        None => router,
    }
}

async fn healthz() -> StatusCode {
    StatusCode::OK
}

#[cfg(test)]
#[path = "mod_test.rs"]
mod tests;
