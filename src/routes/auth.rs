//! Auth routes: password sign-up/login, session cookie, password reset, and
//! the request extractors that resolve the caller's session context.
//!
//! DESIGN
//! ======
//! The session cookie is the only ambient credential. [`AuthUser`] turns it
//! into the signed-in user; [`OrgMember`] additionally resolves the user's
//! organization membership. Handlers receive these values as parameters and
//! pass them into the services explicitly.

use std::sync::Arc;

use axum::extract::{FromRef, FromRequestParts, State};
use axum::http::StatusCode;
use axum::http::request::Parts;
use axum::response::{IntoResponse, Json, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::{Deserialize, Serialize};
use time::Duration;

use super::error::ApiError;
use crate::config::AppConfig;
use crate::services::account::{self, SignupInput};
use crate::services::organization::{self, Membership};
use crate::services::password_reset;
use crate::services::session::{self, SessionUser};
use crate::state::AppState;

pub(crate) const COOKIE_NAME: &str = "session_token";

// =============================================================================
// COOKIES
// =============================================================================

fn session_cookie(config: &AppConfig, token: String) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, token))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::days(i64::from(config.session_ttl_days)))
        .build()
}

fn clear_session_cookie(config: &AppConfig) -> Cookie<'static> {
    Cookie::build((COOKIE_NAME, ""))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(config.cookie_secure)
        .max_age(Duration::ZERO)
        .build()
}

// =============================================================================
// EXTRACTORS
// =============================================================================

/// Authenticated user extracted from the session cookie.
/// Use as a handler parameter to require authentication.
pub struct AuthUser {
    pub user: SessionUser,
    pub token: String,
}

impl<S> FromRequestParts<S> for AuthUser
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let jar = CookieJar::from_headers(&parts.headers);
        let token = jar.get(COOKIE_NAME).map(Cookie::value).unwrap_or_default();
        if token.is_empty() {
            return Err(ApiError::unauthorized());
        }

        let app_state = AppState::from_ref(state);
        let user = session::validate_session(&app_state.pool, token)
            .await?
            .ok_or_else(ApiError::unauthorized)?;

        Ok(Self { user, token: token.to_owned() })
    }
}

/// Authenticated user who belongs to an organization.
/// Organization-scoped routes take this instead of [`AuthUser`].
pub struct OrgMember {
    pub membership: Membership,
}

impl<S> FromRequestParts<S> for OrgMember
where
    AppState: FromRef<S>,
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let auth = AuthUser::from_request_parts(parts, state).await?;
        let app_state = AppState::from_ref(state);
        let membership = organization::load_membership(&app_state.pool, auth.user.id)
            .await?
            .ok_or_else(ApiError::no_membership)?;
        Ok(Self { membership })
    }
}

// =============================================================================
// HANDLERS
// =============================================================================

/// Current user plus membership; `membership: null` means onboarding is
/// still pending.
#[derive(Serialize)]
pub struct MeResponse {
    pub user: SessionUser,
    pub membership: Option<Membership>,
}

#[derive(Deserialize)]
pub struct LoginBody {
    pub email: String,
    pub password: String,
}

#[derive(Deserialize)]
pub struct ResetRequestBody {
    pub email: String,
}

#[derive(Deserialize)]
pub struct ResetConfirmBody {
    pub token: String,
    pub new_password: String,
    #[serde(default)]
    pub confirm_password: Option<String>,
}

/// Longest key the limiters store; matches the maximum email address length.
const MAX_LIMITER_KEY_LEN: usize = 254;

/// Limiter key for an email as typed: the normalized address when it parses.
fn limiter_key(email: &str) -> String {
    let key = account::normalize_email(email).unwrap_or_else(|| email.trim().to_ascii_lowercase());
    key.chars().take(MAX_LIMITER_KEY_LEN).collect()
}

/// `POST /api/auth/signup`: create an account and sign it in.
pub async fn signup(
    State(state): State<AppState>,
    Json(body): Json<SignupInput>,
) -> Result<Response, ApiError> {
    let user = account::signup(&state.pool, &body).await?;
    let token = session::create_session(&state.pool, user.id, state.config.session_ttl_days).await?;
    tracing::info!(user_id = %user.id, "user signed up");

    let jar = CookieJar::new().add(session_cookie(&state.config, token));
    Ok((StatusCode::CREATED, jar, Json(MeResponse { user, membership: None })).into_response())
}

/// `POST /api/auth/login`: verify credentials and set the session cookie.
pub async fn login(
    State(state): State<AppState>,
    Json(body): Json<LoginBody>,
) -> Result<Response, ApiError> {
    let key = limiter_key(&body.email);
    state.login_limiter.check_and_record(&key)?;

    let user = match account::authenticate(&state.pool, &body.email, &body.password).await {
        Ok(user) => user,
        Err(e) => {
            tracing::warn!(email = %key, "login failed");
            return Err(e.into());
        }
    };
    state.login_limiter.reset(&key);

    let token = session::create_session(&state.pool, user.id, state.config.session_ttl_days).await?;
    let membership = organization::load_membership(&state.pool, user.id).await?;

    let jar = CookieJar::new().add(session_cookie(&state.config, token));
    Ok((jar, Json(MeResponse { user, membership })).into_response())
}

/// `POST /api/auth/logout`: delete session, clear cookie.
pub async fn logout(State(state): State<AppState>, auth: AuthUser) -> impl IntoResponse {
    if let Err(e) = session::delete_session(&state.pool, &auth.token).await {
        tracing::warn!(error = %e, user_id = %auth.user.id, "session delete failed during logout");
    }

    let jar = CookieJar::new().add(clear_session_cookie(&state.config));
    (jar, StatusCode::NO_CONTENT)
}

/// `GET /api/auth/me`: return current user and membership.
pub async fn me(State(state): State<AppState>, auth: AuthUser) -> Result<Json<MeResponse>, ApiError> {
    let membership = organization::load_membership(&state.pool, auth.user.id).await?;
    Ok(Json(MeResponse { user: auth.user, membership }))
}

/// Body returned for every accepted reset request.
const RESET_ACCEPTED_MESSAGE: &str = "If an account exists for that email, a reset link has been sent.";

/// `POST /api/auth/password-reset`: email a reset link if the account exists.
///
/// Token issuance and delivery run on a spawned task, so the response and its
/// latency are the same for registered and unknown emails, and a delivery
/// failure is only logged.
pub async fn request_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetRequestBody>,
) -> Result<Response, ApiError> {
    if state.config.mailer.is_none() {
        return Err(ApiError::new(StatusCode::SERVICE_UNAVAILABLE, "password reset email is not configured"));
    }

    let email = account::normalize_email(&body.email)
        .ok_or_else(|| ApiError::new(StatusCode::BAD_REQUEST, "invalid email"))?;
    state.reset_limiter.check_and_record(&email)?;

    let pool = state.pool.clone();
    let config = Arc::clone(&state.config);
    tokio::spawn(async move {
        let Some(mailer) = config.mailer.as_ref() else {
            return;
        };
        match password_reset::send_reset_link(&pool, &config, mailer, &email).await {
            Ok(true) => tracing::info!(email = %email, "password reset email sent"),
            Ok(false) => tracing::info!(email = %email, "password reset requested for unknown email"),
            Err(e) => tracing::error!(error = %e, email = %email, "password reset delivery failed"),
        }
    });

    Ok((StatusCode::ACCEPTED, Json(serde_json::json!({ "message": RESET_ACCEPTED_MESSAGE }))).into_response())
}

/// `POST /api/auth/password-reset/confirm`: consume a reset token and set
/// a new password. Every session of the user is revoked, including the
/// caller's cookie.
pub async fn confirm_password_reset(
    State(state): State<AppState>,
    Json(body): Json<ResetConfirmBody>,
) -> Result<Response, ApiError> {
    if let Some(confirm) = body.confirm_password.as_deref() {
        account::validate_new_password(&body.new_password, confirm)?;
    }
    let user_id = password_reset::confirm_reset(&state.pool, &body.token, &body.new_password).await?;
    tracing::info!(%user_id, "password reset completed");

    let jar = CookieJar::new().add(clear_session_cookie(&state.config));
    Ok((jar, Json(serde_json::json!({ "ok": true }))).into_response())
}

#[cfg(test)]
#[path = "auth_test.rs"]
mod tests;
