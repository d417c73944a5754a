//! Profile routes: view and edit the caller's name/email, change password.

use axum::extract::State;
use axum::response::Json;
use serde::Serialize;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::services::account::{self, PasswordChangeInput, ProfileInput};
use crate::services::organization::{self, Membership};
use crate::state::AppState;

#[derive(Serialize)]
pub struct ProfileResponse {
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub membership: Option<Membership>,
}

/// `GET /api/profile`: names as stored on the membership when there is one.
pub async fn show(State(state): State<AppState>, auth: AuthUser) -> Result<Json<ProfileResponse>, ApiError> {
    let user = account::load_profile(&state.pool, &auth.user).await?;
    let membership = organization::load_membership(&state.pool, user.id).await?;
    Ok(Json(ProfileResponse { email: user.email, first_name: user.first_name, last_name: user.last_name, membership }))
}

/// `PATCH /api/profile`: update names and email.
pub async fn update(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<ProfileInput>,
) -> Result<Json<ProfileResponse>, ApiError> {
    let user = account::update_profile(&state.pool, &auth.user, &body).await?;
    let membership = organization::load_membership(&state.pool, user.id).await?;
    Ok(Json(ProfileResponse { email: user.email, first_name: user.first_name, last_name: user.last_name, membership }))
}

/// `PUT /api/profile/password`: change password; other sessions are signed out.
pub async fn change_password(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<PasswordChangeInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    account::change_password(&state.pool, &auth.user, &auth.token, &body).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}
