//! Onboarding routes: organization picker, create and join.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Json;

use super::auth::AuthUser;
use super::error::ApiError;
use crate::services::organization::{
    self, CreateOrganizationInput, JoinOrganizationInput, Membership, OrganizationSummary,
};
use crate::state::AppState;

/// `GET /api/organizations`: organizations a new user may join.
pub async fn list_organizations(
    State(state): State<AppState>,
    _auth: AuthUser,
) -> Result<Json<Vec<OrganizationSummary>>, ApiError> {
    Ok(Json(organization::list_organizations(&state.pool).await?))
}

/// `POST /api/onboarding/create`: create an organization and become its admin.
pub async fn create(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<CreateOrganizationInput>,
) -> Result<(StatusCode, Json<Membership>), ApiError> {
    let membership = organization::create_organization(&state.pool, &auth.user, &body).await?;
    Ok((StatusCode::CREATED, Json(membership)))
}

/// `POST /api/onboarding/join`: join an organization with its invite code.
pub async fn join(
    State(state): State<AppState>,
    auth: AuthUser,
    Json(body): Json<JoinOrganizationInput>,
) -> Result<Json<Membership>, ApiError> {
    let membership = organization::join_organization(&state.pool, &auth.user, &body).await?;
    Ok(Json(membership))
}
