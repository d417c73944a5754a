//! Grant routes: dashboard listing and single-grant CRUD.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use serde::Serialize;
use uuid::Uuid;

use super::auth::OrgMember;
use super::error::ApiError;
use crate::services::grant::{self, Grant, GrantInput, GrantSummary};
use crate::services::organization::Role;
use crate::state::AppState;

/// Dashboard payload: the grants plus totals and the caller's role so the
/// client knows whether to offer edit controls.
#[derive(Serialize)]
pub struct DashboardResponse {
    pub organization_name: String,
    pub role: Role,
    pub summary: GrantSummary,
    pub grants: Vec<Grant>,
}

/// `GET /api/grants`: list the organization's grants with summary totals.
pub async fn list(State(state): State<AppState>, member: OrgMember) -> Result<Json<DashboardResponse>, ApiError> {
    let grants = grant::list_grants(&state.pool, &member.membership).await?;
    let summary = grant::summarize(&grants);
    Ok(Json(DashboardResponse {
        organization_name: member.membership.organization_name,
        role: member.membership.role,
        summary,
        grants,
    }))
}

/// `POST /api/grants`: add a grant.
pub async fn create(
    State(state): State<AppState>,
    member: OrgMember,
    Json(body): Json<GrantInput>,
) -> Result<(StatusCode, Json<Grant>), ApiError> {
    let created = grant::create_grant(&state.pool, &member.membership, &body).await?;
    Ok((StatusCode::CREATED, Json(created)))
}

/// `GET /api/grants/{id}`: fetch one grant.
pub async fn get(
    State(state): State<AppState>,
    member: OrgMember,
    Path(grant_id): Path<Uuid>,
) -> Result<Json<Grant>, ApiError> {
    Ok(Json(grant::get_grant(&state.pool, &member.membership, grant_id).await?))
}

/// `PUT /api/grants/{id}`: overwrite a grant's fields.
pub async fn update(
    State(state): State<AppState>,
    member: OrgMember,
    Path(grant_id): Path<Uuid>,
    Json(body): Json<GrantInput>,
) -> Result<Json<Grant>, ApiError> {
    Ok(Json(grant::update_grant(&state.pool, &member.membership, grant_id, &body).await?))
}

/// `DELETE /api/grants/{id}`: delete a grant.
pub async fn delete(
    State(state): State<AppState>,
    member: OrgMember,
    Path(grant_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    grant::delete_grant(&state.pool, &member.membership, grant_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
