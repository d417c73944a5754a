//! Admin settings routes: invite code, member list, role changes, removal.

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::Json;
use uuid::Uuid;

use super::auth::OrgMember;
use super::error::ApiError;
use crate::services::members::{self, OrgSettings, RoleChangeInput};
use crate::state::AppState;

/// `GET /api/settings`: organization details and members.
pub async fn show(State(state): State<AppState>, member: OrgMember) -> Result<Json<OrgSettings>, ApiError> {
    Ok(Json(members::settings(&state.pool, &member.membership).await?))
}

/// `PATCH /api/settings/members/{id}`: change a member's role.
pub async fn update_member(
    State(state): State<AppState>,
    member: OrgMember,
    Path(member_id): Path<Uuid>,
    Json(body): Json<RoleChangeInput>,
) -> Result<Json<serde_json::Value>, ApiError> {
    let role = body.parse()?;
    members::change_member_role(&state.pool, &member.membership, member_id, role).await?;
    Ok(Json(serde_json::json!({ "ok": true })))
}

/// `DELETE /api/settings/members/{id}`: remove a member.
pub async fn remove_member(
    State(state): State<AppState>,
    member: OrgMember,
    Path(member_id): Path<Uuid>,
) -> Result<StatusCode, ApiError> {
    members::remove_member(&state.pool, &member.membership, member_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
