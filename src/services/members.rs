//! Organization settings: invite code, member list and role management.
//!
//! DESIGN
//! ======
//! Every operation requires an admin [`Membership`]. Member writes are scoped
//! by `organization_id` as well as member id, so a member of another
//! organization is reported as not found. An admin can never demote or remove
//! themselves, which keeps at least the acting admin in place.

use serde::{Deserialize, Serialize};
use sqlx::{PgPool, Row};
use time::OffsetDateTime;
use uuid::Uuid;

use super::organization::{Membership, Role, role_from_db};

#[derive(Debug, thiserror::Error)]
pub enum MemberError {
    #[error("only admins can manage organization settings")]
    Forbidden,
    #[error("you cannot change your own role or remove yourself")]
    CannotModifySelf,
    #[error("member not found: {0}")]
    NotFound(Uuid),
    #[error("unknown role: {0}")]
    InvalidRole(String),
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Serialize)]
pub struct MemberRow {
    pub id: Uuid,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub role: Role,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    pub is_current_user: bool,
}

#[derive(Debug, Clone, Serialize)]
pub struct OrgSettings {
    pub organization_id: Uuid,
    pub name: String,
    pub invite_code: String,
    pub members: Vec<MemberRow>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RoleChangeInput {
    pub role: String,
}

impl RoleChangeInput {
    /// # Errors
    ///
    /// Returns [`MemberError::InvalidRole`] for anything but the three role names.
    pub fn parse(&self) -> Result<Role, MemberError> {
        Role::parse(self.role.trim()).ok_or_else(|| MemberError::InvalidRole(self.role.clone()))
    }
}

fn ensure_admin(ctx: &Membership) -> Result<(), MemberError> {
    if ctx.role.is_admin() { Ok(()) } else { Err(MemberError::Forbidden) }
}

fn ensure_not_self(ctx: &Membership, member_id: Uuid) -> Result<(), MemberError> {
    if ctx.user_id == member_id { Err(MemberError::CannotModifySelf) } else { Ok(()) }
}

/// Organization name, invite code and members, newest member first.
///
/// # Errors
///
/// Returns [`MemberError::Forbidden`] for non-admins or a database error.
pub async fn settings(pool: &PgPool, ctx: &Membership) -> Result<OrgSettings, MemberError> {
    ensure_admin(ctx)?;

    let (name, invite_code): (String, String) =
        sqlx::query_as("SELECT name, invite_code FROM organizations WHERE id = $1")
            .bind(ctx.organization_id)
            .fetch_one(pool)
            .await?;

    let rows = sqlx::query(
        r"SELECT p.id, p.first_name, p.last_name, p.role, p.created_at, u.email
          FROM user_profiles p
          JOIN users u ON u.id = p.id
          WHERE p.organization_id = $1
          ORDER BY p.created_at DESC, p.id ASC",
    )
    .bind(ctx.organization_id)
    .fetch_all(pool)
    .await?;

    let mut members = Vec::with_capacity(rows.len());
    for row in rows {
        let id: Uuid = row.try_get("id")?;
        let role: String = row.try_get("role")?;
        members.push(MemberRow {
            id,
            first_name: row.try_get("first_name")?,
            last_name: row.try_get("last_name")?,
            email: row.try_get("email")?,
            role: role_from_db(&role)?,
            created_at: row.try_get("created_at")?,
            is_current_user: id == ctx.user_id,
        });
    }

    Ok(OrgSettings { organization_id: ctx.organization_id, name, invite_code, members })
}

/// Set another member's role.
///
/// # Errors
///
/// Returns [`MemberError::Forbidden`], [`MemberError::CannotModifySelf`],
/// [`MemberError::NotFound`] or a database error.
pub async fn change_member_role(pool: &PgPool, ctx: &Membership, member_id: Uuid, role: Role) -> Result<(), MemberError> {
    ensure_admin(ctx)?;
    ensure_not_self(ctx, member_id)?;

    let result = sqlx::query("UPDATE user_profiles SET role = $3 WHERE id = $1 AND organization_id = $2")
        .bind(member_id)
        .bind(ctx.organization_id)
        .bind(role.as_str())
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(MemberError::NotFound(member_id));
    }
    tracing::info!(%member_id, organization_id = %ctx.organization_id, role = role.as_str(), "member role changed");
    Ok(())
}

/// Remove another member's membership. The user account itself stays.
///
/// # Errors
///
/// Returns [`MemberError::Forbidden`], [`MemberError::CannotModifySelf`],
/// [`MemberError::NotFound`] or a database error.
pub async fn remove_member(pool: &PgPool, ctx: &Membership, member_id: Uuid) -> Result<(), MemberError> {
    ensure_admin(ctx)?;
    ensure_not_self(ctx, member_id)?;

    let result = sqlx::query("DELETE FROM user_profiles WHERE id = $1 AND organization_id = $2")
        .bind(member_id)
        .bind(ctx.organization_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(MemberError::NotFound(member_id));
    }
    tracing::info!(%member_id, organization_id = %ctx.organization_id, "member removed");
    Ok(())
}

#[cfg(test)]
#[path = "members_test.rs"]
mod tests;
