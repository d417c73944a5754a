//! Organizations, membership roles and the onboarding flow.
//!
//! DESIGN
//! ======
//! A user belongs to at most one organization. The membership row
//! (`user_profiles`) uses the user id as its primary key, so the database
//! settles concurrent create/join races: the second insert fails and is
//! reported as [`OrgError::AlreadyMember`].
//!
//! Creating an organization inserts the organization and the founding admin
//! membership in one transaction. If the membership insert fails the
//! organization insert is rolled back with it.

use rand::Rng;
use serde::{Deserialize, Serialize};
use sqlx::{PgExecutor, PgPool, Row};
use uuid::Uuid;

use super::account::is_unique_violation;
use super::session::SessionUser;

pub const INVITE_CODE_LEN: usize = 8;
const INVITE_CODE_ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum OrgError {
    #[error("organization name is required")]
    NameRequired,
    #[error("Invalid invite code")]
    InvalidInviteCode,
    #[error("already a member of an organization")]
    AlreadyMember,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Membership role within an organization.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Viewer,
}

impl Role {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Admin => "admin",
            Self::Staff => "staff",
            Self::Viewer => "viewer",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "admin" => Some(Self::Admin),
            "staff" => Some(Self::Staff),
            "viewer" => Some(Self::Viewer),
            _ => None,
        }
    }

    /// Admins manage members and see the invite code.
    #[must_use]
    pub fn is_admin(self) -> bool {
        self == Self::Admin
    }

    /// Admins and staff may add, edit and delete grants; viewers read only.
    #[must_use]
    pub fn can_edit_grants(self) -> bool {
        matches!(self, Self::Admin | Self::Staff)
    }
}

/// The caller's organization context, resolved once per request and passed
/// explicitly into every organization-scoped service call.
#[derive(Debug, Clone, Serialize)]
pub struct Membership {
    pub user_id: Uuid,
    pub organization_id: Uuid,
    pub organization_name: String,
    pub role: Role,
}

/// Entry in the join picker. Never carries the invite code.
#[derive(Debug, Clone, Serialize)]
pub struct OrganizationSummary {
    pub id: Uuid,
    pub name: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreateOrganizationInput {
    pub name: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct JoinOrganizationInput {
    pub organization_id: Uuid,
    pub invite_code: String,
    #[serde(default)]
    pub first_name: Option<String>,
    #[serde(default)]
    pub last_name: Option<String>,
}

// =============================================================================
// HELPERS
// =============================================================================

#[must_use]
pub fn generate_invite_code() -> String {
    let mut rng = rand::rng();
    (0..INVITE_CODE_LEN)
        .map(|_| {
            let idx = rng.random_range(0..INVITE_CODE_ALPHABET.len());
            INVITE_CODE_ALPHABET[idx] as char
        })
        .collect()
}

/// Exact, case-sensitive comparison of a submitted code with the stored one.
#[must_use]
pub fn invite_code_matches(stored: &str, submitted: &str) -> bool {
    !stored.is_empty() && stored == submitted
}

/// Pick the profile name: a non-blank override wins over the sign-up name.
fn profile_name(override_name: Option<&str>, fallback: &str) -> String {
    override_name
        .map(str::trim)
        .filter(|n| !n.is_empty())
        .unwrap_or(fallback)
        .to_owned()
}

pub(crate) fn role_from_db(value: &str) -> Result<Role, sqlx::Error> {
    Role::parse(value).ok_or_else(|| sqlx::Error::Decode(format!("unknown role: {value}").into()))
}

// =============================================================================
// QUERIES
// =============================================================================

/// Load the caller's membership, if any.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn load_membership(pool: &PgPool, user_id: Uuid) -> Result<Option<Membership>, OrgError> {
    let row = sqlx::query(
        r"SELECT p.organization_id, p.role, o.name AS organization_name
          FROM user_profiles p
          JOIN organizations o ON o.id = p.organization_id
          WHERE p.id = $1",
    )
    .bind(user_id)
    .fetch_optional(pool)
    .await?;

    let Some(row) = row else {
        return Ok(None);
    };
    let role: String = row.get("role");
    Ok(Some(Membership {
        user_id,
        organization_id: row.get("organization_id"),
        organization_name: row.get("organization_name"),
        role: role_from_db(&role)?,
    }))
}

/// List organizations for the join picker, ordered by name.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_organizations(pool: &PgPool) -> Result<Vec<OrganizationSummary>, OrgError> {
    let rows = sqlx::query_as::<_, (Uuid, String)>("SELECT id, name FROM organizations ORDER BY name ASC")
        .fetch_all(pool)
        .await?;
    Ok(rows
        .into_iter()
        .map(|(id, name)| OrganizationSummary { id, name })
        .collect())
}

// =============================================================================
// ONBOARDING
// =============================================================================

/// Create an organization with a fresh invite code and make the caller its admin.
///
/// # Errors
///
/// Returns [`OrgError::NameRequired`] for a blank name,
/// [`OrgError::AlreadyMember`] if the caller already has a membership, or a
/// database error. No organization row survives a failed call.
pub async fn create_organization(
    pool: &PgPool,
    user: &SessionUser,
    input: &CreateOrganizationInput,
) -> Result<Membership, OrgError> {
    let name = input.name.trim();
    if name.is_empty() {
        return Err(OrgError::NameRequired);
    }

    let organization_id = Uuid::new_v4();
    let invite_code = generate_invite_code();
    let mut tx = pool.begin().await?;

    sqlx::query("INSERT INTO organizations (id, name, invite_code) VALUES ($1, $2, $3)")
        .bind(organization_id)
        .bind(name)
        .bind(&invite_code)
        .execute(&mut *tx)
        .await?;

    insert_profile(&mut *tx, user, organization_id, Role::Admin, input.first_name.as_deref(), input.last_name.as_deref())
        .await?;

    tx.commit().await?;

    tracing::info!(%organization_id, user_id = %user.id, "organization created");
    Ok(Membership { user_id: user.id, organization_id, organization_name: name.to_owned(), role: Role::Admin })
}

/// Join an existing organization as staff after checking its invite code.
///
/// # Errors
///
/// Returns [`OrgError::InvalidInviteCode`] for an unknown organization or a
/// wrong code (indistinguishably), [`OrgError::AlreadyMember`], or a
/// database error.
pub async fn join_organization(
    pool: &PgPool,
    user: &SessionUser,
    input: &JoinOrganizationInput,
) -> Result<Membership, OrgError> {
    let org = sqlx::query_as::<_, (String, String)>("SELECT name, invite_code FROM organizations WHERE id = $1")
        .bind(input.organization_id)
        .fetch_optional(pool)
        .await?;

    let Some((organization_name, invite_code)) = org else {
        return Err(OrgError::InvalidInviteCode);
    };
    if !invite_code_matches(&invite_code, &input.invite_code) {
        tracing::warn!(organization_id = %input.organization_id, user_id = %user.id, "invite code mismatch");
        return Err(OrgError::InvalidInviteCode);
    }

    insert_profile(
        pool,
        user,
        input.organization_id,
        Role::Staff,
        input.first_name.as_deref(),
        input.last_name.as_deref(),
    )
    .await?;

    tracing::info!(organization_id = %input.organization_id, user_id = %user.id, "member joined organization");
    Ok(Membership { user_id: user.id, organization_id: input.organization_id, organization_name, role: Role::Staff })
}

async fn insert_profile<'e, E>(
    executor: E,
    user: &SessionUser,
    organization_id: Uuid,
    role: Role,
    first_name: Option<&str>,
    last_name: Option<&str>,
) -> Result<(), OrgError>
where
    E: PgExecutor<'e>,
{
    sqlx::query(
        "INSERT INTO user_profiles (id, organization_id, role, first_name, last_name)
         VALUES ($1, $2, $3, $4, $5)",
    )
    .bind(user.id)
    .bind(organization_id)
    .bind(role.as_str())
    .bind(profile_name(first_name, &user.first_name))
    .bind(profile_name(last_name, &user.last_name))
    .execute(executor)
    .await
    .map_err(|e| if is_unique_violation(&e) { OrgError::AlreadyMember } else { OrgError::Database(e) })?;
    Ok(())
}

#[cfg(test)]
#[path = "organization_test.rs"]
mod tests;
