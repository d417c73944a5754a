//! Grant service: validation, organization-scoped CRUD and dashboard totals.
//!
//! DESIGN
//! ======
//! Every query filters on the caller's `organization_id` in addition to the
//! grant id, so a grant owned by another tenant behaves exactly like a
//! missing one. Updates overwrite every editable field and refresh
//! `updated_at`; there is no partial patch.

use serde::{Deserialize, Serialize};
use sqlx::postgres::PgRow;
use sqlx::{PgPool, Row};
use time::{Date, OffsetDateTime};
use uuid::Uuid;

use super::organization::Membership;

time::serde::format_description!(iso_date, Date, "[year]-[month]-[day]");

/// Largest accepted award magnitude. Keeps dashboard sums finite.
pub const MAX_AWARD_AMOUNT: f64 = 1e15;

const GRANT_COLUMNS: &str = "id, organization_id, grant_name, funding_agency, program_type, award_number, \
                             award_amount, period_start, period_end, status, created_at, updated_at";

// =============================================================================
// TYPES
// =============================================================================

#[derive(Debug, thiserror::Error)]
pub enum GrantError {
    #[error("{0}")]
    Validation(String),
    #[error("grant not found: {0}")]
    NotFound(Uuid),
    #[error("viewers cannot modify grants")]
    Forbidden,
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum FundingAgency {
    #[serde(rename = "FEMA")]
    Fema,
    #[serde(rename = "DOJ/OJP")]
    DojOjp,
    #[serde(rename = "HHS")]
    Hhs,
    #[serde(rename = "DHS")]
    Dhs,
    #[serde(rename = "Other")]
    Other,
}

impl FundingAgency {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Fema => "FEMA",
            Self::DojOjp => "DOJ/OJP",
            Self::Hhs => "HHS",
            Self::Dhs => "DHS",
            Self::Other => "Other",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "FEMA" => Some(Self::Fema),
            "DOJ/OJP" => Some(Self::DojOjp),
            "HHS" => Some(Self::Hhs),
            "DHS" => Some(Self::Dhs),
            "Other" => Some(Self::Other),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum GrantStatus {
    Active,
    Pending,
    Closed,
}

impl GrantStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Pending => "pending",
            Self::Closed => "closed",
        }
    }

    #[must_use]
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "active" => Some(Self::Active),
            "pending" => Some(Self::Pending),
            "closed" => Some(Self::Closed),
            _ => None,
        }
    }
}

/// A tracked funding award. Mirrors the `grants` table.
#[derive(Debug, Clone, Serialize)]
pub struct Grant {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub grant_name: String,
    pub funding_agency: FundingAgency,
    pub program_type: Option<String>,
    pub award_number: Option<String>,
    pub award_amount: Option<f64>,
    #[serde(with = "iso_date::option")]
    pub period_start: Option<Date>,
    #[serde(with = "iso_date::option")]
    pub period_end: Option<Date>,
    pub status: GrantStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Raw add/edit form body. Every field arrives as the form holds it; blank
/// optional strings mean "not specified".
#[derive(Debug, Clone, Default, Deserialize)]
pub struct GrantInput {
    #[serde(default)]
    pub grant_name: String,
    #[serde(default)]
    pub funding_agency: String,
    #[serde(default)]
    pub program_type: Option<String>,
    #[serde(default)]
    pub award_number: Option<String>,
    /// JSON number or numeric string.
    #[serde(default)]
    pub award_amount: Option<serde_json::Value>,
    #[serde(default)]
    pub period_start: Option<String>,
    #[serde(default)]
    pub period_end: Option<String>,
    #[serde(default)]
    pub status: Option<String>,
}

/// Validated grant fields ready to write.
#[derive(Debug, Clone, PartialEq)]
pub struct GrantFields {
    pub grant_name: String,
    pub funding_agency: FundingAgency,
    pub program_type: Option<String>,
    pub award_number: Option<String>,
    pub award_amount: Option<f64>,
    pub period_start: Option<Date>,
    pub period_end: Option<Date>,
    pub status: GrantStatus,
}

/// Dashboard totals over one organization's grants.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
pub struct GrantSummary {
    pub total: usize,
    pub active: usize,
    pub pending: usize,
    pub closed: usize,
    /// Sum of all award amounts; unspecified amounts count as zero.
    pub total_awarded: f64,
    pub active_awarded: f64,
}

// =============================================================================
// VALIDATION
// =============================================================================

fn blank_to_none(value: Option<&str>) -> Option<String> {
    value
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_owned)
}

fn parse_amount(value: Option<&serde_json::Value>) -> Result<Option<f64>, GrantError> {
    let invalid = || GrantError::Validation("award amount must be a number".into());
    let amount = match value {
        None | Some(serde_json::Value::Null) => return Ok(None),
        Some(serde_json::Value::Number(n)) => n.as_f64().ok_or_else(invalid)?,
        Some(serde_json::Value::String(s)) => {
            let s = s.trim();
            if s.is_empty() {
                return Ok(None);
            }
            s.parse::<f64>().map_err(|_| invalid())?
        }
        Some(_) => return Err(invalid()),
    };
    if !amount.is_finite() {
        return Err(invalid());
    }
    if amount.abs() > MAX_AWARD_AMOUNT {
        return Err(GrantError::Validation("award amount is too large".into()));
    }
    Ok(Some(amount))
}

fn parse_date(field: &str, value: Option<&str>) -> Result<Option<Date>, GrantError> {
    let Some(raw) = value.map(str::trim).filter(|v| !v.is_empty()) else {
        return Ok(None);
    };
    Date::parse(raw, time::macros::format_description!("[year]-[month]-[day]"))
        .map(Some)
        .map_err(|_| GrantError::Validation(format!("{field} must be a date (YYYY-MM-DD)")))
}

impl GrantInput {
    /// Check required fields and parse typed values.
    ///
    /// # Errors
    ///
    /// Returns [`GrantError::Validation`] naming the first bad field.
    pub fn validate(&self) -> Result<GrantFields, GrantError> {
        let grant_name = self.grant_name.trim();
        if grant_name.is_empty() {
            return Err(GrantError::Validation("grant name is required".into()));
        }

        let agency = self.funding_agency.trim();
        if agency.is_empty() {
            return Err(GrantError::Validation("funding agency is required".into()));
        }
        let funding_agency = FundingAgency::parse(agency)
            .ok_or_else(|| GrantError::Validation(format!("unknown funding agency: {agency}")))?;

        let status = match self.status.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
            None => GrantStatus::Active,
            Some(s) => GrantStatus::parse(s).ok_or_else(|| GrantError::Validation(format!("unknown status: {s}")))?,
        };

        Ok(GrantFields {
            grant_name: grant_name.to_owned(),
            funding_agency,
            program_type: blank_to_none(self.program_type.as_deref()),
            award_number: blank_to_none(self.award_number.as_deref()),
            award_amount: parse_amount(self.award_amount.as_ref())?,
            period_start: parse_date("period start", self.period_start.as_deref())?,
            period_end: parse_date("period end", self.period_end.as_deref())?,
            status,
        })
    }
}

// =============================================================================
// SUMMARY
// =============================================================================

#[must_use]
pub fn summarize(grants: &[Grant]) -> GrantSummary {
    let mut summary = GrantSummary { total: grants.len(), ..GrantSummary::default() };
    for grant in grants {
        let amount = grant.award_amount.unwrap_or(0.0);
        summary.total_awarded += amount;
        match grant.status {
            GrantStatus::Active => {
                summary.active += 1;
                summary.active_awarded += amount;
            }
            GrantStatus::Pending => summary.pending += 1,
            GrantStatus::Closed => summary.closed += 1,
        }
    }
    summary
}

// =============================================================================
// CRUD
// =============================================================================

fn grant_from_row(row: &PgRow) -> Result<Grant, sqlx::Error> {
    let agency: String = row.try_get("funding_agency")?;
    let status: String = row.try_get("status")?;
    Ok(Grant {
        id: row.try_get("id")?,
        organization_id: row.try_get("organization_id")?,
        grant_name: row.try_get("grant_name")?,
        funding_agency: FundingAgency::parse(&agency)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown funding agency: {agency}").into()))?,
        program_type: row.try_get("program_type")?,
        award_number: row.try_get("award_number")?,
        award_amount: row.try_get("award_amount")?,
        period_start: row.try_get("period_start")?,
        period_end: row.try_get("period_end")?,
        status: GrantStatus::parse(&status)
            .ok_or_else(|| sqlx::Error::Decode(format!("unknown grant status: {status}").into()))?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
    })
}

fn ensure_can_edit(ctx: &Membership) -> Result<(), GrantError> {
    if ctx.role.can_edit_grants() { Ok(()) } else { Err(GrantError::Forbidden) }
}

/// List the organization's grants, newest first.
///
/// # Errors
///
/// Returns a database error if the query fails.
pub async fn list_grants(pool: &PgPool, ctx: &Membership) -> Result<Vec<Grant>, GrantError> {
    let rows = sqlx::query(&format!(
        "SELECT {GRANT_COLUMNS} FROM grants WHERE organization_id = $1 ORDER BY created_at DESC, id ASC"
    ))
    .bind(ctx.organization_id)
    .fetch_all(pool)
    .await?;

    Ok(rows.iter().map(grant_from_row).collect::<Result<Vec<_>, sqlx::Error>>()?)
}

/// Fetch one grant of the caller's organization.
///
/// # Errors
///
/// Returns [`GrantError::NotFound`] if the grant does not exist in the
/// caller's organization.
pub async fn get_grant(pool: &PgPool, ctx: &Membership, grant_id: Uuid) -> Result<Grant, GrantError> {
    let row = sqlx::query(&format!("SELECT {GRANT_COLUMNS} FROM grants WHERE id = $1 AND organization_id = $2"))
        .bind(grant_id)
        .bind(ctx.organization_id)
        .fetch_optional(pool)
        .await?
        .ok_or(GrantError::NotFound(grant_id))?;
    Ok(grant_from_row(&row)?)
}

/// Add a grant to the caller's organization.
///
/// # Errors
///
/// Returns [`GrantError::Forbidden`] for viewers, a validation error, or a
/// database error.
pub async fn create_grant(pool: &PgPool, ctx: &Membership, input: &GrantInput) -> Result<Grant, GrantError> {
    ensure_can_edit(ctx)?;
    let fields = input.validate()?;

    let row = sqlx::query(&format!(
        "INSERT INTO grants (id, organization_id, grant_name, funding_agency, program_type, award_number,
                             award_amount, period_start, period_end, status)
         VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
         RETURNING {GRANT_COLUMNS}"
    ))
    .bind(Uuid::new_v4())
    .bind(ctx.organization_id)
    .bind(&fields.grant_name)
    .bind(fields.funding_agency.as_str())
    .bind(&fields.program_type)
    .bind(&fields.award_number)
    .bind(fields.award_amount)
    .bind(fields.period_start)
    .bind(fields.period_end)
    .bind(fields.status.as_str())
    .fetch_one(pool)
    .await?;

    let grant = grant_from_row(&row)?;
    tracing::info!(grant_id = %grant.id, organization_id = %ctx.organization_id, "grant created");
    Ok(grant)
}

/// Overwrite every editable field of a grant and refresh `updated_at`.
///
/// # Errors
///
/// Returns [`GrantError::Forbidden`] for viewers, a validation error,
/// [`GrantError::NotFound`], or a database error.
pub async fn update_grant(pool: &PgPool, ctx: &Membership, grant_id: Uuid, input: &GrantInput) -> Result<Grant, GrantError> {
    ensure_can_edit(ctx)?;
    let fields = input.validate()?;

    let row = sqlx::query(&format!(
        "UPDATE grants
         SET grant_name = $3, funding_agency = $4, program_type = $5, award_number = $6,
             award_amount = $7, period_start = $8, period_end = $9, status = $10, updated_at = now()
         WHERE id = $1 AND organization_id = $2
         RETURNING {GRANT_COLUMNS}"
    ))
    .bind(grant_id)
    .bind(ctx.organization_id)
    .bind(&fields.grant_name)
    .bind(fields.funding_agency.as_str())
    .bind(&fields.program_type)
    .bind(&fields.award_number)
    .bind(fields.award_amount)
    .bind(fields.period_start)
    .bind(fields.period_end)
    .bind(fields.status.as_str())
    .fetch_optional(pool)
    .await?
    .ok_or(GrantError::NotFound(grant_id))?;

    Ok(grant_from_row(&row)?)
}

/// Delete a grant.
///
/// # Errors
///
/// Returns [`GrantError::Forbidden`] for viewers, [`GrantError::NotFound`],
/// or a database error.
pub async fn delete_grant(pool: &PgPool, ctx: &Membership, grant_id: Uuid) -> Result<(), GrantError> {
    ensure_can_edit(ctx)?;

    let result = sqlx::query("DELETE FROM grants WHERE id = $1 AND organization_id = $2")
        .bind(grant_id)
        .bind(ctx.organization_id)
        .execute(pool)
        .await?;

    if result.rows_affected() == 0 {
        return Err(GrantError::NotFound(grant_id));
    }
    tracing::info!(%grant_id, organization_id = %ctx.organization_id, "grant deleted");
    Ok(())
}

#[cfg(test)]
#[path = "grant_test.rs"]
mod tests;
