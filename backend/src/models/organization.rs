use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use time::{
    format_description::well_known::Rfc3339, macros::format_description, OffsetDateTime,
    PrimitiveDateTime,
};
use validator::Validate;

use crate::models::common::Field;
use crate::store::{Row, StoreError};

/// Name of the backing table.
pub const TABLE: &str = "organizations";

#[derive(Debug, Clone, Serialize)]
pub struct Organization {
    pub id: i64,
    pub name: String,
    pub description: String,
    pub user_id: String,
    pub is_active: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

/// Row layout as the store returns it; timestamps still text.
#[derive(Debug, Deserialize)]
struct StoredOrganization {
    id: i64,
    name: String,
    description: String,
    user_id: String,
    is_active: bool,
    created_at: String,
    updated_at: String,
}

impl TryFrom<Row> for Organization {
    type Error = StoreError;

    fn try_from(row: Row) -> Result<Self, Self::Error> {
        let stored: StoredOrganization = serde_json::from_value(Value::Object(row))
            .map_err(|e| StoreError::MalformedRow(e.to_string()))?;

        Ok(Organization {
            id: stored.id,
            name: stored.name,
            description: stored.description,
            user_id: stored.user_id,
            is_active: stored.is_active,
            created_at: parse_timestamp(&stored.created_at)?,
            updated_at: parse_timestamp(&stored.updated_at)?,
        })
    }
}

/// Maps every row, failing on the first malformed one.
pub fn from_rows(rows: Vec<Row>) -> Result<Vec<Organization>, StoreError> {
    rows.into_iter().map(Organization::try_from).collect()
}

/// Parses a store timestamp. RFC 3339 (including a trailing `Z`) is the
/// normal case; an offset-less ISO timestamp is read as UTC.
pub fn parse_timestamp(raw: &str) -> Result<OffsetDateTime, StoreError> {
    if let Ok(ts) = OffsetDateTime::parse(raw, &Rfc3339) {
        return Ok(ts);
    }
    PrimitiveDateTime::parse(
        raw,
        format_description!("[year]-[month]-[day]T[hour]:[minute]:[second][optional [.[subsecond]]]"),
    )
    .map(PrimitiveDateTime::assume_utc)
    .map_err(|e| StoreError::MalformedRow(format!("invalid timestamp {:?}: {}", raw, e)))
}

fn default_active() -> bool {
    true
}

#[derive(Debug, Deserialize, Validate)]
pub struct CreateOrganizationRequest {
    #[validate(length(min = 1, message = "name must not be empty"))]
    pub name: String,
    pub description: String,
    #[serde(default = "default_active")]
    pub is_active: bool,
}

impl CreateOrganizationRequest {
    /// The row to insert. The owner always comes from the caller's identity.
    pub fn into_row(self, user_id: &str) -> Row {
        let mut row = Row::new();
        row.insert("name".into(), json!(self.name));
        row.insert("description".into(), json!(self.description));
        row.insert("user_id".into(), json!(user_id));
        row.insert("is_active".into(), json!(self.is_active));
        row
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct UpdateOrganizationRequest {
    #[serde(default)]
    pub name: Field<String>,
    #[serde(default)]
    pub description: Field<String>,
    #[serde(default)]
    pub is_active: Field<bool>,
}

impl UpdateOrganizationRequest {
    /// Columns to write: only fields supplied with a non-null value.
    pub fn changes(&self) -> Row {
        let mut row = Row::new();
        if let Some(name) = self.name.value() {
            row.insert("name".into(), json!(name));
        }
        if let Some(description) = self.description.value() {
            row.insert("description".into(), json!(description));
        }
        if let Some(is_active) = self.is_active.value() {
            row.insert("is_active".into(), json!(is_active));
        }
        row
    }
}
