//! Domain DTOs for the Airtable record API.
//!
//! # Design
//! `Record` values are produced only by the service. Callers never edit a
//! record in place: they send a `Fields` map and receive a fresh `Record`
//! back. `TableName` and `RecordId` are validated newtypes so a bad path
//! segment is rejected before a request exists.

use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AirtableError;

/// Cell values of a record, keyed by field name.
pub type Fields = serde_json::Map<String, serde_json::Value>;

/// A table name that is safe to use as a single URL path segment.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TableName(String);

impl TableName {
    pub fn new(name: impl Into<String>) -> Result<Self, AirtableError> {
        let name = name.into();
        if name.is_empty() || name.contains('/') {
            return Err(AirtableError::InvalidTableName(name));
        }
        Ok(Self(name))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for TableName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for TableName {
    type Error = AirtableError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for TableName {
    type Error = AirtableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// Service-assigned record identifier (`rec...`). Never generated locally.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordId(String);

impl RecordId {
    pub fn new(id: impl Into<String>) -> Result<Self, AirtableError> {
        let id = id.into();
        if id.is_empty() || id.contains('/') {
            return Err(AirtableError::InvalidRecordId(id));
        }
        Ok(Self(id))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl TryFrom<&str> for RecordId {
    type Error = AirtableError;

    fn try_from(value: &str) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl TryFrom<String> for RecordId {
    type Error = AirtableError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

/// A single record returned by the API.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Record {
    pub id: RecordId,
    #[serde(default)]
    pub fields: Fields,
    #[serde(rename = "createdTime")]
    pub created_time: DateTime<Utc>,
}

/// One page of a list response. `offset` is present while more pages remain.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecordPage {
    pub records: Vec<Record>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub offset: Option<String>,
}

/// Confirmation body of a successful delete.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedRecord {
    pub id: RecordId,
    pub deleted: bool,
}

/// Request payload for create, update and patch of a single record.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct FieldsBody<'a> {
    pub fields: &'a Fields,
}

/// Request payload for batch create.
#[derive(Debug, Clone, Serialize)]
pub(crate) struct RecordsBody<'a> {
    pub records: Vec<FieldsBody<'a>>,
}

/// Response payload of batch create.
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct RecordsResponse {
    pub records: Vec<Record>,
}
