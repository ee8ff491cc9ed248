//! Shared validation helpers for inbound HTTP adapters.
//!
//! Every helper returns a [`crate::domain::Error`] with
//! [`crate::domain::ErrorCode::InvalidRequest`] and a `details` object naming
//! the offending field, so clients can point at the input that failed.

use serde::{Deserialize, Deserializer};
use serde_json::json;
use uuid::Uuid;

use crate::domain::{EpicId, Error, GridPosition, HabitCommitId, HabitId, HabitStatus};

/// Validation error codes for HTTP request failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ErrorCode {
    InvalidUuid,
    InvalidPosition,
    InvalidStatus,
}

impl ErrorCode {
    fn as_str(self) -> &'static str {
        match self {
            ErrorCode::InvalidUuid => "invalid_uuid",
            ErrorCode::InvalidPosition => "invalid_position",
            ErrorCode::InvalidStatus => "invalid_status",
        }
    }
}

/// Newtype wrapper for HTTP field names.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct FieldName(&'static str);

impl FieldName {
    pub(crate) const fn new(name: &'static str) -> Self {
        Self(name)
    }

    fn as_str(&self) -> &str {
        self.0
    }
}

fn field_error(field: FieldName, message: String, code: ErrorCode, value: String) -> Error {
    Error::invalid_request(message).with_details(json!({
        "field": field.as_str(),
        "value": value,
        "code": code.as_str(),
    }))
}

pub(crate) fn invalid_uuid_error(field: FieldName, value: &str) -> Error {
    field_error(
        field,
        format!("{} must be a valid UUID", field.as_str()),
        ErrorCode::InvalidUuid,
        value.to_owned(),
    )
}

pub(crate) fn parse_uuid(value: &str, field: FieldName) -> Result<Uuid, Error> {
    Uuid::parse_str(value.trim()).map_err(|_| invalid_uuid_error(field, value))
}

pub(crate) fn parse_epic_id(value: &str, field: FieldName) -> Result<EpicId, Error> {
    parse_uuid(value, field).map(EpicId::from_uuid)
}

pub(crate) fn parse_optional_epic_id(
    value: Option<String>,
    field: FieldName,
) -> Result<Option<EpicId>, Error> {
    value.map(|raw| parse_epic_id(&raw, field)).transpose()
}

pub(crate) fn parse_habit_id(value: &str, field: FieldName) -> Result<HabitId, Error> {
    parse_uuid(value, field).map(HabitId::from_uuid)
}

pub(crate) fn parse_commit_id(value: &str, field: FieldName) -> Result<HabitCommitId, Error> {
    parse_uuid(value, field).map(HabitCommitId::from_uuid)
}

pub(crate) fn parse_position(value: u8, field: FieldName) -> Result<GridPosition, Error> {
    GridPosition::try_from(value).map_err(|err| {
        field_error(
            field,
            err.to_string(),
            ErrorCode::InvalidPosition,
            value.to_string(),
        )
    })
}

pub(crate) fn parse_habit_status(value: &str, field: FieldName) -> Result<HabitStatus, Error> {
    value.parse().map_err(|_| {
        field_error(
            field,
            format!(
                "{} must be one of active, paused, completed or archived",
                field.as_str()
            ),
            ErrorCode::InvalidStatus,
            value.to_owned(),
        )
    })
}

/// Deserialise a present field as `Some`, so `Option<Option<T>>` tells an
/// explicit `null` (`Some(None)`) apart from an absent key (`None`).
///
/// Pair with `#[serde(default)]`.
pub(crate) fn present<'de, T, D>(deserializer: D) -> Result<Option<T>, D::Error>
where
    T: Deserialize<'de>,
    D: Deserializer<'de>,
{
    T::deserialize(deserializer).map(Some)
}
