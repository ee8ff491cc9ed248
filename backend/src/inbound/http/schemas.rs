//! OpenAPI schema definitions for domain types.
//!
//! Domain types do not derive `ToSchema`; the wrappers here mirror their
//! serialised shape so the adapter layer owns the documentation concern.

use utoipa::ToSchema;

/// OpenAPI schema for [`crate::domain::ErrorCode`].
#[derive(ToSchema)]
#[schema(as = crate::domain::ErrorCode)]
pub enum ErrorCodeSchema {
    /// The request is malformed or fails validation.
    #[schema(rename = "invalid_request")]
    InvalidRequest,
    /// The referenced epic, habit or commit does not exist.
    #[schema(rename = "not_found")]
    NotFound,
    /// The requested grid slot is already taken.
    #[schema(rename = "conflict")]
    Conflict,
    /// The parent epic has no free slot left.
    #[schema(rename = "capacity_exceeded")]
    CapacityExceeded,
    /// The change would break the epic tree, for example by creating a cycle.
    #[schema(rename = "invalid_operation")]
    InvalidOperation,
    /// The record store is unreachable.
    #[schema(rename = "service_unavailable")]
    ServiceUnavailable,
    /// An unexpected error occurred on the server.
    #[schema(rename = "internal_error")]
    InternalError,
}

/// OpenAPI schema for [`crate::domain::Error`].
#[derive(ToSchema)]
#[schema(as = crate::domain::Error)]
#[expect(
    dead_code,
    reason = "Used only for OpenAPI schema generation via utoipa"
)]
pub struct ErrorSchema {
    /// Stable machine-readable error code.
    #[schema(example = "conflict")]
    code: ErrorCodeSchema,
    /// Human-readable message returned to clients.
    #[schema(example = "position 2 is already taken under epic 3fa85f64-5717-4562-b3fc-2c963f66afa6")]
    message: String,
    /// Correlation identifier echoed in the `trace-id` header.
    #[schema(example = "00000000-0000-0000-0000-000000000000")]
    trace_id: Option<String>,
    /// Supplementary details such as the offending field.
    details: Option<serde_json::Value>,
}
