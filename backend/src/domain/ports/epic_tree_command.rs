//! Driving port for epic tree mutations.

use async_trait::async_trait;

use crate::domain::{Epic, EpicId, Error, GridPosition};

/// Request to place a new epic in the forest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CreateEpicRequest {
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    /// Parent epic; `None` creates a root.
    pub core_epic_id: Option<EpicId>,
    /// Requested slot; `None` picks the lowest free one.
    pub position: Option<GridPosition>,
}

/// Partial epic update. Outer `None` leaves a field unchanged; for nullable
/// fields `Some(None)` clears the value.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct EpicPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    pub core_epic_id: Option<Option<EpicId>>,
    pub position: Option<GridPosition>,
}

impl EpicPatch {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UpdateEpicRequest {
    pub epic_id: EpicId,
    pub patch: EpicPatch,
}

/// Outcome of a cascading delete.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeleteEpicResponse {
    /// The epic the delete was requested for, as it was before removal.
    pub epic: Epic,
    /// Epics removed, the requested one included.
    pub removed_count: u64,
}

/// Driving port for epic tree write operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EpicTreeCommand: Send + Sync {
    /// Create a root or sub-epic.
    ///
    /// Fails with `not_found` for a missing parent, `invalid_request` for a
    /// centre slot under a parent (or a non-centre slot for a root),
    /// `conflict` for an occupied slot and `capacity_exceeded` when the
    /// parent grid is full.
    async fn create_epic(&self, request: CreateEpicRequest) -> Result<Epic, Error>;

    /// Apply a partial update, moving the subtree when the parent changes.
    async fn update_epic(&self, request: UpdateEpicRequest) -> Result<Epic, Error>;

    /// Delete an epic and every transitive descendant in one transaction.
    async fn delete_epic(&self, epic_id: EpicId) -> Result<DeleteEpicResponse, Error>;

    /// Delete every epic and return how many were removed.
    async fn delete_all_epics(&self) -> Result<u64, Error>;
}
