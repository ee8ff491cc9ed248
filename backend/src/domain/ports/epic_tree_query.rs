//! Driving port for epic tree reads.

use async_trait::async_trait;

use crate::domain::{EpicId, EpicNode, Error};

use super::EpicPage;

/// Flat epic listing request.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ListEpicsRequest {
    pub page: EpicPage,
    /// Attach each epic's immediate children.
    pub include_subs: bool,
}

/// One side of a relation-index entry, named from the caller's viewpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RelatedEpic {
    pub epic_id: EpicId,
    pub title: String,
    pub position_row: u8,
    pub position_col: u8,
    pub depth: u32,
}

/// Driving port for epic tree read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EpicTreeQuery: Send + Sync {
    /// Fetch an epic with its whole subtree materialised.
    async fn get_epic(&self, epic_id: EpicId) -> Result<EpicNode, Error>;

    async fn list_epics(&self, request: ListEpicsRequest) -> Result<Vec<EpicNode>, Error>;

    /// Sub-epics recorded under `core_epic_id` in the relation index.
    async fn list_subs(&self, core_epic_id: EpicId) -> Result<Vec<RelatedEpic>, Error>;

    /// Parents recorded for `sub_epic_id` in the relation index.
    async fn list_cores(&self, sub_epic_id: EpicId) -> Result<Vec<RelatedEpic>, Error>;
}
