//! Port for epic persistence and the relation index.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{Epic, EpicId, EpicRelation};

use super::define_port_error;

define_port_error! {
    /// Errors raised by epic repository adapters.
    pub enum EpicRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "epic repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "epic repository query failed: {message}",
        /// A row targeted by an update was missing.
        NotFound { message: String } =>
            "epic repository row missing: {message}",
        /// A uniqueness constraint rejected the write.
        Conflict { message: String } =>
            "epic repository conflict: {message}",
    }
}

/// Offset pagination for flat epic listings.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct EpicPage {
    pub skip: u32,
    /// `None` returns every epic after `skip`.
    pub limit: Option<u32>,
}

/// Which side of the relation index to match.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RelationFilter {
    /// Relations whose parent is the given epic.
    Core(EpicId),
    /// Relations whose child is the given epic.
    Sub(EpicId),
}

/// Driven port over the epic record store.
///
/// Multi-row mutations are atomic: adapters either apply every row or none.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait EpicRepository: Send + Sync {
    /// Persist a new epic together with its relation row.
    ///
    /// Adapters report a sibling slot collision as
    /// [`EpicRepositoryError::Conflict`].
    async fn insert(&self, epic: &Epic) -> Result<(), EpicRepositoryError>;

    async fn find_by_id(&self, id: &EpicId) -> Result<Option<Epic>, EpicRepositoryError>;

    async fn find_by_ids(&self, ids: &[EpicId]) -> Result<Vec<Epic>, EpicRepositoryError>;

    /// Flat listing ordered by creation time.
    async fn list(&self, page: EpicPage) -> Result<Vec<Epic>, EpicRepositoryError>;

    /// Direct children of any of `parent_ids`, ordered by slot.
    async fn list_children(&self, parent_ids: &[EpicId]) -> Result<Vec<Epic>, EpicRepositoryError>;

    /// Replace every given epic and re-sync its relation row.
    async fn update_many(&self, epics: &[Epic]) -> Result<(), EpicRepositoryError>;

    /// Delete the given epics in order, detaching any linked habits and
    /// stamping them with `detached_at`.
    ///
    /// Returns the number of epics removed.
    async fn delete_many(
        &self,
        ids: &[EpicId],
        detached_at: DateTime<Utc>,
    ) -> Result<u64, EpicRepositoryError>;

    /// Remove every epic, detaching all linked habits.
    async fn delete_all(&self, detached_at: DateTime<Utc>) -> Result<u64, EpicRepositoryError>;

    async fn find_relations(
        &self,
        filter: RelationFilter,
    ) -> Result<Vec<EpicRelation>, EpicRepositoryError>;
}

#[cfg(test)]
mod tests {
    use rstest::rstest;

    use super::*;

    #[rstest]
    fn conflict_error_formats_message() {
        let err = EpicRepositoryError::conflict("slot 3 under parent taken");
        assert!(err.to_string().contains("slot 3 under parent taken"));
    }

    #[rstest]
    fn default_page_is_unbounded() {
        let page = EpicPage::default();
        assert_eq!(page.skip, 0);
        assert!(page.limit.is_none());
    }
}
