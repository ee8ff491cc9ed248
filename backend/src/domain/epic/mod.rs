//! Epics: goals arranged as a forest of 3×3 grids.
//!
//! Every epic either sits at the centre of its own grid as a root (depth 0) or
//! occupies one of the eight surrounding slots of its parent's grid. The
//! constructor enforces the local half of that contract; sibling uniqueness
//! and acyclicity are enforced by [`crate::domain::EpicTreeService`].

mod position;
mod tree;

use chrono::{DateTime, Utc};

pub use self::position::{GridPosition, InvalidGridPosition};
pub use self::tree::{EpicNode, assemble_subtree, group_by_parent};
pub use crate::domain::ids::EpicId;

/// Validation errors raised while constructing an [`Epic`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum EpicValidationError {
    #[error("epic title must not be empty")]
    EmptyTitle,
    #[error("epic status must not be empty")]
    EmptyStatus,
    #[error("root epics must sit at depth 0 in the centre slot")]
    RootNotCentred,
    #[error("sub-epics cannot occupy the centre slot")]
    SubEpicCentred,
    #[error("sub-epics must sit at depth 1 or deeper")]
    SubEpicAtRootDepth,
    #[error("an epic cannot be its own parent")]
    SelfParented,
}

/// Unvalidated epic fields handed to [`Epic::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpicDraft {
    pub id: EpicId,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub depth: u32,
    pub position: GridPosition,
    pub core_epic_id: Option<EpicId>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A goal node in the epic forest.
///
/// ## Invariants
/// - `title` and `status` are non-empty.
/// - Without a parent: `depth == 0` and `position` is the centre.
/// - With a parent: `depth >= 1`, `position` is a surrounding slot and the
///   parent is not the epic itself.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Epic {
    id: EpicId,
    title: String,
    description: Option<String>,
    status: String,
    depth: u32,
    position: GridPosition,
    core_epic_id: Option<EpicId>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

/// Denormalised parent/child edge kept alongside each sub-epic.
///
/// The edge is derived from the sub-epic and never edited on its own.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EpicRelation {
    pub core_epic_id: EpicId,
    pub sub_epic_id: EpicId,
    pub position_row: u8,
    pub position_col: u8,
    pub depth: u32,
}

impl Epic {
    /// Validate a draft and build an epic.
    ///
    /// # Examples
    /// ```
    /// use chrono::Utc;
    /// use mandalart::domain::{Epic, EpicDraft, EpicId, GridPosition};
    ///
    /// let now = Utc::now();
    /// let epic = Epic::new(EpicDraft {
    ///     id: EpicId::random(),
    ///     title: "Health".to_owned(),
    ///     description: None,
    ///     status: "active".to_owned(),
    ///     depth: 0,
    ///     position: GridPosition::Center,
    ///     core_epic_id: None,
    ///     created_at: now,
    ///     updated_at: now,
    /// })
    /// .expect("valid root epic");
    /// assert!(epic.relation().is_none());
    /// ```
    pub fn new(draft: EpicDraft) -> Result<Self, EpicValidationError> {
        let EpicDraft {
            id,
            title,
            description,
            status,
            depth,
            position,
            core_epic_id,
            created_at,
            updated_at,
        } = draft;

        if title.trim().is_empty() {
            return Err(EpicValidationError::EmptyTitle);
        }
        if status.trim().is_empty() {
            return Err(EpicValidationError::EmptyStatus);
        }
        match core_epic_id {
            None if depth != 0 || !position.is_center() => {
                return Err(EpicValidationError::RootNotCentred);
            }
            Some(parent) if parent == id => return Err(EpicValidationError::SelfParented),
            Some(_) if position.is_center() => return Err(EpicValidationError::SubEpicCentred),
            Some(_) if depth == 0 => return Err(EpicValidationError::SubEpicAtRootDepth),
            _ => {}
        }

        Ok(Self {
            id,
            title,
            description,
            status,
            depth,
            position,
            core_epic_id,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> EpicId {
        self.id
    }

    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn status(&self) -> &str {
        self.status.as_str()
    }

    /// Distance from the root of the epic's tree.
    pub fn depth(&self) -> u32 {
        self.depth
    }

    pub fn position(&self) -> GridPosition {
        self.position
    }

    /// Parent epic, `None` for roots.
    pub fn core_epic_id(&self) -> Option<EpicId> {
        self.core_epic_id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// The relation edge for sub-epics; roots have none.
    pub fn relation(&self) -> Option<EpicRelation> {
        let core_epic_id = self.core_epic_id?;
        let (position_row, position_col) = self.position.coordinates();
        Some(EpicRelation {
            core_epic_id,
            sub_epic_id: self.id,
            position_row,
            position_col,
            depth: self.depth,
        })
    }

    /// Return the fields as a draft so callers can derive a modified epic.
    pub fn to_draft(&self) -> EpicDraft {
        EpicDraft {
            id: self.id,
            title: self.title.clone(),
            description: self.description.clone(),
            status: self.status.clone(),
            depth: self.depth,
            position: self.position,
            core_epic_id: self.core_epic_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }

    /// Copy of this epic moved to `depth`, keeping every other field.
    ///
    /// Used when an ancestor is reparented and the subtree shifts level.
    pub(crate) fn at_depth(&self, depth: u32, updated_at: DateTime<Utc>) -> Self {
        let mut moved = self.clone();
        moved.depth = depth;
        moved.updated_at = updated_at;
        moved
    }
}
