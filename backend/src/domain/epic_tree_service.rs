//! Epic tree engine.
//!
//! Places epics on their parent's 3×3 grid, keeps depths consistent when
//! subtrees move, refuses reparenting that would create a cycle and deletes
//! whole subtrees in one store transaction. Every tree walk is iterative.

use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use async_trait::async_trait;
use mockable::Clock;
use tracing::info;

use crate::domain::ports::{
    CreateEpicRequest, DeleteEpicResponse, EpicRepository, EpicRepositoryError, EpicTreeCommand,
    EpicTreeQuery, ListEpicsRequest, RelatedEpic, RelationFilter, UpdateEpicRequest,
};
use crate::domain::{
    Epic, EpicDraft, EpicId, EpicNode, EpicRelation, EpicValidationError, Error, GridPosition,
    assemble_subtree, group_by_parent,
};

pub(super) fn map_repository_error(error: EpicRepositoryError) -> Error {
    match error {
        EpicRepositoryError::Connection { message } => {
            Error::service_unavailable(format!("epic repository unavailable: {message}"))
        }
        EpicRepositoryError::Query { message } => {
            Error::internal(format!("epic repository error: {message}"))
        }
        EpicRepositoryError::NotFound { message } => Error::not_found(message),
        EpicRepositoryError::Conflict { message } => Error::conflict(message),
    }
}

fn map_validation_error(error: EpicValidationError) -> Error {
    Error::invalid_request(format!("invalid epic: {error}"))
}

fn epic_not_found(id: EpicId) -> Error {
    Error::not_found(format!("epic {id} not found"))
}

/// Choose a slot among `siblings`, ignoring `moving` when it is one of them.
fn allocate_slot(
    siblings: &[Epic],
    requested: Option<GridPosition>,
    moving: Option<EpicId>,
) -> Result<GridPosition, Error> {
    let occupied = |slot: GridPosition| {
        siblings
            .iter()
            .any(|sibling| Some(sibling.id()) != moving && sibling.position() == slot)
    };
    match requested {
        Some(GridPosition::Center) => Err(Error::invalid_request(
            "sub-epics cannot occupy the centre slot",
        )),
        Some(slot) if occupied(slot) => Err(Error::conflict(format!(
            "position {} is already taken under this epic",
            slot.slot()
        ))),
        Some(slot) => Ok(slot),
        None => GridPosition::first_free(occupied).ok_or_else(|| {
            Error::capacity_exceeded("all eight surrounding positions are taken")
        }),
    }
}

/// Epic tree service implementing the epic driving ports.
#[derive(Clone)]
pub struct EpicTreeService<R> {
    epic_repo: Arc<R>,
    clock: Arc<dyn Clock>,
}

impl<R> EpicTreeService<R> {
    /// Create the service over an epic repository and a clock for audit stamps.
    pub fn new(epic_repo: Arc<R>, clock: Arc<dyn Clock>) -> Self {
        Self { epic_repo, clock }
    }
}

impl<R> EpicTreeService<R>
where
    R: EpicRepository,
{
    async fn load(&self, id: EpicId) -> Result<Epic, Error> {
        self.epic_repo
            .find_by_id(&id)
            .await
            .map_err(map_repository_error)?
            .ok_or_else(|| epic_not_found(id))
    }

    async fn children_of(&self, parent_ids: &[EpicId]) -> Result<Vec<Epic>, Error> {
        self.epic_repo
            .list_children(parent_ids)
            .await
            .map_err(map_repository_error)
    }

    /// Descendants of `root` grouped by distance, nearest level first.
    async fn descendant_levels(&self, root: EpicId) -> Result<Vec<Vec<Epic>>, Error> {
        let mut levels = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut frontier = vec![root];
        while !frontier.is_empty() {
            let mut children = self.children_of(&frontier).await?;
            children.retain(|child| seen.insert(child.id()));
            if children.is_empty() {
                break;
            }
            frontier = children.iter().map(Epic::id).collect();
            levels.push(children);
        }
        Ok(levels)
    }

    /// Walk up from `parent_id` and reject the move if `moving` is an ancestor.
    ///
    /// Returns the new parent's depth.
    async fn ensure_acyclic(&self, moving: EpicId, parent_id: EpicId) -> Result<u32, Error> {
        if moving == parent_id {
            return Err(Error::invalid_operation("an epic cannot be its own parent"));
        }
        let parent = self.load(parent_id).await?;
        let mut visited = HashSet::from([parent_id]);
        let mut cursor = parent.core_epic_id();
        while let Some(ancestor_id) = cursor {
            if ancestor_id == moving {
                return Err(Error::invalid_operation(format!(
                    "moving epic {moving} under {parent_id} would create a cycle"
                )));
            }
            if !visited.insert(ancestor_id) {
                return Err(Error::internal(format!(
                    "stored epic tree already contains a cycle at {ancestor_id}"
                )));
            }
            let ancestor = self
                .epic_repo
                .find_by_id(&ancestor_id)
                .await
                .map_err(map_repository_error)?;
            cursor = match ancestor {
                Some(ancestor) => ancestor.core_epic_id(),
                None => {
                    return Err(Error::internal(format!(
                        "epic {ancestor_id} is referenced as a parent but missing"
                    )));
                }
            };
        }
        Ok(parent.depth())
    }

    /// Subtree ids with every child listed before its parent.
    async fn post_order(&self, root: EpicId) -> Result<Vec<EpicId>, Error> {
        let mut order = Vec::new();
        let mut seen = HashSet::from([root]);
        let mut stack = vec![(root, false)];
        while let Some((id, expanded)) = stack.pop() {
            if expanded {
                order.push(id);
                continue;
            }
            stack.push((id, true));
            for child in self.children_of(&[id]).await? {
                if seen.insert(child.id()) {
                    stack.push((child.id(), false));
                }
            }
        }
        Ok(order)
    }

    async fn related(
        &self,
        filter: RelationFilter,
        other_side: impl Fn(&EpicRelation) -> EpicId,
    ) -> Result<Vec<RelatedEpic>, Error> {
        let relations = self
            .epic_repo
            .find_relations(filter)
            .await
            .map_err(map_repository_error)?;
        let ids: Vec<EpicId> = relations.iter().map(&other_side).collect();
        let titles: HashMap<EpicId, String> = self
            .epic_repo
            .find_by_ids(&ids)
            .await
            .map_err(map_repository_error)?
            .into_iter()
            .map(|epic| (epic.id(), epic.title().to_owned()))
            .collect();
        let mut related: Vec<RelatedEpic> = relations
            .iter()
            .filter_map(|relation| {
                let epic_id = other_side(relation);
                titles.get(&epic_id).map(|title| RelatedEpic {
                    epic_id,
                    title: title.clone(),
                    position_row: relation.position_row,
                    position_col: relation.position_col,
                    depth: relation.depth,
                })
            })
            .collect();
        related.sort_by_key(|entry| (entry.position_row, entry.position_col));
        Ok(related)
    }
}

#[async_trait]
impl<R> EpicTreeCommand for EpicTreeService<R>
where
    R: EpicRepository,
{
    async fn create_epic(&self, request: CreateEpicRequest) -> Result<Epic, Error> {
        let CreateEpicRequest {
            title,
            description,
            status,
            core_epic_id,
            position,
        } = request;

        let (depth, position) = match core_epic_id {
            None => {
                if position.is_some_and(|slot| !slot.is_center()) {
                    return Err(Error::invalid_request(
                        "root epics always occupy the centre position",
                    ));
                }
                (0, GridPosition::Center)
            }
            Some(parent_id) => {
                let parent = self.load(parent_id).await?;
                let siblings = self.children_of(&[parent_id]).await?;
                (parent.depth() + 1, allocate_slot(&siblings, position, None)?)
            }
        };

        let now = self.clock.utc();
        let epic = Epic::new(EpicDraft {
            id: EpicId::random(),
            title,
            description,
            status,
            depth,
            position,
            core_epic_id,
            created_at: now,
            updated_at: now,
        })
        .map_err(map_validation_error)?;

        self.epic_repo
            .insert(&epic)
            .await
            .map_err(map_repository_error)?;

        info!(
            epic_id = %epic.id(),
            depth = epic.depth(),
            position = epic.position().slot(),
            "epic created"
        );
        Ok(epic)
    }

    async fn update_epic(&self, request: UpdateEpicRequest) -> Result<Epic, Error> {
        let UpdateEpicRequest { epic_id, patch } = request;
        let current = self.load(epic_id).await?;
        if patch.is_empty() {
            return Ok(current);
        }

        let mut draft = current.to_draft();
        if let Some(title) = patch.title {
            draft.title = title;
        }
        if let Some(description) = patch.description {
            draft.description = description;
        }
        if let Some(status) = patch.status {
            draft.status = status;
        }

        let new_parent = patch.core_epic_id.unwrap_or(current.core_epic_id());
        let reparented = new_parent != current.core_epic_id();
        match new_parent {
            None => {
                if patch.position.is_some_and(|slot| !slot.is_center()) {
                    return Err(Error::invalid_request(
                        "root epics always occupy the centre position",
                    ));
                }
                draft.depth = 0;
                draft.position = GridPosition::Center;
            }
            Some(parent_id) => {
                let parent_depth = if reparented {
                    self.ensure_acyclic(epic_id, parent_id).await?
                } else {
                    current.depth().saturating_sub(1)
                };
                let siblings = self.children_of(&[parent_id]).await?;
                draft.position = match (patch.position, reparented) {
                    (Some(slot), _) => allocate_slot(&siblings, Some(slot), Some(epic_id))?,
                    (None, false) => current.position(),
                    (None, true) => {
                        let keep = current.position();
                        let taken = keep.is_center()
                            || siblings.iter().any(|sibling| sibling.position() == keep);
                        if taken {
                            allocate_slot(&siblings, None, Some(epic_id))?
                        } else {
                            keep
                        }
                    }
                };
                draft.depth = parent_depth + 1;
            }
        }
        draft.core_epic_id = new_parent;

        let now = self.clock.utc();
        draft.updated_at = now;
        let updated = Epic::new(draft).map_err(map_validation_error)?;

        let mut changed = vec![updated.clone()];
        if updated.depth() != current.depth() {
            for (distance, level) in (1..).zip(self.descendant_levels(epic_id).await?) {
                let depth = updated.depth() + distance;
                changed.extend(level.iter().map(|epic| epic.at_depth(depth, now)));
            }
        }

        self.epic_repo
            .update_many(&changed)
            .await
            .map_err(map_repository_error)?;

        info!(
            epic_id = %epic_id,
            reparented,
            depth = updated.depth(),
            shifted_descendants = changed.len() - 1,
            "epic updated"
        );
        Ok(updated)
    }

    async fn delete_epic(&self, epic_id: EpicId) -> Result<DeleteEpicResponse, Error> {
        let epic = self.load(epic_id).await?;
        let order = self.post_order(epic_id).await?;
        let removed_count = self
            .epic_repo
            .delete_many(&order, self.clock.utc())
            .await
            .map_err(map_repository_error)?;

        info!(epic_id = %epic_id, removed_count, "epic subtree deleted");
        Ok(DeleteEpicResponse {
            epic,
            removed_count,
        })
    }

    async fn delete_all_epics(&self) -> Result<u64, Error> {
        let count = self
            .epic_repo
            .delete_all(self.clock.utc())
            .await
            .map_err(map_repository_error)?;
        info!(count, "all epics deleted");
        Ok(count)
    }
}

#[async_trait]
impl<R> EpicTreeQuery for EpicTreeService<R>
where
    R: EpicRepository,
{
    async fn get_epic(&self, epic_id: EpicId) -> Result<EpicNode, Error> {
        let root = self.load(epic_id).await?;
        let levels = self.descendant_levels(epic_id).await?;
        Ok(assemble_subtree(root, levels))
    }

    async fn list_epics(&self, request: ListEpicsRequest) -> Result<Vec<EpicNode>, Error> {
        let epics = self
            .epic_repo
            .list(request.page)
            .await
            .map_err(map_repository_error)?;
        if !request.include_subs || epics.is_empty() {
            return Ok(epics.into_iter().map(EpicNode::leaf).collect());
        }

        let ids: Vec<EpicId> = epics.iter().map(Epic::id).collect();
        let mut children = group_by_parent(self.children_of(&ids).await?);
        Ok(epics
            .into_iter()
            .map(|epic| {
                let subs = children
                    .remove(&epic.id())
                    .unwrap_or_default()
                    .into_iter()
                    .map(EpicNode::leaf)
                    .collect();
                EpicNode { epic, subs }
            })
            .collect())
    }

    async fn list_subs(&self, core_epic_id: EpicId) -> Result<Vec<RelatedEpic>, Error> {
        self.load(core_epic_id).await?;
        self.related(RelationFilter::Core(core_epic_id), |relation| {
            relation.sub_epic_id
        })
        .await
    }

    async fn list_cores(&self, sub_epic_id: EpicId) -> Result<Vec<RelatedEpic>, Error> {
        self.load(sub_epic_id).await?;
        self.related(RelationFilter::Sub(sub_epic_id), |relation| {
            relation.core_epic_id
        })
        .await
    }
}

#[cfg(test)]
#[path = "epic_tree_service_tests.rs"]
mod tests;
