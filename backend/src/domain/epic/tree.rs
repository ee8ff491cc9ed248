//! Nested epic views assembled from flat, level-ordered query results.

use std::collections::HashMap;

use super::{Epic, EpicId};

/// An epic together with its materialised sub-epics, ordered by slot.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EpicNode {
    pub epic: Epic,
    pub subs: Vec<EpicNode>,
}

impl EpicNode {
    /// Node without materialised children.
    pub fn leaf(epic: Epic) -> Self {
        Self {
            epic,
            subs: Vec::new(),
        }
    }

    /// Number of epics in this subtree, the node included.
    pub fn subtree_size(&self) -> usize {
        let mut count = 0;
        let mut stack = vec![self];
        while let Some(node) = stack.pop() {
            count += 1;
            stack.extend(node.subs.iter());
        }
        count
    }
}

/// Bucket epics by parent, each bucket sorted by grid slot. Roots are skipped.
pub fn group_by_parent(epics: Vec<Epic>) -> HashMap<EpicId, Vec<Epic>> {
    let mut groups: HashMap<EpicId, Vec<Epic>> = HashMap::new();
    for epic in epics {
        if let Some(parent) = epic.core_epic_id() {
            groups.entry(parent).or_default().push(epic);
        }
    }
    for siblings in groups.values_mut() {
        siblings.sort_by_key(Epic::position);
    }
    groups
}

/// Build the nested tree under `root` without recursion.
///
/// `levels[0]` holds the children of `root`, `levels[1]` their children and
/// so on. Levels are folded deepest first so every node is complete before it
/// is attached to its parent.
pub fn assemble_subtree(root: Epic, levels: Vec<Vec<Epic>>) -> EpicNode {
    let mut pending: HashMap<EpicId, Vec<EpicNode>> = HashMap::new();
    for level in levels.into_iter().rev() {
        for epic in level {
            let subs = take_children(&mut pending, epic.id());
            if let Some(parent) = epic.core_epic_id() {
                pending.entry(parent).or_default().push(EpicNode { epic, subs });
            }
        }
    }
    let subs = take_children(&mut pending, root.id());
    EpicNode { epic: root, subs }
}

fn take_children(pending: &mut HashMap<EpicId, Vec<EpicNode>>, id: EpicId) -> Vec<EpicNode> {
    let mut children = pending.remove(&id).unwrap_or_default();
    children.sort_by_key(|node| node.epic.position());
    children
}
