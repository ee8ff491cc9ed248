//! In-process record store.
//!
//! Backs both repository ports with plain collections behind one mutex, so
//! every multi-row mutation is applied under a single lock and is atomic in
//! the same sense as a database transaction. Used when no database URL is
//! configured and by the behaviour tests.

use std::collections::HashSet;
use std::sync::{Mutex, MutexGuard};

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::ports::{
    EpicPage, EpicRepository, EpicRepositoryError, HabitFilter, HabitRepository,
    HabitRepositoryError, RelationFilter,
};
use crate::domain::{Epic, EpicId, EpicRelation, Habit, HabitCommit, HabitCommitId, HabitId};

#[derive(Debug, Default)]
struct Tables {
    epics: Vec<Epic>,
    habits: Vec<Habit>,
    commits: Vec<HabitCommit>,
}

fn habit_missing(id: HabitId) -> HabitRepositoryError {
    HabitRepositoryError::not_found(format!("habit {id} not found"))
}

impl Tables {
    /// Unlink habits from removed epics; nothing changes if any habit fails
    /// to rebuild.
    fn detach_habits(
        &mut self,
        removed: &HashSet<EpicId>,
        detached_at: DateTime<Utc>,
    ) -> Result<(), EpicRepositoryError> {
        let mut staged = self.habits.clone();
        for habit in &mut staged {
            if !habit.epic_id().is_some_and(|epic| removed.contains(&epic)) {
                continue;
            }
            let id = habit.id();
            let mut draft = habit.to_draft();
            draft.epic_id = None;
            draft.updated_at = detached_at;
            *habit = Habit::new(draft).map_err(|err| {
                EpicRepositoryError::query(format!("cannot detach habit {id}: {err}"))
            })?;
        }
        self.habits = staged;
        Ok(())
    }

    fn rebuild_stats(
        &mut self,
        habit_id: HabitId,
        now: DateTime<Utc>,
    ) -> Result<Habit, HabitRepositoryError> {
        let history: Vec<DateTime<Utc>> = self
            .commits
            .iter()
            .filter(|commit| commit.habit_id == habit_id)
            .map(|commit| commit.created_at)
            .collect();
        let slot = self
            .habits
            .iter_mut()
            .find(|habit| habit.id() == habit_id)
            .ok_or_else(|| habit_missing(habit_id))?;
        let stats = slot.derive_stats(&history, now);
        if stats != slot.stats() {
            *slot = slot.with_stats(stats, now);
        }
        Ok(slot.clone())
    }
}

/// Shared in-memory store implementing [`EpicRepository`] and
/// [`HabitRepository`].
#[derive(Debug, Default)]
pub struct InMemoryStore {
    tables: Mutex<Tables>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Tables>, String> {
        self.tables
            .lock()
            .map_err(|_| "in-memory store lock poisoned".to_owned())
    }

    fn epics(&self) -> Result<MutexGuard<'_, Tables>, EpicRepositoryError> {
        self.lock().map_err(|message| EpicRepositoryError::connection(message))
    }

    fn habits(&self) -> Result<MutexGuard<'_, Tables>, HabitRepositoryError> {
        self.lock().map_err(|message| HabitRepositoryError::connection(message))
    }
}

/// First pair of siblings sharing a slot, if any.
fn slot_collision(epics: &[Epic]) -> Option<&Epic> {
    let mut taken = HashSet::new();
    epics.iter().find(|epic| match epic.core_epic_id() {
        Some(parent) => !taken.insert((parent, epic.position())),
        None => false,
    })
}

fn collision_error(epic: &Epic) -> EpicRepositoryError {
    EpicRepositoryError::conflict(format!(
        "position {} is already taken under epic {}",
        epic.position().slot(),
        epic.core_epic_id()
            .map(|id| id.to_string())
            .unwrap_or_default()
    ))
}

#[async_trait]
impl EpicRepository for InMemoryStore {
    async fn insert(&self, epic: &Epic) -> Result<(), EpicRepositoryError> {
        let mut tables = self.epics()?;
        if tables.epics.iter().any(|existing| existing.id() == epic.id()) {
            return Err(EpicRepositoryError::conflict(format!(
                "epic {} already exists",
                epic.id()
            )));
        }
        let collides = epic.core_epic_id().is_some()
            && tables.epics.iter().any(|existing| {
                existing.core_epic_id() == epic.core_epic_id()
                    && existing.position() == epic.position()
            });
        if collides {
            return Err(collision_error(epic));
        }
        tables.epics.push(epic.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &EpicId) -> Result<Option<Epic>, EpicRepositoryError> {
        let tables = self.epics()?;
        Ok(tables.epics.iter().find(|epic| epic.id() == *id).cloned())
    }

    async fn find_by_ids(&self, ids: &[EpicId]) -> Result<Vec<Epic>, EpicRepositoryError> {
        let tables = self.epics()?;
        Ok(tables
            .epics
            .iter()
            .filter(|epic| ids.contains(&epic.id()))
            .cloned()
            .collect())
    }

    async fn list(&self, page: EpicPage) -> Result<Vec<Epic>, EpicRepositoryError> {
        let tables = self.epics()?;
        let limit = page.limit.map_or(usize::MAX, |limit| limit as usize);
        Ok(tables
            .epics
            .iter()
            .skip(page.skip as usize)
            .take(limit)
            .cloned()
            .collect())
    }

    async fn list_children(&self, parent_ids: &[EpicId]) -> Result<Vec<Epic>, EpicRepositoryError> {
        let tables = self.epics()?;
        let mut children: Vec<Epic> = tables
            .epics
            .iter()
            .filter(|epic| {
                epic.core_epic_id()
                    .is_some_and(|parent| parent_ids.contains(&parent))
            })
            .cloned()
            .collect();
        children.sort_by_key(Epic::position);
        Ok(children)
    }

    async fn update_many(&self, epics: &[Epic]) -> Result<(), EpicRepositoryError> {
        let mut tables = self.epics()?;
        let mut staged = tables.epics.clone();
        for epic in epics {
            let slot = staged
                .iter_mut()
                .find(|existing| existing.id() == epic.id())
                .ok_or_else(|| EpicRepositoryError::not_found(format!("epic {}", epic.id())))?;
            *slot = epic.clone();
        }
        if let Some(epic) = slot_collision(&staged) {
            return Err(collision_error(epic));
        }
        tables.epics = staged;
        Ok(())
    }

    async fn delete_many(
        &self,
        ids: &[EpicId],
        detached_at: DateTime<Utc>,
    ) -> Result<u64, EpicRepositoryError> {
        let mut tables = self.epics()?;
        let removed: HashSet<EpicId> = ids.iter().copied().collect();
        tables.detach_habits(&removed, detached_at)?;
        let before = tables.epics.len();
        tables.epics.retain(|epic| !removed.contains(&epic.id()));
        Ok((before - tables.epics.len()) as u64)
    }

    async fn delete_all(&self, detached_at: DateTime<Utc>) -> Result<u64, EpicRepositoryError> {
        let mut tables = self.epics()?;
        let removed: HashSet<EpicId> = tables.epics.iter().map(Epic::id).collect();
        tables.detach_habits(&removed, detached_at)?;
        tables.epics.clear();
        Ok(removed.len() as u64)
    }

    async fn find_relations(
        &self,
        filter: RelationFilter,
    ) -> Result<Vec<EpicRelation>, EpicRepositoryError> {
        let tables = self.epics()?;
        Ok(tables
            .epics
            .iter()
            .filter_map(Epic::relation)
            .filter(|relation| match filter {
                RelationFilter::Core(id) => relation.core_epic_id == id,
                RelationFilter::Sub(id) => relation.sub_epic_id == id,
            })
            .collect())
    }
}

#[async_trait]
impl HabitRepository for InMemoryStore {
    async fn insert(&self, habit: &Habit) -> Result<(), HabitRepositoryError> {
        let mut tables = self.habits()?;
        if tables.habits.iter().any(|existing| existing.id() == habit.id()) {
            return Err(HabitRepositoryError::query(format!(
                "habit {} already exists",
                habit.id()
            )));
        }
        tables.habits.push(habit.clone());
        Ok(())
    }

    async fn find_by_id(&self, id: &HabitId) -> Result<Option<Habit>, HabitRepositoryError> {
        let tables = self.habits()?;
        Ok(tables.habits.iter().find(|habit| habit.id() == *id).cloned())
    }

    async fn list(&self, filter: &HabitFilter) -> Result<Vec<Habit>, HabitRepositoryError> {
        let tables = self.habits()?;
        Ok(tables
            .habits
            .iter()
            .filter(|habit| filter.matches(habit))
            .cloned()
            .collect())
    }

    async fn update(&self, habit: &Habit) -> Result<Habit, HabitRepositoryError> {
        let mut tables = self.habits()?;
        let slot = tables
            .habits
            .iter_mut()
            .find(|existing| existing.id() == habit.id())
            .ok_or_else(|| habit_missing(habit.id()))?;
        *slot = habit.with_stats(slot.stats(), habit.updated_at());
        Ok(slot.clone())
    }

    async fn delete(&self, id: &HabitId) -> Result<bool, HabitRepositoryError> {
        let mut tables = self.habits()?;
        let before = tables.habits.len();
        tables.habits.retain(|habit| habit.id() != *id);
        if tables.habits.len() == before {
            return Ok(false);
        }
        tables.commits.retain(|commit| commit.habit_id != *id);
        Ok(true)
    }

    async fn append_commit(&self, commit: &HabitCommit) -> Result<Habit, HabitRepositoryError> {
        let mut tables = self.habits()?;
        if !tables.habits.iter().any(|habit| habit.id() == commit.habit_id) {
            return Err(habit_missing(commit.habit_id));
        }
        tables.commits.push(commit.clone());
        tables.rebuild_stats(commit.habit_id, commit.created_at)
    }

    async fn refresh_stats(
        &self,
        habit_id: &HabitId,
        now: DateTime<Utc>,
    ) -> Result<Habit, HabitRepositoryError> {
        let mut tables = self.habits()?;
        tables.rebuild_stats(*habit_id, now)
    }

    async fn list_commits(
        &self,
        habit_id: &HabitId,
        limit: u32,
    ) -> Result<Vec<HabitCommit>, HabitRepositoryError> {
        let tables = self.habits()?;
        let mut commits: Vec<HabitCommit> = tables
            .commits
            .iter()
            .filter(|commit| commit.habit_id == *habit_id)
            .cloned()
            .collect();
        commits.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        commits.truncate(limit as usize);
        Ok(commits)
    }

    async fn find_commit(
        &self,
        habit_id: &HabitId,
        commit_id: &HabitCommitId,
    ) -> Result<Option<HabitCommit>, HabitRepositoryError> {
        let tables = self.habits()?;
        Ok(tables
            .commits
            .iter()
            .find(|commit| commit.habit_id == *habit_id && commit.id == *commit_id)
            .cloned())
    }

    async fn update_commit(&self, commit: &HabitCommit) -> Result<(), HabitRepositoryError> {
        let mut tables = self.habits()?;
        let slot = tables
            .commits
            .iter_mut()
            .find(|existing| existing.id == commit.id && existing.habit_id == commit.habit_id)
            .ok_or_else(|| HabitRepositoryError::not_found(format!("commit {}", commit.id)))?;
        *slot = commit.clone();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::{fixture, rstest};

    use super::*;
    use crate::domain::{ComboStats, EpicDraft, GridPosition, HabitDraft, HabitStatus, Schedule};

    fn timestamp() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid time")
    }

    fn epic(parent: Option<&Epic>, position: GridPosition) -> Epic {
        Epic::new(EpicDraft {
            id: EpicId::random(),
            title: "goal".to_owned(),
            description: None,
            status: "active".to_owned(),
            depth: parent.map_or(0, |p| p.depth() + 1),
            position,
            core_epic_id: parent.map(Epic::id),
            created_at: timestamp(),
            updated_at: timestamp(),
        })
        .expect("valid epic")
    }

    fn habit(epic_id: Option<EpicId>) -> Habit {
        Habit::new(HabitDraft {
            id: HabitId::random(),
            epic_id,
            title: "Run".to_owned(),
            description: None,
            schedule: Schedule::default(),
            target_count: 1,
            status: HabitStatus::Active,
            stats: ComboStats::default(),
            created_at: timestamp(),
            updated_at: timestamp(),
        })
        .expect("valid habit")
    }

    #[fixture]
    fn store() -> InMemoryStore {
        InMemoryStore::new()
    }

    #[rstest]
    #[tokio::test]
    async fn insert_rejects_sibling_slot_collision(store: InMemoryStore) {
        let root = epic(None, GridPosition::Center);
        let first = epic(Some(&root), GridPosition::Top);
        let second = epic(Some(&root), GridPosition::Top);
        EpicRepository::insert(&store, &root).await.expect("root stored");
        EpicRepository::insert(&store, &first).await.expect("child stored");

        let err = EpicRepository::insert(&store, &second)
            .await
            .expect_err("slot taken");
        assert!(matches!(err, EpicRepositoryError::Conflict { .. }));
    }

    #[rstest]
    #[tokio::test]
    async fn update_many_is_all_or_nothing(store: InMemoryStore) {
        let root = epic(None, GridPosition::Center);
        EpicRepository::insert(&store, &root).await.expect("root stored");
        let phantom = epic(None, GridPosition::Center);
        let renamed = Epic::new(EpicDraft {
            title: "renamed".to_owned(),
            ..root.to_draft()
        })
        .expect("valid epic");

        let err = store
            .update_many(&[renamed, phantom])
            .await
            .expect_err("missing row aborts batch");
        assert!(matches!(err, EpicRepositoryError::NotFound { .. }));
        let stored = EpicRepository::find_by_id(&store, &root.id())
            .await
            .expect("lookup")
            .expect("root present");
        assert_eq!(stored.title(), "goal");
    }

    fn commit_at(habit_id: HabitId, at: DateTime<Utc>) -> HabitCommit {
        HabitCommit {
            id: HabitCommitId::random(),
            habit_id,
            description: None,
            effort: crate::domain::Effort::try_from(3).expect("valid effort"),
            created_at: at,
            updated_at: at,
        }
    }

    #[rstest]
    #[tokio::test]
    async fn delete_many_detaches_linked_habits(store: InMemoryStore) {
        let root = epic(None, GridPosition::Center);
        EpicRepository::insert(&store, &root).await.expect("root stored");
        let linked = habit(Some(root.id()));
        HabitRepository::insert(&store, &linked).await.expect("habit stored");
        let detached_at = timestamp() + chrono::Duration::days(2);

        let removed = store
            .delete_many(&[root.id()], detached_at)
            .await
            .expect("delete");

        assert_eq!(removed, 1);
        let survivor = HabitRepository::find_by_id(&store, &linked.id())
            .await
            .expect("lookup")
            .expect("habit kept");
        assert_eq!(survivor.epic_id(), None);
        assert_eq!(survivor.updated_at(), detached_at);
    }

    #[rstest]
    #[tokio::test]
    async fn delete_all_stamps_detached_habits(store: InMemoryStore) {
        let root = epic(None, GridPosition::Center);
        EpicRepository::insert(&store, &root).await.expect("root stored");
        let linked = habit(Some(root.id()));
        let unlinked = habit(None);
        HabitRepository::insert(&store, &linked).await.expect("habit stored");
        HabitRepository::insert(&store, &unlinked).await.expect("habit stored");
        let detached_at = timestamp() + chrono::Duration::hours(5);

        assert_eq!(store.delete_all(detached_at).await.expect("delete"), 1);

        let habits = HabitRepository::list(&store, &HabitFilter::default())
            .await
            .expect("listing");
        let stamps: Vec<_> = habits.iter().map(|h| (h.epic_id(), h.updated_at())).collect();
        assert_eq!(stamps, vec![(None, detached_at), (None, timestamp())]);
    }

    #[rstest]
    #[tokio::test]
    async fn append_commit_rebuilds_stats_from_the_log(store: InMemoryStore) {
        let tracked = habit(None);
        HabitRepository::insert(&store, &tracked).await.expect("habit stored");

        let first = store
            .append_commit(&commit_at(tracked.id(), timestamp()))
            .await
            .expect("first commit");
        let second = store
            .append_commit(&commit_at(tracked.id(), timestamp() + chrono::Duration::days(1)))
            .await
            .expect("second commit");

        assert_eq!(first.stats().total_completions, 1);
        assert_eq!(
            second.stats(),
            ComboStats {
                current_combo: 2,
                best_combo: 2,
                total_completions: 2,
            }
        );
    }

    #[rstest]
    #[tokio::test]
    async fn append_commit_for_missing_habit_stores_nothing(store: InMemoryStore) {
        let ghost = HabitId::random();

        let err = store
            .append_commit(&commit_at(ghost, timestamp()))
            .await
            .expect_err("habit missing");

        assert!(matches!(err, HabitRepositoryError::NotFound { .. }));
        let commits = store.list_commits(&ghost, 10).await.expect("listing");
        assert!(commits.is_empty());
    }

    #[rstest]
    #[tokio::test]
    async fn update_keeps_stored_stats(store: InMemoryStore) {
        let tracked = habit(None);
        HabitRepository::insert(&store, &tracked).await.expect("habit stored");
        store
            .append_commit(&commit_at(tracked.id(), timestamp()))
            .await
            .expect("commit stored");

        let renamed = Habit::new(HabitDraft {
            title: "Sprint".to_owned(),
            ..tracked.to_draft()
        })
        .expect("valid habit");
        let stored = HabitRepository::update(&store, &renamed)
            .await
            .expect("updated");

        assert_eq!(stored.title(), "Sprint");
        assert_eq!(stored.stats().total_completions, 1);
    }

    #[rstest]
    #[tokio::test]
    async fn deleting_a_habit_drops_its_commits(store: InMemoryStore) {
        let tracked = habit(None);
        HabitRepository::insert(&store, &tracked).await.expect("habit stored");
        store
            .append_commit(&commit_at(tracked.id(), timestamp()))
            .await
            .expect("commit stored");

        assert!(HabitRepository::delete(&store, &tracked.id()).await.expect("delete"));
        let remaining = store
            .list_commits(&tracked.id(), 10)
            .await
            .expect("listing");
        assert!(remaining.is_empty());
    }
}
