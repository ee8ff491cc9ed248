//! Port for habit and habit commit persistence.

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::domain::{EpicId, Habit, HabitCommit, HabitCommitId, HabitId, HabitStatus};

use super::define_port_error;

define_port_error! {
    /// Errors raised by habit repository adapters.
    pub enum HabitRepositoryError {
        /// Repository connection could not be established.
        Connection { message: String } =>
            "habit repository connection failed: {message}",
        /// Query or mutation failed during execution.
        Query { message: String } =>
            "habit repository query failed: {message}",
        /// A row targeted by an update was missing.
        NotFound { message: String } =>
            "habit repository row missing: {message}",
    }
}

/// Optional filters for habit listings; `None` matches everything.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct HabitFilter {
    pub epic_id: Option<EpicId>,
    pub status: Option<HabitStatus>,
}

impl HabitFilter {
    pub fn matches(&self, habit: &Habit) -> bool {
        self.epic_id.is_none_or(|epic| habit.epic_id() == Some(epic))
            && self.status.is_none_or(|status| habit.status() == status)
    }
}

/// Driven port over habits and their completion log.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HabitRepository: Send + Sync {
    async fn insert(&self, habit: &Habit) -> Result<(), HabitRepositoryError>;

    async fn find_by_id(&self, id: &HabitId) -> Result<Option<Habit>, HabitRepositoryError>;

    /// Habits matching `filter`, ordered by creation time.
    async fn list(&self, filter: &HabitFilter) -> Result<Vec<Habit>, HabitRepositoryError>;

    /// Replace the editable columns of a habit, leaving its statistics as
    /// stored. Returns the habit as persisted.
    async fn update(&self, habit: &Habit) -> Result<Habit, HabitRepositoryError>;

    /// Delete a habit and every commit it owns in one transaction.
    ///
    /// Returns `false` when no habit matched.
    async fn delete(&self, id: &HabitId) -> Result<bool, HabitRepositoryError>;

    /// Store a commit and rebuild the habit's statistics from its full
    /// log as of the commit time.
    ///
    /// The habit row stays locked from the commit insert until the new
    /// statistics are written, so concurrent completions serialise.
    /// Returns the refreshed habit.
    async fn append_commit(&self, commit: &HabitCommit) -> Result<Habit, HabitRepositoryError>;

    /// Rebuild the habit's statistics from its commit log as of `now`
    /// under the same row lock as [`HabitRepository::append_commit`].
    async fn refresh_stats(
        &self,
        habit_id: &HabitId,
        now: DateTime<Utc>,
    ) -> Result<Habit, HabitRepositoryError>;

    /// Most recent commits first, at most `limit` rows.
    async fn list_commits(
        &self,
        habit_id: &HabitId,
        limit: u32,
    ) -> Result<Vec<HabitCommit>, HabitRepositoryError>;

    async fn find_commit(
        &self,
        habit_id: &HabitId,
        commit_id: &HabitCommitId,
    ) -> Result<Option<HabitCommit>, HabitRepositoryError>;

    /// Replace the note and effort of an existing commit.
    async fn update_commit(&self, commit: &HabitCommit) -> Result<(), HabitRepositoryError>;
}

#[cfg(test)]
mod tests {
    use chrono::TimeZone;
    use rstest::rstest;

    use super::*;
    use crate::domain::{ComboStats, HabitDraft, Schedule};

    fn habit(epic_id: Option<EpicId>, status: HabitStatus) -> Habit {
        let now = Utc
            .with_ymd_and_hms(2026, 3, 1, 9, 0, 0)
            .single()
            .expect("valid time");
        Habit::new(HabitDraft {
            id: HabitId::random(),
            epic_id,
            title: "Read".to_owned(),
            description: None,
            schedule: Schedule::default(),
            target_count: 1,
            status,
            stats: ComboStats::default(),
            created_at: now,
            updated_at: now,
        })
        .expect("valid habit")
    }

    #[rstest]
    fn empty_filter_matches_everything() {
        assert!(HabitFilter::default().matches(&habit(None, HabitStatus::Paused)));
    }

    #[rstest]
    fn filters_combine_epic_and_status() {
        let epic = EpicId::random();
        let filter = HabitFilter {
            epic_id: Some(epic),
            status: Some(HabitStatus::Active),
        };
        assert!(filter.matches(&habit(Some(epic), HabitStatus::Active)));
        assert!(!filter.matches(&habit(Some(epic), HabitStatus::Archived)));
        assert!(!filter.matches(&habit(None, HabitStatus::Active)));
    }
}
