//! Driving port for habit reads.

use async_trait::async_trait;

use crate::domain::{Error, Habit, HabitCommit, HabitId};

use super::HabitFilter;

/// Page size applied when a commit listing names no limit.
pub const DEFAULT_COMMIT_LIMIT: u32 = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ListCommitsRequest {
    pub habit_id: HabitId,
    pub limit: Option<u32>,
}

impl ListCommitsRequest {
    pub fn effective_limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_COMMIT_LIMIT)
    }
}

/// Driving port for habit read operations.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait HabitQuery: Send + Sync {
    async fn get_habit(&self, habit_id: HabitId) -> Result<Habit, Error>;

    async fn list_habits(&self, filter: HabitFilter) -> Result<Vec<Habit>, Error>;

    /// Newest commits first.
    async fn list_commits(&self, request: ListCommitsRequest) -> Result<Vec<HabitCommit>, Error>;
}
