//! Habits: recurring actions optionally attached to an epic, with cached
//! streak statistics derived from their completion history.

mod combo;
mod schedule;

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

pub use self::combo::ComboStats;
pub use self::schedule::{Cadence, DEFAULT_SCHEDULE, Period, Schedule, ScheduleParseError};
pub use crate::domain::ids::{HabitCommitId, HabitId};

use crate::domain::EpicId;

/// Lifecycle state of a habit.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HabitStatus {
    #[default]
    Active,
    Paused,
    Completed,
    Archived,
}

impl HabitStatus {
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Active => "active",
            Self::Paused => "paused",
            Self::Completed => "completed",
            Self::Archived => "archived",
        }
    }
}

impl fmt::Display for HabitStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Raised when a status string names no known [`HabitStatus`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown habit status: {0}")]
pub struct UnknownHabitStatus(pub String);

impl FromStr for HabitStatus {
    type Err = UnknownHabitStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "active" => Ok(Self::Active),
            "paused" => Ok(Self::Paused),
            "completed" => Ok(Self::Completed),
            "archived" => Ok(Self::Archived),
            _ => Err(UnknownHabitStatus(s.to_owned())),
        }
    }
}

/// Self-reported effort attached to a completion, from 1 (trivial) to 5.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub struct Effort(u8);

impl Effort {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 5;

    pub const fn value(self) -> u8 {
        self.0
    }
}

/// Raised when an effort score falls outside `1..=5`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
#[error("effort must be between 1 and 5, got {0}")]
pub struct InvalidEffort(pub u8);

impl TryFrom<u8> for Effort {
    type Error = InvalidEffort;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        if (Self::MIN..=Self::MAX).contains(&value) {
            Ok(Self(value))
        } else {
            Err(InvalidEffort(value))
        }
    }
}

impl From<Effort> for u8 {
    fn from(value: Effort) -> Self {
        value.0
    }
}

/// Validation errors raised while constructing a [`Habit`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum HabitValidationError {
    #[error("habit title must not be empty")]
    EmptyTitle,
    #[error("habit target count must be at least 1")]
    ZeroTarget,
}

/// Unvalidated habit fields handed to [`Habit::new`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitDraft {
    pub id: HabitId,
    pub epic_id: Option<EpicId>,
    pub title: String,
    pub description: Option<String>,
    pub schedule: Schedule,
    pub target_count: u32,
    pub status: HabitStatus,
    pub stats: ComboStats,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// A recurring action tracked for streaks.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Habit {
    id: HabitId,
    epic_id: Option<EpicId>,
    title: String,
    description: Option<String>,
    schedule: Schedule,
    target_count: u32,
    status: HabitStatus,
    stats: ComboStats,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl Habit {
    pub fn new(draft: HabitDraft) -> Result<Self, HabitValidationError> {
        let HabitDraft {
            id,
            epic_id,
            title,
            description,
            schedule,
            target_count,
            status,
            stats,
            created_at,
            updated_at,
        } = draft;

        if title.trim().is_empty() {
            return Err(HabitValidationError::EmptyTitle);
        }
        if target_count == 0 {
            return Err(HabitValidationError::ZeroTarget);
        }

        Ok(Self {
            id,
            epic_id,
            title,
            description,
            schedule,
            target_count,
            status,
            stats,
            created_at,
            updated_at,
        })
    }

    pub fn id(&self) -> HabitId {
        self.id
    }

    /// Epic this habit serves, if any.
    pub fn epic_id(&self) -> Option<EpicId> {
        self.epic_id
    }

    pub fn title(&self) -> &str {
        self.title.as_str()
    }

    pub fn description(&self) -> Option<&str> {
        self.description.as_deref()
    }

    pub fn schedule(&self) -> &Schedule {
        &self.schedule
    }

    /// Completions needed per period when the schedule names no count.
    pub fn target_count(&self) -> u32 {
        self.target_count
    }

    pub fn status(&self) -> HabitStatus {
        self.status
    }

    pub fn stats(&self) -> ComboStats {
        self.stats
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn updated_at(&self) -> DateTime<Utc> {
        self.updated_at
    }

    /// Recompute cached statistics from a completion history.
    pub fn derive_stats(&self, completions: &[DateTime<Utc>], now: DateTime<Utc>) -> ComboStats {
        ComboStats::compute(self.schedule.cadence(), self.target_count, completions, now)
    }

    /// Copy carrying new statistics.
    pub fn with_stats(&self, stats: ComboStats, updated_at: DateTime<Utc>) -> Self {
        let mut next = self.clone();
        next.stats = stats;
        next.updated_at = updated_at;
        next
    }

    pub fn to_draft(&self) -> HabitDraft {
        HabitDraft {
            id: self.id,
            epic_id: self.epic_id,
            title: self.title.clone(),
            description: self.description.clone(),
            schedule: self.schedule.clone(),
            target_count: self.target_count,
            status: self.status,
            stats: self.stats,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

/// One recorded completion of a habit.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HabitCommit {
    pub id: HabitCommitId,
    pub habit_id: HabitId,
    pub description: Option<String>,
    pub effort: Effort,
    /// When the completion happened; drives streak computation.
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
