//! Domain entities, engines and ports.
//!
//! Purpose: model the epic forest and the habit streak engine without any
//! framework or database dependency. Adapters reach the engines through the
//! driving ports in [`ports`] and supply storage through the driven ones.
//!
//! Public surface:
//! - [`Epic`], [`GridPosition`], [`EpicNode`]: the 3×3 goal forest.
//! - [`Habit`], [`HabitCommit`], [`Schedule`], [`ComboStats`]: habits and
//!   their streaks.
//! - [`EpicTreeService`], [`HabitStreakService`]: the two engines.
//! - [`Error`], [`ErrorCode`]: transport-agnostic failures.

pub mod epic;
mod epic_tree_service;
pub mod error;
pub mod habit;
mod habit_streak_service;
mod ids;
pub mod ports;
pub mod trace_id;

pub use self::epic::{
    Epic, EpicDraft, EpicId, EpicNode, EpicRelation, EpicValidationError, GridPosition,
    InvalidGridPosition, assemble_subtree, group_by_parent,
};
pub use self::error::{Error, ErrorCode, ErrorValidationError, TRACE_ID_HEADER};
pub use self::habit::{
    Cadence, ComboStats, DEFAULT_SCHEDULE, Effort, Habit, HabitCommit, HabitCommitId, HabitDraft,
    HabitId, HabitStatus, HabitValidationError, InvalidEffort, Period, Schedule,
    ScheduleParseError, UnknownHabitStatus,
};
pub use self::epic_tree_service::EpicTreeService;
pub use self::habit_streak_service::HabitStreakService;
pub use self::trace_id::TraceId;

/// Convenient API result alias.
///
/// # Examples
/// ```
/// use mandalart::domain::{ApiResult, Error};
///
/// fn handler() -> ApiResult<()> {
///     Err(Error::not_found("no such epic"))
/// }
/// assert!(handler().is_err());
/// ```
pub type ApiResult<T> = Result<T, Error>;
