//! Domain ports for the hexagonal boundary.
//!
//! Driven ports (`*Repository`) describe the record store the engines need.
//! Driving ports (`*Command`, `*Query`) are what inbound adapters call.

mod macros;
pub(crate) use macros::define_port_error;

mod epic_repository;
mod epic_tree_command;
mod epic_tree_query;
mod habit_command;
mod habit_query;
mod habit_repository;

#[cfg(test)]
pub use epic_repository::MockEpicRepository;
pub use epic_repository::{EpicPage, EpicRepository, EpicRepositoryError, RelationFilter};
#[cfg(test)]
pub use epic_tree_command::MockEpicTreeCommand;
pub use epic_tree_command::{
    CreateEpicRequest, DeleteEpicResponse, EpicPatch, EpicTreeCommand, UpdateEpicRequest,
};
#[cfg(test)]
pub use epic_tree_query::MockEpicTreeQuery;
pub use epic_tree_query::{EpicTreeQuery, ListEpicsRequest, RelatedEpic};
#[cfg(test)]
pub use habit_command::MockHabitCommand;
pub use habit_command::{
    CreateHabitRequest, HabitCommand, HabitPatch, RecordCompletionRequest, UpdateCommitRequest,
    UpdateHabitRequest,
};
#[cfg(test)]
pub use habit_query::MockHabitQuery;
pub use habit_query::{DEFAULT_COMMIT_LIMIT, HabitQuery, ListCommitsRequest};
#[cfg(test)]
pub use habit_repository::MockHabitRepository;
pub use habit_repository::{HabitFilter, HabitRepository, HabitRepositoryError};
