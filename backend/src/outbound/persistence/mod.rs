//! PostgreSQL persistence adapters using Diesel ORM.
//!
//! Repositories translate between Diesel rows and domain types and carry no
//! business rules. Row structs (`models.rs`) and the table definitions
//! (`schema.rs`) stay private to this module; connections come from a `bb8`
//! pool driven by `diesel-async`.
//!
//! # Example
//!
//! ```ignore
//! use mandalart::outbound::persistence::{DbPool, DieselEpicRepository, PoolConfig};
//!
//! let pool = DbPool::new(PoolConfig::new("postgres://localhost/mandalart")).await?;
//! let epics = DieselEpicRepository::new(pool.clone());
//! ```

mod diesel_epic_repository;
mod diesel_error_mapping;
mod diesel_habit_repository;
mod migrations;
mod models;
mod pool;
mod schema;

pub use diesel_epic_repository::DieselEpicRepository;
pub use diesel_habit_repository::DieselHabitRepository;
pub use migrations::{MIGRATIONS, MigrationError, run_pending_migrations};
pub use pool::{DbPool, PoolConfig, PoolError};
