//! Internal Diesel row structs. Never exposed beyond the persistence layer.

use chrono::{DateTime, Utc};
use diesel::prelude::*;
use uuid::Uuid;

use super::schema::{epic_relations, epics, habit_commits, habits};

/// Row read from and inserted into the `epics` table.
#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = epics)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EpicRow {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub depth: i32,
    pub position: i16,
    pub core_epic_id: Option<Uuid>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Full replacement of the mutable epic columns; `None` writes NULL.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = epics)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct EpicChangeset<'a> {
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub status: &'a str,
    pub depth: i32,
    pub position: i16,
    pub core_epic_id: Option<Uuid>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = epic_relations)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct EpicRelationRow {
    pub core_epic_id: Uuid,
    pub sub_epic_id: Uuid,
    pub position_row: i16,
    pub position_col: i16,
    pub depth: i32,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = habits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HabitRow {
    pub id: Uuid,
    pub epic_id: Option<Uuid>,
    pub title: String,
    pub description: Option<String>,
    pub schedule: String,
    pub target_count: i32,
    pub status: String,
    pub current_combo: i32,
    pub best_combo: i32,
    pub total_completions: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Replacement of the user-editable habit columns; `None` writes NULL.
/// Statistics columns are only written under the row lock.
#[derive(Debug, Clone, AsChangeset)]
#[diesel(table_name = habits)]
#[diesel(treat_none_as_null = true)]
pub(crate) struct HabitChangeset<'a> {
    pub epic_id: Option<Uuid>,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub schedule: &'a str,
    pub target_count: i32,
    pub status: &'a str,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Queryable, Selectable, Insertable)]
#[diesel(table_name = habit_commits)]
#[diesel(check_for_backend(diesel::pg::Pg))]
pub(crate) struct HabitCommitRow {
    pub id: Uuid,
    pub habit_id: Uuid,
    pub description: Option<String>,
    pub effort: i16,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}
