//! Diesel table definitions. Must match `backend/migrations` exactly.

diesel::table! {
    /// Goal nodes. `position` is the grid slot (0 centre, 1-8 clockwise).
    epics (id) {
        id -> Uuid,
        title -> Varchar,
        description -> Nullable<Text>,
        status -> Varchar,
        depth -> Int4,
        position -> Int2,
        core_epic_id -> Nullable<Uuid>,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Denormalised parent/child index, one row per sub-epic.
    epic_relations (core_epic_id, sub_epic_id) {
        core_epic_id -> Uuid,
        sub_epic_id -> Uuid,
        position_row -> Int2,
        position_col -> Int2,
        depth -> Int4,
    }
}

diesel::table! {
    habits (id) {
        id -> Uuid,
        epic_id -> Nullable<Uuid>,
        title -> Varchar,
        description -> Nullable<Text>,
        schedule -> Varchar,
        target_count -> Int4,
        status -> Varchar,
        current_combo -> Int4,
        best_combo -> Int4,
        total_completions -> Int4,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::table! {
    /// Completion log; `created_at` orders streak computation.
    habit_commits (id) {
        id -> Uuid,
        habit_id -> Uuid,
        description -> Nullable<Text>,
        effort -> Int2,
        created_at -> Timestamptz,
        updated_at -> Timestamptz,
    }
}

diesel::joinable!(habit_commits -> habits (habit_id));
diesel::joinable!(habits -> epics (epic_id));

diesel::allow_tables_to_appear_in_same_query!(epics, epic_relations, habits, habit_commits);
