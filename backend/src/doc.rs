//! OpenAPI documentation configuration.
//!
//! [`ApiDoc`] registers every epic, habit and health endpoint together with
//! the request/response bodies and the domain error wrappers
//! ([`ErrorSchema`], [`ErrorCodeSchema`]), so domain types stay free of
//! utoipa derives.
//!
//! The generated document backs Swagger UI in debug builds and is exported
//! via `cargo run --bin openapi-dump` for client generation.

use utoipa::OpenApi;

use crate::inbound::http::epics::{
    CreateEpicRequestBody, DeleteAllEpicsBody, EpicBody, RelatedEpicBody, UpdateEpicRequestBody,
};
use crate::inbound::http::habits::{
    CreateHabitRequestBody, HabitBody, HabitCommitBody, RecordCompletionRequestBody,
    UpdateCommitRequestBody, UpdateHabitRequestBody,
};
use crate::inbound::http::schemas::{ErrorCodeSchema, ErrorSchema};

/// OpenAPI document for the REST API.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Mandalart backend API",
        description = "Goal grids (epics) arranged as 3×3 trees, and habits with streak tracking."
    ),
    servers(
        (url = "/", description = "Relative to the deployment base URL")
    ),
    paths(
        crate::inbound::http::epics::create_epic,
        crate::inbound::http::epics::list_epics,
        crate::inbound::http::epics::delete_all_epics,
        crate::inbound::http::epics::get_epic,
        crate::inbound::http::epics::update_epic,
        crate::inbound::http::epics::delete_epic,
        crate::inbound::http::epics::list_subs,
        crate::inbound::http::epics::list_cores,
        crate::inbound::http::habits::create_habit,
        crate::inbound::http::habits::list_habits,
        crate::inbound::http::habits::get_habit,
        crate::inbound::http::habits::update_habit,
        crate::inbound::http::habits::delete_habit,
        crate::inbound::http::habits::update_habit_status,
        crate::inbound::http::habits::record_completion,
        crate::inbound::http::habits::list_commits,
        crate::inbound::http::habits::update_commit,
        crate::inbound::http::habits::recompute_stats,
        crate::inbound::http::health::ready,
        crate::inbound::http::health::live,
    ),
    components(schemas(
        CreateEpicRequestBody,
        UpdateEpicRequestBody,
        EpicBody,
        RelatedEpicBody,
        DeleteAllEpicsBody,
        CreateHabitRequestBody,
        UpdateHabitRequestBody,
        HabitBody,
        RecordCompletionRequestBody,
        UpdateCommitRequestBody,
        HabitCommitBody,
        ErrorSchema,
        ErrorCodeSchema
    )),
    tags(
        (name = "epics", description = "Goal grids and their sub-epics"),
        (name = "habits", description = "Habits, completions and streaks"),
        (name = "health", description = "Endpoints for health checks")
    )
)]
pub struct ApiDoc;
