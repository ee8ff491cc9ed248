//! Habit and completion HTTP handlers.
//!
//! ```text
//! POST   /api/habit
//! GET    /api/habit?epic_id&status
//! GET    /api/habit/{habit_id}
//! PUT    /api/habit/{habit_id}
//! DELETE /api/habit/{habit_id}
//! PATCH  /api/habit/{habit_id}/status?status=
//! POST   /api/habit/{habit_id}/commit
//! GET    /api/habit/{habit_id}/commits?limit=50
//! PUT    /api/habit/{habit_id}/commits/{commit_id}
//! POST   /api/habit/{habit_id}/recompute
//! ```

use actix_web::{HttpResponse, delete, get, patch, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CreateHabitRequest, HabitFilter, HabitPatch, ListCommitsRequest, RecordCompletionRequest,
    UpdateCommitRequest, UpdateHabitRequest,
};
use crate::domain::{Error, Habit, HabitCommit};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_commit_id, parse_epic_id, parse_habit_id, parse_habit_status,
    parse_optional_epic_id, present,
};

/// Request payload for creating a habit.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateHabitRequestBody {
    #[schema(format = "uuid")]
    pub epic_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    /// Recurrence such as `daily`, `3 times per week` or a cron expression.
    /// Defaults to `0 9 * * *`.
    #[schema(example = "3 times per week")]
    pub schedule: Option<String>,
    /// Completions needed per period when the schedule names no count.
    #[schema(minimum = 1)]
    pub target_count: Option<u32>,
}

/// Partial habit update; streak counters are not writable.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateHabitRequestBody {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub schedule: Option<String>,
    #[schema(minimum = 1)]
    pub target_count: Option<u32>,
    #[schema(example = "paused")]
    pub status: Option<String>,
    /// Linked epic; `null` detaches the habit.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub epic_id: Option<Option<String>>,
}

/// Habit as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HabitBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub epic_id: Option<String>,
    pub title: String,
    pub description: Option<String>,
    pub schedule: String,
    pub target_count: u32,
    #[schema(example = "active")]
    pub status: String,
    pub current_combo: u32,
    pub best_combo: u32,
    pub total_completions: u32,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub updated_at: String,
}

impl From<&Habit> for HabitBody {
    fn from(habit: &Habit) -> Self {
        let stats = habit.stats();
        Self {
            id: habit.id().to_string(),
            epic_id: habit.epic_id().map(|id| id.to_string()),
            title: habit.title().to_owned(),
            description: habit.description().map(str::to_owned),
            schedule: habit.schedule().to_string(),
            target_count: habit.target_count(),
            status: habit.status().to_string(),
            current_combo: stats.current_combo,
            best_combo: stats.best_combo,
            total_completions: stats.total_completions,
            created_at: habit.created_at().to_rfc3339(),
            updated_at: habit.updated_at().to_rfc3339(),
        }
    }
}

/// Request payload for recording a completion.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct RecordCompletionRequestBody {
    pub description: Option<String>,
    #[schema(minimum = 1, maximum = 5)]
    pub effort: u8,
}

/// Edit of a recorded completion's note or effort.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateCommitRequestBody {
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    #[schema(minimum = 1, maximum = 5)]
    pub effort: Option<u8>,
}

/// Completion as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct HabitCommitBody {
    #[schema(format = "uuid")]
    pub id: String,
    #[schema(format = "uuid")]
    pub habit_id: String,
    pub description: Option<String>,
    pub effort: u8,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub updated_at: String,
}

impl From<HabitCommit> for HabitCommitBody {
    fn from(commit: HabitCommit) -> Self {
        Self {
            id: commit.id.to_string(),
            habit_id: commit.habit_id.to_string(),
            description: commit.description,
            effort: commit.effort.value(),
            created_at: commit.created_at.to_rfc3339(),
            updated_at: commit.updated_at.to_rfc3339(),
        }
    }
}

/// Filters for the habit listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListHabitsParams {
    /// Only habits linked to this epic.
    #[param(format = "uuid")]
    pub epic_id: Option<String>,
    /// Only habits in this status.
    pub status: Option<String>,
}

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct HabitStatusParams {
    /// One of `active`, `paused`, `completed`, `archived`.
    pub status: String,
}

#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListCommitsParams {
    /// Maximum number of commits, newest first. Defaults to 50.
    pub limit: Option<u32>,
}

fn habit_id_from(path: String) -> Result<crate::domain::HabitId, Error> {
    parse_habit_id(&path, FieldName::new("habit_id"))
}

fn parse_create(body: CreateHabitRequestBody) -> Result<CreateHabitRequest, Error> {
    Ok(CreateHabitRequest {
        epic_id: parse_optional_epic_id(body.epic_id, FieldName::new("epic_id"))?,
        title: body.title,
        description: body.description,
        schedule: body.schedule,
        target_count: body.target_count,
    })
}

fn parse_patch(body: UpdateHabitRequestBody) -> Result<HabitPatch, Error> {
    let epic_id = match body.epic_id {
        None => None,
        Some(raw) => Some(parse_optional_epic_id(raw, FieldName::new("epic_id"))?),
    };
    Ok(HabitPatch {
        title: body.title,
        description: body.description,
        schedule: body.schedule,
        target_count: body.target_count,
        status: body
            .status
            .map(|raw| parse_habit_status(&raw, FieldName::new("status")))
            .transpose()?,
        epic_id,
    })
}

fn parse_filter(params: ListHabitsParams) -> Result<HabitFilter, Error> {
    Ok(HabitFilter {
        epic_id: params
            .epic_id
            .map(|raw| parse_epic_id(&raw, FieldName::new("epic_id")))
            .transpose()?,
        status: params
            .status
            .map(|raw| parse_habit_status(&raw, FieldName::new("status")))
            .transpose()?,
    })
}

/// Create a habit, optionally linked to an epic.
#[utoipa::path(
    post,
    path = "/api/habit",
    request_body = CreateHabitRequestBody,
    responses(
        (status = 200, description = "Habit created", body = HabitBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Linked epic not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "createHabit"
)]
#[post("/habit")]
pub async fn create_habit(
    state: web::Data<HttpState>,
    payload: web::Json<CreateHabitRequestBody>,
) -> ApiResult<web::Json<HabitBody>> {
    let request = parse_create(payload.into_inner())?;
    let habit = state.habits.create_habit(request).await?;
    Ok(web::Json(HabitBody::from(&habit)))
}

/// List habits, optionally filtered by epic and status.
#[utoipa::path(
    get,
    path = "/api/habit",
    params(ListHabitsParams),
    responses(
        (status = 200, description = "Habits", body = [HabitBody]),
        (status = 400, description = "Invalid filter", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "getHabits"
)]
#[get("/habit")]
pub async fn list_habits(
    state: web::Data<HttpState>,
    params: web::Query<ListHabitsParams>,
) -> ApiResult<web::Json<Vec<HabitBody>>> {
    let filter = parse_filter(params.into_inner())?;
    let habits = state.habits_query.list_habits(filter).await?;
    Ok(web::Json(habits.iter().map(HabitBody::from).collect()))
}

#[utoipa::path(
    get,
    path = "/api/habit/{habit_id}",
    params(("habit_id" = String, Path, format = "uuid", description = "Habit identifier")),
    responses(
        (status = 200, description = "Habit", body = HabitBody),
        (status = 404, description = "Habit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "getHabit"
)]
#[get("/habit/{habit_id}")]
pub async fn get_habit(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<HabitBody>> {
    let habit_id = habit_id_from(path.into_inner())?;
    let habit = state.habits_query.get_habit(habit_id).await?;
    Ok(web::Json(HabitBody::from(&habit)))
}

/// Update a habit. Changing the schedule or target rebuilds its combos.
#[utoipa::path(
    put,
    path = "/api/habit/{habit_id}",
    params(("habit_id" = String, Path, format = "uuid", description = "Habit identifier")),
    request_body = UpdateHabitRequestBody,
    responses(
        (status = 200, description = "Habit updated", body = HabitBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Habit or epic not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "updateHabit"
)]
#[put("/habit/{habit_id}")]
pub async fn update_habit(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<UpdateHabitRequestBody>,
) -> ApiResult<web::Json<HabitBody>> {
    let habit_id = habit_id_from(path.into_inner())?;
    let patch = parse_patch(payload.into_inner())?;
    let habit = state
        .habits
        .update_habit(UpdateHabitRequest { habit_id, patch })
        .await?;
    Ok(web::Json(HabitBody::from(&habit)))
}

/// Delete a habit together with its completion log.
#[utoipa::path(
    delete,
    path = "/api/habit/{habit_id}",
    params(("habit_id" = String, Path, format = "uuid", description = "Habit identifier")),
    responses(
        (status = 204, description = "Habit deleted"),
        (status = 404, description = "Habit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "deleteHabit"
)]
#[delete("/habit/{habit_id}")]
pub async fn delete_habit(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let habit_id = habit_id_from(path.into_inner())?;
    state.habits.delete_habit(habit_id).await?;
    Ok(HttpResponse::NoContent().finish())
}

#[utoipa::path(
    patch,
    path = "/api/habit/{habit_id}/status",
    params(
        ("habit_id" = String, Path, format = "uuid", description = "Habit identifier"),
        HabitStatusParams
    ),
    responses(
        (status = 200, description = "Habit updated", body = HabitBody),
        (status = 400, description = "Unknown status", body = ErrorSchema),
        (status = 404, description = "Habit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "updateHabitStatus"
)]
#[patch("/habit/{habit_id}/status")]
pub async fn update_habit_status(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<HabitStatusParams>,
) -> ApiResult<web::Json<HabitBody>> {
    let habit_id = habit_id_from(path.into_inner())?;
    let status = parse_habit_status(&params.status, FieldName::new("status"))?;
    let habit = state.habits.update_habit_status(habit_id, status).await?;
    Ok(web::Json(HabitBody::from(&habit)))
}

/// Record a completion now and refresh the habit's combos.
#[utoipa::path(
    post,
    path = "/api/habit/{habit_id}/commit",
    params(("habit_id" = String, Path, format = "uuid", description = "Habit identifier")),
    request_body = RecordCompletionRequestBody,
    responses(
        (status = 200, description = "Completion recorded", body = HabitCommitBody),
        (status = 400, description = "Effort outside 1–5", body = ErrorSchema),
        (status = 404, description = "Habit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "recordCompletion"
)]
#[post("/habit/{habit_id}/commit")]
pub async fn record_completion(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<RecordCompletionRequestBody>,
) -> ApiResult<web::Json<HabitCommitBody>> {
    let habit_id = habit_id_from(path.into_inner())?;
    let RecordCompletionRequestBody {
        description,
        effort,
    } = payload.into_inner();
    let commit = state
        .habits
        .record_completion(RecordCompletionRequest {
            habit_id,
            description,
            effort,
        })
        .await?;
    Ok(web::Json(HabitCommitBody::from(commit)))
}

#[utoipa::path(
    get,
    path = "/api/habit/{habit_id}/commits",
    params(
        ("habit_id" = String, Path, format = "uuid", description = "Habit identifier"),
        ListCommitsParams
    ),
    responses(
        (status = 200, description = "Completions, newest first", body = [HabitCommitBody]),
        (status = 404, description = "Habit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "listHabitCommits"
)]
#[get("/habit/{habit_id}/commits")]
pub async fn list_commits(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    params: web::Query<ListCommitsParams>,
) -> ApiResult<web::Json<Vec<HabitCommitBody>>> {
    let habit_id = habit_id_from(path.into_inner())?;
    let commits = state
        .habits_query
        .list_commits(ListCommitsRequest {
            habit_id,
            limit: params.limit,
        })
        .await?;
    Ok(web::Json(
        commits.into_iter().map(HabitCommitBody::from).collect(),
    ))
}

/// Edit a completion's note or effort. Streak counters are untouched.
#[utoipa::path(
    put,
    path = "/api/habit/{habit_id}/commits/{commit_id}",
    params(
        ("habit_id" = String, Path, format = "uuid", description = "Habit identifier"),
        ("commit_id" = String, Path, format = "uuid", description = "Commit identifier")
    ),
    request_body = UpdateCommitRequestBody,
    responses(
        (status = 200, description = "Completion updated", body = HabitCommitBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Habit or commit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "updateHabitCommit"
)]
#[put("/habit/{habit_id}/commits/{commit_id}")]
pub async fn update_commit(
    state: web::Data<HttpState>,
    path: web::Path<(String, String)>,
    payload: web::Json<UpdateCommitRequestBody>,
) -> ApiResult<web::Json<HabitCommitBody>> {
    let (habit_id, commit_id) = path.into_inner();
    let habit_id = habit_id_from(habit_id)?;
    let commit_id = parse_commit_id(&commit_id, FieldName::new("commit_id"))?;
    let UpdateCommitRequestBody {
        description,
        effort,
    } = payload.into_inner();
    let commit = state
        .habits
        .update_commit(UpdateCommitRequest {
            habit_id,
            commit_id,
            description,
            effort,
        })
        .await?;
    Ok(web::Json(HabitCommitBody::from(commit)))
}

/// Rebuild the habit's combos from its completion log.
#[utoipa::path(
    post,
    path = "/api/habit/{habit_id}/recompute",
    params(("habit_id" = String, Path, format = "uuid", description = "Habit identifier")),
    responses(
        (status = 200, description = "Habit with rebuilt statistics", body = HabitBody),
        (status = 404, description = "Habit not found", body = ErrorSchema)
    ),
    tags = ["habits"],
    operation_id = "recomputeHabitStats"
)]
#[post("/habit/{habit_id}/recompute")]
pub async fn recompute_stats(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<HabitBody>> {
    let habit_id = habit_id_from(path.into_inner())?;
    let habit = state.habits.recompute_stats(habit_id).await?;
    Ok(web::Json(HabitBody::from(&habit)))
}

#[cfg(test)]
#[path = "habits_tests.rs"]
mod tests;
