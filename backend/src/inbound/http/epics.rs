//! Epic tree HTTP handlers.
//!
//! ```text
//! POST   /api/epic
//! GET    /api/epic?skip&limit&include_subs
//! DELETE /api/epic
//! GET    /api/epic/{epic_id}
//! PUT    /api/epic/{epic_id}
//! DELETE /api/epic/{epic_id}
//! GET    /api/epic/{epic_id}/subs
//! GET    /api/epic/{epic_id}/cores
//! ```

use actix_web::{delete, get, post, put, web};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::domain::ports::{
    CreateEpicRequest, EpicPage, EpicPatch, ListEpicsRequest, RelatedEpic, UpdateEpicRequest,
};
use crate::domain::{Epic, EpicNode, Error};
use crate::inbound::http::ApiResult;
use crate::inbound::http::schemas::ErrorSchema;
use crate::inbound::http::state::HttpState;
use crate::inbound::http::validation::{
    FieldName, parse_epic_id, parse_optional_epic_id, parse_position, present,
};

/// Request payload for creating an epic.
#[derive(Debug, Deserialize, Serialize, ToSchema)]
pub struct CreateEpicRequestBody {
    pub title: String,
    pub description: Option<String>,
    #[schema(example = "in_progress")]
    pub status: String,
    /// Parent epic; omit to create a root at the centre of a new grid.
    #[schema(format = "uuid")]
    pub core_epic_id: Option<String>,
    /// Slot 1–8 under the parent, clockwise from top-left. Omit to take the
    /// lowest free slot.
    #[schema(minimum = 0, maximum = 8)]
    pub position: Option<u8>,
}

/// Partial update; absent fields are left unchanged and `null` clears
/// nullable ones.
#[derive(Debug, Default, Deserialize, Serialize, ToSchema)]
pub struct UpdateEpicRequestBody {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>)]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    /// New parent; `null` promotes the epic to a root.
    #[serde(default, deserialize_with = "present")]
    #[schema(value_type = Option<String>, format = "uuid")]
    pub core_epic_id: Option<Option<String>>,
    #[schema(minimum = 0, maximum = 8)]
    pub position: Option<u8>,
}

/// Epic as returned by the API.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct EpicBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub title: String,
    pub description: Option<String>,
    pub status: String,
    pub depth: u32,
    /// Slot number: 0 is the centre, 1–8 run clockwise from top-left.
    pub position: u8,
    pub position_row: u8,
    pub position_col: u8,
    #[schema(format = "uuid")]
    pub core_epic_id: Option<String>,
    #[schema(format = "date-time")]
    pub created_at: String,
    #[schema(format = "date-time")]
    pub updated_at: String,
    /// Materialised sub-epics ordered by slot; absent when not requested.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    #[schema(no_recursion)]
    pub sub_epics: Option<Vec<EpicBody>>,
}

impl From<&Epic> for EpicBody {
    fn from(epic: &Epic) -> Self {
        let position = epic.position();
        let (position_row, position_col) = position.coordinates();
        Self {
            id: epic.id().to_string(),
            title: epic.title().to_owned(),
            description: epic.description().map(str::to_owned),
            status: epic.status().to_owned(),
            depth: epic.depth(),
            position: position.slot(),
            position_row,
            position_col,
            core_epic_id: epic.core_epic_id().map(|id| id.to_string()),
            created_at: epic.created_at().to_rfc3339(),
            updated_at: epic.updated_at().to_rfc3339(),
            sub_epics: None,
        }
    }
}

impl EpicBody {
    /// Body with every level of `node` nested under `sub_epics`.
    ///
    /// Walks the tree with an explicit stack. Each flattened entry records its
    /// parent's index, which is always smaller than its own, so folding from
    /// the back attaches every child after its own children are complete.
    pub fn from_tree(node: EpicNode) -> Self {
        let EpicNode { epic, subs } = node;
        let mut root = Self::from(&epic);
        root.sub_epics = Some(Vec::with_capacity(subs.len()));

        let mut flat: Vec<(Self, Option<usize>)> = Vec::new();
        let mut stack: Vec<(EpicNode, Option<usize>)> =
            subs.into_iter().rev().map(|sub| (sub, None)).collect();
        while let Some((EpicNode { epic, subs }, parent)) = stack.pop() {
            let index = flat.len();
            let mut body = Self::from(&epic);
            body.sub_epics = Some(Vec::with_capacity(subs.len()));
            flat.push((body, parent));
            stack.extend(subs.into_iter().rev().map(|sub| (sub, Some(index))));
        }

        while let Some((body, parent)) = flat.pop() {
            let target = match parent {
                Some(index) => flat.get_mut(index).map(|(parent_body, _)| parent_body),
                None => Some(&mut root),
            };
            if let Some(target) = target {
                target.sub_epics.get_or_insert_with(Vec::new).insert(0, body);
            }
        }
        root
    }

    /// Body for a listing entry: immediate children only, when loaded.
    fn from_listing(node: EpicNode, include_subs: bool) -> Self {
        let mut body = Self::from(&node.epic);
        if include_subs {
            body.sub_epics = Some(node.subs.iter().map(|sub| Self::from(&sub.epic)).collect());
        }
        body
    }
}

/// Summary of an epic on the other side of a relation row.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct RelatedEpicBody {
    #[schema(format = "uuid")]
    pub id: String,
    pub title: String,
    pub position_row: u8,
    pub position_col: u8,
    pub depth: u32,
}

impl From<RelatedEpic> for RelatedEpicBody {
    fn from(value: RelatedEpic) -> Self {
        Self {
            id: value.epic_id.to_string(),
            title: value.title,
            position_row: value.position_row,
            position_col: value.position_col,
            depth: value.depth,
        }
    }
}

/// Number of epics removed by a bulk delete.
#[derive(Debug, Clone, Serialize, Deserialize, ToSchema)]
pub struct DeleteAllEpicsBody {
    pub count: u64,
}

/// Pagination and expansion options for the epic listing.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct ListEpicsParams {
    /// Number of epics to skip.
    pub skip: Option<u32>,
    /// Maximum number of epics to return.
    pub limit: Option<u32>,
    /// Attach each epic's immediate sub-epics.
    pub include_subs: Option<bool>,
}

fn parse_create(body: CreateEpicRequestBody) -> Result<CreateEpicRequest, Error> {
    Ok(CreateEpicRequest {
        title: body.title,
        description: body.description,
        status: body.status,
        core_epic_id: parse_optional_epic_id(body.core_epic_id, FieldName::new("core_epic_id"))?,
        position: body
            .position
            .map(|slot| parse_position(slot, FieldName::new("position")))
            .transpose()?,
    })
}

fn parse_patch(body: UpdateEpicRequestBody) -> Result<EpicPatch, Error> {
    let core_epic_id = match body.core_epic_id {
        None => None,
        Some(raw) => Some(parse_optional_epic_id(raw, FieldName::new("core_epic_id"))?),
    };
    Ok(EpicPatch {
        title: body.title,
        description: body.description,
        status: body.status,
        core_epic_id,
        position: body
            .position
            .map(|slot| parse_position(slot, FieldName::new("position")))
            .transpose()?,
    })
}

/// Create an epic, as a root or under a parent.
#[utoipa::path(
    post,
    path = "/api/epic",
    request_body = CreateEpicRequestBody,
    responses(
        (status = 200, description = "Epic created", body = EpicBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Parent epic not found", body = ErrorSchema),
        (status = 409, description = "Slot taken or parent grid full", body = ErrorSchema),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "createEpic"
)]
#[post("/epic")]
pub async fn create_epic(
    state: web::Data<HttpState>,
    payload: web::Json<CreateEpicRequestBody>,
) -> ApiResult<web::Json<EpicBody>> {
    let request = parse_create(payload.into_inner())?;
    let epic = state.epics.create_epic(request).await?;
    Ok(web::Json(EpicBody::from(&epic)))
}

/// List epics in creation order.
#[utoipa::path(
    get,
    path = "/api/epic",
    params(ListEpicsParams),
    responses(
        (status = 200, description = "Epics", body = [EpicBody]),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "listEpics"
)]
#[get("/epic")]
pub async fn list_epics(
    state: web::Data<HttpState>,
    params: web::Query<ListEpicsParams>,
) -> ApiResult<web::Json<Vec<EpicBody>>> {
    let ListEpicsParams {
        skip,
        limit,
        include_subs,
    } = params.into_inner();
    let include_subs = include_subs.unwrap_or(false);
    let nodes = state
        .epics_query
        .list_epics(ListEpicsRequest {
            page: EpicPage {
                skip: skip.unwrap_or(0),
                limit,
            },
            include_subs,
        })
        .await?;
    Ok(web::Json(
        nodes
            .into_iter()
            .map(|node| EpicBody::from_listing(node, include_subs))
            .collect(),
    ))
}

/// Delete every epic. Linked habits are kept and detached.
#[utoipa::path(
    delete,
    path = "/api/epic",
    responses(
        (status = 200, description = "Number of epics removed", body = DeleteAllEpicsBody),
        (status = 503, description = "Service unavailable", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "deleteAllEpics"
)]
#[delete("/epic")]
pub async fn delete_all_epics(
    state: web::Data<HttpState>,
) -> ApiResult<web::Json<DeleteAllEpicsBody>> {
    let count = state.epics.delete_all_epics().await?;
    Ok(web::Json(DeleteAllEpicsBody { count }))
}

/// Fetch an epic with its whole subtree nested under `sub_epics`.
#[utoipa::path(
    get,
    path = "/api/epic/{epic_id}",
    params(("epic_id" = String, Path, format = "uuid", description = "Epic identifier")),
    responses(
        (status = 200, description = "Epic and its subtree", body = EpicBody),
        (status = 400, description = "Invalid identifier", body = ErrorSchema),
        (status = 404, description = "Epic not found", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "getEpic"
)]
#[get("/epic/{epic_id}")]
pub async fn get_epic(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<EpicBody>> {
    let epic_id = parse_epic_id(&path.into_inner(), FieldName::new("epic_id"))?;
    let node = state.epics_query.get_epic(epic_id).await?;
    Ok(web::Json(EpicBody::from_tree(node)))
}

/// Update an epic. Changing `core_epic_id` moves the whole subtree.
#[utoipa::path(
    put,
    path = "/api/epic/{epic_id}",
    params(("epic_id" = String, Path, format = "uuid", description = "Epic identifier")),
    request_body = UpdateEpicRequestBody,
    responses(
        (status = 200, description = "Epic updated", body = EpicBody),
        (status = 400, description = "Invalid request", body = ErrorSchema),
        (status = 404, description = "Epic or parent not found", body = ErrorSchema),
        (status = 409, description = "Slot taken or parent grid full", body = ErrorSchema),
        (status = 422, description = "Move would create a cycle", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "updateEpic"
)]
#[put("/epic/{epic_id}")]
pub async fn update_epic(
    state: web::Data<HttpState>,
    path: web::Path<String>,
    payload: web::Json<UpdateEpicRequestBody>,
) -> ApiResult<web::Json<EpicBody>> {
    let epic_id = parse_epic_id(&path.into_inner(), FieldName::new("epic_id"))?;
    let patch = parse_patch(payload.into_inner())?;
    let epic = state
        .epics
        .update_epic(UpdateEpicRequest { epic_id, patch })
        .await?;
    Ok(web::Json(EpicBody::from(&epic)))
}

/// Delete an epic and all of its descendants, returning the epic.
#[utoipa::path(
    delete,
    path = "/api/epic/{epic_id}",
    params(("epic_id" = String, Path, format = "uuid", description = "Epic identifier")),
    responses(
        (status = 200, description = "Deleted epic", body = EpicBody),
        (status = 404, description = "Epic not found", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "deleteEpic"
)]
#[delete("/epic/{epic_id}")]
pub async fn delete_epic(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<EpicBody>> {
    let epic_id = parse_epic_id(&path.into_inner(), FieldName::new("epic_id"))?;
    let deleted = state.epics.delete_epic(epic_id).await?;
    Ok(web::Json(EpicBody::from(&deleted.epic)))
}

/// Immediate sub-epics of an epic, read from the relation index.
#[utoipa::path(
    get,
    path = "/api/epic/{epic_id}/subs",
    params(("epic_id" = String, Path, format = "uuid", description = "Core epic identifier")),
    responses(
        (status = 200, description = "Sub-epics", body = [RelatedEpicBody]),
        (status = 404, description = "Epic not found", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "listSubEpics"
)]
#[get("/epic/{epic_id}/subs")]
pub async fn list_subs(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<RelatedEpicBody>>> {
    let epic_id = parse_epic_id(&path.into_inner(), FieldName::new("epic_id"))?;
    let subs = state.epics_query.list_subs(epic_id).await?;
    Ok(web::Json(subs.into_iter().map(RelatedEpicBody::from).collect()))
}

/// Parent of an epic, read from the relation index.
#[utoipa::path(
    get,
    path = "/api/epic/{epic_id}/cores",
    params(("epic_id" = String, Path, format = "uuid", description = "Sub-epic identifier")),
    responses(
        (status = 200, description = "Core epics", body = [RelatedEpicBody]),
        (status = 404, description = "Epic not found", body = ErrorSchema)
    ),
    tags = ["epics"],
    operation_id = "listCoreEpics"
)]
#[get("/epic/{epic_id}/cores")]
pub async fn list_cores(
    state: web::Data<HttpState>,
    path: web::Path<String>,
) -> ApiResult<web::Json<Vec<RelatedEpicBody>>> {
    let epic_id = parse_epic_id(&path.into_inner(), FieldName::new("epic_id"))?;
    let cores = state.epics_query.list_cores(epic_id).await?;
    Ok(web::Json(cores.into_iter().map(RelatedEpicBody::from).collect()))
}

#[cfg(test)]
#[path = "epics_tests.rs"]
mod tests;
