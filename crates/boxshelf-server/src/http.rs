//! HTTP endpoint handlers

use std::sync::Arc;

use axum::{
    extract::{
        rejection::{JsonRejection, PathRejection, QueryRejection},
        FromRequest, FromRequestParts, State,
    },
    http::StatusCode,
    response::{IntoResponse, Response},
    Extension, Json,
};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use boxshelf_core::{
    BoxDocument, BoxError, BoxId, BoxInfo, BoxItem, BoxSummary, BoxView, CatalogItem, Folder,
    FolderBox, FolderId, ItemKind, LocalId, NewBox, NewFolder, NewNote, NewSubSection, NewUser,
    Note, RemovalKey, SectionSorting, SectionVisibility, StoreError, SubSection, User,
};

use crate::auth::{AuthError, AuthenticatedUser};
use crate::AppState;

// ==================== Errors ====================

/// Error returned by every handler.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error(transparent)]
    Box(#[from] BoxError),

    #[error(transparent)]
    Auth(#[from] AuthError),

    #[error("{0}")]
    Forbidden(String),

    /// Body, path or query string could not be extracted.
    #[error("{message}")]
    Rejected { status: StatusCode, message: String },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
}

impl ApiError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            ApiError::Box(e) if e.is_not_found() => StatusCode::NOT_FOUND,
            ApiError::Box(BoxError::DuplicateItem { .. }) => StatusCode::CONFLICT,
            ApiError::Box(BoxError::Storage(StoreError::AlreadyExists(_))) => StatusCode::CONFLICT,
            ApiError::Box(BoxError::Validation(_) | BoxError::IndexOutOfRange { .. }) => {
                StatusCode::UNPROCESSABLE_ENTITY
            }
            ApiError::Box(BoxError::UpstreamUnavailable(_)) => StatusCode::BAD_GATEWAY,
            ApiError::Box(_) => StatusCode::INTERNAL_SERVER_ERROR,
            ApiError::Auth(_) => StatusCode::UNAUTHORIZED,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Rejected { status, .. } => *status,
        }
    }

    fn code(&self) -> &'static str {
        match self {
            ApiError::Box(BoxError::Storage(StoreError::AlreadyExists(_))) => "already_exists",
            ApiError::Box(e) => e.code(),
            ApiError::Auth(_) => "unauthorized",
            ApiError::Forbidden(_) => "forbidden",
            ApiError::Rejected { .. } => "invalid_request",
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        // Storage internals are logged, not echoed.
        let message = if status == StatusCode::INTERNAL_SERVER_ERROR {
            tracing::error!("request failed: {}", self);
            "something went wrong".to_string()
        } else {
            self.to_string()
        };
        let body = ErrorBody {
            error: self.code().to_string(),
            message,
        };
        (status, Json(body)).into_response()
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Rejected {
            status: rejection.status(),
            message: rejection.body_text(),
        }
    }
}

/// `Json` extractor whose rejection is an [`ApiError`].
#[derive(Debug, FromRequest)]
#[from_request(via(axum::Json), rejection(ApiError))]
pub struct ApiJson<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Path), rejection(ApiError))]
pub struct ApiPath<T>(pub T);

#[derive(Debug, FromRequestParts)]
#[from_request(via(axum::extract::Query), rejection(ApiError))]
pub struct ApiQuery<T>(pub T);

type ApiResult<T> = Result<Json<T>, ApiError>;

fn parse_kind(segment: &str) -> Result<ItemKind, ApiError> {
    segment
        .parse()
        .map_err(|e: String| ApiError::from(BoxError::Validation(e)))
}

fn parse_ids(raw: &str) -> Result<Vec<Uuid>, ApiError> {
    raw.split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .map(|s| {
            Uuid::parse_str(s).map_err(|e| {
                ApiError::from(BoxError::Validation(format!("invalid id {}: {}", s, e)))
            })
        })
        .collect()
}

fn require_self(caller: &AuthenticatedUser, user_id: &str) -> Result<(), ApiError> {
    if caller.0 != user_id {
        return Err(ApiError::Forbidden(
            "cannot modify another user's dashboard".to_string(),
        ));
    }
    Ok(())
}

// ==================== Request Bodies ====================

/// `ids` is a comma-separated list.
#[derive(Debug, Deserialize)]
pub struct IdsQuery {
    #[serde(default)]
    pub ids: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReorderRequest {
    pub source_index: usize,
    pub destination_index: usize,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct SoftDeleteRequest {
    pub containing_folder: Option<FolderId>,
}

#[derive(Debug, Deserialize)]
pub struct NameRequest {
    pub name: String,
}

#[derive(Debug, Deserialize)]
pub struct NoteTextRequest {
    pub text: String,
}

#[derive(Debug, Deserialize)]
pub struct SectionQuery {
    pub section: String,
}

/// Replacement item body. The local id comes from the path.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateItemRequest {
    pub payload: CatalogItem,
    #[serde(default)]
    pub sub_section_membership_count: i64,
    #[serde(default)]
    pub sub_section: Option<LocalId>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddToSubSectionRequest {
    pub sub_section_id: LocalId,
    pub payload: CatalogItem,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RemoveFromSubSectionRequest {
    pub sub_section_id: LocalId,
    pub removal_key: RemovalKey,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameFolderBoxRequest {
    pub box_name: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveBoxRequest {
    pub target_folder_id: FolderId,
    pub box_name: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    pub version: String,
}

// ==================== System ====================

pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

// ==================== Boxes ====================

pub async fn get_box(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
) -> ApiResult<BoxView> {
    Ok(Json(state.boxes.get_box(box_id)?))
}

pub async fn fetch_many_boxes(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<IdsQuery>,
) -> ApiResult<Vec<BoxSummary>> {
    let ids = parse_ids(&query.ids)?;
    Ok(Json(state.coordinator.fetch_many_by_ids(&ids)?))
}

pub async fn create_box(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(data): ApiJson<NewBox>,
) -> Result<(StatusCode, Json<BoxDocument>), ApiError> {
    let doc = state.coordinator.create_box(&user.0, data)?;
    Ok((StatusCode::CREATED, Json(doc)))
}

pub async fn replace_box(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(doc): ApiJson<BoxDocument>,
) -> ApiResult<Option<BoxDocument>> {
    Ok(Json(state.boxes.replace_box(box_id, doc)?))
}

pub async fn soft_delete_box(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(request): ApiJson<SoftDeleteRequest>,
) -> ApiResult<Option<BoxDocument>> {
    Ok(Json(
        state
            .coordinator
            .soft_delete_box(box_id, request.containing_folder)?,
    ))
}

pub async fn update_section_sorting(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(sorting): ApiJson<SectionSorting>,
) -> ApiResult<Option<SectionSorting>> {
    Ok(Json(state.boxes.update_section_sorting(box_id, sorting)?))
}

pub async fn update_section_visibility(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(visibility): ApiJson<SectionVisibility>,
) -> ApiResult<Option<SectionVisibility>> {
    Ok(Json(
        state.boxes.update_section_visibility(box_id, visibility)?,
    ))
}

pub async fn update_box_info(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(info): ApiJson<BoxInfo>,
) -> ApiResult<Option<BoxDocument>> {
    Ok(Json(state.boxes.update_box_info(box_id, info)?))
}

// ==================== Items ====================

pub async fn add_item(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind)): ApiPath<(BoxId, String)>,
    ApiJson(payload): ApiJson<CatalogItem>,
) -> ApiResult<Option<Vec<BoxItem>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.boxes.add_item(box_id, kind, payload)?))
}

pub async fn replace_items(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind)): ApiPath<(BoxId, String)>,
    ApiJson(items): ApiJson<Vec<BoxItem>>,
) -> ApiResult<Option<Vec<BoxItem>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.boxes.replace_items(box_id, kind, items)?))
}

pub async fn reorder_items(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind)): ApiPath<(BoxId, String)>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> ApiResult<Vec<BoxItem>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.boxes.reorder_items(
        box_id,
        kind,
        request.source_index,
        request.destination_index,
    )?))
}

pub async fn update_item(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind, item_id)): ApiPath<(BoxId, String, LocalId)>,
    ApiJson(request): ApiJson<UpdateItemRequest>,
) -> ApiResult<Option<Vec<BoxItem>>> {
    let kind = parse_kind(&kind)?;
    let item = BoxItem {
        local_id: item_id,
        payload: request.payload,
        sub_section_membership_count: request.sub_section_membership_count,
        sub_section: request.sub_section,
    };
    Ok(Json(state.boxes.update_item(box_id, kind, item_id, item)?))
}

pub async fn remove_item(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind, item_id)): ApiPath<(BoxId, String, LocalId)>,
) -> ApiResult<Option<Vec<BoxItem>>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.boxes.remove_item(box_id, kind, item_id)?))
}

pub async fn add_item_to_sub_section(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind, item_id)): ApiPath<(BoxId, String, LocalId)>,
    ApiJson(request): ApiJson<AddToSubSectionRequest>,
) -> ApiResult<Option<BoxDocument>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.boxes.add_item_to_sub_section(
        box_id,
        kind,
        item_id,
        request.sub_section_id,
        request.payload,
    )?))
}

pub async fn remove_item_from_sub_section(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, kind, item_id)): ApiPath<(BoxId, String, LocalId)>,
    ApiJson(request): ApiJson<RemoveFromSubSectionRequest>,
) -> ApiResult<Option<BoxDocument>> {
    let kind = parse_kind(&kind)?;
    Ok(Json(state.boxes.remove_item_from_sub_section(
        box_id,
        kind,
        item_id,
        request.sub_section_id,
        request.removal_key,
    )?))
}

// ==================== Sub-sections ====================

pub async fn create_sub_section(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(new): ApiJson<NewSubSection>,
) -> ApiResult<Option<Vec<SubSection>>> {
    Ok(Json(state.boxes.create_sub_section(box_id, new)?))
}

pub async fn replace_sub_sections(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(sections): ApiJson<Vec<SubSection>>,
) -> ApiResult<Option<Vec<SubSection>>> {
    Ok(Json(state.boxes.replace_sub_sections(box_id, sections)?))
}

pub async fn rename_sub_section(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, sub_section_id)): ApiPath<(BoxId, LocalId)>,
    ApiJson(request): ApiJson<NameRequest>,
) -> ApiResult<Option<Vec<SubSection>>> {
    Ok(Json(state.boxes.rename_sub_section(
        box_id,
        sub_section_id,
        request.name,
    )?))
}

pub async fn delete_sub_section(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, sub_section_id)): ApiPath<(BoxId, LocalId)>,
    ApiQuery(query): ApiQuery<SectionQuery>,
) -> ApiResult<Option<BoxDocument>> {
    let kind = parse_kind(&query.section)?;
    Ok(Json(
        state
            .boxes
            .delete_sub_section(box_id, sub_section_id, kind)?,
    ))
}

pub async fn reorder_sub_section(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, sub_section_id)): ApiPath<(BoxId, LocalId)>,
    ApiJson(request): ApiJson<ReorderRequest>,
) -> ApiResult<SubSection> {
    Ok(Json(state.boxes.reorder_within_sub_section(
        box_id,
        sub_section_id,
        request.source_index,
        request.destination_index,
    )?))
}

// ==================== Notes ====================

pub async fn add_note(
    State(state): State<Arc<AppState>>,
    ApiPath(box_id): ApiPath<BoxId>,
    ApiJson(new): ApiJson<NewNote>,
) -> ApiResult<Option<Vec<Note>>> {
    Ok(Json(state.boxes.add_note(box_id, new)?))
}

pub async fn edit_note(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, note_id)): ApiPath<(BoxId, LocalId)>,
    ApiJson(request): ApiJson<NoteTextRequest>,
) -> ApiResult<Option<Vec<Note>>> {
    Ok(Json(state.boxes.edit_note(box_id, note_id, request.text)?))
}

pub async fn delete_note(
    State(state): State<Arc<AppState>>,
    ApiPath((box_id, note_id)): ApiPath<(BoxId, LocalId)>,
) -> ApiResult<Option<Vec<Note>>> {
    Ok(Json(state.boxes.delete_note(box_id, note_id)?))
}

// ==================== Folders ====================

pub async fn create_folder(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(data): ApiJson<NewFolder>,
) -> Result<(StatusCode, Json<Folder>), ApiError> {
    let folder = state.coordinator.create_folder(&user.0, data)?;
    Ok((StatusCode::CREATED, Json(folder)))
}

pub async fn get_folder(
    State(state): State<Arc<AppState>>,
    ApiPath(folder_id): ApiPath<FolderId>,
) -> ApiResult<Option<Folder>> {
    Ok(Json(state.coordinator.get_folder(folder_id)?))
}

pub async fn fetch_many_folders(
    State(state): State<Arc<AppState>>,
    ApiQuery(query): ApiQuery<IdsQuery>,
) -> ApiResult<Vec<Folder>> {
    let ids = parse_ids(&query.ids)?;
    Ok(Json(state.coordinator.fetch_many_folders(&ids)?))
}

pub async fn delete_folder(
    State(state): State<Arc<AppState>>,
    ApiPath(folder_id): ApiPath<FolderId>,
) -> ApiResult<Option<Folder>> {
    Ok(Json(state.coordinator.delete_folder(folder_id)?))
}

pub async fn attach_box(
    State(state): State<Arc<AppState>>,
    ApiPath(folder_id): ApiPath<FolderId>,
    ApiJson(entry): ApiJson<FolderBox>,
) -> ApiResult<Folder> {
    Ok(Json(state.coordinator.attach_box(folder_id, entry)?))
}

pub async fn replace_folder_boxes(
    State(state): State<Arc<AppState>>,
    ApiPath(folder_id): ApiPath<FolderId>,
    ApiJson(entries): ApiJson<Vec<FolderBox>>,
) -> ApiResult<Option<Folder>> {
    Ok(Json(
        state.coordinator.replace_folder_boxes(folder_id, entries)?,
    ))
}

pub async fn rename_folder_box(
    State(state): State<Arc<AppState>>,
    ApiPath((folder_id, box_id)): ApiPath<(FolderId, BoxId)>,
    ApiJson(request): ApiJson<RenameFolderBoxRequest>,
) -> ApiResult<Option<Folder>> {
    Ok(Json(state.coordinator.rename_folder_box(
        folder_id,
        box_id,
        request.box_name,
    )?))
}

pub async fn detach_box(
    State(state): State<Arc<AppState>>,
    ApiPath((folder_id, box_id)): ApiPath<(FolderId, BoxId)>,
) -> ApiResult<Folder> {
    Ok(Json(state.coordinator.detach_box(folder_id, box_id)?))
}

pub async fn move_box(
    State(state): State<Arc<AppState>>,
    ApiPath((folder_id, box_id)): ApiPath<(FolderId, BoxId)>,
    ApiJson(request): ApiJson<MoveBoxRequest>,
) -> ApiResult<Folder> {
    let entry = FolderBox {
        box_id,
        box_name: request.box_name,
    };
    Ok(Json(state.coordinator.move_box(
        folder_id,
        request.target_folder_id,
        entry,
    )?))
}

// ==================== Users ====================

pub async fn create_user(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiJson(data): ApiJson<NewUser>,
) -> Result<(StatusCode, Json<User>), ApiError> {
    let created = state.coordinator.create_user(&user.0, data)?;
    Ok((StatusCode::CREATED, Json(created)))
}

pub async fn get_me(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
) -> ApiResult<User> {
    Ok(Json(state.coordinator.get_user(&user.0)?))
}

pub async fn user_boxes(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<Vec<BoxSummary>> {
    Ok(Json(state.boxes.boxes_by_creator(&user_id)?))
}

pub async fn user_folders(
    State(state): State<Arc<AppState>>,
    ApiPath(user_id): ApiPath<String>,
) -> ApiResult<Vec<Folder>> {
    Ok(Json(state.coordinator.folders_by_creator(&user_id)?))
}

pub async fn set_dashboard_boxes(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(user_id): ApiPath<String>,
    ApiJson(ids): ApiJson<Vec<BoxId>>,
) -> ApiResult<Option<User>> {
    require_self(&user, &user_id)?;
    Ok(Json(state.coordinator.set_dashboard_boxes(&user_id, ids)?))
}

pub async fn set_dashboard_folders(
    State(state): State<Arc<AppState>>,
    Extension(user): Extension<AuthenticatedUser>,
    ApiPath(user_id): ApiPath<String>,
    ApiJson(ids): ApiJson<Vec<FolderId>>,
) -> ApiResult<Option<User>> {
    require_self(&user, &user_id)?;
    Ok(Json(
        state.coordinator.set_dashboard_folders(&user_id, ids)?,
    ))
}
