use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::StatusCode,
    routing::get,
    Json, Router,
};

use super::extract::{ApiJson, ApiQuery};
use crate::auth::MaybeUser;
use crate::error::ApiError;
use crate::models::clipboard::{Clipboard, ClipboardCreate, ClipboardUpdate, ListQuery};
use crate::AppState;

/// POST /clipboard/ - create a clipboard
async fn create_clipboard(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    ApiJson(request): ApiJson<ClipboardCreate>,
) -> Result<(StatusCode, Json<Clipboard>), ApiError> {
    let clipboard = state.clipboards.create(request, caller.as_ref())?;
    Ok((StatusCode::CREATED, Json(clipboard)))
}

/// GET /clipboard/:clipboard_id - read one clipboard
async fn read_clipboard(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    Path(clipboard_id): Path<String>,
) -> Result<Json<Clipboard>, ApiError> {
    let clipboard = state.clipboards.read(&clipboard_id, caller.as_ref())?;
    Ok(Json(clipboard))
}

/// GET /clipboard/ - list visible clipboards
async fn list_clipboards(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<Clipboard>>, ApiError> {
    let clipboards = state.clipboards.list(&query, caller.as_ref())?;
    Ok(Json(clipboards))
}

/// PUT /clipboard/:clipboard_id - partial update
async fn update_clipboard(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    Path(clipboard_id): Path<String>,
    ApiJson(changes): ApiJson<ClipboardUpdate>,
) -> Result<Json<Clipboard>, ApiError> {
    let clipboard = state
        .clipboards
        .update(&clipboard_id, changes, caller.as_ref())?;
    Ok(Json(clipboard))
}

/// DELETE /clipboard/:clipboard_id
async fn delete_clipboard(
    State(state): State<Arc<AppState>>,
    MaybeUser(caller): MaybeUser,
    Path(clipboard_id): Path<String>,
) -> Result<StatusCode, ApiError> {
    state.clipboards.delete(&clipboard_id, caller.as_ref())?;
    Ok(StatusCode::NO_CONTENT)
}

pub fn router() -> Router<Arc<AppState>> {
    Router::new()
        .route("/clipboard", get(list_clipboards).post(create_clipboard))
        .route("/clipboard/", get(list_clipboards).post(create_clipboard))
        .route(
            "/clipboard/:clipboard_id",
            get(read_clipboard)
                .put(update_clipboard)
                .delete(delete_clipboard),
        )
}
