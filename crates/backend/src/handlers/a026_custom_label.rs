use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use contracts::domain::a026_custom_label::request::{
    CustomLabelsResponse, PatchCustomLabelRequest, ReplaceCustomLabelsRequest,
};

use crate::shared::app_state::AppState;
use crate::shared::diff_save::MirrorError;

fn response(state: &AppState) -> Json<CustomLabelsResponse> {
    Json(CustomLabelsResponse {
        entries: state.labels.list(),
        dirty: state.labels.is_dirty(),
    })
}

pub async fn list(State(state): State<AppState>) -> Json<CustomLabelsResponse> {
    response(&state)
}

fn rejected(e: MirrorError) -> StatusCode {
    tracing::warn!("Custom label edit rejected: {}", e);
    StatusCode::BAD_REQUEST
}

pub async fn replace(
    State(state): State<AppState>,
    Json(request): Json<ReplaceCustomLabelsRequest>,
) -> Result<Json<CustomLabelsResponse>, StatusCode> {
    state.labels.replace(request.entries).map_err(rejected)?;
    Ok(response(&state))
}

/// PATCH /api/a026/custom-labels/:index
pub async fn patch(
    State(state): State<AppState>,
    Path(index): Path<usize>,
    Json(request): Json<PatchCustomLabelRequest>,
) -> Result<Json<CustomLabelsResponse>, StatusCode> {
    state
        .labels
        .patch(index, request.patch, request.fast)
        .map_err(rejected)?;
    Ok(response(&state))
}

/// POST /api/a026/custom-labels/flush - сохранить без ожидания
pub async fn flush(State(state): State<AppState>) -> Result<Json<CustomLabelsResponse>, StatusCode> {
    state.labels.flush().await.map_err(|e| {
        tracing::error!("Failed to save custom labels: {}", e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;
    Ok(response(&state))
}
