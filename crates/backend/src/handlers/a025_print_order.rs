use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use contracts::usecases::u510_print_panel::request::{
    BulkActionResponse, ImportRowsRequest, ImportRowsResponse,
};
use contracts::usecases::u510_print_panel::view::PrintPanelPageDto;

use crate::domain::a025_print_order::column_key;
use crate::shared::app_state::AppState;

/// GET /api/a025/print-orders - текущая страница таблицы
pub async fn list(State(state): State<AppState>) -> Json<PrintPanelPageDto> {
    Json(state.panel.snapshot())
}

/// POST /api/a025/print-orders/import
pub async fn import(
    State(state): State<AppState>,
    Json(request): Json<ImportRowsRequest>,
) -> Result<Json<ImportRowsResponse>, StatusCode> {
    if request.key_column.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }

    let rows = request.rows.len();
    let created = state
        .cache
        .bulk_upsert(request.rows, column_key(request.key_column))
        .await
        .map_err(|e| {
            tracing::error!("Failed to import {} rows: {}", rows, e);
            StatusCode::INTERNAL_SERVER_ERROR
        })?;

    Ok(Json(ImportRowsResponse {
        created: created as u32,
        total_orders: state.cache.len() as u32,
    }))
}

/// POST /api/a025/print-orders/:order_number/printed
pub async fn mark_printed(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<BulkActionResponse>, StatusCode> {
    let found = state.cache.mark_printed(&order_number).await.map_err(|e| {
        tracing::error!("Failed to mark order {} printed: {}", order_number, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !found {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(BulkActionResponse { affected: 1 }))
}

/// DELETE /api/a025/print-orders/:order_number/printed
pub async fn clear_printed(
    State(state): State<AppState>,
    Path(order_number): Path<String>,
) -> Result<Json<BulkActionResponse>, StatusCode> {
    let found = state.cache.clear_printed(&order_number).await.map_err(|e| {
        tracing::error!("Failed to clear printed mark of {}: {}", order_number, e);
        StatusCode::INTERNAL_SERVER_ERROR
    })?;

    if !found {
        return Err(StatusCode::NOT_FOUND);
    }
    Ok(Json(BulkActionResponse { affected: 1 }))
}
