use axum::{extract::State, http::StatusCode, Json};
use contracts::projections::p910_label_sheets::dto::LabelSheetPlan;
use contracts::usecases::u510_print_panel::preview::{PreviewResponse, PrintSettings};
use contracts::usecases::u510_print_panel::request::{
    BulkActionResponse, DeleteSelectedRequest, FilterRequest, PageRequest, SelectRowRequest,
    SortRequest,
};
use contracts::usecases::u510_print_panel::view::PrintPanelPageDto;

use crate::shared::app_state::AppState;
use crate::usecases::u510_print_panel::PanelError;

fn panel_error(action: &str, e: PanelError) -> StatusCode {
    tracing::error!("Print panel {} failed: {}", action, e);
    match e {
        PanelError::Preview(_) => StatusCode::BAD_GATEWAY,
        PanelError::Cache(_) => StatusCode::INTERNAL_SERVER_ERROR,
    }
}

pub async fn sort(
    State(state): State<AppState>,
    Json(request): Json<SortRequest>,
) -> Json<PrintPanelPageDto> {
    Json(state.panel.handle_sort(request.key))
}

pub async fn page(
    State(state): State<AppState>,
    Json(request): Json<PageRequest>,
) -> Json<PrintPanelPageDto> {
    Json(match request {
        PageRequest::Prev => state.panel.prev_page(),
        PageRequest::Next => state.panel.next_page(),
        PageRequest::Goto { page } => state.panel.goto_page(page),
    })
}

pub async fn filter(
    State(state): State<AppState>,
    Json(request): Json<FilterRequest>,
) -> Json<PrintPanelPageDto> {
    Json(state.panel.set_unprinted_only(request.unprinted_only))
}

/// Переключить выбор одной строки
pub async fn select(
    State(state): State<AppState>,
    Json(request): Json<SelectRowRequest>,
) -> Result<Json<PrintPanelPageDto>, StatusCode> {
    match state.panel.toggle_row(&request.order_number) {
        (Some(_), page) => Ok(Json(page)),
        (None, _) => Err(StatusCode::NOT_FOUND),
    }
}

/// Чекбокс "выбрать всё" на текущей странице
pub async fn select_page(State(state): State<AppState>) -> Json<PrintPanelPageDto> {
    Json(state.panel.toggle_select_all())
}

pub async fn mark_printed(
    State(state): State<AppState>,
) -> Result<Json<BulkActionResponse>, StatusCode> {
    let affected = state
        .panel
        .mark_selected_printed()
        .await
        .map_err(|e| panel_error("mark printed", e))?;
    Ok(Json(BulkActionResponse {
        affected: affected as u32,
    }))
}

pub async fn clear_printed(
    State(state): State<AppState>,
) -> Result<Json<BulkActionResponse>, StatusCode> {
    let affected = state
        .panel
        .clear_selected_printed()
        .await
        .map_err(|e| panel_error("clear printed", e))?;
    Ok(Json(BulkActionResponse {
        affected: affected as u32,
    }))
}

/// Удаление выбранных; без `confirm: true` ничего не удаляется
pub async fn delete(
    State(state): State<AppState>,
    Json(request): Json<DeleteSelectedRequest>,
) -> Result<Json<BulkActionResponse>, StatusCode> {
    let affected = state
        .panel
        .delete_selected(|_| request.confirm)
        .await
        .map_err(|e| panel_error("delete", e))?;
    Ok(Json(BulkActionResponse {
        affected: affected as u32,
    }))
}

pub async fn preview(State(state): State<AppState>) -> Result<Json<PreviewResponse>, StatusCode> {
    state
        .panel
        .preview_selected()
        .await
        .map(Json)
        .map_err(|e| panel_error("preview", e))
}

/// POST /api/u510/print-panel/preview/schedule - предпросмотр через окно
/// debounce; повторные запросы в окне склеиваются в один рендер
pub async fn schedule_preview(State(state): State<AppState>) -> StatusCode {
    state.panel.schedule_preview();
    StatusCode::ACCEPTED
}

pub async fn plan(State(state): State<AppState>) -> Json<LabelSheetPlan> {
    Json(state.panel.print_plan())
}

pub async fn get_settings(State(state): State<AppState>) -> Json<PrintSettings> {
    Json(state.panel.settings())
}

pub async fn update_settings(
    State(state): State<AppState>,
    Json(settings): Json<PrintSettings>,
) -> Json<PrintSettings> {
    Json(state.panel.update_settings(settings))
}
