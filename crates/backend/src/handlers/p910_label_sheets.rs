use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::Json;
use contracts::projections::p910_label_sheets::allocator::build_plan;
use contracts::projections::p910_label_sheets::dto::{LabelSheetPlan, LabelSheetsQuery};

use crate::shared::app_state::AppState;

/// GET /api/p910/label-sheets?total=&skip=
pub async fn distribution(
    State(state): State<AppState>,
    Query(query): Query<LabelSheetsQuery>,
) -> Result<Json<LabelSheetPlan>, StatusCode> {
    let max_labels = state.config.print.max_labels;
    if query.total > max_labels {
        tracing::warn!(
            "Label sheet request rejected: {} labels over limit {}",
            query.total,
            max_labels
        );
        return Err(StatusCode::BAD_REQUEST);
    }
    Ok(Json(build_plan(
        state.config.print.sheet_capacity,
        query.total,
        query.skip,
    )))
}
