use axum::{
    routing::{get, patch, post, put},
    Router,
};

use crate::handlers;
use crate::shared::app_state::AppState;

/// Конфигурация всех роутов приложения
pub fn configure_routes(state: AppState) -> Router {
    Router::new()
        .route("/health", get(|| async { "ok" }))
        // A025 Print orders (cache)
        .route("/api/a025/print-orders", get(handlers::a025_print_order::list))
        .route(
            "/api/a025/print-orders/import",
            post(handlers::a025_print_order::import),
        )
        .route(
            "/api/a025/print-orders/:order_number/printed",
            post(handlers::a025_print_order::mark_printed)
                .delete(handlers::a025_print_order::clear_printed),
        )
        // A026 Custom labels
        .route(
            "/api/a026/custom-labels",
            get(handlers::a026_custom_label::list).put(handlers::a026_custom_label::replace),
        )
        .route(
            "/api/a026/custom-labels/flush",
            post(handlers::a026_custom_label::flush),
        )
        .route(
            "/api/a026/custom-labels/:index",
            patch(handlers::a026_custom_label::patch),
        )
        // P910 Label sheets
        .route(
            "/api/p910/label-sheets",
            get(handlers::p910_label_sheets::distribution),
        )
        // U510 Print panel
        .route("/api/u510/print-panel/sort", post(handlers::u510_print_panel::sort))
        .route("/api/u510/print-panel/page", post(handlers::u510_print_panel::page))
        .route("/api/u510/print-panel/filter", post(handlers::u510_print_panel::filter))
        .route("/api/u510/print-panel/select", post(handlers::u510_print_panel::select))
        .route(
            "/api/u510/print-panel/select-page",
            post(handlers::u510_print_panel::select_page),
        )
        .route(
            "/api/u510/print-panel/mark-printed",
            post(handlers::u510_print_panel::mark_printed),
        )
        .route(
            "/api/u510/print-panel/clear-printed",
            post(handlers::u510_print_panel::clear_printed),
        )
        .route("/api/u510/print-panel/delete", post(handlers::u510_print_panel::delete))
        .route("/api/u510/print-panel/preview", post(handlers::u510_print_panel::preview))
        .route(
            "/api/u510/print-panel/preview/schedule",
            post(handlers::u510_print_panel::schedule_preview),
        )
        .route("/api/u510/print-panel/plan", get(handlers::u510_print_panel::plan))
        .route(
            "/api/u510/print-panel/settings",
            get(handlers::u510_print_panel::get_settings)
                .put(handlers::u510_print_panel::update_settings),
        )
        .with_state(state)
}
