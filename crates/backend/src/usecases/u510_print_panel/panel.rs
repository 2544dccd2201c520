//! Панель печати: таблица заказов из кэша, выбор и массовые действия.

use contracts::projections::p910_label_sheets::allocator::build_plan;
use contracts::projections::p910_label_sheets::dto::LabelSheetPlan;
use contracts::usecases::u510_print_panel::preview::{PreviewConfig, PreviewResponse, PrintSettings};
use contracts::usecases::u510_print_panel::view::{PrintPanelPageDto, SortKey};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;
use thiserror::Error;

use super::preview::{PreviewError, PreviewRenderer};
use super::state::PanelState;
use crate::domain::a025_print_order::{CacheError, OrderCache};
use crate::domain::a026_custom_label::CustomLabelService;
use crate::shared::debounce::Debouncer;
use crate::shared::events::{ListenerRegistry, Subscription};

#[derive(Debug, Error)]
pub enum PanelError {
    #[error(transparent)]
    Cache(#[from] CacheError),

    #[error(transparent)]
    Preview(#[from] PreviewError),
}

pub struct PanelOptions {
    pub page_size: u32,
    pub payment_columns: Vec<String>,
    pub sheet_capacity: u32,
    pub settings: PrintSettings,
    /// Окно склейки повторных запросов предпросмотра
    pub preview_delay: Duration,
}

pub struct PrintPanel {
    cache: Arc<OrderCache>,
    labels: CustomLabelService,
    renderer: Arc<dyn PreviewRenderer>,
    sheet_capacity: u32,
    state: Mutex<PanelState>,
    settings: Mutex<PrintSettings>,
    renders: ListenerRegistry<PrintPanelPageDto>,
    cache_subscription: Mutex<Option<Subscription>>,
    preview_delay: Duration,
    preview_debouncer: Debouncer,
}

impl PrintPanel {
    pub fn new(
        cache: Arc<OrderCache>,
        labels: CustomLabelService,
        renderer: Arc<dyn PreviewRenderer>,
        options: PanelOptions,
    ) -> Arc<Self> {
        Arc::new(Self {
            cache,
            labels,
            renderer,
            sheet_capacity: options.sheet_capacity,
            state: Mutex::new(PanelState::new(options.page_size, options.payment_columns)),
            settings: Mutex::new(options.settings),
            renders: ListenerRegistry::new("print panel"),
            cache_subscription: Mutex::new(None),
            preview_delay: options.preview_delay,
            preview_debouncer: Debouncer::new(),
        })
    }

    /// Подписаться на кэш и построить таблицу
    pub fn attach(self: &Arc<Self>) {
        let panel: Weak<Self> = Arc::downgrade(self);
        let subscription = self.cache.on_update(move |records| {
            if let Some(panel) = panel.upgrade() {
                panel.state().refresh(records);
                panel.render();
            }
            Ok(())
        });

        if let Some(previous) = self
            .cache_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .replace(subscription)
        {
            previous.unsubscribe();
        }
        self.refresh();
    }

    pub fn detach(&self) {
        if let Some(subscription) = self
            .cache_subscription
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take()
        {
            subscription.unsubscribe();
        }
    }

    fn state(&self) -> MutexGuard<'_, PanelState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn settings_guard(&self) -> MutexGuard<'_, PrintSettings> {
        self.settings.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Подписка на перерисовку
    pub fn on_render<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&PrintPanelPageDto) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.renders.subscribe(callback)
    }

    fn render(&self) -> PrintPanelPageDto {
        let snapshot = self.state().snapshot();
        self.renders.notify(&snapshot);
        snapshot
    }

    fn update<R>(&self, f: impl FnOnce(&mut PanelState) -> R) -> (R, PrintPanelPageDto) {
        let result = f(&mut self.state());
        (result, self.render())
    }

    pub fn refresh(&self) -> PrintPanelPageDto {
        let records = self.cache.get_all();
        self.update(|state| state.refresh(&records)).1
    }

    pub fn snapshot(&self) -> PrintPanelPageDto {
        self.state().snapshot()
    }

    pub fn handle_sort(&self, key: SortKey) -> PrintPanelPageDto {
        self.update(|state| state.handle_sort(key)).1
    }

    pub fn next_page(&self) -> PrintPanelPageDto {
        self.update(PanelState::next_page).1
    }

    pub fn prev_page(&self) -> PrintPanelPageDto {
        self.update(PanelState::prev_page).1
    }

    pub fn goto_page(&self, page: u32) -> PrintPanelPageDto {
        self.update(|state| state.goto_page(page)).1
    }

    pub fn set_unprinted_only(&self, unprinted_only: bool) -> PrintPanelPageDto {
        self.update(|state| state.set_unprinted_only(unprinted_only)).1
    }

    pub fn toggle_row(&self, order_number: &str) -> (Option<bool>, PrintPanelPageDto) {
        self.update(|state| state.toggle_row(order_number))
    }

    pub fn toggle_select_all(&self) -> PrintPanelPageDto {
        self.update(PanelState::toggle_select_all).1
    }

    pub fn selected_orders(&self) -> Vec<String> {
        self.state().selected_in_order()
    }

    pub fn settings(&self) -> PrintSettings {
        self.settings_guard().clone()
    }

    pub fn update_settings(&self, settings: PrintSettings) -> PrintSettings {
        *self.settings_guard() = settings.clone();
        settings
    }

    /// Удалить выбранные заказы после подтверждения оператора.
    /// `confirm` получает количество заказов к удалению.
    pub async fn delete_selected(
        &self,
        confirm: impl FnOnce(usize) -> bool,
    ) -> Result<usize, PanelError> {
        let selected = self.selected_orders();
        if selected.is_empty() {
            return Ok(0);
        }
        if !confirm(selected.len()) {
            tracing::info!("Delete of {} orders not confirmed", selected.len());
            return Ok(0);
        }

        let removed = self.cache.bulk_delete(&selected).await?;
        self.state().clear_selection();
        self.refresh();
        Ok(removed)
    }

    fn preview_config(&self) -> PreviewConfig {
        let settings = self.settings();
        let (sort_key, sort_direction) = self.state().sort();
        let custom_labels = if settings.include_custom_labels {
            self.labels.enabled_labels()
        } else {
            Vec::new()
        };

        PreviewConfig {
            settings,
            sort_key,
            sort_direction,
            custom_labels,
        }
    }

    /// Отдать выбранные заказы на предпросмотр
    pub async fn preview_selected(&self) -> Result<PreviewResponse, PanelError> {
        let selected = self.selected_orders();
        if selected.is_empty() {
            return Ok(PreviewResponse {
                started: false,
                order_count: 0,
                ticket: None,
            });
        }

        let config = self.preview_config();
        let ticket = self.renderer.render_preview(&selected, &config).await?;

        if config.settings.mark_printed_after_print {
            for order_number in &selected {
                self.cache.mark_printed(order_number).await?;
            }
        }

        Ok(PreviewResponse {
            started: true,
            order_count: selected.len() as u32,
            ticket: Some(ticket),
        })
    }

    /// Запланировать предпросмотр через окно debounce. Повторный вызов
    /// до срабатывания заменяет ожидающий, рендер уходит один раз
    /// с выбором на момент срабатывания.
    pub fn schedule_preview(self: &Arc<Self>) {
        let panel: Weak<Self> = Arc::downgrade(self);
        self.preview_debouncer.schedule(self.preview_delay, async move {
            let Some(panel) = panel.upgrade() else {
                return;
            };
            match panel.preview_selected().await {
                Ok(response) if response.started => tracing::info!(
                    "Preview started for {} orders, ticket {}",
                    response.order_count,
                    response.ticket.as_deref().unwrap_or("-")
                ),
                Ok(_) => tracing::debug!("Scheduled preview skipped: nothing selected"),
                Err(e) => tracing::error!("Scheduled preview failed: {}", e),
            }
        });
    }

    pub fn is_preview_pending(&self) -> bool {
        self.preview_debouncer.is_pending()
    }

    pub async fn mark_selected_printed(&self) -> Result<usize, PanelError> {
        let mut affected = 0;
        for order_number in self.selected_orders() {
            if self.cache.mark_printed(&order_number).await? {
                affected += 1;
            }
        }
        Ok(affected)
    }

    pub async fn clear_selected_printed(&self) -> Result<usize, PanelError> {
        let mut affected = 0;
        for order_number in self.selected_orders() {
            if self.cache.clear_printed(&order_number).await? {
                affected += 1;
            }
        }
        Ok(affected)
    }

    /// Раскладка по листам для текущего выбора и настроек
    pub fn print_plan(&self) -> LabelSheetPlan {
        let settings = self.settings();
        let orders = u32::try_from(self.state().selection_len()).unwrap_or(u32::MAX);
        let custom = if settings.include_custom_labels {
            self.labels.printable_count()
        } else {
            0
        };
        build_plan(
            self.sheet_capacity,
            orders.saturating_add(custom),
            settings.skip_count,
        )
    }
}

impl Drop for PrintPanel {
    fn drop(&mut self) {
        self.detach();
    }
}
