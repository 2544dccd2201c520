use std::sync::Arc;

use super::config::Config;
use super::data::kv_store::PersistentStore;
use crate::domain::a025_print_order::OrderCache;
use crate::domain::a026_custom_label::CustomLabelService;
use crate::usecases::u510_print_panel::{PanelOptions, PreviewRenderer, PrintPanel};
use contracts::usecases::u510_print_panel::preview::PrintSettings;

/// Общее состояние для HTTP обработчиков
#[derive(Clone)]
pub struct AppState {
    pub config: Arc<Config>,
    pub cache: Arc<OrderCache>,
    pub panel: Arc<PrintPanel>,
    pub labels: CustomLabelService,
}

impl AppState {
    /// Загрузить кэш и этикетки из хранилища и собрать панель.
    /// Недоступное хранилище - ошибка запуска.
    pub async fn build(
        config: Config,
        store: Arc<dyn PersistentStore>,
        renderer: Arc<dyn PreviewRenderer>,
    ) -> anyhow::Result<Self> {
        let cache = Arc::new(OrderCache::new(Arc::clone(&store)));
        cache
            .init()
            .await
            .map_err(|e| anyhow::anyhow!("order cache init failed: {e}"))?;

        let labels = CustomLabelService::new(store, config.autosave.delays());
        labels
            .load()
            .await
            .map_err(|e| anyhow::anyhow!("custom labels load failed: {e}"))?;

        let panel = PrintPanel::new(
            Arc::clone(&cache),
            labels.clone(),
            renderer,
            PanelOptions {
                page_size: config.view.page_size,
                payment_columns: config.view.payment_columns.clone(),
                sheet_capacity: config.print.sheet_capacity,
                settings: PrintSettings {
                    skip_count: config.print.default_skip,
                    ..Default::default()
                },
                preview_delay: config.print.preview_delay(),
            },
        );
        panel.attach();

        Ok(Self {
            config: Arc::new(config),
            cache,
            panel,
            labels,
        })
    }
}
