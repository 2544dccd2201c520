use async_trait::async_trait;
use contracts::usecases::u510_print_panel::preview::PreviewConfig;
use thiserror::Error;
use uuid::Uuid;

#[derive(Debug, Error)]
pub enum PreviewError {
    #[error("Preview renderer failed: {0}")]
    Renderer(String),
}

/// Внешний отрисовщик предпросмотра / печати.
/// Ошибка показывается оператору, повторов нет.
#[async_trait]
pub trait PreviewRenderer: Send + Sync {
    /// Возвращает идентификатор запущенного предпросмотра
    async fn render_preview(
        &self,
        order_numbers: &[String],
        config: &PreviewConfig,
    ) -> Result<String, PreviewError>;
}

/// Ничего не рисует, только пишет запрос в лог
pub struct LoggingPreviewRenderer;

#[async_trait]
impl PreviewRenderer for LoggingPreviewRenderer {
    async fn render_preview(
        &self,
        order_numbers: &[String],
        config: &PreviewConfig,
    ) -> Result<String, PreviewError> {
        let ticket = Uuid::new_v4().to_string();
        tracing::info!(
            "Preview {}: {} orders, {} custom labels, skip {}, sort {:?} {:?}",
            ticket,
            order_numbers.len(),
            config.custom_labels.len(),
            config.settings.skip_count,
            config.sort_key,
            config.sort_direction
        );
        Ok(ticket)
    }
}
