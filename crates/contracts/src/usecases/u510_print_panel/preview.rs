use serde::{Deserialize, Serialize};

use super::view::{SortDirection, SortKey};
use crate::domain::a026_custom_label::aggregate::CustomLabelEntry;

/// Настройки печати, которые оператор меняет на панели
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PrintSettings {
    /// Сколько слотов первого листа уже использовано
    #[serde(default)]
    pub skip_count: u32,
    #[serde(default = "default_true")]
    pub include_custom_labels: bool,
    #[serde(default)]
    pub mark_printed_after_print: bool,
}

fn default_true() -> bool {
    true
}

impl Default for PrintSettings {
    fn default() -> Self {
        Self {
            skip_count: 0,
            include_custom_labels: true,
            mark_printed_after_print: false,
        }
    }
}

/// Снимок конфигурации для предпросмотра / печати.
/// Только сериализуемые поля.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PreviewConfig {
    pub settings: PrintSettings,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    /// Только включённые этикетки, в порядке печати
    pub custom_labels: Vec<CustomLabelEntry>,
}

/// Ответ на запрос предпросмотра
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreviewResponse {
    /// false, если ничего не выбрано
    pub started: bool,
    pub order_count: u32,
    pub ticket: Option<String>,
}
