use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::domain::a025_print_order::aggregate::ImportedRow;

/// Колонка сортировки панели печати
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SortKey {
    OrderNumber,
    PaymentTimestamp,
    PrintedTimestamp,
}

impl SortKey {
    /// Направление при первом клике по колонке
    pub fn default_direction(&self) -> SortDirection {
        match self {
            SortKey::OrderNumber => SortDirection::Asc,
            SortKey::PaymentTimestamp | SortKey::PrintedTimestamp => SortDirection::Desc,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

impl SortDirection {
    pub fn flipped(self) -> Self {
        match self {
            SortDirection::Asc => SortDirection::Desc,
            SortDirection::Desc => SortDirection::Asc,
        }
    }
}

/// Строка таблицы заказов
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderViewRowDto {
    pub order_number: String,
    /// Дата оплаты, мс от эпохи; None если не распознана
    pub payment_ts: Option<i64>,
    /// Дата печати, мс от эпохи
    pub printed_ts: Option<i64>,
    pub created_at: DateTime<Utc>,
    pub selected: bool,
    pub row: ImportedRow,
}

/// Состояние чекбокса "выбрать всё" для текущей страницы
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SelectAllState {
    pub checked: bool,
    pub indeterminate: bool,
    pub disabled: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct PaginationControls {
    pub prev_disabled: bool,
    pub next_disabled: bool,
}

/// Снимок панели, который отдаётся на отрисовку
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrintPanelPageDto {
    pub rows: Vec<OrderViewRowDto>,
    pub page: u32,
    pub page_size: u32,
    pub total_items: u32,
    pub total_pages: u32,
    pub sort_key: SortKey,
    pub sort_direction: SortDirection,
    pub unprinted_only: bool,
    pub selected_count: u32,
    pub select_all: SelectAllState,
    pub pagination: PaginationControls,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_directions() {
        assert_eq!(SortKey::OrderNumber.default_direction(), SortDirection::Asc);
        assert_eq!(SortKey::PaymentTimestamp.default_direction(), SortDirection::Desc);
        assert_eq!(SortKey::PrintedTimestamp.default_direction(), SortDirection::Desc);
    }

    #[test]
    fn test_sort_key_wire_names() {
        assert_eq!(
            serde_json::to_string(&SortKey::PaymentTimestamp).unwrap(),
            "\"payment_timestamp\""
        );
        assert_eq!(serde_json::to_string(&SortDirection::Desc).unwrap(), "\"desc\"");
    }
}
