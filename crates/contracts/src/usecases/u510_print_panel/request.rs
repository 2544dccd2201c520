use serde::{Deserialize, Serialize};

use super::view::SortKey;
use crate::domain::a025_print_order::aggregate::ImportedRow;

/// Импорт строк, разобранных внешним CSV-парсером
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowsRequest {
    /// Колонка с номером заказа
    pub key_column: String,
    pub rows: Vec<ImportedRow>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImportRowsResponse {
    /// Количество новых заказов
    pub created: u32,
    pub total_orders: u32,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SortRequest {
    pub key: SortKey,
}

/// Навигация по страницам
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(tag = "action", rename_all = "snake_case")]
pub enum PageRequest {
    Prev,
    Next,
    Goto { page: u32 },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FilterRequest {
    pub unprinted_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SelectRowRequest {
    pub order_number: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DeleteSelectedRequest {
    /// Явное подтверждение оператора
    #[serde(default)]
    pub confirm: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BulkActionResponse {
    pub affected: u32,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_page_request_tagged() {
        let req: PageRequest = serde_json::from_str(r#"{"action":"goto","page":3}"#).unwrap();
        assert!(matches!(req, PageRequest::Goto { page: 3 }));
        let req: PageRequest = serde_json::from_str(r#"{"action":"next"}"#).unwrap();
        assert!(matches!(req, PageRequest::Next));
    }

    #[test]
    fn test_delete_requires_explicit_confirm_field() {
        let req: DeleteSelectedRequest = serde_json::from_str("{}").unwrap();
        assert!(!req.confirm);
    }
}
