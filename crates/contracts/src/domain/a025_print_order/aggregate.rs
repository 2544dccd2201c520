use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Имя коллекции в key-value хранилище
pub const ORDERS_COLLECTION: &str = "orders";

/// Строка импорта: поле -> значение, без фиксированной схемы.
/// Сравнивается структурно для обнаружения изменений.
pub type ImportedRow = Map<String, Value>;

/// Заказ маркетплейса, ожидающий печати этикетки
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRecord {
    /// Номер заказа (нормализованный, первичный ключ)
    pub order_number: String,
    /// Последняя импортированная строка, заменяется целиком при повторном импорте
    pub row: ImportedRow,
    /// Дата первого импорта, не меняется
    pub created_at: DateTime<Utc>,
    /// Дата печати; None = не напечатан
    pub printed_at: Option<DateTime<Utc>>,
}

impl OrderRecord {
    pub fn new_for_insert(order_number: String, row: ImportedRow, now: DateTime<Utc>) -> Self {
        Self {
            order_number,
            row,
            created_at: now,
            printed_at: None,
        }
    }

    pub fn is_printed(&self) -> bool {
        self.printed_at.is_some()
    }

    /// Значение поля импорта как строка (числа приводятся к строке)
    pub fn field_text(&self, field: &str) -> Option<String> {
        match self.row.get(field)? {
            Value::Null => None,
            Value::String(s) => Some(s.clone()),
            other => Some(other.to_string()),
        }
    }
}

/// Нормализация номера заказа: trim пробелов
pub fn normalize_order_number(raw: &str) -> String {
    raw.trim().to_string()
}

/// Нормализация ключа, извлечённого из строки импорта.
/// Числа и bool приводятся к строке, null / массивы / объекты дают пустой ключ.
pub fn normalize_key_value(value: &Value) -> String {
    match value {
        Value::String(s) => normalize_order_number(s),
        Value::Number(n) => n.to_string(),
        Value::Bool(b) => b.to_string(),
        Value::Null | Value::Array(_) | Value::Object(_) => String::new(),
    }
}
