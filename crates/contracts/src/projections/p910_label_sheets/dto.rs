use serde::{Deserialize, Serialize};

/// Раскладка одного листа этикеток (вычисляется, не хранится)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SheetDescriptor {
    pub sheet_number: u32,
    /// Пустые слоты в начале листа
    pub skip_count: u32,
    /// Заполненные слоты
    pub label_count: u32,
    /// Пустые слоты в конце листа
    pub remaining_count: u32,
    pub total_in_sheet: u32,
}

impl SheetDescriptor {
    pub fn new(sheet_number: u32, skip_count: u32, label_count: u32, remaining_count: u32) -> Self {
        Self {
            sheet_number,
            skip_count,
            label_count,
            remaining_count,
            total_in_sheet: skip_count + label_count,
        }
    }

    pub fn capacity(&self) -> u32 {
        self.skip_count + self.label_count + self.remaining_count
    }
}

/// Итоговый план печати
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabelSheetPlan {
    pub total_labels: u32,
    pub skip_count: u32,
    pub sheet_capacity: u32,
    pub sheets: Vec<SheetDescriptor>,
    pub total_sheets: u32,
    /// Смещение, с которого начнётся следующая печать на последнем листе
    pub next_skip: u32,
}

/// Query для GET /api/p910/label-sheets
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct LabelSheetsQuery {
    pub total: u32,
    #[serde(default)]
    pub skip: u32,
}
