//! Распределение этикеток по листам фиксированной ёмкости.
//!
//! Первый лист может начинаться со смещения (уже использованные слоты),
//! все последующие листы заполняются с первого слота.

use super::dto::{LabelSheetPlan, SheetDescriptor};

/// Количество слотов на листе
pub const SHEET_CAPACITY: u32 = 44;

pub fn calculate_multi_sheet_distribution(total_labels: u32, skip_count: u32) -> Vec<SheetDescriptor> {
    calculate_with_capacity(SHEET_CAPACITY, total_labels, skip_count)
}

/// Раскладка для произвольной ёмкости листа.
///
/// При `total_labels == 0` возвращается ровно один лист, чтобы вызывающий
/// всегда видел, сколько места осталось.
///
/// Смещение не больше ёмкости: если `skip_count >= capacity`, первый лист
/// целиком пропускается (`skip = capacity`, `label_count = 0`), а избыток
/// смещения на следующие листы не переносится. Так смещение есть только
/// у первого листа, и на каждом листе `skip + label_count + remaining`
/// равно ёмкости.
pub fn calculate_with_capacity(capacity: u32, total_labels: u32, skip_count: u32) -> Vec<SheetDescriptor> {
    // лист без слотов не может принять ни одной этикетки
    let capacity = capacity.max(1);
    let first_skip = skip_count.min(capacity);

    if total_labels == 0 {
        return vec![SheetDescriptor::new(1, first_skip, 0, capacity - first_skip)];
    }

    let mut sheets = Vec::new();
    let mut remaining = total_labels;
    let mut current_skip = first_skip;
    let mut sheet_number = 1;

    while remaining > 0 {
        let available_in_sheet = capacity.saturating_sub(current_skip);
        let labels_in_this_sheet = remaining.min(available_in_sheet);
        let remaining_in_sheet = available_in_sheet - labels_in_this_sheet;

        sheets.push(SheetDescriptor::new(
            sheet_number,
            current_skip,
            labels_in_this_sheet,
            remaining_in_sheet,
        ));

        remaining -= labels_in_this_sheet;
        current_skip = 0;
        sheet_number += 1;
    }

    sheets
}

/// План печати: листы плюс итоги
pub fn build_plan(capacity: u32, total_labels: u32, skip_count: u32) -> LabelSheetPlan {
    let sheets = calculate_with_capacity(capacity, total_labels, skip_count);
    let next_skip = match sheets.last() {
        Some(last) if last.remaining_count > 0 => last.total_in_sheet,
        _ => 0,
    };

    LabelSheetPlan {
        total_labels,
        skip_count,
        sheet_capacity: capacity.max(1),
        total_sheets: sheets.len() as u32,
        sheets,
        next_skip,
    }
}
