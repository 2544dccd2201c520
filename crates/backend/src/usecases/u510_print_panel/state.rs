//! Состояние таблицы заказов панели печати: сортировка, фильтр,
//! страницы и выбор. Без I/O, данные приходят снимком из кэша.

use contracts::domain::a025_print_order::aggregate::{normalize_order_number, OrderRecord};
use contracts::usecases::u510_print_panel::view::{
    OrderViewRowDto, PaginationControls, PrintPanelPageDto, SelectAllState, SortDirection, SortKey,
};
use std::collections::HashSet;

use super::sorting::{compare_rows, project_row};

pub struct PanelState {
    sort_key: SortKey,
    sort_direction: SortDirection,
    /// С единицы
    page: u32,
    page_size: u32,
    unprinted_only: bool,
    /// Переживает обновления и переходы по страницам
    selection: HashSet<String>,
    payment_columns: Vec<String>,
    /// Все строки кэша, отсортированные, без фильтра
    rows: Vec<OrderViewRowDto>,
}

impl PanelState {
    pub fn new(page_size: u32, payment_columns: Vec<String>) -> Self {
        Self {
            sort_key: SortKey::OrderNumber,
            sort_direction: SortKey::OrderNumber.default_direction(),
            page: 1,
            page_size: page_size.max(1),
            unprinted_only: false,
            selection: HashSet::new(),
            payment_columns,
            rows: Vec::new(),
        }
    }

    /// Перестроить строки из снимка кэша
    pub fn refresh(&mut self, records: &[OrderRecord]) {
        self.rows = records
            .iter()
            .map(|record| project_row(record, &self.payment_columns, false))
            .collect();
        self.sort_rows();

        let present: HashSet<&str> = self.rows.iter().map(|r| r.order_number.as_str()).collect();
        let before = self.selection.len();
        self.selection.retain(|key| present.contains(key.as_str()));
        if self.selection.len() != before {
            tracing::debug!(
                "Pruned {} selected orders no longer in cache",
                before - self.selection.len()
            );
        }

        self.clamp_page();
    }

    fn sort_rows(&mut self) {
        let (key, direction) = (self.sort_key, self.sort_direction);
        self.rows.sort_by(|a, b| compare_rows(a, b, key, direction));
    }

    fn filtered(&self) -> impl Iterator<Item = &OrderViewRowDto> {
        let unprinted_only = self.unprinted_only;
        self.rows
            .iter()
            .filter(move |row| !unprinted_only || row.printed_ts.is_none())
    }

    pub fn total_items(&self) -> u32 {
        self.filtered().count() as u32
    }

    pub fn total_pages(&self) -> u32 {
        self.total_items().div_ceil(self.page_size)
    }

    pub fn page(&self) -> u32 {
        self.page
    }

    fn clamp_page(&mut self) {
        let total_pages = self.total_pages();
        self.page = if total_pages == 0 {
            1
        } else {
            self.page.clamp(1, total_pages)
        };
    }

    /// Клик по заголовку колонки
    pub fn handle_sort(&mut self, key: SortKey) {
        if key == self.sort_key {
            self.sort_direction = self.sort_direction.flipped();
        } else {
            self.sort_key = key;
            self.sort_direction = key.default_direction();
            self.page = 1;
        }
        self.sort_rows();
        self.clamp_page();
    }

    pub fn sort(&self) -> (SortKey, SortDirection) {
        (self.sort_key, self.sort_direction)
    }

    pub fn goto_page(&mut self, page: u32) {
        self.page = page;
        self.clamp_page();
    }

    pub fn next_page(&mut self) {
        self.goto_page(self.page.saturating_add(1));
    }

    pub fn prev_page(&mut self) {
        self.goto_page(self.page.saturating_sub(1));
    }

    pub fn set_unprinted_only(&mut self, unprinted_only: bool) {
        if self.unprinted_only != unprinted_only {
            self.unprinted_only = unprinted_only;
            self.page = 1;
        }
        self.clamp_page();
    }

    fn page_slice(&self) -> Vec<&OrderViewRowDto> {
        let skip = (self.page.saturating_sub(1) * self.page_size) as usize;
        self.filtered()
            .skip(skip)
            .take(self.page_size as usize)
            .collect()
    }

    /// Переключить выбор строки. None, если такого заказа нет в таблице.
    pub fn toggle_row(&mut self, order_number: &str) -> Option<bool> {
        let key = normalize_order_number(order_number);
        if !self.rows.iter().any(|r| r.order_number == key) {
            return None;
        }
        if self.selection.remove(&key) {
            Some(false)
        } else {
            self.selection.insert(key);
            Some(true)
        }
    }

    /// Чекбокс "выбрать всё" действует только на текущую страницу
    pub fn toggle_select_all(&mut self) {
        let keys: Vec<String> = self
            .page_slice()
            .into_iter()
            .map(|r| r.order_number.clone())
            .collect();
        if keys.is_empty() {
            return;
        }

        if keys.iter().all(|k| self.selection.contains(k)) {
            for key in &keys {
                self.selection.remove(key);
            }
        } else {
            self.selection.extend(keys);
        }
    }

    pub fn select_all_state(&self) -> SelectAllState {
        let page = self.page_slice();
        if page.is_empty() {
            return SelectAllState {
                checked: false,
                indeterminate: false,
                disabled: true,
            };
        }

        let selected = page
            .iter()
            .filter(|r| self.selection.contains(&r.order_number))
            .count();
        SelectAllState {
            checked: selected == page.len(),
            indeterminate: selected > 0 && selected < page.len(),
            disabled: false,
        }
    }

    pub fn pagination_controls(&self) -> PaginationControls {
        let total_pages = self.total_pages();
        let empty = total_pages == 0;
        PaginationControls {
            prev_disabled: empty || self.page <= 1,
            next_disabled: empty || self.page >= total_pages,
        }
    }

    pub fn selection_len(&self) -> usize {
        self.selection.len()
    }

    pub fn is_selected(&self, order_number: &str) -> bool {
        self.selection.contains(order_number)
    }

    /// Выбранные заказы в текущем порядке сортировки (фильтр не учитывается)
    pub fn selected_in_order(&self) -> Vec<String> {
        self.rows
            .iter()
            .filter(|r| self.selection.contains(&r.order_number))
            .map(|r| r.order_number.clone())
            .collect()
    }

    pub fn clear_selection(&mut self) {
        self.selection.clear();
    }

    pub fn snapshot(&self) -> PrintPanelPageDto {
        let rows = self
            .page_slice()
            .into_iter()
            .map(|r| OrderViewRowDto {
                selected: self.selection.contains(&r.order_number),
                ..r.clone()
            })
            .collect();

        PrintPanelPageDto {
            rows,
            page: self.page,
            page_size: self.page_size,
            total_items: self.total_items(),
            total_pages: self.total_pages(),
            sort_key: self.sort_key,
            sort_direction: self.sort_direction,
            unprinted_only: self.unprinted_only,
            selected_count: self.selection.len() as u32,
            select_all: self.select_all_state(),
            pagination: self.pagination_controls(),
        }
    }
}
