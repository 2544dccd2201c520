//! Разбор дат из импортированных строк и сравнение строк таблицы.

use chrono::{DateTime, NaiveDate, NaiveDateTime};
use contracts::domain::a025_print_order::aggregate::OrderRecord;
use contracts::usecases::u510_print_panel::view::{OrderViewRowDto, SortDirection, SortKey};
use serde_json::Value;
use std::cmp::Ordering;

const DATE_TIME_FORMATS: &[&str] = &[
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%d %H:%M",
    "%d.%m.%Y %H:%M:%S",
    "%d.%m.%Y %H:%M",
    "%Y/%m/%d %H:%M:%S",
    "%m/%d/%Y %H:%M:%S",
    "%m/%d/%Y %H:%M",
];

const DATE_FORMATS: &[&str] = &["%Y-%m-%d", "%d.%m.%Y", "%Y/%m/%d", "%m/%d/%Y"];

/// Числа меньше этого считаются секундами, больше - миллисекундами
const EPOCH_MS_THRESHOLD: i64 = 100_000_000_000;

fn epoch_to_ms(n: i64) -> i64 {
    if n.abs() < EPOCH_MS_THRESHOLD {
        n.saturating_mul(1000)
    } else {
        n
    }
}

/// Дата в мс от эпохи. None для пустых и нераспознанных значений:
/// при сортировке такие строки считаются самыми ранними.
pub fn parse_timestamp(value: &Value) -> Option<i64> {
    match value {
        Value::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().map(|f| f as i64))
            .map(epoch_to_ms),
        Value::String(s) => parse_timestamp_str(s),
        _ => None,
    }
}

pub fn parse_timestamp_str(raw: &str) -> Option<i64> {
    let s = raw.trim();
    if s.is_empty() {
        return None;
    }

    if s.bytes().all(|b| b.is_ascii_digit()) {
        return s.parse::<i64>().ok().map(epoch_to_ms);
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Some(dt.timestamp_millis());
    }

    for format in DATE_TIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(s, format) {
            return Some(dt.and_utc().timestamp_millis());
        }
    }

    for format in DATE_FORMATS {
        if let Ok(date) = NaiveDate::parse_from_str(s, format) {
            return date
                .and_hms_opt(0, 0, 0)
                .map(|dt| dt.and_utc().timestamp_millis());
        }
    }

    None
}

/// Дата оплаты: первая колонка из списка, значение которой распознаётся
pub fn payment_timestamp(record: &OrderRecord, columns: &[String]) -> Option<i64> {
    columns
        .iter()
        .filter_map(|column| record.row.get(column))
        .find_map(parse_timestamp)
}

/// Строка таблицы из записи кэша
pub fn project_row(record: &OrderRecord, payment_columns: &[String], selected: bool) -> OrderViewRowDto {
    OrderViewRowDto {
        order_number: record.order_number.clone(),
        payment_ts: payment_timestamp(record, payment_columns),
        printed_ts: record.printed_at.map(|dt| dt.timestamp_millis()),
        created_at: record.created_at,
        selected,
        row: record.row.clone(),
    }
}

/// Сравнение "как у человека": числовые фрагменты сравниваются как числа,
/// текст без учёта регистра. "A-2" < "A-10".
pub fn natural_cmp(a: &str, b: &str) -> Ordering {
    let mut left = Chunks::new(a);
    let mut right = Chunks::new(b);

    loop {
        match (left.next(), right.next()) {
            (None, None) => return a.cmp(b),
            (None, Some(_)) => return Ordering::Less,
            (Some(_), None) => return Ordering::Greater,
            (Some(l), Some(r)) => {
                let ord = compare_chunks(l, r);
                if ord != Ordering::Equal {
                    return ord;
                }
            }
        }
    }
}

fn compare_chunks(l: &str, r: &str) -> Ordering {
    let l_digits = l.starts_with(|c: char| c.is_ascii_digit());
    let r_digits = r.starts_with(|c: char| c.is_ascii_digit());

    match (l_digits, r_digits) {
        (true, true) => {
            let l = l.trim_start_matches('0');
            let r = r.trim_start_matches('0');
            l.len().cmp(&r.len()).then_with(|| l.cmp(r))
        }
        // цифры раньше букв
        (true, false) => Ordering::Less,
        (false, true) => Ordering::Greater,
        (false, false) => l
            .chars()
            .flat_map(char::to_lowercase)
            .cmp(r.chars().flat_map(char::to_lowercase)),
    }
}

/// Разбиение строки на чередующиеся фрагменты цифр и не-цифр
struct Chunks<'a> {
    rest: &'a str,
}

impl<'a> Chunks<'a> {
    fn new(s: &'a str) -> Self {
        Self { rest: s }
    }
}

impl<'a> Iterator for Chunks<'a> {
    type Item = &'a str;

    fn next(&mut self) -> Option<&'a str> {
        let first = self.rest.chars().next()?;
        let digits = first.is_ascii_digit();
        let end = self
            .rest
            .char_indices()
            .find(|(_, c)| c.is_ascii_digit() != digits)
            .map(|(i, _)| i)
            .unwrap_or(self.rest.len());
        let (chunk, rest) = self.rest.split_at(end);
        self.rest = rest;
        Some(chunk)
    }
}

/// Сравнение строк таблицы. Направление влияет только на основной ключ;
/// при равенстве порядок всегда по номеру заказа по возрастанию.
pub fn compare_rows(
    a: &OrderViewRowDto,
    b: &OrderViewRowDto,
    key: SortKey,
    direction: SortDirection,
) -> Ordering {
    let primary = match key {
        SortKey::OrderNumber => natural_cmp(&a.order_number, &b.order_number),
        // None < Some(_): нераспознанная дата самая ранняя
        SortKey::PaymentTimestamp => a.payment_ts.cmp(&b.payment_ts),
        SortKey::PrintedTimestamp => a.printed_ts.cmp(&b.printed_ts),
    };

    let primary = match direction {
        SortDirection::Asc => primary,
        SortDirection::Desc => primary.reverse(),
    };

    primary.then_with(|| natural_cmp(&a.order_number, &b.order_number))
}
