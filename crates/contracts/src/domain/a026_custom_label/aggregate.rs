use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Ключ списка пользовательских этикеток в коллекции настроек
pub const CUSTOM_LABELS_KEY: &str = "customLabels";
pub const SETTINGS_COLLECTION: &str = "settings";

pub const DEFAULT_FONT_SIZE: &str = "12px";

/// Верхняя граница копий одной этикетки
pub const MAX_LABEL_COUNT: u32 = 1000;

/// Содержимое этикетки: простой текст или документ rich-text редактора
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum LabelContent {
    Text(String),
    Rich(serde_json::Value),
}

impl Default for LabelContent {
    fn default() -> Self {
        LabelContent::Text(String::new())
    }
}

/// Пользовательская этикетка, печатается вместе с заказами.
/// Идентичность = позиция в списке.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLabelEntry {
    pub enabled: bool,
    /// Количество копий, от 1 до `MAX_LABEL_COUNT`
    pub count: u32,
    pub content: LabelContent,
    pub font_size: String,
    pub created_at: DateTime<Utc>,
}

impl Default for CustomLabelEntry {
    fn default() -> Self {
        Self {
            enabled: true,
            count: 1,
            content: LabelContent::default(),
            font_size: DEFAULT_FONT_SIZE.to_string(),
            created_at: Utc::now(),
        }
    }
}

impl CustomLabelEntry {
    /// Применить частичное изменение. count приводится к 1..=MAX_LABEL_COUNT.
    pub fn apply(&mut self, patch: CustomLabelPatch) {
        if let Some(enabled) = patch.enabled {
            self.enabled = enabled;
        }
        if let Some(count) = patch.count {
            self.count = clamp_count(count);
        }
        if let Some(content) = patch.content {
            self.content = content;
        }
        if let Some(font_size) = patch.font_size {
            self.font_size = font_size;
        }
    }

    /// Сколько слотов займёт этикетка при печати
    pub fn printable_count(&self) -> u32 {
        if self.enabled {
            self.count.clamp(1, MAX_LABEL_COUNT)
        } else {
            0
        }
    }
}

pub fn clamp_count(count: i64) -> u32 {
    count.clamp(1, i64::from(MAX_LABEL_COUNT)) as u32
}

/// Частичное изменение этикетки (поля редактора)
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CustomLabelPatch {
    #[serde(default)]
    pub enabled: Option<bool>,
    #[serde(default)]
    pub count: Option<i64>,
    #[serde(default)]
    pub content: Option<LabelContent>,
    #[serde(default)]
    pub font_size: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_count_clamps_to_one() {
        let mut entry = CustomLabelEntry::default();
        entry.apply(CustomLabelPatch {
            count: Some(0),
            ..Default::default()
        });
        assert_eq!(entry.count, 1);

        entry.apply(CustomLabelPatch {
            count: Some(-5),
            ..Default::default()
        });
        assert_eq!(entry.count, 1);

        entry.apply(CustomLabelPatch {
            count: Some(7),
            ..Default::default()
        });
        assert_eq!(entry.count, 7);

        entry.apply(CustomLabelPatch {
            count: Some(i64::MAX),
            ..Default::default()
        });
        assert_eq!(entry.count, MAX_LABEL_COUNT);
    }

    #[test]
    fn test_patch_leaves_other_fields() {
        let mut entry = CustomLabelEntry::default();
        entry.apply(CustomLabelPatch {
            content: Some(LabelContent::Text("FRAGILE".into())),
            ..Default::default()
        });
        assert_eq!(entry.content, LabelContent::Text("FRAGILE".into()));
        assert!(entry.enabled);
        assert_eq!(entry.font_size, DEFAULT_FONT_SIZE);
    }

    #[test]
    fn test_printable_count() {
        let mut entry = CustomLabelEntry {
            count: 3,
            ..Default::default()
        };
        assert_eq!(entry.printable_count(), 3);
        entry.count = u32::MAX;
        assert_eq!(entry.printable_count(), MAX_LABEL_COUNT);
        entry.enabled = false;
        assert_eq!(entry.printable_count(), 0);
    }

    #[test]
    fn test_content_untagged() {
        let text: LabelContent = serde_json::from_str("\"hello\"").unwrap();
        assert_eq!(text, LabelContent::Text("hello".into()));

        let rich: LabelContent = serde_json::from_str(r#"{"ops":[{"insert":"hi"}]}"#).unwrap();
        assert!(matches!(rich, LabelContent::Rich(_)));
    }
}
