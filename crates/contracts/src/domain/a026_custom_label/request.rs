use serde::{Deserialize, Serialize};

use super::aggregate::{CustomLabelEntry, CustomLabelPatch};

/// Полная замена списка (добавление / удаление / перестановка в редакторе)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ReplaceCustomLabelsRequest {
    pub entries: Vec<CustomLabelEntry>,
}

/// Правка одной этикетки по индексу
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PatchCustomLabelRequest {
    #[serde(flatten)]
    pub patch: CustomLabelPatch,
    /// Событие blur / commit: сохранять с короткой задержкой
    #[serde(default)]
    pub fast: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CustomLabelsResponse {
    pub entries: Vec<CustomLabelEntry>,
    pub dirty: bool,
}
