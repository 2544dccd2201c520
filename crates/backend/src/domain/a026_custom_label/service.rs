use contracts::domain::a026_custom_label::aggregate::{
    CustomLabelEntry, CustomLabelPatch, CUSTOM_LABELS_KEY, MAX_LABEL_COUNT, SETTINGS_COLLECTION,
};
use std::sync::Arc;

use crate::shared::data::kv_store::{PersistentStore, StoreError};
use crate::shared::diff_save::{
    DiffSavePersister, MirrorError, MirrorItem, SaveDelays, SaveSpeed, MAX_MIRROR_SLOTS,
};

impl MirrorItem for CustomLabelEntry {
    type Patch = CustomLabelPatch;

    fn merge(&mut self, patch: Self::Patch) {
        self.apply(patch);
    }
}

/// Список пользовательских этикеток с отложенным сохранением
#[derive(Clone)]
pub struct CustomLabelService {
    persister: DiffSavePersister<CustomLabelEntry>,
}

impl CustomLabelService {
    pub fn new(store: Arc<dyn PersistentStore>, delays: SaveDelays) -> Self {
        Self {
            persister: DiffSavePersister::new(store, SETTINGS_COLLECTION, CUSTOM_LABELS_KEY, delays),
        }
    }

    pub async fn load(&self) -> Result<usize, StoreError> {
        let count = self.persister.load().await?;
        tracing::info!("Custom labels loaded: {}", count);
        Ok(count)
    }

    pub fn list(&self) -> Vec<CustomLabelEntry> {
        self.persister.exported()
    }

    /// Включённые этикетки в порядке списка
    pub fn enabled_labels(&self) -> Vec<CustomLabelEntry> {
        self.persister
            .exported()
            .into_iter()
            .filter(|entry| entry.enabled)
            .collect()
    }

    pub fn printable_count(&self) -> u32 {
        self.persister
            .exported()
            .iter()
            .map(CustomLabelEntry::printable_count)
            .fold(0u32, u32::saturating_add)
    }

    /// Заменить список целиком (добавление / удаление строк в редакторе)
    pub fn replace(&self, entries: Vec<CustomLabelEntry>) -> Result<(), MirrorError> {
        if entries.len() > MAX_MIRROR_SLOTS {
            return Err(MirrorError::IndexOutOfRange {
                index: entries.len() - 1,
                limit: MAX_MIRROR_SLOTS,
            });
        }
        let entries = entries
            .into_iter()
            .map(|mut entry| {
                entry.count = entry.count.clamp(1, MAX_LABEL_COUNT);
                entry
            })
            .collect();
        self.persister.rebuild_from_source(entries);
        Ok(())
    }

    /// Правка одной этикетки; `fast` для blur / подтверждения
    pub fn patch(
        &self,
        index: usize,
        patch: CustomLabelPatch,
        fast: bool,
    ) -> Result<(), MirrorError> {
        let speed = if fast { SaveSpeed::Fast } else { SaveSpeed::Normal };
        self.persister.mark_dirty(index, patch, speed)
    }

    pub async fn flush(&self) -> Result<bool, StoreError> {
        self.persister.flush().await
    }

    pub fn is_dirty(&self) -> bool {
        self.persister.is_dirty()
    }
}
