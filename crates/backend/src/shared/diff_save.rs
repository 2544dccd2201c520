//! Отложенное сохранение редактируемого списка с проверкой изменений.
//!
//! Держит зеркало списка, копит правки и пишет в хранилище не чаще одного
//! раза за окно debounce. Запись пропускается, если сериализованное
//! состояние совпадает с последним сохранённым.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;
use thiserror::Error;

use super::data::kv_store::{PersistentStore, StoreError};
use super::debounce::Debouncer;

/// Предел длины зеркала при правке по индексу
pub const MAX_MIRROR_SLOTS: usize = 1000;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum MirrorError {
    #[error("Index {index} is out of range (limit {limit})")]
    IndexOutOfRange { index: usize, limit: usize },
}

/// Элемент зеркала: умеет принимать частичные изменения
pub trait MirrorItem: Serialize + DeserializeOwned + Clone + Default + Send + Sync + 'static {
    type Patch: Send;

    fn merge(&mut self, patch: Self::Patch);
}

/// Задержка сохранения: обычная (ввод) или быстрая (blur / commit)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SaveSpeed {
    Normal,
    Fast,
}

#[derive(Debug, Clone, Copy)]
pub struct SaveDelays {
    pub normal: Duration,
    pub fast: Duration,
}

impl Default for SaveDelays {
    fn default() -> Self {
        Self {
            normal: Duration::from_millis(800),
            fast: Duration::from_millis(150),
        }
    }
}

struct MirrorState<T> {
    items: Vec<T>,
    dirty: bool,
    last_saved: Option<String>,
}

struct Inner<T> {
    store: Arc<dyn PersistentStore>,
    collection: String,
    key: String,
    delays: SaveDelays,
    state: Mutex<MirrorState<T>>,
    save_lock: tokio::sync::Mutex<()>,
    debouncer: Debouncer,
}

impl<T: MirrorItem> Inner<T> {
    fn state(&self) -> std::sync::MutexGuard<'_, MirrorState<T>> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn save(&self) -> Result<bool, StoreError> {
        let _guard = self.save_lock.lock().await;

        let (serialized, value) = {
            let mut state = self.state();
            let serialized = serde_json::to_string(&state.items)?;
            if state.last_saved.as_deref() == Some(serialized.as_str()) {
                state.dirty = false;
                tracing::debug!("{}/{}: nothing changed, write skipped", self.collection, self.key);
                return Ok(false);
            }
            (serialized, serde_json::to_value(&state.items)?)
        };

        self.store.put(&self.collection, &self.key, &value).await?;

        let mut state = self.state();
        // правки, пришедшие во время записи, остаются грязными
        let current = serde_json::to_string(&state.items)?;
        state.dirty = current != serialized;
        state.last_saved = Some(serialized);
        tracing::debug!(
            "{}/{}: saved {} items",
            self.collection,
            self.key,
            state.items.len()
        );
        Ok(true)
    }
}

pub struct DiffSavePersister<T: MirrorItem> {
    inner: Arc<Inner<T>>,
}

impl<T: MirrorItem> Clone for DiffSavePersister<T> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<T: MirrorItem> DiffSavePersister<T> {
    pub fn new(
        store: Arc<dyn PersistentStore>,
        collection: impl Into<String>,
        key: impl Into<String>,
        delays: SaveDelays,
    ) -> Self {
        Self {
            inner: Arc::new(Inner {
                store,
                collection: collection.into(),
                key: key.into(),
                delays,
                state: Mutex::new(MirrorState {
                    items: Vec::new(),
                    dirty: false,
                    last_saved: None,
                }),
                save_lock: tokio::sync::Mutex::new(()),
                debouncer: Debouncer::new(),
            }),
        }
    }

    /// Загрузить сохранённый список; он же становится последним снимком
    pub async fn load(&self) -> Result<usize, StoreError> {
        let stored = self
            .inner
            .store
            .get(&self.inner.collection, &self.inner.key)
            .await?;

        let (items, snapshot): (Vec<T>, Option<String>) = match stored {
            Some(value) => {
                let items: Vec<T> = serde_json::from_value(value)?;
                let snapshot = serde_json::to_string(&items)?;
                (items, Some(snapshot))
            }
            None => (Vec::new(), None),
        };

        let mut state = self.inner.state();
        state.items = items;
        state.dirty = false;
        state.last_saved = snapshot;
        Ok(state.items.len())
    }

    /// Влить правку в слот `index` и запланировать сохранение.
    /// Отсутствующие слоты заполняются значениями по умолчанию, но зеркало
    /// не растёт дальше `MAX_MIRROR_SLOTS`.
    pub fn mark_dirty(
        &self,
        index: usize,
        patch: T::Patch,
        speed: SaveSpeed,
    ) -> Result<(), MirrorError> {
        {
            let mut state = self.inner.state();
            if index >= state.items.len() {
                let new_len = index
                    .checked_add(1)
                    .filter(|len| *len <= MAX_MIRROR_SLOTS)
                    .ok_or(MirrorError::IndexOutOfRange {
                        index,
                        limit: MAX_MIRROR_SLOTS,
                    })?;
                state.items.resize_with(new_len, T::default);
            }
            state.items[index].merge(patch);
            state.dirty = true;
        }
        self.schedule_save(self.delay_for(speed));
        Ok(())
    }

    /// Пересобрать зеркало из редактора (число элементов разошлось)
    pub fn rebuild_from_source(&self, items: Vec<T>) {
        {
            let mut state = self.inner.state();
            state.items = items;
            state.dirty = true;
        }
        self.schedule_save(self.inner.delays.normal);
    }

    /// Пересобрать, только если длины не совпадают
    pub fn sync_with_source(&self, source_len: usize, rebuild: impl FnOnce() -> Vec<T>) -> bool {
        if self.len() == source_len {
            return false;
        }
        tracing::debug!(
            "{}/{}: mirror out of sync ({} vs {}), rebuilding",
            self.inner.collection,
            self.inner.key,
            self.len(),
            source_len
        );
        self.rebuild_from_source(rebuild());
        true
    }

    pub fn schedule_save(&self, delay: Duration) {
        let inner = Arc::clone(&self.inner);
        self.inner.debouncer.schedule(delay, async move {
            if let Err(e) = inner.save().await {
                tracing::error!("Failed to save {}/{}: {}", inner.collection, inner.key, e);
            }
        });
    }

    /// Сохранить немедленно. true, если была запись.
    pub async fn save(&self) -> Result<bool, StoreError> {
        self.inner.save().await
    }

    /// Отменить отложенное сохранение и сохранить сейчас
    pub async fn flush(&self) -> Result<bool, StoreError> {
        self.inner.debouncer.cancel();
        self.inner.save().await
    }

    pub fn exported(&self) -> Vec<T> {
        self.inner.state().items.clone()
    }

    pub fn len(&self) -> usize {
        self.inner.state().items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn is_dirty(&self) -> bool {
        self.inner.state().dirty
    }

    pub fn is_save_pending(&self) -> bool {
        self.inner.debouncer.is_pending()
    }

    fn delay_for(&self, speed: SaveSpeed) -> Duration {
        match speed {
            SaveSpeed::Normal => self.inner.delays.normal,
            SaveSpeed::Fast => self.inner.delays.fast,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::kv_store::MemoryStore;
    use serde::Deserialize;

    #[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
    struct Note {
        text: String,
        pinned: bool,
    }

    enum NotePatch {
        Text(String),
        Pinned(bool),
    }

    impl MirrorItem for Note {
        type Patch = NotePatch;

        fn merge(&mut self, patch: NotePatch) {
            match patch {
                NotePatch::Text(text) => self.text = text,
                NotePatch::Pinned(pinned) => self.pinned = pinned,
            }
        }
    }

    fn persister(store: &Arc<MemoryStore>) -> DiffSavePersister<Note> {
        let store: Arc<dyn PersistentStore> = store.clone();
        DiffSavePersister::new(
            store,
            "settings",
            "notes",
            SaveDelays {
                normal: Duration::from_millis(500),
                fast: Duration::from_millis(50),
            },
        )
    }

    async fn seed(store: &MemoryStore, notes: &[Note]) {
        store
            .put("settings", "notes", &serde_json::to_value(notes).unwrap())
            .await
            .unwrap();
    }

    #[tokio::test(start_paused = true)]
    async fn test_burst_collapses_into_one_write() {
        let store = Arc::new(MemoryStore::new());
        let notes = persister(&store);

        for text in ["h", "he", "hel", "hell", "hello"] {
            notes.mark_dirty(0, NotePatch::Text(text.into()), SaveSpeed::Normal).unwrap();
            tokio::time::sleep(Duration::from_millis(100)).await;
        }
        assert_eq!(store.write_count(), 0);

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_count(), 1);
        assert!(!notes.is_dirty());

        let saved = store.get("settings", "notes").await.unwrap().unwrap();
        assert_eq!(saved[0]["text"], "hello");
    }

    #[tokio::test(start_paused = true)]
    async fn test_edit_and_revert_writes_nothing() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[Note { text: "keep".into(), pinned: false }]).await;
        let writes_before = store.write_count();

        let notes = persister(&store);
        assert_eq!(notes.load().await.unwrap(), 1);

        notes.mark_dirty(0, NotePatch::Text("changed".into()), SaveSpeed::Normal).unwrap();
        tokio::time::sleep(Duration::from_millis(100)).await;
        notes.mark_dirty(0, NotePatch::Text("keep".into()), SaveSpeed::Normal).unwrap();

        tokio::time::sleep(Duration::from_secs(2)).await;
        assert_eq!(store.write_count(), writes_before);
        assert!(!notes.is_dirty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_sparse_index_fills_defaults() {
        let store = Arc::new(MemoryStore::new());
        let notes = persister(&store);

        notes.mark_dirty(2, NotePatch::Pinned(true), SaveSpeed::Fast).unwrap();
        let items = notes.exported();
        assert_eq!(items.len(), 3);
        assert_eq!(items[0], Note::default());
        assert!(items[2].pinned);

        tokio::time::sleep(Duration::from_millis(200)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_index_past_limit_rejected() {
        let store = Arc::new(MemoryStore::new());
        let notes = persister(&store);

        let err = notes
            .mark_dirty(usize::MAX, NotePatch::Pinned(true), SaveSpeed::Fast)
            .unwrap_err();
        assert_eq!(
            err,
            MirrorError::IndexOutOfRange {
                index: usize::MAX,
                limit: MAX_MIRROR_SLOTS
            }
        );
        assert!(notes
            .mark_dirty(MAX_MIRROR_SLOTS, NotePatch::Pinned(true), SaveSpeed::Fast)
            .is_err());
        assert!(notes.is_empty());
        assert!(!notes.is_dirty());
        assert!(!notes.is_save_pending());

        // последний допустимый слот
        notes
            .mark_dirty(MAX_MIRROR_SLOTS - 1, NotePatch::Pinned(true), SaveSpeed::Fast)
            .unwrap();
        assert_eq!(notes.len(), MAX_MIRROR_SLOTS);
    }

    #[tokio::test(start_paused = true)]
    async fn test_fast_delay_replaces_pending_normal_save() {
        let store = Arc::new(MemoryStore::new());
        let notes = persister(&store);

        notes.mark_dirty(0, NotePatch::Text("a".into()), SaveSpeed::Normal).unwrap();
        notes.mark_dirty(0, NotePatch::Text("ab".into()), SaveSpeed::Fast).unwrap();

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(store.write_count(), 1);

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_rebuild_marks_dirty_and_saves() {
        let store = Arc::new(MemoryStore::new());
        seed(&store, &[Note::default()]).await;
        let notes = persister(&store);
        notes.load().await.unwrap();

        let rebuilt = notes.sync_with_source(2, || {
            vec![
                Note::default(),
                Note {
                    text: "second".into(),
                    pinned: true,
                },
            ]
        });
        assert!(rebuilt);
        assert!(notes.is_dirty());
        assert!(!notes.sync_with_source(2, Vec::new));

        let writes_before = store.write_count();
        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(store.write_count(), writes_before + 1);
        assert_eq!(notes.len(), 2);
    }

    #[tokio::test]
    async fn test_flush_writes_once_then_skips() {
        let store = Arc::new(MemoryStore::new());
        let notes = persister(&store);
        notes.mark_dirty(0, NotePatch::Text("x".into()), SaveSpeed::Normal).unwrap();

        assert!(notes.flush().await.unwrap());
        assert!(!notes.is_save_pending());
        assert!(!notes.save().await.unwrap());
        assert_eq!(store.write_count(), 1);
    }

    #[tokio::test]
    async fn test_save_error_keeps_dirty() {
        let store = Arc::new(MemoryStore::new());
        let notes = persister(&store);
        notes.mark_dirty(0, NotePatch::Text("x".into()), SaveSpeed::Normal).unwrap();

        store.set_available(false);
        assert!(notes.flush().await.is_err());
        assert!(notes.is_dirty());

        store.set_available(true);
        assert!(notes.flush().await.unwrap());
        assert!(!notes.is_dirty());
    }
}
