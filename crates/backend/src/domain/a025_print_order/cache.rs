//! Write-through кэш заказов поверх key-value хранилища.
//!
//! Единственный путь чтения и записи коллекции `orders`. Чтение синхронное
//! (снимок), изменения асинхронные: сначала запись в хранилище, потом
//! обновление карты, потом уведомление подписчиков.

use chrono::{DateTime, Utc};
use contracts::domain::a025_print_order::aggregate::{
    normalize_key_value, normalize_order_number, ImportedRow, OrderRecord, ORDERS_COLLECTION,
};
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::sync::{Arc, PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};
use thiserror::Error;
use tokio::sync::{Mutex, OnceCell};

use crate::shared::data::kv_store::{PersistentStore, StoreError};
use crate::shared::events::{ListenerRegistry, Subscription};

#[derive(Debug, Error)]
pub enum CacheError {
    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Failed to encode order record: {0}")]
    Encode(#[from] serde_json::Error),
}

/// Карта заказов с сохранением порядка вставки
#[derive(Default)]
struct OrderMap {
    order: Vec<String>,
    by_key: HashMap<String, OrderRecord>,
}

impl OrderMap {
    fn get(&self, key: &str) -> Option<&OrderRecord> {
        self.by_key.get(key)
    }

    fn upsert(&mut self, record: OrderRecord) {
        if !self.by_key.contains_key(&record.order_number) {
            self.order.push(record.order_number.clone());
        }
        self.by_key.insert(record.order_number.clone(), record);
    }

    fn remove(&mut self, key: &str) -> bool {
        if self.by_key.remove(key).is_some() {
            self.order.retain(|k| k != key);
            true
        } else {
            false
        }
    }

    fn snapshot(&self) -> Vec<OrderRecord> {
        self.order
            .iter()
            .filter_map(|k| self.by_key.get(k))
            .cloned()
            .collect()
    }

    fn len(&self) -> usize {
        self.order.len()
    }
}

/// Извлекатель ключа: значение колонки `column`
pub fn column_key(column: impl Into<String>) -> impl Fn(&ImportedRow) -> Option<Value> {
    let column = column.into();
    move |row: &ImportedRow| row.get(&column).cloned()
}

pub struct OrderCache {
    store: Arc<dyn PersistentStore>,
    records: RwLock<OrderMap>,
    loaded: OnceCell<()>,
    write_lock: Mutex<()>,
    listeners: ListenerRegistry<[OrderRecord]>,
}

impl OrderCache {
    pub fn new(store: Arc<dyn PersistentStore>) -> Self {
        Self {
            store,
            records: RwLock::new(OrderMap::default()),
            loaded: OnceCell::new(),
            write_lock: Mutex::new(()),
            listeners: ListenerRegistry::new("order cache"),
        }
    }

    /// Загрузить все заказы из хранилища. Повторные вызовы ничего не делают;
    /// после ошибки следующий вызов пробует снова.
    pub async fn init(&self) -> Result<(), CacheError> {
        self.loaded.get_or_try_init(|| self.load_all()).await?;
        Ok(())
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded.initialized()
    }

    async fn load_all(&self) -> Result<(), CacheError> {
        let entries = self.store.get_all(ORDERS_COLLECTION).await?;

        let mut map = OrderMap::default();
        let mut stale_keys: Vec<String> = Vec::new();
        let mut rekeyed: HashSet<String> = HashSet::new();
        for (store_key, value) in entries {
            let mut record: OrderRecord = match serde_json::from_value(value) {
                Ok(record) => record,
                Err(e) => {
                    tracing::warn!("Skipping unreadable order record '{}': {}", store_key, e);
                    continue;
                }
            };
            let key = normalize_order_number(&record.order_number);
            if key.is_empty() {
                tracing::warn!("Skipping stored order record with empty order number");
                continue;
            }
            if store_key != key || record.order_number != key {
                rekeyed.insert(key.clone());
            }
            if store_key != key {
                stale_keys.push(store_key);
            }
            record.order_number = key;
            map.upsert(record);
        }

        // строка хранилища должна лежать под нормализованным ключом,
        // иначе удаление и печать не попадут в неё
        for key in &rekeyed {
            if let Some(record) = map.get(key) {
                self.persist(record).await?;
            }
        }
        for stale in stale_keys {
            if map.get(&stale).is_none() {
                self.store.delete(ORDERS_COLLECTION, &stale).await?;
            }
        }
        if !rekeyed.is_empty() {
            tracing::warn!("Re-keyed {} stored orders to normalized order numbers", rekeyed.len());
        }

        tracing::info!("Order cache loaded: {} records", map.len());
        *self.write_map() = map;
        Ok(())
    }

    fn read_map(&self) -> RwLockReadGuard<'_, OrderMap> {
        self.records.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write_map(&self) -> RwLockWriteGuard<'_, OrderMap> {
        self.records.write().unwrap_or_else(PoisonError::into_inner)
    }

    /// Снимок всех заказов в порядке вставки
    pub fn get_all(&self) -> Vec<OrderRecord> {
        self.read_map().snapshot()
    }

    pub fn get(&self, order_number: &str) -> Option<OrderRecord> {
        let key = normalize_order_number(order_number);
        self.read_map().get(&key).cloned()
    }

    pub fn len(&self) -> usize {
        self.read_map().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn on_update<F>(&self, callback: F) -> Subscription
    where
        F: Fn(&[OrderRecord]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.listeners.subscribe(callback)
    }

    fn notify(&self) {
        let snapshot = self.get_all();
        self.listeners.notify(&snapshot[..]);
    }

    async fn persist(&self, record: &OrderRecord) -> Result<(), CacheError> {
        let value = serde_json::to_value(record)?;
        self.store
            .put(ORDERS_COLLECTION, &record.order_number, &value)
            .await?;
        Ok(())
    }

    /// Импорт строк. Возвращает число НОВЫХ заказов; обновление строки
    /// существующего заказа не считается и само по себе не уведомляет.
    pub async fn bulk_upsert<I, F>(&self, rows: I, key_extractor: F) -> Result<usize, CacheError>
    where
        I: IntoIterator<Item = ImportedRow>,
        F: Fn(&ImportedRow) -> Option<Value>,
    {
        self.init().await?;
        let _guard = self.write_lock.lock().await;

        let now = Utc::now();
        let mut changed = 0usize;
        let mut replaced = 0usize;
        let mut skipped = 0usize;

        for row in rows {
            let key = key_extractor(&row)
                .map(|v| normalize_key_value(&v))
                .unwrap_or_default();
            if key.is_empty() {
                skipped += 1;
                continue;
            }

            let existing = self.read_map().get(&key).cloned();
            let result = match existing {
                None => {
                    let record = OrderRecord::new_for_insert(key, row, now);
                    self.commit(record).await.map(|_| changed += 1)
                }
                Some(mut record) if record.row != row => {
                    record.row = row;
                    self.commit(record).await.map(|_| replaced += 1)
                }
                Some(_) => Ok(()),
            };

            if let Err(e) = result {
                // уже записанные заказы остаются, подписчики должны их увидеть
                if changed > 0 {
                    self.notify();
                }
                return Err(e);
            }
        }

        if skipped > 0 {
            tracing::warn!("Import skipped {} rows without order number", skipped);
        }
        tracing::info!(
            "Import finished: {} new, {} replaced, {} total",
            changed,
            replaced,
            self.len()
        );

        if changed > 0 {
            self.notify();
        }
        Ok(changed)
    }

    async fn commit(&self, record: OrderRecord) -> Result<(), CacheError> {
        self.persist(&record).await?;
        self.write_map().upsert(record);
        Ok(())
    }

    pub async fn mark_printed(&self, order_number: &str) -> Result<bool, CacheError> {
        self.set_printed(order_number, Some(Utc::now())).await
    }

    pub async fn mark_printed_at(
        &self,
        order_number: &str,
        printed_at: DateTime<Utc>,
    ) -> Result<bool, CacheError> {
        self.set_printed(order_number, Some(printed_at)).await
    }

    pub async fn clear_printed(&self, order_number: &str) -> Result<bool, CacheError> {
        self.set_printed(order_number, None).await
    }

    async fn set_printed(
        &self,
        order_number: &str,
        printed_at: Option<DateTime<Utc>>,
    ) -> Result<bool, CacheError> {
        self.init().await?;
        let _guard = self.write_lock.lock().await;

        let key = normalize_order_number(order_number);
        let Some(mut record) = self.read_map().get(&key).cloned() else {
            return Ok(false);
        };

        record.printed_at = printed_at;
        self.commit(record).await?;
        self.notify();
        Ok(true)
    }

    /// Удалить заказы. Неизвестные номера пропускаются.
    pub async fn bulk_delete(&self, order_numbers: &[String]) -> Result<usize, CacheError> {
        self.init().await?;
        let _guard = self.write_lock.lock().await;

        let mut removed = 0usize;
        for order_number in order_numbers {
            let key = normalize_order_number(order_number);
            if self.read_map().get(&key).is_none() {
                continue;
            }

            if let Err(e) = self.store.delete(ORDERS_COLLECTION, &key).await {
                if removed > 0 {
                    self.notify();
                }
                return Err(e.into());
            }
            self.write_map().remove(&key);
            removed += 1;
        }

        if removed > 0 {
            tracing::info!("Deleted {} orders", removed);
            self.notify();
        }
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::data::kv_store::MemoryStore;
    use serde_json::json;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn row(order: Value, sku: &str) -> ImportedRow {
        let mut row = ImportedRow::new();
        row.insert("Order Number".into(), order);
        row.insert("SKU".into(), json!(sku));
        row
    }

    fn cache_with(store: &Arc<MemoryStore>) -> OrderCache {
        let store: Arc<dyn PersistentStore> = store.clone();
        OrderCache::new(store)
    }

    fn count_updates(cache: &OrderCache) -> (Arc<AtomicUsize>, Subscription) {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&calls);
        let sub = cache.on_update(move |_| {
            counter.fetch_add(1, Ordering::SeqCst);
            Ok(())
        });
        (calls, sub)
    }

    #[tokio::test]
    async fn test_keys_are_unique_after_import() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);

        let rows = vec![
            row(json!("1001"), "a"),
            row(json!(" 1001 "), "b"),
            row(json!(1001), "c"),
            row(json!("1002"), "d"),
            row(json!("   "), "e"),
            row(Value::Null, "f"),
        ];
        let changed = cache.bulk_upsert(rows, column_key("Order Number")).await.unwrap();

        assert_eq!(changed, 2);
        let all = cache.get_all();
        let keys: HashSet<_> = all.iter().map(|r| r.order_number.clone()).collect();
        assert_eq!(keys.len(), all.len());
        assert_eq!(all.len(), 2);
        // последняя строка побеждает
        assert_eq!(cache.get("1001").unwrap().row["SKU"], "c");
    }

    #[tokio::test]
    async fn test_reimport_is_idempotent() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);
        let (calls, _sub) = count_updates(&cache);

        let rows = vec![row(json!("A-1"), "x")];
        assert_eq!(cache.bulk_upsert(rows.clone(), column_key("Order Number")).await.unwrap(), 1);
        let writes = store.write_count();
        assert_eq!(cache.bulk_upsert(rows, column_key("Order Number")).await.unwrap(), 0);

        assert_eq!(cache.len(), 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        // одинаковая строка не перезаписывается
        assert_eq!(store.write_count(), writes);
    }

    #[tokio::test]
    async fn test_changed_row_replaced_without_notify() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);

        cache
            .bulk_upsert(vec![row(json!("A-1"), "old")], column_key("Order Number"))
            .await
            .unwrap();
        let created_at = cache.get("A-1").unwrap().created_at;
        cache.mark_printed("A-1").await.unwrap();

        let (calls, _sub) = count_updates(&cache);
        let changed = cache
            .bulk_upsert(vec![row(json!("A-1"), "new")], column_key("Order Number"))
            .await
            .unwrap();

        assert_eq!(changed, 0);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
        let record = cache.get("A-1").unwrap();
        assert_eq!(record.row["SKU"], "new");
        assert_eq!(record.created_at, created_at);
        assert!(record.is_printed());

        let stored = store.get(ORDERS_COLLECTION, "A-1").await.unwrap().unwrap();
        assert_eq!(stored["row"]["SKU"], "new");
    }

    #[tokio::test]
    async fn test_mark_and_clear_printed() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);
        cache
            .bulk_upsert(vec![row(json!("7"), "x")], column_key("Order Number"))
            .await
            .unwrap();
        let (calls, _sub) = count_updates(&cache);

        assert!(!cache.mark_printed("missing").await.unwrap());
        assert_eq!(calls.load(Ordering::SeqCst), 0);

        let at = Utc::now();
        assert!(cache.mark_printed_at(" 7 ", at).await.unwrap());
        assert_eq!(cache.get("7").unwrap().printed_at, Some(at));
        assert!(cache.clear_printed("7").await.unwrap());
        assert_eq!(cache.get("7").unwrap().printed_at, None);
        assert_eq!(calls.load(Ordering::SeqCst), 2);

        let stored = store.get(ORDERS_COLLECTION, "7").await.unwrap().unwrap();
        assert!(stored["printedAt"].is_null());
    }

    #[tokio::test]
    async fn test_listener_sees_committed_state() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);
        let seen = Arc::new(std::sync::Mutex::new(Vec::new()));
        let sink = Arc::clone(&seen);
        let _sub = cache.on_update(move |records| {
            sink.lock().unwrap().push(records.len());
            Ok(())
        });
        let _broken = cache.on_update(|_| anyhow::bail!("listener failure"));

        cache
            .bulk_upsert(
                vec![row(json!("1"), "a"), row(json!("2"), "b")],
                column_key("Order Number"),
            )
            .await
            .unwrap();
        cache.mark_printed("1").await.unwrap();

        // одно уведомление на импорт, одно на печать
        assert_eq!(*seen.lock().unwrap(), vec![2, 2]);
    }

    #[tokio::test]
    async fn test_init_loads_and_normalizes_once() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                ORDERS_COLLECTION,
                " 55 ",
                &json!({
                    "orderNumber": " 55 ",
                    "row": {"SKU": "m"},
                    "createdAt": "2024-03-01T10:00:00Z",
                    "printedAt": null
                }),
            )
            .await
            .unwrap();
        store
            .put(ORDERS_COLLECTION, "broken", &json!({"unexpected": true}))
            .await
            .unwrap();

        let cache = cache_with(&store);
        cache.init().await.unwrap();
        assert!(cache.is_loaded());
        assert_eq!(cache.len(), 1);
        assert!(cache.get("55").is_some());

        // повторный init не перечитывает хранилище
        store.set_available(false);
        cache.init().await.unwrap();
        assert_eq!(cache.len(), 1);
    }

    #[tokio::test]
    async fn test_untrimmed_stored_key_is_rewritten() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                ORDERS_COLLECTION,
                " 55 ",
                &json!({
                    "orderNumber": " 55 ",
                    "row": {"SKU": "m"},
                    "createdAt": "2024-03-01T10:00:00Z",
                    "printedAt": null
                }),
            )
            .await
            .unwrap();

        let cache = cache_with(&store);
        cache.init().await.unwrap();

        let stored = store.get_all(ORDERS_COLLECTION).await.unwrap();
        assert_eq!(stored.len(), 1);
        assert_eq!(stored[0].0, "55");
        assert_eq!(stored[0].1["orderNumber"], "55");

        // печать не плодит вторую строку
        cache.mark_printed("55").await.unwrap();
        assert_eq!(store.get_all(ORDERS_COLLECTION).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_delete_of_rekeyed_order_survives_restart() {
        let store = Arc::new(MemoryStore::new());
        store
            .put(
                ORDERS_COLLECTION,
                " 55 ",
                &json!({
                    "orderNumber": " 55 ",
                    "row": {},
                    "createdAt": "2024-03-01T10:00:00Z",
                    "printedAt": null
                }),
            )
            .await
            .unwrap();

        let cache = cache_with(&store);
        cache.init().await.unwrap();
        assert_eq!(cache.bulk_delete(&["55".to_string()]).await.unwrap(), 1);

        let restarted = cache_with(&store);
        restarted.init().await.unwrap();
        assert!(restarted.is_empty());
    }

    #[tokio::test]
    async fn test_init_fails_fast_when_store_unavailable() {
        let store = Arc::new(MemoryStore::new());
        store.set_available(false);
        let cache = cache_with(&store);

        let err = cache.init().await.unwrap_err();
        assert!(matches!(err, CacheError::Store(StoreError::Unavailable(_))));
        assert!(!cache.is_loaded());

        store.set_available(true);
        cache.init().await.unwrap();
        assert!(cache.is_loaded());
    }

    #[tokio::test]
    async fn test_bulk_delete() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);
        cache
            .bulk_upsert(
                vec![row(json!("1"), "a"), row(json!("2"), "b"), row(json!("3"), "c")],
                column_key("Order Number"),
            )
            .await
            .unwrap();
        let (calls, _sub) = count_updates(&cache);

        let removed = cache
            .bulk_delete(&["1".to_string(), " 3".to_string(), "404".to_string()])
            .await
            .unwrap();

        assert_eq!(removed, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        let keys: Vec<_> = cache.get_all().into_iter().map(|r| r.order_number).collect();
        assert_eq!(keys, vec!["2"]);
        assert_eq!(store.get_all(ORDERS_COLLECTION).await.unwrap().len(), 1);

        assert_eq!(cache.bulk_delete(&[]).await.unwrap(), 0);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_get_all_keeps_insertion_order() {
        let store = Arc::new(MemoryStore::new());
        let cache = cache_with(&store);
        cache
            .bulk_upsert(
                vec![row(json!("30"), "a"), row(json!("4"), "b"), row(json!("100"), "c")],
                column_key("Order Number"),
            )
            .await
            .unwrap();

        let keys: Vec<_> = cache.get_all().into_iter().map(|r| r.order_number).collect();
        assert_eq!(keys, vec!["30", "4", "100"]);
    }
}
