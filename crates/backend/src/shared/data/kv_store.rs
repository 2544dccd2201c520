//! Key-value хранилище по именованным коллекциям.
//!
//! Все операции асинхронные. При недоступности хранилища возвращается
//! ошибка, повторных попыток здесь нет.

use async_trait::async_trait;
use chrono::Utc;
use sea_orm::{ConnectionTrait, DatabaseBackend, DatabaseConnection, Statement};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Mutex, PoisonError};
use thiserror::Error;

/// Ошибки хранилища
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Storage unavailable: {0}")]
    Unavailable(String),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Database error: {0}")]
    Database(#[from] sea_orm::DbErr),
}

/// Контракт хранилища
#[async_trait]
pub trait PersistentStore: Send + Sync {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError>;

    /// Все записи коллекции (ключ, значение) в порядке первой вставки
    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError>;

    /// Вставка или замена записи
    async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<(), StoreError>;

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError>;
}

/// Хранилище поверх таблицы kv_store в SQLite
pub struct SqliteStore {
    conn: DatabaseConnection,
}

impl SqliteStore {
    /// Таблица kv_store должна уже существовать, см. `db::ensure_kv_table`
    pub fn new(conn: DatabaseConnection) -> Self {
        Self { conn }
    }
}

fn parse_value_json(raw: &str) -> Result<Value, StoreError> {
    Ok(serde_json::from_str(raw)?)
}

#[async_trait]
impl PersistentStore for SqliteStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        let query = r#"
            SELECT value_json FROM kv_store
            WHERE collection = ? AND key = ?
        "#;
        let row = self
            .conn
            .query_one(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                query,
                vec![collection.into(), key.into()],
            ))
            .await?;

        match row {
            Some(row) => {
                let raw: String = row.try_get("", "value_json")?;
                Ok(Some(parse_value_json(&raw)?))
            }
            None => Ok(None),
        }
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        let query = r#"
            SELECT key, value_json FROM kv_store
            WHERE collection = ?
            ORDER BY rowid
        "#;
        let rows = self
            .conn
            .query_all(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                query,
                vec![collection.into()],
            ))
            .await?;

        let mut entries = Vec::with_capacity(rows.len());
        for row in rows {
            let key: String = row.try_get("", "key")?;
            let raw: String = row.try_get("", "value_json")?;
            entries.push((key, parse_value_json(&raw)?));
        }
        Ok(entries)
    }

    async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        let value_json = serde_json::to_string(value)?;
        let updated_at = Utc::now().to_rfc3339();

        let query = r#"
            INSERT INTO kv_store (collection, key, value_json, updated_at)
            VALUES (?, ?, ?, ?)
            ON CONFLICT(collection, key) DO UPDATE SET
                value_json = excluded.value_json,
                updated_at = excluded.updated_at
        "#;
        self.conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                query,
                vec![
                    collection.into(),
                    key.into(),
                    value_json.into(),
                    updated_at.into(),
                ],
            ))
            .await?;
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.conn
            .execute(Statement::from_sql_and_values(
                DatabaseBackend::Sqlite,
                "DELETE FROM kv_store WHERE collection = ? AND key = ?",
                vec![collection.into(), key.into()],
            ))
            .await?;
        Ok(())
    }
}

/// Хранилище в памяти: режим `database.path = ":memory:"` и тесты.
/// Умеет имитировать недоступность и считает записи.
#[derive(Default)]
pub struct MemoryStore {
    collections: Mutex<HashMap<String, Vec<(String, Value)>>>,
    unavailable: AtomicBool,
    writes: AtomicUsize,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set_available(&self, available: bool) {
        self.unavailable.store(!available, Ordering::SeqCst);
    }

    /// Количество выполненных put + delete
    pub fn write_count(&self) -> usize {
        self.writes.load(Ordering::SeqCst)
    }

    fn check_available(&self) -> Result<(), StoreError> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(StoreError::Unavailable("memory store is switched off".into()));
        }
        Ok(())
    }
}

#[async_trait]
impl PersistentStore for MemoryStore {
    async fn get(&self, collection: &str, key: &str) -> Result<Option<Value>, StoreError> {
        self.check_available()?;
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(collections
            .get(collection)
            .and_then(|items| items.iter().find(|(k, _)| k == key))
            .map(|(_, v)| v.clone()))
    }

    async fn get_all(&self, collection: &str) -> Result<Vec<(String, Value)>, StoreError> {
        self.check_available()?;
        let collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    async fn put(&self, collection: &str, key: &str, value: &Value) -> Result<(), StoreError> {
        self.check_available()?;
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        let items = collections.entry(collection.to_string()).or_default();
        match items.iter_mut().find(|(k, _)| k == key) {
            Some(slot) => slot.1 = value.clone(),
            None => items.push((key.to_string(), value.clone())),
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn delete(&self, collection: &str, key: &str) -> Result<(), StoreError> {
        self.check_available()?;
        let mut collections = self.collections.lock().unwrap_or_else(PoisonError::into_inner);
        if let Some(items) = collections.get_mut(collection) {
            items.retain(|(k, _)| k != key);
        }
        self.writes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
