use once_cell::sync::OnceCell;
use sea_orm::{ConnectionTrait, Database, DatabaseBackend, DatabaseConnection, Statement};
use std::path::Path;

static DB_CONN: OnceCell<DatabaseConnection> = OnceCell::new();

/// Открыть SQLite и создать таблицу key-value хранилища
pub async fn initialize_database(db_file: &Path) -> anyhow::Result<()> {
    if let Some(parent) = db_file.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let absolute_path = if db_file.is_absolute() {
        db_file.to_path_buf()
    } else {
        std::env::current_dir()?.join(db_file)
    };
    // Normalize path separators and ensure proper URL form on Windows
    let normalized = absolute_path.to_string_lossy().replace('\\', "/");
    let needs_leading_slash = !normalized.starts_with('/') && normalized.contains(':');
    let prefix = if needs_leading_slash { "/" } else { "" };
    let db_url = format!("sqlite://{}{}?mode=rwc", prefix, normalized);
    let conn = Database::connect(&db_url).await?;

    ensure_kv_table(&conn).await?;

    DB_CONN
        .set(conn)
        .map_err(|_| anyhow::anyhow!("Failed to set DB_CONN"))?;
    tracing::info!("Database ready at {}", absolute_path.display());
    Ok(())
}

/// Создать таблицу kv_store, если её нет
pub async fn ensure_kv_table(conn: &DatabaseConnection) -> anyhow::Result<()> {
    let check_kv_table = r#"
        SELECT name FROM sqlite_master WHERE type='table' AND name='kv_store';
    "#;
    let kv_table_exists = conn
        .query_all(Statement::from_string(
            DatabaseBackend::Sqlite,
            check_kv_table.to_string(),
        ))
        .await?;

    if kv_table_exists.is_empty() {
        tracing::info!("Creating kv_store table");
        let create_kv_table_sql = r#"
            CREATE TABLE kv_store (
                collection TEXT NOT NULL,
                key TEXT NOT NULL,
                value_json TEXT NOT NULL,
                updated_at TEXT NOT NULL,
                PRIMARY KEY (collection, key)
            );
        "#;
        conn.execute(Statement::from_string(
            DatabaseBackend::Sqlite,
            create_kv_table_sql.to_string(),
        ))
        .await?;
    }
    Ok(())
}

/// SQLite в памяти на одном соединении (каждое соединение видит свою базу)
#[cfg(test)]
pub async fn connect_in_memory() -> anyhow::Result<DatabaseConnection> {
    use sea_orm::ConnectOptions;

    let mut options = ConnectOptions::new("sqlite::memory:");
    options
        .max_connections(1)
        .min_connections(1)
        .sqlx_logging(false);
    Ok(Database::connect(options).await?)
}

/// Соединение, если база уже инициализирована
pub fn get_connection() -> Option<&'static DatabaseConnection> {
    DB_CONN.get()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_ensure_kv_table_is_idempotent() {
        let conn = connect_in_memory().await.unwrap();
        ensure_kv_table(&conn).await.unwrap();
        ensure_kv_table(&conn).await.unwrap();

        let tables = conn
            .query_all(Statement::from_string(
                DatabaseBackend::Sqlite,
                "SELECT name FROM sqlite_master WHERE type='table' AND name='kv_store'".to_string(),
            ))
            .await
            .unwrap();
        assert_eq!(tables.len(), 1);
    }
}
