pub mod domain;
pub mod handlers;
pub mod routes;
pub mod shared;
pub mod system;
pub mod usecases;

use std::sync::Arc;

use shared::data::kv_store::{MemoryStore, PersistentStore, SqliteStore};

/// Хранилище по конфигу: SQLite или память (`database.path = ":memory:"`)
async fn open_store(config: &shared::config::Config) -> anyhow::Result<Arc<dyn PersistentStore>> {
    if shared::config::is_in_memory(config) {
        tracing::warn!("Using in-memory storage, data will be lost on exit");
        return Ok(Arc::new(MemoryStore::new()));
    }

    let db_path = shared::config::get_database_path(config)?;
    shared::data::db::initialize_database(&db_path)
        .await
        .map_err(|e| anyhow::anyhow!("db init failed: {e}"))?;
    let conn = shared::data::db::get_connection()
        .ok_or_else(|| anyhow::anyhow!("database connection is not initialized"))?;
    Ok(Arc::new(SqliteStore::new(conn.clone())))
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    use axum::http::{header, Method};
    use axum::middleware;
    use std::net::SocketAddr;
    use tokio::net::TcpListener;
    use tower_http::cors::{Any, CorsLayer};

    system::tracing::initialize()?;

    let config = shared::config::load_config()?;
    let port = config.server.port;

    let store = open_store(&config).await?;
    let renderer = Arc::new(usecases::u510_print_panel::LoggingPreviewRenderer);
    let state = shared::app_state::AppState::build(config, store, renderer).await?;
    let labels = state.labels.clone();

    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT]);

    let app = routes::configure_routes(state)
        .layer(middleware::from_fn(
            system::middleware::request_logger::request_logger,
        ))
        .layer(cors);

    let addr: SocketAddr = ([0, 0, 0, 0], port).into();

    tracing::info!("Attempting to bind server to http://{}", addr);
    let listener = match TcpListener::bind(addr).await {
        Ok(listener) => {
            tracing::info!("Server successfully bound to {}", addr);
            listener
        }
        Err(e) => {
            if e.kind() == std::io::ErrorKind::AddrInUse {
                tracing::error!(
                    "Error: Port {} is already in use. Please ensure no other process is using this port.",
                    port
                );
            } else {
                tracing::error!("Failed to bind to port {}. Error: {}", port, e);
            }
            return Err(e.into());
        }
    };

    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!("Failed to listen for shutdown signal: {}", e);
            }
        })
        .await?;

    // несохранённые правки этикеток
    if let Err(e) = labels.flush().await {
        tracing::error!("Failed to save custom labels on shutdown: {}", e);
    }
    tracing::info!("Server stopped");

    Ok(())
}
