use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Duration;

use super::diff_save::SaveDelays;

/// Путь базы, при котором используется хранилище в памяти
pub const IN_MEMORY_DATABASE: &str = ":memory:";

#[derive(Debug, Deserialize, Clone)]
pub struct Config {
    pub database: DatabaseConfig,
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub print: PrintConfig,
    #[serde(default)]
    pub view: ViewConfig,
    #[serde(default)]
    pub autosave: AutosaveConfig,
}

#[derive(Debug, Deserialize, Clone)]
pub struct DatabaseConfig {
    pub path: String,
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ServerConfig {
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self { port: 3000 }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct PrintConfig {
    /// Слотов на листе
    pub sheet_capacity: u32,
    pub default_skip: u32,
    /// Предел `total` в запросе раскладки по листам
    pub max_labels: u32,
    /// Окно склейки запросов предпросмотра
    pub preview_delay_ms: u64,
}

impl Default for PrintConfig {
    fn default() -> Self {
        Self {
            sheet_capacity: contracts::projections::p910_label_sheets::allocator::SHEET_CAPACITY,
            default_skip: 0,
            max_labels: 10_000,
            preview_delay_ms: 300,
        }
    }
}

impl PrintConfig {
    pub fn preview_delay(&self) -> Duration {
        Duration::from_millis(self.preview_delay_ms)
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct ViewConfig {
    pub page_size: u32,
    /// Колонки импорта, из которых берётся дата оплаты (по порядку)
    pub payment_columns: Vec<String>,
}

impl Default for ViewConfig {
    fn default() -> Self {
        Self {
            page_size: 20,
            payment_columns: vec![
                "Paid Date".to_string(),
                "Payment Date".to_string(),
                "Order Date".to_string(),
            ],
        }
    }
}

#[derive(Debug, Deserialize, Clone)]
#[serde(default)]
pub struct AutosaveConfig {
    pub delay_ms: u64,
    pub fast_delay_ms: u64,
}

impl Default for AutosaveConfig {
    fn default() -> Self {
        Self {
            delay_ms: 800,
            fast_delay_ms: 150,
        }
    }
}

impl AutosaveConfig {
    pub fn delays(&self) -> SaveDelays {
        SaveDelays {
            normal: Duration::from_millis(self.delay_ms),
            fast: Duration::from_millis(self.fast_delay_ms),
        }
    }
}

/// Default configuration embedded in the binary
const DEFAULT_CONFIG: &str = r#"
[database]
path = "target/db/app.db"

[server]
port = 3000

[print]
sheet_capacity = 44
default_skip = 0
max_labels = 10000
preview_delay_ms = 300

[view]
page_size = 20
payment_columns = ["Paid Date", "Payment Date", "Order Date"]

[autosave]
delay_ms = 800
fast_delay_ms = 150
"#;

/// Load configuration from config.toml file
///
/// Search order:
/// 1. Next to the executable (for production)
/// 2. Falls back to embedded default config
pub fn load_config() -> anyhow::Result<Config> {
    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            let config_path = exe_dir.join("config.toml");

            if config_path.exists() {
                tracing::info!("Loading config from: {}", config_path.display());
                let contents = std::fs::read_to_string(&config_path)?;
                return parse_config(&contents);
            } else {
                tracing::warn!("config.toml not found at: {}", config_path.display());
            }
        }
    }

    tracing::info!("Using default embedded configuration");
    parse_config(DEFAULT_CONFIG)
}

fn parse_config(contents: &str) -> anyhow::Result<Config> {
    let config: Config = toml::from_str(contents)?;
    if config.print.sheet_capacity == 0 {
        anyhow::bail!("print.sheet_capacity must be at least 1");
    }
    if config.view.page_size == 0 {
        anyhow::bail!("view.page_size must be at least 1");
    }
    Ok(config)
}

pub fn is_in_memory(config: &Config) -> bool {
    config.database.path == IN_MEMORY_DATABASE
}

/// Get the database file path from configuration
/// Resolves relative paths relative to the executable directory
pub fn get_database_path(config: &Config) -> anyhow::Result<PathBuf> {
    let db_path_str = &config.database.path;
    let db_path = Path::new(db_path_str);

    if db_path.is_absolute() {
        return Ok(db_path.to_path_buf());
    }

    if let Ok(exe_path) = std::env::current_exe() {
        if let Some(exe_dir) = exe_path.parent() {
            return Ok(exe_dir.join(db_path));
        }
    }

    Ok(PathBuf::from(db_path_str))
}
