//! 設定の読み込み
//!
//! 組み込みの既定値、`config/default.toml`、`config/{RUN_MODE}.toml`、
//! `LEDGER_`で始まる環境変数の順に重ね、最後に`DATABASE_URL`と`PORT`で上書きする。

use config::{Config, ConfigBuilder, ConfigError, Environment, File, builder::DefaultState};
use serde::Deserialize;
use std::env;

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl ServerConfig {
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}

/// 台帳・カタログ・学生名簿の保存先
#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum StorageBackend {
    /// プロセス内メモリ（再起動で消える）
    Memory,
    Postgres,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct StorageConfig {
    pub backend: StorageBackend,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct LoggingConfig {
    /// `RUST_LOG`が未設定のときに使うフィルタ
    pub level: String,
}

#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub storage: StorageConfig,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

impl AppConfig {
    /// 設定ファイルと環境変数から設定を読み込む
    pub fn load() -> Result<Self, ConfigError> {
        let run_mode = env::var("RUN_MODE").unwrap_or_else(|_| "development".into());

        defaults()?
            .add_source(File::with_name("config/default").required(false))
            .add_source(File::with_name(&format!("config/{}", run_mode)).required(false))
            // 例: LEDGER_SERVER__PORT=8080, LEDGER_STORAGE__BACKEND=postgres
            .add_source(
                Environment::with_prefix("LEDGER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", env::var("DATABASE_URL").ok())?
            .set_override_option("server.port", env::var("PORT").ok())?
            .build()?
            .try_deserialize()
    }
}

fn defaults() -> Result<ConfigBuilder<DefaultState>, ConfigError> {
    Config::builder()
        .set_default("server.host", "0.0.0.0")?
        .set_default("server.port", 3000_i64)?
        .set_default("storage.backend", "memory")?
        .set_default("database.url", "postgres://localhost/library")?
        .set_default("database.max_connections", 5_i64)?
        .set_default("logging.level", "granthalaya_ledger=debug,tower_http=debug")
}
