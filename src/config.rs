use config::{Config, Environment, File};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::error::{LedgerError, Result};

/// 默认配置文件 (存在时自动加载)
pub const DEFAULT_CONFIG_FILE: &str = "ledger.toml";

/// 应用配置
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub ingest: IngestConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: String,
    pub max_connections: u32,
    pub acquire_timeout_secs: u64,
    /// 慢查询日志阈值
    pub slow_statement_secs: u64,
    /// 表所在的 Postgres schema，不设置时使用连接默认的 search_path
    #[serde(default)]
    pub search_path: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct IngestConfig {
    pub data_dir: PathBuf,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 8080,
            },
            database: DatabaseConfig {
                url: "postgres://localhost/invoice_ledger".to_string(),
                max_connections: 20,
                acquire_timeout_secs: 10,
                slow_statement_secs: 5,
                search_path: None,
            },
            ingest: IngestConfig {
                data_dir: PathBuf::from("data"),
            },
        }
    }
}

impl AppConfig {
    /// 加载配置: 默认值 -> 配置文件 -> LEDGER_* 环境变量 -> DATABASE_URL
    ///
    /// 未指定 `path` 时，当前目录下的 `ledger.toml` 存在则加载。
    /// 环境变量形如 `LEDGER_SERVER__PORT=9000`、`LEDGER_DATABASE__URL=...`。
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let defaults = Self::default();

        let file = match path {
            Some(p) => File::from(p).required(true),
            None => File::with_name(DEFAULT_CONFIG_FILE).required(false),
        };

        let config = Config::builder()
            .set_default("server.host", defaults.server.host)?
            .set_default("server.port", i64::from(defaults.server.port))?
            .set_default("database.url", defaults.database.url)?
            .set_default("database.max_connections", i64::from(defaults.database.max_connections))?
            .set_default(
                "database.acquire_timeout_secs",
                defaults.database.acquire_timeout_secs as i64,
            )?
            .set_default(
                "database.slow_statement_secs",
                defaults.database.slow_statement_secs as i64,
            )?
            .set_default("ingest.data_dir", defaults.ingest.data_dir.to_string_lossy().into_owned())?
            .add_source(file)
            .add_source(
                Environment::with_prefix("LEDGER")
                    .prefix_separator("_")
                    .separator("__")
                    .try_parsing(true),
            )
            .set_override_option("database.url", std::env::var("DATABASE_URL").ok())?
            .build()?;

        let app: AppConfig = config.try_deserialize()?;
        app.validate()?;
        Ok(app)
    }

    pub fn validate(&self) -> Result<()> {
        if self.database.max_connections == 0 {
            return Err(LedgerError::InvalidConfig {
                field: "database.max_connections".into(),
                reason: "必须大于 0".into(),
            });
        }
        if let Some(name) = &self.database.search_path {
            if !is_plain_identifier(name) {
                return Err(LedgerError::InvalidConfig {
                    field: "database.search_path".into(),
                    reason: format!("'{}' 不是合法的标识符", name),
                });
            }
        }
        Ok(())
    }

    pub fn listen_addr(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}

/// [A-Za-z_][A-Za-z0-9_]*，长度不超过 63
pub fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let Some(first) = chars.next() else {
        return false;
    };
    name.len() <= 63
        && (first.is_ascii_alphabetic() || first == '_')
        && chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}
