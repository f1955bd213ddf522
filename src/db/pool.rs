use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, Connection, Executor, PgConnection, PgPool};
use std::str::FromStr;
use std::time::Duration;

use crate::config::{is_plain_identifier, DatabaseConfig};
use crate::error::{LedgerError, Result};

/// 创建数据库连接池
///
/// 配置了 `search_path` 时先确保该 schema 存在，再让每个新连接固定到它。
pub async fn create_pool(config: &DatabaseConfig) -> Result<PgPool> {
    let mut connect_options = PgConnectOptions::from_str(&config.url)?;

    connect_options = connect_options.log_slow_statements(
        tracing::log::LevelFilter::Warn,
        Duration::from_secs(config.slow_statement_secs),
    );

    let mut pool_options = PgPoolOptions::new()
        .max_connections(config.max_connections)
        .acquire_timeout(Duration::from_secs(config.acquire_timeout_secs));

    if let Some(schema) = &config.search_path {
        if !is_plain_identifier(schema) {
            return Err(LedgerError::InvalidConfig {
                field: "database.search_path".into(),
                reason: format!("'{}' 不是合法的标识符", schema),
            });
        }

        let mut conn = PgConnection::connect_with(&connect_options).await?;
        conn.execute(format!("CREATE SCHEMA IF NOT EXISTS {}", schema).as_str())
            .await?;
        conn.close().await?;
        tracing::debug!("schema {} ready", schema);

        let set_path = format!("SET search_path TO {}", schema);
        pool_options = pool_options.after_connect(move |conn, _meta| {
            let set_path = set_path.clone();
            Box::pin(async move {
                conn.execute(set_path.as_str()).await?;
                Ok(())
            })
        });
    }

    let pool = pool_options.connect_with(connect_options).await?;
    Ok(pool)
}

/// 连通性检查
pub async fn ping(pool: &PgPool) -> Result<()> {
    sqlx::query("SELECT 1").execute(pool).await?;
    Ok(())
}
