#![allow(dead_code)]

use invoice_ledger::config::DatabaseConfig;
use invoice_ledger::create_pool;
use sqlx::PgPool;
use std::sync::atomic::{AtomicUsize, Ordering};

pub const TEST_DATABASE_URL: &str = "LEDGER_TEST_DATABASE_URL";

static NEXT_SCHEMA: AtomicUsize = AtomicUsize::new(0);

/// 每个测试独占一个 Postgres schema，互不干扰
pub struct TestDb {
    pub pool: PgPool,
    pub schema: String,
}

impl TestDb {
    /// 需要 LEDGER_TEST_DATABASE_URL；这些测试标记为 #[ignore]，
    /// 用 `cargo test -- --ignored` 运行
    pub async fn connect() -> Self {
        let url = std::env::var(TEST_DATABASE_URL)
            .unwrap_or_else(|_| panic!("{} must point at a Postgres database", TEST_DATABASE_URL));

        let schema = format!(
            "ledger_test_{}_{}",
            std::process::id(),
            NEXT_SCHEMA.fetch_add(1, Ordering::SeqCst)
        );
        let config = DatabaseConfig {
            url,
            max_connections: 4,
            acquire_timeout_secs: 10,
            slow_statement_secs: 5,
            search_path: Some(schema.clone()),
        };
        let pool = create_pool(&config).await.expect("connect test database");
        Self { pool, schema }
    }

    /// 删除本测试的 schema
    pub async fn cleanup(self) {
        sqlx::query(&format!("DROP SCHEMA IF EXISTS {} CASCADE", self.schema))
            .execute(&self.pool)
            .await
            .expect("drop test schema");
        self.pool.close().await;
    }
}
