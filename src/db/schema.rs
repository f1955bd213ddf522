//! 表结构定义与初始化
//!
//! 初始化流程固定为: 按依赖逆序删表 -> 按依赖顺序建表 -> 建索引。
//! 整个流程在一个事务里执行，重复执行得到同样的空库。

use serde::Serialize;
use sqlx::{PgConnection, PgPool};

use crate::error::Result;

pub const CLIENTS_TABLE: &str = "clients";
pub const INVOICES_TABLE: &str = "invoices";
pub const LINE_ITEMS_TABLE: &str = "invoice_line_items";

/// 按建表顺序排列
pub const TABLES: [&str; 3] = [CLIENTS_TABLE, INVOICES_TABLE, LINE_ITEMS_TABLE];

pub const INDEXES: [&str; 4] = [
    "idx_invoices_client_date",
    "idx_clients_country",
    "idx_line_items_invoice",
    "idx_line_items_service",
];

/// 外键依赖逆序: 明细 -> 发票 -> 客户
pub const DROP_STATEMENTS: [&str; 3] = [
    "DROP TABLE IF EXISTS invoice_line_items",
    "DROP TABLE IF EXISTS invoices",
    "DROP TABLE IF EXISTS clients",
];

pub const CREATE_TABLE_STATEMENTS: [&str; 3] = [
    r#"CREATE TABLE clients (
    client_id   VARCHAR(64)  NOT NULL PRIMARY KEY,
    client_name VARCHAR(255) NOT NULL,
    industry    VARCHAR(128),
    country     VARCHAR(128)
)"#,
    r#"CREATE TABLE invoices (
    invoice_id     VARCHAR(64) NOT NULL PRIMARY KEY,
    client_id      VARCHAR(64) NOT NULL REFERENCES clients (client_id),
    invoice_date   DATE,
    due_date       DATE,
    status         VARCHAR(32),
    currency       VARCHAR(8),
    fx_rate_to_usd NUMERIC(18, 6)
)"#,
    r#"CREATE TABLE invoice_line_items (
    line_id      VARCHAR(64) NOT NULL PRIMARY KEY,
    invoice_id   VARCHAR(64) NOT NULL REFERENCES invoices (invoice_id),
    service_name VARCHAR(255),
    quantity     NUMERIC(18, 4),
    unit_price   NUMERIC(18, 4),
    tax_rate     NUMERIC(18, 4)
)"#,
];

/// 客户+日期 / 国家 / 发票 / 服务名 四种访问路径
pub const CREATE_INDEX_STATEMENTS: [&str; 4] = [
    "CREATE INDEX idx_invoices_client_date ON invoices (client_id, invoice_date)",
    "CREATE INDEX idx_clients_country ON clients (country)",
    "CREATE INDEX idx_line_items_invoice ON invoice_line_items (invoice_id)",
    "CREATE INDEX idx_line_items_service ON invoice_line_items (service_name)",
];

/// 完整初始化语句，按执行顺序
pub fn bootstrap_statements() -> Vec<&'static str> {
    DROP_STATEMENTS
        .iter()
        .chain(CREATE_TABLE_STATEMENTS.iter())
        .chain(CREATE_INDEX_STATEMENTS.iter())
        .copied()
        .collect()
}

/// 可直接交给 psql 执行的初始化脚本
pub fn render_script() -> String {
    let mut script = String::new();
    for stmt in bootstrap_statements() {
        script.push_str(stmt);
        script.push_str(";\n");
    }
    script
}

/// 删表重建，单事务执行
pub async fn apply_schema(pool: &PgPool) -> Result<()> {
    let start = std::time::Instant::now();
    let mut tx = pool.begin().await?;

    apply_schema_in(&mut tx).await?;

    tx.commit().await?;
    tracing::info!(
        "Schema applied: {} tables, {} indexes, 耗时: {:?}",
        TABLES.len(),
        INDEXES.len(),
        start.elapsed()
    );
    Ok(())
}

/// 在调用方的事务内删表重建，提交与否由调用方决定
pub async fn apply_schema_in(conn: &mut PgConnection) -> Result<()> {
    for stmt in bootstrap_statements() {
        sqlx::query(stmt).execute(&mut *conn).await?;
    }
    Ok(())
}

/// 当前 schema 下实际存在的表和索引
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct SchemaReport {
    pub tables: Vec<String>,
    pub indexes: Vec<String>,
}

impl SchemaReport {
    pub fn missing_tables(&self) -> Vec<&'static str> {
        TABLES
            .iter()
            .filter(|t| !self.tables.iter().any(|x| x == *t))
            .copied()
            .collect()
    }

    pub fn missing_indexes(&self) -> Vec<&'static str> {
        INDEXES
            .iter()
            .filter(|i| !self.indexes.iter().any(|x| x == *i))
            .copied()
            .collect()
    }

    pub fn is_complete(&self) -> bool {
        self.missing_tables().is_empty() && self.missing_indexes().is_empty()
    }
}

/// 查询当前 schema 的表和二级索引 (不含主键索引)
pub async fn describe_schema(pool: &PgPool) -> Result<SchemaReport> {
    let table_names: Vec<String> = TABLES.iter().map(|t| t.to_string()).collect();

    let tables: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT table_name::text
        FROM information_schema.tables
        WHERE table_schema = current_schema()
          AND table_type = 'BASE TABLE'
          AND table_name::text = ANY($1)
        ORDER BY table_name
        "#,
    )
    .bind(&table_names)
    .fetch_all(pool)
    .await?;

    let indexes: Vec<String> = sqlx::query_scalar(
        r#"
        SELECT indexname::text
        FROM pg_indexes
        WHERE schemaname = current_schema()
          AND tablename::text = ANY($1)
          AND indexname NOT LIKE '%_pkey'
        ORDER BY indexname
        "#,
    )
    .bind(&table_names)
    .fetch_all(pool)
    .await?;

    Ok(SchemaReport { tables, indexes })
}
