use chrono::NaiveDate;
use sqlx::{PgConnection, PgExecutor, PgPool, Postgres, QueryBuilder};

use crate::error::{LedgerError, Result};
use crate::models::{
    Client, ClientTotal, DateRange, Invoice, InvoiceLineItem, ServiceTotal, TableCounts,
};

/// 批量插入每批行数 (7 列 * 1000 行，远低于 Postgres 绑定参数上限)
pub const INSERT_CHUNK_SIZE: usize = 1000;

// ============================================================================
// 写入
// ============================================================================

/// 插入单个客户
pub async fn insert_client<'e, E: PgExecutor<'e>>(executor: E, client: &Client) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO clients (client_id, client_name, industry, country)
        VALUES ($1, $2, $3, $4)
        "#,
    )
    .bind(&client.client_id)
    .bind(&client.client_name)
    .bind(&client.industry)
    .bind(&client.country)
    .execute(executor)
    .await?;
    Ok(())
}

/// 插入单张发票，client_id 必须已存在
pub async fn insert_invoice<'e, E: PgExecutor<'e>>(executor: E, invoice: &Invoice) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO invoices (
            invoice_id, client_id, invoice_date, due_date,
            status, currency, fx_rate_to_usd
        )
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(&invoice.invoice_id)
    .bind(&invoice.client_id)
    .bind(invoice.invoice_date)
    .bind(invoice.due_date)
    .bind(&invoice.status)
    .bind(&invoice.currency)
    .bind(&invoice.fx_rate_to_usd)
    .execute(executor)
    .await?;
    Ok(())
}

/// 插入单条明细，invoice_id 必须已存在
pub async fn insert_line_item<'e, E: PgExecutor<'e>>(
    executor: E,
    item: &InvoiceLineItem,
) -> Result<()> {
    sqlx::query(
        r#"
        INSERT INTO invoice_line_items (
            line_id, invoice_id, service_name, quantity, unit_price, tax_rate
        )
        VALUES ($1, $2, $3, $4, $5, $6)
        "#,
    )
    .bind(&item.line_id)
    .bind(&item.invoice_id)
    .bind(&item.service_name)
    .bind(&item.quantity)
    .bind(&item.unit_price)
    .bind(&item.tax_rate)
    .execute(executor)
    .await?;
    Ok(())
}

/// 批量插入客户，返回插入行数
pub async fn insert_clients(conn: &mut PgConnection, clients: &[Client]) -> Result<u64> {
    let mut inserted = 0;
    for chunk in clients.chunks(INSERT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> =
            QueryBuilder::new("INSERT INTO clients (client_id, client_name, industry, country) ");

        query_builder.push_values(chunk, |mut b, client| {
            b.push_bind(&client.client_id)
                .push_bind(&client.client_name)
                .push_bind(&client.industry)
                .push_bind(&client.country);
        });

        inserted += query_builder.build().execute(&mut *conn).await?.rows_affected();
    }
    tracing::debug!("clients 批量插入 {} 行", inserted);
    Ok(inserted)
}

/// 批量插入发票，返回插入行数
pub async fn insert_invoices(conn: &mut PgConnection, invoices: &[Invoice]) -> Result<u64> {
    let mut inserted = 0;
    for chunk in invoices.chunks(INSERT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO invoices (
                invoice_id, client_id, invoice_date, due_date,
                status, currency, fx_rate_to_usd
            ) ",
        );

        query_builder.push_values(chunk, |mut b, invoice| {
            b.push_bind(&invoice.invoice_id)
                .push_bind(&invoice.client_id)
                .push_bind(invoice.invoice_date)
                .push_bind(invoice.due_date)
                .push_bind(&invoice.status)
                .push_bind(&invoice.currency)
                .push_bind(&invoice.fx_rate_to_usd);
        });

        inserted += query_builder.build().execute(&mut *conn).await?.rows_affected();
    }
    tracing::debug!("invoices 批量插入 {} 行", inserted);
    Ok(inserted)
}

/// 批量插入明细，返回插入行数
pub async fn insert_line_items(conn: &mut PgConnection, items: &[InvoiceLineItem]) -> Result<u64> {
    let mut inserted = 0;
    for chunk in items.chunks(INSERT_CHUNK_SIZE) {
        let mut query_builder: QueryBuilder<Postgres> = QueryBuilder::new(
            "INSERT INTO invoice_line_items (
                line_id, invoice_id, service_name, quantity, unit_price, tax_rate
            ) ",
        );

        query_builder.push_values(chunk, |mut b, item| {
            b.push_bind(&item.line_id)
                .push_bind(&item.invoice_id)
                .push_bind(&item.service_name)
                .push_bind(&item.quantity)
                .push_bind(&item.unit_price)
                .push_bind(&item.tax_rate);
        });

        inserted += query_builder.build().execute(&mut *conn).await?.rows_affected();
    }
    tracing::debug!("invoice_line_items 批量插入 {} 行", inserted);
    Ok(inserted)
}

// ============================================================================
// 查询
// ============================================================================

/// 全部客户 (按名称排序)
pub async fn list_clients(pool: &PgPool) -> Result<Vec<Client>> {
    let clients = sqlx::query_as::<_, Client>(
        r#"
        SELECT client_id, client_name, industry, country
        FROM clients
        ORDER BY client_name, client_id
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

pub async fn get_client(pool: &PgPool, client_id: &str) -> Result<Option<Client>> {
    let client = sqlx::query_as::<_, Client>(
        r#"
        SELECT client_id, client_name, industry, country
        FROM clients
        WHERE client_id = $1
        "#,
    )
    .bind(client_id)
    .fetch_optional(pool)
    .await?;
    Ok(client)
}

pub async fn get_invoice(pool: &PgPool, invoice_id: &str) -> Result<Option<Invoice>> {
    let invoice = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT invoice_id, client_id, invoice_date, due_date,
               status, currency, fx_rate_to_usd
        FROM invoices
        WHERE invoice_id = $1
        "#,
    )
    .bind(invoice_id)
    .fetch_optional(pool)
    .await?;
    Ok(invoice)
}

/// 按国家筛选客户 (idx_clients_country)
pub async fn clients_by_country(pool: &PgPool, country: &str) -> Result<Vec<Client>> {
    let clients = sqlx::query_as::<_, Client>(
        r#"
        SELECT client_id, client_name, industry, country
        FROM clients
        WHERE country = $1
        ORDER BY client_name, client_id
        "#,
    )
    .bind(country)
    .fetch_all(pool)
    .await?;
    Ok(clients)
}

/// 某客户在日期区间内的发票 (idx_invoices_client_date)
///
/// 区间两端闭合；指定了任一端时，invoice_date 为空的发票不会返回。
pub async fn invoices_for_client(
    pool: &PgPool,
    client_id: &str,
    range: DateRange,
) -> Result<Vec<Invoice>> {
    let invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT invoice_id, client_id, invoice_date, due_date,
               status, currency, fx_rate_to_usd
        FROM invoices
        WHERE client_id = $1
          AND ($2::date IS NULL OR invoice_date >= $2)
          AND ($3::date IS NULL OR invoice_date <= $3)
        ORDER BY invoice_date, invoice_id
        "#,
    )
    .bind(client_id)
    .bind(range.from)
    .bind(range.to)
    .fetch_all(pool)
    .await?;
    Ok(invoices)
}

/// 某年某月开票的发票
///
/// 用 [月初, 下月初) 区间过滤 invoice_date，月份须在 1..=12。
pub async fn invoices_for_month(pool: &PgPool, year: i32, month: u32) -> Result<Vec<Invoice>> {
    if !(1..=12).contains(&month) {
        return Err(LedgerError::InvalidValue {
            message: format!("month {} 不在 1..=12", month),
        });
    }

    let invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT invoice_id, client_id, invoice_date, due_date,
               status, currency, fx_rate_to_usd
        FROM invoices
        WHERE invoice_date >= make_date($1, $2, 1)
          AND invoice_date < (make_date($1, $2, 1) + INTERVAL '1 month')::date
        ORDER BY invoice_date, invoice_id
        "#,
    )
    .bind(year)
    .bind(month as i32)
    .fetch_all(pool)
    .await?;
    Ok(invoices)
}

/// 按状态精确匹配 (status 为自由文本，大小写敏感)
pub async fn invoices_by_status(pool: &PgPool, status: &str) -> Result<Vec<Invoice>> {
    let invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT invoice_id, client_id, invoice_date, due_date,
               status, currency, fx_rate_to_usd
        FROM invoices
        WHERE status = $1
        ORDER BY due_date, invoice_id
        "#,
    )
    .bind(status)
    .fetch_all(pool)
    .await?;
    Ok(invoices)
}

/// 逾期发票
///
/// 状态记为 overdue 的发票，以及 due_date 早于 as_of 且状态不是 paid 的发票。
/// 状态比较不区分大小写，状态为空视为未付。
pub async fn overdue_invoices(pool: &PgPool, as_of: NaiveDate) -> Result<Vec<Invoice>> {
    let invoices = sqlx::query_as::<_, Invoice>(
        r#"
        SELECT invoice_id, client_id, invoice_date, due_date,
               status, currency, fx_rate_to_usd
        FROM invoices
        WHERE LOWER(status) = 'overdue'
           OR (due_date < $1 AND COALESCE(LOWER(status), '') <> 'paid')
        ORDER BY due_date, invoice_id
        "#,
    )
    .bind(as_of)
    .fetch_all(pool)
    .await?;
    Ok(invoices)
}

/// 某发票的全部明细 (idx_line_items_invoice)
pub async fn line_items_for_invoice(pool: &PgPool, invoice_id: &str) -> Result<Vec<InvoiceLineItem>> {
    let items = sqlx::query_as::<_, InvoiceLineItem>(
        r#"
        SELECT line_id, invoice_id, service_name, quantity, unit_price, tax_rate
        FROM invoice_line_items
        WHERE invoice_id = $1
        ORDER BY line_id
        "#,
    )
    .bind(invoice_id)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// 某服务的全部明细 (idx_line_items_service)
pub async fn line_items_by_service(
    pool: &PgPool,
    service_name: &str,
) -> Result<Vec<InvoiceLineItem>> {
    let items = sqlx::query_as::<_, InvoiceLineItem>(
        r#"
        SELECT line_id, invoice_id, service_name, quantity, unit_price, tax_rate
        FROM invoice_line_items
        WHERE service_name = $1
        ORDER BY invoice_id, line_id
        "#,
    )
    .bind(service_name)
    .fetch_all(pool)
    .await?;
    Ok(items)
}

/// 按服务汇总含税金额
///
/// 只有数量、单价、税率都已知的行参与求和；未知值不按 0 处理。
pub async fn service_totals(pool: &PgPool) -> Result<Vec<ServiceTotal>> {
    let totals = sqlx::query_as::<_, ServiceTotal>(
        r#"
        SELECT service_name,
               COUNT(*) AS line_count,
               COUNT(*) FILTER (
                   WHERE quantity IS NOT NULL
                     AND unit_price IS NOT NULL
                     AND tax_rate IS NOT NULL
               ) AS priced_lines,
               SUM((quantity * unit_price) * (1 + tax_rate)) AS total_including_tax
        FROM invoice_line_items
        GROUP BY service_name
        ORDER BY total_including_tax DESC NULLS LAST, service_name
        "#,
    )
    .fetch_all(pool)
    .await?;
    Ok(totals)
}

/// 某年度按客户汇总含税开票金额，金额降序
///
/// 只统计该年开票的发票下的明细；未知的数量、单价、税率不按 0 处理，
/// 没有可计价明细的客户金额为 None，排在最后。
pub async fn client_totals_for_year(pool: &PgPool, year: i32) -> Result<Vec<ClientTotal>> {
    let totals = sqlx::query_as::<_, ClientTotal>(
        r#"
        SELECT c.client_id,
               c.client_name,
               COUNT(li.line_id) AS line_count,
               COUNT(li.line_id) FILTER (
                   WHERE li.quantity IS NOT NULL
                     AND li.unit_price IS NOT NULL
                     AND li.tax_rate IS NOT NULL
               ) AS priced_lines,
               SUM((li.quantity * li.unit_price) * (1 + li.tax_rate)) AS total_including_tax
        FROM clients c
        JOIN invoices i ON i.client_id = c.client_id
        JOIN invoice_line_items li ON li.invoice_id = i.invoice_id
        WHERE i.invoice_date >= make_date($1, 1, 1)
          AND i.invoice_date < make_date($1 + 1, 1, 1)
        GROUP BY c.client_id, c.client_name
        ORDER BY total_including_tax DESC NULLS LAST, c.client_id
        "#,
    )
    .bind(year)
    .fetch_all(pool)
    .await?;
    Ok(totals)
}

/// 某年度含税开票金额最高的客户；没有任何可计价明细时为 None
pub async fn top_client_for_year(pool: &PgPool, year: i32) -> Result<Option<ClientTotal>> {
    let totals = client_totals_for_year(pool, year).await?;
    Ok(totals
        .into_iter()
        .find(|t| t.total_including_tax.is_some()))
}

/// 三张表的行数
pub async fn table_counts(pool: &PgPool) -> Result<TableCounts> {
    let counts = sqlx::query_as::<_, TableCounts>(
        r#"
        SELECT (SELECT COUNT(*) FROM clients) AS clients,
               (SELECT COUNT(*) FROM invoices) AS invoices,
               (SELECT COUNT(*) FROM invoice_line_items) AS line_items
        "#,
    )
    .fetch_one(pool)
    .await?;
    Ok(counts)
}
