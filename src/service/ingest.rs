use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::Serialize;
use sqlx::PgPool;
use std::collections::HashMap;
use std::io::Read;
use std::path::Path;
use std::str::FromStr;

use crate::db::{queries, schema};
use crate::error::{LedgerError, Result};
use crate::models::{Client, Invoice, InvoiceLineItem, NumericSpec, AMOUNT, FX_RATE};

pub const CLIENTS_FILE: &str = "Clients.csv";
pub const INVOICES_FILE: &str = "Invoices.csv";
pub const LINE_ITEMS_FILE: &str = "InvoiceLineItems.csv";

/// 导入结果
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct IngestSummary {
    pub clients: u64,
    pub invoices: u64,
    pub line_items: u64,
}

/// CSV 导入服务
///
/// 目录下三个文件按外键顺序 (客户 -> 发票 -> 明细) 在同一事务中写入，
/// 任一行失败整体回滚；删表重建也在这个事务里，失败时原有数据保留。
pub struct IngestService {
    pool: PgPool,
}

impl IngestService {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// 导入目录下的 CSV；`reset` 为 true 时先删表重建
    pub async fn ingest_dir(&self, dir: &Path, reset: bool) -> Result<IngestSummary> {
        let start = std::time::Instant::now();

        // 先解析全部文件，解析失败不触碰数据库
        let clients = read_clients(open(dir, CLIENTS_FILE)?, CLIENTS_FILE)?;
        let invoices = read_invoices(open(dir, INVOICES_FILE)?, INVOICES_FILE)?;
        let items = read_line_items(open(dir, LINE_ITEMS_FILE)?, LINE_ITEMS_FILE)?;

        tracing::info!(
            "[Ingest] {}: 解析完成 clients={}, invoices={}, items={}",
            dir.display(),
            clients.len(),
            invoices.len(),
            items.len()
        );

        let summary = self.insert_all(&clients, &invoices, &items, reset).await?;

        tracing::info!(
            "[Ingest] Inserted: clients={}, invoices={}, items={}, 耗时: {:?}",
            summary.clients,
            summary.invoices,
            summary.line_items,
            start.elapsed()
        );
        Ok(summary)
    }

    /// 单事务写入，外键顺序；`reset` 为 true 时先在同一事务内删表重建
    pub async fn insert_all(
        &self,
        clients: &[Client],
        invoices: &[Invoice],
        items: &[InvoiceLineItem],
        reset: bool,
    ) -> Result<IngestSummary> {
        let mut tx = self.pool.begin().await?;

        if reset {
            schema::apply_schema_in(&mut tx).await?;
            tracing::info!("[Ingest] schema reset (uncommitted)");
        }

        let summary = IngestSummary {
            clients: queries::insert_clients(&mut tx, clients).await?,
            invoices: queries::insert_invoices(&mut tx, invoices).await?,
            line_items: queries::insert_line_items(&mut tx, items).await?,
        };

        tx.commit().await?;
        Ok(summary)
    }
}

fn open(dir: &Path, name: &str) -> Result<std::fs::File> {
    let path = dir.join(name);
    std::fs::File::open(&path).map_err(|e| {
        tracing::error!("[Ingest] 无法打开 {}: {}", path.display(), e);
        LedgerError::Io(e)
    })
}

// ============================================================================
// CSV 解析
// ============================================================================

/// 列名规范化: 去空白、小写、空格换成下划线
pub fn normalize_header(raw: &str) -> String {
    raw.trim().to_lowercase().replace(' ', "_")
}

/// 规范化列名 -> 列下标
struct Columns {
    file: String,
    index: HashMap<String, usize>,
}

impl Columns {
    fn from_headers(file: &str, headers: &csv::StringRecord) -> Self {
        let index = headers
            .iter()
            .enumerate()
            .map(|(i, h)| (normalize_header(h), i))
            .collect();
        Self {
            file: file.to_string(),
            index,
        }
    }

    fn require_columns(&self, names: &[&str]) -> Result<()> {
        for name in names {
            if !self.index.contains_key(*name) {
                return Err(LedgerError::Ingest {
                    file: self.file.clone(),
                    line: 1,
                    reason: format!("缺少列 {}", name),
                });
            }
        }
        Ok(())
    }
}

/// 单行读取器，携带文件名和行号用于报错
struct Row<'a> {
    columns: &'a Columns,
    record: &'a csv::StringRecord,
    line: u64,
}

impl<'a> Row<'a> {
    /// 去空白后的单元格，空串视为缺失
    fn text(&self, name: &str) -> Option<String> {
        let i = *self.columns.index.get(name)?;
        let value = self.record.get(i)?.trim();
        (!value.is_empty()).then(|| value.to_string())
    }

    fn required(&self, name: &str) -> Result<String> {
        self.text(name).ok_or_else(|| LedgerError::Ingest {
            file: self.columns.file.clone(),
            line: self.line,
            reason: format!("{} 不能为空", name),
        })
    }

    /// 无法解析的日期记为缺失
    fn date(&self, name: &str) -> Option<NaiveDate> {
        let raw = self.text(name)?;
        let parsed = parse_date(&raw);
        if parsed.is_none() {
            tracing::warn!(
                "[Ingest] {} 第 {} 行: {} = '{}' 不是日期，按空值处理",
                self.columns.file,
                self.line,
                name,
                raw
            );
        }
        parsed
    }

    /// 无法解析的数值记为缺失；能解析但超出列精度则报错
    fn decimal(&self, name: &'static str, spec: NumericSpec) -> Result<Option<BigDecimal>> {
        let Some(raw) = self.text(name) else {
            return Ok(None);
        };
        let Ok(value) = BigDecimal::from_str(&raw) else {
            tracing::warn!(
                "[Ingest] {} 第 {} 行: {} = '{}' 不是数值，按空值处理",
                self.columns.file,
                self.line,
                name,
                raw
            );
            return Ok(None);
        };

        spec.fit(&value).map(Some).map_err(|source| LedgerError::Ingest {
            file: self.columns.file.clone(),
            line: self.line,
            reason: LedgerError::InvalidNumeric {
                field: name,
                value: raw,
                source,
            }
            .to_string(),
        })
    }
}

/// 支持 YYYY-MM-DD、YYYY/MM/DD，以及带时间部分的 YYYY-MM-DD HH:MM:SS / RFC3339
pub fn parse_date(raw: &str) -> Option<NaiveDate> {
    let raw = raw.trim();
    let date_part = raw.split(|c| c == ' ' || c == 'T').next().unwrap_or(raw);
    NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
        .or_else(|_| NaiveDate::parse_from_str(date_part, "%Y/%m/%d"))
        .ok()
}

/// 遍历数据行，行号取 CSV 中记录的起始行 (第 1 行是表头)
fn for_each_row<R: Read>(
    reader: R,
    file: &str,
    required: &[&str],
    mut f: impl FnMut(&Row<'_>) -> Result<()>,
) -> Result<()> {
    let mut reader = csv::ReaderBuilder::new().flexible(true).from_reader(reader);
    let columns = Columns::from_headers(file, reader.headers()?);
    columns.require_columns(required)?;

    let mut previous_line = 1;
    for record in reader.records() {
        let record = record?;
        // 记录起始行号；带换行的引号字段会跨多行
        let line = record.position().map_or(previous_line + 1, |p| p.line());
        previous_line = line;
        if record.iter().all(|cell| cell.trim().is_empty()) {
            continue;
        }
        let row = Row {
            columns: &columns,
            record: &record,
            line,
        };
        f(&row)?;
    }
    Ok(())
}

pub fn read_clients<R: Read>(reader: R, file: &str) -> Result<Vec<Client>> {
    let mut clients = Vec::new();
    for_each_row(reader, file, &["client_id", "client_name"], |row| {
        clients.push(Client {
            client_id: row.required("client_id")?,
            client_name: row.required("client_name")?,
            industry: row.text("industry"),
            country: row.text("country"),
        });
        Ok(())
    })?;
    Ok(clients)
}

pub fn read_invoices<R: Read>(reader: R, file: &str) -> Result<Vec<Invoice>> {
    let mut invoices = Vec::new();
    for_each_row(reader, file, &["invoice_id", "client_id"], |row| {
        invoices.push(Invoice {
            invoice_id: row.required("invoice_id")?,
            client_id: row.required("client_id")?,
            invoice_date: row.date("invoice_date"),
            due_date: row.date("due_date"),
            status: row.text("status"),
            currency: row.text("currency"),
            fx_rate_to_usd: row.decimal("fx_rate_to_usd", FX_RATE)?,
        });
        Ok(())
    })?;
    Ok(invoices)
}

pub fn read_line_items<R: Read>(reader: R, file: &str) -> Result<Vec<InvoiceLineItem>> {
    let mut items = Vec::new();
    for_each_row(reader, file, &["line_id", "invoice_id"], |row| {
        items.push(InvoiceLineItem {
            line_id: row.required("line_id")?,
            invoice_id: row.required("invoice_id")?,
            service_name: row.text("service_name"),
            quantity: row.decimal("quantity", AMOUNT)?,
            unit_price: row.decimal("unit_price", AMOUNT)?,
            tax_rate: row.decimal("tax_rate", AMOUNT)?,
        });
        Ok(())
    })?;
    Ok(items)
}
