use bigdecimal::BigDecimal;
use chrono::NaiveDate;

use crate::models::{Client, ClientTotal, Invoice, InvoiceLineItem, ServiceTotal, TableCounts};

/// CLI 默认最多展示的行数
pub const DEFAULT_MAX_ROWS: usize = 50;

/// 可渲染为表格的一行
pub trait TableRow {
    fn columns() -> &'static [&'static str];
    fn cells(&self) -> Vec<Option<String>>;
}

fn text(v: &Option<String>) -> Option<String> {
    v.clone()
}

fn date(v: &Option<NaiveDate>) -> Option<String> {
    v.map(|d| d.to_string())
}

fn decimal(v: &Option<BigDecimal>) -> Option<String> {
    v.as_ref().map(|d| d.to_string())
}

impl TableRow for Client {
    fn columns() -> &'static [&'static str] {
        &["client_id", "client_name", "industry", "country"]
    }

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.client_id.clone()),
            Some(self.client_name.clone()),
            text(&self.industry),
            text(&self.country),
        ]
    }
}

impl TableRow for Invoice {
    fn columns() -> &'static [&'static str] {
        &[
            "invoice_id",
            "client_id",
            "invoice_date",
            "due_date",
            "status",
            "currency",
            "fx_rate_to_usd",
        ]
    }

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.invoice_id.clone()),
            Some(self.client_id.clone()),
            date(&self.invoice_date),
            date(&self.due_date),
            text(&self.status),
            text(&self.currency),
            decimal(&self.fx_rate_to_usd),
        ]
    }
}

impl TableRow for InvoiceLineItem {
    fn columns() -> &'static [&'static str] {
        &[
            "line_id",
            "invoice_id",
            "service_name",
            "quantity",
            "unit_price",
            "tax_rate",
            "line_total_including_tax",
        ]
    }

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.line_id.clone()),
            Some(self.invoice_id.clone()),
            text(&self.service_name),
            decimal(&self.quantity),
            decimal(&self.unit_price),
            decimal(&self.tax_rate),
            decimal(&self.line_total_including_tax()),
        ]
    }
}

impl TableRow for ServiceTotal {
    fn columns() -> &'static [&'static str] {
        &["service_name", "line_count", "priced_lines", "total_including_tax"]
    }

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            text(&self.service_name),
            Some(self.line_count.to_string()),
            Some(self.priced_lines.to_string()),
            decimal(&self.total_including_tax),
        ]
    }
}

impl TableRow for ClientTotal {
    fn columns() -> &'static [&'static str] {
        &["client_id", "client_name", "line_count", "priced_lines", "total_including_tax"]
    }

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.client_id.clone()),
            Some(self.client_name.clone()),
            Some(self.line_count.to_string()),
            Some(self.priced_lines.to_string()),
            decimal(&self.total_including_tax),
        ]
    }
}

impl TableRow for TableCounts {
    fn columns() -> &'static [&'static str] {
        &["clients", "invoices", "line_items"]
    }

    fn cells(&self) -> Vec<Option<String>> {
        vec![
            Some(self.clients.to_string()),
            Some(self.invoices.to_string()),
            Some(self.line_items.to_string()),
        ]
    }
}

fn escape(cell: &Option<String>) -> String {
    cell.as_deref()
        .unwrap_or_default()
        .replace('|', "\\|")
        .replace('\n', " ")
}

/// 渲染为 markdown 表格，超过 `max_rows` 时截断并注明
pub fn render_markdown<T: TableRow>(rows: &[T], max_rows: usize) -> String {
    if rows.is_empty() {
        return "_No rows returned._".to_string();
    }

    let columns = T::columns();
    let mut lines = Vec::with_capacity(rows.len().min(max_rows) + 2);
    lines.push(format!("| {} |", columns.join(" | ")));
    lines.push(format!("| {} |", vec!["---"; columns.len()].join(" | ")));

    for row in rows.iter().take(max_rows) {
        let cells: Vec<String> = row.cells().iter().map(escape).collect();
        lines.push(format!("| {} |", cells.join(" | ")));
    }

    let mut out = lines.join("\n");
    if rows.len() > max_rows {
        out.push_str(&format!(
            "\n\n_Showing first {} of {} rows._",
            max_rows,
            rows.len()
        ));
    }
    out
}
