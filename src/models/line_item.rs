use bigdecimal::{BigDecimal, One};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 发票明细 (invoice_line_items)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct InvoiceLineItem {
    pub line_id: String,
    pub invoice_id: String,
    pub service_name: Option<String>,
    pub quantity: Option<BigDecimal>,   // NUMERIC(18,4)
    pub unit_price: Option<BigDecimal>, // NUMERIC(18,4)
    pub tax_rate: Option<BigDecimal>,   // NUMERIC(18,4)
}

impl InvoiceLineItem {
    pub fn new(line_id: impl Into<String>, invoice_id: impl Into<String>) -> Self {
        Self {
            line_id: line_id.into(),
            invoice_id: invoice_id.into(),
            service_name: None,
            quantity: None,
            unit_price: None,
            tax_rate: None,
        }
    }

    pub fn with_service(mut self, service_name: impl Into<String>) -> Self {
        self.service_name = Some(service_name.into());
        self
    }

    pub fn with_pricing(
        mut self,
        quantity: BigDecimal,
        unit_price: BigDecimal,
        tax_rate: BigDecimal,
    ) -> Self {
        self.quantity = Some(quantity);
        self.unit_price = Some(unit_price);
        self.tax_rate = Some(tax_rate);
        self
    }

    /// 含税行金额 = quantity * unit_price * (1 + tax_rate)
    ///
    /// 任一因子未知时返回 None，而不是按 0 计算。
    pub fn line_total_including_tax(&self) -> Option<BigDecimal> {
        let quantity = self.quantity.as_ref()?;
        let unit_price = self.unit_price.as_ref()?;
        let tax_rate = self.tax_rate.as_ref()?;
        Some(quantity * unit_price * (BigDecimal::one() + tax_rate))
    }
}

/// 按服务名汇总
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ServiceTotal {
    pub service_name: Option<String>,
    pub line_count: i64,
    /// 数量、单价、税率都已知的行数
    pub priced_lines: i64,
    /// 仅对 priced_lines 求和，没有可计价行时为 None
    pub total_including_tax: Option<BigDecimal>,
}

impl ServiceTotal {
    pub fn unpriced_lines(&self) -> i64 {
        self.line_count - self.priced_lines
    }
}

/// 三张表的行数
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, FromRow, Serialize, Deserialize)]
pub struct TableCounts {
    pub clients: i64,
    pub invoices: i64,
    pub line_items: i64,
}
