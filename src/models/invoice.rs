use bigdecimal::BigDecimal;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 发票主表 (invoices)
///
/// `status` 是不受约束的自由文本，存储层不做枚举校验。
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Invoice {
    pub invoice_id: String,
    pub client_id: String,
    pub invoice_date: Option<NaiveDate>,
    pub due_date: Option<NaiveDate>,
    pub status: Option<String>,
    pub currency: Option<String>,
    pub fx_rate_to_usd: Option<BigDecimal>, // NUMERIC(18,6)
}

impl Invoice {
    pub fn new(invoice_id: impl Into<String>, client_id: impl Into<String>) -> Self {
        Self {
            invoice_id: invoice_id.into(),
            client_id: client_id.into(),
            invoice_date: None,
            due_date: None,
            status: None,
            currency: None,
            fx_rate_to_usd: None,
        }
    }

    pub fn with_dates(mut self, invoice_date: NaiveDate, due_date: NaiveDate) -> Self {
        self.invoice_date = Some(invoice_date);
        self.due_date = Some(due_date);
        self
    }

    pub fn with_status(mut self, status: impl Into<String>) -> Self {
        self.status = Some(status.into());
        self
    }

    pub fn with_currency(mut self, currency: impl Into<String>) -> Self {
        self.currency = Some(currency.into());
        self
    }

    pub fn with_fx_rate(mut self, rate: BigDecimal) -> Self {
        self.fx_rate_to_usd = Some(rate);
        self
    }
}

/// 开票日期区间，两端均为闭区间，任一端可省略
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub from: Option<NaiveDate>,
    pub to: Option<NaiveDate>,
}

impl DateRange {
    pub fn between(from: NaiveDate, to: NaiveDate) -> Self {
        Self {
            from: Some(from),
            to: Some(to),
        }
    }

    pub fn contains(&self, date: NaiveDate) -> bool {
        self.from.map_or(true, |from| date >= from) && self.to.map_or(true, |to| date <= to)
    }
}
