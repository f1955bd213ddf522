use bigdecimal::BigDecimal;
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// 客户 (clients)
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct Client {
    pub client_id: String,
    pub client_name: String,
    pub industry: Option<String>,
    pub country: Option<String>,
}

impl Client {
    pub fn new(client_id: impl Into<String>, client_name: impl Into<String>) -> Self {
        Self {
            client_id: client_id.into(),
            client_name: client_name.into(),
            industry: None,
            country: None,
        }
    }

    pub fn with_industry(mut self, industry: impl Into<String>) -> Self {
        self.industry = Some(industry.into());
        self
    }

    pub fn with_country(mut self, country: impl Into<String>) -> Self {
        self.country = Some(country.into());
        self
    }
}

/// 某年度按客户汇总的含税开票金额
#[derive(Debug, Clone, PartialEq, FromRow, Serialize, Deserialize)]
pub struct ClientTotal {
    pub client_id: String,
    pub client_name: String,
    pub line_count: i64,
    /// 数量、单价、税率都已知的行数
    pub priced_lines: i64,
    /// 仅对 priced_lines 求和，没有可计价行时为 None
    pub total_including_tax: Option<BigDecimal>,
}

impl ClientTotal {
    pub fn unpriced_lines(&self) -> i64 {
        self.line_count - self.priced_lines
    }
}
