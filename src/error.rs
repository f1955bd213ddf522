use thiserror::Error;

use crate::models::NumericError;

pub type Result<T> = std::result::Result<T, LedgerError>;

/// 统一错误类型
///
/// 数据库错误按 Postgres SQLSTATE 归类：主键重复、外键冲突、非空约束、
/// 类型/精度转换失败。其余数据库错误原样保留。
#[derive(Debug, Error)]
pub enum LedgerError {
    #[error("配置错误: {0}")]
    Config(#[from] config::ConfigError),

    #[error("无效配置 {field}: {reason}")]
    InvalidConfig { field: String, reason: String },

    #[error("主键重复 ({constraint}): {message}")]
    DuplicateKey { constraint: String, message: String },

    #[error("外键约束冲突 ({constraint}): {message}")]
    ForeignKeyViolation { constraint: String, message: String },

    #[error("必填字段为空: {message}")]
    MissingValue { message: String },

    #[error("字段值无效: {message}")]
    InvalidValue { message: String },

    #[error("数据库错误: {0}")]
    Database(sqlx::Error),

    #[error("未找到: {0}")]
    NotFound(String),

    #[error("{file} 第 {line} 行: {reason}")]
    Ingest {
        file: String,
        line: u64,
        reason: String,
    },

    #[error("{field} = {value}: {source}")]
    InvalidNumeric {
        field: &'static str,
        value: String,
        source: NumericError,
    },

    #[error("CSV 错误: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO 错误: {0}")]
    Io(#[from] std::io::Error),
}

impl LedgerError {
    /// 是否为存储层约束冲突 (主键/外键/非空)
    pub fn is_constraint_violation(&self) -> bool {
        matches!(
            self,
            Self::DuplicateKey { .. } | Self::ForeignKeyViolation { .. } | Self::MissingValue { .. }
        )
    }

    /// 是否为调用方输入错误 (HTTP 层映射为 400)
    pub fn is_bad_input(&self) -> bool {
        self.is_constraint_violation()
            || matches!(
                self,
                Self::InvalidValue { .. } | Self::InvalidNumeric { .. } | Self::Ingest { .. }
            )
    }
}

impl From<sqlx::Error> for LedgerError {
    fn from(err: sqlx::Error) -> Self {
        let sqlx::Error::Database(db_err) = &err else {
            return Self::Database(err);
        };

        let code = db_err.code().map(|c| c.into_owned()).unwrap_or_default();
        let constraint = db_err.constraint().unwrap_or("unknown").to_string();
        let message = db_err.message().to_string();

        match classify_sqlstate(&code) {
            SqlStateClass::UniqueViolation => Self::DuplicateKey { constraint, message },
            SqlStateClass::ForeignKeyViolation => Self::ForeignKeyViolation { constraint, message },
            SqlStateClass::NotNullViolation => Self::MissingValue { message },
            SqlStateClass::DataException => Self::InvalidValue { message },
            SqlStateClass::Other => Self::Database(err),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SqlStateClass {
    UniqueViolation,
    ForeignKeyViolation,
    NotNullViolation,
    DataException,
    Other,
}

/// 按 SQLSTATE 归类 (22xxx 为 data exception 类)
pub(crate) fn classify_sqlstate(code: &str) -> SqlStateClass {
    match code {
        "23505" => SqlStateClass::UniqueViolation,
        "23503" => SqlStateClass::ForeignKeyViolation,
        "23502" => SqlStateClass::NotNullViolation,
        c if c.starts_with("22") => SqlStateClass::DataException,
        _ => SqlStateClass::Other,
    }
}
