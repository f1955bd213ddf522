use bigdecimal::BigDecimal;
use thiserror::Error;

/// NUMERIC(precision, scale) 列的精度规则
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NumericSpec {
    pub precision: u32,
    pub scale: u32,
}

/// invoices.fx_rate_to_usd: NUMERIC(18, 6)
pub const FX_RATE: NumericSpec = NumericSpec { precision: 18, scale: 6 };

/// invoice_line_items.quantity / unit_price / tax_rate: NUMERIC(18, 4)
pub const AMOUNT: NumericSpec = NumericSpec { precision: 18, scale: 4 };

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum NumericError {
    #[error("小数位 {found} 超过列允许的 {scale} 位")]
    TooManyFractionDigits { scale: u32, found: i64 },

    #[error("整数位 {found} 超过列允许的 {max} 位")]
    TooManyIntegerDigits { max: u32, found: i64 },
}

impl NumericSpec {
    /// 列允许的整数位数
    pub fn integer_digits(&self) -> u32 {
        self.precision - self.scale
    }

    /// 校验数值能否无损存入该列，并补齐到列的 scale
    ///
    /// 不做四舍五入：多出的小数位直接报错。位数按 i64 比较，
    /// 超大指数 (如 1e-4294967297) 在补齐 scale 之前就被拒绝。
    pub fn fit(&self, value: &BigDecimal) -> Result<BigDecimal, NumericError> {
        let (integer_digits, fraction_digits) = significant_digits(value);

        if fraction_digits > i64::from(self.scale) {
            return Err(NumericError::TooManyFractionDigits {
                scale: self.scale,
                found: fraction_digits,
            });
        }
        if integer_digits > i64::from(self.integer_digits()) {
            return Err(NumericError::TooManyIntegerDigits {
                max: self.integer_digits(),
                found: integer_digits,
            });
        }

        Ok(value.with_scale(i64::from(self.scale)))
    }
}

/// 去掉尾随零后的 (整数位数, 小数位数)
fn significant_digits(value: &BigDecimal) -> (i64, i64) {
    let (digits, mut exponent) = value.as_bigint_and_exponent();
    let digits = digits.to_string();
    let mut digits = digits.trim_start_matches('-');
    if digits.bytes().all(|b| b == b'0') {
        return (0, 0);
    }

    while exponent > 0 && digits.ends_with('0') {
        digits = &digits[..digits.len() - 1];
        exponent -= 1;
    }

    let total = digits.len() as i64;
    if exponent >= 0 {
        ((total - exponent).max(0), exponent)
    } else {
        (total.saturating_sub(exponent), 0)
    }
}
