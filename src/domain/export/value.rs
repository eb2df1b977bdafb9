// ============================================================
// SCALAR VALUES
// ============================================================
// Database cell values and their text rendering for export

use bigdecimal::BigDecimal;
use chrono::{NaiveDate, NaiveDateTime, NaiveTime};

/// A single cell returned by a table scan
#[derive(Debug, Clone, PartialEq)]
pub enum ScalarValue {
    Null,
    Bool(bool),
    Int(i64),
    UInt(u64),
    Float(f64),
    Decimal(BigDecimal),
    Text(String),
    Bytes(Vec<u8>),
    Date(NaiveDate),
    Time(NaiveTime),
    DateTime(NaiveDateTime),
    Json(serde_json::Value),
}

impl ScalarValue {
    /// Render the value as a delimited-text field (before quoting)
    pub fn to_field(&self) -> String {
        match self {
            ScalarValue::Null => String::new(),
            ScalarValue::Bool(true) => "True".to_string(),
            ScalarValue::Bool(false) => "False".to_string(),
            ScalarValue::Int(v) => v.to_string(),
            ScalarValue::UInt(v) => v.to_string(),
            ScalarValue::Float(v) => format_float(*v),
            ScalarValue::Decimal(v) => v.to_string(),
            ScalarValue::Text(v) => v.clone(),
            ScalarValue::Bytes(v) => hex::encode(v),
            ScalarValue::Date(v) => v.to_string(),
            ScalarValue::Time(v) => v.to_string(),
            ScalarValue::DateTime(v) => v.to_string(),
            ScalarValue::Json(v) => v.to_string(),
        }
    }
}

/// Render like Python's `repr(float)`: shortest round-trip digits, integral
/// values keep a trailing `.0`, and exponents below -4 or from 16 up switch
/// to scientific notation with a signed two-digit exponent.
fn format_float(v: f64) -> String {
    if v.is_nan() {
        return "nan".to_string();
    }
    if v.is_infinite() {
        return if v > 0.0 { "inf" } else { "-inf" }.to_string();
    }

    let scientific = format!("{:e}", v);
    let (mantissa, exponent) = scientific
        .split_once('e')
        .unwrap_or((scientific.as_str(), "0"));
    let exponent: i32 = exponent.parse().unwrap_or(0);

    if (-4..16).contains(&exponent) {
        let text = v.to_string();
        if text.contains('.') {
            text
        } else {
            format!("{}.0", text)
        }
    } else {
        let sign = if exponent < 0 { '-' } else { '+' };
        format!("{}e{}{:02}", mantissa, sign, exponent.abs())
    }
}

impl From<&str> for ScalarValue {
    fn from(v: &str) -> Self {
        ScalarValue::Text(v.to_string())
    }
}

impl From<i64> for ScalarValue {
    fn from(v: i64) -> Self {
        ScalarValue::Int(v)
    }
}

impl<T: Into<ScalarValue>> From<Option<T>> for ScalarValue {
    fn from(v: Option<T>) -> Self {
        v.map(Into::into).unwrap_or(ScalarValue::Null)
    }
}
