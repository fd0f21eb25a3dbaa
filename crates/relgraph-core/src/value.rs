//! Dynamic column values.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, SecondsFormat, Utc};
use serde::{Deserialize, Serialize};

/// Days from 0001-01-01 (CE day 1) to 1970-01-01.
const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// A dynamically-typed column value.
///
/// Used for parameter binding, for the values of a fetched `Row`, and for
/// the column view a `Model` exposes of itself.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    /// NULL value
    Null,

    /// Boolean value
    Bool(bool),

    /// 8-bit signed integer
    TinyInt(i8),

    /// 16-bit signed integer
    SmallInt(i16),

    /// 32-bit signed integer
    Int(i32),

    /// 64-bit signed integer
    BigInt(i64),

    /// 32-bit floating point
    Float(f32),

    /// 64-bit floating point
    Double(f64),

    /// Arbitrary precision decimal (stored as string)
    Decimal(String),

    /// Text string
    Text(String),

    /// Binary data
    Bytes(Vec<u8>),

    /// Date (days since 1970-01-01)
    Date(i32),

    /// Time (microseconds since midnight)
    Time(i64),

    /// Timestamp (microseconds since epoch)
    Timestamp(i64),

    /// Timestamp with timezone (microseconds since epoch, UTC)
    TimestampTz(i64),

    /// UUID (as 16 bytes)
    Uuid([u8; 16]),

    /// JSON value
    Json(serde_json::Value),

    /// Array of values
    Array(Vec<Value>),
}

impl Value {
    /// Check if this value is NULL.
    pub const fn is_null(&self) -> bool {
        matches!(self, Value::Null)
    }

    /// Get the type name of this value.
    pub const fn type_name(&self) -> &'static str {
        match self {
            Value::Null => "NULL",
            Value::Bool(_) => "BOOLEAN",
            Value::TinyInt(_) => "TINYINT",
            Value::SmallInt(_) => "SMALLINT",
            Value::Int(_) => "INTEGER",
            Value::BigInt(_) => "BIGINT",
            Value::Float(_) => "REAL",
            Value::Double(_) => "DOUBLE",
            Value::Decimal(_) => "DECIMAL",
            Value::Text(_) => "TEXT",
            Value::Bytes(_) => "BLOB",
            Value::Date(_) => "DATE",
            Value::Time(_) => "TIME",
            Value::Timestamp(_) => "TIMESTAMP",
            Value::TimestampTz(_) => "TIMESTAMPTZ",
            Value::Uuid(_) => "UUID",
            Value::Json(_) => "JSON",
            Value::Array(_) => "ARRAY",
        }
    }

    /// Try to convert this value to a bool.
    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            Value::TinyInt(v) => Some(*v != 0),
            Value::SmallInt(v) => Some(*v != 0),
            Value::Int(v) => Some(*v != 0),
            Value::BigInt(v) => Some(*v != 0),
            _ => None,
        }
    }

    /// Try to convert this value to an i64.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Value::TinyInt(v) => Some(i64::from(*v)),
            Value::SmallInt(v) => Some(i64::from(*v)),
            Value::Int(v) => Some(i64::from(*v)),
            Value::BigInt(v) => Some(*v),
            Value::Bool(v) => Some(i64::from(*v)),
            _ => None,
        }
    }

    /// Try to convert this value to an f64.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(f64::from(*v)),
            Value::Double(v) => Some(*v),
            Value::TinyInt(v) => Some(f64::from(*v)),
            Value::SmallInt(v) => Some(f64::from(*v)),
            Value::Int(v) => Some(f64::from(*v)),
            Value::BigInt(v) => Some(*v as f64),
            Value::Decimal(s) => s.parse().ok(),
            _ => None,
        }
    }

    /// Try to get this value as a string reference.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            Value::Decimal(s) => Some(s),
            _ => None,
        }
    }

    /// Try to get this value as a byte slice.
    pub fn as_bytes(&self) -> Option<&[u8]> {
        match self {
            Value::Bytes(b) => Some(b),
            Value::Text(s) => Some(s.as_bytes()),
            _ => None,
        }
    }

    /// Render a scalar value as text.
    ///
    /// Returns `None` for NULL, binary data and arrays, which have no
    /// canonical text form.
    pub fn to_text(&self) -> Option<String> {
        match self {
            Value::Null | Value::Bytes(_) | Value::Array(_) => None,
            Value::Bool(v) => Some(v.to_string()),
            Value::TinyInt(v) => Some(v.to_string()),
            Value::SmallInt(v) => Some(v.to_string()),
            Value::Int(v) => Some(v.to_string()),
            Value::BigInt(v) => Some(v.to_string()),
            Value::Date(v) => Some(
                self.as_date()
                    .map_or_else(|| v.to_string(), |d| d.to_string()),
            ),
            Value::Time(v) => Some(
                self.as_time()
                    .map_or_else(|| v.to_string(), |t| t.to_string()),
            ),
            Value::Timestamp(v) => Some(self.as_timestamp().map_or_else(
                || v.to_string(),
                |ts| ts.format("%Y-%m-%dT%H:%M:%S%.f").to_string(),
            )),
            Value::TimestampTz(v) => Some(self.as_timestamp().map_or_else(
                || v.to_string(),
                |ts| ts.and_utc().to_rfc3339_opts(SecondsFormat::AutoSi, true),
            )),
            Value::Float(v) => Some(v.to_string()),
            Value::Double(v) => Some(v.to_string()),
            Value::Decimal(s) | Value::Text(s) => Some(s.clone()),
            Value::Uuid(v) => Some(uuid::Uuid::from_bytes(*v).hyphenated().to_string()),
            Value::Json(v) => Some(v.to_string()),
        }
    }

    /// Calendar date of a `Date` value, if it is in chrono's range.
    pub fn as_date(&self) -> Option<NaiveDate> {
        match self {
            Value::Date(days) => days
                .checked_add(UNIX_EPOCH_DAYS_FROM_CE)
                .and_then(NaiveDate::from_num_days_from_ce_opt),
            _ => None,
        }
    }

    /// Time of day of a `Time` value, if it falls within one day.
    pub fn as_time(&self) -> Option<NaiveTime> {
        match self {
            Value::Time(micros) if *micros >= 0 => {
                let secs = u32::try_from(micros / 1_000_000).ok()?;
                let nanos = u32::try_from((micros % 1_000_000) * 1_000).ok()?;
                NaiveTime::from_num_seconds_from_midnight_opt(secs, nanos)
            }
            _ => None,
        }
    }

    /// UTC date and time of a `Timestamp` or `TimestampTz` value.
    pub fn as_timestamp(&self) -> Option<NaiveDateTime> {
        match self {
            Value::Timestamp(micros) | Value::TimestampTz(micros) => {
                let secs = micros.div_euclid(1_000_000);
                let nanos = u32::try_from(micros.rem_euclid(1_000_000) * 1_000).ok()?;
                DateTime::<Utc>::from_timestamp(secs, nanos).map(|dt| dt.naive_utc())
            }
            _ => None,
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i8> for Value {
    fn from(v: i8) -> Self {
        Value::TinyInt(v)
    }
}

impl From<i16> for Value {
    fn from(v: i16) -> Self {
        Value::SmallInt(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::BigInt(v)
    }
}

impl From<u32> for Value {
    fn from(v: u32) -> Self {
        Value::BigInt(i64::from(v))
    }
}

impl From<f32> for Value {
    fn from(v: f32) -> Self {
        Value::Float(v)
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Double(v)
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Value::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::Text(v.to_string())
    }
}

impl From<Vec<u8>> for Value {
    fn from(v: Vec<u8>) -> Self {
        Value::Bytes(v)
    }
}

impl From<&[u8]> for Value {
    fn from(v: &[u8]) -> Self {
        Value::Bytes(v.to_vec())
    }
}

impl From<[u8; 16]> for Value {
    fn from(v: [u8; 16]) -> Self {
        Value::Uuid(v)
    }
}

impl From<serde_json::Value> for Value {
    fn from(v: serde_json::Value) -> Self {
        Value::Json(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        match v {
            Some(v) => v.into(),
            None => Value::Null,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn option_maps_none_to_null() {
        assert_eq!(Value::from(None::<i32>), Value::Null);
        assert_eq!(Value::from(Some(7_i64)), Value::BigInt(7));
    }

    #[test]
    fn numeric_widening() {
        assert_eq!(Value::TinyInt(3).as_i64(), Some(3));
        assert_eq!(Value::Bool(true).as_i64(), Some(1));
        assert_eq!(Value::Decimal("1.25".to_string()).as_f64(), Some(1.25));
        assert_eq!(Value::Text("1".to_string()).as_i64(), None);
    }

    #[test]
    fn temporal_text_is_iso() {
        assert_eq!(Value::Date(19_737).to_text().as_deref(), Some("2024-01-15"));
        assert_eq!(Value::Date(-1).to_text().as_deref(), Some("1969-12-31"));
        assert_eq!(
            Value::Time(45_045_000_000).to_text().as_deref(),
            Some("12:30:45")
        );
        assert_eq!(
            Value::Timestamp(1_500_999).to_text().as_deref(),
            Some("1970-01-01T00:00:01.500999")
        );
        assert_eq!(
            Value::TimestampTz(1_705_276_800_000_000).to_text().as_deref(),
            Some("2024-01-15T00:00:00Z")
        );
        // Outside chrono's range the raw count is kept.
        assert_eq!(Value::Date(i32::MAX).to_text().as_deref(), Some("2147483647"));
        assert_eq!(Value::Time(-5).to_text().as_deref(), Some("-5"));
    }

    #[test]
    fn text_rendering() {
        assert_eq!(Value::Int(42).to_text().as_deref(), Some("42"));
        assert_eq!(Value::Bool(false).to_text().as_deref(), Some("false"));
        assert_eq!(Value::Null.to_text(), None);

        let mut bytes = [0u8; 16];
        bytes[15] = 1;
        assert_eq!(
            Value::Uuid(bytes).to_text().as_deref(),
            Some("00000000-0000-0000-0000-000000000001")
        );
    }
}
