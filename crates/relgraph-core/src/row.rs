//! Raw query row representation.

use crate::Result;
use crate::error::{Error, TypeError};
use crate::value::Value;
use std::collections::HashMap;
use std::sync::Arc;

/// Column metadata shared across all rows in a result set.
///
/// Wrapped in `Arc` so every row from the same query shares one copy of the
/// projection.
#[derive(Debug, Clone)]
pub struct ColumnInfo {
    /// Column names in projection order
    names: Vec<String>,
    /// Exact name -> index
    name_to_index: HashMap<String, usize>,
    /// Lowercased name -> index of its first occurrence
    folded_to_index: HashMap<String, usize>,
}

impl ColumnInfo {
    /// Create new column info from a list of column names.
    pub fn new(names: Vec<String>) -> Self {
        let mut name_to_index = HashMap::with_capacity(names.len());
        let mut folded_to_index = HashMap::with_capacity(names.len());
        for (i, name) in names.iter().enumerate() {
            name_to_index.entry(name.clone()).or_insert(i);
            folded_to_index.entry(name.to_ascii_lowercase()).or_insert(i);
        }
        Self {
            names,
            name_to_index,
            folded_to_index,
        }
    }

    /// Get the number of columns.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    /// Check if there are no columns.
    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Get the index of a column by name.
    ///
    /// An exact match wins; otherwise the name is matched ignoring ASCII case.
    pub fn index_of(&self, name: &str) -> Option<usize> {
        self.name_to_index
            .get(name)
            .or_else(|| self.folded_to_index.get(&name.to_ascii_lowercase()))
            .copied()
    }

    /// Get the name of a column by index.
    pub fn name_at(&self, index: usize) -> Option<&str> {
        self.names.get(index).map(String::as_str)
    }

    /// Check if a column exists.
    pub fn contains(&self, name: &str) -> bool {
        self.index_of(name).is_some()
    }

    /// Get all column names.
    pub fn names(&self) -> &[String] {
        &self.names
    }
}

/// One immutable result row of a raw query.
///
/// Values are held in projection order and can be read by 0-based position
/// or by column name. Rows are produced once by the row source and are meant
/// to be dropped after the consumer's callback returns.
#[derive(Debug, Clone)]
pub struct Row {
    values: Vec<Value>,
    columns: Arc<ColumnInfo>,
}

impl Row {
    /// Create a new row with the given columns and values.
    ///
    /// For multiple rows from the same result set, prefer `with_columns`
    /// to share the column metadata.
    pub fn new(column_names: Vec<String>, values: Vec<Value>) -> Self {
        let columns = Arc::new(ColumnInfo::new(column_names));
        Self { values, columns }
    }

    /// Create a new row with shared column metadata.
    pub fn with_columns(columns: Arc<ColumnInfo>, values: Vec<Value>) -> Self {
        Self { values, columns }
    }

    /// Get the shared column metadata.
    pub fn column_info(&self) -> Arc<ColumnInfo> {
        Arc::clone(&self.columns)
    }

    /// Get the number of columns in this row.
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Check if this row is empty.
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Get a value by 0-based column index.
    pub fn get(&self, index: usize) -> Option<&Value> {
        self.values.get(index)
    }

    /// Get a value by column name.
    pub fn get_by_name(&self, name: &str) -> Option<&Value> {
        self.columns.index_of(name).and_then(|i| self.values.get(i))
    }

    /// Check if a column exists by name.
    pub fn contains_column(&self, name: &str) -> bool {
        self.columns.contains(name)
    }

    /// Get a typed value by column index.
    pub fn get_as<T: FromValue>(&self, index: usize) -> Result<T> {
        let value = self.get(index).ok_or_else(|| {
            Error::Type(TypeError {
                expected: std::any::type_name::<T>(),
                actual: format!(
                    "index {} out of bounds (row has {} columns)",
                    index,
                    self.len()
                ),
                column: None,
                rust_type: None,
            })
        })?;
        T::from_value(value).map_err(|e| with_context(e, None, std::any::type_name::<T>()))
    }

    /// Get a typed value by column name.
    pub fn get_named<T: FromValue>(&self, name: &str) -> Result<T> {
        let value = self.require(name, std::any::type_name::<T>())?;
        T::from_value(value)
            .map_err(|e| with_context(e, Some(name), std::any::type_name::<T>()))
    }

    /// Read a column as text, rendering numbers, booleans and temporals.
    pub fn get_string(&self, name: &str) -> Result<Option<String>> {
        let value = self.require(name, "text")?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .to_text()
            .map(Some)
            .ok_or_else(|| mismatch("text", value, name))
    }

    /// Read a column as an i64, parsing numeric text.
    pub fn get_i64(&self, name: &str) -> Result<Option<i64>> {
        let value = self.require(name, "i64")?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_i64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .map(Some)
            .ok_or_else(|| mismatch("i64", value, name))
    }

    /// Read a column as an f64, parsing numeric text.
    pub fn get_f64(&self, name: &str) -> Result<Option<f64>> {
        let value = self.require(name, "f64")?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_f64()
            .or_else(|| value.as_str().and_then(|s| s.trim().parse().ok()))
            .map(Some)
            .ok_or_else(|| mismatch("f64", value, name))
    }

    /// Read a column as a bool.
    ///
    /// Integers are true when non-zero; text accepts `true/false`, `t/f`,
    /// `y/n`, `yes/no` and `1/0` in any case.
    pub fn get_bool(&self, name: &str) -> Result<Option<bool>> {
        let value = self.require(name, "bool")?;
        if value.is_null() {
            return Ok(None);
        }
        value
            .as_bool()
            .or_else(|| value.as_str().and_then(parse_bool))
            .map(Some)
            .ok_or_else(|| mismatch("bool", value, name))
    }

    /// Read a column as a UUID from native, 16-byte or hyphenated text form.
    pub fn get_uuid(&self, name: &str) -> Result<Option<uuid::Uuid>> {
        let value = self.require(name, "uuid")?;
        let parsed = match value {
            Value::Null => return Ok(None),
            Value::Uuid(b) => Some(uuid::Uuid::from_bytes(*b)),
            Value::Bytes(b) => uuid::Uuid::from_slice(b).ok(),
            Value::Text(s) => uuid::Uuid::parse_str(s.trim()).ok(),
            _ => None,
        };
        parsed
            .map(Some)
            .ok_or_else(|| mismatch("uuid", value, name))
    }

    /// Get all column names.
    pub fn column_names(&self) -> impl Iterator<Item = &str> {
        self.columns.names().iter().map(String::as_str)
    }

    /// Iterate over all values.
    pub fn values(&self) -> impl Iterator<Item = &Value> {
        self.values.iter()
    }

    /// Iterate over (column_name, value) pairs in projection order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.columns
            .names()
            .iter()
            .map(String::as_str)
            .zip(self.values.iter())
    }

    fn require(&self, name: &str, expected: &'static str) -> Result<&Value> {
        self.get_by_name(name).ok_or_else(|| {
            Error::Type(TypeError {
                expected,
                actual: format!("column '{}' not found", name),
                column: Some(name.to_string()),
                rust_type: None,
            })
        })
    }
}

fn parse_bool(s: &str) -> Option<bool> {
    match s.trim().to_ascii_lowercase().as_str() {
        "true" | "t" | "y" | "yes" | "1" => Some(true),
        "false" | "f" | "n" | "no" | "0" => Some(false),
        _ => None,
    }
}

fn mismatch(expected: &'static str, value: &Value, column: &str) -> Error {
    Error::Type(TypeError {
        expected,
        actual: value.type_name().to_string(),
        column: Some(column.to_string()),
        rust_type: None,
    })
}

fn with_context(err: Error, column: Option<&str>, rust_type: &'static str) -> Error {
    match err {
        Error::Type(mut te) => {
            if let Some(name) = column {
                te.column = Some(name.to_string());
            }
            te.rust_type = Some(rust_type);
            Error::Type(te)
        }
        e => e,
    }
}

/// Trait for converting from a `Value` to a typed value.
pub trait FromValue: Sized {
    /// Convert from a Value, returning an error if the conversion fails.
    fn from_value(value: &Value) -> Result<Self>;
}

impl FromValue for bool {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bool()
            .ok_or_else(|| Error::type_mismatch("bool", value.type_name()))
    }
}

impl FromValue for i32 {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::TinyInt(v) => Ok(i32::from(*v)),
            Value::SmallInt(v) => Ok(i32::from(*v)),
            Value::Int(v) => Ok(*v),
            Value::Bool(v) => Ok(i32::from(*v)),
            Value::BigInt(v) => i32::try_from(*v)
                .map_err(|_| Error::type_mismatch("i32", format!("value {} out of range", v))),
            _ => Err(Error::type_mismatch("i32", value.type_name())),
        }
    }
}

impl FromValue for i64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_i64()
            .ok_or_else(|| Error::type_mismatch("i64", value.type_name()))
    }
}

impl FromValue for f64 {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_f64()
            .ok_or_else(|| Error::type_mismatch("f64", value.type_name()))
    }
}

impl FromValue for String {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Text(s) | Value::Decimal(s) => Ok(s.clone()),
            _ => Err(Error::type_mismatch("String", value.type_name())),
        }
    }
}

impl FromValue for Vec<u8> {
    fn from_value(value: &Value) -> Result<Self> {
        value
            .as_bytes()
            .map(<[u8]>::to_vec)
            .ok_or_else(|| Error::type_mismatch("Vec<u8>", value.type_name()))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(value: &Value) -> Result<Self> {
        if value.is_null() {
            Ok(None)
        } else {
            T::from_value(value).map(Some)
        }
    }
}

impl FromValue for Value {
    fn from_value(value: &Value) -> Result<Self> {
        Ok(value.clone())
    }
}

impl FromValue for serde_json::Value {
    fn from_value(value: &Value) -> Result<Self> {
        match value {
            Value::Json(v) => Ok(v.clone()),
            Value::Text(s) => serde_json::from_str(s)
                .map_err(|e| Error::type_mismatch("valid JSON", format!("invalid JSON: {}", e))),
            _ => Err(Error::type_mismatch("JSON", value.type_name())),
        }
    }
}
