//! Streaming structured writer.
//!
//! `JsonWriter` emits a nested JSON document directly to an `io::Write`
//! sink. It tracks the open objects and arrays so that callers drive it
//! with intent-level calls (`begin_assoc_many("items")`, `write_field(..)`)
//! while separators, keys and indentation are produced by `serde_json`'s
//! formatters.
//!
//! Any sink failure is returned as `Error::Sink` immediately. Whatever was
//! already written stays written; the document is left unterminated and must
//! be discarded by the caller.

use std::fmt;
use std::io::Write;

use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use relgraph_core::{Error, Result, Row, Value};
use serde_json::ser::{CompactFormatter, Formatter, PrettyFormatter};

use crate::options::JsonWriteOptions;

const MAX_INDENT: &[u8] = b"                ";

enum Style {
    Compact(CompactFormatter),
    Pretty(PrettyFormatter<'static>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FrameKind {
    Object,
    Array,
}

#[derive(Debug)]
struct Frame {
    kind: FrameKind,
    first: bool,
    named: bool,
}

/// Call a formatter method on whichever style is active.
macro_rules! fmt_call {
    ($w:expr, $method:ident $(, $arg:expr)*) => {
        match &mut $w.style {
            Style::Compact(f) => f.$method(&mut $w.out $(, $arg)*),
            Style::Pretty(f) => f.$method(&mut $w.out $(, $arg)*),
        }
    };
}

/// Streaming sink for one serialization pass.
pub struct JsonWriter<'a> {
    out: Box<dyn Write + 'a>,
    style: Style,
    options: JsonWriteOptions,
    frames: Vec<Frame>,
    path: Vec<String>,
}

impl<'a> JsonWriter<'a> {
    /// Create a writer over `out`.
    pub fn new<W: Write + 'a>(out: W, options: JsonWriteOptions) -> Self {
        let style = match options.indent {
            Some(spaces) => Style::Pretty(PrettyFormatter::with_indent(
                &MAX_INDENT[..spaces.min(MAX_INDENT.len())],
            )),
            None => Style::Compact(CompactFormatter),
        };
        Self {
            out: Box::new(out),
            style,
            options,
            frames: Vec::new(),
            path: Vec::new(),
        }
    }

    /// The options this pass was created with.
    pub fn options(&self) -> &JsonWriteOptions {
        &self.options
    }

    /// Whether empty relationships are emitted as empty arrays.
    pub fn include_empty(&self) -> bool {
        self.options.include_empty()
    }

    /// Whether NULL fields are emitted.
    pub fn include_null(&self) -> bool {
        self.options.include_null()
    }

    /// Number of currently open objects and arrays.
    pub fn depth(&self) -> usize {
        self.frames.len()
    }

    /// Dotted path of the relationships currently open, e.g. `"orders.lines"`.
    pub fn current_path(&self) -> String {
        self.path.join(".")
    }

    /// Whether every opened structure has been closed.
    pub fn is_complete(&self) -> bool {
        self.frames.is_empty()
    }

    /// Open an unnamed object (at the root or as an array element).
    pub fn begin_object(&mut self) -> Result<()> {
        self.enter_unnamed()?;
        fmt_call!(self, begin_object)?;
        self.push(FrameKind::Object, false);
        Ok(())
    }

    /// Close the object opened by `begin_object`.
    pub fn end_object(&mut self) -> Result<()> {
        self.pop(FrameKind::Object, false)?;
        fmt_call!(self, end_object)?;
        self.leave_value()
    }

    /// Open a named array for a to-many relationship.
    pub fn begin_assoc_many(&mut self, name: &str) -> Result<()> {
        self.enter_named(name)?;
        fmt_call!(self, begin_array)?;
        self.push(FrameKind::Array, true);
        self.path.push(name.to_string());
        tracing::trace!(path = %self.current_path(), "Begin to-many");
        Ok(())
    }

    /// Close the array opened by `begin_assoc_many`.
    pub fn end_assoc_many(&mut self) -> Result<()> {
        self.pop(FrameKind::Array, true)?;
        fmt_call!(self, end_array)?;
        self.path.pop();
        self.leave_value()
    }

    /// Open a named object for a to-one relationship.
    pub fn begin_assoc_one(&mut self, name: &str) -> Result<()> {
        self.enter_named(name)?;
        fmt_call!(self, begin_object)?;
        self.push(FrameKind::Object, true);
        self.path.push(name.to_string());
        Ok(())
    }

    /// Close the object opened by `begin_assoc_one`.
    pub fn end_assoc_one(&mut self) -> Result<()> {
        self.pop(FrameKind::Object, true)?;
        fmt_call!(self, end_object)?;
        self.path.pop();
        self.leave_value()
    }

    /// Write one scalar field of the current object.
    ///
    /// NULL values are skipped unless the policy includes nulls.
    pub fn write_field(&mut self, name: &str, value: &Value) -> Result<()> {
        if value.is_null() && !self.include_null() {
            return Ok(());
        }
        self.enter_named(name)?;
        self.write_value(value)?;
        self.leave_value()
    }

    /// Write an explicit `null` field regardless of policy.
    pub fn write_null_field(&mut self, name: &str) -> Result<()> {
        self.enter_named(name)?;
        fmt_call!(self, write_null)?;
        self.leave_value()
    }

    /// Fold a raw query row into an object, fields in projection order.
    pub fn write_row(&mut self, row: &Row) -> Result<()> {
        self.begin_object()?;
        for (name, value) in row.iter() {
            self.write_field(name, value)?;
        }
        self.end_object()
    }

    /// Flush the underlying sink.
    pub fn flush(&mut self) -> Result<()> {
        self.out.flush()?;
        Ok(())
    }

    fn write_value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => fmt_call!(self, write_null)?,
            Value::Bool(v) => fmt_call!(self, write_bool, *v)?,
            Value::TinyInt(v) => fmt_call!(self, write_i64, i64::from(*v))?,
            Value::SmallInt(v) => fmt_call!(self, write_i64, i64::from(*v))?,
            Value::Int(v) => fmt_call!(self, write_i64, i64::from(*v))?,
            Value::BigInt(v) => fmt_call!(self, write_i64, *v)?,
            Value::Float(v) if v.is_finite() => fmt_call!(self, write_f32, *v)?,
            Value::Double(v) if v.is_finite() => fmt_call!(self, write_f64, *v)?,
            Value::Float(_) | Value::Double(_) => fmt_call!(self, write_null)?,
            Value::Decimal(s) => {
                let trimmed = s.trim();
                if serde_json::from_str::<serde_json::Number>(trimmed).is_ok() {
                    fmt_call!(self, write_number_str, trimmed)?;
                } else {
                    self.write_str(s)?;
                }
            }
            Value::Text(s) => self.write_str(s)?,
            Value::Bytes(b) => self.write_str(&BASE64.encode(b))?,
            Value::Date(days) => match value.as_date() {
                Some(date) => self.write_str(&date.to_string())?,
                None => fmt_call!(self, write_i64, i64::from(*days))?,
            },
            Value::Time(micros) => match value.as_time() {
                Some(time) => self.write_str(&time.to_string())?,
                None => fmt_call!(self, write_i64, *micros)?,
            },
            Value::Timestamp(micros) | Value::TimestampTz(micros) => {
                fmt_call!(self, write_i64, micros.div_euclid(1_000))?;
            }
            Value::Uuid(bytes) => {
                let text = uuid::Uuid::from_bytes(*bytes).hyphenated().to_string();
                self.write_str(&text)?;
            }
            Value::Json(json) => self.write_json(json)?,
            Value::Array(items) => {
                fmt_call!(self, begin_array)?;
                for (i, item) in items.iter().enumerate() {
                    fmt_call!(self, begin_array_value, i == 0)?;
                    self.write_value(item)?;
                    fmt_call!(self, end_array_value)?;
                }
                fmt_call!(self, end_array)?;
            }
        }
        Ok(())
    }

    /// Embedded JSON goes through the active formatter so it picks up the
    /// surrounding indentation.
    fn write_json(&mut self, json: &serde_json::Value) -> Result<()> {
        use serde_json::Value as Json;
        match json {
            Json::Null => fmt_call!(self, write_null)?,
            Json::Bool(v) => fmt_call!(self, write_bool, *v)?,
            Json::Number(n) => fmt_call!(self, write_number_str, &n.to_string())?,
            Json::String(s) => self.write_str(s)?,
            Json::Array(items) => {
                fmt_call!(self, begin_array)?;
                for (i, item) in items.iter().enumerate() {
                    fmt_call!(self, begin_array_value, i == 0)?;
                    self.write_json(item)?;
                    fmt_call!(self, end_array_value)?;
                }
                fmt_call!(self, end_array)?;
            }
            Json::Object(members) => {
                fmt_call!(self, begin_object)?;
                for (i, (key, item)) in members.iter().enumerate() {
                    fmt_call!(self, begin_object_key, i == 0)?;
                    self.write_str(key)?;
                    fmt_call!(self, end_object_key)?;
                    fmt_call!(self, begin_object_value)?;
                    self.write_json(item)?;
                    fmt_call!(self, end_object_value)?;
                }
                fmt_call!(self, end_object)?;
            }
        }
        Ok(())
    }

    fn write_str(&mut self, s: &str) -> Result<()> {
        serde_json::to_writer(&mut self.out, s).map_err(|e| Error::Sink(e.into()))
    }

    fn enter_unnamed(&mut self) -> Result<()> {
        let first = match self.frames.last_mut() {
            None => return Ok(()),
            Some(frame) if frame.kind == FrameKind::Array => std::mem::replace(&mut frame.first, false),
            Some(_) => return Err(misuse("an object member needs a field name")),
        };
        fmt_call!(self, begin_array_value, first)?;
        Ok(())
    }

    fn enter_named(&mut self, name: &str) -> Result<()> {
        let first = match self.frames.last_mut() {
            Some(frame) if frame.kind == FrameKind::Object => std::mem::replace(&mut frame.first, false),
            _ => return Err(misuse(format!("field '{name}' written outside an object"))),
        };
        fmt_call!(self, begin_object_key, first)?;
        self.write_str(name)?;
        fmt_call!(self, end_object_key)?;
        fmt_call!(self, begin_object_value)?;
        Ok(())
    }

    fn leave_value(&mut self) -> Result<()> {
        match self.frames.last().map(|f| f.kind) {
            None => {}
            Some(FrameKind::Array) => fmt_call!(self, end_array_value)?,
            Some(FrameKind::Object) => fmt_call!(self, end_object_value)?,
        }
        Ok(())
    }

    fn push(&mut self, kind: FrameKind, named: bool) {
        self.frames.push(Frame {
            kind,
            first: true,
            named,
        });
    }

    fn pop(&mut self, kind: FrameKind, named: bool) -> Result<()> {
        match self.frames.last() {
            Some(frame) if frame.kind == kind && frame.named == named => {
                self.frames.pop();
                Ok(())
            }
            Some(frame) => Err(misuse(format!(
                "cannot close {kind:?} (named: {named}) while {:?} (named: {}) is open",
                frame.kind, frame.named
            ))),
            None => Err(misuse("nothing is open")),
        }
    }
}

impl fmt::Debug for JsonWriter<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("JsonWriter")
            .field("options", &self.options)
            .field("frames", &self.frames)
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

fn misuse(message: impl Into<String>) -> Error {
    Error::Custom(format!("json writer: {}", message.into()))
}
