//! Parameter binding for raw queries.
//!
//! A query binds either by name (`:customer_id`) or by 1-based position
//! (`?`), never both. Named binds are rewritten to positional placeholders
//! when the query is prepared for the row source.

use std::collections::BTreeMap;
use std::sync::OnceLock;

use regex::Regex;
use relgraph_core::{ConfigErrorKind, Error, Result, Value};

const NAMED_PLACEHOLDER: &str = r"(^|[^:]):([A-Za-z_][A-Za-z0-9_]*)";

fn named_placeholder() -> Result<&'static Regex> {
    static PATTERN: OnceLock<std::result::Result<Regex, regex::Error>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(NAMED_PLACEHOLDER))
        .as_ref()
        .map_err(|e| Error::Custom(format!("named placeholder pattern: {e}")))
}

/// Parameters bound to one query instance.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum BindParams {
    /// Nothing bound yet; either style may still be chosen.
    #[default]
    Empty,
    /// Bound by name, in first-bind order.
    Named(Vec<(String, Value)>),
    /// Bound by 1-based position.
    Positional(BTreeMap<usize, Value>),
}

impl BindParams {
    /// Bind a value by name. A leading `:` on the name is ignored.
    ///
    /// Rebinding the same name replaces the earlier value.
    pub fn set_named(&mut self, name: &str, value: Value) -> Result<()> {
        let name = name.strip_prefix(':').unwrap_or(name);
        match self {
            BindParams::Empty => {
                *self = BindParams::Named(vec![(name.to_string(), value)]);
                Ok(())
            }
            BindParams::Named(params) => {
                if let Some(slot) = params.iter_mut().find(|(n, _)| n == name) {
                    slot.1 = value;
                } else {
                    params.push((name.to_string(), value));
                }
                Ok(())
            }
            BindParams::Positional(_) => Err(Error::config(
                ConfigErrorKind::BindConflict,
                format!("cannot bind '{name}' by name: query already uses positional parameters"),
            )),
        }
    }

    /// Bind a value by 1-based position.
    pub fn set_positional(&mut self, position: usize, value: Value) -> Result<()> {
        if position == 0 {
            return Err(Error::config(
                ConfigErrorKind::InvalidPosition,
                "parameter positions start at 1",
            ));
        }
        match self {
            BindParams::Empty => {
                *self = BindParams::Positional(BTreeMap::from([(position, value)]));
                Ok(())
            }
            BindParams::Positional(params) => {
                params.insert(position, value);
                Ok(())
            }
            BindParams::Named(_) => Err(Error::config(
                ConfigErrorKind::BindConflict,
                format!("cannot bind position {position}: query already uses named parameters"),
            )),
        }
    }

    /// Number of bound values.
    pub fn len(&self) -> usize {
        match self {
            BindParams::Empty => 0,
            BindParams::Named(p) => p.len(),
            BindParams::Positional(p) => p.len(),
        }
    }

    /// Check if nothing has been bound.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Look up a named value.
    pub fn named(&self, name: &str) -> Option<&Value> {
        match self {
            BindParams::Named(params) => params.iter().find(|(n, _)| n == name).map(|(_, v)| v),
            _ => None,
        }
    }

    /// Produce the SQL and ordered values handed to the row source.
    ///
    /// Named placeholders become `?` in order of appearance; a name used
    /// twice contributes its value twice. Positional values must cover
    /// 1..=n without gaps.
    pub fn prepare(&self, sql: &str) -> Result<(String, Vec<Value>)> {
        match self {
            BindParams::Empty => Ok((sql.to_string(), Vec::new())),
            BindParams::Positional(params) => {
                let mut values = Vec::with_capacity(params.len());
                for (expected, (position, value)) in (1..).zip(params) {
                    if *position != expected {
                        return Err(Error::config(
                            ConfigErrorKind::UnboundParameter,
                            format!("positional parameter {expected} is not bound"),
                        ));
                    }
                    values.push(value.clone());
                }
                Ok((sql.to_string(), values))
            }
            BindParams::Named(_) => {
                let pattern = named_placeholder()?;
                let mut values = Vec::new();
                let mut rewritten = String::with_capacity(sql.len());
                let mut last = 0;
                for caps in pattern.captures_iter(sql) {
                    let (Some(whole), Some(name)) = (caps.get(0), caps.get(2)) else {
                        continue;
                    };
                    let value = self.named(name.as_str()).ok_or_else(|| {
                        Error::config(
                            ConfigErrorKind::UnboundParameter,
                            format!("named parameter '{}' is not bound", name.as_str()),
                        )
                    })?;
                    let prefix_len = caps.get(1).map_or(0, |m| m.len());
                    rewritten.push_str(&sql[last..whole.start() + prefix_len]);
                    rewritten.push('?');
                    last = whole.end();
                    values.push(value.clone());
                }
                rewritten.push_str(&sql[last..]);
                Ok((rewritten, values))
            }
        }
    }
}
