//! Error types for relgraph operations.

use std::fmt;

/// The primary error type for all relgraph operations.
#[derive(Debug)]
pub enum Error {
    /// Type conversion errors, including a property value of the wrong shape
    Type(TypeError),
    /// Query execution errors reported by the row source
    Query(QueryError),
    /// Query configuration errors (parameter binding, loader binding)
    Config(ConfigError),
    /// Lazy loading of a relationship collection failed
    LazyLoad(LazyLoadError),
    /// The structured writer's underlying sink failed mid-write
    Sink(std::io::Error),
    /// Query execution was cancelled from another thread of control
    Interrupted,
    /// Waiting on a background query timed out
    Timeout,
    /// Custom error with message
    Custom(String),
}

#[derive(Debug)]
pub struct TypeError {
    pub expected: &'static str,
    pub actual: String,
    pub column: Option<String>,
    pub rust_type: Option<&'static str>,
}

#[derive(Debug)]
pub struct QueryError {
    pub kind: QueryErrorKind,
    pub sql: Option<String>,
    pub message: String,
    pub source: Option<Box<dyn std::error::Error + Send + Sync>>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryErrorKind {
    /// `find_unique` matched more than one row
    NonUniqueResult,
    /// The row source failed while executing or fetching
    Execution,
    /// The background worker running the query died
    Worker,
}

#[derive(Debug)]
pub struct ConfigError {
    pub kind: ConfigErrorKind,
    pub message: String,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigErrorKind {
    /// Named and positional parameters mixed on one query
    BindConflict,
    /// Positional parameter index below 1
    InvalidPosition,
    /// A placeholder in the SQL has no bound value
    UnboundParameter,
    /// Loader rebinding attempted after the collection started loading
    LoaderRebind,
}

#[derive(Debug)]
pub struct LazyLoadError {
    pub property: String,
    pub kind: LazyLoadErrorKind,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LazyLoadErrorKind {
    /// No loader was ever bound to the collection
    NoLoader,
    /// The bound loader has been dropped by its owner
    LoaderDropped,
    /// The loading thread touched the collection it is loading
    Reentrant,
}

impl Error {
    /// Shorthand for a type mismatch with no column context.
    pub fn type_mismatch(expected: &'static str, actual: impl Into<String>) -> Self {
        Error::Type(TypeError {
            expected,
            actual: actual.into(),
            column: None,
            rust_type: None,
        })
    }

    /// Shorthand for a configuration error.
    pub fn config(kind: ConfigErrorKind, message: impl Into<String>) -> Self {
        Error::Config(ConfigError {
            kind,
            message: message.into(),
        })
    }

    /// Shorthand for a lazy loading error on a property.
    pub fn lazy_load(property: impl Into<String>, kind: LazyLoadErrorKind) -> Self {
        Error::LazyLoad(LazyLoadError {
            property: property.into(),
            kind,
        })
    }

    /// Was the operation cancelled from another thread?
    pub fn is_interrupted(&self) -> bool {
        matches!(self, Error::Interrupted)
    }

    /// Did the structured writer's sink fail?
    pub fn is_sink_failure(&self) -> bool {
        matches!(self, Error::Sink(_))
    }

    /// Get the configuration error kind, if this is a configuration error.
    pub fn config_kind(&self) -> Option<ConfigErrorKind> {
        match self {
            Error::Config(c) => Some(c.kind),
            _ => None,
        }
    }

    /// Get the query error kind, if this is a query error.
    pub fn query_kind(&self) -> Option<QueryErrorKind> {
        match self {
            Error::Query(q) => Some(q.kind),
            _ => None,
        }
    }

    /// Get the SQL that caused this error, if available
    pub fn sql(&self) -> Option<&str> {
        match self {
            Error::Query(q) => q.sql.as_deref(),
            _ => None,
        }
    }
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::Type(e) => {
                if let Some(col) = &e.column {
                    write!(
                        f,
                        "Type error in column '{}': expected {}, found {}",
                        col, e.expected, e.actual
                    )
                } else {
                    write!(f, "Type error: expected {}, found {}", e.expected, e.actual)
                }
            }
            Error::Query(e) => write!(f, "Query error: {}", e.message),
            Error::Config(e) => write!(f, "Configuration error: {}", e.message),
            Error::LazyLoad(e) => write!(f, "Lazy load error: {}", e),
            Error::Sink(e) => write!(f, "Output sink error: {}", e),
            Error::Interrupted => write!(f, "Query interrupted"),
            Error::Timeout => write!(f, "Operation timed out"),
            Error::Custom(msg) => write!(f, "{}", msg),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Query(e) => e
                .source
                .as_deref()
                .map(|err| err as &(dyn std::error::Error + 'static)),
            Error::Sink(e) => Some(e),
            _ => None,
        }
    }
}

impl fmt::Display for TypeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if let Some(col) = &self.column {
            write!(
                f,
                "expected {} for column '{}', found {}",
                self.expected, col, self.actual
            )
        } else {
            write!(f, "expected {}, found {}", self.expected, self.actual)
        }
    }
}

impl fmt::Display for QueryError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl fmt::Display for LazyLoadError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.kind {
            LazyLoadErrorKind::NoLoader => {
                write!(f, "no loader bound for '{}'", self.property)
            }
            LazyLoadErrorKind::LoaderDropped => {
                write!(f, "loader for '{}' has been dropped", self.property)
            }
            LazyLoadErrorKind::Reentrant => {
                write!(f, "re-entrant load of '{}' while loading", self.property)
            }
        }
    }
}

impl From<std::io::Error> for Error {
    fn from(err: std::io::Error) -> Self {
        Error::Sink(err)
    }
}

impl From<TypeError> for Error {
    fn from(err: TypeError) -> Self {
        Error::Type(err)
    }
}

impl From<QueryError> for Error {
    fn from(err: QueryError) -> Self {
        Error::Query(err)
    }
}

impl From<ConfigError> for Error {
    fn from(err: ConfigError) -> Self {
        Error::Config(err)
    }
}

impl From<LazyLoadError> for Error {
    fn from(err: LazyLoadError) -> Self {
        Error::LazyLoad(err)
    }
}

/// Result type alias for relgraph operations.
pub type Result<T> = std::result::Result<T, Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn io_errors_become_sink_failures() {
        let err: Error = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "closed").into();
        assert!(err.is_sink_failure());
        assert!(std::error::Error::source(&err).is_some());
        assert_eq!(err.to_string(), "Output sink error: closed");
    }

    #[test]
    fn kind_accessors() {
        let bind = Error::config(ConfigErrorKind::BindConflict, "mixed binding");
        assert_eq!(bind.config_kind(), Some(ConfigErrorKind::BindConflict));
        assert_eq!(bind.query_kind(), None);

        let unique = Error::Query(QueryError {
            kind: QueryErrorKind::NonUniqueResult,
            sql: Some("select 1".to_string()),
            message: "2 rows".to_string(),
            source: None,
        });
        assert_eq!(unique.query_kind(), Some(QueryErrorKind::NonUniqueResult));
        assert_eq!(unique.sql(), Some("select 1"));

        assert!(Error::Interrupted.is_interrupted());
        assert!(!Error::Timeout.is_interrupted());
    }

    #[test]
    fn type_error_display_includes_column() {
        let err = Error::Type(TypeError {
            expected: "i64",
            actual: "TEXT".to_string(),
            column: Some("id".to_string()),
            rust_type: None,
        });
        assert_eq!(
            err.to_string(),
            "Type error in column 'id': expected i64, found TEXT"
        );
    }

    #[test]
    fn lazy_load_display() {
        let err = Error::lazy_load("lines", LazyLoadErrorKind::Reentrant);
        assert_eq!(
            err.to_string(),
            "Lazy load error: re-entrant load of 'lines' while loading"
        );
    }
}
