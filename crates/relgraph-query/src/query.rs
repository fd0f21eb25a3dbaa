//! Raw SQL queries returning rows.

use std::fmt;
use std::sync::Arc;

use relgraph_core::{Error, QueryError, QueryErrorKind, Result, Row, Value};

use crate::cancel::QueryCancel;
use crate::future::SqlFutureList;
use crate::options::QueryOptions;
use crate::params::BindParams;
use crate::source::{QueryRequest, RowCursor, RowSource};

/// A raw SQL query against a [`RowSource`].
///
/// Parameters are bound by name or by 1-based position (not both), hints are
/// stored and passed through, and results are retrieved eagerly
/// (`find_list`, `find_unique`) or streamed one row at a time (`find_each`,
/// `find_each_while`).
///
/// # Example
///
/// ```ignore
/// let mut query = SqlQuery::new(source, "select id, name from customer where status = :status");
/// query.set_parameter("status", "ACTIVE")?.set_max_rows(100);
///
/// query.find_each_while(|row| {
///     println!("{}", row.get_named::<String>("name")?);
///     Ok(row.get_named::<i64>("id")? < 50)
/// })?;
/// ```
pub struct SqlQuery {
    source: Arc<dyn RowSource>,
    sql: String,
    params: BindParams,
    options: QueryOptions,
    cancel: QueryCancel,
}

impl SqlQuery {
    /// Create a query over the given engine.
    pub fn new(source: Arc<dyn RowSource>, sql: impl Into<String>) -> Self {
        Self {
            source,
            sql: sql.into(),
            params: BindParams::Empty,
            options: QueryOptions::default(),
            cancel: QueryCancel::new(),
        }
    }

    /// Replace all execution hints at once.
    pub fn with_options(mut self, options: QueryOptions) -> Self {
        self.options = options;
        self
    }

    /// The SQL as written, before placeholder rewriting.
    pub fn sql(&self) -> &str {
        &self.sql
    }

    /// The bound parameters.
    pub fn params(&self) -> &BindParams {
        &self.params
    }

    /// The stored execution hints.
    pub fn options(&self) -> &QueryOptions {
        &self.options
    }

    /// Bind a named parameter.
    ///
    /// Fails with a `BindConflict` configuration error if positional
    /// parameters are already bound.
    pub fn set_parameter(&mut self, name: &str, value: impl Into<Value>) -> Result<&mut Self> {
        self.params.set_named(name, value.into())?;
        Ok(self)
    }

    /// Bind a parameter by 1-based position.
    ///
    /// Fails with a `BindConflict` configuration error if named parameters
    /// are already bound.
    pub fn set_parameter_at(
        &mut self,
        position: usize,
        value: impl Into<Value>,
    ) -> Result<&mut Self> {
        self.params.set_positional(position, value.into())?;
        Ok(self)
    }

    /// Set the first row to return.
    pub fn set_first_row(&mut self, first_row: usize) -> &mut Self {
        self.options.first_row = first_row;
        self
    }

    /// Set the maximum number of rows to return (0 = unlimited).
    pub fn set_max_rows(&mut self, max_rows: usize) -> &mut Self {
        self.options.max_rows = max_rows;
        self
    }

    /// Set the statement timeout in seconds (0 = unlimited).
    pub fn set_timeout(&mut self, secs: u64) -> &mut Self {
        self.options.timeout_secs = secs;
        self
    }

    /// Set the advisory fetch buffer size.
    pub fn set_buffer_fetch_size_hint(&mut self, hint: usize) -> &mut Self {
        self.options.buffer_fetch_size_hint = hint;
        self
    }

    /// Cancel the running (or next) execution of this query.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }

    /// A handle that cancels this query from another thread.
    pub fn cancel_handle(&self) -> QueryCancel {
        self.cancel.clone()
    }

    /// Check whether cancellation has been requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Execute and materialize every row.
    pub fn find_list(&self) -> Result<Vec<Row>> {
        let mut rows = Vec::new();
        self.stream(|row| {
            rows.push(row);
            Ok(true)
        })?;
        Ok(rows)
    }

    /// Execute expecting at most one row.
    ///
    /// Returns `Ok(None)` when nothing matches and fails with a
    /// `NonUniqueResult` query error as soon as a second row is fetched.
    pub fn find_unique(&self) -> Result<Option<Row>> {
        let mut first = None;
        let mut extra = false;
        self.stream(|row| {
            if first.is_none() {
                first = Some(row);
                Ok(true)
            } else {
                extra = true;
                Ok(false)
            }
        })?;
        if extra {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::NonUniqueResult,
                sql: Some(self.sql.clone()),
                message: "expected at most one row but found more".to_string(),
                source: None,
            }));
        }
        Ok(first)
    }

    /// Stream every row to `consumer`, one resident at a time.
    pub fn find_each<F>(&self, mut consumer: F) -> Result<()>
    where
        F: FnMut(&Row) -> Result<()>,
    {
        self.stream(|row| {
            consumer(&row)?;
            Ok(true)
        })
        .map(drop)
    }

    /// Stream rows to `consumer` until it returns `false`.
    ///
    /// Stopping early is a normal return; no further rows are fetched and the
    /// cursor is closed.
    pub fn find_each_while<F>(&self, mut consumer: F) -> Result<()>
    where
        F: FnMut(&Row) -> Result<bool>,
    {
        self.stream(|row| consumer(&row)).map(drop)
    }

    /// Run `find_list` on a background thread.
    ///
    /// The background run works on a clone with its own cancellation flag:
    /// cancel it through the returned handle. Cancelling the handle leaves
    /// this query usable, and cancelling this query does not reach the
    /// background run.
    #[deprecated(note = "use find_list or find_each on a thread of your choosing")]
    pub fn find_future_list(&self) -> Result<SqlFutureList> {
        let query = self.clone();
        SqlFutureList::spawn(query.cancel.clone(), move || query.find_list())
    }

    /// The consumption loop shared by every retrieval method.
    ///
    /// Checks cancellation before opening and before every fetch, hands each
    /// row to `on_row` by value, and closes the cursor on every exit path.
    #[tracing::instrument(level = "debug", skip(self, on_row), fields(sql = %self.sql))]
    fn stream<F>(&self, mut on_row: F) -> Result<usize>
    where
        F: FnMut(Row) -> Result<bool>,
    {
        self.cancel.check()?;
        let (sql, params) = self.params.prepare(&self.sql)?;
        let request = QueryRequest {
            sql: &sql,
            params: &params,
            options: &self.options,
            cancel: &self.cancel,
        };
        let mut cursor = self.source.open(&request)?;
        let outcome = self.drain(cursor.as_mut(), &mut on_row);
        cursor.close();

        match &outcome {
            Ok(delivered) => tracing::debug!(delivered = *delivered, "Query complete"),
            Err(Error::Interrupted) => tracing::warn!("Query interrupted by cancellation"),
            Err(e) => tracing::debug!(error = %e, "Query failed"),
        }
        outcome
    }

    fn drain<F>(&self, cursor: &mut dyn RowCursor, on_row: &mut F) -> Result<usize>
    where
        F: FnMut(Row) -> Result<bool>,
    {
        let mut delivered = 0;
        loop {
            self.cancel.check()?;
            let Some(row) = cursor.next_row()? else {
                return Ok(delivered);
            };
            delivered += 1;
            tracing::trace!(row = delivered, "Delivering row");
            if !on_row(row)? {
                tracing::debug!(delivered, "Consumer stopped early");
                return Ok(delivered);
            }
        }
    }
}

impl Clone for SqlQuery {
    /// Clones share the engine, SQL, bindings and hints but get their own
    /// cancellation flag.
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
            sql: self.sql.clone(),
            params: self.params.clone(),
            options: self.options,
            cancel: QueryCancel::new(),
        }
    }
}

impl fmt::Debug for SqlQuery {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SqlQuery")
            .field("sql", &self.sql)
            .field("params", &self.params)
            .field("options", &self.options)
            .field("cancelled", &self.cancel.is_cancelled())
            .finish_non_exhaustive()
    }
}
