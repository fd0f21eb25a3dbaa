//! An in-memory row source.
//!
//! Useful as a backing engine for tests and for fixtures: it serves a fixed
//! table of rows, honours `first_row`/`max_rows`, and counts fetch activity
//! so callers can verify streaming behaviour.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use relgraph_core::{ColumnInfo, Error, QueryError, QueryErrorKind, Result, Row, Value};

use crate::options::QueryOptions;
use crate::source::{QueryRequest, RowCursor, RowSource};

fn lock<G>(mutex: &Mutex<G>) -> MutexGuard<'_, G> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Fetch counters shared between a `MemorySource` and its cursors.
#[derive(Debug, Default)]
pub struct FetchStats {
    opened: AtomicUsize,
    fetched: AtomicUsize,
    closed: AtomicUsize,
}

impl FetchStats {
    /// Number of cursors opened.
    pub fn opened(&self) -> usize {
        self.opened.load(Ordering::Acquire)
    }

    /// Number of rows handed out across all cursors.
    pub fn fetched(&self) -> usize {
        self.fetched.load(Ordering::Acquire)
    }

    /// Number of cursors closed.
    pub fn closed(&self) -> usize {
        self.closed.load(Ordering::Acquire)
    }
}

/// The last request a `MemorySource` received.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedRequest {
    pub sql: String,
    pub params: Vec<Value>,
    pub options: QueryOptions,
}

/// A row source over a fixed, in-memory table.
#[derive(Debug)]
pub struct MemorySource {
    columns: Arc<ColumnInfo>,
    rows: Arc<Vec<Vec<Value>>>,
    fail_at: Option<usize>,
    stats: Arc<FetchStats>,
    last_request: Mutex<Option<RecordedRequest>>,
}

impl MemorySource {
    /// Create a source serving `rows` under the given column names.
    pub fn new(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Self {
        Self {
            columns: Arc::new(ColumnInfo::new(columns)),
            rows: Arc::new(rows),
            fail_at: None,
            stats: Arc::new(FetchStats::default()),
            last_request: Mutex::new(None),
        }
    }

    /// Make the cursor fail when asked for the row at this 0-based index.
    pub fn fail_at(mut self, index: usize) -> Self {
        self.fail_at = Some(index);
        self
    }

    /// Shared fetch counters.
    pub fn stats(&self) -> Arc<FetchStats> {
        Arc::clone(&self.stats)
    }

    /// The most recent request passed to `open`.
    pub fn last_request(&self) -> Option<RecordedRequest> {
        lock(&self.last_request).clone()
    }
}

impl RowSource for MemorySource {
    fn open(&self, request: &QueryRequest<'_>) -> Result<Box<dyn RowCursor>> {
        let recorded = RecordedRequest {
            sql: request.sql.to_string(),
            params: request.params.to_vec(),
            options: *request.options,
        };
        *lock(&self.last_request) = Some(recorded);

        self.stats.opened.fetch_add(1, Ordering::AcqRel);
        let end = if request.options.has_max_rows() {
            request
                .options
                .first_row
                .saturating_add(request.options.max_rows)
                .min(self.rows.len())
        } else {
            self.rows.len()
        };

        Ok(Box::new(MemoryCursor {
            sql: request.sql.to_string(),
            columns: Arc::clone(&self.columns),
            rows: Arc::clone(&self.rows),
            next: request.options.first_row,
            end,
            fail_at: self.fail_at,
            stats: Arc::clone(&self.stats),
        }))
    }
}

struct MemoryCursor {
    sql: String,
    columns: Arc<ColumnInfo>,
    rows: Arc<Vec<Vec<Value>>>,
    next: usize,
    end: usize,
    fail_at: Option<usize>,
    stats: Arc<FetchStats>,
}

impl RowCursor for MemoryCursor {
    fn next_row(&mut self) -> Result<Option<Row>> {
        if self.next >= self.end {
            return Ok(None);
        }
        if self.fail_at == Some(self.next) {
            return Err(Error::Query(QueryError {
                kind: QueryErrorKind::Execution,
                sql: Some(self.sql.clone()),
                message: format!("fetch failed at row {}", self.next),
                source: None,
            }));
        }
        let values = self.rows[self.next].clone();
        self.next += 1;
        self.stats.fetched.fetch_add(1, Ordering::AcqRel);
        Ok(Some(Row::with_columns(Arc::clone(&self.columns), values)))
    }

    fn close(&mut self) {
        self.stats.closed.fetch_add(1, Ordering::AcqRel);
    }
}
