//! Background execution of a raw query.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::mpsc::{self, Receiver, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use relgraph_core::{Error, QueryError, QueryErrorKind, Result, Row};

use crate::cancel::QueryCancel;

/// The pending result of a query running on a worker thread.
///
/// Kept for callers that want fire-and-collect behaviour; cancelling it
/// interrupts the query at its next fetch.
#[derive(Debug)]
pub struct SqlFutureList {
    receiver: Receiver<Result<Vec<Row>>>,
    cancel: QueryCancel,
    done: Arc<AtomicBool>,
    taken: bool,
}

impl SqlFutureList {
    pub(crate) fn spawn<F>(cancel: QueryCancel, job: F) -> Result<Self>
    where
        F: FnOnce() -> Result<Vec<Row>> + Send + 'static,
    {
        let (sender, receiver) = mpsc::channel();
        let done = Arc::new(AtomicBool::new(false));
        let finished = Arc::clone(&done);

        thread::Builder::new()
            .name("relgraph-future-list".to_string())
            .spawn(move || {
                let result = job();
                finished.store(true, Ordering::Release);
                // The receiver may be gone if the caller dropped the future.
                let _ = sender.send(result);
            })
            .map_err(|e| worker_error(format!("failed to spawn query worker: {e}")))?;

        tracing::debug!("Spawned background query");
        Ok(Self {
            receiver,
            cancel,
            done,
            taken: false,
        })
    }

    /// Request cancellation. Returns `false` if the query already finished.
    pub fn cancel(&self) -> bool {
        if self.is_done() {
            return false;
        }
        self.cancel.cancel();
        true
    }

    /// Whether cancellation was requested.
    pub fn is_cancelled(&self) -> bool {
        self.cancel.is_cancelled()
    }

    /// Whether the worker has produced its result.
    pub fn is_done(&self) -> bool {
        self.done.load(Ordering::Acquire)
    }

    /// Block until the rows are available.
    pub fn get(mut self) -> Result<Vec<Row>> {
        self.ensure_not_taken()?;
        self.taken = true;
        self.receiver
            .recv()
            .map_err(|_| worker_error("query worker exited without a result"))?
    }

    /// Wait up to `timeout` for the rows.
    ///
    /// On `Error::Timeout` the query keeps running and this may be called
    /// again.
    pub fn get_timeout(&mut self, timeout: Duration) -> Result<Vec<Row>> {
        self.ensure_not_taken()?;
        match self.receiver.recv_timeout(timeout) {
            Ok(result) => {
                self.taken = true;
                result
            }
            Err(RecvTimeoutError::Timeout) => Err(Error::Timeout),
            Err(RecvTimeoutError::Disconnected) => {
                self.taken = true;
                Err(worker_error("query worker exited without a result"))
            }
        }
    }

    fn ensure_not_taken(&self) -> Result<()> {
        if self.taken {
            Err(Error::Custom("query result already taken".to_string()))
        } else {
            Ok(())
        }
    }
}

fn worker_error(message: impl Into<String>) -> Error {
    Error::Query(QueryError {
        kind: QueryErrorKind::Worker,
        sql: None,
        message: message.into(),
        source: None,
    })
}

#[cfg(test)]
#[allow(deprecated)]
mod tests {
    use super::*;
    use crate::memory::MemorySource;
    use crate::query::SqlQuery;
    use relgraph_core::Value;

    #[test]
    fn get_returns_all_rows() {
        let source = Arc::new(MemorySource::new(
            vec!["id".to_string()],
            (0..4).map(|i| vec![Value::Int(i)]).collect(),
        ));
        let query = SqlQuery::new(source, "select id from t");
        let future = query.find_future_list().unwrap();
        let rows = future.get().unwrap();
        assert_eq!(rows.len(), 4);
    }

    #[test]
    fn get_timeout_reports_timeout_then_result() {
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let mut future = SqlFutureList::spawn(QueryCancel::new(), move || {
            let _ = release_rx.recv();
            Ok(Vec::new())
        })
        .unwrap();

        let err = future.get_timeout(Duration::from_millis(10)).unwrap_err();
        assert!(matches!(err, Error::Timeout));
        assert!(!future.is_done());

        release_tx.send(()).unwrap();
        assert!(future.get_timeout(Duration::from_secs(5)).unwrap().is_empty());
        assert!(future.is_done());

        let again = future.get_timeout(Duration::from_millis(1)).unwrap_err();
        assert!(matches!(again, Error::Custom(_)));
    }

    #[test]
    fn cancel_interrupts_pending_query() {
        let cancel = QueryCancel::new();
        let observed = cancel.clone();
        let (release_tx, release_rx) = mpsc::channel::<()>();
        let future = SqlFutureList::spawn(cancel, move || {
            let _ = release_rx.recv();
            observed.check()?;
            Ok(Vec::new())
        })
        .unwrap();

        assert!(future.cancel());
        assert!(future.is_cancelled());
        release_tx.send(()).unwrap();
        assert!(future.get().unwrap_err().is_interrupted());
    }

    #[test]
    fn cancel_after_completion_returns_false() {
        let mut future = SqlFutureList::spawn(QueryCancel::new(), || Ok(Vec::new())).unwrap();
        future.get_timeout(Duration::from_secs(5)).unwrap();
        assert!(!future.cancel());
    }
}
