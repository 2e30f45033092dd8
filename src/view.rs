// Transaction view - what the screen shows and how it gets there
//
// Contract:
// - activating the view issues exactly one request
// - success: store the collection, stop loading
// - failure: stop loading, leave the collection empty, record + log the error
// - the error is never surfaced to the user, only to the log
// - dropping the view cancels a request still in flight

use crate::client::TransactionSource;
use crate::error::FetchError;
use crate::transaction::{Summary, Transaction};
use std::sync::Arc;
use tokio::sync::oneshot::{self, error::TryRecvError};
use tokio::task::JoinHandle;
use tracing::{error, info};

type FetchResult = Result<Vec<Transaction>, FetchError>;

/// A request started by `activate` that has not been applied yet.
struct PendingFetch {
    result: oneshot::Receiver<FetchResult>,
    task: JoinHandle<()>,
}

pub struct TransactionView {
    loading: bool,
    transactions: Vec<Transaction>,
    error: Option<String>,
    pending: Option<PendingFetch>,
}

impl TransactionView {
    pub fn new() -> Self {
        Self {
            loading: false,
            transactions: Vec::new(),
            error: None,
            pending: None,
        }
    }

    /// Start loading from `source`.
    ///
    /// Returns `false` (and does nothing) when a request is already in
    /// flight. Must be called from inside a tokio runtime.
    pub fn activate<S: TransactionSource>(&mut self, source: Arc<S>) -> bool {
        if self.pending.is_some() {
            return false;
        }

        let (sender, receiver) = oneshot::channel();
        let task = tokio::spawn(async move {
            let result = source.fetch().await;
            // Receiver gone means the view was torn down; nothing to report to.
            let _ = sender.send(result);
        });

        self.loading = true;
        self.pending = Some(PendingFetch {
            result: receiver,
            task,
        });
        true
    }

    /// Fetch again. The current collection stays until the new result lands.
    pub fn refresh<S: TransactionSource>(&mut self, source: Arc<S>) -> bool {
        self.activate(source)
    }

    /// Apply a finished request without blocking.
    ///
    /// Returns `true` when the state changed.
    pub fn poll(&mut self) -> bool {
        let Some(pending) = self.pending.as_mut() else {
            return false;
        };

        let result = match pending.result.try_recv() {
            Ok(result) => result,
            Err(TryRecvError::Empty) => return false,
            Err(TryRecvError::Closed) => Err(FetchError::Aborted),
        };

        self.pending = None;
        self.finish(result);
        true
    }

    /// Wait for the request in flight, if any, and apply it.
    pub async fn wait(&mut self) {
        if let Some(pending) = self.pending.take() {
            let result = pending.result.await.unwrap_or(Err(FetchError::Aborted));
            self.finish(result);
        }
    }

    fn finish(&mut self, result: FetchResult) {
        self.loading = false;

        match result {
            Ok(transactions) => {
                info!(count = transactions.len(), "transactions loaded");
                self.transactions = transactions;
                self.error = None;
            }
            Err(err) => {
                error!(error = %err, "failed to fetch transactions");
                self.transactions.clear();
                self.error = Some(err.to_string());
            }
        }
    }

    pub fn is_loading(&self) -> bool {
        self.loading
    }

    pub fn transactions(&self) -> &[Transaction] {
        &self.transactions
    }

    /// Last fetch error, kept for diagnostics only.
    pub fn error(&self) -> Option<&str> {
        self.error.as_deref()
    }

    pub fn len(&self) -> usize {
        self.transactions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.transactions.is_empty()
    }

    pub fn summary(&self) -> Summary {
        Summary::of(&self.transactions)
    }
}

impl Default for TransactionView {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for TransactionView {
    fn drop(&mut self) {
        if let Some(pending) = self.pending.take() {
            pending.task.abort();
        }
    }
}
