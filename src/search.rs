use crate::sources::Gateway;
use crate::types::Asset;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

/// Results of one dispatched search. `seq` identifies the dispatch; only the
/// latest one is worth showing.
#[derive(Debug)]
pub struct SearchOutcome {
    pub seq: u64,
    pub query: String,
    pub results: Vec<Asset>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InputChange {
    /// Field is blank; search mode should end now.
    Cleared,
    /// A search was scheduled after the debounce delay.
    Scheduled(u64),
}

/// Debounces search input and dispatches queries to the gateway. Results
/// come back on the outcome channel.
pub struct SearchCoordinator {
    gateway: Arc<Gateway>,
    delay: Duration,
    outcomes: mpsc::UnboundedSender<SearchOutcome>,
    pending: Option<JoinHandle<()>>,
    seq: u64,
}

impl SearchCoordinator {
    pub fn new(
        gateway: Arc<Gateway>,
        delay: Duration,
        outcomes: mpsc::UnboundedSender<SearchOutcome>,
    ) -> Self {
        Self {
            gateway,
            delay,
            outcomes,
            pending: None,
            seq: 0,
        }
    }

    /// The search field changed. Any pending search is cancelled; a blank
    /// field clears immediately, anything else is searched once input has
    /// been quiet for the debounce delay.
    pub fn input_changed(&mut self, text: &str) -> InputChange {
        self.cancel_pending();
        self.seq += 1;

        let query = text.trim();
        if query.is_empty() {
            return InputChange::Cleared;
        }
        self.pending = Some(self.dispatch(self.seq, query.to_string(), self.delay));
        InputChange::Scheduled(self.seq)
    }

    /// Explicit submit: skip the debounce delay. Blank text is ignored.
    pub fn search_now(&mut self, text: &str) -> Option<u64> {
        let query = text.trim();
        if query.is_empty() {
            return None;
        }
        self.cancel_pending();
        self.seq += 1;
        self.pending = Some(self.dispatch(self.seq, query.to_string(), Duration::ZERO));
        Some(self.seq)
    }

    pub fn is_current(&self, seq: u64) -> bool {
        seq == self.seq
    }

    fn cancel_pending(&mut self) {
        if let Some(handle) = self.pending.take() {
            handle.abort();
        }
    }

    fn dispatch(&self, seq: u64, query: String, delay: Duration) -> JoinHandle<()> {
        let gateway = Arc::clone(&self.gateway);
        let outcomes = self.outcomes.clone();
        tokio::spawn(async move {
            if !delay.is_zero() {
                tokio::time::sleep(delay).await;
            }
            debug!("dispatching search #{} for '{}'", seq, query);
            let results = gateway.search_assets(&query).await;
            // The receiver is gone only when the controller shut down.
            let _ = outcomes.send(SearchOutcome {
                seq,
                query,
                results,
            });
        })
    }
}

impl Drop for SearchCoordinator {
    fn drop(&mut self) {
        self.cancel_pending();
    }
}
