//! Search Controller
//!
//! Turns a stream of keystroke-driven query changes into a debounced,
//! cancellable, paginated stream of UI states.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::{mpsc, Mutex};
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::{ErrorKind, LookupError, Result};
use crate::query::{Cursor, Fetched, Query};
use crate::record::Record;
use crate::resilient::ResilientProvider;

// == Search State ==
/// What the UI should display for the current search session.
#[derive(Debug, Clone, PartialEq)]
pub enum SearchState {
    Idle,
    /// Waiting for input to go quiet
    Debouncing,
    Fetching,
    Results {
        records: Vec<Arc<Record>>,
        has_more: bool,
        /// Why the fallback served these records, if it did
        degraded: Option<ErrorKind>,
    },
    /// Zero matches; not an error
    Empty { degraded: Option<ErrorKind> },
    /// Both sources failed
    Error { kind: ErrorKind },
}

impl SearchState {
    /// True for the states that end a request.
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            SearchState::Results { .. } | SearchState::Empty { .. } | SearchState::Error { .. }
        )
    }
}

/// Session state; owned by one controller and never shared between sessions.
struct Session {
    /// Bumped on every new query and on cancel; results from older generations are dropped
    generation: u64,
    query: Option<Query>,
    records: Vec<Arc<Record>>,
    next_cursor: Option<Cursor>,
    degraded: Option<ErrorKind>,
    state: SearchState,
    task: Option<JoinHandle<()>>,
}

struct Shared {
    provider: ResilientProvider,
    session: Mutex<Session>,
    states: mpsc::UnboundedSender<SearchState>,
}

impl Shared {
    /// Records and publishes a state. Callers hold the session lock, which keeps
    /// emissions in generation order.
    fn emit(&self, session: &mut Session, state: SearchState) {
        session.state = state.clone();
        // A dropped receiver just means nobody is watching any more
        let _ = self.states.send(state);
    }

    fn apply_first_page(&self, session: &mut Session, result: Result<Fetched>) {
        match result {
            Ok(fetched) => {
                session.records = fetched.page.records.clone();
                session.next_cursor = fetched.page.next_cursor.clone();
                session.degraded = fetched.degraded;
                let state = if session.records.is_empty() {
                    SearchState::Empty {
                        degraded: fetched.degraded,
                    }
                } else {
                    results_state(session)
                };
                self.emit(session, state);
            }
            Err(err) => {
                debug!(generation = session.generation, "Search failed: {}", err);
                clear_results(session);
                self.emit(session, SearchState::Error { kind: err.kind() });
            }
        }
    }
}

fn results_state(session: &Session) -> SearchState {
    SearchState::Results {
        records: session.records.clone(),
        has_more: session.next_cursor.is_some(),
        degraded: session.degraded,
    }
}

fn clear_results(session: &mut Session) {
    session.records.clear();
    session.next_cursor = None;
    session.degraded = None;
}

// == Search Controller ==
/// UI-facing facade over the [`ResilientProvider`].
///
/// Every state change is sent on the channel returned by [`SearchController::new`].
pub struct SearchController {
    shared: Arc<Shared>,
    debounce: Duration,
}

impl SearchController {
    // == Constructor ==
    /// # Arguments
    /// * `provider` - Resilient provider shared with other sessions
    /// * `debounce` - Quiet period before a typed query is fetched
    ///
    /// # Returns
    /// The controller and the receiving end of its state stream.
    pub fn new(
        provider: ResilientProvider,
        debounce: Duration,
    ) -> (Self, mpsc::UnboundedReceiver<SearchState>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let session = Session {
            generation: 0,
            query: None,
            records: Vec::new(),
            next_cursor: None,
            degraded: None,
            state: SearchState::Idle,
            task: None,
        };
        let controller = Self {
            shared: Arc::new(Shared {
                provider,
                session: Mutex::new(session),
                states: tx,
            }),
            debounce,
        };
        (controller, rx)
    }

    // == Update Query ==
    /// Records new input and restarts the debounce timer.
    ///
    /// Any pending or in-flight request of this session is superseded; its
    /// result, if one ever arrives, is discarded.
    pub async fn update_query(&self, text: &str) {
        let mut session = self.shared.session.lock().await;
        session.generation += 1;
        let generation = session.generation;
        if let Some(task) = session.task.take() {
            task.abort();
        }

        let query = Query::new(text);
        session.query = Some(query.clone());
        self.shared.emit(&mut session, SearchState::Debouncing);

        let shared = self.shared.clone();
        let debounce = self.debounce;
        session.task = Some(tokio::spawn(async move {
            tokio::time::sleep(debounce).await;
            {
                let mut session = shared.session.lock().await;
                if session.generation != generation {
                    return;
                }
                shared.emit(&mut session, SearchState::Fetching);
            }

            let result = shared.provider.fetch(&query).await;

            let mut session = shared.session.lock().await;
            if session.generation != generation {
                debug!(generation, "Dropping superseded result");
                return;
            }
            session.task = None;
            shared.apply_first_page(&mut session, result);
        }));
    }

    // == Load Next Page ==
    /// Fetches the page after the displayed results and appends it.
    ///
    /// Fails with `NoMorePages` unless results with a continuation are shown.
    /// A failure while paging is returned to the caller and leaves the
    /// displayed results untouched.
    pub async fn load_next_page(&self) -> Result<()> {
        let (query, generation) = {
            let session = self.shared.session.lock().await;
            let cursor = match (&session.state, &session.next_cursor) {
                (SearchState::Results { .. }, Some(cursor)) => cursor.clone(),
                _ => return Err(LookupError::NoMorePages),
            };
            let query = session
                .query
                .clone()
                .ok_or(LookupError::NoMorePages)?
                .with_cursor(Some(cursor));
            (query, session.generation)
        };

        let fetched = self.shared.provider.fetch(&query).await?;

        let mut session = self.shared.session.lock().await;
        // A new query, a cancel or a concurrent page load got there first
        if session.generation != generation || session.next_cursor.as_ref() != query.cursor() {
            debug!(generation, "Dropping superseded page");
            return Ok(());
        }
        session.records.extend(fetched.page.records.iter().cloned());
        session.next_cursor = fetched.page.next_cursor.clone();
        session.degraded = fetched.degraded.or(session.degraded);
        let state = results_state(&session);
        self.shared.emit(&mut session, state);
        Ok(())
    }

    // == Cancel ==
    /// Aborts any pending or in-flight request and returns to `Idle`.
    pub async fn cancel(&self) {
        let mut session = self.shared.session.lock().await;
        session.generation += 1;
        if let Some(task) = session.task.take() {
            task.abort();
        }
        session.query = None;
        clear_results(&mut session);
        self.shared.emit(&mut session, SearchState::Idle);
    }

    // == Select ==
    /// Looks a record up by Spirit Code in the displayed results. Never fetches.
    pub async fn select(&self, code: &str) -> Result<Arc<Record>> {
        let session = self.shared.session.lock().await;
        session
            .records
            .iter()
            .find(|record| record.has_code(code))
            .cloned()
            .ok_or_else(|| LookupError::NotFound(code.trim().to_string()))
    }

    /// Snapshot of the latest emitted state.
    pub async fn state(&self) -> SearchState {
        self.shared.session.lock().await.state.clone()
    }
}

impl Drop for SearchController {
    fn drop(&mut self) {
        if let Ok(mut session) = self.shared.session.try_lock() {
            if let Some(task) = session.task.take() {
                task.abort();
            }
        }
    }
}
