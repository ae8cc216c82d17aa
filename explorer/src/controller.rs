//! Transaction feed controller.
//!
//! Stitches an account's history from two paginated backends into one list:
//! the indexed GraphQL service first (offset pagination), then the node REST
//! API (version cursor) once the indexer runs dry or fails. Callers only ever
//! ask for "more"; which backend answered is not visible in the records.
//!
//! Phases:
//!
//! ```text
//! Idle -> FetchingIndexed -> IndexedHasMore  -> FetchingIndexed ...
//!                         -> IndexedExhausted -> FetchingRest -> RestHasMore -> FetchingRest ...
//!                                                             -> Done
//! ```
//!
//! At most one fetch is in flight per feed. Each request is tagged with the
//! generation it was issued for; [TransactionFeedController::reset] bumps the
//! generation, so a response for a previous address is dropped on arrival.

use std::collections::HashSet;
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, error, info, instrument, warn};

use crate::address::AccountAddress;
use crate::error::FetchError;
use crate::feed::{
    classify_direction, Backend, Cursor, FeedEntry, FeedPhase, FeedSnapshot, LoadOutcome,
    SkipReason, TransactionRecord, API_VERSION,
};
use crate::metrics::{self, Timer};
use crate::source::{IndexQueryService, NodeRestService};

/// Pagination thresholds. A page is taken to mean "more may exist" when it is
/// full; neither backend reports an explicit end marker.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FeedSettings {
    /// Records requested per indexed page
    pub page_size: u32,
    /// Records requested per REST page
    pub rest_page_size: u32,
    /// A REST page at least this long means more data may exist
    pub rest_high_volume_threshold: u32,
}

impl Default for FeedSettings {
    fn default() -> Self {
        Self {
            page_size: 100,
            rest_page_size: 1000,
            rest_high_volume_threshold: 1000,
        }
    }
}

#[derive(Debug)]
struct FeedState {
    address: Option<String>,
    generation: u64,
    records: Vec<TransactionRecord>,
    seen: HashSet<u64>,
    cursor: Option<Cursor>,
    backend: Backend,
    phase: FeedPhase,
    exhausted: bool,
    in_flight: bool,
    last_error: Option<String>,
}

impl FeedState {
    fn empty(address: Option<String>, generation: u64) -> Self {
        Self {
            address,
            generation,
            records: Vec::new(),
            seen: HashSet::new(),
            cursor: None,
            backend: Backend::Indexed,
            phase: FeedPhase::Idle,
            exhausted: false,
            in_flight: false,
            last_error: None,
        }
    }

    fn min_version(&self) -> Option<u64> {
        self.records.iter().map(|r| r.version).min()
    }

    /// Append a page, skipping versions already held. Returns the number kept.
    fn append(&mut self, page: Vec<TransactionRecord>) -> usize {
        let mut appended = 0;
        for record in page {
            if self.seen.insert(record.version) {
                self.records.push(record);
                appended += 1;
            }
        }
        appended
    }

    fn finish(&mut self) {
        self.phase = FeedPhase::Done;
        self.exhausted = true;
    }
}

/// Everything a fetch needs, captured under the lock before awaiting.
#[derive(Debug, Clone)]
struct FetchRequest {
    generation: u64,
    address: String,
    backend: Backend,
    cursor: Option<Cursor>,
}

fn backend_label(backend: Backend) -> &'static str {
    match backend {
        Backend::Indexed => "indexed",
        Backend::Rest => "rest",
    }
}

/// Single-item sender lookup; failures are logged at debug level and yield `None`.
pub async fn resolve_sender(node: &dyn NodeRestService, version: u64) -> Option<String> {
    match node.get_transaction_by_version(version).await {
        Ok(sender) => sender,
        Err(e) => {
            debug!(version, error = %e, "Sender lookup failed");
            None
        }
    }
}

pub struct TransactionFeedController {
    indexer: Arc<dyn IndexQueryService>,
    node: Arc<dyn NodeRestService>,
    settings: FeedSettings,
    state: Arc<Mutex<FeedState>>,
}

impl TransactionFeedController {
    /// Create an idle controller with no address selected
    pub fn new(
        indexer: Arc<dyn IndexQueryService>,
        node: Arc<dyn NodeRestService>,
        settings: FeedSettings,
    ) -> Self {
        Self {
            indexer,
            node,
            settings,
            state: Arc::new(Mutex::new(FeedState::empty(None, 0))),
        }
    }

    /// Point the feed at `address`, discarding everything held so far.
    ///
    /// A fetch still in flight for the previous address completes into the
    /// void: its generation no longer matches.
    pub async fn reset(&self, address: &AccountAddress) {
        let mut state = self.state.lock().await;
        let generation = state.generation + 1;
        *state = FeedState::empty(Some(address.to_hex_literal()), generation);
        info!(address = %address, generation, "Feed reset");
    }

    /// Fetch the next page from whichever backend is current and append it.
    ///
    /// Returns immediately without a network call when a fetch is already in
    /// flight, when the feed is exhausted, or when no address is set.
    ///
    /// The fetch runs on its own task. Dropping the returned future (a client
    /// hanging up mid-request) does not abandon it: the page is still applied
    /// and the in-flight flag still cleared.
    #[instrument(skip(self))]
    pub async fn load_more(&self) -> LoadOutcome {
        let request = {
            let mut state = self.state.lock().await;
            match begin_fetch(&mut state) {
                Ok(request) => request,
                Err(outcome) => return outcome,
            }
        };

        debug!(
            address = %request.address,
            generation = request.generation,
            backend = ?request.backend,
            cursor = ?request.cursor,
            "Fetching page"
        );

        let task = tokio::spawn(run_fetch(
            self.indexer.clone(),
            self.node.clone(),
            self.settings,
            self.state.clone(),
            request.clone(),
        ));

        match task.await {
            Ok(outcome) => outcome,
            Err(e) => {
                error!(error = %e, "Feed fetch task failed");
                let mut state = self.state.lock().await;
                if state.generation != request.generation {
                    return LoadOutcome::Stale;
                }
                state.in_flight = false;
                apply_failure(
                    &mut state,
                    &request,
                    FetchError::query(format!("fetch task failed: {}", e)),
                )
            }
        }
    }

    /// Abandon the indexed backend now; the next load goes to REST.
    ///
    /// Returns false when there is nothing to switch (no address, already on
    /// REST, exhausted, or a fetch is in flight).
    pub async fn force_rest(&self) -> bool {
        let mut state = self.state.lock().await;
        if state.address.is_none()
            || state.in_flight
            || state.exhausted
            || state.backend != Backend::Indexed
        {
            return false;
        }

        state.phase = FeedPhase::IndexedExhausted;
        info!(generation = state.generation, "Backend switch forced");
        true
    }

    /// Current view of the feed with each record's direction filled in
    pub async fn snapshot(&self) -> FeedSnapshot {
        let state = self.state.lock().await;
        let records = match &state.address {
            Some(address) => state
                .records
                .iter()
                .map(|record| FeedEntry {
                    direction: classify_direction(record, address),
                    record: record.clone(),
                })
                .collect(),
            None => Vec::new(),
        };

        FeedSnapshot {
            api_version: API_VERSION,
            address: state.address.clone(),
            phase: state.phase,
            backend: state.backend,
            cursor: state.cursor,
            exhausted: state.exhausted,
            last_error: state.last_error.clone(),
            records,
        }
    }

    /// Authoritative sender of the transaction at `version`.
    ///
    /// Used for indexed records that came without a sender. Any failure
    /// yields `None`.
    pub async fn resolve_sender_by_version(&self, version: u64) -> Option<String> {
        resolve_sender(self.node.as_ref(), version).await
    }
}

fn begin_fetch(state: &mut FeedState) -> Result<FetchRequest, LoadOutcome> {
    let Some(address) = state.address.clone() else {
        return Err(LoadOutcome::Skipped {
            reason: SkipReason::NoAddress,
        });
    };

    if state.in_flight {
        return Err(LoadOutcome::Skipped {
            reason: SkipReason::InFlight,
        });
    }

    if state.exhausted {
        return Err(LoadOutcome::Skipped {
            reason: SkipReason::Exhausted,
        });
    }

    if state.phase == FeedPhase::IndexedExhausted {
        let reason = if state.last_error.is_some() {
            "indexer_error"
        } else {
            "indexer_exhausted"
        };
        metrics::record_backend_switch(reason);

        state.backend = Backend::Rest;
        state.cursor = match state.min_version() {
            None => None,
            Some(0) => {
                // Version 0 already held: nothing older can exist.
                state.finish();
                return Err(LoadOutcome::Skipped {
                    reason: SkipReason::Exhausted,
                });
            }
            Some(min) => Some(Cursor::Version(min - 1)),
        };
        info!(
            generation = state.generation,
            reason,
            cursor = ?state.cursor,
            "Switching feed to node REST"
        );
    }

    state.phase = match state.backend {
        Backend::Indexed => FeedPhase::FetchingIndexed,
        Backend::Rest => FeedPhase::FetchingRest,
    };
    state.in_flight = true;

    Ok(FetchRequest {
        generation: state.generation,
        address,
        backend: state.backend,
        cursor: state.cursor,
    })
}

/// Fetch one page and fold it into `state` unless the feed moved on meanwhile.
async fn run_fetch(
    indexer: Arc<dyn IndexQueryService>,
    node: Arc<dyn NodeRestService>,
    settings: FeedSettings,
    state: Arc<Mutex<FeedState>>,
    request: FetchRequest,
) -> LoadOutcome {
    let timer = Timer::start();
    let result = fetch(indexer.as_ref(), node.as_ref(), &settings, &request).await;
    metrics::record_feed_load(backend_label(request.backend), timer.elapsed());

    let mut state = state.lock().await;
    if state.generation != request.generation {
        debug!(
            issued_for = request.generation,
            current = state.generation,
            "Discarding response for a previous address"
        );
        metrics::record_stale_response();
        return LoadOutcome::Stale;
    }

    state.in_flight = false;
    match result {
        Ok(page) => apply_page(&mut state, &settings, &request, page),
        Err(e) => apply_failure(&mut state, &request, e),
    }
}

async fn fetch(
    indexer: &dyn IndexQueryService,
    node: &dyn NodeRestService,
    settings: &FeedSettings,
    request: &FetchRequest,
) -> Result<Vec<TransactionRecord>, FetchError> {
    match request.backend {
        Backend::Indexed => {
            let offset = match request.cursor {
                Some(Cursor::Offset(offset)) => offset,
                _ => 0,
            };
            indexer
                .list_account_transactions(&request.address, settings.page_size, offset)
                .await
        }
        Backend::Rest => {
            let start_version = match request.cursor {
                Some(Cursor::Version(version)) => Some(version),
                _ => None,
            };
            node.list_account_transactions(&request.address, settings.rest_page_size, start_version)
                .await
        }
    }
}

fn apply_page(
    state: &mut FeedState,
    settings: &FeedSettings,
    request: &FetchRequest,
    page: Vec<TransactionRecord>,
) -> LoadOutcome {
    let fetched = page.len();
    let appended = state.append(page);
    let duplicates = fetched - appended;
    if duplicates > 0 {
        debug!(duplicates, "Dropped records already held");
        metrics::record_duplicates_dropped(duplicates as u64);
    }
    metrics::record_records_appended(backend_label(request.backend), appended as u64);

    let has_more = match request.backend {
        Backend::Indexed => {
            let offset = match request.cursor {
                Some(Cursor::Offset(offset)) => offset,
                _ => 0,
            };
            state.cursor = Some(Cursor::Offset(offset + fetched as u64));

            let full = fetched > 0 && fetched >= settings.page_size as usize;
            state.phase = if full {
                FeedPhase::IndexedHasMore
            } else {
                FeedPhase::IndexedExhausted
            };
            full
        }
        Backend::Rest => {
            let full = fetched > 0 && fetched >= settings.rest_high_volume_threshold as usize;
            let previous = match request.cursor {
                Some(Cursor::Version(version)) => Some(version),
                _ => None,
            };
            // The next cursor must move strictly below the one just used,
            // otherwise the same page would be requested forever.
            match state.min_version() {
                Some(min)
                    if full
                        && appended > 0
                        && min > 0
                        && previous.map_or(true, |prev| min - 1 < prev) =>
                {
                    state.cursor = Some(Cursor::Version(min - 1));
                    state.phase = FeedPhase::RestHasMore;
                    true
                }
                _ => {
                    if full {
                        warn!(
                            fetched,
                            appended,
                            cursor = ?request.cursor,
                            "Full node page did not advance the cursor; feed marked exhausted"
                        );
                    }
                    state.finish();
                    false
                }
            }
        }
    };

    debug!(
        backend = ?request.backend,
        fetched,
        appended,
        has_more,
        total = state.records.len(),
        phase = ?state.phase,
        "Page applied"
    );

    LoadOutcome::Appended {
        backend: request.backend,
        fetched,
        appended,
        has_more,
    }
}

fn apply_failure(state: &mut FeedState, request: &FetchRequest, error: FetchError) -> LoadOutcome {
    state.last_error = Some(error.to_string());
    match request.backend {
        Backend::Indexed => {
            warn!(error = %error, "Indexer fetch failed; next load switches to node REST");
            state.phase = FeedPhase::IndexedExhausted;
        }
        Backend::Rest => {
            warn!(error = %error, "Node fetch failed; feed marked exhausted");
            state.finish();
        }
    }

    LoadOutcome::Degraded {
        backend: request.backend,
    }
}
