pub mod account;
pub mod feed;
pub mod transaction;

use std::sync::Arc;

use crate::ledger::LedgerClient;
use crate::registry::FeedRegistry;

pub use account::get_account_overview;
pub use feed::feed_routes;
pub use transaction::get_transaction_sender;

/// Shared state for every API handler
#[derive(Clone)]
pub struct ExplorerState {
    pub registry: FeedRegistry,
    pub ledger: Arc<dyn LedgerClient>,
    /// Maximum coin balances / owned tokens returned per overview
    pub holdings_limit: u32,
}
