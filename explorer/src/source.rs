//! Contracts for the two paginated transaction backends.
//!
//! The feed controller only sees these traits; the HTTP clients in
//! [crate::indexer] and [crate::node] implement them, and tests swap in doubles.

use async_trait::async_trait;

use crate::error::FetchError;
use crate::feed::TransactionRecord;

/// Offset-paginated transaction history from the indexed GraphQL service.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait IndexQueryService: Send + Sync {
    /// Transactions touching `address`, newest first.
    async fn list_account_transactions(
        &self,
        address: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<TransactionRecord>, FetchError>;
}

/// Version-cursor paginated transaction history straight from a node.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait NodeRestService: Send + Sync {
    /// Transactions sent by `address`, newest first, none newer than `start_version`.
    async fn list_account_transactions(
        &self,
        address: &str,
        limit: u32,
        start_version: Option<u64>,
    ) -> Result<Vec<TransactionRecord>, FetchError>;

    /// Sender of the transaction committed at `version`, if it has one.
    async fn get_transaction_by_version(&self, version: u64) -> Result<Option<String>, FetchError>;
}
