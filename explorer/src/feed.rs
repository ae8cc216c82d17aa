use serde::{Serialize, Serializer};

use crate::address::same_account;

/// API version for forward compatibility
pub const API_VERSION: &str = "v1";

/// Serialize u64 as a decimal string for JavaScript compatibility
pub(crate) fn serialize_u64_as_string<S>(value: &u64, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    serializer.serialize_str(&value.to_string())
}

/// Classification of a transaction as reported by either backend
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum TransactionKind {
    UserTransaction,
    SystemTransaction,
    Other,
}

impl TransactionKind {
    /// Map a node REST `type` field onto the shared classification
    pub fn from_rest_type(kind: &str) -> Self {
        match kind {
            "user_transaction" => Self::UserTransaction,
            "block_metadata_transaction"
            | "state_checkpoint_transaction"
            | "genesis_transaction"
            | "block_epilogue_transaction"
            | "validator_transaction" => Self::SystemTransaction,
            _ => Self::Other,
        }
    }
}

/// One entry in an account's transaction history.
///
/// Both backends produce this shape, so consumers cannot tell the origin of a
/// record from its fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TransactionRecord {
    /// Ledger-assigned sequence number, unique and monotonic
    #[serde(serialize_with = "serialize_u64_as_string")]
    pub version: u64,
    pub kind: TransactionKind,
    pub sender: Option<String>,
}

impl TransactionRecord {
    pub fn new(version: u64, kind: TransactionKind, sender: Option<String>) -> Self {
        Self {
            version,
            kind,
            sender,
        }
    }
}

/// Direction of a transaction relative to the account being viewed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Direction {
    Send,
    Receive,
}

/// `Send` when the queried account signed the transaction, `Receive` otherwise.
///
/// A record without a sender is a `Receive`.
pub fn classify_direction(record: &TransactionRecord, queried_address: &str) -> Direction {
    match record.sender.as_deref() {
        Some(sender) if same_account(sender, queried_address) => Direction::Send,
        _ => Direction::Receive,
    }
}

/// Data source currently feeding the list
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum Backend {
    Indexed,
    Rest,
}

/// Resume position for the next page
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "type", content = "value")]
pub enum Cursor {
    /// Row offset into the indexed result set
    Offset(#[serde(serialize_with = "serialize_u64_as_string")] u64),
    /// Newest version the next REST page may contain
    Version(#[serde(serialize_with = "serialize_u64_as_string")] u64),
}

/// Pagination state of a feed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum FeedPhase {
    Idle,
    FetchingIndexed,
    IndexedHasMore,
    IndexedExhausted,
    FetchingRest,
    RestHasMore,
    Done,
}

/// Why a load request did not reach the network
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub enum SkipReason {
    InFlight,
    Exhausted,
    NoAddress,
}

/// Result of a single "load more" request
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
#[serde(tag = "type")]
pub enum LoadOutcome {
    /// A page was fetched and appended
    #[serde(rename_all = "camelCase")]
    Appended {
        backend: Backend,
        fetched: usize,
        appended: usize,
        has_more: bool,
    },
    /// The backend failed; the feed degraded instead of erroring
    #[serde(rename_all = "camelCase")]
    Degraded { backend: Backend },
    /// The response belonged to an address that is no longer shown
    Stale,
    Skipped { reason: SkipReason },
}

/// A record annotated for display
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedEntry {
    #[serde(flatten)]
    pub record: TransactionRecord,
    pub direction: Direction,
}

/// Read-only view of a feed, returned by the HTTP surface
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct FeedSnapshot {
    pub api_version: &'static str,
    pub address: Option<String>,
    pub phase: FeedPhase,
    pub backend: Backend,
    pub cursor: Option<Cursor>,
    pub exhausted: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub last_error: Option<String>,
    pub records: Vec<FeedEntry>,
}
