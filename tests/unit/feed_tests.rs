//! Unit tests for the feed module
//!
//! Run with: cargo test --test feed_tests

use account_explorer::feed::{
    classify_direction, Backend, Cursor, Direction, FeedEntry, FeedPhase, FeedSnapshot,
    LoadOutcome, SkipReason, TransactionKind, TransactionRecord, API_VERSION,
};

const ACCOUNT: &str = "0x000000000000000000000000000000000000000000000000000000000000cafe";

#[test]
fn test_rest_type_mapping() {
    assert_eq!(
        TransactionKind::from_rest_type("user_transaction"),
        TransactionKind::UserTransaction
    );
    assert_eq!(
        TransactionKind::from_rest_type("block_metadata_transaction"),
        TransactionKind::SystemTransaction
    );
    assert_eq!(
        TransactionKind::from_rest_type("state_checkpoint_transaction"),
        TransactionKind::SystemTransaction
    );
    assert_eq!(
        TransactionKind::from_rest_type("something_new"),
        TransactionKind::Other
    );
}

#[test]
fn test_record_serialization() {
    let record = TransactionRecord::new(
        u64::MAX,
        TransactionKind::UserTransaction,
        Some(ACCOUNT.to_string()),
    );

    let json = serde_json::to_value(&record).unwrap();
    assert_eq!(json["version"], "18446744073709551615");
    assert_eq!(json["kind"], "userTransaction");
    assert_eq!(json["sender"], ACCOUNT);
}

#[test]
fn test_record_without_sender_serializes_null() {
    let record = TransactionRecord::new(7, TransactionKind::Other, None);
    let json = serde_json::to_value(&record).unwrap();
    assert!(json["sender"].is_null());
}

#[test]
fn test_direction_send_for_own_transaction() {
    let record = TransactionRecord::new(
        1,
        TransactionKind::UserTransaction,
        Some(ACCOUNT.to_string()),
    );
    assert_eq!(classify_direction(&record, ACCOUNT), Direction::Send);
}

#[test]
fn test_direction_send_across_address_forms() {
    let record = TransactionRecord::new(
        1,
        TransactionKind::UserTransaction,
        Some("0xCAFE".to_string()),
    );
    assert_eq!(classify_direction(&record, ACCOUNT), Direction::Send);
}

#[test]
fn test_direction_receive_for_other_sender() {
    let record = TransactionRecord::new(
        1,
        TransactionKind::UserTransaction,
        Some("0xbeef".to_string()),
    );
    assert_eq!(classify_direction(&record, ACCOUNT), Direction::Receive);
}

#[test]
fn test_direction_receive_without_sender() {
    let record = TransactionRecord::new(1, TransactionKind::SystemTransaction, None);
    assert_eq!(classify_direction(&record, ACCOUNT), Direction::Receive);
}

#[test]
fn test_cursor_serialization() {
    let json = serde_json::to_value(Cursor::Offset(200)).unwrap();
    assert_eq!(json["type"], "offset");
    assert_eq!(json["value"], "200");

    let json = serde_json::to_value(Cursor::Version(41)).unwrap();
    assert_eq!(json["type"], "version");
    assert_eq!(json["value"], "41");
}

#[test]
fn test_load_outcome_serialization() {
    let outcome = LoadOutcome::Appended {
        backend: Backend::Rest,
        fetched: 12,
        appended: 11,
        has_more: false,
    };
    let json = serde_json::to_value(outcome).unwrap();
    assert_eq!(json["type"], "appended");
    assert_eq!(json["backend"], "rest");
    assert_eq!(json["fetched"], 12);
    assert_eq!(json["appended"], 11);
    assert_eq!(json["hasMore"], false);

    let json = serde_json::to_value(LoadOutcome::Skipped {
        reason: SkipReason::InFlight,
    })
    .unwrap();
    assert_eq!(json["type"], "skipped");
    assert_eq!(json["reason"], "inFlight");

    let json = serde_json::to_value(LoadOutcome::Stale).unwrap();
    assert_eq!(json["type"], "stale");
}

#[test]
fn test_snapshot_serialization() {
    let record = TransactionRecord::new(
        9,
        TransactionKind::UserTransaction,
        Some(ACCOUNT.to_string()),
    );
    let snapshot = FeedSnapshot {
        api_version: API_VERSION,
        address: Some(ACCOUNT.to_string()),
        phase: FeedPhase::RestHasMore,
        backend: Backend::Rest,
        cursor: Some(Cursor::Version(8)),
        exhausted: false,
        last_error: None,
        records: vec![FeedEntry {
            record,
            direction: Direction::Send,
        }],
    };

    let json = serde_json::to_value(&snapshot).unwrap();
    assert_eq!(json["apiVersion"], "v1");
    assert_eq!(json["phase"], "restHasMore");
    assert_eq!(json["cursor"]["value"], "8");
    assert!(json.get("lastError").is_none());
    assert_eq!(json["records"][0]["version"], "9");
    assert_eq!(json["records"][0]["direction"], "Send");
}
