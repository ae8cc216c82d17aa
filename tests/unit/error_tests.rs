//! Unit tests for the error module
//!
//! Run with: cargo test --test error_tests

use account_explorer::error::{AppError, ErrorCode, ErrorResponse, FetchError};
use axum::{http::StatusCode, response::IntoResponse};

async fn response_json(error: AppError) -> (StatusCode, serde_json::Value) {
    let response = error.into_response();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, serde_json::from_slice(&bytes).unwrap())
}

#[test]
fn test_status_codes() {
    assert_eq!(
        AppError::bad_request("bad address").status_code(),
        StatusCode::BAD_REQUEST
    );
    assert_eq!(
        AppError::not_found("feed is not open").status_code(),
        StatusCode::NOT_FOUND
    );
    assert_eq!(
        AppError::upstream_error("indexer down").status_code(),
        StatusCode::BAD_GATEWAY
    );
}

#[test]
fn test_fetch_error_messages() {
    assert_eq!(
        FetchError::query("timeout").to_string(),
        "Indexer query failed: timeout"
    );
    assert_eq!(
        FetchError::transport("502").to_string(),
        "Node request failed: 502"
    );
    assert_eq!(
        FetchError::decode("bad json").to_string(),
        "Invalid upstream payload: bad json"
    );
}

#[test]
fn test_missing_account_maps_to_not_found() {
    let app_err: AppError = FetchError::not_found("account_not_found").into();
    assert!(matches!(app_err, AppError::NotFound(ref msg) if msg == "account_not_found"));
    assert_eq!(app_err.status_code(), StatusCode::NOT_FOUND);
}

#[test]
fn test_backend_failures_map_to_bad_gateway() {
    for err in [
        FetchError::query("GraphQL error: field not found"),
        FetchError::transport("connection refused"),
        FetchError::decode("expected a sequence"),
    ] {
        let expected = err.to_string();
        let app_err: AppError = err.into();
        assert_eq!(app_err.status_code(), StatusCode::BAD_GATEWAY);
        assert!(app_err.to_string().contains(&expected));
    }
}

#[test]
fn test_error_code_serialization() {
    let body = ErrorResponse {
        error: ErrorCode::UpstreamError,
        message: "Indexer returned 503".to_string(),
    };
    let json = serde_json::to_value(&body).unwrap();
    assert_eq!(json["error"], "UPSTREAM_ERROR");
    assert_eq!(json["message"], "Indexer returned 503");
}

#[tokio::test]
async fn test_bad_address_response_body() {
    let (status, json) = response_json(AppError::bad_request("address must be valid hex")).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(json["error"], "BAD_REQUEST");
    assert_eq!(json["message"], "Bad request: address must be valid hex");
}

#[tokio::test]
async fn test_upstream_failure_response_body() {
    let app_err: AppError = FetchError::transport("Node returned 500").into();
    let (status, json) = response_json(app_err).await;

    assert_eq!(status, StatusCode::BAD_GATEWAY);
    assert_eq!(json["error"], "UPSTREAM_ERROR");
    assert!(json["message"]
        .as_str()
        .unwrap()
        .contains("Node request failed: Node returned 500"));
}
