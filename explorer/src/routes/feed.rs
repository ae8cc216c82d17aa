use axum::{
    extract::{FromRef, Path, State},
    http::StatusCode,
    routing::{get, post, put},
    Json, Router,
};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::{info, instrument};

use crate::address::parse_address;
use crate::controller::TransactionFeedController;
use crate::error::AppError;
use crate::feed::{FeedSnapshot, LoadOutcome};
use crate::registry::FEED_ID_BYTES;
use crate::routes::ExplorerState;

/// Body for opening a feed or pointing it at another address
#[derive(Debug, Deserialize)]
pub struct AddressRequest {
    pub address: String,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OpenFeedResponse {
    pub feed_id: String,
    pub outcome: LoadOutcome,
    pub feed: FeedSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct LoadMoreResponse {
    pub outcome: LoadOutcome,
    pub feed: FeedSnapshot,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ForceRestResponse {
    pub switched: bool,
    pub feed: FeedSnapshot,
}

/// Validate a feed ID (hex-encoded 16 bytes)
fn validate_feed_id(feed_id: &str) -> Result<(), AppError> {
    let bytes = hex::decode(feed_id)
        .map_err(|_| AppError::bad_request("feed_id must be valid hex"))?;

    if bytes.len() != FEED_ID_BYTES {
        return Err(AppError::bad_request(format!(
            "feed_id must be {} bytes ({} hex chars), got {} bytes",
            FEED_ID_BYTES,
            FEED_ID_BYTES * 2,
            bytes.len()
        )));
    }

    Ok(())
}

async fn lookup(
    state: &ExplorerState,
    feed_id: &str,
) -> Result<Arc<TransactionFeedController>, AppError> {
    validate_feed_id(feed_id)?;
    state
        .registry
        .get(feed_id)
        .await
        .ok_or_else(|| AppError::not_found(format!("feed {} is not open", feed_id)))
}

/// POST /v1/feeds - Open a feed for an address and load its first page
#[instrument(skip(state, body), fields(address = %body.address))]
async fn open_feed(
    State(state): State<ExplorerState>,
    Json(body): Json<AddressRequest>,
) -> Result<(StatusCode, Json<OpenFeedResponse>), AppError> {
    let address = parse_address(&body.address).map_err(AppError::bad_request)?;

    let (feed_id, controller) = state.registry.create(&address).await;
    let outcome = controller.load_more().await;

    Ok((
        StatusCode::CREATED,
        Json(OpenFeedResponse {
            feed_id,
            outcome,
            feed: controller.snapshot().await,
        }),
    ))
}

/// GET /v1/feeds/:feed_id - Current feed contents
#[instrument(skip(state))]
async fn get_feed(
    State(state): State<ExplorerState>,
    Path(feed_id): Path<String>,
) -> Result<Json<FeedSnapshot>, AppError> {
    let controller = lookup(&state, &feed_id).await?;
    Ok(Json(controller.snapshot().await))
}

/// POST /v1/feeds/:feed_id/more - Append the next page
#[instrument(skip(state))]
async fn load_more(
    State(state): State<ExplorerState>,
    Path(feed_id): Path<String>,
) -> Result<Json<LoadMoreResponse>, AppError> {
    let controller = lookup(&state, &feed_id).await?;
    let outcome = controller.load_more().await;

    Ok(Json(LoadMoreResponse {
        outcome,
        feed: controller.snapshot().await,
    }))
}

/// PUT /v1/feeds/:feed_id/address - Show another address in the same feed
#[instrument(skip(state, body), fields(address = %body.address))]
async fn change_address(
    State(state): State<ExplorerState>,
    Path(feed_id): Path<String>,
    Json(body): Json<AddressRequest>,
) -> Result<Json<LoadMoreResponse>, AppError> {
    let address = parse_address(&body.address).map_err(AppError::bad_request)?;
    let controller = lookup(&state, &feed_id).await?;

    controller.reset(&address).await;
    let outcome = controller.load_more().await;
    info!(%feed_id, ?outcome, "Feed moved to new address");

    Ok(Json(LoadMoreResponse {
        outcome,
        feed: controller.snapshot().await,
    }))
}

/// POST /v1/feeds/:feed_id/force-rest - Stop using the indexer for this feed
#[instrument(skip(state))]
async fn force_rest(
    State(state): State<ExplorerState>,
    Path(feed_id): Path<String>,
) -> Result<Json<ForceRestResponse>, AppError> {
    let controller = lookup(&state, &feed_id).await?;
    let switched = controller.force_rest().await;

    Ok(Json(ForceRestResponse {
        switched,
        feed: controller.snapshot().await,
    }))
}

/// DELETE /v1/feeds/:feed_id
#[instrument(skip(state))]
async fn close_feed(
    State(state): State<ExplorerState>,
    Path(feed_id): Path<String>,
) -> Result<StatusCode, AppError> {
    validate_feed_id(&feed_id)?;
    if state.registry.remove(&feed_id).await {
        Ok(StatusCode::NO_CONTENT)
    } else {
        Err(AppError::not_found(format!("feed {} is not open", feed_id)))
    }
}

/// Create the feed routes router.
/// The router is generic over state S, where ExplorerState can be extracted from S via FromRef.
pub fn feed_routes<S>() -> Router<S>
where
    S: Clone + Send + Sync + 'static,
    ExplorerState: FromRef<S>,
{
    Router::new()
        .route("/", post(open_feed))
        .route("/:feed_id", get(get_feed).delete(close_feed))
        .route("/:feed_id/more", post(load_more))
        .route("/:feed_id/address", put(change_address))
        .route("/:feed_id/force-rest", post(force_rest))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::FeedSettings;
    use crate::feed::{TransactionKind, TransactionRecord};
    use crate::ledger::MockLedgerClient;
    use crate::registry::FeedRegistry;
    use crate::source::{MockIndexQueryService, MockNodeRestService};
    use axum::body::{to_bytes, Body};
    use axum::http::{Method, Request};
    use mockall::predicate::{always, eq};
    use serde_json::{json, Value};
    use tower::ServiceExt;

    fn records(versions: std::ops::RangeInclusive<u64>) -> Vec<TransactionRecord> {
        versions
            .rev()
            .map(|v| TransactionRecord::new(v, TransactionKind::UserTransaction, None))
            .collect()
    }

    fn app(indexer: MockIndexQueryService, node: MockNodeRestService) -> Router {
        let registry = FeedRegistry::new(
            Arc::new(indexer),
            Arc::new(node),
            FeedSettings::default(),
            8,
        );
        let state = ExplorerState {
            registry,
            ledger: Arc::new(MockLedgerClient::new()),
            holdings_limit: 10,
        };
        Router::new()
            .nest("/v1/feeds", feed_routes())
            .with_state(state)
    }

    async fn send(app: &Router, method: Method, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        let builder = Request::builder().method(method).uri(uri);
        let request = match body {
            Some(body) => builder
                .header("content-type", "application/json")
                .body(Body::from(body.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };

        let response = app.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, json)
    }

    #[tokio::test]
    async fn test_feed_lifecycle() {
        let mut indexer = MockIndexQueryService::new();
        indexer
            .expect_list_account_transactions()
            .times(2)
            .returning(|_, _, _| Ok(records(41..=42)));

        let mut node = MockNodeRestService::new();
        node.expect_list_account_transactions()
            .with(always(), eq(1000), eq(Some(40)))
            .times(1)
            .returning(|_, _, _| Ok(vec![]));

        let app = app(indexer, node);

        let (status, opened) = send(
            &app,
            Method::POST,
            "/v1/feeds",
            Some(json!({ "address": "0xcafe" })),
        )
        .await;
        assert_eq!(status, StatusCode::CREATED);
        assert_eq!(opened["outcome"]["type"], "appended");
        assert_eq!(opened["feed"]["phase"], "indexedExhausted");
        assert_eq!(opened["feed"]["records"].as_array().unwrap().len(), 2);
        let feed_id = opened["feedId"].as_str().unwrap().to_string();
        let feed_uri = format!("/v1/feeds/{}", feed_id);

        let (status, switched) =
            send(&app, Method::POST, &format!("{}/force-rest", feed_uri), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(switched["switched"], true);

        let (status, more) = send(&app, Method::POST, &format!("{}/more", feed_uri), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(more["outcome"]["backend"], "rest");
        assert_eq!(more["feed"]["phase"], "done");
        assert_eq!(more["feed"]["exhausted"], true);

        let (_, again) = send(&app, Method::POST, &format!("{}/more", feed_uri), None).await;
        assert_eq!(again["outcome"]["type"], "skipped");
        assert_eq!(again["outcome"]["reason"], "exhausted");

        let (_, switched) =
            send(&app, Method::POST, &format!("{}/force-rest", feed_uri), None).await;
        assert_eq!(switched["switched"], false);

        let (status, moved) = send(
            &app,
            Method::PUT,
            &format!("{}/address", feed_uri),
            Some(json!({ "address": "0xbeef" })),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert!(moved["feed"]["address"].as_str().unwrap().ends_with("beef"));
        assert_eq!(moved["feed"]["backend"], "indexed");
        assert_eq!(moved["feed"]["exhausted"], false);

        let (status, snapshot) = send(&app, Method::GET, &feed_uri, None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(snapshot["apiVersion"], "v1");

        let (status, _) = send(&app, Method::DELETE, &feed_uri, None).await;
        assert_eq!(status, StatusCode::NO_CONTENT);

        let (status, body) = send(&app, Method::GET, &feed_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "NOT_FOUND");

        let (status, _) = send(&app, Method::DELETE, &feed_uri, None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn test_unknown_and_malformed_feed_ids() {
        let app = app(MockIndexQueryService::new(), MockNodeRestService::new());

        let unknown = format!("/v1/feeds/{}", "ab".repeat(FEED_ID_BYTES));
        let (status, body) = send(&app, Method::POST, &format!("{}/more", unknown), None).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert!(body["message"].as_str().unwrap().contains("is not open"));

        let (status, body) = send(&app, Method::GET, "/v1/feeds/not-a-feed", None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "BAD_REQUEST");
    }

    #[tokio::test]
    async fn test_open_feed_rejects_bad_address() {
        let mut indexer = MockIndexQueryService::new();
        indexer.expect_list_account_transactions().never();
        let app = app(indexer, MockNodeRestService::new());

        let (status, body) = send(
            &app,
            Method::POST,
            "/v1/feeds",
            Some(json!({ "address": "0xzz" })),
        )
        .await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert!(body["message"].as_str().unwrap().contains("valid hex"));
    }

    #[test]
    fn test_validate_feed_id_accepts_16_bytes() {
        assert!(validate_feed_id(&"ab".repeat(16)).is_ok());
    }

    #[test]
    fn test_validate_feed_id_rejects_bad_hex() {
        let err = validate_feed_id("zz").unwrap_err();
        assert!(err.to_string().contains("valid hex"));
    }

    #[test]
    fn test_validate_feed_id_rejects_wrong_length() {
        let err = validate_feed_id(&"ab".repeat(8)).unwrap_err();
        assert!(err.to_string().contains("16 bytes"));
    }
}
