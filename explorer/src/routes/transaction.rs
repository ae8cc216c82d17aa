use axum::{
    extract::{Path, State},
    Json,
};
use serde::Serialize;
use tracing::instrument;

use crate::error::AppError;
use crate::routes::ExplorerState;

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SenderResponse {
    #[serde(serialize_with = "crate::feed::serialize_u64_as_string")]
    pub version: u64,
    /// Null when the transaction has no sender or the lookup failed
    pub sender: Option<String>,
}

/// GET /v1/transactions/:version/sender - Authoritative sender of one transaction
///
/// Lookup failures are not errors here: the sender is reported as null and
/// the caller shows an unknown direction.
#[instrument(skip(state))]
pub async fn get_transaction_sender(
    State(state): State<ExplorerState>,
    Path(version): Path<String>,
) -> Result<Json<SenderResponse>, AppError> {
    let version = version
        .parse::<u64>()
        .map_err(|_| AppError::bad_request("version must be an unsigned integer"))?;

    let sender = state.registry.resolve_sender_by_version(version).await;

    Ok(Json(SenderResponse { version, sender }))
}
