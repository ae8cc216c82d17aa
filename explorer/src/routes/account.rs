use axum::{
    extract::{Path, State},
    Json,
};
use tracing::instrument;

use crate::address::parse_address;
use crate::error::AppError;
use crate::ledger::{load_account_overview, AccountOverview};
use crate::routes::ExplorerState;

/// GET /v1/accounts/:address - Balance, modules, coin holdings and NFTs
#[instrument(skip(state))]
pub async fn get_account_overview(
    State(state): State<ExplorerState>,
    Path(address): Path<String>,
) -> Result<Json<AccountOverview>, AppError> {
    let address = parse_address(&address).map_err(AppError::bad_request)?;

    let overview =
        load_account_overview(state.ledger.as_ref(), &address, state.holdings_limit).await?;

    Ok(Json(overview))
}
