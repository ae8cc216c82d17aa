//! Account snapshot queries: info, published modules, coin holdings, NFTs.
//!
//! These are consumed once per address lookup and are not paginated further.

use async_trait::async_trait;
use serde::Serialize;
use tracing::{instrument, warn};

use crate::address::AccountAddress;
use crate::error::FetchError;
use crate::feed::serialize_u64_as_string;
use crate::indexer::IndexerClient;
use crate::node::NodeClient;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountInfo {
    #[serde(serialize_with = "serialize_u64_as_string")]
    pub sequence_number: u64,
    pub authentication_key: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ModuleSummary {
    /// Module name from the ABI, absent when the node omits the ABI
    pub name: Option<String>,
}

/// A fungible asset balance (decimal string amount, smallest unit)
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CoinBalance {
    pub asset_type: String,
    pub amount: String,
    pub name: Option<String>,
    pub symbol: Option<String>,
    pub decimals: Option<u8>,
}

/// A digital asset held by the account
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OwnedToken {
    pub token_data_id: String,
    pub amount: String,
    pub name: Option<String>,
    pub uri: Option<String>,
    pub collection: Option<String>,
}

/// Everything shown for an address apart from its transaction feed
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AccountOverview {
    pub address: AccountAddress,
    pub info: AccountInfo,
    pub module_count: usize,
    pub modules: Vec<ModuleSummary>,
    /// Native coin balance; absent when the balance view could not be read
    pub native_balance: Option<String>,
    pub coins: Vec<CoinBalance>,
    pub tokens: Vec<OwnedToken>,
}

/// Account/asset/NFT snapshot queries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LedgerClient: Send + Sync {
    async fn get_account_info(&self, address: &str) -> Result<AccountInfo, FetchError>;

    async fn get_account_modules(&self, address: &str) -> Result<Vec<ModuleSummary>, FetchError>;

    async fn get_account_coins_data(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<CoinBalance>, FetchError>;

    /// Native coin balance as a decimal string
    async fn get_account_coin_amount(&self, address: &str) -> Result<String, FetchError>;

    async fn get_account_owned_tokens(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<OwnedToken>, FetchError>;
}

/// [LedgerClient] backed by a node for account state and the indexer for holdings.
#[derive(Clone)]
pub struct HttpLedgerClient {
    node: NodeClient,
    indexer: IndexerClient,
}

impl HttpLedgerClient {
    pub fn new(node: NodeClient, indexer: IndexerClient) -> Self {
        Self { node, indexer }
    }
}

#[async_trait]
impl LedgerClient for HttpLedgerClient {
    async fn get_account_info(&self, address: &str) -> Result<AccountInfo, FetchError> {
        self.node.get_account(address).await
    }

    async fn get_account_modules(&self, address: &str) -> Result<Vec<ModuleSummary>, FetchError> {
        self.node.get_account_modules(address).await
    }

    async fn get_account_coins_data(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<CoinBalance>, FetchError> {
        self.indexer.get_coin_balances(address, limit).await
    }

    async fn get_account_coin_amount(&self, address: &str) -> Result<String, FetchError> {
        self.node.get_native_balance(address).await
    }

    async fn get_account_owned_tokens(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<OwnedToken>, FetchError> {
        self.indexer.get_owned_tokens(address, limit).await
    }
}

/// Issue every snapshot query for `address` concurrently.
///
/// The native balance is best-effort: accounts that never registered the
/// coin make the view function abort, which should not hide the rest.
#[instrument(skip(client, address), fields(address = %address))]
pub async fn load_account_overview(
    client: &dyn LedgerClient,
    address: &AccountAddress,
    holdings_limit: u32,
) -> Result<AccountOverview, FetchError> {
    let addr = address.to_hex_literal();

    let (info, modules, coins, tokens, native_balance) = tokio::join!(
        client.get_account_info(&addr),
        client.get_account_modules(&addr),
        client.get_account_coins_data(&addr, holdings_limit),
        client.get_account_owned_tokens(&addr, holdings_limit),
        client.get_account_coin_amount(&addr),
    );

    let native_balance = match native_balance {
        Ok(amount) => Some(amount),
        Err(e) => {
            warn!(error = %e, "Native balance unavailable");
            None
        }
    };

    let modules = modules?;
    Ok(AccountOverview {
        address: *address,
        info: info?,
        module_count: modules.len(),
        modules,
        native_balance,
        coins: coins?,
        tokens: tokens?,
    })
}
