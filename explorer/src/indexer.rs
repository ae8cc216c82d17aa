use async_trait::async_trait;
use reqwest::Client;
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::FetchError;
use crate::feed::{TransactionKind, TransactionRecord};
use crate::ledger::{CoinBalance, OwnedToken};
use crate::metrics;
use crate::source::IndexQueryService;

/// Client for the indexed GraphQL service.
#[derive(Clone)]
pub struct IndexerClient {
    client: Client,
    endpoint: String,
    api_key: Option<String>,
}

const ACCOUNT_TRANSACTIONS_QUERY: &str = r#"
query AccountTransactions($address: String!, $limit: Int!, $offset: Int!) {
  account_transactions(
    where: { account_address: { _eq: $address } }
    order_by: { transaction_version: desc }
    limit: $limit
    offset: $offset
  ) {
    transaction_version
    user_transaction {
      sender
    }
  }
}
"#;

const COIN_BALANCES_QUERY: &str = r#"
query AccountCoins($address: String!, $limit: Int!) {
  current_fungible_asset_balances(
    where: { owner_address: { _eq: $address } }
    order_by: { amount: desc }
    limit: $limit
  ) {
    asset_type
    amount
    metadata {
      name
      symbol
      decimals
    }
  }
}
"#;

const OWNED_TOKENS_QUERY: &str = r#"
query AccountTokens($address: String!, $limit: Int!) {
  current_token_ownerships_v2(
    where: { owner_address: { _eq: $address }, amount: { _gt: 0 } }
    order_by: { last_transaction_version: desc }
    limit: $limit
  ) {
    token_data_id
    amount
    current_token_data {
      token_name
      token_uri
      current_collection {
        collection_name
      }
    }
  }
}
"#;

#[derive(Debug, Serialize)]
struct GraphQLRequest<V> {
    query: &'static str,
    variables: V,
}

#[derive(Debug, Deserialize)]
struct GraphQLResponse<D> {
    data: Option<D>,
    errors: Option<Vec<GraphQLError>>,
}

#[derive(Debug, Deserialize)]
struct GraphQLError {
    message: String,
}

#[derive(Debug, Serialize)]
struct PageVariables<'a> {
    address: &'a str,
    limit: u32,
    offset: u64,
}

#[derive(Debug, Serialize)]
struct LimitVariables<'a> {
    address: &'a str,
    limit: u32,
}

#[derive(Debug, Deserialize)]
struct AccountTransactionsData {
    account_transactions: Vec<AccountTransactionRow>,
}

#[derive(Debug, Deserialize)]
struct AccountTransactionRow {
    transaction_version: u64,
    user_transaction: Option<UserTransactionRef>,
}

#[derive(Debug, Deserialize)]
struct UserTransactionRef {
    sender: Option<String>,
}

impl From<AccountTransactionRow> for TransactionRecord {
    fn from(row: AccountTransactionRow) -> Self {
        match row.user_transaction {
            Some(user) => TransactionRecord::new(
                row.transaction_version,
                TransactionKind::UserTransaction,
                user.sender,
            ),
            None => TransactionRecord::new(row.transaction_version, TransactionKind::Other, None),
        }
    }
}

#[derive(Debug, Deserialize)]
struct CoinBalancesData {
    current_fungible_asset_balances: Vec<CoinBalanceRow>,
}

#[derive(Debug, Deserialize)]
struct CoinBalanceRow {
    asset_type: String,
    amount: serde_json::Value,
    metadata: Option<CoinMetadataRow>,
}

#[derive(Debug, Deserialize)]
struct CoinMetadataRow {
    name: Option<String>,
    symbol: Option<String>,
    decimals: Option<u8>,
}

#[derive(Debug, Deserialize)]
struct OwnedTokensData {
    current_token_ownerships_v2: Vec<OwnedTokenRow>,
}

#[derive(Debug, Deserialize)]
struct OwnedTokenRow {
    token_data_id: String,
    amount: serde_json::Value,
    current_token_data: Option<TokenDataRow>,
}

#[derive(Debug, Deserialize)]
struct TokenDataRow {
    token_name: Option<String>,
    token_uri: Option<String>,
    current_collection: Option<CollectionRow>,
}

#[derive(Debug, Deserialize)]
struct CollectionRow {
    collection_name: Option<String>,
}

/// Hasura serializes numeric columns either as JSON numbers or strings.
fn amount_to_string(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        serde_json::Value::Number(n) => n.to_string(),
        _ => "0".to_string(),
    }
}

impl IndexerClient {
    /// Create a new indexer client with the given GraphQL endpoint and timeout
    pub fn new(
        endpoint: String,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Query(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            endpoint,
            api_key,
        })
    }

    async fn execute<V, D>(&self, query: &'static str, variables: V) -> Result<D, FetchError>
    where
        V: Serialize,
        D: DeserializeOwned,
    {
        let mut request = self.client.post(&self.endpoint).json(&GraphQLRequest { query, variables });
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to reach indexer");
            FetchError::Query(format!("Connection failed: {}", e))
        })?;

        if !response.status().is_success() {
            let status = response.status();
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Indexer returned error");
            return Err(FetchError::Query(format!(
                "Indexer returned {}: {}",
                status, body
            )));
        }

        let gql: GraphQLResponse<D> = response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse indexer response");
            FetchError::Decode(format!("Invalid response: {}", e))
        })?;

        if let Some(errors) = gql.errors {
            let msg = errors
                .into_iter()
                .map(|e| e.message)
                .collect::<Vec<_>>()
                .join("; ");
            return Err(FetchError::Query(format!("GraphQL error: {}", msg)));
        }

        gql.data
            .ok_or_else(|| FetchError::Query("GraphQL response missing data".into()))
    }

    /// Cheapest possible query, used for readiness checks
    pub async fn ping(&self) -> bool {
        self.execute::<_, serde_json::Value>("query { __typename }", serde_json::json!({}))
            .await
            .is_ok()
    }

    /// Fungible asset balances held by `address`
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get_coin_balances(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<CoinBalance>, FetchError> {
        let result = self
            .execute::<_, CoinBalancesData>(COIN_BALANCES_QUERY, LimitVariables { address, limit })
            .await;
        metrics::record_upstream_request("indexer_coin_balances", result.is_ok());

        let data = result?;
        debug!(count = data.current_fungible_asset_balances.len(), "Fetched coin balances");

        Ok(data
            .current_fungible_asset_balances
            .into_iter()
            .map(|row| {
                let metadata = row.metadata.unwrap_or(CoinMetadataRow {
                    name: None,
                    symbol: None,
                    decimals: None,
                });
                CoinBalance {
                    asset_type: row.asset_type,
                    amount: amount_to_string(&row.amount),
                    name: metadata.name,
                    symbol: metadata.symbol,
                    decimals: metadata.decimals,
                }
            })
            .collect())
    }

    /// Digital assets (NFTs) currently owned by `address`
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    pub async fn get_owned_tokens(
        &self,
        address: &str,
        limit: u32,
    ) -> Result<Vec<OwnedToken>, FetchError> {
        let result = self
            .execute::<_, OwnedTokensData>(OWNED_TOKENS_QUERY, LimitVariables { address, limit })
            .await;
        metrics::record_upstream_request("indexer_owned_tokens", result.is_ok());

        let data = result?;
        debug!(count = data.current_token_ownerships_v2.len(), "Fetched owned tokens");

        Ok(data
            .current_token_ownerships_v2
            .into_iter()
            .map(|row| {
                let (name, uri, collection) = match row.current_token_data {
                    Some(token) => (
                        token.token_name,
                        token.token_uri,
                        token.current_collection.and_then(|c| c.collection_name),
                    ),
                    None => (None, None, None),
                };
                OwnedToken {
                    token_data_id: row.token_data_id,
                    amount: amount_to_string(&row.amount),
                    name,
                    uri,
                    collection,
                }
            })
            .collect())
    }
}

#[async_trait]
impl IndexQueryService for IndexerClient {
    #[instrument(skip(self), fields(endpoint = %self.endpoint))]
    async fn list_account_transactions(
        &self,
        address: &str,
        limit: u32,
        offset: u64,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        let result = self
            .execute::<_, AccountTransactionsData>(
                ACCOUNT_TRANSACTIONS_QUERY,
                PageVariables {
                    address,
                    limit,
                    offset,
                },
            )
            .await;
        metrics::record_upstream_request("indexer_account_transactions", result.is_ok());

        let data = result?;
        debug!(count = data.account_transactions.len(), "Fetched indexed transactions");

        Ok(data
            .account_transactions
            .into_iter()
            .map(TransactionRecord::from)
            .collect())
    }
}
