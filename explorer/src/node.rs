use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, error, instrument};

use crate::error::FetchError;
use crate::feed::{TransactionKind, TransactionRecord};
use crate::ledger::{AccountInfo, ModuleSummary};
use crate::metrics;
use crate::source::NodeRestService;

/// View function used for the native coin balance
const COIN_BALANCE_FUNCTION: &str = "0x1::coin::balance";
const NATIVE_COIN_TYPE: &str = "0x1::aptos_coin::AptosCoin";

/// Client for a node's REST API.
#[derive(Clone)]
pub struct NodeClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

/// Transaction as returned by the node; only the fields the feed needs
#[derive(Debug, Deserialize)]
struct RestTransaction {
    version: String,
    #[serde(rename = "type")]
    kind: String,
    sender: Option<String>,
}

impl TryFrom<RestTransaction> for TransactionRecord {
    type Error = FetchError;

    fn try_from(tx: RestTransaction) -> Result<Self, Self::Error> {
        let version = tx
            .version
            .parse::<u64>()
            .map_err(|_| FetchError::decode(format!("version '{}' is not a u64", tx.version)))?;

        Ok(TransactionRecord::new(
            version,
            TransactionKind::from_rest_type(&tx.kind),
            tx.sender,
        ))
    }
}

#[derive(Debug, Deserialize)]
struct RestAccount {
    sequence_number: String,
    authentication_key: String,
}

#[derive(Debug, Deserialize)]
struct RestModule {
    abi: Option<RestModuleAbi>,
}

#[derive(Debug, Deserialize)]
struct RestModuleAbi {
    name: String,
}

#[derive(Debug, Serialize)]
struct ViewRequest<'a> {
    function: &'a str,
    type_arguments: Vec<&'a str>,
    arguments: Vec<&'a str>,
}

impl NodeClient {
    /// Create a new node client with the given base URL (ending in `/v1`) and timeout
    pub fn new(
        base_url: String,
        timeout: Duration,
        api_key: Option<String>,
    ) -> Result<Self, FetchError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| FetchError::Transport(format!("Failed to create HTTP client: {}", e)))?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key,
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T, FetchError> {
        let request = match &self.api_key {
            Some(key) => request.bearer_auth(key),
            None => request,
        };

        let response = request.send().await.map_err(|e| {
            error!(error = %e, "Failed to reach node");
            FetchError::Transport(format!("Connection failed: {}", e))
        })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            let body = response.text().await.unwrap_or_default();
            debug!(body = %body, "Node returned not found");
            return Err(FetchError::NotFound(body));
        }

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            error!(status = %status, body = %body, "Node returned error");
            return Err(FetchError::Transport(format!(
                "Node returned {}: {}",
                status, body
            )));
        }

        response.json().await.map_err(|e| {
            error!(error = %e, "Failed to parse node response");
            FetchError::Decode(format!("Invalid response: {}", e))
        })
    }

    /// Node health probe, used for readiness checks
    pub async fn healthy(&self) -> bool {
        let request = self.client.get(self.url("-/healthy"));
        self.send::<serde_json::Value>(request).await.is_ok()
    }

    /// Sequence number and authentication key of an account
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_account(&self, address: &str) -> Result<AccountInfo, FetchError> {
        let request = self.client.get(self.url(&format!("accounts/{}", address)));
        let result = self.send::<RestAccount>(request).await;
        metrics::record_upstream_request("node_account", result.is_ok());

        let account = result?;
        let sequence_number = account.sequence_number.parse::<u64>().map_err(|_| {
            FetchError::decode(format!(
                "sequence_number '{}' is not a u64",
                account.sequence_number
            ))
        })?;

        Ok(AccountInfo {
            sequence_number,
            authentication_key: account.authentication_key,
        })
    }

    /// Modules published under an account
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_account_modules(&self, address: &str) -> Result<Vec<ModuleSummary>, FetchError> {
        let request = self
            .client
            .get(self.url(&format!("accounts/{}/modules", address)));
        let result = self.send::<Vec<RestModule>>(request).await;
        metrics::record_upstream_request("node_account_modules", result.is_ok());

        Ok(result?
            .into_iter()
            .map(|module| ModuleSummary {
                name: module.abi.map(|abi| abi.name),
            })
            .collect())
    }

    /// Native coin balance through the `coin::balance` view function
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    pub async fn get_native_balance(&self, address: &str) -> Result<String, FetchError> {
        let request = self.client.post(self.url("view")).json(&ViewRequest {
            function: COIN_BALANCE_FUNCTION,
            type_arguments: vec![NATIVE_COIN_TYPE],
            arguments: vec![address],
        });
        let result = self.send::<Vec<serde_json::Value>>(request).await;
        metrics::record_upstream_request("node_view_balance", result.is_ok());

        match result?.into_iter().next() {
            Some(serde_json::Value::String(amount)) => Ok(amount),
            Some(serde_json::Value::Number(amount)) => Ok(amount.to_string()),
            other => Err(FetchError::decode(format!(
                "unexpected balance view result: {:?}",
                other
            ))),
        }
    }
}

#[async_trait]
impl NodeRestService for NodeClient {
    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn list_account_transactions(
        &self,
        address: &str,
        limit: u32,
        start_version: Option<u64>,
    ) -> Result<Vec<TransactionRecord>, FetchError> {
        let mut query = vec![("limit", limit.to_string())];
        if let Some(start) = start_version {
            query.push(("start", start.to_string()));
        }

        let request = self
            .client
            .get(self.url(&format!("accounts/{}/transactions", address)))
            .query(&query);
        let result = self.send::<Vec<RestTransaction>>(request).await;
        metrics::record_upstream_request("node_account_transactions", result.is_ok());

        let mut records = result?
            .into_iter()
            .map(TransactionRecord::try_from)
            .collect::<Result<Vec<_>, _>>()?;

        // The node pages oldest-first; the feed contract is newest-first.
        records.sort_by(|a, b| b.version.cmp(&a.version));

        debug!(count = records.len(), "Fetched node transactions");
        Ok(records)
    }

    #[instrument(skip(self), fields(base_url = %self.base_url))]
    async fn get_transaction_by_version(&self, version: u64) -> Result<Option<String>, FetchError> {
        let request = self
            .client
            .get(self.url(&format!("transactions/by_version/{}", version)));
        let result = self.send::<RestTransaction>(request).await;
        metrics::record_upstream_request("node_transaction_by_version", result.is_ok());

        Ok(result?.sender)
    }
}
