//! Sui full-node JSON-RPC reader.
//! Covers the generic ledger reads: objects, coin metadata and balances.

use crate::protocol::{CoinMetadata, CoinType, SuiAddress};
use crate::ChainError;
use serde::Deserialize;
use serde_json::{json, Value};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;
use tracing::{debug, info, instrument};

/// JSON-RPC response envelope.
#[derive(Debug, Deserialize)]
struct RpcResponse {
    #[serde(default)]
    result: Option<Value>,
    #[serde(default)]
    error: Option<RpcErrorBody>,
}

#[derive(Debug, Deserialize)]
struct RpcErrorBody {
    code: i64,
    message: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct CoinMetadataResponse {
    decimals: u8,
    #[serde(default)]
    symbol: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct BalanceResponse {
    total_balance: String,
}

/// Sui JSON-RPC client.
#[derive(Debug)]
pub struct SuiRpcClient {
    client: reqwest::Client,
    url: String,
    timeout: Duration,
    next_id: AtomicU64,
}

impl SuiRpcClient {
    /// Create a client for `url` with a per-request timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ChainError> {
        let url = url.into();
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        info!(url = %url, timeout_ms = timeout.as_millis() as u64, "Sui RPC client initialized");

        Ok(Self {
            client,
            url,
            timeout,
            next_id: AtomicU64::new(1),
        })
    }

    /// Get the RPC URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Issue one JSON-RPC call and return its `result`.
    async fn call(&self, method: &str, params: Value) -> Result<Value, ChainError> {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed);
        let body = json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        });

        debug!(method, id, "Sending JSON-RPC request");

        let response = self
            .client
            .post(&self.url)
            .json(&body)
            .send()
            .await
            .map_err(|e| self.map_transport(e))?;

        let status = response.status();
        if !status.is_success() {
            return Err(ChainError::Rpc {
                code: status.as_u16().to_string(),
                message: format!("{method} returned HTTP {status}"),
            });
        }

        let envelope: RpcResponse = response.json().await.map_err(|e| self.map_transport(e))?;
        if let Some(err) = envelope.error {
            return Err(ChainError::Rpc {
                code: err.code.to_string(),
                message: err.message,
            });
        }

        Ok(envelope.result.unwrap_or(Value::Null))
    }

    fn map_transport(&self, err: reqwest::Error) -> ChainError {
        if err.is_timeout() {
            ChainError::Timeout(self.timeout)
        } else {
            ChainError::from(err)
        }
    }

    /// Fetch an object's Move fields. `None` when the object does not exist.
    #[instrument(skip(self))]
    pub async fn get_object_fields(&self, object_id: &str) -> Result<Option<Value>, ChainError> {
        let result = self
            .call("sui_getObject", json!([object_id, { "showContent": true }]))
            .await?;

        if let Some(code) = result.pointer("/error/code").and_then(Value::as_str) {
            if code == "notExists" || code == "deleted" {
                debug!(object_id, code, "Object not available");
                return Ok(None);
            }
            return Err(ChainError::Rpc {
                code: code.to_string(),
                message: format!("sui_getObject failed for {object_id}"),
            });
        }

        result
            .pointer("/data/content/fields")
            .cloned()
            .map(Some)
            .ok_or_else(|| ChainError::decode(format!("object {object_id} has no Move content")))
    }

    /// Fetch coin metadata. `None` when the coin type is unknown.
    #[instrument(skip(self), fields(coin_type = %coin_type))]
    pub async fn get_coin_metadata(
        &self,
        coin_type: &CoinType,
    ) -> Result<Option<CoinMetadata>, ChainError> {
        let result = self
            .call("suix_getCoinMetadata", json!([coin_type.as_str()]))
            .await?;
        if result.is_null() {
            return Ok(None);
        }

        let metadata: CoinMetadataResponse = serde_json::from_value(result)?;
        Ok(Some(CoinMetadata {
            decimals: metadata.decimals,
            symbol: metadata.symbol,
        }))
    }

    /// Total wallet balance of `coin_type` in smallest units.
    #[instrument(skip(self), fields(owner = %owner, coin_type = %coin_type))]
    pub async fn get_balance(
        &self,
        owner: &SuiAddress,
        coin_type: &CoinType,
    ) -> Result<u64, ChainError> {
        let result = self
            .call(
                "suix_getBalance",
                json!([owner.to_string(), coin_type.as_str()]),
            )
            .await?;

        let balance: BalanceResponse = serde_json::from_value(result)?;
        let total: u128 = balance
            .total_balance
            .parse()
            .map_err(|e| ChainError::decode(format!("totalBalance '{}': {e}", balance.total_balance)))?;
        u64::try_from(total)
            .map_err(|_| ChainError::decode(format!("balance {total} exceeds u64 range")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{body_partial_json, method};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn client_for(server: &MockServer) -> SuiRpcClient {
        SuiRpcClient::new(server.uri(), Duration::from_secs(5)).unwrap()
    }

    fn rpc_result(result: Value) -> ResponseTemplate {
        ResponseTemplate::new(200).set_body_json(json!({
            "jsonrpc": "2.0",
            "id": 1,
            "result": result,
        }))
    }

    #[tokio::test]
    async fn test_get_object_fields() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "sui_getObject" })))
            .respond_with(rpc_result(json!({
                "data": {
                    "objectId": "0xfeed",
                    "content": {
                        "dataType": "moveObject",
                        "type": "0x8d97::price_info::PriceInfoObject",
                        "fields": { "price_info": { "fields": {} } }
                    }
                }
            })))
            .mount(&server)
            .await;

        let fields = client_for(&server)
            .await
            .get_object_fields("0xfeed")
            .await
            .unwrap()
            .unwrap();
        assert!(fields.get("price_info").is_some());
    }

    #[tokio::test]
    async fn test_missing_object_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(json!({
                "error": { "code": "notExists", "object_id": "0xdead" }
            })))
            .mount(&server)
            .await;

        let fields = client_for(&server)
            .await
            .get_object_fields("0xdead")
            .await
            .unwrap();
        assert!(fields.is_none());
    }

    #[tokio::test]
    async fn test_get_coin_metadata() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getCoinMetadata" })))
            .respond_with(rpc_result(json!({
                "decimals": 6,
                "name": "USD Coin",
                "symbol": "USDC",
                "description": "",
                "iconUrl": null,
                "id": "0x4fbf"
            })))
            .mount(&server)
            .await;

        let metadata = client_for(&server)
            .await
            .get_coin_metadata(&CoinType::new("0x5d4b::coin::COIN"))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(metadata.decimals, 6);
        assert_eq!(metadata.symbol, "USDC");
    }

    #[tokio::test]
    async fn test_unknown_coin_metadata_is_none() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(rpc_result(Value::Null))
            .mount(&server)
            .await;

        let metadata = client_for(&server)
            .await
            .get_coin_metadata(&CoinType::new("0x1::fake::FAKE"))
            .await
            .unwrap();
        assert!(metadata.is_none());
    }

    #[tokio::test]
    async fn test_get_balance() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getBalance" })))
            .respond_with(rpc_result(json!({
                "coinType": "0x5d4b::coin::COIN",
                "coinObjectCount": 2,
                "totalBalance": "1250000",
                "lockedBalance": {}
            })))
            .mount(&server)
            .await;

        let balance = client_for(&server)
            .await
            .get_balance(&SuiAddress::repeat_byte(1), &CoinType::new("0x5d4b::coin::COIN"))
            .await
            .unwrap();
        assert_eq!(balance, 1_250_000);
    }

    #[tokio::test]
    async fn test_rpc_error_is_surfaced() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "error": { "code": -32602, "message": "Invalid params" }
            })))
            .mount(&server)
            .await;

        let err = client_for(&server)
            .await
            .get_balance(&SuiAddress::ZERO, &CoinType::new("0x2::sui::SUI"))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Rpc { ref code, .. } if code == "-32602"));
    }
}
