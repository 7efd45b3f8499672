//! Scallop lending market adapter.
//!
//! Composes the Sui JSON-RPC reader (feed objects, coin metadata, wallet
//! balance) with the gateway client (obligations, market snapshot,
//! deposit and borrow) behind [`LendingMarket`].

use async_trait::async_trait;
use leverage_api::{
    BorrowRequest, DepositRequest, GatewayClient, GatewayError, MarketResponse, ObligationDetail,
};
use leverage_chain::{
    AssetMarketRecord, ChainError, CoinMetadata, CoinType, CollateralEntry, CollateralPoolRecord,
    DebtEntry, LendingMarket, MarketSnapshot, Obligation, ObligationRef, SuiAddress, SuiRpcClient,
    TransactionDigest,
};
use serde_json::Value;
use std::time::Duration;
use tracing::{info, instrument};

/// Lending market backed by a Sui full node and the signing gateway.
pub struct ScallopMarket {
    id: String,
    rpc: SuiRpcClient,
    gateway: GatewayClient,
    timeout: Duration,
}

impl std::fmt::Debug for ScallopMarket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ScallopMarket")
            .field("id", &self.id)
            .field("rpc", &self.rpc.url())
            .field("gateway", &self.gateway.base_url())
            .finish()
    }
}

impl ScallopMarket {
    /// Connect both transports with the same per-request timeout.
    pub fn new(
        id: impl Into<String>,
        rpc_url: &str,
        gateway_url: &str,
        timeout: Duration,
    ) -> Result<Self, ChainError> {
        let id = id.into();
        let rpc = SuiRpcClient::new(rpc_url, timeout)?;
        let gateway = GatewayClient::new(gateway_url, timeout)
            .map_err(|e| ChainError::Transport(e.to_string()))?;

        info!(market = %id, "Lending market adapter ready");

        Ok(Self {
            id,
            rpc,
            gateway,
            timeout,
        })
    }

    /// Map a gateway failure on a read.
    fn read_error(&self, err: GatewayError) -> ChainError {
        match err {
            e if e.is_timeout() => ChainError::Timeout(self.timeout),
            GatewayError::Http(e) => ChainError::from(e),
            GatewayError::Status { status, body } => ChainError::Rpc {
                code: status.to_string(),
                message: body,
            },
            GatewayError::Decode(msg) => ChainError::Decode(msg),
        }
    }

    /// Map a gateway failure on a submission. Non-2xx answers are rejections.
    fn submit_error(&self, err: GatewayError) -> ChainError {
        match err {
            GatewayError::Status { status, body } => ChainError::ExecutionRejected {
                reason: format!("{status}: {body}"),
            },
            other => self.read_error(other),
        }
    }
}

fn obligation_from_detail(reference: &ObligationRef, detail: ObligationDetail) -> Obligation {
    let mut obligation = Obligation::new(reference);
    obligation.collaterals = detail
        .collaterals
        .into_iter()
        .map(|c| CollateralEntry {
            coin_type: CoinType::new(&c.coin_type.name),
            amount: c.amount,
        })
        .collect();
    obligation.debts = detail
        .debts
        .into_iter()
        .map(|d| DebtEntry {
            coin_type: CoinType::new(&d.coin_type.name),
            amount: d.amount,
            borrow_index: d.borrow_index,
        })
        .collect();
    obligation
}

fn snapshot_from_market(market: MarketResponse) -> MarketSnapshot {
    MarketSnapshot {
        assets: market
            .assets
            .into_iter()
            .map(|a| AssetMarketRecord {
                coin_type: CoinType::new(&a.coin_type),
                coin: a.coin,
                borrow_weight: a.origin.borrow_weight,
                current_borrow_index: a.calculated.current_borrow_index,
            })
            .collect(),
        collaterals: market
            .collaterals
            .into_iter()
            .map(|c| CollateralPoolRecord {
                coin_type: CoinType::new(&c.coin_type),
                coin: c.coin,
                collateral_factor: c.origin.collateral_factor,
                liquidation_factor: c.origin.liquidation_factor,
            })
            .collect(),
    }
}

#[async_trait]
impl LendingMarket for ScallopMarket {
    fn market_id(&self) -> &str {
        &self.id
    }

    #[instrument(skip(self))]
    async fn list_obligations(&self, owner: &SuiAddress) -> Result<Vec<ObligationRef>, ChainError> {
        let summaries = self
            .gateway
            .list_obligations(&owner.to_string())
            .await
            .map_err(|e| self.read_error(e))?;
        Ok(summaries
            .into_iter()
            .map(|s| ObligationRef {
                id: s.id,
                key_id: s.key_id,
            })
            .collect())
    }

    #[instrument(skip(self), fields(obligation = %obligation.id))]
    async fn query_obligation(&self, obligation: &ObligationRef) -> Result<Obligation, ChainError> {
        let detail = self
            .gateway
            .get_obligation(&obligation.id)
            .await
            .map_err(|e| self.read_error(e))?;
        Ok(obligation_from_detail(obligation, detail))
    }

    async fn query_market_snapshot(&self) -> Result<MarketSnapshot, ChainError> {
        let market = self
            .gateway
            .get_market()
            .await
            .map_err(|e| self.read_error(e))?;
        Ok(snapshot_from_market(market))
    }

    async fn get_coin_metadata(
        &self,
        coin_type: &CoinType,
    ) -> Result<Option<CoinMetadata>, ChainError> {
        self.rpc.get_coin_metadata(coin_type).await
    }

    async fn get_price_feed_object(&self, feed_id: &str) -> Result<Option<Value>, ChainError> {
        self.rpc.get_object_fields(feed_id).await
    }

    async fn get_balance(&self, owner: &SuiAddress, coin_type: &CoinType) -> Result<u64, ChainError> {
        self.rpc.get_balance(owner, coin_type).await
    }

    async fn submit_deposit_collateral(
        &self,
        coin_symbol: &str,
        amount: u64,
        raw_units: bool,
        obligation_id: &str,
    ) -> Result<TransactionDigest, ChainError> {
        let request = DepositRequest {
            coin: coin_symbol,
            amount,
            raw_units,
            obligation_id,
        };
        let tx = self
            .gateway
            .deposit_collateral(&request)
            .await
            .map_err(|e| self.submit_error(e))?;
        Ok(TransactionDigest(tx.digest))
    }

    async fn submit_borrow(
        &self,
        coin_symbol: &str,
        amount: u64,
        raw_units: bool,
        obligation_id: &str,
        key_id: &str,
    ) -> Result<TransactionDigest, ChainError> {
        let request = BorrowRequest {
            coin: coin_symbol,
            amount,
            raw_units,
            obligation_id,
            obligation_key: key_id,
        };
        let tx = self
            .gateway
            .borrow(&request)
            .await
            .map_err(|e| self.submit_error(e))?;
        Ok(TransactionDigest(tx.digest))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;
    use wiremock::matchers::{body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    async fn market_for(rpc: &MockServer, gateway: &MockServer) -> ScallopMarket {
        ScallopMarket::new("scallop-test", &rpc.uri(), &gateway.uri(), Duration::from_secs(5)).unwrap()
    }

    fn reference() -> ObligationRef {
        ObligationRef {
            id: "0xob1".to_string(),
            key_id: "0xkey1".to_string(),
        }
    }

    #[tokio::test]
    async fn test_obligation_coin_types_are_prefixed() {
        let rpc = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/obligations/0xob1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "collaterals": [{ "type": { "name": "5d4b::coin::COIN" }, "amount": "2000000" }],
                "debts": [{ "type": { "name": "2::sui::SUI" }, "amount": 10, "borrowIndex": "1.01" }]
            })))
            .mount(&gateway)
            .await;

        let obligation = market_for(&rpc, &gateway)
            .await
            .query_obligation(&reference())
            .await
            .unwrap();
        assert_eq!(obligation.key_id, "0xkey1");
        assert_eq!(obligation.collaterals[0].coin_type.as_str(), "0x5d4b::coin::COIN");
        assert_eq!(obligation.debts[0].coin_type, CoinType::new("0x2::sui::SUI"));
        assert_eq!(obligation.debts[0].borrow_index, dec!(1.01));
    }

    #[tokio::test]
    async fn test_market_snapshot_mapping() {
        let rpc = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/market"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "assets": [{
                    "coin": "usdc",
                    "coinType": "0x5d4b::coin::COIN",
                    "origin": { "borrowWeight": "1" },
                    "calculated": { "currentBorrowIndex": "1.0312" }
                }],
                "collaterals": [{
                    "coin": "usdc",
                    "coinType": "0x5d4b::coin::COIN",
                    "origin": { "collateralFactor": "0.85", "liquidationFactor": "0.9" }
                }]
            })))
            .mount(&gateway)
            .await;

        let snapshot = market_for(&rpc, &gateway)
            .await
            .query_market_snapshot()
            .await
            .unwrap();
        assert_eq!(snapshot.assets[0].coin, "usdc");
        assert_eq!(snapshot.assets[0].current_borrow_index, dec!(1.0312));
        assert_eq!(snapshot.collaterals[0].collateral_factor, dec!(0.85));
    }

    #[tokio::test]
    async fn test_read_status_is_fetch_error() {
        let rpc = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/obligations"))
            .respond_with(ResponseTemplate::new(503).set_body_string("unavailable"))
            .mount(&gateway)
            .await;

        let err = market_for(&rpc, &gateway)
            .await
            .list_obligations(&SuiAddress::repeat_byte(7))
            .await
            .unwrap_err();
        assert!(matches!(err, ChainError::Rpc { ref code, .. } if code == "503"));
        assert!(!err.is_execution_failure());
    }

    #[tokio::test]
    async fn test_rejected_borrow_is_execution_failure() {
        let rpc = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/borrow"))
            .and(body_partial_json(json!({ "obligationKey": "0xkey1", "rawUnits": true })))
            .respond_with(ResponseTemplate::new(400).set_body_string("borrow exceeds limit"))
            .mount(&gateway)
            .await;

        let err = market_for(&rpc, &gateway)
            .await
            .submit_borrow("usdc", 5, true, "0xob1", "0xkey1")
            .await
            .unwrap_err();
        assert!(err.is_execution_failure());
    }

    #[tokio::test]
    async fn test_deposit_returns_digest() {
        let rpc = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/collateral/deposit"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "digest": "8xDigest" })))
            .mount(&gateway)
            .await;

        let digest = market_for(&rpc, &gateway)
            .await
            .submit_deposit_collateral("usdc", 1_000_000, true, "0xob1")
            .await
            .unwrap();
        assert_eq!(digest, TransactionDigest("8xDigest".to_string()));
    }

    #[tokio::test]
    async fn test_balance_goes_through_rpc() {
        let rpc = MockServer::start().await;
        let gateway = MockServer::start().await;
        Mock::given(method("POST"))
            .and(body_partial_json(json!({ "method": "suix_getBalance" })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "jsonrpc": "2.0",
                "id": 1,
                "result": { "coinType": "0x5d4b::coin::COIN", "totalBalance": "750000" }
            })))
            .mount(&rpc)
            .await;

        let balance = market_for(&rpc, &gateway)
            .await
            .get_balance(&SuiAddress::repeat_byte(1), &CoinType::new("0x5d4b::coin::COIN"))
            .await
            .unwrap();
        assert_eq!(balance, 750_000);
    }
}
