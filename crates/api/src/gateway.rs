//! Lending-market gateway client.
//!
//! Reads are plain GETs; deposit and borrow are POSTs that the gateway
//! signs and executes before answering with the transaction digest.

use crate::types::{
    BorrowRequest, DepositRequest, MarketResponse, ObligationDetail, ObligationSummary,
    TransactionResponse,
};
use serde::de::DeserializeOwned;
use std::time::Duration;
use thiserror::Error;
use tracing::{debug, info, instrument};

/// Gateway call failures.
#[derive(Debug, Error)]
pub enum GatewayError {
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    #[error("gateway returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("decode error: {0}")]
    Decode(String),
}

impl GatewayError {
    /// Whether the request timed out before a response arrived.
    pub fn is_timeout(&self) -> bool {
        matches!(self, Self::Http(e) if e.is_timeout())
    }
}

/// Gateway HTTP client.
pub struct GatewayClient {
    client: reqwest::Client,
    base_url: String,
}

impl std::fmt::Debug for GatewayClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GatewayClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl GatewayClient {
    /// Create a client for `base_url` with a per-request timeout.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, GatewayError> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        let client = reqwest::Client::builder().timeout(timeout).build()?;

        info!(base_url = %base_url, "Gateway client initialized");

        Ok(Self { client, base_url })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// List the obligations owned by `owner`, in gateway order.
    #[instrument(skip(self))]
    pub async fn list_obligations(&self, owner: &str) -> Result<Vec<ObligationSummary>, GatewayError> {
        let url = format!("{}/obligations", self.base_url);
        let response = self.client.get(&url).query(&[("owner", owner)]).send().await?;
        let obligations: Vec<ObligationSummary> = Self::read_json(response).await?;

        debug!(count = obligations.len(), "Fetched obligations");
        Ok(obligations)
    }

    /// Fetch collateral and debt entries of one obligation.
    #[instrument(skip(self))]
    pub async fn get_obligation(&self, obligation_id: &str) -> Result<ObligationDetail, GatewayError> {
        let url = format!("{}/obligations/{}", self.base_url, obligation_id);
        let response = self.client.get(&url).send().await?;
        let detail: ObligationDetail = Self::read_json(response).await?;

        debug!(
            collaterals = detail.collaterals.len(),
            debts = detail.debts.len(),
            "Fetched obligation"
        );
        Ok(detail)
    }

    /// Fetch the market snapshot.
    #[instrument(skip(self))]
    pub async fn get_market(&self) -> Result<MarketResponse, GatewayError> {
        let url = format!("{}/market", self.base_url);
        let response = self.client.get(&url).send().await?;
        let market: MarketResponse = Self::read_json(response).await?;

        debug!(
            assets = market.assets.len(),
            collaterals = market.collaterals.len(),
            "Fetched market snapshot"
        );
        Ok(market)
    }

    /// Deposit collateral into an obligation.
    #[instrument(skip(self, request), fields(coin = request.coin, amount = request.amount))]
    pub async fn deposit_collateral(
        &self,
        request: &DepositRequest<'_>,
    ) -> Result<TransactionResponse, GatewayError> {
        let url = format!("{}/collateral/deposit", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let tx: TransactionResponse = Self::read_json(response).await?;

        info!(digest = %tx.digest, obligation = request.obligation_id, "Collateral deposit executed");
        Ok(tx)
    }

    /// Borrow against an obligation.
    #[instrument(skip(self, request), fields(coin = request.coin, amount = request.amount))]
    pub async fn borrow(&self, request: &BorrowRequest<'_>) -> Result<TransactionResponse, GatewayError> {
        let url = format!("{}/borrow", self.base_url);
        let response = self.client.post(&url).json(request).send().await?;
        let tx: TransactionResponse = Self::read_json(response).await?;

        info!(digest = %tx.digest, obligation = request.obligation_id, "Borrow executed");
        Ok(tx)
    }

    async fn read_json<T: DeserializeOwned>(response: reqwest::Response) -> Result<T, GatewayError> {
        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(GatewayError::Status {
                status: status.as_u16(),
                body,
            });
        }
        serde_json::from_str(&body).map_err(|e| GatewayError::Decode(e.to_string()))
    }
}
