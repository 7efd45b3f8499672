//! In-memory lending market for loop tests.

use async_trait::async_trait;
use leverage_chain::{
    AssetMarketRecord, ChainError, CoinMetadata, CoinType, CollateralEntry, CollateralPoolRecord,
    DebtEntry, LendingMarket, MarketSnapshot, Obligation, ObligationRef, SuiAddress,
    TransactionDigest,
};
use parking_lot::Mutex;
use rust_decimal::Decimal;
use rust_decimal_macros::dec;
use serde_json::{json, Value};
use std::collections::HashMap;
use std::time::Duration;

pub const USDC: &str = "0x5d4b302506645c37ff133b98c4b50a5ae14841659738d6d733d59d0d217a93bf::coin::COIN";
pub const SUI: &str = "0x2::sui::SUI";

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedBorrow {
    pub coin: String,
    pub amount: u64,
    pub obligation_id: String,
    pub key_id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedDeposit {
    pub coin: String,
    pub amount: u64,
    pub obligation_id: String,
}

#[derive(Debug, Default)]
struct State {
    obligations: Vec<Obligation>,
    wallet: HashMap<CoinType, u64>,
    snapshot: MarketSnapshot,
    metadata: HashMap<CoinType, CoinMetadata>,
    feeds: HashMap<String, Value>,
    symbols: HashMap<String, CoinType>,
    deposits: Vec<RecordedDeposit>,
    borrows: Vec<RecordedBorrow>,
    reject_borrows: bool,
    list_delay: Option<Duration>,
    next_digest: u64,
}

/// Market whose deposits and borrows mutate local state.
#[derive(Debug, Default)]
pub struct InMemoryMarket {
    state: Mutex<State>,
}

/// Pyth `PriceInfoObject` fields for a price of `magnitude × 10^-expo`.
pub fn pyth_fields(magnitude: u64, expo: u64) -> Value {
    json!({
        "price_info": {"fields": {"price_feed": {"fields": {"price": {"fields": {
            "price": {"fields": {"magnitude": magnitude.to_string(), "negative": false}},
            "expo": {"fields": {"magnitude": expo, "negative": true}},
        }}}}}}
    })
}

impl InMemoryMarket {
    /// USDC and SUI listed, no obligations.
    pub fn empty() -> Self {
        let market = Self::default();
        {
            let mut state = market.state.lock();
            let usdc = CoinType::new(USDC);
            let sui = CoinType::new(SUI);

            state.snapshot = MarketSnapshot {
                assets: vec![
                    asset_record("usdc", &usdc, dec!(1)),
                    asset_record("sui", &sui, dec!(1.25)),
                ],
                collaterals: vec![
                    pool_record("usdc", &usdc, dec!(0.8)),
                    pool_record("sui", &sui, dec!(0.6)),
                ],
            };
            state.metadata.insert(usdc.clone(), metadata("USDC", 6));
            state.metadata.insert(sui.clone(), metadata("SUI", 9));
            state.feeds.insert("0xfeed-usdc".into(), pyth_fields(100_000_000, 8));
            state.feeds.insert("0xfeed-sui".into(), pyth_fields(200_000_000, 8));
            state.symbols.insert("usdc".into(), usdc);
            state.symbols.insert("sui".into(), sui);
        }
        market
    }

    /// [`empty`](Self::empty) plus obligation `0xob1` holding 100 USDC.
    pub fn standard() -> Self {
        let market = Self::empty();
        market.add_obligation("0xob1", "0xkey1", USDC, 100_000_000);
        market
    }

    pub fn add_obligation(&self, id: &str, key_id: &str, coin_type: &str, amount: u64) {
        let mut obligation = Obligation::new(&ObligationRef {
            id: id.to_string(),
            key_id: key_id.to_string(),
        });
        obligation.collaterals.push(CollateralEntry {
            coin_type: CoinType::new(coin_type),
            amount,
        });
        self.state.lock().obligations.push(obligation);
    }

    pub fn add_debt(&self, obligation_id: &str, coin_type: &str, amount: u64, borrow_index: Decimal) {
        let mut state = self.state.lock();
        if let Some(obligation) = state.obligations.iter_mut().find(|o| o.id == obligation_id) {
            obligation.debts.push(DebtEntry {
                coin_type: CoinType::new(coin_type),
                amount,
                borrow_index,
            });
        }
    }

    pub fn set_wallet_balance(&self, amount: u64) {
        self.state.lock().wallet.insert(CoinType::new(USDC), amount);
    }

    pub fn reject_borrows(&self, reject: bool) {
        self.state.lock().reject_borrows = reject;
    }

    pub fn set_list_delay(&self, delay: Duration) {
        self.state.lock().list_delay = Some(delay);
    }

    pub fn deposits(&self) -> Vec<RecordedDeposit> {
        self.state.lock().deposits.clone()
    }

    pub fn borrows(&self) -> Vec<RecordedBorrow> {
        self.state.lock().borrows.clone()
    }
}

fn asset_record(coin: &str, coin_type: &CoinType, borrow_weight: Decimal) -> AssetMarketRecord {
    AssetMarketRecord {
        coin: coin.to_string(),
        coin_type: coin_type.clone(),
        borrow_weight,
        current_borrow_index: dec!(1),
    }
}

fn pool_record(coin: &str, coin_type: &CoinType, factor: Decimal) -> CollateralPoolRecord {
    CollateralPoolRecord {
        coin: coin.to_string(),
        coin_type: coin_type.clone(),
        collateral_factor: factor,
        liquidation_factor: factor + dec!(0.05),
    }
}

fn metadata(symbol: &str, decimals: u8) -> CoinMetadata {
    CoinMetadata {
        decimals,
        symbol: symbol.to_string(),
    }
}

fn digest(state: &mut State) -> TransactionDigest {
    state.next_digest += 1;
    TransactionDigest(format!("digest-{}", state.next_digest))
}

fn coin_for(state: &State, symbol: &str) -> Result<CoinType, ChainError> {
    state
        .symbols
        .get(symbol)
        .cloned()
        .ok_or_else(|| ChainError::ExecutionRejected {
            reason: format!("unknown coin {symbol}"),
        })
}

#[async_trait]
impl LendingMarket for InMemoryMarket {
    fn market_id(&self) -> &str {
        "in-memory"
    }

    async fn list_obligations(&self, _owner: &SuiAddress) -> Result<Vec<ObligationRef>, ChainError> {
        let delay = self.state.lock().list_delay;
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        Ok(self.state.lock().obligations.iter().map(Obligation::reference).collect())
    }

    async fn query_obligation(&self, obligation: &ObligationRef) -> Result<Obligation, ChainError> {
        self.state
            .lock()
            .obligations
            .iter()
            .find(|o| o.id == obligation.id)
            .cloned()
            .ok_or_else(|| ChainError::Rpc {
                code: "404".to_string(),
                message: format!("obligation {} not found", obligation.id),
            })
    }

    async fn query_market_snapshot(&self) -> Result<MarketSnapshot, ChainError> {
        Ok(self.state.lock().snapshot.clone())
    }

    async fn get_coin_metadata(&self, coin_type: &CoinType) -> Result<Option<CoinMetadata>, ChainError> {
        Ok(self.state.lock().metadata.get(coin_type).cloned())
    }

    async fn get_price_feed_object(&self, feed_id: &str) -> Result<Option<Value>, ChainError> {
        Ok(self.state.lock().feeds.get(feed_id).cloned())
    }

    async fn get_balance(&self, _owner: &SuiAddress, coin_type: &CoinType) -> Result<u64, ChainError> {
        Ok(self.state.lock().wallet.get(coin_type).copied().unwrap_or(0))
    }

    async fn submit_deposit_collateral(
        &self,
        coin_symbol: &str,
        amount: u64,
        _raw_units: bool,
        obligation_id: &str,
    ) -> Result<TransactionDigest, ChainError> {
        let mut state = self.state.lock();
        let coin_type = coin_for(&state, coin_symbol)?;
        let balance = state.wallet.entry(coin_type.clone()).or_default();
        *balance = balance.checked_sub(amount).ok_or_else(|| ChainError::ExecutionRejected {
            reason: "insufficient balance".into(),
        })?;

        let obligation = state
            .obligations
            .iter_mut()
            .find(|o| o.id == obligation_id)
            .ok_or_else(|| ChainError::ExecutionRejected {
                reason: format!("obligation {obligation_id} not found"),
            })?;
        match obligation.collaterals.iter_mut().find(|c| c.coin_type == coin_type) {
            Some(entry) => entry.amount += amount,
            None => obligation.collaterals.push(CollateralEntry { coin_type, amount }),
        }

        state.deposits.push(RecordedDeposit {
            coin: coin_symbol.to_string(),
            amount,
            obligation_id: obligation_id.to_string(),
        });
        Ok(digest(&mut state))
    }

    async fn submit_borrow(
        &self,
        coin_symbol: &str,
        amount: u64,
        _raw_units: bool,
        obligation_id: &str,
        key_id: &str,
    ) -> Result<TransactionDigest, ChainError> {
        let mut state = self.state.lock();
        if state.reject_borrows {
            return Err(ChainError::ExecutionRejected {
                reason: "borrow rejected".into(),
            });
        }
        let coin_type = coin_for(&state, coin_symbol)?;

        let obligation = state
            .obligations
            .iter_mut()
            .find(|o| o.id == obligation_id && o.key_id == key_id)
            .ok_or_else(|| ChainError::ExecutionRejected {
                reason: format!("obligation {obligation_id} not owned by key {key_id}"),
            })?;
        match obligation.debts.iter_mut().find(|d| d.coin_type == coin_type) {
            Some(entry) => entry.amount += amount,
            None => obligation.debts.push(DebtEntry {
                coin_type: coin_type.clone(),
                amount,
                borrow_index: dec!(1),
            }),
        }
        *state.wallet.entry(coin_type).or_default() += amount;

        state.borrows.push(RecordedBorrow {
            coin: coin_symbol.to_string(),
            amount,
            obligation_id: obligation_id.to_string(),
            key_id: key_id.to_string(),
        });
        Ok(digest(&mut state))
    }
}
