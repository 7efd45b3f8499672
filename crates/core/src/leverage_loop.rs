//! Deposit-then-borrow leverage loop.
//!
//! Each cycle selects an obligation, deposits the wallet's balance of the
//! deposit asset, re-values the obligation and borrows the sized amount of
//! the borrow asset. Every network call is bounded by the configured RPC
//! timeout and aborted as soon as the stop signal fires.

use crate::assets::{Asset, AssetRegistry};
use crate::config::{BotConfig, CycleConfig};
use crate::market::{fetch_market_data, MarketData};
use crate::selector::{select_obligation, SelectionPolicy};
use crate::sizing::{size_borrow, SizingParams};
use crate::valuator::{collateral_value, valuate, PositionValuator, Valuation};
use crate::{CycleError, ValuationError};
use chrono::{DateTime, Utc};
use leverage_chain::{
    ChainError, LendingMarket, Obligation, ObligationRef, PriceReader, SuiAddress,
    TransactionDigest,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tracing::{debug, error, info, instrument, warn};

/// Cloneable cancellation flag shared by the loop and whoever stops it.
#[derive(Debug, Clone)]
pub struct StopSignal {
    tx: Arc<watch::Sender<bool>>,
    rx: watch::Receiver<bool>,
}

impl StopSignal {
    pub fn new() -> Self {
        let (tx, rx) = watch::channel(false);
        Self {
            tx: Arc::new(tx),
            rx,
        }
    }

    /// Request the loop to stop. Idempotent.
    pub fn stop(&self) {
        self.tx.send_replace(true);
    }

    pub fn is_stopped(&self) -> bool {
        *self.rx.borrow()
    }

    /// Resolves once [`stop`](Self::stop) has been called.
    pub async fn stopped(&self) {
        let mut rx = self.rx.clone();
        if rx.wait_for(|stopped| *stopped).await.is_err() {
            std::future::pending::<()>().await;
        }
    }
}

impl Default for StopSignal {
    fn default() -> Self {
        Self::new()
    }
}

/// Outcome of one successful cycle.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CycleReport {
    pub iteration: u64,
    pub obligation_id: String,
    pub deposit_digest: Option<TransactionDigest>,
    pub deposited_raw: u64,
    pub borrow_digest: Option<TransactionDigest>,
    pub borrowed_raw: u64,
    pub available_capacity: Decimal,
    pub skipped_collateral: usize,
    pub completed_at: DateTime<Utc>,
}

/// Totals over a whole run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LoopSummary {
    /// Cycles attempted
    pub iterations: u64,
    /// Cycles that completed
    pub completed: u64,
    pub total_deposited_raw: u64,
    pub total_borrowed_raw: u64,
    pub last_report: Option<CycleReport>,
}

/// Linear backoff `base × failures`, saturating at `Duration::MAX`.
fn backoff_delay(base: Duration, failures: u32) -> Duration {
    base.saturating_mul(failures)
}

/// The leverage loop.
pub struct LeverageLoop {
    market: Arc<dyn LendingMarket>,
    oracle: Arc<dyn PriceReader>,
    valuator: PositionValuator,
    owner: SuiAddress,
    deposit_asset: Asset,
    borrow_asset: Asset,
    min_deposit_raw: u64,
    policy: SelectionPolicy,
    sizing: SizingParams,
    cycle: CycleConfig,
    stop: StopSignal,
}

impl std::fmt::Debug for LeverageLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LeverageLoop")
            .field("market", &self.market.market_id())
            .field("owner", &self.owner)
            .field("deposit", &self.deposit_asset.symbol)
            .field("borrow", &self.borrow_asset.symbol)
            .field("policy", &self.policy)
            .finish()
    }
}

impl LeverageLoop {
    /// Wire the loop. Fails when the strategy names an asset the registry lacks.
    pub fn new(
        market: Arc<dyn LendingMarket>,
        oracle: Arc<dyn PriceReader>,
        registry: &AssetRegistry,
        owner: SuiAddress,
        config: &BotConfig,
        stop: StopSignal,
    ) -> Result<Self, CycleError> {
        let lookup = |symbol: &str| {
            registry
                .get_by_symbol(symbol)
                .cloned()
                .ok_or_else(|| CycleError::Config(format!("asset '{symbol}' not in registry")))
        };
        let deposit_asset = lookup(&config.strategy.deposit_asset)?;
        let borrow_asset = lookup(&config.strategy.borrow_asset)?;

        Ok(Self {
            valuator: PositionValuator::new(market.clone(), oracle.clone()),
            market,
            oracle,
            owner,
            deposit_asset,
            borrow_asset,
            min_deposit_raw: config.strategy.min_deposit_raw,
            policy: config.selection.policy,
            sizing: SizingParams::from(&config.sizing),
            cycle: config.cycle.clone(),
            stop,
        })
    }

    pub fn stop_signal(&self) -> StopSignal {
        self.stop.clone()
    }

    /// Await `fut` under the RPC timeout, giving up early on stop.
    async fn guarded<T, F>(&self, operation: &'static str, fut: F) -> Result<T, CycleError>
    where
        F: Future<Output = Result<T, ChainError>>,
    {
        tokio::select! {
            biased;
            _ = self.stop.stopped() => Err(CycleError::Cancelled),
            result = tokio::time::timeout(self.cycle.rpc_timeout(), fut) => match result {
                Ok(inner) => inner.map_err(CycleError::from),
                Err(_) => {
                    warn!(operation, timeout_ms = self.cycle.rpc_timeout_ms, "Call timed out");
                    Err(CycleError::Timeout { operation })
                }
            },
        }
    }

    /// Sleep for `duration`. Returns `true` if stopped meanwhile.
    async fn pause(&self, duration: Duration) -> bool {
        if duration.is_zero() {
            return self.stop.is_stopped();
        }
        tokio::select! {
            _ = self.stop.stopped() => true,
            _ = tokio::time::sleep(duration) => false,
        }
    }

    async fn fetch_obligations(&self) -> Result<Vec<Obligation>, CycleError> {
        let refs = self
            .guarded("list_obligations", self.market.list_obligations(&self.owner))
            .await?;
        let mut obligations = Vec::with_capacity(refs.len());
        for reference in &refs {
            let obligation = self
                .guarded("query_obligation", self.market.query_obligation(reference))
                .await?;
            obligations.push(obligation);
        }
        debug!(count = obligations.len(), "Obligations fetched");
        Ok(obligations)
    }

    /// Pick the obligation to operate on. Market data is fetched only when
    /// the policy values candidates and is returned for reuse.
    async fn select(&self) -> Result<(ObligationRef, Option<MarketData>), CycleError> {
        let obligations = self.fetch_obligations().await?;

        let mut market_data = None;
        let mut values: HashMap<String, Decimal> = HashMap::new();
        if self.policy.needs_valuation() {
            let data = self
                .guarded("market_data", fetch_market_data(self.market.as_ref()))
                .await?;
            for obligation in obligations.iter().filter(|o| o.has_collateral()) {
                let inputs = self
                    .guarded("valuation_inputs", self.valuator.gather(obligation))
                    .await?;
                let value = collateral_value(obligation, &data, &inputs)
                    .map_err(ValuationError::from)?;
                values.insert(obligation.id.clone(), value);
            }
            market_data = Some(data);
        }

        let selected = select_obligation(self.policy, &obligations, |o| {
            values.get(&o.id).copied().unwrap_or(Decimal::ZERO)
        })
        .ok_or(CycleError::NoEligibleObligation)?;

        info!(obligation = %selected.id, policy = %self.policy, "Obligation selected");
        Ok((selected.reference(), market_data))
    }

    /// Deposit the whole wallet balance when it exceeds the configured minimum.
    async fn deposit(&self, obligation: &ObligationRef) -> Result<(Option<TransactionDigest>, u64), CycleError> {
        let asset = &self.deposit_asset;
        let balance = self
            .guarded("get_balance", self.market.get_balance(&self.owner, &asset.coin_type))
            .await?;

        if balance <= self.min_deposit_raw {
            debug!(balance, min = self.min_deposit_raw, "Wallet balance below deposit minimum");
            return Ok((None, 0));
        }

        let digest = self
            .guarded(
                "deposit_collateral",
                self.market
                    .submit_deposit_collateral(&asset.symbol, balance, true, &obligation.id),
            )
            .await?;
        info!(obligation = %obligation.id, coin = %asset.symbol, amount = balance, digest = %digest, "Collateral deposited");
        Ok((Some(digest), balance))
    }

    /// Size the borrow for `valuation` in the borrow asset.
    async fn size(&self, valuation: &Valuation, market: &MarketData) -> Result<u64, CycleError> {
        let asset = &self.borrow_asset;
        let unavailable = |missing: &'static str| {
            CycleError::Valuation(ValuationError::DebtDataUnavailable {
                coin_type: asset.coin_type.clone(),
                missing,
            })
        };

        let (quote, metadata) = self
            .guarded("borrow_asset_inputs", async {
                futures::try_join!(
                    self.oracle.get_price(&asset.coin_type),
                    self.market.get_coin_metadata(&asset.coin_type),
                )
            })
            .await?;
        let price = quote.price().ok_or_else(|| unavailable("price"))?;
        let decimals = metadata.map(|m| m.decimals).ok_or_else(|| unavailable("coin metadata"))?;
        let weight = market
            .asset(&asset.coin_type)
            .map(|a| a.borrow_weight)
            .ok_or_else(|| unavailable("asset market record"))?;

        let amount = size_borrow(valuation.available_capacity, price, weight, decimals, &self.sizing)?;
        debug!(
            capacity = %valuation.available_capacity,
            price = %price,
            borrow_weight = %weight,
            decimals,
            amount,
            "Borrow sized"
        );
        Ok(amount)
    }

    /// Run one deposit/borrow cycle.
    #[instrument(skip(self))]
    pub async fn run_cycle(&self, iteration: u64) -> Result<CycleReport, CycleError> {
        if self.stop.is_stopped() {
            return Err(CycleError::Cancelled);
        }

        let (reference, preloaded) = self.select().await?;
        let (deposit_digest, deposited_raw) = self.deposit(&reference).await?;

        let obligation = self
            .guarded("query_obligation", self.market.query_obligation(&reference))
            .await?;
        let market_data = match preloaded {
            Some(data) if deposited_raw == 0 => data,
            _ => {
                self.guarded("market_data", fetch_market_data(self.market.as_ref()))
                    .await?
            }
        };

        let inputs = self
            .guarded("valuation_inputs", self.valuator.gather(&obligation))
            .await?;
        let valuation = valuate(&obligation, &market_data, &inputs)?;

        let amount = self.size(&valuation, &market_data).await?;
        let borrow_digest = if amount > 0 {
            let digest = self
                .guarded(
                    "borrow",
                    self.market.submit_borrow(
                        &self.borrow_asset.symbol,
                        amount,
                        true,
                        &obligation.id,
                        &obligation.key_id,
                    ),
                )
                .await?;
            info!(obligation = %obligation.id, coin = %self.borrow_asset.symbol, amount, digest = %digest, "Borrow executed");
            Some(digest)
        } else {
            info!(obligation = %obligation.id, capacity = %valuation.available_capacity, "No borrow capacity above buffer");
            None
        };

        Ok(CycleReport {
            iteration,
            obligation_id: obligation.id,
            deposit_digest,
            deposited_raw,
            borrow_digest,
            borrowed_raw: amount,
            available_capacity: valuation.available_capacity,
            skipped_collateral: valuation.skipped.len(),
            completed_at: Utc::now(),
        })
    }

    /// Run cycles until stopped, the iteration cap is reached or a failure
    /// exhausts the retry budget.
    pub async fn run(&self) -> Result<LoopSummary, CycleError> {
        info!(
            market = self.market.market_id(),
            owner = %self.owner,
            max_iterations = ?self.cycle.max_iterations,
            "Starting leverage loop"
        );

        let mut summary = LoopSummary::default();
        let mut consecutive_failures: u32 = 0;

        loop {
            if self.stop.is_stopped() {
                info!("Stop requested");
                break;
            }
            if self
                .cycle
                .max_iterations
                .is_some_and(|max| summary.iterations >= max)
            {
                info!(iterations = summary.iterations, "Iteration cap reached");
                break;
            }

            summary.iterations += 1;
            match self.run_cycle(summary.iterations).await {
                Ok(report) => {
                    consecutive_failures = 0;
                    summary.completed += 1;
                    summary.total_deposited_raw =
                        summary.total_deposited_raw.saturating_add(report.deposited_raw);
                    summary.total_borrowed_raw =
                        summary.total_borrowed_raw.saturating_add(report.borrowed_raw);
                    info!(
                        iteration = report.iteration,
                        obligation = %report.obligation_id,
                        deposited = report.deposited_raw,
                        borrowed = report.borrowed_raw,
                        capacity = %report.available_capacity,
                        skipped = report.skipped_collateral,
                        "Cycle complete"
                    );
                    summary.last_report = Some(report);
                }
                Err(CycleError::Cancelled) => {
                    info!(iteration = summary.iterations, "Cycle cancelled");
                    break;
                }
                Err(e) if e.is_retryable() => {
                    consecutive_failures += 1;
                    warn!(
                        iteration = summary.iterations,
                        failures = consecutive_failures,
                        error = %e,
                        "Cycle failed"
                    );
                    if consecutive_failures >= self.cycle.max_consecutive_failures {
                        error!(failures = consecutive_failures, "Too many consecutive failures");
                        return Err(e);
                    }
                    let backoff = backoff_delay(self.cycle.retry_backoff(), consecutive_failures);
                    if self.pause(backoff).await {
                        break;
                    }
                    continue;
                }
                Err(e) => {
                    error!(iteration = summary.iterations, error = %e, "Fatal cycle error");
                    return Err(e);
                }
            }

            if self
                .cycle
                .max_iterations
                .is_some_and(|max| summary.iterations >= max)
            {
                continue;
            }
            if self.pause(self.cycle.min_interval()).await {
                info!("Stop requested during pause");
                break;
            }
        }

        info!(
            iterations = summary.iterations,
            completed = summary.completed,
            deposited = summary.total_deposited_raw,
            borrowed = summary.total_borrowed_raw,
            "Leverage loop finished"
        );
        Ok(summary)
    }
}
