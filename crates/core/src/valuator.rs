//! Position valuation: collateral capacity versus accrued, weighted debt.
//!
//! Valuation runs in two steps. [`PositionValuator::gather`] reads the price
//! and coin metadata of every coin the obligation touches, concurrently.
//! [`valuate`] then reduces those inputs into a [`Valuation`] without any
//! I/O, which keeps the arithmetic deterministic and testable.
//!
//! Per collateral entry:
//! ```text
//! normalized = raw × 10^-decimals
//! value      = normalized × price
//! capacity  += value × collateralFactor
//! ```
//! Per debt entry:
//! ```text
//! accrued  = normalized × currentBorrowIndex / borrowIndexAtEntry
//! weighted = accrued × price × borrowWeight
//! ```
//! `availableCapacity = max(0, capacity − Σ weighted)`.

use crate::decimal_math::{add, div, mul, normalize_amount, sub};
use crate::market::MarketData;
use crate::{MathError, ValuationError};
use futures::future::try_join_all;
use leverage_chain::{
    ChainError, CoinMetadata, CoinType, LendingMarket, Obligation, PriceQuote, PriceReader,
};
use rust_decimal::Decimal;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, instrument, warn};

/// Why a collateral entry did not count toward capacity.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SkipReason {
    PriceUnavailable,
    MetadataUnavailable,
    PoolUnavailable,
}

impl fmt::Display for SkipReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::PriceUnavailable => "price unavailable",
            Self::MetadataUnavailable => "coin metadata unavailable",
            Self::PoolUnavailable => "collateral pool unavailable",
        })
    }
}

/// A collateral entry left out of the valuation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedCollateral {
    pub coin_type: CoinType,
    pub amount: u64,
    pub reason: SkipReason,
}

/// Result of valuing one obligation. All values in USD.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Valuation {
    /// Borrow capacity left, never negative
    pub available_capacity: Decimal,
    pub total_collateral_value: Decimal,
    /// Σ collateral value × collateral factor
    pub total_borrow_capacity_value: Decimal,
    /// Σ collateral value × liquidation factor
    pub total_liquidation_value: Decimal,
    /// Accrued debt value before borrow weights
    pub total_debt_value: Decimal,
    pub total_debt_value_with_weight: Decimal,
    pub skipped: Vec<SkippedCollateral>,
}

/// Prices and metadata for every coin an obligation touches.
#[derive(Debug, Clone, Default)]
pub struct ValuationInputs {
    prices: HashMap<CoinType, PriceQuote>,
    metadata: HashMap<CoinType, Option<CoinMetadata>>,
}

impl ValuationInputs {
    pub fn insert(&mut self, coin_type: CoinType, price: PriceQuote, metadata: Option<CoinMetadata>) {
        self.prices.insert(coin_type.clone(), price);
        self.metadata.insert(coin_type, metadata);
    }

    pub fn price(&self, coin_type: &CoinType) -> Option<Decimal> {
        self.prices.get(coin_type).and_then(PriceQuote::price)
    }

    pub fn decimals(&self, coin_type: &CoinType) -> Option<u8> {
        self.metadata
            .get(coin_type)
            .and_then(|m| m.as_ref())
            .map(|m| m.decimals)
    }

    pub fn len(&self) -> usize {
        self.prices.len()
    }

    pub fn is_empty(&self) -> bool {
        self.prices.is_empty()
    }
}

/// Reads valuation inputs from the market and oracle.
pub struct PositionValuator {
    market: Arc<dyn LendingMarket>,
    oracle: Arc<dyn PriceReader>,
}

impl fmt::Debug for PositionValuator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PositionValuator")
            .field("market", &self.market.market_id())
            .finish()
    }
}

impl PositionValuator {
    pub fn new(market: Arc<dyn LendingMarket>, oracle: Arc<dyn PriceReader>) -> Self {
        Self { market, oracle }
    }

    /// Fetch price and metadata for each distinct coin of `obligation`.
    ///
    /// Lookups run concurrently; the first fetch error fails the whole gather.
    #[instrument(skip(self, obligation), fields(obligation = %obligation.id))]
    pub async fn gather(&self, obligation: &Obligation) -> Result<ValuationInputs, ChainError> {
        let mut coins: Vec<&CoinType> = Vec::new();
        let entries = obligation
            .collaterals
            .iter()
            .map(|c| &c.coin_type)
            .chain(obligation.debts.iter().map(|d| &d.coin_type));
        for coin_type in entries {
            if !coins.contains(&coin_type) {
                coins.push(coin_type);
            }
        }

        let lookups = coins.into_iter().map(|coin_type| async move {
            let (price, metadata) = futures::try_join!(
                self.oracle.get_price(coin_type),
                self.market.get_coin_metadata(coin_type),
            )?;
            Ok::<_, ChainError>((coin_type.clone(), price, metadata))
        });

        let mut inputs = ValuationInputs::default();
        for (coin_type, price, metadata) in try_join_all(lookups).await? {
            inputs.insert(coin_type, price, metadata);
        }

        debug!(coins = inputs.len(), "Valuation inputs gathered");
        Ok(inputs)
    }
}

struct CollateralTotals {
    value: Decimal,
    capacity: Decimal,
    liquidation: Decimal,
    skipped: Vec<SkippedCollateral>,
}

fn value_collaterals(
    obligation: &Obligation,
    market: &MarketData,
    inputs: &ValuationInputs,
) -> Result<CollateralTotals, MathError> {
    let mut totals = CollateralTotals {
        value: Decimal::ZERO,
        capacity: Decimal::ZERO,
        liquidation: Decimal::ZERO,
        skipped: Vec::new(),
    };

    for entry in &obligation.collaterals {
        let price = inputs.price(&entry.coin_type);
        let decimals = inputs.decimals(&entry.coin_type);
        let pool = market.collateral_pool(&entry.coin_type);

        let (price, decimals, pool) = match (price, decimals, pool) {
            (Some(p), Some(d), Some(pool)) => (p, d, pool),
            _ => {
                let reason = if price.is_none() {
                    SkipReason::PriceUnavailable
                } else if decimals.is_none() {
                    SkipReason::MetadataUnavailable
                } else {
                    SkipReason::PoolUnavailable
                };
                totals.skipped.push(SkippedCollateral {
                    coin_type: entry.coin_type.clone(),
                    amount: entry.amount,
                    reason,
                });
                continue;
            }
        };

        let value = mul(normalize_amount(entry.amount, decimals)?, price)?;
        totals.value = add(totals.value, value)?;
        totals.capacity = add(totals.capacity, mul(value, pool.collateral_factor)?)?;
        totals.liquidation = add(totals.liquidation, mul(value, pool.liquidation_factor)?)?;
    }

    Ok(totals)
}

/// USD value of the collateral that can be priced. Unpriceable entries count as zero.
pub fn collateral_value(
    obligation: &Obligation,
    market: &MarketData,
    inputs: &ValuationInputs,
) -> Result<Decimal, MathError> {
    value_collaterals(obligation, market, inputs).map(|t| t.value)
}

/// Compute the available borrow capacity of `obligation`.
///
/// Collateral entries lacking price, metadata or pool are skipped and
/// reported in [`Valuation::skipped`]. Debt entries lacking any input fail.
pub fn valuate(
    obligation: &Obligation,
    market: &MarketData,
    inputs: &ValuationInputs,
) -> Result<Valuation, ValuationError> {
    if !obligation.has_collateral() {
        return Ok(Valuation::default());
    }

    let collateral = value_collaterals(obligation, market, inputs)?;
    for skipped in &collateral.skipped {
        warn!(
            obligation = %obligation.id,
            coin_type = %skipped.coin_type,
            amount = skipped.amount,
            reason = %skipped.reason,
            "Collateral skipped in valuation"
        );
    }

    let mut debt_value = Decimal::ZERO;
    let mut debt_weighted = Decimal::ZERO;
    for entry in &obligation.debts {
        let unavailable = |missing: &'static str| ValuationError::DebtDataUnavailable {
            coin_type: entry.coin_type.clone(),
            missing,
        };
        let price = inputs.price(&entry.coin_type).ok_or_else(|| unavailable("price"))?;
        let decimals = inputs
            .decimals(&entry.coin_type)
            .ok_or_else(|| unavailable("coin metadata"))?;
        let asset = market
            .asset(&entry.coin_type)
            .ok_or_else(|| unavailable("asset market record"))?;

        if entry.borrow_index <= Decimal::ZERO {
            return Err(ValuationError::InvalidBorrowIndex {
                coin_type: entry.coin_type.clone(),
            });
        }

        let growth = div(asset.current_borrow_index, entry.borrow_index)?;
        let accrued = mul(normalize_amount(entry.amount, decimals)?, growth)?;
        let value = mul(accrued, price)?;
        debt_value = add(debt_value, value)?;
        debt_weighted = add(debt_weighted, mul(value, asset.borrow_weight)?)?;
    }

    let available = sub(collateral.capacity, debt_weighted)?.max(Decimal::ZERO);

    debug!(
        obligation = %obligation.id,
        collateral = %collateral.value,
        capacity = %collateral.capacity,
        debt = %debt_weighted,
        available = %available,
        "Obligation valued"
    );

    Ok(Valuation {
        available_capacity: available,
        total_collateral_value: collateral.value,
        total_borrow_capacity_value: collateral.capacity,
        total_liquidation_value: collateral.liquidation,
        total_debt_value: debt_value,
        total_debt_value_with_weight: debt_weighted,
        skipped: collateral.skipped,
    })
}
