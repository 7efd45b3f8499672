//! Obligation selection.

use leverage_chain::Obligation;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Which obligation the loop operates on when the owner has several.
///
/// Only obligations with at least one collateral entry are candidates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SelectionPolicy {
    /// First candidate in listing order
    #[default]
    FirstNonEmpty,
    /// Last candidate in listing order
    LastNonEmpty,
    /// Candidate with the highest collateral USD value; earliest wins ties
    LargestCollateralValue,
}

impl SelectionPolicy {
    /// Parse a policy name (`first`, `last`, `largest` or the full snake_case name).
    pub fn parse(s: &str) -> Option<Self> {
        match s.to_lowercase().replace('-', "_").as_str() {
            "first" | "first_non_empty" => Some(Self::FirstNonEmpty),
            "last" | "last_non_empty" => Some(Self::LastNonEmpty),
            "largest" | "largest_collateral_value" => Some(Self::LargestCollateralValue),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::FirstNonEmpty => "first_non_empty",
            Self::LastNonEmpty => "last_non_empty",
            Self::LargestCollateralValue => "largest_collateral_value",
        }
    }

    /// Whether the policy needs a collateral value per candidate.
    pub fn needs_valuation(&self) -> bool {
        matches!(self, Self::LargestCollateralValue)
    }
}

impl fmt::Display for SelectionPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Pick one obligation under `policy`.
///
/// `collateral_value` is only consulted for [`SelectionPolicy::LargestCollateralValue`].
/// Returns `None` when no obligation holds collateral.
pub fn select_obligation<'a, F>(
    policy: SelectionPolicy,
    obligations: &'a [Obligation],
    mut collateral_value: F,
) -> Option<&'a Obligation>
where
    F: FnMut(&Obligation) -> Decimal,
{
    let mut candidates = obligations.iter().filter(|o| o.has_collateral());

    match policy {
        SelectionPolicy::FirstNonEmpty => candidates.next(),
        SelectionPolicy::LastNonEmpty => candidates.last(),
        SelectionPolicy::LargestCollateralValue => {
            let mut best: Option<(&Obligation, Decimal)> = None;
            for obligation in candidates {
                let value = collateral_value(obligation);
                // Strict comparison keeps the earliest on ties
                if best.map_or(true, |(_, best_value)| value > best_value) {
                    best = Some((obligation, value));
                }
            }
            best.map(|(obligation, _)| obligation)
        }
    }
}
