//! Gateway request and response bodies.
//!
//! Field names follow the lending SDK's JSON (camelCase, `origin` and
//! `calculated` sub-objects). Integer amounts and decimal parameters are
//! accepted either as JSON numbers or as decimal strings.

use rust_decimal::Decimal;
use serde::{Deserialize, Deserializer, Serialize};

/// Obligation id plus its key object id.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationSummary {
    pub id: String,
    pub key_id: String,
}

/// Move type name wrapper (`{"name": "..."}`), reported without `0x`.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TypeName {
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObligationCollateral {
    #[serde(rename = "type")]
    pub coin_type: TypeName,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub amount: u64,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObligationDebt {
    #[serde(rename = "type")]
    pub coin_type: TypeName,
    #[serde(deserialize_with = "u64_from_str_or_num")]
    pub amount: u64,
    pub borrow_index: Decimal,
}

/// Full obligation detail.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct ObligationDetail {
    #[serde(default)]
    pub collaterals: Vec<ObligationCollateral>,
    #[serde(default)]
    pub debts: Vec<ObligationDebt>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetOrigin {
    pub borrow_weight: Decimal,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetCalculated {
    pub current_borrow_index: Decimal,
}

/// Borrowable asset pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AssetPool {
    pub coin: String,
    pub coin_type: String,
    pub origin: AssetOrigin,
    pub calculated: AssetCalculated,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralOrigin {
    pub collateral_factor: Decimal,
    pub liquidation_factor: Decimal,
}

/// Collateral pool.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CollateralPool {
    pub coin: String,
    pub coin_type: String,
    pub origin: CollateralOrigin,
}

/// Market snapshot.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct MarketResponse {
    #[serde(default)]
    pub assets: Vec<AssetPool>,
    #[serde(default)]
    pub collaterals: Vec<CollateralPool>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DepositRequest<'a> {
    pub coin: &'a str,
    pub amount: u64,
    pub raw_units: bool,
    pub obligation_id: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BorrowRequest<'a> {
    pub coin: &'a str,
    pub amount: u64,
    pub raw_units: bool,
    pub obligation_id: &'a str,
    pub obligation_key: &'a str,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct TransactionResponse {
    pub digest: String,
}

fn u64_from_str_or_num<'de, D>(deserializer: D) -> Result<u64, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Raw {
        Num(u64),
        Str(String),
    }

    match Raw::deserialize(deserializer)? {
        Raw::Num(n) => Ok(n),
        Raw::Str(s) => s.parse().map_err(serde::de::Error::custom),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;
    use serde_json::json;

    #[test]
    fn test_obligation_detail_parsing() {
        let body = json!({
            "collaterals": [
                { "type": { "name": "5d4b::coin::COIN" }, "amount": "2500000" }
            ],
            "debts": [
                { "type": { "name": "2::sui::SUI" }, "amount": 1000000000u64, "borrowIndex": "1050000000" }
            ]
        });

        let detail: ObligationDetail = serde_json::from_value(body).unwrap();
        assert_eq!(detail.collaterals[0].amount, 2_500_000);
        assert_eq!(detail.collaterals[0].coin_type.name, "5d4b::coin::COIN");
        assert_eq!(detail.debts[0].amount, 1_000_000_000);
        assert_eq!(detail.debts[0].borrow_index, dec!(1050000000));
    }

    #[test]
    fn test_market_parsing() {
        let body = json!({
            "assets": [{
                "coin": "usdc",
                "coinType": "0x5d4b::coin::COIN",
                "origin": { "borrowWeight": "1.25" },
                "calculated": { "currentBorrowIndex": "1.0625" }
            }],
            "collaterals": [{
                "coin": "usdc",
                "coinType": "0x5d4b::coin::COIN",
                "origin": { "collateralFactor": "0.8", "liquidationFactor": "0.85" }
            }]
        });

        let market: MarketResponse = serde_json::from_value(body).unwrap();
        assert_eq!(market.assets[0].origin.borrow_weight, dec!(1.25));
        assert_eq!(market.assets[0].calculated.current_borrow_index, dec!(1.0625));
        assert_eq!(market.collaterals[0].origin.liquidation_factor, dec!(0.85));
    }

    #[test]
    fn test_empty_obligation_defaults() {
        let detail: ObligationDetail = serde_json::from_value(json!({})).unwrap();
        assert!(detail.collaterals.is_empty());
        assert!(detail.debts.is_empty());
    }

    #[test]
    fn test_invalid_amount_rejected() {
        let body = json!({
            "collaterals": [{ "type": { "name": "2::sui::SUI" }, "amount": "-5" }]
        });
        assert!(serde_json::from_value::<ObligationDetail>(body).is_err());
    }

    #[test]
    fn test_borrow_request_serialization() {
        let request = BorrowRequest {
            coin: "usdc",
            amount: 989_901_000,
            raw_units: true,
            obligation_id: "0xob",
            obligation_key: "0xkey",
        };
        let body = serde_json::to_value(&request).unwrap();
        assert_eq!(body["rawUnits"], json!(true));
        assert_eq!(body["obligationKey"], json!("0xkey"));
        assert_eq!(body["amount"], json!(989_901_000u64));
    }
}
