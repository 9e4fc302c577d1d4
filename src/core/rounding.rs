//! Yen rounding conventions
//!
//! Every amount leaving the engine is an integer yen value. Which rounding a
//! step uses is part of the pricing scheme, not a global setting:
//!
//! | Rule | Used for |
//! |------|----------|
//! | [`RoundingRule::ShopFifty`] | calc-sheet unit price (keep clean 50s, else nearest 100) |
//! | [`RoundingRule::NearestYen`] | v2.1 bending subtotal (half-to-even) |
//! | [`TaxRounding::HalfUp`] | calc-sheet tax amount |
//! | [`TaxRounding::HalfEven`] | v2.1 tax-included total |

use serde::{Deserialize, Serialize};

/// How a raw bending subtotal becomes whole yen
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RoundingRule {
    /// Keep values whose integer part is a multiple of 50, otherwise round
    /// to the nearest 100
    ShopFifty,
    /// Round to the nearest yen, ties to even
    NearestYen,
}

impl RoundingRule {
    pub fn apply(self, raw: f64) -> u64 {
        match self {
            RoundingRule::ShopFifty => round_shop_fifty(raw),
            RoundingRule::NearestYen => to_yen(raw.round_ties_even()),
        }
    }
}

impl std::fmt::Display for RoundingRule {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RoundingRule::ShopFifty => write!(f, "shop_fifty"),
            RoundingRule::NearestYen => write!(f, "nearest_yen"),
        }
    }
}

/// Tie handling for tax amounts
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxRounding {
    /// Ties away from zero (spreadsheet ROUND)
    HalfUp,
    /// Ties to even
    HalfEven,
}

impl TaxRounding {
    pub fn apply(self, value: f64) -> u64 {
        match self {
            TaxRounding::HalfUp => to_yen(value.round()),
            TaxRounding::HalfEven => to_yen(value.round_ties_even()),
        }
    }
}

/// The shop's 50/100 convention
///
/// `1800.0 -> 1800`, `1850.0 -> 1850`, `2340.0 -> 2300`, `10080.0 -> 10100`.
/// The multiple-of-50 test looks at the integer part, so `1050.4` stays at
/// `1050`.
pub fn round_shop_fifty(raw: f64) -> u64 {
    let whole = to_yen(raw.trunc());
    if whole % 50 == 0 {
        whole
    } else {
        to_yen((raw / 100.0).round_ties_even()) * 100
    }
}

/// Raise `amount` to `floor` when it falls below it
pub fn apply_floor(amount: u64, floor: u64) -> u64 {
    amount.max(floor)
}

/// Convert an already-rounded, non-negative float to yen
///
/// Negative and NaN inputs clamp to zero; callers validate inputs so prices
/// are never negative in practice.
fn to_yen(value: f64) -> u64 {
    if value.is_nan() || value <= 0.0 {
        0
    } else {
        value as u64
    }
}
