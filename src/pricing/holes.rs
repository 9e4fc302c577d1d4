//! Hole-punching cost
//!
//! Two independent price schemes:
//!
//! - **Banded** (calc-sheet): thickness bands with round/slotted unit prices.
//!   A thickness in no band yields a visible `no_matching_band` result worth
//!   zero yen instead of an error.
//! - **Tiered** (v2.1): a fixed punch price and a pierce price stepping up at
//!   thickness breakpoints. An invalid thickness is fatal.

use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::core::classify::{find_band, validate_bands, RangeBand};
use crate::core::error::QuoteError;

/// Unit prices for one thickness band
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HolePriceBand {
    pub thickness: RangeBand,
    pub round_standard: u64,
    /// Informational lower-limit price
    pub round_minimum: Option<u64>,
    pub slotted_standard: u64,
    /// Informational lower-limit price
    pub slotted_minimum: Option<u64>,
}

/// Banded hole price table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct HoleBands(Vec<HolePriceBand>);

/// Outcome of a band lookup
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum BandStatus {
    Matched,
    NoMatchingBand,
    NotConfigured,
}

/// Itemized banded hole cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BandedHoleCost {
    pub status: BandStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub band: Option<RangeBand>,
    pub round_count: u32,
    pub round_price: u64,
    pub slotted_count: u32,
    pub slotted_price: u64,
    pub total: u64,
}

impl BandedHoleCost {
    /// Cost when no band table is loaded
    pub fn not_configured(round_count: u32, slotted_count: u32) -> Self {
        Self {
            status: BandStatus::NotConfigured,
            band: None,
            round_count,
            round_price: 0,
            slotted_count,
            slotted_price: 0,
            total: 0,
        }
    }
}

impl HoleBands {
    pub fn new(bands: Vec<HolePriceBand>) -> Result<Self, String> {
        let ranges: Vec<RangeBand> = bands.iter().map(|b| b.thickness).collect();
        validate_bands(&ranges)?;
        Ok(Self(bands))
    }

    pub fn iter(&self) -> impl Iterator<Item = &HolePriceBand> {
        self.0.iter()
    }

    /// Band whose inclusive range holds `thickness_mm`
    pub fn band_for(&self, thickness_mm: f64) -> Option<&HolePriceBand> {
        find_band(self.0.iter().map(|b| &b.thickness), thickness_mm).map(|i| &self.0[i])
    }

    /// Round and slotted hole cost at a thickness
    pub fn cost(&self, thickness_mm: f64, round_count: u32, slotted_count: u32) -> BandedHoleCost {
        match self.band_for(thickness_mm) {
            Some(band) => {
                let total = u64::from(round_count) * band.round_standard
                    + u64::from(slotted_count) * band.slotted_standard;
                debug!(thickness_mm, round_count, slotted_count, total, "hole band matched");
                BandedHoleCost {
                    status: BandStatus::Matched,
                    band: Some(band.thickness),
                    round_count,
                    round_price: band.round_standard,
                    slotted_count,
                    slotted_price: band.slotted_standard,
                    total,
                }
            }
            None => {
                if round_count > 0 || slotted_count > 0 {
                    warn!(thickness_mm, "no hole price band for thickness; holes priced at 0");
                }
                BandedHoleCost {
                    status: BandStatus::NoMatchingBand,
                    band: None,
                    round_count,
                    round_price: 0,
                    slotted_count,
                    slotted_price: 0,
                    total: 0,
                }
            }
        }
    }
}

/// One pierce price step; `max_mm: None` is the open top tier
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct PierceTier {
    pub max_mm: Option<f64>,
    pub price: u64,
}

/// Punch and pierce prices
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieredHolePrices {
    punch_price: u64,
    pierce_tiers: Vec<PierceTier>,
}

/// Itemized tiered hole cost
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TieredHoleCost {
    pub punch_count: u32,
    pub punch_price: u64,
    pub pierce_count: u32,
    pub pierce_price: u64,
    pub total: u64,
}

impl TieredHolePrices {
    /// Tiers must ascend; only the last may be open-ended
    pub fn new(punch_price: u64, pierce_tiers: Vec<PierceTier>) -> Result<Self, String> {
        if pierce_tiers.is_empty() {
            return Err("no pierce price tiers".to_string());
        }
        let last = pierce_tiers.len() - 1;
        let mut previous: Option<f64> = None;
        for (i, tier) in pierce_tiers.iter().enumerate() {
            match tier.max_mm {
                Some(max) => {
                    if !(max.is_finite() && max > 0.0) {
                        return Err(format!("pierce tier #{} has invalid bound {}", i + 1, max));
                    }
                    if previous.is_some_and(|p| max <= p) {
                        return Err(format!("pierce tier #{} bound {} is not ascending", i + 1, max));
                    }
                    previous = Some(max);
                }
                None if i != last => {
                    return Err(format!("open-ended pierce tier #{} must be the last tier", i + 1));
                }
                None => {}
            }
        }
        Ok(Self {
            punch_price,
            pierce_tiers,
        })
    }

    pub fn punch_price(&self) -> u64 {
        self.punch_price
    }

    pub fn tiers(&self) -> &[PierceTier] {
        &self.pierce_tiers
    }

    /// Pierce unit price at a thickness
    pub fn pierce_price(&self, thickness_mm: f64) -> Result<u64, QuoteError> {
        if !(thickness_mm.is_finite() && thickness_mm > 0.0) {
            return Err(QuoteError::HoleThicknessOutOfRange { thickness_mm });
        }
        self.pierce_tiers
            .iter()
            .find(|tier| tier.max_mm.map_or(true, |max| thickness_mm <= max))
            .map(|tier| tier.price)
            .ok_or(QuoteError::HoleThicknessOutOfRange { thickness_mm })
    }

    pub fn cost(
        &self,
        thickness_mm: f64,
        punch_count: u32,
        pierce_count: u32,
    ) -> Result<TieredHoleCost, QuoteError> {
        let pierce_price = self.pierce_price(thickness_mm)?;
        let total = u64::from(punch_count) * self.punch_price + u64::from(pierce_count) * pierce_price;
        debug!(thickness_mm, punch_count, pierce_count, pierce_price, total, "tiered hole cost");
        Ok(TieredHoleCost {
            punch_count,
            punch_price: self.punch_price,
            pierce_count,
            pierce_price,
            total,
        })
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn bands() -> HoleBands {
        HoleBands::new(vec![
            HolePriceBand {
                thickness: RangeBand { min: 0.5, max: 1.6 },
                round_standard: 20,
                round_minimum: Some(15),
                slotted_standard: 40,
                slotted_minimum: Some(30),
            },
            HolePriceBand {
                thickness: RangeBand { min: 1.7, max: 3.2 },
                round_standard: 30,
                round_minimum: Some(20),
                slotted_standard: 60,
                slotted_minimum: None,
            },
        ])
        .unwrap()
    }

    pub(crate) fn tiers() -> TieredHolePrices {
        TieredHolePrices::new(
            30,
            vec![
                PierceTier { max_mm: Some(2.3), price: 30 },
                PierceTier { max_mm: Some(4.5), price: 60 },
                PierceTier { max_mm: Some(9.0), price: 100 },
                PierceTier { max_mm: Some(12.0), price: 150 },
                PierceTier { max_mm: None, price: 200 },
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_banded_cost() {
        let cost = bands().cost(3.2, 4, 2);
        assert_eq!(cost.status, BandStatus::Matched);
        assert_eq!(cost.round_price, 30);
        assert_eq!(cost.slotted_price, 60);
        assert_eq!(cost.total, 4 * 30 + 2 * 60);
    }

    #[test]
    fn test_banded_boundaries_inclusive() {
        assert_eq!(bands().cost(1.6, 1, 0).total, 20);
        assert_eq!(bands().cost(1.7, 1, 0).total, 30);
        assert_eq!(bands().cost(0.5, 0, 1).total, 40);
    }

    #[test]
    fn test_banded_no_match_is_visible_not_fatal() {
        let cost = bands().cost(5.0, 3, 1);
        assert_eq!(cost.status, BandStatus::NoMatchingBand);
        assert_eq!(cost.band, None);
        assert_eq!(cost.total, 0);
        assert_eq!(cost.round_count, 3);
    }

    #[test]
    fn test_band_overlap_rejected() {
        let err = HoleBands::new(vec![
            HolePriceBand {
                thickness: RangeBand { min: 0.5, max: 2.0 },
                round_standard: 20,
                round_minimum: None,
                slotted_standard: 40,
                slotted_minimum: None,
            },
            HolePriceBand {
                thickness: RangeBand { min: 2.0, max: 3.0 },
                round_standard: 30,
                round_minimum: None,
                slotted_standard: 60,
                slotted_minimum: None,
            },
        ])
        .unwrap_err();
        assert!(err.contains("overlaps"));
    }

    #[test]
    fn test_pierce_tiers() {
        let t = tiers();
        assert_eq!(t.pierce_price(1.0).unwrap(), 30);
        assert_eq!(t.pierce_price(2.3).unwrap(), 30);
        assert_eq!(t.pierce_price(2.31).unwrap(), 60);
        assert_eq!(t.pierce_price(4.5).unwrap(), 60);
        assert_eq!(t.pierce_price(9.0).unwrap(), 100);
        assert_eq!(t.pierce_price(12.0).unwrap(), 150);
        assert_eq!(t.pierce_price(16.0).unwrap(), 200);
    }

    #[test]
    fn test_pierce_invalid_thickness_is_fatal() {
        let t = tiers();
        assert!(matches!(
            t.pierce_price(0.0),
            Err(QuoteError::HoleThicknessOutOfRange { .. })
        ));
        assert!(t.pierce_price(f64::NAN).is_err());

        let bounded = TieredHolePrices::new(30, vec![PierceTier { max_mm: Some(6.0), price: 50 }]).unwrap();
        assert!(matches!(
            bounded.pierce_price(6.5),
            Err(QuoteError::HoleThicknessOutOfRange { .. })
        ));
    }

    #[test]
    fn test_tiered_cost() {
        let cost = tiers().cost(3.2, 4, 2).unwrap();
        assert_eq!(cost.punch_price, 30);
        assert_eq!(cost.pierce_price, 60);
        assert_eq!(cost.total, 240);
    }

    #[test]
    fn test_tier_order_validated() {
        assert!(TieredHolePrices::new(
            30,
            vec![
                PierceTier { max_mm: None, price: 200 },
                PierceTier { max_mm: Some(2.3), price: 30 },
            ]
        )
        .is_err());
        assert!(TieredHolePrices::new(
            30,
            vec![
                PierceTier { max_mm: Some(4.5), price: 60 },
                PierceTier { max_mm: Some(2.3), price: 30 },
            ]
        )
        .is_err());
    }
}
