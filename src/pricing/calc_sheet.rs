//! Calc-sheet pricing scheme
//!
//! One base price matrix shared by every shape, scaled by a shape multiplier
//! and a quantity-band rate:
//!
//! ```text
//! raw        = base[weight class][length class] × shape × quantity rate
//! unit price = max(floor, shop_fifty(raw))
//! bending    = unit price × quantity
//! total      = bending + holes, tax rounded half-up on the tax amount
//! ```
//!
//! Weight is always derived from developed width × length × thickness and
//! the material table.

use serde::Serialize;
use tracing::debug;

use crate::core::error::QuoteError;
use crate::core::rounding::{apply_floor, RoundingRule, TaxRounding};
use crate::pricing::holes::{BandedHoleCost, HoleBands};
use crate::pricing::quote::{
    assemble, BendingBreakdown, Computed, HoleCost, QuoteInput, QuoteResult, QuoteSettings,
    TaxMethod,
};
use crate::pricing::tables::{BasePriceMatrix, Materials, QuantityBands, ShapeMultipliers};
use crate::pricing::SchemeKind;

/// Minimum bending charge when the tables do not set one
pub const DEFAULT_FLOOR_YEN: u64 = 300;

const ROUNDING: RoundingRule = RoundingRule::ShopFifty;
const TAX: TaxMethod = TaxMethod::SeparateTax(TaxRounding::HalfUp);
const SCHEME: &str = "calc-sheet";

/// Loaded calc-sheet tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CalcSheetTables {
    pub matrix: BasePriceMatrix,
    pub shapes: ShapeMultipliers,
    pub quantity: QuantityBands,
    pub materials: Materials,
    pub holes: Option<HoleBands>,
    pub floor_yen: u64,
}

impl CalcSheetTables {
    /// Compute a quote
    pub fn quote(&self, input: &QuoteInput, settings: &QuoteSettings) -> Result<QuoteResult, QuoteError> {
        input.validate()?;
        reject_unsupported(input)?;

        let shape_multiplier = self.shapes.multiplier(&input.shape)?;
        let (width_mm, material) = match (input.width_mm, input.material.as_deref()) {
            (Some(width), Some(material)) => (width, material),
            (None, _) => return Err(QuoteError::invalid("width", "developed width is required")),
            (_, None) => return Err(QuoteError::invalid("material", "material is required")),
        };
        let (weight_kg, weight_basis) =
            self.materials
                .weight_kg(material, input.thickness_mm, width_mm, input.length_mm)?;

        let cell = self.matrix.lookup(weight_kg, input.length_mm);
        let band = self.quantity.band_for(input.quantity)?;

        let raw_price = cell.base_price as f64 * shape_multiplier * band.rate;
        let unit_price = apply_floor(ROUNDING.apply(raw_price), self.floor_yen);
        let bending_total = unit_price * u64::from(input.quantity);
        debug!(
            raw_price,
            unit_price,
            quantity = input.quantity,
            bending_total,
            "calc-sheet unit price"
        );

        let holes = match &self.holes {
            Some(bands) => bands.cost(input.thickness_mm, input.holes.round, input.holes.slotted),
            None => BandedHoleCost::not_configured(input.holes.round, input.holes.slotted),
        };

        let bending = BendingBreakdown {
            base_price: cell.base_price,
            shape_multiplier: Some(shape_multiplier),
            quantity_band: band.label(),
            quantity_adjustment: band.rate,
            complexity_adjustment: 1.0,
            addons_yen: 0,
            small_part_adjustment: 1.0,
            raw_price,
            rounding: ROUNDING,
            floor_yen: self.floor_yen,
            unit_price: Some(unit_price),
            total: bending_total,
        };

        Ok(assemble(
            SchemeKind::CalcSheet,
            Computed {
                input,
                weight_kg,
                weight_basis,
                cell,
                bending,
                holes: HoleCost::Banded(holes),
            },
            settings,
            TAX,
        ))
    }
}

/// Inputs that belong to the v2.1 scheme only
fn reject_unsupported(input: &QuoteInput) -> Result<(), QuoteError> {
    let unsupported = |option| QuoteError::UnsupportedOption {
        variant: SCHEME,
        option,
    };
    if input.flags.any() {
        return Err(unsupported("process flags"));
    }
    if input.holes.punch > 0 || input.holes.pierce > 0 {
        return Err(unsupported("punch/pierce holes"));
    }
    if input.long_side_mm.is_some() {
        return Err(unsupported("long_side"));
    }
    if input.weight_kg.is_some() {
        return Err(unsupported("explicit weight"));
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::core::classify::Thresholds;
    use crate::pricing::holes::BandStatus;
    use crate::pricing::quote::{HoleCounts, ProcessFlags};
    use crate::pricing::tables::{MaterialDensity, QuantityBand, ShapeRate};

    pub(crate) fn tables() -> CalcSheetTables {
        let weights = Thresholds::with_labels(
            vec![1.0, 2.0, 3.0, 5.0, 10.0, 15.0, 20.0, 30.0, 50.0, 100.0, f64::INFINITY],
            |_, b, _| format!("≤{}kg", b),
        )
        .unwrap();
        let lengths = Thresholds::with_labels(
            vec![835.0, 1670.0, 2505.0, 3048.0, f64::INFINITY],
            |_, b, _| format!("≤{}mm", b),
        )
        .unwrap();
        let prices = vec![
            vec![500, 700, 900, 1100, 1400],
            vec![600, 800, 1000, 1200, 1500],
            vec![700, 900, 1100, 1300, 1600],
            vec![800, 1000, 1200, 1500, 1800],
            vec![1000, 1200, 1500, 1800, 2200],
            vec![1200, 1500, 1800, 2100, 2600],
            vec![1500, 1800, 2100, 2500, 3000],
            vec![1800, 2200, 2600, 3000, 3600],
            vec![2500, 3000, 3500, 4000, 4800],
            vec![3500, 4200, 5000, 5800, 6800],
            vec![5000, 6000, 7000, 8000, 9500],
        ];
        let shape = |name: &str, multiplier| ShapeRate {
            shape: name.to_string(),
            multiplier,
        };
        CalcSheetTables {
            matrix: BasePriceMatrix::new(weights, lengths, prices).unwrap(),
            shapes: ShapeMultipliers::new(vec![
                shape("L曲げ", 1.0),
                shape("コの字曲げ", 1.3),
                shape("Z曲げ", 1.4),
                shape("ハット曲げ", 1.8),
            ])
            .unwrap(),
            quantity: QuantityBands::new(vec![
                QuantityBand { min: 1, max: Some(4), rate: 1.5 },
                QuantityBand { min: 5, max: Some(19), rate: 1.0 },
                QuantityBand { min: 20, max: None, rate: 0.8 },
            ])
            .unwrap(),
            materials: Materials::new(
                vec![
                    MaterialDensity {
                        material: "SS400".to_string(),
                        density: Some(7.85),
                    },
                    MaterialDensity {
                        material: "SPCC".to_string(),
                        density: Some(7.85),
                    },
                    MaterialDensity {
                        material: "SUS304".to_string(),
                        density: Some(7.93),
                    },
                    MaterialDensity {
                        material: "CP400".to_string(),
                        density: None,
                    },
                ],
                vec![(3.2, 28.9), (4.5, 39.2)],
            )
            .unwrap(),
            holes: Some(crate::pricing::holes::tests::bands()),
            floor_yen: DEFAULT_FLOOR_YEN,
        }
    }

    fn input(shape: &str, t: f64, w: f64, l: f64, material: &str, qty: u32) -> QuoteInput {
        QuoteInput::new(shape, t, l, qty).with_geometry(w, material)
    }

    #[test]
    fn test_standard_l_bend() {
        let q = tables()
            .quote(&input("L曲げ", 3.2, 200.0, 1500.0, "SS400", 1), &QuoteSettings::default())
            .unwrap();
        assert!((q.weight_kg - 7.536).abs() < 1e-9);
        assert_eq!(q.weight_class, "≤10kg");
        assert_eq!(q.length_class, "≤1670mm");
        assert_eq!(q.bending.base_price, 1200);
        assert_eq!(q.bending.quantity_adjustment, 1.5);
        assert_eq!(q.bending.unit_price, Some(1800));
        assert_eq!(q.processing_cost_tax_excluded, 1800);
        assert_eq!(q.tax, 180);
        assert_eq!(q.processing_cost_tax_included, 1980);
    }

    #[test]
    fn test_unit_price_rounded_to_hundred() {
        // 1800 x 1.3 x 1.0 = 2340 -> 2300
        let q = tables()
            .quote(&input("コの字曲げ", 2.3, 300.0, 2000.0, "SPCC", 10), &QuoteSettings::default())
            .unwrap();
        assert_eq!(q.bending.base_price, 1800);
        assert_eq!(q.bending.raw_price, 2340.0);
        assert_eq!(q.bending.unit_price, Some(2300));
        assert_eq!(q.bending.total, 23000);
    }

    #[test]
    fn test_quantity_bands_applied() {
        let t = tables();
        let rate = |qty| {
            t.quote(&input("L曲げ", 3.2, 200.0, 1500.0, "SS400", qty), &QuoteSettings::default())
                .unwrap()
                .bending
                .quantity_adjustment
        };
        assert_eq!(rate(1), 1.5);
        assert_eq!(rate(10), 1.0);
        assert_eq!(rate(50), 0.8);
    }

    #[test]
    fn test_length_on_threshold_is_inclusive() {
        let q = tables()
            .quote(&input("L曲げ", 1.0, 100.0, 3048.0, "SS400", 5), &QuoteSettings::default())
            .unwrap();
        assert_eq!(q.length_class, "≤3048mm");
    }

    #[test]
    fn test_heavy_part_saturates_to_last_row() {
        let q = tables()
            .quote(&input("L曲げ", 12.0, 1200.0, 5000.0, "SS400", 5), &QuoteSettings::default())
            .unwrap();
        assert!(q.weight_kg > 100.0);
        assert_eq!(q.bending.base_price, 9500);
    }

    #[test]
    fn test_checkered_plate_uses_unit_weight() {
        let q = tables()
            .quote(&input("L曲げ", 4.5, 500.0, 1000.0, "CP400", 5), &QuoteSettings::default())
            .unwrap();
        assert!((q.weight_kg - 19.6).abs() < 1e-9);
        assert_eq!(q.bending.base_price, 1800);

        let err = tables()
            .quote(&input("L曲げ", 5.0, 500.0, 1000.0, "CP400", 5), &QuoteSettings::default())
            .unwrap_err();
        assert!(matches!(err, QuoteError::ThicknessNotInTable { .. }));
    }

    #[test]
    fn test_holes_added_after_bending() {
        let q = tables()
            .quote(
                &input("L曲げ", 3.2, 200.0, 1500.0, "SS400", 1).with_holes(HoleCounts {
                    round: 4,
                    slotted: 2,
                    ..Default::default()
                }),
                &QuoteSettings::default(),
            )
            .unwrap();
        assert_eq!(q.holes.total(), 240);
        assert_eq!(q.processing_cost_tax_excluded, 2040);
        assert_eq!(q.tax, 204);
        assert_eq!(q.processing_cost_tax_included, 2244);
    }

    #[test]
    fn test_unmatched_hole_band_is_reported() {
        let q = tables()
            .quote(
                &input("L曲げ", 4.5, 200.0, 1500.0, "SS400", 1).with_holes(HoleCounts {
                    round: 2,
                    ..Default::default()
                }),
                &QuoteSettings::default(),
            )
            .unwrap();
        match q.holes {
            HoleCost::Banded(ref cost) => assert_eq!(cost.status, BandStatus::NoMatchingBand),
            ref other => panic!("unexpected hole cost {:?}", other),
        }
        assert_eq!(q.processing_cost_tax_excluded, q.bending.total);
    }

    #[test]
    fn test_floor_applies_to_unit_price() {
        let mut t = tables();
        t.floor_yen = 1000;
        // 500 x 1.0 x 0.8 = 400 -> floor 1000
        let q = t
            .quote(&input("L曲げ", 1.0, 100.0, 500.0, "SS400", 20), &QuoteSettings::default())
            .unwrap();
        assert_eq!(q.bending.unit_price, Some(1000));
        assert_eq!(q.bending.total, 20_000);
    }

    #[test]
    fn test_unknown_keys_are_fatal() {
        let t = tables();
        let err = t
            .quote(&input("S曲げ", 3.2, 200.0, 1500.0, "SS400", 1), &QuoteSettings::default())
            .unwrap_err();
        assert_eq!(err.field(), "shape");

        let err = t
            .quote(&input("L曲げ", 3.2, 200.0, 1500.0, "XX", 1), &QuoteSettings::default())
            .unwrap_err();
        assert_eq!(err.field(), "material");
    }

    #[test]
    fn test_v21_only_inputs_rejected() {
        let t = tables();
        let flagged = input("L曲げ", 3.2, 200.0, 1500.0, "SS400", 1).with_flags(ProcessFlags {
            mid_support: true,
            ..Default::default()
        });
        assert!(matches!(
            t.quote(&flagged, &QuoteSettings::default()),
            Err(QuoteError::UnsupportedOption { .. })
        ));

        let missing_width = QuoteInput::new("L曲げ", 3.2, 1500.0, 1);
        assert_eq!(
            t.quote(&missing_width, &QuoteSettings::default()).unwrap_err().field(),
            "width"
        );
    }

    #[test]
    fn test_repeat_quotes_identical() {
        let t = tables();
        let i = input("Z曲げ", 4.5, 400.0, 3500.0, "SS400", 3);
        let a = t.quote(&i, &QuoteSettings::default()).unwrap();
        let b = t.quote(&i, &QuoteSettings::default()).unwrap();
        assert_eq!(a, b);
        assert_eq!(
            serde_json::to_string(&a).unwrap(),
            serde_json::to_string(&b).unwrap()
        );
        assert_eq!(a.bending.unit_price, Some(10100));
    }
}
