//! v2.1 pricing scheme
//!
//! Per-shape base price tables, then lot-wide adjustments:
//!
//! ```text
//! subtotal = base × quantity rate × complexity + add-ons
//! subtotal = subtotal × small-part factor
//! bending  = max(floor, round(subtotal))
//! total    = bending + punch/pierce holes, gross rounded ties-to-even
//! ```
//!
//! The bending figure is a lot total; there is no per-piece price.

use serde::Serialize;
use tracing::debug;

use crate::core::error::QuoteError;
use crate::core::rounding::{apply_floor, RoundingRule, TaxRounding};
use crate::pricing::holes::TieredHolePrices;
use crate::pricing::quote::{
    assemble, BendingBreakdown, Computed, HoleCost, ProcessFlags, QuoteInput, QuoteResult,
    QuoteSettings, TaxMethod,
};
use crate::pricing::tables::{BasePriceMatrix, CellLookup, Materials, QuantityBands, WeightBasis};
use crate::pricing::SchemeKind;

const ROUNDING: RoundingRule = RoundingRule::NearestYen;
const TAX: TaxMethod = TaxMethod::GrossTotal(TaxRounding::HalfEven);
const SCHEME: &str = "v21";

/// Base price table for one shape
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeTable {
    pub shape: String,
    pub matrix: BasePriceMatrix,
}

/// Discount for small, light parts
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SmallPartRule {
    pub max_long_side_mm: f64,
    pub max_weight_kg: f64,
    pub factor: f64,
}

impl SmallPartRule {
    /// Both limits are inclusive
    pub fn applies(&self, long_side_mm: f64, weight_kg: f64) -> bool {
        long_side_mm <= self.max_long_side_mm && weight_kg <= self.max_weight_kg
    }
}

/// Adjustment constants
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct V21Rules {
    pub quantity: QuantityBands,
    pub mid_support_factor: f64,
    pub reverse_bend_factor: f64,
    pub long_press_addon_yen: u64,
    /// Long-part pressing is charged only from this length up
    pub long_press_min_length_mm: f64,
    pub deep_bend_addon_yen: u64,
    pub small_part: SmallPartRule,
    pub floor_yen: u64,
    pub holes: TieredHolePrices,
}

/// Complexity factor and add-on yen for a set of process flags
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Adjustments {
    pub complexity: f64,
    pub addons_yen: u64,
}

impl V21Rules {
    pub fn adjustments(&self, flags: &ProcessFlags, length_mm: f64) -> Adjustments {
        let mut complexity = 1.0;
        let mut addons_yen = 0;
        if flags.mid_support {
            complexity *= self.mid_support_factor;
        }
        if flags.reverse_bend {
            complexity *= self.reverse_bend_factor;
        }
        if flags.long_press && length_mm >= self.long_press_min_length_mm {
            addons_yen += self.long_press_addon_yen;
        }
        if flags.deep_bend {
            addons_yen += self.deep_bend_addon_yen;
        }
        Adjustments {
            complexity,
            addons_yen,
        }
    }
}

/// Loaded v2.1 tables
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct V21Tables {
    pub shapes: Vec<ShapeTable>,
    pub rules: V21Rules,
    /// Used only when a request gives width and material instead of weight
    pub materials: Option<Materials>,
}

impl V21Tables {
    pub fn shape_names(&self) -> Vec<&str> {
        self.shapes.iter().map(|s| s.shape.as_str()).collect()
    }

    fn matrix(&self, shape: &str) -> Result<&BasePriceMatrix, QuoteError> {
        self.shapes
            .iter()
            .find(|s| s.shape == shape)
            .map(|s| &s.matrix)
            .ok_or_else(|| QuoteError::UnknownShape {
                shape: shape.to_string(),
                known: self.shape_names().join(", "),
            })
    }

    fn weight(&self, input: &QuoteInput) -> Result<(f64, WeightBasis), QuoteError> {
        if let Some(weight) = input.weight_kg {
            return Ok((weight, WeightBasis::Given));
        }
        match (input.width_mm, input.material.as_deref(), &self.materials) {
            (Some(width), Some(material), Some(materials)) => {
                materials.weight_kg(material, input.thickness_mm, width, input.length_mm)
            }
            (Some(_), Some(_), None) => Err(QuoteError::invalid(
                "weight",
                "no material table loaded; give the weight directly",
            )),
            _ => Err(QuoteError::invalid(
                "weight",
                "give the weight, or the developed width and material",
            )),
        }
    }

    /// Compute a quote
    pub fn quote(&self, input: &QuoteInput, settings: &QuoteSettings) -> Result<QuoteResult, QuoteError> {
        input.validate()?;
        if input.holes.round > 0 || input.holes.slotted > 0 {
            return Err(QuoteError::UnsupportedOption {
                variant: SCHEME,
                option: "round/slotted holes",
            });
        }
        let long_side_mm = input
            .long_side_mm
            .ok_or_else(|| QuoteError::invalid("long_side", "long side is required"))?;

        let matrix = self.matrix(&input.shape)?;
        let (weight_kg, weight_basis) = self.weight(input)?;
        let cell = matrix.lookup(weight_kg, input.length_mm);
        let band = self.rules.quantity.band_for(input.quantity)?;

        let bending = compose_bending(&self.rules, &cell, band.rate, band.label(), input, long_side_mm, weight_kg);
        let holes = self
            .rules
            .holes
            .cost(input.thickness_mm, input.holes.punch, input.holes.pierce)?;

        Ok(assemble(
            SchemeKind::V21,
            Computed {
                input,
                weight_kg,
                weight_basis,
                cell,
                bending,
                holes: HoleCost::Tiered(holes),
            },
            settings,
            TAX,
        ))
    }
}

/// Apply the lot adjustments to a base price
fn compose_bending(
    rules: &V21Rules,
    cell: &CellLookup,
    quantity_rate: f64,
    quantity_band: String,
    input: &QuoteInput,
    long_side_mm: f64,
    weight_kg: f64,
) -> BendingBreakdown {
    let adjustments = rules.adjustments(&input.flags, input.length_mm);
    let small_part = if rules.small_part.applies(long_side_mm, weight_kg) {
        rules.small_part.factor
    } else {
        1.0
    };

    let subtotal = cell.base_price as f64 * quantity_rate;
    let subtotal = subtotal * adjustments.complexity + adjustments.addons_yen as f64;
    let raw_price = subtotal * small_part;
    let total = apply_floor(ROUNDING.apply(raw_price), rules.floor_yen);
    debug!(
        raw_price,
        complexity = adjustments.complexity,
        addons = adjustments.addons_yen,
        small_part,
        total,
        "v2.1 bending total"
    );

    BendingBreakdown {
        base_price: cell.base_price,
        shape_multiplier: None,
        quantity_band,
        quantity_adjustment: quantity_rate,
        complexity_adjustment: adjustments.complexity,
        addons_yen: adjustments.addons_yen,
        small_part_adjustment: small_part,
        raw_price,
        rounding: ROUNDING,
        floor_yen: rules.floor_yen,
        unit_price: None,
        total,
    }
}
