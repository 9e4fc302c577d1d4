//! Quote request, itemized result, and the final assembly step
//!
//! Both schemes compute a bending total and a hole total independently and
//! hand them to [`assemble`], which sums them and applies tax. Every
//! intermediate value is kept on the [`QuoteResult`] for display only.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::core::error::QuoteError;
use crate::core::rounding::{RoundingRule, TaxRounding};
use crate::pricing::holes::{BandedHoleCost, TieredHoleCost};
use crate::pricing::tables::{CellLookup, WeightBasis};
use crate::pricing::SchemeKind;

/// Default consumption tax rate
pub const DEFAULT_TAX_RATE: f64 = 0.10;

/// Boolean process attributes
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessFlags {
    /// Mid-support (中押し)
    pub mid_support: bool,
    /// Reverse bend (逆曲げ)
    pub reverse_bend: bool,
    /// Long-part pressing (長尺目押し)
    pub long_press: bool,
    /// Deep bend / interference avoidance (深曲げ・干渉回避)
    pub deep_bend: bool,
}

impl ProcessFlags {
    pub fn any(&self) -> bool {
        self.mid_support || self.reverse_bend || self.long_press || self.deep_bend
    }
}

/// Hole counts; each scheme prices only its own two categories
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HoleCounts {
    pub round: u32,
    pub slotted: u32,
    pub punch: u32,
    pub pierce: u32,
}

/// A quote request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QuoteInput {
    pub shape: String,
    pub thickness_mm: f64,
    /// Developed (flat) width
    #[serde(default)]
    pub width_mm: Option<f64>,
    /// Product length
    pub length_mm: f64,
    /// Longest side, for the small-part discount
    #[serde(default)]
    pub long_side_mm: Option<f64>,
    #[serde(default)]
    pub material: Option<String>,
    /// Explicit weight; otherwise computed from geometry and material
    #[serde(default)]
    pub weight_kg: Option<f64>,
    pub quantity: u32,
    #[serde(default)]
    pub holes: HoleCounts,
    #[serde(default)]
    pub flags: ProcessFlags,
}

impl QuoteInput {
    pub fn new(shape: impl Into<String>, thickness_mm: f64, length_mm: f64, quantity: u32) -> Self {
        Self {
            shape: shape.into(),
            thickness_mm,
            width_mm: None,
            length_mm,
            long_side_mm: None,
            material: None,
            weight_kg: None,
            quantity,
            holes: HoleCounts::default(),
            flags: ProcessFlags::default(),
        }
    }

    pub fn with_geometry(mut self, width_mm: f64, material: impl Into<String>) -> Self {
        self.width_mm = Some(width_mm);
        self.material = Some(material.into());
        self
    }

    pub fn with_weight(mut self, weight_kg: f64) -> Self {
        self.weight_kg = Some(weight_kg);
        self
    }

    pub fn with_long_side(mut self, long_side_mm: f64) -> Self {
        self.long_side_mm = Some(long_side_mm);
        self
    }

    pub fn with_holes(mut self, holes: HoleCounts) -> Self {
        self.holes = holes;
        self
    }

    pub fn with_flags(mut self, flags: ProcessFlags) -> Self {
        self.flags = flags;
        self
    }

    /// Reject non-physical measurements before any lookup
    pub fn validate(&self) -> Result<(), QuoteError> {
        if self.shape.trim().is_empty() {
            return Err(QuoteError::invalid("shape", "must not be empty"));
        }
        positive("thickness", self.thickness_mm)?;
        positive("length", self.length_mm)?;
        if let Some(width) = self.width_mm {
            positive("width", width)?;
        }
        if let Some(long_side) = self.long_side_mm {
            positive("long_side", long_side)?;
        }
        if let Some(weight) = self.weight_kg {
            if !(weight.is_finite() && weight >= 0.0) {
                return Err(QuoteError::invalid("weight", format!("{} is not a valid weight", weight)));
            }
        }
        if self.quantity == 0 {
            return Err(QuoteError::invalid("quantity", "must be at least 1"));
        }
        Ok(())
    }
}

fn positive(field: &'static str, value: f64) -> Result<(), QuoteError> {
    if value.is_finite() && value > 0.0 {
        Ok(())
    } else {
        Err(QuoteError::invalid(field, format!("{} must be a positive number", value)))
    }
}

/// Tax settings for a calculation
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct QuoteSettings {
    pub tax_rate: f64,
}

impl Default for QuoteSettings {
    fn default() -> Self {
        Self {
            tax_rate: DEFAULT_TAX_RATE,
        }
    }
}

impl QuoteSettings {
    pub fn with_tax_rate(tax_rate: f64) -> Result<Self, QuoteError> {
        if !(tax_rate.is_finite() && tax_rate >= 0.0) {
            return Err(QuoteError::invalid("tax_rate", format!("{} is not a valid rate", tax_rate)));
        }
        Ok(Self { tax_rate })
    }
}

/// How tax is derived from the tax-excluded amount
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TaxMethod {
    /// Round the tax amount itself, then add it
    SeparateTax(TaxRounding),
    /// Round the gross amount; tax is the difference
    GrossTotal(TaxRounding),
}

impl TaxMethod {
    /// Returns `(tax, tax_included_total)`
    pub fn apply(self, tax_excluded: u64, rate: f64) -> (u64, u64) {
        match self {
            TaxMethod::SeparateTax(rounding) => {
                let tax = rounding.apply(tax_excluded as f64 * rate);
                (tax, tax_excluded + tax)
            }
            TaxMethod::GrossTotal(rounding) => {
                let gross = rounding.apply(tax_excluded as f64 * (1.0 + rate));
                (gross.saturating_sub(tax_excluded), gross)
            }
        }
    }
}

/// Itemized bending charge
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BendingBreakdown {
    pub base_price: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shape_multiplier: Option<f64>,
    pub quantity_band: String,
    pub quantity_adjustment: f64,
    pub complexity_adjustment: f64,
    pub addons_yen: u64,
    pub small_part_adjustment: f64,
    /// Price before rounding
    pub raw_price: f64,
    pub rounding: RoundingRule,
    pub floor_yen: u64,
    /// Per-piece price, where the scheme prices per piece
    #[serde(skip_serializing_if = "Option::is_none")]
    pub unit_price: Option<u64>,
    pub total: u64,
}

/// Itemized hole charge
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "scheme", rename_all = "snake_case")]
pub enum HoleCost {
    Banded(BandedHoleCost),
    Tiered(TieredHoleCost),
}

impl HoleCost {
    pub fn total(&self) -> u64 {
        match self {
            HoleCost::Banded(c) => c.total,
            HoleCost::Tiered(c) => c.total,
        }
    }
}

/// Complete quotation
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuoteResult {
    pub scheme: SchemeKind,
    pub shape: String,
    pub thickness_mm: f64,
    pub quantity: u32,
    pub weight_kg: f64,
    pub weight_basis: WeightBasis,
    pub weight_class: String,
    pub length_class: String,
    pub bending: BendingBreakdown,
    pub holes: HoleCost,
    pub processing_cost_tax_excluded: u64,
    pub tax_rate: f64,
    pub tax: u64,
    pub processing_cost_tax_included: u64,
}

/// Parts computed by a scheme before assembly
pub(crate) struct Computed<'a> {
    pub input: &'a QuoteInput,
    pub weight_kg: f64,
    pub weight_basis: WeightBasis,
    pub cell: CellLookup,
    pub bending: BendingBreakdown,
    pub holes: HoleCost,
}

/// Sum bending and hole charges and apply tax
pub(crate) fn assemble(
    scheme: SchemeKind,
    parts: Computed<'_>,
    settings: &QuoteSettings,
    tax_method: TaxMethod,
) -> QuoteResult {
    let tax_excluded = parts.bending.total + parts.holes.total();
    let (tax, tax_included) = tax_method.apply(tax_excluded, settings.tax_rate);
    debug!(
        %scheme,
        bending = parts.bending.total,
        holes = parts.holes.total(),
        tax_excluded,
        tax,
        tax_included,
        "quote assembled"
    );

    QuoteResult {
        scheme,
        shape: parts.input.shape.clone(),
        thickness_mm: parts.input.thickness_mm,
        quantity: parts.input.quantity,
        weight_kg: parts.weight_kg,
        weight_basis: parts.weight_basis,
        weight_class: parts.cell.weight_class,
        length_class: parts.cell.length_class,
        bending: parts.bending,
        holes: parts.holes,
        processing_cost_tax_excluded: tax_excluded,
        tax_rate: settings.tax_rate,
        tax,
        processing_cost_tax_included: tax_included,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_rejects_bad_measurements() {
        let ok = QuoteInput::new("L曲げ", 3.2, 1500.0, 1).with_geometry(200.0, "SS400");
        assert!(ok.validate().is_ok());

        let err = QuoteInput::new("L曲げ", 0.0, 1500.0, 1).validate().unwrap_err();
        assert_eq!(err.field(), "thickness");

        let err = QuoteInput::new("L曲げ", 3.2, f64::NAN, 1).validate().unwrap_err();
        assert_eq!(err.field(), "length");

        let err = QuoteInput::new("L曲げ", 3.2, 1500.0, 0).validate().unwrap_err();
        assert_eq!(err.field(), "quantity");

        let err = QuoteInput::new("L曲げ", 3.2, 1500.0, 1)
            .with_weight(-1.0)
            .validate()
            .unwrap_err();
        assert_eq!(err.field(), "weight");

        let err = QuoteInput::new(" ", 3.2, 1500.0, 1).validate().unwrap_err();
        assert_eq!(err.field(), "shape");
    }

    #[test]
    fn test_separate_tax_rounds_half_up() {
        let method = TaxMethod::SeparateTax(TaxRounding::HalfUp);
        assert_eq!(method.apply(1800, 0.10), (180, 1980));
        assert_eq!(method.apply(1005, 0.10), (101, 1106));
    }

    #[test]
    fn test_gross_total_rounds_half_even() {
        let method = TaxMethod::GrossTotal(TaxRounding::HalfEven);
        assert_eq!(method.apply(480, 0.10), (48, 528));
        assert_eq!(method.apply(600, 0.10), (60, 660));
        // 5 * 1.1 = 5.5 rounds to 6; 15 * 1.1 = 16.5 rounds to 16 ties-even
        assert_eq!(method.apply(5, 0.10).1, 6);
        assert_eq!(method.apply(15, 0.10).1, 16);
    }

    #[test]
    fn test_tax_rate_validation() {
        assert!(QuoteSettings::with_tax_rate(0.08).is_ok());
        assert!(QuoteSettings::with_tax_rate(0.0).is_ok());
        assert!(QuoteSettings::with_tax_rate(-0.1).is_err());
        assert!(QuoteSettings::with_tax_rate(f64::INFINITY).is_err());
        assert_eq!(QuoteSettings::default().tax_rate, 0.10);
    }
}
