//! Evaluation suite for the calc-sheet scheme
//!
//! Each case holds a request and the expected figures. Only the tax-excluded
//! quote decides pass/fail; the other expected values are reported when they
//! differ.

use serde::{Deserialize, Serialize};

use crate::pricing::calc_sheet::CalcSheetTables;
use crate::pricing::quote::{QuoteInput, QuoteSettings};

/// Tolerance for comparing intermediate factors and the rounded weight
const FACTOR_TOLERANCE: f64 = 1e-6;
const WEIGHT_TOLERANCE: f64 = 5e-4;

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvalCase {
    pub name: String,
    pub input: EvalInput,
    pub expected: EvalExpected,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvalInput {
    #[serde(rename = "形状")]
    pub shape: String,
    #[serde(rename = "板厚_mm")]
    pub thickness_mm: f64,
    #[serde(rename = "展開幅_mm")]
    pub width_mm: f64,
    #[serde(rename = "製品長さ_mm")]
    pub length_mm: f64,
    #[serde(rename = "材質")]
    pub material: String,
    #[serde(rename = "数量")]
    pub quantity: u32,
}

impl EvalInput {
    pub fn to_quote_input(&self) -> QuoteInput {
        QuoteInput::new(self.shape.clone(), self.thickness_mm, self.length_mm, self.quantity)
            .with_geometry(self.width_mm, self.material.clone())
    }
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct EvalExpected {
    #[serde(rename = "重量_kg", default)]
    pub weight_kg: Option<f64>,
    #[serde(rename = "基準価格", default)]
    pub base_price: Option<u64>,
    #[serde(rename = "形状乗率", default)]
    pub shape_multiplier: Option<f64>,
    #[serde(rename = "数量調整", default)]
    pub quantity_adjustment: Option<f64>,
    #[serde(rename = "単価_税抜", default)]
    pub unit_price: Option<u64>,
    #[serde(rename = "見積り_税抜")]
    pub tax_excluded: u64,
}

/// Result of one case
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EvalOutcome {
    pub name: String,
    pub expected: u64,
    /// Computed tax-excluded amount, or the error message
    pub actual: Result<u64, String>,
    /// Intermediate values that differ from the expected ones
    pub notes: Vec<String>,
}

impl EvalOutcome {
    pub fn passed(&self) -> bool {
        self.actual.as_ref().is_ok_and(|actual| *actual == self.expected)
    }
}

/// Run every case against the calc-sheet tables
pub fn run(tables: &CalcSheetTables, cases: &[EvalCase], settings: &QuoteSettings) -> Vec<EvalOutcome> {
    cases.iter().map(|case| run_case(tables, case, settings)).collect()
}

fn run_case(tables: &CalcSheetTables, case: &EvalCase, settings: &QuoteSettings) -> EvalOutcome {
    let expected = &case.expected;
    match tables.quote(&case.input.to_quote_input(), settings) {
        Ok(quote) => {
            let mut notes = Vec::new();
            if let Some(w) = expected.weight_kg {
                if (quote.weight_kg - w).abs() > WEIGHT_TOLERANCE {
                    notes.push(format!("weight {:.3} (expected {})", quote.weight_kg, w));
                }
            }
            if let Some(base) = expected.base_price {
                if quote.bending.base_price != base {
                    notes.push(format!("base price {} (expected {})", quote.bending.base_price, base));
                }
            }
            if let (Some(m), Some(actual)) = (expected.shape_multiplier, quote.bending.shape_multiplier) {
                if (actual - m).abs() > FACTOR_TOLERANCE {
                    notes.push(format!("shape multiplier {} (expected {})", actual, m));
                }
            }
            if let Some(q) = expected.quantity_adjustment {
                if (quote.bending.quantity_adjustment - q).abs() > FACTOR_TOLERANCE {
                    notes.push(format!(
                        "quantity rate {} (expected {})",
                        quote.bending.quantity_adjustment, q
                    ));
                }
            }
            if let (Some(u), Some(actual)) = (expected.unit_price, quote.bending.unit_price) {
                if actual != u {
                    notes.push(format!("unit price {} (expected {})", actual, u));
                }
            }
            EvalOutcome {
                name: case.name.clone(),
                expected: expected.tax_excluded,
                actual: Ok(quote.processing_cost_tax_excluded),
                notes,
            }
        }
        Err(e) => EvalOutcome {
            name: case.name.clone(),
            expected: expected.tax_excluded,
            actual: Err(e.to_string()),
            notes: Vec::new(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pricing::calc_sheet::tests::tables;

    fn case(shape: &str, material: &str, expected: u64) -> EvalCase {
        EvalCase {
            name: format!("{} {}", shape, material),
            input: EvalInput {
                shape: shape.to_string(),
                thickness_mm: 3.2,
                width_mm: 200.0,
                length_mm: 1500.0,
                material: material.to_string(),
                quantity: 1,
            },
            expected: EvalExpected {
                weight_kg: Some(7.536),
                base_price: Some(1200),
                shape_multiplier: Some(1.0),
                quantity_adjustment: Some(1.5),
                unit_price: Some(1800),
                tax_excluded: expected,
            },
        }
    }

    #[test]
    fn test_passing_case() {
        let outcomes = run(&tables(), &[case("L曲げ", "SS400", 1800)], &QuoteSettings::default());
        assert_eq!(outcomes.len(), 1);
        assert!(outcomes[0].passed());
        assert!(outcomes[0].notes.is_empty());
    }

    #[test]
    fn test_mismatch_and_error_fail() {
        let outcomes = run(
            &tables(),
            &[case("L曲げ", "SS400", 1900), case("L曲げ", "XX", 1800)],
            &QuoteSettings::default(),
        );
        assert!(!outcomes[0].passed());
        assert_eq!(outcomes[0].actual, Ok(1800));
        assert!(!outcomes[1].passed());
        assert!(outcomes[1].actual.as_ref().unwrap_err().contains("XX"));
    }

    #[test]
    fn test_intermediate_differences_noted() {
        let mut c = case("コの字曲げ", "SS400", 2350);
        c.expected.unit_price = Some(2350);
        let outcome = &run(&tables(), &[c], &QuoteSettings::default())[0];
        assert!(outcome.notes.iter().any(|n| n.starts_with("shape multiplier")));
        assert!(outcome.notes.iter().any(|n| n.starts_with("unit price")));
    }
}
