//! Read-only pricing tables shared by both schemes
//!
//! Tables are validated once when loaded; lookups afterwards only fail on
//! unknown keys supplied by a quote request.

use serde::Serialize;
use tracing::debug;

use crate::core::classify::Thresholds;
use crate::core::error::QuoteError;

/// Base prices addressed by (weight class, length class)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BasePriceMatrix {
    pub weights: Thresholds,
    pub lengths: Thresholds,
    /// `prices[row][col]`, one row per weight class
    pub prices: Vec<Vec<u64>>,
}

/// Result of a base price lookup
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CellLookup {
    pub weight_class: String,
    pub weight_index: usize,
    pub length_class: String,
    pub length_index: usize,
    pub base_price: u64,
}

impl BasePriceMatrix {
    /// Build a matrix, checking its shape against the class bounds
    pub fn new(weights: Thresholds, lengths: Thresholds, prices: Vec<Vec<u64>>) -> Result<Self, String> {
        if prices.len() != weights.len() {
            return Err(format!(
                "{} price rows for {} weight classes",
                prices.len(),
                weights.len()
            ));
        }
        if let Some((i, row)) = prices
            .iter()
            .enumerate()
            .find(|(_, row)| row.len() != lengths.len())
        {
            return Err(format!(
                "price row #{} has {} columns for {} length classes",
                i + 1,
                row.len(),
                lengths.len()
            ));
        }
        Ok(Self {
            weights,
            lengths,
            prices,
        })
    }

    /// Look up the base price for a weight and length
    ///
    /// Never fails: out-of-range values saturate into the last class.
    pub fn lookup(&self, weight_kg: f64, length_mm: f64) -> CellLookup {
        let row = self.weights.classify(weight_kg);
        let col = self.lengths.classify(length_mm);
        let cell = CellLookup {
            weight_class: self.weights.label(row).to_string(),
            weight_index: row,
            length_class: self.lengths.label(col).to_string(),
            length_index: col,
            base_price: self.prices[row][col],
        };
        debug!(
            weight_kg,
            length_mm,
            weight_class = %cell.weight_class,
            length_class = %cell.length_class,
            base_price = cell.base_price,
            "classified base price"
        );
        cell
    }
}

/// Shape name with its multiplicative factor
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeRate {
    pub shape: String,
    pub multiplier: f64,
}

/// Shape multiplier table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ShapeMultipliers(Vec<ShapeRate>);

impl ShapeMultipliers {
    pub fn new(rates: Vec<ShapeRate>) -> Result<Self, String> {
        if rates.is_empty() {
            return Err("no shapes defined".to_string());
        }
        if let Some(bad) = rates
            .iter()
            .find(|r| !(r.multiplier.is_finite() && r.multiplier > 0.0))
        {
            return Err(format!(
                "shape {} has non-positive multiplier {}",
                bad.shape, bad.multiplier
            ));
        }
        Ok(Self(rates))
    }

    /// Multiplier for a shape; unknown shapes are an error
    pub fn multiplier(&self, shape: &str) -> Result<f64, QuoteError> {
        self.0
            .iter()
            .find(|r| r.shape == shape)
            .map(|r| r.multiplier)
            .ok_or_else(|| QuoteError::UnknownShape {
                shape: shape.to_string(),
                known: self.names().join(", "),
            })
    }

    pub fn names(&self) -> Vec<&str> {
        self.0.iter().map(|r| r.shape.as_str()).collect()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ShapeRate> {
        self.0.iter()
    }
}

/// Lot-size range with its price factor
#[derive(Debug, Clone, PartialEq, Serialize, serde::Deserialize)]
pub struct QuantityBand {
    pub min: u32,
    /// `None` means unbounded
    pub max: Option<u32>,
    pub rate: f64,
}

impl QuantityBand {
    pub fn contains(&self, quantity: u32) -> bool {
        self.min <= quantity && self.max.map_or(true, |max| quantity <= max)
    }

    /// Label like `1-4` or `20-`
    pub fn label(&self) -> String {
        match self.max {
            Some(max) => format!("{}-{}", self.min, max),
            None => format!("{}-", self.min),
        }
    }
}

/// Contiguous, exhaustive quantity bands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuantityBands(Vec<QuantityBand>);

impl QuantityBands {
    /// Validate that bands start at 0 or 1, are contiguous and end unbounded
    pub fn new(bands: Vec<QuantityBand>) -> Result<Self, String> {
        let first = bands.first().ok_or_else(|| "no quantity bands".to_string())?;
        if first.min > 1 {
            return Err(format!("first quantity band starts at {}, expected 0 or 1", first.min));
        }
        for (i, band) in bands.iter().enumerate() {
            if !(band.rate.is_finite() && band.rate > 0.0) {
                return Err(format!("quantity band {} has invalid rate {}", band.label(), band.rate));
            }
            match (band.max, bands.get(i + 1)) {
                (Some(max), Some(next)) => {
                    if max < band.min {
                        return Err(format!("quantity band {} is inverted", band.label()));
                    }
                    if next.min != max + 1 {
                        return Err(format!(
                            "quantity bands {} and {} are not contiguous",
                            band.label(),
                            next.label()
                        ));
                    }
                }
                (None, Some(next)) => {
                    return Err(format!(
                        "unbounded quantity band {} is followed by {}",
                        band.label(),
                        next.label()
                    ));
                }
                (Some(_), None) => {
                    return Err(format!(
                        "last quantity band {} must be unbounded (max: null)",
                        band.label()
                    ));
                }
                (None, None) => {}
            }
        }
        Ok(Self(bands))
    }

    /// Band for a lot size
    pub fn band_for(&self, quantity: u32) -> Result<&QuantityBand, QuoteError> {
        self.0
            .iter()
            .find(|b| b.contains(quantity))
            .ok_or_else(|| QuoteError::invalid("quantity", format!("{} is below every quantity band", quantity)))
    }

    pub fn iter(&self) -> impl Iterator<Item = &QuantityBand> {
        self.0.iter()
    }
}

/// How a part weight was derived
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
#[serde(tag = "basis", rename_all = "snake_case")]
pub enum WeightBasis {
    /// Supplied directly by the caller
    Given,
    /// Volume × density (g/cm³)
    Density { density: f64 },
    /// Area × unit weight (kg/m²) for the thickness
    UnitWeight { kg_per_m2: f64 },
}

/// Material density entry; `None` defers to the unit-weight table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MaterialDensity {
    pub material: String,
    pub density: Option<f64>,
}

/// Densities plus the per-thickness area weight for plate without a
/// constant density (checkered plate)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Materials {
    densities: Vec<MaterialDensity>,
    /// `(thickness_mm, kg_per_m2)`, ascending by thickness
    unit_weights: Vec<(f64, f64)>,
}

const THICKNESS_EPSILON: f64 = 1e-9;

impl Materials {
    pub fn new(densities: Vec<MaterialDensity>, mut unit_weights: Vec<(f64, f64)>) -> Result<Self, String> {
        if densities.is_empty() {
            return Err("no materials defined".to_string());
        }
        for m in &densities {
            match m.density {
                Some(d) if !(d.is_finite() && d > 0.0) => {
                    return Err(format!("material {} has invalid density {}", m.material, d));
                }
                None if unit_weights.is_empty() => {
                    return Err(format!(
                        "material {} has no density and there is no unit weight table",
                        m.material
                    ));
                }
                _ => {}
            }
        }
        if let Some((t, w)) = unit_weights
            .iter()
            .find(|(t, w)| !(t.is_finite() && *t > 0.0 && w.is_finite() && *w > 0.0))
        {
            return Err(format!("invalid unit weight entry {}mm => {}", t, w));
        }
        unit_weights.sort_by(|a, b| a.0.total_cmp(&b.0));
        Ok(Self {
            densities,
            unit_weights,
        })
    }

    pub fn names(&self) -> Vec<&str> {
        self.densities.iter().map(|m| m.material.as_str()).collect()
    }

    pub fn densities(&self) -> &[MaterialDensity] {
        &self.densities
    }

    pub fn unit_weights(&self) -> &[(f64, f64)] {
        &self.unit_weights
    }

    /// Part weight in kg from developed width, length and thickness (all mm)
    pub fn weight_kg(
        &self,
        material: &str,
        thickness_mm: f64,
        width_mm: f64,
        length_mm: f64,
    ) -> Result<(f64, WeightBasis), QuoteError> {
        let entry = self
            .densities
            .iter()
            .find(|m| m.material == material)
            .ok_or_else(|| QuoteError::UnknownMaterial {
                material: material.to_string(),
                known: self.names().join(", "),
            })?;

        let area_m2 = (width_mm / 1000.0) * (length_mm / 1000.0);
        match entry.density {
            Some(density) => {
                let weight = area_m2 * (thickness_mm / 1000.0) * (density * 1000.0);
                Ok((weight, WeightBasis::Density { density }))
            }
            None => {
                let kg_per_m2 = self
                    .unit_weights
                    .iter()
                    .find(|(t, _)| (t - thickness_mm).abs() < THICKNESS_EPSILON)
                    .map(|(_, w)| *w)
                    .ok_or_else(|| QuoteError::ThicknessNotInTable {
                        material: material.to_string(),
                        thickness_mm,
                        known: self
                            .unit_weights
                            .iter()
                            .map(|(t, _)| format!("{}", t))
                            .collect::<Vec<_>>()
                            .join(", "),
                    })?;
                Ok((area_m2 * kg_per_m2, WeightBasis::UnitWeight { kg_per_m2 }))
            }
        }
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn materials() -> Materials {
        Materials::new(
            vec![
                MaterialDensity {
                    material: "SS400".to_string(),
                    density: Some(7.85),
                },
                MaterialDensity {
                    material: "CP400".to_string(),
                    density: None,
                },
            ],
            vec![(4.5, 39.2), (3.2, 28.9)],
        )
        .unwrap()
    }

    pub(crate) fn bands(min: u32) -> QuantityBands {
        QuantityBands::new(vec![
            QuantityBand { min, max: Some(4), rate: 1.5 },
            QuantityBand { min: 5, max: Some(19), rate: 1.0 },
            QuantityBand { min: 20, max: None, rate: 0.8 },
        ])
        .unwrap()
    }

    #[test]
    fn test_quantity_band_selection() {
        let bands = bands(1);
        assert_eq!(bands.band_for(1).unwrap().rate, 1.5);
        assert_eq!(bands.band_for(4).unwrap().rate, 1.5);
        assert_eq!(bands.band_for(5).unwrap().rate, 1.0);
        assert_eq!(bands.band_for(10).unwrap().rate, 1.0);
        assert_eq!(bands.band_for(19).unwrap().rate, 1.0);
        assert_eq!(bands.band_for(20).unwrap().rate, 0.8);
        assert_eq!(bands.band_for(50).unwrap().rate, 0.8);
        assert_eq!(bands.band_for(1_000_000).unwrap().label(), "20-");
        assert!(bands.band_for(0).is_err());
    }

    #[test]
    fn test_quantity_bands_must_be_contiguous() {
        let err = QuantityBands::new(vec![
            QuantityBand { min: 1, max: Some(4), rate: 1.5 },
            QuantityBand { min: 6, max: None, rate: 1.0 },
        ])
        .unwrap_err();
        assert!(err.contains("not contiguous"));

        let err = QuantityBands::new(vec![QuantityBand { min: 1, max: Some(4), rate: 1.5 }])
            .unwrap_err();
        assert!(err.contains("must be unbounded"));

        assert!(QuantityBands::new(vec![]).is_err());
    }

    #[test]
    fn test_weight_from_density() {
        let m = materials();
        let (w, basis) = m.weight_kg("SS400", 3.2, 200.0, 1500.0).unwrap();
        assert!((w - 7.536).abs() < 1e-9);
        assert_eq!(basis, WeightBasis::Density { density: 7.85 });
    }

    #[test]
    fn test_weight_from_unit_weight_table() {
        let m = materials();
        let (w, basis) = m.weight_kg("CP400", 4.5, 500.0, 1000.0).unwrap();
        assert!((w - 19.6).abs() < 1e-9);
        assert_eq!(basis, WeightBasis::UnitWeight { kg_per_m2: 39.2 });

        let err = m.weight_kg("CP400", 5.0, 500.0, 1000.0).unwrap_err();
        assert!(matches!(err, QuoteError::ThicknessNotInTable { .. }));
    }

    #[test]
    fn test_unknown_material() {
        let err = materials().weight_kg("SUS999", 1.0, 1.0, 1.0).unwrap_err();
        match err {
            QuoteError::UnknownMaterial { material, known } => {
                assert_eq!(material, "SUS999");
                assert!(known.contains("SS400"));
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_unknown_shape() {
        let shapes = ShapeMultipliers::new(vec![ShapeRate {
            shape: "L曲げ".to_string(),
            multiplier: 1.0,
        }])
        .unwrap();
        assert_eq!(shapes.multiplier("L曲げ").unwrap(), 1.0);
        assert!(matches!(
            shapes.multiplier("S曲げ"),
            Err(QuoteError::UnknownShape { .. })
        ));
    }

    #[test]
    fn test_matrix_shape_checked() {
        let weights = Thresholds::with_labels(vec![1.0, 2.0], |_, b, _| b.to_string()).unwrap();
        let lengths = Thresholds::with_labels(vec![835.0], |_, b, _| b.to_string()).unwrap();
        assert!(BasePriceMatrix::new(weights.clone(), lengths.clone(), vec![vec![1]]).is_err());
        assert!(BasePriceMatrix::new(weights.clone(), lengths.clone(), vec![vec![1], vec![2, 3]]).is_err());
        let m = BasePriceMatrix::new(weights, lengths, vec![vec![100], vec![200]]).unwrap();
        assert_eq!(m.lookup(1.5, 5000.0).base_price, 200);
    }
}
