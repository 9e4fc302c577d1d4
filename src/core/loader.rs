//! Table loading
//!
//! Parses the JSON and CSV table files into validated pricing tables. Syntax
//! errors carry a source span; structural problems (unsorted bounds, ragged
//! matrix, gaps between quantity bands) name the file and the offending entry.
//! Nothing is quoted until every table for a scheme has loaded.

use csv::ReaderBuilder;
use serde::de::{DeserializeOwned, Deserializer, MapAccess, Visitor};
use serde::Deserialize;
use std::fmt;
use std::marker::PhantomData;
use std::path::Path;
use tracing::{debug, info};

use crate::core::classify::{RangeBand, Thresholds};
use crate::core::error::TableError;
use crate::data::diagnostics::TableSyntaxError;
use crate::data::{
    read_file, DataSource, EVALS_FILE, HOLE_PRICES_FILE, PRICES_FILE, RATES_FILE, V21_RULES_FILE,
    V21_TABLE_FILE,
};
use crate::pricing::calc_sheet::{CalcSheetTables, DEFAULT_FLOOR_YEN};
use crate::pricing::evals::EvalCase;
use crate::pricing::holes::{HoleBands, HolePriceBand, PierceTier, TieredHolePrices};
use crate::pricing::tables::{
    BasePriceMatrix, MaterialDensity, Materials, QuantityBand, QuantityBands, ShapeMultipliers,
    ShapeRate,
};
use crate::pricing::v21::{ShapeTable, SmallPartRule, V21Rules, V21Tables};
use crate::pricing::{PricingScheme, SchemeKind};

/// Class bounds at or above this value mean "no upper limit"
pub const OVERFLOW_SENTINEL: f64 = 99_999.0;

#[derive(Debug, Deserialize)]
struct PricesFile {
    #[serde(rename = "重量区分")]
    weight_bounds: Vec<f64>,
    #[serde(rename = "長さ区分")]
    length_bounds: Vec<f64>,
    #[serde(rename = "基準価格")]
    prices: Vec<Vec<u64>>,
}

#[derive(Debug, Deserialize)]
struct RatesFile {
    #[serde(rename = "形状乗率", deserialize_with = "ordered")]
    shapes: Vec<(String, f64)>,
    #[serde(rename = "数量調整")]
    quantity: Vec<QuantityBand>,
    #[serde(rename = "比重", deserialize_with = "ordered")]
    densities: Vec<(String, Option<f64>)>,
    #[serde(rename = "縞板_単位重量", default, deserialize_with = "ordered")]
    unit_weights: Vec<(String, serde_json::Value)>,
    #[serde(rename = "曲げ工賃下限", default)]
    floor_yen: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct HolePricesFile {
    #[serde(rename = "穴あけ単価")]
    bands: Vec<HoleBandRow>,
}

#[derive(Debug, Deserialize)]
struct HoleBandRow {
    #[serde(rename = "板厚min_mm")]
    min_mm: f64,
    #[serde(rename = "板厚max_mm")]
    max_mm: f64,
    #[serde(rename = "丸穴_標準")]
    round_standard: u64,
    #[serde(rename = "丸穴_下限", default)]
    round_minimum: Option<u64>,
    #[serde(rename = "長穴_標準")]
    slotted_standard: u64,
    #[serde(rename = "長穴_下限", default)]
    slotted_minimum: Option<u64>,
}

#[derive(Debug, Deserialize)]
struct V21RulesFile {
    #[serde(rename = "数量調整")]
    quantity: Vec<QuantityBand>,
    #[serde(rename = "中押し")]
    mid_support: f64,
    #[serde(rename = "逆曲げ")]
    reverse_bend: f64,
    #[serde(rename = "長尺目押し_加算")]
    long_press_addon: u64,
    #[serde(rename = "長尺目押し_最小長さ_mm")]
    long_press_min_length: f64,
    #[serde(rename = "深曲げ_加算")]
    deep_bend_addon: u64,
    #[serde(rename = "小物割引")]
    small_part: SmallPartRow,
    #[serde(rename = "曲げ工賃下限")]
    floor_yen: u64,
    #[serde(rename = "レーザーポンチ単価")]
    punch_price: u64,
    #[serde(rename = "ピアス単価")]
    pierce_tiers: Vec<PierceRow>,
}

#[derive(Debug, Deserialize)]
struct SmallPartRow {
    #[serde(rename = "長辺上限_mm")]
    max_long_side_mm: f64,
    #[serde(rename = "重量上限_kg")]
    max_weight_kg: f64,
    #[serde(rename = "乗率")]
    factor: f64,
}

#[derive(Debug, Deserialize)]
struct PierceRow {
    #[serde(rename = "板厚上限_mm")]
    max_mm: Option<f64>,
    #[serde(rename = "単価")]
    price: u64,
}

/// Deserialize a JSON object into its entries, keeping file order
fn ordered<'de, D, V>(deserializer: D) -> Result<Vec<(String, V)>, D::Error>
where
    D: Deserializer<'de>,
    V: Deserialize<'de>,
{
    struct Entries<V>(PhantomData<V>);

    impl<'de, V: Deserialize<'de>> Visitor<'de> for Entries<V> {
        type Value = Vec<(String, V)>;

        fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
            f.write_str("an object")
        }

        fn visit_map<A: MapAccess<'de>>(self, mut map: A) -> Result<Self::Value, A::Error> {
            let mut entries = Vec::with_capacity(map.size_hint().unwrap_or(0));
            while let Some(entry) = map.next_entry::<String, V>()? {
                entries.push(entry);
            }
            Ok(entries)
        }
    }

    deserializer.deserialize_map(Entries(PhantomData))
}

/// Parse JSON, mapping syntax and shape errors to a spanned diagnostic
fn parse_json<T: DeserializeOwned>(content: &str, file: &str) -> Result<T, TableError> {
    serde_json::from_str(content)
        .map_err(|e| TableError::Syntax(TableSyntaxError::from_json_error(&e, content, file)))
}

/// Ascending class bounds; a sentinel bound becomes the open overflow class
fn class_thresholds(bounds: Vec<f64>, unit: &str, file: &str) -> Result<Thresholds, TableError> {
    let bounds: Vec<f64> = bounds
        .into_iter()
        .map(|b| if b >= OVERFLOW_SENTINEL { f64::INFINITY } else { b })
        .collect();
    Thresholds::with_labels(bounds, |i, b, all| {
        if b.is_infinite() {
            match i.checked_sub(1).map(|p| all[p]) {
                Some(previous) => format!(">{}{}", previous, unit),
                None => "any".to_string(),
            }
        } else {
            format!("≤{}{}", b, unit)
        }
    })
    .map_err(|e| TableError::invalid(file, e.to_string()))
}

fn materials_from(rates: &RatesFile, file: &str) -> Result<Materials, TableError> {
    let densities = rates
        .densities
        .iter()
        .map(|(material, density)| MaterialDensity {
            material: material.clone(),
            density: *density,
        })
        .collect();
    let mut unit_weights = Vec::new();
    for (key, value) in &rates.unit_weights {
        if key.starts_with('_') {
            continue;
        }
        let thickness: f64 = key
            .parse()
            .map_err(|_| TableError::invalid(file, format!("縞板_単位重量 key '{}' is not a thickness", key)))?;
        let weight = value
            .as_f64()
            .ok_or_else(|| TableError::invalid(file, format!("縞板_単位重量 '{}' is not a number", key)))?;
        unit_weights.push((thickness, weight));
    }
    Materials::new(densities, unit_weights).map_err(|e| TableError::invalid(file, e))
}

fn load_rates(source: &DataSource) -> Result<RatesFile, TableError> {
    parse_json(&source.read(RATES_FILE)?, RATES_FILE)
}

/// Load the calc-sheet tables
pub fn load_calc_sheet(source: &DataSource) -> Result<CalcSheetTables, TableError> {
    let prices: PricesFile = parse_json(&source.read(PRICES_FILE)?, PRICES_FILE)?;
    let weights = class_thresholds(prices.weight_bounds, "kg", PRICES_FILE)?;
    let lengths = class_thresholds(prices.length_bounds, "mm", PRICES_FILE)?;
    let matrix = BasePriceMatrix::new(weights, lengths, prices.prices)
        .map_err(|e| TableError::invalid(PRICES_FILE, e))?;

    let rates = load_rates(source)?;
    let shapes = ShapeMultipliers::new(
        rates
            .shapes
            .iter()
            .map(|(shape, multiplier)| ShapeRate {
                shape: shape.clone(),
                multiplier: *multiplier,
            })
            .collect(),
    )
    .map_err(|e| TableError::invalid(RATES_FILE, e))?;
    let quantity =
        QuantityBands::new(rates.quantity.clone()).map_err(|e| TableError::invalid(RATES_FILE, e))?;
    let materials = materials_from(&rates, RATES_FILE)?;

    let holes = match source.read(HOLE_PRICES_FILE) {
        Ok(content) => Some(parse_hole_bands(&content)?),
        Err(TableError::Missing(path)) => {
            info!(path = %path.display(), "no hole price table; hole costs disabled");
            None
        }
        Err(e) => return Err(e),
    };

    info!(
        %source,
        shapes = shapes.names().len(),
        materials = materials.names().len(),
        hole_bands = holes.as_ref().map_or(0, |h| h.iter().count()),
        "loaded calc-sheet tables"
    );
    Ok(CalcSheetTables {
        matrix,
        shapes,
        quantity,
        materials,
        holes,
        floor_yen: rates.floor_yen.unwrap_or(DEFAULT_FLOOR_YEN),
    })
}

fn parse_hole_bands(content: &str) -> Result<HoleBands, TableError> {
    let file: HolePricesFile = parse_json(content, HOLE_PRICES_FILE)?;
    let bands = file
        .bands
        .into_iter()
        .map(|row| HolePriceBand {
            thickness: RangeBand {
                min: row.min_mm,
                max: row.max_mm,
            },
            round_standard: row.round_standard,
            round_minimum: row.round_minimum,
            slotted_standard: row.slotted_standard,
            slotted_minimum: row.slotted_minimum,
        })
        .collect();
    HoleBands::new(bands).map_err(|e| TableError::invalid(HOLE_PRICES_FILE, e))
}

/// Load the v2.1 tables
///
/// `csv_override` replaces the base price table from the data source.
pub fn load_v21(source: &DataSource, csv_override: Option<&Path>) -> Result<V21Tables, TableError> {
    let (csv_content, csv_name) = match csv_override {
        Some(path) => (read_file(path)?, path.display().to_string()),
        None => (source.read(V21_TABLE_FILE)?, V21_TABLE_FILE.to_string()),
    };
    let shapes = parse_shape_tables(&csv_content, &csv_name)?;

    let rules_file: V21RulesFile = parse_json(&source.read(V21_RULES_FILE)?, V21_RULES_FILE)?;
    let rules = v21_rules(rules_file)?;

    // Densities are shared with the calc-sheet rates; without them a weight
    // must be given directly.
    let materials = match load_rates(source) {
        Ok(rates) => Some(materials_from(&rates, RATES_FILE)?),
        Err(TableError::Missing(path)) => {
            info!(path = %path.display(), "no material table; weights must be given");
            None
        }
        Err(e) => return Err(e),
    };

    info!(
        %source,
        table = %csv_name,
        shapes = shapes.len(),
        "loaded v2.1 tables"
    );
    Ok(V21Tables {
        shapes,
        rules,
        materials,
    })
}

fn v21_rules(file: V21RulesFile) -> Result<V21Rules, TableError> {
    let invalid = |reason: String| TableError::invalid(V21_RULES_FILE, reason);
    for (name, factor) in [
        ("中押し", file.mid_support),
        ("逆曲げ", file.reverse_bend),
        ("小物割引.乗率", file.small_part.factor),
    ] {
        if !(factor.is_finite() && factor > 0.0) {
            return Err(invalid(format!("{} must be a positive factor, got {}", name, factor)));
        }
    }
    let quantity = QuantityBands::new(file.quantity).map_err(invalid)?;
    let holes = TieredHolePrices::new(
        file.punch_price,
        file.pierce_tiers
            .into_iter()
            .map(|row| PierceTier {
                max_mm: row.max_mm,
                price: row.price,
            })
            .collect(),
    )
    .map_err(invalid)?;
    Ok(V21Rules {
        quantity,
        mid_support_factor: file.mid_support,
        reverse_bend_factor: file.reverse_bend,
        long_press_addon_yen: file.long_press_addon,
        long_press_min_length_mm: file.long_press_min_length,
        deep_bend_addon_yen: file.deep_bend_addon,
        small_part: SmallPartRule {
            max_long_side_mm: file.small_part.max_long_side_mm,
            max_weight_kg: file.small_part.max_weight_kg,
            factor: file.small_part.factor,
        },
        floor_yen: file.floor_yen,
        holes,
    })
}

/// Parse a length column header: `〜835mm` is 835, `3048mm超` is open
fn length_bound(header: &str) -> Option<f64> {
    let header = header.trim();
    if header.ends_with('超') {
        return Some(f64::INFINITY);
    }
    header
        .trim_start_matches(['〜', '~', '～'])
        .trim_end_matches("mm")
        .trim()
        .parse()
        .ok()
}

/// Parse the per-shape base price CSV
///
/// Columns: 形状, 重量範囲, then one column per length class. Rows of a
/// shape may appear in any order; shapes keep their first-appearance order.
pub fn parse_shape_tables(content: &str, file: &str) -> Result<Vec<ShapeTable>, TableError> {
    let csv_error = |message: String| TableError::Csv {
        file: file.to_string(),
        message,
    };

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .trim(csv::Trim::All)
        .from_reader(content.as_bytes());

    let headers = rdr.headers().map_err(|e| csv_error(e.to_string()))?.clone();
    if headers.len() < 3 {
        return Err(csv_error(format!(
            "expected 形状, 重量範囲 and length columns, found {} columns",
            headers.len()
        )));
    }
    let length_headers: Vec<String> = headers.iter().skip(2).map(str::to_string).collect();
    let mut length_bounds = Vec::with_capacity(length_headers.len());
    for header in &length_headers {
        let bound = length_bound(header)
            .ok_or_else(|| csv_error(format!("length column '{}' has no mm bound", header)))?;
        length_bounds.push(bound);
    }
    let lengths = Thresholds::new(length_bounds, length_headers)
        .map_err(|e| TableError::invalid(file, format!("length columns: {}", e)))?;

    // (shape, [(weight, prices)])
    let mut grouped: Vec<(String, Vec<(f64, Vec<u64>)>)> = Vec::new();
    for (row_idx, result) in rdr.records().enumerate() {
        let row_num = row_idx + 2; // 1-indexed plus header row
        let record = result.map_err(|e| csv_error(format!("row {}: {}", row_num, e)))?;
        if record.len() != headers.len() {
            return Err(csv_error(format!(
                "row {}: {} fields, expected {}",
                row_num,
                record.len(),
                headers.len()
            )));
        }
        let shape = record[0].to_string();
        let weight: f64 = record[1]
            .parse()
            .map_err(|_| csv_error(format!("row {}: weight '{}' is not a number", row_num, &record[1])))?;
        let prices = record
            .iter()
            .skip(2)
            .map(|cell| {
                cell.parse::<u64>()
                    .map_err(|_| csv_error(format!("row {}: price '{}' is not a whole yen amount", row_num, cell)))
            })
            .collect::<Result<Vec<_>, _>>()?;

        match grouped.iter_mut().find(|(s, _)| *s == shape) {
            Some((_, rows)) => rows.push((weight, prices)),
            None => grouped.push((shape, vec![(weight, prices)])),
        }
    }
    if grouped.is_empty() {
        return Err(TableError::invalid(file, "no price rows"));
    }

    grouped
        .into_iter()
        .map(|(shape, mut rows)| {
            rows.sort_by(|a, b| a.0.total_cmp(&b.0));
            let (bounds, prices): (Vec<f64>, Vec<Vec<u64>>) = rows.into_iter().unzip();
            let weights = Thresholds::with_labels(bounds, |_, b, _| format!("{}kg", b))
                .map_err(|e| TableError::invalid(file, format!("{} weights: {}", shape, e)))?;
            let matrix = BasePriceMatrix::new(weights, lengths.clone(), prices)
                .map_err(|e| TableError::invalid(file, format!("{}: {}", shape, e)))?;
            debug!(shape = %shape, rows = matrix.weights.len(), "parsed shape table");
            Ok(ShapeTable { shape, matrix })
        })
        .collect()
}

/// Load the tables of one scheme
pub fn load_scheme(
    kind: SchemeKind,
    source: &DataSource,
    csv_override: Option<&Path>,
) -> Result<PricingScheme, TableError> {
    match kind {
        SchemeKind::CalcSheet => load_calc_sheet(source).map(PricingScheme::CalcSheet),
        SchemeKind::V21 => load_v21(source, csv_override).map(PricingScheme::V21),
    }
}

/// Load an evaluation suite, from `path` or the data source
pub fn load_evals(source: &DataSource, path: Option<&Path>) -> Result<Vec<EvalCase>, TableError> {
    match path {
        Some(path) => {
            let name = path.display().to_string();
            parse_json(&read_file(path)?, &name)
        }
        None => parse_json(&source.read(EVALS_FILE)?, EVALS_FILE),
    }
}
