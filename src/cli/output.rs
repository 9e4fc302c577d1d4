//! Quote rendering for each output format

use console::style;
use miette::{IntoDiagnostic, Result};
use tabled::{builder::Builder, settings::Style};

use crate::cli::helpers::{escape_tsv, format_factor, format_number, format_yen};
use crate::cli::OutputFormat;
use crate::pricing::holes::{BandStatus, BandedHoleCost, TieredHoleCost};
use crate::pricing::quote::HoleCost;
use crate::pricing::tables::WeightBasis;
use crate::pricing::{QuoteResult, SchemeKind};

/// One row of a rendered quote
#[derive(Debug, Clone, PartialEq)]
pub struct LineItem {
    /// Machine key, used by tsv output
    pub key: &'static str,
    pub label: String,
    /// Human-readable value
    pub display: String,
    /// Plain value for piping
    pub raw: String,
}

impl LineItem {
    fn new(key: &'static str, label: impl Into<String>, display: impl Into<String>, raw: impl ToString) -> Self {
        Self {
            key,
            label: label.into(),
            display: display.into(),
            raw: raw.to_string(),
        }
    }
}

/// Itemized rows of a quote, in display order
pub fn line_items(q: &QuoteResult) -> Vec<LineItem> {
    let b = &q.bending;
    let mut items = vec![
        LineItem::new("scheme", "Scheme", q.scheme.to_string(), q.scheme),
        LineItem::new("shape", "Shape", q.shape.clone(), &q.shape),
        LineItem::new("thickness_mm", "Thickness", format!("{} mm", q.thickness_mm), q.thickness_mm),
        LineItem::new("quantity", "Quantity", q.quantity.to_string(), q.quantity),
        LineItem::new(
            "weight_kg",
            "Weight",
            format!("{:.3} kg ({})", q.weight_kg, weight_basis(&q.weight_basis)),
            format!("{:.3}", q.weight_kg),
        ),
        LineItem::new("weight_class", "Weight class", q.weight_class.clone(), &q.weight_class),
        LineItem::new("length_class", "Length class", q.length_class.clone(), &q.length_class),
        LineItem::new("base_price", "Base price", format_yen(b.base_price), b.base_price),
    ];
    if let Some(m) = b.shape_multiplier {
        items.push(LineItem::new("shape_multiplier", "Shape factor", format!("×{}", format_factor(m)), format_factor(m)));
    }
    items.push(LineItem::new(
        "quantity_rate",
        "Quantity rate",
        format!("×{} ({})", format_factor(b.quantity_adjustment), b.quantity_band),
        format_factor(b.quantity_adjustment),
    ));
    if q.scheme == SchemeKind::V21 {
        items.push(LineItem::new(
            "complexity",
            "Complexity",
            format!("×{}", format_factor(b.complexity_adjustment)),
            format_factor(b.complexity_adjustment),
        ));
        items.push(LineItem::new("addons", "Add-ons", format!("+{}", format_yen(b.addons_yen)), b.addons_yen));
        items.push(LineItem::new(
            "small_part",
            "Small part",
            format!("×{}", format_factor(b.small_part_adjustment)),
            format_factor(b.small_part_adjustment),
        ));
    }
    items.push(LineItem::new(
        "raw_price",
        "Raw price",
        format!("{:.2} ({})", b.raw_price, b.rounding),
        format!("{:.2}", b.raw_price),
    ));
    if let Some(unit) = b.unit_price {
        items.push(LineItem::new("unit_price", "Unit price", format_yen(unit), unit));
    }
    items.push(LineItem::new("bending_total", "Bending", format_yen(b.total), b.total));
    items.push(LineItem::new("holes", "Holes", hole_detail(&q.holes, q.thickness_mm), q.holes.total()));
    items.push(LineItem::new(
        "tax_excluded",
        "Tax excluded",
        format_yen(q.processing_cost_tax_excluded),
        q.processing_cost_tax_excluded,
    ));
    items.push(LineItem::new(
        "tax",
        format!("Tax ({}%)", format_factor(q.tax_rate * 100.0)),
        format_yen(q.tax),
        q.tax,
    ));
    items.push(LineItem::new(
        "tax_included",
        "Total",
        format_yen(q.processing_cost_tax_included),
        q.processing_cost_tax_included,
    ));
    items
}

fn weight_basis(basis: &WeightBasis) -> String {
    match basis {
        WeightBasis::Given => "given".to_string(),
        WeightBasis::Density { density } => format!("density {}", density),
        WeightBasis::UnitWeight { kg_per_m2 } => format!("{} kg/m²", kg_per_m2),
    }
}

fn hole_detail(holes: &HoleCost, thickness_mm: f64) -> String {
    match holes {
        HoleCost::Banded(c) => banded_detail(c, thickness_mm),
        HoleCost::Tiered(c) => tiered_detail(c),
    }
}

fn banded_detail(c: &BandedHoleCost, thickness_mm: f64) -> String {
    if c.round_count == 0 && c.slotted_count == 0 {
        return "none".to_string();
    }
    match (c.status, c.band) {
        (BandStatus::Matched, Some(band)) => format!(
            "{} round × {} + {} slotted × {} ({}-{} mm) = {}",
            c.round_count,
            format_yen(c.round_price),
            c.slotted_count,
            format_yen(c.slotted_price),
            format_number(band.min),
            format_number(band.max),
            format_yen(c.total)
        ),
        (BandStatus::NotConfigured, _) => "no hole price table loaded (¥0)".to_string(),
        _ => format!("no matching band for {} mm (¥0)", thickness_mm),
    }
}

fn tiered_detail(c: &TieredHoleCost) -> String {
    if c.punch_count == 0 && c.pierce_count == 0 {
        return "none".to_string();
    }
    format!(
        "{} punch × {} + {} pierce × {} = {}",
        c.punch_count,
        format_yen(c.punch_price),
        c.pierce_count,
        format_yen(c.pierce_price),
        format_yen(c.total)
    )
}

/// Human-readable summary
pub fn render_summary(q: &QuoteResult) -> String {
    let items = line_items(q);
    let width = items.iter().map(|i| i.label.chars().count()).max().unwrap_or(0);
    let mut out = format!(
        "{} {} × {}\n",
        style(format!("Quote ({})", q.scheme)).bold(),
        style(&q.shape).cyan(),
        q.quantity
    );
    for item in items.iter().filter(|i| !matches!(i.key, "scheme" | "shape" | "quantity")) {
        let label = format!("{:<width$}", item.label, width = width);
        let value = match item.key {
            "tax_included" => style(&item.display).green().bold().to_string(),
            "holes" if item.display.starts_with("no ") => style(&item.display).yellow().to_string(),
            _ => item.display.clone(),
        };
        if item.key == "tax_excluded" {
            out.push_str(&format!("  {}\n", style("─".repeat(width + 12)).dim()));
        }
        out.push_str(&format!("  {}  {}\n", style(label).dim(), value));
    }
    out
}

/// Markdown table of the line items
pub fn render_markdown(q: &QuoteResult) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Item", "Value"]);
    for item in line_items(q) {
        builder.push_record([item.label, item.display]);
    }
    let mut output = format!("# Quote: {} × {}\n\n", q.shape, q.quantity);
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push('\n');
    output
}

/// Render a quote in the requested format
pub fn render_quote(q: &QuoteResult, format: OutputFormat) -> Result<String> {
    match format {
        OutputFormat::Auto => Ok(render_summary(q)),
        OutputFormat::Yaml => serde_yml::to_string(q).into_diagnostic(),
        OutputFormat::Json => {
            let mut json = serde_json::to_string_pretty(q).into_diagnostic()?;
            json.push('\n');
            Ok(json)
        }
        OutputFormat::Tsv => Ok(line_items(q)
            .iter()
            .map(|i| format!("{}\t{}\n", i.key, escape_tsv(&i.raw)))
            .collect()),
        OutputFormat::Md => Ok(render_markdown(q)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{load_calc_sheet, load_v21};
    use crate::data::DataSource;
    use crate::pricing::quote::{HoleCounts, ProcessFlags, QuoteInput, QuoteSettings};

    fn calc_quote() -> QuoteResult {
        let tables = load_calc_sheet(&DataSource::Embedded).unwrap();
        let input = QuoteInput::new("L曲げ", 3.2, 1500.0, 1)
            .with_geometry(200.0, "SS400")
            .with_holes(HoleCounts {
                round: 4,
                slotted: 2,
                ..Default::default()
            });
        tables.quote(&input, &QuoteSettings::default()).unwrap()
    }

    #[test]
    fn test_tsv_keys_and_values() {
        let tsv = render_quote(&calc_quote(), OutputFormat::Tsv).unwrap();
        assert!(tsv.contains("scheme\tcalc-sheet\n"));
        assert!(tsv.contains("unit_price\t1800\n"));
        assert!(tsv.contains("holes\t240\n"));
        assert!(tsv.contains("tax_included\t2244\n"));
        assert!(!tsv.contains("complexity"));
    }

    #[test]
    fn test_json_is_snake_case() {
        let json = render_quote(&calc_quote(), OutputFormat::Json).unwrap();
        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["scheme"], "calc-sheet");
        assert_eq!(value["processing_cost_tax_excluded"], 2040);
        assert_eq!(value["holes"]["scheme"], "banded");
        assert_eq!(value["holes"]["status"], "matched");
        assert_eq!(value["weight_basis"]["basis"], "density");
    }

    #[test]
    fn test_markdown_table() {
        let md = render_markdown(&calc_quote());
        assert!(md.starts_with("# Quote: L曲げ × 1"));
        assert!(md.contains("| Unit price"));
        assert!(md.contains("¥2,244"));
    }

    #[test]
    fn test_v21_items_include_adjustments() {
        let tables = load_v21(&DataSource::Embedded, None).unwrap();
        let input = QuoteInput::new("L曲げ", 3.2, 1200.0, 10)
            .with_weight(4.0)
            .with_long_side(1200.0)
            .with_flags(ProcessFlags {
                mid_support: true,
                reverse_bend: true,
                long_press: true,
                deep_bend: true,
            });
        let q = tables.quote(&input, &QuoteSettings::default()).unwrap();
        let items = line_items(&q);
        let find = |key| items.iter().find(|i| i.key == key).map(|i| i.display.clone());
        assert_eq!(find("complexity").as_deref(), Some("×1.8"));
        assert_eq!(find("addons").as_deref(), Some("+¥5,500"));
        assert_eq!(find("bending_total").as_deref(), Some("¥7,300"));
        assert_eq!(find("unit_price"), None);
        assert_eq!(find("shape_multiplier"), None);
    }

    #[test]
    fn test_unmatched_band_detail() {
        let tables = load_calc_sheet(&DataSource::Embedded).unwrap();
        let input = QuoteInput::new("L曲げ", 15.0, 1500.0, 1)
            .with_geometry(200.0, "SS400")
            .with_holes(HoleCounts {
                round: 1,
                ..Default::default()
            });
        let q = tables.quote(&input, &QuoteSettings::default()).unwrap();
        let holes = line_items(&q).into_iter().find(|i| i.key == "holes").unwrap();
        assert_eq!(holes.display, "no matching band for 15 mm (¥0)");
    }

    #[test]
    fn test_summary_snapshot() {
        console::set_colors_enabled(false);
        insta::assert_snapshot!(render_summary(&calc_quote()), @r"
        Quote (calc-sheet) L曲げ × 1
          Thickness      3.2 mm
          Weight         7.536 kg (density 7.85)
          Weight class   ≤10kg
          Length class   ≤1670mm
          Base price     ¥1,200
          Shape factor   ×1
          Quantity rate  ×1.5 (1-4)
          Raw price      1800.00 (shop_fifty)
          Unit price     ¥1,800
          Bending        ¥1,800
          Holes          4 round × ¥30 + 2 slotted × ¥60 (1.7-3.2 mm) = ¥240
          ─────────────────────────
          Tax excluded   ¥2,040
          Tax (10%)      ¥204
          Total          ¥2,244
        ");
    }
}
