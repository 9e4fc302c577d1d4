//! `bendq tables` command - show the loaded pricing tables
//!
//! Markdown mirrors the data sheet of the computation workbook; yaml and json
//! dump the validated table structures.

use miette::{IntoDiagnostic, Result};
use std::path::PathBuf;
use tabled::{builder::Builder, settings::Style};
use tracing::debug;

use crate::cli::helpers::{format_factor, format_number, format_yen, Session};
use crate::cli::{GlobalOpts, OutputFormat};
use crate::core::loader::load_scheme;
use crate::pricing::tables::{BasePriceMatrix, Materials, QuantityBands};
use crate::pricing::{CalcSheetTables, PricingScheme, SchemeKind, V21Tables};

#[derive(clap::Args, Debug)]
pub struct TablesArgs {
    /// Scheme whose tables to show (default: configured variant)
    #[arg(value_enum)]
    pub scheme: Option<SchemeKind>,

    /// v2.1 base price table to use instead of the configured one
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

pub fn run(args: TablesArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::resolve(global)?;
    let kind = args.scheme.unwrap_or_else(|| session.config.variant());
    let scheme = load_scheme(kind, &session.source, args.csv.as_deref())?;
    debug!(scheme = %scheme.kind(), shapes = scheme.shapes().len(), "rendering tables");

    let output = match (&scheme, session.format) {
        (PricingScheme::CalcSheet(t), OutputFormat::Yaml) => serde_yml::to_string(t).into_diagnostic()?,
        (PricingScheme::V21(t), OutputFormat::Yaml) => serde_yml::to_string(t).into_diagnostic()?,
        (PricingScheme::CalcSheet(t), OutputFormat::Json) => serde_json::to_string_pretty(t).into_diagnostic()? + "\n",
        (PricingScheme::V21(t), OutputFormat::Json) => serde_json::to_string_pretty(t).into_diagnostic()? + "\n",
        (PricingScheme::CalcSheet(t), _) => calc_sheet_markdown(t, &session.source.to_string()),
        (PricingScheme::V21(t), _) => v21_markdown(t, &session.source.to_string()),
    };
    print!("{}", output);
    Ok(())
}

fn matrix_table(matrix: &BasePriceMatrix) -> String {
    let mut builder = Builder::default();
    let mut header = vec!["Weight \\ Length".to_string()];
    header.extend(matrix.lengths.labels().iter().cloned());
    builder.push_record(header);
    for (i, row) in matrix.prices.iter().enumerate() {
        let mut record = vec![matrix.weights.label(i).to_string()];
        record.extend(row.iter().map(|p| p.to_string()));
        builder.push_record(record);
    }
    builder.build().with(Style::markdown()).to_string()
}

fn quantity_table(bands: &QuantityBands) -> String {
    let mut builder = Builder::default();
    builder.push_record(["Quantity", "Rate"]);
    for band in bands.iter() {
        builder.push_record([band.label(), format_factor(band.rate)]);
    }
    builder.build().with(Style::markdown()).to_string()
}

fn materials_section(materials: &Materials, output: &mut String) {
    let mut builder = Builder::default();
    builder.push_record(["Material", "Density (g/cm³)"]);
    for m in materials.densities() {
        let density = match m.density {
            Some(d) => format_factor(d),
            None => "unit weight table".to_string(),
        };
        builder.push_record([m.material.clone(), density]);
    }
    output.push_str("## Materials (比重)\n\n");
    output.push_str(&builder.build().with(Style::markdown()).to_string());
    output.push_str("\n\n");

    if !materials.unit_weights().is_empty() {
        let mut builder = Builder::default();
        builder.push_record(["Thickness (mm)", "kg/m²"]);
        for (t, w) in materials.unit_weights() {
            builder.push_record([format_number(*t), format_factor(*w)]);
        }
        output.push_str("## Checkered plate unit weight (縞板)\n\n");
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push_str("\n\n");
    }
}

/// Render the calc-sheet tables as Markdown
pub fn calc_sheet_markdown(tables: &CalcSheetTables, source: &str) -> String {
    let mut output = format!("# Calc-sheet tables ({})\n\n", source);

    output.push_str("## Base price (基準価格)\n\n");
    output.push_str(&matrix_table(&tables.matrix));
    output.push_str("\n\n");

    let mut shapes = Builder::default();
    shapes.push_record(["Shape", "Multiplier"]);
    for rate in tables.shapes.iter() {
        shapes.push_record([rate.shape.clone(), format_factor(rate.multiplier)]);
    }
    output.push_str("## Shape multiplier (形状乗率)\n\n");
    output.push_str(&shapes.build().with(Style::markdown()).to_string());
    output.push_str("\n\n");

    output.push_str("## Quantity rate (数量調整)\n\n");
    output.push_str(&quantity_table(&tables.quantity));
    output.push_str("\n\n");

    materials_section(&tables.materials, &mut output);

    if let Some(holes) = &tables.holes {
        let mut builder = Builder::default();
        builder.push_record(["Thickness (mm)", "Round", "Round min", "Slotted", "Slotted min"]);
        let optional = |v: Option<u64>| v.map_or_else(|| "-".to_string(), |v| v.to_string());
        for band in holes.iter() {
            builder.push_record([
                format!("{}-{}", format_number(band.thickness.min), format_number(band.thickness.max)),
                band.round_standard.to_string(),
                optional(band.round_minimum),
                band.slotted_standard.to_string(),
                optional(band.slotted_minimum),
            ]);
        }
        output.push_str("## Hole prices (穴あけ単価)\n\n");
        output.push_str(&builder.build().with(Style::markdown()).to_string());
        output.push_str("\n\n");
    }

    output.push_str(&format!("- **Bending floor:** {}\n", format_yen(tables.floor_yen)));
    output
}

/// Render the v2.1 tables as Markdown
pub fn v21_markdown(tables: &V21Tables, source: &str) -> String {
    let mut output = format!("# v2.1 tables ({})\n\n", source);

    for shape in &tables.shapes {
        output.push_str(&format!("## {}\n\n", shape.shape));
        output.push_str(&matrix_table(&shape.matrix));
        output.push_str("\n\n");
    }

    let rules = &tables.rules;
    output.push_str("## Quantity rate (数量調整)\n\n");
    output.push_str(&quantity_table(&rules.quantity));
    output.push_str("\n\n");

    let mut pierce = Builder::default();
    pierce.push_record(["Thickness (mm)", "Pierce"]);
    for tier in rules.holes.tiers() {
        let bound = match tier.max_mm {
            Some(max) => format!("≤{}", max),
            None => "above".to_string(),
        };
        pierce.push_record([bound, tier.price.to_string()]);
    }
    output.push_str("## Pierce prices (ピアス単価)\n\n");
    output.push_str(&pierce.build().with(Style::markdown()).to_string());
    output.push_str("\n\n");

    if let Some(materials) = &tables.materials {
        materials_section(materials, &mut output);
    }

    output.push_str("## Adjustments\n\n");
    output.push_str(&format!("- **Mid-support (中押し):** ×{}\n", format_factor(rules.mid_support_factor)));
    output.push_str(&format!("- **Reverse bend (逆曲げ):** ×{}\n", format_factor(rules.reverse_bend_factor)));
    output.push_str(&format!(
        "- **Long-part pressing (長尺目押し):** +{} from {} mm\n",
        format_yen(rules.long_press_addon_yen),
        rules.long_press_min_length_mm
    ));
    output.push_str(&format!("- **Deep bend (深曲げ):** +{}\n", format_yen(rules.deep_bend_addon_yen)));
    output.push_str(&format!(
        "- **Small part (小物割引):** ×{} when long side ≤ {} mm and weight ≤ {} kg\n",
        format_factor(rules.small_part.factor),
        rules.small_part.max_long_side_mm,
        rules.small_part.max_weight_kg
    ));
    output.push_str(&format!("- **Laser punch:** {} per hole\n", format_yen(rules.holes.punch_price())));
    output.push_str(&format!("- **Bending floor:** {}\n", format_yen(rules.floor_yen)));
    output
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::loader::{load_calc_sheet, load_v21};
    use crate::data::DataSource;

    #[test]
    fn test_calc_sheet_markdown_sections() {
        let tables = load_calc_sheet(&DataSource::Embedded).unwrap();
        let md = calc_sheet_markdown(&tables, "built-in tables");
        assert!(md.starts_with("# Calc-sheet tables (built-in tables)"));
        assert!(md.contains("| Weight \\ Length"));
        assert!(md.contains(">100kg"));
        assert!(md.contains("| ハット曲げ"));
        assert!(md.contains("| 20-"));
        assert!(md.contains("unit weight table"));
        assert!(md.contains("## Hole prices"));
        assert!(md.contains("**Bending floor:** ¥300"));
    }

    #[test]
    fn test_v21_markdown_sections() {
        let tables = load_v21(&DataSource::Embedded, None).unwrap();
        let md = v21_markdown(&tables, "built-in tables");
        assert!(md.contains("## L曲げ"));
        assert!(md.contains("3048mm超"));
        assert!(md.contains("| above"));
        assert!(md.contains("+¥2,500 from 1000 mm"));
    }
}
