//! `bendq calc` command - calc-sheet quote
//!
//! Weight comes from developed width × length × thickness and the material
//! table; the unit price follows the shop's 50/100 rounding.

use dialoguer::{theme::ColorfulTheme, Input, Select};
use miette::{IntoDiagnostic, Result};
use tracing::debug;

use crate::cli::commands::emit_quote;
use crate::cli::helpers::Session;
use crate::cli::GlobalOpts;
use crate::core::loader::load_calc_sheet;
use crate::pricing::{CalcSheetTables, HoleCounts, QuoteInput};

#[derive(clap::Args, Debug, Default, Clone)]
pub struct CalcArgs {
    /// Bend shape (e.g. L曲げ, コの字曲げ, ハット曲げ)
    #[arg(long, short = 's')]
    pub shape: Option<String>,

    /// Plate thickness in mm
    #[arg(long, short = 't')]
    pub thickness: Option<f64>,

    /// Developed (flat) width in mm
    #[arg(long, short = 'w')]
    pub width: Option<f64>,

    /// Product length in mm
    #[arg(long, short = 'l')]
    pub length: Option<f64>,

    /// Material (e.g. SS400, SUS304, CP400)
    #[arg(long, short = 'm')]
    pub material: Option<String>,

    /// Quantity (lot size)
    #[arg(long = "qty", short = 'n')]
    pub quantity: Option<u32>,

    /// Number of round holes
    #[arg(long, default_value_t = 0)]
    pub round_holes: u32,

    /// Number of slotted holes
    #[arg(long, default_value_t = 0)]
    pub slotted_holes: u32,

    /// Prompt for any value not given on the command line
    #[arg(long, short = 'i')]
    pub interactive: bool,
}

impl CalcArgs {
    /// Build a quote request; every dimension is required
    pub fn to_input(&self) -> Result<QuoteInput> {
        let shape = required(self.shape.clone(), "shape")?;
        let thickness = required(self.thickness, "thickness")?;
        let width = required(self.width, "width")?;
        let length = required(self.length, "length")?;
        let material = required(self.material.clone(), "material")?;
        Ok(QuoteInput::new(shape, thickness, length, self.quantity.unwrap_or(1))
            .with_geometry(width, material)
            .with_holes(HoleCounts {
                round: self.round_holes,
                slotted: self.slotted_holes,
                ..Default::default()
            }))
    }
}

fn required<T>(value: Option<T>, flag: &str) -> Result<T> {
    value.ok_or_else(|| {
        miette::miette!(
            help = "pass the value, or use -i to be prompted",
            "Missing required option --{}",
            flag
        )
    })
}

pub fn run(args: CalcArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::resolve(global)?;
    let tables = load_calc_sheet(&session.source)?;
    let args = if args.interactive {
        prompt_missing(args, &tables)?
    } else {
        args
    };
    let input = args.to_input()?;
    debug!(?input, "calc-sheet request");
    let quote = tables.quote(&input, &session.settings)?;
    emit_quote(&quote, &session, global)
}

/// Ask for each missing value, offering pick-lists from the loaded tables
fn prompt_missing(mut args: CalcArgs, tables: &CalcSheetTables) -> Result<CalcArgs> {
    let theme = ColorfulTheme::default();

    if args.shape.is_none() {
        let shapes = tables.shapes.names();
        let idx = Select::with_theme(&theme)
            .with_prompt("Shape")
            .items(&shapes)
            .default(0)
            .interact()
            .into_diagnostic()?;
        args.shape = Some(shapes[idx].to_string());
    }

    if args.material.is_none() {
        let materials = tables.materials.names();
        let idx = Select::with_theme(&theme)
            .with_prompt("Material")
            .items(&materials)
            .default(0)
            .interact()
            .into_diagnostic()?;
        args.material = Some(materials[idx].to_string());
    }

    if args.thickness.is_none() {
        args.thickness = Some(prompt_number(&theme, "Thickness (mm)")?);
    }
    if args.width.is_none() {
        args.width = Some(prompt_number(&theme, "Developed width (mm)")?);
    }
    if args.length.is_none() {
        args.length = Some(prompt_number(&theme, "Product length (mm)")?);
    }
    if args.quantity.is_none() {
        let qty: u32 = Input::with_theme(&theme)
            .with_prompt("Quantity")
            .default(1)
            .interact_text()
            .into_diagnostic()?;
        args.quantity = Some(qty);
    }

    Ok(args)
}

fn prompt_number(theme: &ColorfulTheme, prompt: &str) -> Result<f64> {
    Input::<f64>::with_theme(theme)
        .with_prompt(prompt)
        .validate_with(|v: &f64| -> std::result::Result<(), &str> {
            if v.is_finite() && *v > 0.0 {
                Ok(())
            } else {
                Err("must be a positive number")
            }
        })
        .interact_text()
        .into_diagnostic()
}
