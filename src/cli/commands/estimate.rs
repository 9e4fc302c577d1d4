//! `bendq estimate` command - v2.1 quote

use miette::Result;
use std::path::PathBuf;
use tracing::debug;

use crate::cli::commands::emit_quote;
use crate::cli::helpers::Session;
use crate::cli::GlobalOpts;
use crate::core::loader::load_v21;
use crate::pricing::{HoleCounts, ProcessFlags, QuoteInput};

#[derive(clap::Args, Debug, Clone)]
pub struct EstimateArgs {
    /// Bend shape (e.g. L曲げ, Z曲げ)
    #[arg(long, short = 's')]
    pub shape: String,

    /// Plate thickness in mm
    #[arg(long, short = 't')]
    pub thickness: f64,

    /// Product length in mm
    #[arg(long, short = 'l')]
    pub length: f64,

    /// Longest side in mm (small-part discount check)
    #[arg(long)]
    pub long_side: f64,

    /// Quantity (lot size)
    #[arg(long = "qty", short = 'n', default_value_t = 1)]
    pub quantity: u32,

    /// Part weight in kg (otherwise computed from --width and --material)
    #[arg(long)]
    pub weight: Option<f64>,

    /// Developed (flat) width in mm
    #[arg(long, short = 'w')]
    pub width: Option<f64>,

    /// Material (e.g. SS400)
    #[arg(long, short = 'm')]
    pub material: Option<String>,

    /// Number of laser punch holes
    #[arg(long, default_value_t = 0)]
    pub punch: u32,

    /// Number of pierce holes
    #[arg(long, default_value_t = 0)]
    pub pierce: u32,

    /// Mid-support (中押し)
    #[arg(long)]
    pub mid_support: bool,

    /// Reverse bend (逆曲げ)
    #[arg(long)]
    pub reverse_bend: bool,

    /// Long-part pressing (長尺目押し), charged from 1000 mm
    #[arg(long)]
    pub long_press: bool,

    /// Deep bend / interference avoidance (深曲げ・干渉回避)
    #[arg(long)]
    pub deep_bend: bool,

    /// Base price table to use instead of the configured one
    #[arg(long)]
    pub csv: Option<PathBuf>,
}

impl EstimateArgs {
    pub fn to_input(&self) -> QuoteInput {
        let mut input = QuoteInput::new(self.shape.clone(), self.thickness, self.length, self.quantity)
            .with_long_side(self.long_side)
            .with_holes(HoleCounts {
                punch: self.punch,
                pierce: self.pierce,
                ..Default::default()
            })
            .with_flags(ProcessFlags {
                mid_support: self.mid_support,
                reverse_bend: self.reverse_bend,
                long_press: self.long_press,
                deep_bend: self.deep_bend,
            });
        input.weight_kg = self.weight;
        input.width_mm = self.width;
        input.material = self.material.clone();
        input
    }
}

pub fn run(args: EstimateArgs, global: &GlobalOpts) -> Result<()> {
    let session = Session::resolve(global)?;
    let tables = load_v21(&session.source, args.csv.as_deref())?;
    let input = args.to_input();
    debug!(?input, "v2.1 request");
    let quote = tables.quote(&input, &session.settings)?;
    emit_quote(&quote, &session, global)
}
