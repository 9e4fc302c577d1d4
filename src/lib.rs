//! bendq: sheet-metal bending quotation engine
//!
//! Prices bending jobs from lookup tables (base price by weight and length
//! class, shape and quantity factors, hole unit prices) under two schemes,
//! the calc-sheet scheme and the v2.1 scheme.

pub mod cli;
pub mod core;
pub mod data;
pub mod pricing;
