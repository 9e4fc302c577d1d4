//! Core module - classification, rounding, errors, configuration and loading

pub mod classify;
pub mod config;
pub mod error;
pub mod loader;
pub mod logging;
pub mod rounding;

pub use config::Config;
pub use error::{QuoteError, TableError};
