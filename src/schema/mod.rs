//! Schema module - Population data and configuration types for the GA pipeline.

mod config;
mod population;
mod run;

pub use config::*;
pub use population::*;
pub use run::*;
