//! Application glue module
//!
//! Configuration shared by embedders and the headless runner.

mod config;

pub use config::{ColorConfig, Config};
