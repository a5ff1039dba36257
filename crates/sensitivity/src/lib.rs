//! Command-line front end for sensitivity analyses
//!
//! Reads a YAML sweep file, evaluates its model expression over every
//! combination of the swept values and then either:
//! - writes CSV/JSON tables, styled HTML tables and a hex-bin SVG figure
//! - prints the styled tables as plain text
//! - opens a terminal viewer with one tab per styled table

pub mod config;
pub mod logging;
pub mod report;
pub mod util;
#[cfg(feature = "native")]
pub mod viewer;

pub use config::{ConfigError, SweepFile};
pub use logging::init_logging;
pub use report::write_report;

#[cfg(test)]
mod tests;
