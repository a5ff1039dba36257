//! Sensitivity analysis library
//!
//! This crate runs a model over the Cartesian product of named parameter
//! values and turns the results into tables and plots. It supports:
//! - Explicit value lists, linearly spaced and stepped ranges
//! - Sequential or parallel evaluation with progress and cancellation
//! - Scalar and sampled (Monte Carlo style) model outcomes
//! - Aggregation of duplicate combinations (mean, std, var, custom, ...)
//! - Pivoted, colour-graded tables rendered to HTML or plain text
//! - Hex-bin plot grids for every pair of swept parameters, rendered to SVG
//!
//! # Example
//!
//! ```ignore
//! use sensitivity_core::{Params, SensitivityAnalyzer, SensitivityValues};
//!
//! let values = SensitivityValues::new()
//!     .with("value1", [1.0, 2.0, 3.0])
//!     .with("value2", [4.0, 5.0, 6.0]);
//!
//! let sa = SensitivityAnalyzer::builder(values, |p: &Params| {
//!     Ok::<_, sensitivity_core::ModelError>(p.value("value1")? + p.value("value2")? + 5.0)
//! })
//! .result_name("my_res")
//! .build()?;
//!
//! println!("{}", sa.table().to_csv());
//! let styled = sa.styled_tables()?;
//! let svg = sa.plot()?.to_svg()?;
//! ```

#![warn(clippy::all)]

// ============================================================================
// Core modules
// ============================================================================

pub mod aggregate;
pub mod analyzer;
pub mod error;
pub mod evaluate;
pub mod expression;
pub mod grid;
pub mod model;
pub mod values;

// ============================================================================
// Table and rendering modules
// ============================================================================

pub mod color;
pub mod format;
pub mod hexbin;
pub mod pivot;
pub mod plot;
pub mod style;
pub mod table;

// ============================================================================
// Test modules
// ============================================================================

#[cfg(test)]
mod tests;

// ============================================================================
// Public re-exports for convenience
// ============================================================================

pub use aggregate::Aggregation;
pub use analyzer::{
    HexPlotOptions, SensitivityAnalyzer, SensitivityAnalyzerBuilder, StyledTableOptions,
    sensitivity_hex_plots, sensitivity_styled_tables, sensitivity_table,
};
pub use color::{ColorMap, ColorScale, Rgb};
pub use error::{ModelError, SensitivityError};
pub use evaluate::{EvaluateOptions, SweepProgress, evaluate_grid, evaluate_table};
pub use expression::{Expression, ExpressionError, ExpressionModel};
pub use format::NumberFormat;
pub use grid::SweepGrid;
pub use hexbin::{HexBins, HexCell};
pub use model::{FixedArgs, IntoOutcome, Model, Outcome, Params};
pub use pivot::PivotTable;
pub use plot::{HexFigure, HexPanel};
pub use style::{StyledCell, StyledTable, StyledTables, TableKey, TableStyle};
pub use table::SensitivityTable;
pub use values::{SensitivityValues, ValueRange};
