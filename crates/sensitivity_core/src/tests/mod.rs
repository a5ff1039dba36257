//! Integration tests for the sensitivity analysis library
//!
//! Tests are organized by topic:
//! - `sweep` - Combination order, fixed arguments and result alignment
//! - `analyzer` - The analyzer entry point and its renderings
//! - `sampling` - Sampled outcomes, aggregation and seeded models

mod analyzer;
