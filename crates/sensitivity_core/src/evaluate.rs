//! Sweep evaluator - runs a model for every combination of parameter values.
//!
//! Combinations are visited in row-major order (first parameter slowest).
//! Each combination is evaluated exactly once; with the `parallel` feature the
//! work is spread over the rayon pool and the results are collected back in
//! combination order, so row `i` of the table always belongs to combination `i`.

use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Instant;

#[cfg(feature = "parallel")]
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

use crate::error::{Result, SensitivityError};
use crate::grid::{GridIndices, SweepGrid};
use crate::model::{FixedArgs, Model, Outcome, Params, combination_seed};
use crate::table::SensitivityTable;
use crate::values::SensitivityValues;

/// Progress tracking for a sweep
#[derive(Debug, Clone)]
pub struct SweepProgress {
    /// Completed combinations counter
    completed: Arc<AtomicUsize>,
    /// Total combinations
    total: Arc<AtomicUsize>,
    /// Cancellation flag
    cancelled: Arc<AtomicBool>,
}

impl SweepProgress {
    #[must_use]
    pub fn new(total: usize) -> Self {
        Self {
            completed: Arc::new(AtomicUsize::new(0)),
            total: Arc::new(AtomicUsize::new(total)),
            cancelled: Arc::new(AtomicBool::new(false)),
        }
    }

    /// Create from existing atomics (for UI integration)
    pub fn from_atomics(
        completed: Arc<AtomicUsize>,
        total: Arc<AtomicUsize>,
        cancelled: Arc<AtomicBool>,
    ) -> Self {
        Self {
            completed,
            total,
            cancelled,
        }
    }

    #[must_use]
    pub fn completed(&self) -> usize {
        self.completed.load(Ordering::Relaxed)
    }

    #[must_use]
    pub fn total(&self) -> usize {
        self.total.load(Ordering::Relaxed)
    }

    /// Completed fraction in [0, 1]; 1 when there is nothing to do
    #[must_use]
    pub fn fraction(&self) -> f64 {
        match self.total() {
            0 => 1.0,
            total => (self.completed() as f64 / total as f64).min(1.0),
        }
    }

    pub fn increment(&self) {
        self.completed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn reset(&self, total: usize) {
        self.completed.store(0, Ordering::Relaxed);
        self.total.store(total, Ordering::Relaxed);
    }

    pub fn cancel(&self) {
        self.cancelled.store(true, Ordering::Relaxed);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.cancelled.load(Ordering::Relaxed)
    }
}

impl Default for SweepProgress {
    fn default() -> Self {
        Self::new(0)
    }
}

/// How a sweep is executed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EvaluateOptions {
    /// Evaluate combinations on the rayon pool (ignored without the `parallel` feature)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
    /// Base seed for the per-combination random number generators
    #[serde(default)]
    pub seed: u64,
}

fn default_parallel() -> bool {
    cfg!(feature = "parallel")
}

impl Default for EvaluateOptions {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            seed: 0,
        }
    }
}

impl EvaluateOptions {
    #[must_use]
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Check that a sweep definition is consistent with its fixed arguments and,
/// when given, the name of its result column
pub fn validate_sweep(
    values: &SensitivityValues,
    fixed: &FixedArgs,
    result_name: Option<&str>,
) -> Result<()> {
    values.validate()?;
    if let Some(result_name) = result_name
        && values.contains(result_name)
    {
        return Err(SensitivityError::ResultNameCollision(
            result_name.to_string(),
        ));
    }
    if let Some(name) = fixed.names().find(|name| values.contains(name)) {
        return Err(SensitivityError::FixedArgumentCollision(name.to_string()));
    }
    Ok(())
}

/// Evaluate `model` at every combination of `values`.
///
/// The outcome for value indices `[i, j, ..]` sits at the same position of
/// the returned grid.
pub fn evaluate_grid<M: Model + ?Sized>(
    values: &SensitivityValues,
    model: &M,
    fixed: &FixedArgs,
    options: &EvaluateOptions,
    progress: Option<&SweepProgress>,
) -> Result<SweepGrid<Outcome>> {
    validate_sweep(values, fixed, None)?;
    sweep(values, model, fixed, options, progress)
}

/// Evaluate an already validated sweep
fn sweep<M: Model + ?Sized>(
    values: &SensitivityValues,
    model: &M,
    fixed: &FixedArgs,
    options: &EvaluateOptions,
    progress: Option<&SweepProgress>,
) -> Result<SweepGrid<Outcome>> {
    let total = values.total_combinations();
    if let Some(p) = progress {
        p.reset(total);
    }

    let names: Arc<[String]> = values.names().map(str::to_string).collect();
    let fixed = Arc::new(fixed.clone());
    let combinations: Vec<Vec<usize>> = GridIndices::new(values.shape()).collect();

    tracing::debug!(
        combinations = total,
        parameters = names.len(),
        parallel = options.parallel,
        "evaluating sensitivity sweep"
    );
    let started = Instant::now();

    let evaluate_point = |index: usize, indices: &[usize]| -> Result<Outcome> {
        if let Some(p) = progress
            && p.is_cancelled()
        {
            return Err(SensitivityError::Cancelled);
        }

        let params = Params::new(
            names.clone(),
            values.values_at(indices),
            fixed.clone(),
            index,
            combination_seed(options.seed, index),
        );
        let outcome = model
            .evaluate(&params)
            .map_err(|source| SensitivityError::Model {
                index,
                params: params.to_string(),
                source,
            })?;

        if let Some(p) = progress {
            p.increment();
        }
        Ok(outcome)
    };

    #[cfg(feature = "parallel")]
    let evaluated: Result<Vec<Outcome>> = if options.parallel {
        combinations
            .par_iter()
            .enumerate()
            .map(|(index, indices)| evaluate_point(index, indices))
            .collect()
    } else {
        combinations
            .iter()
            .enumerate()
            .map(|(index, indices)| evaluate_point(index, indices))
            .collect()
    };

    #[cfg(not(feature = "parallel"))]
    let evaluated: Result<Vec<Outcome>> = combinations
        .iter()
        .enumerate()
        .map(|(index, indices)| evaluate_point(index, indices))
        .collect();

    let outcomes = match evaluated {
        Ok(outcomes) => outcomes,
        Err(err) => {
            tracing::warn!(error = %err, "sensitivity sweep failed");
            return Err(err);
        }
    };

    tracing::debug!(
        elapsed_ms = started.elapsed().as_millis() as u64,
        "sensitivity sweep complete"
    );
    SweepGrid::from_data(values.shape(), outcomes).ok_or_else(|| {
        SensitivityError::Render("outcome count does not match the sweep shape".to_string())
    })
}

/// Evaluate `model` at every combination of `values` and collect the results.
///
/// `fixed` arguments are passed to every call alongside the swept values.
/// The result column of the returned table is named `result_name`.
pub fn evaluate_table<M: Model + ?Sized>(
    values: &SensitivityValues,
    model: &M,
    fixed: &FixedArgs,
    result_name: &str,
    options: &EvaluateOptions,
    progress: Option<&SweepProgress>,
) -> Result<SensitivityTable> {
    validate_sweep(values, fixed, Some(result_name))?;
    let grid = sweep(values, model, fixed, options, progress)?;
    Ok(table_from_grid(values, grid, result_name))
}

/// Flatten an outcome grid into table rows in combination order
pub fn table_from_grid(
    values: &SensitivityValues,
    grid: SweepGrid<Outcome>,
    result_name: &str,
) -> SensitivityTable {
    let names: Vec<String> = values.names().map(str::to_string).collect();
    let mut table = SensitivityTable::new(names, result_name);
    let combinations = grid.indices();
    for (indices, outcome) in combinations.zip(grid.into_data()) {
        table.push_outcome(&values.values_at(&indices), outcome);
    }
    table
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ModelError;

    fn add(p: &Params) -> Result<f64, ModelError> {
        Ok(p.value("a")? + p.value("b")?)
    }

    fn values() -> SensitivityValues {
        SensitivityValues::new()
            .with("a", [1.0, 2.0])
            .with("b", [10.0, 20.0, 30.0])
    }

    #[test]
    fn test_progress_counts_every_combination() {
        let progress = SweepProgress::new(0);
        let table = evaluate_table(
            &values(),
            &add,
            &FixedArgs::new(),
            "sum",
            &EvaluateOptions::sequential(),
            Some(&progress),
        )
        .unwrap();
        assert_eq!(table.len(), 6);
        assert_eq!(progress.total(), 6);
        assert_eq!(progress.completed(), 6);
        assert!((progress.fraction() - 1.0).abs() < 1e-12);
    }

    #[test]
    fn test_cancelled_sweep_returns_error() {
        let progress = SweepProgress::new(0);
        progress.cancel();
        let result = evaluate_table(
            &values(),
            &add,
            &FixedArgs::new(),
            "sum",
            &EvaluateOptions::sequential(),
            Some(&progress),
        );
        assert!(matches!(result, Err(SensitivityError::Cancelled)));
    }

    #[test]
    fn test_result_name_collision() {
        let result = evaluate_table(
            &values(),
            &add,
            &FixedArgs::new(),
            "a",
            &EvaluateOptions::sequential(),
            None,
        );
        assert!(matches!(
            result,
            Err(SensitivityError::ResultNameCollision(name)) if name == "a"
        ));
    }

    #[test]
    fn test_fixed_argument_collision() {
        let result = evaluate_table(
            &values(),
            &add,
            &FixedArgs::new().with("b", 1.0),
            "sum",
            &EvaluateOptions::sequential(),
            None,
        );
        assert!(matches!(
            result,
            Err(SensitivityError::FixedArgumentCollision(name)) if name == "b"
        ));
    }

    #[test]
    fn test_grid_and_table_share_validation() {
        let fixed = FixedArgs::new().with("b", 1.0);
        let grid = evaluate_grid(&values(), &add, &fixed, &EvaluateOptions::sequential(), None);
        assert!(matches!(
            grid,
            Err(SensitivityError::FixedArgumentCollision(name)) if name == "b"
        ));

        let empty = SensitivityValues::new().with("a", Vec::<f64>::new());
        assert!(matches!(
            evaluate_grid(&empty, &add, &FixedArgs::new(), &EvaluateOptions::sequential(), None),
            Err(SensitivityError::EmptyParameter(name)) if name == "a"
        ));

        // a grid has no result column to collide with
        assert!(validate_sweep(&values(), &FixedArgs::new(), None).is_ok());
        assert!(validate_sweep(&values(), &FixedArgs::new(), Some("a")).is_err());
    }

    #[test]
    fn test_model_error_reports_combination() {
        let fails_on_second = |p: &Params| {
            if p.index() == 1 {
                Err(ModelError::failed("bad input"))
            } else {
                Ok(0.0)
            }
        };
        let err = evaluate_table(
            &values(),
            &fails_on_second,
            &FixedArgs::new(),
            "r",
            &EvaluateOptions::sequential(),
            None,
        )
        .unwrap_err();
        match err {
            SensitivityError::Model {
                index,
                params,
                source,
            } => {
                assert_eq!(index, 1);
                assert_eq!(params, "a=1, b=20");
                assert_eq!(source, ModelError::Failed("bad input".into()));
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_seeds_are_deterministic() {
        let seed_model = |p: &Params| p.seed() as f64;
        let options = EvaluateOptions::sequential().with_seed(7);
        let first =
            evaluate_table(&values(), &seed_model, &FixedArgs::new(), "s", &options, None)
                .unwrap();
        let second =
            evaluate_table(&values(), &seed_model, &FixedArgs::new(), "s", &options, None)
                .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn test_grid_positions_match_value_indices() {
        let grid = evaluate_grid(
            &values(),
            &add,
            &FixedArgs::new(),
            &EvaluateOptions::sequential(),
            None,
        )
        .unwrap();
        assert_eq!(grid.shape(), &[2, 3]);
        assert_eq!(grid.get(&[1, 2]), Some(&Outcome::Scalar(32.0)));
        assert_eq!(grid.get(&[0, 1]), Some(&Outcome::Scalar(21.0)));
    }
}
