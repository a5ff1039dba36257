//! Two-way pivot of a result table.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregation;
use crate::color::finite_range;
use crate::error::{Result, SensitivityError};
use crate::table::{SensitivityTable, key_bits};

/// Results of one parameter pair arranged as a grid.
///
/// Rows are the sorted distinct values of `row_name`, columns the sorted
/// distinct values of `col_name`. A cell holds the aggregated result of all
/// table rows with that pair of values, or `None` if there were none.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PivotTable {
    pub row_name: String,
    pub col_name: String,
    pub value_name: String,
    pub row_values: Vec<f64>,
    pub col_values: Vec<f64>,
    /// Row-major cells, `row_values.len()` rows of `col_values.len()` entries
    pub cells: Vec<Vec<Option<f64>>>,
}

impl PivotTable {
    pub fn from_table(
        table: &SensitivityTable,
        row_name: &str,
        col_name: &str,
        aggregation: &Aggregation,
    ) -> Result<Self> {
        if row_name == col_name {
            return Err(SensitivityError::UnknownColumn(format!(
                "{row_name} (pivot needs two distinct columns)"
            )));
        }
        let row_column = table
            .column(row_name)
            .ok_or_else(|| SensitivityError::UnknownColumn(row_name.to_string()))?;
        let col_column = table
            .column(col_name)
            .ok_or_else(|| SensitivityError::UnknownColumn(col_name.to_string()))?;

        let row_values = table.unique_values(row_name)?;
        let col_values = table.unique_values(col_name)?;
        let row_lookup = position_lookup(&row_values);
        let col_lookup = position_lookup(&col_values);

        let mut buckets: Vec<Vec<Vec<f64>>> = vec![vec![Vec::new(); col_values.len()]; row_values.len()];
        for ((&r, &c), &result) in row_column.iter().zip(col_column).zip(table.results()) {
            let (Some(&ri), Some(&ci)) = (
                row_lookup.get(&key_bits(r)),
                col_lookup.get(&key_bits(c)),
            ) else {
                continue;
            };
            buckets[ri][ci].push(result);
        }

        let cells = buckets
            .into_iter()
            .map(|row| {
                row.into_iter()
                    .map(|bucket| (!bucket.is_empty()).then(|| aggregation.apply(&bucket)))
                    .collect()
            })
            .collect();

        Ok(Self {
            row_name: row_name.to_string(),
            col_name: col_name.to_string(),
            value_name: table.result_name().to_string(),
            row_values,
            col_values,
            cells,
        })
    }

    pub fn n_rows(&self) -> usize {
        self.row_values.len()
    }

    pub fn n_cols(&self) -> usize {
        self.col_values.len()
    }

    pub fn get(&self, row: usize, col: usize) -> Option<f64> {
        self.cells.get(row)?.get(col).copied().flatten()
    }

    /// Smallest and largest finite cell value
    pub fn min_max(&self) -> Option<(f64, f64)> {
        finite_range(self.cells.iter().flatten().flatten().copied())
    }
}

fn position_lookup(values: &[f64]) -> FxHashMap<u64, usize> {
    values
        .iter()
        .enumerate()
        .map(|(i, v)| (key_bits(*v), i))
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn table() -> SensitivityTable {
        let mut table = SensitivityTable::new(vec!["a".into(), "b".into(), "c".into()], "r");
        for a in [2.0, 1.0] {
            for b in [5.0, 4.0] {
                for c in [0.0, 1.0] {
                    table.push_row(&[a, b, c], a + b + c);
                }
            }
        }
        table
    }

    #[test]
    fn test_pivot_sorts_axes_and_aggregates() {
        let pivot = table().pivot("a", "b", &Aggregation::Mean).unwrap();
        assert_eq!(pivot.row_values, vec![1.0, 2.0]);
        assert_eq!(pivot.col_values, vec![4.0, 5.0]);
        assert_eq!(pivot.get(0, 0), Some(5.5));
        assert_eq!(pivot.get(1, 1), Some(7.5));
        assert_eq!(pivot.value_name, "r");
        assert_eq!(pivot.min_max(), Some((5.5, 7.5)));
    }

    #[test]
    fn test_min_max_skips_infinite_cells() {
        let mut table = SensitivityTable::new(vec!["a".into(), "b".into()], "r");
        table.push_row(&[1.0, 4.0], f64::INFINITY);
        table.push_row(&[1.0, 5.0], f64::NEG_INFINITY);
        table.push_row(&[2.0, 4.0], 5.0);
        table.push_row(&[2.0, 5.0], 6.0);
        let pivot = table.pivot("a", "b", &Aggregation::Mean).unwrap();
        assert_eq!(pivot.get(0, 0), Some(f64::INFINITY));
        assert_eq!(pivot.min_max(), Some((5.0, 6.0)));
    }

    #[test]
    fn test_missing_combination_is_none() {
        let mut table = SensitivityTable::new(vec!["a".into(), "b".into()], "r");
        table.push_row(&[1.0, 1.0], 1.0);
        table.push_row(&[2.0, 2.0], 4.0);
        let pivot = table.pivot("a", "b", &Aggregation::Sum).unwrap();
        assert_eq!(pivot.get(0, 1), None);
        assert_eq!(pivot.get(1, 1), Some(4.0));
    }

    #[test]
    fn test_pivot_rejects_same_or_unknown_column() {
        assert!(table().pivot("a", "a", &Aggregation::Mean).is_err());
        assert!(table().pivot("a", "z", &Aggregation::Mean).is_err());
    }
}
