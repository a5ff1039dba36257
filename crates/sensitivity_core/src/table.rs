//! Result table of a sensitivity sweep.

use rustc_hash::FxHashMap;
use serde::{Deserialize, Serialize};

use crate::aggregate::Aggregation;
use crate::error::{Result, SensitivityError};
use crate::model::Outcome;
use crate::pivot::PivotTable;

/// One row of a [`SensitivityTable`]
#[derive(Debug, Clone, PartialEq)]
pub struct TableRow {
    /// Parameter values in column order
    pub values: Vec<f64>,
    pub result: f64,
}

/// Two-dimensional results: one column per swept parameter, then the result column.
///
/// Stored column-wise. Rows appear in combination order; a sampled outcome
/// contributes one row per sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SensitivityTable {
    param_names: Vec<String>,
    result_name: String,
    params: Vec<Vec<f64>>,
    results: Vec<f64>,
}

impl SensitivityTable {
    pub fn new(param_names: Vec<String>, result_name: impl Into<String>) -> Self {
        let params = vec![Vec::new(); param_names.len()];
        Self {
            param_names,
            result_name: result_name.into(),
            params,
            results: Vec::new(),
        }
    }

    /// Append a row. `values` must have one entry per parameter column.
    pub fn push_row(&mut self, values: &[f64], result: f64) {
        debug_assert_eq!(values.len(), self.params.len());
        for (column, &value) in self.params.iter_mut().zip(values) {
            column.push(value);
        }
        self.results.push(result);
    }

    /// Append the rows produced by one model outcome
    pub fn push_outcome(&mut self, values: &[f64], outcome: Outcome) {
        match outcome {
            Outcome::Scalar(result) => self.push_row(values, result),
            Outcome::Samples(samples) if samples.is_empty() => self.push_row(values, f64::NAN),
            Outcome::Samples(samples) => {
                for sample in samples {
                    self.push_row(values, sample);
                }
            }
        }
    }

    pub fn len(&self) -> usize {
        self.results.len()
    }

    pub fn is_empty(&self) -> bool {
        self.results.is_empty()
    }

    pub fn param_names(&self) -> &[String] {
        &self.param_names
    }

    pub fn result_name(&self) -> &str {
        &self.result_name
    }

    /// All column names, parameters first and the result last
    pub fn columns(&self) -> Vec<&str> {
        self.param_names
            .iter()
            .map(String::as_str)
            .chain(std::iter::once(self.result_name.as_str()))
            .collect()
    }

    pub fn column(&self, name: &str) -> Option<&[f64]> {
        if name == self.result_name {
            return Some(&self.results);
        }
        self.param_names
            .iter()
            .position(|n| n == name)
            .map(|i| self.params[i].as_slice())
    }

    fn require_column(&self, name: &str) -> Result<&[f64]> {
        self.column(name)
            .ok_or_else(|| SensitivityError::UnknownColumn(name.to_string()))
    }

    pub fn results(&self) -> &[f64] {
        &self.results
    }

    pub fn row(&self, index: usize) -> Option<TableRow> {
        let result = *self.results.get(index)?;
        Some(TableRow {
            values: self.params.iter().map(|column| column[index]).collect(),
            result,
        })
    }

    pub fn rows(&self) -> impl Iterator<Item = TableRow> + '_ {
        (0..self.len()).filter_map(|i| self.row(i))
    }

    /// Sorted distinct values of a column
    pub fn unique_values(&self, name: &str) -> Result<Vec<f64>> {
        let mut values = self.require_column(name)?.to_vec();
        values.sort_by(f64::total_cmp);
        values.dedup_by(|a, b| same_key(*a, *b));
        Ok(values)
    }

    /// Group rows by the given columns and reduce each group's results.
    ///
    /// Groups appear in the order their first row appears.
    pub fn aggregate(&self, by: &[&str], aggregation: &Aggregation) -> Result<SensitivityTable> {
        let columns: Vec<&[f64]> = by
            .iter()
            .map(|name| self.require_column(name))
            .collect::<Result<_>>()?;

        let mut group_index: FxHashMap<Vec<u64>, usize> = FxHashMap::default();
        let mut keys: Vec<Vec<f64>> = Vec::new();
        let mut groups: Vec<Vec<f64>> = Vec::new();

        for (row, &result) in self.results.iter().enumerate() {
            let values: Vec<f64> = columns.iter().map(|column| column[row]).collect();
            let key: Vec<u64> = values.iter().map(|v| key_bits(*v)).collect();
            let slot = *group_index.entry(key).or_insert_with(|| {
                keys.push(values);
                groups.push(Vec::new());
                groups.len() - 1
            });
            groups[slot].push(result);
        }

        let mut table = SensitivityTable::new(
            by.iter().map(|name| name.to_string()).collect(),
            self.result_name.clone(),
        );
        for (values, group) in keys.iter().zip(&groups) {
            table.push_row(values, aggregation.apply(group));
        }
        Ok(table)
    }

    /// Pivot the result into a `row_column` x `col_column` grid
    pub fn pivot(
        &self,
        row_column: &str,
        col_column: &str,
        aggregation: &Aggregation,
    ) -> Result<PivotTable> {
        PivotTable::from_table(self, row_column, col_column, aggregation)
    }

    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    /// Comma separated values with a header row
    pub fn to_csv(&self) -> String {
        let mut out = String::new();
        let header: Vec<String> = self.columns().into_iter().map(csv_field).collect();
        out.push_str(&header.join(","));
        out.push('\n');
        for row in self.rows() {
            let fields: Vec<String> = row
                .values
                .iter()
                .chain(std::iter::once(&row.result))
                .map(f64::to_string)
                .collect();
            out.push_str(&fields.join(","));
            out.push('\n');
        }
        out
    }
}

/// Bit pattern used to group equal values (`-0.0 == 0.0`, all NaNs equal)
pub(crate) fn key_bits(value: f64) -> u64 {
    if value.is_nan() {
        f64::NAN.to_bits()
    } else if value == 0.0 {
        0.0f64.to_bits()
    } else {
        value.to_bits()
    }
}

pub(crate) fn same_key(a: f64, b: f64) -> bool {
    key_bits(a) == key_bits(b)
}

fn csv_field(name: &str) -> String {
    if name.contains([',', '"', '\n']) {
        format!("\"{}\"", name.replace('"', "\"\""))
    } else {
        name.to_string()
    }
}
