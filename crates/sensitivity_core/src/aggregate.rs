//! Reductions applied when several results share a parameter combination.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

type ReduceFn = dyn Fn(&[f64]) -> f64 + Send + Sync;

/// User-supplied reduction with a display name
#[derive(Clone)]
pub struct CustomAggregation {
    name: String,
    func: Arc<ReduceFn>,
}

impl CustomAggregation {
    pub fn name(&self) -> &str {
        &self.name
    }
}

impl fmt::Debug for CustomAggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CustomAggregation")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

/// How to reduce several results to one value.
///
/// NaN results are skipped. A group with no finite-or-infinite values reduces
/// to NaN, except `Count` and `Sum` which give 0.
#[derive(Debug, Clone, Default)]
pub enum Aggregation {
    #[default]
    Mean,
    Median,
    /// Population standard deviation
    Std,
    /// Population variance
    Var,
    Min,
    Max,
    Sum,
    Count,
    /// Receives the group's values with NaNs already removed
    Custom(CustomAggregation),
}

impl Aggregation {
    pub fn custom(
        name: impl Into<String>,
        func: impl Fn(&[f64]) -> f64 + Send + Sync + 'static,
    ) -> Self {
        Aggregation::Custom(CustomAggregation {
            name: name.into(),
            func: Arc::new(func),
        })
    }

    pub fn name(&self) -> &str {
        match self {
            Aggregation::Mean => "mean",
            Aggregation::Median => "median",
            Aggregation::Std => "std",
            Aggregation::Var => "var",
            Aggregation::Min => "min",
            Aggregation::Max => "max",
            Aggregation::Sum => "sum",
            Aggregation::Count => "count",
            Aggregation::Custom(custom) => &custom.name,
        }
    }

    /// Reduce `values` to a single number
    pub fn apply(&self, values: &[f64]) -> f64 {
        let present: Vec<f64> = values.iter().copied().filter(|v| !v.is_nan()).collect();

        match self {
            Aggregation::Count => present.len() as f64,
            Aggregation::Sum => present.iter().sum(),
            Aggregation::Custom(custom) => (custom.func)(&present),
            _ if present.is_empty() => f64::NAN,
            Aggregation::Mean => mean(&present),
            Aggregation::Median => median(present),
            Aggregation::Var => variance(&present),
            Aggregation::Std => variance(&present).sqrt(),
            Aggregation::Min => present.iter().copied().fold(f64::INFINITY, f64::min),
            Aggregation::Max => present.iter().copied().fold(f64::NEG_INFINITY, f64::max),
        }
    }
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(mut values: Vec<f64>) -> f64 {
    values.sort_by(f64::total_cmp);
    let mid = values.len() / 2;
    if values.len() % 2 == 0 {
        (values[mid - 1] + values[mid]) / 2.0
    } else {
        values[mid]
    }
}

fn variance(values: &[f64]) -> f64 {
    let m = mean(values);
    values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / values.len() as f64
}

impl PartialEq for Aggregation {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl fmt::Display for Aggregation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Error for an unrecognised aggregation name
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("unknown aggregation '{0}' (expected mean, median, std, var, min, max, sum or count)")]
pub struct UnknownAggregation(pub String);

impl FromStr for Aggregation {
    type Err = UnknownAggregation;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "mean" | "average" | "avg" => Ok(Aggregation::Mean),
            "median" => Ok(Aggregation::Median),
            "std" | "stddev" => Ok(Aggregation::Std),
            "var" | "variance" => Ok(Aggregation::Var),
            "min" => Ok(Aggregation::Min),
            "max" => Ok(Aggregation::Max),
            "sum" => Ok(Aggregation::Sum),
            "count" => Ok(Aggregation::Count),
            _ => Err(UnknownAggregation(s.to_string())),
        }
    }
}

impl Serialize for Aggregation {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for Aggregation {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let name = String::deserialize(deserializer)?;
        name.parse().map_err(serde::de::Error::custom)
    }
}
