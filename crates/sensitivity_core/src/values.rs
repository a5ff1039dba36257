//! Named parameter values that define a sensitivity sweep.

use std::fmt;

use serde::de::{MapAccess, Visitor};
use serde::ser::SerializeMap;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::{Result, SensitivityError};

/// How the values of one parameter are specified
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValueRange {
    /// Explicit list of values, used as given
    List(Vec<f64>),
    /// `steps` evenly spaced values from `min` to `max` inclusive
    Linspace { min: f64, max: f64, steps: usize },
    /// Values from `start` stepping by `step`, excluding `stop`
    Arange { start: f64, stop: f64, step: f64 },
}

impl ValueRange {
    /// Expand the range into concrete values
    pub fn resolve(&self, name: &str) -> Result<Vec<f64>> {
        let invalid = |reason: &str| SensitivityError::InvalidRange {
            name: name.to_string(),
            reason: reason.to_string(),
        };

        match self {
            ValueRange::List(values) => Ok(values.clone()),
            ValueRange::Linspace { min, max, steps } => {
                if !min.is_finite() || !max.is_finite() {
                    return Err(invalid("bounds must be finite"));
                }
                match *steps {
                    0 => Err(invalid("steps must be at least 1")),
                    1 => Ok(vec![*min]),
                    n => {
                        let step_size = (max - min) / (n - 1) as f64;
                        Ok((0..n).map(|i| min + step_size * i as f64).collect())
                    }
                }
            }
            ValueRange::Arange { start, stop, step } => {
                if !start.is_finite() || !stop.is_finite() || !step.is_finite() {
                    return Err(invalid("start, stop and step must be finite"));
                }
                if *step <= 0.0 {
                    return Err(invalid("step must be positive"));
                }
                let count = ((stop - start) / step).ceil().max(0.0) as usize;
                Ok((0..count).map(|i| start + step * i as f64).collect())
            }
        }
    }
}

impl From<Vec<f64>> for ValueRange {
    fn from(values: Vec<f64>) -> Self {
        ValueRange::List(values)
    }
}

/// Ordered mapping of parameter names to the values to sweep.
///
/// Declaration order matters: it is the column order of the result table and
/// the nesting order of the Cartesian product (first parameter slowest).
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SensitivityValues {
    entries: Vec<(String, Vec<f64>)>,
}

impl SensitivityValues {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter with explicit values (builder style)
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, values: impl IntoIterator<Item = f64>) -> Self {
        self.entries
            .push((name.into(), values.into_iter().collect()));
        self
    }

    /// Add a parameter from a range specification
    pub fn insert(&mut self, name: impl Into<String>, range: &ValueRange) -> Result<()> {
        let name = name.into();
        let values = range.resolve(&name)?;
        self.entries.push((name, values));
        Ok(())
    }

    pub fn from_pairs<N, V>(pairs: impl IntoIterator<Item = (N, V)>) -> Self
    where
        N: Into<String>,
        V: IntoIterator<Item = f64>,
    {
        pairs
            .into_iter()
            .fold(Self::new(), |acc, (name, values)| acc.with(name, values))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.entries.iter().map(|(name, _)| name.as_str())
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[f64])> {
        self.entries
            .iter()
            .map(|(name, values)| (name.as_str(), values.as_slice()))
    }

    pub fn get(&self, name: &str) -> Option<&[f64]> {
        self.entries
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, values)| values.as_slice())
    }

    pub fn position(&self, name: &str) -> Option<usize> {
        self.entries.iter().position(|(n, _)| n == name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.position(name).is_some()
    }

    /// Number of values along each parameter
    pub fn shape(&self) -> Vec<usize> {
        self.entries.iter().map(|(_, values)| values.len()).collect()
    }

    pub fn total_combinations(&self) -> usize {
        self.entries.iter().map(|(_, values)| values.len()).product()
    }

    /// Parameter values at a grid position
    pub fn values_at(&self, indices: &[usize]) -> Vec<f64> {
        self.entries
            .iter()
            .zip(indices)
            .map(|((_, values), &idx)| values[idx])
            .collect()
    }

    /// Check that the sweep is well formed
    pub fn validate(&self) -> Result<()> {
        if self.entries.is_empty() {
            return Err(SensitivityError::NoParameters);
        }
        for (i, (name, values)) in self.entries.iter().enumerate() {
            if name.is_empty() {
                return Err(SensitivityError::EmptyParameterName);
            }
            if values.is_empty() {
                return Err(SensitivityError::EmptyParameter(name.clone()));
            }
            if self.entries[..i].iter().any(|(other, _)| other == name) {
                return Err(SensitivityError::DuplicateParameter(name.clone()));
            }
        }
        Ok(())
    }
}

impl Serialize for SensitivityValues {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        let mut map = serializer.serialize_map(Some(self.entries.len()))?;
        for (name, values) in &self.entries {
            map.serialize_entry(name, values)?;
        }
        map.end()
    }
}

impl<'de> Deserialize<'de> for SensitivityValues {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        struct ValuesVisitor;

        impl<'de> Visitor<'de> for ValuesVisitor {
            type Value = SensitivityValues;

            fn expecting(&self, f: &mut fmt::Formatter) -> fmt::Result {
                f.write_str("a map of parameter names to value lists or ranges")
            }

            fn visit_map<A: MapAccess<'de>>(
                self,
                mut access: A,
            ) -> std::result::Result<Self::Value, A::Error> {
                let mut values = SensitivityValues::new();
                while let Some((name, range)) = access.next_entry::<String, ValueRange>()? {
                    values
                        .insert(name, &range)
                        .map_err(serde::de::Error::custom)?;
                }
                Ok(values)
            }
        }

        deserializer.deserialize_map(ValuesVisitor)
    }
}
