//! Models evaluated by a sensitivity sweep and the arguments passed to them.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use rand::SeedableRng;
use rand::rngs::StdRng;
use serde::{Deserialize, Serialize};

use crate::error::ModelError;

/// Result of evaluating a model at one combination
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Outcome {
    /// A single value
    Scalar(f64),
    /// Several values for the same combination (e.g. Monte Carlo repeats).
    /// Each sample becomes its own table row.
    Samples(Vec<f64>),
}

impl Outcome {
    pub fn len(&self) -> usize {
        match self {
            Outcome::Scalar(_) => 1,
            Outcome::Samples(samples) => samples.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Conversion from a model's return value into an [`Outcome`]
pub trait IntoOutcome {
    fn into_outcome(self) -> Result<Outcome, ModelError>;
}

impl IntoOutcome for Outcome {
    fn into_outcome(self) -> Result<Outcome, ModelError> {
        Ok(self)
    }
}

impl IntoOutcome for f64 {
    fn into_outcome(self) -> Result<Outcome, ModelError> {
        Ok(Outcome::Scalar(self))
    }
}

impl IntoOutcome for Vec<f64> {
    fn into_outcome(self) -> Result<Outcome, ModelError> {
        Ok(Outcome::Samples(self))
    }
}

impl<T, E> IntoOutcome for Result<T, E>
where
    T: IntoOutcome,
    E: Into<ModelError>,
{
    fn into_outcome(self) -> Result<Outcome, ModelError> {
        self.map_err(Into::into)?.into_outcome()
    }
}

/// A function of named parameters.
///
/// Implemented for any `Fn(&Params) -> R` where `R` is `f64`, `Vec<f64>`,
/// [`Outcome`] or a `Result` of one of those.
pub trait Model: Sync {
    fn evaluate(&self, params: &Params) -> Result<Outcome, ModelError>;
}

impl<F, R> Model for F
where
    F: Fn(&Params) -> R + Sync,
    R: IntoOutcome,
{
    fn evaluate(&self, params: &Params) -> Result<Outcome, ModelError> {
        self(params).into_outcome()
    }
}

/// Keyword arguments passed to every model call regardless of the combination
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct FixedArgs(BTreeMap<String, f64>);

impl FixedArgs {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: f64) -> Self {
        self.0.insert(name.into(), value);
        self
    }

    pub fn insert(&mut self, name: impl Into<String>, value: f64) -> Option<f64> {
        self.0.insert(name.into(), value)
    }

    pub fn get(&self, name: &str) -> Option<f64> {
        self.0.get(name).copied()
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.0.iter().map(|(name, value)| (name.as_str(), *value))
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl<N: Into<String>> FromIterator<(N, f64)> for FixedArgs {
    fn from_iter<I: IntoIterator<Item = (N, f64)>>(iter: I) -> Self {
        Self(iter.into_iter().map(|(n, v)| (n.into(), v)).collect())
    }
}

/// Arguments of a single model call: the swept values of one combination
/// plus the fixed keyword arguments.
#[derive(Debug, Clone)]
pub struct Params {
    names: Arc<[String]>,
    values: Vec<f64>,
    fixed: Arc<FixedArgs>,
    index: usize,
    seed: u64,
}

impl Params {
    pub fn new(
        names: Arc<[String]>,
        values: Vec<f64>,
        fixed: Arc<FixedArgs>,
        index: usize,
        seed: u64,
    ) -> Self {
        debug_assert_eq!(names.len(), values.len());
        Self {
            names,
            values,
            fixed,
            index,
            seed,
        }
    }

    /// Look up an argument by name; swept values shadow nothing since names
    /// are validated to be disjoint from fixed arguments.
    pub fn get(&self, name: &str) -> Option<f64> {
        self.names
            .iter()
            .position(|n| n == name)
            .map(|i| self.values[i])
            .or_else(|| self.fixed.get(name))
    }

    /// Look up a required argument
    pub fn value(&self, name: &str) -> Result<f64, ModelError> {
        self.get(name)
            .ok_or_else(|| ModelError::MissingArgument(name.to_string()))
    }

    /// Position of this combination in row-major sweep order
    pub fn index(&self) -> usize {
        self.index
    }

    /// Deterministic seed for this combination
    pub fn seed(&self) -> u64 {
        self.seed
    }

    /// Random number generator seeded for this combination
    pub fn rng(&self) -> StdRng {
        StdRng::seed_from_u64(self.seed)
    }

    /// Swept values in declaration order
    pub fn swept(&self) -> impl Iterator<Item = (&str, f64)> {
        self.names
            .iter()
            .map(String::as_str)
            .zip(self.values.iter().copied())
    }

    pub fn fixed(&self) -> &FixedArgs {
        &self.fixed
    }

    /// All arguments, swept first, then fixed
    pub fn iter(&self) -> impl Iterator<Item = (&str, f64)> {
        self.swept().chain(self.fixed.iter())
    }
}

impl fmt::Display for Params {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut first = true;
        for (name, value) in self.iter() {
            if !first {
                write!(f, ", ")?;
            }
            write!(f, "{name}={value}")?;
            first = false;
        }
        Ok(())
    }
}

/// Seed for the combination at `index` derived from the sweep seed
pub(crate) fn combination_seed(base: u64, index: usize) -> u64 {
    base ^ (index as u64).wrapping_add(1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn params() -> Params {
        Params::new(
            Arc::from(vec!["a".to_string(), "b".to_string()]),
            vec![1.0, 2.0],
            Arc::new(FixedArgs::new().with("c", 3.0)),
            4,
            99,
        )
    }

    #[test]
    fn test_lookup_swept_and_fixed() {
        let p = params();
        assert_eq!(p.get("a"), Some(1.0));
        assert_eq!(p.get("c"), Some(3.0));
        assert_eq!(p.get("d"), None);
        assert_eq!(
            p.value("d"),
            Err(ModelError::MissingArgument("d".to_string()))
        );
    }

    #[test]
    fn test_display_lists_all_arguments() {
        assert_eq!(params().to_string(), "a=1, b=2, c=3");
    }

    #[test]
    fn test_closure_models() {
        fn sum(p: &Params) -> Result<f64, ModelError> {
            Ok(p.value("a")? + p.value("b")?)
        }
        fn samples(p: &Params) -> Vec<f64> {
            vec![p.get("a").unwrap_or(0.0); 3]
        }

        let p = params();
        assert_eq!(sum.evaluate(&p), Ok(Outcome::Scalar(3.0)));
        assert_eq!(samples.evaluate(&p), Ok(Outcome::Samples(vec![1.0; 3])));

        let failing = |_: &Params| Err::<f64, _>("boom");
        assert_eq!(failing.evaluate(&p), Err(ModelError::Failed("boom".into())));
    }

    #[test]
    fn test_combination_seeds_differ() {
        assert_ne!(combination_seed(0, 0), combination_seed(0, 1));
        assert_ne!(combination_seed(1, 0), combination_seed(2, 0));
    }
}
