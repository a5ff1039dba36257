//! Sweep files: a YAML description of a sensitivity analysis.
//!
//! ```yaml
//! model: "x_1 ^ x_2"
//! result_name: Result
//! values:
//!   x_1: [10, 20, 30]
//!   x_2: { min: 1, max: 3, steps: 3 }
//! fixed: { c: 5 }
//! aggregation: mean
//! color_map: RdYlGn
//! num_fmt: "${:,.0f}"
//! labels: { x_1: First Input }
//! ```

use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};
use thiserror::Error;

use sensitivity_core::analyzer::{DEFAULT_GRID_SIZE, DEFAULT_RESULT_NAME};
use sensitivity_core::color::UnknownColorMap;
use sensitivity_core::{
    Aggregation, ColorScale, EvaluateOptions, ExpressionError, ExpressionModel, FixedArgs,
    NumberFormat, SensitivityAnalyzer, SensitivityError, SensitivityValues, SweepProgress,
};

/// Names an expression may use without defining them
const CONSTANTS: [&str; 2] = ["pi", "e"];

/// Errors raised while loading or running a sweep file
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid sweep file: {0}")]
    Parse(#[from] serde_saphyr::Error),
    #[error("invalid model expression: {0}")]
    Expression(#[from] ExpressionError),
    #[error("model uses '{0}', which is neither a swept value nor a fixed argument")]
    UndefinedVariable(String),
    #[error(transparent)]
    ColorMap(#[from] UnknownColorMap),
    #[error(transparent)]
    Sensitivity(#[from] SensitivityError),
}

fn default_result_name() -> String {
    DEFAULT_RESULT_NAME.to_string()
}

fn default_grid_size() -> usize {
    DEFAULT_GRID_SIZE
}

fn default_color_map() -> String {
    "RdYlGn".to_string()
}

fn default_repeats() -> usize {
    1
}

fn default_parallel() -> bool {
    true
}

/// Contents of a sweep file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SweepFile {
    /// Expression over the swept values and fixed arguments
    pub model: String,
    #[serde(default = "default_result_name")]
    pub result_name: String,
    pub values: SensitivityValues,
    #[serde(default)]
    pub fixed: FixedArgs,
    #[serde(default)]
    pub aggregation: Aggregation,
    #[serde(default = "default_grid_size")]
    pub grid_size: usize,
    #[serde(default)]
    pub reverse_colors: bool,
    /// Colour map name; a `_r` suffix reverses it
    #[serde(default = "default_color_map")]
    pub color_map: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub num_fmt: Option<NumberFormat>,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub labels: BTreeMap<String, String>,
    /// Evaluations per combination; above 1 every combination yields samples
    #[serde(default = "default_repeats")]
    pub repeats: usize,
    #[serde(default)]
    pub seed: u64,
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

impl SweepFile {
    pub fn from_yaml(yaml: &str) -> Result<Self, ConfigError> {
        Ok(serde_saphyr::from_str(yaml)?)
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let sweep = Self::from_yaml(&content)?;
        tracing::debug!(
            path = %path.display(),
            parameters = sweep.values.len(),
            "loaded sweep file"
        );
        Ok(sweep)
    }

    /// The model expression, checked against the defined names
    pub fn model(&self) -> Result<ExpressionModel, ConfigError> {
        let model = ExpressionModel::parse(&self.model)?.with_repeats(self.repeats);
        let undefined = model.expression.variables().into_iter().find(|name| {
            !self.values.contains(name)
                && self.fixed.get(name).is_none()
                && !CONSTANTS.contains(&name.as_str())
        });
        match undefined {
            Some(name) => Err(ConfigError::UndefinedVariable(name)),
            None => Ok(model),
        }
    }

    pub fn color_scale(&self) -> Result<ColorScale, ConfigError> {
        Ok(ColorScale::from_name(&self.color_map, self.reverse_colors)?)
    }

    pub fn options(&self) -> EvaluateOptions {
        EvaluateOptions {
            parallel: self.parallel,
            seed: self.seed,
        }
    }

    /// Evaluate the sweep
    pub fn run(&self, progress: Option<&SweepProgress>) -> Result<SensitivityAnalyzer, ConfigError> {
        let mut builder = SensitivityAnalyzer::builder(self.values.clone(), self.model()?)
            .result_name(self.result_name.clone())
            .aggregation(self.aggregation.clone())
            .grid_size(self.grid_size)
            .color_scale(self.color_scale()?)
            .labels(self.labels.clone())
            .fixed(self.fixed.clone())
            .options(self.options());
        if let Some(num_fmt) = &self.num_fmt {
            builder = builder.num_fmt(num_fmt.clone());
        }

        let analyzer = match progress {
            Some(progress) => builder.progress(progress).build()?,
            None => builder.build()?,
        };
        Ok(analyzer)
    }
}
