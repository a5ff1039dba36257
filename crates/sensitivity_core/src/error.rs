use thiserror::Error;

use crate::expression::ExpressionError;
use crate::format::NumberFormatError;

/// Errors raised by a model while evaluating a single combination
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    /// The model asked for an argument that is neither swept nor fixed
    #[error("missing argument '{0}'")]
    MissingArgument(String),
    #[error(transparent)]
    Expression(#[from] ExpressionError),
    #[error("{0}")]
    Failed(String),
}

impl ModelError {
    pub fn failed(message: impl Into<String>) -> Self {
        ModelError::Failed(message.into())
    }
}

impl From<String> for ModelError {
    fn from(message: String) -> Self {
        ModelError::Failed(message)
    }
}

impl From<&str> for ModelError {
    fn from(message: &str) -> Self {
        ModelError::Failed(message.to_string())
    }
}

/// Errors raised while building, evaluating or rendering a sensitivity analysis
#[derive(Debug, Error)]
pub enum SensitivityError {
    #[error("at least one sensitivity parameter is required")]
    NoParameters,
    #[error("parameter names must not be empty")]
    EmptyParameterName,
    #[error("parameter '{0}' has no values")]
    EmptyParameter(String),
    #[error("parameter '{0}' is defined more than once")]
    DuplicateParameter(String),
    #[error("result name '{0}' collides with a parameter name")]
    ResultNameCollision(String),
    #[error("fixed argument '{0}' is also a swept parameter")]
    FixedArgumentCollision(String),
    #[error("invalid range for '{name}': {reason}")]
    InvalidRange { name: String, reason: String },
    #[error("grid size must be between 1 and {max}, got {0}", max = crate::hexbin::MAX_GRID_SIZE)]
    InvalidGridSize(usize),
    #[error("hex-bin plots need at least two swept parameters, got {0}")]
    NotEnoughParameters(usize),
    #[error("unknown column '{0}'")]
    UnknownColumn(String),
    /// The model failed for one combination; `params` describes that combination
    #[error("model failed at combination {index} ({params}): {source}")]
    Model {
        index: usize,
        params: String,
        #[source]
        source: ModelError,
    },
    #[error("sensitivity analysis cancelled")]
    Cancelled,
    #[error(transparent)]
    Format(#[from] NumberFormatError),
    #[error("render error: {0}")]
    Render(String),
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

pub type Result<T, E = SensitivityError> = std::result::Result<T, E>;
