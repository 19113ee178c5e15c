use thiserror::Error;

/// Failure of one batch prediction. No variant carries a partial result.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PredictError {
    #[error("expected a list of exactly 4 lane readings, got {found}")]
    InvalidBatchShape { found: String },

    #[error("model unavailable: {reason}")]
    ModelUnavailable { reason: String },

    #[error("prediction failed: {0}")]
    PredictionFailure(String),

    #[error("invalid lane readings: {}", .0.join("; "))]
    InvalidReading(Vec<String>),
}

impl PredictError {
    /// Stable kind string for outer layers mapping errors to their transport.
    pub fn kind(&self) -> &'static str {
        match self {
            PredictError::InvalidBatchShape { .. } => "invalid_batch_shape",
            PredictError::ModelUnavailable { .. } => "model_unavailable",
            PredictError::PredictionFailure(_) => "prediction_failure",
            PredictError::InvalidReading(_) => "invalid_reading",
        }
    }

    pub(crate) fn failure(err: impl std::fmt::Display) -> Self {
        PredictError::PredictionFailure(err.to_string())
    }
}
