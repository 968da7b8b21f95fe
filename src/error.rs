//! Unified error hierarchy for Prehab
//!
//! Every sub-model of the analysis engine reports failures through one of the
//! typed errors below. The engine maps each failure kind to a neutral fallback
//! value, so none of these ever escapes `AnalysisEngine::analyze`.

use thiserror::Error;

/// Top-level error type for all Prehab operations
#[derive(Debug, Error)]
pub enum PrehabError {
    /// Sequence forecaster errors
    #[error("Forecast error: {0}")]
    Forecast(#[from] ForecastError),

    /// Biomechanics graph errors
    #[error("Biomechanics error: {0}")]
    Biomechanics(#[from] GraphError),

    /// Policy advisor errors
    #[error("Policy error: {0}")]
    Policy(#[from] PolicyError),

    /// Rule-based calculation errors
    #[error("Calculation error: {0}")]
    Calculation(#[from] CalculationError),

    /// Engine settings the sub-models cannot run with
    #[error("Configuration error: {0}")]
    Configuration(String),
}

/// Sequence forecaster errors
#[derive(Debug, Error)]
pub enum ForecastError {
    /// A history value is NaN or infinite
    #[error("Non-finite value in {channel} at day {day_index}")]
    NonFiniteInput { channel: String, day_index: usize },

    /// The model produced a NaN or infinite value
    #[error("Model diverged during {context}")]
    Diverged { context: String },

    /// The parameter lock was poisoned by a panicking thread
    #[error("Model state poisoned: {reason}")]
    StatePoisoned { reason: String },
}

/// Biomechanics graph errors
#[derive(Debug, Error)]
pub enum GraphError {
    /// A scored joint is absent from a non-empty keypoint set
    #[error("Missing keypoint for joint {joint}")]
    MissingJoint { joint: String },

    /// Angle estimator returned NaN or infinity
    #[error("Invalid angle at {joint}: {value}")]
    InvalidAngle { joint: String, value: f64 },
}

/// Policy advisor errors
#[derive(Debug, Error)]
pub enum PolicyError {
    /// A biometric input is NaN or infinite
    #[error("Non-finite policy input {field}={value}")]
    NonFiniteInput { field: String, value: f64 },
}

/// Rule-based calculation errors
#[derive(Debug, Error)]
pub enum CalculationError {
    /// A field the calculation needs is missing from the request
    #[error("Missing field for {calculation}: {field}")]
    MissingField { calculation: String, field: String },
}

impl PrehabError {

    /// Get error severity level
    pub fn severity(&self) -> ErrorSeverity {
        match self {
            PrehabError::Calculation(_) => ErrorSeverity::Warning,
            PrehabError::Biomechanics(GraphError::MissingJoint { .. }) => ErrorSeverity::Warning,
            PrehabError::Biomechanics(GraphError::InvalidAngle { .. }) => ErrorSeverity::Error,
            PrehabError::Policy(_) => ErrorSeverity::Warning,
            PrehabError::Forecast(ForecastError::StatePoisoned { .. }) => ErrorSeverity::Critical,
            PrehabError::Forecast(_) => ErrorSeverity::Error,
            PrehabError::Configuration(_) => ErrorSeverity::Critical,
        }
    }

    /// Message for the CLI, naming what the athlete's data is missing
    pub fn user_message(&self) -> String {
        match self {
            PrehabError::Forecast(ForecastError::NonFiniteInput { day_index, .. }) => {
                format!(
                    "History for day {} contains an invalid number; the forecast was skipped.",
                    day_index + 1
                )
            }
            PrehabError::Biomechanics(GraphError::MissingJoint { joint }) => {
                format!("Pose data is missing the {} landmark.", joint)
            }
            PrehabError::Forecast(ForecastError::StatePoisoned { .. }) => {
                "The forecast model is unavailable after a failed retrain; restart the engine."
                    .to_string()
            }
            PrehabError::Calculation(CalculationError::MissingField { calculation, field }) => {
                format!(
                    "The {} check needs '{}'. A general health check was used instead.",
                    calculation, field
                )
            }
            _ => self.to_string(),
        }
    }

    /// Emit a tracing event at this error's severity, naming the fallback used
    pub fn log_fallback(&self, fallback: &str) {
        match self.severity() {
            ErrorSeverity::Critical | ErrorSeverity::Error => {
                tracing::error!(error = %self, fallback, "Sub-model failed")
            }
            ErrorSeverity::Warning => tracing::warn!(error = %self, fallback, "Sub-model failed"),
        }
    }
}

/// Error severity levels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorSeverity {
    /// Critical system error requiring immediate attention
    Critical,
    /// Error that prevents operation but system can continue
    Error,
    /// Warning that doesn't prevent operation
    Warning,
}
