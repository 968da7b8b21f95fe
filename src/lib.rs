// Library interface for Prehab modules
// The CLI and the integration tests both go through this crate root

pub mod anomaly;
pub mod biomechanics;
pub mod chart_data;
pub mod config;
pub mod error;
pub mod forecast;
pub mod logging;
pub mod models;
pub mod orchestrator;
pub mod policy;
pub mod standard_analysis;

// Re-export commonly used types for convenience
pub use models::*;
pub use anomaly::{AnomalyDetector, AnomalyKind, AnomalyRecord, AnomalyReport};
pub use biomechanics::{
    AngleEstimator, BiomechanicsGraph, GraphRisk, Joint, Keypoint, KeypointSet, PlaceholderAngle,
    VectorAngle,
};
pub use config::EngineConfig;
pub use forecast::{SequenceForecaster, TrainingStatus, FORECAST_HORIZON};
pub use orchestrator::AnalysisEngine;
pub use policy::{PolicyAdvisor, PolicyDecision, PolicyState, TrainingAction};
pub use error::PrehabError;
pub use logging::{LogConfig, LogLevel, LogFormat};
