//! Training-action advisor over a discretised recovery state
//!
//! The athlete's HRV, sleep and mental fatigue are bucketed into one of three
//! recovery states. Each state has a fixed action-value row, and the advisor
//! greedily picks the highest-valued action.

use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::PolicyError;

/// Discretised recovery state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PolicyState {
    LowRecovery,
    MedRecovery,
    HighRecovery,
}

impl PolicyState {
    /// Bucket the inputs; the first matching rule wins
    pub fn classify(hrv: f64, sleep_hours: f64, fatigue: i32) -> Self {
        if hrv < 50.0 || sleep_hours < 6.0 || fatigue > 7 {
            PolicyState::LowRecovery
        } else if hrv < 75.0 && sleep_hours > 6.5 {
            PolicyState::MedRecovery
        } else {
            PolicyState::HighRecovery
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            PolicyState::LowRecovery => "Low Recovery",
            PolicyState::MedRecovery => "Med Recovery",
            PolicyState::HighRecovery => "High Recovery",
        }
    }

    /// Action values in [`TrainingAction::ALL`] order
    fn values(&self) -> [f64; 5] {
        match self {
            PolicyState::LowRecovery => [0.8, 0.9, 0.6, -0.5, -0.9],
            PolicyState::MedRecovery => [-0.2, 0.4, 0.2, 0.8, 0.1],
            PolicyState::HighRecovery => [-0.8, -0.5, -0.2, 0.6, 0.9],
        }
    }

    fn explanation(&self) -> &'static str {
        match self {
            PolicyState::LowRecovery => {
                "Athlete is in a deficit. High intensity now carries negative reward (injury risk)."
            }
            PolicyState::MedRecovery => {
                "Stable state detected. Maintaining load preserves fitness without spiking risk."
            }
            PolicyState::HighRecovery => {
                "System is primed. Overloading now yields maximum fitness adaptation reward."
            }
        }
    }
}

impl fmt::Display for PolicyState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Prescribable training interventions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum TrainingAction {
    #[serde(rename = "Complete Rest")]
    CompleteRest,
    #[serde(rename = "Active Recovery")]
    ActiveRecovery,
    #[serde(rename = "Reduce Load -30%")]
    ReduceLoad,
    #[serde(rename = "Maintain Load")]
    MaintainLoad,
    #[serde(rename = "Overload +10%")]
    Overload,
}

impl TrainingAction {
    pub const ALL: [TrainingAction; 5] = [
        TrainingAction::CompleteRest,
        TrainingAction::ActiveRecovery,
        TrainingAction::ReduceLoad,
        TrainingAction::MaintainLoad,
        TrainingAction::Overload,
    ];

    pub fn label(&self) -> &'static str {
        match self {
            TrainingAction::CompleteRest => "Complete Rest",
            TrainingAction::ActiveRecovery => "Active Recovery",
            TrainingAction::ReduceLoad => "Reduce Load -30%",
            TrainingAction::MaintainLoad => "Maintain Load",
            TrainingAction::Overload => "Overload +10%",
        }
    }
}

impl fmt::Display for TrainingAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Recommended action with its value-derived confidence
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PolicyDecision {
    pub action: TrainingAction,
    /// |action value| x 100, 1 dp
    pub confidence: f64,
    pub state: PolicyState,
    pub explanation: String,
}

/// Greedy advisor over the fixed action-value table
#[derive(Debug, Clone, Copy, Default)]
pub struct PolicyAdvisor;

impl PolicyAdvisor {
    pub fn new() -> Self {
        PolicyAdvisor
    }

    pub fn recommend(
        &self,
        hrv: f64,
        sleep_hours: f64,
        fatigue: i32,
    ) -> Result<PolicyDecision, PolicyError> {
        for (field, value) in [("hrv", hrv), ("sleep_hours", sleep_hours)] {
            if !value.is_finite() {
                return Err(PolicyError::NonFiniteInput {
                    field: field.to_string(),
                    value,
                });
            }
        }

        let state = PolicyState::classify(hrv, sleep_hours, fatigue);
        let values = state.values();

        // Strict comparison keeps the first index on ties
        let mut best = 0;
        for (idx, &value) in values.iter().enumerate().skip(1) {
            if value > values[best] {
                best = idx;
            }
        }

        Ok(PolicyDecision {
            action: TrainingAction::ALL[best],
            confidence: (values[best].abs() * 1000.0).round() / 10.0,
            state,
            explanation: state.explanation().to_string(),
        })
    }
}
