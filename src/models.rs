use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

use crate::anomaly::{AnomalyRecord, AnomalyReport};
use crate::biomechanics::GraphRisk;
use crate::policy::PolicyDecision;

/// One day of athlete history: training load, HRV and sleep
///
/// Serialized as a `[load, hrv, sleep_hours]` triple, which is the shape the
/// dashboard sends.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(from = "[f64; 3]", into = "[f64; 3]")]
pub struct HistoryPoint {
    /// Training load in arbitrary units (RPE x minutes scale)
    pub load: f64,

    /// Heart rate variability in milliseconds
    pub hrv: f64,

    /// Sleep duration in hours
    pub sleep_hours: f64,
}

impl HistoryPoint {
    pub fn new(load: f64, hrv: f64, sleep_hours: f64) -> Self {
        HistoryPoint {
            load,
            hrv,
            sleep_hours,
        }
    }

    pub fn to_array(self) -> [f64; 3] {
        [self.load, self.hrv, self.sleep_hours]
    }
}

impl From<[f64; 3]> for HistoryPoint {
    fn from(values: [f64; 3]) -> Self {
        HistoryPoint::new(values[0], values[1], values[2])
    }
}

impl From<HistoryPoint> for [f64; 3] {
    fn from(point: HistoryPoint) -> Self {
        point.to_array()
    }
}

/// Account role of the requesting user
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum UserRole {
    /// Non-athlete account; receives a zero-risk passthrough report
    Public,
    #[default]
    Player,
    Coach,
    #[serde(other)]
    Other,
}

/// Who the analysis is for
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AthleteContext {
    pub user_id: String,

    #[serde(default)]
    pub role: UserRole,
}

impl Default for AthleteContext {
    fn default() -> Self {
        AthleteContext {
            user_id: "unknown".to_string(),
            role: UserRole::Player,
        }
    }
}

/// Sports with dedicated analysis paths
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Sport {
    Football,
    Cricket,
    Basketball,
    Other,
}

impl Sport {
    /// Parse the sport name sent by the dashboard (exact, case-sensitive)
    pub fn from_name(name: &str) -> Self {
        match name {
            "Football" => Sport::Football,
            "Cricket" => Sport::Cricket,
            "Basketball" => Sport::Basketball,
            _ => Sport::Other,
        }
    }
}

/// Current-day physiological readings
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Biometrics {
    pub sport: String,
    pub age: u32,
    /// Body mass in kilograms
    pub weight: f64,
    /// Height in centimeters
    pub height: f64,
    /// Heart rate variability (RMSSD) in milliseconds
    pub hrv: f64,
    pub vo2_max: f64,
    pub sleep_hours: f64,
    pub stress_index: f64,
    pub sleep_quality: f64,
    pub resting_hr: f64,
    /// SpO2 percentage
    pub blood_oxygen: f64,
    pub hr_response: f64,
}

/// Session load inputs
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadMetrics {
    /// Rate of perceived exertion (1-10)
    pub rpe: f64,
    pub duration_minutes: f64,
    /// Weekly load the athlete is conditioned for
    pub chronic_tolerance: f64,
    /// Acute:chronic workload ratio as reported by the client
    pub acwr: f64,
    pub sprint_distance: f64,
    #[serde(default)]
    pub bowling_overs: Option<f64>,
    #[serde(default)]
    pub jump_count: Option<f64>,
}

impl LoadMetrics {
    /// Session load in RPE x minutes
    pub fn session_load(&self) -> f64 {
        self.rpe * self.duration_minutes
    }
}

/// Self-reported wellness questionnaire (1-10 scales)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Wellness {
    pub mood_score: i32,
    pub motivation: i32,
    pub life_stress: i32,
    pub mental_fatigue: i32,
}

/// Movement-screen measurements
///
/// All fields are optional on the wire; the analyses that need a field fail
/// individually when it is absent.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Mechanics {
    #[serde(default)]
    pub knee_valgus_angle: Option<f64>,

    #[serde(default)]
    pub ankle_eversion_angle: Option<f64>,

    /// Left/right braking force difference in percent
    #[serde(default)]
    pub braking_force_asymmetry: Option<f64>,

    /// Any other screen values, carried but unused
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_json::Value>,
}

/// A single analysis request as received from the API layer
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnalysisRequest {
    #[serde(default)]
    pub athlete: AthleteContext,

    #[serde(default)]
    pub biometrics: Option<Biometrics>,

    #[serde(default)]
    pub load_metrics: Option<LoadMetrics>,

    #[serde(default)]
    pub wellness: Option<Wellness>,

    #[serde(default)]
    pub mechanics: Option<Mechanics>,

    /// Daily `[load, hrv, sleep]` history, oldest first
    #[serde(default)]
    pub history: Option<Vec<HistoryPoint>>,
}

/// Sleep vs HRV scatter point, sized by load
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryScatterPoint {
    pub sleep: f64,
    pub hrv: f64,
    pub size: f64,
}

/// Daily load bar
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoadVolumePoint {
    /// 1-based day number
    pub day: usize,
    pub load: f64,
}

/// Recovery "fuel" level for one day (0-100)
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecoveryTankPoint {
    pub day: usize,
    pub fuel: f64,
}

/// Sub-model outputs and chart series attached to a result
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RawMetrics {
    /// Policy advisor decision (None when the advisor failed)
    pub rl_strategy: Option<PolicyDecision>,

    pub anomalies: Vec<AnomalyRecord>,

    pub recovery_scatter: Vec<RecoveryScatterPoint>,

    pub load_vol: Vec<LoadVolumePoint>,

    pub recovery_tank: Vec<RecoveryTankPoint>,

    pub gnn_data: GraphRisk,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub knee_valgus: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub joint_load: Option<f64>,
}

/// Composite injury-risk assessment returned for one request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisResult {
    pub analysis_id: Uuid,

    pub generated_at: DateTime<Utc>,

    pub user_id: String,

    pub report_type: String,

    /// Readiness risk score (0-100, higher is riskier)
    pub score: f64,

    pub alerts: Vec<String>,

    /// Ranked recommendations, highest priority first
    pub recommendations: Vec<String>,

    /// Daily risk percentages for T+1..T+15
    pub forecast: Vec<f64>,

    pub raw_metrics: RawMetrics,

    pub anomaly_report: AnomalyReport,
}
