//! Rule-based readiness checks
//!
//! The baseline report every analysis starts from. Rules are additive risk
//! points capped at 100.
//!
//! # Paths
//!
//! - **Generic health** (cricket, basketball, any other sport): sleep debt and
//!   mental-fatigue context from biometrics and wellness
//! - **Football**: generic health plus landing mechanics, braking asymmetry and
//!   an acute workload spike check against chronic tolerance
//! - **Public accounts**: no scoring at all
//!
//! # Workload spike
//!
//! A session is compared against the athlete's daily capacity, taken as one
//! seventh of their chronic (weekly) tolerance. Session load above 1.5x that
//! capacity is the classic acute spike associated with soft-tissue injury.

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::{CalculationError, PrehabError};
use crate::models::{AnalysisRequest, Mechanics, Sport, UserRole};

const MAX_SCORE: f64 = 100.0;

const SLEEP_DEBT_HOURS: f64 = 6.0;
const SLEEP_DEBT_POINTS: f64 = 25.0;

const FATIGUE_CONTEXT_HRV: f64 = 70.0;
const FATIGUE_CONTEXT_LEVEL: i32 = 7;
const FATIGUE_CONTEXT_POINTS: f64 = 15.0;

/// Ankle eversion at landing, degrees
const LANDING_EVERSION_LIMIT: f64 = 8.0;
const LANDING_FAULT_POINTS: f64 = 25.0;

/// Left/right braking force difference, percent
const BRAKING_ASYMMETRY_LIMIT: f64 = 15.0;
const BRAKING_ASYMMETRY_POINTS: f64 = 30.0;

const ACUTE_SPIKE_RATIO: f64 = 1.5;
const ACUTE_SPIKE_POINTS: f64 = 35.0;

/// Nominal joint load reported on football screens
const FOOTBALL_JOINT_LOAD: f64 = 2.5;

/// Outcome of the rule-based pass
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StandardReport {
    pub report_type: String,
    pub score: f64,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub knee_valgus: Option<f64>,
    pub joint_load: Option<f64>,
}

impl StandardReport {
    /// Zero-risk report for public accounts and requests without biometrics
    pub fn standard() -> Self {
        StandardReport {
            report_type: "Standard".to_string(),
            score: 0.0,
            alerts: Vec::new(),
            recommendations: Vec::new(),
            knee_valgus: None,
            joint_load: None,
        }
    }

    fn add(&mut self, points: f64, alert: impl Into<String>) {
        self.score += points;
        self.alerts.push(alert.into());
    }

    fn cap(mut self) -> Self {
        self.score = self.score.min(MAX_SCORE);
        self
    }
}

/// Which rule set a request is scored with
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AnalysisPath {
    Passthrough,
    Football,
    Health,
}

impl AnalysisPath {
    pub fn for_request(request: &AnalysisRequest) -> Self {
        if request.athlete.role == UserRole::Public {
            return AnalysisPath::Passthrough;
        }
        match &request.biometrics {
            Some(bio) => match Sport::from_name(&bio.sport) {
                Sport::Football => AnalysisPath::Football,
                Sport::Cricket | Sport::Basketball | Sport::Other => AnalysisPath::Health,
            },
            None if request.mechanics.is_some() => AnalysisPath::Football,
            None => AnalysisPath::Health,
        }
    }
}

/// Score a request with the rules for its role and sport
pub fn run(request: &AnalysisRequest) -> StandardReport {
    let path = AnalysisPath::for_request(request);
    debug!(?path, "Running standard analysis");

    match path {
        AnalysisPath::Passthrough => StandardReport::standard(),
        AnalysisPath::Health => athlete_health(request),
        AnalysisPath::Football => match football(request) {
            Ok(report) => report,
            Err(err) => {
                PrehabError::from(err).log_fallback("generic health analysis");
                athlete_health(request)
            }
        },
    }
}

/// Sleep debt and mental-fatigue context
pub fn athlete_health(request: &AnalysisRequest) -> StandardReport {
    let Some(bio) = &request.biometrics else {
        return StandardReport::standard();
    };

    let mut report = StandardReport {
        report_type: format!("BIO_TWIN ({})", bio.sport),
        ..StandardReport::standard()
    };

    if bio.sleep_hours < SLEEP_DEBT_HOURS {
        report.add(SLEEP_DEBT_POINTS, "Sleep Deprivation.");
    }

    if let Some(wellness) = &request.wellness {
        if bio.hrv > FATIGUE_CONTEXT_HRV && wellness.mental_fatigue > FATIGUE_CONTEXT_LEVEL {
            report.add(FATIGUE_CONTEXT_POINTS, "🧠 Context: High Mental Fatigue.");
        }
    }

    report.cap()
}

/// Generic health plus mechanics and workload checks
pub fn football(request: &AnalysisRequest) -> Result<StandardReport, CalculationError> {
    let mut report = athlete_health(request);

    if let Some(mechanics) = &request.mechanics {
        landing_mechanics(mechanics, &mut report)?;
        deceleration(mechanics, &mut report)?;
    }

    if let Some(load) = &request.load_metrics {
        if let Some(ratio) = acute_load_ratio(load.session_load(), load.chronic_tolerance) {
            if ratio > ACUTE_SPIKE_RATIO {
                report.add(ACUTE_SPIKE_POINTS, "⚠️ Acute Spike > 1.5x.");
            }
        }
    }

    report.report_type = "FOOTBALL_TWIN".to_string();
    report.knee_valgus = Some(
        request
            .mechanics
            .as_ref()
            .and_then(|m| m.knee_valgus_angle)
            .unwrap_or(0.0),
    );
    report.joint_load = Some(FOOTBALL_JOINT_LOAD);

    Ok(report.cap())
}

/// Session load over daily capacity; None when capacity is not positive
pub fn acute_load_ratio(session_load: f64, chronic_tolerance: f64) -> Option<f64> {
    let daily_capacity = chronic_tolerance / 7.0;
    if daily_capacity > 0.0 {
        Some(session_load / daily_capacity)
    } else {
        None
    }
}

fn required(value: Option<f64>, calculation: &str, field: &str) -> Result<f64, CalculationError> {
    value.ok_or_else(|| CalculationError::MissingField {
        calculation: calculation.to_string(),
        field: field.to_string(),
    })
}

fn landing_mechanics(mechanics: &Mechanics, report: &mut StandardReport) -> Result<(), CalculationError> {
    let eversion = required(
        mechanics.ankle_eversion_angle,
        "landing mechanics",
        "ankle_eversion_angle",
    )?;
    if eversion > LANDING_EVERSION_LIMIT {
        report.add(LANDING_FAULT_POINTS, "⚠️ Landing Fault.");
    }
    Ok(())
}

fn deceleration(mechanics: &Mechanics, report: &mut StandardReport) -> Result<(), CalculationError> {
    let asymmetry = required(
        mechanics.braking_force_asymmetry,
        "deceleration",
        "braking_force_asymmetry",
    )?;
    if asymmetry > BRAKING_ASYMMETRY_LIMIT {
        report.add(
            BRAKING_ASYMMETRY_POINTS,
            format!("🚨 Braking Asymmetry {:.1}%.", asymmetry),
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AthleteContext, Biometrics, LoadMetrics, Wellness};

    fn biometrics(sport: &str, hrv: f64, sleep_hours: f64) -> Biometrics {
        Biometrics {
            sport: sport.to_string(),
            age: 24,
            weight: 75.0,
            height: 180.0,
            hrv,
            vo2_max: 55.0,
            sleep_hours,
            stress_index: 3.0,
            sleep_quality: 7.0,
            resting_hr: 52.0,
            blood_oxygen: 98.0,
            hr_response: 1.0,
        }
    }

    fn wellness(mental_fatigue: i32) -> Wellness {
        Wellness {
            mood_score: 6,
            motivation: 7,
            life_stress: 4,
            mental_fatigue,
        }
    }

    fn mechanics(eversion: f64, asymmetry: f64) -> Mechanics {
        Mechanics {
            knee_valgus_angle: Some(6.0),
            ankle_eversion_angle: Some(eversion),
            braking_force_asymmetry: Some(asymmetry),
            ..Mechanics::default()
        }
    }

    #[test]
    fn test_public_role_passthrough() {
        let request = AnalysisRequest {
            athlete: AthleteContext {
                user_id: "fan-1".to_string(),
                role: UserRole::Public,
            },
            biometrics: Some(biometrics("Football", 40.0, 4.0)),
            ..AnalysisRequest::default()
        };
        assert_eq!(run(&request), StandardReport::standard());
    }

    #[test]
    fn test_health_without_biometrics() {
        let report = run(&AnalysisRequest::default());
        assert_eq!(report.report_type, "Standard");
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_health_rules() {
        let request = AnalysisRequest {
            biometrics: Some(biometrics("Cricket", 80.0, 5.0)),
            wellness: Some(wellness(9)),
            ..AnalysisRequest::default()
        };
        let report = run(&request);
        assert_eq!(report.report_type, "BIO_TWIN (Cricket)");
        assert_eq!(report.score, 40.0);
        assert_eq!(
            report.alerts,
            vec!["Sleep Deprivation.", "🧠 Context: High Mental Fatigue."]
        );
        assert!(report.knee_valgus.is_none());
    }

    #[test]
    fn test_football_full_screen_is_capped() {
        let request = AnalysisRequest {
            biometrics: Some(biometrics("Football", 60.0, 5.0)),
            mechanics: Some(mechanics(10.0, 18.0)),
            load_metrics: Some(LoadMetrics {
                rpe: 8.0,
                duration_minutes: 90.0,
                chronic_tolerance: 2100.0,
                acwr: 1.4,
                sprint_distance: 600.0,
                bowling_overs: None,
                jump_count: None,
            }),
            ..AnalysisRequest::default()
        };
        let report = run(&request);

        // 25 + 25 + 30 + 35 = 115, capped
        assert_eq!(report.score, 100.0);
        assert_eq!(report.report_type, "FOOTBALL_TWIN");
        assert_eq!(
            report.alerts,
            vec![
                "Sleep Deprivation.",
                "⚠️ Landing Fault.",
                "🚨 Braking Asymmetry 18.0%.",
                "⚠️ Acute Spike > 1.5x."
            ]
        );
        assert_eq!(report.knee_valgus, Some(6.0));
        assert_eq!(report.joint_load, Some(2.5));
    }

    #[test]
    fn test_mechanics_without_biometrics_uses_football_path() {
        let request = AnalysisRequest {
            mechanics: Some(mechanics(3.0, 5.0)),
            ..AnalysisRequest::default()
        };
        assert_eq!(AnalysisPath::for_request(&request), AnalysisPath::Football);

        let report = run(&request);
        assert_eq!(report.report_type, "FOOTBALL_TWIN");
        assert_eq!(report.score, 0.0);
    }

    #[test]
    fn test_incomplete_mechanics_fall_back_to_health() {
        let request = AnalysisRequest {
            biometrics: Some(biometrics("Football", 60.0, 5.0)),
            mechanics: Some(Mechanics {
                ankle_eversion_angle: Some(12.0),
                ..Mechanics::default()
            }),
            ..AnalysisRequest::default()
        };

        match football(&request) {
            Err(CalculationError::MissingField { field, .. }) => {
                assert_eq!(field, "braking_force_asymmetry")
            }
            other => panic!("expected MissingField, got {:?}", other),
        }

        let report = run(&request);
        assert_eq!(report.report_type, "BIO_TWIN (Football)");
        assert_eq!(report.score, 25.0);
        assert_eq!(report.alerts, vec!["Sleep Deprivation."]);
    }

    #[test]
    fn test_acute_load_ratio() {
        assert_eq!(acute_load_ratio(300.0, 1400.0), Some(1.5));
        assert_eq!(acute_load_ratio(300.0, 0.0), None);
    }

    #[test]
    fn test_sport_dispatch() {
        let request = AnalysisRequest {
            biometrics: Some(biometrics("Football", 60.0, 8.0)),
            ..AnalysisRequest::default()
        };
        assert_eq!(AnalysisPath::for_request(&request), AnalysisPath::Football);

        // Names must match exactly; anything else is scored as generic health
        let request = AnalysisRequest {
            biometrics: Some(biometrics("football", 60.0, 8.0)),
            ..AnalysisRequest::default()
        };
        assert_eq!(AnalysisPath::for_request(&request), AnalysisPath::Health);

        let request = AnalysisRequest {
            biometrics: Some(biometrics("Basketball", 60.0, 8.0)),
            mechanics: Some(mechanics(12.0, 20.0)),
            ..AnalysisRequest::default()
        };
        assert_eq!(AnalysisPath::for_request(&request), AnalysisPath::Health);
    }
}
