//! Composite analysis: rule-based baseline fused with the four sub-models
//!
//! `AnalysisEngine::analyze` never fails. Each sub-model call returns its own
//! typed error, which is logged at the error's severity and replaced with a
//! neutral value:
//!
//! | Sub-model          | Fallback                        |
//! |--------------------|---------------------------------|
//! | SequenceForecaster | flat 50% risk for all 15 days   |
//! | BiomechanicsGraph  | inactive graph readout          |
//! | PolicyAdvisor      | no strategy, no coach line      |
//!
//! The forecaster is shared by every request the engine serves, so a retrain
//! triggered by one athlete's history is visible to the next request.

use chrono::Utc;
use rayon::prelude::*;
use tracing::{debug, info, info_span};
use uuid::Uuid;

use crate::anomaly::AnomalyDetector;
use crate::biomechanics::{BiomechanicsGraph, GraphRisk};
use crate::chart_data;
use crate::config::{EngineConfig, FallbackConfig};
use crate::error::{ForecastError, PrehabError};
use crate::forecast::{flatline_forecast, SequenceForecaster, WINDOW_LEN};
use crate::models::{AnalysisRequest, AnalysisResult, HistoryPoint, RawMetrics};
use crate::policy::{PolicyAdvisor, PolicyDecision};
use crate::standard_analysis;

/// Where the history fed to the sub-models came from
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HistorySource {
    /// The request's own history (at least 7 days)
    Caller,
    /// Generated from the current-day snapshot
    Synthetic,
}

/// Owns the sub-models and fuses their outputs
#[derive(Debug)]
pub struct AnalysisEngine {
    config: EngineConfig,
    detector: AnomalyDetector,
    forecaster: SequenceForecaster,
    graph: BiomechanicsGraph,
    advisor: PolicyAdvisor,
}

impl AnalysisEngine {
    pub fn new() -> Self {
        Self::with_config(EngineConfig::default())
    }

    pub fn with_config(config: EngineConfig) -> Self {
        AnalysisEngine {
            detector: AnomalyDetector::with_config(config.anomaly.clone()),
            forecaster: SequenceForecaster::with_config(config.forecast.clone()),
            graph: BiomechanicsGraph::new(),
            advisor: PolicyAdvisor::new(),
            config,
        }
    }

    /// Swap the skeleton scorer, e.g. for one with a real angle estimator
    pub fn with_graph(mut self, graph: BiomechanicsGraph) -> Self {
        self.graph = graph;
        self
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    pub fn forecaster(&self) -> &SequenceForecaster {
        &self.forecaster
    }

    /// Run the full pipeline for one request
    pub fn analyze(&self, request: &AnalysisRequest) -> AnalysisResult {
        let analysis_id = Uuid::new_v4();
        let span = info_span!(
            "analyze",
            user_id = %request.athlete.user_id,
            analysis_id = %analysis_id
        );
        let _enter = span.enter();

        let standard = standard_analysis::run(request);

        let (history, source) = self.prepare_history(request);
        let retrain = source == HistorySource::Caller
            && history.len() > self.config.forecast.min_training_points;
        debug!(?source, days = history.len(), retrain, "History prepared");

        let forecast = self.run_forecast(&history, retrain).unwrap_or_else(|err| {
            PrehabError::from(err).log_fallback("flatline forecast");
            flatline_forecast()
        });

        let anomaly_report = self.detector.detect(&history);

        let mut recommendations = standard.recommendations;
        if anomaly_report.detected {
            for tip in &anomaly_report.advice {
                recommendations.insert(0, format!("🚨 {}", tip));
            }
        }

        let gnn_data = self
            .graph
            .propagate(&BiomechanicsGraph::placeholder_keypoints())
            .unwrap_or_else(|err| {
                PrehabError::from(err).log_fallback("inactive graph");
                GraphRisk::inactive()
            });

        let rl_strategy = self.run_policy(request);
        if let Some(decision) = &rl_strategy {
            recommendations.insert(0, format!("🤖 AI Coach Strategy: {}", decision.action));
        }

        info!(
            report_type = %standard.report_type,
            score = standard.score,
            anomalies = anomaly_report.anomalies.len(),
            "Analysis complete"
        );

        AnalysisResult {
            analysis_id,
            generated_at: Utc::now(),
            user_id: request.athlete.user_id.clone(),
            report_type: standard.report_type,
            score: standard.score,
            alerts: standard.alerts,
            recommendations,
            forecast,
            raw_metrics: RawMetrics {
                rl_strategy,
                anomalies: anomaly_report.anomalies.clone(),
                recovery_scatter: chart_data::recovery_scatter(&history),
                load_vol: chart_data::load_volume(&history),
                recovery_tank: chart_data::recovery_tank(&history),
                gnn_data,
                knee_valgus: standard.knee_valgus,
                joint_load: standard.joint_load,
            },
            anomaly_report,
        }
    }

    /// Analyze a batch in parallel; results keep the input order
    pub fn analyze_squad(&self, requests: &[AnalysisRequest]) -> Vec<AnalysisResult> {
        self.analyze_squad_with(requests, |_| {})
    }

    /// Like [`analyze_squad`](Self::analyze_squad), calling `on_done` as each
    /// request finishes
    pub fn analyze_squad_with<F>(&self, requests: &[AnalysisRequest], on_done: F) -> Vec<AnalysisResult>
    where
        F: Fn(&AnalysisResult) + Sync,
    {
        info!(requests = requests.len(), "Starting squad analysis");
        requests
            .par_iter()
            .map(|request| {
                let result = self.analyze(request);
                on_done(&result);
                result
            })
            .collect()
    }

    /// Caller history when it covers a full window, otherwise a synthetic one
    pub fn prepare_history(&self, request: &AnalysisRequest) -> (Vec<HistoryPoint>, HistorySource) {
        match &request.history {
            Some(history) if history.len() >= WINDOW_LEN => (history.clone(), HistorySource::Caller),
            _ => (
                synthesize_history(request, &self.config.fallback),
                HistorySource::Synthetic,
            ),
        }
    }

    /// Forecast with exactly one model snapshot, retraining first if asked
    fn run_forecast(&self, history: &[HistoryPoint], retrain: bool) -> Result<Vec<f64>, ForecastError> {
        let model = if retrain {
            match self.forecaster.train_snapshot(history) {
                Ok((status, model)) => {
                    debug!(?status, "Forecaster retrain finished");
                    model
                }
                Err(err) => {
                    PrehabError::from(err).log_fallback("current forecaster snapshot");
                    self.forecaster.snapshot()?
                }
            }
        } else {
            self.forecaster.snapshot()?
        };

        model.forecast(history)
    }

    fn run_policy(&self, request: &AnalysisRequest) -> Option<PolicyDecision> {
        let fallback = &self.config.fallback;
        let hrv = request
            .biometrics
            .as_ref()
            .map_or(fallback.default_hrv, |b| b.hrv);
        let sleep_hours = request
            .biometrics
            .as_ref()
            .map_or(fallback.default_sleep_hours, |b| b.sleep_hours);
        let fatigue = request
            .wellness
            .as_ref()
            .map_or(fallback.default_fatigue, |w| w.mental_fatigue);

        match self.advisor.recommend(hrv, sleep_hours, fatigue) {
            Ok(decision) => Some(decision),
            Err(err) => {
                PrehabError::from(err).log_fallback("no coach strategy");
                None
            }
        }
    }
}

impl Default for AnalysisEngine {
    fn default() -> Self {
        Self::new()
    }
}

/// Flat history built from today's snapshot with a single load spike
pub fn synthesize_history(request: &AnalysisRequest, fallback: &FallbackConfig) -> Vec<HistoryPoint> {
    let load = request
        .load_metrics
        .as_ref()
        .map_or(fallback.default_load, |m| m.session_load() / 10.0);
    let hrv = request
        .biometrics
        .as_ref()
        .map_or(fallback.default_hrv, |b| b.hrv);
    let sleep_hours = request
        .biometrics
        .as_ref()
        .map_or(fallback.default_sleep_hours, |b| b.sleep_hours);

    (0..fallback.synthetic_days)
        .map(|day| {
            let multiplier = if day == fallback.spike_index {
                fallback.spike_multiplier
            } else {
                1.0
            };
            HistoryPoint::new(load * multiplier, hrv, sleep_hours)
        })
        .collect()
}
