//! Statistical anomaly detection over daily athlete history
//!
//! Each channel (load, HRV) is scanned independently with a population
//! z-score. Outliers are classified by which side of the channel mean they
//! fall on, and the actionable ones carry a coaching advisory.

use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::config::AnomalyConfig;
use crate::models::HistoryPoint;

/// Kinds of day-level anomaly
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AnomalyKind {
    /// Load far above the athlete's recent norm
    LoadSpike,
    /// Load far below the athlete's recent norm
    Undertraining,
    /// HRV far below the athlete's recent norm
    HrvCrash,
}

impl fmt::Display for AnomalyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnomalyKind::LoadSpike => write!(f, "Acute Load Spike"),
            AnomalyKind::Undertraining => write!(f, "Undertraining"),
            AnomalyKind::HrvCrash => write!(f, "HRV Crash"),
        }
    }
}

/// A single detected outlier
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnomalyRecord {
    /// 0-based day offset into the history
    pub day_index: usize,
    pub kind: AnomalyKind,
    /// Raw channel value on that day
    pub value: f64,
}

/// Output of a detection pass
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AnomalyReport {
    pub detected: bool,
    pub anomalies: Vec<AnomalyRecord>,
    /// Deduplicated coaching advisories
    pub advice: Vec<String>,
}

impl AnomalyReport {
    /// Report used when there is not enough history to judge
    pub fn empty() -> Self {
        AnomalyReport::default()
    }
}

/// Summary statistics of one channel
#[derive(Debug, Clone, Copy)]
struct ChannelStats {
    mean: f64,
    std_dev: f64,
}

impl ChannelStats {
    fn of(values: &[f64]) -> Self {
        ChannelStats {
            mean: values.iter().mean(),
            std_dev: values.iter().population_std_dev(),
        }
    }
}

/// Z-score outlier scanner for load and HRV channels
#[derive(Debug, Clone)]
pub struct AnomalyDetector {
    config: AnomalyConfig,
}

impl AnomalyDetector {
    pub fn new() -> Self {
        AnomalyDetector {
            config: AnomalyConfig::default(),
        }
    }

    pub fn with_config(config: AnomalyConfig) -> Self {
        AnomalyDetector { config }
    }

    /// Scan history for load spikes, undertraining and HRV crashes
    pub fn detect(&self, history: &[HistoryPoint]) -> AnomalyReport {
        if history.len() < self.config.min_points {
            debug!(
                points = history.len(),
                required = self.config.min_points,
                "Not enough history for anomaly detection"
            );
            return AnomalyReport::empty();
        }

        let loads: Vec<f64> = history.iter().map(|p| p.load).collect();
        let hrvs: Vec<f64> = history.iter().map(|p| p.hrv).collect();

        let mut anomalies = Vec::new();
        let mut advice = Vec::new();

        let load_stats = ChannelStats::of(&loads);
        for idx in self.outliers(&loads, load_stats) {
            let value = loads[idx];
            if value > load_stats.mean {
                anomalies.push(AnomalyRecord {
                    day_index: idx,
                    kind: AnomalyKind::LoadSpike,
                    value,
                });
                advice.push(format!(
                    "Day {}: Acute Load Spike detected. Reduce session intensity by 20% to normalize.",
                    idx + 1
                ));
            } else if value < load_stats.mean {
                anomalies.push(AnomalyRecord {
                    day_index: idx,
                    kind: AnomalyKind::Undertraining,
                    value,
                });
            }
        }

        let hrv_stats = ChannelStats::of(&hrvs);
        for idx in self.outliers(&hrvs, hrv_stats) {
            let value = hrvs[idx];
            // High HRV outliers are not a risk signal
            if value < hrv_stats.mean {
                anomalies.push(AnomalyRecord {
                    day_index: idx,
                    kind: AnomalyKind::HrvCrash,
                    value,
                });
                advice.push(format!(
                    "Day {}: Significant HRV Drop. Prioritize sleep and active recovery immediately.",
                    idx + 1
                ));
            }
        }

        debug!(
            points = history.len(),
            anomalies = anomalies.len(),
            "Anomaly scan complete"
        );

        AnomalyReport {
            detected: !anomalies.is_empty(),
            anomalies,
            advice: dedup_preserving_order(advice),
        }
    }

    /// Indices whose |z| exceeds the threshold; none for a flat channel
    fn outliers(&self, values: &[f64], stats: ChannelStats) -> Vec<usize> {
        if stats.std_dev == 0.0 || !stats.std_dev.is_finite() {
            return Vec::new();
        }

        values
            .iter()
            .enumerate()
            .filter(|(_, &x)| ((x - stats.mean) / stats.std_dev).abs() > self.config.z_threshold)
            .map(|(idx, _)| idx)
            .collect()
    }
}

impl Default for AnomalyDetector {
    fn default() -> Self {
        Self::new()
    }
}

fn dedup_preserving_order(items: Vec<String>) -> Vec<String> {
    let mut seen = HashSet::new();
    items
        .into_iter()
        .filter(|item| seen.insert(item.clone()))
        .collect()
}
