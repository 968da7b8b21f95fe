//! Dashboard chart series derived from the daily history matrix

use crate::models::{HistoryPoint, LoadVolumePoint, RecoveryScatterPoint, RecoveryTankPoint};

/// Sleep vs HRV, one bubble per day sized by load
pub fn recovery_scatter(history: &[HistoryPoint]) -> Vec<RecoveryScatterPoint> {
    history
        .iter()
        .map(|p| RecoveryScatterPoint {
            sleep: p.sleep_hours,
            hrv: p.hrv,
            size: p.load,
        })
        .collect()
}

/// Daily load bars, days numbered from 1
pub fn load_volume(history: &[HistoryPoint]) -> Vec<LoadVolumePoint> {
    history
        .iter()
        .enumerate()
        .map(|(i, p)| LoadVolumePoint {
            day: i + 1,
            load: p.load,
        })
        .collect()
}

/// Recovery fuel: mean of HRV and 10x sleep hours, clamped to 0-100
pub fn recovery_tank(history: &[HistoryPoint]) -> Vec<RecoveryTankPoint> {
    history
        .iter()
        .enumerate()
        .map(|(i, p)| RecoveryTankPoint {
            day: i + 1,
            fuel: ((p.hrv + 10.0 * p.sleep_hours) / 2.0).clamp(0.0, 100.0),
        })
        .collect()
}
