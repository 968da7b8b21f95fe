//! Min-max feature scaling for `[load, hrv, sleep]` rows

use serde::{Deserialize, Serialize};

use crate::models::HistoryPoint;

/// Number of features per history row
pub const FEATURES: usize = 3;

/// Per-feature min-max scaler mapping the fitted range onto `[0, 1]`
///
/// A feature whose fitted range is zero is shifted by its minimum but not
/// stretched, so constant channels map to 0.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MinMaxScaler {
    min: [f64; FEATURES],
    max: [f64; FEATURES],
}

impl MinMaxScaler {
    pub fn new(min: [f64; FEATURES], max: [f64; FEATURES]) -> Self {
        MinMaxScaler { min, max }
    }

    /// Bounds covering load 0-1000, HRV 0-150 ms and sleep 0-12 h
    pub fn default_bounds() -> Self {
        MinMaxScaler::new([0.0, 0.0, 0.0], [1000.0, 150.0, 12.0])
    }

    /// Fit bounds to exactly this batch; `None` for an empty batch
    pub fn fit(points: &[HistoryPoint]) -> Option<Self> {
        let first = points.first()?.to_array();
        let mut min = first;
        let mut max = first;

        for point in &points[1..] {
            for (feature, value) in point.to_array().into_iter().enumerate() {
                min[feature] = min[feature].min(value);
                max[feature] = max[feature].max(value);
            }
        }

        Some(MinMaxScaler { min, max })
    }

    pub fn min(&self) -> [f64; FEATURES] {
        self.min
    }

    pub fn max(&self) -> [f64; FEATURES] {
        self.max
    }

    fn range(&self, feature: usize) -> f64 {
        let range = self.max[feature] - self.min[feature];
        if range == 0.0 {
            1.0
        } else {
            range
        }
    }

    pub fn transform(&self, point: &HistoryPoint) -> [f64; FEATURES] {
        let mut scaled = point.to_array();
        for (feature, value) in scaled.iter_mut().enumerate() {
            *value = (*value - self.min[feature]) / self.range(feature);
        }
        scaled
    }

    pub fn transform_all(&self, points: &[HistoryPoint]) -> Vec<[f64; FEATURES]> {
        points.iter().map(|p| self.transform(p)).collect()
    }
}

impl Default for MinMaxScaler {
    fn default() -> Self {
        Self::default_bounds()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_bounds() {
        let scaler = MinMaxScaler::default();
        let scaled = scaler.transform(&HistoryPoint::new(500.0, 75.0, 6.0));
        assert_eq!(scaled, [0.5, 0.5, 0.5]);
    }

    #[test]
    fn test_fit_replaces_bounds() {
        let batch = vec![
            HistoryPoint::new(200.0, 40.0, 6.0),
            HistoryPoint::new(600.0, 80.0, 9.0),
            HistoryPoint::new(400.0, 60.0, 7.5),
        ];
        let scaler = MinMaxScaler::fit(&batch).unwrap();
        assert_eq!(scaler.min(), [200.0, 40.0, 6.0]);
        assert_eq!(scaler.max(), [600.0, 80.0, 9.0]);
        assert_eq!(scaler.transform(&batch[2]), [0.5, 0.5, 0.5]);

        // Values outside the fitted range extrapolate
        let scaled = scaler.transform(&HistoryPoint::new(1000.0, 40.0, 6.0));
        assert_eq!(scaled[0], 2.0);
    }

    #[test]
    fn test_constant_feature_maps_to_zero() {
        let batch = vec![HistoryPoint::new(300.0, 55.0, 8.0); 4];
        let scaler = MinMaxScaler::fit(&batch).unwrap();
        assert_eq!(scaler.transform(&batch[0]), [0.0, 0.0, 0.0]);
    }

    #[test]
    fn test_fit_empty_batch() {
        assert!(MinMaxScaler::fit(&[]).is_none());
    }
}
