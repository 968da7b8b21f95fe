//! 15-day injury-risk forecasting from daily load, HRV and sleep
//!
//! The forecaster retrains a small GRU on each qualifying request's history
//! and rolls it forward autoregressively. Trained parameters are shared by
//! every request in the process.
//!
//! # Concurrency
//!
//! Model state is published as immutable [`ForecastModel`] snapshots behind an
//! `RwLock<Arc<_>>`:
//!
//! - a forecast clones the current `Arc` and never observes a half-trained model
//! - training clones the snapshot, fits the copy without holding the read/write
//!   lock, then swaps it in
//! - only one training runs at a time; a concurrent retrain returns
//!   [`TrainingStatus::Busy`] immediately instead of queueing behind it
//!
//! # Scaler drift
//!
//! Every retrain refits the min-max scaler to the current batch, replacing the
//! previous bounds. Forecasts made after training on batches with different
//! ranges are therefore on different scales.

pub mod gru;
pub mod scaler;

use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex, RwLock, TryLockError};
use tracing::{debug, info, warn};

use crate::config::ForecastConfig;
use crate::error::ForecastError;
use crate::models::HistoryPoint;

pub use gru::GruRegressor;
pub use scaler::{MinMaxScaler, FEATURES};

/// Days of history fed to the model per prediction
pub const WINDOW_LEN: usize = 7;

/// Days forecast ahead
pub const FORECAST_HORIZON: usize = 15;

/// Risk reported for every day when history is too short to forecast
pub const FLATLINE_RISK: f64 = 50.0;

/// The flatline forecast returned without enough history
pub fn flatline_forecast() -> Vec<f64> {
    vec![FLATLINE_RISK; FORECAST_HORIZON]
}

/// Outcome of a retrain request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum TrainingStatus {
    /// A new snapshot was published
    Trained {
        version: u64,
        windows: usize,
        final_loss: f64,
    },
    /// History was too short; the model is unchanged
    InsufficientData { points: usize, required: usize },
    /// Another retrain was in flight; the model is unchanged
    Busy,
}

impl TrainingStatus {
    pub fn is_trained(&self) -> bool {
        matches!(self, TrainingStatus::Trained { .. })
    }
}

/// Immutable model version: scaler bounds plus recurrent weights
#[derive(Debug, Clone)]
pub struct ForecastModel {
    version: u64,
    scaler: MinMaxScaler,
    network: GruRegressor,
}

impl ForecastModel {
    fn initial(config: &ForecastConfig) -> Self {
        ForecastModel {
            version: 0,
            scaler: MinMaxScaler::default_bounds(),
            network: GruRegressor::new(config.hidden_size, config.seed),
        }
    }

    /// 0 for the untrained initial model, incremented per retrain
    pub fn version(&self) -> u64 {
        self.version
    }

    pub fn scaler(&self) -> &MinMaxScaler {
        &self.scaler
    }

    /// Forecast daily risk percentages for the next 15 days
    ///
    /// Fewer than 7 points yields the flatline forecast. Otherwise the last
    /// 7 days seed an autoregressive rollout in which HRV and sleep are held
    /// at the seed window's raw mean.
    pub fn forecast(&self, recent: &[HistoryPoint]) -> Result<Vec<f64>, ForecastError> {
        if recent.len() < WINDOW_LEN {
            debug!(points = recent.len(), "Too little history, returning flatline forecast");
            return Ok(flatline_forecast());
        }

        let seed = &recent[recent.len() - WINDOW_LEN..];
        check_finite(seed, recent.len() - WINDOW_LEN)?;

        let mut window = self.scaler.transform_all(seed);
        // Appended steps carry the raw (unscaled) seed means next to a scaled load
        let mean_hrv = seed.iter().map(|p| p.hrv).sum::<f64>() / WINDOW_LEN as f64;
        let mean_sleep = seed.iter().map(|p| p.sleep_hours).sum::<f64>() / WINDOW_LEN as f64;

        let mut risks = Vec::with_capacity(FORECAST_HORIZON);
        for step in 0..FORECAST_HORIZON {
            let predicted_load = self.network.predict(&window);
            if !predicted_load.is_finite() {
                return Err(ForecastError::Diverged {
                    context: format!("forecast step {}", step + 1),
                });
            }
            risks.push((predicted_load * 100.0).clamp(0.0, 100.0));

            window.remove(0);
            window.push([predicted_load, mean_hrv, mean_sleep]);
        }

        Ok(risks)
    }

    /// Refit scaler and weights on `history`; returns (windows, final loss)
    fn fit(
        &mut self,
        history: &[HistoryPoint],
        config: &ForecastConfig,
    ) -> Result<(usize, f64), ForecastError> {
        if let Some(scaler) = MinMaxScaler::fit(history) {
            self.scaler = scaler;
        }

        let scaled = self.scaler.transform_all(history);
        let (inputs, targets) = build_windows(&scaled);

        let mut loss = f64::NAN;
        for epoch in 0..config.epochs {
            loss = self
                .network
                .train_epoch(&inputs, &targets, config.learning_rate);
            if !loss.is_finite() {
                return Err(ForecastError::Diverged {
                    context: format!("training epoch {}", epoch + 1),
                });
            }
        }

        let final_loss = self.network.mse(&inputs, &targets);
        if !final_loss.is_finite() {
            return Err(ForecastError::Diverged {
                context: "final evaluation".to_string(),
            });
        }

        debug!(first_pass_loss = loss, final_loss, "Forecaster fit complete");
        Ok((inputs.len(), final_loss))
    }
}

/// Sliding windows of length 7, each labelled with the next day's scaled load
fn build_windows(scaled: &[[f64; FEATURES]]) -> (Vec<Vec<[f64; FEATURES]>>, Vec<f64>) {
    if scaled.len() <= WINDOW_LEN {
        return (Vec::new(), Vec::new());
    }

    (0..scaled.len() - WINDOW_LEN)
        .map(|start| {
            (
                scaled[start..start + WINDOW_LEN].to_vec(),
                scaled[start + WINDOW_LEN][0],
            )
        })
        .unzip()
}

fn check_finite(points: &[HistoryPoint], offset: usize) -> Result<(), ForecastError> {
    for (i, point) in points.iter().enumerate() {
        for (channel, value) in ["load", "hrv", "sleep_hours"]
            .into_iter()
            .zip(point.to_array())
        {
            if !value.is_finite() {
                return Err(ForecastError::NonFiniteInput {
                    channel: channel.to_string(),
                    day_index: offset + i,
                });
            }
        }
    }
    Ok(())
}

/// Shared, retrainable sequence forecaster
#[derive(Debug)]
pub struct SequenceForecaster {
    config: ForecastConfig,
    current: RwLock<Arc<ForecastModel>>,
    training: Mutex<()>,
}

impl SequenceForecaster {
    pub fn new() -> Self {
        Self::with_config(ForecastConfig::default())
    }

    pub fn with_config(config: ForecastConfig) -> Self {
        let initial = ForecastModel::initial(&config);
        SequenceForecaster {
            config,
            current: RwLock::new(Arc::new(initial)),
            training: Mutex::new(()),
        }
    }

    /// Days of history needed before a retrain does anything
    pub fn required_training_points(&self) -> usize {
        self.config.min_training_points.max(WINDOW_LEN + 1)
    }

    /// The currently published model
    pub fn snapshot(&self) -> Result<Arc<ForecastModel>, ForecastError> {
        self.current
            .read()
            .map(|guard| Arc::clone(&guard))
            .map_err(|e| ForecastError::StatePoisoned {
                reason: e.to_string(),
            })
    }

    /// Retrain on `history` and publish the result
    pub fn train(&self, history: &[HistoryPoint]) -> Result<TrainingStatus, ForecastError> {
        self.train_snapshot(history).map(|(status, _)| status)
    }

    /// Retrain and return the status together with the snapshot the caller
    /// should forecast with (the new one, or the current one if unchanged)
    pub fn train_snapshot(
        &self,
        history: &[HistoryPoint],
    ) -> Result<(TrainingStatus, Arc<ForecastModel>), ForecastError> {
        let required = self.required_training_points();
        if history.len() < required {
            debug!(points = history.len(), required, "Skipping retrain");
            return Ok((
                TrainingStatus::InsufficientData {
                    points: history.len(),
                    required,
                },
                self.snapshot()?,
            ));
        }
        check_finite(history, 0)?;

        let _training = match self.training.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::WouldBlock) => {
                warn!("Retrain already in progress, forecasting with current model");
                return Ok((TrainingStatus::Busy, self.snapshot()?));
            }
            // The mutex guards no data, so a poisoned lock is still usable
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
        };

        let base = self.snapshot()?;
        let mut candidate = ForecastModel::clone(&base);
        let (windows, final_loss) = candidate.fit(history, &self.config)?;
        candidate.version = base.version + 1;

        let published = Arc::new(candidate);
        {
            let mut current = self
                .current
                .write()
                .map_err(|e| ForecastError::StatePoisoned {
                    reason: e.to_string(),
                })?;
            *current = Arc::clone(&published);
        }

        info!(
            version = published.version,
            points = history.len(),
            windows,
            final_loss,
            "Forecaster retrained"
        );

        Ok((
            TrainingStatus::Trained {
                version: published.version,
                windows,
                final_loss,
            },
            published,
        ))
    }

    /// Forecast with the currently published model
    pub fn forecast(&self, recent: &[HistoryPoint]) -> Result<Vec<f64>, ForecastError> {
        self.snapshot()?.forecast(recent)
    }
}

impl Default for SequenceForecaster {
    fn default() -> Self {
        Self::new()
    }
}
