/// Stress testing suite
///
/// Exercises the shared forecaster under concurrent load:
/// - Forecasts racing against retrains
/// - Simultaneous retrain requests
/// - Parallel squad batches sharing one engine
///
/// Run with: cargo test --test stress_tests --release

use prehab::config::ForecastConfig;
use prehab::forecast::{SequenceForecaster, TrainingStatus, FORECAST_HORIZON};
use prehab::{AnalysisEngine, AnalysisRequest, AthleteContext, EngineConfig, HistoryPoint, UserRole};
use std::sync::{Arc, Barrier};
use std::thread;

fn create_history(days: usize, phase: f64) -> Vec<HistoryPoint> {
    (0..days)
        .map(|d| {
            let t = d as f64 + phase;
            HistoryPoint::new(
                500.0 + 200.0 * (t / 3.0).sin(),
                60.0 + 8.0 * (t / 4.0).cos(),
                7.0 + (t / 5.0).sin(),
            )
        })
        .collect()
}

fn small_config() -> ForecastConfig {
    ForecastConfig {
        hidden_size: 8,
        epochs: 20,
        ..ForecastConfig::default()
    }
}

#[test]
fn test_forecasts_during_retraining_see_whole_snapshots() {
    const READERS: usize = 4;
    const RETRAINS: usize = 6;

    let forecaster = Arc::new(SequenceForecaster::with_config(small_config()));
    let recent = create_history(10, 0.0);

    let trainer = {
        let forecaster = Arc::clone(&forecaster);
        thread::spawn(move || {
            for round in 0..RETRAINS {
                forecaster
                    .train(&create_history(20, round as f64 * 1.7))
                    .unwrap();
            }
        })
    };

    let readers: Vec<_> = (0..READERS)
        .map(|_| {
            let forecaster = Arc::clone(&forecaster);
            let recent = recent.clone();
            thread::spawn(move || {
                let mut last_version = 0;
                for _ in 0..50 {
                    let snapshot = forecaster.snapshot().unwrap();
                    assert!(snapshot.version() >= last_version, "versions went backwards");
                    last_version = snapshot.version();

                    // One snapshot always gives one answer, however training proceeds
                    let first = snapshot.forecast(&recent).unwrap();
                    let second = snapshot.forecast(&recent).unwrap();
                    assert_eq!(first, second);
                    assert_eq!(first.len(), FORECAST_HORIZON);
                    assert!(first.iter().all(|v| (0.0..=100.0).contains(v)));
                }
            })
        })
        .collect();

    trainer.join().unwrap();
    for reader in readers {
        reader.join().unwrap();
    }

    assert_eq!(forecaster.snapshot().unwrap().version(), RETRAINS as u64);
}

#[test]
fn test_simultaneous_retrains_never_lose_updates() {
    const TRAINERS: usize = 4;

    let forecaster = Arc::new(SequenceForecaster::with_config(ForecastConfig {
        epochs: 300,
        ..small_config()
    }));
    let barrier = Arc::new(Barrier::new(TRAINERS));

    let handles: Vec<_> = (0..TRAINERS)
        .map(|i| {
            let forecaster = Arc::clone(&forecaster);
            let barrier = Arc::clone(&barrier);
            thread::spawn(move || {
                let history = create_history(40, i as f64);
                barrier.wait();
                forecaster.train(&history).unwrap()
            })
        })
        .collect();

    let statuses: Vec<TrainingStatus> = handles.into_iter().map(|h| h.join().unwrap()).collect();

    let trained = statuses.iter().filter(|s| s.is_trained()).count();
    assert!(trained >= 1);
    assert!(statuses
        .iter()
        .all(|s| matches!(s, TrainingStatus::Trained { .. } | TrainingStatus::Busy)));
    // Every published model is counted exactly once
    assert_eq!(forecaster.snapshot().unwrap().version(), trained as u64);
}

#[test]
fn test_parallel_squad_shares_one_forecaster() {
    const SQUAD_SIZE: usize = 12;

    let mut config = EngineConfig::default();
    config.forecast = small_config();
    let engine = AnalysisEngine::with_config(config);

    let requests: Vec<AnalysisRequest> = (0..SQUAD_SIZE)
        .map(|i| AnalysisRequest {
            athlete: AthleteContext {
                user_id: format!("squad-{:02}", i),
                role: UserRole::Player,
            },
            history: Some(create_history(15 + i, i as f64)),
            ..AnalysisRequest::default()
        })
        .collect();

    let results = engine.analyze_squad(&requests);

    assert_eq!(results.len(), SQUAD_SIZE);
    for (i, result) in results.iter().enumerate() {
        assert_eq!(result.user_id, format!("squad-{:02}", i));
        assert_eq!(result.forecast.len(), FORECAST_HORIZON);
        assert_eq!(result.raw_metrics.load_vol.len(), 15 + i);
    }

    let version = engine.forecaster().snapshot().unwrap().version();
    assert!((1..=SQUAD_SIZE as u64).contains(&version));
}

#[test]
fn test_long_history_analysis() {
    const DAYS: usize = 365;

    let mut config = EngineConfig::default();
    config.forecast = small_config();
    let engine = AnalysisEngine::with_config(config);

    let request = AnalysisRequest {
        history: Some(create_history(DAYS, 0.0)),
        ..AnalysisRequest::default()
    };

    let start = std::time::Instant::now();
    let result = engine.analyze(&request);
    println!("Analyzed {} days in {:.2}s", DAYS, start.elapsed().as_secs_f64());

    assert_eq!(result.raw_metrics.recovery_tank.len(), DAYS);
    assert_eq!(result.forecast.len(), FORECAST_HORIZON);
}
