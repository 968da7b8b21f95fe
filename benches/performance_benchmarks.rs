use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use prehab::config::ForecastConfig;
use prehab::forecast::SequenceForecaster;
use prehab::{
    AnalysisEngine, AnalysisRequest, AnomalyDetector, BiomechanicsGraph, HistoryPoint,
    PolicyAdvisor,
};

/// Performance benchmarks for the analysis engine
///
/// These benchmarks cover each sub-model with varying history lengths
/// to make sure per-request latency stays bounded.

fn create_history(days: usize) -> Vec<HistoryPoint> {
    (0..days)
        .map(|d| {
            let t = d as f64;
            HistoryPoint::new(
                480.0 + 160.0 * (t / 3.0).sin(),
                61.0 + 7.0 * (t / 4.0).cos(),
                7.1 + 0.6 * (t / 6.0).sin(),
            )
        })
        .collect()
}

fn bench_anomaly_detection(c: &mut Criterion) {
    let detector = AnomalyDetector::new();
    let mut group = c.benchmark_group("Anomaly Detection");

    for &days in &[7, 30, 90, 365] {
        let history = create_history(days);

        group.throughput(Throughput::Elements(days as u64));
        group.bench_with_input(BenchmarkId::new("detect", days), &history, |b, history| {
            b.iter(|| detector.detect(black_box(history)));
        });
    }

    group.finish();
}

fn bench_forecaster(c: &mut Criterion) {
    let mut group = c.benchmark_group("Sequence Forecaster");
    group.sample_size(10);

    for &days in &[15, 30, 60] {
        let history = create_history(days);

        group.bench_with_input(BenchmarkId::new("train", days), &history, |b, history| {
            b.iter(|| {
                let forecaster = SequenceForecaster::with_config(ForecastConfig::default());
                forecaster.train(black_box(history))
            });
        });
    }

    let forecaster = SequenceForecaster::new();
    let recent = create_history(7);
    group.bench_function("forecast_15_days", |b| {
        b.iter(|| forecaster.forecast(black_box(&recent)));
    });

    group.finish();
}

fn bench_graph_and_policy(c: &mut Criterion) {
    let graph = BiomechanicsGraph::new();
    let keypoints = BiomechanicsGraph::placeholder_keypoints();
    c.bench_function("graph_propagate", |b| {
        b.iter(|| graph.propagate(black_box(&keypoints)));
    });

    let advisor = PolicyAdvisor::new();
    c.bench_function("policy_recommend", |b| {
        b.iter(|| advisor.recommend(black_box(58.0), black_box(6.8), black_box(6)));
    });
}

fn bench_full_analysis(c: &mut Criterion) {
    let engine = AnalysisEngine::new();
    let mut group = c.benchmark_group("Full Analysis");
    group.sample_size(10);

    let synthetic = AnalysisRequest::default();
    group.bench_function("synthetic_history", |b| {
        b.iter(|| engine.analyze(black_box(&synthetic)));
    });

    let squad: Vec<AnalysisRequest> = (0..16)
        .map(|i| AnalysisRequest {
            history: Some(create_history(8 + i)),
            ..AnalysisRequest::default()
        })
        .collect();
    group.throughput(Throughput::Elements(squad.len() as u64));
    group.bench_function("squad_of_16", |b| {
        b.iter(|| engine.analyze_squad(black_box(&squad)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_anomaly_detection,
    bench_forecaster,
    bench_graph_and_policy,
    bench_full_analysis
);
criterion_main!(benches);
