use prehab::{
    AnalysisEngine, AnalysisRequest, AnomalyKind, EngineConfig, HistoryPoint, TrainingAction,
};
use serde_json::json;

/// Integration tests that drive the engine through its JSON boundary

#[cfg(test)]
mod integration_tests {
    use super::*;

    fn test_engine() -> AnalysisEngine {
        let mut config = EngineConfig::default();
        config.forecast.hidden_size = 8;
        config.forecast.epochs = 15;
        AnalysisEngine::with_config(config)
    }

    fn football_request() -> serde_json::Value {
        json!({
            "athlete": {"user_id": "fw-9", "role": "player"},
            "biometrics": {
                "sport": "Football", "age": 22, "weight": 74.0, "height": 179.0,
                "hrv": 42.0, "vo2_max": 58.0, "sleep_hours": 5.5, "stress_index": 6.0,
                "sleep_quality": 4.0, "resting_hr": 54.0, "blood_oxygen": 98.0,
                "hr_response": 1.2
            },
            "load_metrics": {
                "rpe": 8, "duration_minutes": 80, "chronic_tolerance": 2800,
                "acwr": 1.6, "sprint_distance": 900
            },
            "wellness": {"mood_score": 5, "motivation": 6, "life_stress": 6, "mental_fatigue": 8},
            "mechanics": {
                "knee_valgus_angle": 11.5,
                "ankle_eversion_angle": 9.0,
                "braking_force_asymmetry": 12.0,
                "single_leg_hop_ratio": 0.86
            },
            "history": null
        })
    }

    /// Full football request through the synthetic-history path
    #[test]
    fn test_football_request_workflow() {
        let engine = test_engine();
        let request: AnalysisRequest = serde_json::from_value(football_request()).unwrap();
        let result = engine.analyze(&request);

        assert_eq!(result.user_id, "fw-9");
        assert_eq!(result.report_type, "FOOTBALL_TWIN");
        // sleep 25 + landing 25 + acute spike 35 (640 / 400 = 1.6)
        assert_eq!(result.score, 85.0);
        assert_eq!(
            result.alerts,
            vec!["Sleep Deprivation.", "⚠️ Landing Fault.", "⚠️ Acute Spike > 1.5x."]
        );
        assert_eq!(result.raw_metrics.knee_valgus, Some(11.5));
        assert_eq!(result.raw_metrics.joint_load, Some(2.5));

        // Synthetic history: load 64 with a doubled day 12
        assert_eq!(result.raw_metrics.load_vol.len(), 15);
        assert_eq!(result.raw_metrics.load_vol[0].load, 64.0);
        assert_eq!(result.raw_metrics.load_vol[11].load, 128.0);
        assert_eq!(result.anomaly_report.anomalies.len(), 1);
        assert_eq!(result.anomaly_report.anomalies[0].kind, AnomalyKind::LoadSpike);

        // Depleted athlete: coach line first, then the spike advisory
        let strategy = result.raw_metrics.rl_strategy.as_ref().unwrap();
        assert_eq!(strategy.action, TrainingAction::ActiveRecovery);
        assert_eq!(result.recommendations.len(), 2);
        assert_eq!(result.recommendations[0], "🤖 AI Coach Strategy: Active Recovery");
        assert!(result.recommendations[1].starts_with("🚨 Day 12: Acute Load Spike"));

        assert_eq!(result.forecast.len(), 15);
        assert!(result.forecast.iter().all(|v| (0.0..=100.0).contains(v)));
    }

    /// Caller history is used as-is and drives every chart series
    #[test]
    fn test_caller_history_workflow() {
        let engine = test_engine();
        let history = vec![
            [500.0, 62.0, 7.5],
            [550.0, 60.0, 7.0],
            [600.0, 61.0, 7.2],
            [800.0, 58.0, 6.8],
            [400.0, 63.0, 8.0],
            [450.0, 62.0, 7.6],
            [500.0, 61.0, 7.4],
        ];
        let request: AnalysisRequest = serde_json::from_value(json!({
            "athlete": {"user_id": "mid-4"},
            "history": history
        }))
        .unwrap();

        let result = engine.analyze(&request);

        assert_eq!(result.report_type, "Standard");
        assert_eq!(result.raw_metrics.load_vol.len(), 7);
        assert_eq!(result.raw_metrics.recovery_scatter[3].size, 800.0);
        assert_eq!(result.raw_metrics.recovery_tank[0].fuel, 68.5);

        let spikes: Vec<usize> = result
            .anomaly_report
            .anomalies
            .iter()
            .filter(|a| a.kind == AnomalyKind::LoadSpike)
            .map(|a| a.day_index)
            .collect();
        assert_eq!(spikes, vec![3]);

        // Day 4 also crashes HRV. Advisories come out in detection order,
        // each is pushed to the front, and the coach line leads.
        assert_eq!(
            result.anomaly_report.advice,
            vec![
                "Day 4: Acute Load Spike detected. Reduce session intensity by 20% to normalize.",
                "Day 4: Significant HRV Drop. Prioritize sleep and active recovery immediately.",
            ]
        );
        assert_eq!(
            result.recommendations,
            vec![
                "🤖 AI Coach Strategy: Maintain Load",
                "🚨 Day 4: Significant HRV Drop. Prioritize sleep and active recovery immediately.",
                "🚨 Day 4: Acute Load Spike detected. Reduce session intensity by 20% to normalize.",
            ]
        );

        // Seven days never retrains
        assert_eq!(engine.forecaster().snapshot().unwrap().version(), 0);
    }

    /// Output JSON carries the documented shape
    #[test]
    fn test_result_wire_format() {
        let engine = test_engine();
        let request: AnalysisRequest = serde_json::from_value(json!({})).unwrap();
        let value = serde_json::to_value(engine.analyze(&request)).unwrap();

        for key in [
            "user_id",
            "report_type",
            "score",
            "alerts",
            "recommendations",
            "forecast",
            "raw_metrics",
            "anomaly_report",
        ] {
            assert!(value.get(key).is_some(), "missing {}", key);
        }
        assert_eq!(value["forecast"].as_array().unwrap().len(), 15);
        assert_eq!(value["raw_metrics"]["rl_strategy"]["action"], "Maintain Load");
        assert_eq!(value["raw_metrics"]["gnn_data"]["critical_joint"], "L_Knee");
        // Only football screens report joint metrics
        assert!(value["raw_metrics"].get("knee_valgus").is_none());
    }

    /// A long history retrains the shared forecaster once per request
    #[test]
    fn test_retraining_across_requests() {
        let engine = test_engine();
        let history: Vec<HistoryPoint> = (0..21)
            .map(|d| {
                let t = d as f64;
                HistoryPoint::new(420.0 + 90.0 * (t / 2.0).sin(), 60.0 + 4.0 * (t / 3.0).cos(), 7.2)
            })
            .collect();
        let request = AnalysisRequest {
            history: Some(history),
            ..AnalysisRequest::default()
        };

        engine.analyze(&request);
        engine.analyze(&request);
        assert_eq!(engine.forecaster().snapshot().unwrap().version(), 2);
    }

    /// Unknown roles and extra mechanics fields are tolerated
    #[test]
    fn test_tolerant_request_parsing() {
        let mut raw = football_request();
        raw["athlete"]["role"] = json!("analyst");
        raw["client_build"] = json!("2.4.1");

        let request: AnalysisRequest = serde_json::from_value(raw).unwrap();
        let result = test_engine().analyze(&request);
        assert_eq!(result.report_type, "FOOTBALL_TWIN");
    }
}
