//! Detector and predictor tests
//!
//! Training/detection contracts, persistence round trips and the spike
//! scenario over real window features.

#[cfg(test)]
mod detector_tests {
    use ndarray::{s, Array2};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::tempdir;

    use crate::logic::dataset::generator::inject_spike;
    use crate::logic::error::PipelineError;
    use crate::logic::features::{extract_features, FEATURE_COUNT};
    use crate::logic::model::{AnomalyDetector, DetectionMethod};

    fn temperature_series(n: usize, seed: u64) -> Vec<f64> {
        let mut rng = StdRng::seed_from_u64(seed);
        (0..n).map(|_| 27.5 + rng.gen_range(-5.0..5.0)).collect()
    }

    fn training_features() -> Array2<f64> {
        extract_features(&temperature_series(300, 1), 24).unwrap()
    }

    #[test]
    fn test_detect_before_train_is_state_error() {
        let detector = AnomalyDetector::default();
        let err = detector.detect(training_features().view()).unwrap_err();
        assert!(err.is_state_error());

        let err = detector
            .detect_with(training_features().view(), DetectionMethod::Sequence)
            .unwrap_err();
        assert!(err.is_state_error());
        assert!(detector.persist(std::path::Path::new("unused")).unwrap_err().is_state_error());
    }

    #[test]
    fn test_train_rejects_bad_matrix() {
        let mut detector = AnomalyDetector::default();
        assert!(matches!(
            detector.train(Array2::<f64>::zeros((0, FEATURE_COUNT)).view()),
            Err(PipelineError::EmptyMatrix)
        ));
        assert!(detector
            .train(Array2::<f64>::zeros((10, 5)).view())
            .unwrap_err()
            .is_shape_error());
        assert!(!detector.is_trained());
    }

    #[test]
    fn test_detect_width_mismatch() {
        let mut detector = AnomalyDetector::default();
        detector.train(training_features().view()).unwrap();
        let err = detector.detect(Array2::<f64>::zeros((3, 6)).view()).unwrap_err();
        assert!(err.is_shape_error());
    }

    #[test]
    fn test_train_detect_is_deterministic() {
        let features = training_features();

        let mut a = AnomalyDetector::default();
        a.train(features.view()).unwrap();
        let first = a.detect(features.view()).unwrap();

        a.train(features.view()).unwrap();
        let second = a.detect(features.view()).unwrap();

        let mut b = AnomalyDetector::default();
        b.train(features.view()).unwrap();

        assert_eq!(first, second);
        assert_eq!(first, b.detect(features.view()).unwrap());
        assert!(first.iter().any(|f| *f));
    }

    #[test]
    fn test_persist_restore_round_trip() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("temperature_anomaly");
        let features = training_features();
        let labels: Vec<bool> = (0..features.nrows()).map(|i| i % 17 == 0).collect();

        let mut detector = AnomalyDetector::default();
        detector.train(features.view()).unwrap();
        detector.train_sequence(features.view(), &labels, 2).unwrap();
        detector.persist(&prefix).unwrap();

        assert!(dir.path().join("temperature_anomaly_isolation_forest.json").exists());
        assert!(dir.path().join("temperature_anomaly_sequence_model.json").exists());

        let mut restored = AnomalyDetector::default();
        assert!(restored.restore(&prefix));
        assert!(restored.has_sequence_model());

        let query = extract_features(&temperature_series(120, 9), 24).unwrap();
        assert_eq!(detector.scores(query.view()).unwrap(), restored.scores(query.view()).unwrap());
        assert_eq!(detector.detect(query.view()).unwrap(), restored.detect(query.view()).unwrap());
        assert_eq!(
            detector.detect_with(query.view(), DetectionMethod::Sequence).unwrap(),
            restored.detect_with(query.view(), DetectionMethod::Sequence).unwrap()
        );
    }

    #[test]
    fn test_restore_without_sequence_artifact() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("humidity_anomaly");

        let mut detector = AnomalyDetector::default();
        detector.train(training_features().view()).unwrap();
        detector.persist(&prefix).unwrap();

        let mut restored = AnomalyDetector::default();
        assert!(restored.restore(&prefix));
        assert!(!restored.has_sequence_model());
    }

    #[test]
    fn test_restore_failure_leaves_state_untouched() {
        let dir = tempdir().unwrap();
        let features = training_features();

        let mut detector = AnomalyDetector::default();
        detector.train(features.view()).unwrap();
        let before = detector.detect(features.view()).unwrap();

        // Missing artifact
        assert!(!detector.restore(&dir.path().join("missing")));

        // Corrupt artifact
        let prefix = dir.path().join("corrupt");
        std::fs::write(dir.path().join("corrupt_isolation_forest.json"), b"{ not json").unwrap();
        assert!(!detector.restore(&prefix));

        assert!(detector.is_trained());
        assert_eq!(detector.detect(features.view()).unwrap(), before);
    }

    #[test]
    fn test_restore_rejects_other_layout() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("power_anomaly");

        let mut detector = AnomalyDetector::default();
        detector.train(training_features().view()).unwrap();
        detector.persist(&prefix).unwrap();

        let path = dir.path().join("power_anomaly_isolation_forest.json");
        let mut doc: serde_json::Value =
            serde_json::from_slice(&std::fs::read(&path).unwrap()).unwrap();
        doc["feature_version"] = serde_json::json!(99);
        std::fs::write(&path, serde_json::to_vec(&doc).unwrap()).unwrap();

        let mut fresh = AnomalyDetector::default();
        assert!(!fresh.restore(&prefix));
        assert!(!fresh.is_trained());
    }

    #[test]
    fn test_spike_flagged_and_prior_windows_clean() {
        let w = 24;
        let mut values = temperature_series(100, 42);
        assert!(values.iter().all(|v| (20.0..=35.0).contains(v)));

        inject_spike(&mut values, 80, 95.0).unwrap();

        let features = extract_features(&values, w).unwrap();
        assert_eq!(features.nrows(), 76);

        // Fit on every window that ends before the spike (rows 0..57).
        // Contamination 0.0 puts the threshold at the highest training
        // score, so none of those windows can be flagged.
        let mut detector = AnomalyDetector::with_contamination(0.0, 42);
        detector.train(features.slice(s![0..57, ..])).unwrap();

        let flags = detector.detect(features.view()).unwrap();

        // Row 57 is the window [57, 81), which ends at the spike
        assert!(flags[57], "spike window not flagged");
        for (i, flag) in flags.iter().enumerate().take(57) {
            assert!(!flag, "window {} entirely before the spike was flagged", i);
        }
    }

    #[test]
    fn test_sequence_mode_shares_contract() {
        let features = training_features();
        let labels: Vec<bool> = (0..features.nrows()).map(|i| features[[i, 2]] > 31.5).collect();

        let mut detector = AnomalyDetector::default();
        detector.train_sequence(features.view(), &labels, 5).unwrap();

        // Sequence mode does not need the outlier model
        let flags = detector.detect_with(features.view(), DetectionMethod::Sequence).unwrap();
        assert_eq!(flags.len(), features.nrows());
        assert!(detector.detect(features.view()).unwrap_err().is_state_error());
    }

    #[test]
    fn test_detection_method_parse() {
        assert_eq!("lstm".parse::<DetectionMethod>().unwrap(), DetectionMethod::Sequence);
        assert_eq!(
            "isolation_forest".parse::<DetectionMethod>().unwrap(),
            DetectionMethod::IsolationForest
        );
        assert!("svm".parse::<DetectionMethod>().is_err());
    }
}

#[cfg(test)]
mod maintenance_tests {
    use ndarray::Array2;
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use tempfile::tempdir;

    use crate::logic::features::MAINTENANCE_FEATURE_COUNT;
    use crate::logic::model::MaintenancePredictor;

    /// Column `informative` equals the label, everything else is noise
    fn correlated(n: usize, informative: usize) -> (Array2<f64>, Vec<bool>) {
        let mut rng = StdRng::seed_from_u64(3);
        let y: Vec<bool> = (0..n).map(|i| i % 2 == 0).collect();
        let x = Array2::from_shape_fn((n, MAINTENANCE_FEATURE_COUNT), |(r, c)| {
            if c == informative {
                if y[r] { 1.0 } else { 0.0 }
            } else {
                rng.gen_range(0.0..100.0)
            }
        });
        (x, y)
    }

    #[test]
    fn test_perfectly_correlated_column_gives_full_training_accuracy() {
        let (x, y) = correlated(200, 17);
        let mut predictor = MaintenancePredictor::default();
        predictor.train(x.view(), &y).unwrap();

        let (labels, proba) = predictor.predict(x.view()).unwrap();
        assert_eq!(labels, y);
        assert!(proba.iter().all(|p| (0.0..=1.0).contains(p)));

        let importance = predictor.feature_importance().unwrap();
        assert_eq!(importance.len(), MAINTENANCE_FEATURE_COUNT);
        let top = importance
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i);
        assert_eq!(top, Some(17));
    }

    #[test]
    fn test_state_errors_before_training() {
        let predictor = MaintenancePredictor::default();
        let x = Array2::<f64>::zeros((2, MAINTENANCE_FEATURE_COUNT));
        assert!(predictor.predict(x.view()).unwrap_err().is_state_error());
        assert!(predictor.feature_importance().unwrap_err().is_state_error());
    }

    #[test]
    fn test_shape_errors() {
        let mut predictor = MaintenancePredictor::default();
        let x = Array2::<f64>::zeros((4, MAINTENANCE_FEATURE_COUNT));
        assert!(predictor.train(x.view(), &[true, false]).unwrap_err().is_shape_error());
        assert!(predictor
            .train(Array2::<f64>::zeros((0, MAINTENANCE_FEATURE_COUNT)).view(), &[])
            .unwrap_err()
            .is_shape_error());

        let (x, y) = correlated(40, 0);
        predictor.train(x.view(), &y).unwrap();
        assert!(predictor
            .predict(Array2::<f64>::zeros((1, 7)).view())
            .unwrap_err()
            .is_shape_error());
    }

    #[test]
    fn test_retraining_overwrites() {
        let (x, y) = correlated(60, 5);
        let inverted: Vec<bool> = y.iter().map(|v| !v).collect();

        let mut predictor = MaintenancePredictor::default();
        predictor.train(x.view(), &y).unwrap();
        predictor.train(x.view(), &inverted).unwrap();

        let (labels, _) = predictor.predict(x.view()).unwrap();
        assert_eq!(labels, inverted);
    }

    #[test]
    fn test_persist_restore_pair() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("maintenance");
        let (x, y) = correlated(80, 30);

        let mut predictor = MaintenancePredictor::default();
        predictor.train(x.view(), &y).unwrap();
        predictor.persist(&prefix).unwrap();

        let mut restored = MaintenancePredictor::default();
        assert!(restored.restore(&prefix));
        assert_eq!(predictor.predict(x.view()).unwrap(), restored.predict(x.view()).unwrap());
    }

    #[test]
    fn test_restore_rejects_half_pair() {
        let dir = tempdir().unwrap();
        let prefix = dir.path().join("maintenance");
        let (x, y) = correlated(40, 1);

        let mut predictor = MaintenancePredictor::default();
        predictor.train(x.view(), &y).unwrap();
        predictor.persist(&prefix).unwrap();
        std::fs::remove_file(dir.path().join("maintenance_scaler.json")).unwrap();

        let mut restored = MaintenancePredictor::default();
        assert!(!restored.restore(&prefix));
        assert!(!restored.is_trained());
    }
}
