#[cfg(test)]
mod tests {
    use chrono::{Duration, TimeZone, Utc};
    use serde_json::json;
    use tempfile::tempdir;

    use crate::logic::anomaly_log::{AnomalyLog, LogState, Severity};

    #[test]
    fn test_initialize_creates_empty_document() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("anomaly_log.json");
        let log = AnomalyLog::new(&path);

        log.initialize();
        assert!(path.exists());
        assert_eq!(log.state(), LogState::Empty);

        let meta = log.metadata().unwrap();
        assert_eq!(meta.total_anomalies, 0);
    }

    #[test]
    fn test_append_transitions_to_active() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json"));
        log.initialize();

        let entry = log.append("TEMPERATURE", 65.0, "°C", json!({"temperature": 65.0}))
            .unwrap();
        assert_eq!(entry.severity, Severity::Critical);
        assert_eq!(log.state(), LogState::Active);
        assert_eq!(log.metadata().unwrap().total_anomalies, 1);

        log.clear();
        assert_eq!(log.state(), LogState::Empty);
        assert!(log.recent(10).is_empty());
    }

    #[test]
    fn test_rotation_keeps_newest_in_order() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json")).with_max_entries(5);

        for i in 0..8 {
            log.append("CURRENT", i as f64, "A", json!({}));
        }

        let entries = log.recent(100);
        assert_eq!(entries.len(), 5);
        let values: Vec<f64> = entries.iter().map(|e| e.value).collect();
        assert_eq!(values, vec![3.0, 4.0, 5.0, 6.0, 7.0]);
        assert_eq!(log.metadata().unwrap().total_anomalies, 5);
    }

    #[test]
    fn test_recent_returns_chronological_tail() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json"));
        for v in [1.0, 2.0, 3.0, 4.0] {
            log.append("HUMIDITY", v, "%", json!({}));
        }

        let values: Vec<f64> = log.recent(2).iter().map(|e| e.value).collect();
        assert_eq!(values, vec![3.0, 4.0]);
        assert_eq!(log.recent(0).len(), 0);
    }

    #[test]
    fn test_metadata_created_is_kept() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json"));
        let t0 = Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap();
        let t1 = t0 + Duration::hours(1);

        log.append_at(t0, "POWER", 1000.0, "W", json!({}));
        log.append_at(t1, "POWER", 1000.0, "W", json!({}));

        let meta = log.metadata().unwrap();
        assert_eq!(meta.created, t0);
        assert_eq!(meta.last_updated, t1);
    }

    #[test]
    fn test_stats_groups_and_recent_activity() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json"));
        let now = Utc.with_ymd_and_hms(2024, 6, 1, 12, 0, 0).unwrap();

        log.append_at(now - Duration::minutes(30), "TEMPERATURE", 50.0, "°C", json!({}));
        log.append_at(now - Duration::minutes(20), "TEMPERATURE", 30.0, "°C", json!({}));
        log.append_at(now - Duration::minutes(15), "VIBRATION", 9.0, "g", json!({}));

        let stats = log.stats_at(now);
        assert_eq!(stats.total_anomalies, 3);
        assert_eq!(stats.anomaly_types["TEMPERATURE"], 2);
        assert_eq!(stats.anomaly_types["VIBRATION"], 1);
        assert_eq!(stats.severity_counts["HIGH"], 1);
        assert_eq!(stats.severity_counts["MEDIUM"], 2);
        assert!(!stats.recent_activity);

        log.append_at(now - Duration::minutes(5), "CURRENT", 25.0, "A", json!({}));
        let stats = log.stats_at(now);
        assert!(stats.recent_activity);
        assert_eq!(stats.recent_count, 1);
        assert_eq!(stats.severity_counts["CRITICAL"], 1);
    }

    #[test]
    fn test_corrupt_file_treated_as_empty() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, b"{\"metadata\": [oops").unwrap();

        let log = AnomalyLog::new(&path);
        assert!(log.recent(10).is_empty());
        assert_eq!(log.stats().total_anomalies, 0);
        assert!(!log.stats().recent_activity);

        // Append recovers with a fresh document
        log.append("HUMIDITY", 99.0, "%", json!({}));
        assert_eq!(log.recent(10).len(), 1);
    }

    #[test]
    fn test_non_finite_value_keeps_history() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json"));
        for v in [40.0, 45.0, 50.0] {
            log.append("HUMIDITY", v, "%", json!({}));
        }

        assert!(log.append("POWER", f64::INFINITY, "W", json!({})).is_none());
        assert!(log.append("POWER", f64::NAN, "W", json!({})).is_none());
        assert_eq!(log.recent(10).len(), 3);

        log.append("POWER", 1500.0, "W", json!({}));
        let types: Vec<String> = log.recent(10).into_iter().map(|e| e.anomaly_type).collect();
        assert_eq!(types, vec!["HUMIDITY", "HUMIDITY", "HUMIDITY", "POWER"]);
    }

    #[test]
    fn test_initialize_resets_unreadable_file() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("log.json");
        std::fs::write(&path, b"not json").unwrap();

        let log = AnomalyLog::new(&path);
        log.initialize();
        assert_eq!(log.metadata().unwrap().total_anomalies, 0);
    }

    #[test]
    fn test_missing_file_gives_defaults() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("absent.json"));
        assert_eq!(log.state(), LogState::Empty);
        assert!(log.metadata().is_none());
        assert_eq!(log.stats(), Default::default());
    }

    #[test]
    fn test_no_temp_file_left_behind() {
        let dir = tempdir().unwrap();
        let log = AnomalyLog::new(dir.path().join("log.json"));
        log.append("POWER", 50.0, "W", json!({}));

        let names: Vec<String> = std::fs::read_dir(dir.path())
            .unwrap()
            .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["log.json".to_string()]);
    }
}
