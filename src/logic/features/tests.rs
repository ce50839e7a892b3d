//! Integration Tests for Feature Extraction
//!
//! Batch and live paths must agree, and the window geometry must line up
//! with label alignment.

#[cfg(test)]
mod integration_tests {
    use ndarray::Array2;

    use crate::logic::features::{
        align_labels, extract_features, live_features, stack_features, FEATURE_COUNT,
    };

    fn ramp(n: usize) -> Vec<f64> {
        (0..n).map(|i| (i as f64 * 0.37).sin() * 10.0 + i as f64 * 0.1).collect()
    }

    #[test]
    fn test_window_count_and_width() {
        let values = ramp(100);
        let features = extract_features(&values, 24).unwrap();
        assert_eq!(features.dim(), (76, FEATURE_COUNT));
    }

    #[test]
    fn test_row_summarizes_its_window() {
        let values = ramp(50);
        let features = extract_features(&values, 10).unwrap();

        for i in [0usize, 7, 39] {
            let window = &values[i..i + 10];
            let mean = window.iter().sum::<f64>() / 10.0;
            let max = window.iter().cloned().fold(f64::MIN, f64::max);
            let min = window.iter().cloned().fold(f64::MAX, f64::min);
            assert!((features[[i, 0]] - mean).abs() < 1e-9);
            assert_eq!(features[[i, 2]], max);
            assert_eq!(features[[i, 3]], min);
        }
    }

    #[test]
    fn test_too_short_series_fails() {
        let err = extract_features(&[1.0; 24], 24).unwrap_err();
        assert!(err.is_shape_error());
        assert!(extract_features(&[1.0; 10], 1).is_err());
    }

    #[test]
    fn test_labels_align_with_rows() {
        let values = ramp(40);
        let labels: Vec<bool> = (0..40).map(|i| i % 3 == 0).collect();
        let features = extract_features(&values, 8).unwrap();
        let aligned = align_labels(&labels, 8).unwrap();

        assert_eq!(aligned.len(), features.nrows());
        assert_eq!(aligned[0], labels[8]);
        assert!(align_labels(&labels[..8], 8).is_err());
    }

    #[test]
    fn test_live_matches_batch_for_full_window() {
        let values = ramp(60);
        let features = extract_features(&values, 24).unwrap();

        // row i covers [i, i + 24); the live window over values[..i + 24] is the same
        let i = 20;
        let live = live_features(&values[..i + 24], 24).unwrap();
        for j in 0..FEATURE_COUNT {
            assert_eq!(live.values[j], features[[i, j]]);
        }
    }

    #[test]
    fn test_live_pads_with_last_value() {
        let live = live_features(&[1.0, 2.0, 3.0], 5).unwrap();
        let explicit = live_features(&[1.0, 2.0, 3.0, 3.0, 3.0], 5).unwrap();
        assert_eq!(live, explicit);
        assert_eq!(live.named().get("max").copied(), Some(3.0));
        assert!(live_features(&[], 5).is_err());
    }

    #[test]
    fn test_live_uses_most_recent_points() {
        let mut buffer = vec![1000.0; 10];
        buffer.extend([1.0, 2.0, 3.0, 4.0]);
        let live = live_features(&buffer, 4).unwrap();
        assert_eq!(live.named().get("max").copied(), Some(4.0));
    }

    #[test]
    fn test_stack_features() {
        let a = Array2::<f64>::ones((5, FEATURE_COUNT));
        let b = Array2::<f64>::zeros((5, FEATURE_COUNT));
        let stacked = stack_features(&[a, b]).unwrap();
        assert_eq!(stacked.dim(), (5, 2 * FEATURE_COUNT));
        assert_eq!(stacked[[0, 0]], 1.0);
        assert_eq!(stacked[[0, FEATURE_COUNT]], 0.0);

        let c = Array2::<f64>::zeros((4, FEATURE_COUNT));
        let d = Array2::<f64>::zeros((5, FEATURE_COUNT));
        assert!(stack_features(&[c, d]).unwrap_err().is_shape_error());
        assert!(stack_features(&[]).is_err());
    }
}
