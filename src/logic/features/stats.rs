//! Window Statistics
//!
//! Seven summary statistics of one window. Every statistic is computed over
//! the sorted window, so the result does not depend on sample order.

use super::layout::FEATURE_COUNT;

/// Central second moments below this are treated as a constant window
const ZERO_VARIANCE_EPS: f64 = 1e-14;

/// Statistics of one window
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct WindowStats {
    pub mean: f64,
    pub std: f64,
    pub max: f64,
    pub min: f64,
    pub median: f64,
    pub skewness: f64,
    pub kurtosis: f64,
}

impl WindowStats {
    /// Compute statistics of `window`. Returns None for an empty window.
    pub fn compute(window: &[f64]) -> Option<Self> {
        if window.is_empty() {
            return None;
        }

        let mut sorted = window.to_vec();
        sorted.sort_by(|a, b| a.total_cmp(b));
        Some(Self::from_sorted(&sorted))
    }

    /// Same as `compute` for an already sorted, non-empty slice
    pub fn from_sorted(sorted: &[f64]) -> Self {
        let n = sorted.len();
        let nf = n as f64;

        let min = sorted[0];
        let max = sorted[n - 1];
        let median = if n % 2 == 1 {
            sorted[n / 2]
        } else {
            (sorted[n / 2 - 1] + sorted[n / 2]) / 2.0
        };

        let mean = sorted.iter().sum::<f64>() / nf;

        // Biased central moments
        let (mut s2, mut s3, mut s4) = (0.0, 0.0, 0.0);
        for v in sorted {
            let d = v - mean;
            let d2 = d * d;
            s2 += d2;
            s3 += d2 * d;
            s4 += d2 * d2;
        }
        let m2 = s2 / nf;
        let m3 = s3 / nf;
        let m4 = s4 / nf;

        if m2 <= ZERO_VARIANCE_EPS || min == max {
            return Self {
                mean,
                std: 0.0,
                max,
                min,
                median,
                skewness: 0.0,
                kurtosis: 0.0,
            };
        }

        let std = if n > 1 { (s2 / (nf - 1.0)).sqrt() } else { 0.0 };

        // G1
        let skewness = if n > 2 {
            let g1 = m3 / m2.powf(1.5);
            g1 * (nf * (nf - 1.0)).sqrt() / (nf - 2.0)
        } else {
            0.0
        };

        // G2 (Fisher excess)
        let kurtosis = if n > 3 {
            let g2 = m4 / (m2 * m2) - 3.0;
            ((nf + 1.0) * g2 + 6.0) * (nf - 1.0) / ((nf - 2.0) * (nf - 3.0))
        } else {
            0.0
        };

        Self {
            mean,
            std,
            max,
            min,
            median,
            skewness,
            kurtosis,
        }
    }

    /// Values in layout order
    pub fn to_array(&self) -> [f64; FEATURE_COUNT] {
        [
            self.mean,
            self.std,
            self.max,
            self.min,
            self.median,
            self.skewness,
            self.kurtosis,
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn approx(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn test_empty_window() {
        assert!(WindowStats::compute(&[]).is_none());
    }

    #[test]
    fn test_constant_window() {
        let s = WindowStats::compute(&[0.1; 24]).unwrap();
        assert_eq!(s.std, 0.0);
        assert_eq!(s.skewness, 0.0);
        assert_eq!(s.kurtosis, 0.0);
        assert_eq!(s.max, 0.1);
        assert_eq!(s.median, 0.1);
    }

    #[test]
    fn test_basic_moments() {
        let s = WindowStats::compute(&[4.0, 1.0, 3.0, 2.0, 5.0]).unwrap();
        assert!(approx(s.mean, 3.0));
        assert!(approx(s.std, 2.5f64.sqrt()));
        assert_eq!(s.median, 3.0);
        assert_eq!(s.min, 1.0);
        assert_eq!(s.max, 5.0);
        assert!(approx(s.skewness, 0.0));
        // pandas: pd.Series([1,2,3,4,5]).kurt() == -1.2
        assert!(approx(s.kurtosis, -1.2));
    }

    #[test]
    fn test_skew_matches_pandas() {
        // pd.Series([1, 2, 3, 10]).skew() / .kurt()
        let s = WindowStats::compute(&[1.0, 2.0, 3.0, 10.0]).unwrap();
        assert!((s.skewness - 1.763_632_614_803_888).abs() < 1e-9);
        assert!((s.kurtosis - 3.228).abs() < 1e-9);
    }

    #[test]
    fn test_even_median() {
        let s = WindowStats::compute(&[1.0, 2.0, 3.0, 4.0]).unwrap();
        assert_eq!(s.median, 2.5);
    }

    #[test]
    fn test_order_independent() {
        let a = WindowStats::compute(&[0.3, 1.7, -2.2, 9.1, 0.05, 3.3]).unwrap();
        let b = WindowStats::compute(&[9.1, 0.05, 3.3, -2.2, 0.3, 1.7]).unwrap();
        assert_eq!(a, b);
    }
}
