//! Live feature vector
//!
//! One window's statistics stamped with the schema it was computed under,
//! so a vector kept across a restart can be checked before it is scored.

use std::collections::BTreeMap;

use ndarray::{Array2, Axis};
use serde::{Deserialize, Serialize};

use super::layout::{
    layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT,
    FEATURE_LAYOUT, FEATURE_VERSION,
};
use super::stats::WindowStats;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FeatureVector {
    pub version: u8,
    pub layout_hash: u32,
    /// Ordered as `FEATURE_LAYOUT`
    pub values: [f64; FEATURE_COUNT],
}

impl FeatureVector {
    pub fn from_values(values: [f64; FEATURE_COUNT]) -> Self {
        Self {
            version: FEATURE_VERSION,
            layout_hash: layout_hash(),
            values,
        }
    }

    pub fn from_stats(stats: &WindowStats) -> Self {
        stats.to_array().into()
    }

    pub fn validate(&self) -> Result<(), LayoutMismatchError> {
        validate_layout(self.version, self.layout_hash)
    }

    /// `(1, FEATURE_COUNT)` matrix for the detectors
    pub fn to_row(&self) -> Array2<f64> {
        ndarray::arr1(&self.values).insert_axis(Axis(0))
    }

    /// Statistic name → value, for debug logging
    pub fn named(&self) -> BTreeMap<&'static str, f64> {
        FEATURE_LAYOUT
            .iter()
            .copied()
            .zip(self.values.iter().copied())
            .collect()
    }
}

impl From<[f64; FEATURE_COUNT]> for FeatureVector {
    fn from(values: [f64; FEATURE_COUNT]) -> Self {
        Self::from_values(values)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp() -> FeatureVector {
        FeatureVector::from_values([1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0])
    }

    #[test]
    fn test_lookup_by_name() {
        let v = ramp();
        let named = v.named();
        assert_eq!(named["median"], 5.0);
        assert_eq!(named["kurtosis"], 7.0);
        assert!(!named.contains_key("unknown"));
        assert!(v.validate().is_ok());
    }

    #[test]
    fn test_stale_version_is_incompatible() {
        let mut v = ramp();
        v.version = FEATURE_VERSION + 1;
        assert!(v.validate().is_err());
    }

    #[test]
    fn test_row_matrix() {
        let row = ramp().to_row();
        assert_eq!(row.dim(), (1, FEATURE_COUNT));
        assert_eq!(row[[0, 6]], 7.0);
    }
}
