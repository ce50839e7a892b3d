//! Window feature schema
//!
//! Every persisted detector and maintenance model records the schema
//! version and a CRC32 of the layout below. Reordering, adding or removing
//! a statistic (or a parameter) changes the hash, and restoring an artifact
//! trained under another schema fails with [`LayoutMismatchError`].

use crc32fast::Hasher;
use thiserror::Error;

use crate::logic::sensor::Parameter;

/// Bump whenever `FEATURE_LAYOUT` or `Parameter::ALL` changes
pub const FEATURE_VERSION: u8 = 1;

/// Statistics of one window, in vector order.
///
/// `std` is the sample deviation (ddof = 1); `skewness` and `kurtosis`
/// are the bias-corrected G1 and Fisher excess G2.
pub const FEATURE_LAYOUT: &[&str] = &["mean", "std", "max", "min", "median", "skewness", "kurtosis"];

pub const FEATURE_COUNT: usize = 7;

/// Maintenance input: one `FEATURE_COUNT` block per parameter, 7 × 7 = 49
pub const MAINTENANCE_FEATURE_COUNT: usize = FEATURE_COUNT * Parameter::ALL.len();

/// Schema fingerprint: version byte, NUL-terminated statistic names, then
/// parameter names each followed by 0x01.
pub fn compute_layout_hash() -> u32 {
    let mut hasher = Hasher::new();
    hasher.update(&[FEATURE_VERSION]);

    let stats = FEATURE_LAYOUT.iter().map(|s| (s.as_bytes(), 0u8));
    let params = Parameter::ALL.iter().map(|p| (p.as_str().as_bytes(), 1u8));
    for (bytes, terminator) in stats.chain(params) {
        hasher.update(bytes);
        hasher.update(&[terminator]);
    }

    hasher.finalize()
}

#[inline]
pub fn layout_hash() -> u32 {
    compute_layout_hash()
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error(
    "feature schema mismatch: built for v{expected_version} ({expected_hash:08x}), \
     artifact is v{actual_version} ({actual_hash:08x})"
)]
pub struct LayoutMismatchError {
    pub expected_version: u8,
    pub expected_hash: u32,
    pub actual_version: u8,
    pub actual_hash: u32,
}

/// Accept only artifacts stamped with the running schema
pub fn validate_layout(version: u8, hash: u32) -> Result<(), LayoutMismatchError> {
    let expected_hash = layout_hash();
    if version == FEATURE_VERSION && hash == expected_hash {
        return Ok(());
    }

    Err(LayoutMismatchError {
        expected_version: FEATURE_VERSION,
        expected_hash,
        actual_version: version,
        actual_hash: hash,
    })
}

/// Column label of the maintenance input, e.g. `humidity.max`
pub fn maintenance_feature_name(column: usize) -> Option<String> {
    let (block, offset) = (column / FEATURE_COUNT, column % FEATURE_COUNT);
    Parameter::ALL
        .get(block)
        .map(|param| format!("{}.{}", param, FEATURE_LAYOUT[offset]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_layout_widths() {
        assert_eq!(FEATURE_LAYOUT.len(), FEATURE_COUNT);
        assert_eq!(MAINTENANCE_FEATURE_COUNT, 49);
    }

    #[test]
    fn test_hash_is_stable() {
        assert_eq!(compute_layout_hash(), layout_hash());
        assert_ne!(layout_hash(), 0);
    }

    #[test]
    fn test_validate_layout_rejects_other_schema() {
        assert!(validate_layout(FEATURE_VERSION, layout_hash()).is_ok());

        let err = validate_layout(FEATURE_VERSION + 1, layout_hash()).unwrap_err();
        assert_eq!(err.actual_version, FEATURE_VERSION + 1);
        assert!(err.to_string().contains("mismatch"));

        assert!(validate_layout(FEATURE_VERSION, layout_hash() ^ 0xffff).is_err());
    }

    #[test]
    fn test_maintenance_feature_name() {
        assert_eq!(maintenance_feature_name(0).as_deref(), Some("temperature.mean"));
        assert_eq!(maintenance_feature_name(9).as_deref(), Some("current.max"));
        assert_eq!(maintenance_feature_name(41).as_deref(), Some("viscosity.kurtosis"));
        assert_eq!(maintenance_feature_name(48).as_deref(), Some("power.kurtosis"));
        assert_eq!(maintenance_feature_name(49), None);
    }
}
