//! Features Module - Feature Extraction Engine
//!
//! Turns raw scalar series into fixed-width statistical feature vectors.
//! Extraction is kept apart from the detectors so the layout can evolve
//! behind a version + hash check.

pub mod layout;
pub mod stats;
pub mod vector;
pub mod window;

#[cfg(test)]
mod tests;

// Re-export common types
pub use layout::{
    layout_hash, validate_layout, LayoutMismatchError, FEATURE_COUNT, FEATURE_LAYOUT,
    FEATURE_VERSION, MAINTENANCE_FEATURE_COUNT,
};
pub use stats::WindowStats;
pub use vector::FeatureVector;
pub use window::{
    align_labels, extract_features, live_feature_rows, live_features, stack_features,
};
