//! Pipeline errors
//!
//! Hard errors only. Soft availability failures (missing files, unreachable
//! receiver, corrupt log) are absorbed where they happen and never reach here.

use thiserror::Error;

use crate::logic::features::layout::LayoutMismatchError;

pub type PipelineResult<T> = Result<T, PipelineError>;

#[derive(Debug, Error)]
pub enum PipelineError {
    // State errors
    #[error("{component} must be trained before {operation}")]
    NotTrained {
        component: &'static str,
        operation: &'static str,
    },

    // Data shape errors
    #[error("not enough data points: need at least {required}, got {actual}")]
    InsufficientData { required: usize, actual: usize },

    #[error("feature width mismatch: expected {expected}, got {actual}")]
    WidthMismatch { expected: usize, actual: usize },

    #[error("empty feature matrix")]
    EmptyMatrix,

    #[error("length mismatch: {rows} rows but {labels} labels")]
    LengthMismatch { rows: usize, labels: usize },

    #[error("row count mismatch between stacked blocks: {expected} vs {actual}")]
    RowMismatch { expected: usize, actual: usize },

    #[error("invalid parameter: {0}")]
    InvalidParameter(String),

    // Artifact errors
    #[error(transparent)]
    Layout(#[from] LayoutMismatchError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

impl PipelineError {
    pub fn not_trained(component: &'static str, operation: &'static str) -> Self {
        PipelineError::NotTrained { component, operation }
    }

    /// Operation invoked before training/fitting
    pub fn is_state_error(&self) -> bool {
        matches!(self, PipelineError::NotTrained { .. })
    }

    /// Too few points or wrong matrix geometry
    pub fn is_shape_error(&self) -> bool {
        matches!(
            self,
            PipelineError::InsufficientData { .. }
                | PipelineError::WidthMismatch { .. }
                | PipelineError::EmptyMatrix
                | PipelineError::LengthMismatch { .. }
                | PipelineError::RowMismatch { .. }
        )
    }
}
