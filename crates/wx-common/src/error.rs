//! Error types for the fusion pipeline.

use thiserror::Error;

use crate::reading::{SourceId, Variable};

/// Result type alias using WxError.
pub type WxResult<T> = Result<T, WxError>;

/// Primary error type shared by adapters, interpolation and the scheduler.
///
/// Only `PipelineFailure` aborts a refresh cycle. `SourceUnavailable` and
/// `InsufficientData` are recovered by excluding the source or variable.
#[derive(Debug, Error)]
pub enum WxError {
    // === Per-source ===
    #[error("Source {source_id} unavailable: {reason}")]
    SourceUnavailable { source_id: SourceId, reason: String },

    // === Per-variable ===
    #[error("Insufficient data for {variable}: {available} stations, need {required}")]
    InsufficientData {
        variable: Variable,
        available: usize,
        required: usize,
    },

    // === Cycle ===
    #[error("Pipeline failure: {0}")]
    PipelineFailure(String),

    // === Configuration ===
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Invalid bbox: {0}")]
    InvalidBbox(String),
}

impl WxError {
    /// Build a `SourceUnavailable` for the given source.
    pub fn source_unavailable(source_id: &SourceId, reason: impl Into<String>) -> Self {
        Self::SourceUnavailable {
            source_id: source_id.clone(),
            reason: reason.into(),
        }
    }

    /// Whether the cycle can continue past this error.
    pub fn is_recoverable(&self) -> bool {
        matches!(
            self,
            WxError::SourceUnavailable { .. } | WxError::InsufficientData { .. }
        )
    }
}

impl From<crate::bbox::BboxError> for WxError {
    fn from(err: crate::bbox::BboxError) -> Self {
        WxError::InvalidBbox(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_recoverable_classification() {
        let source = SourceId::new("md_asos");
        assert!(WxError::source_unavailable(&source, "HTTP 503").is_recoverable());
        assert!(WxError::InsufficientData {
            variable: Variable::Pressure,
            available: 2,
            required: 3,
        }
        .is_recoverable());
        assert!(!WxError::PipelineFailure("boom".into()).is_recoverable());
    }

    #[test]
    fn test_display_names_source() {
        let err = WxError::source_unavailable(&SourceId::new("pa_keystone"), "timeout");
        assert_eq!(err.to_string(), "Source pa_keystone unavailable: timeout");
    }
}
