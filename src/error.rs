//! Error types for the segmentation service.

use linfa_clustering::KMeansError;
use thiserror::Error;

/// Errors returned by [`crate::model::SegmentationService::segment`].
#[derive(Debug, Error, Clone, PartialEq)]
pub enum SegmentationError {
    /// Bad or missing input data. Surfaced to the caller, never retried.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// The clustering routine failed on otherwise valid input.
    #[error("Clustering failed: {0}")]
    Computation(String),
}

impl SegmentationError {
    pub fn invalid_input(reason: impl Into<String>) -> Self {
        Self::InvalidInput(reason.into())
    }

    pub fn is_invalid_input(&self) -> bool {
        matches!(self, Self::InvalidInput(_))
    }
}

impl From<KMeansError> for SegmentationError {
    fn from(err: KMeansError) -> Self {
        Self::Computation(err.to_string())
    }
}
