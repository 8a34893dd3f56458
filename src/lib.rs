//! MallSegment: customer segmentation using K-Means clustering
//!
//! A new customer's age, annual income and spending score are appended to a
//! reference dataset, the combined set is clustered, and the result is
//! labelled per cluster and rendered as an income vs. spending score plot.

pub mod cli;
pub mod data;
pub mod error;
pub mod form;
pub mod model;
pub mod viz;

// Re-export public items for easier access
pub use cli::Args;
pub use data::{CustomerDataset, Observation};
pub use error::SegmentationError;
pub use form::{CustomerForm, Gender};
pub use model::{segment, ClusterLabels, ClusteringResult, SegmentationParams, SegmentationService};
pub use viz::{cluster_summary, render_scatter};

/// Common result type used throughout the application
pub type Result<T> = anyhow::Result<T>;
