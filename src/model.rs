//! K-Means segmentation service

use crate::data::{CustomerDataset, Observation};
use crate::error::SegmentationError;
use linfa::prelude::*;
use linfa::DatasetBase;
use linfa_clustering::KMeans;
use linfa_nn::distance::L2Dist;
use ndarray::Array1;
use rand::SeedableRng;
use rand_xoshiro::Xoshiro256Plus;
use std::collections::HashSet;
use tracing::{debug, info, warn};

/// Default number of clusters
pub const DEFAULT_CLUSTERS: usize = 5;
/// Default random seed, fixed for reproducible assignments
pub const DEFAULT_SEED: u64 = 42;

/// Hyperparameters for a segmentation run
#[derive(Debug, Clone, PartialEq)]
pub struct SegmentationParams {
    /// Number of clusters (k)
    pub n_clusters: usize,
    /// Seed for centroid initialization
    pub seed: u64,
    /// Maximum Lloyd iterations per run
    pub max_iterations: u64,
    /// Convergence tolerance on centroid movement
    pub tolerance: f64,
    /// Independent initializations; the run with the lowest inertia wins
    pub n_runs: usize,
}

impl Default for SegmentationParams {
    fn default() -> Self {
        Self {
            n_clusters: DEFAULT_CLUSTERS,
            seed: DEFAULT_SEED,
            max_iterations: 300,
            tolerance: 1e-4,
            n_runs: 10,
        }
    }
}

impl SegmentationParams {
    pub fn with_clusters(mut self, n_clusters: usize) -> Self {
        self.n_clusters = n_clusters;
        self
    }

    pub fn with_seed(mut self, seed: u64) -> Self {
        self.seed = seed;
        self
    }
}

/// Display labels per cluster id, in order of first appearance
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ClusterLabels {
    entries: Vec<(usize, String)>,
}

impl ClusterLabels {
    /// Build labels from assignments, one per distinct id in first-seen order
    pub fn from_assignments(assignments: &[usize]) -> Self {
        let mut entries: Vec<(usize, String)> = Vec::new();
        for &cluster in assignments {
            if !entries.iter().any(|(id, _)| *id == cluster) {
                entries.push((cluster, format!("Cluster {}", cluster)));
            }
        }
        Self { entries }
    }

    pub fn get(&self, cluster: usize) -> Option<&str> {
        self.entries
            .iter()
            .find(|(id, _)| *id == cluster)
            .map(|(_, label)| label.as_str())
    }

    /// Cluster ids in first-seen order
    pub fn ids(&self) -> impl Iterator<Item = usize> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = (usize, &str)> + '_ {
        self.entries.iter().map(|(id, label)| (*id, label.as_str()))
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Outcome of one segmentation call
#[derive(Debug, Clone, PartialEq)]
pub struct ClusteringResult {
    /// Reference rows followed by the new observation
    observations: Vec<Observation>,
    assignments: Vec<usize>,
    labels: ClusterLabels,
    n_clusters: usize,
}

impl ClusteringResult {
    fn new(observations: Vec<Observation>, assignments: Vec<usize>, n_clusters: usize) -> Self {
        let labels = ClusterLabels::from_assignments(&assignments);
        Self {
            observations,
            assignments,
            labels,
            n_clusters,
        }
    }

    /// Cluster id per combined row
    pub fn assignments(&self) -> &[usize] {
        &self.assignments
    }

    pub fn labels(&self) -> &ClusterLabels {
        &self.labels
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn n_clusters(&self) -> usize {
        self.n_clusters
    }

    pub fn len(&self) -> usize {
        self.assignments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assignments.is_empty()
    }

    /// Row index of the new observation (always the last row)
    pub fn new_observation_index(&self) -> usize {
        self.assignments.len() - 1
    }

    pub fn new_observation_cluster(&self) -> usize {
        self.assignments[self.new_observation_index()]
    }

    /// Rows paired with their cluster id
    pub fn iter(&self) -> impl Iterator<Item = (&Observation, usize)> + '_ {
        self.observations
            .iter()
            .zip(self.assignments.iter().copied())
    }

    /// (cluster id, member count) in first-seen order
    pub fn cluster_sizes(&self) -> Vec<(usize, usize)> {
        self.labels
            .ids()
            .map(|id| {
                let size = self.assignments.iter().filter(|&&c| c == id).count();
                (id, size)
            })
            .collect()
    }
}

/// Partitions a reference dataset plus one new customer into clusters
#[derive(Debug, Clone, Default)]
pub struct SegmentationService {
    params: SegmentationParams,
}

impl SegmentationService {
    pub fn new(params: SegmentationParams) -> Self {
        Self { params }
    }

    pub fn params(&self) -> &SegmentationParams {
        &self.params
    }

    /// Cluster the reference rows together with `new_observation`
    ///
    /// Every call reclusters from scratch; identical inputs and parameters
    /// yield identical assignments.
    ///
    /// # Arguments
    /// * `dataset` - Reference customers, borrowed immutably
    /// * `new_observation` - Customer appended after the reference rows
    ///
    /// # Returns
    /// * `ClusteringResult` with `dataset.len() + 1` assignments
    ///
    /// # Errors
    /// * `InvalidInput` for an empty dataset, a non-finite field, `k == 0`,
    ///   or fewer combined rows than clusters
    /// * `Computation` when fewer distinct rows than clusters exist (no
    ///   labels are returned in that case) or the K-Means fit fails
    pub fn segment(
        &self,
        dataset: &CustomerDataset,
        new_observation: &Observation,
    ) -> Result<ClusteringResult, SegmentationError> {
        let n_clusters = self.params.n_clusters;
        self.validate(dataset, new_observation)?;

        let records = dataset.records_with(new_observation);
        debug!(
            rows = records.nrows(),
            n_clusters,
            seed = self.params.seed,
            "Fitting K-Means"
        );

        let distinct = count_distinct_rows(dataset, new_observation);
        if distinct < n_clusters {
            warn!(distinct, n_clusters, "Too few distinct customers to seed clusters");
            return Err(SegmentationError::Computation(format!(
                "only {} distinct observations for {} clusters",
                distinct, n_clusters
            )));
        }

        let rng = Xoshiro256Plus::seed_from_u64(self.params.seed);
        let train = DatasetBase::from(records);
        let model = KMeans::params_with(n_clusters, rng, L2Dist)
            .n_runs(self.params.n_runs)
            .max_n_iterations(self.params.max_iterations)
            .tolerance(self.params.tolerance)
            .fit(&train)?;

        let labels: Array1<usize> = model.predict(train.records());

        let mut observations = dataset.observations().to_vec();
        observations.push(*new_observation);
        let result = ClusteringResult::new(observations, labels.to_vec(), n_clusters);

        info!(
            customers = result.len(),
            clusters = result.labels().len(),
            new_customer_cluster = result.new_observation_cluster(),
            "Segmentation complete"
        );
        Ok(result)
    }

    fn validate(
        &self,
        dataset: &CustomerDataset,
        new_observation: &Observation,
    ) -> Result<(), SegmentationError> {
        if self.params.n_clusters == 0 {
            return Err(SegmentationError::invalid_input(
                "number of clusters must be at least 1",
            ));
        }
        if dataset.is_empty() {
            return Err(SegmentationError::invalid_input("dataset is empty"));
        }
        for (row, observation) in dataset.observations().iter().enumerate() {
            if let Some(field) = observation.first_non_numeric_field() {
                return Err(SegmentationError::invalid_input(format!(
                    "reference row {} has a missing or non-numeric '{}'",
                    row + 1,
                    field
                )));
            }
        }
        if let Some(field) = new_observation.first_non_numeric_field() {
            return Err(SegmentationError::invalid_input(format!(
                "new observation has a missing or non-numeric '{}'",
                field
            )));
        }
        if dataset.len() + 1 < self.params.n_clusters {
            return Err(SegmentationError::invalid_input(format!(
                "{} observations cannot form {} clusters",
                dataset.len() + 1,
                self.params.n_clusters
            )));
        }
        Ok(())
    }
}

/// Segment with the given cluster count and seed and default iteration settings
pub fn segment(
    dataset: &CustomerDataset,
    new_observation: &Observation,
    n_clusters: usize,
    seed: u64,
) -> Result<ClusteringResult, SegmentationError> {
    let params = SegmentationParams::default()
        .with_clusters(n_clusters)
        .with_seed(seed);
    SegmentationService::new(params).segment(dataset, new_observation)
}

/// Number of distinct feature rows in the combined sequence
fn count_distinct_rows(dataset: &CustomerDataset, new_observation: &Observation) -> usize {
    dataset
        .observations()
        .iter()
        .chain(std::iter::once(new_observation))
        // +0.0 folds -0.0 into 0.0 so both hash alike
        .map(|o| o.features().map(|v| (v + 0.0).to_bits()))
        .collect::<HashSet<_>>()
        .len()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn create_test_dataset() -> CustomerDataset {
        CustomerDataset::new(vec![
            Observation::new(19.0, 15.0, 39.0),
            Observation::new(21.0, 15.0, 81.0),
            Observation::new(20.0, 16.0, 6.0),
            Observation::new(23.0, 16.0, 77.0),
            Observation::new(31.0, 17.0, 40.0),
        ])
    }

    fn create_larger_dataset() -> CustomerDataset {
        let mut observations = Vec::new();
        for (age, income, score) in [
            (22.0, 20.0, 80.0),
            (25.0, 25.0, 85.0),
            (45.0, 20.0, 10.0),
            (50.0, 25.0, 15.0),
            (35.0, 55.0, 50.0),
            (40.0, 60.0, 55.0),
            (30.0, 90.0, 90.0),
            (32.0, 95.0, 85.0),
            (48.0, 90.0, 10.0),
            (55.0, 100.0, 15.0),
        ] {
            observations.push(Observation::new(age, income, score));
        }
        CustomerDataset::new(observations)
    }

    #[test]
    fn test_segment_appends_new_observation() {
        let dataset = create_test_dataset();
        let new_customer = Observation::new(25.0, 18.0, 50.0);
        let result = segment(&dataset, &new_customer, 5, 42).unwrap();

        assert_eq!(result.len(), dataset.len() + 1);
        assert_eq!(result.new_observation_index(), 5);
        assert_eq!(result.observations()[5], new_customer);
        assert!(result.assignments().iter().all(|&c| c < 5));
    }

    #[test]
    fn test_segment_is_deterministic() {
        let dataset = create_larger_dataset();
        let new_customer = Observation::new(28.0, 40.0, 60.0);
        let service = SegmentationService::default();

        let first = service.segment(&dataset, &new_customer).unwrap();
        let second = service.segment(&dataset, &new_customer).unwrap();

        assert_eq!(first.assignments(), second.assignments());
        assert_eq!(first.labels(), second.labels());
    }

    #[test]
    fn test_labels_match_distinct_ids() {
        let dataset = create_larger_dataset();
        let result = SegmentationService::default()
            .segment(&dataset, &Observation::new(28.0, 40.0, 60.0))
            .unwrap();

        let distinct: HashSet<usize> = result.assignments().iter().copied().collect();
        let labelled: HashSet<usize> = result.labels().ids().collect();
        assert_eq!(distinct, labelled);
        assert!(result.labels().len() <= 5);
        for (id, label) in result.labels().iter() {
            assert_eq!(label, format!("Cluster {}", id));
        }
    }

    #[test]
    fn test_labels_first_seen_order() {
        let labels = ClusterLabels::from_assignments(&[3, 1, 3, 0, 1]);
        assert_eq!(labels.ids().collect::<Vec<_>>(), vec![3, 1, 0]);
        assert_eq!(labels.get(1), Some("Cluster 1"));
        assert_eq!(labels.get(2), None);
    }

    #[test]
    fn test_cluster_sizes_sum_to_total() {
        let dataset = create_larger_dataset();
        let result = SegmentationService::default()
            .segment(&dataset, &Observation::new(28.0, 40.0, 60.0))
            .unwrap();

        let total: usize = result.cluster_sizes().iter().map(|(_, size)| size).sum();
        assert_eq!(total, 11);
    }

    #[test]
    fn test_empty_dataset() {
        let result = segment(
            &CustomerDataset::default(),
            &Observation::new(25.0, 18.0, 50.0),
            5,
            42,
        );
        assert!(matches!(result, Err(SegmentationError::InvalidInput(_))));
    }

    #[test]
    fn test_non_numeric_new_observation() {
        let result = segment(
            &create_test_dataset(),
            &Observation::new(25.0, f64::NAN, 50.0),
            5,
            42,
        );
        assert!(matches!(result, Err(SegmentationError::InvalidInput(_))));
    }

    #[test]
    fn test_non_numeric_reference_row() {
        let dataset = CustomerDataset::new(vec![
            Observation::new(19.0, 15.0, 39.0),
            Observation::new(21.0, f64::INFINITY, 81.0),
        ]);
        let result = segment(&dataset, &Observation::new(25.0, 18.0, 50.0), 2, 42);
        assert!(matches!(result, Err(SegmentationError::InvalidInput(_))));
    }

    #[test]
    fn test_invalid_cluster_count() {
        let dataset = create_test_dataset();
        let new_customer = Observation::new(25.0, 18.0, 50.0);

        let result = segment(&dataset, &new_customer, 0, 42);
        assert!(matches!(result, Err(SegmentationError::InvalidInput(_))));

        // Six rows cannot form seven clusters
        let result = segment(&dataset, &new_customer, 7, 42);
        assert!(matches!(result, Err(SegmentationError::InvalidInput(_))));
    }

    #[test]
    fn test_too_few_distinct_rows() {
        let dataset = CustomerDataset::new(vec![Observation::new(30.0, 50.0, 50.0); 6]);
        let result = segment(&dataset, &Observation::new(30.0, 50.0, 50.0), 5, 42);
        assert!(matches!(result, Err(SegmentationError::Computation(_))));
    }
}
