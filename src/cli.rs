//! Command-line interface definitions and argument parsing

use crate::form::{CustomerForm, Gender};
use crate::model::{SegmentationParams, DEFAULT_CLUSTERS, DEFAULT_SEED};
use clap::Parser;

/// Mall customer segmentation using K-Means clustering
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct Args {
    /// Path to the reference customers CSV file
    #[arg(short, long, default_value = "Mall_Customers.csv")]
    pub input: String,

    /// Gender of the new customer (collected, not used for clustering)
    #[arg(short, long, value_enum)]
    pub gender: Option<Gender>,

    /// Age of the new customer
    #[arg(long, allow_hyphen_values = true)]
    pub age: Option<String>,

    /// Annual income of the new customer in k$
    #[arg(long, allow_hyphen_values = true)]
    pub income: Option<String>,

    /// Spending score of the new customer (1-100)
    #[arg(long, allow_hyphen_values = true)]
    pub score: Option<String>,

    /// Number of clusters for K-Means
    #[arg(short = 'k', long, default_value_t = DEFAULT_CLUSTERS)]
    pub clusters: usize,

    /// Random seed for centroid initialization
    #[arg(long, default_value_t = DEFAULT_SEED)]
    pub seed: u64,

    /// Output path for the cluster plot
    #[arg(short, long, default_value = "segmentation.png")]
    pub output: String,

    /// Verbosity level (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,
}

impl Args {
    /// Form fields as entered on the command line
    pub fn customer_form(&self) -> CustomerForm {
        CustomerForm {
            gender: self.gender,
            age: self.age.clone(),
            annual_income: self.income.clone(),
            spending_score: self.score.clone(),
        }
    }

    pub fn segmentation_params(&self) -> SegmentationParams {
        SegmentationParams::default()
            .with_clusters(self.clusters)
            .with_seed(self.seed)
    }
}
