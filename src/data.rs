//! Reference dataset loading using Polars

use anyhow::Context;
use ndarray::Array2;
use polars::prelude::*;
use std::path::Path;
use tracing::{debug, info};

/// Column holding the customer's age
pub const AGE_COLUMN: &str = "Age";
/// Column holding the annual income in thousands of dollars
pub const INCOME_COLUMN: &str = "Annual Income (k$)";
/// Column holding the spending score
pub const SCORE_COLUMN: &str = "Spending Score (1-100)";

/// Number of features used for clustering (age, income, score)
pub const N_FEATURES: usize = 3;

/// One customer's numeric attributes
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub age: f64,
    /// Annual income in k$
    pub annual_income: f64,
    /// Spending score in [1, 100]
    pub spending_score: f64,
}

impl Observation {
    pub fn new(age: f64, annual_income: f64, spending_score: f64) -> Self {
        Self {
            age,
            annual_income,
            spending_score,
        }
    }

    /// Feature vector in clustering order
    pub fn features(&self) -> [f64; N_FEATURES] {
        [self.age, self.annual_income, self.spending_score]
    }

    /// Name of the first field that is not a finite number, if any
    pub fn first_non_numeric_field(&self) -> Option<&'static str> {
        [
            (AGE_COLUMN, self.age),
            (INCOME_COLUMN, self.annual_income),
            (SCORE_COLUMN, self.spending_score),
        ]
        .into_iter()
        .find(|(_, value)| !value.is_finite())
        .map(|(name, _)| name)
    }
}

impl From<(f64, f64, f64)> for Observation {
    fn from((age, annual_income, spending_score): (f64, f64, f64)) -> Self {
        Self::new(age, annual_income, spending_score)
    }
}

/// Immutable reference dataset of customers
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerDataset {
    observations: Vec<Observation>,
}

impl CustomerDataset {
    pub fn new(observations: Vec<Observation>) -> Self {
        Self { observations }
    }

    /// Load the reference dataset from a CSV file with a header row
    ///
    /// Only the `Age`, `Annual Income (k$)` and `Spending Score (1-100)` columns
    /// are read; any other column is ignored.
    ///
    /// # Arguments
    /// * `file_path` - Path to the CSV file
    ///
    /// # Returns
    /// * `CustomerDataset` with one observation per data row, in file order
    pub fn from_csv(file_path: impl AsRef<Path>) -> crate::Result<Self> {
        let file_path = file_path.as_ref();
        debug!(path = %file_path.display(), "Scanning customer CSV");

        let df = LazyCsvReader::new(file_path)
            .with_has_header(true)
            .finish()
            .with_context(|| format!("Failed to open {}", file_path.display()))?
            .select([
                col(AGE_COLUMN).cast(DataType::Float64),
                col(INCOME_COLUMN).cast(DataType::Float64),
                col(SCORE_COLUMN).cast(DataType::Float64),
            ])
            .collect()
            .with_context(|| format!("Failed to read customer columns from {}", file_path.display()))?;

        if df.height() == 0 {
            anyhow::bail!("No customer rows found in {}", file_path.display());
        }

        let dataset = Self::from_frame(&df)?;
        info!(
            path = %file_path.display(),
            customers = dataset.len(),
            "Loaded reference dataset"
        );
        Ok(dataset)
    }

    /// Convert a frame holding the three Float64 feature columns
    fn from_frame(df: &DataFrame) -> crate::Result<Self> {
        let ages = df.column(AGE_COLUMN)?.f64()?;
        let incomes = df.column(INCOME_COLUMN)?.f64()?;
        let scores = df.column(SCORE_COLUMN)?.f64()?;

        let mut observations = Vec::with_capacity(df.height());
        for (row, ((age, income), score)) in ages
            .into_iter()
            .zip(incomes.into_iter())
            .zip(scores.into_iter())
            .enumerate()
        {
            let require = |value: Option<f64>, column: &str| {
                value.ok_or_else(|| {
                    anyhow::anyhow!("Row {}: missing or non-numeric '{}'", row + 1, column)
                })
            };
            observations.push(Observation::new(
                require(age, AGE_COLUMN)?,
                require(income, INCOME_COLUMN)?,
                require(score, SCORE_COLUMN)?,
            ));
        }

        Ok(Self::new(observations))
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    /// Feature matrix (n_customers, 3) of the reference rows followed by `extra`
    pub fn records_with(&self, extra: &Observation) -> Array2<f64> {
        Array2::from_shape_fn((self.len() + 1, N_FEATURES), |(row, feature)| {
            self.observations.get(row).unwrap_or(extra).features()[feature]
        })
    }
}

impl From<Vec<Observation>> for CustomerDataset {
    fn from(observations: Vec<Observation>) -> Self {
        Self::new(observations)
    }
}
