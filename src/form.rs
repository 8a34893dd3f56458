//! Customer entry form validation
//!
//! The form collects five fields: gender, age, annual income and spending
//! score as raw text. [`CustomerForm::to_observation`] rejects missing,
//! non-numeric and out-of-range entries before anything reaches the
//! segmentation service. Gender is collected but takes no part in
//! clustering.

use crate::data::{Observation, AGE_COLUMN, INCOME_COLUMN, SCORE_COLUMN};
use crate::error::SegmentationError;
use clap::ValueEnum;
use std::fmt;

/// Lowest accepted spending score
pub const MIN_SCORE: f64 = 1.0;
/// Highest accepted spending score
pub const MAX_SCORE: f64 = 100.0;

#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum Gender {
    Male,
    Female,
}

impl fmt::Display for Gender {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Gender::Male => write!(f, "Male"),
            Gender::Female => write!(f, "Female"),
        }
    }
}

/// Raw field values as typed by the user
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CustomerForm {
    pub gender: Option<Gender>,
    pub age: Option<String>,
    pub annual_income: Option<String>,
    pub spending_score: Option<String>,
}

impl CustomerForm {
    pub fn new(
        gender: Option<Gender>,
        age: impl Into<String>,
        annual_income: impl Into<String>,
        spending_score: impl Into<String>,
    ) -> Self {
        Self {
            gender,
            age: Some(age.into()),
            annual_income: Some(annual_income.into()),
            spending_score: Some(spending_score.into()),
        }
    }

    /// Validate the numeric fields and build an observation
    pub fn to_observation(&self) -> Result<Observation, SegmentationError> {
        let age = parse_age(required(&self.age, AGE_COLUMN)?)?;
        let annual_income = parse_number(
            required(&self.annual_income, INCOME_COLUMN)?,
            INCOME_COLUMN,
        )?;
        if annual_income < 0.0 {
            return Err(SegmentationError::invalid_input(format!(
                "Annual Income (k$) must be non-negative, got {}",
                annual_income
            )));
        }

        let spending_score = parse_number(
            required(&self.spending_score, SCORE_COLUMN)?,
            SCORE_COLUMN,
        )?;
        if !(MIN_SCORE..=MAX_SCORE).contains(&spending_score) {
            return Err(SegmentationError::invalid_input(format!(
                "Spending Score (1-100) must lie in [{}, {}], got {}",
                MIN_SCORE, MAX_SCORE, spending_score
            )));
        }

        Ok(Observation::new(age, annual_income, spending_score))
    }
}

fn required<'a>(value: &'a Option<String>, field: &str) -> Result<&'a str, SegmentationError> {
    match value.as_deref().map(str::trim) {
        Some(text) if !text.is_empty() => Ok(text),
        _ => Err(SegmentationError::invalid_input(format!("{} is required", field))),
    }
}

fn parse_number(text: &str, field: &str) -> Result<f64, SegmentationError> {
    text.parse::<f64>()
        .ok()
        .filter(|v| v.is_finite())
        .ok_or_else(|| {
            SegmentationError::invalid_input(format!("{} must be a number, got '{}'", field, text))
        })
}

fn parse_age(text: &str) -> Result<f64, SegmentationError> {
    match text.parse::<u32>() {
        Ok(age) if age > 0 => Ok(f64::from(age)),
        _ => Err(SegmentationError::invalid_input(format!(
            "Age must be a positive integer, got '{}'",
            text
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_valid_form() {
        let form = CustomerForm::new(Some(Gender::Female), "25", "18", "50");
        assert_eq!(
            form.to_observation().unwrap(),
            Observation::new(25.0, 18.0, 50.0)
        );
    }

    #[test]
    fn test_gender_is_optional() {
        let form = CustomerForm::new(None, " 40 ", "72.5", "1");
        assert_eq!(
            form.to_observation().unwrap(),
            Observation::new(40.0, 72.5, 1.0)
        );
    }

    #[test]
    fn test_missing_income() {
        let form = CustomerForm {
            annual_income: None,
            ..CustomerForm::new(Some(Gender::Male), "25", "", "50")
        };
        let err = form.to_observation().unwrap_err();
        assert!(err.is_invalid_input());
        assert!(err.to_string().contains("Annual Income"));

        let blank = CustomerForm::new(Some(Gender::Male), "25", "  ", "50");
        assert!(blank.to_observation().unwrap_err().is_invalid_input());
    }

    #[test]
    fn test_age_must_be_positive_integer() {
        for age in ["0", "-3", "25.5", "abc"] {
            let form = CustomerForm::new(None, age, "18", "50");
            assert!(form.to_observation().is_err(), "age {age} accepted");
        }
    }

    #[test]
    fn test_income_range() {
        assert!(CustomerForm::new(None, "25", "-1", "50").to_observation().is_err());
        assert!(CustomerForm::new(None, "25", "NaN", "50").to_observation().is_err());
        assert!(CustomerForm::new(None, "25", "0", "50").to_observation().is_ok());
    }

    #[test]
    fn test_score_range() {
        assert!(CustomerForm::new(None, "25", "18", "0").to_observation().is_err());
        assert!(CustomerForm::new(None, "25", "18", "101").to_observation().is_err());
        assert!(CustomerForm::new(None, "25", "18", "100").to_observation().is_ok());
    }
}
