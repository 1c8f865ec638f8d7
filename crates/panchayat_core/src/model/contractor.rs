//! Contractor and contractor progress-update models.

use crate::model::project::ProjectId;
use crate::model::{ensure_amount, ensure_not_blank, ValidationError};
use chrono::{NaiveDate, NaiveDateTime};
use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

pub type ContractorId = i64;
pub type ContractorUpdateId = i64;

pub const DEFAULT_PIN: &str = "0000";
/// Storage format of `contractor_updates.submission_date`.
pub const SUBMISSION_FORMAT: &str = "%Y-%m-%d %H:%M";

static PIN_RE: Lazy<Regex> = Lazy::new(|| Regex::new(r"^[0-9]{4,6}$").expect("valid pin regex"));

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Contractor {
    pub id: ContractorId,
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
    pub performance: f64,
    #[serde(skip_serializing, default)]
    pub pin: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewContractor {
    pub name: String,
    pub company: Option<String>,
    pub phone: Option<String>,
}

impl NewContractor {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("contractor.name", &self.name)
    }
}

/// Progress/spend report filed by a contractor against one project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContractorUpdate {
    pub id: ContractorUpdateId,
    pub project_id: ProjectId,
    pub contractor_id: ContractorId,
    pub amount_spent: f64,
    pub description: Option<String>,
    pub bill_image_path: Option<String>,
    pub work_image_path: Option<String>,
    pub expected_completion_date: Option<NaiveDate>,
    pub submission_date: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewContractorUpdate {
    pub project_id: ProjectId,
    pub contractor_id: ContractorId,
    pub amount_spent: f64,
    pub description: Option<String>,
    pub bill_image_path: Option<String>,
    pub work_image_path: Option<String>,
    pub expected_completion_date: Option<NaiveDate>,
    pub submission_date: NaiveDateTime,
}

impl NewContractorUpdate {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_amount("amount_spent", self.amount_spent)
    }
}

pub fn validate_pin(pin: &str) -> Result<(), ValidationError> {
    if PIN_RE.is_match(pin) {
        Ok(())
    } else {
        Err(ValidationError::InvalidPin)
    }
}

#[cfg(test)]
mod tests {
    use super::{validate_pin, DEFAULT_PIN};

    #[test]
    fn pin_accepts_four_to_six_digits() {
        assert!(validate_pin(DEFAULT_PIN).is_ok());
        assert!(validate_pin("123456").is_ok());
        assert!(validate_pin("123").is_err());
        assert!(validate_pin("12a4").is_err());
        assert!(validate_pin("1234567").is_err());
    }
}
