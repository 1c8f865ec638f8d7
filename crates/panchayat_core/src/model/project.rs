//! Infrastructure project model.
//!
//! # Responsibility
//! - Define the persisted project record and its creation/patch inputs.
//! - Provide a typed merge for partial updates.
//!
//! # Invariants
//! - `budget` and `spent` are finite and `>= 0`; `spent` may exceed `budget`.
//! - `progress_percent` stays within `0..=100`.
//! - `risk_score`/`risk_level` are derived values written back by the risk
//!   refresh use-case, never by patches.

use crate::model::contractor::ContractorId;
use crate::model::location::VillageId;
use crate::model::{ensure_amount, ensure_not_blank, ValidationError};
use crate::risk::RiskLevel;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

pub type ProjectId = i64;

/// Lifecycle label of a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ProjectStatus {
    Ongoing,
    Completed,
    Delayed,
}

impl ProjectStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Ongoing => "ongoing",
            Self::Completed => "completed",
            Self::Delayed => "delayed",
        }
    }

    /// Case-insensitive parse; stored labels are lowercase.
    pub fn parse(value: &str) -> Option<Self> {
        match value.trim().to_ascii_lowercase().as_str() {
            "ongoing" => Some(Self::Ongoing),
            "completed" => Some(Self::Completed),
            "delayed" => Some(Self::Delayed),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub village_id: VillageId,
    pub contractor_id: Option<ContractorId>,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget: f64,
    pub spent: f64,
    pub progress_percent: f64,
    pub risk_score: f64,
    pub risk_level: RiskLevel,
    pub start_year: Option<i32>,
    pub duration_months: Option<u32>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
}

impl Project {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.budget, self.spent, self.progress_percent)
    }

    /// Merges a patch field by field. Returns whether anything changed.
    ///
    /// The merged record is not validated here; callers validate before
    /// persisting so a rejected patch leaves storage untouched.
    pub fn apply_patch(&mut self, patch: &ProjectPatch) -> bool {
        let before = self.clone();

        if let Some(name) = &patch.name {
            self.name = name.clone();
        }
        if let Some(description) = &patch.description {
            self.description = Some(description.clone());
        }
        if let Some(contractor_id) = patch.contractor_id {
            self.contractor_id = Some(contractor_id);
        }
        if let Some(status) = patch.status {
            self.status = status;
        }
        if let Some(budget) = patch.budget {
            self.budget = budget;
        }
        if let Some(spent) = patch.spent {
            self.spent = spent;
        }
        if let Some(progress) = patch.progress_percent {
            self.progress_percent = progress;
        }
        if let Some(start_year) = patch.start_year {
            self.start_year = Some(start_year);
        }
        if let Some(duration) = patch.duration_months {
            self.duration_months = Some(duration);
        }
        if let Some(planned) = patch.planned_end_date {
            self.planned_end_date = Some(planned);
        }
        if let Some(actual) = patch.actual_end_date {
            self.actual_end_date = Some(actual);
        }

        *self != before
    }
}

/// Input for creating a project. Risk fields start at `0` / `Low`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewProject {
    pub village_id: VillageId,
    pub contractor_id: Option<ContractorId>,
    pub name: String,
    pub description: Option<String>,
    pub status: ProjectStatus,
    pub budget: f64,
    pub spent: f64,
    pub progress_percent: f64,
    pub start_year: Option<i32>,
    pub duration_months: Option<u32>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
}

impl NewProject {
    pub fn new(village_id: VillageId, name: impl Into<String>) -> Self {
        Self {
            village_id,
            contractor_id: None,
            name: name.into(),
            description: None,
            status: ProjectStatus::Ongoing,
            budget: 0.0,
            spent: 0.0,
            progress_percent: 0.0,
            start_year: None,
            duration_months: None,
            planned_end_date: None,
            actual_end_date: None,
        }
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_fields(&self.name, self.budget, self.spent, self.progress_percent)
    }
}

/// Mutable project fields. `None` leaves the stored value unchanged.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProjectPatch {
    pub name: Option<String>,
    pub description: Option<String>,
    pub contractor_id: Option<ContractorId>,
    pub status: Option<ProjectStatus>,
    pub budget: Option<f64>,
    pub spent: Option<f64>,
    pub progress_percent: Option<f64>,
    pub start_year: Option<i32>,
    pub duration_months: Option<u32>,
    pub planned_end_date: Option<NaiveDate>,
    pub actual_end_date: Option<NaiveDate>,
}

fn validate_fields(
    name: &str,
    budget: f64,
    spent: f64,
    progress_percent: f64,
) -> Result<(), ValidationError> {
    ensure_not_blank("project.name", name)?;
    ensure_amount("budget", budget)?;
    ensure_amount("spent", spent)?;
    if !progress_percent.is_finite() {
        return Err(ValidationError::NonFinite("progress_percent"));
    }
    if !(0.0..=100.0).contains(&progress_percent) {
        return Err(ValidationError::ProgressOutOfRange(progress_percent));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::{NewProject, Project, ProjectPatch, ProjectStatus};
    use crate::model::ValidationError;
    use crate::risk::RiskLevel;

    fn sample() -> Project {
        Project {
            id: 1,
            village_id: 7,
            contractor_id: None,
            name: "Check dam".to_string(),
            description: None,
            status: ProjectStatus::Ongoing,
            budget: 100_000.0,
            spent: 10_000.0,
            progress_percent: 20.0,
            risk_score: 0.0,
            risk_level: RiskLevel::Low,
            start_year: Some(2024),
            duration_months: Some(12),
            planned_end_date: None,
            actual_end_date: None,
        }
    }

    #[test]
    fn apply_patch_only_touches_provided_fields() {
        let mut project = sample();
        let patch = ProjectPatch {
            spent: Some(55_000.0),
            status: Some(ProjectStatus::Delayed),
            ..ProjectPatch::default()
        };

        assert!(project.apply_patch(&patch));
        assert_eq!(project.spent, 55_000.0);
        assert_eq!(project.status, ProjectStatus::Delayed);
        assert_eq!(project.name, "Check dam");
        assert_eq!(project.budget, 100_000.0);
    }

    #[test]
    fn empty_patch_reports_no_change() {
        let mut project = sample();
        assert!(!project.apply_patch(&ProjectPatch::default()));
    }

    #[test]
    fn validate_rejects_progress_above_hundred() {
        let mut draft = NewProject::new(1, "Road");
        draft.progress_percent = 120.0;
        assert_eq!(
            draft.validate(),
            Err(ValidationError::ProgressOutOfRange(120.0))
        );
    }

    #[test]
    fn status_parse_is_case_insensitive() {
        assert_eq!(ProjectStatus::parse("Completed"), Some(ProjectStatus::Completed));
        assert_eq!(ProjectStatus::parse("stalled"), None);
    }
}
