//! Contractor management, progress updates and overdue alerts.
//!
//! # Invariants
//! - A progress update raises the project's `spent` by its amount atomically.
//! - Alerts only cover `ongoing` projects that have a contractor assigned.
//! - PINs are compared in full and never logged.

use crate::model::contractor::{
    Contractor, ContractorId, ContractorUpdate, NewContractor, NewContractorUpdate,
};
use crate::model::project::{Project, ProjectId, ProjectStatus};
use crate::model::ValidationError;
use crate::notify::Notifier;
use crate::repo::contractor_repo::ContractorRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::{RegionScope, RepoError, RepoResult};
use crate::service::Upload;
use crate::storage::{FileStore, StorageError};
use chrono::{NaiveDate, NaiveDateTime};
use log::{info, warn};
use serde::Serialize;
use subtle::ConstantTimeEq;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub const UPDATE_LIST_LIMIT: u32 = 50;
pub const NO_UPDATES_MESSAGE: &str = "No updates submitted yet.";

#[derive(Debug)]
pub enum ContractorServiceError {
    Validation(ValidationError),
    ContractorNotFound(ContractorId),
    ProjectNotFound(ProjectId),
    Storage(StorageError),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for ContractorServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ContractorNotFound(id) => write!(f, "contractor not found: {id}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Storage(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => {
                write!(f, "inconsistent contractor state: {details}")
            }
        }
    }
}

impl Error for ContractorServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Storage(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ContractorServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            RepoError::NotFound {
                entity: "contractor",
                id,
            } => Self::ContractorNotFound(id),
            RepoError::NotFound {
                entity: "project",
                id,
            } => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<ValidationError> for ContractorServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<StorageError> for ContractorServiceError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Progress report form with optional bill and site photos.
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressReport {
    pub project_id: ProjectId,
    pub contractor_id: ContractorId,
    pub amount_spent: f64,
    pub description: Option<String>,
    pub expected_completion_date: Option<NaiveDate>,
    pub bill_image: Option<Upload>,
    pub work_image: Option<Upload>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct OverdueAlert {
    pub contractor: String,
    pub project: String,
    pub message: String,
    /// `None` when the contractor never filed an update.
    pub days_overdue: Option<i64>,
    pub sms_status: String,
}

pub struct ContractorService<C, P, S, N>
where
    C: ContractorRepository,
    P: ProjectRepository,
    S: FileStore,
    N: Notifier,
{
    contractors: C,
    projects: P,
    store: S,
    notifier: N,
    stale_after_days: i64,
}

impl<C, P, S, N> ContractorService<C, P, S, N>
where
    C: ContractorRepository,
    P: ProjectRepository,
    S: FileStore,
    N: Notifier,
{
    pub fn new(contractors: C, projects: P, store: S, notifier: N, stale_after_days: u32) -> Self {
        Self {
            contractors,
            projects,
            store,
            notifier,
            stale_after_days: i64::from(stale_after_days),
        }
    }

    pub fn register(&self, contractor: &NewContractor) -> Result<Contractor, ContractorServiceError> {
        let id = self.contractors.create_contractor(contractor)?;
        info!("event=contractor_register module=service status=ok contractor_id={id}");
        self.contractors
            .get_contractor(id)?
            .ok_or(ContractorServiceError::InconsistentState(
                "created contractor not found in read-back",
            ))
    }

    pub fn list(&self) -> RepoResult<Vec<Contractor>> {
        self.contractors.list_contractors()
    }

    pub fn set_pin(&self, id: ContractorId, pin: &str) -> Result<(), ContractorServiceError> {
        self.contractors.set_pin(id, pin)?;
        info!("event=contractor_pin module=service status=ok contractor_id={id}");
        Ok(())
    }

    /// Unknown contractors never verify. The comparison runs in constant
    /// time over the stored PIN.
    pub fn verify_pin(&self, id: ContractorId, pin: &str) -> RepoResult<bool> {
        let verified = self
            .contractors
            .get_contractor(id)?
            .is_some_and(|contractor| pins_match(&contractor.pin, pin));
        if !verified {
            warn!("event=contractor_pin_verify module=service status=rejected contractor_id={id}");
        }
        Ok(verified)
    }

    pub fn assign(
        &self,
        project_id: ProjectId,
        contractor_id: ContractorId,
    ) -> Result<(), ContractorServiceError> {
        if self.contractors.get_contractor(contractor_id)?.is_none() {
            return Err(ContractorServiceError::ContractorNotFound(contractor_id));
        }
        self.projects.assign_contractor(project_id, contractor_id)?;
        info!(
            "event=contractor_assign module=service status=ok project_id={project_id} contractor_id={contractor_id}"
        );
        Ok(())
    }

    /// Unlinks the contractor's projects and deletes its updates.
    pub fn remove(&self, id: ContractorId) -> Result<(), ContractorServiceError> {
        self.contractors.delete_contractor(id)?;
        info!("event=contractor_remove module=service status=ok contractor_id={id}");
        Ok(())
    }

    pub fn projects_for(&self, contractor_id: ContractorId) -> RepoResult<Vec<Project>> {
        self.projects
            .list_projects(&ProjectListQuery::contractor(contractor_id))
    }

    /// Stores attached photos, records the update and bumps project spend.
    pub fn submit_progress(
        &self,
        report: &ProgressReport,
        submitted_at: NaiveDateTime,
    ) -> Result<ContractorUpdate, ContractorServiceError> {
        if self.contractors.get_contractor(report.contractor_id)?.is_none() {
            return Err(ContractorServiceError::ContractorNotFound(report.contractor_id));
        }
        if self.projects.get_project(report.project_id)?.is_none() {
            return Err(ContractorServiceError::ProjectNotFound(report.project_id));
        }

        let mut update = NewContractorUpdate {
            project_id: report.project_id,
            contractor_id: report.contractor_id,
            amount_spent: report.amount_spent,
            description: report.description.clone(),
            bill_image_path: None,
            work_image_path: None,
            expected_completion_date: report.expected_completion_date,
            submission_date: submitted_at,
        };
        // Reject bad amounts before any photo lands on disk.
        update.validate()?;
        update.bill_image_path = self.store_attachment("bill", report, report.bill_image.as_ref())?;
        update.work_image_path = self.store_attachment("work", report, report.work_image.as_ref())?;

        let id = self.contractors.record_update(&update)?;
        info!(
            "event=progress_submit module=service status=ok update_id={} project_id={} contractor_id={}",
            id, report.project_id, report.contractor_id
        );

        self.contractors
            .latest_update_for_project(report.project_id)?
            .filter(|stored| stored.id == id)
            .ok_or(ContractorServiceError::InconsistentState(
                "recorded update not found in read-back",
            ))
    }

    pub fn project_updates(&self, project_id: ProjectId) -> RepoResult<Vec<ContractorUpdate>> {
        self.contractors.list_updates_for_project(project_id)
    }

    /// Most recent updates within `scope`, capped at [`UPDATE_LIST_LIMIT`].
    pub fn recent_updates(&self, scope: RegionScope) -> RepoResult<Vec<ContractorUpdate>> {
        self.contractors.list_updates(scope, UPDATE_LIST_LIMIT)
    }

    /// Alerts for ongoing projects whose contractor went quiet, notifying each.
    pub fn overdue_alerts(&self, now: NaiveDateTime) -> RepoResult<Vec<OverdueAlert>> {
        let ongoing = ProjectListQuery {
            status: Some(ProjectStatus::Ongoing),
            ..ProjectListQuery::default()
        };

        let mut alerts = Vec::new();
        for project in self.projects.list_projects(&ongoing)? {
            let Some(contractor_id) = project.contractor_id else {
                continue;
            };
            let contractor = self.contractors.get_contractor(contractor_id)?;

            let (message, days_overdue) =
                match self.contractors.latest_update_for_project(project.id)? {
                    None => (NO_UPDATES_MESSAGE.to_string(), None),
                    Some(update) => {
                        let days = (now - update.submission_date).num_days();
                        if days <= self.stale_after_days {
                            continue;
                        }
                        (format!("Last update was {days} days ago."), Some(days))
                    }
                };

            let phone = contractor.as_ref().and_then(|c| c.phone.as_deref());
            let sms_status = self.notifier.send_sms(
                phone,
                &format!("URGENT: {message} for Project {}", project.name),
            );

            alerts.push(OverdueAlert {
                contractor: contractor
                    .as_ref()
                    .map_or_else(|| "Unknown".to_string(), |c| c.name.clone()),
                project: project.name,
                message,
                days_overdue,
                sms_status,
            });
        }

        info!(
            "event=overdue_alerts module=service status=ok count={}",
            alerts.len()
        );
        Ok(alerts)
    }

    fn store_attachment(
        &self,
        kind: &str,
        report: &ProgressReport,
        upload: Option<&Upload>,
    ) -> Result<Option<String>, StorageError> {
        upload
            .map(|file| {
                let name = format!(
                    "{kind}_{}_{}_{}",
                    report.project_id, report.contractor_id, file.file_name
                );
                self.store.save(&name, &file.bytes)
            })
            .transpose()
    }
}

/// Length mismatch short-circuits; equal-length PINs compare in constant time.
fn pins_match(stored: &str, candidate: &str) -> bool {
    stored.as_bytes().ct_eq(candidate.as_bytes()).into()
}

#[cfg(test)]
mod tests {
    use super::pins_match;

    #[test]
    fn pins_match_only_in_full() {
        assert!(pins_match("482913", "482913"));
        assert!(!pins_match("482913", "482914"));
        assert!(!pins_match("482913", "4829"));
        assert!(!pins_match("4829", "482913"));
        assert!(!pins_match("0000", ""));
    }
}
