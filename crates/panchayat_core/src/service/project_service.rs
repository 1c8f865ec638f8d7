//! Project use-case service.
//!
//! # Responsibility
//! - Create, patch and delete projects with read-back of the stored row.
//! - Refresh the persisted risk score from live feedback signals.
//!
//! # Invariants
//! - Patches are merged and validated before anything is written.
//! - `refresh_risk` persists the normalized `0.0..=1.0` score.

use crate::model::location::VillageId;
use crate::model::project::{NewProject, Project, ProjectId, ProjectPatch};
use crate::repo::feedback_repo::FeedbackRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::{RepoError, RepoResult};
use crate::risk::{evaluate, RiskAssessment, RiskError, RiskInput, RiskStrategy};
use chrono::NaiveDate;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum ProjectServiceError {
    ProjectNotFound(ProjectId),
    Risk(RiskError),
    Repo(RepoError),
    /// Internal consistency mismatch between write and read-back.
    InconsistentState(&'static str),
}

impl Display for ProjectServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Risk(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent project state: {details}"),
        }
    }
}

impl Error for ProjectServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Risk(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<RepoError> for ProjectServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::NotFound {
                entity: "project",
                id,
            } => Self::ProjectNotFound(id),
            other => Self::Repo(other),
        }
    }
}

impl From<RiskError> for ProjectServiceError {
    fn from(value: RiskError) -> Self {
        Self::Risk(value)
    }
}

pub struct ProjectService<P: ProjectRepository, F: FeedbackRepository> {
    projects: P,
    feedback: F,
}

impl<P: ProjectRepository, F: FeedbackRepository> ProjectService<P, F> {
    pub fn new(projects: P, feedback: F) -> Self {
        Self { projects, feedback }
    }

    pub fn create_project(&self, project: &NewProject) -> Result<Project, ProjectServiceError> {
        let id = self.projects.create_project(project)?;
        info!("event=project_create module=service status=ok project_id={id}");
        self.projects
            .get_project(id)?
            .ok_or(ProjectServiceError::InconsistentState(
                "created project not found in read-back",
            ))
    }

    pub fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        self.projects.get_project(id)
    }

    pub fn list_village_projects(&self, village_id: VillageId) -> RepoResult<Vec<Project>> {
        self.projects.list_projects(&ProjectListQuery::village(village_id))
    }

    /// Applies only the fields present in `patch`.
    pub fn update_project(
        &self,
        id: ProjectId,
        patch: &ProjectPatch,
    ) -> Result<Project, ProjectServiceError> {
        let mut project = self
            .projects
            .get_project(id)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))?;

        if !project.apply_patch(patch) {
            return Ok(project);
        }
        self.projects.update_project(&project)?;
        info!("event=project_update module=service status=ok project_id={id}");

        self.projects
            .get_project(id)?
            .ok_or(ProjectServiceError::InconsistentState(
                "updated project not found in read-back",
            ))
    }

    pub fn delete_project(&self, id: ProjectId) -> Result<(), ProjectServiceError> {
        self.projects.delete_project(id)?;
        info!("event=project_delete module=service status=ok project_id={id}");
        Ok(())
    }

    /// Signals used to score one stored project.
    pub fn risk_input(
        &self,
        id: ProjectId,
        today: NaiveDate,
    ) -> Result<RiskInput, ProjectServiceError> {
        let project = self
            .projects
            .get_project(id)?
            .ok_or(ProjectServiceError::ProjectNotFound(id))?;
        let negative = self.feedback.count_negative_feedback(id)?;

        Ok(RiskInput {
            progress_percent: project.progress_percent,
            budget: project.budget,
            spent: project.spent,
            planned_end_date: project.planned_end_date,
            actual_end_date: project.actual_end_date,
            negative_feedback_count: negative,
            today,
        })
    }

    /// Scores the project and writes the score and level back.
    pub fn refresh_risk(
        &self,
        id: ProjectId,
        strategy: RiskStrategy,
        today: NaiveDate,
    ) -> Result<RiskAssessment, ProjectServiceError> {
        let input = self.risk_input(id, today)?;
        let assessment = evaluate(strategy, &input)?;
        self.projects
            .set_risk(id, assessment.score.normalized(), assessment.level)?;
        info!(
            "event=risk_refresh module=service status=ok project_id={} strategy={} level={}",
            id,
            strategy.as_str(),
            assessment.level.as_str()
        );
        Ok(assessment)
    }
}
