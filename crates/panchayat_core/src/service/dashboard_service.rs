//! Village and officer dashboards.

use crate::model::location::VillageId;
use crate::model::project::{Project, ProjectStatus};
use crate::repo::feedback_repo::FeedbackRepository;
use crate::repo::project_repo::{ProjectListQuery, ProjectRepository};
use crate::repo::{RegionScope, RepoResult};
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct VillageDashboard {
    pub total_projects: usize,
    pub completed_projects: usize,
    pub ongoing_projects: usize,
    pub delayed_projects: usize,
    pub total_budget: f64,
    pub total_spent: f64,
    /// Mean progress rounded to one decimal; `0` without projects.
    pub avg_progress: f64,
    /// Feedback rated `<= 3` across the village's projects.
    pub complaints: u64,
    pub project_list: Vec<Project>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct OfficerStats {
    pub total_projects: u64,
    pub completed_projects: u64,
    /// Feedback rated `<= 3` or flagged by integrity checks.
    pub complaints: u64,
}

pub struct DashboardService<P: ProjectRepository, F: FeedbackRepository> {
    projects: P,
    feedback: F,
}

impl<P: ProjectRepository, F: FeedbackRepository> DashboardService<P, F> {
    pub fn new(projects: P, feedback: F) -> Self {
        Self { projects, feedback }
    }

    pub fn village_dashboard(&self, village_id: VillageId) -> RepoResult<VillageDashboard> {
        let projects = self
            .projects
            .list_projects(&ProjectListQuery::village(village_id))?;
        let complaints = self
            .feedback
            .count_complaints(RegionScope::Village(village_id), false)?;

        let count_status =
            |status: ProjectStatus| projects.iter().filter(|p| p.status == status).count();

        let total = projects.len();
        let avg_progress = if total == 0 {
            0.0
        } else {
            let sum: f64 = projects.iter().map(|p| p.progress_percent).sum();
            ((sum / total as f64) * 10.0).round() / 10.0
        };

        Ok(VillageDashboard {
            total_projects: total,
            completed_projects: count_status(ProjectStatus::Completed),
            ongoing_projects: count_status(ProjectStatus::Ongoing),
            delayed_projects: count_status(ProjectStatus::Delayed),
            total_budget: projects.iter().map(|p| p.budget).sum(),
            total_spent: projects.iter().map(|p| p.spent).sum(),
            avg_progress,
            complaints,
            project_list: projects,
        })
    }

    pub fn officer_stats(&self, scope: RegionScope) -> RepoResult<OfficerStats> {
        let all = ProjectListQuery {
            scope,
            ..ProjectListQuery::default()
        };
        let completed = ProjectListQuery {
            status: Some(ProjectStatus::Completed),
            ..all.clone()
        };

        Ok(OfficerStats {
            total_projects: self.projects.count_projects(&all)?,
            completed_projects: self.projects.count_projects(&completed)?,
            complaints: self.feedback.count_complaints(scope, true)?,
        })
    }
}
