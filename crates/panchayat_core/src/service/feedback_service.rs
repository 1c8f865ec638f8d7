//! Citizen feedback intake.
//!
//! # Responsibility
//! - Validate ratings and coordinates, run photo integrity checks, persist.
//! - Serve per-project and problematic feedback listings.
//!
//! # Invariants
//! - A photo is hashed before it is stored; the hash is of the raw upload.
//! - Integrity flags never block persistence of the feedback row.

use crate::integrity::{IntegrityChecker, IntegrityError, PhotoSubmission};
use crate::model::feedback::{validate_rating, Feedback, NewFeedback, ProblematicFeedback};
use crate::model::location::{GeoPoint, VillageId};
use crate::model::project::ProjectId;
use crate::model::ValidationError;
use crate::repo::feedback_repo::FeedbackRepository;
use crate::repo::location_repo::LocationRepository;
use crate::repo::project_repo::ProjectRepository;
use crate::repo::{RepoError, RepoResult};
use crate::service::Upload;
use crate::storage::FileStore;
use chrono::NaiveDateTime;
use log::info;
use std::error::Error;
use std::fmt::{Display, Formatter};

#[derive(Debug)]
pub enum FeedbackServiceError {
    Validation(ValidationError),
    ProjectNotFound(ProjectId),
    Integrity(IntegrityError),
    Repo(RepoError),
    InconsistentState(&'static str),
}

impl Display for FeedbackServiceError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::ProjectNotFound(id) => write!(f, "project not found: {id}"),
            Self::Integrity(err) => write!(f, "{err}"),
            Self::Repo(err) => write!(f, "{err}"),
            Self::InconsistentState(details) => write!(f, "inconsistent feedback state: {details}"),
        }
    }
}

impl Error for FeedbackServiceError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Integrity(err) => Some(err),
            Self::Repo(err) => Some(err),
            _ => None,
        }
    }
}

impl From<ValidationError> for FeedbackServiceError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<IntegrityError> for FeedbackServiceError {
    fn from(value: IntegrityError) -> Self {
        Self::Integrity(value)
    }
}

impl From<RepoError> for FeedbackServiceError {
    fn from(value: RepoError) -> Self {
        match value {
            RepoError::Validation(err) => Self::Validation(err),
            other => Self::Repo(other),
        }
    }
}

/// Caller-supplied feedback form.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedbackSubmission {
    /// Unchecked; must fall within `1..=5`.
    pub rating: i64,
    pub comment: String,
    pub location: Option<GeoPoint>,
    pub photo: Option<Upload>,
}

pub struct FeedbackService<P, F, L, S>
where
    P: ProjectRepository,
    F: FeedbackRepository,
    L: LocationRepository,
    S: FileStore,
{
    projects: P,
    feedback: F,
    locations: L,
    store: S,
    checker: IntegrityChecker,
}

impl<P, F, L, S> FeedbackService<P, F, L, S>
where
    P: ProjectRepository,
    F: FeedbackRepository,
    L: LocationRepository,
    S: FileStore,
{
    pub fn new(projects: P, feedback: F, locations: L, store: S, checker: IntegrityChecker) -> Self {
        Self {
            projects,
            feedback,
            locations,
            store,
            checker,
        }
    }

    /// Validates, checks the optional photo, and stores one feedback row.
    ///
    /// `captured_at` is stamped onto the photo overlay.
    ///
    /// # Errors
    /// - `Validation` for out-of-range rating or coordinates.
    /// - `ProjectNotFound` when the target project does not exist.
    /// - `Integrity` when the duplicate lookup or photo storage fails.
    pub fn submit_feedback(
        &self,
        project_id: ProjectId,
        submission: &FeedbackSubmission,
        captured_at: NaiveDateTime,
    ) -> Result<Feedback, FeedbackServiceError> {
        let rating = validate_rating(submission.rating)?;
        if let Some(location) = &submission.location {
            location.validate()?;
        }

        let project = self
            .projects
            .get_project(project_id)?
            .ok_or(FeedbackServiceError::ProjectNotFound(project_id))?;

        let mut record = NewFeedback {
            project_id,
            rating,
            comment: submission.comment.trim().to_string(),
            image_path: None,
            image_hash: None,
            is_flagged: false,
            flag_reason: None,
            location: submission.location,
        };

        if let Some(photo) = &submission.photo {
            let village = self.locations.get_village(project.village_id)?;
            let verdict = self.checker.check(
                &self.feedback,
                &self.store,
                &PhotoSubmission {
                    file_name: &photo.file_name,
                    bytes: &photo.bytes,
                    location: submission.location,
                    village: village.as_ref(),
                    captured_at,
                },
            )?;
            record.image_path = Some(verdict.stored_path);
            record.image_hash = Some(verdict.image_hash);
            record.is_flagged = verdict.flagged;
            record.flag_reason = verdict.flag_reason;
        }

        let id = self.feedback.create_feedback(&record)?;
        info!(
            "event=feedback_submit module=service status=ok feedback_id={} project_id={} flagged={} has_photo={}",
            id,
            project_id,
            record.is_flagged,
            submission.photo.is_some()
        );

        self.feedback
            .get_feedback(id)?
            .ok_or(FeedbackServiceError::InconsistentState(
                "created feedback not found in read-back",
            ))
    }

    pub fn list_project_feedback(&self, project_id: ProjectId) -> RepoResult<Vec<Feedback>> {
        self.feedback.list_feedback_for_project(project_id)
    }

    /// Low-rated (`<= 3`) or flagged feedback for every project in a village.
    pub fn list_problematic(&self, village_id: VillageId) -> RepoResult<Vec<ProblematicFeedback>> {
        self.feedback.list_problematic(village_id)
    }
}
