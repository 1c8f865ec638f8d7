//! Feedback photo integrity checks.
//!
//! # Responsibility
//! - Run the duplicate, manipulation and geofence gates over one upload.
//! - Store the upload and stamp a capture overlay onto the stored copy.
//!
//! # Invariants
//! - Gates run in fixed order; the first gate that flags suppresses the rest.
//! - Annotation runs regardless of the flag outcome and never fails the check.
//! - Undecodable images degrade to "not flagged by this gate"; only duplicate
//!   lookup and storage write failures surface to the caller.

mod geofence;
mod hashing;
mod heuristics;
mod overlay;

use crate::model::location::{GeoPoint, Village};
use crate::repo::feedback_repo::FeedbackRepository;
use crate::repo::RepoError;
use crate::storage::{FileStore, StorageError};
use chrono::NaiveDateTime;
use log::{info, warn};
use serde::{Deserialize, Serialize};
use std::error::Error;
use std::fmt::{Display, Formatter};

pub use geofence::{exceeds_radius, haversine_km, EARTH_RADIUS_KM};
pub use hashing::content_hash;
pub use heuristics::inspect_photo;
pub use overlay::{annotate, overlay_lines, OverlayError};

pub const DUPLICATE_REASON: &str = "Duplicate Photo Detected";
pub const DEFAULT_GEOFENCE_RADIUS_KM: f64 = 0.5;

/// Gate that produced a flag.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum IntegrityGate {
    Duplicate,
    Manipulation,
    Geofence,
}

impl IntegrityGate {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Duplicate => "duplicate",
            Self::Manipulation => "manipulation",
            Self::Geofence => "geofence",
        }
    }
}

/// Tunables for the manipulation and geofence gates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct IntegrityPolicy {
    /// Flag when the photo is strictly farther than this from the village.
    pub geofence_radius_km: f64,
    /// Square edge lengths typical of generated images.
    pub suspicious_dimensions: Vec<u32>,
    /// Lowercase keywords matched against the EXIF `Software` tag.
    pub editing_tools: Vec<String>,
}

impl Default for IntegrityPolicy {
    fn default() -> Self {
        Self {
            geofence_radius_km: DEFAULT_GEOFENCE_RADIUS_KM,
            suspicious_dimensions: vec![512, 1024],
            editing_tools: vec!["adobe".to_string(), "gimp".to_string()],
        }
    }
}

/// Content-addressed lookup of previously stored photos.
pub trait DuplicateLookup {
    fn image_hash_exists(&self, image_hash: &str) -> Result<bool, RepoError>;
}

impl<T: FeedbackRepository + ?Sized> DuplicateLookup for T {
    fn image_hash_exists(&self, image_hash: &str) -> Result<bool, RepoError> {
        self.feedback_with_hash_exists(image_hash)
    }
}

/// One uploaded photo plus the context the gates need.
#[derive(Debug, Clone)]
pub struct PhotoSubmission<'a> {
    pub file_name: &'a str,
    pub bytes: &'a [u8],
    pub location: Option<GeoPoint>,
    /// Village of the project the feedback targets.
    pub village: Option<&'a Village>,
    pub captured_at: NaiveDateTime,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IntegrityVerdict {
    /// SHA-256 hex of the raw upload, before annotation.
    pub image_hash: String,
    pub stored_path: String,
    pub flagged: bool,
    pub flag_reason: Option<String>,
    pub flagged_by: Option<IntegrityGate>,
    /// Whether the overlay was written back to the stored file.
    pub annotated: bool,
}

#[derive(Debug)]
pub enum IntegrityError {
    Lookup(RepoError),
    Storage(StorageError),
}

impl Display for IntegrityError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Lookup(err) => write!(f, "duplicate lookup failed: {err}"),
            Self::Storage(err) => write!(f, "photo storage failed: {err}"),
        }
    }
}

impl Error for IntegrityError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Lookup(err) => Some(err),
            Self::Storage(err) => Some(err),
        }
    }
}

impl From<RepoError> for IntegrityError {
    fn from(value: RepoError) -> Self {
        Self::Lookup(value)
    }
}

impl From<StorageError> for IntegrityError {
    fn from(value: StorageError) -> Self {
        Self::Storage(value)
    }
}

/// Stateless gate pipeline configured by an [`IntegrityPolicy`].
#[derive(Debug, Clone, Default)]
pub struct IntegrityChecker {
    policy: IntegrityPolicy,
}

impl IntegrityChecker {
    pub fn new(policy: IntegrityPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &IntegrityPolicy {
        &self.policy
    }

    /// Runs all gates for one submission and stores the (annotated) photo.
    ///
    /// # Errors
    /// - `IntegrityError::Lookup` when the duplicate query fails.
    /// - `IntegrityError::Storage` when the upload cannot be saved.
    pub fn check<L, S>(
        &self,
        lookup: &L,
        store: &S,
        submission: &PhotoSubmission<'_>,
    ) -> Result<IntegrityVerdict, IntegrityError>
    where
        L: DuplicateLookup + ?Sized,
        S: FileStore + ?Sized,
    {
        let image_hash = content_hash(submission.bytes);

        let mut outcome = if lookup.image_hash_exists(&image_hash)? {
            Some((IntegrityGate::Duplicate, DUPLICATE_REASON.to_string()))
        } else {
            None
        };

        let stored_path = store.save(submission.file_name, submission.bytes)?;

        if outcome.is_none() {
            outcome = inspect_photo(submission.bytes, &self.policy)
                .map(|reasons| (IntegrityGate::Manipulation, format!("AI Flag: {reasons}")));
        }

        if outcome.is_none() {
            outcome = self
                .geofence_reason(submission)
                .map(|reason| (IntegrityGate::Geofence, reason));
        }

        if let Some((gate, reason)) = &outcome {
            info!(
                "event=integrity_check module=integrity status=flagged gate={} path={}",
                gate.as_str(),
                stored_path
            );
            log::debug!("event=integrity_check module=integrity reason={reason}");
        } else {
            info!(
                "event=integrity_check module=integrity status=ok path={}",
                stored_path
            );
        }

        let annotated = annotate_stored(store, &stored_path, submission);
        let (flagged_by, flag_reason) = match outcome {
            Some((gate, reason)) => (Some(gate), Some(reason)),
            None => (None, None),
        };

        Ok(IntegrityVerdict {
            image_hash,
            stored_path,
            flagged: flagged_by.is_some(),
            flag_reason,
            flagged_by,
            annotated,
        })
    }

    fn geofence_reason(&self, submission: &PhotoSubmission<'_>) -> Option<String> {
        let photo = submission.location?;
        let village = submission.village?;
        let reference = village.location?;

        let distance = haversine_km(photo, reference);
        if exceeds_radius(distance, self.policy.geofence_radius_km) {
            Some(format!(
                "Out of Bounds: Photo taken {distance:.2}km away from {}",
                village.name
            ))
        } else {
            None
        }
    }
}

fn annotate_stored<S: FileStore + ?Sized>(
    store: &S,
    stored_path: &str,
    submission: &PhotoSubmission<'_>,
) -> bool {
    let result = store
        .read(stored_path)
        .map_err(|err| err.to_string())
        .and_then(|bytes| {
            annotate(&bytes, submission.captured_at, submission.location)
                .map_err(|err| err.to_string())
        })
        .and_then(|annotated| {
            store
                .overwrite(stored_path, &annotated)
                .map_err(|err| err.to_string())
        });

    match result {
        Ok(()) => true,
        Err(err) => {
            warn!(
                "event=photo_overlay module=integrity status=error path={} error={}",
                stored_path, err
            );
            false
        }
    }
}
