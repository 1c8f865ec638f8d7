//! Citizen feedback model.
//!
//! # Invariants
//! - `rating` is within `1..=5`.
//! - `image_hash`, once set, is never rewritten (enforced by a storage trigger).

use crate::model::location::GeoPoint;
use crate::model::project::ProjectId;
use crate::model::ValidationError;
use serde::{Deserialize, Serialize};

pub type FeedbackId = i64;

pub const MIN_RATING: u8 = 1;
pub const MAX_RATING: u8 = 5;
/// Ratings at or below this count toward the negative-feedback risk factor.
pub const NEGATIVE_RATING_MAX: u8 = 2;
/// Ratings at or below this count as complaints on dashboards.
pub const COMPLAINT_RATING_MAX: u8 = 3;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Feedback {
    pub id: FeedbackId,
    pub project_id: ProjectId,
    pub rating: u8,
    pub comment: String,
    pub image_path: Option<String>,
    pub image_hash: Option<String>,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub location: Option<GeoPoint>,
}

/// Insert shape for one feedback row, produced after integrity checks ran.
#[derive(Debug, Clone, PartialEq)]
pub struct NewFeedback {
    pub project_id: ProjectId,
    pub rating: u8,
    pub comment: String,
    pub image_path: Option<String>,
    pub image_hash: Option<String>,
    pub is_flagged: bool,
    pub flag_reason: Option<String>,
    pub location: Option<GeoPoint>,
}

impl NewFeedback {
    pub fn validate(&self) -> Result<(), ValidationError> {
        validate_rating(i64::from(self.rating))?;
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}

/// Feedback joined with the name of the project it belongs to.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProblematicFeedback {
    #[serde(flatten)]
    pub feedback: Feedback,
    pub project_name: String,
}

/// Checks a raw rating before narrowing it to `u8`.
pub fn validate_rating(rating: i64) -> Result<u8, ValidationError> {
    if rating < i64::from(MIN_RATING) || rating > i64::from(MAX_RATING) {
        return Err(ValidationError::RatingOutOfRange(rating));
    }
    u8::try_from(rating).map_err(|_| ValidationError::RatingOutOfRange(rating))
}

#[cfg(test)]
mod tests {
    use super::validate_rating;

    #[test]
    fn rating_bounds_are_inclusive() {
        assert_eq!(validate_rating(1), Ok(1));
        assert_eq!(validate_rating(5), Ok(5));
        assert!(validate_rating(0).is_err());
        assert!(validate_rating(6).is_err());
        assert!(validate_rating(-3).is_err());
    }
}
