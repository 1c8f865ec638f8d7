//! Domain model for villages, contractors, projects and citizen feedback.
//!
//! # Responsibility
//! - Define canonical data structures used by core business logic.
//! - Validate scalar invariants before rows reach persistence.
//!
//! # Invariants
//! - Every persisted entity is identified by a SQLite integer row id.
//! - Currency amounts are finite and non-negative.

use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod contractor;
pub mod feedback;
pub mod location;
pub mod project;

/// Validation failure for an entity field.
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// Required text field is blank after trim.
    BlankField(&'static str),
    /// Numeric field is NaN or infinite.
    NonFinite(&'static str),
    /// Currency amount is below zero.
    NegativeAmount { field: &'static str, value: f64 },
    /// Progress is outside `0..=100`.
    ProgressOutOfRange(f64),
    /// Rating is outside `1..=5`.
    RatingOutOfRange(i64),
    /// Latitude/longitude outside the WGS84 range.
    CoordinateOutOfRange { latitude: f64, longitude: f64 },
    /// PIN is not 4-6 ASCII digits.
    InvalidPin,
}

impl Display for ValidationError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::BlankField(field) => write!(f, "{field} must not be blank"),
            Self::NonFinite(field) => write!(f, "{field} must be a finite number"),
            Self::NegativeAmount { field, value } => {
                write!(f, "{field} must be >= 0, got {value}")
            }
            Self::ProgressOutOfRange(value) => {
                write!(f, "progress_percent must be within 0..=100, got {value}")
            }
            Self::RatingOutOfRange(value) => {
                write!(f, "rating must be within 1..=5, got {value}")
            }
            Self::CoordinateOutOfRange {
                latitude,
                longitude,
            } => write!(f, "coordinate out of range: lat={latitude} lng={longitude}"),
            Self::InvalidPin => write!(f, "pin must be 4-6 digits"),
        }
    }
}

impl Error for ValidationError {}

pub(crate) fn ensure_amount(field: &'static str, value: f64) -> Result<(), ValidationError> {
    if !value.is_finite() {
        return Err(ValidationError::NonFinite(field));
    }
    if value < 0.0 {
        return Err(ValidationError::NegativeAmount { field, value });
    }
    Ok(())
}

pub(crate) fn ensure_not_blank(field: &'static str, value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::BlankField(field));
    }
    Ok(())
}
