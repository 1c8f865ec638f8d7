//! Administrative location hierarchy: state -> district -> block -> village.

use crate::model::{ensure_not_blank, ValidationError};
use serde::{Deserialize, Serialize};

pub type StateId = i64;
pub type DistrictId = i64;
pub type BlockId = i64;
pub type VillageId = i64;

/// WGS84 coordinate pair in decimal degrees.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GeoPoint {
    pub latitude: f64,
    pub longitude: f64,
}

impl GeoPoint {
    pub fn new(latitude: f64, longitude: f64) -> Self {
        Self {
            latitude,
            longitude,
        }
    }

    /// Rejects NaN and values outside `[-90, 90] x [-180, 180]`.
    pub fn validate(&self) -> Result<(), ValidationError> {
        let in_range = self.latitude.is_finite()
            && self.longitude.is_finite()
            && (-90.0..=90.0).contains(&self.latitude)
            && (-180.0..=180.0).contains(&self.longitude);
        if in_range {
            Ok(())
        } else {
            Err(ValidationError::CoordinateOutOfRange {
                latitude: self.latitude,
                longitude: self.longitude,
            })
        }
    }

    /// Builds a point only when both halves are present.
    pub fn from_parts(latitude: Option<f64>, longitude: Option<f64>) -> Option<Self> {
        match (latitude, longitude) {
            (Some(latitude), Some(longitude)) => Some(Self::new(latitude, longitude)),
            _ => None,
        }
    }
}

/// Id + name pair used for states, districts and blocks.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Region {
    pub id: i64,
    pub name: String,
    /// Parent region id; `None` for states.
    pub parent_id: Option<i64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Village {
    pub id: VillageId,
    pub name: String,
    pub block_id: BlockId,
    /// Reference point used by the feedback geofence.
    pub location: Option<GeoPoint>,
}

impl Village {
    pub fn validate(&self) -> Result<(), ValidationError> {
        ensure_not_blank("village.name", &self.name)?;
        if let Some(location) = &self.location {
            location.validate()?;
        }
        Ok(())
    }
}
