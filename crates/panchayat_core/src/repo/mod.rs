//! Repository layer abstractions and SQLite implementations.
//!
//! # Responsibility
//! - Define use-case oriented data access contracts per entity.
//! - Isolate SQL details from service orchestration.
//!
//! # Invariants
//! - Write paths validate entities before SQL mutations.
//! - Read paths reject invalid persisted state instead of masking it.
//! - Repository APIs return semantic errors (`NotFound`) in addition to DB
//!   transport errors.

use crate::db::DbError;
use crate::model::ValidationError;
use chrono::NaiveDate;
use std::error::Error;
use std::fmt::{Display, Formatter};

pub mod contractor_repo;
pub mod feedback_repo;
pub mod location_repo;
pub mod project_repo;

const DATE_FORMAT: &str = "%Y-%m-%d";

pub type RepoResult<T> = Result<T, RepoError>;

#[derive(Debug)]
pub enum RepoError {
    Validation(ValidationError),
    Db(DbError),
    NotFound { entity: &'static str, id: i64 },
    InvalidData(String),
}

impl RepoError {
    pub(crate) fn not_found(entity: &'static str, id: i64) -> Self {
        Self::NotFound { entity, id }
    }
}

impl Display for RepoError {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Validation(err) => write!(f, "{err}"),
            Self::Db(err) => write!(f, "{err}"),
            Self::NotFound { entity, id } => write!(f, "{entity} not found: {id}"),
            Self::InvalidData(message) => write!(f, "invalid persisted data: {message}"),
        }
    }
}

impl Error for RepoError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Validation(err) => Some(err),
            Self::Db(err) => Some(err),
            Self::NotFound { .. } | Self::InvalidData(_) => None,
        }
    }
}

impl From<ValidationError> for RepoError {
    fn from(value: ValidationError) -> Self {
        Self::Validation(value)
    }
}

impl From<DbError> for RepoError {
    fn from(value: DbError) -> Self {
        Self::Db(value)
    }
}

impl From<rusqlite::Error> for RepoError {
    fn from(value: rusqlite::Error) -> Self {
        Self::Db(DbError::Sqlite(value))
    }
}

/// Administrative scope for aggregate queries.
///
/// Built from optional filters with precedence village > block > district > state.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum RegionScope {
    #[default]
    All,
    State(i64),
    District(i64),
    Block(i64),
    Village(i64),
}

impl RegionScope {
    pub fn from_filters(
        state_id: Option<i64>,
        district_id: Option<i64>,
        block_id: Option<i64>,
        village_id: Option<i64>,
    ) -> Self {
        if let Some(id) = village_id {
            Self::Village(id)
        } else if let Some(id) = block_id {
            Self::Block(id)
        } else if let Some(id) = district_id {
            Self::District(id)
        } else if let Some(id) = state_id {
            Self::State(id)
        } else {
            Self::All
        }
    }

    /// SQL predicate over the `p`/`v`/`b`/`d` aliases of [`SCOPED_PROJECTS_FROM`].
    pub(crate) fn predicate(self) -> Option<(&'static str, i64)> {
        match self {
            Self::All => None,
            Self::State(id) => Some(("d.state_id = ?", id)),
            Self::District(id) => Some(("b.district_id = ?", id)),
            Self::Block(id) => Some(("v.block_id = ?", id)),
            Self::Village(id) => Some(("p.village_id = ?", id)),
        }
    }
}

/// Join chain from projects up to their district.
pub(crate) const SCOPED_PROJECTS_FROM: &str = "projects p
    JOIN villages v ON v.id = p.village_id
    JOIN blocks b ON b.id = v.block_id
    JOIN districts d ON d.id = b.district_id";

pub(crate) fn date_to_db(date: Option<NaiveDate>) -> Option<String> {
    date.map(|value| value.format(DATE_FORMAT).to_string())
}

pub(crate) fn parse_db_date(value: Option<String>, column: &str) -> RepoResult<Option<NaiveDate>> {
    value
        .map(|text| {
            NaiveDate::parse_from_str(&text, DATE_FORMAT).map_err(|_| {
                RepoError::InvalidData(format!("invalid date `{text}` in {column}"))
            })
        })
        .transpose()
}

pub(crate) fn bool_to_int(value: bool) -> i64 {
    if value {
        1
    } else {
        0
    }
}

pub(crate) fn int_to_bool(value: i64, column: &str) -> RepoResult<bool> {
    match value {
        0 => Ok(false),
        1 => Ok(true),
        other => Err(RepoError::InvalidData(format!(
            "invalid boolean value `{other}` in {column}"
        ))),
    }
}

#[cfg(test)]
mod tests {
    use super::RegionScope;

    #[test]
    fn narrowest_filter_wins() {
        assert_eq!(
            RegionScope::from_filters(Some(1), Some(2), Some(3), Some(4)),
            RegionScope::Village(4)
        );
        assert_eq!(
            RegionScope::from_filters(Some(1), Some(2), None, None),
            RegionScope::District(2)
        );
        assert_eq!(RegionScope::from_filters(None, None, None, None), RegionScope::All);
    }
}
