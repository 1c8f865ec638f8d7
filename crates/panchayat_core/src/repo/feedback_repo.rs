//! Feedback repository contracts and SQLite implementation.
//!
//! # Invariants
//! - `image_hash` is written once on insert and only used for equality lookup.
//! - Problematic feedback means `rating <= 3` or flagged.

use crate::model::feedback::{
    Feedback, FeedbackId, NewFeedback, ProblematicFeedback, COMPLAINT_RATING_MAX,
    NEGATIVE_RATING_MAX,
};
use crate::model::location::{GeoPoint, VillageId};
use crate::model::project::ProjectId;
use crate::repo::{
    bool_to_int, int_to_bool, RegionScope, RepoError, RepoResult, SCOPED_PROJECTS_FROM,
};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const FEEDBACK_COLUMNS: &str = "f.id,
    f.project_id,
    f.rating,
    f.comment,
    f.image_path,
    f.image_hash,
    f.is_flagged,
    f.flag_reason,
    f.latitude,
    f.longitude";

pub trait FeedbackRepository {
    fn create_feedback(&self, feedback: &NewFeedback) -> RepoResult<FeedbackId>;
    fn get_feedback(&self, id: FeedbackId) -> RepoResult<Option<Feedback>>;
    fn list_feedback_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Feedback>>;
    /// Exact content-hash match against any stored feedback.
    fn feedback_with_hash_exists(&self, image_hash: &str) -> RepoResult<bool>;
    /// Feedback rows with `rating <= 2` for one project.
    fn count_negative_feedback(&self, project_id: ProjectId) -> RepoResult<u32>;
    fn list_problematic(&self, village_id: VillageId) -> RepoResult<Vec<ProblematicFeedback>>;
    /// Counts `rating <= 3`, plus flagged rows when `include_flagged`.
    fn count_complaints(&self, scope: RegionScope, include_flagged: bool) -> RepoResult<u64>;
}

pub struct SqliteFeedbackRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteFeedbackRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl FeedbackRepository for SqliteFeedbackRepository<'_> {
    fn create_feedback(&self, feedback: &NewFeedback) -> RepoResult<FeedbackId> {
        feedback.validate()?;

        self.conn.execute(
            "INSERT INTO feedbacks (
                project_id,
                rating,
                comment,
                image_path,
                image_hash,
                is_flagged,
                flag_reason,
                latitude,
                longitude
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9);",
            params![
                feedback.project_id,
                feedback.rating,
                feedback.comment.as_str(),
                feedback.image_path.as_deref(),
                feedback.image_hash.as_deref(),
                bool_to_int(feedback.is_flagged),
                feedback.flag_reason.as_deref(),
                feedback.location.map(|point| point.latitude),
                feedback.location.map(|point| point.longitude),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_feedback(&self, id: FeedbackId) -> RepoResult<Option<Feedback>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {FEEDBACK_COLUMNS} FROM feedbacks f WHERE f.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_feedback_row(row)?));
        }
        Ok(None)
    }

    fn list_feedback_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<Feedback>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FEEDBACK_COLUMNS}
             FROM feedbacks f
             WHERE f.project_id = ?1
             ORDER BY f.id ASC;"
        ))?;
        let mut rows = stmt.query([project_id])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(parse_feedback_row(row)?);
        }
        Ok(items)
    }

    fn feedback_with_hash_exists(&self, image_hash: &str) -> RepoResult<bool> {
        let exists: i64 = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM feedbacks WHERE image_hash = ?1);",
            [image_hash],
            |row| row.get(0),
        )?;
        Ok(exists == 1)
    }

    fn count_negative_feedback(&self, project_id: ProjectId) -> RepoResult<u32> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM feedbacks WHERE project_id = ?1 AND rating <= ?2;",
            params![project_id, NEGATIVE_RATING_MAX],
            |row| row.get(0),
        )?;
        u32::try_from(count)
            .map_err(|_| RepoError::InvalidData(format!("negative feedback count {count}")))
    }

    fn list_problematic(&self, village_id: VillageId) -> RepoResult<Vec<ProblematicFeedback>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {FEEDBACK_COLUMNS}, p.name AS project_name
             FROM feedbacks f
             JOIN projects p ON p.id = f.project_id
             WHERE p.village_id = ?1
               AND (f.rating <= ?2 OR f.is_flagged = 1)
             ORDER BY f.id ASC;"
        ))?;
        let mut rows = stmt.query(params![village_id, COMPLAINT_RATING_MAX])?;
        let mut items = Vec::new();
        while let Some(row) = rows.next()? {
            items.push(ProblematicFeedback {
                feedback: parse_feedback_row(row)?,
                project_name: row.get("project_name")?,
            });
        }
        Ok(items)
    }

    fn count_complaints(&self, scope: RegionScope, include_flagged: bool) -> RepoResult<u64> {
        let mut sql = format!(
            "SELECT COUNT(*) FROM feedbacks f JOIN {SCOPED_PROJECTS_FROM} WHERE p.id = f.project_id"
        );
        let mut bind_values = Vec::new();

        if include_flagged {
            sql.push_str(" AND (f.rating <= ? OR f.is_flagged = 1)");
        } else {
            sql.push_str(" AND f.rating <= ?");
        }
        bind_values.push(Value::Integer(i64::from(COMPLAINT_RATING_MAX)));

        if let Some((predicate, id)) = scope.predicate() {
            sql.push_str(" AND ");
            sql.push_str(predicate);
            bind_values.push(Value::Integer(id));
        }

        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }
}

fn parse_feedback_row(row: &Row<'_>) -> RepoResult<Feedback> {
    let rating: i64 = row.get("rating")?;
    let rating = crate::model::feedback::validate_rating(rating)?;

    let latitude: Option<f64> = row.get("latitude")?;
    let longitude: Option<f64> = row.get("longitude")?;

    Ok(Feedback {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        rating,
        comment: row.get("comment")?,
        image_path: row.get("image_path")?,
        image_hash: row.get("image_hash")?,
        is_flagged: int_to_bool(row.get("is_flagged")?, "feedbacks.is_flagged")?,
        flag_reason: row.get("flag_reason")?,
        location: GeoPoint::from_parts(latitude, longitude),
    })
}
