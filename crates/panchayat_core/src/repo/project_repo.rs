//! Project repository contracts and SQLite implementation.
//!
//! # Responsibility
//! - Provide CRUD over `projects` plus scoped listing for dashboards.
//! - Persist risk write-backs without touching other columns.
//!
//! # Invariants
//! - Create/update validate the project before SQL mutations.
//! - List order is `id ASC` so dashboards are stable.

use crate::model::contractor::ContractorId;
use crate::model::location::VillageId;
use crate::model::project::{NewProject, Project, ProjectId, ProjectStatus};
use crate::repo::{
    date_to_db, parse_db_date, RegionScope, RepoError, RepoResult, SCOPED_PROJECTS_FROM,
};
use crate::risk::RiskLevel;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, Row};

const PROJECT_COLUMNS: &str = "p.id,
    p.village_id,
    p.contractor_id,
    p.name,
    p.description,
    p.status,
    p.budget,
    p.spent,
    p.progress_percent,
    p.risk_score,
    p.risk_level,
    p.start_year,
    p.duration_months,
    p.planned_end_date,
    p.actual_end_date";

/// Filters for listing projects. All filters combine with `AND`.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ProjectListQuery {
    pub scope: RegionScope,
    pub contractor_id: Option<ContractorId>,
    pub status: Option<ProjectStatus>,
}

impl ProjectListQuery {
    pub fn village(village_id: VillageId) -> Self {
        Self {
            scope: RegionScope::Village(village_id),
            ..Self::default()
        }
    }

    pub fn contractor(contractor_id: ContractorId) -> Self {
        Self {
            contractor_id: Some(contractor_id),
            ..Self::default()
        }
    }
}

pub trait ProjectRepository {
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId>;
    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>>;
    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>>;
    fn count_projects(&self, query: &ProjectListQuery) -> RepoResult<u64>;
    /// Rewrites all mutable columns; risk columns are left alone.
    fn update_project(&self, project: &Project) -> RepoResult<()>;
    fn delete_project(&self, id: ProjectId) -> RepoResult<()>;
    fn set_risk(&self, id: ProjectId, score: f64, level: RiskLevel) -> RepoResult<()>;
    fn assign_contractor(&self, id: ProjectId, contractor_id: ContractorId) -> RepoResult<()>;
}

pub struct SqliteProjectRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteProjectRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }
}

impl ProjectRepository for SqliteProjectRepository<'_> {
    fn create_project(&self, project: &NewProject) -> RepoResult<ProjectId> {
        project.validate()?;

        self.conn.execute(
            "INSERT INTO projects (
                village_id,
                contractor_id,
                name,
                description,
                status,
                budget,
                spent,
                progress_percent,
                start_year,
                duration_months,
                planned_end_date,
                actual_end_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12);",
            params![
                project.village_id,
                project.contractor_id,
                project.name.trim(),
                project.description.as_deref(),
                project.status.as_str(),
                project.budget,
                project.spent,
                project.progress_percent,
                project.start_year,
                project.duration_months,
                date_to_db(project.planned_end_date),
                date_to_db(project.actual_end_date),
            ],
        )?;

        Ok(self.conn.last_insert_rowid())
    }

    fn get_project(&self, id: ProjectId) -> RepoResult<Option<Project>> {
        let mut stmt = self
            .conn
            .prepare(&format!("SELECT {PROJECT_COLUMNS} FROM projects p WHERE p.id = ?1;"))?;
        let mut rows = stmt.query([id])?;
        if let Some(row) = rows.next()? {
            return Ok(Some(parse_project_row(row)?));
        }
        Ok(None)
    }

    fn list_projects(&self, query: &ProjectListQuery) -> RepoResult<Vec<Project>> {
        let (filter, bind_values) = build_filter(query);
        let sql = format!(
            "SELECT {PROJECT_COLUMNS} FROM {SCOPED_PROJECTS_FROM}{filter} ORDER BY p.id ASC"
        );

        let mut stmt = self.conn.prepare(&sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut projects = Vec::new();
        while let Some(row) = rows.next()? {
            projects.push(parse_project_row(row)?);
        }
        Ok(projects)
    }

    fn count_projects(&self, query: &ProjectListQuery) -> RepoResult<u64> {
        let (filter, bind_values) = build_filter(query);
        let sql = format!("SELECT COUNT(*) FROM {SCOPED_PROJECTS_FROM}{filter}");
        let count: i64 = self
            .conn
            .query_row(&sql, params_from_iter(bind_values), |row| row.get(0))?;
        Ok(u64::try_from(count).unwrap_or_default())
    }

    fn update_project(&self, project: &Project) -> RepoResult<()> {
        project.validate()?;

        let changed = self.conn.execute(
            "UPDATE projects
             SET
                village_id = ?1,
                contractor_id = ?2,
                name = ?3,
                description = ?4,
                status = ?5,
                budget = ?6,
                spent = ?7,
                progress_percent = ?8,
                start_year = ?9,
                duration_months = ?10,
                planned_end_date = ?11,
                actual_end_date = ?12
             WHERE id = ?13;",
            params![
                project.village_id,
                project.contractor_id,
                project.name.trim(),
                project.description.as_deref(),
                project.status.as_str(),
                project.budget,
                project.spent,
                project.progress_percent,
                project.start_year,
                project.duration_months,
                date_to_db(project.planned_end_date),
                date_to_db(project.actual_end_date),
                project.id,
            ],
        )?;

        if changed == 0 {
            return Err(RepoError::not_found("project", project.id));
        }
        Ok(())
    }

    fn delete_project(&self, id: ProjectId) -> RepoResult<()> {
        let changed = self.conn.execute("DELETE FROM projects WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        Ok(())
    }

    fn set_risk(&self, id: ProjectId, score: f64, level: RiskLevel) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET risk_score = ?1, risk_level = ?2 WHERE id = ?3;",
            params![score, level.as_str(), id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        Ok(())
    }

    fn assign_contractor(&self, id: ProjectId, contractor_id: ContractorId) -> RepoResult<()> {
        let changed = self.conn.execute(
            "UPDATE projects SET contractor_id = ?1 WHERE id = ?2;",
            params![contractor_id, id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", id));
        }
        Ok(())
    }
}

fn build_filter(query: &ProjectListQuery) -> (String, Vec<Value>) {
    let mut clauses = Vec::new();
    let mut bind_values = Vec::new();

    if let Some((predicate, id)) = query.scope.predicate() {
        clauses.push(predicate);
        bind_values.push(Value::Integer(id));
    }
    if let Some(contractor_id) = query.contractor_id {
        clauses.push("p.contractor_id = ?");
        bind_values.push(Value::Integer(contractor_id));
    }
    if let Some(status) = query.status {
        clauses.push("p.status = ?");
        bind_values.push(Value::Text(status.as_str().to_string()));
    }

    if clauses.is_empty() {
        (String::new(), bind_values)
    } else {
        (format!(" WHERE {}", clauses.join(" AND ")), bind_values)
    }
}

fn parse_project_row(row: &Row<'_>) -> RepoResult<Project> {
    let status_text: String = row.get("status")?;
    let status = ProjectStatus::parse(&status_text).ok_or_else(|| {
        RepoError::InvalidData(format!("invalid status `{status_text}` in projects.status"))
    })?;

    let level_text: String = row.get("risk_level")?;
    let risk_level = RiskLevel::parse(&level_text).ok_or_else(|| {
        RepoError::InvalidData(format!(
            "invalid risk level `{level_text}` in projects.risk_level"
        ))
    })?;

    let project = Project {
        id: row.get("id")?,
        village_id: row.get("village_id")?,
        contractor_id: row.get("contractor_id")?,
        name: row.get("name")?,
        description: row.get("description")?,
        status,
        budget: row.get("budget")?,
        spent: row.get("spent")?,
        progress_percent: row.get("progress_percent")?,
        risk_score: row.get("risk_score")?,
        risk_level,
        start_year: row.get("start_year")?,
        duration_months: row.get("duration_months")?,
        planned_end_date: parse_db_date(row.get("planned_end_date")?, "projects.planned_end_date")?,
        actual_end_date: parse_db_date(row.get("actual_end_date")?, "projects.actual_end_date")?,
    };
    project.validate()?;
    Ok(project)
}
