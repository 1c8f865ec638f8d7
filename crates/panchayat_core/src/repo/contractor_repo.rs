//! Contractor and contractor-update repository.
//!
//! # Invariants
//! - Recording an update and bumping `projects.spent` happen in one transaction.
//! - Deleting a contractor unlinks its projects and drops its updates atomically.
//! - Update lists are newest first (`id DESC`).

use crate::model::contractor::{
    validate_pin, Contractor, ContractorId, ContractorUpdate, ContractorUpdateId, NewContractor,
    NewContractorUpdate, SUBMISSION_FORMAT,
};
use crate::model::project::ProjectId;
use crate::repo::{
    date_to_db, parse_db_date, RegionScope, RepoError, RepoResult, SCOPED_PROJECTS_FROM,
};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension, Row};

const UPDATE_COLUMNS: &str = "u.id,
    u.project_id,
    u.contractor_id,
    u.amount_spent,
    u.description,
    u.bill_image_path,
    u.work_image_path,
    u.expected_completion_date,
    u.submission_date";

pub trait ContractorRepository {
    fn create_contractor(&self, contractor: &NewContractor) -> RepoResult<ContractorId>;
    fn get_contractor(&self, id: ContractorId) -> RepoResult<Option<Contractor>>;
    fn list_contractors(&self) -> RepoResult<Vec<Contractor>>;
    fn set_pin(&self, id: ContractorId, pin: &str) -> RepoResult<()>;
    fn delete_contractor(&self, id: ContractorId) -> RepoResult<()>;
    fn record_update(&self, update: &NewContractorUpdate) -> RepoResult<ContractorUpdateId>;
    fn list_updates_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<ContractorUpdate>>;
    fn list_updates(&self, scope: RegionScope, limit: u32) -> RepoResult<Vec<ContractorUpdate>>;
    fn latest_update_for_project(&self, project_id: ProjectId)
        -> RepoResult<Option<ContractorUpdate>>;
}

pub struct SqliteContractorRepository<'conn> {
    conn: &'conn Connection,
}

impl<'conn> SqliteContractorRepository<'conn> {
    pub fn new(conn: &'conn Connection) -> Self {
        Self { conn }
    }

    fn query_updates(&self, sql: &str, bind_values: Vec<Value>) -> RepoResult<Vec<ContractorUpdate>> {
        let mut stmt = self.conn.prepare(sql)?;
        let mut rows = stmt.query(params_from_iter(bind_values))?;
        let mut updates = Vec::new();
        while let Some(row) = rows.next()? {
            updates.push(parse_update_row(row)?);
        }
        Ok(updates)
    }
}

impl ContractorRepository for SqliteContractorRepository<'_> {
    fn create_contractor(&self, contractor: &NewContractor) -> RepoResult<ContractorId> {
        contractor.validate()?;

        self.conn.execute(
            "INSERT INTO contractors (name, company, phone) VALUES (?1, ?2, ?3);",
            params![
                contractor.name.trim(),
                contractor.company.as_deref(),
                contractor.phone.as_deref(),
            ],
        )?;
        Ok(self.conn.last_insert_rowid())
    }

    fn get_contractor(&self, id: ContractorId) -> RepoResult<Option<Contractor>> {
        let contractor = self
            .conn
            .query_row(
                "SELECT id, name, company, phone, performance, pin FROM contractors WHERE id = ?1;",
                [id],
                map_contractor_row,
            )
            .optional()?;
        Ok(contractor)
    }

    fn list_contractors(&self) -> RepoResult<Vec<Contractor>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, company, phone, performance, pin FROM contractors ORDER BY id ASC;",
        )?;
        let contractors = stmt
            .query_map([], map_contractor_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(contractors)
    }

    fn set_pin(&self, id: ContractorId, pin: &str) -> RepoResult<()> {
        validate_pin(pin)?;
        let changed = self.conn.execute(
            "UPDATE contractors SET pin = ?1 WHERE id = ?2;",
            params![pin, id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("contractor", id));
        }
        Ok(())
    }

    fn delete_contractor(&self, id: ContractorId) -> RepoResult<()> {
        let tx = self.conn.unchecked_transaction()?;
        tx.execute(
            "UPDATE projects SET contractor_id = NULL WHERE contractor_id = ?1;",
            [id],
        )?;
        tx.execute("DELETE FROM contractor_updates WHERE contractor_id = ?1;", [id])?;
        let changed = tx.execute("DELETE FROM contractors WHERE id = ?1;", [id])?;
        if changed == 0 {
            return Err(RepoError::not_found("contractor", id));
        }
        tx.commit()?;
        Ok(())
    }

    fn record_update(&self, update: &NewContractorUpdate) -> RepoResult<ContractorUpdateId> {
        update.validate()?;

        let tx = self.conn.unchecked_transaction()?;
        let changed = tx.execute(
            "UPDATE projects SET spent = spent + ?1 WHERE id = ?2;",
            params![update.amount_spent, update.project_id],
        )?;
        if changed == 0 {
            return Err(RepoError::not_found("project", update.project_id));
        }

        tx.execute(
            "INSERT INTO contractor_updates (
                project_id,
                contractor_id,
                amount_spent,
                description,
                bill_image_path,
                work_image_path,
                expected_completion_date,
                submission_date
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8);",
            params![
                update.project_id,
                update.contractor_id,
                update.amount_spent,
                update.description.as_deref(),
                update.bill_image_path.as_deref(),
                update.work_image_path.as_deref(),
                date_to_db(update.expected_completion_date),
                update.submission_date.format(SUBMISSION_FORMAT).to_string(),
            ],
        )?;
        let id = tx.last_insert_rowid();
        tx.commit()?;
        Ok(id)
    }

    fn list_updates_for_project(&self, project_id: ProjectId) -> RepoResult<Vec<ContractorUpdate>> {
        self.query_updates(
            &format!(
                "SELECT {UPDATE_COLUMNS}
                 FROM contractor_updates u
                 WHERE u.project_id = ?
                 ORDER BY u.id DESC"
            ),
            vec![Value::Integer(project_id)],
        )
    }

    fn list_updates(&self, scope: RegionScope, limit: u32) -> RepoResult<Vec<ContractorUpdate>> {
        let mut sql = format!(
            "SELECT {UPDATE_COLUMNS}
             FROM contractor_updates u
             JOIN {SCOPED_PROJECTS_FROM}
             WHERE p.id = u.project_id"
        );
        let mut bind_values = Vec::new();
        if let Some((predicate, id)) = scope.predicate() {
            sql.push_str(" AND ");
            sql.push_str(predicate);
            bind_values.push(Value::Integer(id));
        }
        sql.push_str(" ORDER BY u.id DESC LIMIT ?");
        bind_values.push(Value::Integer(i64::from(limit)));

        self.query_updates(&sql, bind_values)
    }

    fn latest_update_for_project(
        &self,
        project_id: ProjectId,
    ) -> RepoResult<Option<ContractorUpdate>> {
        let mut updates = self.query_updates(
            &format!(
                "SELECT {UPDATE_COLUMNS}
                 FROM contractor_updates u
                 WHERE u.project_id = ?
                 ORDER BY u.id DESC
                 LIMIT 1"
            ),
            vec![Value::Integer(project_id)],
        )?;
        Ok(updates.pop())
    }
}

fn map_contractor_row(row: &Row<'_>) -> rusqlite::Result<Contractor> {
    Ok(Contractor {
        id: row.get(0)?,
        name: row.get(1)?,
        company: row.get(2)?,
        phone: row.get(3)?,
        performance: row.get(4)?,
        pin: row.get(5)?,
    })
}

fn parse_update_row(row: &Row<'_>) -> RepoResult<ContractorUpdate> {
    let submitted_text: String = row.get("submission_date")?;
    let submission_date = NaiveDateTime::parse_from_str(&submitted_text, SUBMISSION_FORMAT)
        .map_err(|_| {
            RepoError::InvalidData(format!(
                "invalid submission date `{submitted_text}` in contractor_updates.submission_date"
            ))
        })?;

    Ok(ContractorUpdate {
        id: row.get("id")?,
        project_id: row.get("project_id")?,
        contractor_id: row.get("contractor_id")?,
        amount_spent: row.get("amount_spent")?,
        description: row.get("description")?,
        bill_image_path: row.get("bill_image_path")?,
        work_image_path: row.get("work_image_path")?,
        expected_completion_date: parse_db_date(
            row.get("expected_completion_date")?,
            "contractor_updates.expected_completion_date",
        )?,
        submission_date,
    })
}
