//! Job repository: CRUD operations for the `jobs` table.

use std::path::PathBuf;

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{first_row, DatabaseError};
use crate::model::{Job, JobSecurity, JobState};

fn from_row(row: &Row<'_>) -> Result<Job, rusqlite::Error> {
    let path: Option<String> = row.get("path")?;
    Ok(Job {
        id: row.get("id")?,
        uid: row.get("uid")?,
        analysis_id: row.get("analysis_id")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        text: row.get("text")?,
        html: row.get("html")?,
        json_text: row.get("json_text")?,
        template: row.get("template")?,
        script: row.get("script")?,
        stdout_log: row.get("stdout_log")?,
        stderr_log: row.get("stderr_log")?,
        state: JobState::from_code(row.get("state")?),
        security: JobSecurity::from_code(row.get("security")?),
        start_date: row.get("start_date")?,
        end_date: row.get("end_date")?,
        path: path.map(PathBuf::from),
        owner: row.get("owner_id")?,
        deleted: row.get("deleted")?,
        valid: row.get("valid")?,
        image: row.get("image")?,
        date: row.get("date")?,
        lastedit_user: row.get("lastedit_user_id")?,
        lastedit_date: row.get("lastedit_date")?,
    })
}

fn path_column(job: &Job) -> Option<String> {
    job.path.as_ref().map(|p| p.to_string_lossy().into_owned())
}

/// Query filter parameters for job listing.
#[derive(Debug, Default, Clone)]
pub struct JobFilter {
    pub project_id: Option<i64>,
    pub analysis_id: Option<i64>,
    pub state: Option<JobState>,
    pub include_deleted: bool,
    pub limit: Option<u64>,
    pub offset: Option<u64>,
}

/// Inserts a new job row and returns its id.
pub fn insert(conn: &Connection, job: &Job) -> Result<i64, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO jobs (uid, analysis_id, project_id, name, text, html, json_text, template,
         script, stdout_log, stderr_log, state, security, start_date, end_date, path, owner_id,
         deleted, valid, image, date, lastedit_user_id, lastedit_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17,
         ?18, ?19, ?20, ?21, ?22, ?23)",
        params![
            job.uid,
            job.analysis_id,
            job.project_id,
            job.name,
            job.text,
            job.html,
            job.json_text,
            job.template,
            job.script,
            job.stdout_log,
            job.stderr_log,
            job.state.code(),
            job.security.code(),
            job.start_date,
            job.end_date,
            path_column(job),
            job.owner,
            job.deleted,
            job.valid,
            job.image,
            job.date.unwrap_or(now),
            job.lastedit_user,
            job.lastedit_date.unwrap_or(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates an existing job row. `uid`, the owning recipe and project, and
/// `date` are never rewritten.
pub fn update(conn: &Connection, job: &Job) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE jobs SET name=?2, text=?3, html=?4, json_text=?5, template=?6, script=?7,
         stdout_log=?8, stderr_log=?9, state=?10, security=?11, start_date=?12, end_date=?13,
         path=?14, owner_id=?15, deleted=?16, valid=?17, image=?18, lastedit_user_id=?19,
         lastedit_date=?20
         WHERE id=?1",
        params![
            job.id,
            job.name,
            job.text,
            job.html,
            job.json_text,
            job.template,
            job.script,
            job.stdout_log,
            job.stderr_log,
            job.state.code(),
            job.security.code(),
            job.start_date,
            job.end_date,
            path_column(job),
            job.owner,
            job.deleted,
            job.valid,
            job.image,
            job.lastedit_user,
            job.lastedit_date.unwrap_or_else(Utc::now),
        ],
    )?;
    Ok(())
}

/// Finds a job by its ID.
pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Job>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE id = ?1")?;
    let rows = stmt.query_map(params![id], from_row)?;
    first_row(rows)
}

pub fn find_by_uid(conn: &Connection, uid: &str) -> Result<Option<Job>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM jobs WHERE uid = ?1")?;
    let rows = stmt.query_map(params![uid], from_row)?;
    first_row(rows)
}

/// Queries jobs with filters, returning (rows, total_count).
pub fn query(conn: &Connection, filter: &JobFilter) -> Result<(Vec<Job>, u64), DatabaseError> {
    let mut conditions = Vec::new();
    let mut param_values: Vec<Box<dyn rusqlite::types::ToSql>> = Vec::new();

    if let Some(project_id) = filter.project_id {
        conditions.push(format!("project_id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(project_id));
    }
    if let Some(analysis_id) = filter.analysis_id {
        conditions.push(format!("analysis_id = ?{}", param_values.len() + 1));
        param_values.push(Box::new(analysis_id));
    }
    if let Some(state) = filter.state {
        conditions.push(format!("state = ?{}", param_values.len() + 1));
        param_values.push(Box::new(state.code()));
    }
    if !filter.include_deleted {
        conditions.push("deleted = 0".to_string());
    }

    let where_clause = if conditions.is_empty() {
        String::new()
    } else {
        format!("WHERE {}", conditions.join(" AND "))
    };

    // Count total matching rows.
    let count_sql = format!("SELECT COUNT(*) FROM jobs {}", where_clause);
    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let total: u64 = conn.query_row(&count_sql, params_ref.as_slice(), |r| r.get(0))?;

    // Fetch paginated results.
    let limit = filter.limit.unwrap_or(100) as i64;
    let offset = filter.offset.unwrap_or(0) as i64;
    param_values.push(Box::new(limit));
    param_values.push(Box::new(offset));
    let query_sql = format!(
        "SELECT * FROM jobs {} ORDER BY date DESC, id DESC LIMIT ?{} OFFSET ?{}",
        where_clause,
        param_values.len() - 1,
        param_values.len()
    );

    let params_ref: Vec<&dyn rusqlite::types::ToSql> =
        param_values.iter().map(|p| p.as_ref()).collect();
    let mut stmt = conn.prepare(&query_sql)?;
    let rows: Vec<Job> = stmt
        .query_map(params_ref.as_slice(), from_row)?
        .collect::<Result<Vec<_>, _>>()?;

    Ok((rows, total))
}

/// Counts live jobs in the given state.
pub fn count_by_state(conn: &Connection, state: JobState) -> Result<u64, DatabaseError> {
    let count: u64 = conn.query_row(
        "SELECT COUNT(*) FROM jobs WHERE state = ?1 AND deleted = 0",
        params![state.code()],
        |r| r.get(0),
    )?;
    Ok(count)
}

/// Updates only the state and run timestamps of a job.
pub fn update_state(
    conn: &Connection,
    id: i64,
    state: JobState,
    start_date: Option<DateTime<Utc>>,
    end_date: Option<DateTime<Utc>>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE jobs SET state = ?2, start_date = ?3, end_date = ?4, lastedit_date = ?5
         WHERE id = ?1",
        params![id, state.code(), start_date, end_date, Utc::now()],
    )?;
    Ok(())
}
