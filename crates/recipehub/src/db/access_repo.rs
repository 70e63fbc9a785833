//! Access repository: per-user grants on projects.

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::{first_row, DatabaseError};
use crate::model::{Access, AccessLevel, UserId};

fn from_row(row: &Row<'_>) -> Result<Access, rusqlite::Error> {
    Ok(Access {
        id: row.get("id")?,
        user: row.get("user_id")?,
        project_id: row.get("project_id")?,
        level: AccessLevel::from_code(row.get("access")?),
        date: row.get("date")?,
    })
}

pub fn insert(conn: &Connection, access: &Access) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO access (user_id, project_id, access, date) VALUES (?1, ?2, ?3, ?4)",
        params![access.user, access.project_id, access.level.code(), access.date],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Returns the most recent grant of `user` on a project.
pub fn find(
    conn: &Connection,
    user: UserId,
    project_id: i64,
) -> Result<Option<Access>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM access WHERE user_id = ?1 AND project_id = ?2 ORDER BY id DESC LIMIT 1",
    )?;
    let rows = stmt.query_map(params![user, project_id], from_row)?;
    first_row(rows)
}

pub fn list_by_project(conn: &Connection, project_id: i64) -> Result<Vec<Access>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM access WHERE project_id = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![project_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// True when `user` holds at least `level` on the project.
pub fn has_access(
    conn: &Connection,
    user: UserId,
    project_id: i64,
    level: AccessLevel,
) -> Result<bool, DatabaseError> {
    Ok(find(conn, user, project_id)?
        .map(|access| access.level >= level)
        .unwrap_or(false))
}

/// Grants `user` write access to a project unless they already hold it.
/// Returns whether a row was inserted.
pub fn grant_write(conn: &Connection, user: UserId, project_id: i64) -> Result<bool, DatabaseError> {
    let existing: i64 = conn.query_row(
        "SELECT COUNT(*) FROM access WHERE user_id = ?1 AND project_id = ?2 AND access = ?3",
        params![user, project_id, AccessLevel::Write.code()],
        |r| r.get(0),
    )?;
    if existing > 0 {
        return Ok(false);
    }

    let access = Access {
        id: 0,
        user,
        project_id,
        level: AccessLevel::Write,
        date: Utc::now(),
    };
    insert(conn, &access)?;
    log::debug!("Granted user {} write access to project {}", user, project_id);
    Ok(true)
}
