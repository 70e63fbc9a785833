//! Project repository: CRUD for the `projects` table and the live child
//! counts that feed the project count cache.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{first_row, DatabaseError};
use crate::aggregate::{ProjectChildren, ProjectCounts};
use crate::model::{Privacy, Project, UserId};

fn from_row(row: &Row<'_>) -> Result<Project, rusqlite::Error> {
    Ok(Project {
        id: row.get("id")?,
        uid: row.get("uid")?,
        label: row.get("label")?,
        name: row.get("name")?,
        privacy: Privacy::from_code(row.get("privacy")?),
        owner: row.get("owner_id")?,
        text: row.get("text")?,
        html: row.get("html")?,
        rank: row.get("rank")?,
        deleted: row.get("deleted")?,
        sharable_token: row.get("sharable_token")?,
        image: row.get("image")?,
        data_count: row.get("data_count")?,
        recipes_count: row.get("recipes_count")?,
        jobs_count: row.get("jobs_count")?,
        date: row.get("date")?,
        lastedit_user: row.get("lastedit_user_id")?,
        lastedit_date: row.get("lastedit_date")?,
    })
}

/// Inserts a new project and returns its row id.
pub fn insert(conn: &Connection, project: &Project) -> Result<i64, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO projects (uid, label, name, privacy, owner_id, text, html, rank, deleted,
         sharable_token, image, data_count, recipes_count, jobs_count, date,
         lastedit_user_id, lastedit_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17)",
        params![
            project.uid,
            project.label,
            project.name,
            project.privacy.code(),
            project.owner,
            project.text,
            project.html,
            project.rank,
            project.deleted,
            project.sharable_token,
            project.image,
            project.data_count,
            project.recipes_count,
            project.jobs_count,
            project.date.unwrap_or(now),
            project.lastedit_user,
            project.lastedit_date.unwrap_or(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates an existing project. `uid` and `date` are never rewritten.
pub fn update(conn: &Connection, project: &Project) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE projects SET label=?2, name=?3, privacy=?4, owner_id=?5, text=?6, html=?7,
         rank=?8, deleted=?9, sharable_token=?10, image=?11, data_count=?12,
         recipes_count=?13, jobs_count=?14, lastedit_user_id=?15, lastedit_date=?16
         WHERE id=?1",
        params![
            project.id,
            project.label,
            project.name,
            project.privacy.code(),
            project.owner,
            project.text,
            project.html,
            project.rank,
            project.deleted,
            project.sharable_token,
            project.image,
            project.data_count,
            project.recipes_count,
            project.jobs_count,
            project.lastedit_user,
            project.lastedit_date.unwrap_or_else(Utc::now),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Project>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM projects WHERE id = ?1")?;
    let rows = stmt.query_map(params![id], from_row)?;
    first_row(rows)
}

pub fn find_by_uid(conn: &Connection, uid: &str) -> Result<Option<Project>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM projects WHERE uid = ?1")?;
    let rows = stmt.query_map(params![uid], from_row)?;
    first_row(rows)
}

/// Writes only the three count columns.
pub fn update_counts(
    conn: &Connection,
    id: i64,
    counts: &ProjectCounts,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE projects SET data_count = ?2, recipes_count = ?3, jobs_count = ?4 WHERE id = ?1",
        params![id, counts.data, counts.recipes, counts.jobs],
    )?;
    Ok(())
}

/// Records an edit of the project or one of its children.
pub fn touch(
    conn: &Connection,
    id: i64,
    date: DateTime<Utc>,
    user: Option<UserId>,
) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE projects SET lastedit_date = ?2, lastedit_user_id = COALESCE(?3, lastedit_user_id)
         WHERE id = ?1",
        params![id, date, user],
    )?;
    Ok(())
}

/// Uids of the live recipes of a project, ordered by rank.
pub fn recipe_uids(conn: &Connection, id: i64) -> Result<Vec<String>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT uid FROM analyses WHERE project_id = ?1 AND deleted = 0 ORDER BY rank, id",
    )?;
    let uids = stmt
        .query_map(params![id], |r| r.get(0))?
        .collect::<Result<Vec<String>, _>>()?;
    Ok(uids)
}

/// Permanently removes a project. Children cascade.
pub fn delete(conn: &Connection, id: i64) -> Result<bool, DatabaseError> {
    let affected = conn.execute("DELETE FROM projects WHERE id = ?1", params![id])?;
    Ok(affected > 0)
}

fn count_live(conn: &Connection, table: &str, project_id: i64) -> Result<i64, DatabaseError> {
    let sql = format!(
        "SELECT COUNT(*) FROM {} WHERE project_id = ?1 AND deleted = 0",
        table
    );
    Ok(conn.query_row(&sql, params![project_id], |r| r.get(0))?)
}

impl ProjectChildren for Connection {
    type Error = DatabaseError;

    fn count_live_children(&self, project_id: i64) -> Result<ProjectCounts, DatabaseError> {
        Ok(ProjectCounts {
            data: count_live(self, "data", project_id)?,
            recipes: count_live(self, "analyses", project_id)?,
            jobs: count_live(self, "jobs", project_id)?,
        })
    }

    fn write_counts(&self, project_id: i64, counts: &ProjectCounts) -> Result<(), DatabaseError> {
        update_counts(self, project_id, counts)
    }
}
