//! Analysis (recipe) repository, including the bulk statements used to
//! mirror a root recipe onto its clones.

use chrono::{DateTime, Utc};
use rusqlite::{params, Connection, Row};

use super::{first_row, DatabaseError};
use crate::model::{Analysis, RecipeSecurity, UserId};
use crate::sync::{CloneFields, CloneStore};

fn from_row(row: &Row<'_>) -> Result<Analysis, rusqlite::Error> {
    Ok(Analysis {
        id: row.get("id")?,
        uid: row.get("uid")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        text: row.get("text")?,
        html: row.get("html")?,
        json_text: row.get("json_text")?,
        template: row.get("template")?,
        security: RecipeSecurity::from_code(row.get("security")?),
        root_id: row.get("root_id")?,
        owner: row.get("owner_id")?,
        rank: row.get("rank")?,
        deleted: row.get("deleted")?,
        image: row.get("image")?,
        date: row.get("date")?,
        lastedit_user: row.get("lastedit_user_id")?,
        lastedit_date: row.get("lastedit_date")?,
    })
}

pub fn insert(conn: &Connection, recipe: &Analysis) -> Result<i64, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO analyses (uid, project_id, name, text, html, json_text, template,
         security, root_id, owner_id, rank, deleted, image, date, lastedit_user_id,
         lastedit_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16)",
        params![
            recipe.uid,
            recipe.project_id,
            recipe.name,
            recipe.text,
            recipe.html,
            recipe.json_text,
            recipe.template,
            recipe.security.code(),
            recipe.root_id,
            recipe.owner,
            recipe.rank,
            recipe.deleted,
            recipe.image,
            recipe.date.unwrap_or(now),
            recipe.lastedit_user,
            recipe.lastedit_date.unwrap_or(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates an existing recipe. `uid`, `project_id` and `date` are fixed.
pub fn update(conn: &Connection, recipe: &Analysis) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE analyses SET name=?2, text=?3, html=?4, json_text=?5, template=?6,
         security=?7, root_id=?8, owner_id=?9, rank=?10, deleted=?11, image=?12,
         lastedit_user_id=?13, lastedit_date=?14
         WHERE id=?1",
        params![
            recipe.id,
            recipe.name,
            recipe.text,
            recipe.html,
            recipe.json_text,
            recipe.template,
            recipe.security.code(),
            recipe.root_id,
            recipe.owner,
            recipe.rank,
            recipe.deleted,
            recipe.image,
            recipe.lastedit_user,
            recipe.lastedit_date.unwrap_or_else(Utc::now),
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Analysis>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM analyses WHERE id = ?1")?;
    let rows = stmt.query_map(params![id], from_row)?;
    first_row(rows)
}

pub fn find_by_uid(conn: &Connection, uid: &str) -> Result<Option<Analysis>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM analyses WHERE uid = ?1")?;
    let rows = stmt.query_map(params![uid], from_row)?;
    first_row(rows)
}

/// Live recipes of a project, ordered by rank.
pub fn list_by_project(
    conn: &Connection,
    project_id: i64,
) -> Result<Vec<Analysis>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM analyses WHERE project_id = ?1 AND deleted = 0 ORDER BY rank, id",
    )?;
    let rows = stmt
        .query_map(params![project_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Every recipe cloned from `root_id`, deleted ones included.
pub fn list_clones(conn: &Connection, root_id: i64) -> Result<Vec<Analysis>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM analyses WHERE root_id = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![root_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

impl CloneStore for Connection {
    type Error = DatabaseError;

    fn update_clones(&self, root_id: i64, fields: &CloneFields<'_>) -> Result<usize, DatabaseError> {
        let updated = self.execute(
            "UPDATE analyses SET json_text=?2, template=?3, name=?4, security=?5,
             lastedit_date=?6, lastedit_user_id=?7, text=?8, html=?9, image=?10
             WHERE root_id=?1",
            params![
                root_id,
                fields.json_text,
                fields.template,
                fields.name,
                fields.security.code(),
                fields.lastedit_date,
                fields.lastedit_user,
                fields.text,
                fields.html,
                fields.image,
            ],
        )?;
        Ok(updated)
    }

    fn touch_clone_projects(
        &self,
        root_id: i64,
        date: DateTime<Utc>,
        user: Option<UserId>,
    ) -> Result<usize, DatabaseError> {
        let touched = self.execute(
            "UPDATE projects SET lastedit_date = ?2, lastedit_user_id = COALESCE(?3, lastedit_user_id)
             WHERE id IN (SELECT project_id FROM analyses WHERE root_id = ?1)",
            params![root_id, date, user],
        )?;
        Ok(touched)
    }
}
