//! Data repository: CRUD for the `data` table.

use std::path::PathBuf;

use chrono::Utc;
use rusqlite::{params, Connection, Row};

use super::{first_row, DatabaseError};
use crate::model::{Data, DataMethod, DataState};
use crate::storage::Toc;

fn from_row(row: &Row<'_>) -> Result<Data, rusqlite::Error> {
    let file: Option<String> = row.get("file")?;
    Ok(Data {
        id: row.get("id")?,
        uid: row.get("uid")?,
        project_id: row.get("project_id")?,
        name: row.get("name")?,
        state: DataState::from_code(row.get("state")?),
        method: DataMethod::from_code(row.get("method")?),
        data_type: row.get("data_type")?,
        file: file.map(PathBuf::from),
        size: row.get("size")?,
        file_count: row.get("file_count")?,
        owner: row.get("owner_id")?,
        text: row.get("text")?,
        html: row.get("html")?,
        rank: row.get("rank")?,
        deleted: row.get("deleted")?,
        image: row.get("image")?,
        date: row.get("date")?,
        lastedit_user: row.get("lastedit_user_id")?,
        lastedit_date: row.get("lastedit_date")?,
    })
}

fn file_column(data: &Data) -> Option<String> {
    data.file.as_ref().map(|f| f.to_string_lossy().into_owned())
}

pub fn insert(conn: &Connection, data: &Data) -> Result<i64, DatabaseError> {
    let now = Utc::now();
    conn.execute(
        "INSERT INTO data (uid, project_id, name, state, method, data_type, file, size,
         file_count, owner_id, text, html, rank, deleted, image, date, lastedit_user_id,
         lastedit_date)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, ?15, ?16, ?17, ?18)",
        params![
            data.uid,
            data.project_id,
            data.name,
            data.state.code(),
            data.method.code(),
            data.data_type,
            file_column(data),
            data.size,
            data.file_count,
            data.owner,
            data.text,
            data.html,
            data.rank,
            data.deleted,
            data.image,
            data.date.unwrap_or(now),
            data.lastedit_user,
            data.lastedit_date.unwrap_or(now),
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

/// Updates an existing data row. `uid`, `project_id` and `date` are fixed, and
/// the manifest columns are left to [`update_toc`].
pub fn update(conn: &Connection, data: &Data) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE data SET name=?2, state=?3, method=?4, data_type=?5, owner_id=?6, text=?7,
         html=?8, rank=?9, deleted=?10, image=?11, lastedit_user_id=?12, lastedit_date=?13
         WHERE id=?1",
        params![
            data.id,
            data.name,
            data.state.code(),
            data.method.code(),
            data.data_type,
            data.owner,
            data.text,
            data.html,
            data.rank,
            data.deleted,
            data.image,
            data.lastedit_user,
            data.lastedit_date.unwrap_or_else(Utc::now),
        ],
    )?;
    Ok(())
}

/// Stores the manifest path, size and file count of a freshly built TOC.
pub fn update_toc(conn: &Connection, id: i64, toc: &Toc) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE data SET file=?2, size=?3, file_count=?4 WHERE id=?1",
        params![
            id,
            toc.manifest_path.to_string_lossy().into_owned(),
            toc.size as i64,
            toc.file_count as i64,
        ],
    )?;
    Ok(())
}

pub fn find_by_id(conn: &Connection, id: i64) -> Result<Option<Data>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM data WHERE id = ?1")?;
    let rows = stmt.query_map(params![id], from_row)?;
    first_row(rows)
}

pub fn find_by_uid(conn: &Connection, uid: &str) -> Result<Option<Data>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM data WHERE uid = ?1")?;
    let rows = stmt.query_map(params![uid], from_row)?;
    first_row(rows)
}

/// Live data of a project, ordered by rank.
pub fn list_by_project(conn: &Connection, project_id: i64) -> Result<Vec<Data>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM data WHERE project_id = ?1 AND deleted = 0 ORDER BY rank, id",
    )?;
    let rows = stmt
        .query_map(params![project_id], from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
