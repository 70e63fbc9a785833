//! Snippet repository: snippet types and the command snippets they group.

use rusqlite::{params, Connection, Row};

use super::{first_row, DatabaseError};
use crate::model::{Snippet, SnippetType, UserId};

fn type_from_row(row: &Row<'_>) -> Result<SnippetType, rusqlite::Error> {
    Ok(SnippetType {
        id: row.get("id")?,
        uid: row.get("uid")?,
        name: row.get("name")?,
        owner: row.get("owner_id")?,
        is_default: row.get("is_default")?,
        image: row.get("image")?,
    })
}

fn snippet_from_row(row: &Row<'_>) -> Result<Snippet, rusqlite::Error> {
    Ok(Snippet {
        id: row.get("id")?,
        uid: row.get("uid")?,
        help_text: row.get("help_text")?,
        command: row.get("command")?,
        type_id: row.get("type_id")?,
        owner: row.get("owner_id")?,
        is_default: row.get("is_default")?,
    })
}

pub fn insert_type(conn: &Connection, snippet_type: &SnippetType) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO snippet_types (uid, name, owner_id, is_default, image)
         VALUES (?1, ?2, ?3, ?4, ?5)",
        params![
            snippet_type.uid,
            snippet_type.name,
            snippet_type.owner,
            snippet_type.is_default,
            snippet_type.image,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_type(conn: &Connection, snippet_type: &SnippetType) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE snippet_types SET name=?2, owner_id=?3, is_default=?4, image=?5 WHERE id=?1",
        params![
            snippet_type.id,
            snippet_type.name,
            snippet_type.owner,
            snippet_type.is_default,
            snippet_type.image,
        ],
    )?;
    Ok(())
}

pub fn find_type(conn: &Connection, id: i64) -> Result<Option<SnippetType>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM snippet_types WHERE id = ?1")?;
    let rows = stmt.query_map(params![id], type_from_row)?;
    first_row(rows)
}

/// Default types plus the ones owned by `owner`.
pub fn list_types_visible_to(
    conn: &Connection,
    owner: UserId,
) -> Result<Vec<SnippetType>, DatabaseError> {
    let mut stmt = conn.prepare(
        "SELECT * FROM snippet_types WHERE is_default = 1 OR owner_id = ?1 ORDER BY id",
    )?;
    let rows = stmt
        .query_map(params![owner], type_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}

/// Inserts a snippet. The owner must already be resolved.
pub fn insert_snippet(conn: &Connection, snippet: &Snippet) -> Result<i64, DatabaseError> {
    conn.execute(
        "INSERT INTO snippets (uid, help_text, command, type_id, owner_id, is_default)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
        params![
            snippet.uid,
            snippet.help_text,
            snippet.command,
            snippet.type_id,
            snippet.owner,
            snippet.is_default,
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

pub fn update_snippet(conn: &Connection, snippet: &Snippet) -> Result<(), DatabaseError> {
    conn.execute(
        "UPDATE snippets SET help_text=?2, command=?3, type_id=?4, owner_id=?5, is_default=?6
         WHERE id=?1",
        params![
            snippet.id,
            snippet.help_text,
            snippet.command,
            snippet.type_id,
            snippet.owner,
            snippet.is_default,
        ],
    )?;
    Ok(())
}

pub fn find_snippet(conn: &Connection, id: i64) -> Result<Option<Snippet>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM snippets WHERE id = ?1")?;
    let rows = stmt.query_map(params![id], snippet_from_row)?;
    first_row(rows)
}

pub fn list_by_type(conn: &Connection, type_id: i64) -> Result<Vec<Snippet>, DatabaseError> {
    let mut stmt = conn.prepare("SELECT * FROM snippets WHERE type_id = ?1 ORDER BY id")?;
    let rows = stmt
        .query_map(params![type_id], snippet_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(rows)
}
