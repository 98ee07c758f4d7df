use rusqlite::{params, Connection, OptionalExtension};

use crate::db::error::{StoreError, StoreResult};
use crate::db::ids::SharedIds;
use crate::db::models::Tag;
use crate::state::DbPool;

/// CRUD over uniquely named tags. Never touches `post_tags` itself.
#[derive(Clone)]
pub struct TagStore {
    pool: DbPool,
    ids: SharedIds,
}

impl TagStore {
    pub fn new(pool: DbPool, ids: SharedIds) -> Self {
        Self { pool, ids }
    }

    /// All tags, ordered by name.
    pub fn list(&self) -> StoreResult<Vec<Tag>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare("SELECT id, name FROM tags ORDER BY name ASC")?;
        let tags = stmt
            .query_map([], tag_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(tags)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Tag> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, name FROM tags WHERE id = ?1",
            params![id],
            tag_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Tag", id))
    }

    pub fn get_by_name(&self, name: &str) -> StoreResult<Tag> {
        let conn = self.pool.get()?;
        find_by_name(&conn, name)?.ok_or_else(|| StoreError::not_found("Tag", name))
    }

    /// Fails with `Conflict` when the name is taken.
    pub fn create(&self, name: &str) -> StoreResult<Tag> {
        let conn = self.pool.get()?;
        let tag = insert(&conn, &self.ids.next_id(), name)?;
        tracing::debug!("Created tag {} ({})", tag.name, tag.id);
        Ok(tag)
    }

    /// Renames a tag.
    pub fn update(&self, id: &str, name: &str) -> StoreResult<Tag> {
        let conn = self.pool.get()?;
        let changed = conn.execute(
            "UPDATE tags SET name = ?1 WHERE id = ?2",
            params![name, id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Tag", id));
        }
        Ok(Tag {
            id: id.to_string(),
            name: name.to_string(),
        })
    }

    /// Removes the tag and, through the cascade, its post links. Missing ids are ignored.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM tags WHERE id = ?1", params![id])?;
        tracing::debug!("Deleted tag {} ({} row)", id, removed);
        Ok(())
    }
}

pub(crate) fn find_by_name(conn: &Connection, name: &str) -> StoreResult<Option<Tag>> {
    let tag = conn
        .query_row(
            "SELECT id, name FROM tags WHERE name = ?1",
            params![name],
            tag_from_row,
        )
        .optional()?;
    Ok(tag)
}

pub(crate) fn insert(conn: &Connection, id: &str, name: &str) -> StoreResult<Tag> {
    conn.execute(
        "INSERT INTO tags (id, name) VALUES (?1, ?2)",
        params![id, name],
    )?;
    Ok(Tag {
        id: id.to_string(),
        name: name.to_string(),
    })
}

pub(crate) fn tag_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Tag> {
    Ok(Tag {
        id: row.get(0)?,
        name: row.get(1)?,
    })
}
