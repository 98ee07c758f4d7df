use chrono::{SubsecRound, Utc};
use rusqlite::{params, OptionalExtension};

use crate::db::error::{StoreError, StoreResult};
use crate::db::models::Todo;
use crate::db::{format_timestamp, timestamp_column};
use crate::state::DbPool;

/// Legacy todo list, kept for existing clients.
#[derive(Clone)]
pub struct TodoStore {
    pool: DbPool,
}

impl TodoStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }

    pub fn list(&self) -> StoreResult<Vec<Todo>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(
            "SELECT id, title, completed, created_at, updated_at
             FROM todos
             ORDER BY created_at DESC, id DESC",
        )?;
        let todos = stmt
            .query_map([], todo_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(todos)
    }

    pub fn get(&self, id: i64) -> StoreResult<Todo> {
        let conn = self.pool.get()?;
        conn.query_row(
            "SELECT id, title, completed, created_at, updated_at FROM todos WHERE id = ?1",
            params![id],
            todo_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Todo", id.to_string()))
    }

    pub fn create(&self, title: &str) -> StoreResult<Todo> {
        let conn = self.pool.get()?;
        let now = Utc::now().trunc_subsecs(6);
        let stamp = format_timestamp(&now);
        conn.execute(
            "INSERT INTO todos (title, completed, created_at, updated_at) VALUES (?1, 0, ?2, ?2)",
            params![title, stamp],
        )?;

        Ok(Todo {
            id: conn.last_insert_rowid(),
            title: title.to_string(),
            completed: false,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn update(&self, id: i64, title: &str, completed: bool) -> StoreResult<Todo> {
        let conn = self.pool.get()?;
        let now = Utc::now().trunc_subsecs(6);
        let changed = conn.execute(
            "UPDATE todos SET title = ?1, completed = ?2, updated_at = ?3 WHERE id = ?4",
            params![title, completed, format_timestamp(&now), id],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Todo", id.to_string()));
        }
        drop(conn);
        self.get(id)
    }

    /// Missing ids are ignored.
    pub fn delete(&self, id: i64) -> StoreResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM todos WHERE id = ?1", params![id])?;
        Ok(())
    }
}

fn todo_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Todo> {
    Ok(Todo {
        id: row.get(0)?,
        title: row.get(1)?,
        completed: row.get(2)?,
        created_at: timestamp_column(row, 3)?,
        updated_at: timestamp_column(row, 4)?,
    })
}
