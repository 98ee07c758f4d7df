use chrono::{SubsecRound, Utc};
use rusqlite::{params, Connection};

use crate::db::error::{StoreError, StoreResult};
use crate::db::ids::SharedIds;
use crate::db::models::{Author, Comment, CommentInput};
use crate::db::{format_timestamp, timestamp_column};
use crate::state::DbPool;

const COMMENT_COLUMNS: &str = "c.id, c.content, c.created_at, c.post_id,
     c.author_id, c.author_email, c.author_name, c.author_picture, c.author_is_admin";

#[derive(Clone)]
pub struct CommentStore {
    pool: DbPool,
    ids: SharedIds,
}

impl CommentStore {
    pub fn new(pool: DbPool, ids: SharedIds) -> Self {
        Self { pool, ids }
    }

    /// Comments on a post, most recent first.
    pub fn list_for_post(&self, post_id: &str) -> StoreResult<Vec<Comment>> {
        let conn = self.pool.get()?;
        comments_for_post(&conn, post_id)
    }

    /// The author is stored exactly as given.
    pub fn create(
        &self,
        post_id: &str,
        input: &CommentInput,
        author: &Author,
    ) -> StoreResult<Comment> {
        let conn = self.pool.get()?;
        let comment = Comment {
            id: self.ids.next_id(),
            content: input.content.clone(),
            created_at: Utc::now().trunc_subsecs(6),
            post_id: post_id.to_string(),
            author: author.clone(),
        };

        conn.execute(
            "INSERT INTO comments (
                id, content, created_at, post_id,
                author_id, author_email, author_name, author_picture, author_is_admin
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                comment.id,
                comment.content,
                format_timestamp(&comment.created_at),
                comment.post_id,
                author.id,
                author.email,
                author.name,
                author.picture,
                author.is_admin,
            ],
        )?;

        tracing::debug!("Created comment {} on post {}", comment.id, post_id);
        Ok(comment)
    }

    /// Fails with `NotFound` when nothing was deleted.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM comments WHERE id = ?1", params![id])?;
        if removed == 0 {
            return Err(StoreError::not_found("Comment", id));
        }
        Ok(())
    }
}

pub(crate) fn comments_for_post(conn: &Connection, post_id: &str) -> StoreResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS}
         FROM comments c
         WHERE c.post_id = ?1
         ORDER BY c.created_at DESC, c.rowid DESC"
    ))?;
    let comments = stmt
        .query_map(params![post_id], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

/// Every comment attached to a post, most recent first.
pub(crate) fn all_post_comments(conn: &Connection) -> StoreResult<Vec<Comment>> {
    let mut stmt = conn.prepare(&format!(
        "SELECT {COMMENT_COLUMNS}
         FROM comments c
         WHERE c.post_id IS NOT NULL
         ORDER BY c.created_at DESC, c.rowid DESC"
    ))?;
    let comments = stmt
        .query_map([], comment_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(comments)
}

fn comment_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Comment> {
    Ok(Comment {
        id: row.get(0)?,
        content: row.get(1)?,
        created_at: timestamp_column(row, 2)?,
        post_id: row.get(3)?,
        author: Author {
            id: row.get(4)?,
            email: row.get(5)?,
            name: row.get(6)?,
            picture: row.get(7)?,
            is_admin: row.get(8)?,
        },
    })
}
