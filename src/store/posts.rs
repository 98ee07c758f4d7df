use std::collections::HashMap;

use chrono::{SubsecRound, Utc};
use rusqlite::{params, Connection, OptionalExtension, TransactionBehavior};

use crate::db::error::{StoreError, StoreResult};
use crate::db::ids::{IdGenerator, SharedIds};
use crate::db::models::{Author, Post, PostInput, Tag};
use crate::db::{format_timestamp, timestamp_column};
use crate::state::DbPool;
use crate::store::comments::{all_post_comments, comments_for_post};
use crate::store::tags::{self, tag_from_row};

const POST_COLUMNS: &str = "p.id, p.title, p.content, p.excerpt, p.slug, p.published,
     p.created_at, p.updated_at,
     p.author_id, p.author_email, p.author_name, p.author_picture, p.author_is_admin";

/// Lookup key for a single post.
enum PostKey<'a> {
    Id(&'a str),
    Slug(&'a str),
}

/// Posts with their tags and comments. Owns every write to `post_tags`.
#[derive(Clone)]
pub struct PostStore {
    pool: DbPool,
    ids: SharedIds,
    batched: bool,
}

impl PostStore {
    pub fn new(pool: DbPool, ids: SharedIds) -> Self {
        Self {
            pool,
            ids,
            batched: false,
        }
    }

    /// Hydrate `list` with one query per relation instead of per post.
    pub fn with_batched_hydration(mut self, batched: bool) -> Self {
        self.batched = batched;
        self
    }

    /// All posts, newest first, each with tags and comments.
    pub fn list(&self) -> StoreResult<Vec<Post>> {
        let conn = self.pool.get()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {POST_COLUMNS} FROM posts p ORDER BY p.created_at DESC, p.rowid DESC"
        ))?;
        let mut posts = stmt
            .query_map([], post_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        if self.batched {
            hydrate_all(&conn, &mut posts)?;
        } else {
            for post in &mut posts {
                hydrate(&conn, post)?;
            }
        }
        Ok(posts)
    }

    pub fn get_by_id(&self, id: &str) -> StoreResult<Post> {
        let conn = self.pool.get()?;
        load(&conn, PostKey::Id(id))
    }

    pub fn get_by_slug(&self, slug: &str) -> StoreResult<Post> {
        let conn = self.pool.get()?;
        load(&conn, PostKey::Slug(slug))
    }

    /// Inserts the post and links its tags in one transaction.
    ///
    /// Tags are found by name or created, then linked in the order given.
    /// Any failure rolls the whole write back.
    pub fn create(&self, input: &PostInput, author: &Author) -> StoreResult<Post> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let id = input
            .requested_id()
            .map(str::to_string)
            .unwrap_or_else(|| self.ids.next_id());
        let now = Utc::now().trunc_subsecs(6);
        let stamp = format_timestamp(&now);

        tx.execute(
            "INSERT INTO posts (
                id, title, content, excerpt, slug, published,
                created_at, updated_at,
                author_id, author_email, author_name, author_picture, author_is_admin
             ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13)",
            params![
                id,
                input.title,
                input.content,
                input.excerpt,
                input.slug,
                input.published,
                stamp,
                stamp,
                author.id,
                author.email,
                author.name,
                author.picture,
                author.is_admin,
            ],
        )?;

        let tags = link_tags(&tx, self.ids.as_ref(), &id, &input.tags)?;
        tx.commit()?;

        tracing::info!("Created post {} ({} tags)", id, tags.len());

        Ok(Post {
            id,
            title: input.title.clone(),
            content: input.content.clone(),
            excerpt: input.excerpt.clone(),
            slug: input.slug.clone(),
            published: input.published,
            created_at: now,
            updated_at: now,
            author: author.clone(),
            tags,
            comments: Vec::new(),
        })
    }

    /// Rewrites the mutable fields and replaces the tag set atomically.
    ///
    /// The author is left as created. Readers see either the old tag set or
    /// the new one, never an empty one in between. Returns a fresh read.
    pub fn update(&self, id: &str, input: &PostInput) -> StoreResult<Post> {
        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let now = Utc::now().trunc_subsecs(6);
        let changed = tx.execute(
            "UPDATE posts
             SET title = ?1, content = ?2, excerpt = ?3, slug = ?4, published = ?5, updated_at = ?6
             WHERE id = ?7",
            params![
                input.title,
                input.content,
                input.excerpt,
                input.slug,
                input.published,
                format_timestamp(&now),
                id,
            ],
        )?;
        if changed == 0 {
            return Err(StoreError::not_found("Post", id));
        }

        tx.execute("DELETE FROM post_tags WHERE post_id = ?1", params![id])?;
        link_tags(&tx, self.ids.as_ref(), id, &input.tags)?;
        tx.commit()?;

        tracing::info!("Updated post {}", id);
        load(&conn, PostKey::Id(id))
    }

    /// Deletes the post with its comments and tag links. Missing ids are not an error.
    pub fn delete(&self, id: &str) -> StoreResult<()> {
        let conn = self.pool.get()?;
        let removed = conn.execute("DELETE FROM posts WHERE id = ?1", params![id])?;
        tracing::info!("Deleted post {} ({} row)", id, removed);
        Ok(())
    }
}

/// Find-or-create each tag by name and link it to the post, in order.
fn link_tags(
    conn: &Connection,
    ids: &dyn IdGenerator,
    post_id: &str,
    names: &[String],
) -> StoreResult<Vec<Tag>> {
    let mut linked = Vec::with_capacity(names.len());
    for name in names {
        let tag = match tags::find_by_name(conn, name)? {
            Some(tag) => tag,
            None => tags::insert(conn, &ids.next_id(), name)?,
        };
        conn.execute(
            "INSERT INTO post_tags (post_id, tag_id) VALUES (?1, ?2)",
            params![post_id, tag.id],
        )?;
        linked.push(tag);
    }
    Ok(linked)
}

fn load(conn: &Connection, key: PostKey<'_>) -> StoreResult<Post> {
    let (clause, value) = match key {
        PostKey::Id(id) => ("p.id = ?1", id),
        PostKey::Slug(slug) => ("p.slug = ?1", slug),
    };

    let mut post = conn
        .query_row(
            &format!("SELECT {POST_COLUMNS} FROM posts p WHERE {clause}"),
            params![value],
            post_from_row,
        )
        .optional()?
        .ok_or_else(|| StoreError::not_found("Post", value))?;

    hydrate(conn, &mut post)?;
    Ok(post)
}

fn hydrate(conn: &Connection, post: &mut Post) -> StoreResult<()> {
    post.tags = tags_for_post(conn, &post.id)?;
    post.comments = comments_for_post(conn, &post.id)?;
    Ok(())
}

/// Same result as calling [`hydrate`] on each post, in two queries.
fn hydrate_all(conn: &Connection, posts: &mut [Post]) -> StoreResult<()> {
    let mut tags_by_post: HashMap<String, Vec<Tag>> = HashMap::new();
    {
        let mut stmt = conn.prepare(
            "SELECT pt.post_id, t.id, t.name
             FROM post_tags pt
             JOIN tags t ON t.id = pt.tag_id
             ORDER BY pt.rowid",
        )?;
        let rows = stmt.query_map([], |row| {
            let post_id: String = row.get(0)?;
            let tag = Tag {
                id: row.get(1)?,
                name: row.get(2)?,
            };
            Ok((post_id, tag))
        })?;
        for row in rows {
            let (post_id, tag) = row?;
            tags_by_post.entry(post_id).or_default().push(tag);
        }
    }

    let mut comments_by_post: HashMap<String, Vec<_>> = HashMap::new();
    for comment in all_post_comments(conn)? {
        comments_by_post
            .entry(comment.post_id.clone())
            .or_default()
            .push(comment);
    }

    for post in posts.iter_mut() {
        post.tags = tags_by_post.remove(&post.id).unwrap_or_default();
        post.comments = comments_by_post.remove(&post.id).unwrap_or_default();
    }
    Ok(())
}

/// Tags linked to a post, in link order.
fn tags_for_post(conn: &Connection, post_id: &str) -> StoreResult<Vec<Tag>> {
    let mut stmt = conn.prepare(
        "SELECT t.id, t.name
         FROM tags t
         JOIN post_tags pt ON t.id = pt.tag_id
         WHERE pt.post_id = ?1
         ORDER BY pt.rowid",
    )?;
    let tags = stmt
        .query_map(params![post_id], tag_from_row)?
        .collect::<Result<Vec<_>, _>>()?;
    Ok(tags)
}

fn post_from_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<Post> {
    Ok(Post {
        id: row.get(0)?,
        title: row.get(1)?,
        content: row.get(2)?,
        excerpt: row.get(3)?,
        slug: row.get(4)?,
        published: row.get(5)?,
        created_at: timestamp_column(row, 6)?,
        updated_at: timestamp_column(row, 7)?,
        author: Author {
            id: row.get(8)?,
            email: row.get(9)?,
            name: row.get(10)?,
            picture: row.get(11)?,
            is_admin: row.get(12)?,
        },
        tags: Vec::new(),
        comments: Vec::new(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::models::CommentInput;
    use crate::store::comments::CommentStore;
    use crate::store::test_support::{count_rows, sample_author, test_pool};

    fn create_test_store() -> (PostStore, DbPool, tempfile::TempDir) {
        let (pool, tmp) = test_pool();
        let store = PostStore::new(pool.clone(), crate::db::ids::default_ids());
        (store, pool, tmp)
    }

    fn input(slug: &str, tags: &[&str]) -> PostInput {
        PostInput {
            id: None,
            title: format!("Title {slug}"),
            content: "Some content".into(),
            excerpt: "Some".into(),
            slug: slug.into(),
            published: true,
            tags: tags.iter().map(|t| t.to_string()).collect(),
        }
    }

    fn tag_names(post: &Post) -> Vec<&str> {
        post.tags.iter().map(|t| t.name.as_str()).collect()
    }

    #[test]
    fn create_uses_supplied_id() {
        let (store, _pool, _tmp) = create_test_store();
        let mut data = input("hello", &[]);
        data.id = Some("custom-id".into());

        let post = store.create(&data, &sample_author()).unwrap();
        assert_eq!(post.id, "custom-id");
        assert_eq!(store.get_by_id("custom-id").unwrap().slug, "hello");
    }

    #[test]
    fn create_generates_id_when_missing() {
        let (store, _pool, _tmp) = create_test_store();
        let post = store.create(&input("hello", &[]), &sample_author()).unwrap();
        assert!(uuid::Uuid::parse_str(&post.id).is_ok());
        assert_eq!(post.created_at, post.updated_at);
    }

    #[test]
    fn get_after_create_matches_returned_post() {
        let (store, _pool, _tmp) = create_test_store();
        let created = store
            .create(&input("hello", &["web", "go", "api"]), &sample_author())
            .unwrap();

        let fetched = store.get_by_id(&created.id).unwrap();
        assert_eq!(fetched, created);
        assert_eq!(tag_names(&fetched), vec!["web", "go", "api"]);
        assert!(fetched.comments.is_empty());
    }

    #[test]
    fn get_by_slug_hydrates() {
        let (store, _pool, _tmp) = create_test_store();
        let created = store
            .create(&input("by-slug", &["rust"]), &sample_author())
            .unwrap();

        let fetched = store.get_by_slug("by-slug").unwrap();
        assert_eq!(fetched.id, created.id);
        assert_eq!(tag_names(&fetched), vec!["rust"]);
    }

    #[test]
    fn missing_post_is_not_found() {
        let (store, _pool, _tmp) = create_test_store();
        assert!(store.get_by_id("nope").unwrap_err().is_not_found());
        assert!(store.get_by_slug("nope").unwrap_err().is_not_found());
    }

    #[test]
    fn tags_are_shared_between_posts() {
        let (store, pool, _tmp) = create_test_store();
        let first = store
            .create(&input("one", &["go", "web"]), &sample_author())
            .unwrap();
        let second = store
            .create(&input("two", &["go", "web"]), &sample_author())
            .unwrap();

        assert_eq!(count_rows(&pool, "tags"), 2);
        assert_eq!(first.tags, second.tags);
    }

    #[test]
    fn duplicate_slug_conflicts_and_keeps_first() {
        let (store, pool, _tmp) = create_test_store();
        let first = store
            .create(&input("same", &["rust"]), &sample_author())
            .unwrap();

        let err = store
            .create(&input("same", &["other"]), &sample_author())
            .unwrap_err();
        match err {
            StoreError::Conflict(constraint) => assert_eq!(constraint, "posts.slug"),
            other => panic!("expected conflict, got {other:?}"),
        }

        assert_eq!(store.get_by_slug("same").unwrap(), first);
        assert_eq!(count_rows(&pool, "posts"), 1);
        assert_eq!(count_rows(&pool, "tags"), 1);
    }

    #[test]
    fn failed_create_leaves_nothing_behind() {
        let (store, pool, _tmp) = create_test_store();
        let err = store
            .create(&input("dup-tags", &["a", "b", "a"]), &sample_author())
            .unwrap_err();
        assert!(err.is_conflict());

        assert_eq!(count_rows(&pool, "posts"), 0);
        assert_eq!(count_rows(&pool, "post_tags"), 0);
        assert_eq!(count_rows(&pool, "tags"), 0);
    }

    #[test]
    fn update_replaces_tag_set() {
        let (store, _pool, _tmp) = create_test_store();
        let post = store
            .create(&input("post", &["A", "B"]), &sample_author())
            .unwrap();

        let updated = store.update(&post.id, &input("post", &["B", "C"])).unwrap();
        assert_eq!(tag_names(&updated), vec!["B", "C"]);
        assert_eq!(tag_names(&store.get_by_id(&post.id).unwrap()), vec!["B", "C"]);
    }

    #[test]
    fn failed_update_keeps_previous_tags() {
        let (store, _pool, _tmp) = create_test_store();
        let post = store
            .create(&input("post", &["A", "B"]), &sample_author())
            .unwrap();

        // Second "C" violates the association key after the old links are gone.
        let mut data = input("renamed", &["C", "C"]);
        data.title = "Changed".into();
        let err = store.update(&post.id, &data).unwrap_err();
        assert!(err.is_conflict());

        let current = store.get_by_id(&post.id).unwrap();
        assert_eq!(tag_names(&current), vec!["A", "B"]);
        assert_eq!(current.slug, "post");
        assert_eq!(current.title, post.title);
    }

    #[test]
    fn update_leaves_author_untouched() {
        let (store, _pool, _tmp) = create_test_store();
        let author = sample_author();
        let post = store.create(&input("post", &[]), &author).unwrap();

        let mut data = input("post-2", &[]);
        data.title = "New title".into();
        data.published = false;
        let updated = store.update(&post.id, &data).unwrap();

        assert_eq!(updated.author, author);
        assert_eq!(updated.title, "New title");
        assert_eq!(updated.slug, "post-2");
        assert!(!updated.published);
        assert_eq!(updated.created_at, post.created_at);
        assert!(updated.updated_at >= post.updated_at);
    }

    #[test]
    fn update_returns_current_comments() {
        let (store, pool, _tmp) = create_test_store();
        let comments = CommentStore::new(pool.clone(), crate::db::ids::default_ids());
        let post = store.create(&input("post", &[]), &sample_author()).unwrap();
        comments
            .create(
                &post.id,
                &CommentInput {
                    content: "first!".into(),
                },
                &sample_author(),
            )
            .unwrap();

        let updated = store.update(&post.id, &input("post", &["x"])).unwrap();
        assert_eq!(updated.comments.len(), 1);
        assert_eq!(updated.comments[0].content, "first!");
    }

    #[test]
    fn update_missing_post_is_not_found() {
        let (store, pool, _tmp) = create_test_store();
        let err = store.update("nope", &input("nope", &["A"])).unwrap_err();
        assert!(err.is_not_found());
        assert_eq!(count_rows(&pool, "tags"), 0);
    }

    #[test]
    fn update_onto_taken_slug_conflicts() {
        let (store, _pool, _tmp) = create_test_store();
        store.create(&input("taken", &[]), &sample_author()).unwrap();
        let post = store.create(&input("mine", &["A"]), &sample_author()).unwrap();

        assert!(store
            .update(&post.id, &input("taken", &[]))
            .unwrap_err()
            .is_conflict());
        assert_eq!(tag_names(&store.get_by_id(&post.id).unwrap()), vec!["A"]);
    }

    #[test]
    fn delete_cascades_comments_and_links_but_keeps_tags() {
        let (store, pool, _tmp) = create_test_store();
        let comments = CommentStore::new(pool.clone(), crate::db::ids::default_ids());
        let post = store
            .create(&input("post", &["A", "B", "C"]), &sample_author())
            .unwrap();
        for text in ["one", "two"] {
            comments
                .create(
                    &post.id,
                    &CommentInput {
                        content: text.into(),
                    },
                    &sample_author(),
                )
                .unwrap();
        }

        store.delete(&post.id).unwrap();

        assert_eq!(count_rows(&pool, "posts"), 0);
        assert_eq!(count_rows(&pool, "comments"), 0);
        assert_eq!(count_rows(&pool, "post_tags"), 0);
        assert_eq!(count_rows(&pool, "tags"), 3);
    }

    #[test]
    fn delete_missing_post_succeeds() {
        let (store, _pool, _tmp) = create_test_store();
        store.delete("never-existed").unwrap();
    }

    #[test]
    fn list_is_newest_first() {
        let (store, _pool, _tmp) = create_test_store();
        let older = store.create(&input("older", &[]), &sample_author()).unwrap();
        let newer = store.create(&input("newer", &[]), &sample_author()).unwrap();

        let ids: Vec<String> = store.list().unwrap().into_iter().map(|p| p.id).collect();
        assert_eq!(ids, vec![newer.id, older.id]);
    }

    #[test]
    fn batched_listing_matches_per_post_listing() {
        let (store, pool, _tmp) = create_test_store();
        let comments = CommentStore::new(pool.clone(), crate::db::ids::default_ids());
        let a = store
            .create(&input("a", &["x", "y"]), &sample_author())
            .unwrap();
        store.create(&input("b", &["y"]), &sample_author()).unwrap();
        store.create(&input("c", &[]), &sample_author()).unwrap();
        comments
            .create(
                &a.id,
                &CommentInput {
                    content: "hi".into(),
                },
                &sample_author(),
            )
            .unwrap();

        let batched = store.clone().with_batched_hydration(true);
        assert_eq!(batched.list().unwrap(), store.list().unwrap());
    }
}
