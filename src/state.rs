use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::config::Config;
use crate::db::ids::SharedIds;
use crate::store::{CommentStore, PostStore, TagStore, TodoStore};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub config: Config,
    pub posts: PostStore,
    pub tags: TagStore,
    pub comments: CommentStore,
    pub todos: TodoStore,
}

impl AppState {
    /// Wires every store to the same pool and id source.
    pub fn new(config: Config, pool: DbPool, ids: SharedIds) -> Self {
        let posts = PostStore::new(pool.clone(), ids.clone())
            .with_batched_hydration(config.database.batch_hydration);

        Self {
            posts,
            tags: TagStore::new(pool.clone(), ids.clone()),
            comments: CommentStore::new(pool.clone(), ids),
            todos: TodoStore::new(pool),
            config,
        }
    }
}
