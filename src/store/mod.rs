// Data access: one store per entity, all sharing the injected pool
pub mod comments;
pub mod posts;
pub mod tags;
pub mod todos;

pub use comments::CommentStore;
pub use posts::PostStore;
pub use tags::TagStore;
pub use todos::TodoStore;
