use std::sync::Arc;

/// Source of identifiers for new rows.
///
/// Uniqueness only needs to hold within a process run; the primary key
/// constraint rejects any collision as a conflict.
pub trait IdGenerator: Send + Sync {
    fn next_id(&self) -> String;
}

/// Time-ordered UUIDv7 identifiers.
#[derive(Debug, Default, Clone, Copy)]
pub struct UuidV7Ids;

impl IdGenerator for UuidV7Ids {
    fn next_id(&self) -> String {
        uuid::Uuid::now_v7().to_string()
    }
}

pub type SharedIds = Arc<dyn IdGenerator>;

pub fn default_ids() -> SharedIds {
    Arc::new(UuidV7Ids)
}
