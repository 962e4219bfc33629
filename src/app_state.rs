use crate::db::DbPool;

/// Shared handles available to every request handler.
#[derive(Clone)]
pub struct AppState {
    pub db_pool: DbPool,
}
