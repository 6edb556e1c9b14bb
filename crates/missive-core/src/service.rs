//! The service handle shared by all core operations.

use missive_store::Database;

/// Entry point for the directory, registry, and message operations.
///
/// Wraps an open [`Database`].  Every method is a short-lived, potentially
/// blocking unit of work; callers that cannot tolerate blocking must not
/// invoke them directly.
pub struct ChatService {
    pub(crate) db: Database,
}

impl ChatService {
    /// Build a service over an open database.
    pub fn new(db: Database) -> Self {
        Self { db }
    }

    /// Return a reference to the underlying store.
    ///
    /// Callers should prefer the typed operations, but direct access is
    /// occasionally needed for ad-hoc queries.
    pub fn database(&self) -> &Database {
        &self.db
    }
}
