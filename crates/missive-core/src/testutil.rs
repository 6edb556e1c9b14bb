//! Shared helpers for the in-crate test modules.

use missive_store::Database;
use tempfile::TempDir;

use crate::service::ChatService;
use crate::types::NewUser;

/// Open a fresh service over a temp-dir database.  The `TempDir` must be
/// kept alive for the duration of the test.
pub(crate) fn service() -> (TempDir, ChatService) {
    let dir = tempfile::tempdir().expect("tempdir");
    let db = Database::open_at(&dir.path().join("test.db")).expect("open database");
    (dir, ChatService::new(db))
}

/// A valid registration input with the given username and email.
pub(crate) fn new_user(username: &str, email: &str) -> NewUser {
    NewUser {
        full_name: format!("{username} tester"),
        username: username.to_string(),
        email: email.to_string(),
        password_hash: "$2b$12$test-hash".to_string(),
        avatar_url: None,
    }
}
