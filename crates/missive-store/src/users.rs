//! CRUD operations for [`User`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::User;

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new user.
    pub fn create_user(&self, user: &User) -> Result<()> {
        self.conn().execute(
            "INSERT INTO users (id, full_name, username, email, password_hash,
                                avatar_url, is_online, last_seen, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            params![
                user.id.to_string(),
                user.full_name,
                user.username,
                user.email,
                user.password_hash,
                user.avatar_url,
                user.is_online,
                user.last_seen.to_rfc3339(),
                user.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single user by UUID.
    pub fn get_user(&self, id: Uuid) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, full_name, username, email, password_hash,
                        avatar_url, is_online, last_seen, created_at
                 FROM users WHERE id = ?1",
                params![id.to_string()],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Fetch a single user by email (case-insensitive).
    pub fn get_user_by_email(&self, email: &str) -> Result<User> {
        self.conn()
            .query_row(
                "SELECT id, full_name, username, email, password_hash,
                        avatar_url, is_online, last_seen, created_at
                 FROM users WHERE email = ?1",
                params![email],
                row_to_user,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Find a user holding either the given username or email, if any.
    ///
    /// Used by the registration flow to report which unique field collides.
    pub fn lookup_user_by_username_or_email(
        &self,
        username: &str,
        email: &str,
    ) -> Result<Option<User>> {
        let result = self.conn().query_row(
            "SELECT id, full_name, username, email, password_hash,
                    avatar_url, is_online, last_seen, created_at
             FROM users
             WHERE username = ?1 OR email = ?2
             LIMIT 1",
            params![username, email],
            row_to_user,
        );

        match result {
            Ok(user) => Ok(Some(user)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(other) => Err(StoreError::Sqlite(other)),
        }
    }

    /// Search users by case-insensitive substring match against username or
    /// email, optionally excluding one user id, sorted by username ascending.
    pub fn search_users(
        &self,
        query: &str,
        exclude: Option<Uuid>,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<User>> {
        let pattern = like_pattern(query);
        let mut stmt = self.conn().prepare(
            "SELECT id, full_name, username, email, password_hash,
                    avatar_url, is_online, last_seen, created_at
             FROM users
             WHERE (username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR id != ?2)
             ORDER BY username ASC
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map(
            params![pattern, exclude.map(|u| u.to_string()), limit, offset],
            row_to_user,
        )?;

        let mut users = Vec::new();
        for row in rows {
            users.push(row?);
        }
        Ok(users)
    }

    /// Total number of users matching a [`search_users`] query.
    ///
    /// [`search_users`]: Database::search_users
    pub fn count_search_users(&self, query: &str, exclude: Option<Uuid>) -> Result<u64> {
        let pattern = like_pattern(query);
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*)
             FROM users
             WHERE (username LIKE ?1 ESCAPE '\\' OR email LIKE ?1 ESCAPE '\\')
               AND (?2 IS NULL OR id != ?2)",
            params![pattern, exclude.map(|u| u.to_string())],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Set a user's online flag, stamping `last_seen`.
    pub fn set_online_status(
        &self,
        id: Uuid,
        is_online: bool,
        last_seen: DateTime<Utc>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE users SET is_online = ?2, last_seen = ?3 WHERE id = ?1",
            params![id.to_string(), is_online, last_seen.to_rfc3339()],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Build a `%substring%` LIKE pattern with `%`, `_` and `\` escaped.
fn like_pattern(query: &str) -> String {
    let escaped = query
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_");
    format!("%{escaped}%")
}

/// Map a `rusqlite::Row` to a [`User`].
fn row_to_user(row: &rusqlite::Row<'_>) -> rusqlite::Result<User> {
    let id_str: String = row.get(0)?;
    let full_name: String = row.get(1)?;
    let username: String = row.get(2)?;
    let email: String = row.get(3)?;
    let password_hash: String = row.get(4)?;
    let avatar_url: Option<String> = row.get(5)?;
    let is_online: bool = row.get(6)?;
    let last_seen_str: String = row.get(7)?;
    let created_str: String = row.get(8)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let last_seen: DateTime<Utc> = DateTime::parse_from_rfc3339(&last_seen_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(8, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(User {
        id,
        full_name,
        username,
        email,
        password_hash,
        avatar_url,
        is_online,
        last_seen,
        created_at,
    })
}
