//! CRUD operations for [`Message`] records.

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::Message;

impl Database {
    /// Insert a new message.
    pub fn insert_message(&self, message: &Message) -> Result<()> {
        self.conn().execute(
            "INSERT INTO messages (id, sender_id, receiver_id, content, kind,
                                   is_read, read_at, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)",
            params![
                message.id.to_string(),
                message.sender_id.to_string(),
                message.receiver_id.to_string(),
                message.content,
                message.kind.as_str(),
                message.is_read,
                message.read_at.map(|t| t.to_rfc3339()),
                message.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    /// Fetch one page of the messages exchanged between a pair of users, in
    /// either direction, newest first.
    pub fn get_messages_between(
        &self,
        a: Uuid,
        b: Uuid,
        limit: u32,
        offset: u32,
    ) -> Result<Vec<Message>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, sender_id, receiver_id, content, kind, is_read, read_at, created_at
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)
             ORDER BY created_at DESC
             LIMIT ?3 OFFSET ?4",
        )?;

        let rows = stmt.query_map(
            params![a.to_string(), b.to_string(), limit, offset],
            row_to_message,
        )?;

        let mut messages = Vec::new();
        for row in rows {
            messages.push(row?);
        }
        Ok(messages)
    }

    /// Total number of messages exchanged between a pair of users.
    pub fn count_messages_between(&self, a: Uuid, b: Uuid) -> Result<u64> {
        let count: i64 = self.conn().query_row(
            "SELECT COUNT(*)
             FROM messages
             WHERE (sender_id = ?1 AND receiver_id = ?2)
                OR (sender_id = ?2 AND receiver_id = ?1)",
            params![a.to_string(), b.to_string()],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    /// Fetch a single message by UUID.
    pub fn get_message_by_id(&self, id: Uuid) -> Result<Message> {
        self.conn()
            .query_row(
                "SELECT id, sender_id, receiver_id, content, kind, is_read, read_at, created_at
                 FROM messages WHERE id = ?1",
                params![id.to_string()],
                row_to_message,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Mark every unread message from `sender` to `receiver` as read,
    /// stamping the read time.  Returns the number of messages flipped.
    ///
    /// The read flag is monotonic: already-read messages are left untouched,
    /// so their original `read_at` is preserved.
    pub fn mark_messages_read(
        &self,
        receiver: Uuid,
        sender: Uuid,
        read_at: DateTime<Utc>,
    ) -> Result<usize> {
        let affected = self.conn().execute(
            "UPDATE messages
             SET is_read = 1, read_at = ?3
             WHERE receiver_id = ?1 AND sender_id = ?2 AND is_read = 0",
            params![
                receiver.to_string(),
                sender.to_string(),
                read_at.to_rfc3339(),
            ],
        )?;
        Ok(affected)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Map a `rusqlite::Row` to a [`Message`].
fn row_to_message(row: &rusqlite::Row<'_>) -> rusqlite::Result<Message> {
    let id_str: String = row.get(0)?;
    let sender_str: String = row.get(1)?;
    let receiver_str: String = row.get(2)?;
    let content: String = row.get(3)?;
    let kind_str: String = row.get(4)?;
    let is_read: bool = row.get(5)?;
    let read_at_str: Option<String> = row.get(6)?;
    let created_str: String = row.get(7)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let sender_id = Uuid::parse_str(&sender_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let receiver_id = Uuid::parse_str(&receiver_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let kind = kind_str.parse().map_err(|_| {
        rusqlite::Error::FromSqlConversionFailure(
            4,
            rusqlite::types::Type::Text,
            format!("unknown message kind: {kind_str}").into(),
        )
    })?;

    let read_at = read_at_str
        .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(7, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Message {
        id,
        sender_id,
        receiver_id,
        content,
        kind,
        is_read,
        read_at,
        created_at,
    })
}
