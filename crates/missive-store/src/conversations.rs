//! CRUD operations for [`Conversation`] records.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use rusqlite::params;
use uuid::Uuid;

use crate::database::Database;
use crate::error::{Result, StoreError};
use crate::models::{canonical_pair, Conversation};

impl Database {
    // ------------------------------------------------------------------
    // Create
    // ------------------------------------------------------------------

    /// Insert a new conversation.
    ///
    /// The `UNIQUE (participant_lo, participant_hi)` constraint rejects a
    /// second conversation for the same pair.
    pub fn create_conversation(&self, conversation: &Conversation) -> Result<()> {
        self.conn().execute(
            "INSERT INTO conversations (id, participant_lo, participant_hi,
                                        last_message_id, last_message_at,
                                        unread_counts, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            params![
                conversation.id.to_string(),
                conversation.participant_lo.to_string(),
                conversation.participant_hi.to_string(),
                conversation.last_message_id.map(|m| m.to_string()),
                conversation.last_message_at.map(|t| t.to_rfc3339()),
                serde_json::to_string(&conversation.unread_counts)?,
                conversation.created_at.to_rfc3339(),
            ],
        )?;
        Ok(())
    }

    // ------------------------------------------------------------------
    // Read
    // ------------------------------------------------------------------

    /// Fetch a single conversation by UUID.
    pub fn get_conversation(&self, id: Uuid) -> Result<Conversation> {
        self.conn()
            .query_row(
                "SELECT id, participant_lo, participant_hi, last_message_id,
                        last_message_at, unread_counts, created_at
                 FROM conversations WHERE id = ?1",
                params![id.to_string()],
                row_to_conversation,
            )
            .map_err(|e| match e {
                rusqlite::Error::QueryReturnedNoRows => StoreError::NotFound,
                other => StoreError::Sqlite(other),
            })
    }

    /// Find the conversation for an unordered participant pair, if one exists.
    pub fn find_conversation_for_pair(&self, a: Uuid, b: Uuid) -> Result<Option<Conversation>> {
        let (lo, hi) = canonical_pair(a, b);
        let result = self.conn().query_row(
            "SELECT id, participant_lo, participant_hi, last_message_id,
                    last_message_at, unread_counts, created_at
             FROM conversations
             WHERE participant_lo = ?1 AND participant_hi = ?2",
            params![lo.to_string(), hi.to_string()],
            row_to_conversation,
        );

        match result {
            Ok(conversation) => Ok(Some(conversation)),
            Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
            Err(other) => Err(StoreError::Sqlite(other)),
        }
    }

    /// List conversations where the user participates, most recent message
    /// first.  Conversations with no messages yet sort last.
    pub fn list_conversations_for_user(&self, user: Uuid) -> Result<Vec<Conversation>> {
        let mut stmt = self.conn().prepare(
            "SELECT id, participant_lo, participant_hi, last_message_id,
                    last_message_at, unread_counts, created_at
             FROM conversations
             WHERE participant_lo = ?1 OR participant_hi = ?1
             ORDER BY last_message_at IS NULL ASC, last_message_at DESC",
        )?;

        let rows = stmt.query_map(params![user.to_string()], row_to_conversation)?;

        let mut conversations = Vec::new();
        for row in rows {
            conversations.push(row?);
        }
        Ok(conversations)
    }

    // ------------------------------------------------------------------
    // Update
    // ------------------------------------------------------------------

    /// Persist a conversation's last-message pointer, its timestamp, and the
    /// unread counters in one statement.
    pub fn update_conversation_message(&self, conversation: &Conversation) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE conversations
             SET last_message_id = ?2, last_message_at = ?3, unread_counts = ?4
             WHERE id = ?1",
            params![
                conversation.id.to_string(),
                conversation.last_message_id.map(|m| m.to_string()),
                conversation.last_message_at.map(|t| t.to_rfc3339()),
                serde_json::to_string(&conversation.unread_counts)?,
            ],
        )?;
        if affected == 0 {
            return Err(StoreError::NotFound);
        }
        Ok(())
    }

    /// Persist only the unread counters of a conversation.
    pub fn update_unread_counts(
        &self,
        id: Uuid,
        unread_counts: &HashMap<Uuid, i64>,
    ) -> Result<()> {
        let affected = self.conn().execute(
            "UPDATE conversations SET unread_counts = ?2 WHERE id = ?1",
            params![id.to_string(), serde_json::to_string(unread_counts)?],
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

/// Map a `rusqlite::Row` to a [`Conversation`].
fn row_to_conversation(row: &rusqlite::Row<'_>) -> rusqlite::Result<Conversation> {
    let id_str: String = row.get(0)?;
    let lo_str: String = row.get(1)?;
    let hi_str: String = row.get(2)?;
    let last_message_str: Option<String> = row.get(3)?;
    let last_message_at_str: Option<String> = row.get(4)?;
    let unread_json: String = row.get(5)?;
    let created_str: String = row.get(6)?;

    let id = Uuid::parse_str(&id_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(0, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let participant_lo = Uuid::parse_str(&lo_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(1, rusqlite::types::Type::Text, Box::new(e))
    })?;
    let participant_hi = Uuid::parse_str(&hi_str).map_err(|e| {
        rusqlite::Error::FromSqlConversionFailure(2, rusqlite::types::Type::Text, Box::new(e))
    })?;

    let last_message_id = last_message_str
        .map(|s| Uuid::parse_str(&s))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(3, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let last_message_at = last_message_at_str
        .map(|s| DateTime::parse_from_rfc3339(&s).map(|dt| dt.with_timezone(&Utc)))
        .transpose()
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(4, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let unread_counts: HashMap<Uuid, i64> = serde_json::from_str(&unread_json)
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(5, rusqlite::types::Type::Text, Box::new(e))
        })?;

    let created_at: DateTime<Utc> = DateTime::parse_from_rfc3339(&created_str)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| {
            rusqlite::Error::FromSqlConversionFailure(6, rusqlite::types::Type::Text, Box::new(e))
        })?;

    Ok(Conversation {
        id,
        participant_lo,
        participant_hi,
        last_message_id,
        last_message_at,
        unread_counts,
        created_at,
    })
}
