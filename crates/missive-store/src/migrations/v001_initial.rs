//! v001 -- Initial schema creation.
//!
//! Creates the three core tables: `users`, `conversations`, and `messages`.

use rusqlite::Connection;

/// SQL executed when upgrading from version 0 to version 1.
const UP_SQL: &str = r#"
-- ----------------------------------------------------------------
-- Users
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS users (
    id            TEXT PRIMARY KEY NOT NULL,               -- UUID v4
    full_name     TEXT NOT NULL,
    username      TEXT NOT NULL COLLATE NOCASE UNIQUE,
    email         TEXT NOT NULL COLLATE NOCASE UNIQUE,
    password_hash TEXT NOT NULL,                           -- opaque to the store
    avatar_url    TEXT,
    is_online     INTEGER NOT NULL DEFAULT 0,              -- boolean 0/1
    last_seen     TEXT NOT NULL,                           -- ISO-8601 / RFC-3339
    created_at    TEXT NOT NULL
);

-- ----------------------------------------------------------------
-- Conversations
--
-- A conversation is identified by its unordered participant pair,
-- stored canonicalized (participant_lo < participant_hi) so the
-- UNIQUE constraint enforces one conversation per pair.
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS conversations (
    id              TEXT PRIMARY KEY NOT NULL,             -- UUID v4
    participant_lo  TEXT NOT NULL,                         -- FK -> users(id)
    participant_hi  TEXT NOT NULL,                         -- FK -> users(id)
    last_message_id TEXT,                                  -- non-owning ref -> messages(id)
    last_message_at TEXT,
    unread_counts   TEXT NOT NULL DEFAULT '{}',            -- JSON map: user id -> count
    created_at      TEXT NOT NULL,

    FOREIGN KEY (participant_lo) REFERENCES users(id),
    FOREIGN KEY (participant_hi) REFERENCES users(id),
    UNIQUE (participant_lo, participant_hi)
);

CREATE INDEX IF NOT EXISTS idx_conversations_last_message_at
    ON conversations(last_message_at DESC);

-- ----------------------------------------------------------------
-- Messages
-- ----------------------------------------------------------------
CREATE TABLE IF NOT EXISTS messages (
    id          TEXT PRIMARY KEY NOT NULL,                 -- UUID v4
    sender_id   TEXT NOT NULL,                             -- FK -> users(id)
    receiver_id TEXT NOT NULL,                             -- FK -> users(id)
    content     TEXT NOT NULL,                             -- text or media URL
    kind        TEXT NOT NULL DEFAULT 'text',              -- text|image|file|audio
    is_read     INTEGER NOT NULL DEFAULT 0,                -- boolean 0/1
    read_at     TEXT,
    created_at  TEXT NOT NULL,

    FOREIGN KEY (sender_id) REFERENCES users(id),
    FOREIGN KEY (receiver_id) REFERENCES users(id)
);

CREATE INDEX IF NOT EXISTS idx_messages_pair
    ON messages(sender_id, receiver_id);

CREATE INDEX IF NOT EXISTS idx_messages_created_at
    ON messages(created_at DESC);

CREATE INDEX IF NOT EXISTS idx_messages_is_read
    ON messages(is_read);
"#;

/// Apply the initial migration.
pub fn up(conn: &Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(UP_SQL)
}
