//! Domain model structs persisted in the local SQLite database.
//!
//! Every struct derives `Serialize` and `Deserialize` so it can be handed
//! directly to the API layer.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

// ---------------------------------------------------------------------------
// User
// ---------------------------------------------------------------------------

/// A registered user identity.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct User {
    /// Unique user identifier.
    pub id: Uuid,
    /// Display name.
    pub full_name: String,
    /// Unique handle, matched case-insensitively.
    pub username: String,
    /// Unique email address, matched case-insensitively.
    pub email: String,
    /// Credential hash.  Opaque to the store; produced by the login boundary.
    pub password_hash: String,
    /// Optional avatar image URL.
    pub avatar_url: Option<String>,
    /// Whether the user currently has an active session.
    pub is_online: bool,
    /// Last time the online flag was mutated (login or logout).
    pub last_seen: DateTime<Utc>,
    /// When the account was created.
    pub created_at: DateTime<Utc>,
}

// ---------------------------------------------------------------------------
// Conversation
// ---------------------------------------------------------------------------

/// A pairwise conversation between two users.
///
/// The participant pair is stored canonicalized (`participant_lo <
/// participant_hi` by UUID ordering) so that the unordered pair maps to
/// exactly one record.  `unread_counts` is a map keyed by participant id
/// rather than a fixed pair of counters, leaving the schema open to N-way
/// conversations.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Conversation {
    /// Unique conversation identifier.
    pub id: Uuid,
    /// Smaller participant id of the canonicalized pair.
    pub participant_lo: Uuid,
    /// Larger participant id of the canonicalized pair.
    pub participant_hi: Uuid,
    /// Non-owning reference to the most recent message, if any.
    pub last_message_id: Option<Uuid>,
    /// Creation time of the most recent message, if any.
    pub last_message_at: Option<DateTime<Utc>>,
    /// Per-participant unread message counters.
    pub unread_counts: HashMap<Uuid, i64>,
    /// When the conversation was created.
    pub created_at: DateTime<Utc>,
}

impl Conversation {
    /// Create a fresh conversation for an unordered participant pair, with
    /// all unread counters at zero.
    pub fn new(a: Uuid, b: Uuid) -> Self {
        let (lo, hi) = canonical_pair(a, b);
        Self {
            id: Uuid::new_v4(),
            participant_lo: lo,
            participant_hi: hi,
            last_message_id: None,
            last_message_at: None,
            unread_counts: HashMap::new(),
            created_at: Utc::now(),
        }
    }

    /// Both participant ids, in canonical order.
    pub fn participants(&self) -> [Uuid; 2] {
        [self.participant_lo, self.participant_hi]
    }

    /// Whether the given user is one of the participants.
    pub fn is_participant(&self, user: Uuid) -> bool {
        user == self.participant_lo || user == self.participant_hi
    }

    /// The participant whose id differs from `user`, if `user` participates.
    pub fn other_participant(&self, user: Uuid) -> Option<Uuid> {
        if user == self.participant_lo {
            Some(self.participant_hi)
        } else if user == self.participant_hi {
            Some(self.participant_lo)
        } else {
            None
        }
    }

    /// The unread counter for a participant (zero if absent).
    pub fn unread_for(&self, user: Uuid) -> i64 {
        self.unread_counts.get(&user).copied().unwrap_or(0)
    }
}

/// Normalize an unordered pair of user ids into (lo, hi) order.
pub fn canonical_pair(mut a: Uuid, mut b: Uuid) -> (Uuid, Uuid) {
    if a > b {
        std::mem::swap(&mut a, &mut b);
    }
    (a, b)
}

// ---------------------------------------------------------------------------
// Message
// ---------------------------------------------------------------------------

/// Content type tag carried by every message.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum MessageKind {
    #[default]
    Text,
    Image,
    File,
    Audio,
}

impl MessageKind {
    /// The tag as stored in the `kind` column.
    pub fn as_str(&self) -> &'static str {
        match self {
            MessageKind::Text => "text",
            MessageKind::Image => "image",
            MessageKind::File => "file",
            MessageKind::Audio => "audio",
        }
    }
}

impl std::str::FromStr for MessageKind {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "text" => Ok(MessageKind::Text),
            "image" => Ok(MessageKind::Image),
            "file" => Ok(MessageKind::File),
            "audio" => Ok(MessageKind::Audio),
            other => Err(format!("unknown message kind: {other}")),
        }
    }
}

/// A single direct message.
///
/// Append-only: once stored, the only permitted mutation is flipping
/// `is_read` to true (and stamping `read_at`) when the receiver reads it.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Message {
    /// Unique message identifier.
    pub id: Uuid,
    /// Sender's user id.
    pub sender_id: Uuid,
    /// Receiver's user id.
    pub receiver_id: Uuid,
    /// Message text, or a URL for media kinds.
    pub content: String,
    /// Content type tag.
    pub kind: MessageKind,
    /// Whether the receiver has read the message.  Never reset once true.
    pub is_read: bool,
    /// When the receiver read the message, if they have.
    pub read_at: Option<DateTime<Utc>>,
    /// When the message was sent.
    pub created_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn canonical_pair_is_order_independent() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        assert_eq!(canonical_pair(a, b), canonical_pair(b, a));
    }

    #[test]
    fn other_participant() {
        let a = Uuid::new_v4();
        let b = Uuid::new_v4();
        let conv = Conversation::new(a, b);

        assert_eq!(conv.other_participant(a), Some(b));
        assert_eq!(conv.other_participant(b), Some(a));
        assert_eq!(conv.other_participant(Uuid::new_v4()), None);
    }

    #[test]
    fn unread_defaults_to_zero() {
        let conv = Conversation::new(Uuid::new_v4(), Uuid::new_v4());
        assert_eq!(conv.unread_for(conv.participant_lo), 0);
    }
}
