//! Message operations: append-only send and paginated history fetches with
//! the read-on-fetch side effect.

use chrono::Utc;
use missive_store::{Message, MessageKind};
use serde::Serialize;
use uuid::Uuid;

use crate::error::{ChatError, Result};
use crate::service::ChatService;
use crate::types::{HistoryPage, Page, Pagination, SentMessage};

/// Displayed delivery state of a message.
///
/// Computed, never persisted: the only stored bit is the read flag, combined
/// with the receiver's live presence flag at render time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum DeliveryStatus {
    Sent,
    Delivered,
    Seen,
}

/// Derive the displayed status from the read flag and the receiver's online
/// flag.
pub fn delivery_status(is_read: bool, receiver_online: bool) -> DeliveryStatus {
    if is_read {
        DeliveryStatus::Seen
    } else if receiver_online {
        DeliveryStatus::Delivered
    } else {
        DeliveryStatus::Sent
    }
}

impl ChatService {
    /// Append a new message and update its conversation's bookkeeping.
    ///
    /// The message append and the conversation update are two separate
    /// writes: a durably appended message whose counter update fails is
    /// surfaced as [`ChatError::Persistence`] without rolling back the
    /// append.  The unread counter is best-effort, not a source of truth
    /// for message existence.
    pub fn send_message(
        &self,
        sender: Uuid,
        receiver: Uuid,
        content: &str,
        kind: MessageKind,
    ) -> Result<SentMessage> {
        let content = content.trim();
        if content.is_empty() {
            return Err(ChatError::Validation(
                "Message content must not be empty".to_string(),
            ));
        }

        for id in [sender, receiver] {
            match self.resolve_user(id) {
                Ok(_) => {}
                Err(ChatError::NotFound(_)) => {
                    return Err(ChatError::Validation(
                        "Invalid sender or receiver ID".to_string(),
                    ))
                }
                Err(other) => return Err(other),
            }
        }

        let message = Message {
            id: Uuid::new_v4(),
            sender_id: sender,
            receiver_id: receiver,
            content: content.to_string(),
            kind,
            is_read: false,
            read_at: None,
            created_at: Utc::now(),
        };
        self.db.insert_message(&message)?;

        let mut conversation = self.find_or_create_conversation(sender, receiver)?;
        self.record_new_message(&mut conversation, &message, receiver)?;

        tracing::info!(
            message_id = %message.id,
            conversation_id = %conversation.id,
            kind = message.kind.as_str(),
            "message sent"
        );

        Ok(SentMessage {
            message,
            conversation,
        })
    }

    /// Fetch one page of a conversation's history on behalf of one of its
    /// participants.
    ///
    /// Fails with [`ChatError::NotFound`] when the conversation does not
    /// exist or the requesting user is not a participant.
    pub fn fetch_history(
        &self,
        conversation_id: Uuid,
        requesting_user: Uuid,
        page: Page,
    ) -> Result<HistoryPage> {
        let conversation = self.db.get_conversation(conversation_id).map_err(|e| match e {
            missive_store::StoreError::NotFound => {
                ChatError::NotFound("Conversation not found or access denied".to_string())
            }
            other => other.into(),
        })?;

        let Some(other) = conversation.other_participant(requesting_user) else {
            return Err(ChatError::NotFound(
                "Conversation not found or access denied".to_string(),
            ));
        };

        self.fetch_history_between(requesting_user, other, page)
    }

    /// Fetch one page of the messages exchanged with `other`, oldest first.
    ///
    /// Reading has a bulk, best-effort side effect: every currently-unread
    /// message addressed to the requesting user from `other` is marked read,
    /// and the requester's unread counter is zeroed.  The side effect is not
    /// transactionally tied to the returned page; a message on a later page
    /// may be marked read before the reader has scrolled to it.
    pub fn fetch_history_between(
        &self,
        requesting_user: Uuid,
        other: Uuid,
        page: Page,
    ) -> Result<HistoryPage> {
        let mut messages =
            self.db
                .get_messages_between(requesting_user, other, page.size, page.offset())?;

        let flipped = self
            .db
            .mark_messages_read(requesting_user, other, Utc::now())?;
        if flipped > 0 {
            tracing::debug!(count = flipped, user_id = %requesting_user, "messages marked read");
        }

        if let Some(mut conversation) = self
            .db
            .find_conversation_for_pair(requesting_user, other)?
        {
            self.mark_conversation_read(&mut conversation, requesting_user)?;
        }

        let total = self.db.count_messages_between(requesting_user, other)?;

        // Pages are taken newest-first, then delivered in chronological order.
        messages.reverse();

        Ok(HistoryPage {
            messages,
            pagination: Pagination::compute(page, total),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testutil::{new_user, service};

    #[test]
    fn delivery_status_derivation() {
        assert_eq!(delivery_status(true, true), DeliveryStatus::Seen);
        assert_eq!(delivery_status(true, false), DeliveryStatus::Seen);
        assert_eq!(delivery_status(false, true), DeliveryStatus::Delivered);
        assert_eq!(delivery_status(false, false), DeliveryStatus::Sent);
    }

    #[test]
    fn send_then_fetch_round_trip() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        svc.send_message(a.id, b.id, "see attachment", MessageKind::Image)
            .unwrap();

        let history = svc
            .fetch_history_between(b.id, a.id, Page::new(1, 50))
            .unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].content, "see attachment");
        assert_eq!(history.messages[0].kind, MessageKind::Image);
        assert_eq!(history.messages[0].sender_id, a.id);
    }

    #[test]
    fn send_rejects_empty_content() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        let err = svc
            .send_message(a.id, b.id, "   ", MessageKind::Text)
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn send_rejects_unknown_users() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();

        let err = svc
            .send_message(a.id, Uuid::new_v4(), "hi", MessageKind::Text)
            .unwrap_err();
        assert!(matches!(err, ChatError::Validation(_)));
    }

    #[test]
    fn read_cycle_marks_seen_and_resets_counter() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        let sent = svc.send_message(a.id, b.id, "hi", MessageKind::Text).unwrap();
        assert_eq!(sent.conversation.unread_for(b.id), 1);

        let history = svc
            .fetch_history_between(b.id, a.id, Page::new(1, 50))
            .unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].content, "hi");

        // The fetch flipped the stored read flag; the derived status is now
        // seen regardless of presence.
        let stored = svc.database().get_message_by_id(sent.message.id).unwrap();
        assert!(stored.is_read);
        assert!(stored.read_at.is_some());
        assert_eq!(delivery_status(stored.is_read, false), DeliveryStatus::Seen);

        let conversation = svc
            .database()
            .find_conversation_for_pair(a.id, b.id)
            .unwrap()
            .unwrap();
        assert_eq!(conversation.unread_for(b.id), 0);
    }

    #[test]
    fn read_flag_never_resets_and_spares_own_messages() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        let from_a = svc.send_message(a.id, b.id, "ping", MessageKind::Text).unwrap();
        let from_b = svc.send_message(b.id, a.id, "pong", MessageKind::Text).unwrap();

        svc.fetch_history_between(b.id, a.id, Page::new(1, 50)).unwrap();

        // Only the message addressed to b flipped.
        let stored_a = svc.database().get_message_by_id(from_a.message.id).unwrap();
        let stored_b = svc.database().get_message_by_id(from_b.message.id).unwrap();
        assert!(stored_a.is_read);
        assert!(!stored_b.is_read);

        // A second fetch leaves the original read timestamp in place.
        let first_read_at = stored_a.read_at;
        svc.fetch_history_between(b.id, a.id, Page::new(1, 50)).unwrap();
        let again = svc.database().get_message_by_id(from_a.message.id).unwrap();
        assert_eq!(again.read_at, first_read_at);
    }

    #[test]
    fn back_to_back_sends_keep_attribution_and_order() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        svc.send_message(a.id, b.id, "first", MessageKind::Text).unwrap();
        svc.send_message(b.id, a.id, "second", MessageKind::Text).unwrap();

        let history = svc
            .fetch_history_between(a.id, b.id, Page::new(1, 50))
            .unwrap();
        let contents: Vec<_> = history.messages.iter().map(|m| m.content.as_str()).collect();
        assert_eq!(contents, vec!["first", "second"]);
        assert_eq!(history.messages[0].sender_id, a.id);
        assert_eq!(history.messages[1].sender_id, b.id);
    }

    #[test]
    fn pagination_concatenates_without_gaps_or_duplicates() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        for i in 0..5 {
            svc.send_message(a.id, b.id, &format!("m{i}"), MessageKind::Text)
                .unwrap();
        }

        let mut pages = Vec::new();
        for number in 1..=3 {
            let page = svc
                .fetch_history_between(b.id, a.id, Page::new(number, 2))
                .unwrap();
            assert_eq!(page.pagination.total_count, 5);
            assert_eq!(page.pagination.total_pages, 3);
            assert_eq!(page.pagination.has_more, (number as u64) * 2 < 5);
            pages.push(page);
        }

        // Later pages hold older messages; reassemble oldest-first.
        let mut all: Vec<String> = Vec::new();
        for page in pages.iter().rev() {
            all.extend(page.messages.iter().map(|m| m.content.clone()));
        }
        assert_eq!(all, vec!["m0", "m1", "m2", "m3", "m4"]);
    }

    #[test]
    fn fetch_history_by_id_requires_participation() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();
        let c = svc.create_user(new_user("carol", "carol@example.com")).unwrap();

        let sent = svc.send_message(a.id, b.id, "private", MessageKind::Text).unwrap();
        let conversation_id = sent.conversation.id;

        let history = svc
            .fetch_history(conversation_id, b.id, Page::new(1, 50))
            .unwrap();
        assert_eq!(history.messages.len(), 1);

        let err = svc
            .fetch_history(conversation_id, c.id, Page::new(1, 50))
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));

        let err = svc
            .fetch_history(Uuid::new_v4(), b.id, Page::new(1, 50))
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }
}
