//! Conversation registry: one conversation per unordered participant pair,
//! with per-participant unread counters and last-message bookkeeping.

use missive_store::{Conversation, Message, StoreError};
use uuid::Uuid;

use crate::error::Result;
use crate::service::ChatService;
use crate::types::ConversationSummary;

impl ChatService {
    /// Return the conversation for an unordered participant pair, creating
    /// it with zeroed counters if none exists.
    ///
    /// Idempotent: the canonicalized pair carries a uniqueness constraint,
    /// so the same pair always maps to the same conversation.  Fails with
    /// [`ChatError::NotFound`] if either participant is unknown.
    ///
    /// [`ChatError::NotFound`]: crate::ChatError::NotFound
    pub fn find_or_create_conversation(&self, a: Uuid, b: Uuid) -> Result<Conversation> {
        self.resolve_user(a)?;
        self.resolve_user(b)?;

        if let Some(existing) = self.db.find_conversation_for_pair(a, b)? {
            return Ok(existing);
        }

        let conversation = Conversation::new(a, b);
        self.db.create_conversation(&conversation)?;
        tracing::debug!(conversation_id = %conversation.id, "conversation created");

        Ok(conversation)
    }

    /// Record a newly appended message against its conversation: update the
    /// last-message pointer and timestamp, and increment the recipient's
    /// unread counter (initializing to one if absent).
    ///
    /// Side-effecting write with no rollback path; on failure the caller
    /// must not assume partial state was applied.
    pub fn record_new_message(
        &self,
        conversation: &mut Conversation,
        message: &Message,
        recipient: Uuid,
    ) -> Result<()> {
        conversation.last_message_id = Some(message.id);
        conversation.last_message_at = Some(message.created_at);
        *conversation.unread_counts.entry(recipient).or_insert(0) += 1;

        self.db.update_conversation_message(conversation)?;
        Ok(())
    }

    /// Zero one participant's unread counter.  No-op if already zero.
    pub fn mark_conversation_read(
        &self,
        conversation: &mut Conversation,
        participant: Uuid,
    ) -> Result<()> {
        if conversation.unread_for(participant) == 0 {
            return Ok(());
        }

        conversation.unread_counts.insert(participant, 0);
        self.db
            .update_unread_counts(conversation.id, &conversation.unread_counts)?;
        Ok(())
    }

    /// List every conversation the user participates in, most recent message
    /// first (conversations with no messages yet sort last), each annotated
    /// with the other participant, the last message, and the caller's unread
    /// counter.
    pub fn list_conversations(&self, user: Uuid) -> Result<Vec<ConversationSummary>> {
        self.resolve_user(user)?;

        let conversations = self.db.list_conversations_for_user(user)?;
        let mut summaries = Vec::with_capacity(conversations.len());

        for conversation in conversations {
            let Some(other_id) = conversation.other_participant(user) else {
                continue;
            };
            let other_participant = self.resolve_user(other_id)?;

            // The last-message reference is non-owning; tolerate a dangling
            // pointer by surfacing no preview instead of failing the list.
            let last_message = match conversation.last_message_id {
                Some(id) => match self.db.get_message_by_id(id) {
                    Ok(message) => Some(message),
                    Err(StoreError::NotFound) => None,
                    Err(e) => return Err(e.into()),
                },
                None => None,
            };

            let unread_count = conversation.unread_for(user);
            summaries.push(ConversationSummary {
                conversation,
                other_participant,
                last_message,
                unread_count,
            });
        }

        Ok(summaries)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ChatError;
    use crate::testutil::{new_user, service};
    use crate::types::Page;
    use missive_store::MessageKind;

    #[test]
    fn find_or_create_is_idempotent_across_orderings() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        let first = svc.find_or_create_conversation(a.id, b.id).unwrap();
        let second = svc.find_or_create_conversation(b.id, a.id).unwrap();

        assert_eq!(first.id, second.id);
        assert_eq!(first.unread_for(a.id), 0);
        assert_eq!(first.unread_for(b.id), 0);
    }

    #[test]
    fn find_or_create_rejects_unknown_participant() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();

        let err = svc
            .find_or_create_conversation(a.id, Uuid::new_v4())
            .unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[test]
    fn record_new_message_updates_pointer_and_counter() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        let sent = svc
            .send_message(a.id, b.id, "hello", MessageKind::Text)
            .unwrap();
        let conversation = sent.conversation;

        assert_eq!(conversation.last_message_id, Some(sent.message.id));
        assert_eq!(conversation.last_message_at, Some(sent.message.created_at));
        assert_eq!(conversation.unread_for(b.id), 1);
        assert_eq!(conversation.unread_for(a.id), 0);

        // The update is durable, not just in-memory.
        let stored = svc
            .database()
            .find_conversation_for_pair(a.id, b.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.unread_for(b.id), 1);
    }

    #[test]
    fn mark_read_zeroes_only_that_participant() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();

        svc.send_message(a.id, b.id, "one", MessageKind::Text).unwrap();
        svc.send_message(b.id, a.id, "two", MessageKind::Text).unwrap();

        let mut conversation = svc
            .database()
            .find_conversation_for_pair(a.id, b.id)
            .unwrap()
            .unwrap();
        assert_eq!(conversation.unread_for(a.id), 1);
        assert_eq!(conversation.unread_for(b.id), 1);

        svc.mark_conversation_read(&mut conversation, b.id).unwrap();

        let stored = svc
            .database()
            .find_conversation_for_pair(a.id, b.id)
            .unwrap()
            .unwrap();
        assert_eq!(stored.unread_for(b.id), 0);
        assert_eq!(stored.unread_for(a.id), 1);

        // Marking again is a no-op, not an error.
        let mut again = stored;
        svc.mark_conversation_read(&mut again, b.id).unwrap();
        assert_eq!(again.unread_for(b.id), 0);
    }

    #[test]
    fn list_orders_by_recency_with_empty_conversations_last() {
        let (_dir, svc) = service();
        let me = svc.create_user(new_user("mel", "mel@example.com")).unwrap();
        let x = svc.create_user(new_user("xavier", "x@example.com")).unwrap();
        let y = svc.create_user(new_user("yann", "y@example.com")).unwrap();
        let z = svc.create_user(new_user("zoe", "z@example.com")).unwrap();

        // A conversation that never saw a message.
        svc.find_or_create_conversation(me.id, z.id).unwrap();
        svc.send_message(me.id, x.id, "older", MessageKind::Text).unwrap();
        svc.send_message(y.id, me.id, "newer", MessageKind::Text).unwrap();

        let summaries = svc.list_conversations(me.id).unwrap();
        let others: Vec<_> = summaries
            .iter()
            .map(|s| s.other_participant.username.as_str())
            .collect();
        assert_eq!(others, vec!["yann", "xavier", "zoe"]);

        assert_eq!(summaries[0].unread_count, 1);
        assert_eq!(summaries[0].last_message.as_ref().unwrap().content, "newer");
        assert_eq!(summaries[1].unread_count, 0);
        assert!(summaries[2].last_message.is_none());
    }

    #[test]
    fn list_rejects_unknown_user() {
        let (_dir, svc) = service();
        let err = svc.list_conversations(Uuid::new_v4()).unwrap_err();
        assert!(matches!(err, ChatError::NotFound(_)));
    }

    #[test]
    fn history_is_isolated_per_pair() {
        let (_dir, svc) = service();
        let a = svc.create_user(new_user("alice", "alice@example.com")).unwrap();
        let b = svc.create_user(new_user("bob", "bob@example.com")).unwrap();
        let c = svc.create_user(new_user("carol", "carol@example.com")).unwrap();

        svc.send_message(a.id, b.id, "to bob", MessageKind::Text).unwrap();
        svc.send_message(a.id, c.id, "to carol", MessageKind::Text).unwrap();

        let history = svc
            .fetch_history_between(b.id, a.id, Page::new(1, 50))
            .unwrap();
        assert_eq!(history.messages.len(), 1);
        assert_eq!(history.messages[0].content, "to bob");
    }
}
