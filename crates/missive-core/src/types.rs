//! Request and result types shared by the core operations.

use missive_store::{Conversation, Message, User};
use serde::Serialize;

/// A 1-based page request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Page {
    /// Page number, starting at 1.
    pub number: u32,
    /// Items per page.
    pub size: u32,
}

impl Page {
    /// Build a page request, clamping both fields to at least 1.
    pub fn new(number: u32, size: u32) -> Self {
        Self {
            number: number.max(1),
            size: size.max(1),
        }
    }

    /// Number of items to skip before this page.
    pub fn offset(&self) -> u32 {
        (self.number - 1) * self.size
    }
}

/// Pagination envelope returned alongside every paged result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Pagination {
    pub current_page: u32,
    pub total_pages: u32,
    pub total_count: u64,
    pub has_more: bool,
}

impl Pagination {
    /// Compute the envelope for a page request against a total count.
    pub fn compute(page: Page, total_count: u64) -> Self {
        Self {
            current_page: page.number,
            total_pages: total_count.div_ceil(page.size as u64) as u32,
            total_count,
            has_more: (page.number as u64) * (page.size as u64) < total_count,
        }
    }
}

/// Input to user creation.  The credential arrives already hashed; the core
/// stores it opaquely.
#[derive(Debug, Clone)]
pub struct NewUser {
    pub full_name: String,
    pub username: String,
    pub email: String,
    pub password_hash: String,
    pub avatar_url: Option<String>,
}

/// A conversation annotated for one requesting participant.
#[derive(Debug, Clone)]
pub struct ConversationSummary {
    pub conversation: Conversation,
    /// The participant whose id differs from the requesting user's.
    pub other_participant: User,
    /// The most recent message, if the reference still resolves.
    pub last_message: Option<Message>,
    /// The requesting user's unread counter.
    pub unread_count: i64,
}

/// Result of a successful send: the appended message plus the conversation
/// it landed in, after its counters were updated.
#[derive(Debug, Clone)]
pub struct SentMessage {
    pub message: Message,
    pub conversation: Conversation,
}

/// One page of conversation history, in chronological order.
#[derive(Debug, Clone)]
pub struct HistoryPage {
    pub messages: Vec<Message>,
    pub pagination: Pagination,
}

/// One page of a user search.
#[derive(Debug, Clone)]
pub struct UserPage {
    pub users: Vec<User>,
    pub pagination: Pagination,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn page_clamps_to_one() {
        let page = Page::new(0, 0);
        assert_eq!(page.number, 1);
        assert_eq!(page.size, 1);
        assert_eq!(page.offset(), 0);
    }

    #[test]
    fn pagination_has_more_formula() {
        // has_more is true iff page * size < total.
        assert!(Pagination::compute(Page::new(1, 10), 11).has_more);
        assert!(!Pagination::compute(Page::new(1, 10), 10).has_more);
        assert!(Pagination::compute(Page::new(2, 10), 21).has_more);
        assert!(!Pagination::compute(Page::new(3, 10), 21).has_more);
    }

    #[test]
    fn pagination_total_pages_rounds_up() {
        assert_eq!(Pagination::compute(Page::new(1, 10), 0).total_pages, 0);
        assert_eq!(Pagination::compute(Page::new(1, 10), 1).total_pages, 1);
        assert_eq!(Pagination::compute(Page::new(1, 10), 10).total_pages, 1);
        assert_eq!(Pagination::compute(Page::new(1, 10), 11).total_pages, 2);
    }
}
