//! # missive-core
//!
//! Conversation and message logic for the Missive direct-messaging service.
//!
//! The crate exposes a [`ChatService`] over the store with three groups of
//! operations:
//!
//! - **user directory** -- resolve, create, search, and presence updates
//! - **conversation registry** -- one conversation per unordered participant
//!   pair, per-participant unread counters, last-message bookkeeping
//! - **message store** -- append-only messages with a monotonic read flag
//!   and paginated history fetches
//!
//! Callers hand every operation an already-authenticated user id; no
//! password or session logic lives here.

pub mod conversations;
pub mod directory;
pub mod messages;
pub mod service;
pub mod types;

mod error;

pub use error::ChatError;
pub use messages::{delivery_status, DeliveryStatus};
pub use service::ChatService;
pub use types::{ConversationSummary, HistoryPage, NewUser, Page, Pagination, SentMessage, UserPage};

pub use missive_store::{Conversation, Database, Message, MessageKind, StoreError, User};

#[cfg(test)]
pub(crate) mod testutil;
