//! Event fan-out from mutations to live GraphQL subscriptions.

pub mod bus;

pub use bus::{
    Event, EventBus, EventBusConfig, EventBusError, Subscription, SubscriptionId, Topic,
    DEFAULT_QUEUE_CAPACITY,
};

use crate::db::BookRecord;

/// Topic carrying every newly persisted book.
pub const BOOK_ADDED: &str = "BOOK_ADDED";

/// Bus carrying library events to subscription resolvers.
pub type LibraryEvents = EventBus<BookRecord>;
