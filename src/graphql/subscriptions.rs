//! GraphQL subscriptions for real-time updates
//!
//! Each subscribing client gets its own event bus subscription. When the
//! client goes away the stream is dropped, which cancels the subscription.

use async_graphql::{Context, Result, ResultExt, Subscription};
use futures::{Stream, StreamExt};
use tracing::debug;

use crate::events::{BOOK_ADDED, LibraryEvents};

use super::errors::ApiError;
use super::types::Book;

pub struct SubscriptionRoot;

#[Subscription]
impl SubscriptionRoot {
    /// Every book added after the subscription starts
    async fn book_added(&self, ctx: &Context<'_>) -> Result<impl Stream<Item = Book>> {
        let events = ctx.data::<LibraryEvents>()?;
        let subscription = events
            .subscribe(BOOK_ADDED)
            .map_err(ApiError::from)
            .extend()?;

        debug!(subscription = %subscription.id(), "bookAdded subscription started");
        Ok(subscription.map(|event| Book::from(event.value)))
    }
}
