//! Schema roots and construction

use async_graphql::{MergedObject, Schema};

use crate::db::Database;
use crate::events::LibraryEvents;
use crate::services::AuthService;

use super::mutations::{AuthorMutations, BookMutations, UserMutations};
use super::queries::{AuthorQueries, BookQueries, SystemQueries, UserQueries};
pub use super::subscriptions::SubscriptionRoot;

pub type LibrarySchema = Schema<QueryRoot, MutationRoot, SubscriptionRoot>;

#[derive(MergedObject, Default)]
pub struct QueryRoot(BookQueries, AuthorQueries, UserQueries, SystemQueries);

#[derive(MergedObject, Default)]
pub struct MutationRoot(BookMutations, AuthorMutations, UserMutations);

/// Build the GraphQL schema with all services attached
pub fn build_schema(db: Database, events: LibraryEvents, auth: AuthService) -> LibrarySchema {
    Schema::build(QueryRoot::default(), MutationRoot::default(), SubscriptionRoot)
        .data(db)
        .data(events)
        .data(auth)
        .finish()
}
