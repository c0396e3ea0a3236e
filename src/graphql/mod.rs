//! GraphQL API with subscriptions for real-time updates
//!
//! Queries and mutations are split per domain under `queries/` and
//! `mutations/` and merged into the roots in `schema.rs`. The `bookAdded`
//! subscription is fed by the event bus.

pub mod auth;
pub mod errors;
pub mod mutations;
pub mod queries;
mod schema;
mod subscriptions;
pub mod types;

pub use auth::{AuthExt, CurrentUser};
pub use errors::{ApiError, ApiResult};
pub use schema::{LibrarySchema, MutationRoot, QueryRoot, SubscriptionRoot, build_schema};
