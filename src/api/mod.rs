//! HTTP route definitions
//!
//! The API is GraphQL at /graphql, with subscriptions over WebSocket at
//! /graphql/ws. Health endpoints sit beside it.

pub mod graphql;
pub mod health;
