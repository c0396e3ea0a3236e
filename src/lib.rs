//! Library Backend - GraphQL books and authors service
//!
//! Queries, mutations and the `bookAdded` subscription are served at
//! /graphql. New books fan out to subscribers through the in-process
//! event bus in [`events`].

pub mod api;
pub mod app;
pub mod config;
pub mod db;
pub mod events;
pub mod graphql;
pub mod services;

pub use app::{AppState, build_app};
