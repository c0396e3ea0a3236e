//! Application state and HTTP router construction.

use axum::Router;
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;

use crate::api;
use crate::config::Config;
use crate::db::Database;
use crate::events::LibraryEvents;
use crate::graphql::{LibrarySchema, build_schema};
use crate::services::{AuthService, TokenService};

/// Shared state for HTTP handlers (GraphQL, health routes).
#[derive(Clone)]
pub struct AppState {
    pub db: Database,
    pub schema: LibrarySchema,
    pub events: LibraryEvents,
    pub auth: AuthService,
}

impl AppState {
    /// Wire the event bus, auth service and schema around a database
    pub fn new(config: Config, db: Database) -> Self {
        let events = LibraryEvents::new(config.event_bus());
        let tokens = TokenService::new(&config.jwt_secret, config.token_ttl_seconds);
        let auth = AuthService::new(db.clone(), tokens, config.login_password.clone());
        let schema = build_schema(db.clone(), events.clone(), auth.clone());

        Self {
            db,
            schema,
            events,
            auth,
        }
    }
}

/// Build the full Axum router: /graphql, /graphql/ws, health checks and layers.
/// Returns Router<()> (state fully applied) for use with axum::serve.
pub fn build_app(state: AppState) -> Router<()> {
    Router::new()
        .merge(api::health::router())
        .merge(api::graphql::router())
        .layer(
            CorsLayer::new()
                .allow_origin(Any)
                .allow_methods(Any)
                .allow_headers(Any),
        )
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}
