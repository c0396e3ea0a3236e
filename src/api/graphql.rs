//! GraphQL over HTTP and WebSocket
//!
//! Both transports resolve the bearer token to a stored user before the
//! operation runs. A missing or bad token is not an error here; the request
//! simply runs anonymously and protected resolvers reject it.

use async_graphql::http::GraphiQLSource;
use async_graphql_axum::{GraphQLProtocol, GraphQLRequest, GraphQLResponse, GraphQLWebSocket};
use axum::Router;
use axum::extract::{State, WebSocketUpgrade};
use axum::http::header::{ACCEPT, AUTHORIZATION};
use axum::http::{HeaderMap, StatusCode};
use axum::response::{Html, IntoResponse};
use axum::routing::get;
use tracing::{debug, warn};

use crate::AppState;
use crate::graphql::CurrentUser;
use crate::graphql::auth::bearer_token;
use crate::services::AuthService;

pub fn router() -> Router<AppState> {
    Router::new()
        .route("/graphql", get(graphiql).post(graphql_handler))
        .route("/graphql/ws", get(graphql_ws_handler))
}

fn extract_token(headers: &HeaderMap) -> Option<&str> {
    headers
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
        .and_then(bearer_token)
}

async fn resolve_user(auth: &AuthService, token: &str) -> Option<CurrentUser> {
    match auth.authenticate(token).await {
        Ok(user) => user.map(CurrentUser),
        Err(e) => {
            warn!(error = %e, "Failed to resolve token");
            None
        }
    }
}

async fn graphiql(headers: HeaderMap) -> impl IntoResponse {
    let accepts_html = headers
        .get(ACCEPT)
        .and_then(|v| v.to_str().ok())
        .map(|v| v.contains("text/html"))
        .unwrap_or(false);

    if accepts_html {
        Html(
            GraphiQLSource::build()
                .endpoint("/graphql")
                .subscription_endpoint("/graphql/ws")
                .finish(),
        )
        .into_response()
    } else {
        (
            StatusCode::METHOD_NOT_ALLOWED,
            axum::Json(serde_json::json!({
                "error": "GET requests are not supported for GraphQL queries. Use POST with Content-Type: application/json"
            })),
        )
            .into_response()
    }
}

async fn graphql_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    req: GraphQLRequest,
) -> GraphQLResponse {
    let mut request = req.into_inner();
    if let Some(token) = extract_token(&headers) {
        match resolve_user(&state.auth, token).await {
            Some(user) => {
                debug!(user_id = %user.0.id, "Request authenticated");
                request = request.data(user);
            }
            None => debug!("Ignoring invalid auth token"),
        }
    }
    state.schema.execute(request).await.into()
}

async fn graphql_ws_handler(
    State(state): State<AppState>,
    headers: HeaderMap,
    protocol: GraphQLProtocol,
    ws: WebSocketUpgrade,
) -> impl IntoResponse {
    let header_user = match extract_token(&headers) {
        Some(token) => resolve_user(&state.auth, token).await,
        None => None,
    };
    let auth = state.auth.clone();

    ws.protocols(["graphql-transport-ws", "graphql-ws"])
        .on_upgrade(move |socket| {
            GraphQLWebSocket::new(socket, state.schema.clone(), protocol)
                .on_connection_init(move |params| async move {
                    let mut data = async_graphql::Data::default();
                    if let Some(user) = connection_user(&auth, &params, header_user).await {
                        debug!(user_id = %user.0.id, "WebSocket authenticated");
                        data.insert(user);
                    }
                    Ok(data)
                })
                .serve()
        })
}

/// Token carried in a `connection_init` payload, with or without the
/// `Bearer` scheme.
fn connection_init_token(params: &serde_json::Value) -> Option<String> {
    let raw = params
        .get("Authorization")
        .or_else(|| params.get("authorization"))
        .and_then(|v| v.as_str())?;
    Some(bearer_token(raw).unwrap_or(raw.trim()).to_string())
}

/// User for a WebSocket connection.
///
/// A token in `connection_init` decides on its own, even when invalid; the
/// upgrade request's header only applies when the payload carries none.
async fn connection_user(
    auth: &AuthService,
    params: &serde_json::Value,
    header_user: Option<CurrentUser>,
) -> Option<CurrentUser> {
    match connection_init_token(params) {
        Some(token) => resolve_user(auth, &token).await,
        None => header_user,
    }
}
