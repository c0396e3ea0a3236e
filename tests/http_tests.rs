//! Integration tests for the HTTP router
//!
//! Requests go through the full axum app (layers included) via `oneshot`.

use axum::Router;
use axum::body::{Body, to_bytes};
use axum::http::{Request, StatusCode, header};
use pretty_assertions::assert_eq;
use serde_json::{Value, json};
use tower::ServiceExt;

use library_backend::config::Config;
use library_backend::db::{CreateUser, Database};
use library_backend::{AppState, build_app};

async fn setup() -> (AppState, Router) {
    let db = Database::in_memory().await.unwrap();
    let config = Config {
        jwt_secret: "http-secret".to_string(),
        ..Config::default()
    };
    let state = AppState::new(config, db);
    let app = build_app(state.clone());
    (state, app)
}

async fn body_json(response: axum::response::Response) -> Value {
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn graphql_post(query: &str, token: Option<&str>) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri("/graphql")
        .header(header::CONTENT_TYPE, "application/json");
    if let Some(token) = token {
        builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
    }
    builder
        .body(Body::from(json!({ "query": query }).to_string()))
        .unwrap()
}

#[tokio::test]
async fn test_healthz() {
    let (_, app) = setup().await;

    let response = app
        .oneshot(Request::get("/healthz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await["status"], json!("healthy"));
}

#[tokio::test]
async fn test_readyz() {
    let (_, app) = setup().await;

    let response = app
        .oneshot(Request::get("/readyz").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "ready": true, "database": true, "subscriptions": 0 })
    );
}

#[tokio::test]
async fn test_graphql_post() {
    let (_, app) = setup().await;

    let response = app
        .oneshot(graphql_post("{ bookCount authorCount }", None))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        body_json(response).await,
        json!({ "data": { "bookCount": 0, "authorCount": 0 } })
    );
}

#[tokio::test]
async fn test_bearer_token_binds_current_user() {
    let (state, app) = setup().await;
    let user = state
        .db
        .users()
        .create(CreateUser {
            username: "mluukkai".to_string(),
            favorite_genre: "refactoring".to_string(),
        })
        .await
        .unwrap();
    let token = state.auth.tokens().issue(&user, state.auth.tokens().ttl()).unwrap();

    let response = app
        .clone()
        .oneshot(graphql_post("{ me { username } }", Some(&token)))
        .await
        .unwrap();
    assert_eq!(
        body_json(response).await,
        json!({ "data": { "me": { "username": "mluukkai" } } })
    );

    // a bad token means anonymous, not a failed request
    let response = app
        .oneshot(graphql_post("{ me { username } }", Some("garbage")))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(body_json(response).await, json!({ "data": { "me": null } }));
}

#[tokio::test]
async fn test_graphql_get_without_html_is_rejected() {
    let (_, app) = setup().await;

    let response = app
        .clone()
        .oneshot(Request::get("/graphql").body(Body::empty()).unwrap())
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);

    let response = app
        .oneshot(
            Request::get("/graphql")
                .header(header::ACCEPT, "text/html")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
}

#[tokio::test]
async fn test_graphql_ws_requires_upgrade() {
    let (_, app) = setup().await;

    let response = app
        .oneshot(
            Request::get("/graphql/ws")
                .header("sec-websocket-protocol", "graphql-transport-ws")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();

    // mounted, but a plain GET is not a websocket handshake
    assert_ne!(response.status(), StatusCode::NOT_FOUND);
    assert!(response.status().is_client_error());
}
