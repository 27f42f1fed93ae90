#![allow(dead_code)]
use std::net::SocketAddr;
use std::sync::Arc;

use jsonwebtoken::{encode, EncodingKey, Header};
use uuid::Uuid;

use orgmanager_backend::{api, auth::TokenDecoder, store::memory::MemoryStore, AppState};

pub const JWT_SECRET: &str = "test-secret-that-is-at-least-32-chars-long!!";

pub struct TestApp {
    pub addr: SocketAddr,
    pub store: Arc<MemoryStore>,
}

impl TestApp {
    pub fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }
}

/// Spin up a real Axum server on a random port backed by a fresh in-memory
/// store. Tokens signed with `JWT_SECRET` pass verification.
pub async fn setup_test_app() -> TestApp {
    setup_with_decoder(TokenDecoder::new(Some(JWT_SECRET.to_string()), false)).await
}

pub async fn setup_with_decoder(tokens: TokenDecoder) -> TestApp {
    let store = Arc::new(MemoryStore::new());

    let state = AppState {
        store: store.clone(),
        tokens,
    };
    let app = api::router(state);

    let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
        .await
        .expect("Failed to bind to random port");
    let addr = listener.local_addr().unwrap();

    tokio::spawn(async move {
        axum::serve(listener, app).await.unwrap();
    });

    TestApp { addr, store }
}

/// A user id that no other test will use.
pub fn unique_user(prefix: &str) -> String {
    format!("{}-{}", prefix, &Uuid::new_v4().to_string()[..8])
}

/// Sign a token for `user_id` with the test secret.
pub fn token_for(user_id: &str) -> String {
    sign(
        &serde_json::json!({ "sub": user_id, "email": format!("{}@test.local", user_id) }),
        JWT_SECRET,
    )
}

pub fn sign(claims: &serde_json::Value, secret: &str) -> String {
    encode(
        &Header::default(),
        claims,
        &EncodingKey::from_secret(secret.as_bytes()),
    )
    .expect("Failed to sign token")
}

/// Build a reqwest client (reusable across requests in a test).
pub fn http_client() -> reqwest::Client {
    reqwest::Client::new()
}

/// Create an organization through the API and return the response body.
pub async fn create_org(
    app: &TestApp,
    token: &str,
    name: &str,
    description: &str,
) -> serde_json::Value {
    let resp = http_client()
        .post(app.url("/organizations"))
        .bearer_auth(token)
        .json(&serde_json::json!({
            "name": name,
            "description": description,
        }))
        .send()
        .await
        .expect("Create request failed");

    assert_eq!(resp.status(), 200, "Create should return 200");
    resp.json().await.expect("Failed to parse create response")
}
