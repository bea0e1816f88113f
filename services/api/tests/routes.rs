//! End-to-end tests of the HTTP surface.
//!
//! The router is assembled exactly as in the binary, on top of the in-memory
//! store and a stub identity provider, and driven with `tower::ServiceExt::oneshot`.

use api_lib::config::Config;
use api_lib::web::{self, AppState};
use async_trait::async_trait;
use axum::{
    body::{to_bytes, Body},
    http::{header, Method, Request, StatusCode},
    Router,
};
use chrono::Duration;
use serde_json::{json, Value};
use snippedia_core::memory::InMemoryStore;
use snippedia_core::ports::{IdentityProvider, PortError, PortResult, SnippetStore};
use snippedia_core::{RemoteProfile, SessionIssuer};
use std::sync::Arc;
use tower::ServiceExt;
use uuid::Uuid;

const SECRET: &str = "integration-test-secret";

// ============================================================================
// HARNESS
// ============================================================================

/// Hands out one access token per known code; each token maps to a profile.
struct StubGitHub;

#[async_trait]
impl IdentityProvider for StubGitHub {
    async fn exchange_code(&self, code: &str) -> PortResult<String> {
        match code {
            "ada-code" => Ok("ada-token".to_string()),
            "linus-code" => Ok("linus-token".to_string()),
            _ => Err(PortError::Unauthorized),
        }
    }

    async fn fetch_profile(&self, access_token: &str) -> PortResult<RemoteProfile> {
        let (id, login) = match access_token {
            "ada-token" => (42, "ada"),
            "linus-token" => (7, "linus"),
            _ => return Err(PortError::Unexpected("unknown token".to_string())),
        };
        Ok(RemoteProfile {
            id,
            login: login.to_string(),
            email: format!("{}@example.com", login),
            avatar_url: format!("https://avatars.example.com/{}", id),
            bio: String::new(),
            html_url: format!("https://github.com/{}", login),
        })
    }
}

fn test_config() -> Config {
    Config {
        bind_address: "127.0.0.1:0".parse().unwrap(),
        database_url: "postgres://unused".to_string(),
        db_max_connections: 1,
        log_level: tracing::Level::INFO,
        github_client_id: "client".to_string(),
        github_client_secret: "secret".to_string(),
        github_token_url: "http://github.invalid/token".to_string(),
        github_api_url: "http://github.invalid".to_string(),
        jwt_secret: SECRET.to_string(),
        jwt_expiration: Duration::days(7),
        frontend_url: "http://localhost:3000".to_string(),
        allowed_origins: vec!["http://localhost:3000".to_string()],
    }
}

struct TestApp {
    router: Router,
    store: Arc<InMemoryStore>,
}

impl TestApp {
    fn new() -> Self {
        Self::with_config(test_config())
    }

    fn with_config(config: Config) -> Self {
        let store = Arc::new(InMemoryStore::new());
        let state = Arc::new(AppState::new(
            Arc::new(config),
            store.clone(),
            store.clone(),
            Arc::new(StubGitHub),
        ));
        Self {
            router: web::router(state),
            store,
        }
    }

    async fn send(&self, request: Request<Body>) -> (StatusCode, Value, Option<String>) {
        let response = self.router.clone().oneshot(request).await.unwrap();
        let status = response.status();
        let location = response
            .headers()
            .get(header::LOCATION)
            .map(|v| v.to_str().unwrap().to_string());
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let body = if bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&bytes).unwrap()
        };
        (status, body, location)
    }

    async fn call(
        &self,
        method: Method,
        uri: &str,
        token: Option<&str>,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        let mut builder = Request::builder().method(method).uri(uri);
        if let Some(token) = token {
            builder = builder.header(header::AUTHORIZATION, format!("Bearer {}", token));
        }
        let request = match body {
            Some(json) => builder
                .header(header::CONTENT_TYPE, "application/json")
                .body(Body::from(json.to_string()))
                .unwrap(),
            None => builder.body(Body::empty()).unwrap(),
        };
        let (status, body, _) = self.send(request).await;
        (status, body)
    }

    /// Logs in through the OAuth callback and returns the session token.
    async fn login(&self, code: &str) -> String {
        let request = Request::builder()
            .uri(format!("/auth/github/callback?code={}", code))
            .body(Body::empty())
            .unwrap();
        let (status, _, location) = self.send(request).await;
        assert_eq!(status, StatusCode::SEE_OTHER);

        let location = location.expect("redirect location");
        location
            .strip_prefix("http://localhost:3000/?token=")
            .expect("token in redirect")
            .to_string()
    }

    async fn create_snippet(&self, token: &str) -> String {
        let (status, body) = self
            .call(
                Method::POST,
                "/api/snippets",
                Some(token),
                Some(json!({
                    "title": "Binary search",
                    "description": "Classic",
                    "code": "fn search() {}",
                    "language": "rust",
                    "tags": ["algorithms"]
                })),
            )
            .await;
        assert_eq!(status, StatusCode::CREATED);
        body["id"].as_str().unwrap().to_string()
    }
}

// ============================================================================
// LOGIN AND AUTHENTICATION
// ============================================================================

#[tokio::test]
async fn login_issues_token_that_authenticates_profile() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;

    let (status, body) = app
        .call(Method::GET, "/api/user/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["username"], "ada");
    assert_eq!(body["github_url"], "https://github.com/ada");
    assert_eq!(body["badges"], json!([]));

    // The token's subject is the local id of the created account.
    let issuer = SessionIssuer::new(SECRET.as_bytes().to_vec(), Duration::days(7));
    let user_id = issuer.validate(&token).unwrap();
    assert_eq!(body["id"], user_id.to_string());
}

#[tokio::test]
async fn logging_in_twice_reuses_the_account() {
    let app = TestApp::new();
    let first = app.login("ada-code").await;
    let second = app.login("ada-code").await;

    let (_, a) = app.call(Method::GET, "/api/user/profile", Some(&first), None).await;
    let (_, b) = app.call(Method::GET, "/api/user/profile", Some(&second), None).await;
    assert_eq!(a["id"], b["id"]);
    assert_eq!(app.store.user_count().await, 1);
}

#[tokio::test]
async fn callback_without_code_is_bad_request() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/auth/github/callback", None, None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("Code is required"));
}

#[tokio::test]
async fn callback_with_rejected_code_is_unauthorized() {
    let app = TestApp::new();
    let (status, body) = app
        .call(Method::GET, "/auth/github/callback?code=stale", None, None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn protected_routes_require_a_bearer_token() {
    let app = TestApp::new();

    let (status, body) = app.call(Method::GET, "/api/user/profile", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert!(body["error"].is_string());

    let (status, _) = app
        .call(Method::GET, "/api/user/profile", Some("garbage"), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);

    let (status, _) = app
        .call(Method::POST, "/api/snippets", None, Some(json!({"title": "t", "code": "c"})))
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn expired_token_is_unauthorized() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let issuer = SessionIssuer::new(SECRET.as_bytes().to_vec(), Duration::days(7));
    let user_id = issuer.validate(&token).unwrap();

    let stale = issuer
        .issue_at(user_id, chrono::Utc::now() - Duration::days(8))
        .unwrap();
    let (status, body) = app
        .call(Method::GET, "/api/user/profile", Some(&stale), None)
        .await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
    assert_eq!(body["error"], "Session token has expired");
}

#[tokio::test]
async fn token_for_deleted_user_is_not_found() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let issuer = SessionIssuer::new(SECRET.as_bytes().to_vec(), Duration::days(7));
    app.store.remove_user(issuer.validate(&token).unwrap()).await;

    let (status, body) = app
        .call(Method::GET, "/api/user/profile", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "User not found");
}

// ============================================================================
// SNIPPETS
// ============================================================================

#[tokio::test]
async fn created_snippet_is_listed_publicly_with_author() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let id = app.create_snippet(&token).await;

    let (status, body) = app.call(Method::GET, "/api/snippets", None, None).await;
    assert_eq!(status, StatusCode::OK);
    let list = body.as_array().unwrap();
    assert_eq!(list.len(), 1);
    assert_eq!(list[0]["id"], id);
    assert_eq!(list[0]["author_username"], "ada");
    assert_eq!(list[0]["useful"], 0);
    assert_eq!(list[0]["tags"], json!(["algorithms"]));
}

#[tokio::test]
async fn snippet_without_code_is_rejected() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;

    let (status, _) = app
        .call(Method::POST, "/api/snippets", Some(&token), Some(json!({"title": "t", "code": " "})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let (status, body) = app
        .call(Method::POST, "/api/snippets", Some(&token), Some(json!({"title": 5})))
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].is_string());
}

#[tokio::test]
async fn get_snippet_distinguishes_malformed_and_missing_ids() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;

    let (status, _) = app
        .call(Method::GET, "/api/snippets/not-an-id", Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);

    let missing = format!("/api/snippets/{}", Uuid::new_v4());
    let (status, body) = app.call(Method::GET, &missing, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["error"], "Snippet not found");
}

#[tokio::test]
async fn only_the_author_can_delete() {
    let app = TestApp::new();
    let ada = app.login("ada-code").await;
    let linus = app.login("linus-code").await;
    let id = app.create_snippet(&ada).await;
    let uri = format!("/api/snippets/{}", id);

    let (status, _) = app.call(Method::DELETE, &uri, Some(&linus), None).await;
    assert_eq!(status, StatusCode::FORBIDDEN);
    let (status, _) = app.call(Method::GET, &uri, Some(&linus), None).await;
    assert_eq!(status, StatusCode::OK);

    let (status, body) = app.call(Method::DELETE, &uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["success"], true);
    let (status, _) = app.call(Method::GET, &uri, Some(&ada), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn unimplemented_edits_return_501() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let id = app.create_snippet(&token).await;

    let (status, _) = app
        .call(Method::PUT, &format!("/api/snippets/{}", id), Some(&token), Some(json!({})))
        .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let uri = format!("/api/snippets/{}/comments/{}", id, Uuid::new_v4());
    let (status, _) = app.call(Method::DELETE, &uri, Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
}

#[tokio::test]
async fn legacy_collection_routes_return_501() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let id = app.create_snippet(&token).await;

    let (status, body) = app
        .call(
            Method::POST,
            &format!("/api/snippets/{}/comments", id),
            Some(&token),
            Some(json!({"content": "hi"})),
        )
        .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);
    assert_eq!(body["error"], "Not implemented");

    let (status, _) = app
        .call(Method::DELETE, &format!("/api/snippets/{}/bookmark", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let (status, _) = app.call(Method::GET, "/api/bookmarks", Some(&token), None).await;
    assert_eq!(status, StatusCode::NOT_IMPLEMENTED);

    let (status, _) = app.call(Method::GET, "/api/bookmarks", None, None).await;
    assert_eq!(status, StatusCode::UNAUTHORIZED);
}

// ============================================================================
// INTERACTIONS
// ============================================================================

#[tokio::test]
async fn reactions_are_idempotent_and_switchable() {
    let app = TestApp::new();
    let ada = app.login("ada-code").await;
    let linus = app.login("linus-code").await;
    let id = app.create_snippet(&ada).await;
    let react = |kind: &str| format!("/api/snippets/{}/reaction?type={}", id, kind);

    for _ in 0..2 {
        let (status, body) = app.call(Method::POST, &react("useful"), Some(&linus), None).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
    }
    let (_, snippet) = app
        .call(Method::GET, &format!("/api/snippets/{}", id), Some(&linus), None)
        .await;
    assert_eq!(snippet["useful"], 1);
    assert_eq!(snippet["reactions"].as_array().unwrap().len(), 1);

    app.call(Method::POST, &react("refactored"), Some(&linus), None).await;
    let stored = app
        .store
        .get_snippet(Uuid::parse_str(&id).unwrap())
        .await
        .unwrap();
    assert_eq!(stored.useful, 0);
    assert_eq!(stored.refactored, 1);
    assert_eq!(stored.reactions.len(), 1);
}

#[tokio::test]
async fn unknown_reaction_type_is_rejected() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let id = app.create_snippet(&token).await;

    let (status, body) = app
        .call(Method::POST, &format!("/api/snippets/{}/reaction?type=awesome", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert!(body["error"].as_str().unwrap().contains("awesome"));

    let (status, _) = app
        .call(Method::POST, &format!("/api/snippets/{}/reaction", id), Some(&token), None)
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn bookmark_toggles_and_feeds_bookmark_list() {
    let app = TestApp::new();
    let ada = app.login("ada-code").await;
    let linus = app.login("linus-code").await;
    let id = app.create_snippet(&ada).await;
    let uri = format!("/api/snippets/{}/bookmark", id);

    let (status, body) = app.call(Method::POST, &uri, Some(&linus), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["bookmarked"], true);

    let (_, list) = app.call(Method::GET, "/api/user/bookmarks", Some(&linus), None).await;
    assert_eq!(list.as_array().unwrap().len(), 1);
    assert_eq!(list[0]["bookmarked_by"].as_array().unwrap().len(), 1);

    let (_, body) = app.call(Method::POST, &uri, Some(&linus), None).await;
    assert_eq!(body["bookmarked"], false);
    let (_, list) = app.call(Method::GET, "/api/user/bookmarks", Some(&linus), None).await;
    assert!(list.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn comments_and_replies_are_appended() {
    let app = TestApp::new();
    let ada = app.login("ada-code").await;
    let linus = app.login("linus-code").await;
    let id = app.create_snippet(&ada).await;
    let uri = format!("/api/snippets/{}/comment", id);

    let (status, comment) = app
        .call(Method::POST, &uri, Some(&linus), Some(json!({"content": "Neat"})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(comment["author_username"], "linus");
    assert_eq!(comment["is_reply"], false);
    assert!(comment.get("parent_id").is_none());

    let parent = comment["id"].as_str().unwrap().to_string();
    let (status, reply) = app
        .call(Method::POST, &uri, Some(&ada), Some(json!({"content": "Thanks", "parentId": parent})))
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(reply["is_reply"], true);
    assert_eq!(reply["parent_id"], parent);

    let (_, snippet) = app
        .call(Method::GET, &format!("/api/snippets/{}", id), Some(&ada), None)
        .await;
    let contents: Vec<&str> = snippet["comments"]
        .as_array()
        .unwrap()
        .iter()
        .map(|c| c["content"].as_str().unwrap())
        .collect();
    assert_eq!(contents, ["Neat", "Thanks"]);
}

#[tokio::test]
async fn comment_with_malformed_parent_is_rejected() {
    let app = TestApp::new();
    let token = app.login("ada-code").await;
    let id = app.create_snippet(&token).await;

    let (status, _) = app
        .call(
            Method::POST,
            &format!("/api/snippets/{}/comment", id),
            Some(&token),
            Some(json!({"content": "hi", "parentId": "zzz"})),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
}

#[tokio::test]
async fn user_snippets_lists_only_own() {
    let app = TestApp::new();
    let ada = app.login("ada-code").await;
    let linus = app.login("linus-code").await;
    let id = app.create_snippet(&ada).await;

    let (_, own) = app.call(Method::GET, "/api/user/snippets", Some(&ada), None).await;
    assert_eq!(own.as_array().unwrap().len(), 1);
    assert_eq!(own[0]["id"], id);

    let (_, other) = app.call(Method::GET, "/api/user/snippets", Some(&linus), None).await;
    assert!(other.as_array().unwrap().is_empty());
}

#[tokio::test]
async fn health_is_public() {
    let app = TestApp::new();
    let (status, body) = app.call(Method::GET, "/health", None, None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "ok");
}

#[tokio::test]
async fn wildcard_origin_is_skipped_when_building_the_router() {
    let mut config = test_config();
    config.allowed_origins = api_lib::config::parse_origins("*, http://localhost:3000");
    let app = TestApp::with_config(config);

    let request = Request::builder()
        .uri("/health")
        .header(header::ORIGIN, "http://localhost:3000")
        .body(Body::empty())
        .unwrap();
    let response = app.router.clone().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    assert_eq!(
        response.headers().get(header::ACCESS_CONTROL_ALLOW_ORIGIN).unwrap(),
        "http://localhost:3000"
    );
}
