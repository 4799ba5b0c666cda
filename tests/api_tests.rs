use fan_gallery::{
    AppConfig, AppState, GateState, MemoryRepository, MemorySessionStore, RepositoryState,
    SessionStoreState, StoredSessionGate,
    auth::{Account, Role},
    create_router,
};
use reqwest::{Client, StatusCode};
use serde_json::{Value, json};
use std::sync::Arc;
use tokio::net::TcpListener;

/// Spawns the full application on an ephemeral port, backed by the in-memory
/// repository and session store, and returns its base URL. Each test gets an
/// isolated instance.
async fn spawn_app() -> String {
    let config = AppConfig::default();

    let repo = Arc::new(MemoryRepository::new()) as RepositoryState;
    let store = Arc::new(MemorySessionStore::new()) as SessionStoreState;
    let accounts = vec![Account {
        identity: config.moderator_identity.clone(),
        secret: config.moderator_secret.clone(),
        role: Role::Moderator,
    }];
    let gate =
        Arc::new(StoredSessionGate::new(store, accounts, config.session_ttl_secs)) as GateState;

    let app = create_router(AppState::new(repo, gate, config));

    let listener = TcpListener::bind("127.0.0.1:0")
        .await
        .expect("failed to bind ephemeral port");
    let addr = listener.local_addr().expect("failed to read local addr");

    tokio::spawn(async move {
        axum::serve(listener, app).await.expect("server error");
    });

    format!("http://{addr}")
}

async fn login_moderator(client: &Client, base: &str) -> String {
    let resp = client
        .post(format!("{base}/sessions"))
        .json(&json!({ "identity": "admin", "secret": "changeme" }))
        .send()
        .await
        .expect("login request failed");
    assert_eq!(resp.status(), StatusCode::OK);

    let body: Value = resp.json().await.expect("login body not json");
    body["token"].as_str().expect("token missing").to_string()
}

async fn submit_photo(client: &Client, base: &str, name: &str, caption: &str) -> Value {
    let resp = client
        .post(format!("{base}/submissions"))
        .json(&json!({
            "submitterName": name,
            "caption": caption,
            "payload": "aGVsbG8gd29ybGQ=",
        }))
        .send()
        .await
        .expect("submission request failed");
    assert_eq!(resp.status(), StatusCode::CREATED);
    resp.json().await.expect("submission body not json")
}

#[tokio::test]
async fn health_check_works() {
    let base = spawn_app().await;
    let client = Client::new();

    let resp = client
        .get(format!("{base}/health"))
        .send()
        .await
        .expect("request failed");

    assert_eq!(resp.status(), StatusCode::OK);
    assert_eq!(resp.text().await.unwrap(), "ok");
}

#[tokio::test]
async fn submission_lifecycle_from_intake_to_public_gallery() {
    let base = spawn_app().await;
    let client = Client::new();

    // 1. Anonymous intake: the record enters the queue as pending, and the
    // response never carries the moderator-only field.
    let created = submit_photo(&client, &base, "Ana", "Cheers from the match!").await;
    assert_eq!(created["state"], "pending");
    assert!(created.get("decidedBy").is_none());
    let id = created["id"].as_str().unwrap().to_string();

    // 2. Moderator approves.
    let token = login_moderator(&client, &base).await;
    let resp = client
        .patch(format!("{base}/submissions/{id}/approve"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let approved: Value = resp.json().await.unwrap();
    assert_eq!(approved["state"], "approved");
    assert_eq!(approved["decidedBy"], "admin");
    assert!(approved["decidedAt"].is_string());

    // 3. The photo is now publicly listed, still without the moderator field.
    let resp = client
        .get(format!("{base}/submissions"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let raw = resp.text().await.unwrap();
    assert!(raw.contains(&id));
    assert!(!raw.contains("decidedBy"));

    // 4. A second decision on the same record conflicts.
    let resp = client
        .patch(format!("{base}/submissions/{id}/reject"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CONFLICT);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "invalid_transition");
}

#[tokio::test]
async fn pending_submissions_are_invisible_to_the_public() {
    let base = spawn_app().await;
    let client = Client::new();

    let created = submit_photo(&client, &base, "Bo", "Waiting in the queue").await;
    let id = created["id"].as_str().unwrap();

    // Not in the anonymous listing.
    let listed: Vec<Value> = client
        .get(format!("{base}/submissions"))
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert!(listed.is_empty());

    // Detail view is indistinguishable from a missing record.
    let resp = client
        .get(format!("{base}/submissions/{id}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // A moderator sees it in full.
    let token = login_moderator(&client, &base).await;
    let resp = client
        .get(format!("{base}/submissions/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let full: Value = resp.json().await.unwrap();
    assert_eq!(full["state"], "pending");
    assert!(full["decidedBy"].is_null());
}

#[tokio::test]
async fn anonymous_state_filters_other_than_approved_are_forbidden() {
    let base = spawn_app().await;
    let client = Client::new();

    for state in ["pending", "rejected"] {
        let resp = client
            .get(format!("{base}/submissions?state={state}"))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::FORBIDDEN);
    }

    // state=approved is the one anonymous filter that works.
    let resp = client
        .get(format!("{base}/submissions?state=approved"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);
}

#[tokio::test]
async fn moderation_endpoints_require_a_valid_token() {
    let base = spawn_app().await;
    let client = Client::new();

    let created = submit_photo(&client, &base, "Cy", "Nice try").await;
    let id = created["id"].as_str().unwrap();

    // No token at all.
    let resp = client
        .patch(format!("{base}/submissions/{id}/approve"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // Garbage token.
    let resp = client
        .patch(format!("{base}/submissions/{id}/approve"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    // The record is untouched either way.
    let token = login_moderator(&client, &base).await;
    let full: Value = client
        .get(format!("{base}/submissions/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(full["state"], "pending");
}

#[tokio::test]
async fn invalid_credentials_are_a_uniform_401() {
    let base = spawn_app().await;
    let client = Client::new();

    for (identity, secret) in [("admin", "wrong"), ("nobody", "changeme")] {
        let resp = client
            .post(format!("{base}/sessions"))
            .json(&json!({ "identity": identity, "secret": secret }))
            .send()
            .await
            .unwrap();
        assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

        let body: Value = resp.json().await.unwrap();
        assert_eq!(body["error"], "invalid_credentials");
    }
}

#[tokio::test]
async fn logout_destroys_the_session() {
    let base = spawn_app().await;
    let client = Client::new();

    let token = login_moderator(&client, &base).await;

    // The session resolves before logout...
    let resp = client
        .get(format!("{base}/sessions/current"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let info: Value = resp.json().await.unwrap();
    assert_eq!(info["subjectId"], "admin");
    assert_eq!(info["role"], "moderator");

    let resp = client
        .delete(format!("{base}/sessions"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    // ...and no longer afterwards.
    let resp = client
        .get(format!("{base}/sessions/current"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn logout_with_a_stale_token_still_clears_the_cookie() {
    let base = spawn_app().await;
    let client = Client::new();

    // A cookie naming a session that no longer exists (expired or revoked)
    // is the usual logout state; it must still succeed and clear the cookie.
    let stale = uuid::Uuid::new_v4();
    let resp = client
        .delete(format!("{base}/sessions"))
        .header("Cookie", format!("session={stale}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("clearing set-cookie header missing");
    assert!(cookie.starts_with("session=;"));
    assert!(cookie.contains("Max-Age=0"));

    // Garbage bearer tokens get the same treatment.
    let resp = client
        .delete(format!("{base}/sessions"))
        .bearer_auth("not-a-real-token")
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);
}

#[tokio::test]
async fn session_cookie_works_in_place_of_the_bearer_header() {
    let base = spawn_app().await;
    let client = Client::new();

    let token = login_moderator(&client, &base).await;

    let resp = client
        .get(format!("{base}/sessions/current"))
        .header("Cookie", format!("session={token}"))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let info: Value = resp.json().await.unwrap();
    assert_eq!(info["subjectId"], "admin");
}

#[tokio::test]
async fn login_sets_an_httponly_session_cookie() {
    let base = spawn_app().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/sessions"))
        .json(&json!({ "identity": "admin", "secret": "changeme" }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let cookie = resp
        .headers()
        .get("set-cookie")
        .and_then(|v| v.to_str().ok())
        .expect("set-cookie header missing");
    assert!(cookie.starts_with("session="));
    assert!(cookie.contains("HttpOnly"));
}

#[tokio::test]
async fn submission_validation_failures_are_400() {
    let base = spawn_app().await;
    let client = Client::new();

    let resp = client
        .post(format!("{base}/submissions"))
        .json(&json!({
            "submitterName": "Ana",
            "caption": "   ",
            "payload": "aGVsbG8=",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    let body: Value = resp.json().await.unwrap();
    assert_eq!(body["error"], "validation_error");
}

#[tokio::test]
async fn contact_messages_flow_into_the_moderator_inbox() {
    let base = spawn_app().await;
    let client = Client::new();

    // Public intake.
    let resp = client
        .post(format!("{base}/messages"))
        .json(&json!({
            "name": "Ana",
            "email": "ana@example.com",
            "subject": "Print request",
            "body": "Could I get a print of photo 12?",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::CREATED);

    let created: Value = resp.json().await.unwrap();
    assert_eq!(created["status"], "unread");
    let id = created["id"].as_str().unwrap();

    // A bogus email never makes it in.
    let resp = client
        .post(format!("{base}/messages"))
        .json(&json!({
            "name": "Ana",
            "email": "not-an-email",
            "subject": "Hi",
            "body": "Hello",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::BAD_REQUEST);

    // The inbox itself is moderator-only.
    let resp = client.get(format!("{base}/messages")).send().await.unwrap();
    assert_eq!(resp.status(), StatusCode::UNAUTHORIZED);

    let token = login_moderator(&client, &base).await;
    let inbox: Vec<Value> = client
        .get(format!("{base}/messages"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();
    assert_eq!(inbox.len(), 1);

    // Moderator responds and marks it handled.
    let resp = client
        .patch(format!("{base}/messages/{id}"))
        .bearer_auth(&token)
        .json(&json!({
            "status": "responded",
            "adminResponse": "Sure, sending details by email.",
        }))
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::OK);

    let updated: Value = resp.json().await.unwrap();
    assert_eq!(updated["status"], "responded");
    assert_eq!(updated["adminResponse"], "Sure, sending details by email.");
}

#[tokio::test]
async fn stats_reflect_queue_and_inbox_activity() {
    let base = spawn_app().await;
    let client = Client::new();

    let first = submit_photo(&client, &base, "Ana", "one").await;
    submit_photo(&client, &base, "Bo", "two").await;
    client
        .post(format!("{base}/messages"))
        .json(&json!({
            "name": "Cy",
            "email": "cy@example.com",
            "subject": "Hi",
            "body": "Hello",
        }))
        .send()
        .await
        .unwrap();

    let token = login_moderator(&client, &base).await;
    let id = first["id"].as_str().unwrap();
    client
        .patch(format!("{base}/submissions/{id}/approve"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();

    let stats: Value = client
        .get(format!("{base}/stats"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap()
        .json()
        .await
        .unwrap();

    assert_eq!(stats["totalSubmissions"], 2);
    assert_eq!(stats["pendingSubmissions"], 1);
    assert_eq!(stats["approvedSubmissions"], 1);
    assert_eq!(stats["rejectedSubmissions"], 0);
    assert_eq!(stats["unreadMessages"], 1);
}

#[tokio::test]
async fn delete_removes_the_record_for_good() {
    let base = spawn_app().await;
    let client = Client::new();

    let created = submit_photo(&client, &base, "Ana", "short-lived").await;
    let id = created["id"].as_str().unwrap();
    let token = login_moderator(&client, &base).await;

    let resp = client
        .delete(format!("{base}/submissions/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NO_CONTENT);

    let resp = client
        .get(format!("{base}/submissions/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);

    // Deleting again reports the absence.
    let resp = client
        .delete(format!("{base}/submissions/{id}"))
        .bearer_auth(&token)
        .send()
        .await
        .unwrap();
    assert_eq!(resp.status(), StatusCode::NOT_FOUND);
}
