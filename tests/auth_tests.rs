use fan_gallery::{
    JwtSessionGate, MemorySessionStore, SessionStoreState, StoredSessionGate,
    auth::{Account, IdentityGate, Role},
    error::ApiError,
};
use std::sync::Arc;

fn accounts() -> Vec<Account> {
    vec![Account {
        identity: "admin".into(),
        secret: "changeme".into(),
        role: Role::Moderator,
    }]
}

fn stored_gate(ttl_secs: i64) -> StoredSessionGate {
    let store = Arc::new(MemorySessionStore::new()) as SessionStoreState;
    StoredSessionGate::new(store, accounts(), ttl_secs)
}

// --- Stored-session backend ---

#[tokio::test]
async fn stored_gate_issues_and_resolves_tokens() {
    let gate = stored_gate(3600);

    let issued = gate.authenticate("admin", "changeme").await.unwrap();
    assert_eq!(issued.session.subject_id, "admin");
    assert_eq!(issued.session.role, Role::Moderator);
    assert!(issued.session.expires_at > issued.session.issued_at);

    let resolved = gate.resolve(&issued.token).await.unwrap();
    assert_eq!(resolved, issued.session);
}

#[tokio::test]
async fn stored_gate_rejects_bad_credentials_uniformly() {
    let gate = stored_gate(3600);

    let unknown = gate.authenticate("ghost", "changeme").await.unwrap_err();
    let wrong_secret = gate.authenticate("admin", "nope").await.unwrap_err();

    assert!(matches!(unknown, ApiError::InvalidCredentials));
    assert_eq!(unknown.kind(), wrong_secret.kind());
}

#[tokio::test]
async fn stored_gate_revoke_destroys_the_session() {
    let gate = stored_gate(3600);

    let issued = gate.authenticate("admin", "changeme").await.unwrap();
    gate.revoke(&issued.token).await.unwrap();

    let resolved = gate.resolve(&issued.token).await;
    assert!(matches!(resolved, Err(ApiError::InvalidCredentials)));
}

#[tokio::test]
async fn stored_gate_never_resolves_expired_sessions() {
    // Negative ttl: the session is born expired.
    let gate = stored_gate(-1);

    let issued = gate.authenticate("admin", "changeme").await.unwrap();
    let resolved = gate.resolve(&issued.token).await;
    assert!(matches!(resolved, Err(ApiError::InvalidCredentials)));
}

#[tokio::test]
async fn stored_gate_rejects_unparseable_tokens() {
    let gate = stored_gate(3600);

    let resolved = gate.resolve("not-a-uuid").await;
    assert!(matches!(resolved, Err(ApiError::InvalidCredentials)));

    // Revoking garbage is still a clean no-op.
    gate.revoke("not-a-uuid").await.unwrap();
}

// --- JWT backend ---

#[tokio::test]
async fn jwt_gate_round_trips_claims() {
    let gate = JwtSessionGate::new("test-secret", accounts(), 3600);

    let issued = gate.authenticate("admin", "changeme").await.unwrap();
    let resolved = gate.resolve(&issued.token).await.unwrap();

    assert_eq!(resolved.subject_id, "admin");
    assert_eq!(resolved.role, Role::Moderator);
}

#[tokio::test]
async fn jwt_gate_rejects_garbage_and_foreign_tokens() {
    let gate = JwtSessionGate::new("test-secret", accounts(), 3600);
    let other = JwtSessionGate::new("different-secret", accounts(), 3600);

    assert!(matches!(
        gate.resolve("garbage.token.here").await,
        Err(ApiError::InvalidCredentials)
    ));

    // Token signed under a different secret must not validate.
    let foreign = other.authenticate("admin", "changeme").await.unwrap();
    assert!(matches!(
        gate.resolve(&foreign.token).await,
        Err(ApiError::InvalidCredentials)
    ));
}

#[tokio::test]
async fn jwt_gate_revoke_is_a_noop() {
    let gate = JwtSessionGate::new("test-secret", accounts(), 3600);

    let issued = gate.authenticate("admin", "changeme").await.unwrap();
    gate.revoke(&issued.token).await.unwrap();

    // Stateless backend: the token stays valid until it expires.
    assert!(gate.resolve(&issued.token).await.is_ok());
}
