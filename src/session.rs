use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::{
    auth::{Role, Session},
    error::ApiError,
};

/// SessionStore
///
/// Durable storage for authentication state, keyed by the opaque token handed
/// to the client. Owned exclusively by the [`crate::auth::StoredSessionGate`];
/// no other component reads or writes session records.
#[async_trait]
pub trait SessionStore: Send + Sync {
    async fn insert(&self, token: Uuid, session: &Session) -> Result<(), ApiError>;
    async fn get(&self, token: Uuid) -> Result<Option<Session>, ApiError>;
    async fn remove(&self, token: Uuid) -> Result<(), ApiError>;
}

/// The concrete type used to share session store access.
pub type SessionStoreState = Arc<dyn SessionStore>;

// --- Postgres implementation ---

/// Raw row shape of the `sessions` table. Role is stored as text and parsed on
/// the way out.
#[derive(sqlx::FromRow)]
struct SessionRow {
    subject_id: String,
    role: String,
    issued_at: DateTime<Utc>,
    expires_at: DateTime<Utc>,
}

impl TryFrom<SessionRow> for Session {
    type Error = ApiError;

    fn try_from(row: SessionRow) -> Result<Self, Self::Error> {
        let role = Role::parse(&row.role)
            .ok_or_else(|| ApiError::StorageUnavailable(format!("corrupt role '{}'", row.role)))?;
        Ok(Session {
            subject_id: row.subject_id,
            role,
            issued_at: row.issued_at,
            expires_at: row.expires_at,
        })
    }
}

/// PgSessionStore
///
/// The production session store, backed by the `sessions` table. Every query
/// runs under the configured storage deadline so a wedged connection surfaces
/// as a retryable `Timeout` instead of hanging the login path.
pub struct PgSessionStore {
    pool: PgPool,
    timeout: Duration,
}

impl PgSessionStore {
    pub fn new(pool: PgPool, timeout: Duration) -> Self {
        Self { pool, timeout }
    }

    async fn deadline<T>(
        &self,
        fut: impl Future<Output = Result<T, sqlx::Error>>,
    ) -> Result<T, ApiError> {
        tokio::time::timeout(self.timeout, fut)
            .await
            .map_err(|_| ApiError::Timeout)?
            .map_err(ApiError::from)
    }
}

#[async_trait]
impl SessionStore for PgSessionStore {
    async fn insert(&self, token: Uuid, session: &Session) -> Result<(), ApiError> {
        self.deadline(
            sqlx::query(
                "INSERT INTO sessions (token, subject_id, role, issued_at, expires_at)
                 VALUES ($1, $2, $3, $4, $5)",
            )
            .bind(token)
            .bind(&session.subject_id)
            .bind(session.role.as_str())
            .bind(session.issued_at)
            .bind(session.expires_at)
            .execute(&self.pool),
        )
        .await?;
        Ok(())
    }

    async fn get(&self, token: Uuid) -> Result<Option<Session>, ApiError> {
        let row = self
            .deadline(
                sqlx::query_as::<_, SessionRow>(
                    "SELECT subject_id, role, issued_at, expires_at
                     FROM sessions WHERE token = $1",
                )
                .bind(token)
                .fetch_optional(&self.pool),
            )
            .await?;

        row.map(Session::try_from).transpose()
    }

    async fn remove(&self, token: Uuid) -> Result<(), ApiError> {
        self.deadline(
            sqlx::query("DELETE FROM sessions WHERE token = $1")
                .bind(token)
                .execute(&self.pool),
        )
        .await?;
        Ok(())
    }
}

// --- In-memory implementation (tests and local tooling) ---

/// MemorySessionStore
///
/// Keeps sessions in a process-local map. Used by the test suite so the full
/// login/logout flow runs without a database.
#[derive(Default)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<Uuid, Session>>,
}

impl MemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, token: Uuid, session: &Session) -> Result<(), ApiError> {
        self.sessions.write().await.insert(token, session.clone());
        Ok(())
    }

    async fn get(&self, token: Uuid) -> Result<Option<Session>, ApiError> {
        Ok(self.sessions.read().await.get(&token).cloned())
    }

    async fn remove(&self, token: Uuid) -> Result<(), ApiError> {
        self.sessions.write().await.remove(&token);
        Ok(())
    }
}
