use async_trait::async_trait;
use axum::{
    extract::{FromRef, FromRequestParts, OptionalFromRequestParts},
    http::{HeaderMap, header, request::Parts},
};
use chrono::{DateTime, Duration, Utc};
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use ts_rs::TS;
use utoipa::ToSchema;
use uuid::Uuid;

use crate::{error::ApiError, session::SessionStoreState};

/// Role
///
/// The caller's privilege level, resolved from their session. Used for all
/// Role-Based Access Control decisions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS, ToSchema)]
#[serde(rename_all = "lowercase")]
#[ts(export)]
pub enum Role {
    Anonymous,
    Submitter,
    Moderator,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::Anonymous => "anonymous",
            Role::Submitter => "submitter",
            Role::Moderator => "moderator",
        }
    }

    pub fn parse(s: &str) -> Option<Role> {
        match s {
            "anonymous" => Some(Role::Anonymous),
            "submitter" => Some(Role::Submitter),
            "moderator" => Some(Role::Moderator),
            _ => None,
        }
    }
}

/// Session
///
/// The authenticated state of one caller. Created by a successful credential
/// check, destroyed by logout or expiry, and never mutated in between.
#[derive(Debug, Clone, PartialEq)]
pub struct Session {
    pub subject_id: String,
    pub role: Role,
    pub issued_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn is_expired(&self) -> bool {
        self.expires_at <= Utc::now()
    }
}

/// authorize
///
/// The pure authorization check: does this session carry the required role?
/// Fails closed. A missing session is always `Forbidden`, never implicitly
/// anonymous-privileged, and an expired session is treated as missing even if
/// a stale copy of it is still in hand.
pub fn authorize(session: Option<&Session>, required: Role) -> Result<(), ApiError> {
    let session = session.ok_or(ApiError::Forbidden)?;
    if session.is_expired() {
        return Err(ApiError::Forbidden);
    }
    if session.role != required {
        return Err(ApiError::Forbidden);
    }
    Ok(())
}

/// Account
///
/// A configured login. The service ships with a single moderator account from
/// `AppConfig`; the account list is an explicit dependency of the gate rather
/// than an ambient lookup.
#[derive(Debug, Clone)]
pub struct Account {
    pub identity: String,
    pub secret: String,
    pub role: Role,
}

/// A freshly authenticated session together with the token that names it.
#[derive(Debug, Clone)]
pub struct IssuedSession {
    pub token: String,
    pub session: Session,
}

/// IdentityGate
///
/// The single authentication seam of the application. Two interchangeable
/// implementations exist: [`StoredSessionGate`] (opaque tokens persisted in the
/// session store) and [`JwtSessionGate`] (stateless signed tokens). Which one
/// backs the running service is selected by `AppConfig::auth_backend`.
#[async_trait]
pub trait IdentityGate: Send + Sync {
    /// Validates credentials and issues a session. Unknown identities and wrong
    /// secrets produce the same `InvalidCredentials` error so the response
    /// leaks nothing about which field was wrong.
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<IssuedSession, ApiError>;

    /// Resolves a presented token to a live session. Expired, revoked, or
    /// malformed tokens never resolve.
    async fn resolve(&self, token: &str) -> Result<Session, ApiError>;

    /// Destroys the session named by the token, if the backend supports it.
    async fn revoke(&self, token: &str) -> Result<(), ApiError>;
}

/// The shared trait-object handle used across the application state.
pub type GateState = Arc<dyn IdentityGate>;

/// Uniform credential check shared by both gate implementations.
fn verify_credentials(accounts: &[Account], identity: &str, secret: &str) -> Result<Role, ApiError> {
    accounts
        .iter()
        .find(|a| a.identity == identity && a.secret == secret)
        .map(|a| a.role)
        .ok_or(ApiError::InvalidCredentials)
}

// --- Backend 1: opaque tokens in the session store ---

/// StoredSessionGate
///
/// Issues random opaque tokens and keeps the authoritative session record in a
/// [`crate::session::SessionStore`]. Logout genuinely destroys the session.
pub struct StoredSessionGate {
    store: SessionStoreState,
    accounts: Vec<Account>,
    ttl: Duration,
}

impl StoredSessionGate {
    pub fn new(store: SessionStoreState, accounts: Vec<Account>, ttl_secs: i64) -> Self {
        Self {
            store,
            accounts,
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

#[async_trait]
impl IdentityGate for StoredSessionGate {
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<IssuedSession, ApiError> {
        let role = verify_credentials(&self.accounts, identity, secret)?;

        let now = Utc::now();
        let session = Session {
            subject_id: identity.to_string(),
            role,
            issued_at: now,
            expires_at: now + self.ttl,
        };

        let token = Uuid::new_v4();
        self.store.insert(token, &session).await?;

        tracing::info!(subject = identity, "issued stored session");
        Ok(IssuedSession {
            token: token.to_string(),
            session,
        })
    }

    async fn resolve(&self, token: &str) -> Result<Session, ApiError> {
        let token: Uuid = token.parse().map_err(|_| ApiError::InvalidCredentials)?;

        let session = self
            .store
            .get(token)
            .await?
            .ok_or(ApiError::InvalidCredentials)?;

        if session.is_expired() {
            // Lazy cleanup: an expired row is destroyed the moment it is seen.
            self.store.remove(token).await?;
            return Err(ApiError::InvalidCredentials);
        }

        Ok(session)
    }

    async fn revoke(&self, token: &str) -> Result<(), ApiError> {
        if let Ok(token) = token.parse::<Uuid>() {
            self.store.remove(token).await?;
        }
        Ok(())
    }
}

// --- Backend 2: stateless signed tokens ---

/// Claims
///
/// The payload structure signed into a JWT by [`JwtSessionGate`]. Validated on
/// every authenticated request.
#[derive(Debug, Serialize, Deserialize)]
pub struct Claims {
    /// Subject: the identity that logged in.
    pub sub: String,
    /// The subject's role at issue time.
    pub role: String,
    /// Expiration time, seconds since epoch.
    pub exp: usize,
    /// Issued-at time, seconds since epoch.
    pub iat: usize,
}

/// JwtSessionGate
///
/// Stateless alternative backend: the session lives entirely inside the signed
/// token. `revoke` is a no-op because there is no server-side record to
/// destroy; such tokens simply age out at `exp`.
pub struct JwtSessionGate {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    accounts: Vec<Account>,
    ttl: Duration,
}

impl JwtSessionGate {
    pub fn new(secret: &str, accounts: Vec<Account>, ttl_secs: i64) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            accounts,
            ttl: Duration::seconds(ttl_secs),
        }
    }
}

#[async_trait]
impl IdentityGate for JwtSessionGate {
    async fn authenticate(&self, identity: &str, secret: &str) -> Result<IssuedSession, ApiError> {
        let role = verify_credentials(&self.accounts, identity, secret)?;

        let now = Utc::now();
        let expires_at = now + self.ttl;
        let claims = Claims {
            sub: identity.to_string(),
            role: role.as_str().to_string(),
            exp: expires_at.timestamp() as usize,
            iat: now.timestamp() as usize,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)
            .map_err(|_| ApiError::InvalidCredentials)?;

        tracing::info!(subject = identity, "issued jwt session");
        Ok(IssuedSession {
            token,
            session: Session {
                subject_id: identity.to_string(),
                role,
                issued_at: now,
                expires_at,
            },
        })
    }

    async fn resolve(&self, token: &str) -> Result<Session, ApiError> {
        let mut validation = Validation::default();
        validation.validate_exp = true;

        // Any decode failure (expired signature, malformed token, bad signature)
        // collapses to the same generic error.
        let data = decode::<Claims>(token, &self.decoding_key, &validation)
            .map_err(|_| ApiError::InvalidCredentials)?;

        let role = Role::parse(&data.claims.role).ok_or(ApiError::InvalidCredentials)?;

        let issued_at = DateTime::from_timestamp(data.claims.iat as i64, 0)
            .ok_or(ApiError::InvalidCredentials)?;
        let expires_at = DateTime::from_timestamp(data.claims.exp as i64, 0)
            .ok_or(ApiError::InvalidCredentials)?;

        Ok(Session {
            subject_id: data.claims.sub,
            role,
            issued_at,
            expires_at,
        })
    }

    async fn revoke(&self, _token: &str) -> Result<(), ApiError> {
        // Stateless tokens cannot be destroyed server-side; they expire on their own.
        Ok(())
    }
}

// --- Axum extractor ---

/// AuthSession
///
/// The resolved identity of an authenticated request, usable as a handler
/// argument. Carries the raw token alongside the session so logout can revoke it.
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub session: Session,
    pub token: String,
}

/// Pulls the session token from `Authorization: Bearer` or, failing that, from
/// the `session` cookie set by POST /sessions.
pub(crate) fn extract_token(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
    {
        if let Some(token) = value.strip_prefix("Bearer ") {
            return Some(token.to_string());
        }
    }

    let cookies = headers.get(header::COOKIE)?.to_str().ok()?;
    cookies
        .split(';')
        .map(str::trim)
        .find_map(|pair| pair.strip_prefix("session=").map(str::to_string))
}

impl<S> FromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let gate = GateState::from_ref(state);

        let token = extract_token(&parts.headers).ok_or(ApiError::InvalidCredentials)?;
        let session = gate.resolve(&token).await?;

        Ok(AuthSession { session, token })
    }
}

/// Optional variant used on routes that serve both anonymous and moderator
/// callers (e.g. GET /submissions). No credentials resolves to `None`, but a
/// *presented* token that fails to resolve is still a hard rejection, never a
/// silent downgrade to anonymous.
impl<S> OptionalFromRequestParts<S> for AuthSession
where
    S: Send + Sync,
    GateState: FromRef<S>,
{
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &S,
    ) -> Result<Option<Self>, Self::Rejection> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(None);
        };

        let gate = GateState::from_ref(state);
        let session = gate.resolve(&token).await?;

        Ok(Some(AuthSession { session, token }))
    }
}
