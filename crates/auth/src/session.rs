//! Cookie sessions and flash messages.
//!
//! A session is addressed by an opaque random token carried in the session
//! cookie. Stores key sessions by the SHA-256 digest of the token, so the
//! token itself is never kept server-side.

use std::collections::HashMap;
use std::sync::RwLock;

use async_trait::async_trait;
use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

use crate::{AuthError, AuthResult, SESSION_TTL_DAYS};

/// Opaque session token sent to the browser.
#[derive(Clone, PartialEq, Eq)]
pub struct SessionToken(String);

impl std::fmt::Debug for SessionToken {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("SessionToken").field(&"<redacted>").finish()
    }
}

impl SessionToken {
    /// Generates a new random token.
    pub fn generate() -> Self {
        let mut rng = rand::rng();
        let bytes: Vec<u8> = (0..32).map(|_| rng.random::<u8>()).collect();
        Self(URL_SAFE_NO_PAD.encode(&bytes))
    }

    /// Wraps a token read from a cookie.
    pub fn from_cookie(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    /// Returns the cookie value.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Returns the storage key for this token.
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.0.as_bytes());
        URL_SAFE_NO_PAD.encode(hasher.finalize())
    }
}

/// The logged-in user as remembered by the session.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionUser {
    /// User ID.
    pub id: Uuid,
    /// Username.
    pub username: String,
    /// Email address, if the user registered one.
    pub email: Option<String>,
}

/// Flash message category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FlashKind {
    Error,
    Success,
}

/// One-time messages shown on the next rendered page.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flash {
    pub error: Vec<String>,
    pub success: Vec<String>,
}

impl Flash {
    /// Queues a message.
    pub fn push(&mut self, kind: FlashKind, message: impl Into<String>) {
        match kind {
            FlashKind::Error => self.error.push(message.into()),
            FlashKind::Success => self.success.push(message.into()),
        }
    }

    /// Returns true if no message is queued.
    pub fn is_empty(&self) -> bool {
        self.error.is_empty() && self.success.is_empty()
    }

    /// Removes and returns every queued message.
    pub fn take(&mut self) -> Flash {
        std::mem::take(self)
    }
}

/// Server-side session record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Logged-in user, if any.
    pub user: Option<SessionUser>,
    /// Pending flash messages.
    pub flash: Flash,
    /// When the session was created.
    pub created_at: DateTime<Utc>,
    /// When the session expires unless saved again.
    pub expires_at: DateTime<Utc>,
}

impl Default for Session {
    fn default() -> Self {
        Self::new()
    }
}

impl Session {
    /// Creates an empty session.
    pub fn new() -> Self {
        let now = Utc::now();
        Self {
            user: None,
            flash: Flash::default(),
            created_at: now,
            expires_at: now + Duration::days(SESSION_TTL_DAYS),
        }
    }

    /// Returns true if the session holds neither a user nor flash messages.
    ///
    /// Empty sessions are not persisted.
    pub fn is_empty(&self) -> bool {
        self.user.is_none() && self.flash.is_empty()
    }

    /// Returns true if the session has expired.
    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }
}

/// Trait for session storage.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Loads a live session. Expired sessions are treated as absent.
    async fn load(&self, token: &SessionToken) -> AuthResult<Option<Session>>;

    /// Saves a session and extends its expiry by the store TTL.
    async fn save(&self, token: &SessionToken, session: &Session) -> AuthResult<()>;

    /// Destroys a session.
    async fn destroy(&self, token: &SessionToken) -> AuthResult<()>;

    /// Removes expired sessions.
    ///
    /// Returns the number of sessions removed.
    async fn cleanup_expired(&self) -> AuthResult<usize>;
}

/// In-memory session store.
#[derive(Debug)]
pub struct MemorySessionStore {
    sessions: RwLock<HashMap<String, Session>>,
    ttl: Duration,
}

impl Default for MemorySessionStore {
    fn default() -> Self {
        Self::new()
    }
}

impl MemorySessionStore {
    /// Creates a store with the default 14-day TTL.
    pub fn new() -> Self {
        Self::with_ttl(Duration::days(SESSION_TTL_DAYS))
    }

    /// Creates a store with a custom TTL.
    pub fn with_ttl(ttl: Duration) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            ttl,
        }
    }

    /// Returns the number of stored sessions, expired ones included.
    pub fn len(&self) -> usize {
        self.sessions.read().map(|s| s.len()).unwrap_or(0)
    }

    /// Returns true if no session is stored.
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

fn poisoned(e: impl std::fmt::Display) -> AuthError {
    AuthError::SessionStore(format!("Lock poisoned: {}", e))
}

#[async_trait]
impl SessionStore for MemorySessionStore {
    async fn load(&self, token: &SessionToken) -> AuthResult<Option<Session>> {
        let sessions = self.sessions.read().map_err(poisoned)?;
        Ok(sessions
            .get(&token.digest())
            .filter(|session| !session.is_expired())
            .cloned())
    }

    async fn save(&self, token: &SessionToken, session: &Session) -> AuthResult<()> {
        let mut record = session.clone();
        record.expires_at = Utc::now() + self.ttl;

        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.insert(token.digest(), record);
        Ok(())
    }

    async fn destroy(&self, token: &SessionToken) -> AuthResult<()> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        sessions.remove(&token.digest());
        Ok(())
    }

    async fn cleanup_expired(&self) -> AuthResult<usize> {
        let mut sessions = self.sessions.write().map_err(poisoned)?;
        let before_count = sessions.len();
        sessions.retain(|_, session| !session.is_expired());
        Ok(before_count - sessions.len())
    }
}
