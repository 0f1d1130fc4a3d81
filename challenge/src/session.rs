//! Per-requester challenge session state.
//!
//! Sessions are owned by the issuance layer. The challenge borrows one
//! mutably for the duration of a single `process` call.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::time::Duration;
use uuid::Uuid;

/// Unique session identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SessionId(Uuid);

impl SessionId {
    /// Generate a random session id.
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Underlying UUID.
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for SessionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

/// Certificate subject name being requested, in NDN URI form
/// (e.g. `/ndn/edu/example/alice`).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SubjectName(String);

impl SubjectName {
    /// Wrap a name.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self(name.into())
    }

    /// Name as a string slice.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SubjectName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SubjectName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// Parameters of the latest attempt, kept raw.
#[derive(Clone, PartialEq, Eq)]
pub struct OidcChallengeState {
    /// Client-chosen identifier.
    pub oidc_id: Vec<u8>,

    /// Authorization code as submitted.
    pub access_code: Vec<u8>,
}

impl fmt::Debug for OidcChallengeState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("OidcChallengeState")
            .field("oidc_id", &String::from_utf8_lossy(&self.oidc_id))
            .field("access_code", &"<redacted>")
            .finish()
    }
}

/// State of one requester's challenge across attempts.
///
/// # Invariants
///
/// - `remaining_retries` never increases
/// - only the latest attempt's parameters are retained
#[derive(Debug, Clone)]
pub struct ChallengeSession {
    session_id: SessionId,
    subject_name: SubjectName,
    challenge_state: Option<OidcChallengeState>,
    remaining_retries: u32,
    expires_at: DateTime<Utc>,
}

impl ChallengeSession {
    /// Open a session expiring `time_limit` from now.
    #[must_use]
    pub fn new(subject_name: SubjectName, retry_limit: u32, time_limit: Duration) -> Self {
        let expires_at = chrono::Duration::from_std(time_limit)
            .ok()
            .and_then(|limit| Utc::now().checked_add_signed(limit))
            .unwrap_or(DateTime::<Utc>::MAX_UTC);
        Self::with_expiry(subject_name, retry_limit, expires_at)
    }

    /// Open a session with an explicit expiry.
    #[must_use]
    pub fn with_expiry(
        subject_name: SubjectName,
        retry_limit: u32,
        expires_at: DateTime<Utc>,
    ) -> Self {
        Self {
            session_id: SessionId::new(),
            subject_name,
            challenge_state: None,
            remaining_retries: retry_limit,
            expires_at,
        }
    }

    /// Session id.
    #[must_use]
    pub const fn session_id(&self) -> SessionId {
        self.session_id
    }

    /// Subject name being requested.
    #[must_use]
    pub const fn subject_name(&self) -> &SubjectName {
        &self.subject_name
    }

    /// Parameters of the latest attempt, if any reached the exchange step.
    #[must_use]
    pub const fn challenge_state(&self) -> Option<&OidcChallengeState> {
        self.challenge_state.as_ref()
    }

    /// Attempts left.
    #[must_use]
    pub const fn remaining_retries(&self) -> u32 {
        self.remaining_retries
    }

    /// Expiry timestamp.
    #[must_use]
    pub const fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    /// Replace the stored attempt state.
    pub fn record_attempt(&mut self, state: OidcChallengeState) {
        self.challenge_state = Some(state);
    }

    /// Consume one retry. Saturates at zero.
    ///
    /// Returns the retries left.
    pub const fn decrement_retries(&mut self) -> u32 {
        self.remaining_retries = self.remaining_retries.saturating_sub(1);
        self.remaining_retries
    }

    /// No retries left.
    #[must_use]
    pub const fn is_exhausted(&self) -> bool {
        self.remaining_retries == 0
    }

    /// Expired as of `now`.
    #[must_use]
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Expired as of the current time.
    #[must_use]
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Neither exhausted nor expired.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.is_exhausted() && !self.is_expired()
    }
}
