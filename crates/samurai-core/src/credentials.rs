//! Bearer credentials and the policy for when they are missing
//!
//! Controllers never cache a token: they ask their [`CredentialProvider`] for
//! the current value right before each request.

use chrono::{DateTime, Utc};
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use std::sync::RwLock;

#[derive(Clone)]
pub struct Credential {
    token: SecretString,
    expires_at: Option<DateTime<Utc>>,
}

impl Credential {
    pub fn new(token: impl Into<String>) -> Self {
        Self {
            token: SecretString::from(token.into()),
            expires_at: None,
        }
    }

    pub fn with_expiry(mut self, expires_at: DateTime<Utc>) -> Self {
        self.expires_at = Some(expires_at);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.token.expose_secret().trim().is_empty()
    }

    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        self.expires_at.is_some_and(|at| at <= now)
    }

    /// A usable credential has a non-blank token that hasn't expired yet.
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        !self.is_empty() && !self.is_expired(now)
    }

    pub fn bearer(&self) -> String {
        format!("Bearer {}", self.token.expose_secret())
    }
}

impl std::fmt::Debug for Credential {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credential")
            .field("token", &"[redacted]")
            .field("expires_at", &self.expires_at)
            .finish()
    }
}

pub trait CredentialProvider: Send + Sync {
    fn credential(&self) -> Option<Credential>;
}

/// In-memory credential slot for the signed-in user
#[derive(Debug, Default)]
pub struct SessionCredentials {
    current: RwLock<Option<Credential>>,
}

impl SessionCredentials {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_token(token: impl Into<String>) -> Self {
        let creds = Self::new();
        creds.set_token(token);
        creds
    }

    pub fn set_token(&self, token: impl Into<String>) {
        self.set_credential(Credential::new(token));
    }

    pub fn set_credential(&self, credential: Credential) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = Some(credential);
    }

    pub fn clear(&self) {
        let mut current = self.current.write().unwrap_or_else(|e| e.into_inner());
        *current = None;
    }

    pub fn has_token(&self) -> bool {
        self.credential().is_some_and(|c| !c.is_empty())
    }
}

impl CredentialProvider for SessionCredentials {
    fn credential(&self) -> Option<Credential> {
        self.current
            .read()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }
}

/// What to do when there is no usable token at request time
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum AuthPolicy {
    /// Refuse the operation locally with an auth error
    Preflight,
    /// Send anyway and let the server answer 401
    #[default]
    ServerSide,
}

impl AuthPolicy {
    pub fn as_str(&self) -> &'static str {
        match self {
            AuthPolicy::Preflight => "preflight",
            AuthPolicy::ServerSide => "server-side",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "preflight" => Some(AuthPolicy::Preflight),
            "server-side" | "serverside" | "server" => Some(AuthPolicy::ServerSide),
            _ => None,
        }
    }
}

/// The header value (if any) attached to one outbound request
#[derive(Clone, Default)]
pub struct Authorization(Option<String>);

impl Authorization {
    pub fn bearer(credential: &Credential) -> Self {
        Self(Some(credential.bearer()))
    }

    pub fn anonymous() -> Self {
        Self(None)
    }

    pub fn header_value(&self) -> Option<&str> {
        self.0.as_deref()
    }
}

impl std::fmt::Debug for Authorization {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self.0 {
            Some(_) => f.write_str("Authorization(Bearer [redacted])"),
            None => f.write_str("Authorization(none)"),
        }
    }
}

/// Resolve the authorization for one request, or `None` when the policy
/// forbids sending it.
pub fn authorize(provider: &dyn CredentialProvider, policy: AuthPolicy) -> Option<Authorization> {
    let now = Utc::now();
    match (provider.credential(), policy) {
        (Some(credential), _) if credential.is_usable(now) => Some(Authorization::bearer(&credential)),
        (_, AuthPolicy::Preflight) => None,
        (Some(credential), AuthPolicy::ServerSide) if !credential.is_empty() => {
            Some(Authorization::bearer(&credential))
        }
        (_, AuthPolicy::ServerSide) => Some(Authorization::anonymous()),
    }
}
