use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

pub mod gotrue;
pub mod token;

pub use gotrue::GoTrueClient;

/// Identity verified by the auth provider. Owned by the provider, only consumed here.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub id: Uuid,
    pub email: Option<String>,
}

/// Access/refresh token pair carried in the session cookies
#[derive(Clone, PartialEq, Eq)]
pub struct TokenPair {
    pub access_token: String,
    pub refresh_token: String,
}

impl std::fmt::Debug for TokenPair {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenPair").finish_non_exhaustive()
    }
}

/// Result of a password sign-in or a token rotation
#[derive(Debug, Clone)]
pub struct AuthSession {
    pub identity: Identity,
    pub tokens: TokenPair,
}

#[derive(Debug, Error)]
pub enum AuthError {
    #[error("no credential present")]
    MissingCredential,

    #[error("auth provider rejected the request ({status}): {message}")]
    Rejected { status: u16, message: String },

    #[error("auth provider not configured: {0}")]
    NotConfigured(&'static str),

    #[error("auth provider unreachable: {0}")]
    Transport(String),

    #[error("unexpected auth provider response: {0}")]
    MalformedResponse(String),
}

impl From<reqwest::Error> for AuthError {
    fn from(err: reqwest::Error) -> Self {
        if err.is_decode() {
            AuthError::MalformedResponse(err.to_string())
        } else {
            AuthError::Transport(err.to_string())
        }
    }
}

/// Authentication collaborator. Every call goes to the provider; nothing is trusted locally.
#[async_trait]
pub trait AuthProvider: Send + Sync {
    /// Verified "get current user" call
    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError>;

    /// Exchange a refresh token for a rotated pair
    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError>;

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError>;

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError>;

    /// Replace the password of the user the access token belongs to
    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), AuthError>;

    /// Liveness check used by `check`
    async fn ping(&self) -> Result<(), AuthError>;
}
