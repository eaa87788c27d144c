use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Response, StatusCode};
use serde::Deserialize;
use serde_json::{json, Value};
use uuid::Uuid;

use super::{AuthError, AuthProvider, AuthSession, Identity, TokenPair};
use crate::config::AuthConfig;

/// Client for a GoTrue-compatible auth REST API (`/auth/v1/*`)
#[derive(Clone)]
pub struct GoTrueClient {
    http: Client,
    base_url: String,
    anon_key: String,
}

#[derive(Debug, Deserialize)]
struct UserBody {
    id: Uuid,
    email: Option<String>,
}

#[derive(Debug, Deserialize)]
struct TokenBody {
    access_token: String,
    refresh_token: String,
    user: UserBody,
}

impl From<UserBody> for Identity {
    fn from(user: UserBody) -> Self {
        Identity {
            id: user.id,
            email: user.email,
        }
    }
}

impl From<TokenBody> for AuthSession {
    fn from(body: TokenBody) -> Self {
        AuthSession {
            identity: body.user.into(),
            tokens: TokenPair {
                access_token: body.access_token,
                refresh_token: body.refresh_token,
            },
        }
    }
}

impl GoTrueClient {
    pub fn new(base_url: impl Into<String>, anon_key: impl Into<String>, timeout: Duration) -> Result<Self, AuthError> {
        let http = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| AuthError::Transport(e.to_string()))?;

        Ok(Self {
            http,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            anon_key: anon_key.into(),
        })
    }

    pub fn from_config(config: &AuthConfig) -> Result<Self, AuthError> {
        let url = config.url.as_deref().ok_or(AuthError::NotConfigured("AUTH_URL"))?;
        let key = config
            .anon_key
            .as_deref()
            .ok_or(AuthError::NotConfigured("AUTH_ANON_KEY"))?;
        Self::new(url, key, Duration::from_secs(config.request_timeout_secs))
    }

    fn endpoint(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    async fn token_grant(&self, grant_type: &str, body: Value) -> Result<AuthSession, AuthError> {
        let response = self
            .http
            .post(self.endpoint("token"))
            .query(&[("grant_type", grant_type)])
            .header("apikey", &self.anon_key)
            .json(&body)
            .send()
            .await?;

        let body: TokenBody = ensure_success(response).await?.json().await?;
        Ok(body.into())
    }
}

/// Turn a non-2xx provider response into `AuthError::Rejected`, keeping the provider message
async fn ensure_success(response: Response) -> Result<Response, AuthError> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body: Value = response.json().await.unwrap_or(Value::Null);
    let message = ["error_description", "msg", "message", "error"]
        .iter()
        .find_map(|key| body.get(*key).and_then(Value::as_str))
        .unwrap_or_else(|| status.canonical_reason().unwrap_or("unknown error"))
        .to_string();

    if status.is_server_error() || status == StatusCode::TOO_MANY_REQUESTS {
        return Err(AuthError::Transport(format!("{}: {}", status, message)));
    }

    Err(AuthError::Rejected {
        status: status.as_u16(),
        message,
    })
}

#[async_trait]
impl AuthProvider for GoTrueClient {
    async fn get_user(&self, access_token: &str) -> Result<Identity, AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let response = self
            .http
            .get(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        let user: UserBody = ensure_success(response).await?.json().await?;
        Ok(user.into())
    }

    async fn refresh(&self, refresh_token: &str) -> Result<AuthSession, AuthError> {
        if refresh_token.is_empty() {
            return Err(AuthError::MissingCredential);
        }
        self.token_grant("refresh_token", json!({ "refresh_token": refresh_token }))
            .await
    }

    async fn sign_in_with_password(&self, email: &str, password: &str) -> Result<AuthSession, AuthError> {
        self.token_grant("password", json!({ "email": email, "password": password }))
            .await
    }

    async fn sign_out(&self, access_token: &str) -> Result<(), AuthError> {
        let response = self
            .http
            .post(self.endpoint("logout"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn update_password(&self, access_token: &str, new_password: &str) -> Result<(), AuthError> {
        if access_token.is_empty() {
            return Err(AuthError::MissingCredential);
        }

        let response = self
            .http
            .put(self.endpoint("user"))
            .header("apikey", &self.anon_key)
            .bearer_auth(access_token)
            .json(&json!({ "password": new_password }))
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), AuthError> {
        let response = self
            .http
            .get(self.endpoint("health"))
            .header("apikey", &self.anon_key)
            .send()
            .await?;

        ensure_success(response).await?;
        Ok(())
    }
}
