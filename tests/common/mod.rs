#![allow(dead_code)]

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use reqwest::{header, redirect, Client, Response, StatusCode};
use uuid::Uuid;

use ag_tracker::app::{app, AppState};
use ag_tracker::auth::Identity;
use ag_tracker::config::AppConfig;
use ag_tracker::database::Profile;
use ag_tracker::testing::{InMemoryStore, ScriptedAuth};

/// Router served in-process over in-memory collaborators
pub struct TestServer {
    pub base_url: String,
    pub store: InMemoryStore,
    pub auth: ScriptedAuth,
    client: Client,
}

impl TestServer {
    pub async fn start(store: InMemoryStore) -> Result<Self> {
        let auth = ScriptedAuth::default();
        let state = AppState::new(
            AppConfig::development(),
            Arc::new(store.clone()),
            Arc::new(auth.clone()),
        );

        // Pick an unused port for isolation
        let port = portpicker::pick_unused_port().context("failed to pick free port")?;
        let listener = tokio::net::TcpListener::bind(("127.0.0.1", port))
            .await
            .context("failed to bind test listener")?;
        tokio::spawn(async move {
            let _ = axum::serve(listener, app(state)).await;
        });

        let client = Client::builder()
            .redirect(redirect::Policy::none())
            .timeout(Duration::from_secs(10))
            .build()?;

        Ok(Self {
            base_url: format!("http://127.0.0.1:{}", port),
            store,
            auth,
            client,
        })
    }

    /// Store the profile and return a cookie header for a live session
    pub fn sign_in(&self, profile: Profile) -> String {
        let token = format!("access-{}", profile.id.simple());
        self.auth.accept(
            &token,
            Identity {
                id: profile.id,
                email: profile.email.clone(),
            },
        );
        self.store.insert_profile(profile);
        format!("sb-access-token={}; sb-refresh-token=refresh-unused", token)
    }

    /// Cookie header for a verified identity that has no profile row
    pub fn sign_in_without_profile(&self) -> String {
        let id = Uuid::new_v4();
        let token = format!("access-{}", id.simple());
        self.auth.accept(&token, Identity { id, email: None });
        format!("sb-access-token={}", token)
    }

    pub async fn get(&self, path: &str, cookie: Option<&str>) -> Result<Response> {
        let mut request = self.client.get(format!("{}{}", self.base_url, path));
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        Ok(request.send().await?)
    }

    pub async fn post_json(&self, path: &str, body: serde_json::Value, cookie: Option<&str>) -> Result<Response> {
        let mut request = self.client.post(format!("{}{}", self.base_url, path)).json(&body);
        if let Some(cookie) = cookie {
            request = request.header(header::COOKIE, cookie);
        }
        Ok(request.send().await?)
    }
}

/// Location header of a temporary redirect, failing on anything else
pub fn redirect_target(response: &Response) -> Option<String> {
    if response.status() != StatusCode::TEMPORARY_REDIRECT && response.status() != StatusCode::SEE_OTHER {
        return None;
    }
    response
        .headers()
        .get(header::LOCATION)
        .and_then(|v| v.to_str().ok())
        .map(str::to_string)
}

pub fn set_cookies(response: &Response) -> Vec<String> {
    response
        .headers()
        .get_all(header::SET_COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .map(str::to_string)
        .collect()
}
