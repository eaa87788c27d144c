use std::sync::Arc;

use axum::{
    async_trait,
    extract::{FromRequestParts, Request, State},
    http::{request::Parts, HeaderMap},
    middleware::Next,
    response::{IntoResponse, Redirect, Response},
};
use tracing::debug;

use super::cookies::{append_cookies, cleared_cookies, parse_cookie, session_cookies};
use crate::auth::{token::needs_rotation, AuthError, AuthProvider, Identity, TokenPair};
use crate::config::SessionConfig;
use crate::policy::paths;

/// Token pair as read from the request cookies; either half may be absent
#[derive(Default, Clone, PartialEq, Eq)]
pub struct Credentials {
    pub access_token: Option<String>,
    pub refresh_token: Option<String>,
}

impl Credentials {
    pub fn from_headers(headers: &HeaderMap, config: &SessionConfig) -> Self {
        Self {
            access_token: parse_cookie(headers, &config.access_cookie),
            refresh_token: parse_cookie(headers, &config.refresh_cookie),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.access_token.is_none() && self.refresh_token.is_none()
    }
}

/// Outcome of session resolution, stored in request extensions
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SessionState {
    Authenticated {
        identity: Identity,
        /// Set when the token pair was rotated while resolving
        renewed: Option<TokenPair>,
    },
    Unauthenticated,
}

impl SessionState {
    pub fn identity(&self) -> Option<&Identity> {
        match self {
            SessionState::Authenticated { identity, .. } => Some(identity),
            SessionState::Unauthenticated => None,
        }
    }

    pub fn renewed(&self) -> Option<&TokenPair> {
        match self {
            SessionState::Authenticated { renewed, .. } => renewed.as_ref(),
            SessionState::Unauthenticated => None,
        }
    }
}

/// Verifies session cookies against the auth provider on every request
#[derive(Clone)]
pub struct SessionResolver {
    provider: Arc<dyn AuthProvider>,
    config: SessionConfig,
}

impl SessionResolver {
    pub fn new(provider: Arc<dyn AuthProvider>, config: SessionConfig) -> Self {
        Self { provider, config }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    pub fn provider(&self) -> &Arc<dyn AuthProvider> {
        &self.provider
    }

    pub async fn resolve(&self, credentials: &Credentials) -> SessionState {
        let refresh = credentials.refresh_token.as_deref();
        let Some(access) = credentials.access_token.as_deref() else {
            return match refresh {
                Some(refresh) => self.rotate(refresh).await,
                None => SessionState::Unauthenticated,
            };
        };

        // Rotate ahead of expiry; if that fails the current token may still verify
        let rotated_early = match refresh {
            Some(refresh) if needs_rotation(access, self.config.refresh_leeway_secs) => {
                let state = self.rotate(refresh).await;
                if state != SessionState::Unauthenticated {
                    return state;
                }
                debug!("early rotation failed; verifying current token");
                true
            }
            _ => false,
        };

        match self.provider.get_user(access).await {
            Ok(identity) => SessionState::Authenticated {
                identity,
                renewed: None,
            },
            // Expired or revoked: a refresh token may still rescue the session
            Err(AuthError::Rejected { status, .. }) if !rotated_early => match refresh {
                Some(refresh) => {
                    debug!(status, "access token rejected; rotating");
                    self.rotate(refresh).await
                }
                None => SessionState::Unauthenticated,
            },
            Err(e) => {
                debug!(error = %e, "session not verified");
                SessionState::Unauthenticated
            }
        }
    }

    async fn rotate(&self, refresh_token: &str) -> SessionState {
        let session = match self.provider.refresh(refresh_token).await {
            Ok(session) => session,
            Err(e) => {
                debug!(error = %e, "token rotation failed");
                return SessionState::Unauthenticated;
            }
        };

        // The rotated token goes through the same verified call as any other
        match self.provider.get_user(&session.tokens.access_token).await {
            Ok(identity) => {
                debug!(user_id = %identity.id, "session renewed");
                SessionState::Authenticated {
                    identity,
                    renewed: Some(session.tokens),
                }
            }
            Err(e) => {
                debug!(error = %e, "rotated token not verified");
                SessionState::Unauthenticated
            }
        }
    }
}

/// Paths that never need a session: auth endpoints and liveness
fn skips_session(path: &str) -> bool {
    path == "/health" || path == "/auth" || path.starts_with("/auth/")
}

/// Paths reachable without a session; they may still read `SessionState`
fn is_public(path: &str) -> bool {
    path == "/" || skips_session(path)
}

/// Resolve the session, gate protected paths, and write back rotated tokens
pub async fn session_middleware(
    State(resolver): State<SessionResolver>,
    mut request: Request,
    next: Next,
) -> Response {
    let path = request.uri().path().to_string();
    if skips_session(&path) {
        return next.run(request).await;
    }

    let credentials = Credentials::from_headers(request.headers(), resolver.config());
    let state = resolver.resolve(&credentials).await;

    if state == SessionState::Unauthenticated && !is_public(&path) {
        debug!(path = %path, "no session; redirecting to login");
        let mut response = Redirect::temporary(paths::LOGIN).into_response();
        if !credentials.is_empty() {
            append_cookies(response.headers_mut(), cleared_cookies(resolver.config()));
        }
        return response;
    }

    let renewed = state.renewed().cloned();
    request.extensions_mut().insert(state);

    let mut response = next.run(request).await;
    if let Some(tokens) = renewed {
        append_cookies(response.headers_mut(), session_cookies(&tokens, resolver.config()));
    }
    response
}

/// Extractor for handlers behind the session layer
#[derive(Debug, Clone)]
pub struct CurrentIdentity(pub Identity);

#[async_trait]
impl<S> FromRequestParts<S> for CurrentIdentity
where
    S: Send + Sync,
{
    type Rejection = Redirect;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionState>()
            .and_then(SessionState::identity)
            .cloned()
            .map(CurrentIdentity)
            .ok_or_else(|| Redirect::temporary(paths::LOGIN))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::AppConfig;
    use crate::testing::ScriptedAuth;
    use uuid::Uuid;

    fn identity() -> Identity {
        Identity {
            id: Uuid::new_v4(),
            email: Some("officer@example.go.ke".to_string()),
        }
    }

    fn resolver(auth: &ScriptedAuth) -> SessionResolver {
        SessionResolver::new(Arc::new(auth.clone()), AppConfig::development().session)
    }

    fn credentials(access: Option<&str>, refresh: Option<&str>) -> Credentials {
        Credentials {
            access_token: access.map(str::to_string),
            refresh_token: refresh.map(str::to_string),
        }
    }

    fn pair(access: &str, refresh: &str) -> TokenPair {
        TokenPair {
            access_token: access.to_string(),
            refresh_token: refresh.to_string(),
        }
    }

    #[tokio::test]
    async fn no_credentials_skip_the_provider() {
        let auth = ScriptedAuth::default();
        let state = resolver(&auth).resolve(&Credentials::default()).await;
        assert_eq!(state, SessionState::Unauthenticated);
        assert_eq!(auth.get_user_calls(), 0);
    }

    #[tokio::test]
    async fn valid_token_is_verified_not_decoded() {
        let auth = ScriptedAuth::default();
        let who = identity();
        auth.accept("live", who.clone());

        let resolver = resolver(&auth);
        for _ in 0..2 {
            let state = resolver.resolve(&credentials(Some("live"), Some("r1"))).await;
            assert_eq!(state.identity(), Some(&who));
            assert!(state.renewed().is_none());
        }
        assert_eq!(auth.get_user_calls(), 2);
    }

    #[tokio::test]
    async fn revoked_token_without_refresh_is_unauthenticated() {
        let auth = ScriptedAuth::default();
        auth.accept("live", identity());
        auth.revoke("live");

        let state = resolver(&auth).resolve(&credentials(Some("live"), None)).await;
        assert_eq!(state, SessionState::Unauthenticated);
    }

    #[tokio::test]
    async fn rejected_token_rotates_and_reports_renewal() {
        let auth = ScriptedAuth::default();
        let who = identity();
        auth.rotate("r1", who.clone(), pair("fresh", "r2"));

        let state = resolver(&auth).resolve(&credentials(Some("stale"), Some("r1"))).await;
        assert_eq!(state.identity(), Some(&who));
        assert_eq!(state.renewed(), Some(&pair("fresh", "r2")));
    }

    #[tokio::test]
    async fn refresh_token_alone_restores_session() {
        let auth = ScriptedAuth::default();
        let who = identity();
        auth.rotate("r1", who.clone(), pair("fresh", "r2"));

        let state = resolver(&auth).resolve(&credentials(None, Some("r1"))).await;
        assert_eq!(state.identity(), Some(&who));
    }

    #[tokio::test]
    async fn provider_outage_is_unauthenticated_and_keeps_refresh_token() {
        let auth = ScriptedAuth::default();
        let who = identity();
        auth.accept("live", who.clone());
        auth.rotate("r1", who, pair("fresh", "r2"));
        auth.set_unreachable(true);

        let state = resolver(&auth).resolve(&credentials(Some("live"), Some("r1"))).await;
        assert_eq!(state, SessionState::Unauthenticated);

        // The refresh token was not spent during the outage
        auth.set_unreachable(false);
        let state = resolver(&auth).resolve(&credentials(None, Some("r1"))).await;
        assert!(state.renewed().is_some());
    }

    fn jwt_expiring_in(secs: i64) -> String {
        use jsonwebtoken::{encode, EncodingKey, Header};
        let claims = serde_json::json!({ "sub": "officer", "exp": chrono::Utc::now().timestamp() + secs });
        encode(&Header::default(), &claims, &EncodingKey::from_secret(b"test")).expect("encode")
    }

    #[tokio::test]
    async fn expiring_token_without_refresh_is_still_verified() {
        let auth = ScriptedAuth::default();
        let who = identity();
        let token = jwt_expiring_in(30);
        auth.accept(&token, who.clone());

        let state = resolver(&auth).resolve(&credentials(Some(&token), None)).await;
        assert_eq!(state.identity(), Some(&who));
        assert!(state.renewed().is_none());
        assert_eq!(auth.get_user_calls(), 1);
    }

    #[tokio::test]
    async fn spent_refresh_falls_back_to_current_token() {
        let auth = ScriptedAuth::default();
        let who = identity();
        let token = jwt_expiring_in(30);
        auth.accept(&token, who.clone());

        let state = resolver(&auth).resolve(&credentials(Some(&token), Some("spent"))).await;
        assert_eq!(state.identity(), Some(&who));
        assert!(state.renewed().is_none());
    }

    #[tokio::test]
    async fn expiring_token_rotates_before_expiry() {
        let auth = ScriptedAuth::default();
        let who = identity();
        let token = jwt_expiring_in(30);
        auth.accept(&token, who.clone());
        auth.rotate("r1", who.clone(), pair("fresh", "r2"));

        let state = resolver(&auth).resolve(&credentials(Some(&token), Some("r1"))).await;
        assert_eq!(state.identity(), Some(&who));
        assert_eq!(state.renewed(), Some(&pair("fresh", "r2")));
        // Only the rotated token was checked
        assert_eq!(auth.get_user_calls(), 1);
    }

    #[tokio::test]
    async fn token_far_from_expiry_is_not_rotated() {
        let auth = ScriptedAuth::default();
        let who = identity();
        let token = jwt_expiring_in(3600);
        auth.accept(&token, who.clone());
        auth.rotate("r1", who.clone(), pair("fresh", "r2"));

        let state = resolver(&auth).resolve(&credentials(Some(&token), Some("r1"))).await;
        assert_eq!(state.identity(), Some(&who));
        assert!(state.renewed().is_none());
    }

    #[tokio::test]
    async fn expired_token_with_spent_refresh_is_unauthenticated() {
        let auth = ScriptedAuth::default();
        let token = jwt_expiring_in(-120);

        let state = resolver(&auth).resolve(&credentials(Some(&token), Some("spent"))).await;
        assert_eq!(state, SessionState::Unauthenticated);
        assert_eq!(auth.get_user_calls(), 1);
    }

    #[test]
    fn public_paths() {
        assert!(is_public("/"));
        assert!(is_public("/health"));
        assert!(is_public("/auth/login"));
        assert!(!is_public("/authority"));
        assert!(!is_public("/dashboard"));
        assert!(!is_public("/settings"));
    }
}
