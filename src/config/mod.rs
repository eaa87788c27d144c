use once_cell::sync::Lazy;
use serde::{Deserialize, Serialize};
use std::env;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    pub environment: Environment,
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub auth: AuthConfig,
    pub session: SessionConfig,
    pub security: SecurityConfig,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Environment {
    Development,
    Staging,
    Production,
}

impl Environment {
    pub fn as_str(&self) -> &'static str {
        match self {
            Environment::Development => "development",
            Environment::Staging => "staging",
            Environment::Production => "production",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ServerConfig {
    pub port: u16,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DatabaseConfig {
    pub url: Option<String>,
    pub max_connections: u32,
    pub connection_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthConfig {
    /// Base URL of the GoTrue-compatible auth service, e.g. `https://xyz.supabase.co`
    pub url: Option<String>,
    pub anon_key: Option<String>,
    pub request_timeout_secs: u64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionConfig {
    pub access_cookie: String,
    pub refresh_cookie: String,
    pub secure_cookies: bool,
    pub cookie_max_age_secs: u64,
    /// Rotate the access token when it expires within this many seconds
    pub refresh_leeway_secs: i64,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SecurityConfig {
    pub enable_cors: bool,
    pub cors_origins: Vec<String>,
}

impl AppConfig {
    pub fn from_env() -> Self {
        let environment = match env::var("APP_ENV").as_deref() {
            Ok("production") | Ok("prod") => Environment::Production,
            Ok("staging") | Ok("stage") => Environment::Staging,
            _ => Environment::Development,
        };

        // Set defaults based on environment, then override with specific env vars
        match environment {
            Environment::Production => Self::production(),
            Environment::Staging => Self::staging(),
            Environment::Development => Self::development(),
        }
        .with_env_overrides()
    }

    fn with_env_overrides(mut self) -> Self {
        if let Ok(v) = env::var("PORT") {
            self.server.port = v.parse().unwrap_or(self.server.port);
        }

        // Database overrides
        if let Ok(v) = env::var("DATABASE_URL") {
            self.database.url = Some(v);
        }
        if let Ok(v) = env::var("DATABASE_MAX_CONNECTIONS") {
            self.database.max_connections = v.parse().unwrap_or(self.database.max_connections);
        }
        if let Ok(v) = env::var("DATABASE_CONNECTION_TIMEOUT") {
            self.database.connection_timeout_secs =
                v.parse().unwrap_or(self.database.connection_timeout_secs);
        }

        // Auth provider overrides
        if let Ok(v) = env::var("AUTH_URL") {
            self.auth.url = Some(v.trim_end_matches('/').to_string());
        }
        if let Ok(v) = env::var("AUTH_ANON_KEY") {
            self.auth.anon_key = Some(v);
        }
        if let Ok(v) = env::var("AUTH_REQUEST_TIMEOUT") {
            self.auth.request_timeout_secs = v.parse().unwrap_or(self.auth.request_timeout_secs);
        }

        // Session overrides
        if let Ok(v) = env::var("SESSION_ACCESS_COOKIE") {
            self.session.access_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_REFRESH_COOKIE") {
            self.session.refresh_cookie = v;
        }
        if let Ok(v) = env::var("SESSION_SECURE_COOKIES") {
            self.session.secure_cookies = v.parse().unwrap_or(self.session.secure_cookies);
        }
        if let Ok(v) = env::var("SESSION_COOKIE_MAX_AGE") {
            self.session.cookie_max_age_secs = v.parse().unwrap_or(self.session.cookie_max_age_secs);
        }
        if let Ok(v) = env::var("SESSION_REFRESH_LEEWAY") {
            self.session.refresh_leeway_secs = v.parse().unwrap_or(self.session.refresh_leeway_secs);
        }

        // Security overrides
        if let Ok(v) = env::var("SECURITY_ENABLE_CORS") {
            self.security.enable_cors = v.parse().unwrap_or(self.security.enable_cors);
        }
        if let Ok(v) = env::var("SECURITY_CORS_ORIGINS") {
            self.security.cors_origins = v.split(',').map(|s| s.trim().to_string()).collect();
        }

        self
    }

    fn session_defaults(secure_cookies: bool) -> SessionConfig {
        SessionConfig {
            access_cookie: "sb-access-token".to_string(),
            refresh_cookie: "sb-refresh-token".to_string(),
            secure_cookies,
            cookie_max_age_secs: 60 * 60 * 24 * 7, // 1 week
            refresh_leeway_secs: 60,
        }
    }

    pub fn development() -> Self {
        Self {
            environment: Environment::Development,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 5,
                connection_timeout_secs: 30,
            },
            auth: AuthConfig {
                url: None,
                anon_key: None,
                request_timeout_secs: 10,
            },
            session: Self::session_defaults(false),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["http://localhost:3000".to_string()],
            },
        }
    }

    fn staging() -> Self {
        Self {
            environment: Environment::Staging,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 10,
                connection_timeout_secs: 10,
            },
            auth: AuthConfig {
                url: None,
                anon_key: None,
                request_timeout_secs: 5,
            },
            session: Self::session_defaults(true),
            security: SecurityConfig {
                enable_cors: true,
                cors_origins: vec!["https://staging.example.com".to_string()],
            },
        }
    }

    fn production() -> Self {
        Self {
            environment: Environment::Production,
            server: ServerConfig { port: 3000 },
            database: DatabaseConfig {
                url: None,
                max_connections: 20,
                connection_timeout_secs: 5,
            },
            auth: AuthConfig {
                url: None,
                anon_key: None,
                request_timeout_secs: 5,
            },
            session: Self::session_defaults(true),
            security: SecurityConfig {
                enable_cors: false,
                cors_origins: Vec::new(),
            },
        }
    }
}

// Global singleton config - initialized once at startup
pub static CONFIG: Lazy<AppConfig> = Lazy::new(AppConfig::from_env);

pub fn config() -> &'static AppConfig {
    &CONFIG
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn development_cookies_are_not_secure() {
        let config = AppConfig::development();
        assert!(!config.session.secure_cookies);
        assert_eq!(config.session.access_cookie, "sb-access-token");
        assert_eq!(config.session.refresh_cookie, "sb-refresh-token");
    }

    #[test]
    fn production_requires_secure_cookies() {
        let config = AppConfig::production();
        assert!(config.session.secure_cookies);
        assert!(!config.security.enable_cors);
        assert_eq!(config.environment.as_str(), "production");
    }
}
