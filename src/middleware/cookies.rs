use axum::http::{header, HeaderMap, HeaderValue};
use cookie::{time::Duration, Cookie, SameSite};

use crate::auth::TokenPair;
use crate::config::SessionConfig;

/// Read one cookie value from the request's `Cookie` headers
pub fn parse_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|s| s.split(';'))
        .find_map(|part| {
            let (key, value) = part.trim().split_once('=')?;
            if key != name {
                return None;
            }
            let value = value.trim_matches('"');
            (!value.is_empty()).then(|| value.to_string())
        })
}

fn cookie_header(name: &str, value: &str, max_age_secs: u64, secure: bool) -> Option<HeaderValue> {
    let max_age = Duration::seconds(i64::try_from(max_age_secs).unwrap_or(i64::MAX));
    let cookie = Cookie::build((name, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Lax)
        .secure(secure)
        .max_age(max_age)
        .build();

    match HeaderValue::from_str(&cookie.to_string()) {
        Ok(value) => Some(value),
        Err(_) => {
            tracing::warn!(cookie = name, "cookie value is not a valid header; skipped");
            None
        }
    }
}

/// `Set-Cookie` values carrying a token pair
pub fn session_cookies(tokens: &TokenPair, config: &SessionConfig) -> Vec<HeaderValue> {
    [
        (&config.access_cookie, &tokens.access_token),
        (&config.refresh_cookie, &tokens.refresh_token),
    ]
    .into_iter()
    .filter_map(|(name, value)| cookie_header(name, value, config.cookie_max_age_secs, config.secure_cookies))
    .collect()
}

/// `Set-Cookie` values expiring both session cookies
pub fn cleared_cookies(config: &SessionConfig) -> Vec<HeaderValue> {
    [&config.access_cookie, &config.refresh_cookie]
        .into_iter()
        .filter_map(|name| cookie_header(name, "", 0, config.secure_cookies))
        .collect()
}

/// Append `Set-Cookie` headers to a response header map
pub fn append_cookies(headers: &mut HeaderMap, cookies: Vec<HeaderValue>) {
    for cookie in cookies {
        headers.append(header::SET_COOKIE, cookie);
    }
}
