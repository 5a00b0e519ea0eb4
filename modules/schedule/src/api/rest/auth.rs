//! Request extractors that resolve the session cookie into a [`Caller`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::{header, request::Parts, HeaderMap, HeaderValue};

use crate::api::rest::error::map_domain_error;
use crate::api::rest::problem::ProblemResponse;
use crate::domain::accounts::AccountService;
use crate::domain::caller::Caller;
use crate::domain::error::DomainError;

pub const SESSION_COOKIE: &str = "timetable_session";

/// Cookie attributes for the session cookie.
#[derive(Debug, Clone, Copy)]
pub struct CookieSettings {
    pub secure: bool,
    pub max_age_secs: u64,
}

impl CookieSettings {
    pub fn session_cookie(&self, token: &str) -> String {
        self.render(token, self.max_age_secs)
    }

    pub fn cleared_cookie(&self) -> String {
        self.render("", 0)
    }

    fn render(&self, value: &str, max_age: u64) -> String {
        let mut cookie =
            format!("{SESSION_COOKIE}={value}; Path=/; HttpOnly; SameSite=Lax; Max-Age={max_age}");
        if self.secure {
            cookie.push_str("; Secure");
        }
        cookie
    }
}

/// Session token from the `timetable_session` cookie, falling back to an
/// `Authorization: Bearer` header.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    let from_cookie = headers
        .get_all(header::COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string());

    from_cookie.or_else(|| {
        headers
            .get(header::AUTHORIZATION)
            .and_then(|v: &HeaderValue| v.to_str().ok())
            .and_then(|v| v.strip_prefix("Bearer "))
            .map(|t| t.trim().to_string())
            .filter(|t| !t.is_empty())
    })
}

/// Any signed-in user.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub Caller);

/// A signed-in administrator.
#[derive(Debug, Clone)]
pub struct AdminUser(pub Caller);

/// Raw session token of the request, if any.
#[derive(Debug, Clone)]
pub struct SessionToken(pub Option<String>);

async fn resolve_caller(parts: &Parts) -> Result<Caller, ProblemResponse> {
    let instance = parts.uri.path().to_string();
    let accounts = parts
        .extensions
        .get::<Arc<AccountService>>()
        .cloned()
        .ok_or_else(|| {
            map_domain_error(
                &DomainError::internal("account service is not installed on the router"),
                &instance,
            )
        })?;
    let token = session_token(&parts.headers)
        .ok_or_else(|| map_domain_error(&DomainError::Unauthenticated, &instance))?;
    accounts
        .authenticate(&token)
        .await
        .map_err(|e| map_domain_error(&e, &instance))
}

impl<S> FromRequestParts<S> for CurrentUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        resolve_caller(parts).await.map(CurrentUser)
    }
}

impl<S> FromRequestParts<S> for AdminUser
where
    S: Send + Sync,
{
    type Rejection = ProblemResponse;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let caller = resolve_caller(parts).await?;
        caller
            .require_admin()
            .map_err(|e| map_domain_error(&e, parts.uri.path()))?;
        Ok(AdminUser(caller))
    }
}

impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = std::convert::Infallible;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        Ok(SessionToken(session_token(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn token_from_cookie_among_others() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("theme=dark; timetable_session=abc123; lang=en"),
        );
        assert_eq!(session_token(&headers).as_deref(), Some("abc123"));
    }

    #[test]
    fn token_from_bearer_header() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer xyz"));
        assert_eq!(session_token(&headers).as_deref(), Some("xyz"));
        assert_eq!(session_token(&HeaderMap::new()), None);
    }

    #[test]
    fn cookie_attributes() {
        let plain = CookieSettings {
            secure: false,
            max_age_secs: 60,
        };
        assert_eq!(
            plain.session_cookie("t"),
            "timetable_session=t; Path=/; HttpOnly; SameSite=Lax; Max-Age=60"
        );
        let secure = CookieSettings {
            secure: true,
            max_age_secs: 60,
        };
        assert!(secure.cleared_cookie().ends_with("Max-Age=0; Secure"));
    }
}
