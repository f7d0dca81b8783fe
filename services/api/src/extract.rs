//! Session cookie handling

use std::convert::Infallible;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::{TypedHeader, headers::Cookie};

/// Name of the cookie carrying the login session token
pub const SESSION_COOKIE: &str = "sid";

/// Login session token presented by the client, if any
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SessionToken(pub Option<String>);

#[async_trait]
impl<S> FromRequestParts<S> for SessionToken
where
    S: Send + Sync,
{
    type Rejection = Infallible;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let cookies = Option::<TypedHeader<Cookie>>::from_request_parts(parts, state).await?;

        Ok(SessionToken(cookies.and_then(|TypedHeader(cookies)| {
            cookies
                .get(SESSION_COOKIE)
                .filter(|token| !token.is_empty())
                .map(str::to_string)
        })))
    }
}

/// `Set-Cookie` value storing `token`
pub fn session_cookie(token: &str, max_age: i64, secure: bool) -> String {
    let mut cookie = format!(
        "{}={}; Path=/; HttpOnly; SameSite=Lax; Max-Age={}",
        SESSION_COOKIE, token, max_age
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value removing the session cookie
pub fn expired_session_cookie() -> String {
    format!("{}=; Path=/; HttpOnly; SameSite=Lax; Max-Age=0", SESSION_COOKIE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::{Request, header::COOKIE};

    async fn token_from(cookie: Option<&str>) -> SessionToken {
        let mut request = Request::builder().uri("/");
        if let Some(cookie) = cookie {
            request = request.header(COOKIE, cookie);
        }
        let (mut parts, _) = request.body(()).unwrap().into_parts();

        SessionToken::from_request_parts(&mut parts, &())
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_token_is_read_from_cookie() {
        assert_eq!(
            token_from(Some("theme=dark; sid=abc123")).await,
            SessionToken(Some("abc123".to_string()))
        );
    }

    #[tokio::test]
    async fn test_missing_or_empty_cookie_yields_no_token() {
        assert_eq!(token_from(None).await, SessionToken(None));
        assert_eq!(token_from(Some("theme=dark")).await, SessionToken(None));
        assert_eq!(token_from(Some("sid=")).await, SessionToken(None));
    }

    #[test]
    fn test_session_cookie_attributes() {
        assert_eq!(
            session_cookie("abc", 3600, true),
            "sid=abc; Path=/; HttpOnly; SameSite=Lax; Max-Age=3600; Secure"
        );
        assert!(expired_session_cookie().contains("Max-Age=0"));
    }
}
