//! Request identity: anonymous cart cookie and authenticated user header.

use std::convert::Infallible;

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{COOKIE, SET_COOKIE};
use axum::http::request::Parts;
use axum::http::{HeaderMap, HeaderValue};
use shop_cache::SessionId;
use shop_commerce::cart::{CartIdentity, CookieDirective};
use shop_commerce::UserId;

use crate::config::CartConfig;
use crate::state::AppState;

/// Header carrying the authenticated user id, set by the auth layer in front
/// of this service.
pub const USER_ID_HEADER: &str = "x-user-id";

/// How the anonymous cart cookie is named, read and written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CookieSettings {
    name: String,
    max_age_secs: u64,
    secure: bool,
}

impl CookieSettings {
    /// Cookie settings from the `[cart]` section.
    pub fn from_config(config: &CartConfig) -> Self {
        Self {
            name: config.cookie_name.clone(),
            max_age_secs: config.cookie_max_age_secs,
            secure: config.cookie_secure,
        }
    }

    /// Cookie name.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// The cart token from the `Cookie` headers, if present and well formed.
    pub fn read(&self, headers: &HeaderMap) -> Option<SessionId> {
        headers
            .get_all(COOKIE)
            .iter()
            .filter_map(|value| value.to_str().ok())
            .flat_map(|header| header.split(';'))
            .filter_map(|pair| pair.trim().split_once('='))
            .find(|(name, _)| *name == self.name)
            .and_then(|(_, value)| SessionId::parse(value.trim_matches('"')))
    }

    /// Resolve the caller's identity from request headers.
    pub fn identity(&self, headers: &HeaderMap) -> CartIdentity {
        CartIdentity {
            user_id: user_id(headers),
            cookie_id: self.read(headers),
        }
    }

    /// `Set-Cookie` value binding `token` to the client.
    pub fn issue(&self, token: &SessionId) -> Option<HeaderValue> {
        self.header(token.as_str(), self.max_age_secs)
    }

    /// `Set-Cookie` value removing the cookie.
    pub fn clear(&self) -> Option<HeaderValue> {
        self.header("", 0)
    }

    /// Add the `Set-Cookie` header a directive calls for.
    pub fn apply(&self, directive: &CookieDirective, headers: &mut HeaderMap) {
        let value = match directive {
            CookieDirective::Keep => return,
            CookieDirective::Issue(token) => self.issue(token),
            CookieDirective::Clear => self.clear(),
        };
        match value {
            Some(value) => {
                headers.append(SET_COOKIE, value);
            }
            None => tracing::warn!(cookie = %self.name, "could not encode cart cookie"),
        }
    }

    fn header(&self, value: &str, max_age_secs: u64) -> Option<HeaderValue> {
        let mut cookie = format!(
            "{}={}; HttpOnly; SameSite=Lax; Path=/; Max-Age={}",
            self.name, value, max_age_secs
        );
        if self.secure {
            cookie.push_str("; Secure");
        }
        HeaderValue::from_str(&cookie).ok()
    }
}

/// The authenticated user, if the request carries one.
pub fn user_id(headers: &HeaderMap) -> Option<UserId> {
    headers
        .get(USER_ID_HEADER)
        .and_then(|value| value.to_str().ok())
        .map(str::trim)
        .filter(|id| !id.is_empty())
        .map(UserId::new)
}

/// Extractor for the caller's cart identity.
#[derive(Debug, Clone)]
pub struct Caller(pub CartIdentity);

#[async_trait]
impl FromRequestParts<AppState> for Caller {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        Ok(Caller(state.cookies.identity(&parts.headers)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> CookieSettings {
        CookieSettings::from_config(&CartConfig::default())
    }

    fn headers(pairs: &[(&'static str, &str)]) -> HeaderMap {
        let mut map = HeaderMap::new();
        for (name, value) in pairs {
            map.append(*name, HeaderValue::from_str(value).unwrap());
        }
        map
    }

    #[test]
    fn test_reads_named_cookie() {
        let h = headers(&[("cookie", "theme=dark; cartCookieId=sess_abc; other=1")]);
        assert_eq!(settings().read(&h), Some(SessionId::new("sess_abc")));
    }

    #[test]
    fn test_ignores_other_and_malformed_cookies() {
        let s = settings();
        assert_eq!(s.read(&headers(&[("cookie", "cartCookieIdX=abc")])), None);
        assert_eq!(s.read(&headers(&[("cookie", "cartCookieId=")])), None);
        assert_eq!(s.read(&headers(&[("cookie", "cartCookieId=a<b")])), None);
        assert_eq!(s.read(&HeaderMap::new()), None);
    }

    #[test]
    fn test_identity_from_headers() {
        let h = headers(&[("cookie", "cartCookieId=c1"), ("x-user-id", " u1 ")]);
        let identity = settings().identity(&h);
        assert_eq!(identity.user_id, Some(UserId::new("u1")));
        assert_eq!(identity.cookie_id, Some(SessionId::new("c1")));

        let blank = headers(&[("x-user-id", "  ")]);
        assert!(settings().identity(&blank).is_empty());
    }

    #[test]
    fn test_issue_and_clear() {
        let s = settings();
        let issued = s.issue(&SessionId::new("sess_1")).unwrap();
        assert_eq!(
            issued.to_str().unwrap(),
            "cartCookieId=sess_1; HttpOnly; SameSite=Lax; Path=/; Max-Age=2592000"
        );
        let cleared = s.clear().unwrap();
        assert!(cleared.to_str().unwrap().contains("Max-Age=0"));

        let mut config = CartConfig::default();
        config.cookie_secure = true;
        let secure = CookieSettings::from_config(&config)
            .issue(&SessionId::new("sess_1"))
            .unwrap();
        assert!(secure.to_str().unwrap().ends_with("; Secure"));
    }

    #[test]
    fn test_apply_directive() {
        let s = settings();
        let mut h = HeaderMap::new();
        s.apply(&CookieDirective::Keep, &mut h);
        assert!(h.get(SET_COOKIE).is_none());

        s.apply(&CookieDirective::Clear, &mut h);
        assert!(h.get(SET_COOKIE).is_some());
    }
}
