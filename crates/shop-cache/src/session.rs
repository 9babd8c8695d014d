//! Anonymous session tokens.

use serde::{Deserialize, Serialize};

/// Longest token accepted from a client.
const MAX_TOKEN_LEN: usize = 128;

/// An opaque anonymous session token.
///
/// Carried in the cart cookie and used as the cart's `cookie_id`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create a session ID from a trusted string.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Generate a new cryptographically secure session ID.
    pub fn generate() -> Self {
        use base64::{engine::general_purpose::URL_SAFE_NO_PAD, Engine};
        use rand::Rng;

        let bytes: [u8; 18] = rand::thread_rng().gen();
        Self(format!("sess_{}", URL_SAFE_NO_PAD.encode(bytes)))
    }

    /// Parse a token received from a client.
    ///
    /// Accepts non-empty tokens of URL-safe characters only, so a token can
    /// always be echoed back in a `Set-Cookie` header and embedded in cache keys.
    pub fn parse(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        let valid = !raw.is_empty()
            && raw.len() <= MAX_TOKEN_LEN
            && raw
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_' | '.'));
        valid.then(|| Self(raw.to_string()))
    }

    /// Get the session ID as a string.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for SessionId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for SessionId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_session_id_generate_format() {
        let id = SessionId::generate();
        let s = id.as_str();

        assert!(s.starts_with("sess_"));
        // 18 bytes base64 = 24 chars, plus prefix
        assert_eq!(s.len(), 29);
    }

    #[test]
    fn test_generated_ids_differ() {
        assert_ne!(SessionId::generate(), SessionId::generate());
    }

    #[test]
    fn test_generated_id_round_trips_through_parse() {
        let id = SessionId::generate();
        assert_eq!(SessionId::parse(id.as_str()), Some(id));
    }

    #[test]
    fn test_parse_rejects_bad_tokens() {
        assert_eq!(SessionId::parse(""), None);
        assert_eq!(SessionId::parse("   "), None);
        assert_eq!(SessionId::parse("abc;def"), None);
        assert_eq!(SessionId::parse("cart:user:1"), None);
        assert_eq!(SessionId::parse(&"a".repeat(129)), None);
    }

    #[test]
    fn test_parse_accepts_uuid_style_tokens() {
        let id = SessionId::parse("3f2b9c1e-8a4d-4e6f-9b0a-1c2d3e4f5a6b").unwrap();
        assert_eq!(id.as_str(), "3f2b9c1e-8a4d-4e6f-9b0a-1c2d3e4f5a6b");
    }

    #[test]
    fn test_serializes_as_plain_string() {
        let id = SessionId::new("sess_abc");
        assert_eq!(serde_json::to_string(&id).unwrap(), r#""sess_abc""#);
    }
}
