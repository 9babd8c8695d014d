//! Request correlation identifiers.

use std::fmt;

/// Header carrying the request id in both directions.
pub const REQUEST_ID_HEADER: &str = "x-request-id";

const MAX_REQUEST_ID_LEN: usize = 128;

/// Identifier attached to every request and echoed in the response.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RequestId(String);

impl RequestId {
    /// Generate a new request ID.
    pub fn generate() -> Self {
        let nanos = std::time::SystemTime::now()
            .duration_since(std::time::UNIX_EPOCH)
            .unwrap_or_default()
            .as_nanos();
        Self(format!(
            "{:x}-{:08x}-{:08x}",
            nanos,
            rand::random::<u32>(),
            rand::random::<u32>()
        ))
    }

    /// Accept a caller-supplied id.
    ///
    /// Returns `None` for blank values, values over 128 bytes and values
    /// containing anything but printable ASCII.
    pub fn from_header(raw: &str) -> Option<Self> {
        let raw = raw.trim();
        if raw.is_empty()
            || raw.len() > MAX_REQUEST_ID_LEN
            || !raw.bytes().all(|b| b.is_ascii_graphic())
        {
            return None;
        }
        Some(Self(raw.to_string()))
    }

    /// The id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RequestId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_generated_ids_differ() {
        let a = RequestId::generate();
        let b = RequestId::generate();
        assert_ne!(a, b);
        assert_eq!(a.as_str().split('-').count(), 3);
    }

    #[test]
    fn test_from_header() {
        assert_eq!(
            RequestId::from_header(" abc-123 ").map(|id| id.to_string()),
            Some("abc-123".to_string())
        );
        assert!(RequestId::from_header("").is_none());
        assert!(RequestId::from_header("has space").is_none());
        assert!(RequestId::from_header(&"x".repeat(129)).is_none());
    }
}
