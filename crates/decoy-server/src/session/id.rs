//! Session identifier validation.

use serde::Serialize;
use std::fmt;

/// Required length of a session id.
pub const SESSION_ID_LEN: usize = 64;

/// Error returned when a session id fails validation.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("Invalid session id (should be 64 hex chars)")]
pub struct InvalidSessionId;

/// A validated session identifier: exactly 64 characters drawn from `[a-z0-9]`.
///
/// Clients mint these themselves (no server-side generation), so the only
/// guarantee the server enforces is the shape.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Validate a raw string as a session id.
    pub fn parse(raw: &str) -> Result<Self, InvalidSessionId> {
        if raw.len() == SESSION_ID_LEN && raw.bytes().all(is_session_id_byte) {
            Ok(Self(raw.to_string()))
        } else {
            Err(InvalidSessionId)
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

fn is_session_id_byte(b: u8) -> bool {
    b.is_ascii_lowercase() || b.is_ascii_digit()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn id_of(fill: char) -> String {
        std::iter::repeat(fill).take(SESSION_ID_LEN).collect()
    }

    #[test]
    fn test_accepts_lowercase_hex() {
        let raw = "aaaabbbbccccddddeeeeffff0000111122223333444455556666777788889999";
        assert_eq!(raw.len(), SESSION_ID_LEN);
        let id = SessionId::parse(raw).unwrap();
        assert_eq!(id.as_str(), raw);
    }

    #[test]
    fn test_accepts_any_lowercase_letter() {
        // The charset is [a-z0-9], wider than strict hex.
        assert!(SessionId::parse(&id_of('z')).is_ok());
    }

    #[test]
    fn test_rejects_wrong_length() {
        assert_eq!(SessionId::parse("abc123"), Err(InvalidSessionId));
        assert_eq!(SessionId::parse(&"a".repeat(65)), Err(InvalidSessionId));
        assert_eq!(SessionId::parse(""), Err(InvalidSessionId));
    }

    #[test]
    fn test_rejects_uppercase_and_symbols() {
        assert!(SessionId::parse(&id_of('A')).is_err());
        assert!(SessionId::parse(&id_of('-')).is_err());
        let mut raw = id_of('a');
        raw.replace_range(10..11, "!");
        assert!(SessionId::parse(&raw).is_err());
    }

    #[test]
    fn test_rejects_multibyte_input() {
        assert!(SessionId::parse(&"é".repeat(32)).is_err());
    }

    #[test]
    fn test_display_matches_input() {
        let raw = id_of('7');
        let id = SessionId::parse(&raw).unwrap();
        assert_eq!(id.to_string(), raw);
    }
}
