//! Route keys.

use crate::RouterError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Identifies which registered handler executes a proposal's action.
///
/// Lowercase ASCII letters, digits, `-` and `_`; 1 to 64 characters.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct RouteKey(String);

impl RouteKey {
    pub const MAX_LEN: usize = 64;

    pub fn parse(raw: &str) -> Result<Self, RouterError> {
        let ok = !raw.is_empty()
            && raw.len() <= Self::MAX_LEN
            && raw
                .bytes()
                .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'-' || b == b'_');
        if ok {
            Ok(Self(raw.to_string()))
        } else {
            Err(RouterError::InvalidRouteKey(raw.to_string()))
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for RouteKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for RouteKey {
    type Error = RouterError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        Self::parse(&s)
    }
}

impl From<RouteKey> for String {
    fn from(key: RouteKey) -> Self {
        key.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_valid_keys() {
        assert!(RouteKey::parse("mod-x").is_ok());
        assert!(RouteKey::parse("group").is_ok());
        assert!(RouteKey::parse("esp_v2").is_ok());
    }

    #[test]
    fn parse_rejects_invalid_keys() {
        assert!(RouteKey::parse("").is_err());
        assert!(RouteKey::parse("Mod").is_err());
        assert!(RouteKey::parse("a/b").is_err());
        assert!(RouteKey::parse(&"x".repeat(65)).is_err());
    }

    #[test]
    fn json_deserialization_validates() {
        let ok: Result<RouteKey, _> = serde_json::from_str("\"consortium\"");
        assert!(ok.is_ok());
        let bad: Result<RouteKey, _> = serde_json::from_str("\"NOPE\"");
        assert!(bad.is_err());
    }
}
