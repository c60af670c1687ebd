//! Member address type with `agr_` prefix.

use crate::TypesError;
use serde::{Deserialize, Serialize};
use std::fmt;

/// The address of a ledger participant, always prefixed with `agr_`.
///
/// Signature verification happens upstream; by the time an address reaches
/// the governance engine it is only an identity key.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Address(String);

impl Address {
    /// The standard prefix for all addresses.
    pub const PREFIX: &'static str = "agr_";

    /// Create a new address from a raw string.
    ///
    /// # Panics
    /// Panics if the string is not a well-formed address. Use [`Address::parse`]
    /// for untrusted input.
    pub fn new(raw: impl Into<String>) -> Self {
        let s = raw.into();
        assert!(Self::well_formed(&s), "address must be agr_ followed by [a-z0-9_]");
        Self(s)
    }

    /// Parse an address from untrusted input.
    pub fn parse(raw: &str) -> Result<Self, TypesError> {
        if Self::well_formed(raw) {
            Ok(Self(raw.to_string()))
        } else {
            Err(TypesError::InvalidAddress(raw.to_string()))
        }
    }

    /// Return the raw address string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    fn well_formed(s: &str) -> bool {
        match s.strip_prefix(Self::PREFIX) {
            Some(body) => {
                !body.is_empty()
                    && body
                        .bytes()
                        .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
            }
            None => false,
        }
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl TryFrom<String> for Address {
    type Error = TypesError;

    fn try_from(s: String) -> Result<Self, Self::Error> {
        if Self::well_formed(&s) {
            Ok(Self(s))
        } else {
            Err(TypesError::InvalidAddress(s))
        }
    }
}

impl From<Address> for String {
    fn from(address: Address) -> Self {
        address.0
    }
}
