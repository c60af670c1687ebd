//! Errors raised while constructing fundamental types from untrusted input.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid address: {0}")]
    InvalidAddress(String),

    #[error("invalid group id: {0}")]
    InvalidGroupId(String),

    #[error("invalid ratio {num}/{den}: denominator must be positive and numerator at most denominator")]
    InvalidRatio { num: u64, den: u64 },
}
