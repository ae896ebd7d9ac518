// RSA Errors
// Precondition failures raised by number theory, key generation and the cipher

use thiserror::Error;

use super::bigint::RsaBigInt;

/// Errors that can occur while deriving keys or encoding/decoding messages
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum RsaError {
    /// A precondition on the inputs does not hold (non-prime factor,
    /// mismatched modulus, message out of range, ...)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// No public exponent in [2, φ) is coprime with φ
    #[error("no public exponent e in [2, {phi}) is coprime with φ(n) = {phi}")]
    NoValidExponent { phi: RsaBigInt },

    /// A value does not fit the requested fixed-width integer type
    #[error("{value} does not fit in {target}")]
    ArithmeticOverflow { value: RsaBigInt, target: &'static str },
}

impl RsaError {
    pub(crate) fn invalid(reason: impl Into<String>) -> Self {
        RsaError::InvalidArgument(reason.into())
    }
}

/// Result type for RSA operations
pub type RsaResult<T> = Result<T, RsaError>;
