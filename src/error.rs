//! Error types for the policy engine.

use thiserror::Error;

/// Errors raised by the policy engine.
///
/// Rewards and learned values are never validated; only inputs that cannot
/// become a state key, and parameters rejected by explicit checks, surface here.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum PolicyError {
    /// Input cannot be represented as a decimal bucket (NaN, infinite, or too large).
    #[error("{field} value {value} cannot be encoded into a state bucket")]
    UnrepresentableInput { field: &'static str, value: f64 },

    /// A learning parameter lies outside its allowed range.
    #[error("{name} must be within [0, 1], got {value}")]
    InvalidParameter { name: &'static str, value: f64 },
}

pub type PolicyResult<T> = std::result::Result<T, PolicyError>;
