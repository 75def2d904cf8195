//! Shared error vocabulary for filter validation and translation.

use thiserror::Error;

use crate::filter::FilterOp;

/// Errors produced while validating or translating a filter tree.
///
/// Both variants propagate unchanged to the caller: there is no local
/// recovery, and a filter that cannot be translated must prevent the query
/// from running. Silently dropping a filter would silently change query
/// semantics.
#[derive(Debug, Error)]
pub enum FilterError {
    /// Malformed input: empty field, wrong value arity or type for an
    /// operator, `not` with other than one child, or an empty membership
    /// list on a target that cannot represent it.
    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The operator has no representation in the target grammar.
    #[error("operator {op} not supported by {backend}")]
    OperatorNotSupported { backend: &'static str, op: FilterOp },
}

impl FilterError {
    /// Whether this is a malformed-input error.
    #[must_use]
    pub const fn is_invalid_query(&self) -> bool {
        matches!(self, Self::InvalidQuery(_))
    }

    /// Whether this is a capability-gap error.
    #[must_use]
    pub const fn is_unsupported(&self) -> bool {
        matches!(self, Self::OperatorNotSupported { .. })
    }
}
