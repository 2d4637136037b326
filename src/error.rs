use thiserror::Error;

/// Result alias used throughout the crate.
pub type Result<T> = std::result::Result<T, AutocompleteError>;

/// Errors raised for configuration mistakes and caller precondition violations.
///
/// A call that fails never mutates the tree.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum AutocompleteError {
    /// Weight policy literal other than `sum` or `average`.
    #[error("unknown weight policy: {0:?} (expected \"sum\" or \"average\")")]
    UnknownPolicy(String),

    /// Tree kind literal other than `simple` or `compressed`.
    #[error("unknown autocompleter kind: {0:?} (expected \"simple\" or \"compressed\")")]
    UnknownTreeKind(String),

    /// Entry weights must be finite and strictly positive.
    #[error("invalid weight {0}: weights must be finite and greater than zero")]
    InvalidWeight(f64),

    /// `limit` was `Some(0)`.
    #[error("invalid limit: must be at least 1 when given")]
    InvalidLimit,
}
