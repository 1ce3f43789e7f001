//! Core error type.
//!
//! Each kernel crate defines its own error enum for the conditions it owns;
//! `pk-sim` folds them together into `SimError` via `From` impls so
//! components see a single taxonomy.

use thiserror::Error;

use crate::{RngId, ValueKind};

/// Errors raised by `pk-core` primitives.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum CoreError {
    #[error("random number generator {0} was not declared in the configuration")]
    UnknownRandomNumberGeneratorId(RngId),

    #[error("incompatible property value: expected {expected}, got {got}")]
    IncompatibleValue {
        expected: ValueKind,
        got:      ValueKind,
    },

    #[error("configuration error: {0}")]
    Config(String),
}

/// Shorthand result type for `pk-core`.
pub type CoreResult<T> = Result<T, CoreError>;
