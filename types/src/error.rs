//! Error type for parsing and validating the fundamental types.

use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum TypesError {
    #[error("invalid transport address: {0}")]
    InvalidAddress(String),

    #[error("invalid alias address: {0}")]
    InvalidAlias(String),

    #[error("invalid object identifier: {0}")]
    InvalidOid(String),

    #[error("invalid identifier: {0}")]
    InvalidIdentifier(String),
}
