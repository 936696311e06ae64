//! The module contains the errors the engine can return.
//!
//! The errors are:
//!
//! - [`Validation`] returned when a payload cannot be coerced into a budget
//!   or a required field is missing.
//! - [`KeyNotFound`] returned when no budget is stored for a user.
//! - [`InvalidCredentials`] returned when a login does not match the demo
//!   account.
//!
//!  [`Validation`]: EngineError::Validation
//!  [`KeyNotFound`]: EngineError::KeyNotFound
//!  [`InvalidCredentials`]: EngineError::InvalidCredentials
use thiserror::Error;

/// Engine custom errors.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum EngineError {
    #[error("{0}")]
    Validation(String),
    #[error("No budget found for \"{0}\"")]
    KeyNotFound(String),
    #[error("Invalid credentials")]
    InvalidCredentials,
}
