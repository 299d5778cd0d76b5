//! Common error types used across the workspace.
//!
//! Each layer defines its own typed errors and converts into
//! [`RelayHubError`] via `From` at the crate boundary.

use std::error::Error as StdError;

/// Boxed source error carried across port boundaries.
pub type BoxError = Box<dyn StdError + Send + Sync>;

/// Top-level error returned by ports and services.
#[derive(Debug, thiserror::Error)]
pub enum RelayHubError {
    /// A request is missing a required field or carries an invalid value.
    #[error("validation error")]
    Validation(#[from] ValidationError),

    /// The requested resource could not be derived or located.
    #[error("not found")]
    NotFound(#[from] NotFoundError),

    /// Handing a command to the messaging fabric failed.
    #[error("publish error")]
    Publish(#[from] PublishError),

    /// A backing store failed.
    #[error("storage error")]
    Storage(#[source] BoxError),

    /// The messaging transport refused or could not take a message.
    #[error("transport error")]
    Transport(#[source] BoxError),
}

/// Invariant violations detected before any IO happens.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum ValidationError {
    /// A required field was absent or empty.
    #[error("{0} is required")]
    MissingField(&'static str),

    /// A field was present but could not be interpreted.
    #[error("{field} is invalid")]
    InvalidField { field: &'static str },
}

/// A lookup that yielded nothing.
#[derive(Debug, thiserror::Error, PartialEq, Eq)]
#[error("{entity} not found: {id}")]
pub struct NotFoundError {
    pub entity: &'static str,
    pub id: String,
}

/// A publish failure, wrapped with the topic it was aimed at.
#[derive(Debug, thiserror::Error)]
#[error("failed to publish to {topic}")]
pub struct PublishError {
    pub topic: String,
    #[source]
    pub source: BoxError,
}
