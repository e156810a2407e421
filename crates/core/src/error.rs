//! Catalog error model.

use thiserror::Error;

/// Result type used across the catalog.
pub type CatalogResult<T> = Result<T, CatalogError>;

/// Boxed engine error, kept opaque so callers never depend on the client crate.
pub type TransportSource = Box<dyn std::error::Error + Send + Sync + 'static>;

/// A stored payload could not be interpreted as a product document.
#[derive(Debug, Error)]
#[error("failed to decode document `{id}`: {source}")]
pub struct DecodeError {
    pub id: String,
    #[source]
    pub source: serde_json::Error,
}

impl DecodeError {
    pub fn new(id: impl Into<String>, source: serde_json::Error) -> Self {
        Self {
            id: id.into(),
            source,
        }
    }
}

/// Error reported by every catalog operation.
///
/// `NotFound` is only ever produced for a single-key fetch that the engine
/// answered with "absent"; it is never derived from a transport failure.
#[derive(Debug, Error)]
pub enum CatalogError {
    /// The requested product does not exist.
    #[error("entity not found")]
    NotFound,

    /// The document exists but its payload is not a product.
    #[error(transparent)]
    Decode(#[from] DecodeError),

    /// The engine call itself failed (network, auth, engine-side rejection).
    #[error("search engine request failed: {0}")]
    Transport(#[source] TransportSource),

    /// The caller cancelled the operation while it was in flight.
    #[error("operation cancelled")]
    Cancelled,

    /// The caller's deadline elapsed while the operation was in flight.
    #[error("deadline exceeded")]
    DeadlineExceeded,

    /// Input rejected before reaching the repository.
    #[error("validation failed: {0}")]
    Validation(String),
}

impl CatalogError {
    pub fn transport(err: impl Into<TransportSource>) -> Self {
        Self::Transport(err.into())
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound)
    }

    /// True for both cancellation flavours (explicit cancel or deadline).
    pub fn is_cancelled(&self) -> bool {
        matches!(self, Self::Cancelled | Self::DeadlineExceeded)
    }
}
