//! `catalog-core`: shared building blocks for the product catalog.
//!
//! This crate holds the error taxonomy every catalog operation reports, the
//! product identifier, and the per-call context carrying deadlines and
//! cancellation. It knows nothing about the backing search engine.

pub mod context;
pub mod error;
pub mod id;

pub use context::OperationContext;
pub use error::{CatalogError, CatalogResult, DecodeError};
pub use id::ProductId;
