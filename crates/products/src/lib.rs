//! Products domain module.
//!
//! This crate contains the catalog's `Product` value type and the document
//! codec that maps it to and from the payload the search engine stores
//! (no IO, no HTTP, no storage).

pub mod document;
pub mod product;

pub use document::{decode, encode, StoredDocument};
pub use product::Product;
