//! Infrastructure layer: engine connection, configuration, catalog repositories.

pub mod config;
pub mod engine;
pub mod repository;
pub mod service;

pub use config::{ConfigError, EngineConfig};
pub use engine::{EngineClient, EngineError};
pub use repository::{
    CatalogRepository, InMemoryCatalogRepository, OpenSearchCatalogRepository, CATALOG_INDEX,
};
pub use service::CatalogService;
