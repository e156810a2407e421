//! Catalog repository boundary.
//!
//! Five operations, each exactly one engine round trip. Callers depend on the
//! [`CatalogRepository`] trait only, so the engine-bound implementation can be
//! swapped for [`InMemoryCatalogRepository`] in tests.

pub mod in_memory;
pub mod search_engine;

use std::sync::Arc;

use async_trait::async_trait;

use catalog_core::{CatalogResult, OperationContext, ProductId};
use catalog_products::Product;

pub use in_memory::InMemoryCatalogRepository;
pub use search_engine::OpenSearchCatalogRepository;

/// Index holding every catalog document.
pub const CATALOG_INDEX: &str = "catalog";

/// Logical document type of catalog entries.
pub const PRODUCT_DOCUMENT_TYPE: &str = "product";

/// Store, fetch, page through and search catalog products.
///
/// - `put_product` upserts by id (last write wins).
/// - `get_product_by_id` fails with `NotFound` when the key is absent and with
///   `Decode` when the payload is unreadable.
/// - `list_products`, `list_products_with_ids` and `search_products` drop
///   undecodable documents and return the rest. Batch results follow the
///   engine's response order, not the order of `ids`.
/// - Transport failures are returned as-is; nothing here retries.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait CatalogRepository: Send + Sync {
    async fn put_product(&self, ctx: &OperationContext, product: &Product) -> CatalogResult<()>;

    async fn get_product_by_id(
        &self,
        ctx: &OperationContext,
        id: &ProductId,
    ) -> CatalogResult<Product>;

    async fn list_products(
        &self,
        ctx: &OperationContext,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>>;

    async fn list_products_with_ids(
        &self,
        ctx: &OperationContext,
        ids: &[ProductId],
    ) -> CatalogResult<Vec<Product>>;

    async fn search_products(
        &self,
        ctx: &OperationContext,
        query: &str,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>>;

    /// Release anything the repository holds. May be a no-op.
    async fn close(&self);
}

#[async_trait]
impl<R> CatalogRepository for Arc<R>
where
    R: CatalogRepository + ?Sized,
{
    async fn put_product(&self, ctx: &OperationContext, product: &Product) -> CatalogResult<()> {
        (**self).put_product(ctx, product).await
    }

    async fn get_product_by_id(
        &self,
        ctx: &OperationContext,
        id: &ProductId,
    ) -> CatalogResult<Product> {
        (**self).get_product_by_id(ctx, id).await
    }

    async fn list_products(
        &self,
        ctx: &OperationContext,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        (**self).list_products(ctx, skip, take).await
    }

    async fn list_products_with_ids(
        &self,
        ctx: &OperationContext,
        ids: &[ProductId],
    ) -> CatalogResult<Vec<Product>> {
        (**self).list_products_with_ids(ctx, ids).await
    }

    async fn search_products(
        &self,
        ctx: &OperationContext,
        query: &str,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        (**self).search_products(ctx, query, skip, take).await
    }

    async fn close(&self) {
        (**self).close().await
    }
}

/// Report documents dropped by a best-effort read. Return values are unaffected.
pub(crate) fn report_dropped(operation: &'static str, dropped: usize) {
    if dropped > 0 {
        tracing::warn!(operation, dropped, "skipped undecodable catalog documents");
    }
}
