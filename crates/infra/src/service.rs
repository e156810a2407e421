//! Catalog service: the façade a hosting API calls.
//!
//! Adds id assignment, input checks and page-size normalization on top of a
//! [`CatalogRepository`]. The repository itself imposes no page-size limit.

use catalog_core::{CatalogError, CatalogResult, OperationContext, ProductId};
use catalog_products::Product;

use crate::repository::CatalogRepository;

/// Page size used when the caller asks for nothing or for too much.
pub const MAX_PAGE_SIZE: u64 = 100;

pub struct CatalogService<R> {
    repository: R,
}

impl<R> CatalogService<R>
where
    R: CatalogRepository,
{
    pub fn new(repository: R) -> Self {
        Self { repository }
    }

    pub fn repository(&self) -> &R {
        &self.repository
    }

    /// Create a product under a freshly generated id.
    pub async fn post_product(
        &self,
        ctx: &OperationContext,
        name: &str,
        description: &str,
        price: f64,
    ) -> CatalogResult<Product> {
        if name.trim().is_empty() {
            return Err(CatalogError::validation("name cannot be empty"));
        }
        if !price.is_finite() || price < 0.0 {
            return Err(CatalogError::validation(format!(
                "price must be a non-negative number, got {price}"
            )));
        }

        let product = Product::new(ProductId::generate(), name, description, price);
        self.repository.put_product(ctx, &product).await?;
        tracing::info!(id = %product.id, "product stored");
        Ok(product)
    }

    pub async fn get_product(&self, ctx: &OperationContext, id: &ProductId) -> CatalogResult<Product> {
        self.repository.get_product_by_id(ctx, id).await
    }

    pub async fn get_products(
        &self,
        ctx: &OperationContext,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        let (skip, take) = normalize_window(skip, take);
        self.repository.list_products(ctx, skip, take).await
    }

    pub async fn get_products_by_ids(
        &self,
        ctx: &OperationContext,
        ids: &[ProductId],
    ) -> CatalogResult<Vec<Product>> {
        self.repository.list_products_with_ids(ctx, ids).await
    }

    /// Full-text search; a blank query lists instead.
    pub async fn search_products(
        &self,
        ctx: &OperationContext,
        query: &str,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        let (skip, take) = normalize_window(skip, take);
        if query.trim().is_empty() {
            return self.repository.list_products(ctx, skip, take).await;
        }
        self.repository.search_products(ctx, query, skip, take).await
    }

    pub async fn close(&self) {
        self.repository.close().await;
    }
}

fn normalize_window(skip: u64, take: u64) -> (u64, u64) {
    if take > MAX_PAGE_SIZE || (skip == 0 && take == 0) {
        (skip, MAX_PAGE_SIZE)
    } else {
        (skip, take)
    }
}
