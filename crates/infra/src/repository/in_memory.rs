use std::collections::BTreeMap;
use std::sync::{PoisonError, RwLock, RwLockReadGuard, RwLockWriteGuard};

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use catalog_core::{CatalogError, CatalogResult, OperationContext, ProductId};
use catalog_products::{decode, encode, Product};

use super::{report_dropped, CatalogRepository};

/// In-memory catalog for tests/dev.
///
/// Keeps raw JSON payloads keyed by id, so reads go through the same codec
/// (and the same drop policy) as the engine-backed repository. Traversal order
/// is id order, which keeps `skip`/`take` windows stable for a static dataset.
#[derive(Debug, Default)]
pub struct InMemoryCatalogRepository {
    docs: RwLock<BTreeMap<ProductId, JsonValue>>,
}

impl InMemoryCatalogRepository {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store an arbitrary payload under `id`, bypassing the codec.
    pub fn insert_raw(&self, id: impl Into<ProductId>, payload: JsonValue) {
        self.write().insert(id.into(), payload);
    }

    pub fn len(&self) -> usize {
        self.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    // A panicking writer cannot leave a half-applied insert behind, so the map
    // is still usable after poisoning.
    fn read(&self) -> RwLockReadGuard<'_, BTreeMap<ProductId, JsonValue>> {
        self.docs.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeMap<ProductId, JsonValue>> {
        self.docs.write().unwrap_or_else(PoisonError::into_inner)
    }

    fn snapshot(&self) -> Vec<(ProductId, JsonValue)> {
        self.read().iter().map(|(k, v)| (k.clone(), v.clone())).collect()
    }
}

fn tokens(text: &str) -> Vec<String> {
    text.split(|c: char| !c.is_alphanumeric())
        .filter(|t| !t.is_empty())
        .map(str::to_lowercase)
        .collect()
}

/// Number of distinct query tokens present in name or description.
fn score(product: &Product, query_tokens: &[String]) -> usize {
    let mut haystack = tokens(&product.name);
    haystack.extend(tokens(&product.description));
    query_tokens.iter().filter(|q| haystack.contains(q)).count()
}

fn page<T>(items: Vec<T>, skip: u64, take: u64) -> Vec<T> {
    let skip = usize::try_from(skip).unwrap_or(usize::MAX);
    let take = usize::try_from(take).unwrap_or(usize::MAX);
    items.into_iter().skip(skip).take(take).collect()
}

fn decode_all<I>(entries: I) -> (Vec<Product>, usize)
where
    I: IntoIterator<Item = (ProductId, JsonValue)>,
{
    let mut dropped = 0;
    let products = entries
        .into_iter()
        .filter_map(|(id, payload)| match decode(payload, id) {
            Ok(p) => Some(p),
            Err(_) => {
                dropped += 1;
                None
            }
        })
        .collect();
    (products, dropped)
}

#[async_trait]
impl CatalogRepository for InMemoryCatalogRepository {
    async fn put_product(&self, ctx: &OperationContext, product: &Product) -> CatalogResult<()> {
        ctx.run(async {
            let payload = serde_json::to_value(encode(product)).map_err(CatalogError::transport)?;
            self.write().insert(product.id.clone(), payload);
            Ok(())
        })
        .await
    }

    async fn get_product_by_id(
        &self,
        ctx: &OperationContext,
        id: &ProductId,
    ) -> CatalogResult<Product> {
        ctx.run(async {
            let payload = self.read().get(id).cloned().ok_or(CatalogError::NotFound)?;
            Ok(decode(payload, id.clone())?)
        })
        .await
    }

    async fn list_products(
        &self,
        ctx: &OperationContext,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        ctx.run(async {
            let window = page(self.snapshot(), skip, take);
            let (products, dropped) = decode_all(window);
            report_dropped("list_products", dropped);
            Ok(products)
        })
        .await
    }

    async fn list_products_with_ids(
        &self,
        ctx: &OperationContext,
        ids: &[ProductId],
    ) -> CatalogResult<Vec<Product>> {
        ctx.run(async {
            let found: Vec<(ProductId, JsonValue)> = {
                let docs = self.read();
                ids.iter()
                    .filter_map(|id| docs.get(id).map(|v| (id.clone(), v.clone())))
                    .collect()
            };
            let (products, dropped) = decode_all(found);
            report_dropped("list_products_with_ids", dropped);
            Ok(products)
        })
        .await
    }

    async fn search_products(
        &self,
        ctx: &OperationContext,
        query: &str,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        ctx.run(async {
            let query_tokens = tokens(query);
            let (candidates, dropped) = decode_all(self.snapshot());
            report_dropped("search_products", dropped);

            let mut scored: Vec<(usize, Product)> = candidates
                .into_iter()
                .map(|p| (score(&p, &query_tokens), p))
                .filter(|(s, _)| *s > 0)
                .collect();
            // Stable sort keeps id order among equal scores.
            scored.sort_by(|a, b| b.0.cmp(&a.0));

            Ok(page(scored, skip, take).into_iter().map(|(_, p)| p).collect())
        })
        .await
    }

    async fn close(&self) {}
}
