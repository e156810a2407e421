//! Runs the store / fetch / search / miss scenario against a live engine.

use std::time::Duration;

use anyhow::{bail, Context};

use catalog_core::{OperationContext, ProductId};
use catalog_infra::{CatalogRepository, EngineClient, EngineConfig, OpenSearchCatalogRepository};
use catalog_products::Product;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    catalog_observability::init();

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let engine = EngineClient::connect(&config).context("failed to connect to search engine")?;
    let repo = OpenSearchCatalogRepository::new(engine.clone());
    let ctx = OperationContext::with_timeout(Duration::from_secs(10));

    let mug = Product::new("p1", "Red Mug", "Ceramic mug, red glaze", 9.99);
    repo.put_product(&ctx, &mug).await.context("store failed")?;

    let fetched = repo
        .get_product_by_id(&ctx, &mug.id)
        .await
        .context("fetch failed")?;
    if fetched != mug {
        bail!("fetched product differs from stored one: {fetched:?}");
    }

    let hits = repo
        .search_products(&ctx, "ceramic", 0, 10)
        .await
        .context("search failed")?;
    tracing::info!(hits = hits.len(), "search returned");

    match repo.get_product_by_id(&ctx, &ProductId::from("p2")).await {
        Err(err) if err.is_not_found() => tracing::info!("missing product reported as not found"),
        other => bail!("expected not found for p2, got {other:?}"),
    }

    repo.close().await;
    engine.close();
    tracing::info!("smoke scenario passed");
    Ok(())
}
