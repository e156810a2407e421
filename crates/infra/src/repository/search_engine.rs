//! OpenSearch-backed catalog repository.
//!
//! Wire shape: index [`CATALOG_INDEX`], key = product id, body = the encoded
//! [`StoredDocument`](catalog_products::StoredDocument). The engine API is
//! typeless, so [`PRODUCT_DOCUMENT_TYPE`] is not sent on the wire.

use async_trait::async_trait;
use opensearch::http::response::Response;
use opensearch::http::StatusCode;
use opensearch::{GetParts, IndexParts, MgetParts, SearchParts};
use serde::Deserialize;
use serde_json::{json, Value as JsonValue};

use catalog_core::{CatalogError, CatalogResult, OperationContext, ProductId};
use catalog_products::{decode, encode, Product};

use super::{report_dropped, CatalogRepository, CATALOG_INDEX, PRODUCT_DOCUMENT_TYPE};
use crate::engine::EngineClient;

/// The one engine-bound [`CatalogRepository`].
///
/// Stateless apart from the shared client handle; safe to call concurrently.
#[derive(Debug, Clone)]
pub struct OpenSearchCatalogRepository {
    engine: EngineClient,
}

impl OpenSearchCatalogRepository {
    pub fn new(engine: EngineClient) -> Self {
        Self { engine }
    }

    pub fn engine(&self) -> &EngineClient {
        &self.engine
    }
}

#[async_trait]
impl CatalogRepository for OpenSearchCatalogRepository {
    #[tracing::instrument(
        skip(self, ctx, product),
        fields(index = CATALOG_INDEX, doc_type = PRODUCT_DOCUMENT_TYPE, id = %product.id)
    )]
    async fn put_product(&self, ctx: &OperationContext, product: &Product) -> CatalogResult<()> {
        ctx.run(async {
            let response = self
                .engine
                .client()
                .index(IndexParts::IndexId(CATALOG_INDEX, product.id.as_str()))
                .body(encode(product))
                .send()
                .await
                .map_err(CatalogError::transport)?;
            ensure_success(response).await?;
            Ok(())
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx, id), fields(index = CATALOG_INDEX, id = %id))]
    async fn get_product_by_id(
        &self,
        ctx: &OperationContext,
        id: &ProductId,
    ) -> CatalogResult<Product> {
        ctx.run(async {
            let response = self
                .engine
                .client()
                .get(GetParts::IndexId(CATALOG_INDEX, id.as_str()))
                .send()
                .await
                .map_err(CatalogError::transport)?;

            if response.status_code() == StatusCode::NOT_FOUND {
                return Err(CatalogError::NotFound);
            }

            let body: GetResponse = ensure_success(response)
                .await?
                .json()
                .await
                .map_err(CatalogError::transport)?;

            product_from_get(id, body)
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx), fields(index = CATALOG_INDEX))]
    async fn list_products(
        &self,
        ctx: &OperationContext,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        ctx.run(async {
            let hits = self.search_window(match_all_query(), skip, take).await?;
            let (products, dropped) = decode_hits(hits);
            report_dropped("list_products", dropped);
            Ok(products)
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx, ids), fields(index = CATALOG_INDEX, requested = ids.len()))]
    async fn list_products_with_ids(
        &self,
        ctx: &OperationContext,
        ids: &[ProductId],
    ) -> CatalogResult<Vec<Product>> {
        ctx.run(async {
            // The engine rejects an empty multi-get.
            if ids.is_empty() {
                return Ok(Vec::new());
            }

            let response = self
                .engine
                .client()
                .mget(MgetParts::Index(CATALOG_INDEX))
                .body(mget_body(ids))
                .send()
                .await
                .map_err(CatalogError::transport)?;
            let body: MgetResponse = ensure_success(response)
                .await?
                .json()
                .await
                .map_err(CatalogError::transport)?;

            let (products, dropped) = decode_mget(body);
            report_dropped("list_products_with_ids", dropped);
            Ok(products)
        })
        .await
    }

    #[tracing::instrument(skip(self, ctx), fields(index = CATALOG_INDEX))]
    async fn search_products(
        &self,
        ctx: &OperationContext,
        query: &str,
        skip: u64,
        take: u64,
    ) -> CatalogResult<Vec<Product>> {
        ctx.run(async {
            let hits = self
                .search_window(multi_match_query(query), skip, take)
                .await?;
            let (products, dropped) = decode_hits(hits);
            report_dropped("search_products", dropped);
            Ok(products)
        })
        .await
    }

    async fn close(&self) {
        tracing::debug!("catalog repository closed");
    }
}

impl OpenSearchCatalogRepository {
    async fn search_window(&self, query: JsonValue, skip: u64, take: u64) -> CatalogResult<Vec<Hit>> {
        let response = self
            .engine
            .client()
            .search(SearchParts::Index(&[CATALOG_INDEX]))
            .from(window(skip))
            .size(window(take))
            .body(query)
            .send()
            .await
            .map_err(CatalogError::transport)?;
        let body: SearchResponse = ensure_success(response)
            .await?
            .json()
            .await
            .map_err(CatalogError::transport)?;

        Ok(body.hits.hits)
    }
}

/// Pass 2xx/3xx through; turn anything else into `Transport` carrying the
/// status and the engine's raw error body.
async fn ensure_success(response: Response) -> CatalogResult<Response> {
    let status = response.status_code();
    if !(status.is_client_error() || status.is_server_error()) {
        return Ok(response);
    }
    let body = response
        .text()
        .await
        .unwrap_or_else(|err| format!("<unreadable body: {err}>"));
    Err(CatalogError::transport(format!("status {status}: {body}")))
}

/// Pagination values go to the engine unchanged; saturate instead of wrapping.
fn window(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}

fn match_all_query() -> JsonValue {
    json!({ "query": { "match_all": {} } })
}

fn multi_match_query(query: &str) -> JsonValue {
    json!({
        "query": {
            "multi_match": {
                "query": query,
                "fields": ["name", "description"]
            }
        }
    })
}

fn mget_body(ids: &[ProductId]) -> JsonValue {
    json!({ "ids": ids })
}

#[derive(Debug, Deserialize)]
struct GetResponse {
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    hits: SearchHits,
}

#[derive(Debug, Deserialize)]
struct SearchHits {
    #[serde(default)]
    hits: Vec<Hit>,
}

#[derive(Debug, Deserialize)]
struct Hit {
    #[serde(rename = "_id")]
    id: String,
    #[serde(rename = "_source")]
    source: Option<JsonValue>,
}

#[derive(Debug, Deserialize)]
struct MgetResponse {
    #[serde(default)]
    docs: Vec<MgetDoc>,
}

#[derive(Debug, Deserialize)]
struct MgetDoc {
    #[serde(rename = "_id")]
    id: String,
    #[serde(default)]
    found: bool,
    #[serde(rename = "_source")]
    source: Option<JsonValue>,
}

fn product_from_get(id: &ProductId, body: GetResponse) -> CatalogResult<Product> {
    if !body.found {
        return Err(CatalogError::NotFound);
    }
    let payload = body.source.unwrap_or(JsonValue::Null);
    Ok(decode(payload, id.clone())?)
}

/// Decode every entry that parses; count the ones that don't.
fn decode_entries<I>(entries: I) -> (Vec<Product>, usize)
where
    I: IntoIterator<Item = (String, Option<JsonValue>)>,
{
    let mut dropped = 0;
    let products = entries
        .into_iter()
        .filter_map(|(id, source)| {
            match decode(source.unwrap_or(JsonValue::Null), id) {
                Ok(product) => Some(product),
                Err(err) => {
                    tracing::debug!(error = %err, "dropping document");
                    dropped += 1;
                    None
                }
            }
        })
        .collect();
    (products, dropped)
}

fn decode_hits(hits: Vec<Hit>) -> (Vec<Product>, usize) {
    decode_entries(hits.into_iter().map(|h| (h.id, h.source)))
}

/// Missing keys are not decode failures; they are simply absent from the result.
fn decode_mget(body: MgetResponse) -> (Vec<Product>, usize) {
    decode_entries(
        body.docs
            .into_iter()
            .filter(|d| d.found)
            .map(|d| (d.id, d.source)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    fn mug() -> Product {
        Product::new("p1", "Red Mug", "Ceramic mug, red glaze", 9.99)
    }

    #[test]
    fn search_query_targets_name_and_description() {
        assert_eq!(
            multi_match_query("ceramic"),
            json!({
                "query": {
                    "multi_match": { "query": "ceramic", "fields": ["name", "description"] }
                }
            })
        );
        assert_eq!(match_all_query(), json!({ "query": { "match_all": {} } }));
    }

    #[test]
    fn mget_body_lists_ids_in_request_order() {
        let ids = vec![ProductId::from("b"), ProductId::from("a")];
        assert_eq!(mget_body(&ids), json!({ "ids": ["b", "a"] }));
    }

    #[test]
    fn window_saturates_instead_of_wrapping() {
        assert_eq!(window(0), 0);
        assert_eq!(window(25), 25);
        assert_eq!(window(u64::MAX), i64::MAX);
    }

    #[test]
    fn get_response_found_decodes_product() {
        let body: GetResponse = serde_json::from_value(json!({
            "_index": "catalog",
            "_id": "p1",
            "found": true,
            "_source": { "name": "Red Mug", "description": "Ceramic mug, red glaze", "price": 9.99 }
        }))
        .unwrap();

        let product = product_from_get(&ProductId::from("p1"), body).unwrap();
        assert_eq!(product, mug());
    }

    #[test]
    fn get_response_not_found_is_sentinel() {
        let body: GetResponse =
            serde_json::from_value(json!({ "_index": "catalog", "_id": "p2", "found": false })).unwrap();

        let err = product_from_get(&ProductId::from("p2"), body).unwrap_err();
        assert!(err.is_not_found());
    }

    #[test]
    fn get_response_with_bad_payload_is_decode_error() {
        let body: GetResponse = serde_json::from_value(json!({
            "found": true,
            "_source": { "name": 42 }
        }))
        .unwrap();

        let err = product_from_get(&ProductId::from("p3"), body).unwrap_err();
        assert!(matches!(err, CatalogError::Decode(_)));
    }

    #[test]
    fn search_hits_drop_undecodable_documents() {
        let body: SearchResponse = serde_json::from_value(json!({
            "took": 3,
            "hits": {
                "total": { "value": 3, "relation": "eq" },
                "hits": [
                    { "_id": "p1", "_score": 1.0, "_source": { "name": "Red Mug", "description": "Ceramic mug, red glaze", "price": 9.99 } },
                    { "_id": "bad", "_score": 1.0, "_source": { "name": "Broken", "price": "n/a" } },
                    { "_id": "p2", "_score": 0.5, "_source": { "name": "Plate", "description": "Stoneware", "price": 4.5 } }
                ]
            }
        }))
        .unwrap();

        let (products, dropped) = decode_hits(body.hits.hits);
        assert_eq!(dropped, 1);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p1", "p2"]);
    }

    #[test]
    fn empty_hits_section_yields_no_products() {
        let body: SearchResponse = serde_json::from_value(json!({ "hits": {} })).unwrap();
        let (products, dropped) = decode_hits(body.hits.hits);
        assert!(products.is_empty());
        assert_eq!(dropped, 0);
    }

    #[test]
    fn mget_skips_missing_keys_without_counting_them() {
        let body: MgetResponse = serde_json::from_value(json!({
            "docs": [
                { "_id": "p2", "found": true, "_source": { "name": "Plate", "description": "Stoneware", "price": 4.5 } },
                { "_id": "ghost", "found": false },
                { "_id": "p1", "found": true, "_source": { "name": "Red Mug", "description": "Ceramic mug, red glaze", "price": 9.99 } },
                { "_id": "bad", "found": true, "_source": "not an object" }
            ]
        }))
        .unwrap();

        let (products, dropped) = decode_mget(body);
        assert_eq!(dropped, 1);
        let ids: Vec<&str> = products.iter().map(|p| p.id.as_str()).collect();
        assert_eq!(ids, vec!["p2", "p1"]);
    }

    #[tokio::test]
    async fn empty_id_list_short_circuits() {
        let repo = OpenSearchCatalogRepository::new(EngineClient::from_client(
            opensearch::OpenSearch::default(),
        ));
        let products = repo
            .list_products_with_ids(&OperationContext::background(), &[])
            .await
            .unwrap();
        assert!(products.is_empty());
    }

    #[tokio::test]
    async fn empty_id_list_still_honours_cancellation() {
        let repo = OpenSearchCatalogRepository::new(EngineClient::from_client(
            opensearch::OpenSearch::default(),
        ));
        let ctx = OperationContext::background();
        ctx.cancel();

        let err = repo.list_products_with_ids(&ctx, &[]).await.unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled));
    }

    #[tokio::test]
    async fn cancelled_context_never_reaches_the_engine() {
        let repo = OpenSearchCatalogRepository::new(EngineClient::from_client(
            opensearch::OpenSearch::default(),
        ));
        let ctx = OperationContext::background();
        ctx.cancel();

        let err = repo.put_product(&ctx, &mug()).await.unwrap_err();
        assert!(matches!(err, CatalogError::Cancelled));
    }

    mod http {
        use super::*;
        use crate::config::EngineConfig;
        use tokio::io::{AsyncReadExt, AsyncWriteExt};
        use tokio::net::{TcpListener, TcpStream};

        /// Read one request (headers plus `content-length` bytes of body).
        async fn read_request(stream: &mut TcpStream) {
            let mut buf = Vec::new();
            let mut chunk = [0u8; 4096];
            loop {
                let n = stream.read(&mut chunk).await.unwrap_or(0);
                if n == 0 {
                    return;
                }
                buf.extend_from_slice(&chunk[..n]);
                let Some(end) = buf.windows(4).position(|w| w == b"\r\n\r\n") else {
                    continue;
                };
                let headers = String::from_utf8_lossy(&buf[..end]).to_ascii_lowercase();
                let length = headers
                    .lines()
                    .find_map(|l| l.strip_prefix("content-length:"))
                    .and_then(|v| v.trim().parse::<usize>().ok())
                    .unwrap_or(0);
                if buf.len() >= end + 4 + length {
                    return;
                }
            }
        }

        /// Answer a single request with `status` and a JSON `body`; returns the base url.
        async fn engine_replying(status: &'static str, body: JsonValue) -> String {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            tokio::spawn(async move {
                let (mut stream, _) = listener.accept().await.unwrap();
                read_request(&mut stream).await;
                let body = body.to_string();
                let reply = format!(
                    "HTTP/1.1 {status}\r\ncontent-type: application/json\r\ncontent-length: {}\r\nconnection: close\r\n\r\n{body}",
                    body.len()
                );
                let _ = stream.write_all(reply.as_bytes()).await;
                let _ = stream.shutdown().await;
            });
            format!("http://{addr}")
        }

        fn repo_at(url: &str) -> OpenSearchCatalogRepository {
            OpenSearchCatalogRepository::new(EngineClient::connect(&EngineConfig::new(url)).unwrap())
        }

        fn ctx() -> OperationContext {
            OperationContext::with_timeout(std::time::Duration::from_secs(5))
        }

        #[tokio::test]
        async fn missing_document_status_is_not_found() {
            let url = engine_replying(
                "404 Not Found",
                json!({ "_index": "catalog", "_id": "p2", "found": false }),
            )
            .await;

            let err = repo_at(&url)
                .get_product_by_id(&ctx(), &ProductId::from("p2"))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::NotFound));
        }

        #[tokio::test]
        async fn found_false_body_is_not_found() {
            let url = engine_replying("200 OK", json!({ "_index": "catalog", "_id": "p2", "found": false })).await;

            let err = repo_at(&url)
                .get_product_by_id(&ctx(), &ProductId::from("p2"))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::NotFound));
        }

        #[tokio::test]
        async fn found_document_round_trips() {
            let url = engine_replying(
                "200 OK",
                json!({
                    "_index": "catalog",
                    "_id": "p1",
                    "found": true,
                    "_source": { "name": "Red Mug", "description": "Ceramic mug, red glaze", "price": 9.99 }
                }),
            )
            .await;

            let product = repo_at(&url)
                .get_product_by_id(&ctx(), &ProductId::from("p1"))
                .await
                .unwrap();
            assert_eq!(product, mug());
        }

        #[tokio::test]
        async fn server_error_on_fetch_is_transport() {
            let url = engine_replying(
                "503 Service Unavailable",
                json!({ "error": { "type": "unavailable_shards_exception" }, "status": 503 }),
            )
            .await;

            let err = repo_at(&url)
                .get_product_by_id(&ctx(), &ProductId::from("p1"))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::Transport(_)));
        }

        #[tokio::test]
        async fn engine_error_body_is_kept_in_transport_error() {
            let url = engine_replying(
                "503 Service Unavailable",
                json!({
                    "error": {
                        "type": "cluster_block_exception",
                        "reason": "index [catalog] blocked by: [FORBIDDEN/8/index read-only]"
                    },
                    "status": 503
                }),
            )
            .await;

            let err = repo_at(&url).list_products(&ctx(), 0, 10).await.unwrap_err();
            assert!(matches!(err, CatalogError::Transport(_)));
            let message = err.to_string();
            assert!(message.contains("503"), "{message}");
            assert!(message.contains("cluster_block_exception"), "{message}");
            assert!(message.contains("read-only"), "{message}");
        }

        #[tokio::test]
        async fn rejected_write_is_transport_not_not_found() {
            let url = engine_replying(
                "404 Not Found",
                json!({ "error": { "type": "index_not_found_exception" }, "status": 404 }),
            )
            .await;

            let err = repo_at(&url).put_product(&ctx(), &mug()).await.unwrap_err();
            assert!(matches!(err, CatalogError::Transport(_)));
            assert!(err.to_string().contains("index_not_found_exception"));
        }

        #[tokio::test]
        async fn unreachable_engine_is_transport_not_not_found() {
            let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
            let addr = listener.local_addr().unwrap();
            drop(listener);

            let err = repo_at(&format!("http://{addr}"))
                .get_product_by_id(&ctx(), &ProductId::from("p1"))
                .await
                .unwrap_err();
            assert!(matches!(err, CatalogError::Transport(_)));
            assert!(!err.is_not_found());
        }

        #[tokio::test]
        async fn successful_search_drops_bad_hits() {
            let url = engine_replying(
                "200 OK",
                json!({
                    "hits": {
                        "hits": [
                            { "_id": "p1", "_source": { "name": "Red Mug", "description": "Ceramic mug, red glaze", "price": 9.99 } },
                            { "_id": "bad", "_source": { "price": "n/a" } }
                        ]
                    }
                }),
            )
            .await;

            let products = repo_at(&url)
                .search_products(&ctx(), "ceramic", 0, 10)
                .await
                .unwrap();
            assert_eq!(products, vec![mug()]);
        }
    }
}
