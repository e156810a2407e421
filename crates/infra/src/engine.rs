//! Shared search-engine connection handle.
//!
//! Built once from [`EngineConfig`] and injected into repositories. Clones share
//! the same underlying transport, which is safe for concurrent use.

use std::sync::Arc;

use opensearch::auth::Credentials as BasicAuth;
use opensearch::http::transport::{BuildError, SingleNodeConnectionPool, TransportBuilder};
use opensearch::http::Url;
use opensearch::OpenSearch;
use thiserror::Error;

use crate::config::EngineConfig;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("invalid engine url `{url}`: {source}")]
    InvalidUrl {
        url: String,
        #[source]
        source: url::ParseError,
    },

    #[error("failed to build engine transport: {0}")]
    Transport(#[from] BuildError),
}

/// Connection handle to the backing document search engine.
#[derive(Clone)]
pub struct EngineClient {
    inner: Arc<OpenSearch>,
}

impl core::fmt::Debug for EngineClient {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.debug_struct("EngineClient")
            .field("shares", &self.shares())
            .finish()
    }
}

impl EngineClient {
    #[tracing::instrument(skip(config), fields(url = %config.url, sniff = config.sniff))]
    pub fn connect(config: &EngineConfig) -> Result<Self, EngineError> {
        let url = Url::parse(&config.url).map_err(|source| EngineError::InvalidUrl {
            url: config.url.clone(),
            source,
        })?;

        if config.sniff {
            tracing::warn!("node discovery requested; single-node pool talks to the configured url only");
        }

        let mut builder = TransportBuilder::new(SingleNodeConnectionPool::new(url));
        if let Some(creds) = &config.credentials {
            builder = builder.auth(BasicAuth::Basic(
                creds.username.clone(),
                creds.password.clone(),
            ));
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let transport = builder.build()?;
        tracing::info!("search engine client ready");

        Ok(Self {
            inner: Arc::new(OpenSearch::new(transport)),
        })
    }

    /// Wrap an already-built client (tests, custom transports).
    pub fn from_client(client: OpenSearch) -> Self {
        Self {
            inner: Arc::new(client),
        }
    }

    pub fn client(&self) -> &OpenSearch {
        &self.inner
    }

    /// Number of live shares of this handle.
    pub fn shares(&self) -> usize {
        Arc::strong_count(&self.inner)
    }

    /// Release this share. The transport is torn down with the last share.
    pub fn close(self) {
        tracing::debug!(remaining = self.shares() - 1, "releasing search engine client");
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn connect_rejects_unparseable_url() {
        let err = EngineClient::connect(&EngineConfig::new("not a url")).unwrap_err();
        assert!(matches!(err, EngineError::InvalidUrl { .. }));
    }

    #[test]
    fn clones_share_one_transport_until_closed() {
        let client = EngineClient::connect(&EngineConfig::default()).unwrap();
        let shared = client.clone();
        assert_eq!(client.shares(), 2);

        shared.close();
        assert_eq!(client.shares(), 1);
    }
}
