use anyhow::Context;
use reqwest::Client;
use serde_json::Value;
use tracing::debug;
use url::Url;

use crate::config::{BackendConfig, EndpointConfig};
use crate::domain::SearchRequest;
use crate::services::lookup_service::{SearchBackend, SearchError};

/// `GET <base_url><path>?search=..&page=..&size=..` against the REST backend.
#[derive(Clone)]
pub struct HttpSearchBackend {
    client: Client,
    name: String,
    endpoint: Url,
    api_key: Option<String>,
}

impl HttpSearchBackend {
    /// Builds a backend for one configured endpoint.
    ///
    /// No client-level timeout is set here; request timeouts belong to the
    /// controller so they share its cancellation path.
    ///
    /// # Errors
    /// Returns an error if the endpoint URL is invalid or the HTTP client
    /// cannot be built.
    pub fn new(backend: &BackendConfig, endpoint: &EndpointConfig) -> anyhow::Result<Self> {
        let client = Client::builder()
            .user_agent(backend.user_agent.clone())
            .build()
            .map_err(|e| anyhow::anyhow!("Failed to build HTTP client: {e}"))?;

        let endpoint_url = join_endpoint(&backend.base_url, &endpoint.path)
            .with_context(|| format!("Invalid URL for endpoint '{}'", endpoint.name))?;

        Ok(Self {
            client,
            name: endpoint.name.clone(),
            endpoint: endpoint_url,
            api_key: backend.api_key.clone(),
        })
    }

    #[must_use]
    pub fn build_url(&self, request: &SearchRequest) -> Url {
        let mut url = self.endpoint.clone();
        url.query_pairs_mut()
            .append_pair("search", &request.query)
            .append_pair("page", &request.page.to_string())
            .append_pair("size", &request.page_size.to_string());
        url
    }
}

/// Joins `base` and `path` without dropping the base's own path segments,
/// which `Url::join` would do for a base lacking a trailing slash.
fn join_endpoint(base: &str, path: &str) -> Result<Url, url::ParseError> {
    let joined = format!(
        "{}/{}",
        base.trim_end_matches('/'),
        path.trim_start_matches('/')
    );
    Url::parse(&joined)
}

#[async_trait::async_trait]
impl SearchBackend for HttpSearchBackend {
    fn name(&self) -> &str {
        &self.name
    }

    async fn fetch(&self, request: &SearchRequest) -> Result<Value, SearchError> {
        let url = self.build_url(request);
        debug!("GET {}", url);

        let mut builder = self.client.get(url);
        if let Some(key) = &self.api_key {
            builder = builder.header("X-Api-Key", key);
        }

        let response = builder.send().await?.error_for_status()?;
        let body = response.json::<Value>().await?;
        Ok(body)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn backend(base_url: &str) -> HttpSearchBackend {
        let config = BackendConfig {
            base_url: base_url.to_string(),
            ..BackendConfig::default()
        };
        HttpSearchBackend::new(&config, &EndpointConfig::customers()).unwrap()
    }

    #[test]
    fn test_build_url_encodes_query() {
        let backend = backend("http://erp.local/api");
        let url = backend.build_url(&SearchRequest::new("john smith & co", 2, 20));
        assert_eq!(url.path(), "/api/customers/search");

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(
            pairs,
            vec![
                ("search".to_string(), "john smith & co".to_string()),
                ("page".to_string(), "2".to_string()),
                ("size".to_string(), "20".to_string()),
            ]
        );
        assert!(!url.as_str().contains(' '));
    }

    #[test]
    fn test_join_endpoint_keeps_base_path() {
        assert_eq!(
            join_endpoint("http://h/api/", "/x/search").unwrap().as_str(),
            "http://h/api/x/search"
        );
        assert_eq!(
            join_endpoint("http://h", "x").unwrap().as_str(),
            "http://h/x"
        );
    }

    #[test]
    fn test_invalid_base_url() {
        let config = BackendConfig {
            base_url: "not a url".to_string(),
            ..BackendConfig::default()
        };
        assert!(HttpSearchBackend::new(&config, &EndpointConfig::customers()).is_err());
    }
}
