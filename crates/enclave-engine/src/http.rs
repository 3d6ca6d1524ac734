use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use tracing::info;
use url::Url;

use crate::error::{EngineError, EngineResult};

/// Default timeout for engine requests. Package runs block until the
/// package has finished, so this is generous.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(300);

/// Shared HTTP client for the engine API. Owns the connection pool, base URL
/// and optional API key. Clone is a cheap Arc refcount bump.
#[derive(Clone)]
pub struct HttpClient {
    inner: Arc<Inner>,
}

struct Inner {
    client: Client,
    base: Url,
    base_url: String,
    api_key: Option<String>,
}

impl HttpClient {
    pub fn new(base_url: &str, api_key: Option<String>, timeout: Duration) -> EngineResult<Self> {
        let parsed =
            Url::parse(base_url).map_err(|e| EngineError::InvalidUrl(format!("{base_url}: {e}")))?;
        if !matches!(parsed.scheme(), "http" | "https") {
            return Err(EngineError::InvalidUrl(format!(
                "{base_url}: unsupported scheme {}",
                parsed.scheme()
            )));
        }

        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| EngineError::Client(e.to_string()))?;

        if parsed.cannot_be_a_base() {
            return Err(EngineError::InvalidUrl(format!("{base_url}: not a base URL")));
        }
        let base_url = parsed.as_str().trim_end_matches('/').to_string();
        info!(
            engine_url = %base_url,
            api_key = api_key.is_some(),
            "engine client initialized"
        );

        Ok(Self {
            inner: Arc::new(Inner {
                client,
                base: parsed,
                base_url,
                api_key,
            }),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.inner.base_url
    }

    /// Base URL with `segments` appended as percent-encoded path segments,
    /// so `/`, `?` or `#` inside a name never leave its segment.
    pub fn endpoint(&self, segments: &[&str]) -> EngineResult<Url> {
        if let Some(bad) = segments
            .iter()
            .find(|s| s.is_empty() || matches!(**s, "." | ".."))
        {
            return Err(EngineError::InvalidPath(format!("{bad:?}")));
        }
        let mut url = self.inner.base.clone();
        url.path_segments_mut()
            .map_err(|()| EngineError::InvalidUrl(self.inner.base_url.clone()))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Build a request for `segments`, authenticated when an API key is
    /// configured.
    pub fn request(
        &self,
        method: reqwest::Method,
        segments: &[&str],
    ) -> EngineResult<reqwest::RequestBuilder> {
        let url = self.endpoint(segments)?;
        let req = self.inner.client.request(method, url);
        Ok(match &self.inner.api_key {
            Some(key) => req.bearer_auth(key),
            None => req,
        })
    }
}
