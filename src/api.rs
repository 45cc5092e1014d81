//! API client for Z.ai / ZHIPU monitoring endpoints

use reqwest::header::{ACCEPT_LANGUAGE, AUTHORIZATION, CONTENT_TYPE};
use reqwest::Client;
use serde_json::{Map, Value};
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::cache::ResponseCache;
use crate::error::{QuotaError, QuotaResult};

/// Upper bound for a single upstream request
pub const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

/// HTTP client for the GLM monitor API, backed by the shared response cache
pub struct GlmApiClient {
    client: Client,
    cache: Arc<ResponseCache>,
    debounce: Duration,
}

impl GlmApiClient {
    /// Create a new API client
    pub fn new(cache: Arc<ResponseCache>, debounce: Duration) -> QuotaResult<Self> {
        Self::with_timeout(cache, debounce, REQUEST_TIMEOUT)
    }

    /// Create a client whose requests give up after `timeout`
    pub fn with_timeout(
        cache: Arc<ResponseCache>,
        debounce: Duration,
        timeout: Duration,
    ) -> QuotaResult<Self> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            client,
            cache,
            debounce,
        })
    }

    #[cfg(test)]
    pub fn cache(&self) -> &Arc<ResponseCache> {
        &self.cache
    }

    /// Query an endpoint, serving from cache while the debounce window is open
    pub async fn query(
        &self,
        cancel: &CancellationToken,
        endpoint: &str,
        auth_token: &str,
        query_params: &str,
    ) -> QuotaResult<Value> {
        let url = format!("{}{}", endpoint, query_params);

        if let Some(cached) = self.cache.get(&url) {
            info!(url = %url, "Returning cached z.ai data");
            return Ok(cached);
        }
        debug!(url = %url, "Cache miss, querying z.ai");

        let request = self
            .client
            .get(&url)
            .header(AUTHORIZATION, auth_token)
            .header(ACCEPT_LANGUAGE, "en-US,en")
            .header(CONTENT_TYPE, "application/json");

        let response = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(QuotaError::Cancelled),
            result = request.send() => result?,
        };

        let status = response.status();
        let body = tokio::select! {
            biased;
            _ = cancel.cancelled() => return Err(QuotaError::Cancelled),
            result = response.text() => result?,
        };

        if !status.is_success() {
            return Err(QuotaError::UpstreamStatus {
                status: status.as_u16(),
                body,
            });
        }

        let payload = unwrap_payload(&body)?;

        self.cache.put(url.as_str(), payload.clone(), self.debounce);
        info!(
            url = %url,
            ttl_secs = self.debounce.as_secs(),
            entries = self.cache.len(),
            "Cached z.ai data for {} minute(s)",
            self.debounce.as_secs() / 60
        );

        Ok(payload)
    }
}

/// Decode a JSON object body, unwrapping one level of `data` when it holds an object
fn unwrap_payload(body: &str) -> QuotaResult<Value> {
    let mut envelope: Map<String, Value> =
        serde_json::from_str(body).map_err(|e| QuotaError::Decode(e.to_string()))?;

    match envelope.remove("data") {
        Some(Value::Object(data)) => Ok(Value::Object(data)),
        Some(other) => {
            envelope.insert("data".to_string(), other);
            Ok(Value::Object(envelope))
        }
        None => Ok(Value::Object(envelope)),
    }
}
