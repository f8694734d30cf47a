//! Blocking `HttpExecutor` backed by `ureq`.

use std::time::Duration;

use ureq::Agent;

use crate::error::ApiError;
use crate::http::{HttpExecutor, HttpMethod, HttpRequest, HttpResponse};

/// Executes requests with a shared `ureq::Agent`.
///
/// Status-code-as-error is disabled so 4xx/5xx responses come back as data
/// and the core decides what counts as a failure.
#[derive(Clone)]
pub struct UreqExecutor {
    agent: Agent,
}

impl UreqExecutor {
    pub fn new(timeout: Duration) -> Self {
        let agent = Agent::config_builder()
            .http_status_as_error(false)
            .timeout_global(Some(timeout))
            .build()
            .new_agent();
        Self { agent }
    }
}

impl Default for UreqExecutor {
    fn default() -> Self {
        Self::new(Duration::from_secs(30))
    }
}

impl HttpExecutor for UreqExecutor {
    fn execute(&self, request: HttpRequest) -> Result<HttpResponse, ApiError> {
        let url = request.url.as_str();
        let result = match (request.method, request.body.as_deref()) {
            (HttpMethod::Get, _) => decorate(self.agent.get(url), &request).call(),
            (HttpMethod::Delete, _) => decorate(self.agent.delete(url), &request).call(),
            (HttpMethod::Post, Some(body)) => {
                decorate(self.agent.post(url), &request).send(body.as_bytes())
            }
            (HttpMethod::Post, None) => decorate(self.agent.post(url), &request).send_empty(),
            (HttpMethod::Put, Some(body)) => {
                decorate(self.agent.put(url), &request).send(body.as_bytes())
            }
            (HttpMethod::Put, None) => decorate(self.agent.put(url), &request).send_empty(),
        };
        let mut response = result.map_err(|e| ApiError::network(e.to_string()))?;

        let status = response.status().as_u16();
        let headers = response
            .headers()
            .iter()
            .map(|(k, v)| (k.as_str().to_string(), v.to_str().unwrap_or_default().to_string()))
            .collect();
        let body = response
            .body_mut()
            .read_to_string()
            .map_err(|e| ApiError::network(e.to_string()))?;

        Ok(HttpResponse {
            status,
            headers,
            body,
        })
    }
}

fn decorate<B>(mut builder: ureq::RequestBuilder<B>, request: &HttpRequest) -> ureq::RequestBuilder<B> {
    for (key, value) in &request.headers {
        builder = builder.header(key.as_str(), value.as_str());
    }
    for (key, value) in &request.query {
        builder = builder.query(key, value);
    }
    builder
}
