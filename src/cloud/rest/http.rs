//! HTTP layer: auth header, status mapping, error-body parsing.
//!
//! This is the ONLY place for status code handling. The API modules in
//! `rest` never interpret status codes; they build URLs and bodies and get
//! typed results or crate errors back.

use std::time::Duration;

use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, USER_AGENT};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use crate::cloud::SecretString;
use crate::{Error, Result};

const USER_AGENT_VALUE: &str = concat!("keybridge/", env!("CARGO_PKG_VERSION"));

/// Error body shape shared by the management plane and the vault data plane:
/// `{"error": {"code": "...", "message": "..."}}`
#[derive(Debug, Deserialize)]
struct ErrorBody {
    #[serde(default)]
    error: Option<ErrorDetail>,
}

#[derive(Debug, Deserialize)]
struct ErrorDetail {
    #[serde(default)]
    code: String,
    #[serde(default)]
    message: String,
}

/// Error codes the control plane uses when a model/version is not offered in
/// the selected region.
const MODEL_UNAVAILABLE_CODES: &[&str] = &["ModelNotAvailable", "DeploymentModelNotSupported"];

/// HTTP backend shared by the directory, control-plane, and vault clients.
#[derive(Debug, Clone)]
pub(crate) struct HttpBackend {
    client: reqwest::Client,
}

impl HttpBackend {
    /// Build a backend authenticating every request with the given bearer token.
    pub(crate) fn new(token: &SecretString, timeout: Duration) -> Result<Self> {
        let mut headers = HeaderMap::new();
        headers.insert(USER_AGENT, HeaderValue::from_static(USER_AGENT_VALUE));
        let mut auth = HeaderValue::from_str(&format!("Bearer {}", token.expose()))
            .map_err(|_| Error::validation("access token contains invalid header characters"))?;
        auth.set_sensitive(true);
        headers.insert(AUTHORIZATION, auth);

        let client = reqwest::Client::builder()
            .timeout(timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::api(format!("failed to create HTTP client: {}", e)))?;

        Ok(Self { client })
    }

    /// GET returning the JSON body, or `None` on 404.
    pub(crate) async fn get_optional(&self, url: &str) -> Result<Option<Value>> {
        debug!(url = %url, "GET");
        let response = self.send(Method::GET, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        let response = Self::check_status(response).await?;
        Ok(Some(Self::read_json(response).await?))
    }

    /// GET returning the JSON body; 404 is an error.
    pub(crate) async fn get(&self, url: &str) -> Result<Value> {
        self.get_optional(url)
            .await?
            .ok_or_else(|| Error::api(format!("resource not found: {}", url)))
    }

    /// PUT with a JSON body, returning the response body.
    pub(crate) async fn put(&self, url: &str, body: &Value) -> Result<Value> {
        debug!(url = %url, "PUT");
        let response = self.send(Method::PUT, url, Some(body)).await?;
        let response = Self::check_status(response).await?;
        Self::read_json(response).await
    }

    /// POST with an optional JSON body, returning the response body.
    pub(crate) async fn post(&self, url: &str, body: Option<&Value>) -> Result<Value> {
        debug!(url = %url, "POST");
        let response = self.send(Method::POST, url, body).await?;
        let response = Self::check_status(response).await?;
        Self::read_json(response).await
    }

    /// POST where the response body is irrelevant (purge, empty 200/202).
    pub(crate) async fn post_unit(&self, url: &str, body: Option<&Value>) -> Result<()> {
        debug!(url = %url, "POST");
        let response = self.send(Method::POST, url, body).await?;
        Self::check_status(response).await?;
        Ok(())
    }

    /// DELETE; 404 counts as success (already gone).
    pub(crate) async fn delete(&self, url: &str) -> Result<()> {
        debug!(url = %url, "DELETE");
        let response = self.send(Method::DELETE, url, None).await?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(());
        }
        Self::check_status(response).await?;
        Ok(())
    }

    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Response> {
        let mut request = self.client.request(method, url);
        if let Some(body) = body {
            request = request.json(body);
        }
        request
            .send()
            .await
            .map_err(|e| Error::api(format!("request failed: {}", e)))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value> {
        response
            .json()
            .await
            .map_err(|e| Error::api(format!("failed to read response body: {}", e)))
    }

    /// Map non-success statuses onto the error taxonomy.
    ///
    /// 403 becomes `InsufficientPermissions` with the upstream message kept
    /// verbatim; model-availability error codes become `ModelUnavailable`;
    /// everything else becomes `Api`. Secret values never pass through here,
    /// so echoing bodies into errors is safe.
    async fn check_status(response: reqwest::Response) -> Result<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let detail = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(|b| b.error);

        let (code, message) = match detail {
            Some(d) if !d.message.is_empty() => (d.code, d.message),
            Some(d) => (d.code, body),
            None => (String::new(), body),
        };

        if status == StatusCode::FORBIDDEN {
            return Err(Error::insufficient_permissions(message));
        }
        if MODEL_UNAVAILABLE_CODES.contains(&code.as_str()) {
            return Err(Error::model_unavailable(message));
        }
        if code.is_empty() {
            Err(Error::api(format!("HTTP {}: {}", status.as_u16(), message)))
        } else {
            Err(Error::api(format!(
                "HTTP {} ({}): {}",
                status.as_u16(),
                code,
                message
            )))
        }
    }
}
