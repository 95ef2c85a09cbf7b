//! Blocking HTTP client for the Vault administrative API.

use reqwest::blocking::Client;
use reqwest::header::CONTENT_TYPE;
use reqwest::Certificate;
use serde_json::Value;
use tracing::debug;
use zeroize::Zeroizing;

use super::{Body, Method, ResourceClient};
use crate::core::config::ClientConfig;
use crate::core::constants::TOKEN_HEADER;
use crate::error::{ClientError, ConfigError, Result};

const USER_AGENT: &str = concat!("vaultconf/", env!("CARGO_PKG_VERSION"));
const JSON: &str = "application/json";
const MERGE_PATCH: &str = "application/merge-patch+json";

/// [`ResourceClient`] speaking HTTP(S) to a Vault server.
pub struct HttpClient {
    client: Client,
    base_url: String,
    token: Zeroizing<String>,
}

impl std::fmt::Debug for HttpClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HttpClient")
            .field("base_url", &self.base_url)
            .finish()
    }
}

impl HttpClient {
    /// Build a client from an explicit connection configuration.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::ReadFile` if the CA bundle cannot be read,
    /// `ClientError::InvalidCa` if it is not PEM, or `ClientError::Build`
    /// if the TLS backend cannot be initialised.
    pub fn new(config: &ClientConfig) -> Result<Self> {
        let mut builder = Client::builder().user_agent(USER_AGENT);

        if let Some(ca_path) = &config.ca_path {
            let pem = std::fs::read(ca_path).map_err(|source| ConfigError::ReadFile {
                path: ca_path.display().to_string(),
                source,
            })?;
            let ca = Certificate::from_pem(&pem)
                .map_err(|e| ClientError::InvalidCa(e.to_string()))?;
            builder = builder.add_root_certificate(ca);
        }
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(timeout);
        }

        let client = builder
            .build()
            .map_err(|e| ClientError::Build(e.to_string()))?;

        debug!(url = %config.base_url(), "http client ready");

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            token: config.token.clone(),
        })
    }
}

impl ResourceClient for HttpClient {
    fn request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
        expected: &[u16],
    ) -> Result<Body> {
        debug!(method = %method, path, "vault request");

        let transport = |reason: String| ClientError::Transport {
            method,
            path: path.to_string(),
            reason,
        };

        let verb = reqwest::Method::from_bytes(method.as_str().as_bytes())
            .map_err(|e| transport(e.to_string()))?;
        let mut request = self
            .client
            .request(verb, format!("{}{}", self.base_url, path))
            .header(TOKEN_HEADER, self.token.as_str());

        if let Some(body) = body {
            let content_type = if method == Method::Patch { MERGE_PATCH } else { JSON };
            request = request
                .header(CONTENT_TYPE, content_type)
                .body(body.to_string());
        }

        let response = request.send().map_err(|e| transport(e.to_string()))?;
        let status = response.status().as_u16();
        let is_json = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|v| v.to_str().ok())
            .is_some_and(|v| v.starts_with(JSON));
        let text = response.text().map_err(|e| transport(e.to_string()))?;

        debug!(method = %method, path, status, "vault response");

        if !expected.contains(&status) {
            return Err(ClientError::UnexpectedStatus {
                method,
                path: path.to_string(),
                status,
                expected: expected.to_vec(),
                request: body.cloned(),
                response: text,
            }
            .into());
        }

        decode(path, status, is_json, text)
    }
}

/// Decode a response body according to its status and content type.
fn decode(path: &str, status: u16, is_json: bool, text: String) -> Result<Body> {
    if status == 204 || text.is_empty() {
        return Ok(Body::Empty);
    }
    if is_json {
        let value = serde_json::from_str(&text).map_err(|e| ClientError::MalformedResponse {
            path: path.to_string(),
            reason: e.to_string(),
        })?;
        return Ok(Body::Json(value));
    }
    Ok(Body::Raw(text))
}
