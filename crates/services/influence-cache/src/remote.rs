use async_trait::async_trait;
use influence_types::RemoteError;
use reqwest::Client;
use std::fmt;
use std::time::Duration;

/// A fully-formed request for one remote document.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RemoteRequest {
    /// Path below the service root, starting with `/`.
    pub path: String,
    pub params: Vec<(String, String)>,
}

impl RemoteRequest {
    pub fn new(path: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            params: Vec::new(),
        }
    }

    pub fn param(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.params.push((name.into(), value.into()));
        self
    }

    /// Look up a query parameter by name.
    pub fn get_param(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }
}

impl fmt::Display for RemoteRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.path)?;
        // the credential is never logged
        let mut first = true;
        for (name, value) in &self.params {
            if name == crate::API_KEY_PARAM {
                continue;
            }
            write!(f, "{}{}={}", if first { '?' } else { '&' }, name, value)?;
            first = false;
        }
        Ok(())
    }
}

/// Performs one round trip to the scoring service.
#[async_trait]
pub trait RemoteSource: Send + Sync {
    /// Fetch the JSON document addressed by `request`.
    async fn fetch(&self, request: &RemoteRequest) -> Result<serde_json::Value, RemoteError>;
}

/// `RemoteSource` backed by plain HTTP GET requests.
pub struct HttpRemoteSource {
    client: Client,
    base_url: String,
}

impl HttpRemoteSource {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self, RemoteError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| RemoteError::Transport(format!("failed to create HTTP client: {}", e)))?;
        Ok(Self::with_client(client, base_url))
    }

    pub fn with_client(client: Client, base_url: impl Into<String>) -> Self {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Self { client, base_url }
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl RemoteSource for HttpRemoteSource {
    async fn fetch(&self, request: &RemoteRequest) -> Result<serde_json::Value, RemoteError> {
        let url = format!("{}{}", self.base_url, request.path);
        tracing::debug!("GET {}{}", self.base_url, request);

        let resp = self
            .client
            .get(&url)
            .query(&request.params)
            .send()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            let body = resp
                .text()
                .await
                .unwrap_or_else(|_| "<failed to read response>".to_string());
            return Err(RemoteError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| RemoteError::Transport(e.to_string()))?;
        serde_json::from_slice(&body).map_err(|e| RemoteError::Malformed(e.to_string()))
    }
}
