use std::time::Duration;

use reqwest::{
    header::{HeaderMap, HeaderValue, ACCEPT, AUTHORIZATION, CONTENT_TYPE},
    Client, Method,
};
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, error};

use shared_config::AppConfig;

use crate::error::BackendError;

/// JSON-over-HTTP client for the clinic backend. The backend is the authority
/// for every write; this client never retries.
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    api_key: Option<String>,
}

impl BackendClient {
    pub fn new(config: &AppConfig) -> Result<Self, BackendError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.backend_timeout_secs))
            .build()
            .map_err(BackendError::ClientBuild)?;

        Ok(Self {
            client,
            base_url: config.backend_api_url.trim_end_matches('/').to_string(),
            api_key: config.backend_api_key.clone(),
        })
    }

    fn get_headers(&self, auth_token: Option<&str>) -> Result<HeaderMap, BackendError> {
        let mut headers = HeaderMap::new();

        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        headers.insert(ACCEPT, HeaderValue::from_static("application/json"));

        if let Some(key) = &self.api_key {
            let value = HeaderValue::from_str(key)
                .map_err(|_| BackendError::InvalidHeader("api key".to_string()))?;
            headers.insert("x-api-key", value);
        }

        if let Some(token) = auth_token {
            let value = HeaderValue::from_str(&format!("Bearer {}", token))
                .map_err(|_| BackendError::InvalidHeader("authorization".to_string()))?;
            headers.insert(AUTHORIZATION, value);
        }

        Ok(headers)
    }

    async fn send(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<String, BackendError> {
        let url = format!("{}{}", self.base_url, path);
        debug!("Making {} request to {}", method, url);

        let mut req = self
            .client
            .request(method, &url)
            .headers(self.get_headers(auth_token)?);

        if let Some(body_data) = body {
            req = req.json(&body_data);
        }

        let response = req.send().await?;

        let status = response.status();
        let text = response.text().await?;

        if !status.is_success() {
            error!("API error ({}): {}", status, text);

            return Err(match status.as_u16() {
                401 | 403 => BackendError::Unauthorized(text),
                404 => BackendError::NotFound(text),
                code => BackendError::Status { status: code, message: text },
            });
        }

        Ok(text)
    }

    pub async fn request<T>(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<T, BackendError>
    where
        T: DeserializeOwned,
    {
        let text = self.send(method, path, auth_token, body).await?;
        Ok(serde_json::from_str(&text)?)
    }

    /// For endpoints that answer with an empty body (deletes, revokes).
    pub async fn execute(
        &self,
        method: Method,
        path: &str,
        auth_token: Option<&str>,
        body: Option<Value>,
    ) -> Result<(), BackendError> {
        self.send(method, path, auth_token, body).await.map(|_| ())
    }

    pub fn get_base_url(&self) -> &str {
        &self.base_url
    }
}
