//! Imgur image host.

use async_trait::async_trait;
use memoreal_core::{ApiKey, MediaConfig};
use reqwest::multipart::{Form, Part};
use serde_json::Value;

use super::{MediaError, http_client};

/// Remote image host.
#[async_trait]
pub trait ImageHost: Send + Sync {
    /// Upload image bytes and return the hosted image's public link.
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, MediaError>;

    /// Fetch an image's metadata envelope by id.
    async fn retrieve(&self, image_id: &str) -> Result<Value, MediaError>;
}

/// Imgur API client authenticated with an application client id.
pub struct ImgurClient {
    client: reqwest::Client,
    client_id: Option<ApiKey>,
    base_url: String,
}

impl ImgurClient {
    /// Create a client from media configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &MediaConfig) -> Result<Self, MediaError> {
        Ok(Self {
            client: http_client(config.http_timeout())?,
            client_id: config
                .imgur_client_id
                .clone()
                .filter(|id| !id.is_empty())
                .map(ApiKey::new),
            base_url: config.imgur_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> Result<String, MediaError> {
        self.client_id
            .as_ref()
            .map(|id| format!("Client-ID {}", id.expose()))
            .ok_or(MediaError::NotConfigured("Imgur client id"))
    }

    /// Read an Imgur `{success, data}` envelope, failing on either an error
    /// status or `success: false`.
    async fn read_envelope(response: reqwest::Response) -> Result<Value, MediaError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api { status, message });
        }
        let envelope: Value = response.json().await?;
        if envelope.get("success").and_then(Value::as_bool) != Some(true) {
            return Err(MediaError::Rejected(envelope["data"].to_string()));
        }
        Ok(envelope)
    }
}

impl std::fmt::Debug for ImgurClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ImgurClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.client_id.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl ImageHost for ImgurClient {
    async fn upload(&self, file_name: &str, bytes: Vec<u8>) -> Result<String, MediaError> {
        let auth = self.auth_header()?;
        let form = Form::new().part("image", Part::bytes(bytes).file_name(file_name.to_string()));

        let response = self
            .client
            .post(format!("{}/image", self.base_url))
            .header("Authorization", auth)
            .multipart(form)
            .send()
            .await?;

        let envelope = Self::read_envelope(response).await?;
        envelope["data"]
            .get("link")
            .and_then(Value::as_str)
            .map(ToString::to_string)
            .ok_or_else(|| MediaError::Rejected("Response carried no image link".to_string()))
    }

    async fn retrieve(&self, image_id: &str) -> Result<Value, MediaError> {
        let auth = self.auth_header()?;
        let response = self
            .client
            .get(format!("{}/image/{image_id}", self.base_url))
            .header("Authorization", auth)
            .send()
            .await?;

        Self::read_envelope(response).await
    }
}
