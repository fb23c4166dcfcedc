//! D-ID talking video generator.

use async_trait::async_trait;
use memoreal_core::{ApiKey, MediaConfig};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{MediaError, http_client};

/// A request to animate a portrait reading a script.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VideoRequest {
    /// Script text.
    pub prompt: String,
    /// Text-to-speech voice id.
    pub voice_id: String,
    /// Portrait image URL.
    pub source_url: String,
}

/// Remote talking-video generator.
#[async_trait]
pub trait VideoGenerator: Send + Sync {
    /// Start generating a video; returns the provider's job description.
    async fn generate(&self, request: &VideoRequest) -> Result<Value, MediaError>;

    /// Fetch a video job by id.
    async fn retrieve(&self, video_id: &str) -> Result<Value, MediaError>;
}

#[derive(Debug, Serialize)]
struct TalkRequest<'a> {
    script: Script<'a>,
    source_url: &'a str,
}

#[derive(Debug, Serialize)]
struct Script<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    input: &'a str,
    provider: VoiceProvider<'a>,
}

#[derive(Debug, Serialize)]
struct VoiceProvider<'a> {
    #[serde(rename = "type")]
    kind: &'static str,
    voice_id: &'a str,
}

impl<'a> From<&'a VideoRequest> for TalkRequest<'a> {
    fn from(request: &'a VideoRequest) -> Self {
        Self {
            script: Script {
                kind: "text",
                input: &request.prompt,
                provider: VoiceProvider {
                    kind: "microsoft",
                    voice_id: &request.voice_id,
                },
            },
            source_url: &request.source_url,
        }
    }
}

/// D-ID API client.
pub struct DidClient {
    client: reqwest::Client,
    api_key: Option<ApiKey>,
    base_url: String,
}

impl DidClient {
    /// Create a client from media configuration.
    ///
    /// # Errors
    ///
    /// Returns error if the HTTP client cannot be built.
    pub fn from_config(config: &MediaConfig) -> Result<Self, MediaError> {
        Ok(Self {
            client: http_client(config.http_timeout())?,
            api_key: config
                .did_api_key
                .clone()
                .filter(|key| !key.is_empty())
                .map(ApiKey::new),
            base_url: config.did_base_url.trim_end_matches('/').to_string(),
        })
    }

    fn auth_header(&self) -> Result<String, MediaError> {
        self.api_key
            .as_ref()
            .map(|key| format!("Basic {}", key.expose()))
            .ok_or(MediaError::NotConfigured("D-ID API key"))
    }

    async fn read_json(response: reqwest::Response) -> Result<Value, MediaError> {
        if !response.status().is_success() {
            let status = response.status().as_u16();
            let message = response.text().await.unwrap_or_default();
            return Err(MediaError::Api { status, message });
        }
        Ok(response.json().await?)
    }
}

impl std::fmt::Debug for DidClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DidClient")
            .field("base_url", &self.base_url)
            .field("configured", &self.api_key.is_some())
            .finish_non_exhaustive()
    }
}

#[async_trait]
impl VideoGenerator for DidClient {
    async fn generate(&self, request: &VideoRequest) -> Result<Value, MediaError> {
        let auth = self.auth_header()?;
        let response = self
            .client
            .post(format!("{}/talks", self.base_url))
            .header("Authorization", auth)
            .json(&TalkRequest::from(request))
            .send()
            .await?;

        Self::read_json(response).await
    }

    async fn retrieve(&self, video_id: &str) -> Result<Value, MediaError> {
        let auth = self.auth_header()?;
        let response = self
            .client
            .get(format!("{}/talks/{video_id}", self.base_url))
            .header("Authorization", auth)
            .send()
            .await?;

        Self::read_json(response).await
    }
}

#[cfg(test)]
mod tests {
    use axum::{
        Json, Router,
        extract::Path,
        http::{HeaderMap, StatusCode},
        routing::{get, post},
    };
    use serde_json::json;

    use super::*;

    async fn spawn_mock() -> String {
        async fn talks(headers: HeaderMap, Json(body): Json<Value>) -> (StatusCode, Json<Value>) {
            let authorized = headers
                .get("authorization")
                .and_then(|v| v.to_str().ok())
                == Some("Basic test-key");
            if !authorized {
                return (StatusCode::UNAUTHORIZED, Json(json!({"kind": "Unauthorized"})));
            }
            (
                StatusCode::CREATED,
                Json(json!({"id": "tlk_1", "status": "created", "echo": body})),
            )
        }

        async fn talk(Path(id): Path<String>) -> Json<Value> {
            Json(json!({"id": id, "status": "done"}))
        }

        let app = Router::new()
            .route("/talks", post(talks))
            .route("/talks/{id}", get(talk));
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move { axum::serve(listener, app).await.unwrap() });
        format!("http://{addr}")
    }

    fn client(base_url: String, key: Option<&str>) -> DidClient {
        let config = MediaConfig {
            did_api_key: key.map(ToString::to_string),
            did_base_url: base_url,
            ..MediaConfig::default()
        };
        DidClient::from_config(&config).unwrap()
    }

    fn request() -> VideoRequest {
        VideoRequest {
            prompt: "Hello from grandma".to_string(),
            voice_id: "en-US-JennyNeural".to_string(),
            source_url: "https://example.com/portrait.png".to_string(),
        }
    }

    #[tokio::test]
    async fn test_generate_sends_script() {
        let did = client(spawn_mock().await, Some("test-key"));
        let job = did.generate(&request()).await.unwrap();

        assert_eq!(job["id"], "tlk_1");
        let echo = &job["echo"];
        assert_eq!(echo["source_url"], "https://example.com/portrait.png");
        assert_eq!(echo["script"]["type"], "text");
        assert_eq!(echo["script"]["input"], "Hello from grandma");
        assert_eq!(echo["script"]["provider"]["type"], "microsoft");
        assert_eq!(echo["script"]["provider"]["voice_id"], "en-US-JennyNeural");
    }

    #[tokio::test]
    async fn test_generate_unauthorized() {
        let did = client(spawn_mock().await, Some("wrong"));
        assert!(matches!(
            did.generate(&request()).await,
            Err(MediaError::Api { status: 401, .. })
        ));
    }

    #[tokio::test]
    async fn test_retrieve() {
        let did = client(spawn_mock().await, Some("test-key"));
        let job = did.retrieve("tlk_1").await.unwrap();
        assert_eq!(job["status"], "done");
    }

    #[tokio::test]
    async fn test_not_configured() {
        let did = client("http://127.0.0.1:1".to_string(), None);
        assert!(matches!(
            did.generate(&request()).await,
            Err(MediaError::NotConfigured(_))
        ));
    }
}
