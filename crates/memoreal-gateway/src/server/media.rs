//! Media routes: local uploads and proxies to the image host and video API.

use axum::{
    Json,
    extract::{Multipart, State, multipart::MultipartRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use memoreal_core::{scrub_secrets, secrets::COMMON_SECRET_PATTERNS};
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::GatewayState;
use super::extract::{ApiJson, ApiPath};
use crate::auth::{ErrorBody, INTERNAL_ERROR_MESSAGE, RequireAuth};
use crate::media::{MediaError, VideoRequest};

/// A media error tagged with the message shown to the client.
#[derive(Debug)]
pub(super) struct MediaFailure {
    message: &'static str,
    error: MediaError,
}

impl MediaFailure {
    const fn new(message: &'static str, error: MediaError) -> Self {
        Self { message, error }
    }

    fn bad_request(message: &'static str) -> Self {
        Self::new(message, MediaError::BadRequest(message.to_string()))
    }
}

impl IntoResponse for MediaFailure {
    fn into_response(self) -> Response {
        let (status, message) = match &self.error {
            MediaError::BadRequest(reason) => {
                tracing::debug!("Rejected media request: {reason}");
                (StatusCode::BAD_REQUEST, reason.clone())
            }
            MediaError::NotConfigured(what) => {
                tracing::error!("Media route called but {what} is not configured");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    INTERNAL_ERROR_MESSAGE.to_string(),
                )
            }
            other => {
                let detail = scrub_secrets(&other.to_string(), COMMON_SECRET_PATTERNS);
                tracing::error!("{}: {detail}", self.message);
                (StatusCode::INTERNAL_SERVER_ERROR, self.message.to_string())
            }
        };

        (status, Json(ErrorBody::new(message))).into_response()
    }
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub(super) struct ImageUrlResponse {
    success: bool,
    image_url: String,
}

#[derive(Debug, Serialize)]
pub(super) struct DataResponse {
    success: bool,
    data: Value,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct ImagePathRequest {
    image_path: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub(super) struct GenerateVideoRequest {
    prompt: Option<String>,
    voice_id: Option<String>,
    source_url: Option<String>,
}

/// Provider-assigned ids are interpolated into upstream URLs.
fn valid_remote_id(id: &str) -> bool {
    !id.is_empty()
        && id.len() <= 128
        && id
            .chars()
            .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
}

fn present(value: Option<String>) -> Option<String> {
    value.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

/// Public: clients upload the profile picture before the account exists.
pub(super) async fn upload_image(
    State(state): State<GatewayState>,
    multipart: Result<Multipart, MultipartRejection>,
) -> Result<Json<ImageUrlResponse>, MediaFailure> {
    const FAILED: &str = "Failed to upload image";

    let mut multipart = multipart.map_err(|_| MediaFailure::bad_request(FAILED))?;
    while let Some(field) = multipart
        .next_field()
        .await
        .map_err(|_| MediaFailure::bad_request(FAILED))?
    {
        if field.name() != Some("image") {
            continue;
        }
        let file_name = field.file_name().map(ToString::to_string);
        let bytes = field
            .bytes()
            .await
            .map_err(|_| MediaFailure::bad_request(FAILED))?;
        if bytes.is_empty() {
            return Err(MediaFailure::bad_request(FAILED));
        }

        let stored = state
            .uploads
            .save(file_name.as_deref(), &bytes)
            .await
            .map_err(|e| MediaFailure::new(FAILED, e))?;
        tracing::info!(file = %stored.file_name, "Image uploaded");

        return Ok(Json(ImageUrlResponse {
            success: true,
            image_url: stored.url,
        }));
    }

    Err(MediaFailure::bad_request(FAILED))
}

pub(super) async fn upload_to_image_host(
    _auth: RequireAuth,
    State(state): State<GatewayState>,
    ApiJson(request): ApiJson<ImagePathRequest>,
) -> Result<Json<ImageUrlResponse>, MediaFailure> {
    const FAILED: &str = "Error uploading image to Imgur";

    let reference =
        present(request.image_path).ok_or_else(|| MediaFailure::bad_request("Invalid image path"))?;
    let path = state
        .uploads
        .resolve(&reference)
        .await
        .map_err(|e| MediaFailure::new(FAILED, e))?;
    let bytes = tokio::fs::read(&path)
        .await
        .map_err(|e| MediaFailure::new(FAILED, e.into()))?;
    let file_name = path
        .file_name()
        .and_then(|name| name.to_str())
        .unwrap_or("image")
        .to_string();

    let link = state
        .images
        .upload(&file_name, bytes)
        .await
        .map_err(|e| MediaFailure::new(FAILED, e))?;
    tracing::info!(%link, "Image uploaded to image host");

    Ok(Json(ImageUrlResponse {
        success: true,
        image_url: link,
    }))
}

pub(super) async fn retrieve_image(
    _auth: RequireAuth,
    State(state): State<GatewayState>,
    ApiPath(image_id): ApiPath<String>,
) -> Result<Json<DataResponse>, MediaFailure> {
    if !valid_remote_id(&image_id) {
        return Err(MediaFailure::bad_request("Missing image ID"));
    }

    let data = state
        .images
        .retrieve(&image_id)
        .await
        .map_err(|e| MediaFailure::new("Error retrieving image from Imgur", e))?;
    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}

pub(super) async fn generate_video(
    _auth: RequireAuth,
    State(state): State<GatewayState>,
    ApiJson(request): ApiJson<GenerateVideoRequest>,
) -> Result<Json<DataResponse>, MediaFailure> {
    let (Some(prompt), Some(voice_id), Some(source_url)) = (
        present(request.prompt),
        present(request.voice_id),
        present(request.source_url),
    ) else {
        return Err(MediaFailure::bad_request("Missing parameters"));
    };

    let data = state
        .videos
        .generate(&VideoRequest {
            prompt,
            voice_id,
            source_url,
        })
        .await
        .map_err(|e| MediaFailure::new("Error generating video", e))?;
    tracing::info!("Video generation requested");

    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}

pub(super) async fn retrieve_video(
    _auth: RequireAuth,
    State(state): State<GatewayState>,
    ApiPath(video_id): ApiPath<String>,
) -> Result<Json<DataResponse>, MediaFailure> {
    if !valid_remote_id(&video_id) {
        return Err(MediaFailure::bad_request("Missing video ID"));
    }

    let data = state
        .videos
        .retrieve(&video_id)
        .await
        .map_err(|e| MediaFailure::new("Error retrieving video", e))?;
    Ok(Json(DataResponse {
        success: true,
        data,
    }))
}
