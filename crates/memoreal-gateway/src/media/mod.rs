//! Media storage and third-party media proxies.
//!
//! Uploaded images land in a local directory; the image host and the talking
//! video generator are reached over HTTP behind the [`ImageHost`] and
//! [`VideoGenerator`] traits.

mod did;
mod imgur;
mod uploads;

pub use did::{DidClient, VideoGenerator, VideoRequest};
pub use imgur::{ImageHost, ImgurClient};
pub use uploads::{StoredUpload, UploadDir};

use thiserror::Error;

/// Media errors.
#[derive(Debug, Error)]
pub enum MediaError {
    /// Client sent an unusable request.
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// Credentials for the upstream service are not configured.
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    /// Upstream returned an error status.
    #[error("API error: {status} - {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Error message.
        message: String,
    },

    /// Upstream answered but reported failure.
    #[error("Upstream rejected request: {0}")]
    Rejected(String),

    /// Network error.
    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// Local file error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Build the HTTP client shared by media proxies.
///
/// # Errors
///
/// Returns error if the TLS backend fails to initialize.
pub fn http_client(timeout: std::time::Duration) -> Result<reqwest::Client, MediaError> {
    Ok(reqwest::Client::builder().timeout(timeout).build()?)
}
