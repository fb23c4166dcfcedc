//! Local upload directory.

use std::path::{Path, PathBuf};

use chrono::Utc;
use memoreal_core::validation::validate_path;
use tokio::io::AsyncWriteExt;

use super::MediaError;

/// Longest extension kept from a client-supplied file name.
const MAX_EXTENSION_LEN: usize = 8;

/// A file saved to the upload directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredUpload {
    /// Generated file name.
    pub file_name: String,
    /// Public URL of the file.
    pub url: String,
}

/// Directory holding uploaded images, served under `/uploads`.
#[derive(Debug, Clone)]
pub struct UploadDir {
    root: PathBuf,
    public_url: String,
}

impl UploadDir {
    /// Create the directory if needed.
    ///
    /// # Errors
    ///
    /// Returns error if the directory cannot be created.
    pub fn open(root: impl Into<PathBuf>, public_url: impl Into<String>) -> Result<Self, MediaError> {
        let root = root.into();
        std::fs::create_dir_all(&root)?;
        Ok(Self {
            root,
            public_url: public_url.into().trim_end_matches('/').to_string(),
        })
    }

    /// Directory path.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Public URL for a stored file name.
    #[must_use]
    pub fn url_for(&self, file_name: &str) -> String {
        format!("{}/uploads/{file_name}", self.public_url)
    }

    /// Save bytes under a timestamped name, keeping the original extension.
    ///
    /// # Errors
    ///
    /// Returns error if the file cannot be written.
    pub async fn save(
        &self,
        original_name: Option<&str>,
        bytes: &[u8],
    ) -> Result<StoredUpload, MediaError> {
        let ext = original_name.map(extension).unwrap_or_default();
        let stamp = Utc::now().timestamp_millis();

        let mut attempt = 0u32;
        loop {
            let file_name = if attempt == 0 {
                format!("{stamp}{ext}")
            } else {
                format!("{stamp}-{attempt}{ext}")
            };
            let path = self.root.join(&file_name);

            match tokio::fs::OpenOptions::new()
                .write(true)
                .create_new(true)
                .open(&path)
                .await
            {
                Ok(mut file) => {
                    file.write_all(bytes).await?;
                    file.flush().await?;
                    tracing::debug!(file = %file_name, size = bytes.len(), "Saved upload");
                    return Ok(StoredUpload {
                        url: self.url_for(&file_name),
                        file_name,
                    });
                }
                Err(e) if e.kind() == std::io::ErrorKind::AlreadyExists => attempt += 1,
                Err(e) => return Err(e.into()),
            }
        }
    }

    /// Resolve a client-supplied reference to a file inside the directory.
    ///
    /// Accepts a bare file name, `uploads/<name>`, or the public URL
    /// returned by [`save`](Self::save).
    ///
    /// # Errors
    ///
    /// Returns `BadRequest` if the reference escapes the directory or the
    /// file does not exist.
    pub async fn resolve(&self, reference: &str) -> Result<PathBuf, MediaError> {
        let prefix = format!("{}/uploads/", self.public_url);
        let name = reference
            .strip_prefix(&prefix)
            .or_else(|| reference.strip_prefix("/uploads/"))
            .or_else(|| reference.strip_prefix("uploads/"))
            .unwrap_or(reference);

        if name.is_empty()
            || name.contains('/')
            || name.contains('\\')
            || validate_path(name).is_err()
        {
            return Err(MediaError::BadRequest("Invalid image path".to_string()));
        }

        let path = self.root.join(name);
        match tokio::fs::metadata(&path).await {
            Ok(meta) if meta.is_file() => Ok(path),
            _ => Err(MediaError::BadRequest("Invalid image path".to_string())),
        }
    }
}

fn extension(name: &str) -> String {
    Path::new(name)
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| {
            !ext.is_empty()
                && ext.len() <= MAX_EXTENSION_LEN
                && ext.chars().all(|c| c.is_ascii_alphanumeric())
        })
        .map(|ext| format!(".{}", ext.to_ascii_lowercase()))
        .unwrap_or_default()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn dir() -> (tempfile::TempDir, UploadDir) {
        let temp = tempfile::tempdir().unwrap();
        let uploads = UploadDir::open(temp.path().join("uploads"), "http://localhost:4848/").unwrap();
        (temp, uploads)
    }

    #[test]
    fn test_extension() {
        assert_eq!(extension("photo.JPG"), ".jpg");
        assert_eq!(extension("archive.tar.gz"), ".gz");
        assert_eq!(extension("noext"), "");
        assert_eq!(extension("bad.ex/t"), "");
        assert_eq!(extension("long.abcdefghijk"), "");
    }

    #[tokio::test]
    async fn test_save_and_resolve() {
        let (_temp, uploads) = dir();
        let stored = uploads.save(Some("cat.png"), b"png-bytes").await.unwrap();

        assert!(stored.file_name.ends_with(".png"));
        assert_eq!(
            stored.url,
            format!("http://localhost:4848/uploads/{}", stored.file_name)
        );

        let by_url = uploads.resolve(&stored.url).await.unwrap();
        let by_name = uploads.resolve(&stored.file_name).await.unwrap();
        assert_eq!(by_url, by_name);
        assert_eq!(tokio::fs::read(by_name).await.unwrap(), b"png-bytes");
    }

    #[tokio::test]
    async fn test_same_millisecond_names_do_not_collide() {
        let (_temp, uploads) = dir();
        let a = uploads.save(Some("a.png"), b"a").await.unwrap();
        let b = uploads.save(Some("b.png"), b"b").await.unwrap();
        assert_ne!(a.file_name, b.file_name);
    }

    #[tokio::test]
    async fn test_resolve_rejects_traversal() {
        let (_temp, uploads) = dir();
        for reference in ["../secret", "uploads/../../etc/passwd", "/etc/passwd", "", "a\\b"] {
            assert!(
                matches!(uploads.resolve(reference).await, Err(MediaError::BadRequest(_))),
                "{reference} should be rejected"
            );
        }
    }

    #[tokio::test]
    async fn test_resolve_missing_file() {
        let (_temp, uploads) = dir();
        assert!(matches!(
            uploads.resolve("missing.png").await,
            Err(MediaError::BadRequest(_))
        ));
    }
}
