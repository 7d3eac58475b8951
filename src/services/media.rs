//! Local file storage for uploaded pet photos.
//!
//! Files are written under `<media_root>/<namespace>/` with generated names;
//! the entity stores the path relative to the media root.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::{debug, instrument, warn};
use uuid::Uuid;

/// Namespace pet photos are stored under.
pub const PHOTO_NAMESPACE: &str = "profiles";

/// URL prefix the media root is served from.
pub const MEDIA_URL: &str = "/media";

#[derive(Debug, Clone)]
pub struct MediaStorage {
    root: PathBuf,
}

impl MediaStorage {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Create the namespace directories if they are missing.
    pub async fn ensure_dirs(&self) -> Result<()> {
        let dir = self.root.join(PHOTO_NAMESPACE);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory {}", dir.display()))
    }

    /// Write `content` under `namespace`, keeping the original extension.
    /// Returns the stored path relative to the media root.
    #[instrument(skip(self, content), fields(size = content.len()))]
    pub async fn save(
        &self,
        namespace: &str,
        original_name: Option<&str>,
        content: &[u8],
    ) -> Result<String> {
        let file_name = match original_name.and_then(extension) {
            Some(ext) => format!("{}.{}", Uuid::new_v4(), ext),
            None => Uuid::new_v4().to_string(),
        };
        let relative = format!("{namespace}/{file_name}");

        let dir = self.root.join(namespace);
        tokio::fs::create_dir_all(&dir)
            .await
            .with_context(|| format!("Failed to create media directory {}", dir.display()))?;
        tokio::fs::write(self.root.join(&relative), content)
            .await
            .with_context(|| format!("Failed to write media file {relative}"))?;

        debug!(path = %relative, "Stored media file");
        Ok(relative)
    }

    /// Remove a stored file. A file that is already gone is not an error;
    /// other failures are logged and swallowed since the row is already deleted.
    pub async fn remove(&self, relative: &str) {
        if !is_safe_relative(relative) {
            warn!(path = %relative, "Refusing to remove media outside the media root");
            return;
        }
        match tokio::fs::remove_file(self.root.join(relative)).await {
            Ok(()) => debug!(path = %relative, "Removed media file"),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
            Err(e) => warn!(path = %relative, error = %e, "Failed to remove media file"),
        }
    }

    /// Public URL for a stored path.
    pub fn url_for(relative: &str) -> String {
        format!("{MEDIA_URL}/{relative}")
    }
}

/// Lowercased extension of an uploaded file name, if it looks sane.
fn extension(name: &str) -> Option<String> {
    let (_, ext) = name.rsplit_once('.')?;
    if ext.is_empty() || ext.len() > 10 || !ext.chars().all(|c| c.is_ascii_alphanumeric()) {
        return None;
    }
    Some(ext.to_ascii_lowercase())
}

fn is_safe_relative(relative: &str) -> bool {
    Path::new(relative)
        .components()
        .all(|c| matches!(c, std::path::Component::Normal(_)))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_storage() -> MediaStorage {
        MediaStorage::new(std::env::temp_dir().join(format!("petstagram-media-{}", Uuid::new_v4())))
    }

    #[test]
    fn extension_is_sanitized() {
        assert_eq!(extension("Rex.PNG").as_deref(), Some("png"));
        assert_eq!(extension("archive.tar.gz").as_deref(), Some("gz"));
        assert_eq!(extension("noext"), None);
        assert_eq!(extension("evil./../x"), None);
    }

    #[test]
    fn traversal_paths_are_not_safe() {
        assert!(is_safe_relative("profiles/a.png"));
        assert!(!is_safe_relative("../etc/passwd"));
        assert!(!is_safe_relative("/etc/passwd"));
    }

    #[tokio::test]
    async fn save_and_remove_round_trip() {
        let storage = temp_storage();
        let relative = storage
            .save(PHOTO_NAMESPACE, Some("rex.jpg"), b"fake image")
            .await
            .unwrap();
        assert!(relative.starts_with("profiles/"));
        assert!(relative.ends_with(".jpg"));

        let on_disk = storage.root().join(&relative);
        assert_eq!(tokio::fs::read(&on_disk).await.unwrap(), b"fake image");
        assert_eq!(MediaStorage::url_for(&relative), format!("/media/{relative}"));

        storage.remove(&relative).await;
        assert!(!on_disk.exists());
        // second removal is a no-op
        storage.remove(&relative).await;

        let _ = tokio::fs::remove_dir_all(storage.root()).await;
    }
}
