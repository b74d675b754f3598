//! Bucket-per-asset-class object storage on the local filesystem.
//!
//! Uploads land under `{root}/{bucket}/{owner_id}/{uuid}.{ext}` so concurrent
//! uploads cannot collide, and resolve to a durable public URL served by the
//! `/files` route. Objects are never deleted here: a failed record write after
//! a successful upload may leave an orphan behind, which is accepted.

use std::path::{Path, PathBuf};

use crate::errors::AppError;

/// Bucket for news images.
pub const BUCKET_BERITA: &str = "berita";
/// Bucket for payment proof images.
pub const BUCKET_BUKTI: &str = "bukti";
/// Bucket for account avatars.
pub const BUCKET_AVATARS: &str = "avatars";
/// Bucket for student photos.
pub const BUCKET_SANTRI: &str = "santri";

/// A stored object: its bucket-relative path and resolved public URL.
#[derive(Debug, Clone)]
pub struct StoredObject {
    pub path: String,
    pub public_url: String,
}

/// Filesystem-backed object store.
#[derive(Debug, Clone)]
pub struct Storage {
    root: PathBuf,
    public_base_url: String,
}

impl Storage {
    pub fn new(root: impl Into<PathBuf>, public_base_url: impl Into<String>) -> Self {
        Self {
            root: root.into(),
            public_base_url: public_base_url.into(),
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Upload a file into a bucket, namespaced by the owning entity id.
    ///
    /// The stored name is a fresh uuid plus the original extension; the
    /// original filename is otherwise discarded.
    pub async fn upload(
        &self,
        bucket: &str,
        owner_id: &str,
        original_name: &str,
        bytes: &[u8],
    ) -> Result<StoredObject, AppError> {
        if bytes.is_empty() {
            return Err(AppError::Validation("File kosong".to_string()));
        }

        let ext = Path::new(original_name)
            .extension()
            .and_then(|e| e.to_str())
            .unwrap_or("bin");
        let file_name = format!("{}.{}", uuid::Uuid::new_v4(), ext);
        let rel_path = format!("{}/{}/{}", bucket, owner_id, file_name);

        let abs_path = self.root.join(bucket).join(owner_id);
        tokio::fs::create_dir_all(&abs_path).await?;
        tokio::fs::write(abs_path.join(&file_name), bytes).await?;

        tracing::debug!(bucket, owner_id, path = %rel_path, size = bytes.len(), "stored object");

        Ok(StoredObject {
            public_url: self.public_url(&rel_path),
            path: rel_path,
        })
    }

    /// Durable public URL for a stored path.
    pub fn public_url(&self, path: &str) -> String {
        format!(
            "{}/files/{}",
            self.public_base_url.trim_end_matches('/'),
            path
        )
    }
}
