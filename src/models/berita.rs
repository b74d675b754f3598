//! News (berita) model.

use serde::{Deserialize, Serialize};

/// Lifecycle state of a news item. Drafts are visible to administrators only.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum BeritaStatus {
    Draft,
    Publish,
}

impl BeritaStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            BeritaStatus::Draft => "draft",
            BeritaStatus::Publish => "publish",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "draft" => Some(BeritaStatus::Draft),
            "publish" => Some(BeritaStatus::Publish),
            _ => None,
        }
    }
}

/// A news item with its author embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Berita {
    pub id: String,
    pub judul: String,
    pub konten: String,
    pub status: BeritaStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub gambar_url: Option<String>,
    pub admin_id: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub admin_nama: Option<String>,
    pub created_at: String,
}

/// Text fields of the news editor form. The optional image travels alongside
/// in the same multipart payload and is resolved to `gambar_url` before the
/// record is written.
#[derive(Debug, Clone, Default)]
pub struct BeritaForm {
    pub judul: Option<String>,
    pub konten: Option<String>,
    pub status: Option<BeritaStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        assert_eq!(BeritaStatus::from_str("draft"), Some(BeritaStatus::Draft));
        assert_eq!(
            BeritaStatus::from_str("publish"),
            Some(BeritaStatus::Publish)
        );
        assert_eq!(BeritaStatus::from_str("archived"), None);
    }
}
