//! Student (santri) model.

use serde::{Deserialize, Serialize};

/// A student record. `wali_id` links the student to a guardian account and
/// drives all guardian-scoped visibility.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Santri {
    pub id: String,
    pub nama: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tgl_lahir: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub alamat: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kelas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kamar: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wali_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub foto_url: Option<String>,
    pub created_at: String,
}

/// Text fields of the student editor form (multipart; optional photo is
/// uploaded before the record is written).
#[derive(Debug, Clone, Default)]
pub struct SantriForm {
    pub nama: Option<String>,
    pub tgl_lahir: Option<String>,
    pub alamat: Option<String>,
    pub kelas: Option<String>,
    pub kamar: Option<String>,
    pub wali_id: Option<String>,
}

/// Fields for inserting a santri row from code paths without a form
/// (guardian registration creates the child record this way).
#[derive(Debug, Clone, Default)]
pub struct NewSantri {
    pub nama: String,
    pub tgl_lahir: Option<String>,
    pub alamat: Option<String>,
    pub kelas: Option<String>,
    pub kamar: Option<String>,
    pub wali_id: Option<String>,
    pub foto_url: Option<String>,
}
