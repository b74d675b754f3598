//! Activity/attendance (keaktifan) model.

use serde::{Deserialize, Serialize};

/// Attendance status of a student for one activity.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum KehadiranStatus {
    Hadir,
    TidakHadir,
    Izin,
    Sakit,
}

impl KehadiranStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            KehadiranStatus::Hadir => "hadir",
            KehadiranStatus::TidakHadir => "tidak_hadir",
            KehadiranStatus::Izin => "izin",
            KehadiranStatus::Sakit => "sakit",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "hadir" => Some(KehadiranStatus::Hadir),
            "tidak_hadir" => Some(KehadiranStatus::TidakHadir),
            "izin" => Some(KehadiranStatus::Izin),
            "sakit" => Some(KehadiranStatus::Sakit),
            _ => None,
        }
    }
}

/// One activity record with its santri relationship embedded.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Keaktifan {
    pub id: String,
    pub santri_id: String,
    pub santri_nama: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wali_id: Option<String>,
    pub nama_kegiatan: String,
    pub tanggal_kegiatan: String,
    pub kategori: String,
    pub status: KehadiranStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub keterangan: Option<String>,
    pub created_at: String,
}

/// Request body for logging an activity (admin).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateKeaktifanRequest {
    pub santri_id: String,
    pub nama_kegiatan: String,
    pub tanggal_kegiatan: String,
    pub kategori: String,
    pub status: KehadiranStatus,
    #[serde(default)]
    pub keterangan: Option<String>,
}

/// Request body for updating an activity record (admin).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateKeaktifanRequest {
    #[serde(default)]
    pub nama_kegiatan: Option<String>,
    #[serde(default)]
    pub tanggal_kegiatan: Option<String>,
    #[serde(default)]
    pub kategori: Option<String>,
    #[serde(default)]
    pub status: Option<KehadiranStatus>,
    #[serde(default)]
    pub keterangan: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["hadir", "tidak_hadir", "izin", "sakit"] {
            assert_eq!(KehadiranStatus::from_str(s).unwrap().as_str(), s);
        }
        assert_eq!(KehadiranStatus::from_str("alpha"), None);
    }

    #[test]
    fn test_status_serde_snake_case() {
        assert_eq!(
            serde_json::to_string(&KehadiranStatus::TidakHadir).unwrap(),
            "\"tidak_hadir\""
        );
    }
}
