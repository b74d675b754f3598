//! Payment (pembayaran) model and payment types (jenis pembayaran).

use serde::{Deserialize, Serialize};

/// Lifecycle state of a payment. Drives which actions each role may take:
/// a guardian may submit proof only while `belum`, and verification moves the
/// record to `lunas` (approved) or back to `belum` (rejected).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum PembayaranStatus {
    /// Unpaid
    Belum,
    /// Proof submitted, awaiting admin verification
    Pending,
    /// Paid and verified
    Lunas,
}

impl PembayaranStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            PembayaranStatus::Belum => "belum",
            PembayaranStatus::Pending => "pending",
            PembayaranStatus::Lunas => "lunas",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "belum" => Some(PembayaranStatus::Belum),
            "pending" => Some(PembayaranStatus::Pending),
            "lunas" => Some(PembayaranStatus::Lunas),
            _ => None,
        }
    }
}

/// A payment row with its santri relationship embedded, the shape the
/// payment list view renders directly.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Pembayaran {
    pub id: String,
    pub santri_id: String,
    pub santri_nama: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub kelas: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub wali_id: Option<String>,
    pub jenis: String,
    pub periode: String,
    pub jumlah: i64,
    pub status: PembayaranStatus,
    /// Payment method the guardian picked when submitting proof
    #[serde(skip_serializing_if = "Option::is_none")]
    pub metode: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub bukti_url: Option<String>,
    pub created_at: String,
}

/// A configured payment type with its default amount.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JenisPembayaran {
    pub id: String,
    pub nama_pembayaran: String,
    pub jumlah_default: i64,
}

/// Request body for creating a payment obligation (admin).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreatePembayaranRequest {
    pub santri_id: String,
    pub jenis_id: String,
    pub periode: String,
    /// Defaults to the jenis' `jumlah_default` when absent
    #[serde(default)]
    pub jumlah: Option<i64>,
}

/// Request body for admin verification of a payment.
#[derive(Debug, Clone, Deserialize)]
pub struct VerifyPembayaranRequest {
    pub status: PembayaranStatus,
}

/// Request body for creating a payment type (admin).
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJenisRequest {
    pub nama_pembayaran: String,
    pub jumlah_default: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_round_trip() {
        for s in ["belum", "pending", "lunas"] {
            assert_eq!(PembayaranStatus::from_str(s).unwrap().as_str(), s);
        }
        assert_eq!(PembayaranStatus::from_str("paid"), None);
    }

    #[test]
    fn test_status_serde() {
        assert_eq!(
            serde_json::to_string(&PembayaranStatus::Lunas).unwrap(),
            "\"lunas\""
        );
    }
}
