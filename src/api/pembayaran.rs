//! Payment (pembayaran) endpoints.
//!
//! Admin creates payment obligations and verifies submitted proofs; a
//! guardian submits a proof image for an unpaid obligation of their own
//! santri, which moves it to `pending`. Once `lunas` there is nothing left
//! for the guardian to do and proof submission is refused.

use axum::{
    extract::{Multipart, Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{paginate, success, ApiResult, ListParams, Page, UploadedFile};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{
    CreateJenisRequest, CreatePembayaranRequest, JenisPembayaran, Pembayaran, PembayaranStatus,
    VerifyPembayaranRequest,
};
use crate::storage::BUCKET_BUKTI;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PembayaranFilter {
    #[serde(default)]
    pub status: Option<PembayaranStatus>,
    #[serde(default)]
    pub santri_id: Option<String>,
}

/// GET /api/pembayaran - Payment list with the santri relationship embedded.
///
/// Guardians get only payments of their own santri, scoped in SQL.
pub async fn list_pembayaran(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<PembayaranFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Pembayaran>> {
    let mut items = state.repo.list_pembayaran(current.wali_scope()).await?;

    if let Some(status) = filter.status {
        items.retain(|p| p.status == status);
    }
    if let Some(santri_id) = &filter.santri_id {
        items.retain(|p| &p.santri_id == santri_id);
    }

    let page = paginate(items, &params, |p, q| {
        p.santri_nama.to_lowercase().contains(q)
            || p.jenis.to_lowercase().contains(q)
            || p.periode.to_lowercase().contains(q)
    });
    success(page)
}

/// GET /api/pembayaran/:id - Payment detail, role-scoped.
pub async fn get_pembayaran(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Pembayaran> {
    let pembayaran = state
        .repo
        .get_pembayaran(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pembayaran {} not found", id)))?;

    if let Some(wali) = current.wali_scope() {
        if pembayaran.wali_id.as_deref() != Some(wali) {
            return Err(AppError::NotFound(format!("Pembayaran {} not found", id)));
        }
    }

    success(pembayaran)
}

/// POST /api/pembayaran - Create a payment obligation in state `belum` (admin).
pub async fn create_pembayaran(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreatePembayaranRequest>,
) -> ApiResult<Pembayaran> {
    current.require_admin()?;

    if request.periode.trim().is_empty() {
        return Err(AppError::Validation("Periode wajib diisi".to_string()));
    }

    let pembayaran = state.repo.create_pembayaran(&request).await?;
    success(pembayaran)
}

/// PUT /api/pembayaran/:id/verify - Admin verification: approve (`lunas`),
/// reject (`belum`) or park (`pending`).
pub async fn verify_pembayaran(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<VerifyPembayaranRequest>,
) -> ApiResult<Pembayaran> {
    current.require_admin()?;

    let pembayaran = state.repo.set_pembayaran_status(&id, request.status).await?;
    tracing::info!(pembayaran_id = %id, status = pembayaran.status.as_str(), "payment verified");
    success(pembayaran)
}

/// POST /api/pembayaran/:id/bukti - Guardian submits a proof-of-payment image.
///
/// Only the owning guardian may submit, only while the payment is `belum`.
/// The image is uploaded and resolved first; one record write then attaches
/// the URL and moves the payment to `pending`.
pub async fn upload_bukti(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Pembayaran> {
    let pembayaran = state
        .repo
        .get_pembayaran(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Pembayaran {} not found", id)))?;

    if pembayaran.wali_id.as_deref() != Some(current.user.id.as_str()) {
        return Err(AppError::Forbidden(
            "Pembayaran ini bukan milik santri Anda".to_string(),
        ));
    }

    match pembayaran.status {
        PembayaranStatus::Belum => {}
        PembayaranStatus::Pending => {
            return Err(AppError::Validation(
                "Bukti pembayaran sudah dikirim, menunggu verifikasi admin".to_string(),
            ));
        }
        PembayaranStatus::Lunas => {
            return Err(AppError::Validation(
                "Pembayaran sudah lunas".to_string(),
            ));
        }
    }

    let (file, metode) = read_bukti_form(multipart).await?;
    let file = file
        .ok_or_else(|| AppError::Validation("Bukti pembayaran wajib dilampirkan".to_string()))?;

    let stored = state
        .storage
        .upload(BUCKET_BUKTI, &current.user.id, &file.file_name, &file.bytes)
        .await?;

    let pembayaran = state
        .repo
        .attach_bukti(&id, &stored.public_url, metode.as_deref())
        .await?;
    success(pembayaran)
}

/// DELETE /api/pembayaran/:id - Remove a payment obligation (admin).
pub async fn delete_pembayaran(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    current.require_admin()?;
    state.repo.delete_pembayaran(&id).await?;
    success(())
}

/// GET /api/pembayaran/jenis - Configured payment types.
pub async fn list_jenis(
    State(state): State<AppState>,
    _current: CurrentUser,
) -> ApiResult<Vec<JenisPembayaran>> {
    let jenis = state.repo.list_jenis().await?;
    success(jenis)
}

/// POST /api/pembayaran/jenis - Create a payment type (admin).
pub async fn create_jenis(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateJenisRequest>,
) -> ApiResult<JenisPembayaran> {
    current.require_admin()?;

    if request.nama_pembayaran.trim().is_empty() {
        return Err(AppError::Validation(
            "Nama pembayaran wajib diisi".to_string(),
        ));
    }

    let jenis = state.repo.create_jenis(&request).await?;
    success(jenis)
}

/// Proof image plus the payment method the guardian picked.
async fn read_bukti_form(
    mut multipart: Multipart,
) -> Result<(Option<UploadedFile>, Option<String>), AppError> {
    let mut file = None;
    let mut metode = None;

    while let Some(field) = multipart.next_field().await? {
        match field.name() {
            Some("bukti") => {
                let file_name = field.file_name().unwrap_or("bukti.bin").to_string();
                let bytes = field.bytes().await?.to_vec();
                if !bytes.is_empty() {
                    file = Some(UploadedFile { file_name, bytes });
                }
            }
            Some("metode") => metode = Some(field.text().await?),
            _ => {}
        }
    }
    Ok((file, metode))
}
