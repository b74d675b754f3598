//! Student (santri) endpoints.

use axum::extract::{Multipart, Path, Query, State};

use super::{paginate, success, ApiResult, ListParams, Page, UploadedFile};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{NewSantri, Santri, SantriForm};
use crate::storage::BUCKET_SANTRI;
use crate::AppState;

/// GET /api/santri - Student roster.
///
/// Administrators see every row; a guardian sees exactly the rows whose
/// `wali_id` equals their own id, scoped in SQL.
pub async fn list_santri(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Santri>> {
    let items = state.repo.list_santri(current.wali_scope()).await?;

    let page = paginate(items, &params, |s, q| {
        s.nama.to_lowercase().contains(q)
            || s.kelas
                .as_deref()
                .is_some_and(|k| k.to_lowercase().contains(q))
    });
    success(page)
}

/// GET /api/santri/:id - Student detail, role-scoped.
pub async fn get_santri(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Santri> {
    let santri = state
        .repo
        .get_santri(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Santri {} not found", id)))?;

    if let Some(wali) = current.wali_scope() {
        if santri.wali_id.as_deref() != Some(wali) {
            return Err(AppError::NotFound(format!("Santri {} not found", id)));
        }
    }

    success(santri)
}

/// POST /api/santri - Create a student (admin, multipart with optional photo).
pub async fn create_santri(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Santri> {
    current.require_admin()?;

    let (form, file) = parse_santri_form(multipart).await?;

    let nama = form
        .nama
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Nama santri wajib diisi".to_string()))?
        .to_string();

    // Upload first so the row is written with its resolved photo URL
    let foto_url = match &file {
        Some(f) => Some(
            state
                .storage
                .upload(BUCKET_SANTRI, &current.user.id, &f.file_name, &f.bytes)
                .await?
                .public_url,
        ),
        None => None,
    };

    let santri = state
        .repo
        .create_santri(&NewSantri {
            nama,
            tgl_lahir: form.tgl_lahir,
            alamat: form.alamat,
            kelas: form.kelas,
            kamar: form.kamar,
            wali_id: form.wali_id,
            foto_url,
        })
        .await?;

    success(santri)
}

/// PUT /api/santri/:id - Update a student (admin). An absent photo keeps the
/// stored URL.
pub async fn update_santri(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Santri> {
    current.require_admin()?;

    let (form, file) = parse_santri_form(multipart).await?;

    let foto_url = match &file {
        Some(f) => Some(
            state
                .storage
                .upload(BUCKET_SANTRI, &current.user.id, &f.file_name, &f.bytes)
                .await?
                .public_url,
        ),
        None => None,
    };

    let santri = state
        .repo
        .update_santri(&id, &form, foto_url.as_deref())
        .await?;
    success(santri)
}

/// DELETE /api/santri/:id - Remove a student (admin).
pub async fn delete_santri(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    current.require_admin()?;
    state.repo.delete_santri(&id).await?;
    success(())
}

async fn parse_santri_form(
    mut multipart: Multipart,
) -> Result<(SantriForm, Option<UploadedFile>), AppError> {
    let mut form = SantriForm::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "nama" => form.nama = Some(field.text().await?),
            "tglLahir" => form.tgl_lahir = Some(field.text().await?),
            "alamat" => form.alamat = Some(field.text().await?),
            "kelas" => form.kelas = Some(field.text().await?),
            "kamar" => form.kamar = Some(field.text().await?),
            "waliId" => form.wali_id = Some(field.text().await?),
            "foto" => {
                let file_name = field.file_name().unwrap_or("foto.bin").to_string();
                let bytes = field.bytes().await?.to_vec();
                if !bytes.is_empty() {
                    file = Some(UploadedFile { file_name, bytes });
                }
            }
            _ => {}
        }
    }

    Ok((form, file))
}
