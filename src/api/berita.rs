//! News (berita) endpoints.
//!
//! Create and update take a multipart form so the optional image travels with
//! the text fields. The image is uploaded and resolved to a URL first; the
//! record write carries that URL in the same payload, so a berita row never
//! points at an object that does not exist.

use axum::extract::{Multipart, Path, Query, State};
use serde::Deserialize;

use super::{paginate, success, ApiResult, ListParams, Page, UploadedFile};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Berita, BeritaForm, BeritaStatus};
use crate::storage::BUCKET_BERITA;
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
pub struct BeritaFilter {
    #[serde(default)]
    pub status: Option<BeritaStatus>,
}

/// GET /api/berita - List news.
///
/// Guardians see published items only; administrators see drafts as well and
/// may narrow by status.
pub async fn list_berita(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<BeritaFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Berita>> {
    let only_published = !current.is_admin();
    let mut items = state.repo.list_berita(only_published).await?;

    if current.is_admin() {
        if let Some(status) = filter.status {
            items.retain(|b| b.status == status);
        }
    }

    let page = paginate(items, &params, |b, q| {
        b.judul.to_lowercase().contains(q) || b.konten.to_lowercase().contains(q)
    });
    success(page)
}

/// GET /api/berita/:id - News detail. Drafts are hidden from guardians.
pub async fn get_berita(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Berita> {
    let berita = state
        .repo
        .get_berita(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Berita {} not found", id)))?;

    if berita.status == BeritaStatus::Draft && !current.is_admin() {
        return Err(AppError::NotFound(format!("Berita {} not found", id)));
    }

    success(berita)
}

/// POST /api/berita - Create a news item (admin, multipart with optional image).
pub async fn create_berita(
    State(state): State<AppState>,
    current: CurrentUser,
    multipart: Multipart,
) -> ApiResult<Berita> {
    current.require_admin()?;

    let (form, file) = parse_berita_form(multipart).await?;

    let judul = form
        .judul
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Judul wajib diisi".to_string()))?;
    let konten = form
        .konten
        .as_deref()
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .ok_or_else(|| AppError::Validation("Konten wajib diisi".to_string()))?;
    let status = form.status.unwrap_or(BeritaStatus::Draft);

    // Upload first; the record write carries the resolved URL
    let gambar_url = match &file {
        Some(f) => Some(
            state
                .storage
                .upload(BUCKET_BERITA, &current.user.id, &f.file_name, &f.bytes)
                .await?
                .public_url,
        ),
        None => None,
    };

    let berita = state
        .repo
        .create_berita(judul, konten, status, gambar_url.as_deref(), &current.user.id)
        .await?;

    tracing::info!(berita_id = %berita.id, status = %status.as_str(), "created berita");
    success(berita)
}

/// PUT /api/berita/:id - Update a news item (admin).
///
/// Without a new image in the form, the stored URL is preserved unchanged.
pub async fn update_berita(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    multipart: Multipart,
) -> ApiResult<Berita> {
    current.require_admin()?;

    let (form, file) = parse_berita_form(multipart).await?;

    let gambar_url = match &file {
        Some(f) => Some(
            state
                .storage
                .upload(BUCKET_BERITA, &current.user.id, &f.file_name, &f.bytes)
                .await?
                .public_url,
        ),
        None => None,
    };

    let berita = state
        .repo
        .update_berita(&id, &form, gambar_url.as_deref())
        .await?;
    success(berita)
}

/// DELETE /api/berita/:id - Delete a news item (admin).
pub async fn delete_berita(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    current.require_admin()?;
    state.repo.delete_berita(&id).await?;
    success(())
}

/// Pull the editor fields and the optional image out of the multipart body.
async fn parse_berita_form(
    mut multipart: Multipart,
) -> Result<(BeritaForm, Option<UploadedFile>), AppError> {
    let mut form = BeritaForm::default();
    let mut file = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "judul" => form.judul = Some(field.text().await?),
            "konten" => form.konten = Some(field.text().await?),
            "status" => {
                let value = field.text().await?;
                form.status = Some(BeritaStatus::from_str(&value).ok_or_else(|| {
                    AppError::Validation(format!("Status berita tidak dikenal: {}", value))
                })?);
            }
            "gambar" => {
                let file_name = field.file_name().unwrap_or("gambar.bin").to_string();
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
