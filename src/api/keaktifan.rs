//! Activity/attendance (keaktifan) endpoints.

use axum::{
    extract::{Path, Query, State},
    Json,
};
use serde::Deserialize;

use super::{paginate, success, ApiResult, ListParams, Page};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{CreateKeaktifanRequest, Keaktifan, KehadiranStatus, UpdateKeaktifanRequest};
use crate::AppState;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct KeaktifanFilter {
    #[serde(default)]
    pub kategori: Option<String>,
    #[serde(default)]
    pub status: Option<KehadiranStatus>,
    #[serde(default)]
    pub santri_id: Option<String>,
}

/// GET /api/keaktifan - Activity log, most recent activity first.
///
/// Guardians get only records of their own santri, scoped in SQL.
pub async fn list_keaktifan(
    State(state): State<AppState>,
    current: CurrentUser,
    Query(filter): Query<KeaktifanFilter>,
    Query(params): Query<ListParams>,
) -> ApiResult<Page<Keaktifan>> {
    let mut items = state.repo.list_keaktifan(current.wali_scope()).await?;

    if let Some(kategori) = &filter.kategori {
        items.retain(|k| k.kategori.eq_ignore_ascii_case(kategori));
    }
    if let Some(status) = filter.status {
        items.retain(|k| k.status == status);
    }
    if let Some(santri_id) = &filter.santri_id {
        items.retain(|k| &k.santri_id == santri_id);
    }

    let page = paginate(items, &params, |k, q| {
        k.santri_nama.to_lowercase().contains(q) || k.nama_kegiatan.to_lowercase().contains(q)
    });
    success(page)
}

/// GET /api/keaktifan/:id - Single activity record, role-scoped.
pub async fn get_keaktifan(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<Keaktifan> {
    let keaktifan = state
        .repo
        .get_keaktifan(&id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Keaktifan {} not found", id)))?;

    if let Some(wali) = current.wali_scope() {
        if keaktifan.wali_id.as_deref() != Some(wali) {
            return Err(AppError::NotFound(format!("Keaktifan {} not found", id)));
        }
    }

    success(keaktifan)
}

/// POST /api/keaktifan - Log an activity (admin).
pub async fn create_keaktifan(
    State(state): State<AppState>,
    current: CurrentUser,
    Json(request): Json<CreateKeaktifanRequest>,
) -> ApiResult<Keaktifan> {
    current.require_admin()?;

    if request.nama_kegiatan.trim().is_empty() {
        return Err(AppError::Validation(
            "Nama kegiatan wajib diisi".to_string(),
        ));
    }
    if request.tanggal_kegiatan.trim().is_empty() {
        return Err(AppError::Validation(
            "Tanggal kegiatan wajib diisi".to_string(),
        ));
    }
    if request.kategori.trim().is_empty() {
        return Err(AppError::Validation("Kategori wajib diisi".to_string()));
    }

    let keaktifan = state.repo.create_keaktifan(&request).await?;
    success(keaktifan)
}

/// PUT /api/keaktifan/:id - Update an activity record (admin).
pub async fn update_keaktifan(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
    Json(request): Json<UpdateKeaktifanRequest>,
) -> ApiResult<Keaktifan> {
    current.require_admin()?;
    let keaktifan = state.repo.update_keaktifan(&id, &request).await?;
    success(keaktifan)
}

/// DELETE /api/keaktifan/:id - Remove an activity record (admin).
pub async fn delete_keaktifan(
    State(state): State<AppState>,
    current: CurrentUser,
    Path(id): Path<String>,
) -> ApiResult<()> {
    current.require_admin()?;
    state.repo.delete_keaktifan(&id).await?;
    success(())
}
