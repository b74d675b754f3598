//! Profile endpoints: the caller's own account and santri.

use axum::extract::{Multipart, State};
use serde::Serialize;

use super::{success, ApiResult, UploadedFile};
use crate::auth::CurrentUser;
use crate::errors::AppError;
use crate::models::{Santri, UserAccount};
use crate::storage::BUCKET_AVATARS;
use crate::AppState;

/// The caller's account plus the santri linked to it.
#[derive(Debug, Serialize)]
pub struct ProfileResponse {
    pub user: UserAccount,
    pub santri: Vec<Santri>,
}

/// GET /api/profile - Own account and linked santri.
pub async fn get_profile(
    State(state): State<AppState>,
    current: CurrentUser,
) -> ApiResult<ProfileResponse> {
    let santri = state.repo.list_santri(Some(&current.user.id)).await?;
    success(ProfileResponse {
        user: current.user,
        santri,
    })
}

/// PUT /api/profile - Update own account (multipart, optional avatar).
///
/// A new avatar is uploaded and resolved before the account row is written;
/// without one the stored URL is preserved.
pub async fn update_profile(
    State(state): State<AppState>,
    current: CurrentUser,
    mut multipart: Multipart,
) -> ApiResult<UserAccount> {
    let mut nama = None;
    let mut no_hp = None;
    let mut alamat = None;
    let mut file: Option<UploadedFile> = None;

    while let Some(field) = multipart.next_field().await? {
        let name = field.name().unwrap_or("").to_string();
        match name.as_str() {
            "nama" => nama = Some(field.text().await?),
            "noHp" => no_hp = Some(field.text().await?),
            "alamat" => alamat = Some(field.text().await?),
            "foto" => {
                let file_name = field.file_name().unwrap_or("avatar.bin").to_string();
                let bytes = field.bytes().await?.to_vec();
                if !bytes.is_empty() {
                    file = Some(UploadedFile { file_name, bytes });
                }
            }
            _ => {}
        }
    }

    if let Some(nama) = &nama {
        if nama.trim().is_empty() {
            return Err(AppError::Validation("Nama wajib diisi".to_string()));
        }
    }

    let foto_url = match &file {
        Some(f) => Some(
            state
                .storage
                .upload(BUCKET_AVATARS, &current.user.id, &f.file_name, &f.bytes)
                .await?
                .public_url,
        ),
        None => None,
    };

    let user = state
        .repo
        .update_profile(
            &current.user.id,
            nama.as_deref().map(str::trim),
            no_hp.as_deref(),
            alamat.as_deref(),
            foto_url.as_deref(),
        )
        .await?;

    success(user)
}
